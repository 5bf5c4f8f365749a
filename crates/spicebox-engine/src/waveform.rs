//! Time-varying source waveforms for transient analysis.
//!
//! Waveforms are read from a source's instance parameters:
//! `pulse_v1 pulse_v2 pulse_td pulse_tr pulse_tf pulse_pw pulse_per` or
//! `sin_vo sin_va sin_freq sin_td sin_theta sin_phase`. A source with neither
//! set holds its DC value.

use std::f64::consts::TAU;

use spicebox_core::Component;

/// A source waveform.
#[derive(Debug, Clone, PartialEq)]
pub enum Waveform {
    /// Constant value.
    Dc(f64),
    Pulse(Pulse),
    Sin(Sine),
}

/// PULSE(V1 V2 TD TR TF PW PER). A period of 0 means a single pulse.
#[derive(Debug, Clone, PartialEq)]
pub struct Pulse {
    pub initial: f64,
    pub pulsed: f64,
    pub delay: f64,
    pub rise: f64,
    pub fall: f64,
    pub width: f64,
    pub period: f64,
}

impl Pulse {
    fn at(&self, t: f64) -> f64 {
        if t < self.delay {
            return self.initial;
        }
        let mut local = t - self.delay;
        if self.period > 0.0 {
            local %= self.period;
        }

        let swing = self.pulsed - self.initial;
        let fall_start = self.rise + self.width;
        if local < self.rise {
            self.initial + swing * (local / self.rise)
        } else if local < fall_start {
            self.pulsed
        } else if local < fall_start + self.fall {
            self.pulsed - swing * ((local - fall_start) / self.fall)
        } else {
            self.initial
        }
    }
}

/// SIN(VO VA FREQ TD THETA PHASE), phase in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Sine {
    pub offset: f64,
    pub amplitude: f64,
    pub frequency: f64,
    pub delay: f64,
    pub damping: f64,
    pub phase_deg: f64,
}

impl Sine {
    fn at(&self, t: f64) -> f64 {
        let phase = self.phase_deg.to_radians();
        // Before the delay the source sits at its starting phase.
        let elapsed = (t - self.delay).max(0.0);
        let envelope = if self.damping > 0.0 {
            (-self.damping * elapsed).exp()
        } else {
            1.0
        };
        self.offset + self.amplitude * envelope * (TAU * self.frequency * elapsed + phase).sin()
    }
}

impl Waveform {
    /// Build the waveform described by a source's parameters.
    pub fn from_component(component: &Component) -> Self {
        let dc = component.value.unwrap_or(0.0);
        let has = |prefix: &str| component.parameters.keys().any(|k| k.starts_with(prefix));
        let p = |name: &str, default: f64| component.parameter(name).unwrap_or(default);

        if has("pulse_") {
            let initial = p("pulse_v1", dc);
            Waveform::Pulse(Pulse {
                initial,
                pulsed: p("pulse_v2", initial),
                delay: p("pulse_td", 0.0),
                rise: p("pulse_tr", 0.0),
                fall: p("pulse_tf", 0.0),
                width: p("pulse_pw", f64::INFINITY),
                period: p("pulse_per", 0.0),
            })
        } else if has("sin_") {
            Waveform::Sin(Sine {
                offset: p("sin_vo", dc),
                amplitude: p("sin_va", 0.0),
                frequency: p("sin_freq", 0.0),
                delay: p("sin_td", 0.0),
                damping: p("sin_theta", 0.0),
                phase_deg: p("sin_phase", 0.0),
            })
        } else {
            Waveform::Dc(dc)
        }
    }

    /// Value at time `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        match self {
            Waveform::Dc(v) => *v,
            Waveform::Pulse(pulse) => pulse.at(t),
            Waveform::Sin(sine) => sine.at(t),
        }
    }

    /// Value used for the operating point.
    pub fn dc_value(&self) -> f64 {
        self.value_at(0.0)
    }
}
