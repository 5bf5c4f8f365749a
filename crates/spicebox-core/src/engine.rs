//! Interface to the circuit solver.
//!
//! The server never solves circuit equations itself. Analyses are described by
//! an [`AnalysisRequest`] and handed to a [`SimulationEngine`], which returns a
//! [`CachedAnalysisResult`] ready to be stored in the result cache.

use std::fmt;

use serde::Serialize;

use crate::analysis::CachedAnalysisResult;
use crate::circuit::Circuit;
use crate::error::{Error, Result};

/// AC sweep spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AcSweepType {
    /// Linear frequency spacing, `points` in total.
    Linear,
    /// Logarithmic spacing, `points` per decade.
    Decade,
    /// Logarithmic spacing, `points` per octave.
    Octave,
}

impl AcSweepType {
    /// Parse `lin`/`linear`, `dec`/`decade`, `oct`/`octave`.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "lin" | "linear" => Some(AcSweepType::Linear),
            "dec" | "decade" | "log" => Some(AcSweepType::Decade),
            "oct" | "octave" => Some(AcSweepType::Octave),
            _ => None,
        }
    }
}

impl fmt::Display for AcSweepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AcSweepType::Linear => "lin",
            AcSweepType::Decade => "dec",
            AcSweepType::Octave => "oct",
        };
        f.write_str(s)
    }
}

/// Most frequencies a single AC sweep may visit.
pub const MAX_AC_POINTS: usize = 1_000_000;

/// AC sweep parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AcSweep {
    pub sweep_type: AcSweepType,
    pub points: usize,
    pub start: f64,
    pub stop: f64,
}

impl AcSweep {
    pub fn decade(start: f64, stop: f64, points_per_decade: usize) -> Self {
        Self {
            sweep_type: AcSweepType::Decade,
            points: points_per_decade,
            start,
            stop,
        }
    }

    /// A sweep evaluating exactly one frequency.
    pub fn single(frequency: f64) -> Self {
        Self {
            sweep_type: AcSweepType::Linear,
            points: 1,
            start: frequency,
            stop: frequency,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.start.is_finite() && self.stop.is_finite()) {
            return Err(Error::Validation(
                "start_freq and stop_freq must be finite".to_string(),
            ));
        }
        if self.start <= 0.0 {
            return Err(Error::Validation(format!(
                "start_freq must be positive, got {}",
                self.start
            )));
        }
        if self.start > self.stop {
            return Err(Error::Validation(format!(
                "start_freq ({}) must not exceed stop_freq ({})",
                self.start, self.stop
            )));
        }
        if self.points == 0 {
            return Err(Error::Validation(
                "points_per_decade must be at least 1".to_string(),
            ));
        }
        let estimate = self.estimated_points();
        if estimate > MAX_AC_POINTS as f64 {
            return Err(Error::Validation(format!(
                "AC sweep would visit {:.0} frequencies; at most {} are allowed",
                estimate, MAX_AC_POINTS
            )));
        }
        Ok(())
    }

    /// Number of frequencies the sweep visits, computed in floating point so
    /// absurd densities cannot overflow.
    pub fn estimated_points(&self) -> f64 {
        if self.start == self.stop {
            return 1.0;
        }
        match self.sweep_type {
            AcSweepType::Linear => self.points as f64,
            AcSweepType::Decade => (self.points as f64 * self.spans(10.0)).ceil() + 1.0,
            AcSweepType::Octave => (self.points as f64 * self.spans(2.0)).ceil() + 1.0,
        }
    }

    fn spans(&self, base: f64) -> f64 {
        (self.stop / self.start).ln() / base.ln()
    }

    /// Frequencies visited by the sweep, in ascending order.
    ///
    /// Never yields more than [`MAX_AC_POINTS`] values; [`validate`](Self::validate)
    /// rejects sweeps that would need more.
    pub fn frequencies(&self) -> Vec<f64> {
        if self.start == self.stop {
            return vec![self.start];
        }
        match self.sweep_type {
            AcSweepType::Linear => {
                if self.points <= 1 {
                    return vec![self.start];
                }
                let step = (self.stop - self.start) / (self.points as f64 - 1.0);
                (0..self.points.min(MAX_AC_POINTS))
                    .map(|i| self.start + step * i as f64)
                    .collect()
            }
            AcSweepType::Decade => self.log_points(10.0),
            AcSweepType::Octave => self.log_points(2.0),
        }
    }

    fn log_points(&self, base: f64) -> Vec<f64> {
        // The float-to-int cast saturates.
        let total = (self.estimated_points() as usize).min(MAX_AC_POINTS);
        (0..total)
            .map(|i| self.start * base.powf(i as f64 / self.points as f64))
            .filter(|&f| f <= self.stop * 1.001)
            .collect()
    }
}

/// One analysis to run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisRequest {
    /// DC operating point.
    OperatingPoint,
    /// Sweep the DC value of an independent source.
    DcSweep {
        source: String,
        start: f64,
        stop: f64,
        step: f64,
    },
    /// Small-signal frequency sweep.
    Ac(AcSweep),
    /// Time-domain simulation from 0 to `stop`, reporting samples from `start`.
    Transient { step: f64, stop: f64, start: f64 },
}

impl AnalysisRequest {
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisRequest::OperatingPoint => "op",
            AnalysisRequest::DcSweep { .. } => "dc",
            AnalysisRequest::Ac(_) => "ac",
            AnalysisRequest::Transient { .. } => "transient",
        }
    }
}

/// Global simulation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationOptions {
    /// Circuit temperature in °C.
    pub temperature: f64,
    /// Conductance added from every node to ground.
    pub gmin: f64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            temperature: 27.0,
            gmin: 1e-12,
        }
    }
}

impl SimulationOptions {
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A circuit solver.
pub trait SimulationEngine: Send + Sync {
    /// Short name used in logs and server info.
    fn name(&self) -> &str;

    /// Run one analysis on a snapshot of a circuit.
    fn run(
        &self,
        circuit: &Circuit,
        request: &AnalysisRequest,
        options: &SimulationOptions,
    ) -> Result<CachedAnalysisResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decade_frequencies() {
        let freqs = AcSweep::decade(10.0, 1000.0, 10).frequencies();
        assert_eq!(freqs.len(), 21);
        assert!((freqs[0] - 10.0).abs() < 1e-9);
        assert!((freqs[10] - 100.0).abs() < 1e-9);
        assert!((freqs[20] - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_linear_frequencies() {
        let sweep = AcSweep {
            sweep_type: AcSweepType::Linear,
            points: 5,
            start: 100.0,
            stop: 500.0,
        };
        assert_eq!(sweep.frequencies(), vec![100.0, 200.0, 300.0, 400.0, 500.0]);
    }

    #[test]
    fn test_single_frequency() {
        assert_eq!(AcSweep::single(1e3).frequencies(), vec![1e3]);
    }

    #[test]
    fn test_validate_rejects_bad_range() {
        assert!(AcSweep::decade(0.0, 10.0, 10).validate().is_err());
        assert!(AcSweep::decade(100.0, 10.0, 10).validate().is_err());
        assert!(AcSweep::decade(10.0, 100.0, 0).validate().is_err());
        assert!(AcSweep::decade(10.0, 100.0, 5).validate().is_ok());
    }

    #[test]
    fn test_validate_caps_point_count() {
        let huge = AcSweep::decade(10.0, 1e6, usize::MAX);
        let err = huge.validate().unwrap_err().to_string();
        assert!(err.contains("at most 1000000"), "{}", err);
        assert!(huge.frequencies().len() <= MAX_AC_POINTS);

        let dense = AcSweep::decade(10.0, 1e6, 100_000_000);
        assert!(dense.validate().is_err());
        let estimate = AcSweep::decade(10.0, 1e6, 10).estimated_points();
        assert!((51.0..=52.0).contains(&estimate), "{}", estimate);

        let linear = AcSweep {
            sweep_type: AcSweepType::Linear,
            points: MAX_AC_POINTS + 1,
            start: 1.0,
            stop: 2.0,
        };
        assert!(linear.validate().is_err());
    }

    #[test]
    fn test_sweep_type_parse() {
        assert_eq!(AcSweepType::parse("DEC"), Some(AcSweepType::Decade));
        assert_eq!(AcSweepType::parse("linear"), Some(AcSweepType::Linear));
        assert_eq!(AcSweepType::parse("bogus"), None);
    }
}
