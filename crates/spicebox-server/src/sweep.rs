//! Sweep ranges and the per-point analysis used by parameter and temperature
//! sweeps.

use std::fmt;

use spicebox_core::{AcSweep, AnalysisRequest, CachedAnalysisResult, Error as CoreError};

use crate::error::{Result, ToolError};

/// Frequency used by `ac` sweeps when none is given.
pub const DEFAULT_SWEEP_FREQUENCY: f64 = 1e3;
pub const DEFAULT_SWEEP_TSTOP: f64 = 1e-3;
pub const DEFAULT_SWEEP_TSTEP: f64 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepScale {
    Linear,
    Log,
}

impl SweepScale {
    pub fn parse(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "lin" | "linear" => Ok(SweepScale::Linear),
            "log" | "logarithmic" | "dec" => Ok(SweepScale::Log),
            other => Err(ToolError::validation(format!(
                "scale must be 'linear' or 'log', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SweepScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepScale::Linear => write!(f, "linear"),
            SweepScale::Log => write!(f, "log"),
        }
    }
}

/// A validated set of sweep points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepRange {
    pub start: f64,
    pub stop: f64,
    pub points: usize,
    pub scale: SweepScale,
}

impl SweepRange {
    pub fn new(start: f64, stop: f64, points: usize, scale: SweepScale) -> Result<Self> {
        if points < 2 {
            return Err(ToolError::validation(format!(
                "points must be at least 2, got {}",
                points
            )));
        }
        if !start.is_finite() || !stop.is_finite() {
            return Err(ToolError::validation("start and stop must be finite numbers"));
        }
        if start > stop {
            return Err(ToolError::validation(format!(
                "start ({}) must not be greater than stop ({})",
                start, stop
            )));
        }
        if scale == SweepScale::Log && start <= 0.0 {
            return Err(ToolError::validation(format!(
                "log scale requires a positive start value, got {}",
                start
            )));
        }
        Ok(Self {
            start,
            stop,
            points,
            scale,
        })
    }

    /// The sweep points, `start` and `stop` included.
    pub fn values(&self) -> Vec<f64> {
        let last = (self.points - 1) as f64;
        (0..self.points)
            .map(|i| {
                let frac = i as f64 / last;
                match self.scale {
                    SweepScale::Linear => self.start + frac * (self.stop - self.start),
                    SweepScale::Log => self.start * (self.stop / self.start).powf(frac),
                }
            })
            .collect()
    }
}

/// The analysis run at every sweep point, reduced to one number per output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SweepAnalysis {
    OperatingPoint,
    /// Magnitude at a single frequency.
    Ac { frequency: f64 },
    /// Value at the end of a transient run.
    Transient { stop: f64, step: f64 },
}

impl SweepAnalysis {
    /// Parse an `analysis_type` token. Unknown tokens fail with
    /// `Unsupported analysis type: <token>`.
    pub fn parse(
        token: &str,
        frequency: Option<f64>,
        tstop: Option<f64>,
        tstep: Option<f64>,
    ) -> Result<Self> {
        let analysis = match token.trim().to_ascii_lowercase().as_str() {
            "op" | "operating_point" | "dc_op" => SweepAnalysis::OperatingPoint,
            "ac" => SweepAnalysis::Ac {
                frequency: frequency.unwrap_or(DEFAULT_SWEEP_FREQUENCY),
            },
            "transient" | "tran" => SweepAnalysis::Transient {
                stop: tstop.unwrap_or(DEFAULT_SWEEP_TSTOP),
                step: tstep.unwrap_or(DEFAULT_SWEEP_TSTEP),
            },
            _ => return Err(CoreError::UnsupportedAnalysis(token.to_string()).into()),
        };
        analysis.validate()?;
        Ok(analysis)
    }

    fn validate(&self) -> Result<()> {
        match *self {
            SweepAnalysis::OperatingPoint => Ok(()),
            SweepAnalysis::Ac { frequency } => {
                if frequency.is_finite() && frequency > 0.0 {
                    Ok(())
                } else {
                    Err(ToolError::validation(format!(
                        "frequency must be positive, got {}",
                        frequency
                    )))
                }
            }
            SweepAnalysis::Transient { stop, step } => {
                if !(step.is_finite() && step > 0.0) {
                    return Err(ToolError::validation(format!("tstep must be positive, got {}", step)));
                }
                if !(stop.is_finite() && stop >= step) {
                    return Err(ToolError::validation(format!(
                        "tstop ({}) must be at least tstep ({})",
                        stop, step
                    )));
                }
                Ok(())
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SweepAnalysis::OperatingPoint => "op",
            SweepAnalysis::Ac { .. } => "ac",
            SweepAnalysis::Transient { .. } => "transient",
        }
    }

    pub fn request(&self) -> AnalysisRequest {
        match *self {
            SweepAnalysis::OperatingPoint => AnalysisRequest::OperatingPoint,
            SweepAnalysis::Ac { frequency } => AnalysisRequest::Ac(AcSweep::single(frequency)),
            SweepAnalysis::Transient { stop, step } => AnalysisRequest::Transient {
                step,
                stop,
                start: 0.0,
            },
        }
    }

    /// The number recorded for `output` at one sweep point.
    pub fn sample(&self, result: &CachedAnalysisResult, output: &str) -> Result<f64> {
        let value = match self {
            SweepAnalysis::OperatingPoint => result.require_signal(output)?.first().copied(),
            SweepAnalysis::Ac { .. } => result.magnitude(output)?.first().copied(),
            SweepAnalysis::Transient { .. } => result.require_signal(output)?.last().copied(),
        };
        value.ok_or_else(|| ToolError::validation(format!("analysis produced no samples for {}", output)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spicebox_core::AnalysisKind;

    #[test]
    fn test_rejections() {
        let err = SweepRange::new(10000.0, 100.0, 10, SweepScale::Linear).unwrap_err().to_string();
        assert!(err.contains("start") && err.contains("stop"), "{}", err);

        let err = SweepRange::new(1.0, 10.0, 1, SweepScale::Linear).unwrap_err().to_string();
        assert!(err.contains("points"), "{}", err);

        let err = SweepRange::new(-100.0, 100.0, 10, SweepScale::Log).unwrap_err().to_string();
        assert!(err.contains("log") && err.contains("positive"), "{}", err);
    }

    #[test]
    fn test_values() {
        let lin = SweepRange::new(0.0, 10.0, 3, SweepScale::Linear).unwrap().values();
        assert_eq!(lin, vec![0.0, 5.0, 10.0]);

        let log = SweepRange::new(1.0, 100.0, 3, SweepScale::Log).unwrap().values();
        assert!((log[1] - 10.0).abs() < 1e-9);
        assert!((log[2] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_analysis_tokens() {
        assert_eq!(
            SweepAnalysis::parse("dc_op", None, None, None).unwrap(),
            SweepAnalysis::OperatingPoint
        );
        assert_eq!(
            SweepAnalysis::parse("ac", None, None, None).unwrap(),
            SweepAnalysis::Ac { frequency: 1e3 }
        );
        assert_eq!(
            SweepAnalysis::parse("TRAN", None, Some(2e-3), None).unwrap(),
            SweepAnalysis::Transient { stop: 2e-3, step: 1e-5 }
        );
        let err = SweepAnalysis::parse("noise", None, None, None).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported analysis type: noise");
    }

    #[test]
    fn test_transient_sample_is_final_value() {
        let result = CachedAnalysisResult::builder(AnalysisKind::Transient, "time", vec![0.0, 1.0, 2.0])
            .real_signal("v(out)", vec![0.0, 0.6, 0.9])
            .build()
            .unwrap();
        let analysis = SweepAnalysis::Transient { stop: 2.0, step: 1.0 };
        assert_eq!(analysis.sample(&result, "v(out)").unwrap(), 0.9);
        assert!(analysis.sample(&result, "v(x)").unwrap_err().to_string().contains("v(x)"));
    }
}
