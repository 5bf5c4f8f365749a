//! Group delay from cached AC results.

use std::f64::consts::PI;

use serde::Serialize;
use spicebox_core::{AnalysisKind, CachedAnalysisResult};

use crate::error::{Error, Result};
use crate::phase::{derivative, unwrap_phase, wrapped_phase};

/// Group delay of one signal across an AC sweep.
#[derive(Debug, Clone, Serialize)]
pub struct GroupDelay {
    /// Signal name as requested.
    pub signal: String,
    pub frequencies: Vec<f64>,
    /// Delay in seconds at each frequency.
    pub delay: Vec<f64>,
    /// Unwrapped phase in radians at each frequency.
    pub phase: Vec<f64>,
    pub min_delay: f64,
    pub max_delay: f64,
    pub mean_delay: f64,
}

/// τ(ω) = −dφ/dω for `signal` in an AC result.
pub fn group_delay(result: &CachedAnalysisResult, signal: &str) -> Result<GroupDelay> {
    let re = result.require_signal(signal)?;
    if result.kind() != AnalysisKind::Ac {
        return Err(Error::WrongAnalysis {
            operation: "group delay",
            expected: "ac",
            actual: result.kind().to_string(),
        });
    }
    let im = result
        .imag(signal)
        .ok_or_else(|| Error::NotComplex(signal.to_string()))?;

    let frequencies = result.x_values().to_vec();
    let omega: Vec<f64> = frequencies.iter().map(|f| 2.0 * PI * f).collect();
    let phase = unwrap_phase(&wrapped_phase(re, im));
    let delay: Vec<f64> = derivative(&omega, &phase)?.into_iter().map(|d| -d).collect();

    let min_delay = delay.iter().copied().fold(f64::INFINITY, f64::min);
    let max_delay = delay.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean_delay = delay.iter().sum::<f64>() / delay.len() as f64;

    Ok(GroupDelay {
        signal: signal.to_string(),
        frequencies,
        delay,
        phase,
        min_delay,
        max_delay,
        mean_delay,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    /// H(jω) = 1 / (1 + jωRC)
    fn rc_result(rc: f64, frequencies: Vec<f64>) -> CachedAnalysisResult {
        let h: Vec<Complex64> = frequencies
            .iter()
            .map(|f| Complex64::new(1.0, 0.0) / Complex64::new(1.0, 2.0 * PI * f * rc))
            .collect();
        CachedAnalysisResult::builder(AnalysisKind::Ac, "frequency", frequencies)
            .complex_samples("v(out)", &h)
            .build()
            .unwrap()
    }

    #[test]
    fn test_rc_lowpass_matches_analytic() {
        let rc = 1e-3;
        // 100 points per decade from 10 Hz to 100 kHz.
        let freqs: Vec<f64> = (0..=400).map(|i| 10.0 * 10f64.powf(i as f64 / 100.0)).collect();
        let gd = group_delay(&rc_result(rc, freqs), "v(out)").unwrap();

        for (i, (&f, &tau)) in gd.frequencies.iter().zip(&gd.delay).enumerate() {
            if i == 0 || i == gd.delay.len() - 1 {
                continue;
            }
            let w = 2.0 * PI * f;
            let expected = rc / (1.0 + (w * rc).powi(2));
            assert!(
                (tau - expected).abs() < 0.01 * expected,
                "f={} tau={} expected={}",
                f,
                tau,
                expected
            );
        }
        assert!(gd.max_delay <= rc);
        assert!(gd.min_delay > 0.0);
    }

    #[test]
    fn test_echoes_signal_name() {
        let r = rc_result(1e-3, vec![100.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0]);
        let gd = group_delay(&r, "V(OUT)").unwrap();
        assert_eq!(gd.signal, "V(OUT)");
        assert_eq!(gd.frequencies.len(), 6);
        assert!(gd.delay.iter().all(|&d| d > 0.0));
    }

    #[test]
    fn test_missing_signal_is_named() {
        let r = CachedAnalysisResult::builder(AnalysisKind::Ac, "frequency", vec![1.0, 2.0])
            .complex_signal("v(other)", vec![1.0, 1.0], vec![0.0, 0.0])
            .build()
            .unwrap();
        let err = group_delay(&r, "v(nonexistent)").unwrap_err();
        assert!(err.to_string().contains("v(nonexistent)"));
    }

    #[test]
    fn test_real_only_signal_rejected() {
        let r = CachedAnalysisResult::builder(AnalysisKind::Ac, "frequency", vec![1.0, 2.0])
            .real_signal("v(a)", vec![1.0, 1.0])
            .build()
            .unwrap();
        assert!(matches!(group_delay(&r, "v(a)"), Err(Error::NotComplex(_))));
    }

    #[test]
    fn test_transient_result_rejected() {
        let r = CachedAnalysisResult::builder(AnalysisKind::Transient, "time", vec![0.0, 1.0])
            .real_signal("v(a)", vec![0.0, 1.0])
            .build()
            .unwrap();
        let err = group_delay(&r, "v(a)").unwrap_err();
        assert!(err.to_string().contains("ac"));
    }
}
