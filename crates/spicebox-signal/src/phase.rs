//! Phase extraction, unwrapping and numerical differentiation.
//!
//! These are pure functions over slices so they can be checked without an
//! engine or a cache.

use std::f64::consts::PI;

use crate::error::{Error, Result};

/// Phase in radians, `atan2(im, re)`, in `(-π, π]`.
pub fn wrapped_phase(re: &[f64], im: &[f64]) -> Vec<f64> {
    re.iter().zip(im).map(|(&r, &i)| i.atan2(r)).collect()
}

/// Remove 2π jumps so consecutive samples never differ by more than π.
///
/// The first sample is kept as is; every later sample is shifted by the
/// multiple of 2π that brings it closest to its predecessor.
pub fn unwrap_phase(phase: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(phase.len());
    let mut offset = 0.0;
    let mut prev: Option<f64> = None;

    for &p in phase {
        if let Some(prev_raw) = prev {
            let delta = p - prev_raw;
            if delta > PI {
                offset -= 2.0 * PI * ((delta + PI) / (2.0 * PI)).floor();
            } else if delta < -PI {
                offset += 2.0 * PI * ((-delta + PI) / (2.0 * PI)).floor();
            }
        }
        out.push(p + offset);
        prev = Some(p);
    }
    out
}

/// dy/dx on a possibly non-uniform grid.
///
/// Interior samples use the three-point central difference for unequal
/// spacing; the first and last samples use one-sided two-point differences.
/// `x` must be strictly increasing and have at least two samples.
pub fn derivative(x: &[f64], y: &[f64]) -> Result<Vec<f64>> {
    if x.len() != y.len() {
        return Err(Error::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    let n = x.len();
    if n < 2 {
        return Err(Error::TooFewPoints { needed: 2, got: n });
    }
    if let Some(i) = (1..n).find(|&i| !(x[i] > x[i - 1])) {
        return Err(Error::NotIncreasing(i));
    }

    let mut d = Vec::with_capacity(n);
    d.push((y[1] - y[0]) / (x[1] - x[0]));
    for i in 1..n - 1 {
        let h1 = x[i] - x[i - 1];
        let h2 = x[i + 1] - x[i];
        let a = -h2 / (h1 * (h1 + h2));
        let b = (h2 - h1) / (h1 * h2);
        let c = h1 / (h2 * (h1 + h2));
        d.push(a * y[i - 1] + b * y[i] + c * y[i + 1]);
    }
    d.push((y[n - 1] - y[n - 2]) / (x[n - 1] - x[n - 2]));
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_phase_quadrants() {
        let p = wrapped_phase(&[1.0, 0.0, -1.0, 0.0], &[0.0, 1.0, 0.0, -1.0]);
        assert!((p[0] - 0.0).abs() < 1e-12);
        assert!((p[1] - PI / 2.0).abs() < 1e-12);
        assert!((p[2] - PI).abs() < 1e-12);
        assert!((p[3] + PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_unwrap_removes_jumps() {
        // A steadily decreasing phase wrapped into (-π, π].
        let truth: Vec<f64> = (0..40).map(|i| -0.4 * i as f64).collect();
        let wrapped: Vec<f64> = truth.iter().map(|p| p.sin().atan2(p.cos())).collect();
        let unwrapped = unwrap_phase(&wrapped);
        for (u, t) in unwrapped.iter().zip(&truth) {
            assert!((u - t).abs() < 1e-9, "{} vs {}", u, t);
        }
        assert!(unwrapped.windows(2).all(|w| (w[1] - w[0]).abs() <= PI));
    }

    #[test]
    fn test_unwrap_keeps_smooth_input() {
        let p = vec![0.1, 0.5, 1.0, 2.0, 3.0];
        assert_eq!(unwrap_phase(&p), p);
        assert!(unwrap_phase(&[]).is_empty());
    }

    #[test]
    fn test_derivative_exact_for_quadratic() {
        // The three-point non-uniform scheme is exact for quadratics.
        let x = vec![0.0, 0.5, 2.0, 2.5, 4.0];
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        let d = derivative(&x, &y).unwrap();
        for i in 1..x.len() - 1 {
            assert!((d[i] - 2.0 * x[i]).abs() < 1e-12);
        }
        // One-sided ends.
        assert!((d[0] - 0.5).abs() < 1e-12);
        assert!((d[4] - 6.5).abs() < 1e-12);
    }

    #[test]
    fn test_derivative_two_points() {
        let d = derivative(&[1.0, 3.0], &[2.0, 6.0]).unwrap();
        assert_eq!(d, vec![2.0, 2.0]);
    }

    #[test]
    fn test_derivative_rejects_bad_grid() {
        assert!(matches!(derivative(&[1.0], &[1.0]), Err(Error::TooFewPoints { .. })));
        assert!(matches!(
            derivative(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0]),
            Err(Error::NotIncreasing(2))
        ));
        assert!(matches!(
            derivative(&[0.0, 1.0], &[0.0]),
            Err(Error::LengthMismatch { .. })
        ));
    }
}
