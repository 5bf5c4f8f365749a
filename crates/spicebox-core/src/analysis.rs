//! Cached analysis output.
//!
//! A [`CachedAnalysisResult`] holds every signal produced by one analysis run
//! against a shared x-axis. AC results additionally carry imaginary parts so
//! that derived computations (phase, group delay, impedance) can work from the
//! cache without re-running the engine.

use std::collections::BTreeMap;
use std::fmt;

use num_complex::Complex64;
use serde::Serialize;

use crate::error::{Error, Result};

/// Name of the voltage signal at a node.
pub fn voltage_signal(node: &str) -> String {
    format!("v({})", node)
}

/// Name of the branch-current signal through an element.
pub fn current_signal(element: &str) -> String {
    format!("i({})", element)
}

/// Which analysis produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    #[serde(rename = "op")]
    OperatingPoint,
    Dc,
    Ac,
    Transient,
    Noise,
    ParameterSweep,
    TemperatureSweep,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::OperatingPoint => "op",
            AnalysisKind::Dc => "dc",
            AnalysisKind::Ac => "ac",
            AnalysisKind::Transient => "transient",
            AnalysisKind::Noise => "noise",
            AnalysisKind::ParameterSweep => "parameter_sweep",
            AnalysisKind::TemperatureSweep => "temperature_sweep",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The most recent analysis output for one circuit.
///
/// Invariants, enforced by [`ResultBuilder::build`]:
/// - every real and imaginary series has the same length as `x_values`
/// - every imaginary key is also a real key
/// - imaginary data only exists for AC results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedAnalysisResult {
    kind: AnalysisKind,
    x_label: String,
    x_values: Vec<f64>,
    real: BTreeMap<String, Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    imag: Option<BTreeMap<String, Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scalars: Option<BTreeMap<String, f64>>,
}

impl CachedAnalysisResult {
    /// Start building a result of the given kind.
    pub fn builder(kind: AnalysisKind, x_label: impl Into<String>, x_values: Vec<f64>) -> ResultBuilder {
        ResultBuilder::new(kind, x_label, x_values)
    }

    pub fn kind(&self) -> AnalysisKind {
        self.kind
    }

    pub fn x_label(&self) -> &str {
        &self.x_label
    }

    pub fn x_values(&self) -> &[f64] {
        &self.x_values
    }

    pub fn len(&self) -> usize {
        self.x_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x_values.is_empty()
    }

    /// Signal names in sorted order.
    pub fn signal_names(&self) -> Vec<String> {
        self.real.keys().cloned().collect()
    }

    /// Scalar values (operating point), if any.
    pub fn scalars(&self) -> Option<&BTreeMap<String, f64>> {
        self.scalars.as_ref()
    }

    /// Resolve a signal name: exact key first, then case-insensitive.
    pub fn resolve_name(&self, name: &str) -> Option<&str> {
        if let Some((key, _)) = self.real.get_key_value(name) {
            return Some(key.as_str());
        }
        self.real
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    /// Real part (or the value, for real analyses) of a signal.
    pub fn signal(&self, name: &str) -> Option<&[f64]> {
        let key = self.resolve_name(name)?;
        self.real.get(key).map(Vec::as_slice)
    }

    /// Imaginary part of a signal, if the result carries one.
    pub fn imag(&self, name: &str) -> Option<&[f64]> {
        let key = self.resolve_name(name)?;
        self.imag.as_ref()?.get(key).map(Vec::as_slice)
    }

    pub fn has_signal(&self, name: &str) -> bool {
        self.resolve_name(name).is_some()
    }

    pub fn has_complex(&self, name: &str) -> bool {
        self.imag(name).is_some()
    }

    /// Like [`signal`](Self::signal) but fails with an error naming the signal.
    pub fn require_signal(&self, name: &str) -> Result<&[f64]> {
        self.signal(name).ok_or_else(|| self.missing(name))
    }

    /// Complex samples of a signal; real-only signals get a zero imaginary part.
    pub fn complex(&self, name: &str) -> Result<Vec<Complex64>> {
        let re = self.require_signal(name)?;
        let samples = match self.imag(name) {
            Some(im) => re
                .iter()
                .zip(im)
                .map(|(&r, &i)| Complex64::new(r, i))
                .collect(),
            None => re.iter().map(|&r| Complex64::new(r, 0.0)).collect(),
        };
        Ok(samples)
    }

    /// Magnitude of a signal at every sample.
    pub fn magnitude(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.complex(name)?.iter().map(|c| c.norm()).collect())
    }

    /// Wrapped phase in radians at every sample.
    pub fn phase(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.complex(name)?.iter().map(|c| c.arg()).collect())
    }

    /// Error for a signal that is not in the result.
    pub fn missing(&self, name: &str) -> Error {
        let mut names = self.signal_names();
        if names.len() > 20 {
            names.truncate(20);
            names.push("...".to_string());
        }
        Error::SignalNotFound {
            signal: name.to_string(),
            analysis: self.kind.to_string(),
            available: names.join(", "),
        }
    }
}

/// Builder that validates the [`CachedAnalysisResult`] invariants.
#[derive(Debug, Clone)]
pub struct ResultBuilder {
    kind: AnalysisKind,
    x_label: String,
    x_values: Vec<f64>,
    real: BTreeMap<String, Vec<f64>>,
    imag: BTreeMap<String, Vec<f64>>,
    scalars: BTreeMap<String, f64>,
}

impl ResultBuilder {
    pub fn new(kind: AnalysisKind, x_label: impl Into<String>, x_values: Vec<f64>) -> Self {
        Self {
            kind,
            x_label: x_label.into(),
            x_values,
            real: BTreeMap::new(),
            imag: BTreeMap::new(),
            scalars: BTreeMap::new(),
        }
    }

    /// Add a real-valued series.
    pub fn real_signal(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.real.insert(name.into(), values);
        self
    }

    /// Add a complex series given as separate real and imaginary parts.
    pub fn complex_signal(mut self, name: impl Into<String>, re: Vec<f64>, im: Vec<f64>) -> Self {
        let name = name.into();
        self.real.insert(name.clone(), re);
        self.imag.insert(name, im);
        self
    }

    /// Add a complex series from complex samples.
    pub fn complex_samples(self, name: impl Into<String>, samples: &[Complex64]) -> Self {
        let re = samples.iter().map(|c| c.re).collect();
        let im = samples.iter().map(|c| c.im).collect();
        self.complex_signal(name, re, im)
    }

    /// Add a named scalar (operating-point value).
    pub fn scalar(mut self, name: impl Into<String>, value: f64) -> Self {
        self.scalars.insert(name.into(), value);
        self
    }

    /// Check invariants and produce the result.
    pub fn build(self) -> Result<CachedAnalysisResult> {
        let n = self.x_values.len();

        for (name, values) in &self.real {
            if values.len() != n {
                return Err(Error::InvalidResult(format!(
                    "signal '{}' has {} samples, x-axis has {}",
                    name,
                    values.len(),
                    n
                )));
            }
        }

        if !self.imag.is_empty() && self.kind != AnalysisKind::Ac {
            return Err(Error::InvalidResult(format!(
                "imaginary data is only allowed for ac results, not {}",
                self.kind
            )));
        }
        for (name, values) in &self.imag {
            if !self.real.contains_key(name) {
                return Err(Error::InvalidResult(format!(
                    "imaginary signal '{}' has no real part",
                    name
                )));
            }
            if values.len() != n {
                return Err(Error::InvalidResult(format!(
                    "imaginary signal '{}' has {} samples, x-axis has {}",
                    name,
                    values.len(),
                    n
                )));
            }
        }

        Ok(CachedAnalysisResult {
            kind: self.kind,
            x_label: self.x_label,
            x_values: self.x_values,
            real: self.real,
            imag: (!self.imag.is_empty()).then_some(self.imag),
            scalars: (!self.scalars.is_empty()).then_some(self.scalars),
        })
    }
}
