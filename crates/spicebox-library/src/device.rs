//! Normalized device-type vocabulary.

use std::fmt;

use serde::{Serialize, Serializer};

/// Device type of a `.MODEL` card, normalized across dialects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Diode,
    Npn,
    Pnp,
    Nmos,
    Pmos,
    Njf,
    Pjf,
    /// Any other type token, lowercased (e.g. `r`, `c`, `sw`, `lpnp`).
    Other(String),
}

impl DeviceType {
    /// Normalize a model type token.
    ///
    /// `flags` are the bare words found in the parameter list; LTspice-style
    /// `VDMOS` models use `pchan` to select the P-channel variant.
    pub fn normalize(token: &str, flags: &[String]) -> Self {
        let upper = token.trim().to_ascii_uppercase();
        match upper.as_str() {
            "D" | "DIODE" => DeviceType::Diode,
            "NPN" => DeviceType::Npn,
            "PNP" => DeviceType::Pnp,
            "NMOS" | "NMOSFET" => DeviceType::Nmos,
            "PMOS" | "PMOSFET" => DeviceType::Pmos,
            "NJF" | "NJFET" => DeviceType::Njf,
            "PJF" | "PJFET" => DeviceType::Pjf,
            "VDMOS" => {
                if flags.iter().any(|f| f.eq_ignore_ascii_case("pchan")) {
                    DeviceType::Pmos
                } else {
                    DeviceType::Nmos
                }
            }
            _ => DeviceType::Other(upper.to_ascii_lowercase()),
        }
    }

    /// Parse a user-supplied filter (`diode`, `npn`, `nmos`, `d`, `njfet`, ...).
    pub fn from_filter(filter: &str) -> Self {
        Self::normalize(filter, &[])
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeviceType::Diode => "diode",
            DeviceType::Npn => "npn",
            DeviceType::Pnp => "pnp",
            DeviceType::Nmos => "nmos",
            DeviceType::Pmos => "pmos",
            DeviceType::Njf => "njf",
            DeviceType::Pjf => "pjf",
            DeviceType::Other(s) => s,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DeviceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_synonyms() {
        assert_eq!(DeviceType::normalize("d", &[]), DeviceType::Diode);
        assert_eq!(DeviceType::normalize("NJFET", &[]), DeviceType::Njf);
        assert_eq!(DeviceType::normalize("pjf", &[]), DeviceType::Pjf);
        assert_eq!(DeviceType::normalize("Npn", &[]), DeviceType::Npn);
    }

    #[test]
    fn test_vdmos_polarity() {
        assert_eq!(DeviceType::normalize("VDMOS", &[]), DeviceType::Nmos);
        assert_eq!(
            DeviceType::normalize("VDMOS", &["PCHAN".to_string()]),
            DeviceType::Pmos
        );
    }

    #[test]
    fn test_other_lowercased() {
        assert_eq!(DeviceType::normalize("SW", &[]).as_str(), "sw");
        assert_eq!(DeviceType::from_filter("diode"), DeviceType::Diode);
    }
}
