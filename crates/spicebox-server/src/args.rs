//! Typed tool arguments.
//!
//! Every tool deserializes its JSON arguments into one struct implementing
//! [`ToolArgs`], then runs that struct's `validate` pass before touching any
//! state.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use spicebox_core::units::parse_value;

use crate::error::{Result, ToolError};

/// Arguments of one tool.
pub trait ToolArgs: DeserializeOwned {
    /// Checks that need no circuit or cache. Runs right after parsing.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Parse and validate arguments for `tool`.
///
/// A `null` argument object is treated as `{}` so tools without required
/// arguments can be called bare.
pub fn parse_args<A: ToolArgs>(tool: &str, arguments: Value) -> Result<A> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    let args: A = serde_json::from_value(arguments).map_err(|e| {
        let message = e.to_string();
        match missing_field(&message) {
            Some(field) => ToolError::MissingArgument(field.to_string()),
            None => ToolError::InvalidArguments {
                tool: tool.to_string(),
                message,
            },
        }
    })?;
    args.validate()?;
    Ok(args)
}

/// Field name from serde's "missing field `name`" message.
fn missing_field(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("missing field `")?;
    rest.split('`').next()
}

/// A number, or a SPICE value string such as `"4.7k"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    pub fn resolve(&self, field: &str) -> Result<f64> {
        let value = match self {
            Numeric::Number(v) => Some(*v),
            Numeric::Text(s) => parse_value(s),
        };
        match value {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(ToolError::validation(format!(
                "{} must be a number or a SPICE value like 4.7k, got {}",
                field, self
            ))),
        }
    }
}

impl std::fmt::Display for Numeric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Numeric::Number(v) => write!(f, "{}", v),
            Numeric::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// Resolve every entry of a parameter map.
pub fn resolve_parameters(parameters: &BTreeMap<String, Numeric>) -> Result<BTreeMap<String, f64>> {
    parameters
        .iter()
        .map(|(k, v)| Ok((k.clone(), v.resolve(&format!("parameter '{}'", k))?)))
        .collect()
}

/// Fail with `"<field> is required"` when a required string is blank.
pub fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ToolError::validation(format!(
            "{} is required and must not be empty",
            field
        )));
    }
    Ok(())
}

/// Fail when a required list is empty.
pub fn require_items<T>(field: &str, items: &[T]) -> Result<()> {
    if items.is_empty() {
        return Err(ToolError::validation(format!(
            "{} is required and must list at least one entry",
            field
        )));
    }
    Ok(())
}
