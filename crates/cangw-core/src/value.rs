//! Parameter values and their conversion to signal values

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared type tag of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    Float64,
    ByteArray,
    Float64Array,
}

/// Value carried by a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Boolean(bool),
    Number(f64),
    Text(String),
    Array(Vec<f64>),
}

impl ParameterValue {
    /// Physical value to write into a signal
    ///
    /// Numbers pass through, booleans become 1/0 and text must hold a decimal
    /// number. Anything else is rejected.
    pub fn to_signal_value(&self) -> Result<f64, String> {
        match self {
            ParameterValue::Number(n) if n.is_finite() => Ok(*n),
            ParameterValue::Number(n) => Err(format!("{} is not a finite number", n)),
            ParameterValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            ParameterValue::Text(s) => parse_number(s),
            ParameterValue::Array(_) => Err("arrays cannot be written to a signal".to_string()),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Number(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Boolean(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Boolean(b) => write!(f, "{}", b),
            ParameterValue::Number(n) => write!(f, "{}", n),
            ParameterValue::Text(s) => write!(f, "{:?}", s),
            ParameterValue::Array(values) => write!(f, "{:?}", values),
        }
    }
}

/// Parse trimmed decimal text into a finite number
pub fn parse_number(text: &str) -> Result<f64, String> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| format!("could not convert string to float: '{}'", text))
}

/// Coerce one leaf of a JSON override object
pub fn coerce_json(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("{} is not representable as a float", n)),
        Value::String(s) => parse_number(s),
        Value::Bool(b) => ParameterValue::Boolean(*b).to_signal_value(),
        Value::Null => Err("value is missing".to_string()),
        Value::Array(_) | Value::Object(_) => {
            Err("expected a number or a numeric string".to_string())
        }
    }
}
