use serde::{Deserialize, Serialize};
use std::fmt;

/// An attribute value as held by a model or exchanged with a live handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Text(String),
    Boolean(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
        }
    }

    /// Interprets external representations of a flag.
    ///
    /// Text is truthy for `yes`, `on`, `true` and `1` (any case); everything
    /// else, including `Null` and the empty string, is `false`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "yes" | "on" | "true" | "1"
            ),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Token passed to the command-line tool for this value.
    pub fn to_command_arg(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Boolean(true) => "on".to_string(),
            Self::Boolean(false) => "off".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthy_tokens() {
        assert!(Value::from("yes").is_truthy());
        assert!(Value::from("ON").is_truthy());
        assert!(Value::Integer(1).is_truthy());
        assert!(!Value::from("no").is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Null.is_truthy());
    }

    #[test]
    fn test_command_args() {
        assert_eq!(Value::Boolean(true).to_command_arg(), "on");
        assert_eq!(Value::Boolean(false).to_command_arg(), "off");
        assert_eq!(Value::Integer(758).to_command_arg(), "758");
        assert_eq!(Value::from("VDI").to_command_arg(), "VDI");
    }

    #[test]
    fn test_numeric_text() {
        assert_eq!(Value::from("20480").as_i64(), Some(20480));
        assert_eq!(Value::from("big").as_i64(), None);
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }
}
