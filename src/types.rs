use chrono::NaiveDateTime;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    String(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::Date(dt)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

/// Loosely typed input accepted by validated setters.
///
/// Setters take `impl Into<Value>` so that the kind and range checks run at the
/// assignment boundary instead of being deferred to serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Bool(_) => ValueKind::Bool,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Float,
    Text,
    Bool,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Int => "integer",
            ValueKind::Float => "real number",
            ValueKind::Text => "text",
            ValueKind::Bool => "boolean",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("Validation error: {context}: {message}")]
    Validation { context: String, message: String },

    #[error("Type mismatch: {context}: expected {expected}, got {found}")]
    TypeMismatch {
        context: String,
        expected: String,
        found: ValueKind,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(String),
}

impl XlsxError {
    pub fn validation(context: impl Into<String>, message: impl Into<String>) -> Self {
        XlsxError::Validation {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, XlsxError::Validation { .. })
    }

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, XlsxError::TypeMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, XlsxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kinds() {
        assert_eq!(Value::from(3).kind(), ValueKind::Int);
        assert_eq!(Value::from(0.5).kind(), ValueKind::Float);
        assert_eq!(Value::from("a").kind(), ValueKind::Text);
        assert_eq!(Value::from(true).kind(), ValueKind::Bool);
    }

    #[test]
    fn test_error_display() {
        let err = XlsxError::validation("Series.order", "must be non-negative, got -1");
        assert_eq!(
            err.to_string(),
            "Validation error: Series.order: must be non-negative, got -1"
        );

        let err = XlsxError::TypeMismatch {
            context: "PageMargins.left".to_string(),
            expected: "integer or real number".to_string(),
            found: ValueKind::Text,
        };
        assert!(err.is_type_mismatch());
        assert_eq!(
            err.to_string(),
            "Type mismatch: PageMargins.left: expected integer or real number, got text"
        );
    }

    #[test]
    fn test_cell_value_from_option() {
        assert_eq!(CellValue::from(None::<f64>), CellValue::Empty);
        assert_eq!(CellValue::from(Some("x")), CellValue::String("x".to_string()));
    }
}
