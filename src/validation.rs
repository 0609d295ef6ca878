/// Validation primitives shared by every validated setter in the document model
use crate::types::{Result, Value, ValueKind, XlsxError};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;

// Excel hard limits
pub const MAX_ROWS: usize = 1_048_576;
pub const MAX_COLS: usize = 16_384;
const MAX_SHEET_NAME_LEN: usize = 31;
const INVALID_SHEET_CHARS: &str = "[]:*?/\\";

/// Workbook-wide validation result
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, msg: String) {
        self.errors.push(msg);
    }

    pub fn add_warning(&mut self, msg: String) {
        self.warnings.push(msg);
    }

    pub fn to_error(self, context: &str) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(XlsxError::validation(
                context,
                format!(
                    "validation failed with {} errors:\n{}",
                    self.errors.len(),
                    self.errors.join("\n")
                ),
            ))
        }
    }
}

fn describe_kinds(expected: &[ValueKind]) -> String {
    expected
        .iter()
        .map(ValueKind::as_str)
        .collect::<Vec<_>>()
        .join(" or ")
}

fn type_mismatch(context: &str, expected: &[ValueKind], v: &Value) -> XlsxError {
    XlsxError::TypeMismatch {
        context: context.to_string(),
        expected: describe_kinds(expected),
        found: v.kind(),
    }
}

/// Fail unless `v` is one of the `expected` kinds.
pub fn validate_type(context: &str, expected: &[ValueKind], v: &Value) -> Result<()> {
    if expected.contains(&v.kind()) {
        Ok(())
    } else {
        Err(type_mismatch(context, expected, v))
    }
}

/// Non-negative integer that fits the schema's `xsd:unsignedInt`.
pub fn validate_unsigned_int(context: &str, v: &Value) -> Result<u32> {
    let Value::Int(n) = *v else {
        return Err(type_mismatch(context, &[ValueKind::Int], v));
    };
    if n < 0 {
        return Err(XlsxError::validation(
            context,
            format!("must be a non-negative integer, got {}", n),
        ));
    }
    u32::try_from(n).map_err(|_| {
        XlsxError::validation(
            context,
            format!("{} exceeds the unsigned int maximum {}", n, u32::MAX),
        )
    })
}

/// Non-negative, finite real number. Integers are accepted and widened.
pub fn validate_unsigned_numeric(context: &str, v: &Value) -> Result<f64> {
    let n = match *v {
        Value::Int(i) => i as f64,
        Value::Float(f) => f,
        _ => return Err(type_mismatch(context, &[ValueKind::Int, ValueKind::Float], v)),
    };
    if !n.is_finite() {
        return Err(XlsxError::validation(
            context,
            format!("must be a finite number, got {}", n),
        ));
    }
    if n < 0.0 {
        return Err(XlsxError::validation(
            context,
            format!("must be non-negative, got {}", n),
        ));
    }
    // -0.0 passes the sign check; store it as 0.0
    Ok(if n == 0.0 { 0.0 } else { n })
}

/// Escape sheet names for use in Excel formulas
/// Example: "My Sheet" -> "'My Sheet'"
///          "Quote's Sheet" -> "'Quote''s Sheet'"
///          "2024" -> "'2024'", "A1" -> "'A1'", "TRUE" -> "'TRUE'"
pub fn escape_sheet_name_for_formula(name: &str) -> String {
    if sheet_name_needs_quotes(name) {
        format!("'{}'", name.replace('\'', "''"))
    } else {
        name.to_string()
    }
}

/// A bare sheet name must lex as a plain identifier, never as a number,
/// boolean or cell reference.
fn sheet_name_needs_quotes(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return true;
    };
    if first.is_ascii_digit() || name.chars().any(|c| !c.is_alphanumeric() && c != '_') {
        return true;
    }
    name.eq_ignore_ascii_case("TRUE")
        || name.eq_ignore_ascii_case("FALSE")
        || starts_like_a1_ref(name)
        || is_r1c1_ref(name)
}

/// Leading `COLROW` with a column no wider than XFD and a non-zero row, e.g. `A1`, `XFD9Total`.
fn starts_like_a1_ref(name: &str) -> bool {
    let bytes = name.as_bytes();
    let letters = bytes.iter().take_while(|b| b.is_ascii_alphabetic()).count();
    if letters == 0 || letters > 3 {
        return false;
    }
    let digits = bytes[letters..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return false;
    }

    let col = bytes[..letters].iter().fold(0usize, |acc, b| {
        acc * 26 + usize::from(b.to_ascii_uppercase() - b'A' + 1)
    });
    let row = &name[letters..letters + digits];
    col <= MAX_COLS && !row.trim_start_matches('0').is_empty()
}

/// `R`, `C`, `R1`, `C5`, `RC`, `R1C1`, `R[..]` style tokens in either case.
fn is_r1c1_ref(name: &str) -> bool {
    let mut rest = name.as_bytes();
    let mut consumed = false;
    for axis in [b'R', b'C'] {
        if rest.first().map(u8::to_ascii_uppercase) == Some(axis) {
            let digits = rest[1..].iter().take_while(|b| b.is_ascii_digit()).count();
            rest = &rest[1 + digits..];
            consumed = true;
        }
    }
    consumed && rest.is_empty()
}

/// Validate sheet name meets Excel requirements
pub fn validate_sheet_name(name: &str) -> Result<()> {
    const CONTEXT: &str = "Worksheet.name";

    if name.is_empty() {
        return Err(XlsxError::validation(CONTEXT, "sheet name cannot be empty"));
    }

    let len = name.chars().count();
    if len > MAX_SHEET_NAME_LEN {
        return Err(XlsxError::validation(
            CONTEXT,
            format!(
                "sheet name '{}' exceeds {} characters (has {})",
                name, MAX_SHEET_NAME_LEN, len
            ),
        ));
    }

    if let Some(c) = name.chars().find(|c| INVALID_SHEET_CHARS.contains(*c)) {
        return Err(XlsxError::validation(
            CONTEXT,
            format!("sheet name '{}' contains invalid character '{}'", name, c),
        ));
    }

    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(XlsxError::validation(
            CONTEXT,
            format!("sheet name '{}' cannot begin or end with an apostrophe", name),
        ));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(XlsxError::validation(
            CONTEXT,
            format!("sheet name '{}' contains control characters", name),
        ));
    }

    Ok(())
}

/// Validate all sheet names in a workbook
pub fn validate_sheet_names(names: &[&str]) -> ValidationResult {
    let mut result = ValidationResult::new();
    let mut seen = HashSet::new();

    for (idx, name) in names.iter().enumerate() {
        if let Err(e) = validate_sheet_name(name) {
            result.add_error(format!("Sheet {}: {}", idx + 1, e));
            continue;
        }

        // Sheet names are case-insensitive
        if !seen.insert(name.to_lowercase()) {
            result.add_error(format!(
                "Duplicate sheet name '{}' (sheet names are case-insensitive)",
                name
            ));
        }
    }

    result
}

/// Validate zero-based cell coordinates are within Excel limits
pub fn validate_cell_coords(row: usize, col: usize, context: &str) -> Result<()> {
    if row >= MAX_ROWS {
        return Err(XlsxError::validation(
            context,
            format!("row {} is out of range (must be 0-{})", row, MAX_ROWS - 1),
        ));
    }

    if col >= MAX_COLS {
        return Err(XlsxError::validation(
            context,
            format!("column {} is out of range (must be 0-{})", col, MAX_COLS - 1),
        ));
    }

    Ok(())
}

/// Atomic file writing with rollback on error
pub fn write_file_atomic<F>(filename: &str, write_fn: F) -> Result<()>
where
    F: FnOnce(&mut fs::File) -> Result<()>,
{
    if filename.is_empty() {
        return Err(XlsxError::validation("write", "filename cannot be empty"));
    }

    let path = Path::new(filename);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(XlsxError::validation(
                "write",
                format!("directory does not exist: {}", parent.display()),
            ));
        }
    }

    // Temporary file in the same directory so the rename stays on one filesystem
    let temp_filename = format!("{}.tmp.{}", filename, std::process::id());
    let temp_path = Path::new(&temp_filename);

    let write_result = (|| -> Result<()> {
        let mut temp_file = fs::File::create(temp_path)?;
        write_fn(&mut temp_file)?;
        temp_file.flush()?;
        temp_file.sync_all()?;
        Ok(())
    })();

    match write_result {
        Ok(()) => {
            fs::rename(temp_path, path)?;
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(temp_path);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_sheet_name() {
        assert_eq!(escape_sheet_name_for_formula("Sheet1"), "Sheet1");
        assert_eq!(escape_sheet_name_for_formula("My Sheet"), "'My Sheet'");
        assert_eq!(escape_sheet_name_for_formula("Quote's"), "'Quote''s'");
        assert_eq!(escape_sheet_name_for_formula("Sheet!"), "'Sheet!'");
    }

    #[test]
    fn test_unsigned_numeric_normalizes_negative_zero() {
        let n = validate_unsigned_numeric("ctx", &Value::Float(-0.0)).unwrap();
        assert!(n.is_sign_positive());
        assert_eq!(validate_unsigned_numeric("ctx", &Value::Int(3)).unwrap(), 3.0);
        assert!(validate_unsigned_numeric("ctx", &Value::Float(-1e-9)).is_err());
    }

    #[test]
    fn test_escape_sheet_names_that_look_like_tokens() {
        assert_eq!(escape_sheet_name_for_formula("2024"), "'2024'");
        assert_eq!(escape_sheet_name_for_formula("1st"), "'1st'");
        assert_eq!(escape_sheet_name_for_formula("A1"), "'A1'");
        assert_eq!(escape_sheet_name_for_formula("xfd10"), "'xfd10'");
        assert_eq!(escape_sheet_name_for_formula("Q1Data"), "'Q1Data'");
        assert_eq!(escape_sheet_name_for_formula("R1C1"), "'R1C1'");
        assert_eq!(escape_sheet_name_for_formula("rc"), "'rc'");
        assert_eq!(escape_sheet_name_for_formula("C"), "'C'");
        assert_eq!(escape_sheet_name_for_formula("TRUE"), "'TRUE'");
        assert_eq!(escape_sheet_name_for_formula("false"), "'false'");

        assert_eq!(escape_sheet_name_for_formula("Sales2024"), "Sales2024");
        assert_eq!(escape_sheet_name_for_formula("XFE1"), "XFE1");
        assert_eq!(escape_sheet_name_for_formula("A0"), "A0");
        assert_eq!(escape_sheet_name_for_formula("Results"), "Results");
        assert_eq!(escape_sheet_name_for_formula("TRUEish"), "TRUEish");
    }

    #[test]
    fn test_validate_sheet_name() {
        assert!(validate_sheet_name("Sheet1").is_ok());
        assert!(validate_sheet_name("").is_err());
        assert!(validate_sheet_name(&"A".repeat(32)).is_err());
        assert!(validate_sheet_name("Invalid:Name").is_err());
        assert!(validate_sheet_name("'quoted").is_err());
    }

    #[test]
    fn test_duplicate_sheet_names() {
        let result = validate_sheet_names(&["Sheet1", "sheet1"]);
        assert!(!result.is_valid());
        assert!(result.to_error("Workbook").is_err());
    }

    #[test]
    fn test_cell_coords_overflow() {
        assert!(validate_cell_coords(MAX_ROWS, 0, "test").is_err());
        assert!(validate_cell_coords(0, MAX_COLS, "test").is_err());
        assert!(validate_cell_coords(MAX_ROWS - 1, MAX_COLS - 1, "test").is_ok());
    }

    #[test]
    fn test_unsigned_int() {
        assert_eq!(validate_unsigned_int("order", &Value::Int(3)).unwrap(), 3);
        assert_eq!(validate_unsigned_int("order", &Value::Int(0)).unwrap(), 0);

        let err = validate_unsigned_int("order", &Value::Int(-1)).unwrap_err();
        assert!(err.is_validation());

        let err = validate_unsigned_int("order", &Value::Float(1.0)).unwrap_err();
        assert!(err.is_type_mismatch());

        let err = validate_unsigned_int("order", &Value::Int(i64::from(u32::MAX) + 1)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_unsigned_numeric() {
        assert_eq!(validate_unsigned_numeric("left", &Value::Float(0.5)).unwrap(), 0.5);
        assert_eq!(validate_unsigned_numeric("left", &Value::Int(2)).unwrap(), 2.0);
        assert!(validate_unsigned_numeric("left", &Value::Float(-0.1)).unwrap_err().is_validation());
        assert!(validate_unsigned_numeric("left", &Value::Float(f64::NAN)).unwrap_err().is_validation());
        assert!(validate_unsigned_numeric("left", &Value::Float(f64::INFINITY)).unwrap_err().is_validation());
        assert!(validate_unsigned_numeric("left", &Value::from("1")).unwrap_err().is_type_mismatch());
    }

    #[test]
    fn test_validate_type_context() {
        let err = validate_type("Series.title", &[ValueKind::Text], &Value::Bool(true)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Series.title"));
        assert!(msg.contains("expected text"));
        assert!(msg.contains("got boolean"));
    }
}
