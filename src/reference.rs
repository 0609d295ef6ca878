use crate::types::{Result, XlsxError};
use crate::validation::{escape_sheet_name_for_formula, validate_cell_coords, validate_sheet_name};
use crate::xml::col_letters;
use std::fmt;

/// A single cell on a named sheet. Row and column are zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRef {
    sheet: String,
    row: usize,
    col: usize,
}

impl CellRef {
    pub fn new(sheet: impl Into<String>, row: usize, col: usize) -> Result<Self> {
        let sheet = sheet.into();
        validate_sheet_name(&sheet)?;
        validate_cell_coords(row, col, "CellRef")?;
        Ok(Self { sheet, row, col })
    }

    /// Parse an A1-style address ("B3", "$B$3") on `sheet`.
    pub fn parse(sheet: impl Into<String>, address: &str) -> Result<Self> {
        let (row, col) = parse_address(address)?;
        Self::new(sheet, row, col)
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn col(&self) -> usize {
        self.col
    }

    /// Absolute formula reference, e.g. `'My Sheet'!$A$1`
    pub fn formula(&self) -> String {
        format!(
            "{}!{}",
            escape_sheet_name_for_formula(&self.sheet),
            absolute(self.row, self.col)
        )
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.formula())
    }
}

/// A rectangular block of cells on a named sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    sheet: String,
    first: (usize, usize),
    last: (usize, usize),
}

impl CellRange {
    pub fn new(
        sheet: impl Into<String>,
        first_row: usize,
        first_col: usize,
        last_row: usize,
        last_col: usize,
    ) -> Result<Self> {
        let sheet = sheet.into();
        validate_sheet_name(&sheet)?;
        validate_cell_coords(first_row, first_col, "CellRange start")?;
        validate_cell_coords(last_row, last_col, "CellRange end")?;

        if first_row > last_row || first_col > last_col {
            return Err(XlsxError::validation(
                "CellRange",
                format!(
                    "invalid range ({},{}) to ({},{})",
                    first_row, first_col, last_row, last_col
                ),
            ));
        }

        Ok(Self {
            sheet,
            first: (first_row, first_col),
            last: (last_row, last_col),
        })
    }

    /// Parse "A2:A5" (or a single "A2") on `sheet`.
    pub fn parse(sheet: impl Into<String>, range: &str) -> Result<Self> {
        let (start, end) = range.split_once(':').unwrap_or((range, range));
        let (first_row, first_col) = parse_address(start)?;
        let (last_row, last_col) = parse_address(end)?;
        Self::new(sheet, first_row, first_col, last_row, last_col)
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn first(&self) -> (usize, usize) {
        self.first
    }

    pub fn last(&self) -> (usize, usize) {
        self.last
    }

    /// Number of cells covered
    pub fn cell_count(&self) -> usize {
        (self.last.0 - self.first.0 + 1) * (self.last.1 - self.first.1 + 1)
    }

    /// Absolute formula reference, e.g. `Sheet1!$B$2:$B$5`
    pub fn formula(&self) -> String {
        let sheet = escape_sheet_name_for_formula(&self.sheet);
        if self.first == self.last {
            return format!("{}!{}", sheet, absolute(self.first.0, self.first.1));
        }
        format!(
            "{}!{}:{}",
            sheet,
            absolute(self.first.0, self.first.1),
            absolute(self.last.0, self.last.1)
        )
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.formula())
    }
}

fn absolute(row: usize, col: usize) -> String {
    format!("${}${}", col_letters(col), row + 1)
}

fn parse_address(address: &str) -> Result<(usize, usize)> {
    let invalid = || {
        XlsxError::validation(
            "CellRef",
            format!("'{}' is not an A1-style cell address", address),
        )
    };

    let trimmed = address.trim().trim_start_matches('$');
    let letters_len = trimmed
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .count();
    if letters_len == 0 || letters_len > 3 {
        return Err(invalid());
    }

    let (letters, rest) = trimmed.split_at(letters_len);
    let digits = rest.strip_prefix('$').unwrap_or(rest);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let col = letters
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b.to_ascii_uppercase() - b'A' + 1) as usize)
        - 1;
    let row: usize = digits.parse().map_err(|_| invalid())?;
    if row == 0 {
        return Err(invalid());
    }

    Ok((row - 1, col))
}
