//! Validated document model for spreadsheet packages.
//!
//! Entities (series, page margins, relationships, worksheets) check every assignment as
//! it happens and serialize themselves into the parts of an xlsx package:
//!
//! ```no_run
//! use sheetdom::{BarSeries, CellRange, Chart, SeriesOptions, Workbook, WriteOptions};
//!
//! # fn main() -> sheetdom::Result<()> {
//! let mut workbook = Workbook::new();
//! let sheet = workbook.add_worksheet("Sales")?;
//! sheet.add_row(["Region", "Total"])?;
//! sheet.page_margins_mut().set([("left", 0.5), ("right", 0.5)])?;
//!
//! let mut chart: Chart<BarSeries> = Chart::default();
//! chart.add_series(
//!     BarSeries::new(CellRange::parse("Sales", "B2:B5")?),
//!     SeriesOptions::new().title("Total"),
//! )?;
//! sheet.add_chart(chart);
//!
//! sheetdom::write_workbook(&workbook, "sales.xlsx", &WriteOptions::default())?;
//! # Ok(())
//! # }
//! ```

mod chart;
mod drawing;
mod page_margins;
mod reference;
mod rels;
mod series;
mod types;
mod validation;
mod workbook;
mod worksheet;
mod writer;
pub mod xml;

pub use chart::{Chart, ChartPart, ChartPosition, LegendPosition};
pub use drawing::{chart_part_name, drawing_part_name, Drawing};
pub use page_margins::{
    MarginField, PageMargins, PageMarginsOptions, DEFAULT_HEADER_FOOTER, DEFAULT_LEFT_RIGHT,
    DEFAULT_TOP_BOTTOM,
};
pub use reference::{CellRange, CellRef};
pub use rels::{Relationship, RelationshipId, RelationshipType, Relationships, TargetMode};
pub use series::{
    AxisLayout, BarSeries, LineSeries, PieSeries, ScatterSeries, Series, SeriesBody, SeriesId,
    SeriesOptions, SeriesTitle, TitleInput,
};
pub use types::{CellValue, Result, Value, ValueKind, XlsxError};
pub use validation::{
    validate_sheet_name, validate_sheet_names, validate_type, validate_unsigned_int,
    validate_unsigned_numeric, ValidationResult, MAX_COLS, MAX_ROWS,
};
pub use workbook::{
    root_relationships, AppProperties, ContentTypes, CoreProperties, Stylesheet, Workbook,
    WorkbookPart,
};
pub use worksheet::{excel_serial, Hyperlink, SheetPart, Worksheet};
pub use writer::{package_parts, write_workbook, Compression, Part, WriteOptions};
pub use xml::{ToXml, XmlWriter};
