use crate::chart::{Chart, ChartPart};
use crate::page_margins::PageMargins;
use crate::rels::{Relationship, RelationshipId, RelationshipType, Relationships};
use crate::series::SeriesBody;
use crate::types::{CellValue, Result, XlsxError};
use crate::validation::{validate_cell_coords, validate_sheet_name, MAX_COLS, MAX_ROWS};
use crate::xml::{write_cell_ref, xstring_escape, Attr, ToXml, XmlWriter, NS_OFFICE_RELATIONSHIPS, NS_SPREADSHEETML};
use chrono::{Datelike, NaiveDateTime, Timelike};

/// Days from 0001-01-01 (day 1 in chrono's CE count) to Excel's 1899-12-30 epoch
const EXCEL_EPOCH_DAYS_FROM_CE: i64 = 693_594;

/// Style index of the date format in the default stylesheet
const DATE_STYLE_ID: u32 = 1;

/// An external link attached to a single cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Hyperlink {
    row: usize,
    col: usize,
    relationship: Relationship,
}

impl Hyperlink {
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn col(&self) -> usize {
        self.col
    }

    pub fn url(&self) -> &str {
        self.relationship.target()
    }
}

#[derive(Debug)]
pub struct Worksheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
    page_margins: PageMargins,
    hyperlinks: Vec<Hyperlink>,
    charts: Vec<Box<dyn ChartPart>>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_sheet_name(&name)?;
        Ok(Self {
            name,
            rows: Vec::new(),
            page_margins: PageMargins::default(),
            hyperlinks: Vec::new(),
            charts: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a row of cells and return its zero-based row index.
    pub fn add_row<I, V>(&mut self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let row = self.rows.len();
        if row >= MAX_ROWS {
            return Err(XlsxError::validation(
                "Worksheet.add_row",
                format!("sheet '{}' already has {} rows", self.name, MAX_ROWS),
            ));
        }

        let cells: Vec<CellValue> = values.into_iter().map(Into::into).collect();
        if cells.len() > MAX_COLS {
            return Err(XlsxError::validation(
                "Worksheet.add_row",
                format!("{} cells exceeds the {} column limit", cells.len(), MAX_COLS),
            ));
        }
        if let Some(col) = cells
            .iter()
            .position(|c| matches!(c, CellValue::Number(n) if !n.is_finite()))
        {
            return Err(XlsxError::validation(
                "Worksheet.add_row",
                format!("non-finite number in column {}", col),
            ));
        }

        self.rows.push(cells);
        Ok(row)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row)?.get(col)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn page_margins(&self) -> &PageMargins {
        &self.page_margins
    }

    pub fn page_margins_mut(&mut self) -> &mut PageMargins {
        &mut self.page_margins
    }

    pub fn set_page_margins(&mut self, margins: PageMargins) {
        self.page_margins = margins;
    }

    /// Link the cell at (`row`, `col`) to an external `url`.
    pub fn add_hyperlink(&mut self, row: usize, col: usize, url: impl Into<String>) -> Result<()> {
        validate_cell_coords(row, col, "Worksheet.add_hyperlink")?;
        let relationship = Relationship::external(RelationshipType::Hyperlink, url)?;
        self.hyperlinks.push(Hyperlink {
            row,
            col,
            relationship,
        });
        Ok(())
    }

    pub fn hyperlinks(&self) -> &[Hyperlink] {
        &self.hyperlinks
    }

    /// Take ownership of `chart` and return its position among this sheet's charts.
    pub fn add_chart<B: SeriesBody>(&mut self, chart: Chart<B>) -> usize {
        self.charts.push(Box::new(chart));
        self.charts.len() - 1
    }

    pub fn charts(&self) -> &[Box<dyn ChartPart>] {
        &self.charts
    }

    /// The chart at `index`, if it has series body `B`.
    pub fn chart_mut<B: SeriesBody>(&mut self, index: usize) -> Option<&mut Chart<B>> {
        self.charts
            .get_mut(index)?
            .as_any_mut()
            .downcast_mut::<Chart<B>>()
    }

    fn num_cols(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// A worksheet ready to serialize, together with the relationships its XML refers to.
///
/// Hyperlinks get the first ids, in insertion order, followed by the drawing.
#[derive(Debug)]
pub struct SheetPart<'a> {
    sheet: &'a Worksheet,
    relationships: Relationships,
    hyperlink_ids: Vec<RelationshipId>,
    drawing_id: Option<RelationshipId>,
}

impl<'a> SheetPart<'a> {
    /// `drawing_number` is the workbook-wide number of this sheet's drawing part, if any.
    pub fn new(sheet: &'a Worksheet, drawing_number: Option<usize>) -> Result<Self> {
        let mut relationships = Relationships::new();
        let hyperlink_ids = sheet
            .hyperlinks
            .iter()
            .map(|link| relationships.push(link.relationship.clone()))
            .collect();

        let drawing_id = match drawing_number {
            Some(n) => Some(relationships.add(
                RelationshipType::Drawing,
                format!("../drawings/drawing{}.xml", n),
            )?),
            None => None,
        };

        Ok(Self {
            sheet,
            relationships,
            hyperlink_ids,
            drawing_id,
        })
    }

    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    fn write_dimension(&self, xml: &mut XmlWriter) {
        let num_cols = self.sheet.num_cols();
        let num_rows = self.sheet.rows.len();
        let mut range = String::from("A1");
        if num_cols > 0 && num_rows > 0 && (num_cols, num_rows) != (1, 1) {
            range.push(':');
            write_cell_ref(num_rows - 1, num_cols - 1, &mut range);
        }
        xml.empty("dimension", &[("ref", Attr::Str(&range))]);
    }

    fn write_sheet_data(&self, xml: &mut XmlWriter) {
        if self.sheet.rows.is_empty() {
            xml.empty("sheetData", &[]);
            return;
        }

        let mut out = String::with_capacity(self.sheet.rows.len() * 64);
        let mut int_buf = itoa::Buffer::new();
        let mut ryu_buf = ryu::Buffer::new();
        let mut cell_ref = String::with_capacity(12);

        out.push_str("<sheetData>");
        for (row_idx, row) in self.sheet.rows.iter().enumerate() {
            out.push_str("<row r=\"");
            out.push_str(int_buf.format(row_idx + 1));
            out.push_str("\">");

            for (col_idx, value) in row.iter().enumerate() {
                cell_ref.clear();
                write_cell_ref(row_idx, col_idx, &mut cell_ref);
                write_cell(&mut out, &cell_ref, value, &mut int_buf, &mut ryu_buf);
            }
            out.push_str("</row>");
        }
        out.push_str("</sheetData>");
        xml.raw(&out);
    }

    fn write_hyperlinks(&self, xml: &mut XmlWriter) {
        if self.hyperlink_ids.is_empty() {
            return;
        }
        xml.element("hyperlinks", &[], |xml| {
            for (link, id) in self.sheet.hyperlinks.iter().zip(&self.hyperlink_ids) {
                let mut cell_ref = String::new();
                write_cell_ref(link.row, link.col, &mut cell_ref);
                let id = id.to_string();
                xml.empty(
                    "hyperlink",
                    &[("ref", Attr::Str(&cell_ref)), ("r:id", Attr::Str(&id))],
                );
            }
        });
    }
}

impl ToXml for SheetPart<'_> {
    fn to_xml(&self, xml: &mut XmlWriter) {
        xml.declaration();
        xml.element(
            "worksheet",
            &[
                ("xmlns", Attr::Str(NS_SPREADSHEETML)),
                ("xmlns:r", Attr::Str(NS_OFFICE_RELATIONSHIPS)),
            ],
            |xml| {
                self.write_dimension(xml);
                self.write_sheet_data(xml);
                self.write_hyperlinks(xml);
                self.sheet.page_margins.to_xml(xml);
                if let Some(id) = self.drawing_id {
                    let id = id.to_string();
                    xml.empty("drawing", &[("r:id", Attr::Str(&id))]);
                }
            },
        );
    }
}

#[inline(always)]
fn write_cell(
    out: &mut String,
    cell_ref: &str,
    value: &CellValue,
    int_buf: &mut itoa::Buffer,
    ryu_buf: &mut ryu::Buffer,
) {
    out.push_str("<c r=\"");
    out.push_str(cell_ref);
    match value {
        CellValue::Empty => out.push_str("\"/>"),
        CellValue::String(s) => {
            out.push_str("\" t=\"inlineStr\"><is><t>");
            xstring_escape(s, out);
            out.push_str("</t></is></c>");
        }
        CellValue::Number(n) => {
            out.push_str("\"><v>");
            if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
                out.push_str(int_buf.format(*n as i64));
            } else {
                out.push_str(ryu_buf.format(*n));
            }
            out.push_str("</v></c>");
        }
        CellValue::Bool(b) => {
            out.push_str("\" t=\"b\"><v>");
            out.push(if *b { '1' } else { '0' });
            out.push_str("</v></c>");
        }
        CellValue::Date(dt) => {
            out.push_str("\" s=\"");
            out.push_str(int_buf.format(DATE_STYLE_ID));
            out.push_str("\"><v>");
            out.push_str(ryu_buf.format(excel_serial(dt)));
            out.push_str("</v></c>");
        }
    }
}

/// Excel serial date: whole days since 1899-12-30 plus the fraction of the day.
pub fn excel_serial(dt: &NaiveDateTime) -> f64 {
    let days = i64::from(dt.date().num_days_from_ce()) - EXCEL_EPOCH_DAYS_FROM_CE;
    let seconds = f64::from(dt.time().num_seconds_from_midnight());
    days as f64 + seconds / 86_400.0
}
