//! Chart series: the common envelope plus the per-chart-type bodies.
//!
//! A [`Series`] only exists inside the [`Chart`](crate::chart::Chart) that created it.
//! Its index is never stored; the chart derives it from the series' position every
//! time it is asked, so reordering or removing siblings keeps `idx`/`order` honest.
use crate::reference::{CellRange, CellRef};
use crate::types::{Result, Value, XlsxError};
use crate::validation::validate_unsigned_int;
use crate::xml::{Attr, ToXml, XmlWriter};
use std::fmt;

/// Longest text Excel stores in a single string
const MAX_TITLE_LEN: usize = 32_767;

/// Stable handle to a series inside its chart. Unlike the index, it survives
/// reordering and removal of other series.
///
/// The handle carries a tag of the chart that issued it, so another chart never
/// resolves it. A cloned chart keeps the tag and answers the same handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesId {
    chart: u64,
    seq: u32,
}

impl SeriesId {
    pub(crate) fn new(chart: u64, seq: u32) -> Self {
        Self { chart, seq }
    }

    /// Creation sequence number within the issuing chart.
    pub fn seq(&self) -> u32 {
        self.seq
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TitleSource {
    Text(String),
    Cell { cell: CellRef, cached: Option<String> },
}

/// Series name, either literal text or a reference to the cell holding it.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTitle {
    source: TitleSource,
}

impl SeriesTitle {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        validate_title_text(&text)?;
        Ok(Self {
            source: TitleSource::Text(text),
        })
    }

    pub fn from_cell(cell: CellRef) -> Self {
        Self {
            source: TitleSource::Cell { cell, cached: None },
        }
    }

    /// Cell reference with the value Excel should display before recalculating.
    pub fn from_cell_with_cache(cell: CellRef, cached: impl Into<String>) -> Result<Self> {
        let cached = cached.into();
        validate_title_text(&cached)?;
        Ok(Self {
            source: TitleSource::Cell {
                cell,
                cached: Some(cached),
            },
        })
    }

    pub fn text(&self) -> Option<&str> {
        match &self.source {
            TitleSource::Text(text) => Some(text),
            TitleSource::Cell { cached, .. } => cached.as_deref(),
        }
    }

    pub fn cell(&self) -> Option<&CellRef> {
        match &self.source {
            TitleSource::Text(_) => None,
            TitleSource::Cell { cell, .. } => Some(cell),
        }
    }
}

fn validate_title_text(text: &str) -> Result<()> {
    let len = text.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(XlsxError::validation(
            "Series.title",
            format!("title has {} characters, at most {} allowed", len, MAX_TITLE_LEN),
        ));
    }
    Ok(())
}

impl ToXml for SeriesTitle {
    fn to_xml(&self, xml: &mut XmlWriter) {
        xml.element("c:tx", &[], |xml| match &self.source {
            TitleSource::Text(text) => xml.string_element("c:v", &[], text),
            TitleSource::Cell { cell, cached } => {
                xml.element("c:strRef", &[], |xml| {
                    xml.text_element("c:f", &[], &cell.formula());
                    if let Some(cached) = cached {
                        xml.element("c:strCache", &[], |xml| {
                            xml.empty("c:ptCount", &[("val", Attr::UInt(1))]);
                            xml.element("c:pt", &[("idx", Attr::UInt(0))], |xml| {
                                xml.string_element("c:v", &[], cached);
                            });
                        });
                    }
                });
            }
        });
    }
}

/// Anything `Series::set_title` accepts. Plain text and cell references are
/// promoted to a [`SeriesTitle`].
#[derive(Debug, Clone, PartialEq)]
pub enum TitleInput {
    Text(String),
    Cell(CellRef),
    Title(SeriesTitle),
}

impl TitleInput {
    fn into_title(self) -> Result<SeriesTitle> {
        match self {
            TitleInput::Text(text) => SeriesTitle::new(text),
            TitleInput::Cell(cell) => Ok(SeriesTitle::from_cell(cell)),
            TitleInput::Title(title) => Ok(title),
        }
    }
}

impl From<&str> for TitleInput {
    fn from(v: &str) -> Self {
        TitleInput::Text(v.to_string())
    }
}

impl From<String> for TitleInput {
    fn from(v: String) -> Self {
        TitleInput::Text(v)
    }
}

impl From<CellRef> for TitleInput {
    fn from(v: CellRef) -> Self {
        TitleInput::Cell(v)
    }
}

impl From<SeriesTitle> for TitleInput {
    fn from(v: SeriesTitle) -> Self {
        TitleInput::Title(v)
    }
}

/// Options applied when a series is created.
#[derive(Debug, Clone, Default)]
pub struct SeriesOptions {
    order: Option<Value>,
    title: Option<TitleInput>,
}

impl SeriesOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(mut self, order: impl Into<Value>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn title(mut self, title: impl Into<TitleInput>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Which axes a chart group needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisLayout {
    None,
    CategoryValue,
    ValueValue,
}

/// Type-specific content of a series.
///
/// The series envelope writes `c:idx`, `c:order` and `c:tx`; the body appends
/// everything that follows them. The associated items describe the chart group
/// element the series belongs to.
pub trait SeriesBody: fmt::Debug + Send + Sync + 'static {
    /// Plot-area group element, e.g. `c:barChart`
    const GROUP: &'static str;
    const AXES: AxisLayout;

    /// Group children that precede the series
    fn write_group_prefix(xml: &mut XmlWriter);

    /// Group children between the series and the axis ids
    fn write_group_suffix(_xml: &mut XmlWriter) {}

    fn write_body(&self, xml: &mut XmlWriter);

    /// Ranges the body reads its data from
    fn ranges(&self) -> Vec<&CellRange>;
}

/// A series owned by a chart.
#[derive(Debug, Clone)]
pub struct Series<B> {
    id: SeriesId,
    order: Option<u32>,
    title: Option<SeriesTitle>,
    body: B,
}

impl<B: SeriesBody> Series<B> {
    pub(crate) fn new(id: SeriesId, body: B) -> Self {
        Self {
            id,
            order: None,
            title: None,
            body,
        }
    }

    pub fn id(&self) -> SeriesId {
        self.id
    }

    /// The explicit order override, if one was set.
    /// Use [`Chart::order_of`](crate::chart::Chart::order_of) for the effective order.
    pub fn explicit_order(&self) -> Option<u32> {
        self.order
    }

    pub fn title(&self) -> Option<&SeriesTitle> {
        self.title.as_ref()
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    pub fn set_order(&mut self, order: impl Into<Value>) -> Result<()> {
        self.order = Some(validate_unsigned_int("Series.order", &order.into())?);
        Ok(())
    }

    /// Drop the override so the order follows the index again.
    pub fn clear_order(&mut self) {
        self.order = None;
    }

    pub fn set_title(&mut self, title: impl Into<TitleInput>) -> Result<()> {
        self.title = Some(title.into().into_title()?);
        Ok(())
    }

    pub fn clear_title(&mut self) {
        self.title = None;
    }

    pub(crate) fn apply(&mut self, options: SeriesOptions) -> Result<()> {
        if let Some(order) = options.order {
            self.set_order(order)?;
        }
        if let Some(title) = options.title {
            self.set_title(title)?;
        }
        Ok(())
    }

    /// Write the `c:ser` element for a series sitting at `index` in its chart.
    pub(crate) fn write(&self, xml: &mut XmlWriter, index: usize) {
        let order = self.order.map_or(index as u64, u64::from);
        xml.element("c:ser", &[], |xml| {
            xml.empty("c:idx", &[("val", Attr::UInt(index as u64))]);
            xml.empty("c:order", &[("val", Attr::UInt(order))]);
            if let Some(title) = &self.title {
                title.to_xml(xml);
            }
            self.body.write_body(xml);
        });
    }
}

fn write_str_ref(xml: &mut XmlWriter, name: &str, range: &CellRange) {
    xml.element(name, &[], |xml| {
        xml.element("c:strRef", &[], |xml| {
            xml.text_element("c:f", &[], &range.formula());
        });
    });
}

fn write_num_ref(xml: &mut XmlWriter, name: &str, range: &CellRange) {
    xml.element(name, &[], |xml| {
        xml.element("c:numRef", &[], |xml| {
            xml.text_element("c:f", &[], &range.formula());
        });
    });
}

fn collect_ranges<'a>(ranges: [Option<&'a CellRange>; 2]) -> Vec<&'a CellRange> {
    ranges.into_iter().flatten().collect()
}

// ============================================================================
// Bar
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub categories: Option<CellRange>,
    pub values: CellRange,
    pub invert_if_negative: bool,
}

impl BarSeries {
    pub fn new(values: CellRange) -> Self {
        Self {
            categories: None,
            values,
            invert_if_negative: false,
        }
    }

    pub fn with_categories(mut self, categories: CellRange) -> Self {
        self.categories = Some(categories);
        self
    }
}

impl SeriesBody for BarSeries {
    const GROUP: &'static str = "c:barChart";
    const AXES: AxisLayout = AxisLayout::CategoryValue;

    fn write_group_prefix(xml: &mut XmlWriter) {
        xml.empty("c:barDir", &[("val", Attr::Str("col"))]);
        xml.empty("c:grouping", &[("val", Attr::Str("clustered"))]);
        xml.empty("c:varyColors", &[("val", Attr::Bool(false))]);
    }

    fn write_group_suffix(xml: &mut XmlWriter) {
        xml.empty("c:gapWidth", &[("val", Attr::UInt(150))]);
    }

    fn write_body(&self, xml: &mut XmlWriter) {
        xml.empty(
            "c:invertIfNegative",
            &[("val", Attr::Bool(self.invert_if_negative))],
        );
        if let Some(categories) = &self.categories {
            write_str_ref(xml, "c:cat", categories);
        }
        write_num_ref(xml, "c:val", &self.values);
    }

    fn ranges(&self) -> Vec<&CellRange> {
        collect_ranges([self.categories.as_ref(), Some(&self.values)])
    }
}

// ============================================================================
// Line
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub categories: Option<CellRange>,
    pub values: CellRange,
    pub show_marker: bool,
    pub smooth: bool,
}

impl LineSeries {
    pub fn new(values: CellRange) -> Self {
        Self {
            categories: None,
            values,
            show_marker: true,
            smooth: false,
        }
    }

    pub fn with_categories(mut self, categories: CellRange) -> Self {
        self.categories = Some(categories);
        self
    }
}

impl SeriesBody for LineSeries {
    const GROUP: &'static str = "c:lineChart";
    const AXES: AxisLayout = AxisLayout::CategoryValue;

    fn write_group_prefix(xml: &mut XmlWriter) {
        xml.empty("c:grouping", &[("val", Attr::Str("standard"))]);
        xml.empty("c:varyColors", &[("val", Attr::Bool(false))]);
    }

    fn write_group_suffix(xml: &mut XmlWriter) {
        xml.empty("c:marker", &[("val", Attr::Bool(true))]);
    }

    fn write_body(&self, xml: &mut XmlWriter) {
        if !self.show_marker {
            xml.element("c:marker", &[], |xml| {
                xml.empty("c:symbol", &[("val", Attr::Str("none"))]);
            });
        }
        if let Some(categories) = &self.categories {
            write_str_ref(xml, "c:cat", categories);
        }
        write_num_ref(xml, "c:val", &self.values);
        xml.empty("c:smooth", &[("val", Attr::Bool(self.smooth))]);
    }

    fn ranges(&self) -> Vec<&CellRange> {
        collect_ranges([self.categories.as_ref(), Some(&self.values)])
    }
}

// ============================================================================
// Pie
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PieSeries {
    pub categories: Option<CellRange>,
    pub values: CellRange,
    explosion: Option<u32>,
}

impl PieSeries {
    pub fn new(values: CellRange) -> Self {
        Self {
            categories: None,
            values,
            explosion: None,
        }
    }

    pub fn with_categories(mut self, categories: CellRange) -> Self {
        self.categories = Some(categories);
        self
    }

    pub fn explosion(&self) -> Option<u32> {
        self.explosion
    }

    /// Distance slices are pulled from the center, as a percentage of the radius.
    pub fn set_explosion(&mut self, explosion: impl Into<Value>) -> Result<()> {
        self.explosion = Some(validate_unsigned_int("PieSeries.explosion", &explosion.into())?);
        Ok(())
    }
}

impl SeriesBody for PieSeries {
    const GROUP: &'static str = "c:pieChart";
    const AXES: AxisLayout = AxisLayout::None;

    fn write_group_prefix(xml: &mut XmlWriter) {
        xml.empty("c:varyColors", &[("val", Attr::Bool(true))]);
    }

    fn write_group_suffix(xml: &mut XmlWriter) {
        xml.empty("c:firstSliceAng", &[("val", Attr::UInt(0))]);
    }

    fn write_body(&self, xml: &mut XmlWriter) {
        if let Some(explosion) = self.explosion {
            xml.empty("c:explosion", &[("val", Attr::UInt(explosion as u64))]);
        }
        if let Some(categories) = &self.categories {
            write_str_ref(xml, "c:cat", categories);
        }
        write_num_ref(xml, "c:val", &self.values);
    }

    fn ranges(&self) -> Vec<&CellRange> {
        collect_ranges([self.categories.as_ref(), Some(&self.values)])
    }
}

// ============================================================================
// Scatter
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterSeries {
    pub x_values: CellRange,
    pub y_values: CellRange,
    pub smooth: bool,
}

impl ScatterSeries {
    pub fn new(x_values: CellRange, y_values: CellRange) -> Self {
        Self {
            x_values,
            y_values,
            smooth: false,
        }
    }
}

impl SeriesBody for ScatterSeries {
    const GROUP: &'static str = "c:scatterChart";
    const AXES: AxisLayout = AxisLayout::ValueValue;

    fn write_group_prefix(xml: &mut XmlWriter) {
        xml.empty("c:scatterStyle", &[("val", Attr::Str("lineMarker"))]);
        xml.empty("c:varyColors", &[("val", Attr::Bool(false))]);
    }

    fn write_body(&self, xml: &mut XmlWriter) {
        write_num_ref(xml, "c:xVal", &self.x_values);
        write_num_ref(xml, "c:yVal", &self.y_values);
        xml.empty("c:smooth", &[("val", Attr::Bool(self.smooth))]);
    }

    fn ranges(&self) -> Vec<&CellRange> {
        vec![&self.x_values, &self.y_values]
    }
}
