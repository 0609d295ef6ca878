use crate::series::{AxisLayout, Series, SeriesBody, SeriesId, SeriesOptions};
use crate::types::{Result, XlsxError};
use crate::validation::validate_cell_coords;
use crate::xml::{Attr, ToXml, XmlWriter, NS_CHART, NS_DRAWINGML, NS_OFFICE_RELATIONSHIPS};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const CATEGORY_AXIS_ID: u32 = 500_000_001;
const VALUE_AXIS_ID: u32 = 500_000_002;

/// Anchor of a chart on its worksheet, in zero-based cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartPosition {
    pub from_col: usize,
    pub from_row: usize,
    pub to_col: usize,
    pub to_row: usize,
}

impl ChartPosition {
    pub fn new(from_col: usize, from_row: usize, to_col: usize, to_row: usize) -> Result<Self> {
        validate_cell_coords(from_row, from_col, "ChartPosition start")?;
        validate_cell_coords(to_row, to_col, "ChartPosition end")?;
        if to_col <= from_col || to_row <= from_row {
            return Err(XlsxError::validation(
                "ChartPosition",
                format!(
                    "chart must span at least one cell: ({},{}) to ({},{})",
                    from_col, from_row, to_col, to_row
                ),
            ));
        }
        Ok(Self {
            from_col,
            from_row,
            to_col,
            to_row,
        })
    }
}

impl Default for ChartPosition {
    fn default() -> Self {
        Self {
            from_col: 0,
            from_row: 0,
            to_col: 10,
            to_row: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegendPosition {
    #[default]
    Right,
    Left,
    Top,
    Bottom,
}

impl LegendPosition {
    fn as_str(&self) -> &'static str {
        match self {
            LegendPosition::Right => "r",
            LegendPosition::Left => "l",
            LegendPosition::Top => "t",
            LegendPosition::Bottom => "b",
        }
    }
}

static NEXT_CHART_TAG: AtomicU64 = AtomicU64::new(1);

/// A chart and the series it owns.
///
/// Series are created through [`Chart::add_series`] and addressed by [`SeriesId`].
/// Their index is the current position in the chart's collection and is looked up
/// on every query.
#[derive(Debug, Clone)]
pub struct Chart<B: SeriesBody> {
    title: Option<String>,
    legend: Option<LegendPosition>,
    position: ChartPosition,
    series: Vec<Series<B>>,
    tag: u64,
    next_series_id: u32,
}

impl<B: SeriesBody> Default for Chart<B> {
    fn default() -> Self {
        Self::new(ChartPosition::default())
    }
}

impl<B: SeriesBody> Chart<B> {
    pub fn new(position: ChartPosition) -> Self {
        Self {
            title: None,
            legend: Some(LegendPosition::default()),
            position,
            series: Vec::new(),
            tag: NEXT_CHART_TAG.fetch_add(1, Ordering::Relaxed),
            next_series_id: 0,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn clear_title(&mut self) {
        self.title = None;
    }

    pub fn legend(&self) -> Option<LegendPosition> {
        self.legend
    }

    /// `None` hides the legend
    pub fn set_legend(&mut self, legend: Option<LegendPosition>) {
        self.legend = legend;
    }

    pub fn position(&self) -> ChartPosition {
        self.position
    }

    pub fn set_position(&mut self, position: ChartPosition) {
        self.position = position;
    }

    /// Create a series, apply `options`, then append it to this chart.
    ///
    /// If an option fails validation the chart is left untouched.
    pub fn add_series(&mut self, body: B, options: SeriesOptions) -> Result<SeriesId> {
        let id = SeriesId::new(self.tag, self.next_series_id);
        let mut series = Series::new(id, body);
        series.apply(options)?;

        self.next_series_id += 1;
        self.series.push(series);
        debug!(chart = B::GROUP, series = id.seq(), index = self.series.len() - 1, "series added");
        Ok(id)
    }

    /// Current zero-based position of `id`, recomputed on every call.
    pub fn index_of(&self, id: SeriesId) -> Option<usize> {
        self.series.iter().position(|s| s.id() == id)
    }

    /// Explicit order if one was set, otherwise the index.
    pub fn order_of(&self, id: SeriesId) -> Option<u32> {
        let index = self.index_of(id)?;
        let series = &self.series[index];
        Some(
            series
                .explicit_order()
                .unwrap_or_else(|| u32::try_from(index).unwrap_or(u32::MAX)),
        )
    }

    pub fn series(&self, id: SeriesId) -> Option<&Series<B>> {
        self.series.iter().find(|s| s.id() == id)
    }

    pub fn series_mut(&mut self, id: SeriesId) -> Option<&mut Series<B>> {
        self.series.iter_mut().find(|s| s.id() == id)
    }

    pub fn remove_series(&mut self, id: SeriesId) -> Option<Series<B>> {
        let index = self.index_of(id)?;
        debug!(chart = B::GROUP, series = id.seq(), index, "series removed");
        Some(self.series.remove(index))
    }

    /// Move `id` to position `to`, shifting the series in between.
    pub fn move_series(&mut self, id: SeriesId, to: usize) -> Result<()> {
        let Some(from) = self.index_of(id) else {
            return Err(XlsxError::validation(
                "Chart.move_series",
                format!("series {} does not belong to this chart", id.seq()),
            ));
        };
        if to >= self.series.len() {
            return Err(XlsxError::validation(
                "Chart.move_series",
                format!(
                    "position {} is out of range for {} series",
                    to,
                    self.series.len()
                ),
            ));
        }
        let series = self.series.remove(from);
        self.series.insert(to, series);
        Ok(())
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Series in chart order, paired with their current index.
    pub fn iter_series(&self) -> impl Iterator<Item = (usize, &Series<B>)> {
        self.series.iter().enumerate()
    }

    fn write_title(&self, xml: &mut XmlWriter) {
        let Some(title) = &self.title else {
            return;
        };
        xml.element("c:title", &[], |xml| {
            xml.element("c:tx", &[], |xml| {
                xml.element("c:rich", &[], |xml| {
                    xml.empty("a:bodyPr", &[]);
                    xml.empty("a:lstStyle", &[]);
                    xml.element("a:p", &[], |xml| {
                        xml.element("a:r", &[], |xml| {
                            xml.string_element("a:t", &[], title);
                        });
                    });
                });
            });
            xml.empty("c:overlay", &[("val", Attr::Bool(false))]);
        });
    }

    fn write_group(&self, xml: &mut XmlWriter) {
        xml.element(B::GROUP, &[], |xml| {
            B::write_group_prefix(xml);
            for (index, series) in self.iter_series() {
                series.write(xml, index);
            }
            B::write_group_suffix(xml);
            if B::AXES != AxisLayout::None {
                xml.empty("c:axId", &[("val", Attr::UInt(CATEGORY_AXIS_ID as u64))]);
                xml.empty("c:axId", &[("val", Attr::UInt(VALUE_AXIS_ID as u64))]);
            }
        });
    }

    fn write_axes(&self, xml: &mut XmlWriter) {
        match B::AXES {
            AxisLayout::None => {}
            AxisLayout::CategoryValue => {
                write_axis(xml, "c:catAx", CATEGORY_AXIS_ID, VALUE_AXIS_ID, "b");
                write_axis(xml, "c:valAx", VALUE_AXIS_ID, CATEGORY_AXIS_ID, "l");
            }
            AxisLayout::ValueValue => {
                write_axis(xml, "c:valAx", CATEGORY_AXIS_ID, VALUE_AXIS_ID, "b");
                write_axis(xml, "c:valAx", VALUE_AXIS_ID, CATEGORY_AXIS_ID, "l");
            }
        }
    }
}

fn write_axis(xml: &mut XmlWriter, name: &str, id: u32, cross_id: u32, position: &str) {
    xml.element(name, &[], |xml| {
        xml.empty("c:axId", &[("val", Attr::UInt(id as u64))]);
        xml.element("c:scaling", &[], |xml| {
            xml.empty("c:orientation", &[("val", Attr::Str("minMax"))]);
        });
        xml.empty("c:delete", &[("val", Attr::Bool(false))]);
        xml.empty("c:axPos", &[("val", Attr::Str(position))]);
        xml.empty("c:crossAx", &[("val", Attr::UInt(cross_id as u64))]);
    });
}

impl<B: SeriesBody> ToXml for Chart<B> {
    fn to_xml(&self, xml: &mut XmlWriter) {
        xml.declaration();
        xml.element(
            "c:chartSpace",
            &[
                ("xmlns:c", Attr::Str(NS_CHART)),
                ("xmlns:a", Attr::Str(NS_DRAWINGML)),
                ("xmlns:r", Attr::Str(NS_OFFICE_RELATIONSHIPS)),
            ],
            |xml| {
                xml.empty("c:roundedCorners", &[("val", Attr::Bool(false))]);
                xml.element("c:chart", &[], |xml| {
                    self.write_title(xml);
                    xml.empty(
                        "c:autoTitleDeleted",
                        &[("val", Attr::Bool(self.title.is_none()))],
                    );
                    xml.element("c:plotArea", &[], |xml| {
                        xml.empty("c:layout", &[]);
                        self.write_group(xml);
                        self.write_axes(xml);
                    });
                    if let Some(legend) = self.legend {
                        xml.element("c:legend", &[], |xml| {
                            xml.empty("c:legendPos", &[("val", Attr::Str(legend.as_str()))]);
                            xml.empty("c:overlay", &[("val", Attr::Bool(false))]);
                        });
                    }
                    xml.empty("c:plotVisOnly", &[("val", Attr::Bool(true))]);
                    xml.empty("c:dispBlanksAs", &[("val", Attr::Str("gap"))]);
                });
            },
        );
    }
}

/// Type-erased chart, as stored by a worksheet.
pub trait ChartPart: ToXml + fmt::Debug + Send + Sync {
    fn position(&self) -> ChartPosition;

    /// Names of the sheets the chart reads from
    fn referenced_sheets(&self) -> Vec<&str>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<B: SeriesBody> ChartPart for Chart<B> {
    fn position(&self) -> ChartPosition {
        self.position
    }

    fn referenced_sheets(&self) -> Vec<&str> {
        let mut sheets: Vec<&str> = Vec::new();
        for series in &self.series {
            let title_sheet = series.title().and_then(|t| t.cell()).map(|c| c.sheet());
            let range_sheets = series.body().ranges().into_iter().map(|r| r.sheet());
            for sheet in range_sheets.chain(title_sheet) {
                if !sheets.contains(&sheet) {
                    sheets.push(sheet);
                }
            }
        }
        sheets
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::CellRange;
    use crate::series::{BarSeries, PieSeries, ScatterSeries};

    fn data_range(sheet: &str, range: &str) -> Result<CellRange> {
        CellRange::parse(sheet, range)
    }

    fn bar(range: &str) -> BarSeries {
        BarSeries::new(data_range("Sheet1", range).unwrap())
    }

    #[test]
    fn test_order_follows_index() {
        let mut chart: Chart<BarSeries> = Chart::default();
        let a = chart.add_series(bar("B2:B4"), SeriesOptions::new()).unwrap();
        let b = chart.add_series(bar("C2:C4"), SeriesOptions::new()).unwrap();
        let c = chart.add_series(bar("D2:D4"), SeriesOptions::new()).unwrap();

        assert_eq!(chart.index_of(c), Some(2));
        assert_eq!(chart.order_of(c), Some(2));

        chart.remove_series(a);
        assert_eq!(chart.index_of(b), Some(0));
        assert_eq!(chart.index_of(c), Some(1));
        assert_eq!(chart.order_of(c), Some(1));
        assert_eq!(chart.index_of(a), None);
        assert_eq!(chart.order_of(a), None);

        let d = chart.add_series(bar("E2:E4"), SeriesOptions::new()).unwrap();
        chart.move_series(d, 0).unwrap();
        assert_eq!(chart.order_of(d), Some(0));
        assert_eq!(chart.order_of(b), Some(1));
        assert_eq!(chart.order_of(c), Some(2));
    }

    #[test]
    fn test_explicit_order_overrides_index() {
        let mut chart: Chart<BarSeries> = Chart::default();
        let a = chart
            .add_series(bar("B2:B4"), SeriesOptions::new().order(5))
            .unwrap();
        assert_eq!(chart.index_of(a), Some(0));
        assert_eq!(chart.order_of(a), Some(5));

        chart.series_mut(a).unwrap().clear_order();
        assert_eq!(chart.order_of(a), Some(0));
    }

    #[test]
    fn test_failed_options_leave_chart_unchanged() {
        let mut chart: Chart<BarSeries> = Chart::default();
        chart.add_series(bar("B2:B4"), SeriesOptions::new()).unwrap();

        let err = chart
            .add_series(bar("C2:C4"), SeriesOptions::new().title("ok").order(-2))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(chart.series_count(), 1);

        let next = chart.add_series(bar("D2:D4"), SeriesOptions::new()).unwrap();
        assert_eq!(chart.index_of(next), Some(1));
    }

    #[test]
    fn test_move_series_bounds() {
        let mut chart: Chart<BarSeries> = Chart::default();
        let a = chart.add_series(bar("B2:B4"), SeriesOptions::new()).unwrap();
        assert!(chart.move_series(a, 1).is_err());

        let removed = chart.remove_series(a).unwrap();
        assert!(chart.move_series(removed.id(), 0).is_err());
    }

    #[test]
    fn test_series_ids_do_not_cross_charts() {
        let mut first: Chart<BarSeries> = Chart::default();
        let mut second: Chart<BarSeries> = Chart::default();
        let a = first.add_series(bar("B2:B4"), SeriesOptions::new()).unwrap();
        let b = second.add_series(bar("C2:C4"), SeriesOptions::new()).unwrap();

        assert_eq!(a.seq(), b.seq());
        assert_ne!(a, b);
        assert!(second.series_mut(a).is_none());
        assert_eq!(second.index_of(a), None);
        assert!(second.remove_series(a).is_none());
        assert!(second.move_series(a, 0).is_err());
        assert_eq!(second.series_count(), 1);

        let copy = first.clone();
        assert_eq!(copy.index_of(a), Some(0));
    }

    #[test]
    fn test_bar_chart_xml() {
        let mut chart: Chart<BarSeries> = Chart::default();
        chart.set_title("Sales");
        chart
            .add_series(
                bar("B2:B4").with_categories(data_range("Sheet1", "A2:A4").unwrap()),
                SeriesOptions::new().title("North"),
            )
            .unwrap();
        chart.add_series(bar("C2:C4"), SeriesOptions::new()).unwrap();

        let xml = chart.to_xml_string();
        assert!(xml.contains("<c:barChart><c:barDir val=\"col\"/>"));
        assert!(xml.contains("<c:ser><c:idx val=\"0\"/><c:order val=\"0\"/><c:tx><c:v>North</c:v></c:tx>"));
        assert!(xml.contains("<c:ser><c:idx val=\"1\"/><c:order val=\"1\"/><c:invertIfNegative"));
        assert!(xml.contains("<c:catAx><c:axId val=\"500000001\"/>"));
        assert!(xml.contains("<a:t>Sales</a:t>"));
        assert!(xml.contains("<c:autoTitleDeleted val=\"0\"/>"));
        assert!(xml.contains("<c:legendPos val=\"r\"/>"));
    }

    #[test]
    fn test_pie_chart_has_no_axes() {
        let mut chart: Chart<PieSeries> = Chart::default();
        chart.set_legend(None);
        chart
            .add_series(
                PieSeries::new(data_range("Sheet1", "B2:B4").unwrap()),
                SeriesOptions::new(),
            )
            .unwrap();

        let xml = chart.to_xml_string();
        assert!(xml.contains("<c:pieChart><c:varyColors val=\"1\"/><c:ser>"));
        assert!(!xml.contains("c:axId"));
        assert!(!xml.contains("c:legend"));
        assert!(xml.contains("<c:autoTitleDeleted val=\"1\"/>"));
    }

    #[test]
    fn test_scatter_uses_two_value_axes() {
        let mut chart: Chart<ScatterSeries> = Chart::default();
        chart
            .add_series(
                ScatterSeries::new(
                    data_range("Data", "A2:A9").unwrap(),
                    data_range("Data", "B2:B9").unwrap(),
                ),
                SeriesOptions::new(),
            )
            .unwrap();

        let xml = chart.to_xml_string();
        assert_eq!(xml.matches("<c:valAx>").count(), 2);
        assert!(!xml.contains("c:catAx"));
        assert_eq!(chart.referenced_sheets(), vec!["Data"]);
    }

    #[test]
    fn test_chart_position_validation() {
        assert!(ChartPosition::new(0, 0, 5, 10).is_ok());
        assert!(ChartPosition::new(5, 0, 5, 10).is_err());
        assert!(ChartPosition::new(0, 0, crate::validation::MAX_COLS, 10).is_err());
    }

    #[test]
    fn test_downcast_through_chart_part() {
        let mut boxed: Box<dyn ChartPart> = Box::new(Chart::<BarSeries>::default());
        let chart = boxed
            .as_any_mut()
            .downcast_mut::<Chart<BarSeries>>()
            .unwrap();
        chart.add_series(bar("B2:B4"), SeriesOptions::new()).unwrap();
        assert!(boxed.as_any().downcast_ref::<Chart<PieSeries>>().is_none());
    }
}
