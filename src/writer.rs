use crate::drawing::{chart_part_name, drawing_part_name, Drawing};
use crate::types::{Result, XlsxError};
use crate::validation::write_file_atomic;
use crate::workbook::{
    root_relationships, AppProperties, ContentTypes, CoreProperties, Stylesheet, Workbook, WorkbookPart,
};
use crate::worksheet::{SheetPart, Worksheet};
use crate::xml::{ToXml, XmlWriter};
use chrono::Utc;
use mtzip::{level::CompressionLevel, ZipArchive};
use rayon::prelude::*;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    Fast,
    Best,
}

impl Compression {
    fn level(self) -> CompressionLevel {
        match self {
            Compression::Fast => CompressionLevel::fast(),
            Compression::Best => CompressionLevel::best(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Worksheets are serialized on a dedicated pool when this is above 1
    pub num_threads: usize,
    pub compression: Compression,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            num_threads: 1,
            compression: Compression::Fast,
        }
    }
}

/// One serialized package part.
#[derive(Debug, Clone)]
pub struct Part {
    pub name: String,
    pub data: Vec<u8>,
}

impl Part {
    fn new<T: ToXml + ?Sized>(name: String, entity: &T) -> Self {
        let mut xml = XmlWriter::with_capacity(1024);
        entity.to_xml(&mut xml);
        Self {
            name,
            data: xml.into_bytes(),
        }
    }
}

/// Where a worksheet's drawing and charts land in the workbook-wide numbering.
#[derive(Debug, Clone, Copy)]
struct SheetLayout {
    drawing: Option<usize>,
    first_chart: usize,
}

fn sheet_layouts(sheets: &[Worksheet]) -> Vec<SheetLayout> {
    let mut drawings = 0;
    let mut charts = 0;
    sheets
        .iter()
        .map(|sheet| {
            let first_chart = charts + 1;
            let drawing = if sheet.charts().is_empty() {
                None
            } else {
                drawings += 1;
                charts += sheet.charts().len();
                Some(drawings)
            };
            SheetLayout {
                drawing,
                first_chart,
            }
        })
        .collect()
}

fn sheet_parts(index: usize, sheet: &Worksheet, layout: SheetLayout) -> Result<Vec<Part>> {
    let number = index + 1;
    let part = SheetPart::new(sheet, layout.drawing)?;

    let mut parts = vec![Part::new(format!("xl/worksheets/sheet{}.xml", number), &part)];
    if !part.relationships().is_empty() {
        parts.push(Part::new(
            format!("xl/worksheets/_rels/sheet{}.xml.rels", number),
            part.relationships(),
        ));
    }

    if let Some(drawing_number) = layout.drawing {
        let drawing = Drawing::new(sheet.charts(), layout.first_chart)?;
        parts.push(Part::new(drawing_part_name(drawing_number), &drawing));
        parts.push(Part::new(
            format!("xl/drawings/_rels/drawing{}.xml.rels", drawing_number),
            drawing.relationships(),
        ));
        for (i, chart) in sheet.charts().iter().enumerate() {
            parts.push(Part::new(chart_part_name(layout.first_chart + i), &**chart));
        }
    }

    debug!(sheet = sheet.name(), parts = parts.len(), "worksheet serialized");
    Ok(parts)
}

/// Validate `workbook` and serialize every part of its package, in archive order.
pub fn package_parts(workbook: &Workbook, options: &WriteOptions) -> Result<Vec<Part>> {
    let validation = workbook.validate();
    for warning in &validation.warnings {
        warn!("{}", warning);
    }
    validation.to_error("Workbook")?;

    let sheets = workbook.worksheets();
    let layouts = sheet_layouts(sheets);

    let per_sheet: Vec<Vec<Part>> = if options.num_threads > 1 && sheets.len() > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.num_threads)
            .build()
            .map_err(|e| {
                XlsxError::validation("WriteOptions.num_threads", format!("thread pool error: {}", e))
            })?;

        pool.install(|| {
            sheets
                .par_iter()
                .zip(layouts.par_iter())
                .enumerate()
                .map(|(i, (sheet, layout))| sheet_parts(i, sheet, *layout))
                .collect::<Result<Vec<_>>>()
        })?
    } else {
        sheets
            .iter()
            .zip(&layouts)
            .enumerate()
            .map(|(i, (sheet, layout))| sheet_parts(i, sheet, *layout))
            .collect::<Result<Vec<_>>>()?
    };

    let content_types = ContentTypes {
        worksheets: sheets.len(),
        drawings: layouts.iter().filter(|l| l.drawing.is_some()).count(),
        charts: sheets.iter().map(|s| s.charts().len()).sum(),
    };
    let core = CoreProperties {
        creator: workbook.creator(),
        created: workbook.created().unwrap_or_else(Utc::now),
    };
    let app = AppProperties {
        sheet_names: sheets.iter().map(Worksheet::name).collect(),
    };
    let workbook_part = WorkbookPart::new(workbook)?;

    let mut parts = vec![
        Part::new("[Content_Types].xml".to_string(), &content_types),
        Part::new("_rels/.rels".to_string(), &root_relationships()?),
        Part::new("docProps/core.xml".to_string(), &core),
        Part::new("docProps/app.xml".to_string(), &app),
        Part::new("xl/workbook.xml".to_string(), &workbook_part),
        Part::new(
            "xl/_rels/workbook.xml.rels".to_string(),
            workbook_part.relationships(),
        ),
        Part::new("xl/styles.xml".to_string(), &Stylesheet),
    ];
    parts.extend(per_sheet.into_iter().flatten());
    Ok(parts)
}

/// Serialize `workbook` and write it to `filename` as an xlsx archive.
///
/// The archive is written to a temporary file next to `filename` and renamed into
/// place, so a failed write never leaves a truncated file behind.
pub fn write_workbook(workbook: &Workbook, filename: &str, options: &WriteOptions) -> Result<()> {
    let parts = package_parts(workbook, options)?;
    let part_count = parts.len();
    let level = options.compression.level();

    let mut zipper = ZipArchive::new();
    for part in parts {
        zipper
            .add_file_from_memory(part.data, part.name)
            .compression_level(level)
            .done();
    }

    write_file_atomic(filename, |file| {
        zipper
            .write(file)
            .map_err(|e| XlsxError::Archive(e.to_string()))
    })?;

    info!(path = filename, parts = part_count, "workbook written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Chart;
    use crate::reference::CellRange;
    use crate::series::{BarSeries, LineSeries, SeriesOptions};
    use crate::types::CellValue;

    fn names(parts: &[Part]) -> Vec<&str> {
        parts.iter().map(|p| p.name.as_str()).collect()
    }

    fn workbook_with_charts() -> Workbook {
        let mut wb = Workbook::new();
        let data = wb.add_worksheet("Data").unwrap();
        data.add_row(["Month", "Sales"]).unwrap();
        data.add_row(vec![CellValue::from("Jan"), CellValue::from(10)])
            .unwrap();

        wb.add_worksheet("Notes").unwrap();

        let summary = wb.add_worksheet("Summary").unwrap();
        for body in ["B2:B2", "B1:B2"] {
            let mut chart: Chart<BarSeries> = Chart::default();
            chart
                .add_series(
                    BarSeries::new(CellRange::parse("Data", body).unwrap()),
                    SeriesOptions::new(),
                )
                .unwrap();
            summary.add_chart(chart);
        }
        let mut line: Chart<LineSeries> = Chart::default();
        line.add_series(
            LineSeries::new(CellRange::parse("Data", "B2:B2").unwrap()),
            SeriesOptions::new(),
        )
        .unwrap();
        wb.worksheet_mut("Data").unwrap().add_chart(line);
        wb
    }

    #[test]
    fn test_layout_numbers_drawings_and_charts_across_sheets() {
        let wb = workbook_with_charts();
        let layouts = sheet_layouts(wb.worksheets());
        let summary: Vec<(Option<usize>, usize)> =
            layouts.iter().map(|l| (l.drawing, l.first_chart)).collect();
        assert_eq!(summary, vec![(Some(1), 1), (None, 2), (Some(2), 2)]);
    }

    #[test]
    fn test_package_part_names() {
        let wb = workbook_with_charts();
        let parts = package_parts(&wb, &WriteOptions::default()).unwrap();
        assert_eq!(
            names(&parts),
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "docProps/core.xml",
                "docProps/app.xml",
                "xl/workbook.xml",
                "xl/_rels/workbook.xml.rels",
                "xl/styles.xml",
                "xl/worksheets/sheet1.xml",
                "xl/worksheets/_rels/sheet1.xml.rels",
                "xl/drawings/drawing1.xml",
                "xl/drawings/_rels/drawing1.xml.rels",
                "xl/charts/chart1.xml",
                "xl/worksheets/sheet2.xml",
                "xl/worksheets/sheet3.xml",
                "xl/worksheets/_rels/sheet3.xml.rels",
                "xl/drawings/drawing2.xml",
                "xl/drawings/_rels/drawing2.xml.rels",
                "xl/charts/chart2.xml",
                "xl/charts/chart3.xml",
            ]
        );
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let wb = workbook_with_charts();
        let sequential = package_parts(&wb, &WriteOptions::default()).unwrap();
        let parallel = package_parts(
            &wb,
            &WriteOptions {
                num_threads: 4,
                ..WriteOptions::default()
            },
        )
        .unwrap();

        assert_eq!(names(&sequential), names(&parallel));
        for (a, b) in sequential.iter().zip(&parallel) {
            if a.name != "docProps/core.xml" {
                assert_eq!(a.data, b.data, "{} differs", a.name);
            }
        }
    }

    #[test]
    fn test_invalid_workbook_is_not_packaged() {
        let err = package_parts(&Workbook::new(), &WriteOptions::default()).unwrap_err();
        assert!(err.is_validation());
    }
}
