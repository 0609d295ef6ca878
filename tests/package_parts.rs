use pretty_assertions::assert_eq;
use sheetdom::{
    package_parts, write_workbook, BarSeries, CellRange, CellRef, CellValue, Chart, ChartPosition,
    LineSeries, Part, PieSeries, SeriesOptions, SeriesTitle, Workbook, WriteOptions,
};
use std::collections::{HashMap, HashSet};

const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

fn sample_workbook() -> Workbook {
    let mut wb = Workbook::new();
    wb.set_creator("Reporting");

    let data = wb.add_worksheet("Quarterly Data").unwrap();
    data.add_row(["Quarter", "North", "South"]).unwrap();
    for (q, north, south) in [("Q1", 10.0, 7.5), ("Q2", 12.0, 9.0), ("Q3", 8.0, 11.25)] {
        data.add_row([CellValue::from(q), CellValue::from(north), CellValue::from(south)])
            .unwrap();
    }
    data.add_hyperlink(0, 0, "https://example.com/quarters?x=1&y=2").unwrap();
    data.page_margins_mut().set([("top", 0.5), ("bottom", 0.5)]).unwrap();

    let mut bar: Chart<BarSeries> = Chart::new(ChartPosition::new(4, 1, 12, 16).unwrap());
    bar.set_title("By region");
    for (col, header) in [("B", "B1"), ("C", "C1")] {
        let values = CellRange::parse("Quarterly Data", &format!("{col}2:{col}4")).unwrap();
        let categories = CellRange::parse("Quarterly Data", "A2:A4").unwrap();
        let title = SeriesTitle::from_cell(CellRef::parse("Quarterly Data", header).unwrap());
        bar.add_series(
            BarSeries::new(values).with_categories(categories),
            SeriesOptions::new().title(title),
        )
        .unwrap();
    }
    data.add_chart(bar);

    let summary = wb.add_worksheet("Summary").unwrap();
    summary.add_row(["See charts"]).unwrap();

    let mut pie: Chart<PieSeries> = Chart::default();
    pie.add_series(
        PieSeries::new(CellRange::parse("Quarterly Data", "B2:B4").unwrap()),
        SeriesOptions::new().title("North share"),
    )
    .unwrap();
    summary.add_chart(pie);

    let mut line: Chart<LineSeries> = Chart::new(ChartPosition::new(0, 20, 10, 35).unwrap());
    line.add_series(
        LineSeries::new(CellRange::parse("Quarterly Data", "C2:C4").unwrap()),
        SeriesOptions::new().order(3),
    )
    .unwrap();
    summary.add_chart(line);

    wb
}

fn parts_by_name(parts: &[Part]) -> HashMap<&str, &str> {
    parts
        .iter()
        .map(|p| (p.name.as_str(), std::str::from_utf8(&p.data).unwrap()))
        .collect()
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
fn rels_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target relative to the source part's directory.
fn resolve(source: &str, target: &str) -> String {
    let mut segments: Vec<&str> = source.split('/').collect();
    segments.pop();
    for segment in target.split('/') {
        match segment {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            s => segments.push(s),
        }
    }
    segments.join("/")
}

#[test]
fn every_part_is_well_formed_xml() {
    let wb = sample_workbook();
    let parts = package_parts(&wb, &WriteOptions::default()).unwrap();

    for part in &parts {
        let text = std::str::from_utf8(&part.data).unwrap();
        assert!(
            text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"),
            "{} has no declaration",
            part.name
        );
        if let Err(e) = roxmltree::Document::parse(text) {
            panic!("{} is not well-formed: {}", part.name, e);
        }
    }
}

#[test]
fn relationship_ids_resolve() {
    let wb = sample_workbook();
    let parts = package_parts(&wb, &WriteOptions::default()).unwrap();
    let by_name = parts_by_name(&parts);

    let mut checked = 0;
    for (name, text) in &by_name {
        if name.ends_with(".rels") {
            continue;
        }
        let doc = roxmltree::Document::parse(text).unwrap();
        let used: Vec<&str> = doc
            .descendants()
            .filter_map(|n| n.attribute((NS_R, "id")))
            .collect();
        if used.is_empty() {
            continue;
        }

        let rels_part = rels_name(name);
        let rels_text = by_name
            .get(rels_part.as_str())
            .unwrap_or_else(|| panic!("{} references ids but has no {}", name, rels_part));
        let rels_doc = roxmltree::Document::parse(rels_text).unwrap();

        let mut declared = HashSet::new();
        for rel in rels_doc.descendants().filter(|n| n.has_tag_name("Relationship")) {
            let id = rel.attribute("Id").unwrap();
            assert!(declared.insert(id), "{} declares {} twice", rels_part, id);

            if rel.attribute("TargetMode") != Some("External") {
                let target = resolve(name, rel.attribute("Target").unwrap());
                assert!(by_name.contains_key(target.as_str()), "{} -> missing {}", name, target);
            }
        }

        for id in used {
            assert!(declared.contains(id), "{} uses undeclared {}", name, id);
            checked += 1;
        }
    }

    // workbook sheets, sheet1 link and drawing, sheet2 drawing, one anchor per chart
    assert_eq!(checked, 2 + 2 + 1 + 3);
}

#[test]
fn package_contents() {
    let wb = sample_workbook();
    let parts = package_parts(&wb, &WriteOptions::default()).unwrap();
    let by_name = parts_by_name(&parts);

    let sheet1 = by_name["xl/worksheets/sheet1.xml"];
    assert!(sheet1.contains("<hyperlinks><hyperlink ref=\"A1\" r:id=\"rId1\"/></hyperlinks>"));
    assert!(sheet1.contains(
        "<pageMargins left=\"0.75\" right=\"0.75\" top=\"0.5\" bottom=\"0.5\" header=\"0.5\" footer=\"0.5\"/>"
    ));
    assert!(sheet1.ends_with("<drawing r:id=\"rId2\"/></worksheet>"));

    let sheet2 = by_name["xl/worksheets/sheet2.xml"];
    assert!(!sheet2.contains("pageMargins"));

    let sheet1_rels = by_name["xl/worksheets/_rels/sheet1.xml.rels"];
    assert!(sheet1_rels.contains(
        "Target=\"https://example.com/quarters?x=1&amp;y=2\" TargetMode=\"External\"/>"
    ));

    let chart1 = by_name["xl/charts/chart1.xml"];
    assert!(chart1.contains(
        "<c:ser><c:idx val=\"1\"/><c:order val=\"1\"/><c:tx><c:strRef><c:f>&apos;Quarterly Data&apos;!$C$1</c:f></c:strRef></c:tx>"
    ));

    let chart3 = by_name["xl/charts/chart3.xml"];
    assert!(chart3.contains("<c:ser><c:idx val=\"0\"/><c:order val=\"3\"/>"));

    let content_types = by_name["[Content_Types].xml"];
    for n in 1..=3 {
        assert!(content_types.contains(&format!("PartName=\"/xl/charts/chart{}.xml\"", n)));
    }

    let app = by_name["docProps/app.xml"];
    assert!(app.contains("<vt:lpstr>Quarterly Data</vt:lpstr><vt:lpstr>Summary</vt:lpstr>"));

    let names: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
    let unique: HashSet<&str> = names.iter().copied().collect();
    assert_eq!(unique.len(), names.len());
}

#[test]
fn write_produces_zip_archive() {
    let wb = sample_workbook();
    let dir = std::env::temp_dir();
    let path = dir.join(format!("sheetdom-{}.xlsx", std::process::id()));
    let path_str = path.to_str().unwrap();

    write_workbook(
        &wb,
        path_str,
        &WriteOptions {
            num_threads: 2,
            ..WriteOptions::default()
        },
    )
    .unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..2], b"PK");
    assert!(!dir
        .join(format!("sheetdom-{}.xlsx.tmp.{}", std::process::id(), std::process::id()))
        .exists());

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn write_to_missing_directory_fails() {
    let wb = sample_workbook();
    let path = std::env::temp_dir()
        .join("sheetdom-missing-dir")
        .join("out.xlsx");
    let err = write_workbook(&wb, path.to_str().unwrap(), &WriteOptions::default()).unwrap_err();
    assert!(err.is_validation());
}
