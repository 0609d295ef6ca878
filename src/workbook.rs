use crate::rels::{RelationshipId, RelationshipType, Relationships};
use crate::types::{Result, XlsxError};
use crate::validation::{validate_sheet_names, ValidationResult};
use crate::worksheet::Worksheet;
use crate::xml::{Attr, ToXml, XmlWriter, NS_CONTENT_TYPES, NS_OFFICE_RELATIONSHIPS, NS_SPREADSHEETML};
use chrono::{DateTime, Utc};
use tracing::debug;

const DEFAULT_CREATOR: &str = "sheetdom";

const CT_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
const CT_XML: &str = "application/xml";
const CT_WORKBOOK: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const CT_WORKSHEET: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
const CT_DRAWING: &str = "application/vnd.openxmlformats-officedocument.drawing+xml";
const CT_CHART: &str = "application/vnd.openxmlformats-officedocument.drawingml.chart+xml";
const CT_CORE: &str = "application/vnd.openxmlformats-package.core-properties+xml";
const CT_APP: &str = "application/vnd.openxmlformats-officedocument.extended-properties+xml";

#[derive(Debug)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    creator: String,
    created: Option<DateTime<Utc>>,
}

impl Default for Workbook {
    fn default() -> Self {
        Self {
            worksheets: Vec::new(),
            creator: DEFAULT_CREATOR.to_string(),
            created: None,
        }
    }
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn creator(&self) -> &str {
        &self.creator
    }

    pub fn set_creator(&mut self, creator: impl Into<String>) {
        self.creator = creator.into();
    }

    /// Creation timestamp written to the core properties. Unset means "time of writing".
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    pub fn set_created(&mut self, created: DateTime<Utc>) {
        self.created = Some(created);
    }

    /// Append a new, empty worksheet. Names must be unique ignoring case.
    pub fn add_worksheet(&mut self, name: impl Into<String>) -> Result<&mut Worksheet> {
        let sheet = Worksheet::new(name)?;
        if self.worksheet(sheet.name()).is_some() {
            return Err(XlsxError::validation(
                "Workbook.add_worksheet",
                format!(
                    "duplicate sheet name '{}' (sheet names are case-insensitive)",
                    sheet.name()
                ),
            ));
        }

        debug!(sheet = sheet.name(), index = self.worksheets.len(), "worksheet added");
        self.worksheets.push(sheet);
        let last = self.worksheets.len() - 1;
        Ok(&mut self.worksheets[last])
    }

    /// Look up a worksheet by name, ignoring case.
    pub fn worksheet(&self, name: &str) -> Option<&Worksheet> {
        let lower = name.to_lowercase();
        self.worksheets
            .iter()
            .find(|s| s.name().to_lowercase() == lower)
    }

    pub fn worksheet_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        let lower = name.to_lowercase();
        self.worksheets
            .iter_mut()
            .find(|s| s.name().to_lowercase() == lower)
    }

    pub fn worksheets(&self) -> &[Worksheet] {
        &self.worksheets
    }

    /// Whole-workbook checks run before packaging.
    ///
    /// Charts that read from a sheet the workbook does not contain only produce a
    /// warning: the package is still well-formed, the chart just shows no data.
    pub fn validate(&self) -> ValidationResult {
        let names: Vec<&str> = self.worksheets.iter().map(Worksheet::name).collect();
        let mut result = validate_sheet_names(&names);

        if self.worksheets.is_empty() {
            result.add_error("workbook must contain at least one worksheet".to_string());
        }

        for sheet in &self.worksheets {
            for (idx, chart) in sheet.charts().iter().enumerate() {
                for referenced in chart.referenced_sheets() {
                    if self.worksheet(referenced).is_none() {
                        result.add_warning(format!(
                            "chart {} on '{}' references unknown sheet '{}'",
                            idx + 1,
                            sheet.name(),
                            referenced
                        ));
                    }
                }
            }
        }

        result
    }
}

/// `xl/workbook.xml` with the relationships that back its `r:id` attributes.
///
/// Worksheets take `rId1..rIdN` in sheet order, the stylesheet comes last.
#[derive(Debug)]
pub struct WorkbookPart<'a> {
    workbook: &'a Workbook,
    relationships: Relationships,
    sheet_ids: Vec<RelationshipId>,
}

impl<'a> WorkbookPart<'a> {
    pub fn new(workbook: &'a Workbook) -> Result<Self> {
        let mut relationships = Relationships::new();
        let sheet_ids = (1..=workbook.worksheets.len())
            .map(|n| {
                relationships.add(
                    RelationshipType::Worksheet,
                    format!("worksheets/sheet{}.xml", n),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        relationships.add(RelationshipType::Styles, "styles.xml")?;

        Ok(Self {
            workbook,
            relationships,
            sheet_ids,
        })
    }

    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }
}

impl ToXml for WorkbookPart<'_> {
    fn to_xml(&self, xml: &mut XmlWriter) {
        xml.declaration();
        xml.element(
            "workbook",
            &[
                ("xmlns", Attr::Str(NS_SPREADSHEETML)),
                ("xmlns:r", Attr::Str(NS_OFFICE_RELATIONSHIPS)),
            ],
            |xml| {
                xml.element("bookViews", &[], |xml| {
                    xml.empty(
                        "workbookView",
                        &[
                            ("xWindow", Attr::UInt(0)),
                            ("yWindow", Attr::UInt(0)),
                            ("windowWidth", Attr::UInt(28800)),
                            ("windowHeight", Attr::UInt(12600)),
                        ],
                    );
                });
                xml.element("sheets", &[], |xml| {
                    for (i, (sheet, id)) in self.workbook.worksheets.iter().zip(&self.sheet_ids).enumerate() {
                        let id = id.to_string();
                        xml.empty(
                            "sheet",
                            &[
                                ("name", Attr::Str(sheet.name())),
                                ("sheetId", Attr::UInt(i as u64 + 1)),
                                ("r:id", Attr::Str(&id)),
                            ],
                        );
                    }
                });
            },
        );
    }
}

/// Package-level `_rels/.rels`.
pub fn root_relationships() -> Result<Relationships> {
    let mut rels = Relationships::new();
    rels.add(RelationshipType::OfficeDocument, "xl/workbook.xml")?;
    rels.add(RelationshipType::CoreProperties, "docProps/core.xml")?;
    rels.add(RelationshipType::ExtendedProperties, "docProps/app.xml")?;
    Ok(rels)
}

/// `[Content_Types].xml` for a package with the given part counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentTypes {
    pub worksheets: usize,
    pub drawings: usize,
    pub charts: usize,
}

impl ToXml for ContentTypes {
    fn to_xml(&self, xml: &mut XmlWriter) {
        fn part(xml: &mut XmlWriter, name: &str, content_type: &str) {
            xml.empty(
                "Override",
                &[("PartName", Attr::Str(name)), ("ContentType", Attr::Str(content_type))],
            );
        }

        xml.declaration();
        xml.element("Types", &[("xmlns", Attr::Str(NS_CONTENT_TYPES))], |xml| {
            xml.empty(
                "Default",
                &[("Extension", Attr::Str("rels")), ("ContentType", Attr::Str(CT_RELATIONSHIPS))],
            );
            xml.empty(
                "Default",
                &[("Extension", Attr::Str("xml")), ("ContentType", Attr::Str(CT_XML))],
            );
            part(xml, "/xl/workbook.xml", CT_WORKBOOK);
            part(xml, "/xl/styles.xml", CT_STYLES);
            part(xml, "/docProps/core.xml", CT_CORE);
            part(xml, "/docProps/app.xml", CT_APP);
            for n in 1..=self.worksheets {
                part(xml, &format!("/xl/worksheets/sheet{}.xml", n), CT_WORKSHEET);
            }
            for n in 1..=self.drawings {
                part(xml, &format!("/xl/drawings/drawing{}.xml", n), CT_DRAWING);
            }
            for n in 1..=self.charts {
                part(xml, &format!("/xl/charts/chart{}.xml", n), CT_CHART);
            }
        });
    }
}

/// `docProps/core.xml`
#[derive(Debug)]
pub struct CoreProperties<'a> {
    pub creator: &'a str,
    pub created: DateTime<Utc>,
}

impl ToXml for CoreProperties<'_> {
    fn to_xml(&self, xml: &mut XmlWriter) {
        let timestamp = self.created.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let w3cdtf = [("xsi:type", Attr::Str("dcterms:W3CDTF"))];

        xml.declaration();
        xml.element(
            "cp:coreProperties",
            &[
                (
                    "xmlns:cp",
                    Attr::Str("http://schemas.openxmlformats.org/package/2006/metadata/core-properties"),
                ),
                ("xmlns:dc", Attr::Str("http://purl.org/dc/elements/1.1/")),
                ("xmlns:dcterms", Attr::Str("http://purl.org/dc/terms/")),
                ("xmlns:xsi", Attr::Str("http://www.w3.org/2001/XMLSchema-instance")),
            ],
            |xml| {
                xml.text_element("dc:creator", &[], self.creator);
                xml.text_element("cp:lastModifiedBy", &[], self.creator);
                xml.text_element("dcterms:created", &w3cdtf, &timestamp);
                xml.text_element("dcterms:modified", &w3cdtf, &timestamp);
            },
        );
    }
}

/// `docProps/app.xml`
#[derive(Debug)]
pub struct AppProperties<'a> {
    pub sheet_names: Vec<&'a str>,
}

impl ToXml for AppProperties<'_> {
    fn to_xml(&self, xml: &mut XmlWriter) {
        let count = self.sheet_names.len() as u64;

        xml.declaration();
        xml.element(
            "Properties",
            &[
                (
                    "xmlns",
                    Attr::Str("http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"),
                ),
                (
                    "xmlns:vt",
                    Attr::Str("http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"),
                ),
            ],
            |xml| {
                xml.text_element("Application", &[], "Microsoft Excel");
                xml.text_element("DocSecurity", &[], "0");
                xml.text_element("ScaleCrop", &[], "false");
                xml.element("HeadingPairs", &[], |xml| {
                    xml.element(
                        "vt:vector",
                        &[("size", Attr::UInt(2)), ("baseType", Attr::Str("variant"))],
                        |xml| {
                            xml.element("vt:variant", &[], |xml| {
                                xml.text_element("vt:lpstr", &[], "Worksheets");
                            });
                            xml.element("vt:variant", &[], |xml| {
                                xml.text_element("vt:i4", &[], itoa::Buffer::new().format(count));
                            });
                        },
                    );
                });
                xml.element("TitlesOfParts", &[], |xml| {
                    xml.element(
                        "vt:vector",
                        &[("size", Attr::UInt(count)), ("baseType", Attr::Str("lpstr"))],
                        |xml| {
                            for name in &self.sheet_names {
                                xml.text_element("vt:lpstr", &[], name);
                            }
                        },
                    );
                });
                xml.text_element("LinksUpToDate", &[], "false");
                xml.text_element("SharedDoc", &[], "false");
                xml.text_element("AppVersion", &[], "16.0300");
            },
        );
    }
}

/// Default `xl/styles.xml`: cell style 0 is general, cell style 1 formats dates.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stylesheet;

impl ToXml for Stylesheet {
    fn to_xml(&self, xml: &mut XmlWriter) {
        let xf = |num_fmt: u64| {
            [
                ("numFmtId", Attr::UInt(num_fmt)),
                ("fontId", Attr::UInt(0)),
                ("fillId", Attr::UInt(0)),
                ("borderId", Attr::UInt(0)),
                ("xfId", Attr::UInt(0)),
            ]
        };

        xml.declaration();
        xml.element("styleSheet", &[("xmlns", Attr::Str(NS_SPREADSHEETML))], |xml| {
            xml.element("numFmts", &[("count", Attr::UInt(1))], |xml| {
                xml.empty(
                    "numFmt",
                    &[
                        ("numFmtId", Attr::UInt(164)),
                        ("formatCode", Attr::Str("yyyy-mm-dd hh:mm:ss")),
                    ],
                );
            });
            xml.element("fonts", &[("count", Attr::UInt(1))], |xml| {
                xml.element("font", &[], |xml| {
                    xml.empty("sz", &[("val", Attr::UInt(11))]);
                    xml.empty("name", &[("val", Attr::Str("Calibri"))]);
                });
            });
            xml.element("fills", &[("count", Attr::UInt(2))], |xml| {
                for pattern in ["none", "gray125"] {
                    xml.element("fill", &[], |xml| {
                        xml.empty("patternFill", &[("patternType", Attr::Str(pattern))]);
                    });
                }
            });
            xml.element("borders", &[("count", Attr::UInt(1))], |xml| {
                xml.element("border", &[], |xml| {
                    for side in ["left", "right", "top", "bottom", "diagonal"] {
                        xml.empty(side, &[]);
                    }
                });
            });
            xml.element("cellStyleXfs", &[("count", Attr::UInt(1))], |xml| {
                xml.empty("xf", &xf(0)[..4]);
            });
            xml.element("cellXfs", &[("count", Attr::UInt(2))], |xml| {
                xml.empty("xf", &xf(0));
                let mut date = xf(164).to_vec();
                date.push(("applyNumberFormat", Attr::Bool(true)));
                xml.empty("xf", &date);
            });
            xml.element("cellStyles", &[("count", Attr::UInt(1))], |xml| {
                xml.empty(
                    "cellStyle",
                    &[
                        ("name", Attr::Str("Normal")),
                        ("xfId", Attr::UInt(0)),
                        ("builtinId", Attr::UInt(0)),
                    ],
                );
            });
        });
    }
}
