//! Drawing part: the anchors that place a worksheet's charts on the grid.
use crate::chart::ChartPart;
use crate::rels::{RelationshipId, RelationshipType, Relationships};
use crate::types::Result;
use crate::xml::{Attr, ToXml, XmlWriter, NS_CHART, NS_DRAWINGML, NS_OFFICE_RELATIONSHIPS, NS_SPREADSHEET_DRAWING};

/// Package path of the n-th chart part (1-based)
pub fn chart_part_name(number: usize) -> String {
    format!("xl/charts/chart{}.xml", number)
}

/// Package path of the n-th drawing part (1-based)
pub fn drawing_part_name(number: usize) -> String {
    format!("xl/drawings/drawing{}.xml", number)
}

/// One worksheet's drawing, referencing its charts by relationship id.
///
/// Charts are numbered across the whole workbook, so the drawing is told the number of
/// its first chart.
#[derive(Debug)]
pub struct Drawing<'a> {
    charts: &'a [Box<dyn ChartPart>],
    chart_ids: Vec<RelationshipId>,
    relationships: Relationships,
}

impl<'a> Drawing<'a> {
    pub fn new(charts: &'a [Box<dyn ChartPart>], first_chart_number: usize) -> Result<Self> {
        let mut relationships = Relationships::new();
        let chart_ids = (0..charts.len())
            .map(|i| {
                relationships.add(
                    RelationshipType::Chart,
                    format!("../charts/chart{}.xml", first_chart_number + i),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            charts,
            chart_ids,
            relationships,
        })
    }

    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    pub fn chart_count(&self) -> usize {
        self.charts.len()
    }
}

fn write_marker(xml: &mut XmlWriter, name: &str, col: usize, row: usize) {
    xml.element(name, &[], |xml| {
        xml.text_element("xdr:col", &[], itoa::Buffer::new().format(col));
        xml.text_element("xdr:colOff", &[], "0");
        xml.text_element("xdr:row", &[], itoa::Buffer::new().format(row));
        xml.text_element("xdr:rowOff", &[], "0");
    });
}

impl ToXml for Drawing<'_> {
    fn to_xml(&self, xml: &mut XmlWriter) {
        xml.declaration();
        xml.element(
            "xdr:wsDr",
            &[
                ("xmlns:xdr", Attr::Str(NS_SPREADSHEET_DRAWING)),
                ("xmlns:a", Attr::Str(NS_DRAWINGML)),
            ],
            |xml| {
                for (i, (chart, rel_id)) in self.charts.iter().zip(&self.chart_ids).enumerate() {
                    let position = chart.position();
                    let name = format!("Chart {}", i + 1);
                    let rel_id = rel_id.to_string();

                    xml.element("xdr:twoCellAnchor", &[], |xml| {
                        write_marker(xml, "xdr:from", position.from_col, position.from_row);
                        write_marker(xml, "xdr:to", position.to_col, position.to_row);
                        xml.element("xdr:graphicFrame", &[("macro", Attr::Str(""))], |xml| {
                            xml.element("xdr:nvGraphicFramePr", &[], |xml| {
                                xml.empty(
                                    "xdr:cNvPr",
                                    &[("id", Attr::UInt(i as u64 + 2)), ("name", Attr::Str(&name))],
                                );
                                xml.empty("xdr:cNvGraphicFramePr", &[]);
                            });
                            xml.element("xdr:xfrm", &[], |xml| {
                                xml.empty("a:off", &[("x", Attr::UInt(0)), ("y", Attr::UInt(0))]);
                                xml.empty("a:ext", &[("cx", Attr::UInt(0)), ("cy", Attr::UInt(0))]);
                            });
                            xml.element("a:graphic", &[], |xml| {
                                xml.element("a:graphicData", &[("uri", Attr::Str(NS_CHART))], |xml| {
                                    xml.empty(
                                        "c:chart",
                                        &[
                                            ("xmlns:c", Attr::Str(NS_CHART)),
                                            ("xmlns:r", Attr::Str(NS_OFFICE_RELATIONSHIPS)),
                                            ("r:id", Attr::Str(&rel_id)),
                                        ],
                                    );
                                });
                            });
                        });
                        xml.empty("xdr:clientData", &[]);
                    });
                }
            },
        );
    }
}
