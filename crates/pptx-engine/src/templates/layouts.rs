//! The eleven slide layouts of the default template
//!
//! Geometry follows the standard 4:3 Office layouts. Placeholders without a
//! position inherit theirs from the slide master.

use crate::opc::constants::namespace;
use crate::xml::XmlElement;

#[derive(Debug, Clone, Copy)]
pub struct PlaceholderSpec {
    pub base_name: &'static str,
    pub ph_type: Option<&'static str>,
    pub idx: Option<u32>,
    pub size: Option<&'static str>,
    pub vertical: bool,
    /// x, y, cx, cy in EMU
    pub geometry: Option<[i64; 4]>,
}

const fn ph(base_name: &'static str, ph_type: Option<&'static str>, idx: Option<u32>) -> PlaceholderSpec {
    PlaceholderSpec {
        base_name,
        ph_type,
        idx,
        size: None,
        vertical: false,
        geometry: None,
    }
}

impl PlaceholderSpec {
    const fn at(self, x: i64, y: i64, cx: i64, cy: i64) -> Self {
        PlaceholderSpec {
            geometry: Some([x, y, cx, cy]),
            ..self
        }
    }

    const fn size(self, size: &'static str) -> Self {
        PlaceholderSpec {
            size: Some(size),
            ..self
        }
    }

    const fn vertical(self) -> Self {
        PlaceholderSpec {
            vertical: true,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LayoutSpec {
    pub name: &'static str,
    /// `type` attribute of `p:sldLayout`
    pub kind: &'static str,
    pub placeholders: &'static [PlaceholderSpec],
}

const TITLE: PlaceholderSpec = ph("Title", Some("title"), None);
const CONTENT: PlaceholderSpec = ph("Content Placeholder", None, Some(1));
const DATE: PlaceholderSpec = ph("Date Placeholder", Some("dt"), Some(10)).size("half");
const FOOTER: PlaceholderSpec = ph("Footer Placeholder", Some("ftr"), Some(11)).size("quarter");
const SLIDE_NUMBER: PlaceholderSpec =
    ph("Slide Number Placeholder", Some("sldNum"), Some(12)).size("quarter");

pub static DEFAULT_LAYOUTS: &[LayoutSpec] = &[
    LayoutSpec {
        name: "Title Slide",
        kind: "title",
        placeholders: &[
            ph("Title", Some("ctrTitle"), None).at(685_800, 2_130_425, 7_772_400, 1_470_025),
            ph("Subtitle", Some("subTitle"), Some(1)).at(1_371_600, 3_886_200, 6_400_800, 1_752_600),
            DATE,
            FOOTER,
            SLIDE_NUMBER,
        ],
    },
    LayoutSpec {
        name: "Title and Content",
        kind: "obj",
        placeholders: &[TITLE, CONTENT, DATE, FOOTER, SLIDE_NUMBER],
    },
    LayoutSpec {
        name: "Section Header",
        kind: "secHead",
        placeholders: &[
            TITLE.at(722_313, 4_406_900, 7_772_400, 1_362_075),
            ph("Text Placeholder", Some("body"), Some(1)).at(722_313, 2_906_713, 7_772_400, 1_500_187),
            DATE,
            FOOTER,
            SLIDE_NUMBER,
        ],
    },
    LayoutSpec {
        name: "Two Content",
        kind: "twoObj",
        placeholders: &[
            TITLE,
            CONTENT.size("half").at(457_200, 1_600_200, 4_038_600, 4_525_963),
            ph("Content Placeholder", None, Some(2))
                .size("half")
                .at(4_648_200, 1_600_200, 4_038_600, 4_525_963),
            DATE,
            FOOTER,
            SLIDE_NUMBER,
        ],
    },
    LayoutSpec {
        name: "Comparison",
        kind: "twoTxTwoObj",
        placeholders: &[
            TITLE.at(457_200, 274_638, 8_229_600, 1_143_000),
            ph("Text Placeholder", Some("body"), Some(1)).at(457_200, 1_535_113, 4_040_188, 639_762),
            ph("Content Placeholder", None, Some(2))
                .size("half")
                .at(457_200, 2_174_875, 4_040_188, 3_951_288),
            ph("Text Placeholder", Some("body"), Some(3))
                .size("quarter")
                .at(4_645_025, 1_535_113, 4_041_775, 639_762),
            ph("Content Placeholder", None, Some(4))
                .size("quarter")
                .at(4_645_025, 2_174_875, 4_041_775, 3_951_288),
            DATE,
            FOOTER,
            SLIDE_NUMBER,
        ],
    },
    LayoutSpec {
        name: "Title Only",
        kind: "titleOnly",
        placeholders: &[TITLE, DATE, FOOTER, SLIDE_NUMBER],
    },
    LayoutSpec {
        name: "Blank",
        kind: "blank",
        placeholders: &[DATE, FOOTER, SLIDE_NUMBER],
    },
    LayoutSpec {
        name: "Content with Caption",
        kind: "objTx",
        placeholders: &[
            TITLE.at(457_201, 273_050, 3_008_313, 1_162_050),
            CONTENT.at(3_575_050, 273_050, 5_111_750, 5_853_113),
            ph("Text Placeholder", Some("body"), Some(2))
                .size("half")
                .at(457_201, 1_435_100, 3_008_313, 4_691_063),
            DATE,
            FOOTER,
            SLIDE_NUMBER,
        ],
    },
    LayoutSpec {
        name: "Picture with Caption",
        kind: "picTx",
        placeholders: &[
            TITLE.at(1_792_288, 4_800_600, 5_486_400, 566_738),
            ph("Picture Placeholder", Some("pic"), Some(1)).at(1_792_288, 612_775, 5_486_400, 4_114_800),
            ph("Text Placeholder", Some("body"), Some(2))
                .size("half")
                .at(1_792_288, 5_367_338, 5_486_400, 804_862),
            DATE,
            FOOTER,
            SLIDE_NUMBER,
        ],
    },
    LayoutSpec {
        name: "Title and Vertical Text",
        kind: "vertTx",
        placeholders: &[
            TITLE,
            ph("Vertical Text Placeholder", Some("body"), Some(1)).vertical(),
            DATE,
            FOOTER,
            SLIDE_NUMBER,
        ],
    },
    LayoutSpec {
        name: "Vertical Title and Text",
        kind: "vertTitleAndTx",
        placeholders: &[
            ph("Vertical Title", Some("title"), None)
                .vertical()
                .at(6_629_400, 274_638, 2_057_400, 5_851_525),
            ph("Vertical Text Placeholder", Some("body"), Some(1))
                .vertical()
                .at(457_200, 274_638, 6_019_800, 5_851_525),
            DATE,
            FOOTER,
            SLIDE_NUMBER,
        ],
    },
];

fn placeholder_element(spec: &PlaceholderSpec, position: usize) -> XmlElement {
    let id = position as u32 + 2;
    let mut ph_el = XmlElement::new("p:ph");
    if let Some(t) = spec.ph_type {
        ph_el.set_attr("type", t);
    }
    if spec.vertical {
        ph_el.set_attr("orient", "vert");
    }
    if let Some(sz) = spec.size {
        ph_el.set_attr("sz", sz);
    }
    if let Some(idx) = spec.idx {
        ph_el.set_attr("idx", idx.to_string());
    }

    let mut sp_pr = XmlElement::new("p:spPr");
    if let Some([x, y, cx, cy]) = spec.geometry {
        sp_pr.push(
            XmlElement::new("a:xfrm")
                .with_child(
                    XmlElement::new("a:off")
                        .with_attr("x", x.to_string())
                        .with_attr("y", y.to_string()),
                )
                .with_child(
                    XmlElement::new("a:ext")
                        .with_attr("cx", cx.to_string())
                        .with_attr("cy", cy.to_string()),
                ),
        );
    }

    let mut body_pr = XmlElement::new("a:bodyPr");
    if spec.vertical {
        body_pr.set_attr("vert", "eaVert");
    }

    XmlElement::new("p:sp")
        .with_child(
            XmlElement::new("p:nvSpPr")
                .with_child(
                    XmlElement::new("p:cNvPr")
                        .with_attr("id", id.to_string())
                        .with_attr("name", format!("{} {}", spec.base_name, position + 1)),
                )
                .with_child(
                    XmlElement::new("p:cNvSpPr")
                        .with_child(XmlElement::new("a:spLocks").with_attr("noGrp", "1")),
                )
                .with_child(XmlElement::new("p:nvPr").with_child(ph_el)),
        )
        .with_child(sp_pr)
        .with_child(
            XmlElement::new("p:txBody")
                .with_child(body_pr)
                .with_child(XmlElement::new("a:lstStyle"))
                .with_child(
                    XmlElement::new("a:p")
                        .with_child(XmlElement::new("a:endParaRPr").with_attr("lang", "en-US")),
                ),
        )
}

/// Layout part XML
pub fn layout_xml(spec: &LayoutSpec) -> String {
    let mut sp_tree = XmlElement::new("p:spTree")
        .with_child(
            XmlElement::new("p:nvGrpSpPr")
                .with_child(
                    XmlElement::new("p:cNvPr")
                        .with_attr("id", "1")
                        .with_attr("name", ""),
                )
                .with_child(XmlElement::new("p:cNvGrpSpPr"))
                .with_child(XmlElement::new("p:nvPr")),
        )
        .with_child(XmlElement::new("p:grpSpPr"));
    for (position, placeholder) in spec.placeholders.iter().enumerate() {
        sp_tree.push(placeholder_element(placeholder, position));
    }

    XmlElement::new("p:sldLayout")
        .with_attr("xmlns:a", namespace::DRAWINGML)
        .with_attr("xmlns:r", namespace::RELATIONSHIPS)
        .with_attr("xmlns:p", namespace::PRESENTATIONML)
        .with_attr("type", spec.kind)
        .with_attr("preserve", "1")
        .with_child(
            XmlElement::new("p:cSld")
                .with_attr("name", spec.name)
                .with_child(sp_tree),
        )
        .with_child(
            XmlElement::new("p:clrMapOvr").with_child(XmlElement::new("a:masterClrMapping")),
        )
        .to_document()
}
