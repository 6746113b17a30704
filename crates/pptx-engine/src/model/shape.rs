//! Shapes on a slide's shape tree
//!
//! A [`Shape`] owns the XML element of one `p:spTree` child and exposes
//! typed accessors over it. Anything the engine does not interpret stays in
//! the element untouched.

use std::fmt;

use crate::catalog::{ConnectorType, ShapeType};
use crate::errors::{Result, ServerError};
use crate::model::text::{self, RunFormat};
use crate::units::{Emu, Transform};
use crate::xml::{XmlElement, XmlNode};

/// Shape classification reported by slide descriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Placeholder,
    TextBox,
    AutoShape,
    Freeform,
    Picture,
    Line,
    Group,
    Table,
    Chart,
    GraphicFrame,
}

impl ShapeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Placeholder => "PLACEHOLDER",
            ShapeKind::TextBox => "TEXT_BOX",
            ShapeKind::AutoShape => "AUTO_SHAPE",
            ShapeKind::Freeform => "FREEFORM",
            ShapeKind::Picture => "PICTURE",
            ShapeKind::Line => "LINE",
            ShapeKind::Group => "GROUP",
            ShapeKind::Table => "TABLE",
            ShapeKind::Chart => "CHART",
            ShapeKind::GraphicFrame => "GRAPHIC_FRAME",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placeholder identity from `p:nvPr/p:ph`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// `type` attribute, `obj` when absent
    pub ph_type: String,
    /// `idx` attribute, 0 when absent
    pub idx: u32,
}

impl Placeholder {
    pub fn from_ph(ph: &XmlElement) -> Self {
        Self {
            ph_type: ph.attr("type").unwrap_or("obj").to_string(),
            idx: ph.attr("idx").and_then(|v| v.parse().ok()).unwrap_or(0),
        }
    }

    pub fn is_title(&self) -> bool {
        matches!(self.ph_type.as_str(), "title" | "ctrTitle")
    }

    /// Date, footer and slide-number placeholders
    pub fn is_chrome(&self) -> bool {
        matches!(self.ph_type.as_str(), "dt" | "ftr" | "sldNum")
    }
}

/// Element names that can appear as shapes in a shape tree
pub fn is_shape_element(el: &XmlElement) -> bool {
    matches!(
        el.local_name(),
        "sp" | "pic" | "cxnSp" | "grpSp" | "graphicFrame" | "contentPart"
    )
}

/// One shape of a slide
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    element: XmlElement,
}

impl Shape {
    pub fn from_element(element: XmlElement) -> Self {
        Self { element }
    }

    pub fn element(&self) -> &XmlElement {
        &self.element
    }

    pub fn into_element(self) -> XmlElement {
        self.element
    }

    fn non_visual(&self) -> Option<&XmlElement> {
        self.element
            .elements()
            .find(|e| e.local_name().starts_with("nv"))
    }

    fn c_nv_pr(&self) -> Option<&XmlElement> {
        self.non_visual()?
            .elements()
            .find(|e| e.local_name() == "cNvPr")
    }

    pub fn id(&self) -> u32 {
        self.c_nv_pr()
            .and_then(|e| e.attr("id"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn name(&self) -> &str {
        self.c_nv_pr().and_then(|e| e.attr("name")).unwrap_or("")
    }

    pub fn placeholder(&self) -> Option<Placeholder> {
        self.non_visual()?
            .elements()
            .find(|e| e.local_name() == "nvPr")?
            .elements()
            .find(|e| e.local_name() == "ph")
            .map(Placeholder::from_ph)
    }

    fn is_text_box(&self) -> bool {
        self.non_visual()
            .and_then(|nv| nv.elements().find(|e| e.local_name() == "cNvSpPr"))
            .and_then(|e| e.attr("txBox"))
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false)
    }

    pub fn kind(&self) -> ShapeKind {
        match self.element.local_name() {
            "pic" => ShapeKind::Picture,
            "cxnSp" => ShapeKind::Line,
            "grpSp" => ShapeKind::Group,
            "graphicFrame" => {
                let uri = self
                    .element
                    .find(&["a:graphic", "a:graphicData"])
                    .and_then(|d| d.attr("uri"))
                    .unwrap_or("");
                if uri.ends_with("/table") {
                    ShapeKind::Table
                } else if uri.ends_with("/chart") {
                    ShapeKind::Chart
                } else {
                    ShapeKind::GraphicFrame
                }
            }
            "sp" => {
                if self.placeholder().is_some() {
                    ShapeKind::Placeholder
                } else if self.is_text_box() {
                    ShapeKind::TextBox
                } else if self
                    .shape_properties()
                    .and_then(|sp_pr| sp_pr.child("a:custGeom"))
                    .is_some()
                {
                    ShapeKind::Freeform
                } else {
                    ShapeKind::AutoShape
                }
            }
            _ => ShapeKind::GraphicFrame,
        }
    }

    fn shape_properties(&self) -> Option<&XmlElement> {
        self.element
            .elements()
            .find(|e| matches!(e.local_name(), "spPr" | "grpSpPr"))
    }

    fn xfrm(&self) -> Option<&XmlElement> {
        match self.element.local_name() {
            "graphicFrame" => self.element.elements().find(|e| e.local_name() == "xfrm"),
            _ => self.shape_properties()?.child("a:xfrm"),
        }
    }

    /// Geometry stored on the shape itself
    pub fn transform(&self) -> Option<Transform> {
        let xfrm = self.xfrm()?;
        let off = xfrm.child("a:off")?;
        let ext = xfrm.child("a:ext")?;
        let num = |el: &XmlElement, key: &str| -> Option<Emu> {
            el.attr(key).and_then(|v| v.parse().ok()).map(Emu)
        };
        Some(Transform {
            left: num(off, "x")?,
            top: num(off, "y")?,
            width: num(ext, "cx")?,
            height: num(ext, "cy")?,
        })
    }

    /// Write geometry, creating `a:xfrm` when the shape inherits it
    pub fn set_transform(&mut self, t: Transform) {
        let is_frame = self.element.local_name() == "graphicFrame";
        let xfrm = if is_frame {
            if !self.element.elements().any(|e| e.local_name() == "xfrm") {
                self.element.push(XmlElement::new("p:xfrm"));
            }
            self.element
                .elements_mut()
                .find(|e| e.local_name() == "xfrm")
        } else {
            if self.shape_properties().is_none() {
                insert_after_non_visual(&mut self.element, XmlElement::new("p:spPr"));
            }
            self.element
                .elements_mut()
                .find(|e| matches!(e.local_name(), "spPr" | "grpSpPr"))
                .map(|sp_pr| {
                    if sp_pr.child("a:xfrm").is_none() {
                        sp_pr
                            .children
                            .insert(0, XmlNode::Element(XmlElement::new("a:xfrm")));
                    }
                    sp_pr
                })
                .and_then(|sp_pr| sp_pr.child_mut("a:xfrm"))
        };

        if let Some(xfrm) = xfrm {
            let extra: Vec<XmlElement> = xfrm
                .elements()
                .filter(|e| !matches!(e.local_name(), "off" | "ext"))
                .cloned()
                .collect();
            xfrm.children.clear();
            xfrm.push(
                XmlElement::new("a:off")
                    .with_attr("x", t.left.0.to_string())
                    .with_attr("y", t.top.0.to_string()),
            );
            xfrm.push(
                XmlElement::new("a:ext")
                    .with_attr("cx", t.width.0.to_string())
                    .with_attr("cy", t.height.0.to_string()),
            );
            // Group child offsets and extents follow off/ext
            for el in extra {
                xfrm.push(el);
            }
        }
    }

    pub fn text_body(&self) -> Option<&XmlElement> {
        self.element.elements().find(|e| e.local_name() == "txBody")
    }

    pub fn has_text_frame(&self) -> bool {
        self.element.local_name() == "sp"
    }

    /// Text of the shape, if it can hold text
    pub fn text(&self) -> Option<String> {
        self.text_body().map(text::text_of)
    }

    /// Replace the shape's text
    pub fn set_text(&mut self, value: &str, format: RunFormat) -> Result<()> {
        if !self.has_text_frame() {
            return Err(ServerError::InvalidArgument(format!(
                "Shape {} ({}) has no text frame",
                self.id(),
                self.kind()
            )));
        }
        if self.text_body().is_none() {
            self.element.push(text::placeholder_text_body());
        }
        if let Some(body) = self
            .element
            .elements_mut()
            .find(|e| e.local_name() == "txBody")
        {
            text::set_text(body, value, format);
        }
        Ok(())
    }

    pub fn enable_word_wrap(&mut self) {
        if let Some(body) = self
            .element
            .elements_mut()
            .find(|e| e.local_name() == "txBody")
        {
            text::enable_word_wrap(body);
        }
    }

    /// Solid fill, for shapes with `p:spPr`
    pub fn set_fill_rgb(&mut self, rgb: [u8; 3]) -> Result<()> {
        if self.element.local_name() != "sp" {
            return Err(ServerError::InvalidArgument(format!(
                "Fill color can only be set on autoshapes, shape {} is {}",
                self.id(),
                self.kind()
            )));
        }
        if self.shape_properties().is_none() {
            insert_after_non_visual(&mut self.element, XmlElement::new("p:spPr"));
        }
        if let Some(sp_pr) = self
            .element
            .elements_mut()
            .find(|e| e.local_name() == "spPr")
        {
            sp_pr.retain_elements(|e| {
                !matches!(
                    e.local_name(),
                    "noFill" | "solidFill" | "gradFill" | "blipFill" | "pattFill" | "grpFill"
                )
            });
            let fill = XmlElement::new("a:solidFill").with_child(
                XmlElement::new("a:srgbClr").with_attr(
                    "val",
                    format!("{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2]),
                ),
            );
            // Fill goes after xfrm and geometry
            let pos = sp_pr
                .children
                .iter()
                .position(|n| match n {
                    XmlNode::Element(e) => {
                        !matches!(e.local_name(), "xfrm" | "prstGeom" | "custGeom")
                    }
                    XmlNode::Text(_) => false,
                })
                .unwrap_or(sp_pr.children.len());
            sp_pr.children.insert(pos, XmlNode::Element(fill));
        }
        Ok(())
    }

    /// Relationship ids this shape references (`r:embed`, `r:link`, `r:id`)
    pub fn relationship_refs(&self) -> Vec<String> {
        let mut refs = Vec::new();
        self.element.visit(&mut |el| {
            for (key, value) in &el.attributes {
                if matches!(key.as_str(), "r:embed" | "r:link" | "r:id" | "r:pict") {
                    refs.push(value.clone());
                }
            }
        });
        refs
    }

    /// Largest `cNvPr` id in this shape, including group members
    pub fn max_id(&self) -> u32 {
        let mut max = 0;
        self.element.visit(&mut |el| {
            if el.local_name() == "cNvPr" {
                if let Some(id) = el.attr("id").and_then(|v| v.parse::<u32>().ok()) {
                    max = max.max(id);
                }
            }
        });
        max
    }

    // Builders

    /// New autoshape from the catalog
    pub fn new_autoshape(id: u32, shape_type: &ShapeType, t: Transform) -> Self {
        let element = XmlElement::new("p:sp")
            .with_child(non_visual("p:nvSpPr", "p:cNvSpPr", id, &format!("{} {}", shape_type.label, id.saturating_sub(1))))
            .with_child(
                XmlElement::new("p:spPr")
                    .with_child(xfrm(t))
                    .with_child(preset_geometry(shape_type.preset)),
            )
            .with_child(style_refs(3, 2, "lt1"))
            .with_child(
                XmlElement::new("p:txBody")
                    .with_child(
                        XmlElement::new("a:bodyPr")
                            .with_attr("rtlCol", "0")
                            .with_attr("anchor", "ctr"),
                    )
                    .with_child(XmlElement::new("a:lstStyle"))
                    .with_child(
                        XmlElement::new("a:p")
                            .with_child(XmlElement::new("a:pPr").with_attr("algn", "ctr")),
                    ),
            );
        Self { element }
    }

    /// New text box
    pub fn new_textbox(id: u32, t: Transform) -> Self {
        let mut nv = non_visual("p:nvSpPr", "p:cNvSpPr", id, &format!("TextBox {}", id.saturating_sub(1)));
        if let Some(c) = nv.child_mut("p:cNvSpPr") {
            c.set_attr("txBox", "1");
        }
        let element = XmlElement::new("p:sp")
            .with_child(nv)
            .with_child(
                XmlElement::new("p:spPr")
                    .with_child(xfrm(t))
                    .with_child(preset_geometry("rect"))
                    .with_child(XmlElement::new("a:noFill")),
            )
            .with_child(text::new_text_body(text::Wrap::None));
        Self { element }
    }

    /// New picture referencing an image relationship
    pub fn new_picture(id: u32, rel_id: &str, description: &str, t: Transform) -> Self {
        let mut nv = non_visual("p:nvPicPr", "p:cNvPicPr", id, &format!("Picture {}", id.saturating_sub(1)));
        if let Some(c) = nv.child_mut("p:cNvPr") {
            c.set_attr("descr", description);
        }
        if let Some(c) = nv.child_mut("p:cNvPicPr") {
            c.push(XmlElement::new("a:picLocks").with_attr("noChangeAspect", "1"));
        }
        let element = XmlElement::new("p:pic")
            .with_child(nv)
            .with_child(
                XmlElement::new("p:blipFill")
                    .with_child(XmlElement::new("a:blip").with_attr("r:embed", rel_id))
                    .with_child(
                        XmlElement::new("a:stretch").with_child(XmlElement::new("a:fillRect")),
                    ),
            )
            .with_child(
                XmlElement::new("p:spPr")
                    .with_child(xfrm(t))
                    .with_child(preset_geometry("rect")),
            );
        Self { element }
    }

    /// New connector glued to two shapes at the given connection sites
    pub fn new_connector(id: u32, kind: ConnectorType, route: &ConnectorRoute) -> Self {
        let mut nv = non_visual(
            "p:nvCxnSpPr",
            "p:cNvCxnSpPr",
            id,
            &format!("Connector {}", id.saturating_sub(1)),
        );
        if let Some(c) = nv.child_mut("p:cNvCxnSpPr") {
            c.push(
                XmlElement::new("a:stCxn")
                    .with_attr("id", route.start.0.to_string())
                    .with_attr("idx", route.start.1.to_string()),
            );
            c.push(
                XmlElement::new("a:endCxn")
                    .with_attr("id", route.end.0.to_string())
                    .with_attr("idx", route.end.1.to_string()),
            );
        }

        let (x1, y1) = route.from;
        let (x2, y2) = route.to;
        let mut frame = xfrm(Transform {
            left: Emu(x1.0.min(x2.0)),
            top: Emu(y1.0.min(y2.0)),
            width: Emu((x2.0 - x1.0).abs()),
            height: Emu((y2.0 - y1.0).abs()),
        });
        if x2.0 < x1.0 {
            frame.set_attr("flipH", "1");
        }
        if y2.0 < y1.0 {
            frame.set_attr("flipV", "1");
        }

        let element = XmlElement::new("p:cxnSp")
            .with_child(nv)
            .with_child(
                XmlElement::new("p:spPr")
                    .with_child(frame)
                    .with_child(preset_geometry(kind.preset())),
            )
            .with_child(style_refs(0, 0, "tx1"));
        Self { element }
    }

    /// Empty slide placeholder cloned from a layout placeholder
    pub fn new_placeholder(id: u32, layout_shape: &Shape) -> Option<Self> {
        let ph = layout_shape
            .non_visual()?
            .elements()
            .find(|e| e.local_name() == "nvPr")?
            .elements()
            .find(|e| e.local_name() == "ph")?
            .clone();
        let is_picture = ph.attr("type") == Some("pic");

        let mut nv = non_visual("p:nvSpPr", "p:cNvSpPr", id, layout_shape.name());
        if let Some(c) = nv.child_mut("p:cNvSpPr") {
            c.push(XmlElement::new("a:spLocks").with_attr("noGrp", "1"));
        }
        if let Some(nv_pr) = nv.child_mut("p:nvPr") {
            nv_pr.push(ph);
        }

        let mut element = XmlElement::new("p:sp")
            .with_child(nv)
            .with_child(XmlElement::new("p:spPr"));
        if !is_picture {
            element.push(text::placeholder_text_body());
        }
        Some(Self { element })
    }
}

/// Endpoints of a connector: glue targets as (shape id, site index) and
/// the points in slide coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectorRoute {
    pub start: (u32, u32),
    pub end: (u32, u32),
    pub from: (Emu, Emu),
    pub to: (Emu, Emu),
}

fn non_visual(nv_name: &str, c_nv_name: &str, id: u32, name: &str) -> XmlElement {
    XmlElement::new(nv_name)
        .with_child(
            XmlElement::new("p:cNvPr")
                .with_attr("id", id.to_string())
                .with_attr("name", name),
        )
        .with_child(XmlElement::new(c_nv_name))
        .with_child(XmlElement::new("p:nvPr"))
}

fn xfrm(t: Transform) -> XmlElement {
    XmlElement::new("a:xfrm")
        .with_child(
            XmlElement::new("a:off")
                .with_attr("x", t.left.0.to_string())
                .with_attr("y", t.top.0.to_string()),
        )
        .with_child(
            XmlElement::new("a:ext")
                .with_attr("cx", t.width.0.to_string())
                .with_attr("cy", t.height.0.to_string()),
        )
}

fn preset_geometry(preset: &str) -> XmlElement {
    XmlElement::new("a:prstGeom")
        .with_attr("prst", preset)
        .with_child(XmlElement::new("a:avLst"))
}

fn style_refs(fill_idx: u32, effect_idx: u32, font_color: &str) -> XmlElement {
    let scheme = |val: &str| XmlElement::new("a:schemeClr").with_attr("val", val);
    XmlElement::new("p:style")
        .with_child(
            XmlElement::new("a:lnRef")
                .with_attr("idx", "1")
                .with_child(scheme("accent1")),
        )
        .with_child(
            XmlElement::new("a:fillRef")
                .with_attr("idx", fill_idx.to_string())
                .with_child(scheme("accent1")),
        )
        .with_child(
            XmlElement::new("a:effectRef")
                .with_attr("idx", effect_idx.to_string())
                .with_child(scheme("accent1")),
        )
        .with_child(
            XmlElement::new("a:fontRef")
                .with_attr("idx", "minor")
                .with_child(scheme(font_color)),
        )
}

fn insert_after_non_visual(element: &mut XmlElement, child: XmlElement) {
    let pos = element
        .children
        .iter()
        .position(|n| matches!(n, XmlNode::Element(e) if e.local_name().starts_with("nv")))
        .map(|i| i + 1)
        .unwrap_or(0);
    element.children.insert(pos, XmlNode::Element(child));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_autoshape() {
        let rect = catalog::shape_type("RECTANGLE").unwrap();
        let shape = Shape::new_autoshape(4, rect, Transform::from_inches(1.0, 1.0, 2.0, 1.0));
        assert_eq!(shape.id(), 4);
        assert_eq!(shape.name(), "Rectangle 3");
        assert_eq!(shape.kind(), ShapeKind::AutoShape);
        assert_eq!(
            shape.transform(),
            Some(Transform::from_inches(1.0, 1.0, 2.0, 1.0))
        );
        assert_eq!(shape.text().as_deref(), Some(""));
    }

    #[test]
    fn test_textbox_kind_and_text() {
        let mut shape = Shape::new_textbox(2, Transform::from_inches(0.0, 0.0, 1.0, 1.0));
        assert_eq!(shape.kind(), ShapeKind::TextBox);
        assert_eq!(shape.name(), "TextBox 1");
        shape.set_text("Hello\nWorld", RunFormat::default()).unwrap();
        assert_eq!(shape.text().as_deref(), Some("Hello\nWorld"));
    }

    #[test]
    fn test_set_transform_creates_xfrm_for_placeholder() {
        let xml = br#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#;
        let mut shape = Shape::from_element(XmlElement::parse(xml).unwrap());
        assert_eq!(shape.kind(), ShapeKind::Placeholder);
        assert!(shape.placeholder().unwrap().is_title());
        assert_eq!(shape.transform(), None);

        let t = Transform::from_inches(0.5, 0.5, 3.0, 1.5);
        shape.set_transform(t);
        assert_eq!(shape.transform(), Some(t));
    }

    #[test]
    fn test_fill_replaces_existing_fill() {
        let rect = catalog::shape_type("RECTANGLE").unwrap();
        let mut shape = Shape::new_autoshape(2, rect, Transform::default());
        shape.set_fill_rgb([255, 0, 0]).unwrap();
        shape.set_fill_rgb([0, 128, 255]).unwrap();
        let sp_pr = shape.element().child("p:spPr").unwrap();
        let fills: Vec<_> = sp_pr.elements().filter(|e| e.name == "a:solidFill").collect();
        assert_eq!(fills.len(), 1);
        assert_eq!(
            fills[0].child("a:srgbClr").unwrap().attr("val"),
            Some("0080FF")
        );
        // Geometry stays ahead of the fill
        let names: Vec<_> = sp_pr.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a:xfrm", "a:prstGeom", "a:solidFill"]);
    }

    #[test]
    fn test_picture_cannot_take_text_or_fill() {
        let mut pic = Shape::new_picture(3, "rId2", "logo.png", Transform::default());
        assert_eq!(pic.kind(), ShapeKind::Picture);
        assert_eq!(pic.relationship_refs(), vec!["rId2".to_string()]);
        assert!(pic.set_text("x", RunFormat::default()).is_err());
        assert!(pic.set_fill_rgb([0, 0, 0]).is_err());
    }

    #[test]
    fn test_connector_flips_when_routed_backwards() {
        let route = ConnectorRoute {
            start: (2, 1),
            end: (3, 3),
            from: (Emu(500), Emu(900)),
            to: (Emu(100), Emu(300)),
        };
        let cxn = Shape::new_connector(4, ConnectorType::Elbow, &route);
        assert_eq!(cxn.kind(), ShapeKind::Line);
        let frame = cxn.element().find(&["p:spPr", "a:xfrm"]).unwrap();
        assert_eq!(frame.attr("flipH"), Some("1"));
        assert_eq!(frame.attr("flipV"), Some("1"));
        assert_eq!(
            cxn.transform(),
            Some(Transform {
                left: Emu(100),
                top: Emu(300),
                width: Emu(400),
                height: Emu(600)
            })
        );
        let st = cxn
            .element()
            .find(&["p:nvCxnSpPr", "p:cNvCxnSpPr", "a:stCxn"])
            .unwrap();
        assert_eq!(st.attr("id"), Some("2"));
    }

    #[test]
    fn test_graphic_frame_kinds() {
        let xml = br#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="5" name="Table 4"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm><a:off x="1" y="2"/><a:ext cx="3" cy="4"/></p:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"/></a:graphic></p:graphicFrame>"#;
        let shape = Shape::from_element(XmlElement::parse(xml).unwrap());
        assert_eq!(shape.kind(), ShapeKind::Table);
        assert_eq!(shape.transform().unwrap().width, Emu(3));
        assert!(!shape.has_text_frame());
    }
}
