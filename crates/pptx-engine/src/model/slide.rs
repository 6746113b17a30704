//! Slides: shape tree plus slide-level relationships

use crate::errors::{Result, ServerError};
use crate::model::layout::Layout;
use crate::model::shape::{is_shape_element, Shape};
use crate::opc::constants::{namespace, relationship_type};
use crate::opc::{relative_target, resolve_target, Relationships};
use crate::xml::{XmlElement, XmlNode};

/// One slide of a presentation
#[derive(Debug, Clone)]
pub struct Slide {
    /// Part name, e.g. `ppt/slides/slide3.xml`
    pub part: String,
    /// `p:sldId/@id` in the presentation part
    pub slide_id: u32,
    /// Relationship id from the presentation part
    pub rel_id: String,
    /// Part name of the layout this slide uses
    pub layout_part: String,
    pub rels: Relationships,
    /// Slide document with the shapes taken out of `p:spTree`
    root: XmlElement,
    shapes: Vec<Shape>,
}

impl Slide {
    /// Parse an existing slide part
    pub fn parse(
        part: String,
        slide_id: u32,
        rel_id: String,
        xml: &[u8],
        rels: Relationships,
    ) -> Result<Self> {
        let mut root = XmlElement::parse(xml)?;
        let layout_part = rels
            .of_type(relationship_type::SLIDE_LAYOUT)
            .next()
            .map(|r| resolve_target(&part, &r.target))
            .ok_or_else(|| {
                ServerError::MalformedPackage(format!("slide '{}' has no layout", part))
            })?;

        let sp_tree = root.find_mut(&["p:cSld", "p:spTree"]).ok_or_else(|| {
            ServerError::MalformedPackage(format!("slide '{}' has no shape tree", part))
        })?;
        let mut shapes = Vec::new();
        sp_tree.children.retain(|node| match node {
            XmlNode::Element(e) if is_shape_element(e) => {
                shapes.push(Shape::from_element(e.clone()));
                false
            }
            _ => true,
        });

        Ok(Self {
            part,
            slide_id,
            rel_id,
            layout_part,
            rels,
            root,
            shapes,
        })
    }

    /// New slide on `layout`, with the layout's content placeholders
    /// cloned as empty placeholders
    pub fn new(part: String, slide_id: u32, rel_id: String, layout: &Layout) -> Self {
        let mut rels = Relationships::new();
        rels.add(
            relationship_type::SLIDE_LAYOUT,
            relative_target(&part, &layout.part),
        );

        let sp_tree = XmlElement::new("p:spTree")
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
            .with_child(
                XmlElement::new("p:grpSpPr").with_child(
                    XmlElement::new("a:xfrm")
                        .with_child(XmlElement::new("a:off").with_attr("x", "0").with_attr("y", "0"))
                        .with_child(XmlElement::new("a:ext").with_attr("cx", "0").with_attr("cy", "0"))
                        .with_child(XmlElement::new("a:chOff").with_attr("x", "0").with_attr("y", "0"))
                        .with_child(XmlElement::new("a:chExt").with_attr("cx", "0").with_attr("cy", "0")),
                ),
            );
        let root = XmlElement::new("p:sld")
            .with_attr("xmlns:a", namespace::DRAWINGML)
            .with_attr("xmlns:r", namespace::RELATIONSHIPS)
            .with_attr("xmlns:p", namespace::PRESENTATIONML)
            .with_child(XmlElement::new("p:cSld").with_child(sp_tree))
            .with_child(
                XmlElement::new("p:clrMapOvr").with_child(XmlElement::new("a:masterClrMapping")),
            );

        let mut slide = Self {
            part,
            slide_id,
            rel_id,
            layout_part: layout.part.clone(),
            rels,
            root,
            shapes: Vec::new(),
        };
        for layout_shape in &layout.placeholders {
            let skip = layout_shape
                .placeholder()
                .map(|p| p.is_chrome())
                .unwrap_or(true);
            if skip {
                continue;
            }
            let id = slide.max_shape_id().saturating_add(1);
            if let Some(ph) = Shape::new_placeholder(id, layout_shape) {
                slide.shapes.push(ph);
            }
        }
        slide
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Id for a new shape: one more than the largest id on the slide
    pub fn next_shape_id(&self) -> Result<u32> {
        self.max_shape_id().checked_add(1).ok_or_else(|| {
            ServerError::MalformedPackage(format!("{}: shape ids exhausted", self.part))
        })
    }

    fn max_shape_id(&self) -> u32 {
        let tree_max = self
            .root
            .find(&["p:cSld", "p:spTree", "p:nvGrpSpPr", "p:cNvPr"])
            .and_then(|e| e.attr("id"))
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1);
        self.shapes
            .iter()
            .map(Shape::max_id)
            .fold(tree_max, u32::max)
    }

    pub fn shape(&self, id: u32) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    pub fn shape_mut(&mut self, id: u32) -> Option<&mut Shape> {
        self.shapes.iter_mut().find(|s| s.id() == id)
    }

    pub fn shapes_mut(&mut self) -> &mut [Shape] {
        &mut self.shapes
    }

    pub fn push_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    pub fn remove_shape(&mut self, id: u32) -> Option<Shape> {
        let pos = self.shapes.iter().position(|s| s.id() == id)?;
        Some(self.shapes.remove(pos))
    }

    /// Relationship id for an image part, reusing an existing one
    pub fn image_rel(&mut self, media_part: &str) -> String {
        let target = relative_target(&self.part, media_part);
        if let Some(existing) = self
            .rels
            .of_type(relationship_type::IMAGE)
            .find(|r| r.target == target)
        {
            return existing.id.clone();
        }
        self.rels.add(relationship_type::IMAGE, target)
    }

    /// Drop image relationships nothing on the slide references
    pub fn prune_image_rels(&mut self) {
        let mut used: Vec<String> = self.shapes.iter().flat_map(Shape::relationship_refs).collect();
        self.root.visit(&mut |el| {
            for (key, value) in &el.attributes {
                if key.starts_with("r:") {
                    used.push(value.clone());
                }
            }
        });
        self.rels
            .retain(|r| r.rel_type != relationship_type::IMAGE || used.contains(&r.id));
    }

    /// Serialize the slide part
    pub fn to_xml(&self) -> String {
        let mut root = self.root.clone();
        if let Some(sp_tree) = root.find_mut(&["p:cSld", "p:spTree"]) {
            let insert_at = sp_tree
                .children
                .iter()
                .position(|n| matches!(n, XmlNode::Element(e) if e.local_name() == "extLst"))
                .unwrap_or(sp_tree.children.len());
            for (offset, shape) in self.shapes.iter().enumerate() {
                sp_tree
                    .children
                    .insert(insert_at + offset, XmlNode::Element(shape.element().clone()));
            }
        }
        root.to_document()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::units::Transform;

    fn title_layout() -> Layout {
        let xml = br#"<p:sldLayout><p:cSld name="Title Slide"><p:spTree>
<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>
<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="ctrTitle"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>
<p:sp><p:nvSpPr><p:cNvPr id="3" name="Subtitle 2"/><p:cNvSpPr/><p:nvPr><p:ph type="subTitle" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>
<p:sp><p:nvSpPr><p:cNvPr id="4" name="Date Placeholder 3"/><p:cNvSpPr/><p:nvPr><p:ph type="dt" sz="half" idx="10"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>
</p:spTree></p:cSld></p:sldLayout>"#;
        Layout::parse("ppt/slideLayouts/slideLayout1.xml".into(), xml).unwrap()
    }

    #[test]
    fn test_new_slide_clones_content_placeholders() {
        let slide = Slide::new(
            "ppt/slides/slide1.xml".into(),
            256,
            "rId7".into(),
            &title_layout(),
        );
        let names: Vec<_> = slide.shapes().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Title 1", "Subtitle 2"]);
        assert_eq!(slide.shapes()[0].id(), 2);
        assert_eq!(slide.next_shape_id().unwrap(), 4);
        let layout_rel = slide.rels.of_type(relationship_type::SLIDE_LAYOUT).next().unwrap();
        assert_eq!(layout_rel.target, "../slideLayouts/slideLayout1.xml");
    }

    #[test]
    fn test_round_trip_through_xml() {
        let mut slide = Slide::new(
            "ppt/slides/slide1.xml".into(),
            256,
            "rId7".into(),
            &title_layout(),
        );
        let rect = catalog::shape_type("RECTANGLE").unwrap();
        let id = slide.next_shape_id().unwrap();
        slide.push_shape(Shape::new_autoshape(id, rect, Transform::from_inches(1.0, 1.0, 1.0, 1.0)));

        let xml = slide.to_xml();
        let reparsed = Slide::parse(
            slide.part.clone(),
            256,
            "rId7".into(),
            xml.as_bytes(),
            slide.rels.clone(),
        )
        .unwrap();
        assert_eq!(reparsed.shapes().len(), 3);
        assert_eq!(reparsed.layout_part, "ppt/slideLayouts/slideLayout1.xml");
        assert_eq!(reparsed.shape(id).unwrap().name(), "Rectangle 3");
    }

    #[test]
    fn test_image_rels_are_reused_and_pruned() {
        let mut slide = Slide::new(
            "ppt/slides/slide2.xml".into(),
            257,
            "rId8".into(),
            &title_layout(),
        );
        let a = slide.image_rel("ppt/media/image1.png");
        let b = slide.image_rel("ppt/media/image1.png");
        assert_eq!(a, b);
        assert_eq!(slide.rels.len(), 2);

        slide.prune_image_rels();
        assert_eq!(slide.rels.len(), 1);
    }

    #[test]
    fn test_remove_shape() {
        let mut slide = Slide::new(
            "ppt/slides/slide1.xml".into(),
            256,
            "rId7".into(),
            &title_layout(),
        );
        assert!(slide.remove_shape(2).is_some());
        assert!(slide.remove_shape(2).is_none());
        assert_eq!(slide.shapes().len(), 1);
    }

    #[test]
    fn test_shape_id_overflow_is_malformed_package() {
        let mut slide = Slide::new(
            "ppt/slides/slide1.xml".into(),
            256,
            "rId7".into(),
            &title_layout(),
        );
        let rect = catalog::shape_type("RECTANGLE").unwrap();
        slide.push_shape(Shape::new_autoshape(
            u32::MAX,
            rect,
            Transform::from_inches(1.0, 1.0, 1.0, 1.0),
        ));
        assert!(matches!(
            slide.next_shape_id(),
            Err(ServerError::MalformedPackage(_))
        ));
    }
}
