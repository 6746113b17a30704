//! Slide layouts and the slide master they inherit from

use serde::Serialize;

use crate::errors::{Result, ServerError};
use crate::model::shape::{is_shape_element, Placeholder, Shape};
use crate::units::Transform;
use crate::xml::XmlElement;

/// Placeholders of a layout or master part
fn placeholder_shapes(root: &XmlElement) -> Result<Vec<Shape>> {
    let sp_tree = root.find(&["p:cSld", "p:spTree"]).ok_or_else(|| {
        ServerError::MalformedPackage(format!("<{}> has no shape tree", root.name))
    })?;
    Ok(sp_tree
        .elements()
        .filter(|e| is_shape_element(e))
        .map(|e| Shape::from_element(e.clone()))
        .filter(|s| s.placeholder().is_some())
        .collect())
}

/// The slide master of the presentation
#[derive(Debug, Clone)]
pub struct Master {
    pub part: String,
    pub placeholders: Vec<Shape>,
    /// Relationship ids of `p:sldLayoutIdLst`, in layout order
    pub layout_rel_ids: Vec<String>,
}

impl Master {
    pub fn parse(part: String, xml: &[u8]) -> Result<Self> {
        let root = XmlElement::parse(xml)?;
        let layout_rel_ids = root
            .child("p:sldLayoutIdLst")
            .map(|list| {
                list.elements()
                    .filter_map(|e| e.attr("r:id"))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            part,
            placeholders: placeholder_shapes(&root)?,
            layout_rel_ids,
        })
    }

    /// Master placeholder a layout placeholder of type `ph_type` inherits from
    pub fn base_placeholder(&self, ph_type: &str) -> Option<&Shape> {
        let base = match ph_type {
            "title" | "ctrTitle" => "title",
            "dt" => "dt",
            "ftr" => "ftr",
            "sldNum" => "sldNum",
            _ => "body",
        };
        self.placeholders
            .iter()
            .find(|s| s.placeholder().map(|p| p.ph_type == base).unwrap_or(false))
    }
}

/// One slide layout
#[derive(Debug, Clone)]
pub struct Layout {
    pub part: String,
    pub name: String,
    pub placeholders: Vec<Shape>,
}

/// Layout summary returned by `list_slide_layouts`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutInfo {
    pub index: usize,
    pub name: String,
    pub placeholders: Vec<String>,
}

impl Layout {
    pub fn parse(part: String, xml: &[u8]) -> Result<Self> {
        let root = XmlElement::parse(xml)?;
        let name = root
            .child("p:cSld")
            .and_then(|c| c.attr("name"))
            .unwrap_or("")
            .to_string();
        Ok(Self {
            part,
            name,
            placeholders: placeholder_shapes(&root)?,
        })
    }

    /// Layout placeholder a slide placeholder inherits from: same idx,
    /// or the layout title for a title placeholder
    pub fn matching_placeholder(&self, ph: &Placeholder) -> Option<&Shape> {
        self.placeholders
            .iter()
            .find(|s| s.placeholder().map(|p| p.idx == ph.idx).unwrap_or(false))
            .or_else(|| {
                if !ph.is_title() {
                    return None;
                }
                self.placeholders
                    .iter()
                    .find(|s| s.placeholder().map(|p| p.is_title()).unwrap_or(false))
            })
    }

    /// Geometry a slide placeholder gets from this layout or, failing
    /// that, from the master
    pub fn inherited_transform(&self, ph: &Placeholder, master: Option<&Master>) -> Option<Transform> {
        let layout_ph = self.matching_placeholder(ph);
        if let Some(t) = layout_ph.and_then(Shape::transform) {
            return Some(t);
        }
        let ph_type = layout_ph
            .and_then(Shape::placeholder)
            .map(|p| p.ph_type)
            .unwrap_or_else(|| ph.ph_type.clone());
        master?.base_placeholder(&ph_type)?.transform()
    }

    pub fn info(&self, index: usize) -> LayoutInfo {
        LayoutInfo {
            index,
            name: self.name.clone(),
            placeholders: self
                .placeholders
                .iter()
                .filter_map(|s| {
                    let ph = s.placeholder()?;
                    Some(format!("{} (type={}, idx={})", s.name(), ph.ph_type, ph.idx))
                })
                .collect(),
        }
    }
}
