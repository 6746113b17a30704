//! Single-slide mutations
//!
//! Each function works on a loaded [`Presentation`] and leaves saving to the
//! caller, so a failed call never reaches the disk.

use std::io::Cursor;

use base64::Engine;
use image::ImageFormat;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::catalog::{self, ConnectorType};
use crate::describe::effective_transform;
use crate::errors::{Result, ServerError};
use crate::model::{ConnectorRoute, Placeholder, Presentation, RunFormat, Shape};
use crate::opc::constants::content_type;
use crate::units::{Emu, Transform};

/// Pixel density assumed for pictures without an explicit size
pub const IMAGE_DPI: u32 = 72;

#[derive(Debug, Clone, Deserialize)]
pub struct TextboxRequest {
    pub text: String,
    #[serde(alias = "left")]
    pub left_inches: f64,
    #[serde(alias = "top")]
    pub top_inches: f64,
    #[serde(alias = "width")]
    pub width_inches: f64,
    #[serde(alias = "height")]
    pub height_inches: f64,
    /// Points; zero or less keeps the default size
    #[serde(default)]
    pub font_size_pt: f64,
    #[serde(default)]
    pub bold: bool,
}

impl TextboxRequest {
    pub fn transform(&self) -> Transform {
        Transform::from_inches(
            self.left_inches,
            self.top_inches,
            self.width_inches,
            self.height_inches,
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShapeRequest {
    #[serde(alias = "shape_type")]
    pub shape_type_name: String,
    #[serde(alias = "left")]
    pub left_inches: f64,
    #[serde(alias = "top")]
    pub top_inches: f64,
    #[serde(alias = "width")]
    pub width_inches: f64,
    #[serde(alias = "height")]
    pub height_inches: f64,
    #[serde(default)]
    pub text: Option<String>,
}

impl ShapeRequest {
    pub fn transform(&self) -> Transform {
        Transform::from_inches(
            self.left_inches,
            self.top_inches,
            self.width_inches,
            self.height_inches,
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PictureRequest {
    /// Base64 image data
    pub image: String,
    #[serde(alias = "left")]
    pub left_inches: f64,
    #[serde(alias = "top")]
    pub top_inches: f64,
    #[serde(default, alias = "width")]
    pub width_inches: Option<f64>,
    #[serde(default, alias = "height")]
    pub height_inches: Option<f64>,
}

/// Fields of an existing shape to change; at least one must be set
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModifyShapeRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, alias = "left")]
    pub left_inches: Option<f64>,
    #[serde(default, alias = "top")]
    pub top_inches: Option<f64>,
    #[serde(default, alias = "width")]
    pub width_inches: Option<f64>,
    #[serde(default, alias = "height")]
    pub height_inches: Option<f64>,
    #[serde(default)]
    pub fill_color_rgb: Option<[u8; 3]>,
}

impl ModifyShapeRequest {
    fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.left_inches.is_none()
            && self.top_inches.is_none()
            && self.width_inches.is_none()
            && self.height_inches.is_none()
            && self.fill_color_rgb.is_none()
    }
}

fn shape_not_found(shape_id: u32, slide_index: usize) -> ServerError {
    ServerError::NotFound(format!(
        "Shape with ID {} not found on slide {}",
        shape_id, slide_index
    ))
}

/// Fill the title and main content placeholders of a slide.
///
/// Returns warnings for placeholders that could not be found.
pub fn set_title_and_content(
    prs: &mut Presentation,
    slide_index: usize,
    title: &str,
    content: &str,
) -> Result<Vec<String>> {
    let slide = prs.slide_mut(slide_index)?;
    let placeholders: Vec<(u32, String, Placeholder)> = slide
        .shapes()
        .iter()
        .filter_map(|s| s.placeholder().map(|ph| (s.id(), s.name().to_lowercase(), ph)))
        .collect();

    let title_id = placeholders
        .iter()
        .find(|(_, _, ph)| ph.is_title())
        .or_else(|| placeholders.iter().find(|(_, name, _)| name.starts_with("title")))
        .map(|(id, _, _)| *id);

    let content_id = placeholders
        .iter()
        .filter(|(id, _, _)| Some(*id) != title_id)
        .find(|(_, name, ph)| {
            ph.idx == 1
                || name.starts_with("content placeholder")
                || name.starts_with("text placeholder")
                || name.starts_with("body")
        })
        .or_else(|| placeholders.get(1).filter(|(id, _, _)| Some(*id) != title_id))
        .map(|(id, _, _)| *id);

    let mut warnings = Vec::new();
    match title_id.and_then(|id| slide.shape_mut(id)) {
        Some(shape) => shape.set_text(title, RunFormat::default())?,
        None => {
            warn!(slide_index, "slide has no title placeholder");
            warnings.push(format!(
                "Slide {} does not have a standard title placeholder.",
                slide_index
            ));
        }
    }
    match content_id.and_then(|id| slide.shape_mut(id)) {
        Some(shape) => shape.set_text(content, RunFormat::default())?,
        None => {
            warn!(slide_index, "slide has no content placeholder");
            warnings.push(format!(
                "Slide {} does not seem to have a standard content placeholder.",
                slide_index
            ));
        }
    }
    Ok(warnings)
}

/// Add a text box; returns its shape id
pub fn add_textbox(prs: &mut Presentation, slide_index: usize, req: &TextboxRequest) -> Result<u32> {
    let slide = prs.slide_mut(slide_index)?;
    let id = slide.next_shape_id()?;
    let mut shape = Shape::new_textbox(id, req.transform());
    let format = RunFormat {
        size_pt: (req.font_size_pt > 0.0).then_some(req.font_size_pt),
        bold: req.bold,
    };
    shape.set_text(&req.text, format)?;
    slide.push_shape(shape);
    debug!(slide_index, id, "added textbox");
    Ok(id)
}

/// Add an autoshape from the catalog; returns its shape id
pub fn add_shape(prs: &mut Presentation, slide_index: usize, req: &ShapeRequest) -> Result<u32> {
    let shape_type = catalog::shape_type(&req.shape_type_name)?;
    let slide = prs.slide_mut(slide_index)?;
    let id = slide.next_shape_id()?;
    let mut shape = Shape::new_autoshape(id, shape_type, req.transform());
    if let Some(text) = req.text.as_deref().filter(|t| !t.is_empty()) {
        shape.set_text(text, RunFormat::default())?;
        shape.enable_word_wrap();
    }
    slide.push_shape(shape);
    debug!(slide_index, id, preset = shape_type.preset, "added shape");
    Ok(id)
}

struct DecodedImage {
    data: Vec<u8>,
    extension: &'static str,
    media_type: &'static str,
    width_px: u32,
    height_px: u32,
}

fn decode_image(encoded: &str) -> Result<DecodedImage> {
    let data = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ServerError::InvalidArgument(format!("Image is not valid base64: {}", e)))?;

    let format = image::guess_format(&data)
        .map_err(|e| ServerError::InvalidArgument(format!("Unrecognized image data: {}", e)))?;
    let (extension, media_type) = match format {
        ImageFormat::Png => ("png", content_type::PNG),
        ImageFormat::Jpeg => ("jpg", content_type::JPEG),
        ImageFormat::Gif => ("gif", content_type::GIF),
        ImageFormat::Bmp => ("bmp", content_type::BMP),
        ImageFormat::Tiff => ("tiff", content_type::TIFF),
        other => {
            return Err(ServerError::InvalidArgument(format!(
                "Unsupported image format {:?}. Use PNG, JPEG, GIF, BMP or TIFF.",
                other
            )))
        }
    };

    let (width_px, height_px) = image::ImageReader::with_format(Cursor::new(&data), format)
        .into_dimensions()
        .map_err(|e| ServerError::InvalidArgument(format!("Cannot read image size: {}", e)))?;

    Ok(DecodedImage {
        data,
        extension,
        media_type,
        width_px,
        height_px,
    })
}

/// Picture extent: native size at [`IMAGE_DPI`], or scaled to keep the
/// aspect ratio when only one side is given
fn picture_extent(width_px: u32, height_px: u32, width: Option<f64>, height: Option<f64>) -> (Emu, Emu) {
    let native_w = Emu::from_pixels(width_px, IMAGE_DPI);
    let native_h = Emu::from_pixels(height_px, IMAGE_DPI);
    match (width, height) {
        (Some(w), Some(h)) => (Emu::from_inches(w), Emu::from_inches(h)),
        (Some(w), None) => {
            let w = Emu::from_inches(w);
            let h = if native_w.0 == 0 {
                native_h
            } else {
                Emu((w.0 as f64 * native_h.0 as f64 / native_w.0 as f64).round() as i64)
            };
            (w, h)
        }
        (None, Some(h)) => {
            let h = Emu::from_inches(h);
            let w = if native_h.0 == 0 {
                native_w
            } else {
                Emu((h.0 as f64 * native_w.0 as f64 / native_h.0 as f64).round() as i64)
            };
            (w, h)
        }
        (None, None) => (native_w, native_h),
    }
}

/// Add a picture from base64 data; returns its shape id
pub fn add_picture(prs: &mut Presentation, slide_index: usize, req: &PictureRequest) -> Result<u32> {
    // Validate the index before storing any media
    prs.slide(slide_index)?;
    let image = decode_image(&req.image)?;
    let (width, height) =
        picture_extent(image.width_px, image.height_px, req.width_inches, req.height_inches);

    let media_part = prs.add_media(image.data, image.extension, image.media_type);
    let slide = prs.slide_mut(slide_index)?;
    let rel_id = slide.image_rel(&media_part);
    let id = slide.next_shape_id()?;
    let description = media_part.rsplit('/').next().unwrap_or_default().to_string();
    let transform = Transform {
        left: Emu::from_inches(req.left_inches),
        top: Emu::from_inches(req.top_inches),
        width,
        height,
    };
    slide.push_shape(Shape::new_picture(id, &rel_id, &description, transform));
    debug!(slide_index, id, media = %media_part, "added picture");
    Ok(id)
}

/// Connection site indices of rectangular geometry
mod site {
    pub const TOP: u32 = 0;
    pub const LEFT: u32 = 1;
    pub const BOTTOM: u32 = 2;
    pub const RIGHT: u32 = 3;
}

fn site_point(t: &Transform, site: u32) -> (Emu, Emu) {
    let (cx, cy) = t.center();
    match site {
        site::TOP => (cx, t.top),
        site::LEFT => (t.left, cy),
        site::BOTTOM => (cx, t.bottom()),
        _ => (t.right(), cy),
    }
}

/// Sites on the sides of `start` and `end` that face each other
fn facing_sites(start: &Transform, end: &Transform) -> (u32, u32) {
    let (sx, sy) = start.center();
    let (ex, ey) = end.center();
    let dx = ex.0 - sx.0;
    let dy = ey.0 - sy.0;
    if dx.abs() >= dy.abs() {
        if dx >= 0 {
            (site::RIGHT, site::LEFT)
        } else {
            (site::LEFT, site::RIGHT)
        }
    } else if dy >= 0 {
        (site::BOTTOM, site::TOP)
    } else {
        (site::TOP, site::BOTTOM)
    }
}

/// Connect two shapes; returns the connector's shape id
pub fn add_connector(
    prs: &mut Presentation,
    slide_index: usize,
    start_shape_id: u32,
    end_shape_id: u32,
    kind: ConnectorType,
) -> Result<u32> {
    let slide = prs.slide(slide_index)?;
    let geometry = |shape_id: u32| -> Result<Transform> {
        let shape = slide
            .shape(shape_id)
            .ok_or_else(|| shape_not_found(shape_id, slide_index))?;
        effective_transform(prs, slide, shape).ok_or_else(|| {
            ServerError::InvalidArgument(format!("Shape {} has no position to connect to", shape_id))
        })
    };
    let start = geometry(start_shape_id)?;
    let end = geometry(end_shape_id)?;

    let (start_site, end_site) = facing_sites(&start, &end);
    let route = ConnectorRoute {
        start: (start_shape_id, start_site),
        end: (end_shape_id, end_site),
        from: site_point(&start, start_site),
        to: site_point(&end, end_site),
    };

    let slide = prs.slide_mut(slide_index)?;
    let id = slide.next_shape_id()?;
    slide.push_shape(Shape::new_connector(id, kind, &route));
    debug!(slide_index, id, start_shape_id, end_shape_id, "added connector");
    Ok(id)
}

/// Update an existing shape; returns the aspects that changed
pub fn modify_shape(
    prs: &mut Presentation,
    slide_index: usize,
    shape_id: u32,
    req: &ModifyShapeRequest,
) -> Result<Vec<&'static str>> {
    if req.is_empty() {
        return Err(ServerError::InvalidArgument(
            "No modifications given. Set at least one of text, left_inches, top_inches, \
             width_inches, height_inches or fill_color_rgb."
                .into(),
        ));
    }

    let current = {
        let slide = prs.slide(slide_index)?;
        let shape = slide
            .shape(shape_id)
            .ok_or_else(|| shape_not_found(shape_id, slide_index))?;
        effective_transform(prs, slide, shape).unwrap_or_default()
    };

    let slide = prs.slide_mut(slide_index)?;
    let shape = slide
        .shape_mut(shape_id)
        .ok_or_else(|| shape_not_found(shape_id, slide_index))?;

    let mut updated = Vec::new();
    if let Some(text) = &req.text {
        shape.set_text(text, RunFormat::default())?;
        updated.push("text content");
    }

    let mut frame = current;
    let geometry_fields = [
        (req.left_inches, &mut frame.left, "position (left)"),
        (req.top_inches, &mut frame.top, "position (top)"),
        (req.width_inches, &mut frame.width, "size (width)"),
        (req.height_inches, &mut frame.height, "size (height)"),
    ];
    let mut moved = false;
    for (value, slot, aspect) in geometry_fields {
        if let Some(inches) = value {
            *slot = Emu::from_inches(inches);
            updated.push(aspect);
            moved = true;
        }
    }
    if moved {
        shape.set_transform(frame);
    }

    if let Some(rgb) = req.fill_color_rgb {
        shape.set_fill_rgb(rgb)?;
        updated.push("fill color");
    }

    debug!(slide_index, shape_id, ?updated, "modified shape");
    Ok(updated)
}

/// Remove one shape from a slide
pub fn delete_shape(prs: &mut Presentation, slide_index: usize, shape_id: u32) -> Result<()> {
    let slide = prs.slide_mut(slide_index)?;
    slide
        .remove_shape(shape_id)
        .ok_or_else(|| shape_not_found(shape_id, slide_index))?;
    debug!(slide_index, shape_id, "deleted shape");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::describe::describe_slide;
    use crate::errors::ErrorKind;
    use pretty_assertions::assert_eq;

    /// 1x1 transparent PNG
    const PIXEL_PNG: &str =
        "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn blank_deck() -> Presentation {
        let mut prs = Presentation::new().unwrap();
        prs.add_slide(6).unwrap();
        prs
    }

    /// `f` is left, top, width, height in inches
    fn shape(prs: &mut Presentation, name: &str, f: (f64, f64, f64, f64), text: &str) -> u32 {
        let req = ShapeRequest {
            shape_type_name: name.into(),
            left_inches: f.0,
            top_inches: f.1,
            width_inches: f.2,
            height_inches: f.3,
            text: Some(text.into()),
        };
        add_shape(prs, 0, &req).unwrap()
    }

    #[test]
    fn test_title_and_content() {
        let mut prs = Presentation::new().unwrap();
        prs.add_slide(1).unwrap();
        let warnings = set_title_and_content(&mut prs, 0, "Agenda", "One\nTwo").unwrap();
        assert!(warnings.is_empty());

        let slide = prs.slide(0).unwrap();
        let texts: Vec<_> = slide.shapes().iter().filter_map(|s| s.text()).collect();
        assert_eq!(texts, vec!["Agenda".to_string(), "One\nTwo".to_string()]);
    }

    #[test]
    fn test_title_and_content_warns_on_blank_layout() {
        let mut prs = blank_deck();
        let warnings = set_title_and_content(&mut prs, 0, "T", "C").unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("title placeholder"));
    }

    #[test]
    fn test_title_only_layout_sets_title() {
        let mut prs = Presentation::new().unwrap();
        prs.add_slide(5).unwrap();
        let warnings = set_title_and_content(&mut prs, 0, "Only", "ignored").unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("content placeholder"));
    }

    #[test]
    fn test_textbox_format() {
        let mut prs = blank_deck();
        let req = TextboxRequest {
            text: "a\nb".into(),
            left_inches: 1.0,
            top_inches: 1.0,
            width_inches: 2.0,
            height_inches: 1.0,
            font_size_pt: 18.0,
            bold: true,
        };
        let id = add_textbox(&mut prs, 0, &req).unwrap();
        assert_eq!(id, 2);

        let shape = prs.slide(0).unwrap().shape(id).unwrap();
        assert_eq!(shape.text().unwrap(), "a\nb");
        let mut runs = Vec::new();
        shape.element().visit(&mut |el| {
            if el.name == "a:rPr" {
                runs.push((el.attr("sz").map(str::to_string), el.attr("b").map(str::to_string)));
            }
        });
        assert_eq!(runs.len(), 2);
        assert!(runs
            .iter()
            .all(|(sz, b)| sz.as_deref() == Some("1800") && b.as_deref() == Some("1")));
    }

    /// Every character of the part is an XML 1.0 `Char`, and it parses
    fn assert_well_formed(bytes: &[u8], part: &str) {
        let pkg = crate::opc::Package::from_bytes(bytes).unwrap();
        let data = &pkg.part(part).unwrap().data;
        let xml = std::str::from_utf8(data).unwrap();
        let bad: Vec<char> = xml
            .chars()
            .filter(|&c| {
                !matches!(
                    c,
                    '\t' | '\n' | '\r'
                        | '\u{20}'..='\u{d7ff}'
                        | '\u{e000}'..='\u{fffd}'
                        | '\u{10000}'..='\u{10ffff}'
                )
            })
            .collect();
        assert!(bad.is_empty(), "illegal characters {:?} in {}", bad, part);
        crate::xml::XmlElement::parse(data).unwrap();
    }

    #[test]
    fn test_control_characters_keep_slide_well_formed() {
        let mut prs = blank_deck();
        let req = TextboxRequest {
            text: "bell\u{7}form\u{c}end".into(),
            left_inches: 1.0,
            top_inches: 1.0,
            width_inches: 2.0,
            height_inches: 1.0,
            font_size_pt: 0.0,
            bold: false,
        };
        let textbox = add_textbox(&mut prs, 0, &req).unwrap();
        let rect = shape(&mut prs, "RECTANGLE", (3.0, 1.0, 2.0, 1.0), "nul\u{0}here");
        let req = ModifyShapeRequest {
            text: Some("esc\u{1b}[0m".into()),
            ..Default::default()
        };
        modify_shape(&mut prs, 0, rect, &req).unwrap();

        assert_well_formed(&prs.to_bytes().unwrap(), "ppt/slides/slide1.xml");
        let slide = prs.slide(0).unwrap();
        assert_eq!(slide.shape(textbox).unwrap().text().unwrap(), "bell_x0007_form_x000C_end");
        assert_eq!(slide.shape(rect).unwrap().text().unwrap(), "esc_x001B_[0m");
    }

    #[test]
    fn test_textbox_out_of_range_slide() {
        let mut prs = blank_deck();
        let req = TextboxRequest {
            text: "x".into(),
            left_inches: 0.0,
            top_inches: 0.0,
            width_inches: 1.0,
            height_inches: 1.0,
            font_size_pt: 0.0,
            bold: false,
        };
        let err = add_textbox(&mut prs, 3, &req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(prs.slide(0).unwrap().shapes().is_empty());
    }

    #[test]
    fn test_unknown_shape_type() {
        let mut prs = blank_deck();
        let req = ShapeRequest {
            shape_type_name: "HEXAGRAM_OF_DOOM".into(),
            left_inches: 0.0,
            top_inches: 0.0,
            width_inches: 1.0,
            height_inches: 1.0,
            text: None,
        };
        let err = add_shape(&mut prs, 0, &req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_shape_text_enables_wrap() {
        let mut prs = blank_deck();
        let id = shape(&mut prs, "flowchart_process", (1.0, 1.0, 2.0, 1.0), "Step");
        let shape = prs.slide(0).unwrap().shape(id).unwrap();
        let body_pr = shape.text_body().unwrap().child("a:bodyPr").unwrap();
        assert_eq!(body_pr.attr("wrap"), Some("square"));
        assert_eq!(shape.kind().as_str(), "AUTO_SHAPE");
    }

    #[test]
    fn test_picture_native_and_scaled_size() {
        let mut prs = blank_deck();
        let req = PictureRequest {
            image: PIXEL_PNG.into(),
            left_inches: 1.0,
            top_inches: 1.0,
            width_inches: None,
            height_inches: None,
        };
        let id = add_picture(&mut prs, 0, &req).unwrap();
        let t = prs.slide(0).unwrap().shape(id).unwrap().transform().unwrap();
        // One pixel at 72 dpi
        assert_eq!(t.width, Emu(12_700));
        assert_eq!(t.height, Emu(12_700));

        let scaled = PictureRequest {
            width_inches: Some(2.0),
            ..req
        };
        let id = add_picture(&mut prs, 0, &scaled).unwrap();
        let t = prs.slide(0).unwrap().shape(id).unwrap().transform().unwrap();
        assert_eq!(t.width, Emu::from_inches(2.0));
        assert_eq!(t.height, Emu::from_inches(2.0));
    }

    #[test]
    fn test_picture_rejects_garbage() {
        let mut prs = blank_deck();
        let req = PictureRequest {
            image: base64::engine::general_purpose::STANDARD.encode(b"not an image"),
            left_inches: 0.0,
            top_inches: 0.0,
            width_inches: None,
            height_inches: None,
        };
        let err = add_picture(&mut prs, 0, &req).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_picture_extent_keeps_aspect() {
        let (w, h) = picture_extent(200, 100, None, Some(1.0));
        assert_eq!(h, Emu::from_inches(1.0));
        assert_eq!(w, Emu::from_inches(2.0));
    }

    #[test]
    fn test_connector_glues_facing_sides() {
        let mut prs = blank_deck();
        let a = shape(&mut prs, "RECTANGLE", (1.0, 1.0, 1.0, 1.0), "Start");
        let b = shape(&mut prs, "OVAL", (4.0, 1.0, 1.0, 1.0), "End");
        let id = add_connector(&mut prs, 0, a, b, ConnectorType::Elbow).unwrap();

        let slide = prs.slide(0).unwrap();
        let connector = slide.shape(id).unwrap();
        assert_eq!(connector.kind().as_str(), "LINE");
        let st = connector.element().find(&["p:nvCxnSpPr", "p:cNvCxnSpPr", "a:stCxn"]).unwrap();
        let end = connector.element().find(&["p:nvCxnSpPr", "p:cNvCxnSpPr", "a:endCxn"]).unwrap();
        assert_eq!(st.attr("idx"), Some("3"));
        assert_eq!(end.attr("idx"), Some("1"));

        let t = connector.transform().unwrap();
        assert_eq!(t.left, Emu::from_inches(2.0));
        assert_eq!(t.width, Emu::from_inches(2.0));
        assert_eq!(t.height, Emu(0));
    }

    #[test]
    fn test_connector_vertical_and_missing_shape() {
        let mut prs = blank_deck();
        let a = shape(&mut prs, "RECTANGLE", (1.0, 4.0, 1.0, 1.0), "Low");
        let b = shape(&mut prs, "RECTANGLE", (1.0, 1.0, 1.0, 1.0), "High");
        let id = add_connector(&mut prs, 0, a, b, ConnectorType::Straight).unwrap();
        let connector = prs.slide(0).unwrap().shape(id).unwrap();
        let st = connector.element().find(&["p:nvCxnSpPr", "p:cNvCxnSpPr", "a:stCxn"]).unwrap();
        assert_eq!(st.attr("idx"), Some("0"));
        assert_eq!(connector.element().find(&["p:spPr", "a:xfrm"]).unwrap().attr("flipV"), Some("1"));

        let err = add_connector(&mut prs, 0, a, 99, ConnectorType::Elbow).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_modify_shape_reports_aspects() {
        let mut prs = blank_deck();
        let id = shape(&mut prs, "RECTANGLE", (1.0, 1.0, 2.0, 1.0), "Original Text");

        let req = ModifyShapeRequest {
            text: Some("New Text".into()),
            left_inches: Some(0.5),
            top_inches: Some(0.5),
            ..Default::default()
        };
        let updated = modify_shape(&mut prs, 0, id, &req).unwrap();
        assert_eq!(updated, vec!["text content", "position (left)", "position (top)"]);

        let req = ModifyShapeRequest {
            width_inches: Some(3.0),
            height_inches: Some(1.5),
            fill_color_rgb: Some([255, 0, 0]),
            ..Default::default()
        };
        let updated = modify_shape(&mut prs, 0, id, &req).unwrap();
        assert_eq!(updated, vec!["size (width)", "size (height)", "fill color"]);

        let text = describe_slide(&prs, "deck.pptx", 0).unwrap();
        assert!(text.contains("Left=0.50\", Top=0.50\", Width=3.00\", Height=1.50\", Text='New Text'"));
        assert!(!text.contains("Original Text"));
    }

    #[test]
    fn test_modify_requires_a_change() {
        let mut prs = blank_deck();
        let id = shape(&mut prs, "RECTANGLE", (1.0, 1.0, 2.0, 1.0), "x");
        let err = modify_shape(&mut prs, 0, id, &ModifyShapeRequest::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_delete_shape() {
        let mut prs = blank_deck();
        let keep = shape(&mut prs, "RECTANGLE", (1.0, 1.0, 1.0, 1.0), "Keep");
        let gone = shape(&mut prs, "OVAL", (4.0, 1.0, 1.0, 1.0), "DeleteMe");
        delete_shape(&mut prs, 0, gone).unwrap();

        let text = describe_slide(&prs, "deck.pptx", 0).unwrap();
        assert!(text.contains("Number of Shapes: 1"));
        assert!(text.contains(&format!("ID={}", keep)));
        assert!(!text.contains("DeleteMe"));
        assert_eq!(delete_shape(&mut prs, 0, gone).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_requests_accept_short_names() {
        let req: ShapeRequest = serde_json::from_value(serde_json::json!({
            "shape_type": "OVAL",
            "left": 1, "top": 2, "width": 3, "height": 4
        }))
        .unwrap();
        assert_eq!(req.height_inches, 4.0);
        assert!(req.text.is_none());
    }
}
