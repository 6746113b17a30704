//! Plain-text slide descriptions

use std::fmt::Write;

use crate::errors::Result;
use crate::model::{Presentation, Shape, Slide};
use crate::units::Transform;

/// Longest text preview, in characters
const TEXT_PREVIEW_CHARS: usize = 75;

/// Describe the shapes of slide `index`
pub fn describe_slide(prs: &Presentation, filename: &str, index: usize) -> Result<String> {
    let slide = prs.slide(index)?;
    let layout_name = prs
        .layout_of(slide)
        .map(|l| l.name.as_str())
        .unwrap_or("");

    let mut out = String::new();
    let _ = writeln!(
        out,
        "--- Slide {} Content Description for '{}' ---",
        index, filename
    );
    let _ = writeln!(out, "Layout: {}", layout_name);
    let _ = writeln!(out, "Number of Shapes: {}\n", slide.shapes().len());

    for (i, shape) in slide.shapes().iter().enumerate() {
        let _ = write!(
            out,
            "Shape {}: Type={}, ID={}, Name='{}'",
            i,
            shape.kind(),
            shape.id(),
            shape.name()
        );
        match effective_transform(prs, slide, shape) {
            Some(t) => {
                let _ = write!(
                    out,
                    ", Left={}, Top={}, Width={}, Height={}",
                    t.left, t.top, t.width, t.height
                );
            }
            None => out.push_str(" (Position/Size not available)"),
        }
        if let Some(text) = shape.text().filter(|t| !t.trim().is_empty()) {
            let _ = write!(out, ", Text='{}'", preview(&text));
        }
        out.push('\n');
    }

    if slide.shapes().is_empty() {
        out.push_str("(Slide is empty)\n");
    }
    out.push_str("--- End Description ---");
    Ok(out)
}

/// Geometry on the shape, or inherited from layout and master for placeholders
pub fn effective_transform(prs: &Presentation, slide: &Slide, shape: &Shape) -> Option<Transform> {
    shape.transform().or_else(|| {
        let ph = shape.placeholder()?;
        prs.layout_of(slide)?
            .inherited_transform(&ph, prs.master())
    })
}

fn preview(text: &str) -> String {
    let mut short: String = text.chars().take(TEXT_PREVIEW_CHARS).collect();
    if text.chars().count() > TEXT_PREVIEW_CHARS {
        short.push_str("...");
    }
    short.replace(['\u{b}', '\n'], " ")
}
