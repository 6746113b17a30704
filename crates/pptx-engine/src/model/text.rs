//! DrawingML text bodies (`p:txBody`)

use std::borrow::Cow;

use crate::xml::{XmlElement, XmlNode};

/// Character formatting applied to newly written runs
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunFormat {
    /// Font size in points, if set
    pub size_pt: Option<f64>,
    pub bold: bool,
}

impl RunFormat {
    fn properties(&self) -> XmlElement {
        let mut rpr = XmlElement::new("a:rPr").with_attr("lang", "en-US");
        if let Some(size) = self.size_pt {
            // Hundredths of a point
            rpr.set_attr("sz", ((size * 100.0).round() as i64).to_string());
        }
        if self.bold {
            rpr.set_attr("b", "1");
        }
        rpr.set_attr("dirty", "0");
        rpr
    }
}

/// How a new text body wraps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    /// Text box default: no wrapping, shape grows to fit
    None,
    /// Wrap at the shape edges
    Square,
}

/// Build an empty `p:txBody`
pub fn new_text_body(wrap: Wrap) -> XmlElement {
    let body_pr = match wrap {
        Wrap::None => XmlElement::new("a:bodyPr")
            .with_attr("wrap", "none")
            .with_attr("rtlCol", "0")
            .with_child(XmlElement::new("a:spAutoFit")),
        Wrap::Square => XmlElement::new("a:bodyPr")
            .with_attr("wrap", "square")
            .with_attr("rtlCol", "0")
            .with_attr("anchor", "ctr"),
    };
    XmlElement::new("p:txBody")
        .with_child(body_pr)
        .with_child(XmlElement::new("a:lstStyle"))
        .with_child(empty_paragraph())
}

/// Placeholder text body: inherits everything from the layout
pub fn placeholder_text_body() -> XmlElement {
    XmlElement::new("p:txBody")
        .with_child(XmlElement::new("a:bodyPr"))
        .with_child(XmlElement::new("a:lstStyle"))
        .with_child(empty_paragraph())
}

fn empty_paragraph() -> XmlElement {
    XmlElement::new("a:p").with_child(XmlElement::new("a:endParaRPr").with_attr("lang", "en-US"))
}

/// Plain text of a text body.
///
/// Paragraphs are joined with `\n`, soft line breaks read as `\u{b}`.
pub fn text_of(tx_body: &XmlElement) -> String {
    tx_body
        .elements()
        .filter(|e| e.local_name() == "p")
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
}

fn paragraph_text(p: &XmlElement) -> String {
    let mut out = String::new();
    for child in p.elements() {
        match child.local_name() {
            "r" | "fld" => {
                if let Some(t) = child.elements().find(|e| e.local_name() == "t") {
                    out.push_str(&t.text());
                }
            }
            "br" => out.push('\u{b}'),
            _ => {}
        }
    }
    out
}

/// Replace all text in a text body.
///
/// `\n` starts a new paragraph and `\u{b}` inserts a line break. Body and
/// list-style properties are kept, as are the properties of the first
/// paragraph, which every new paragraph copies.
pub fn set_text(tx_body: &mut XmlElement, text: &str, format: RunFormat) {
    let first = tx_body.elements().find(|e| e.local_name() == "p");
    let para_props = first.and_then(|p| p.elements().find(|e| e.local_name() == "pPr").cloned());
    let end_props = first
        .and_then(|p| p.elements().find(|e| e.local_name() == "endParaRPr").cloned());

    tx_body.retain_elements(|e| e.local_name() != "p");
    if tx_body.child("a:bodyPr").is_none() {
        tx_body.children.insert(0, XmlNode::Element(XmlElement::new("a:bodyPr")));
    }

    for line in text.split('\n') {
        let mut p = XmlElement::new("a:p");
        if let Some(ppr) = &para_props {
            p.push(ppr.clone());
        }
        for (i, segment) in line.split('\u{b}').enumerate() {
            if i > 0 {
                p.push(XmlElement::new("a:br").with_child(format.properties()));
            }
            if !segment.is_empty() {
                p.push(
                    XmlElement::new("a:r")
                        .with_child(format.properties())
                        .with_child(
                            XmlElement::new("a:t").with_text(escape_control_chars(segment)),
                        ),
                );
            }
        }
        p.push(
            end_props
                .clone()
                .unwrap_or_else(|| XmlElement::new("a:endParaRPr").with_attr("lang", "en-US")),
        );
        tx_body.push(p);
    }
}

/// Characters XML 1.0 cannot carry
fn is_xml_illegal(c: char) -> bool {
    matches!(
        c,
        '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}'
    )
}

/// Write XML-illegal characters as `_xHHHH_`, as Office does
fn escape_control_chars(text: &str) -> Cow<'_, str> {
    if !text.chars().any(is_xml_illegal) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if is_xml_illegal(c) {
            out.push_str(&format!("_x{:04X}_", c as u32));
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Turn on word wrap in the body properties
pub fn enable_word_wrap(tx_body: &mut XmlElement) {
    match tx_body.child_mut("a:bodyPr") {
        Some(body_pr) => body_pr.set_attr("wrap", "square"),
        None => tx_body.children.insert(
            0,
            XmlNode::Element(XmlElement::new("a:bodyPr").with_attr("wrap", "square")),
        ),
    }
}
