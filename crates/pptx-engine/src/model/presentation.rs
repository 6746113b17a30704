//! Presentation: load a package, edit slides, write it back

use std::collections::HashSet;

use crate::errors::{Result, ServerError};
use crate::model::layout::{Layout, Master};
use crate::model::slide::Slide;
use crate::opc::constants::{content_type, relationship_type};
use crate::opc::{
    relative_target, rels_part_name, resolve_target, Package, Relationship, Relationships,
};
use crate::templates;
use crate::units::Emu;
use crate::xml::{XmlElement, XmlNode};

/// Default slide size, 10" x 7.5"
pub const DEFAULT_SLIDE_SIZE: (Emu, Emu) = (Emu(9_144_000), Emu(6_858_000));

/// Smallest legal `p:sldId/@id`
const MIN_SLIDE_ID: u32 = 256;

/// An open presentation
#[derive(Debug, Clone)]
pub struct Presentation {
    package: Package,
    main_part: String,
    main: XmlElement,
    main_rels: Relationships,
    slide_size: (Emu, Emu),
    master: Option<Master>,
    layouts: Vec<Layout>,
    slides: Vec<Slide>,
}

impl Presentation {
    /// New empty presentation from the built-in template
    pub fn new() -> Result<Self> {
        Self::from_package(templates::default_package()?)
    }

    /// Open a `.pptx` (or `.potx`) from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_package(Package::from_bytes(bytes)?)
    }

    pub fn from_package(mut package: Package) -> Result<Self> {
        let main_part = package
            .relationships("")?
            .of_type(relationship_type::OFFICE_DOCUMENT)
            .next()
            .map(|r| resolve_target("", &r.target))
            .ok_or_else(|| {
                ServerError::MalformedPackage("package has no main document".to_string())
            })?;

        let main_type = package
            .part(&main_part)
            .map(|p| p.content_type.clone())
            .ok_or_else(|| {
                ServerError::MalformedPackage(format!("missing main part '{}'", main_part))
            })?;
        match main_type.as_str() {
            content_type::PML_PRESENTATION_MAIN => {}
            content_type::PML_TEMPLATE_MAIN | content_type::PML_SLIDESHOW_MAIN => {
                package.set_content_type(&main_part, content_type::PML_PRESENTATION_MAIN);
            }
            other => {
                return Err(ServerError::MalformedPackage(format!(
                    "not a presentation (main part type '{}')",
                    other
                )))
            }
        }

        let main = XmlElement::parse(package.require(&main_part)?)?;
        let main_rels = package.relationships(&main_part)?;

        let slide_size = main
            .child("p:sldSz")
            .and_then(|sz| {
                let cx = sz.attr("cx")?.parse().ok()?;
                let cy = sz.attr("cy")?.parse().ok()?;
                Some((Emu(cx), Emu(cy)))
            })
            .unwrap_or(DEFAULT_SLIDE_SIZE);

        let master = match main
            .child("p:sldMasterIdLst")
            .and_then(|list| list.elements().next())
            .and_then(|e| e.attr("r:id"))
            .and_then(|rid| main_rels.get(rid))
        {
            Some(rel) => {
                let part = resolve_target(&main_part, &rel.target);
                let xml = package.require(&part)?;
                Some(Master::parse(part, xml)?)
            }
            None => None,
        };

        let mut layouts = Vec::new();
        if let Some(master) = &master {
            let master_rels = package.relationships(&master.part)?;
            for rid in &master.layout_rel_ids {
                let Some(rel) = master_rels.get(rid) else {
                    tracing::warn!(rid = %rid, "layout relationship missing from master");
                    continue;
                };
                let part = resolve_target(&master.part, &rel.target);
                layouts.push(Layout::parse(part.clone(), package.require(&part)?)?);
            }
        }

        let mut slides = Vec::new();
        if let Some(list) = main.child("p:sldIdLst") {
            for entry in list.elements() {
                let (Some(id), Some(rid)) = (entry.attr("id"), entry.attr("r:id")) else {
                    continue;
                };
                let rel = main_rels.get(rid).ok_or_else(|| {
                    ServerError::MalformedPackage(format!("slide relationship '{}' missing", rid))
                })?;
                let part = resolve_target(&main_part, &rel.target);
                let rels = package.relationships(&part)?;
                slides.push(Slide::parse(
                    part.clone(),
                    id.parse().unwrap_or(MIN_SLIDE_ID),
                    rid.to_string(),
                    package.require(&part)?,
                    rels,
                )?);
            }
        }

        Ok(Self {
            package,
            main_part,
            main,
            main_rels,
            slide_size,
            master,
            layouts,
            slides,
        })
    }

    pub fn slide_size(&self) -> (Emu, Emu) {
        self.slide_size
    }

    pub fn master(&self) -> Option<&Master> {
        self.master.as_ref()
    }

    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn slide(&self, index: usize) -> Result<&Slide> {
        self.slides
            .get(index)
            .ok_or_else(|| ServerError::slide_out_of_range(index, self.slides.len()))
    }

    pub fn slide_mut(&mut self, index: usize) -> Result<&mut Slide> {
        let count = self.slides.len();
        self.slides
            .get_mut(index)
            .ok_or_else(|| ServerError::slide_out_of_range(index, count))
    }

    /// Layout a slide uses
    pub fn layout_of(&self, slide: &Slide) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.part == slide.layout_part)
    }

    /// Append a slide using layout `layout_index` of the first master.
    /// Returns the new slide's index.
    pub fn add_slide(&mut self, layout_index: usize) -> Result<usize> {
        let layout = self.layouts.get(layout_index).ok_or_else(|| {
            ServerError::InvalidArgument(format!(
                "Invalid layout_index {}. Presentation has {} layouts (0-indexed).",
                layout_index,
                self.layouts.len()
            ))
        })?;

        let part = (1..)
            .map(|n| resolve_target(&self.main_part, &format!("slides/slide{}.xml", n)))
            .find(|candidate| {
                !self.package.contains(candidate) && !self.slides.iter().any(|s| s.part == *candidate)
            })
            .ok_or_else(|| ServerError::MalformedPackage("no free slide part name".to_string()))?;
        let rel_id = self.main_rels.add(
            relationship_type::SLIDE,
            relative_target(&self.main_part, &part),
        );
        let slide_id = match self.slides.iter().map(|s| s.slide_id).max() {
            Some(max) => max.checked_add(1).ok_or_else(|| {
                ServerError::MalformedPackage("slide ids exhausted".to_string())
            })?,
            None => MIN_SLIDE_ID,
        }
        .max(MIN_SLIDE_ID);

        tracing::debug!(part = %part, layout = %layout.name, "adding slide");
        self.slides.push(Slide::new(part, slide_id, rel_id, layout));
        Ok(self.slides.len() - 1)
    }

    /// Remove every slide and its notes, keeping masters, layouts and theme
    pub fn clear_slides(&mut self) -> Result<()> {
        for slide in self.slides.drain(..) {
            for rel in slide.rels.of_type(relationship_type::NOTES_SLIDE) {
                let notes = resolve_target(&slide.part, &rel.target);
                self.package.remove(&rels_part_name(&notes));
                self.package.remove(&notes);
            }
            self.package.remove(&rels_part_name(&slide.part));
            self.package.remove(&slide.part);
        }
        self.main_rels
            .retain(|r| r.rel_type != relationship_type::SLIDE);
        Ok(())
    }

    /// Drop every slide except `index`
    pub fn retain_slide(&mut self, index: usize) -> Result<()> {
        if index >= self.slides.len() {
            return Err(ServerError::slide_out_of_range(index, self.slides.len()));
        }
        let kept = self.slides.remove(index);
        self.clear_slides()?;
        self.main_rels.push(Relationship {
            id: kept.rel_id.clone(),
            rel_type: relationship_type::SLIDE.to_string(),
            target: relative_target(&self.main_part, &kept.part),
            external: false,
        });
        self.slides.push(kept);
        Ok(())
    }

    /// Store image bytes as a media part, reusing an identical one
    pub fn add_media(&mut self, data: Vec<u8>, extension: &str, media_type: &str) -> String {
        let media_prefix = resolve_target(&self.main_part, "media/image");
        let media_dir = resolve_target(&self.main_part, "media/");
        let existing = self
            .package
            .part_names()
            .filter(|name| name.starts_with(&media_dir))
            .find(|name| {
                self.package
                    .part(name)
                    .map(|p| p.data == data)
                    .unwrap_or(false)
            })
            .map(str::to_string);
        if let Some(name) = existing {
            return name;
        }
        let name = self.package.unique_name(&media_prefix, extension);
        self.package.insert(name.clone(), media_type, data);
        name
    }

    /// Serialize the presentation to `.pptx` bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut package = self.package.clone();

        for slide in &self.slides {
            let mut slide = slide.clone();
            slide.prune_image_rels();
            package.insert(
                slide.part.clone(),
                content_type::PML_SLIDE,
                slide.to_xml().into_bytes(),
            );
            package.set_relationships(&slide.part, &slide.rels);
        }

        let mut main = self.main.clone();
        write_slide_list(&mut main, &self.slides);
        prune_slide_references(&mut main, &self.slides);
        package.insert(
            self.main_part.clone(),
            content_type::PML_PRESENTATION_MAIN,
            main.to_document().into_bytes(),
        );
        package.set_relationships(&self.main_part, &self.main_rels);

        collect_unused_media(&mut package)?;
        touch_core_properties(&mut package)?;
        package.to_bytes()
    }
}

/// Drop section entries (`p14:sectionLst`) and custom show entries
/// (`p:custShowLst`) that point at removed slides
fn prune_slide_references(main: &mut XmlElement, slides: &[Slide]) {
    let ids: HashSet<String> = slides.iter().map(|s| s.slide_id.to_string()).collect();
    let rel_ids: HashSet<&str> = slides.iter().map(|s| s.rel_id.as_str()).collect();

    main.visit_mut(&mut |el| match el.local_name() {
        "sectionLst" => el.visit_mut(&mut |section_ids| {
            if section_ids.local_name() == "sldIdLst" {
                section_ids.retain_elements(|e| {
                    e.local_name() != "sldId" || e.attr("id").is_some_and(|id| ids.contains(id))
                });
            }
        }),
        "custShowLst" => {
            for show in el.elements_mut() {
                if let Some(list) = show.child_mut("p:sldLst") {
                    list.retain_elements(|e| {
                        e.attr("r:id").is_some_and(|rid| rel_ids.contains(rid))
                    });
                }
            }
            el.retain_elements(|show| {
                show.child("p:sldLst")
                    .map(|list| list.elements().next().is_some())
                    .unwrap_or(true)
            });
        }
        _ => {}
    });
    main.retain_elements(|e| e.name != "p:custShowLst" || e.elements().next().is_some());
}

/// Replace `p:sldIdLst` with the current slide order
fn write_slide_list(main: &mut XmlElement, slides: &[Slide]) {
    main.retain_elements(|e| e.name != "p:sldIdLst");
    if slides.is_empty() {
        return;
    }
    let mut list = XmlElement::new("p:sldIdLst");
    for slide in slides {
        list.push(
            XmlElement::new("p:sldId")
                .with_attr("id", slide.slide_id.to_string())
                .with_attr("r:id", slide.rel_id.as_str()),
        );
    }
    let pos = main
        .children
        .iter()
        .position(|n| match n {
            XmlNode::Element(e) => !matches!(
                e.local_name(),
                "sldMasterIdLst" | "notesMasterIdLst" | "handoutMasterIdLst"
            ),
            XmlNode::Text(_) => false,
        })
        .unwrap_or(main.children.len());
    main.children.insert(pos, XmlNode::Element(list));
}

/// Drop media parts no relationship points at
fn collect_unused_media(package: &mut Package) -> Result<()> {
    let mut referenced = HashSet::new();
    let rels_parts: Vec<String> = package
        .part_names()
        .filter(|n| n.ends_with(".rels"))
        .map(str::to_string)
        .collect();
    for rels_part in rels_parts {
        let source = source_of_rels_part(&rels_part);
        let rels = Relationships::parse(package.require(&rels_part)?)?;
        for rel in rels.iter().filter(|r| !r.external) {
            referenced.insert(resolve_target(&source, &rel.target));
        }
    }

    let unused: Vec<String> = package
        .part_names()
        .filter(|n| n.contains("/media/") && !referenced.contains(*n))
        .map(str::to_string)
        .collect();
    for name in unused {
        tracing::debug!(part = %name, "dropping unreferenced media");
        package.remove(&name);
    }
    Ok(())
}

fn source_of_rels_part(rels_part: &str) -> String {
    let (dir, file) = rels_part.rsplit_once("_rels/").unwrap_or(("", rels_part));
    let file = file.trim_end_matches(".rels");
    format!("{}{}", dir, file)
}

/// Stamp `dcterms:modified` with the current time
fn touch_core_properties(package: &mut Package) -> Result<()> {
    let Some(core) = package
        .relationships("")?
        .of_type(relationship_type::CORE_PROPERTIES)
        .next()
        .map(|r| resolve_target("", &r.target))
    else {
        return Ok(());
    };
    let Some(part) = package.part(&core) else {
        return Ok(());
    };
    let mut root = XmlElement::parse(&part.data)?;
    let content_type = part.content_type.clone();
    let Some(modified) = root.elements_mut().find(|e| e.local_name() == "modified") else {
        return Ok(());
    };
    modified.children = vec![XmlNode::Text(templates::timestamp())];
    package.insert(core, content_type, root.to_document().into_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_new_presentation_is_empty_with_default_layouts() {
        let prs = Presentation::new().unwrap();
        assert_eq!(prs.slide_count(), 0);
        assert_eq!(prs.slide_size(), DEFAULT_SLIDE_SIZE);
        let names: Vec<_> = prs.layouts().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names.len(), 11);
        assert_eq!(names[0], "Title Slide");
        assert_eq!(names[5], "Title Only");
        assert_eq!(names[6], "Blank");
    }

    #[test]
    fn test_empty_presentation_round_trip() {
        let prs = Presentation::new().unwrap();
        let bytes = prs.to_bytes().unwrap();
        assert_eq!(&bytes[..4], b"PK\x03\x04");
        let reopened = Presentation::from_bytes(&bytes).unwrap();
        assert_eq!(reopened.slide_count(), 0);
        assert_eq!(reopened.layouts().len(), 11);
    }

    #[test]
    fn test_add_slide_persists_layout_and_order() {
        let mut prs = Presentation::new().unwrap();
        assert_eq!(prs.add_slide(0).unwrap(), 0);
        assert_eq!(prs.add_slide(6).unwrap(), 1);
        let reopened = Presentation::from_bytes(&prs.to_bytes().unwrap()).unwrap();
        let layouts: Vec<_> = reopened
            .slides()
            .iter()
            .map(|s| reopened.layout_of(s).unwrap().name.clone())
            .collect();
        assert_eq!(layouts, vec!["Title Slide", "Blank"]);
        assert_eq!(reopened.slides()[0].slide_id, 256);
        assert_eq!(reopened.slides()[1].slide_id, 257);
    }

    #[test]
    fn test_add_slide_rejects_bad_layout() {
        let mut prs = Presentation::new().unwrap();
        let err = prs.add_slide(11).unwrap_err();
        assert!(matches!(err, ServerError::InvalidArgument(_)));
        assert_eq!(prs.slide_count(), 0);
    }

    #[test]
    fn test_slide_index_out_of_range() {
        let prs = Presentation::new().unwrap();
        let err = prs.slide(0).unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[test]
    fn test_clear_slides_keeps_layouts() {
        let mut prs = Presentation::new().unwrap();
        prs.add_slide(1).unwrap();
        prs.add_slide(1).unwrap();
        let mut reopened = Presentation::from_bytes(&prs.to_bytes().unwrap()).unwrap();
        reopened.clear_slides().unwrap();
        let bytes = reopened.to_bytes().unwrap();
        let cleared = Presentation::from_bytes(&bytes).unwrap();
        assert_eq!(cleared.slide_count(), 0);
        assert_eq!(cleared.layouts().len(), 11);
        let pkg = Package::from_bytes(&bytes).unwrap();
        assert!(!pkg.contains("ppt/slides/slide1.xml"));
    }

    #[test]
    fn test_slide_id_overflow_is_malformed_package() {
        let mut prs = Presentation::new().unwrap();
        prs.add_slide(6).unwrap();
        prs.slides[0].slide_id = u32::MAX;
        let err = prs.add_slide(6).unwrap_err();
        assert!(matches!(err, ServerError::MalformedPackage(_)));
        assert_eq!(prs.slide_count(), 1);
    }

    fn saved_main(prs: &Presentation) -> XmlElement {
        let pkg = Package::from_bytes(&prs.to_bytes().unwrap()).unwrap();
        XmlElement::parse(&pkg.part("ppt/presentation.xml").unwrap().data).unwrap()
    }

    #[test]
    fn test_removed_slides_pruned_from_sections_and_custom_shows() {
        let mut prs = Presentation::new().unwrap();
        prs.add_slide(0).unwrap();
        prs.add_slide(6).unwrap();
        let (first, second) = (prs.slides[0].clone(), prs.slides[1].clone());

        let shows = format!(
            r#"<p:custShowLst>
<p:custShow name="Opening" id="0"><p:sldLst><p:sld r:id="{}"/></p:sldLst></p:custShow>
<p:custShow name="Closing" id="1"><p:sldLst><p:sld r:id="{}"/></p:sldLst></p:custShow>
</p:custShowLst>"#,
            first.rel_id, second.rel_id
        );
        let sections = format!(
            r#"<p:extLst><p:ext uri="{{521415D9-36F7-43E2-AB2F-B90AF26B5E84}}">
<p14:sectionLst xmlns:p14="http://schemas.microsoft.com/office/powerpoint/2010/main">
<p14:section name="Main" id="{{8D8B35F1-7A5C-4B9E-9C1D-2F0E4A6B7C80}}"><p14:sldIdLst>
<p14:sldId id="{}"/><p14:sldId id="{}"/>
</p14:sldIdLst></p14:section></p14:sectionLst></p:ext></p:extLst>"#,
            first.slide_id, second.slide_id
        );
        prs.main.push(XmlElement::parse(shows.as_bytes()).unwrap());
        prs.main.push(XmlElement::parse(sections.as_bytes()).unwrap());

        let section_ids = |main: &XmlElement| {
            let mut ids = Vec::new();
            main.visit(&mut |e| {
                if e.name == "p14:sldId" {
                    ids.push(e.attr("id").unwrap_or_default().to_string());
                }
            });
            ids
        };
        let show_names = |main: &XmlElement| -> Vec<String> {
            main.child("p:custShowLst")
                .map(|l| l.elements().filter_map(|s| s.attr("name")).map(str::to_string).collect())
                .unwrap_or_default()
        };

        prs.retain_slide(1).unwrap();
        let main = saved_main(&prs);
        assert_eq!(section_ids(&main), vec![second.slide_id.to_string()]);
        assert_eq!(show_names(&main), vec!["Closing"]);

        prs.clear_slides().unwrap();
        let main = saved_main(&prs);
        assert!(section_ids(&main).is_empty());
        assert!(main.child("p:custShowLst").is_none());
        // The section itself survives, only its slide list empties
        assert!(main.find(&["p:extLst", "p:ext", "p14:sectionLst", "p14:section"]).is_some());
    }

    #[test]
    fn test_media_is_shared_and_collected() {
        let mut prs = Presentation::new().unwrap();
        let a = prs.add_media(vec![1, 2, 3], "png", content_type::PNG);
        let b = prs.add_media(vec![1, 2, 3], "png", content_type::PNG);
        assert_eq!(a, "ppt/media/image1.png");
        assert_eq!(a, b);
        // Nothing references it, so the saved package drops it
        let pkg = Package::from_bytes(&prs.to_bytes().unwrap()).unwrap();
        assert!(!pkg.contains("ppt/media/image1.png"));
    }

    #[test]
    fn test_source_of_rels_part() {
        assert_eq!(source_of_rels_part("_rels/.rels"), "");
        assert_eq!(
            source_of_rels_part("ppt/slides/_rels/slide1.xml.rels"),
            "ppt/slides/slide1.xml"
        );
    }

    #[test]
    fn test_template_main_part_is_converted() {
        let mut pkg = templates::default_package().unwrap();
        pkg.set_content_type("ppt/presentation.xml", content_type::PML_TEMPLATE_MAIN);
        let prs = Presentation::from_package(pkg).unwrap();
        let saved = Package::from_bytes(&prs.to_bytes().unwrap()).unwrap();
        assert_eq!(
            saved.part("ppt/presentation.xml").unwrap().content_type,
            content_type::PML_PRESENTATION_MAIN
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_slides_keep_call_order(layouts in proptest::collection::vec(0usize..11, 1..6)) {
            let mut prs = Presentation::new().unwrap();
            for &layout in &layouts {
                prs.add_slide(layout).unwrap();
            }
            let reopened = Presentation::from_bytes(&prs.to_bytes().unwrap()).unwrap();
            let names: Vec<String> = reopened
                .slides()
                .iter()
                .map(|s| reopened.layout_of(s).unwrap().name.clone())
                .collect();
            let expected: Vec<String> = layouts
                .iter()
                .map(|&i| prs.layouts()[i].name.clone())
                .collect();
            prop_assert_eq!(names, expected);
        }
    }

    #[test]
    fn test_retain_slide_keeps_one() {
        let mut prs = Presentation::new().unwrap();
        prs.add_slide(0).unwrap();
        prs.add_slide(6).unwrap();
        prs.add_slide(5).unwrap();
        prs.retain_slide(1).unwrap();

        let reopened = Presentation::from_bytes(&prs.to_bytes().unwrap()).unwrap();
        assert_eq!(reopened.slide_count(), 1);
        let layout = reopened.layout_of(reopened.slide(0).unwrap()).unwrap();
        assert_eq!(layout.name, "Blank");
        assert!(prs.retain_slide(4).is_err());
    }
}
