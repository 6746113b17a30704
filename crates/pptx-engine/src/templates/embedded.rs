//! Embedded default template
//!
//! The static parts are loaded from templates/default at compile time; the
//! layouts are generated from [`DEFAULT_LAYOUTS`](super::layouts::DEFAULT_LAYOUTS).

use crate::errors::Result;
use crate::opc::constants::{content_type, relationship_type};
use crate::opc::{Package, Relationships};

use super::layouts::{layout_xml, DEFAULT_LAYOUTS};

const PRESENTATION_XML: &str = include_str!("../../templates/default/presentation.xml");
const SLIDE_MASTER_XML: &str = include_str!("../../templates/default/slideMaster1.xml");
const THEME_XML: &str = include_str!("../../templates/default/theme1.xml");
const PRES_PROPS_XML: &str = include_str!("../../templates/default/presProps.xml");
const VIEW_PROPS_XML: &str = include_str!("../../templates/default/viewProps.xml");
const TABLE_STYLES_XML: &str = include_str!("../../templates/default/tableStyles.xml");
const CORE_XML: &str = include_str!("../../templates/default/core.xml");
const APP_XML: &str = include_str!("../../templates/default/app.xml");

/// Timestamp written into core.xml in place of this marker
const CORE_STAMP: &str = "2024-01-01T00:00:00Z";

const MAIN_PART: &str = "ppt/presentation.xml";
const MASTER_PART: &str = "ppt/slideMasters/slideMaster1.xml";

/// Current time in W3CDTF, as used by `docProps/core.xml`
pub fn timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Package for a new, empty presentation
pub fn default_package() -> Result<Package> {
    let mut pkg = Package::new();

    let mut root_rels = Relationships::new();
    root_rels.add(relationship_type::OFFICE_DOCUMENT, MAIN_PART);
    root_rels.add(relationship_type::CORE_PROPERTIES, "docProps/core.xml");
    root_rels.add(relationship_type::EXTENDED_PROPERTIES, "docProps/app.xml");
    pkg.set_relationships("", &root_rels);

    pkg.insert(
        "docProps/core.xml",
        content_type::OPC_CORE_PROPERTIES,
        CORE_XML.replace(CORE_STAMP, &timestamp()).into_bytes(),
    );
    pkg.insert(
        "docProps/app.xml",
        content_type::OFC_EXTENDED_PROPERTIES,
        APP_XML.as_bytes().to_vec(),
    );

    pkg.insert(
        MAIN_PART,
        content_type::PML_PRESENTATION_MAIN,
        PRESENTATION_XML.as_bytes().to_vec(),
    );
    let mut main_rels = Relationships::new();
    main_rels.add(relationship_type::SLIDE_MASTER, "slideMasters/slideMaster1.xml");
    main_rels.add(relationship_type::PRES_PROPS, "presProps.xml");
    main_rels.add(relationship_type::VIEW_PROPS, "viewProps.xml");
    main_rels.add(relationship_type::THEME, "theme/theme1.xml");
    main_rels.add(relationship_type::TABLE_STYLES, "tableStyles.xml");
    pkg.set_relationships(MAIN_PART, &main_rels);

    pkg.insert(
        "ppt/presProps.xml",
        content_type::PML_PRES_PROPS,
        PRES_PROPS_XML.as_bytes().to_vec(),
    );
    pkg.insert(
        "ppt/viewProps.xml",
        content_type::PML_VIEW_PROPS,
        VIEW_PROPS_XML.as_bytes().to_vec(),
    );
    pkg.insert(
        "ppt/tableStyles.xml",
        content_type::PML_TABLE_STYLES,
        TABLE_STYLES_XML.as_bytes().to_vec(),
    );
    pkg.insert(
        "ppt/theme/theme1.xml",
        content_type::OFC_THEME,
        THEME_XML.as_bytes().to_vec(),
    );

    // Master relationships: rId1..rId11 are the layouts, in sldLayoutIdLst order
    pkg.insert(
        MASTER_PART,
        content_type::PML_SLIDE_MASTER,
        SLIDE_MASTER_XML.as_bytes().to_vec(),
    );
    let mut master_rels = Relationships::new();
    for (i, layout) in DEFAULT_LAYOUTS.iter().enumerate() {
        let part = format!("ppt/slideLayouts/slideLayout{}.xml", i + 1);
        master_rels.add(
            relationship_type::SLIDE_LAYOUT,
            format!("../slideLayouts/slideLayout{}.xml", i + 1),
        );

        let mut layout_rels = Relationships::new();
        layout_rels.add(
            relationship_type::SLIDE_MASTER,
            "../slideMasters/slideMaster1.xml",
        );
        pkg.set_relationships(&part, &layout_rels);
        pkg.insert(
            part,
            content_type::PML_SLIDE_LAYOUT,
            layout_xml(layout).into_bytes(),
        );
    }
    master_rels.add(relationship_type::THEME, "../theme/theme1.xml");
    pkg.set_relationships(MASTER_PART, &master_rels);

    Ok(pkg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlElement;

    #[test]
    fn test_static_parts_are_well_formed() {
        for xml in [
            PRESENTATION_XML,
            SLIDE_MASTER_XML,
            THEME_XML,
            PRES_PROPS_XML,
            VIEW_PROPS_XML,
            TABLE_STYLES_XML,
            CORE_XML,
            APP_XML,
        ] {
            assert!(XmlElement::parse(xml.as_bytes()).is_ok());
        }
    }

    #[test]
    fn test_master_lists_every_layout() {
        let master = XmlElement::parse(SLIDE_MASTER_XML.as_bytes()).unwrap();
        let ids = master.child("p:sldLayoutIdLst").unwrap().elements().count();
        assert_eq!(ids, DEFAULT_LAYOUTS.len());
    }

    #[test]
    fn test_default_package_stamps_core_properties() {
        let pkg = default_package().unwrap();
        let core = String::from_utf8(pkg.require("docProps/core.xml").unwrap().to_vec()).unwrap();
        assert!(!core.contains(CORE_STAMP));
        assert_eq!(
            pkg.relationships(MASTER_PART).unwrap().get("rId12").unwrap().rel_type,
            relationship_type::THEME
        );
    }
}
