//! Zip container and `[Content_Types].xml`

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::errors::{Result, ServerError};
use crate::opc::constants::{default_content_type, namespace};
use crate::opc::rels::{rels_part_name, Relationships};
use crate::xml::XmlElement;

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// One part of the package
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// An OPC package held fully in memory.
///
/// Part names are stored without the leading `/`.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: BTreeMap<String, Part>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a package from zip bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut raw: HashMap<String, Vec<u8>> = HashMap::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            raw.insert(name, data);
        }

        let content_types = raw.remove(CONTENT_TYPES_PART).ok_or_else(|| {
            ServerError::MalformedPackage("missing [Content_Types].xml".to_string())
        })?;
        let types = ContentTypes::parse(&content_types)?;

        let mut parts = BTreeMap::new();
        for (name, data) in raw {
            let content_type = types.lookup(&name).unwrap_or_else(|| {
                tracing::debug!(part = %name, "part has no content type, using application/xml");
                "application/xml".to_string()
            });
            parts.insert(name, Part { content_type, data });
        }

        Ok(Self { parts })
    }

    /// Serialize to zip bytes, content types first
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file(CONTENT_TYPES_PART, options)?;
        zip.write_all(self.content_types_xml().as_bytes())?;

        // Package rels directly after content types, as Office writes them
        let package_rels = rels_part_name("");
        if let Some(part) = self.parts.get(&package_rels) {
            zip.start_file(package_rels.as_str(), options)?;
            zip.write_all(&part.data)?;
        }

        for (name, part) in &self.parts {
            if *name == package_rels {
                continue;
            }
            zip.start_file(name.as_str(), options)?;
            zip.write_all(&part.data)?;
        }

        Ok(zip.finish()?.into_inner())
    }

    fn content_types_xml(&self) -> String {
        let mut root = XmlElement::new("Types").with_attr("xmlns", namespace::CONTENT_TYPES);
        let mut defaults: BTreeMap<String, &str> = BTreeMap::new();
        let mut overrides = Vec::new();

        for (name, part) in &self.parts {
            let ext = extension(name);
            match default_content_type(&ext) {
                Some(ct) if ct == part.content_type => {
                    defaults.insert(ext, ct);
                }
                _ => overrides.push((name, part.content_type.as_str())),
            }
        }
        // rels and xml defaults are always declared
        defaults
            .entry("rels".to_string())
            .or_insert(crate::opc::constants::content_type::OPC_RELATIONSHIPS);
        defaults
            .entry("xml".to_string())
            .or_insert(crate::opc::constants::content_type::XML);

        for (ext, ct) in defaults {
            root.push(
                XmlElement::new("Default")
                    .with_attr("Extension", ext)
                    .with_attr("ContentType", ct),
            );
        }
        for (name, ct) in overrides {
            root.push(
                XmlElement::new("Override")
                    .with_attr("PartName", format!("/{}", name))
                    .with_attr("ContentType", ct),
            );
        }
        root.to_document()
    }

    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.get(name)
    }

    /// Part data, or `MalformedPackage` if the part is missing
    pub fn require(&self, name: &str) -> Result<&[u8]> {
        self.parts
            .get(name)
            .map(|p| p.data.as_slice())
            .ok_or_else(|| ServerError::MalformedPackage(format!("missing part '{}'", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) {
        self.parts.insert(
            name.into(),
            Part {
                content_type: content_type.into(),
                data,
            },
        );
    }

    pub fn remove(&mut self, name: &str) -> Option<Part> {
        self.parts.remove(name)
    }

    pub fn set_content_type(&mut self, name: &str, content_type: &str) {
        if let Some(part) = self.parts.get_mut(name) {
            part.content_type = content_type.to_string();
        }
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    /// Relationships whose source is `source` ("" for the package)
    pub fn relationships(&self, source: &str) -> Result<Relationships> {
        match self.parts.get(&rels_part_name(source)) {
            Some(part) => Relationships::parse(&part.data),
            None => Ok(Relationships::new()),
        }
    }

    pub fn set_relationships(&mut self, source: &str, rels: &Relationships) {
        let name = rels_part_name(source);
        if rels.is_empty() {
            self.parts.remove(&name);
        } else {
            self.insert(
                name,
                crate::opc::constants::content_type::OPC_RELATIONSHIPS,
                rels.to_xml().into_bytes(),
            );
        }
    }

    /// First free name of the form `{prefix}{n}.{ext}`, starting at 1
    pub fn unique_name(&self, prefix: &str, ext: &str) -> String {
        (1..)
            .map(|n| format!("{}{}.{}", prefix, n, ext))
            .find(|candidate| !self.parts.contains_key(candidate))
            .unwrap_or_else(|| format!("{}0.{}", prefix, ext))
    }
}

fn extension(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

struct ContentTypes {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    fn parse(bytes: &[u8]) -> Result<Self> {
        let root = XmlElement::parse(bytes)?;
        let mut defaults = HashMap::new();
        let mut overrides = HashMap::new();
        for el in root.elements() {
            match el.local_name() {
                "Default" => {
                    if let (Some(ext), Some(ct)) = (el.attr("Extension"), el.attr("ContentType")) {
                        defaults.insert(ext.to_ascii_lowercase(), ct.to_string());
                    }
                }
                "Override" => {
                    if let (Some(name), Some(ct)) = (el.attr("PartName"), el.attr("ContentType")) {
                        overrides.insert(
                            name.trim_start_matches('/').to_ascii_lowercase(),
                            ct.to_string(),
                        );
                    }
                }
                _ => {}
            }
        }
        Ok(Self {
            defaults,
            overrides,
        })
    }

    fn lookup(&self, part_name: &str) -> Option<String> {
        self.overrides
            .get(&part_name.to_ascii_lowercase())
            .or_else(|| self.defaults.get(&extension(part_name)))
            .cloned()
    }
}
