//! MCP Resource providers
//!
//! - `pptx://{filename}/file`: the saved `.pptx` as a base64 blob
//! - `pptx://{filename}/slide/{slide_index}/description`: slide description text

use base64::{engine::general_purpose::STANDARD, Engine};
use pptx_engine::{normalize_filename, PresentationStore, Result, ServerError, PPTX_MIME_TYPE};

use super::protocol::{Resource, ResourceContent, ResourceTemplate};
use super::{tools, PptxMcpServer};

const SCHEME: &str = "pptx://";

/// A parsed `pptx://` URI
#[derive(Debug, Clone, PartialEq, Eq)]
enum PptxUri {
    File(String),
    SlideDescription(String, usize),
}

fn parse_uri(uri: &str) -> Result<PptxUri> {
    let not_found = || ServerError::ResourceNotFound(uri.to_string());
    let rest = uri.strip_prefix(SCHEME).ok_or_else(not_found)?;

    if let Some(filename) = rest.strip_suffix("/file") {
        if filename.is_empty() || filename.contains('/') {
            return Err(not_found());
        }
        return Ok(PptxUri::File(filename.to_string()));
    }

    let slide = rest.strip_suffix("/description").ok_or_else(not_found)?;
    let (filename, index) = slide.rsplit_once("/slide/").ok_or_else(not_found)?;
    if filename.is_empty() || filename.contains('/') {
        return Err(not_found());
    }
    let index = index.parse::<usize>().map_err(|_| {
        ServerError::InvalidArgument(format!(
            "Slide index must be a non-negative integer, got '{}'.",
            index
        ))
    })?;
    Ok(PptxUri::SlideDescription(filename.to_string(), index))
}

pub fn file_uri(filename: &str) -> String {
    format!("{}{}/file", SCHEME, filename)
}

/// Embedded copy of a saved presentation
pub fn file_content(filename: &str, bytes: &[u8]) -> ResourceContent {
    ResourceContent {
        uri: file_uri(filename),
        mime_type: Some(PPTX_MIME_TYPE.to_string()),
        text: None,
        blob: Some(STANDARD.encode(bytes)),
    }
}

/// One file resource per saved presentation
pub async fn list_resources(store: &PresentationStore) -> Result<Vec<Resource>> {
    let presentations = store.list_presentations().await?;
    Ok(presentations
        .into_iter()
        .map(|info| Resource {
            uri: file_uri(&info.filename),
            description: Some(format!("Presentation file ({} bytes)", info.size_bytes)),
            name: info.filename,
            mime_type: Some(PPTX_MIME_TYPE.to_string()),
        })
        .collect())
}

pub fn get_resource_templates() -> Vec<ResourceTemplate> {
    vec![
        ResourceTemplate {
            uri_template: "pptx://{filename}/slide/{slide_index}/description".to_string(),
            name: "Slide content description".to_string(),
            description: Some(
                "Shapes on a slide with their type, ID, position, size and text".to_string(),
            ),
            mime_type: Some("text/plain".to_string()),
        },
        ResourceTemplate {
            uri_template: "pptx://{filename}/file".to_string(),
            name: "Presentation file".to_string(),
            description: Some("The saved .pptx file".to_string()),
            mime_type: Some(PPTX_MIME_TYPE.to_string()),
        },
    ]
}

/// Read a resource by URI
pub async fn read_resource(server: &PptxMcpServer, uri: &str) -> Result<ResourceContent> {
    match parse_uri(uri)? {
        PptxUri::File(filename) => {
            let bytes = server.store().file_bytes(&filename).await?;
            Ok(file_content(&normalize_filename(&filename)?, &bytes))
        }
        PptxUri::SlideDescription(filename, index) => {
            let text = tools::describe(server, &filename, index).await?;
            Ok(ResourceContent {
                uri: uri.to_string(),
                mime_type: Some("text/plain".to_string()),
                text: Some(text),
                blob: None,
            })
        }
    }
}
