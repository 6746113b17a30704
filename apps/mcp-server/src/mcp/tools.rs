//! MCP Tool definitions and handlers

use base64::{engine::general_purpose::STANDARD, Engine};
use pptx_engine::operations::{self, BatchRequest, ModifyShapeRequest, PictureRequest, ShapeRequest, TextboxRequest};
use pptx_engine::render::single_slide_deck;
use pptx_engine::{describe_slide, normalize_filename, ConnectorType, Result, ServerError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::protocol::{Tool, ToolResultContent};
use super::resources;
use super::PptxMcpServer;

const DEFAULT_LAYOUT_INDEX: usize = 5;

fn default_layout_index() -> usize {
    DEFAULT_LAYOUT_INDEX
}

fn geometry_schema(required: bool) -> Value {
    let suffix = if required { "" } else { " (optional)" };
    json!({
        "left_inches": {"type": "number", "description": format!("Distance from the left edge in inches{}", suffix)},
        "top_inches": {"type": "number", "description": format!("Distance from the top edge in inches{}", suffix)},
        "width_inches": {"type": "number", "description": format!("Width in inches{}", suffix)},
        "height_inches": {"type": "number", "description": format!("Height in inches{}", suffix)}
    })
}

/// Merge `extra` properties into an object schema
fn object_schema(properties: Value, extra: Value, required: &[&str]) -> Value {
    let mut merged = properties;
    if let (Some(target), Value::Object(extra)) = (merged.as_object_mut(), extra) {
        target.extend(extra);
    }
    json!({
        "type": "object",
        "properties": merged,
        "required": required
    })
}

fn filename_property() -> Value {
    json!({"type": "string", "description": "Presentation filename; .pptx is appended when missing"})
}

fn slide_index_property() -> Value {
    json!({"type": "integer", "minimum": 0, "description": "0-based slide index"})
}

/// Get all tool definitions
pub fn get_tool_definitions() -> Vec<Tool> {
    vec![
        Tool {
            name: "create_or_clear_presentation".to_string(),
            description: Some(
                "Create a new, empty presentation with the given filename, or clear an existing one. \
                 Overwrites the file if it exists. Optionally start from a template in the templates \
                 directory (its slides are removed, masters and layouts are kept)."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "filename": filename_property(),
                    "template": {"type": "string", "description": "Template name from list_templates"}
                },
                "required": ["filename"]
            }),
        },
        Tool {
            name: "add_slide".to_string(),
            description: Some(
                "Add a new slide using a layout index. Common layouts: 0=Title, 1=Title+Content, \
                 5=Title Only, 6=Blank. Returns the index of the new slide."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "filename": filename_property(),
                    "layout_index": {"type": "integer", "minimum": 0, "default": DEFAULT_LAYOUT_INDEX}
                },
                "required": ["filename"]
            }),
        },
        Tool {
            name: "add_title_and_content".to_string(),
            description: Some(
                "Fill the title and main content placeholders of a slide. Newlines in content \
                 become separate paragraphs. Works best on layout 1 (Title and Content)."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "filename": filename_property(),
                    "slide_index": slide_index_property(),
                    "title": {"type": "string"},
                    "content": {"type": "string"}
                },
                "required": ["filename", "slide_index", "title", "content"]
            }),
        },
        Tool {
            name: "add_textbox".to_string(),
            description: Some(
                "Add a textbox with text, position and size (in inches) to a slide. \
                 Set font_size_pt to 0 or less to keep the default font size."
                    .to_string(),
            ),
            input_schema: object_schema(
                json!({
                    "filename": filename_property(),
                    "slide_index": slide_index_property(),
                    "text": {"type": "string", "description": "Text; newlines start new paragraphs"},
                    "font_size_pt": {"type": "number", "default": 0},
                    "bold": {"type": "boolean", "default": false}
                }),
                geometry_schema(true),
                &[
                    "filename",
                    "slide_index",
                    "text",
                    "left_inches",
                    "top_inches",
                    "width_inches",
                    "height_inches",
                ],
            ),
        },
        Tool {
            name: "add_shape".to_string(),
            description: Some(
                "Add an AutoShape (like RECTANGLE, OVAL, FLOWCHART_PROCESS) to a slide. \
                 Position and size are in inches. Optional text is placed inside the shape."
                    .to_string(),
            ),
            input_schema: object_schema(
                json!({
                    "filename": filename_property(),
                    "slide_index": slide_index_property(),
                    "shape_type_name": {"type": "string", "description": "Shape name, see the available_shapes prompt"},
                    "text": {"type": "string"}
                }),
                geometry_schema(true),
                &[
                    "filename",
                    "slide_index",
                    "shape_type_name",
                    "left_inches",
                    "top_inches",
                    "width_inches",
                    "height_inches",
                ],
            ),
        },
        Tool {
            name: "add_picture".to_string(),
            description: Some(
                "Add a picture from base64 image data (PNG, JPEG, GIF, BMP or TIFF). Position is in \
                 inches. Give width OR height to scale with the aspect ratio kept; with neither, \
                 the image's native size is used."
                    .to_string(),
            ),
            input_schema: object_schema(
                json!({
                    "filename": filename_property(),
                    "slide_index": slide_index_property(),
                    "image": {"type": "string", "description": "Base64 encoded image bytes"},
                    "left_inches": {"type": "number"},
                    "top_inches": {"type": "number"}
                }),
                json!({
                    "width_inches": {"type": "number"},
                    "height_inches": {"type": "number"}
                }),
                &["filename", "slide_index", "image", "left_inches", "top_inches"],
            ),
        },
        Tool {
            name: "get_slide_content_description".to_string(),
            description: Some(
                "Describe the shapes on a slide: type, ID, name, position, size and text."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "filename": filename_property(),
                    "slide_index": slide_index_property()
                },
                "required": ["filename", "slide_index"]
            }),
        },
        Tool {
            name: "get_slide_image".to_string(),
            description: Some(
                "Render a slide as a PNG image using LibreOffice. Requires LibreOffice to be \
                 installed and may take several seconds."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "filename": filename_property(),
                    "slide_index": slide_index_property()
                },
                "required": ["filename", "slide_index"]
            }),
        },
        Tool {
            name: "get_pptx_file".to_string(),
            description: Some("Return the saved .pptx file as an embedded resource.".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "filename": filename_property()
                },
                "required": ["filename"]
            }),
        },
        Tool {
            name: "add_connector".to_string(),
            description: Some(
                "Connect two shapes on a slide with a connector line. The connector is glued to \
                 the facing sides of both shapes."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "filename": filename_property(),
                    "slide_index": slide_index_property(),
                    "start_shape_id": {"type": "integer", "minimum": 0},
                    "end_shape_id": {"type": "integer", "minimum": 0},
                    "connector_type": {
                        "type": "string",
                        "enum": ["STRAIGHT", "ELBOW", "CURVED"],
                        "default": "ELBOW"
                    }
                },
                "required": ["filename", "slide_index", "start_shape_id", "end_shape_id"]
            }),
        },
        Tool {
            name: "modify_shape".to_string(),
            description: Some(
                "Change the text, position, size or fill color of an existing shape. Only the \
                 given fields are updated."
                    .to_string(),
            ),
            input_schema: object_schema(
                json!({
                    "filename": filename_property(),
                    "slide_index": slide_index_property(),
                    "shape_id": {"type": "integer", "minimum": 0},
                    "text": {"type": "string"},
                    "fill_color_rgb": {
                        "type": "array",
                        "items": {"type": "integer", "minimum": 0, "maximum": 255},
                        "minItems": 3,
                        "maxItems": 3,
                        "description": "[red, green, blue]; autoshapes only"
                    }
                }),
                geometry_schema(false),
                &["filename", "slide_index", "shape_id"],
            ),
        },
        Tool {
            name: "delete_shape".to_string(),
            description: Some("Remove a shape from a slide.".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "filename": filename_property(),
                    "slide_index": slide_index_property(),
                    "shape_id": {"type": "integer", "minimum": 0}
                },
                "required": ["filename", "slide_index", "shape_id"]
            }),
        },
        Tool {
            name: "batch_update".to_string(),
            description: Some(
                "Apply several changes in one save. Each request is an object with one key: \
                 create_slide, add_shape, add_textbox, modify_shape, add_connector or delete_shape. \
                 Give slides and shapes a slide_object_id / shape_object_id to reference them in \
                 later requests via page_object_id, shape_object_id, start_shape_object_id and \
                 end_shape_object_id. If any request fails, nothing is saved."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "filename": filename_property(),
                    "requests": {
                        "type": "array",
                        "items": {"type": "object"},
                        "description": "Requests such as {\"create_slide\": {\"layout_index\": 6, \"slide_object_id\": \"s1\"}}"
                    }
                },
                "required": ["filename", "requests"]
            }),
        },
        Tool {
            name: "list_slide_layouts".to_string(),
            description: Some(
                "List the slide layouts of a presentation with their placeholders.".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "filename": filename_property()
                },
                "required": ["filename"]
            }),
        },
        Tool {
            name: "list_templates".to_string(),
            description: Some(
                "List templates usable with create_or_clear_presentation.".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}

/// Handle a tool call
pub async fn handle_tool_call(
    server: &PptxMcpServer,
    name: &str,
    arguments: Value,
) -> Result<Vec<ToolResultContent>> {
    tracing::info!(tool = name, "tool call");
    match name {
        "create_or_clear_presentation" => handle_create_or_clear(server, &arguments).await,
        "add_slide" => handle_add_slide(server, &arguments).await,
        "add_title_and_content" => handle_add_title_and_content(server, &arguments).await,
        "add_textbox" => handle_add_textbox(server, &arguments).await,
        "add_shape" => handle_add_shape(server, &arguments).await,
        "add_picture" => handle_add_picture(server, &arguments).await,
        "get_slide_content_description" => handle_describe(server, &arguments).await,
        "get_slide_image" => handle_get_slide_image(server, &arguments).await,
        "get_pptx_file" => handle_get_pptx_file(server, &arguments).await,
        "add_connector" => handle_add_connector(server, &arguments).await,
        "modify_shape" => handle_modify_shape(server, &arguments).await,
        "delete_shape" => handle_delete_shape(server, &arguments).await,
        "batch_update" => handle_batch_update(server, &arguments).await,
        "list_slide_layouts" => handle_list_slide_layouts(server, &arguments).await,
        "list_templates" => handle_list_templates(server),
        _ => Err(ServerError::UnknownTool(name.to_string())),
    }
}

// ============================================================================
// Arguments
// ============================================================================

#[derive(Debug, Deserialize)]
struct FileArgs {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct CreateArgs {
    filename: String,
    #[serde(default)]
    template: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddSlideArgs {
    filename: String,
    #[serde(default = "default_layout_index")]
    layout_index: usize,
}

/// Presentation and slide every slide-level tool takes
#[derive(Debug, Deserialize)]
struct SlideArgs {
    filename: String,
    slide_index: usize,
}

#[derive(Debug, Deserialize)]
struct TitleContentArgs {
    title: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ShapeIdArgs {
    shape_id: u32,
}

#[derive(Debug, Deserialize)]
struct ConnectorArgs {
    start_shape_id: u32,
    end_shape_id: u32,
    #[serde(default, alias = "connector_type_name")]
    connector_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchArgs {
    filename: String,
    requests: Vec<BatchRequest>,
}

/// Deserialize tool arguments; missing arguments count as `{}`
fn parse_args<T: DeserializeOwned>(tool: &str, arguments: &Value) -> Result<T> {
    let empty = json!({});
    let arguments = if arguments.is_null() { &empty } else { arguments };
    T::deserialize(arguments).map_err(|e| {
        ServerError::InvalidArgument(format!("Invalid arguments for '{}': {}", tool, e))
    })
}

fn text(message: impl Into<String>) -> Vec<ToolResultContent> {
    vec![ToolResultContent::Text {
        text: message.into(),
    }]
}

// ============================================================================
// Handlers
// ============================================================================

async fn handle_create_or_clear(server: &PptxMcpServer, args: &Value) -> Result<Vec<ToolResultContent>> {
    let args: CreateArgs = parse_args("create_or_clear_presentation", args)?;
    let name = normalize_filename(&args.filename)?;
    server
        .store()
        .create_or_clear(&args.filename, args.template.as_deref())
        .await?;

    let dir = server.store().config().presentations_dir.display().to_string();
    Ok(text(match &args.template {
        Some(template) => format!(
            "Presentation '{}' created/cleared from template '{}' successfully in '{}'.",
            name, template, dir
        ),
        None => format!("Presentation '{}' created/cleared successfully in '{}'.", name, dir),
    }))
}

async fn handle_add_slide(server: &PptxMcpServer, args: &Value) -> Result<Vec<ToolResultContent>> {
    let args: AddSlideArgs = parse_args("add_slide", args)?;
    let name = normalize_filename(&args.filename)?;
    let layout_index = args.layout_index;
    let (index, count) = server
        .store()
        .update(&args.filename, move |prs| {
            let index = prs.add_slide(layout_index)?;
            Ok((index, prs.slide_count()))
        })
        .await?;

    Ok(text(format!(
        "Added slide {} with layout {} to '{}'. New slide count: {}.",
        index, layout_index, name, count
    )))
}

async fn handle_add_title_and_content(
    server: &PptxMcpServer,
    args: &Value,
) -> Result<Vec<ToolResultContent>> {
    let slide: SlideArgs = parse_args("add_title_and_content", args)?;
    let body: TitleContentArgs = parse_args("add_title_and_content", args)?;
    let name = normalize_filename(&slide.filename)?;
    let index = slide.slide_index;
    let warnings = server
        .store()
        .update(&slide.filename, move |prs| {
            operations::set_title_and_content(prs, index, &body.title, &body.content)
        })
        .await?;

    if warnings.is_empty() {
        return Ok(text(format!(
            "Added title and content to slide {} in '{}'.",
            index, name
        )));
    }
    Ok(text(format!(
        "Attempted to add title and content to slide {} in '{}'.\nWarnings:\n{}",
        index,
        name,
        warnings.join("\n")
    )))
}

async fn handle_add_textbox(server: &PptxMcpServer, args: &Value) -> Result<Vec<ToolResultContent>> {
    let slide: SlideArgs = parse_args("add_textbox", args)?;
    let request: TextboxRequest = parse_args("add_textbox", args)?;
    let name = normalize_filename(&slide.filename)?;
    let index = slide.slide_index;
    let id = server
        .store()
        .update(&slide.filename, move |prs| operations::add_textbox(prs, index, &request))
        .await?;

    Ok(text(format!(
        "Added textbox to slide {} in '{}' (ID: {}).",
        index, name, id
    )))
}

async fn handle_add_shape(server: &PptxMcpServer, args: &Value) -> Result<Vec<ToolResultContent>> {
    let slide: SlideArgs = parse_args("add_shape", args)?;
    let request: ShapeRequest = parse_args("add_shape", args)?;
    let name = normalize_filename(&slide.filename)?;
    let index = slide.slide_index;
    let shape_type = request.shape_type_name.clone();
    let id = server
        .store()
        .update(&slide.filename, move |prs| operations::add_shape(prs, index, &request))
        .await?;

    Ok(text(format!(
        "Added shape '{}' to slide {} in '{}' (ID: {}).",
        shape_type, index, name, id
    )))
}

async fn handle_add_picture(server: &PptxMcpServer, args: &Value) -> Result<Vec<ToolResultContent>> {
    let slide: SlideArgs = parse_args("add_picture", args)?;
    let request: PictureRequest = parse_args("add_picture", args)?;
    let name = normalize_filename(&slide.filename)?;
    let index = slide.slide_index;
    let id = server
        .store()
        .update(&slide.filename, move |prs| operations::add_picture(prs, index, &request))
        .await?;

    Ok(text(format!(
        "Added picture to slide {} in '{}' (ID: {}).",
        index, name, id
    )))
}

async fn handle_describe(server: &PptxMcpServer, args: &Value) -> Result<Vec<ToolResultContent>> {
    let slide: SlideArgs = parse_args("get_slide_content_description", args)?;
    let description = describe(server, &slide.filename, slide.slide_index).await?;
    Ok(text(description))
}

/// Text description of one slide, shared with the description resource
pub(crate) async fn describe(server: &PptxMcpServer, filename: &str, index: usize) -> Result<String> {
    let name = normalize_filename(filename)?;
    server
        .store()
        .read(filename, move |prs| describe_slide(prs, &name, index))
        .await
}

async fn handle_get_slide_image(server: &PptxMcpServer, args: &Value) -> Result<Vec<ToolResultContent>> {
    let slide: SlideArgs = parse_args("get_slide_image", args)?;
    let index = slide.slide_index;
    let deck = server
        .store()
        .read(&slide.filename, move |prs| single_slide_deck(prs, index))
        .await?;
    let png = server.renderer().render_deck(deck).await?;

    Ok(vec![ToolResultContent::Image {
        data: STANDARD.encode(&png),
        mime_type: "image/png".to_string(),
    }])
}

async fn handle_get_pptx_file(server: &PptxMcpServer, args: &Value) -> Result<Vec<ToolResultContent>> {
    let args: FileArgs = parse_args("get_pptx_file", args)?;
    let name = normalize_filename(&args.filename)?;
    let bytes = server.store().file_bytes(&args.filename).await?;

    Ok(vec![
        ToolResultContent::Text {
            text: format!("Presentation '{}' ({} bytes).", name, bytes.len()),
        },
        ToolResultContent::Resource {
            resource: resources::file_content(&name, &bytes),
        },
    ])
}

async fn handle_add_connector(server: &PptxMcpServer, args: &Value) -> Result<Vec<ToolResultContent>> {
    let slide: SlideArgs = parse_args("add_connector", args)?;
    let connector: ConnectorArgs = parse_args("add_connector", args)?;
    let kind = match connector.connector_type.as_deref() {
        Some(name) => ConnectorType::parse(name)?,
        None => ConnectorType::Elbow,
    };
    let name = normalize_filename(&slide.filename)?;
    let index = slide.slide_index;
    let (start, end) = (connector.start_shape_id, connector.end_shape_id);
    let id = server
        .store()
        .update(&slide.filename, move |prs| {
            operations::add_connector(prs, index, start, end, kind)
        })
        .await?;

    Ok(text(format!(
        "Added {} connector from shape {} to shape {} on slide {} in '{}' (ID: {}).",
        kind, start, end, index, name, id
    )))
}

async fn handle_modify_shape(server: &PptxMcpServer, args: &Value) -> Result<Vec<ToolResultContent>> {
    let slide: SlideArgs = parse_args("modify_shape", args)?;
    let shape: ShapeIdArgs = parse_args("modify_shape", args)?;
    let request: ModifyShapeRequest = parse_args("modify_shape", args)?;
    let name = normalize_filename(&slide.filename)?;
    let (index, shape_id) = (slide.slide_index, shape.shape_id);
    let updated = server
        .store()
        .update(&slide.filename, move |prs| {
            operations::modify_shape(prs, index, shape_id, &request)
        })
        .await?;

    Ok(text(format!(
        "Modified shape {} on slide {} in '{}'. Updated: {}.",
        shape_id,
        index,
        name,
        updated.join(", ")
    )))
}

async fn handle_delete_shape(server: &PptxMcpServer, args: &Value) -> Result<Vec<ToolResultContent>> {
    let slide: SlideArgs = parse_args("delete_shape", args)?;
    let shape: ShapeIdArgs = parse_args("delete_shape", args)?;
    let name = normalize_filename(&slide.filename)?;
    let (index, shape_id) = (slide.slide_index, shape.shape_id);
    server
        .store()
        .update(&slide.filename, move |prs| operations::delete_shape(prs, index, shape_id))
        .await?;

    Ok(text(format!(
        "Deleted shape {} from slide {} in '{}'.",
        shape_id, index, name
    )))
}

async fn handle_batch_update(server: &PptxMcpServer, args: &Value) -> Result<Vec<ToolResultContent>> {
    let args: BatchArgs = parse_args("batch_update", args)?;
    if args.requests.is_empty() {
        return Err(ServerError::InvalidArgument(
            "batch_update needs at least one request".to_string(),
        ));
    }
    let presentation_id = normalize_filename(&args.filename)?;
    let requests = args.requests;
    let response = server
        .store()
        .update(&args.filename, move |prs| {
            operations::apply_batch(prs, &presentation_id, &requests)
        })
        .await?;

    Ok(text(serde_json::to_string_pretty(&response)?))
}

async fn handle_list_slide_layouts(
    server: &PptxMcpServer,
    args: &Value,
) -> Result<Vec<ToolResultContent>> {
    let args: FileArgs = parse_args("list_slide_layouts", args)?;
    let name = normalize_filename(&args.filename)?;
    let layouts = server
        .store()
        .read(&args.filename, |prs| {
            Ok(prs
                .layouts()
                .iter()
                .enumerate()
                .map(|(i, layout)| layout.info(i))
                .collect::<Vec<_>>())
        })
        .await?;

    let result = json!({
        "filename": name,
        "layouts": layouts,
        "count": layouts.len()
    });
    Ok(text(serde_json::to_string_pretty(&result)?))
}

fn handle_list_templates(server: &PptxMcpServer) -> Result<Vec<ToolResultContent>> {
    let templates = server.store().list_templates()?;
    let result = json!({
        "templates_dir": server.store().config().templates_dir.display().to_string(),
        "templates": templates,
        "count": templates.len()
    });
    Ok(text(serde_json::to_string_pretty(&result)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::server::tests::test_server;
    use pptx_engine::{ErrorKind, Presentation};
    use pretty_assertions::assert_eq;

    /// 1×1 transparent PNG
    const PIXEL_PNG: &str =
        "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    async fn call(server: &PptxMcpServer, name: &str, arguments: Value) -> Result<String> {
        let content = handle_tool_call(server, name, arguments).await?;
        match content.into_iter().next() {
            Some(ToolResultContent::Text { text }) => Ok(text),
            other => panic!("expected text content, got {:?}", other),
        }
    }

    async fn file_bytes(server: &PptxMcpServer, filename: &str) -> Vec<u8> {
        server.store().file_bytes(filename).await.unwrap()
    }

    /// Deck with one blank slide
    async fn blank_deck(server: &PptxMcpServer) {
        call(server, "create_or_clear_presentation", json!({"filename": "deck"}))
            .await
            .unwrap();
        call(server, "add_slide", json!({"filename": "deck", "layout_index": 6}))
            .await
            .unwrap();
    }

    fn id_in(message: &str) -> u32 {
        let start = message.rfind("(ID: ").unwrap() + "(ID: ".len();
        let end = message[start..].find(')').unwrap() + start;
        message[start..end].parse().unwrap()
    }

    #[tokio::test]
    async fn test_created_file_is_empty_deck() {
        let (_dir, server) = test_server();
        let message = call(&server, "create_or_clear_presentation", json!({"filename": "new"}))
            .await
            .unwrap();
        assert!(message.starts_with("Presentation 'new.pptx' created/cleared successfully"));

        let content = handle_tool_call(&server, "get_pptx_file", json!({"filename": "new.pptx"}))
            .await
            .unwrap();
        let Some(ToolResultContent::Resource { resource }) = content.get(1) else {
            panic!("expected embedded resource");
        };
        assert_eq!(resource.uri, "pptx://new.pptx/file");
        assert_eq!(resource.mime_type.as_deref(), Some(pptx_engine::PPTX_MIME_TYPE));

        let bytes = STANDARD.decode(resource.blob.as_ref().unwrap()).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(Presentation::from_bytes(&bytes).unwrap().slide_count(), 0);
    }

    #[tokio::test]
    async fn test_add_slide_messages() {
        let (_dir, server) = test_server();
        call(&server, "create_or_clear_presentation", json!({"filename": "deck"}))
            .await
            .unwrap();
        let first = call(&server, "add_slide", json!({"filename": "deck"})).await.unwrap();
        assert_eq!(first, "Added slide 0 with layout 5 to 'deck.pptx'. New slide count: 1.");
        let second = call(&server, "add_slide", json!({"filename": "deck", "layout_index": 1}))
            .await
            .unwrap();
        assert_eq!(second, "Added slide 1 with layout 1 to 'deck.pptx'. New slide count: 2.");

        let err = call(&server, "add_slide", json!({"filename": "deck", "layout_index": 99}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_textbox_described_with_position() {
        let (_dir, server) = test_server();
        blank_deck(&server).await;
        let message = call(
            &server,
            "add_textbox",
            json!({
                "filename": "deck", "slide_index": 0, "text": "Hello",
                "left_inches": 1.0, "top_inches": 1.0, "width_inches": 2.0, "height_inches": 1.0
            }),
        )
        .await
        .unwrap();
        let id = id_in(&message);

        let description = call(
            &server,
            "get_slide_content_description",
            json!({"filename": "deck", "slide_index": 0}),
        )
        .await
        .unwrap();
        assert!(description.contains("Hello"));
        assert!(description.contains(&format!("ID={}", id)));
        assert!(description.contains("Left=1.00\", Top=1.00\", Width=2.00\", Height=1.00\""));
    }

    #[tokio::test]
    async fn test_title_and_content_on_blank_layout_warns() {
        let (_dir, server) = test_server();
        blank_deck(&server).await;
        let message = call(
            &server,
            "add_title_and_content",
            json!({"filename": "deck", "slide_index": 0, "title": "T", "content": "C"}),
        )
        .await
        .unwrap();
        assert!(message.starts_with("Attempted to add title and content to slide 0"));
        assert!(message.contains("does not have a standard title placeholder"));
    }

    #[tokio::test]
    async fn test_unknown_shape_leaves_file_unchanged() {
        let (_dir, server) = test_server();
        blank_deck(&server).await;
        let before = file_bytes(&server, "deck").await;
        let err = call(
            &server,
            "add_shape",
            json!({
                "filename": "deck", "slide_index": 0, "shape_type_name": "BLOB",
                "left_inches": 1, "top_inches": 1, "width_inches": 1, "height_inches": 1
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("RECTANGLE"));
        assert_eq!(file_bytes(&server, "deck").await, before);
    }

    #[tokio::test]
    async fn test_out_of_range_slide_leaves_file_unchanged() {
        let (_dir, server) = test_server();
        blank_deck(&server).await;
        let before = file_bytes(&server, "deck").await;

        let geometry = json!({"left": 0, "top": 0, "width": 1, "height": 1});
        for (tool, extra) in [
            ("add_textbox", json!({"text": "x"})),
            ("add_shape", json!({"shape_type_name": "OVAL"})),
            ("add_title_and_content", json!({"title": "t", "content": "c"})),
        ] {
            let mut args = json!({"filename": "deck", "slide_index": 3});
            let target = args.as_object_mut().unwrap();
            target.extend(extra.as_object().unwrap().clone());
            target.extend(geometry.as_object().unwrap().clone());

            let err = call(&server, tool, args).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound, "{}", tool);
        }
        assert_eq!(file_bytes(&server, "deck").await, before);
    }

    #[tokio::test]
    async fn test_picture_connector_modify_delete() {
        let (_dir, server) = test_server();
        blank_deck(&server).await;

        let picture = call(
            &server,
            "add_picture",
            json!({"filename": "deck", "slide_index": 0, "image": PIXEL_PNG, "left_inches": 5, "top_inches": 5}),
        )
        .await
        .unwrap();
        assert!(picture.starts_with("Added picture to slide 0"));

        let shape = |left: f64| {
            json!({
                "filename": "deck", "slide_index": 0, "shape_type_name": "FLOWCHART_PROCESS",
                "left_inches": left, "top_inches": 1, "width_inches": 1.5, "height_inches": 1, "text": "Step"
            })
        };
        let a = id_in(&call(&server, "add_shape", shape(0.5)).await.unwrap());
        let b = id_in(&call(&server, "add_shape", shape(4.0)).await.unwrap());

        let connector = call(
            &server,
            "add_connector",
            json!({"filename": "deck", "slide_index": 0, "start_shape_id": a, "end_shape_id": b, "connector_type": "straight"}),
        )
        .await
        .unwrap();
        assert!(connector.starts_with(&format!("Added STRAIGHT connector from shape {} to shape {}", a, b)));

        let modified = call(
            &server,
            "modify_shape",
            json!({"filename": "deck", "slide_index": 0, "shape_id": a, "text": "Start", "fill_color_rgb": [255, 0, 0]}),
        )
        .await
        .unwrap();
        assert!(modified.ends_with("Updated: text content, fill color."));

        let err = call(
            &server,
            "modify_shape",
            json!({"filename": "deck", "slide_index": 0, "shape_id": a}),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        call(
            &server,
            "delete_shape",
            json!({"filename": "deck", "slide_index": 0, "shape_id": b}),
        )
        .await
        .unwrap();
        let err = call(
            &server,
            "delete_shape",
            json!({"filename": "deck", "slide_index": 0, "shape_id": b}),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let description = describe(&server, "deck", 0).await.unwrap();
        assert!(description.contains("Text='Start'"));
        assert!(description.contains("Type=PICTURE"));
    }

    #[tokio::test]
    async fn test_batch_update_flowchart() {
        let (_dir, server) = test_server();
        call(&server, "create_or_clear_presentation", json!({"filename": "flow"}))
            .await
            .unwrap();
        let output = call(
            &server,
            "batch_update",
            json!({
                "filename": "flow",
                "requests": [
                    {"create_slide": {"layout_index": 6, "slide_object_id": "s"}},
                    {"add_shape": {"page_object_id": "s", "shape_object_id": "a", "shape_type": "FLOWCHART_TERMINATOR",
                                   "left": 1, "top": 1, "width": 2, "height": 1, "text": "Start"}},
                    {"add_shape": {"page_object_id": "s", "shape_object_id": "b", "shape_type": "FLOWCHART_PROCESS",
                                   "left": 1, "top": 3, "width": 2, "height": 1}},
                    {"add_connector": {"page_object_id": "s", "start_shape_object_id": "a", "end_shape_object_id": "b"}}
                ]
            }),
        )
        .await
        .unwrap();

        let response: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(response["presentation_id"], "flow.pptx");
        assert_eq!(response["replies"].as_array().unwrap().len(), 4);
        assert_eq!(response["replies"][1]["add_shape"]["object_id"], "a");
    }

    #[tokio::test]
    async fn test_batch_failure_leaves_file_byte_identical() {
        let (_dir, server) = test_server();
        blank_deck(&server).await;
        let before = file_bytes(&server, "deck").await;

        let err = call(
            &server,
            "batch_update",
            json!({
                "filename": "deck",
                "requests": [
                    {"add_textbox": {"slide_index": 0, "text": "kept?", "left": 0, "top": 0, "width": 1, "height": 1}},
                    {"delete_shape": {"slide_index": 0, "shape_object_id": "ghost"}}
                ]
            }),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Request 1"));
        assert_eq!(file_bytes(&server, "deck").await, before);

        let err = call(&server, "batch_update", json!({"filename": "deck", "requests": []}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_layouts_and_templates() {
        let (_dir, server) = test_server();
        blank_deck(&server).await;
        let output = call(&server, "list_slide_layouts", json!({"filename": "deck"}))
            .await
            .unwrap();
        let layouts: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(layouts["count"], 11);
        assert_eq!(layouts["layouts"][6]["name"], "Blank");

        let output = call(&server, "list_templates", json!({})).await.unwrap();
        let templates: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(templates["count"], 0);

        let err = call(
            &server,
            "create_or_clear_presentation",
            json!({"filename": "x", "template": "corporate"}),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_argument_errors() {
        let (_dir, server) = test_server();
        let err = call(&server, "add_textbox", json!({"slide_index": 0})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("add_textbox"));

        let err = call(&server, "add_slide", Value::Null).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = call(&server, "no_such_tool", json!({})).await.unwrap_err();
        assert!(matches!(err, ServerError::UnknownTool(_)));
    }

    #[tokio::test]
    async fn test_slide_image_without_renderer() {
        let (_dir, server) = test_server();
        if server.renderer().find_soffice().is_ok() {
            // LibreOffice is installed here
            return;
        }
        blank_deck(&server).await;
        let err = handle_tool_call(
            &server,
            "get_slide_image",
            json!({"filename": "deck", "slide_index": 0}),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Render);

        let err = handle_tool_call(
            &server,
            "get_slide_image",
            json!({"filename": "deck", "slide_index": 4}),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
