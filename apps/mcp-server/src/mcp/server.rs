//! MCP server state and request dispatch
//!
//! Both transports hand every decoded JSON-RPC message to
//! [`PptxMcpServer::handle_request`].

use std::collections::HashMap;

use pptx_engine::{ErrorKind, PresentationStore, ServerError, SlideRenderer};
use serde_json::{json, Value};

use super::protocol::*;
use super::{prompts, resources, tools};

const INSTRUCTIONS: &str = "Build PowerPoint decks step by step: create a presentation, \
add slides, then add text, shapes, pictures and connectors. Inspect slides with \
get_slide_content_description or render them with get_slide_image.";

/// PowerPoint MCP Server
#[derive(Debug, Clone)]
pub struct PptxMcpServer {
    name: String,
    version: String,
    store: PresentationStore,
    renderer: SlideRenderer,
}

impl PptxMcpServer {
    pub fn new(store: PresentationStore, renderer: SlideRenderer) -> Self {
        Self {
            name: "pptx-mcp-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            store,
            renderer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn store(&self) -> &PresentationStore {
        &self.store
    }

    pub fn renderer(&self) -> &SlideRenderer {
        &self.renderer
    }

    /// Handle one JSON-RPC message. Notifications get no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            tracing::debug!("Notification: {}", request.method);
            return None;
        }

        let id = request.id.clone();
        tracing::debug!("Request: {}", request.method);

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "initialized" | "notifications/initialized" | "ping" => {
                JsonRpcResponse::success(id, json!({}))
            }
            "tools/list" => {
                JsonRpcResponse::success(id, json!({ "tools": tools::get_tool_definitions() }))
            }
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "resources/list" => self.handle_list_resources(id).await,
            "resources/templates/list" => JsonRpcResponse::success(
                id,
                json!({ "resourceTemplates": resources::get_resource_templates() }),
            ),
            "resources/read" => self.handle_read_resource(id, request.params).await,
            "prompts/list" => JsonRpcResponse::success(
                id,
                json!({ "prompts": prompts::get_prompt_definitions() }),
            ),
            "prompts/get" => handle_get_prompt(id, request.params),
            _ => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };
        Some(response)
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                resources: Some(ResourcesCapability {
                    subscribe: Some(false),
                    list_changed: Some(false),
                }),
                prompts: Some(PromptsCapability {
                    list_changed: Some(false),
                }),
            },
            server_info: ServerInfo {
                name: self.name.clone(),
                version: self.version.clone(),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        };
        JsonRpcResponse::from_result(id, &result)
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let params: CallToolParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid tools/call params: {}", e))
            }
        };

        let result = match tools::handle_tool_call(self, &params.name, params.arguments).await {
            Ok(content) => CallToolResult {
                content,
                is_error: false,
            },
            Err(e) => {
                tracing::warn!(tool = %params.name, kind = ?e.kind(), "tool failed: {}", e);
                CallToolResult::error(e)
            }
        };
        JsonRpcResponse::from_result(id, &result)
    }

    async fn handle_list_resources(&self, id: Option<Value>) -> JsonRpcResponse {
        match resources::list_resources(&self.store).await {
            Ok(resources) => JsonRpcResponse::success(id, json!({ "resources": resources })),
            Err(e) => error_response(id, &e),
        }
    }

    async fn handle_read_resource(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let Some(uri) = params.get("uri").and_then(|v| v.as_str()) else {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing resource uri");
        };

        match resources::read_resource(self, uri).await {
            Ok(content) => JsonRpcResponse::success(id, json!({ "contents": [content] })),
            Err(e) => error_response(id, &e),
        }
    }
}

fn handle_get_prompt(id: Option<Value>, params: Value) -> JsonRpcResponse {
    let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");

    let arguments: HashMap<String, String> = params
        .get("arguments")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    match prompts::get_prompt(name, arguments) {
        Ok(messages) => JsonRpcResponse::success(id, json!({ "messages": messages })),
        Err(e) => error_response(id, &e),
    }
}

/// Protocol-level error for a failed resource or prompt lookup
fn error_response(id: Option<Value>, error: &ServerError) -> JsonRpcResponse {
    let code = match error.kind() {
        ErrorKind::Internal => INTERNAL_ERROR,
        _ => INVALID_PARAMS,
    };
    JsonRpcResponse::error(id, code, error.to_string())
}
