//! Batch updates: many mutations in one load/save
//!
//! Requests can name the slides and shapes they create
//! (`slide_object_id`, `shape_object_id`) and refer to them in later
//! requests (`page_object_id`, `start_shape_object_id`, ...). The first
//! failing request aborts the batch.

use std::collections::HashMap;

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::catalog::ConnectorType;
use crate::errors::{Result, ServerError};
use crate::model::Presentation;

use super::mutate::{self, ModifyShapeRequest, ShapeRequest, TextboxRequest};

const DEFAULT_LAYOUT_INDEX: usize = 5;

fn default_layout() -> usize {
    DEFAULT_LAYOUT_INDEX
}

/// Slide and shape references of a request, by alias or by id
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Target {
    #[serde(default)]
    pub page_object_id: Option<String>,
    #[serde(default)]
    pub slide_index: Option<usize>,
    #[serde(default)]
    pub shape_object_id: Option<String>,
    #[serde(default)]
    pub shape_id: Option<u32>,
    #[serde(default)]
    pub start_shape_object_id: Option<String>,
    #[serde(default)]
    pub start_shape_id: Option<u32>,
    #[serde(default)]
    pub end_shape_object_id: Option<String>,
    #[serde(default)]
    pub end_shape_id: Option<u32>,
}

/// A request body together with its references.
///
/// Both are read from the same JSON object.
#[derive(Debug, Clone)]
pub struct Targeted<T> {
    pub target: Target,
    pub body: T,
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Targeted<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let target = Target::deserialize(&value).map_err(de::Error::custom)?;
        let body = T::deserialize(&value).map_err(de::Error::custom)?;
        Ok(Targeted { target, body })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSlide {
    #[serde(default = "default_layout")]
    pub layout_index: usize,
    #[serde(default)]
    pub slide_object_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorOptions {
    #[serde(default, alias = "connector_type")]
    pub connector_type_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoOptions {}

/// One entry of a batch, written as `{"<kind>": {...}}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchRequest {
    CreateSlide(CreateSlide),
    AddShape(Targeted<ShapeRequest>),
    AddTextbox(Targeted<TextboxRequest>),
    ModifyShape(Targeted<ModifyShapeRequest>),
    AddConnector(Targeted<ConnectorOptions>),
    DeleteShape(Targeted<NoOptions>),
}

impl BatchRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            BatchRequest::CreateSlide(_) => "create_slide",
            BatchRequest::AddShape(_) => "add_shape",
            BatchRequest::AddTextbox(_) => "add_textbox",
            BatchRequest::ModifyShape(_) => "modify_shape",
            BatchRequest::AddConnector(_) => "add_connector",
            BatchRequest::DeleteShape(_) => "delete_shape",
        }
    }
}

/// What a request produced or touched
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectReply {
    /// Caller's alias, or the numeric id when none was given
    pub object_id: String,
    pub slide_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<Vec<&'static str>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchReply {
    CreateSlide(ObjectReply),
    AddShape(ObjectReply),
    AddTextbox(ObjectReply),
    ModifyShape(ObjectReply),
    AddConnector(ObjectReply),
    DeleteShape(ObjectReply),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResponse {
    pub presentation_id: String,
    pub replies: Vec<BatchReply>,
}

/// Aliases assigned so far in a batch
#[derive(Debug, Default)]
struct Aliases {
    slides: HashMap<String, usize>,
    shapes: HashMap<String, (usize, u32)>,
}

impl Aliases {
    fn slide(&self, target: &Target) -> Result<usize> {
        match (&target.page_object_id, target.slide_index) {
            (Some(alias), _) => self.slides.get(alias).copied().ok_or_else(|| {
                ServerError::NotFound(format!("Unknown slide object id '{}'", alias))
            }),
            (None, Some(index)) => Ok(index),
            (None, None) => Err(ServerError::InvalidArgument(
                "Missing page_object_id or slide_index".into(),
            )),
        }
    }

    /// Shape id for an alias or explicit id. Aliases must belong to `slide`.
    fn shape(&self, slide: usize, alias: Option<&str>, id: Option<u32>, field: &str) -> Result<u32> {
        match (alias, id) {
            (Some(alias), _) => match self.shapes.get(alias) {
                Some(&(on_slide, shape_id)) if on_slide == slide => Ok(shape_id),
                Some(&(on_slide, _)) => Err(ServerError::InvalidArgument(format!(
                    "Shape '{}' is on slide {}, not slide {}",
                    alias, on_slide, slide
                ))),
                // Plain numbers are taken as shape ids
                None => alias.parse().map_err(|_| {
                    ServerError::NotFound(format!("Unknown shape object id '{}'", alias))
                }),
            },
            (None, Some(id)) => Ok(id),
            (None, None) => Err(ServerError::InvalidArgument(format!(
                "Missing {}_object_id or {}_id",
                field, field
            ))),
        }
    }

    fn name_slide(&mut self, alias: Option<&String>, index: usize) -> Result<String> {
        match alias {
            Some(alias) => {
                if self.slides.insert(alias.clone(), index).is_some() {
                    return Err(duplicate(alias));
                }
                Ok(alias.clone())
            }
            None => Ok(index.to_string()),
        }
    }

    fn name_shape(&mut self, alias: Option<&String>, slide: usize, id: u32) -> Result<String> {
        match alias {
            Some(alias) => {
                if self.shapes.insert(alias.clone(), (slide, id)).is_some() {
                    return Err(duplicate(alias));
                }
                Ok(alias.clone())
            }
            None => Ok(id.to_string()),
        }
    }
}

fn duplicate(alias: &str) -> ServerError {
    ServerError::InvalidArgument(format!("Object id '{}' is already in use", alias))
}

/// Prefix an error with the failing request, keeping its kind
fn in_request(position: usize, kind: &str, err: ServerError) -> ServerError {
    let context = |msg: String| format!("Request {} ({}): {}", position, kind, msg);
    match err {
        ServerError::NotFound(msg) => ServerError::NotFound(context(msg)),
        ServerError::InvalidArgument(msg) => ServerError::InvalidArgument(context(msg)),
        other => other,
    }
}

/// Apply `requests` in order
pub fn apply_batch(
    prs: &mut Presentation,
    presentation_id: &str,
    requests: &[BatchRequest],
) -> Result<BatchResponse> {
    let mut aliases = Aliases::default();
    let mut replies = Vec::with_capacity(requests.len());
    for (position, request) in requests.iter().enumerate() {
        let reply = apply_one(prs, &mut aliases, request)
            .map_err(|e| in_request(position, request.kind(), e))?;
        replies.push(reply);
    }
    debug!(presentation_id, count = replies.len(), "applied batch");
    Ok(BatchResponse {
        presentation_id: presentation_id.to_string(),
        replies,
    })
}

fn apply_one(prs: &mut Presentation, aliases: &mut Aliases, request: &BatchRequest) -> Result<BatchReply> {
    let reply = match request {
        BatchRequest::CreateSlide(req) => {
            let index = prs.add_slide(req.layout_index)?;
            BatchReply::CreateSlide(ObjectReply {
                object_id: aliases.name_slide(req.slide_object_id.as_ref(), index)?,
                slide_index: index,
                shape_id: None,
                updated: None,
            })
        }
        BatchRequest::AddShape(req) => {
            let slide = aliases.slide(&req.target)?;
            let id = mutate::add_shape(prs, slide, &req.body)?;
            BatchReply::AddShape(created(aliases, &req.target, slide, id)?)
        }
        BatchRequest::AddTextbox(req) => {
            let slide = aliases.slide(&req.target)?;
            let id = mutate::add_textbox(prs, slide, &req.body)?;
            BatchReply::AddTextbox(created(aliases, &req.target, slide, id)?)
        }
        BatchRequest::ModifyShape(req) => {
            let t = &req.target;
            let slide = aliases.slide(t)?;
            let id = aliases.shape(slide, t.shape_object_id.as_deref(), t.shape_id, "shape")?;
            let updated = mutate::modify_shape(prs, slide, id, &req.body)?;
            BatchReply::ModifyShape(ObjectReply {
                object_id: t.shape_object_id.clone().unwrap_or_else(|| id.to_string()),
                slide_index: slide,
                shape_id: Some(id),
                updated: Some(updated),
            })
        }
        BatchRequest::AddConnector(req) => {
            let t = &req.target;
            let slide = aliases.slide(t)?;
            let start = aliases.shape(
                slide,
                t.start_shape_object_id.as_deref(),
                t.start_shape_id,
                "start_shape",
            )?;
            let end = aliases.shape(
                slide,
                t.end_shape_object_id.as_deref(),
                t.end_shape_id,
                "end_shape",
            )?;
            let kind = match &req.body.connector_type_name {
                Some(name) => ConnectorType::parse(name)?,
                None => ConnectorType::Elbow,
            };
            let id = mutate::add_connector(prs, slide, start, end, kind)?;
            BatchReply::AddConnector(created(aliases, t, slide, id)?)
        }
        BatchRequest::DeleteShape(req) => {
            let t = &req.target;
            let slide = aliases.slide(t)?;
            let id = aliases.shape(slide, t.shape_object_id.as_deref(), t.shape_id, "shape")?;
            mutate::delete_shape(prs, slide, id)?;
            if let Some(alias) = &t.shape_object_id {
                aliases.shapes.remove(alias);
            }
            BatchReply::DeleteShape(ObjectReply {
                object_id: t.shape_object_id.clone().unwrap_or_else(|| id.to_string()),
                slide_index: slide,
                shape_id: Some(id),
                updated: None,
            })
        }
    };
    Ok(reply)
}

fn created(aliases: &mut Aliases, target: &Target, slide: usize, id: u32) -> Result<ObjectReply> {
    Ok(ObjectReply {
        object_id: aliases.name_shape(target.shape_object_id.as_ref(), slide, id)?,
        slide_index: slide,
        shape_id: Some(id),
        updated: None,
    })
}
