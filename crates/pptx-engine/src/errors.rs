//! Error types for presentation and server operations

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification surfaced to MCP clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    Render,
    Internal,
}

/// Server-side errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Render timeout after {0}ms")]
    RenderTimeout(u64),

    #[error("Malformed presentation package: {0}")]
    MalformedPackage(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Zip error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Background task failed: {0}")]
    TaskError(String),
}

impl ServerError {
    /// Classify this error for callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServerError::NotFound(_) | ServerError::ResourceNotFound(_) => ErrorKind::NotFound,
            ServerError::InvalidArgument(_)
            | ServerError::UnknownTool(_)
            | ServerError::PromptNotFound(_) => ErrorKind::InvalidArgument,
            ServerError::Render(_) | ServerError::RenderTimeout(_) => ErrorKind::Render,
            _ => ErrorKind::Internal,
        }
    }

    /// Slide index lookup failure with the deck size in the message
    pub fn slide_out_of_range(index: usize, count: usize) -> Self {
        ServerError::NotFound(format!(
            "Invalid slide index {}. Presentation has {} slides (0-indexed).",
            index, count
        ))
    }
}

impl From<quick_xml::events::attributes::AttrError> for ServerError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        ServerError::XmlError(e.into())
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            ServerError::NotFound("x".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ServerError::InvalidArgument("x".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(ServerError::RenderTimeout(10).kind(), ErrorKind::Render);
        assert_eq!(
            ServerError::MalformedPackage("x".into()).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_slide_out_of_range_message() {
        let err = ServerError::slide_out_of_range(3, 2);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("has 2 slides"));
    }
}
