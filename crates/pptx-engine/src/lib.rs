//! PowerPoint document engine
//!
//! This crate reads and writes `.pptx` packages and implements the deck
//! operations exposed by the MCP server:
//! - OPC package handling (zip container, content types, relationships)
//! - Slide, shape and text editing on top of a small XML tree
//! - The autoshape catalog and the embedded default template
//! - Text descriptions of slides
//!
//! # Feature Flags
//!
//! - `server` (default): file-backed [`store`] with per-file locking and the
//!   LibreOffice slide [`render`]er (requires tokio)

pub mod catalog;
pub mod describe;
pub mod errors;
pub mod model;
pub mod opc;
pub mod operations;
pub mod templates;
pub mod units;
pub mod xml;

#[cfg(feature = "server")]
pub mod render;
#[cfg(feature = "server")]
pub mod store;

pub use catalog::{shape_type, ConnectorType, ShapeType, COMMON_SHAPES, SHAPE_TYPES};
pub use describe::describe_slide;
pub use errors::{ErrorKind, Result, ServerError};
pub use model::{LayoutInfo, Presentation};
pub use opc::constants::content_type::PPTX as PPTX_MIME_TYPE;
pub use templates::TemplateInfo;

#[cfg(feature = "server")]
pub use render::{RenderConfig, SlideRenderer};
#[cfg(feature = "server")]
pub use store::{normalize_filename, PresentationInfo, PresentationStore, StoreConfig};
