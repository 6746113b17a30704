//! PowerPoint MCP Server
//!
//! A Model Context Protocol server that lets MCP-compliant AI agents build
//! `.pptx` decks incrementally: create a file, add slides, insert text,
//! shapes, pictures and connectors, inspect slides and render them to PNG.

pub mod config;
pub mod mcp;
pub mod transport;

pub use mcp::server::PptxMcpServer;
pub use pptx_engine as engine;
