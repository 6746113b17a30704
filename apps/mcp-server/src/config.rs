//! Command line and environment configuration

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use pptx_engine::{RenderConfig, StoreConfig};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "pptx-mcp-server")]
#[command(
    version,
    about = "PowerPoint deck builder via Model Context Protocol"
)]
pub struct Args {
    /// Transport mode: stdio or http
    #[arg(short, long, value_enum, default_value_t = Transport::Stdio, env = "PPTX_MCP_TRANSPORT")]
    pub transport: Transport,

    /// HTTP server address (only used with http transport)
    #[arg(long, default_value = "127.0.0.1:3000", env = "PPTX_MCP_HTTP_ADDR")]
    pub http_addr: String,

    /// Directory presentations are saved in
    #[arg(long, default_value = "./presentations", env = "PPTX_MCP_PRESENTATIONS_DIR")]
    pub presentations_dir: PathBuf,

    /// Template directory [default: <presentations-dir>/templates]
    #[arg(long, env = "PPTX_MCP_TEMPLATES_DIR")]
    pub templates_dir: Option<PathBuf>,

    /// LibreOffice `soffice` executable; PATH is searched when unset
    #[arg(long, env = "PPTX_MCP_SOFFICE_PATH")]
    pub soffice_path: Option<PathBuf>,

    /// Slide rendering timeout in seconds
    #[arg(long, default_value_t = 60, env = "PPTX_MCP_RENDER_TIMEOUT_SECS")]
    pub render_timeout_secs: u64,
}

impl Args {
    pub fn store_config(&self) -> StoreConfig {
        let config = StoreConfig::new(self.presentations_dir.clone());
        match &self.templates_dir {
            Some(dir) => config.with_templates_dir(dir.clone()),
            None => config,
        }
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            soffice_path: self.soffice_path.clone(),
            timeout: Duration::from_secs(self.render_timeout_secs),
        }
    }
}
