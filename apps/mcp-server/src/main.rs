//! PowerPoint MCP Server Binary
//!
//! Entry point for the MCP server supporting multiple transports.

use clap::Parser;
use pptx_engine::{PresentationStore, SlideRenderer};
use pptx_mcp_server::config::{Args, Transport};
use pptx_mcp_server::PptxMcpServer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize tracing - CRITICAL: use stderr for stdio transport
    if args.transport == Transport::Stdio {
        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting PowerPoint MCP Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Transport: {:?}", args.transport);

    let store = PresentationStore::new(args.store_config());
    store.ensure_dirs()?;
    tracing::info!(
        presentations = %store.config().presentations_dir.display(),
        templates = %store.config().templates_dir.display(),
        "storage ready"
    );

    let renderer = SlideRenderer::new(args.render_config());
    if let Err(e) = renderer.find_soffice() {
        tracing::warn!("Slide image rendering unavailable: {}", e);
    }

    let server = PptxMcpServer::new(store, renderer);

    match args.transport {
        Transport::Stdio => {
            pptx_mcp_server::transport::stdio::run_stdio_server(server).await?;
        }
        #[cfg(feature = "http")]
        Transport::Http => {
            pptx_mcp_server::transport::http::run_http_server(&args.http_addr, server).await?;
        }
        #[cfg(not(feature = "http"))]
        Transport::Http => {
            anyhow::bail!("HTTP transport not enabled. Rebuild with --features http");
        }
    }

    Ok(())
}
