//! Slide rasterisation through LibreOffice
//!
//! The deck is reduced to the requested slide, written to a scratch
//! directory and converted with `soffice --headless --convert-to png`.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::{Result, ServerError};
use crate::model::Presentation;

/// Default time allowed for one conversion
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(60);

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Executable names searched on `PATH`
#[cfg(windows)]
const SOFFICE_NAMES: &[&str] = &["soffice.exe", "soffice.com"];
#[cfg(not(windows))]
const SOFFICE_NAMES: &[&str] = &["soffice", "libreoffice"];

#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Explicit `soffice` location; `PATH` is searched when unset
    pub soffice_path: Option<PathBuf>,
    pub timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            soffice_path: None,
            timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }
}

/// Bytes of a copy of `prs` that holds only slide `index`
pub fn single_slide_deck(prs: &Presentation, index: usize) -> Result<Vec<u8>> {
    let mut copy = prs.clone();
    copy.retain_slide(index)?;
    copy.to_bytes()
}

fn search_path() -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .flat_map(|dir| SOFFICE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

#[cfg(windows)]
fn install_locations() -> Vec<PathBuf> {
    ["ProgramFiles", "ProgramFiles(x86)"]
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .map(|root| PathBuf::from(root).join("LibreOffice").join("program").join("soffice.exe"))
        .collect()
}

#[cfg(not(windows))]
fn install_locations() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/bin/soffice"),
        PathBuf::from("/usr/local/bin/soffice"),
        PathBuf::from("/opt/libreoffice/program/soffice"),
        PathBuf::from("/Applications/LibreOffice.app/Contents/MacOS/soffice"),
    ]
}

/// `file://` URL for the isolated LibreOffice profile
fn profile_url(dir: &Path) -> String {
    let path = dir.to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{}", path)
    } else {
        format!("file:///{}", path)
    }
}

/// Renders single slides to PNG
#[derive(Debug, Clone, Default)]
pub struct SlideRenderer {
    config: RenderConfig,
}

impl SlideRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Locate the `soffice` executable
    pub fn find_soffice(&self) -> Result<PathBuf> {
        if let Some(configured) = &self.config.soffice_path {
            if configured.is_file() {
                return Ok(configured.clone());
            }
            warn!(path = %configured.display(), "configured soffice not found, searching PATH");
        }
        search_path()
            .or_else(|| install_locations().into_iter().find(|p| p.is_file()))
            .ok_or_else(|| {
                ServerError::Render(
                    "LibreOffice 'soffice' executable not found in PATH or configured path. \
                     Image rendering requires a LibreOffice installation."
                        .to_string(),
                )
            })
    }

    /// Render slide `index` of `prs` to PNG bytes
    pub async fn render_slide(&self, prs: &Presentation, index: usize) -> Result<Vec<u8>> {
        let deck = single_slide_deck(prs, index)?;
        self.render_deck(deck).await
    }

    /// Convert a one-slide deck to PNG bytes
    pub async fn render_deck(&self, deck: Vec<u8>) -> Result<Vec<u8>> {
        let soffice = self.find_soffice()?;
        let scratch = tempfile::TempDir::new()?;
        let input = scratch.path().join("slide.pptx");
        let profile = scratch.path().join("profile");
        tokio::fs::write(&input, deck).await?;

        let mut command = tokio::process::Command::new(&soffice);
        command
            .arg("--headless")
            .arg("--norestore")
            .arg(format!("-env:UserInstallation={}", profile_url(&profile)))
            .arg("--convert-to")
            .arg("png")
            .arg("--outdir")
            .arg(scratch.path())
            .arg(&input)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        info!(soffice = %soffice.display(), "rendering slide with LibreOffice");
        let timeout_ms = self.config.timeout.as_millis() as u64;
        let output = match tokio::time::timeout(self.config.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ServerError::Render(format!(
                    "Failed to run '{}': {}",
                    soffice.display(),
                    e
                )))
            }
            Err(_elapsed) => return Err(ServerError::RenderTimeout(timeout_ms)),
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            warn!(status = %output.status, stderr = %stderr.trim(), "LibreOffice conversion failed");
            return Err(ServerError::Render(format!(
                "LibreOffice conversion failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }
        if !stderr.trim().is_empty() {
            debug!(stderr = %stderr.trim(), "LibreOffice stderr");
        }

        let png_path = find_png(scratch.path())?;
        let bytes = tokio::fs::read(&png_path).await?;
        if !bytes.starts_with(PNG_SIGNATURE) {
            return Err(ServerError::Render(format!(
                "LibreOffice output '{}' is not a PNG",
                png_path.display()
            )));
        }
        debug!(bytes = bytes.len(), "slide rendered");
        Ok(bytes)
    }
}

/// `slide.png`, or the first PNG LibreOffice wrote
fn find_png(dir: &Path) -> Result<PathBuf> {
    let expected = dir.join("slide.png");
    if expected.is_file() {
        return Ok(expected);
    }
    let mut found: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("png"))
        .collect();
    found.sort();
    found.into_iter().next().ok_or_else(|| {
        ServerError::Render("LibreOffice ran but produced no PNG output".to_string())
    })
}
