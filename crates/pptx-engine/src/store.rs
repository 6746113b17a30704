//! Presentations on disk
//!
//! Every call loads the file, works on it and (for mutations) writes it
//! back. Calls on the same file are serialised by a per-path async mutex;
//! different files proceed in parallel. Zip and XML work runs on the
//! blocking pool.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::errors::{Result, ServerError};
use crate::model::Presentation;
use crate::templates::{self, TemplateInfo};

const PPTX_EXTENSION: &str = ".pptx";

/// Where presentations and templates live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub presentations_dir: PathBuf,
    pub templates_dir: PathBuf,
}

impl StoreConfig {
    /// Templates default to `<presentations_dir>/templates`
    pub fn new(presentations_dir: impl Into<PathBuf>) -> Self {
        let presentations_dir = presentations_dir.into();
        let templates_dir = presentations_dir.join("templates");
        Self {
            presentations_dir,
            templates_dir,
        }
    }

    pub fn with_templates_dir(mut self, templates_dir: impl Into<PathBuf>) -> Self {
        self.templates_dir = templates_dir.into();
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new("./presentations")
    }
}

/// A saved presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationInfo {
    pub filename: String,
    pub size_bytes: u64,
}

/// Normalise a client-supplied filename: directory components are dropped
/// and `.pptx` is appended when missing
pub fn normalize_filename(filename: &str) -> Result<String> {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        return Err(ServerError::InvalidArgument(format!(
            "Invalid presentation filename '{}'",
            filename
        )));
    }
    if base.to_ascii_lowercase().ends_with(PPTX_EXTENSION) {
        Ok(base.to_string())
    } else {
        Ok(format!("{}{}", base, PPTX_EXTENSION))
    }
}

fn join_error(e: tokio::task::JoinError) -> ServerError {
    ServerError::TaskError(e.to_string())
}

fn load(path: &Path, filename: &str) -> Result<Presentation> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ServerError::NotFound(format!(
                "Presentation file '{}' not found.",
                filename
            )))
        }
        Err(e) => return Err(e.into()),
    };
    Presentation::from_bytes(&bytes).map_err(|e| match e {
        ServerError::MalformedPackage(msg) => ServerError::MalformedPackage(format!(
            "Error loading presentation '{}': {}",
            filename, msg
        )),
        other => other,
    })
}

/// Write through a temp file in the same directory, then rename
fn save_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| ServerError::IoError(e.error))?;
    Ok(())
}

type LockMap = Arc<Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>>;

/// Exclusive access to one file. The map entry goes away with the last user.
struct FileGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: LockMap,
    path: PathBuf,
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(&self.path)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.path);
        }
    }
}

/// File-backed presentation store
#[derive(Debug, Clone)]
pub struct PresentationStore {
    config: Arc<StoreConfig>,
    locks: LockMap,
}

impl PresentationStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config: Arc::new(config),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Create the presentations and templates directories
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config.presentations_dir)?;
        std::fs::create_dir_all(&self.config.templates_dir)?;
        Ok(())
    }

    /// Path of `filename` inside the presentations directory
    pub fn path_of(&self, filename: &str) -> Result<PathBuf> {
        Ok(self
            .config
            .presentations_dir
            .join(normalize_filename(filename)?))
    }

    async fn lock(&self, path: &Path) -> FileGuard {
        let file_lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        FileGuard {
            guard: Some(file_lock.lock_owned().await),
            locks: self.locks.clone(),
            path: path.to_path_buf(),
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Write an empty presentation, from the default template or from a
    /// named template with its slides removed. Overwrites `filename`.
    pub async fn create_or_clear(&self, filename: &str, template: Option<&str>) -> Result<PathBuf> {
        let path = self.path_of(filename)?;
        let template_path = template
            .map(|name| templates::resolve_template(&self.config.templates_dir, name))
            .transpose()?;

        let _guard = self.lock(&path).await;
        let target = path.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let prs = match &template_path {
                Some(template) => {
                    let mut prs = Presentation::from_bytes(&std::fs::read(template)?)?;
                    prs.clear_slides()?;
                    prs
                }
                None => Presentation::new()?,
            };
            save_atomic(&target, &prs.to_bytes()?)
        })
        .await
        .map_err(join_error)??;

        info!(path = %path.display(), template = ?template, "presentation created");
        Ok(path)
    }

    /// Load `filename`, apply `f` and save the result. Nothing is written
    /// when `f` fails.
    pub async fn update<T, F>(&self, filename: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Presentation) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path_of(filename)?;
        let name = normalize_filename(filename)?;
        let _guard = self.lock(&path).await;
        let target = path.clone();
        let value = tokio::task::spawn_blocking(move || -> Result<T> {
            let mut prs = load(&target, &name)?;
            let value = f(&mut prs)?;
            save_atomic(&target, &prs.to_bytes()?)?;
            Ok(value)
        })
        .await
        .map_err(join_error)??;
        debug!(path = %path.display(), "presentation saved");
        Ok(value)
    }

    /// Load `filename` and run `f` on it without saving
    pub async fn read<T, F>(&self, filename: &str, f: F) -> Result<T>
    where
        F: FnOnce(&Presentation) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path_of(filename)?;
        let name = normalize_filename(filename)?;
        let _guard = self.lock(&path).await;
        tokio::task::spawn_blocking(move || -> Result<T> { f(&load(&path, &name)?) })
            .await
            .map_err(join_error)?
    }

    /// Raw bytes of a saved presentation
    pub async fn file_bytes(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.path_of(filename)?;
        let _guard = self.lock(&path).await;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ServerError::NotFound(
                format!("Presentation file '{}' not found.", normalize_filename(filename)?),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Saved presentations, sorted by filename
    pub async fn list_presentations(&self) -> Result<Vec<PresentationInfo>> {
        let mut entries = match tokio::fs::read_dir(&self.config.presentations_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if metadata.is_file() && filename.to_ascii_lowercase().ends_with(PPTX_EXTENSION) {
                found.push(PresentationInfo {
                    filename,
                    size_bytes: metadata.len(),
                });
            }
        }
        found.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(found)
    }

    pub fn list_templates(&self) -> Result<Vec<TemplateInfo>> {
        templates::list_templates(&self.config.templates_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::operations::{self, ShapeRequest};
    use tempfile::TempDir;

    fn store() -> (TempDir, PresentationStore) {
        let dir = TempDir::new().unwrap();
        let store = PresentationStore::new(StoreConfig::new(dir.path()));
        store.ensure_dirs().unwrap();
        (dir, store)
    }

    #[test]
    fn test_normalize_filename() {
        assert_eq!(normalize_filename("deck").unwrap(), "deck.pptx");
        assert_eq!(normalize_filename("deck.PPTX").unwrap(), "deck.PPTX");
        assert_eq!(normalize_filename("../../etc/deck").unwrap(), "deck.pptx");
        assert_eq!(normalize_filename("a\\b\\deck.pptx").unwrap(), "deck.pptx");
        for bad in ["", "..", "dir/", "."] {
            assert!(matches!(
                normalize_filename(bad),
                Err(ServerError::InvalidArgument(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_create_then_fetch() {
        let (_dir, store) = store();
        let path = store.create_or_clear("deck", None).await.unwrap();
        assert!(path.ends_with("deck.pptx"));

        let bytes = store.file_bytes("deck.pptx").await.unwrap();
        assert_eq!(&bytes[..4], b"PK\x03\x04");
        assert_eq!(Presentation::from_bytes(&bytes).unwrap().slide_count(), 0);
    }

    #[tokio::test]
    async fn test_create_clears_existing() {
        let (_dir, store) = store();
        store.create_or_clear("deck", None).await.unwrap();
        store.update("deck", |prs| prs.add_slide(1)).await.unwrap();
        store.create_or_clear("deck", None).await.unwrap();
        let count = store.read("deck", |prs| Ok(prs.slide_count())).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_template_is_emptied() {
        let (_dir, store) = store();
        let mut prs = Presentation::new().unwrap();
        prs.add_slide(0).unwrap();
        prs.add_slide(1).unwrap();
        std::fs::write(
            store.config().templates_dir.join("corporate.pptx"),
            prs.to_bytes().unwrap(),
        )
        .unwrap();

        store.create_or_clear("deck", Some("corporate")).await.unwrap();
        let (slides, layouts) = store
            .read("deck", |prs| Ok((prs.slide_count(), prs.layouts().len())))
            .await
            .unwrap();
        assert_eq!((slides, layouts), (0, 11));

        let err = store.create_or_clear("deck", Some("missing")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_failed_update_leaves_file_untouched() {
        let (_dir, store) = store();
        store.create_or_clear("deck", None).await.unwrap();
        store.update("deck", |prs| prs.add_slide(6)).await.unwrap();
        let before = store.file_bytes("deck").await.unwrap();

        let err = store
            .update("deck", |prs| {
                let req = ShapeRequest {
                    shape_type_name: "NOT_A_SHAPE".into(),
                    left_inches: 1.0,
                    top_inches: 1.0,
                    width_inches: 1.0,
                    height_inches: 1.0,
                    text: None,
                };
                operations::add_shape(prs, 0, &req)
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(store.file_bytes("deck").await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let (_dir, store) = store();
        let err = store.update("ghost", |prs| prs.add_slide(0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            store.file_bytes("ghost").await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_concurrent_updates_on_one_file() {
        let (_dir, store) = store();
        store.create_or_clear("deck", None).await.unwrap();
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.update("deck", |prs| prs.add_slide(6)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        let count = store.read("deck", |prs| Ok(prs.slide_count())).await.unwrap();
        assert_eq!(count, 8);
    }

    #[tokio::test]
    async fn test_file_locks_are_released() {
        let (_dir, store) = store();
        for name in ["a", "b", "c"] {
            store.create_or_clear(name, None).await.unwrap();
            store.update(name, |prs| prs.add_slide(6)).await.unwrap();
        }
        assert_eq!(store.tracked_locks(), 0);

        let path = store.path_of("a").unwrap();
        let held = store.lock(&path).await;
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.read("a", |prs| Ok(prs.slide_count())).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(store.tracked_locks(), 1);
        drop(held);
        assert_eq!(waiter.await.unwrap().unwrap(), 1);
        assert_eq!(store.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_list_presentations() {
        let (_dir, store) = store();
        store.create_or_clear("b", None).await.unwrap();
        store.create_or_clear("a", None).await.unwrap();
        let names: Vec<_> = store
            .list_presentations()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.filename)
            .collect();
        assert_eq!(names, vec!["a.pptx", "b.pptx"]);
        assert!(store.list_templates().unwrap().is_empty());
    }
}
