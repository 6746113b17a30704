//! Templates stored on disk

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, ServerError};

const TEMPLATE_EXTENSIONS: &[&str] = &["pptx", "potx"];

/// Information about an available template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInfo {
    /// Name to pass as `template` (file stem)
    pub name: String,
    pub filename: String,
    pub size_bytes: u64,
}

fn has_template_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TEMPLATE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Templates in `dir`, sorted by name. A missing directory has none.
pub fn list_templates(dir: &Path) -> Result<Vec<TemplateInfo>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut templates = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !has_template_extension(&path) {
            continue;
        }
        let (Some(stem), Some(filename)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.file_name().and_then(|s| s.to_str()),
        ) else {
            continue;
        };
        templates.push(TemplateInfo {
            name: stem.to_string(),
            filename: filename.to_string(),
            size_bytes: entry.metadata()?.len(),
        });
    }
    templates.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(templates)
}

/// Path of template `name` inside `dir`.
///
/// Directory components of `name` are ignored. Without an extension,
/// `.pptx` is tried before `.potx`.
pub fn resolve_template(dir: &Path, name: &str) -> Result<PathBuf> {
    let base = Path::new(name)
        .file_name()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .ok_or_else(|| ServerError::InvalidArgument(format!("Invalid template name '{}'", name)))?;

    let candidates: Vec<PathBuf> = if has_template_extension(Path::new(base)) {
        vec![dir.join(base)]
    } else {
        TEMPLATE_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{}", base, ext)))
            .collect()
    };

    candidates
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| {
            ServerError::NotFound(format!(
                "Template '{}' not found in '{}'",
                name,
                dir.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_and_resolve() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("corporate.potx"), b"x").unwrap();
        std::fs::write(dir.path().join("basic.pptx"), b"xyz").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let templates = list_templates(dir.path()).unwrap();
        let names: Vec<_> = templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["basic", "corporate"]);
        assert_eq!(templates[0].size_bytes, 3);

        assert_eq!(
            resolve_template(dir.path(), "corporate").unwrap(),
            dir.path().join("corporate.potx")
        );
        assert_eq!(
            resolve_template(dir.path(), "../basic.pptx").unwrap(),
            dir.path().join("basic.pptx")
        );
    }

    #[test]
    fn test_missing_template() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            resolve_template(dir.path(), "nope"),
            Err(ServerError::NotFound(_))
        ));
        assert!(matches!(
            resolve_template(dir.path(), ".."),
            Err(ServerError::InvalidArgument(_))
        ));
        assert!(list_templates(&dir.path().join("absent")).unwrap().is_empty());
    }
}
