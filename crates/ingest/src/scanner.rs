use crate::config::{IngestConfig, DEFAULT_MAX_FILE_BYTES};
use ignore::WalkBuilder;
use std::path::{Component, Path, PathBuf};

/// Directory names never descended into, even without a `.gitignore`
const IGNORED_SCOPES: &[&str] = &["target", "node_modules", "__pycache__", ".venv"];

/// Scanner for finding documentation and source files under a root
#[derive(Debug, Clone)]
pub struct DocumentScanner {
    root: PathBuf,
    extensions: Vec<String>,
    max_file_bytes: u64,
}

impl DocumentScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::from_config(root, &IngestConfig::default())
    }

    pub fn from_config(root: impl AsRef<Path>, config: &IngestConfig) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extensions: config
                .extensions
                .iter()
                .map(|ext| ext.to_ascii_lowercase())
                .collect(),
            max_file_bytes: config.max_file_bytes,
        }
    }

    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().to_ascii_lowercase())
            .collect();
        self
    }

    #[must_use]
    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = if max_file_bytes == 0 {
            DEFAULT_MAX_FILE_BYTES
        } else {
            max_file_bytes
        };
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan for matching files (.gitignore aware), sorted by path
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let root = self.root.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            // Honour .gitignore files outside of a git checkout as well.
            .require_git(false);
        builder.filter_entry(move |entry| !is_ignored_scope(entry.path(), &root));

        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Failed to read entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|kind| kind.is_file()) {
                continue;
            }

            let path = entry.path();
            if !self.matches_extension(path) {
                continue;
            }

            if let Ok(meta) = entry.metadata() {
                if meta.len() > self.max_file_bytes {
                    log::debug!(
                        "Skipping large file {} ({} bytes > {})",
                        path.display(),
                        meta.len(),
                        self.max_file_bytes
                    );
                    continue;
                }
            }

            files.push(path.to_path_buf());
        }

        files.sort();
        log::info!("Found {} documents under {}", files.len(), self.root.display());
        files
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .is_some_and(|ext| self.extensions.iter().any(|candidate| *candidate == ext))
    }
}

fn is_ignored_scope(path: &Path, root: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    relative.components().any(|component| match component {
        Component::Normal(name) => {
            let lowered = name.to_string_lossy().to_lowercase();
            IGNORED_SCOPES.contains(&lowered.as_str())
        }
        _ => false,
    })
}

/// Identifier of `path` inside `root`: relative, `/`-separated
pub fn file_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .filter_map(|path| file_id(root, path))
            .collect()
    }

    #[test]
    fn finds_docs_and_skips_ignored() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        fs::create_dir_all(root.join("docs/api"))?;
        fs::create_dir_all(root.join("target/doc"))?;
        fs::create_dir_all(root.join(".hidden"))?;
        fs::write(root.join("README.md"), "# Readme")?;
        fs::write(root.join("docs/api/regs.rst"), "Registers\n=========")?;
        fs::write(root.join("docs/logo.png"), [0u8, 1, 2])?;
        fs::write(root.join("target/doc/out.md"), "# Generated")?;
        fs::write(root.join(".hidden/notes.md"), "# Secret")?;
        fs::write(root.join(".gitignore"), "drafts/\n")?;
        fs::create_dir_all(root.join("drafts"))?;
        fs::write(root.join("drafts/wip.md"), "# WIP")?;

        let files = DocumentScanner::new(root).scan();
        assert_eq!(names(root, &files), vec!["README.md", "docs/api/regs.rst"]);
        Ok(())
    }

    #[test]
    fn respects_size_cap_and_extensions() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        fs::write(root.join("small.md"), "# Small")?;
        fs::write(root.join("big.md"), "x".repeat(2048))?;
        fs::write(root.join("module.dml"), "dml 1.4;")?;

        let files = DocumentScanner::new(root)
            .with_extensions(["MD"])
            .with_max_file_bytes(1024)
            .scan();
        assert_eq!(names(root, &files), vec!["small.md"]);
        Ok(())
    }

    #[test]
    fn file_id_is_relative_and_slash_separated() {
        let root = Path::new("/data/docs");
        assert_eq!(
            file_id(root, &root.join("guide").join("intro.md")),
            Some("guide/intro.md".to_string())
        );
        assert_eq!(file_id(root, Path::new("/elsewhere/a.md")), None);
        assert_eq!(file_id(root, root), None);
    }
}
