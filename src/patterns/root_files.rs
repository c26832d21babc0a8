use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::debug;

use super::package_manager::toml_declares_section;

/// Existence probes for files directly under a project root.
///
/// Names containing glob metacharacters are matched against the root's
/// entries, which are listed once per instance.
#[derive(Debug)]
pub struct RootFiles {
    root: PathBuf,
    entries: OnceLock<Vec<String>>,
}

impl RootFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: OnceLock::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self, name: &str) -> bool {
        if !is_pattern(name) {
            return self.root.join(name).exists();
        }

        let pattern = match glob::Pattern::new(name) {
            Ok(pattern) => pattern,
            Err(e) => {
                debug!(pattern = name, error = %e, "invalid file pattern");
                return false;
            }
        };
        self.entries().iter().any(|entry| pattern.matches(entry))
    }

    pub fn any_exists<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().any(|name| self.exists(name.as_ref()))
    }

    pub fn declares_section(&self, name: &str, section: &str) -> bool {
        toml_declares_section(&self.root.join(name), section)
    }

    fn entries(&self) -> &[String] {
        self.entries.get_or_init(|| match fs::read_dir(&self.root) {
            Ok(entries) => entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(e) => {
                debug!(root = %self.root.display(), error = %e, "cannot list project root");
                Vec::new()
            }
        })
    }
}

fn is_pattern(name: &str) -> bool {
    name.contains(['*', '?', '['])
}
