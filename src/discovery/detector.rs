use std::path::Path;
use std::sync::{Arc, OnceLock};

use tracing::{debug, trace};

use crate::discovery::scanner::ProjectScanner;
use crate::error::DetectorError;
use crate::patterns::{PatternRegistry, RootFiles};

/// Answers whether one language is present under a project root.
///
/// Instances are bound to a single root and used for a single detection
/// pass. Implementations may run arbitrary code; the orchestrator contains
/// errors and panics but does not sandbox them.
pub trait Detector: Send + Sync {
    fn language(&self) -> &str;

    fn detect(&self) -> Result<bool, DetectorError>;

    fn detect_package_manager(&self) -> Option<String>;

    fn source_extensions(&self) -> Vec<String>;
}

/// Detector for a language from the built-in pattern tables.
///
/// Manifest files at the root are checked first; only when none exists is
/// the shared scan consulted.
pub struct BuiltinDetector {
    language: String,
    patterns: Arc<PatternRegistry>,
    scanner: Arc<ProjectScanner>,
    files: RootFiles,
    detected: OnceLock<bool>,
}

impl BuiltinDetector {
    pub fn new(language: impl Into<String>, root: &Path, scanner: Arc<ProjectScanner>) -> Self {
        Self {
            language: language.into(),
            patterns: Arc::clone(scanner.patterns()),
            scanner,
            files: RootFiles::new(root),
            detected: OnceLock::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.files.root()
    }

    fn evaluate(&self) -> bool {
        let package_files = self.patterns.package_files(&self.language);
        if self.files.any_exists(package_files) {
            debug!(language = %self.language, "detected from package manifest");
            return true;
        }

        let extensions = self.patterns.source_extensions(&self.language);
        let found = self.scanner.detect_by_extensions(self.files.root(), extensions);
        trace!(language = %self.language, found, "checked source extensions");
        found
    }
}

impl Detector for BuiltinDetector {
    fn language(&self) -> &str {
        &self.language
    }

    fn detect(&self) -> Result<bool, DetectorError> {
        Ok(*self.detected.get_or_init(|| self.evaluate()))
    }

    fn detect_package_manager(&self) -> Option<String> {
        self.patterns
            .detect_package_manager_in(&self.language, &self.files)
    }

    fn source_extensions(&self) -> Vec<String> {
        self.patterns.source_extensions(&self.language).to_vec()
    }
}
