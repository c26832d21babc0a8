//! Project-local detector plugins.
//!
//! A plugin file under the plugin directory declares one or more detectors:
//!
//! ```toml
//! [[detector]]
//! language = "zig"
//! extensions = [".zig"]
//! package_files = ["build.zig"]
//! package_managers = [{ files = ["build.zig.zon"], manager = "zig" }]
//! command = ["./tools/detect-zig.sh"]
//! ```
//!
//! `command`, when given, decides detection: it runs in the project root with
//! the full privileges of this process, and exit status 0 means present.
//! Plugin files are trusted as-is; nothing is sandboxed.
//!
//! In-process plugins implement [`DetectorFactory`] and are added with
//! [`PluginRegistry::register`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde::Deserialize;
use tracing::{debug, info, trace, warn};

use crate::discovery::detector::Detector;
use crate::discovery::scanner::ProjectScanner;
use crate::error::{DetectorError, PluginError};
use crate::patterns::RootFiles;

/// Default plugin directory, relative to the project root.
pub const DEFAULT_PLUGIN_DIR: &str = ".langprobe/plugins";

/// Creates detectors for one language, bound to a root on demand.
pub trait DetectorFactory: Send + Sync {
    fn language(&self) -> &str;

    fn create(&self, root: &Path, scanner: Arc<ProjectScanner>) -> Box<dyn Detector>;
}

#[derive(Debug, Deserialize)]
struct PluginFile {
    #[serde(default, alias = "detectors")]
    detector: Vec<PluginDefinition>,
}

/// One detector declared in a plugin file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PluginDefinition {
    pub language: String,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub package_files: Vec<String>,
    #[serde(default)]
    pub package_managers: Vec<PluginRule>,
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

/// Package-manager rule of a plugin; every file must exist.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PluginRule {
    pub files: Vec<String>,
    pub manager: String,
}

impl PluginDefinition {
    fn validate(mut self, path: &Path) -> Result<Self, PluginError> {
        self.language = self.language.trim().to_string();
        if self.language.is_empty() {
            return Err(PluginError::invalid_detector(path, "missing language"));
        }
        if matches!(&self.command, Some(argv) if argv.is_empty()) {
            return Err(PluginError::invalid_detector(
                path,
                format!("empty command for {}", self.language),
            ));
        }
        if self.command.is_none() && self.extensions.is_empty() && self.package_files.is_empty() {
            return Err(PluginError::invalid_detector(
                path,
                format!(
                    "{} declares no command, extensions or package files",
                    self.language
                ),
            ));
        }
        if let Some(rule) = self.package_managers.iter().find(|r| r.files.is_empty()) {
            return Err(PluginError::invalid_detector(
                path,
                format!("package manager rule '{}' lists no files", rule.manager),
            ));
        }
        Ok(self)
    }
}

/// Declarations read from one plugin file, split by validity.
#[derive(Debug, Default)]
pub struct PluginFileContents {
    pub definitions: Vec<PluginDefinition>,
    pub rejected: Vec<PluginError>,
}

/// Loads every detector declared in one plugin file. A file that cannot be
/// read or parsed is an error; an invalid declaration only rejects itself.
pub fn load_plugin_file(path: &Path) -> Result<PluginFileContents, PluginError> {
    trace!(path = %path.display(), "loading plugin file");

    let content =
        fs::read_to_string(path).map_err(|e| PluginError::read_error(path, e.to_string()))?;

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let file: PluginFile = match extension {
        "toml" => toml::from_str(&content).map_err(|e| PluginError::parse_error(path, e.to_string()))?,
        "json" => serde_json::from_str(&content)
            .map_err(|e| PluginError::parse_error(path, e.to_string()))?,
        "yaml" | "yml" => serde_yaml::from_str(&content)
            .map_err(|e| PluginError::parse_error(path, e.to_string()))?,
        _ => return Err(PluginError::unsupported_format(extension)),
    };

    let mut contents = PluginFileContents::default();
    for definition in file.detector {
        match definition.validate(path) {
            Ok(definition) => contents.definitions.push(definition),
            Err(e) => contents.rejected.push(e),
        }
    }
    Ok(contents)
}

/// Factory for a detector declared in a plugin file.
pub struct DeclaredDetectorFactory {
    definition: Arc<PluginDefinition>,
    source: PathBuf,
}

impl DeclaredDetectorFactory {
    pub fn new(definition: PluginDefinition, source: impl Into<PathBuf>) -> Self {
        Self {
            definition: Arc::new(definition),
            source: source.into(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl DetectorFactory for DeclaredDetectorFactory {
    fn language(&self) -> &str {
        &self.definition.language
    }

    fn create(&self, root: &Path, scanner: Arc<ProjectScanner>) -> Box<dyn Detector> {
        Box::new(DeclaredDetector {
            definition: Arc::clone(&self.definition),
            files: RootFiles::new(root),
            scanner,
            detected: OnceLock::new(),
        })
    }
}

struct DeclaredDetector {
    definition: Arc<PluginDefinition>,
    files: RootFiles,
    scanner: Arc<ProjectScanner>,
    detected: OnceLock<bool>,
}

impl DeclaredDetector {
    fn run_command(&self, argv: &[String]) -> Result<bool, DetectorError> {
        let language = &self.definition.language;
        let root = self.files.root();

        let Some((program, args)) = argv.split_first() else {
            return Err(DetectorError::failed(language, "plugin command is empty"));
        };

        let program = Path::new(program);
        let program = if program.is_relative() && program.components().count() > 1 {
            root.join(program)
        } else {
            program.to_path_buf()
        };

        debug!(language = %language, program = %program.display(), "running plugin command");
        let status = Command::new(&program)
            .args(args)
            .current_dir(root)
            .env("LANGPROBE_ROOT", root)
            .env("LANGPROBE_LANGUAGE", language)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                DetectorError::command_failed(language, format!("{}: {e}", program.display()))
            })?;

        trace!(language = %language, code = ?status.code(), "plugin command finished");
        Ok(status.success())
    }

    fn evaluate(&self) -> bool {
        let definition = &self.definition;
        if self.files.any_exists(definition.package_files.as_slice()) {
            return true;
        }
        self.scanner
            .detect_by_extensions(self.files.root(), definition.extensions.as_slice())
    }
}

impl Detector for DeclaredDetector {
    fn language(&self) -> &str {
        &self.definition.language
    }

    fn detect(&self) -> Result<bool, DetectorError> {
        if let Some(found) = self.detected.get() {
            return Ok(*found);
        }
        let found = match &self.definition.command {
            Some(argv) => self.run_command(argv)?,
            None => self.evaluate(),
        };
        Ok(*self.detected.get_or_init(|| found))
    }

    fn detect_package_manager(&self) -> Option<String> {
        self.definition
            .package_managers
            .iter()
            .find(|rule| rule.files.iter().all(|f| self.files.exists(f)))
            .map(|rule| rule.manager.clone())
    }

    fn source_extensions(&self) -> Vec<String> {
        self.definition.extensions.clone()
    }
}

/// Summary of one plugin discovery pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub loaded: Vec<String>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Detector factories registered by language name; the last registration
/// for a name wins.
#[derive(Default)]
pub struct PluginRegistry {
    factories: RwLock<BTreeMap<String, Arc<dyn DetectorFactory>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory`, returning the one it replaced.
    pub fn register(&self, factory: Arc<dyn DetectorFactory>) -> Option<Arc<dyn DetectorFactory>> {
        let language = factory.language().to_string();
        let replaced = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(language.clone(), factory);
        if replaced.is_some() {
            debug!(language = %language, "plugin detector replaced");
        }
        replaced
    }

    /// Loads every plugin file in `plugin_dir`, skipping names starting with
    /// `_`. Files that fail to load are logged and reported, never fatal.
    pub fn discover_plugins(&self, plugin_dir: &Path) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        let entries = match fs::read_dir(plugin_dir) {
            Ok(entries) => entries,
            Err(e) => {
                trace!(dir = %plugin_dir.display(), error = %e, "no plugin directory");
                return report;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .map(|name| !name.to_string_lossy().starts_with('_'))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        for path in paths {
            match load_plugin_file(&path) {
                Ok(contents) => {
                    for definition in contents.definitions {
                        let language = definition.language.clone();
                        self.register(Arc::new(DeclaredDetectorFactory::new(definition, &path)));
                        report.loaded.push(language);
                    }
                    for e in contents.rejected {
                        warn!(path = %path.display(), error = %e, "skipping plugin detector");
                        report.failed.push((path.clone(), e.to_string()));
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping plugin file");
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        if !report.loaded.is_empty() {
            info!(
                count = report.loaded.len(),
                dir = %plugin_dir.display(),
                "loaded plugin detectors"
            );
        }
        report
    }

    pub fn get_detector(
        &self,
        language: &str,
        root: &Path,
        scanner: Arc<ProjectScanner>,
    ) -> Option<Box<dyn Detector>> {
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(language)
            .cloned()?;
        Some(factory.create(root, scanner))
    }

    /// One fresh detector per registered language, in name order.
    pub fn create_all(&self, root: &Path, scanner: &Arc<ProjectScanner>) -> Vec<Box<dyn Detector>> {
        let factories: Vec<Arc<dyn DetectorFactory>> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        factories
            .iter()
            .map(|factory| factory.create(root, Arc::clone(scanner)))
            .collect()
    }

    pub fn all_languages(&self) -> Vec<String> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
