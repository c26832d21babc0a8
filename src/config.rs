//! Detection settings, loaded from an optional project-local file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::discovery::plugin::DEFAULT_PLUGIN_DIR;
use crate::error::ConfigError;

/// Config file names looked up at the project root, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".langprobe.yaml",
    ".langprobe.yml",
    ".langprobe.json",
    ".langprobe.toml",
];

pub const DEFAULT_PARSER_CACHE_FILE: &str = ".langprobe/parser-cache.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory names skipped in addition to the built-in exclusions.
    pub exclude_dirs: Vec<String>,
    /// Languages dropped from the result after detection.
    pub ignored_languages: Vec<String>,
    pub parallel: bool,
    /// Plugin directory, relative to the project root unless absolute.
    pub plugin_dir: PathBuf,
    /// Per-detector deadline. Unset means detectors may run indefinitely.
    pub detector_timeout_ms: Option<u64>,
    /// Parser cache document, relative to the project root unless absolute.
    pub parser_cache_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude_dirs: Vec::new(),
            ignored_languages: Vec::new(),
            parallel: true,
            plugin_dir: PathBuf::from(DEFAULT_PLUGIN_DIR),
            detector_timeout_ms: None,
            parser_cache_file: PathBuf::from(DEFAULT_PARSER_CACHE_FILE),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading config");

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::read_error(path, e.to_string()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match extension {
            "json" => serde_json::from_str(&content)
                .map_err(|e| ConfigError::parse_error(path, e.to_string())),
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| ConfigError::parse_error(path, e.to_string())),
            "toml" => {
                toml::from_str(&content).map_err(|e| ConfigError::parse_error(path, e.to_string()))
            }
            _ => Err(ConfigError::unsupported_format(extension)),
        }
    }

    /// Loads the first config file found at `root`, or the defaults.
    pub fn discover(root: &Path) -> Result<Self, ConfigError> {
        for name in CONFIG_FILE_NAMES {
            let candidate = root.join(name);
            if candidate.is_file() {
                return Self::load(candidate);
            }
        }
        trace!(root = %root.display(), "no config file, using defaults");
        Ok(Self::default())
    }

    pub fn plugin_dir_for(&self, root: &Path) -> PathBuf {
        root.join(&self.plugin_dir)
    }

    pub fn parser_cache_path_for(&self, root: &Path) -> PathBuf {
        root.join(&self.parser_cache_file)
    }

    pub fn detector_timeout(&self) -> Option<Duration> {
        self.detector_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.parallel);
        assert!(config.exclude_dirs.is_empty());
        assert_eq!(config.detector_timeout(), None);
        assert_eq!(
            config.plugin_dir_for(Path::new("/repo")),
            PathBuf::from("/repo/.langprobe/plugins")
        );
    }

    #[test]
    fn test_load_yaml_with_partial_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".langprobe.yaml");
        fs::write(
            &path,
            "exclude_dirs: [generated]\nignored_languages: [shell]\ndetector_timeout_ms: 500\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.exclude_dirs, vec!["generated".to_string()]);
        assert_eq!(config.ignored_languages, vec!["shell".to_string()]);
        assert_eq!(config.detector_timeout(), Some(Duration::from_millis(500)));
        assert!(config.parallel);
    }

    #[test]
    fn test_load_toml_and_json() {
        let temp_dir = TempDir::new().unwrap();
        let toml_path = temp_dir.path().join("a.toml");
        let json_path = temp_dir.path().join("b.json");
        fs::write(&toml_path, "parallel = false\n").unwrap();
        fs::write(&json_path, r#"{"ignored_languages": ["go"]}"#).unwrap();

        assert!(!Config::load(&toml_path).unwrap().parallel);
        assert_eq!(
            Config::load(&json_path).unwrap().ignored_languages,
            vec!["go".to_string()]
        );
    }

    #[test]
    fn test_unsupported_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");
        fs::write(&path, "parallel=false").unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_discover_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(Config::discover(temp_dir.path()).unwrap(), Config::default());

        fs::write(
            temp_dir.path().join(".langprobe.json"),
            r#"{"exclude_dirs": ["fixtures"]}"#,
        )
        .unwrap();
        assert_eq!(
            Config::discover(temp_dir.path()).unwrap().exclude_dirs,
            vec!["fixtures".to_string()]
        );
    }
}
