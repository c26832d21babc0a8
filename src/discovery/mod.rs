//! Language and package-manager detection for a project tree.

pub mod detector;
pub mod orchestrator;
pub mod plugin;
pub mod scanner;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use detector::{BuiltinDetector, Detector};
pub use orchestrator::DetectionOrchestrator;
pub use plugin::{
    DetectorFactory, DiscoveryReport, PluginDefinition, PluginFileContents, PluginRegistry,
};
pub use scanner::{ProjectScanner, ScanResult};

/// A language confirmed present, as handed to downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedLanguage {
    pub name: String,
    pub package_manager: Option<String>,
    pub source_extensions: Vec<String>,
}

impl DetectedLanguage {
    pub fn new(
        name: impl Into<String>,
        package_manager: Option<String>,
        source_extensions: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            package_manager,
            source_extensions,
        }
    }
}

/// Result of one detection pass: the languages in commit order and a
/// language → package manager map for those that resolved one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionOutcome {
    pub languages: Vec<DetectedLanguage>,
    pub package_managers: BTreeMap<String, String>,
}

impl DetectionOutcome {
    pub fn from_languages(languages: Vec<DetectedLanguage>) -> Self {
        let package_managers = languages
            .iter()
            .filter_map(|l| {
                l.package_manager
                    .as_ref()
                    .map(|manager| (l.name.clone(), manager.clone()))
            })
            .collect();
        Self {
            languages,
            package_managers,
        }
    }

    /// Keeps the languages matching `keep`, in both the list and the map.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&DetectedLanguage) -> bool,
    {
        let mut dropped = Vec::new();
        self.languages.retain(|language| {
            let kept = keep(language);
            if !kept {
                dropped.push(language.name.clone());
            }
            kept
        });
        for name in dropped {
            self.package_managers.remove(&name);
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.languages.iter().map(|l| l.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&DetectedLanguage> {
        self.languages.iter().find(|l| l.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}
