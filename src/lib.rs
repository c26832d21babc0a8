/// langprobe
///
/// Detects which programming languages and package managers a project uses,
/// with pluggable detectors and a content-addressed cache for parse results.
pub mod cache;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod patterns;

pub use cache::ParserResultCache;
pub use config::Config;
pub use discovery::{
    DetectedLanguage, DetectionOrchestrator, DetectionOutcome, Detector, DetectorFactory,
    PluginRegistry, ProjectScanner,
};
pub use error::{Error, Result};
pub use patterns::PatternRegistry;
