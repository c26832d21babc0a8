//! Runs every detector for a project and merges their answers.

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::discovery::detector::{BuiltinDetector, Detector};
use crate::discovery::plugin::{DiscoveryReport, PluginRegistry};
use crate::discovery::scanner::{canonical_root, ProjectScanner};
use crate::discovery::{DetectedLanguage, DetectionOutcome};
use crate::error::DetectorError;
use crate::patterns::PatternRegistry;

/// Detection pass over one project root.
///
/// Plugin detectors run ahead of the built-in ones and the first positive
/// answer for a language name is kept, so in sequential mode a plugin
/// overrides a built-in detector of the same name. In parallel mode the
/// first detector to finish wins and the result order is unspecified.
pub struct DetectionOrchestrator {
    root: PathBuf,
    scanner: Arc<ProjectScanner>,
    plugins: Arc<PluginRegistry>,
    ignored: BTreeSet<String>,
    timeout: Option<Duration>,
}

impl DetectionOrchestrator {
    pub fn new(root: &Path, config: &Config) -> Self {
        let patterns = Arc::new(PatternRegistry::new());
        if !config.exclude_dirs.is_empty() {
            patterns.set_custom_exclude_dirs(config.exclude_dirs.iter().cloned());
        }
        Self::with_scanner(root, Arc::new(ProjectScanner::new(patterns)))
            .with_ignored_languages(config.ignored_languages.iter().cloned())
            .with_timeout(config.detector_timeout())
    }

    /// Builds an orchestrator around an existing scanner so several passes
    /// share one scan cache.
    pub fn with_scanner(root: &Path, scanner: Arc<ProjectScanner>) -> Self {
        Self {
            root: canonical_root(root),
            scanner,
            plugins: Arc::new(PluginRegistry::new()),
            ignored: BTreeSet::new(),
            timeout: None,
        }
    }

    pub fn with_plugins(mut self, plugins: Arc<PluginRegistry>) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn with_ignored_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scanner(&self) -> &Arc<ProjectScanner> {
        &self.scanner
    }

    pub fn plugins(&self) -> &Arc<PluginRegistry> {
        &self.plugins
    }

    pub fn discover_plugins(&self, plugin_dir: &Path) -> DiscoveryReport {
        self.plugins.discover_plugins(plugin_dir)
    }

    /// Plugin detectors first, then one built-in detector per known language
    /// in priority order.
    pub fn detectors(&self) -> Vec<Arc<dyn Detector>> {
        let mut detectors: Vec<Arc<dyn Detector>> = self
            .plugins
            .create_all(&self.root, &self.scanner)
            .into_iter()
            .map(Arc::from)
            .collect();

        for language in self.scanner.patterns().languages() {
            detectors.push(Arc::new(BuiltinDetector::new(
                language.clone(),
                &self.root,
                Arc::clone(&self.scanner),
            )));
        }
        detectors
    }

    pub fn detect_languages(&self, parallel: bool) -> DetectionOutcome {
        self.detect_with(self.detectors(), parallel)
    }

    /// Runs `detectors` and merges their answers. Failing or panicking
    /// detectors are logged and count as not detected.
    pub fn detect_with(&self, detectors: Vec<Arc<dyn Detector>>, parallel: bool) -> DetectionOutcome {
        let accumulator = Accumulator::default();
        let total = detectors.len();

        if parallel && total > 1 {
            let threads = total.min(2 * available_cpus()).max(1);
            match ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("langprobe-detect-{i}"))
                .build()
            {
                Ok(pool) => {
                    debug!(threads, detectors = total, "running detectors in parallel");
                    pool.install(|| {
                        detectors
                            .par_iter()
                            .for_each(|detector| self.run_one(detector, &accumulator));
                    });
                }
                Err(e) => {
                    warn!(error = %e, "cannot build detector pool, running sequentially");
                    detectors
                        .iter()
                        .for_each(|detector| self.run_one(detector, &accumulator));
                }
            }
        } else {
            debug!(detectors = total, "running detectors sequentially");
            detectors
                .iter()
                .for_each(|detector| self.run_one(detector, &accumulator));
        }

        let mut outcome = DetectionOutcome::from_languages(accumulator.into_ordered());
        outcome.retain(|language| !self.ignored.contains(&language.name));

        info!(
            root = %self.root.display(),
            languages = ?outcome.names(),
            "language detection complete"
        );
        outcome
    }

    fn run_one(&self, detector: &Arc<dyn Detector>, accumulator: &Accumulator) {
        let language = detector.language().to_string();
        match evaluate(detector, self.timeout) {
            Ok(Some(detected)) => {
                if !accumulator.commit(detected) {
                    debug!(language = %language, "language already reported, keeping first");
                }
            }
            Ok(None) => trace!(language = %language, "not detected"),
            Err(e) => warn!(language = %language, error = %e, "detector failed"),
        }
    }
}

/// First-committer-wins collection keyed by language name.
#[derive(Default)]
struct Accumulator {
    entries: DashMap<String, (usize, DetectedLanguage)>,
    sequence: AtomicUsize,
}

impl Accumulator {
    fn commit(&self, detected: DetectedLanguage) -> bool {
        match self.entries.entry(detected.name.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let order = self.sequence.fetch_add(1, Ordering::SeqCst);
                slot.insert((order, detected));
                true
            }
        }
    }

    fn into_ordered(self) -> Vec<DetectedLanguage> {
        let mut entries: Vec<(usize, DetectedLanguage)> =
            self.entries.into_iter().map(|(_, entry)| entry).collect();
        entries.sort_by_key(|(order, _)| *order);
        entries.into_iter().map(|(_, detected)| detected).collect()
    }
}

fn evaluate(
    detector: &Arc<dyn Detector>,
    timeout: Option<Duration>,
) -> Result<Option<DetectedLanguage>, DetectorError> {
    let Some(timeout) = timeout else {
        return contained(detector.as_ref());
    };

    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(detector);
    let spawned = thread::Builder::new()
        .name(format!("langprobe-{}", detector.language()))
        .spawn(move || {
            let _ = tx.send(contained(worker.as_ref()));
        });
    if let Err(e) = spawned {
        return Err(DetectorError::failed(detector.language(), e.to_string()));
    }

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(DetectorError::timed_out(
            detector.language(),
            timeout.as_millis() as u64,
        )),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(DetectorError::failed(
            detector.language(),
            "worker exited without a result",
        )),
    }
}

/// Runs one detector, turning a panic into an error.
fn contained(detector: &dyn Detector) -> Result<Option<DetectedLanguage>, DetectorError> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<_, DetectorError> {
        if !detector.detect()? {
            return Ok(None);
        }
        Ok(Some(DetectedLanguage::new(
            detector.language(),
            detector.detect_package_manager(),
            detector.source_extensions(),
        )))
    }));

    outcome.unwrap_or_else(|payload| {
        Err(DetectorError::panicked(
            detector.language(),
            panic_message(payload.as_ref()),
        ))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn available_cpus() -> usize {
    thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    struct Fixed {
        language: &'static str,
        answer: Result<bool, &'static str>,
        manager: Option<&'static str>,
    }

    impl Detector for Fixed {
        fn language(&self) -> &str {
            self.language
        }

        fn detect(&self) -> Result<bool, DetectorError> {
            self.answer
                .map_err(|message| DetectorError::failed(self.language, message))
        }

        fn detect_package_manager(&self) -> Option<String> {
            self.manager.map(String::from)
        }

        fn source_extensions(&self) -> Vec<String> {
            vec![format!(".{}", self.language)]
        }
    }

    struct Panicking;

    impl Detector for Panicking {
        fn language(&self) -> &str {
            "boom"
        }

        fn detect(&self) -> Result<bool, DetectorError> {
            panic!("plugin exploded")
        }

        fn detect_package_manager(&self) -> Option<String> {
            None
        }

        fn source_extensions(&self) -> Vec<String> {
            Vec::new()
        }
    }

    struct Slow;

    impl Detector for Slow {
        fn language(&self) -> &str {
            "slow"
        }

        fn detect(&self) -> Result<bool, DetectorError> {
            thread::sleep(Duration::from_millis(500));
            Ok(true)
        }

        fn detect_package_manager(&self) -> Option<String> {
            None
        }

        fn source_extensions(&self) -> Vec<String> {
            Vec::new()
        }
    }

    fn fixed(
        language: &'static str,
        answer: Result<bool, &'static str>,
        manager: Option<&'static str>,
    ) -> Arc<dyn Detector> {
        Arc::new(Fixed {
            language,
            answer,
            manager,
        })
    }

    fn orchestrator(root: &Path) -> DetectionOrchestrator {
        DetectionOrchestrator::new(root, &Config::default())
    }

    #[test]
    fn test_first_detector_wins_in_sequential_mode() {
        let temp_dir = TempDir::new().unwrap();
        let outcome = orchestrator(temp_dir.path()).detect_with(
            vec![
                fixed("go", Ok(true), Some("plugin-go")),
                fixed("go", Ok(true), Some("go")),
            ],
            false,
        );

        assert_eq!(outcome.languages.len(), 1);
        assert_eq!(
            outcome.package_managers.get("go"),
            Some(&"plugin-go".to_string())
        );
    }

    #[test]
    fn test_failing_detector_is_isolated() {
        let temp_dir = TempDir::new().unwrap();
        for parallel in [false, true] {
            let outcome = orchestrator(temp_dir.path()).detect_with(
                vec![
                    fixed("python", Ok(true), Some("pip")),
                    fixed("broken", Err("cannot read manifest"), None),
                    fixed("go", Ok(true), None),
                ],
                parallel,
            );

            let names: BTreeSet<&str> = outcome.names().into_iter().collect();
            assert_eq!(names, BTreeSet::from(["go", "python"]));
        }
    }

    #[test]
    fn test_panicking_detector_is_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let outcome = orchestrator(temp_dir.path()).detect_with(
            vec![Arc::new(Panicking) as Arc<dyn Detector>, fixed("rust", Ok(true), Some("cargo"))],
            false,
        );

        assert_eq!(outcome.names(), vec!["rust"]);
    }

    #[test]
    fn test_timeout_marks_detector_absent() {
        let temp_dir = TempDir::new().unwrap();
        let outcome = orchestrator(temp_dir.path())
            .with_timeout(Some(Duration::from_millis(50)))
            .detect_with(vec![Arc::new(Slow) as Arc<dyn Detector>, fixed("go", Ok(true), None)], false);

        assert_eq!(outcome.names(), vec!["go"]);
    }

    #[test]
    fn test_ignored_languages_are_filtered_after_detection() {
        let temp_dir = TempDir::new().unwrap();
        let outcome = orchestrator(temp_dir.path())
            .with_ignored_languages(["go"])
            .detect_with(
                vec![
                    fixed("go", Ok(true), Some("go")),
                    fixed("python", Ok(true), Some("pip")),
                ],
                false,
            );

        assert_eq!(outcome.names(), vec!["python"]);
        assert!(!outcome.package_managers.contains_key("go"));
    }

    #[test]
    fn test_builtin_detectors_follow_priority_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("main.rb"), "puts 1").unwrap();
        fs::write(root.join("main.go"), "package main").unwrap();
        fs::write(root.join("app.py"), "print(1)").unwrap();

        let outcome = orchestrator(root).detect_languages(false);

        assert_eq!(outcome.names(), vec!["python", "go", "ruby"]);
    }

    #[test]
    fn test_parallel_and_sequential_agree_as_sets() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("Cargo.toml"), "[package]\nname = \"x\"\n").unwrap();
        fs::write(root.join("index.ts"), "export {}").unwrap();
        fs::write(root.join("package.json"), "{}").unwrap();

        let orchestrator = orchestrator(root);
        let sequential: BTreeSet<String> = orchestrator
            .detect_languages(false)
            .names()
            .into_iter()
            .map(String::from)
            .collect();
        let parallel: BTreeSet<String> = orchestrator
            .detect_languages(true)
            .names()
            .into_iter()
            .map(String::from)
            .collect();

        assert_eq!(sequential, parallel);
        assert_eq!(orchestrator.scanner().walk_count(), 1);
    }
}
