//! Single-walk project scanner shared by every language check.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, trace, warn};
use walkdir::{DirEntry, WalkDir};

use crate::patterns::PatternRegistry;

/// Files above this size never contribute to detection.
pub const MAX_SCAN_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// What one walk of a project root found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub root: PathBuf,
    /// Every known language, `true` when at least one qualifying file exists.
    pub languages: BTreeMap<String, bool>,
    /// Lowercase extensions (with leading dot) of every qualifying file.
    pub extensions: BTreeSet<String>,
    pub files_scanned: usize,
    pub files_skipped: usize,
    /// Exclusion generation the walk ran under.
    pub generation: u64,
}

impl ScanResult {
    pub fn has_language(&self, language: &str) -> bool {
        self.languages.get(language).copied().unwrap_or(false)
    }
}

type ExtensionKey = (PathBuf, Vec<String>);

/// Walks each project root at most once and answers extension queries from
/// the memoized result.
///
/// Both caches are keyed by the canonical root and tagged with the exclusion
/// generation they were computed under; entries from an older generation are
/// discarded on the next access.
pub struct ProjectScanner {
    patterns: Arc<PatternRegistry>,
    scans: DashMap<PathBuf, Arc<ScanResult>>,
    extension_lookups: DashMap<ExtensionKey, (u64, bool)>,
    walks: AtomicUsize,
}

impl ProjectScanner {
    pub fn new(patterns: Arc<PatternRegistry>) -> Self {
        Self {
            patterns,
            scans: DashMap::new(),
            extension_lookups: DashMap::new(),
            walks: AtomicUsize::new(0),
        }
    }

    pub fn patterns(&self) -> &Arc<PatternRegistry> {
        &self.patterns
    }

    /// Replaces the custom exclusions and drops every cached result.
    pub fn set_custom_exclude_dirs<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns.set_custom_exclude_dirs(names);
        self.clear_cache(None);
    }

    pub fn scan_once(&self, root: &Path) -> Arc<ScanResult> {
        let key = canonical_root(root);
        let generation = self.patterns.exclusions().generation();

        // The shard stays locked while walking, so concurrent callers for the
        // same root wait for this walk instead of starting their own.
        match self.scans.entry(key) {
            Entry::Occupied(entry) if entry.get().generation == generation => {
                trace!(root = %entry.key().display(), "scan cache hit");
                Arc::clone(entry.get())
            }
            Entry::Occupied(mut entry) => {
                debug!(root = %entry.key().display(), "exclusions changed, rescanning");
                let result = Arc::new(self.walk(entry.key(), generation));
                entry.insert(Arc::clone(&result));
                result
            }
            Entry::Vacant(entry) => {
                let result = Arc::new(self.walk(entry.key(), generation));
                entry.insert(Arc::clone(&result));
                result
            }
        }
    }

    /// Whether any of `extensions` is present under `root`.
    ///
    /// Each extension is mapped to the languages claiming it and answered from
    /// the per-language flags; extensions no built-in language claims are
    /// looked up in the raw extension set.
    pub fn detect_by_extensions<S: AsRef<str>>(&self, root: &Path, extensions: &[S]) -> bool {
        let mut wanted: Vec<String> = extensions
            .iter()
            .map(|e| normalize_extension(e.as_ref()))
            .filter(|e| e.len() > 1)
            .collect();
        if wanted.is_empty() {
            return false;
        }
        wanted.sort();
        wanted.dedup();

        let generation = self.patterns.exclusions().generation();
        let key = (canonical_root(root), wanted);
        if let Some(cached) = self.extension_lookups.get(&key) {
            let (cached_generation, found) = *cached;
            if cached_generation == generation {
                return found;
            }
        }

        let scan = self.scan_once(&key.0);
        let found = key.1.iter().any(|ext| {
            let claimants = self.patterns.languages_for_extension(ext);
            if claimants.is_empty() {
                scan.extensions.contains(ext)
            } else {
                claimants.iter().any(|language| scan.has_language(language))
            }
        });

        self.extension_lookups.insert(key, (scan.generation, found));
        found
    }

    /// Drops the cached results for `root`, or for every root when `None`.
    pub fn clear_cache(&self, root: Option<&Path>) {
        match root {
            Some(root) => {
                let key = canonical_root(root);
                self.scans.remove(&key);
                self.extension_lookups.retain(|(cached_root, _), _| cached_root != &key);
                debug!(root = %key.display(), "scan cache cleared");
            }
            None => {
                self.scans.clear();
                self.extension_lookups.clear();
                debug!("scan cache cleared");
            }
        }
    }

    pub fn cached_roots(&self) -> usize {
        self.scans.len()
    }

    /// Number of filesystem walks performed so far.
    pub fn walk_count(&self) -> usize {
        self.walks.load(Ordering::Relaxed)
    }

    fn walk(&self, root: &Path, generation: u64) -> ScanResult {
        self.walks.fetch_add(1, Ordering::Relaxed);

        let mut languages: BTreeMap<String, bool> = self
            .patterns
            .languages()
            .iter()
            .map(|language| (language.clone(), false))
            .collect();
        let mut extensions = BTreeSet::new();
        let mut files_scanned = 0;
        let mut files_skipped = 0;

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| self.should_descend(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "skipping unreadable path");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "cannot stat file");
                    files_skipped += 1;
                    continue;
                }
            };
            if size > MAX_SCAN_FILE_SIZE {
                trace!(path = %entry.path().display(), size, "skipping oversized file");
                files_skipped += 1;
                continue;
            }

            files_scanned += 1;
            let Some(ext) = entry.path().extension() else {
                continue;
            };
            let ext = normalize_extension(&ext.to_string_lossy());
            for language in self.patterns.languages_for_extension(&ext) {
                languages.insert(language.clone(), true);
            }
            extensions.insert(ext);
        }

        debug!(
            root = %root.display(),
            files_scanned,
            files_skipped,
            detected = languages.values().filter(|found| **found).count(),
            "project scan complete"
        );

        ScanResult {
            root: root.to_path_buf(),
            languages,
            extensions,
            files_scanned,
            files_skipped,
            generation,
        }
    }

    fn should_descend(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        !name.starts_with('.') && !self.patterns.is_excluded_dir(&name)
    }
}

pub(crate) fn canonical_root(root: &Path) -> PathBuf {
    root.canonicalize().unwrap_or_else(|_| root.to_path_buf())
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}
