use std::collections::BTreeSet;
use std::path::{Component, Path};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use super::languages::DEFAULT_EXCLUDE_DIRS;

/// Directory names skipped by every walk: an immutable default set plus a
/// replaceable custom set.
///
/// Every replacement of the custom set bumps [`ExclusionSet::generation`];
/// caches derived from a walk compare generations and drop themselves when
/// the value they were built under is stale.
#[derive(Debug)]
pub struct ExclusionSet {
    defaults: BTreeSet<String>,
    custom: RwLock<BTreeSet<String>>,
    generation: AtomicU64,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self {
            defaults: DEFAULT_EXCLUDE_DIRS.iter().map(|d| d.to_string()).collect(),
            custom: RwLock::new(BTreeSet::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn defaults(&self) -> &BTreeSet<String> {
        &self.defaults
    }

    pub fn custom(&self) -> BTreeSet<String> {
        self.custom
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_custom<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names
            .into_iter()
            .map(Into::into)
            .map(|n| n.trim_matches('/').to_string())
            .filter(|n| !n.is_empty())
            .collect();

        let mut custom = self.custom.write().unwrap_or_else(PoisonError::into_inner);
        *custom = names;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(count = custom.len(), generation, "custom exclude dirs replaced");
    }

    pub fn all(&self) -> BTreeSet<String> {
        let mut all = self.defaults.clone();
        all.extend(self.custom());
        all
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defaults.contains(name)
            || self
                .custom
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(name)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// True when any component of `path` below `root` is an excluded name.
    /// Paths outside `root` are checked component by component as given.
    pub fn is_excluded_path(&self, path: &Path, root: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        relative.components().any(|component| match component {
            Component::Normal(name) => self.contains(&name.to_string_lossy()),
            _ => false,
        })
    }
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_present() {
        let set = ExclusionSet::new();
        assert!(set.contains("node_modules"));
        assert!(set.contains(".git"));
        assert!(set.contains("vendor"));
        assert!(!set.contains("src"));
    }

    #[test]
    fn test_set_custom_replaces_and_bumps_generation() {
        let set = ExclusionSet::new();
        assert_eq!(set.generation(), 0);

        set.set_custom(["generated", "third_party/"]);
        assert_eq!(set.generation(), 1);
        assert!(set.contains("generated"));
        assert!(set.contains("third_party"));

        set.set_custom(["fixtures"]);
        assert_eq!(set.generation(), 2);
        assert!(!set.contains("generated"));
        assert!(set.contains("fixtures"));
    }

    #[test]
    fn test_all_is_union() {
        let set = ExclusionSet::new();
        set.set_custom(["generated"]);
        let all = set.all();
        assert!(all.contains("generated"));
        assert!(all.contains("node_modules"));
        assert_eq!(all.len(), set.defaults().len() + 1);
    }

    #[test]
    fn test_is_excluded_path() {
        let set = ExclusionSet::new();
        let root = Path::new("/repo");

        assert!(set.is_excluded_path(Path::new("/repo/node_modules/x/index.js"), root));
        assert!(set.is_excluded_path(Path::new("/repo/a/vendor/dep.go"), root));
        assert!(!set.is_excluded_path(Path::new("/repo/src/main.go"), root));
    }

    #[test]
    fn test_root_components_are_ignored() {
        let set = ExclusionSet::new();
        let root = Path::new("/home/build/repo");

        assert!(!set.is_excluded_path(Path::new("/home/build/repo/src/lib.rs"), root));
    }
}
