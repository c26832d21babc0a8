//! Static language tables and the exclusion rules shared by every walk.

pub mod exclusion;
pub mod languages;
pub mod package_manager;
mod root_files;

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

pub use exclusion::ExclusionSet;
pub use package_manager::{PackageManagerRule, RuleFiles};
pub use root_files::RootFiles;

use languages::{LANGUAGES, PRIORITY_LANGUAGES};

/// Lookup tables for every built-in language plus the exclusion set.
///
/// The tables are fixed at construction; only the custom exclusions change
/// afterwards.
#[derive(Debug)]
pub struct PatternRegistry {
    order: Vec<String>,
    extensions: HashMap<String, Vec<String>>,
    package_files: HashMap<String, Vec<String>>,
    extension_index: HashMap<String, Vec<String>>,
    exclusions: ExclusionSet,
}

impl PatternRegistry {
    pub fn new() -> Self {
        let mut extensions = HashMap::new();
        let mut package_files = HashMap::new();
        let mut extension_index: HashMap<String, Vec<String>> = HashMap::new();

        for spec in LANGUAGES {
            let exts: Vec<String> = spec.extensions.iter().map(|e| e.to_string()).collect();
            for ext in &exts {
                extension_index
                    .entry(ext.clone())
                    .or_default()
                    .push(spec.name.to_string());
            }
            extensions.insert(spec.name.to_string(), exts);
            package_files.insert(
                spec.name.to_string(),
                spec.package_files.iter().map(|f| f.to_string()).collect(),
            );
        }

        let mut order: Vec<String> = PRIORITY_LANGUAGES.iter().map(|l| l.to_string()).collect();
        let mut rest: Vec<String> = LANGUAGES
            .iter()
            .map(|spec| spec.name)
            .filter(|name| !PRIORITY_LANGUAGES.contains(name))
            .map(String::from)
            .collect();
        rest.sort();
        order.extend(rest);

        Self {
            order,
            extensions,
            package_files,
            extension_index,
            exclusions: ExclusionSet::new(),
        }
    }

    pub fn with_custom_exclude_dirs<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions.set_custom(names);
        self
    }

    /// Known languages, common ones first and the rest alphabetically.
    pub fn languages(&self) -> &[String] {
        &self.order
    }

    pub fn is_known(&self, language: &str) -> bool {
        self.extensions.contains_key(language)
    }

    pub fn source_extensions(&self, language: &str) -> &[String] {
        self.extensions
            .get(language)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn package_files(&self, language: &str) -> &[String] {
        self.package_files
            .get(language)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Languages claiming `extension` (with leading dot, lowercase).
    pub fn languages_for_extension(&self, extension: &str) -> &[String] {
        self.extension_index
            .get(extension)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Resolves the package manager with caller-supplied probes.
    pub fn detect_package_manager_with<E, S>(
        &self,
        language: &str,
        file_exists: E,
        section_declared: S,
    ) -> Option<String>
    where
        E: FnMut(&str) -> bool,
        S: FnMut(&str, &str) -> bool,
    {
        package_manager::resolve(
            package_manager::rules_for(language),
            file_exists,
            section_declared,
        )
        .map(String::from)
    }

    /// Resolves the package manager from the files at the top of `root`.
    pub fn detect_package_manager(&self, language: &str, root: &Path) -> Option<String> {
        let files = RootFiles::new(root);
        self.detect_package_manager_in(language, &files)
    }

    pub fn detect_package_manager_in(&self, language: &str, files: &RootFiles) -> Option<String> {
        self.detect_package_manager_with(
            language,
            |f| files.exists(f),
            |f, section| files.declares_section(f, section),
        )
    }

    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    pub fn set_custom_exclude_dirs<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions.set_custom(names);
    }

    pub fn all_exclude_dirs(&self) -> BTreeSet<String> {
        self.exclusions.all()
    }

    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclusions.contains(name)
    }

    pub fn is_excluded_path(&self, path: &Path, root: &Path) -> bool {
        self.exclusions.is_excluded_path(path, root)
    }
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_python_extensions() {
        let registry = PatternRegistry::new();
        assert_eq!(
            registry.source_extensions("python"),
            &[".py".to_string(), ".pyx".to_string(), ".pyw".to_string()]
        );
    }

    #[test]
    fn test_unknown_language_is_empty() {
        let registry = PatternRegistry::new();
        assert!(registry.source_extensions("cobol").is_empty());
        assert!(registry.package_files("cobol").is_empty());
        assert!(!registry.is_known("cobol"));
    }

    #[test]
    fn test_priority_order_then_alphabetical() {
        let registry = PatternRegistry::new();
        let languages = registry.languages();

        assert_eq!(
            &languages[..PRIORITY_LANGUAGES.len()],
            PRIORITY_LANGUAGES
                .iter()
                .map(|l| l.to_string())
                .collect::<Vec<_>>()
                .as_slice()
        );

        let rest = &languages[PRIORITY_LANGUAGES.len()..];
        let mut sorted = rest.to_vec();
        sorted.sort();
        assert_eq!(rest, sorted.as_slice());
        assert_eq!(languages.len(), LANGUAGES.len());
    }

    #[test]
    fn test_header_extension_is_shared() {
        let registry = PatternRegistry::new();
        let claimants = registry.languages_for_extension(".h");
        assert!(claimants.contains(&"c".to_string()));
        assert!(claimants.contains(&"cpp".to_string()));
    }

    #[test]
    fn test_detect_package_manager_prefers_uv() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("uv.lock"), "version = 1\n").unwrap();
        fs::write(root.join("poetry.lock"), "").unwrap();

        let registry = PatternRegistry::new();
        assert_eq!(
            registry.detect_package_manager("python", root),
            Some("uv".to_string())
        );
    }

    #[test]
    fn test_detect_package_manager_poetry_section() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(
            root.join("pyproject.toml"),
            "[tool.poetry]\nname = \"demo\"\n",
        )
        .unwrap();
        fs::write(root.join("requirements.txt"), "requests\n").unwrap();

        let registry = PatternRegistry::new();
        assert_eq!(
            registry.detect_package_manager("python", root),
            Some("poetry".to_string())
        );
    }

    #[test]
    fn test_detect_package_manager_plain_pyproject_is_pip() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("pyproject.toml"), "[project]\nname = \"demo\"\n").unwrap();

        let registry = PatternRegistry::new();
        assert_eq!(
            registry.detect_package_manager("python", root),
            Some("pip".to_string())
        );
    }

    #[test]
    fn test_detect_package_manager_glob_rule() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("App.csproj"), "<Project />").unwrap();

        let registry = PatternRegistry::new();
        assert_eq!(
            registry.detect_package_manager("csharp", root),
            Some("nuget".to_string())
        );
    }

    #[test]
    fn test_detect_package_manager_with_probe() {
        let registry = PatternRegistry::new();
        let manager =
            registry.detect_package_manager_with("go", |f| f == "go.mod", |_, _| false);
        assert_eq!(manager, Some("go".to_string()));

        let none = registry.detect_package_manager_with("go", |_| false, |_, _| false);
        assert_eq!(none, None);
    }

    #[test]
    fn test_custom_excludes_visible_through_registry() {
        let registry = PatternRegistry::new().with_custom_exclude_dirs(["generated"]);
        assert!(registry.is_excluded_dir("generated"));
        assert!(registry.all_exclude_dirs().contains("node_modules"));
        assert!(registry.is_excluded_path(
            Path::new("/repo/generated/api.py"),
            Path::new("/repo")
        ));
    }
}
