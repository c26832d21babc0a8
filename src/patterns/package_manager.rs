//! Ordered package-manager rules. The first satisfied rule wins, so lockfiles
//! are listed ahead of manifests shared by several tools.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, trace};

/// Bytes inspected before falling back to a full TOML parse.
pub const MARKER_SCAN_LIMIT: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFiles {
    /// A single file (or glob pattern) must exist.
    Single(&'static str),
    /// Every file in the tuple must exist.
    All(&'static [&'static str]),
    /// The file must exist and declare the given TOML section.
    Section {
        file: &'static str,
        section: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageManagerRule {
    pub files: RuleFiles,
    pub manager: &'static str,
}

const fn single(file: &'static str, manager: &'static str) -> PackageManagerRule {
    PackageManagerRule {
        files: RuleFiles::Single(file),
        manager,
    }
}

const fn all(files: &'static [&'static str], manager: &'static str) -> PackageManagerRule {
    PackageManagerRule {
        files: RuleFiles::All(files),
        manager,
    }
}

const fn section(
    file: &'static str,
    section: &'static str,
    manager: &'static str,
) -> PackageManagerRule {
    PackageManagerRule {
        files: RuleFiles::Section { file, section },
        manager,
    }
}

const PYTHON_RULES: &[PackageManagerRule] = &[
    single("uv.lock", "uv"),
    single("poetry.lock", "poetry"),
    section("pyproject.toml", "tool.poetry", "poetry"),
    single("Pipfile.lock", "pipenv"),
    single("Pipfile", "pipenv"),
    single("requirements.txt", "pip"),
    single("setup.py", "pip"),
    single("pyproject.toml", "pip"),
];

const NODE_RULES: &[PackageManagerRule] = &[
    single("bun.lockb", "bun"),
    single("pnpm-lock.yaml", "pnpm"),
    single("yarn.lock", "yarn"),
    single("package-lock.json", "npm"),
    single("package.json", "npm"),
];

const GO_RULES: &[PackageManagerRule] = &[single("go.mod", "go")];

const RUST_RULES: &[PackageManagerRule] = &[single("Cargo.toml", "cargo")];

const JVM_RULES: &[PackageManagerRule] = &[
    single("pom.xml", "maven"),
    single("build.gradle.kts", "gradle"),
    single("build.gradle", "gradle"),
];

const CPP_RULES: &[PackageManagerRule] = &[
    single("conanfile.txt", "conan"),
    single("conanfile.py", "conan"),
    single("vcpkg.json", "vcpkg"),
    all(&["CMakeLists.txt", "CPM.cmake"], "cpm"),
];

const CSHARP_RULES: &[PackageManagerRule] = &[
    single("paket.dependencies", "paket"),
    single("*.csproj", "nuget"),
    single("packages.config", "nuget"),
];

const DART_RULES: &[PackageManagerRule] = &[
    all(&["pubspec.yaml", ".metadata"], "flutter"),
    single("pubspec.yaml", "pub"),
];

const ELIXIR_RULES: &[PackageManagerRule] = &[single("mix.exs", "mix")];

const HASKELL_RULES: &[PackageManagerRule] = &[
    single("stack.yaml", "stack"),
    single("cabal.project", "cabal"),
    single("*.cabal", "cabal"),
];

const LUA_RULES: &[PackageManagerRule] = &[single("*.rockspec", "luarocks")];

const PHP_RULES: &[PackageManagerRule] = &[single("composer.json", "composer")];

const R_RULES: &[PackageManagerRule] = &[single("renv.lock", "renv"), single("DESCRIPTION", "cran")];

const RUBY_RULES: &[PackageManagerRule] = &[
    single("Gemfile.lock", "bundler"),
    single("Gemfile", "bundler"),
    single("*.gemspec", "rubygems"),
];

const SCALA_RULES: &[PackageManagerRule] = &[
    single("build.sbt", "sbt"),
    single("build.sc", "mill"),
];

const SWIFT_RULES: &[PackageManagerRule] = &[
    single("Package.swift", "swiftpm"),
    single("Podfile", "cocoapods"),
    single("Cartfile", "carthage"),
];

/// Ordered rules for a language; unknown languages have none.
pub fn rules_for(language: &str) -> &'static [PackageManagerRule] {
    match language {
        "python" => PYTHON_RULES,
        "javascript" | "typescript" => NODE_RULES,
        "go" => GO_RULES,
        "rust" => RUST_RULES,
        "java" | "kotlin" => JVM_RULES,
        "cpp" => CPP_RULES,
        "csharp" => CSHARP_RULES,
        "dart" => DART_RULES,
        "elixir" => ELIXIR_RULES,
        "haskell" => HASKELL_RULES,
        "lua" => LUA_RULES,
        "php" => PHP_RULES,
        "r" => R_RULES,
        "ruby" => RUBY_RULES,
        "scala" => SCALA_RULES,
        "swift" => SWIFT_RULES,
        _ => &[],
    }
}

/// Walks `rules` in order and returns the manager of the first satisfied one.
///
/// `file_exists` answers whether a root-relative file name or pattern exists;
/// `section_declared` answers whether a file declares a TOML section.
pub fn resolve<E, S>(
    rules: &[PackageManagerRule],
    mut file_exists: E,
    mut section_declared: S,
) -> Option<&'static str>
where
    E: FnMut(&str) -> bool,
    S: FnMut(&str, &str) -> bool,
{
    for rule in rules {
        let satisfied = match rule.files {
            RuleFiles::Single(file) => file_exists(file),
            RuleFiles::All(files) => files.iter().all(|f| file_exists(f)),
            RuleFiles::Section { file, section } => {
                file_exists(file) && section_declared(file, section)
            }
        };
        if satisfied {
            trace!(manager = rule.manager, "package manager rule matched");
            return Some(rule.manager);
        }
    }
    None
}

/// Checks whether a TOML file declares `section` (dotted, e.g. `tool.poetry`).
///
/// Only the first [`MARKER_SCAN_LIMIT`] bytes are searched for the `[section]`
/// header. The whole file is parsed only when the header was not found in that
/// prefix and the file is longer than it.
pub fn toml_declares_section(path: &Path, section: &str) -> bool {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "cannot open manifest");
            return false;
        }
    };

    let mut prefix = Vec::with_capacity(MARKER_SCAN_LIMIT);
    if let Err(e) = (&mut file)
        .take(MARKER_SCAN_LIMIT as u64)
        .read_to_end(&mut prefix)
    {
        debug!(path = %path.display(), error = %e, "cannot read manifest");
        return false;
    }

    let header = format!("[{section}");
    if contains_section_header(&String::from_utf8_lossy(&prefix), &header) {
        return true;
    }
    if prefix.len() < MARKER_SCAN_LIMIT {
        return false;
    }

    trace!(path = %path.display(), section, "marker not in prefix, parsing whole file");
    let mut rest = Vec::new();
    if let Err(e) = file.read_to_end(&mut rest) {
        debug!(path = %path.display(), error = %e, "cannot read manifest");
        return false;
    }
    prefix.extend_from_slice(&rest);

    let content = String::from_utf8_lossy(&prefix);
    match content.parse::<toml::Table>() {
        Ok(table) => table_has_path(&table, section),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "manifest is not valid TOML");
            false
        }
    }
}

fn contains_section_header(text: &str, header: &str) -> bool {
    text.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with(header)
            && matches!(line[header.len()..].chars().next(), Some(']') | Some('.'))
    })
}

fn table_has_path(table: &toml::Table, dotted: &str) -> bool {
    let mut current = table;
    for key in dotted.split('.') {
        match current.get(key).and_then(|v| v.as_table()) {
            Some(next) => current = next,
            None => return false,
        }
    }
    true
}
