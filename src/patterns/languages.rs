//! Built-in language tables: source extensions and package manifests.
//!
//! Manifest entries are either exact file names or simple glob patterns
//! (`*.csproj`) matched against the entries of the project root.

/// Languages checked first, in this order. Everything else follows alphabetically.
pub const PRIORITY_LANGUAGES: &[&str] = &["python", "javascript", "typescript", "go", "rust", "java"];

pub struct LanguageSpec {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    pub package_files: &'static [&'static str],
}

pub const LANGUAGES: &[LanguageSpec] = &[
    LanguageSpec {
        name: "python",
        extensions: &[".py", ".pyx", ".pyw"],
        package_files: &[
            "requirements.txt",
            "setup.py",
            "setup.cfg",
            "pyproject.toml",
            "Pipfile",
            "poetry.lock",
            "uv.lock",
        ],
    },
    LanguageSpec {
        name: "javascript",
        extensions: &[".js", ".jsx", ".mjs", ".cjs"],
        package_files: &["package.json"],
    },
    LanguageSpec {
        name: "typescript",
        extensions: &[".ts", ".tsx", ".mts", ".cts"],
        package_files: &["tsconfig.json"],
    },
    LanguageSpec {
        name: "go",
        extensions: &[".go"],
        package_files: &["go.mod"],
    },
    LanguageSpec {
        name: "rust",
        extensions: &[".rs"],
        package_files: &["Cargo.toml"],
    },
    LanguageSpec {
        name: "java",
        extensions: &[".java"],
        package_files: &["pom.xml", "build.gradle"],
    },
    LanguageSpec {
        name: "c",
        extensions: &[".c", ".h"],
        package_files: &[],
    },
    LanguageSpec {
        name: "cpp",
        extensions: &[".cpp", ".cc", ".cxx", ".hpp", ".hh", ".hxx", ".h"],
        package_files: &["conanfile.txt", "conanfile.py", "vcpkg.json"],
    },
    LanguageSpec {
        name: "csharp",
        extensions: &[".cs"],
        package_files: &["*.csproj", "*.sln"],
    },
    LanguageSpec {
        name: "dart",
        extensions: &[".dart"],
        package_files: &["pubspec.yaml"],
    },
    LanguageSpec {
        name: "elixir",
        extensions: &[".ex", ".exs"],
        package_files: &["mix.exs"],
    },
    LanguageSpec {
        name: "haskell",
        extensions: &[".hs", ".lhs"],
        package_files: &["stack.yaml", "cabal.project", "*.cabal"],
    },
    LanguageSpec {
        name: "kotlin",
        extensions: &[".kt", ".kts"],
        package_files: &["build.gradle.kts"],
    },
    LanguageSpec {
        name: "lua",
        extensions: &[".lua"],
        package_files: &["*.rockspec"],
    },
    LanguageSpec {
        name: "php",
        extensions: &[".php"],
        package_files: &["composer.json"],
    },
    LanguageSpec {
        name: "r",
        extensions: &[".r"],
        package_files: &["DESCRIPTION", "renv.lock"],
    },
    LanguageSpec {
        name: "ruby",
        extensions: &[".rb"],
        package_files: &["Gemfile", "*.gemspec"],
    },
    LanguageSpec {
        name: "scala",
        extensions: &[".scala", ".sc"],
        package_files: &["build.sbt"],
    },
    LanguageSpec {
        name: "shell",
        extensions: &[".sh", ".bash", ".zsh"],
        package_files: &[],
    },
    LanguageSpec {
        name: "swift",
        extensions: &[".swift"],
        package_files: &["Package.swift", "Podfile"],
    },
];

/// Directory names never descended into.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    ".venv",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".gradle",
    "__pycache__",
    "node_modules",
    "bower_components",
    "vendor",
    "venv",
    "env",
    "target",
    "build",
    "dist",
    "out",
    "coverage",
    "site-packages",
];
