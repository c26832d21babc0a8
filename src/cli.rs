use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "langprobe")]
#[command(about = "Detect the languages and package managers used in a project", long_about = None)]
pub struct Args {
    /// Project root to inspect
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Config file (defaults to .langprobe.{yaml,yml,json,toml} in the project root)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run detectors one after another for a deterministic result order
    #[arg(long)]
    pub sequential: bool,

    /// Language to drop from the result. Can be specified multiple times.
    #[arg(long, value_name = "LANG")]
    pub ignore: Vec<String>,

    /// Extra directory name to skip while scanning. Can be specified multiple times.
    #[arg(long, value_name = "DIR")]
    pub exclude: Vec<String>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        validate_path(&self.path)?;
        if !self.path.is_dir() {
            anyhow::bail!("Project root is not a directory: {}", self.path.display());
        }
        if let Some(ref config_path) = self.config {
            if !config_path.is_file() {
                anyhow::bail!("Config file does not exist: {}", config_path.display());
            }
        }
        Ok(())
    }

    /// Loads the config named on the command line, or the one found at the
    /// project root, then layers the flags on top.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match self.config {
            Some(ref path) => Config::load(path)
                .with_context(|| format!("Cannot load config: {}", path.display()))?,
            None => Config::discover(&self.path).context("Cannot load project config")?,
        };
        self.apply_to(&mut config);
        Ok(config)
    }

    pub fn apply_to(&self, config: &mut Config) {
        if self.sequential {
            config.parallel = false;
        }
        for dir in &self.exclude {
            if !config.exclude_dirs.contains(dir) {
                config.exclude_dirs.push(dir.clone());
            }
        }
        for language in &self.ignore {
            let language = language.to_lowercase();
            if !config.ignored_languages.contains(&language) {
                config.ignored_languages.push(language);
            }
        }
    }
}

pub fn validate_path(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", path.display());
    }

    if path.is_file() {
        std::fs::metadata(path).with_context(|| format!("Cannot read file: {}", path.display()))?;
    } else if path.is_dir() {
        std::fs::metadata(path)
            .with_context(|| format!("Cannot read directory: {}", path.display()))?;
    } else {
        anyhow::bail!("Path is neither a file nor a directory: {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn args_for(path: &Path) -> Args {
        Args {
            path: path.to_path_buf(),
            config: None,
            sequential: false,
            ignore: vec![],
            exclude: vec![],
            verbose: 0,
            quiet: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "langprobe",
            "--path",
            "/tmp/project",
            "--sequential",
            "--ignore",
            "go",
            "--ignore",
            "shell",
            "--exclude",
            "generated",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.path, PathBuf::from("/tmp/project"));
        assert!(args.sequential);
        assert_eq!(args.ignore, vec!["go", "shell"]);
        assert_eq!(args.exclude, vec!["generated"]);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_path_defaults_to_current_dir() {
        let args = Args::try_parse_from(["langprobe"]).unwrap();
        assert_eq!(args.path, PathBuf::from("."));
        assert!(!args.sequential);
    }

    #[test]
    fn test_validate_path_directory_exists() {
        let temp_dir = TempDir::new().unwrap();
        assert!(validate_path(temp_dir.path()).is_ok());
    }

    #[test]
    fn test_validate_path_not_exists() {
        let path = Path::new("/nonexistent/path/that/does/not/exist");
        assert!(validate_path(path).is_err());
    }

    #[test]
    fn test_args_validate_rejects_file_root() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("main.go");
        fs::write(&file_path, "package main").unwrap();

        assert!(args_for(&file_path).validate().is_err());
    }

    #[test]
    fn test_args_validate_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut args = args_for(temp_dir.path());
        args.config = Some(temp_dir.path().join("missing.yaml"));

        assert!(args.validate().is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(".langprobe.yaml"),
            "exclude_dirs: [generated]\nignored_languages: [shell]\n",
        )
        .unwrap();

        let mut args = args_for(temp_dir.path());
        args.sequential = true;
        args.ignore = vec!["Go".to_string(), "shell".to_string()];
        args.exclude = vec!["generated".to_string(), "fixtures".to_string()];

        let config = args.resolve_config().unwrap();
        assert!(!config.parallel);
        assert_eq!(config.exclude_dirs, vec!["generated", "fixtures"]);
        assert_eq!(config.ignored_languages, vec!["shell", "go"]);
    }
}
