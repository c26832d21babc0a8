use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("failed to read plugin file '{path}': {message}")]
    ReadError { path: PathBuf, message: String },

    #[error("failed to parse plugin file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("unsupported plugin format: {format} (expected toml, json or yaml)")]
    UnsupportedFormat { format: String },

    #[error("invalid detector in '{path}': {message}")]
    InvalidDetector { path: PathBuf, message: String },
}

impl PluginError {
    pub fn read_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ReadError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn invalid_detector(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidDetector {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = PluginError::parse_error("/repo/.langprobe/plugins/zig.toml", "expected `=`");
        assert_eq!(
            err.to_string(),
            "failed to parse plugin file '/repo/.langprobe/plugins/zig.toml': expected `=`"
        );
    }

    #[test]
    fn test_unsupported_format_display() {
        let err = PluginError::unsupported_format("py");
        assert_eq!(
            err.to_string(),
            "unsupported plugin format: py (expected toml, json or yaml)"
        );
    }
}
