use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("failed to write cache file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize cache: {0}")]
    Serialize(String),

    #[error("failed to deserialize cached result for '{key}': {message}")]
    Deserialize { key: String, message: String },
}

impl CacheError {
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub fn deserialize(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Deserialize {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_display() {
        let err = CacheError::deserialize("python:src/app.py", "invalid type");
        assert_eq!(
            err.to_string(),
            "failed to deserialize cached result for 'python:src/app.py': invalid type"
        );
    }
}
