use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("detector for {language} panicked: {message}")]
    Panicked { language: String, message: String },

    #[error("detector for {language} did not finish within {timeout_ms} ms")]
    TimedOut { language: String, timeout_ms: u64 },

    #[error("failed to run detection command for {language}: {message}")]
    CommandFailed { language: String, message: String },

    #[error("detector for {language} failed: {message}")]
    Failed { language: String, message: String },
}

impl DetectorError {
    pub fn panicked(language: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Panicked {
            language: language.into(),
            message: message.into(),
        }
    }

    pub fn timed_out(language: impl Into<String>, timeout_ms: u64) -> Self {
        Self::TimedOut {
            language: language.into(),
            timeout_ms,
        }
    }

    pub fn command_failed(language: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            language: language.into(),
            message: message.into(),
        }
    }

    pub fn failed(language: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            language: language.into(),
            message: message.into(),
        }
    }
}
