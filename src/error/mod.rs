mod cache;
mod config;
mod detector;
mod io;
mod plugin;

pub use cache::CacheError;
pub use config::ConfigError;
pub use detector::DetectorError;
pub use io::IoError;
pub use plugin::PluginError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Detector(#[from] DetectorError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
