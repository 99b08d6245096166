use thiserror::Error;

use crate::signal::SampleWidth;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer size {len} is not a multiple of element size {} ({width})", .width.bytes())]
    Misaligned { len: usize, width: SampleWidth },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
