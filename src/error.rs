use thiserror::Error;

pub type Result<T> = std::result::Result<T, SerenataError>;

#[derive(Error, Debug)]
pub enum SerenataError {
    #[error("{0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid caption at index {index}: {reason}")]
    InvalidCaption { index: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}
