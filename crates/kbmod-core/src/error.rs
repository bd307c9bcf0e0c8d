use thiserror::Error;

#[derive(Error, Debug)]
pub enum KbmodError {
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    #[error("image stack is empty")]
    EmptyStack,

    #[error("invalid search specification: {0}")]
    BadSearchSpec(String),

    #[error("compute device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("allocation failed: {0}")]
    AllocationFailure(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid raw plane file: {0}")]
    InvalidRaw(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, KbmodError>;
