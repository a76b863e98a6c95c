use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    /// The emulator process went away or its memory can no longer be accessed.
    #[error("Lost attachment to the emulator process")]
    AttachLost,

    #[error("Address {address:#010x} (+{length} bytes) is outside emulated MEM1")]
    InvalidAddress { address: u32, length: usize },

    #[error("Wrong game image: expected {expected}, found {found:?}")]
    WrongImage { expected: String, found: String },

    #[error("Item delta out of order: expected index {expected}, got {actual}")]
    OutOfOrder { expected: u64, actual: u64 },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Not connected to the server")]
    NotConnected,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
