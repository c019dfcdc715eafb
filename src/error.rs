//! Error types for audiomatch.

use thiserror::Error;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by fingerprinting, matching and the bundled collaborators.
#[derive(Error, Debug)]
pub enum Error {
    /// Channel is shorter than one analysis window.
    ///
    /// Recoverable: the recognizer treats the channel as yielding no fingerprints.
    #[error("insufficient samples: got {samples}, need at least {window}")]
    InsufficientSamples { samples: usize, window: usize },

    /// A hash store call could not complete.
    #[error("hash store unavailable: {0}")]
    StoreUnavailable(String),

    /// Channel data handed over by the decoder is structurally invalid.
    #[error("malformed decoder output: {0}")]
    DecodeUpstream(String),

    /// Container/codec failure while decoding a file.
    #[error("decode error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("fft error: {0}")]
    Fft(#[from] realfft::FftError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Store snapshot or config file could not be (de)serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration value out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether recognition may continue past this error for the affected channel.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::InsufficientSamples { .. })
    }
}
