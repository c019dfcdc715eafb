//! Fingerprinting and matching pipeline

pub mod catalog;
pub mod decoder;
pub mod dsp;
pub mod hashing;
pub mod matcher;
pub mod peaks;
pub mod recognizer;
pub mod spectrogram;

pub use catalog::{Catalog, CatalogStats, DirectorySummary, Registration};
pub use decoder::{AudioSource, DecodedAudio, RawPcmFormat, AUDIO_EXTENSIONS};
pub use hashing::{generate_fingerprints, Fingerprint, FingerprintHash};
pub use matcher::{AlignedMatch, MatchCandidate};
pub use peaks::{extract_peaks, Peak};
pub use recognizer::{fingerprint_channel, fingerprint_channels, Recognizer};
pub use spectrogram::{build_spectrogram, SpectrogramGrid};
