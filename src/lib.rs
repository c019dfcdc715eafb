//! audiomatch - Identify recordings from short audio clips
//!
//! Landmark-based audio fingerprinting: each channel is turned into a
//! spectrogram, local maxima are picked as landmarks, nearby landmark pairs
//! are hashed, and a query is matched by voting on the time offset between
//! its hashes and the stored ones.
//!
//! ## Module Structure
//!
//! - `core` - Spectrogram, peak, hashing and alignment pipeline, plus input decoding
//! - `store` - Hash and song storage contracts and an in-memory implementation
//! - `config` - Fingerprinting presets and configuration
//! - `recognition` - Recognition result types
//! - `cli` - Command-line interface
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use audiomatch::{AudioSource, Catalog, FingerprintConfig, MemoryStore};
//!
//! let catalog = Catalog::new(MemoryStore::new(), FingerprintConfig::default())?;
//! catalog.register(&AudioSource::file("song.flac"), None)?;
//!
//! let result = catalog.recognize(&AudioSource::file("clip.wav").with_limit(Some(10.0)))?;
//! if let Some(best) = result.best() {
//!     println!("{} ({:.0}%)", best.label(), best.confidence * 100.0);
//! }
//! ```
//!
//! ## Presets
//!
//! | Preset     | Overlap | Neighborhood | Fan-out | Hash bits |
//! |------------|---------|--------------|---------|-----------|
//! | Standard   | 0.5     | 10 x 10      | 15      | 80        |
//! | HighRecall | 0.75    | 6 x 6        | 20      | 96        |
//! | Compact    | 0.5     | 20 x 20      | 5       | 64        |

// Fingerprinting pipeline
pub mod core;

// Command-line interface
pub mod cli;

// Presets and configuration
pub mod config;

pub mod error;

// Recognition result types
pub mod recognition;

// Storage contracts
pub mod store;

pub use config::{ConfigBuilder, ConfigPreset, FingerprintConfig};
pub use self::core::{
    AudioSource, Catalog, CatalogStats, DecodedAudio, DirectorySummary, Fingerprint,
    FingerprintHash, Peak, RawPcmFormat, Recognizer, Registration,
};
pub use error::{Error, Result};
pub use recognition::{MatchStrength, RecognitionResult, SongMatch};
pub use store::{HashHit, HashStore, MemoryStore, Song, SongId, SongStore};
