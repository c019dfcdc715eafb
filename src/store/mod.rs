//! Storage contracts used by the matcher and the catalog.
//!
//! The matching core only ever talks to [`HashStore`]. [`SongStore`] holds
//! the song rows that registration and result enrichment need. Both are
//! synchronous and must be safe for concurrent use; pooling, retries and
//! liveness checks belong to the implementation.

mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::core::hashing::{Fingerprint, FingerprintHash};
use crate::error::Result;

/// Opaque, totally ordered song identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(Uuid);

impl SongId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for SongId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub name: String,
    /// Upper-case hex digest of the source bytes
    pub content_hash: String,
    /// Number of fingerprints produced at registration
    pub total_hashes: usize,
    /// Set once every fingerprint has been stored
    pub fingerprinted: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// One row returned by [`HashStore::query_many`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashHit {
    pub hash: FingerprintHash,
    pub song_id: SongId,
    /// Anchor frame stored for the song
    pub offset: u32,
}

/// Fingerprint persistence contract.
pub trait HashStore: Send + Sync {
    /// Store fingerprints for a song.
    ///
    /// Duplicate (song, hash, offset) triples are ignored, never rejected.
    /// Returns how many triples were newly stored.
    fn insert(&self, song_id: SongId, fingerprints: &[Fingerprint]) -> Result<usize>;

    /// Every stored (hash, song, offset) row whose hash is in `hashes`.
    ///
    /// Callers must not pass more than [`max_batch_size`](Self::max_batch_size) hashes.
    fn query_many(&self, hashes: &[FingerprintHash]) -> Result<Vec<HashHit>>;

    /// Largest hash batch accepted by one `query_many` call
    fn max_batch_size(&self) -> usize;

    /// Total stored (song, hash, offset) triples
    fn fingerprint_count(&self) -> Result<usize>;
}

/// Song row persistence contract.
pub trait SongStore: Send + Sync {
    /// Create an unfingerprinted song row
    fn insert_song(&self, name: &str, content_hash: &str, total_hashes: usize) -> Result<SongId>;

    /// Mark a song as completely fingerprinted
    fn set_song_fingerprinted(&self, id: SongId) -> Result<()>;

    fn song(&self, id: SongId) -> Result<Option<Song>>;

    /// Fingerprinted song with the given content hash, if any
    fn song_by_content_hash(&self, content_hash: &str) -> Result<Option<Song>>;

    /// All fingerprinted songs
    fn songs(&self) -> Result<Vec<Song>>;

    /// Remove songs and their fingerprints. Returns the number of songs removed.
    fn delete_songs(&self, ids: &[SongId]) -> Result<usize>;

    /// Remove songs whose registration never completed
    fn delete_unfingerprinted_songs(&self) -> Result<usize>;

    fn fingerprinted_song_count(&self) -> Result<usize>;
}
