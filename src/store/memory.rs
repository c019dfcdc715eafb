// src/store/memory.rs
//
// In-process store with an inverted hash index and optional JSON snapshots.

use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{HashHit, HashStore, Song, SongId, SongStore};
use crate::core::hashing::{Fingerprint, FingerprintHash};
use crate::error::{Error, Result};

/// Default number of hashes accepted per `query_many` call
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Tables {
    songs: BTreeMap<SongId, Song>,
    /// hash -> (song, offset) postings; the set enforces triple uniqueness
    fingerprints: HashMap<FingerprintHash, BTreeSet<(SongId, u32)>>,
}

/// In-memory [`HashStore`] + [`SongStore`].
///
/// Safe for concurrent use. Locks are taken only for the duration of a
/// single call.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    max_batch_size: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Set the largest batch `query_many` accepts (at least 1)
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size.max(1);
        self
    }

    /// Load a snapshot written by [`save`](Self::save), or start empty if
    /// the file does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No snapshot at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let text = fs::read_to_string(path)?;
        let tables: Tables = serde_json::from_str(&text)?;
        info!(
            "Loaded {} songs and {} distinct hashes from {}",
            tables.songs.len(),
            tables.fingerprints.len(),
            path.display()
        );
        Ok(Self {
            tables: RwLock::new(tables),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        })
    }

    /// Write a JSON snapshot, replacing `path` atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = {
            let tables = self.read()?;
            serde_json::to_string(&*tables)?
        };
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        debug!("Saved snapshot to {}", path.display());
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| Error::StoreUnavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| Error::StoreUnavailable("store lock poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HashStore for MemoryStore {
    fn insert(&self, song_id: SongId, fingerprints: &[Fingerprint]) -> Result<usize> {
        let mut tables = self.write()?;
        let mut inserted = 0;
        for fp in fingerprints {
            if tables
                .fingerprints
                .entry(fp.hash)
                .or_default()
                .insert((song_id, fp.offset))
            {
                inserted += 1;
            }
        }
        debug!(
            "Inserted {} of {} fingerprints for song {}",
            inserted,
            fingerprints.len(),
            song_id
        );
        Ok(inserted)
    }

    fn query_many(&self, hashes: &[FingerprintHash]) -> Result<Vec<HashHit>> {
        if hashes.len() > self.max_batch_size {
            return Err(Error::StoreUnavailable(format!(
                "batch of {} hashes exceeds limit of {}",
                hashes.len(),
                self.max_batch_size
            )));
        }

        let tables = self.read()?;
        let mut hits = Vec::new();
        for hash in hashes {
            if let Some(postings) = tables.fingerprints.get(hash) {
                hits.extend(postings.iter().map(|&(song_id, offset)| HashHit {
                    hash: *hash,
                    song_id,
                    offset,
                }));
            }
        }
        Ok(hits)
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn fingerprint_count(&self) -> Result<usize> {
        Ok(self.read()?.fingerprints.values().map(BTreeSet::len).sum())
    }
}

impl SongStore for MemoryStore {
    fn insert_song(&self, name: &str, content_hash: &str, total_hashes: usize) -> Result<SongId> {
        let mut tables = self.write()?;
        let mut id = SongId::new();
        while tables.songs.contains_key(&id) {
            id = SongId::new();
        }
        let now = Utc::now();
        tables.songs.insert(
            id,
            Song {
                id,
                name: name.to_string(),
                content_hash: content_hash.to_uppercase(),
                total_hashes,
                fingerprinted: false,
                created_at: now,
                modified_at: now,
            },
        );
        Ok(id)
    }

    fn set_song_fingerprinted(&self, id: SongId) -> Result<()> {
        let mut tables = self.write()?;
        match tables.songs.get_mut(&id) {
            Some(song) => {
                song.fingerprinted = true;
                song.modified_at = Utc::now();
                Ok(())
            }
            None => Err(Error::StoreUnavailable(format!("no song with id {}", id))),
        }
    }

    fn song(&self, id: SongId) -> Result<Option<Song>> {
        Ok(self.read()?.songs.get(&id).cloned())
    }

    fn song_by_content_hash(&self, content_hash: &str) -> Result<Option<Song>> {
        let wanted = content_hash.to_uppercase();
        Ok(self
            .read()?
            .songs
            .values()
            .find(|s| s.fingerprinted && s.content_hash == wanted)
            .cloned())
    }

    fn songs(&self) -> Result<Vec<Song>> {
        Ok(self
            .read()?
            .songs
            .values()
            .filter(|s| s.fingerprinted)
            .cloned()
            .collect())
    }

    fn delete_songs(&self, ids: &[SongId]) -> Result<usize> {
        let mut tables = self.write()?;
        let doomed: BTreeSet<SongId> = ids
            .iter()
            .copied()
            .filter(|id| tables.songs.contains_key(id))
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        for id in &doomed {
            tables.songs.remove(id);
        }
        tables.fingerprints.retain(|_, postings| {
            postings.retain(|(song_id, _)| !doomed.contains(song_id));
            !postings.is_empty()
        });
        Ok(doomed.len())
    }

    fn delete_unfingerprinted_songs(&self) -> Result<usize> {
        let stale: Vec<SongId> = self
            .read()?
            .songs
            .values()
            .filter(|s| !s.fingerprinted)
            .map(|s| s.id)
            .collect();
        self.delete_songs(&stale)
    }

    fn fingerprinted_song_count(&self) -> Result<usize> {
        Ok(self.read()?.songs.values().filter(|s| s.fingerprinted).count())
    }
}
