// src/core/catalog.rs
//
// Song catalog: registration, listing, deletion and enriched recognition on
// top of a store that implements both the hash and song contracts.

use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::decoder::{find_audio_files, AudioSource};
use super::hashing::Fingerprint;
use super::recognizer::{fingerprint_channels, Recognizer};
use crate::config::FingerprintConfig;
use crate::error::Result;
use crate::recognition::RecognitionResult;
use crate::store::{HashStore, Song, SongId, SongStore};

/// Outcome of registering one recording
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    Registered {
        song_id: SongId,
        name: String,
        fingerprints: usize,
    },
    /// A fingerprinted song with identical content already exists
    AlreadyKnown(Song),
}

impl Registration {
    pub fn song_id(&self) -> SongId {
        match self {
            Registration::Registered { song_id, .. } => *song_id,
            Registration::AlreadyKnown(song) => song.id,
        }
    }
}

/// Tally of a directory registration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySummary {
    pub registered: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Catalog size
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub songs: usize,
    pub fingerprints: usize,
}

/// Fingerprints for one file, computed off the store
struct PreparedSong {
    name: String,
    content_hash: String,
    fingerprints: Vec<Fingerprint>,
}

pub struct Catalog<S: HashStore + SongStore> {
    store: S,
    config: FingerprintConfig,
}

impl<S: HashStore + SongStore> Catalog<S> {
    /// Wrap a store, dropping any song whose registration never finished
    pub fn new(store: S, config: FingerprintConfig) -> Result<Self> {
        let removed = store.delete_unfingerprinted_songs()?;
        if removed > 0 {
            warn!("Removed {} incompletely registered song(s)", removed);
        }
        Ok(Self { store, config })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &FingerprintConfig {
        &self.config
    }

    /// Decode, fingerprint and store one recording.
    ///
    /// `name` defaults to the file stem (or a buffer digest).
    pub fn register(&self, source: &AudioSource, name: Option<&str>) -> Result<Registration> {
        let audio = source.decode()?;
        if let Some(song) = self.store.song_by_content_hash(&audio.content_hash)? {
            debug!("{} already fingerprinted as {}", song.name, song.id);
            return Ok(Registration::AlreadyKnown(song));
        }

        let fingerprints = fingerprint_channels(&audio.channels, audio.sample_rate, &self.config)?;
        let prepared = PreparedSong {
            name: name.map(str::to_string).unwrap_or_else(|| source.default_name()),
            content_hash: audio.content_hash,
            fingerprints,
        };
        self.store_prepared(prepared)
    }

    fn store_prepared(&self, prepared: PreparedSong) -> Result<Registration> {
        let song_id = self.store.insert_song(
            &prepared.name,
            &prepared.content_hash,
            prepared.fingerprints.len(),
        )?;
        self.store.insert(song_id, &prepared.fingerprints)?;
        self.store.set_song_fingerprinted(song_id)?;
        info!(
            "Registered {} ({} fingerprints) as {}",
            prepared.name,
            prepared.fingerprints.len(),
            song_id
        );
        Ok(Registration::Registered {
            song_id,
            name: prepared.name,
            fingerprints: prepared.fingerprints.len(),
        })
    }

    /// Register every audio file under `dir`.
    ///
    /// Files are fingerprinted in parallel and stored one at a time. A file
    /// that fails to decode is counted and skipped.
    pub fn register_directory(&self, dir: &Path, extensions: &[&str]) -> Result<DirectorySummary> {
        let files = find_audio_files(dir, extensions);
        info!("Found {} audio file(s) under {}", files.len(), dir.display());

        let mut summary = DirectorySummary::default();
        let mut pending: Vec<PathBuf> = Vec::with_capacity(files.len());
        for path in files {
            let hash = match std::fs::read(&path) {
                Ok(bytes) => super::decoder::content_hash(&bytes),
                Err(e) => {
                    warn!("{}: {}", path.display(), e);
                    summary.failed += 1;
                    continue;
                }
            };
            if self.store.song_by_content_hash(&hash)?.is_some() {
                debug!("Skipping known file {}", path.display());
                summary.skipped += 1;
            } else {
                pending.push(path);
            }
        }

        let pb = ProgressBar::new(pending.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .progress_chars("#>-"),
        );

        let config = &self.config;
        let prepared: Vec<(PathBuf, Result<PreparedSong>)> = pending
            .into_par_iter()
            .progress_with(pb.clone())
            .map(|path| {
                let source = AudioSource::file(path.clone());
                let result = source.decode().and_then(|audio| {
                    let fingerprints =
                        fingerprint_channels(&audio.channels, audio.sample_rate, config)?;
                    Ok(PreparedSong {
                        name: source.default_name(),
                        content_hash: audio.content_hash,
                        fingerprints,
                    })
                });
                (path, result)
            })
            .collect();
        pb.finish_and_clear();

        for (path, result) in prepared {
            match result {
                Ok(song) => {
                    // Two files in one batch may share content
                    if self.store.song_by_content_hash(&song.content_hash)?.is_some() {
                        summary.skipped += 1;
                        continue;
                    }
                    self.store_prepared(song)?;
                    summary.registered += 1;
                }
                Err(e) => {
                    warn!("{}: {}", path.display(), e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Recognize a source and attach song metadata to every match
    pub fn recognize(&self, source: &AudioSource) -> Result<RecognitionResult> {
        let mut result = Recognizer::new(&self.store, &self.config).recognize_source(source)?;
        let mut enriched = Vec::with_capacity(result.matches.len());
        for m in result.matches.drain(..) {
            enriched.push(match self.store.song(m.song_id)? {
                Some(song) => m.with_song(&song),
                None => m,
            });
        }
        result.matches = enriched;
        Ok(result)
    }

    /// Remove songs and their fingerprints
    pub fn forget(&self, ids: &[SongId]) -> Result<usize> {
        let removed = self.store.delete_songs(ids)?;
        info!("Removed {} song(s)", removed);
        Ok(removed)
    }

    pub fn songs(&self) -> Result<Vec<Song>> {
        self.store.songs()
    }

    pub fn stats(&self) -> Result<CatalogStats> {
        Ok(CatalogStats {
            songs: self.store.fingerprinted_song_count()?,
            fingerprints: self.store.fingerprint_count()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::core::decoder::RawPcmFormat;
    use crate::store::MemoryStore;

    fn config() -> FingerprintConfig {
        ConfigBuilder::new()
            .window_size(256)
            .neighborhood(3, 3)
            .build()
            .unwrap()
    }

    fn tone_bytes(freq_step: f64, len: usize) -> Vec<u8> {
        (0..len)
            .flat_map(|i| {
                let f = 400.0 + freq_step * ((i / 1000) % 5) as f64;
                let t = i as f64 / 8000.0;
                let s = (5000.0 * (2.0 * std::f64::consts::PI * f * t).sin()) as i16;
                s.to_le_bytes()
            })
            .collect()
    }

    fn pcm(bytes: Vec<u8>) -> AudioSource {
        AudioSource::buffer(
            bytes,
            RawPcmFormat {
                sample_rate: 8000,
                sample_width: 2,
                channels: 1,
            },
        )
    }

    #[test]
    fn test_register_then_skip_duplicate() {
        let catalog = Catalog::new(MemoryStore::new(), config()).unwrap();
        let source = pcm(tone_bytes(150.0, 16000));

        let first = catalog.register(&source, Some("tones")).unwrap();
        let Registration::Registered { fingerprints, .. } = first else {
            panic!("expected a new registration");
        };
        assert!(fingerprints > 0);

        let second = catalog.register(&source, None).unwrap();
        assert!(matches!(second, Registration::AlreadyKnown(ref s) if s.name == "tones"));
        assert_eq!(second.song_id(), first.song_id());

        let stats = catalog.stats().unwrap();
        assert_eq!(stats.songs, 1);
        assert_eq!(stats.fingerprints, fingerprints);
    }

    #[test]
    fn test_recognize_enriches_matches() {
        let catalog = Catalog::new(MemoryStore::new(), config()).unwrap();
        let source = pcm(tone_bytes(150.0, 16000));
        catalog.register(&source, Some("tones")).unwrap();

        let result = catalog.recognize(&source).unwrap();
        let best = result.best().unwrap();
        assert_eq!(best.song_name.as_deref(), Some("tones"));
        assert!((best.fingerprinted_confidence.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_forget() {
        let catalog = Catalog::new(MemoryStore::new(), config()).unwrap();
        let id = catalog
            .register(&pcm(tone_bytes(150.0, 16000)), None)
            .unwrap()
            .song_id();
        assert_eq!(catalog.forget(&[id]).unwrap(), 1);
        assert!(catalog.songs().unwrap().is_empty());
        assert_eq!(catalog.stats().unwrap(), CatalogStats::default());
    }

    #[test]
    fn test_new_drops_unfingerprinted() {
        let store = MemoryStore::new();
        let id = store.insert_song("half", "ABC", 10).unwrap();
        let catalog = Catalog::new(store, config()).unwrap();
        assert!(catalog.store().song(id).unwrap().is_none());
        assert_eq!(catalog.stats().unwrap().songs, 0);
    }
}
