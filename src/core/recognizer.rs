// src/core/recognizer.rs
//
// Orchestration: channels -> spectrogram -> peaks -> fingerprints -> store
// lookup -> offset voting. Channels are fingerprinted on rayon workers and
// merged by set union.

use log::debug;
use rayon::prelude::*;
use std::time::Instant;

use super::decoder::AudioSource;
use super::hashing::{generate_fingerprints, Fingerprint};
use super::matcher::{build_candidates, query_store, rank_candidates};
use super::peaks::extract_peaks;
use super::spectrogram::build_spectrogram;
use crate::config::FingerprintConfig;
use crate::error::{Error, Result};
use crate::recognition::{RecognitionResult, SongMatch};
use crate::store::HashStore;

/// Fingerprint one channel.
///
/// Fails with [`Error::InsufficientSamples`] when the channel is shorter
/// than one analysis window.
pub fn fingerprint_channel(
    samples: &[i16],
    sample_rate: u32,
    config: &FingerprintConfig,
) -> Result<Vec<Fingerprint>> {
    let grid = build_spectrogram(samples, sample_rate, &config.spectrogram)?;
    let peaks = extract_peaks(&grid, &config.peaks);
    let fingerprints = generate_fingerprints(&peaks, &config.hashing);
    debug!(
        "Channel: {} frames, {} peaks, {} fingerprints",
        grid.num_frames(),
        peaks.len(),
        fingerprints.len()
    );
    Ok(fingerprints)
}

/// Check the structural invariants the decoder must uphold
pub fn validate_channels(channels: &[Vec<i16>], sample_rate: u32) -> Result<()> {
    if sample_rate == 0 {
        return Err(Error::DecodeUpstream("sample rate is zero".to_string()));
    }
    let Some(first) = channels.first() else {
        return Err(Error::DecodeUpstream("no channels".to_string()));
    };
    if first.is_empty() {
        return Err(Error::DecodeUpstream("empty channel".to_string()));
    }
    if let Some((i, ch)) = channels.iter().enumerate().find(|(_, c)| c.len() != first.len()) {
        return Err(Error::DecodeUpstream(format!(
            "channel {} has {} samples, channel 0 has {}",
            i,
            ch.len(),
            first.len()
        )));
    }
    Ok(())
}

/// Fingerprint every channel of one recording and merge the results.
///
/// Channels too short for one window contribute nothing. The merged set is
/// sorted and free of duplicate (hash, offset) pairs.
pub fn fingerprint_channels(
    channels: &[Vec<i16>],
    sample_rate: u32,
    config: &FingerprintConfig,
) -> Result<Vec<Fingerprint>> {
    validate_channels(channels, sample_rate)?;

    let per_channel: Vec<Vec<Fingerprint>> = channels
        .par_iter()
        .enumerate()
        .map(|(i, samples)| match fingerprint_channel(samples, sample_rate, config) {
            Err(e) if e.is_recoverable() => {
                debug!("Channel {}: {}", i, e);
                Ok(Vec::new())
            }
            other => other,
        })
        .collect::<Result<_>>()?;

    let mut merged: Vec<Fingerprint> = per_channel.into_iter().flatten().collect();
    merged.sort_unstable();
    merged.dedup();
    Ok(merged)
}

/// Matches query audio against a hash store.
///
/// Holds no mutable state; one instance may serve concurrent requests.
pub struct Recognizer<'a, S: HashStore + ?Sized> {
    store: &'a S,
    config: &'a FingerprintConfig,
}

impl<'a, S: HashStore + ?Sized> Recognizer<'a, S> {
    pub fn new(store: &'a S, config: &'a FingerprintConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &FingerprintConfig {
        self.config
    }

    /// Resolve an input adapter, then recognize its channels
    pub fn recognize_source(&self, source: &AudioSource) -> Result<RecognitionResult> {
        let audio = source.decode()?;
        self.recognize(&audio.channels, audio.sample_rate)
    }

    /// Identify which stored recording the channels come from.
    ///
    /// Silence or unmatched audio yields an empty match list, not an error.
    pub fn recognize(&self, channels: &[Vec<i16>], sample_rate: u32) -> Result<RecognitionResult> {
        let start = Instant::now();

        let fingerprints = fingerprint_channels(channels, sample_rate, self.config)?;
        let fingerprint_time = start.elapsed();

        if fingerprints.is_empty() {
            debug!("No fingerprints extracted; skipping store lookup");
            return Ok(RecognitionResult::empty(fingerprint_time, start.elapsed()));
        }

        let t = Instant::now();
        let hits = query_store(self.store, &fingerprints)?;
        let query_time = t.elapsed();

        let t = Instant::now();
        let candidates = build_candidates(&fingerprints, &hits);
        let ranked = rank_candidates(candidates, fingerprints.len());
        let align_time = t.elapsed();

        let frame_duration = self.config.spectrogram.hop_size() as f64 / sample_rate as f64;
        let mut matches: Vec<SongMatch> = ranked
            .into_iter()
            .map(|m| SongMatch::from_aligned(m, frame_duration))
            .collect();
        if let Some(k) = self.config.matching.top_k {
            matches.truncate(k);
        }

        let total_time = start.elapsed();
        debug!(
            "Recognized {} fingerprints -> {} hits, {} candidates (fp {:?}, query {:?}, align {:?})",
            fingerprints.len(),
            hits.len(),
            matches.len(),
            fingerprint_time,
            query_time,
            align_time
        );

        Ok(RecognitionResult {
            total_time: total_time.as_secs_f64(),
            fingerprint_time: fingerprint_time.as_secs_f64(),
            query_time: query_time.as_secs_f64(),
            align_time: align_time.as_secs_f64(),
            query_fingerprints: fingerprints.len(),
            matches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::core::hashing::FingerprintHash;
    use crate::store::{HashHit, MemoryStore, SongId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves the first batch, then reports the backend as down
    struct FlakyStore {
        inner: MemoryStore,
        calls: AtomicUsize,
    }

    impl HashStore for FlakyStore {
        fn insert(&self, song_id: SongId, fingerprints: &[Fingerprint]) -> Result<usize> {
            self.inner.insert(song_id, fingerprints)
        }

        fn query_many(&self, hashes: &[FingerprintHash]) -> Result<Vec<HashHit>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= 1 {
                return Err(Error::StoreUnavailable("connection reset".to_string()));
            }
            self.inner.query_many(hashes)
        }

        fn max_batch_size(&self) -> usize {
            self.inner.max_batch_size()
        }

        fn fingerprint_count(&self) -> Result<usize> {
            self.inner.fingerprint_count()
        }
    }

    fn small_config() -> FingerprintConfig {
        ConfigBuilder::new()
            .window_size(256)
            .overlap_ratio(0.5)
            .neighborhood(3, 3)
            .build()
            .unwrap()
    }

    fn chirps(len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| {
                let t = i as f64 / 8000.0;
                let f = 300.0 + 200.0 * ((i / 800) % 7) as f64;
                (6000.0 * (2.0 * std::f64::consts::PI * f * t).sin()) as i16
            })
            .collect()
    }

    #[test]
    fn test_validate_channels() {
        assert!(matches!(validate_channels(&[], 8000), Err(Error::DecodeUpstream(_))));
        assert!(matches!(validate_channels(&[vec![]], 8000), Err(Error::DecodeUpstream(_))));
        assert!(matches!(
            validate_channels(&[vec![0; 10], vec![0; 9]], 8000),
            Err(Error::DecodeUpstream(_))
        ));
        assert!(matches!(validate_channels(&[vec![0; 10]], 0), Err(Error::DecodeUpstream(_))));
        assert!(validate_channels(&[vec![0; 10], vec![0; 10]], 8000).is_ok());
    }

    #[test]
    fn test_short_channel_yields_no_fingerprints() {
        let config = small_config();
        let fps = fingerprint_channels(&[vec![100; 200]], 8000, &config).unwrap();
        assert!(fps.is_empty());
    }

    #[test]
    fn test_silence_short_circuits() {
        let config = small_config();
        let store = MemoryStore::new();
        let result = Recognizer::new(&store, &config)
            .recognize(&[vec![0; 256]], 8000)
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.query_fingerprints, 0);
        assert_eq!(result.query_time, 0.0);
    }

    #[test]
    fn test_identical_channels_merge() {
        let config = small_config();
        let mono = chirps(16000);
        let single = fingerprint_channels(&[mono.clone()], 8000, &config).unwrap();
        let stereo = fingerprint_channels(&[mono.clone(), mono], 8000, &config).unwrap();
        assert!(!single.is_empty());
        assert_eq!(single, stereo);
    }

    #[test]
    fn test_recognize_self() {
        let config = small_config();
        let store = MemoryStore::new();
        let samples = chirps(24000);
        let fps = fingerprint_channels(&[samples.clone()], 8000, &config).unwrap();
        let song = SongId::from_u128(1);
        store.insert(song, &fps).unwrap();

        let result = Recognizer::new(&store, &config)
            .recognize(&[samples], 8000)
            .unwrap();
        let best = result.best().unwrap();
        assert_eq!(best.song_id, song);
        assert_eq!(best.offset_frames, 0);
        assert!((best.confidence - 1.0).abs() < 1e-12);
        assert_eq!(result.query_fingerprints, fps.len());
    }

    #[test]
    fn test_top_k() {
        let config = ConfigBuilder::new()
            .window_size(256)
            .neighborhood(3, 3)
            .top_k(Some(1))
            .build()
            .unwrap();
        let store = MemoryStore::new();
        let samples = chirps(24000);
        let fps = fingerprint_channels(&[samples.clone()], 8000, &config).unwrap();
        store.insert(SongId::from_u128(1), &fps).unwrap();
        store.insert(SongId::from_u128(2), &fps[..fps.len() / 2]).unwrap();

        let result = Recognizer::new(&store, &config).recognize(&[samples], 8000).unwrap();
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].song_id, SongId::from_u128(1));
    }

    #[test]
    fn test_failed_batch_fails_recognition() {
        let config = small_config();
        let samples = chirps(24000);
        let fps = fingerprint_channels(&[samples.clone()], 8000, &config).unwrap();
        assert!(fps.len() > 4);

        let store = FlakyStore {
            inner: MemoryStore::new().with_max_batch_size(2),
            calls: AtomicUsize::new(0),
        };
        store.insert(SongId::from_u128(1), &fps).unwrap();

        let result = Recognizer::new(&store, &config).recognize(&[samples], 8000);
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }
}
