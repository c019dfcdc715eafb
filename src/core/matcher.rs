// src/core/matcher.rs
//
// Offset-difference voting. Hits for the right recording pile up at one
// (stored - query) offset; chance collisions scatter across many.

use log::debug;
use std::collections::HashMap;

use super::hashing::{Fingerprint, FingerprintHash};
use crate::store::{HashHit, HashStore, SongId};
use crate::error::Result;

/// Per-song voting state built while aligning one query
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub song_id: SongId,
    /// stored_offset - query_offset -> votes
    pub histogram: HashMap<i64, usize>,
    /// Votes in the winning bin
    pub best_count: usize,
    /// Offset difference of the winning bin, in frames
    pub best_diff: i64,
    /// Votes across all bins
    pub total_hits: usize,
}

/// A ranked, aligned candidate
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedMatch {
    pub song_id: SongId,
    /// Winning-bin votes divided by the number of query fingerprints, in [0, 1]
    pub confidence: f64,
    /// Where the query starts inside the stored recording, in frames
    pub offset_frames: i64,
    /// Votes in the winning bin
    pub hashes_matched: usize,
    /// Votes across all bins
    pub total_hits: usize,
}

/// Look up every distinct query hash, splitting into batches the store accepts.
///
/// The first failing batch aborts the lookup.
pub fn query_store<S: HashStore + ?Sized>(
    store: &S,
    fingerprints: &[Fingerprint],
) -> Result<Vec<HashHit>> {
    let mut hashes: Vec<FingerprintHash> = fingerprints.iter().map(|fp| fp.hash).collect();
    hashes.sort_unstable();
    hashes.dedup();

    let batch_size = store.max_batch_size().max(1);
    let mut hits = Vec::new();
    for (i, chunk) in hashes.chunks(batch_size).enumerate() {
        let rows = store.query_many(chunk)?;
        debug!("Batch {}: {} hashes -> {} rows", i, chunk.len(), rows.len());
        hits.extend(rows);
    }
    Ok(hits)
}

/// Build one offset histogram per song that received at least one hit.
///
/// A hash may occur at several query offsets; each (hit, query offset)
/// combination casts one vote.
pub fn build_candidates(fingerprints: &[Fingerprint], hits: &[HashHit]) -> Vec<MatchCandidate> {
    let mut query_offsets: HashMap<FingerprintHash, Vec<u32>> = HashMap::new();
    for fp in fingerprints {
        query_offsets.entry(fp.hash).or_default().push(fp.offset);
    }

    let mut histograms: HashMap<SongId, HashMap<i64, usize>> = HashMap::new();
    for hit in hits {
        let Some(offsets) = query_offsets.get(&hit.hash) else {
            continue;
        };
        let histogram = histograms.entry(hit.song_id).or_default();
        for &query_offset in offsets {
            let diff = hit.offset as i64 - query_offset as i64;
            *histogram.entry(diff).or_default() += 1;
        }
    }

    histograms
        .into_iter()
        .filter_map(|(song_id, histogram)| {
            let (best_diff, best_count) = best_bin(&histogram)?;
            let total_hits = histogram.values().sum();
            Some(MatchCandidate {
                song_id,
                histogram,
                best_count,
                best_diff,
                total_hits,
            })
        })
        .collect()
}

/// Highest-count bin; ties prefer the smallest |diff|, then the negative side
fn best_bin(histogram: &HashMap<i64, usize>) -> Option<(i64, usize)> {
    histogram
        .iter()
        .map(|(&diff, &count)| (diff, count))
        .min_by(|a, b| {
            b.1.cmp(&a.1)
                .then(a.0.unsigned_abs().cmp(&b.0.unsigned_abs()))
                .then(a.0.cmp(&b.0))
        })
}

/// Score and order candidates: confidence descending, song id ascending on ties.
pub fn rank_candidates(candidates: Vec<MatchCandidate>, query_fingerprints: usize) -> Vec<AlignedMatch> {
    let mut matches: Vec<AlignedMatch> = candidates
        .into_iter()
        .map(|c| AlignedMatch {
            song_id: c.song_id,
            confidence: confidence(c.best_count, query_fingerprints),
            offset_frames: c.best_diff,
            hashes_matched: c.best_count,
            total_hits: c.total_hits,
        })
        .collect();

    matches.sort_by(|a, b| {
        b.hashes_matched
            .cmp(&a.hashes_matched)
            .then(a.song_id.cmp(&b.song_id))
    });
    matches
}

/// Fraction of query fingerprints explained by the winning bin
pub fn confidence(best_count: usize, query_fingerprints: usize) -> f64 {
    if query_fingerprints == 0 {
        return 0.0;
    }
    (best_count as f64 / query_fingerprints as f64).clamp(0.0, 1.0)
}
