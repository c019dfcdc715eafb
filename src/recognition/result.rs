//! Recognition result types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::matcher::AlignedMatch;
use crate::store::{Song, SongId};

/// Coarse reading of a confidence score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchStrength {
    /// Nothing lined up
    None,
    /// A handful of aligned hits, likely chance
    Weak,
    /// Plausible match
    Likely,
    /// Most of the query is explained by this recording
    Strong,
}

impl MatchStrength {
    pub fn from_confidence(confidence: f64) -> Self {
        match confidence {
            c if c >= 0.5 => MatchStrength::Strong,
            c if c >= 0.15 => MatchStrength::Likely,
            c if c > 0.0 => MatchStrength::Weak,
            _ => MatchStrength::None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            MatchStrength::Strong => "✓",
            MatchStrength::Likely => "~",
            MatchStrength::Weak => "?",
            MatchStrength::None => "—",
        }
    }

    pub fn color_code(&self) -> &'static str {
        match self {
            MatchStrength::Strong => "\x1b[32m", // green
            MatchStrength::Likely => "\x1b[33m", // yellow
            MatchStrength::Weak => "\x1b[90m",   // gray
            MatchStrength::None => "\x1b[31m",   // red
        }
    }
}

/// One ranked recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongMatch {
    pub song_id: SongId,
    /// Aligned hits / query fingerprints
    pub confidence: f64,
    /// Start of the query inside the recording, in frames
    pub offset_frames: i64,
    /// Same, in seconds
    pub offset_seconds: f64,
    /// Hits in the winning offset bin
    pub hashes_matched: usize,
    /// Hits across all offsets
    pub total_hits: usize,

    // Filled in when a song catalog is available
    pub song_name: Option<String>,
    pub content_hash: Option<String>,
    /// Fingerprints stored for the song at registration
    pub fingerprinted_hashes: Option<usize>,
    /// Aligned hits / fingerprints stored for the song
    pub fingerprinted_confidence: Option<f64>,
}

impl SongMatch {
    pub fn from_aligned(aligned: AlignedMatch, frame_duration: f64) -> Self {
        Self {
            song_id: aligned.song_id,
            confidence: aligned.confidence,
            offset_frames: aligned.offset_frames,
            offset_seconds: aligned.offset_frames as f64 * frame_duration,
            hashes_matched: aligned.hashes_matched,
            total_hits: aligned.total_hits,
            song_name: None,
            content_hash: None,
            fingerprinted_hashes: None,
            fingerprinted_confidence: None,
        }
    }

    /// Attach catalog metadata
    pub fn with_song(mut self, song: &Song) -> Self {
        self.song_name = Some(song.name.clone());
        self.content_hash = Some(song.content_hash.clone());
        self.fingerprinted_hashes = Some(song.total_hashes);
        self.fingerprinted_confidence = Some(if song.total_hashes > 0 {
            (self.hashes_matched as f64 / song.total_hashes as f64).clamp(0.0, 1.0)
        } else {
            0.0
        });
        self
    }

    pub fn strength(&self) -> MatchStrength {
        MatchStrength::from_confidence(self.confidence)
    }

    /// Display label: song name if known, otherwise the id
    pub fn label(&self) -> String {
        self.song_name
            .clone()
            .unwrap_or_else(|| self.song_id.to_string())
    }
}

/// Timed outcome of one recognition request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// Seconds spent end to end
    pub total_time: f64,
    pub fingerprint_time: f64,
    pub query_time: f64,
    pub align_time: f64,
    /// Distinct fingerprints extracted from the query audio
    pub query_fingerprints: usize,
    /// Best first
    pub matches: Vec<SongMatch>,
}

impl RecognitionResult {
    pub fn empty(fingerprint_time: Duration, total_time: Duration) -> Self {
        Self {
            total_time: total_time.as_secs_f64(),
            fingerprint_time: fingerprint_time.as_secs_f64(),
            ..Default::default()
        }
    }

    pub fn best(&self) -> Option<&SongMatch> {
        self.matches.first()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Keep the best `k` matches
    pub fn truncate(&mut self, k: usize) {
        self.matches.truncate(k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn aligned(best: usize, confidence: f64) -> AlignedMatch {
        AlignedMatch {
            song_id: SongId::from_u128(7),
            confidence,
            offset_frames: 40,
            hashes_matched: best,
            total_hits: best + 3,
        }
    }

    #[test]
    fn test_strength_from_confidence() {
        assert_eq!(MatchStrength::from_confidence(0.8), MatchStrength::Strong);
        assert_eq!(MatchStrength::from_confidence(0.2), MatchStrength::Likely);
        assert_eq!(MatchStrength::from_confidence(0.01), MatchStrength::Weak);
        assert_eq!(MatchStrength::from_confidence(0.0), MatchStrength::None);
    }

    #[test]
    fn test_offset_seconds() {
        let m = SongMatch::from_aligned(aligned(10, 0.5), 0.5);
        assert!((m.offset_seconds - 20.0).abs() < 1e-12);
        assert_eq!(m.label(), SongId::from_u128(7).to_string());
    }

    #[test]
    fn test_with_song() {
        let now = Utc::now();
        let song = Song {
            id: SongId::from_u128(7),
            name: "Track".to_string(),
            content_hash: "AB".to_string(),
            total_hashes: 40,
            fingerprinted: true,
            created_at: now,
            modified_at: now,
        };
        let m = SongMatch::from_aligned(aligned(10, 0.5), 0.1).with_song(&song);
        assert_eq!(m.label(), "Track");
        assert_eq!(m.fingerprinted_hashes, Some(40));
        assert!((m.fingerprinted_confidence.unwrap() - 0.25).abs() < 1e-12);
    }
}
