// src/core/hashing.rs
//
// Combinatorial peak pairing. Each (anchor, target) pair within the target
// zone becomes a truncated SHA-256 digest of (anchor bin, target bin, Δt),
// stamped with the anchor's frame index.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

use super::peaks::Peak;
use crate::config::HashConfig;

/// Maximum hash width in bytes
pub const HASH_BYTES: usize = 16;

const MAX_PRESIZED_FAN_OUT: usize = 32;

/// Truncated digest of one peak pair. Bits past the configured width are zero.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FingerprintHash([u8; HASH_BYTES]);

impl FingerprintHash {
    /// Digest `(anchor_bin, target_bin, time_delta)` and keep the leading `bits` bits
    pub fn from_pair(anchor_bin: usize, target_bin: usize, time_delta: usize, bits: u32) -> Self {
        let mut input = [0u8; 12];
        input[..4].copy_from_slice(&(anchor_bin as u32).to_le_bytes());
        input[4..8].copy_from_slice(&(target_bin as u32).to_le_bytes());
        input[8..].copy_from_slice(&(time_delta as u32).to_le_bytes());

        let digest = Sha256::digest(input);
        let mut bytes = [0u8; HASH_BYTES];
        bytes.copy_from_slice(&digest[..HASH_BYTES]);
        Self::truncated(bytes, bits)
    }

    /// Zero every bit past `bits`
    pub fn truncated(mut bytes: [u8; HASH_BYTES], bits: u32) -> Self {
        let bits = bits.min(8 * HASH_BYTES as u32) as usize;
        let full = bits / 8;
        let rem = bits % 8;
        if full < HASH_BYTES {
            if rem > 0 {
                bytes[full] &= 0xFFu8 << (8 - rem);
                bytes[full + 1..].fill(0);
            } else {
                bytes[full..].fill(0);
            }
        }
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_BYTES] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; HASH_BYTES];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for FingerprintHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for FingerprintHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FingerprintHash({})", self.to_hex())
    }
}

impl Serialize for FingerprintHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FingerprintHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A hash stamped with its anchor's time-frame index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub hash: FingerprintHash,
    /// Frame index of the anchor (earlier) peak
    pub offset: u32,
}

/// Pair peaks into fingerprints.
///
/// `peaks` must be ordered by frame ascending. For each anchor, later peaks
/// are scanned until Δt leaves the target zone; targets too close in time
/// or frequency are skipped, and at most `fan_out` pairs are kept. The
/// returned set is sorted and free of duplicate (hash, offset) pairs.
pub fn generate_fingerprints(peaks: &[Peak], config: &HashConfig) -> Vec<Fingerprint> {
    // fan_out is an upper bound, so only pre-size for a modest fan-out
    let per_anchor = config.fan_out.min(peaks.len()).min(MAX_PRESIZED_FAN_OUT);
    let mut fingerprints = Vec::with_capacity(peaks.len().saturating_mul(per_anchor));

    for (i, anchor) in peaks.iter().enumerate() {
        let mut paired = 0;
        for target in &peaks[i + 1..] {
            let Some(time_delta) = target.frame.checked_sub(anchor.frame) else {
                continue;
            };
            if time_delta > config.max_time_delta {
                break;
            }
            if time_delta < config.min_time_delta
                || anchor.bin.abs_diff(target.bin) <= config.min_freq_delta
            {
                continue;
            }

            fingerprints.push(Fingerprint {
                hash: FingerprintHash::from_pair(anchor.bin, target.bin, time_delta, config.hash_bits),
                offset: anchor.frame as u32,
            });

            paired += 1;
            if paired == config.fan_out {
                break;
            }
        }
    }

    fingerprints.sort_unstable();
    fingerprints.dedup();
    fingerprints
}
