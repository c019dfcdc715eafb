// src/config/profiles.rs
//
// Fingerprinting and matching parameters, with presets trading recall
// against storage and query volume.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::dsp::WindowFunction;
use crate::error::{Error, Result};

/// Spectrogram framing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    /// Samples per analysis window
    pub window_size: usize,
    /// Fraction of each window shared with the next one, in [0, 1)
    pub overlap_ratio: f64,
    pub window_function: WindowFunction,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            window_size: 4096,
            overlap_ratio: 0.5,
            window_function: WindowFunction::Hann,
        }
    }
}

impl SpectrogramConfig {
    /// Samples between the starts of consecutive frames (never zero)
    pub fn hop_size(&self) -> usize {
        ((self.window_size as f64 * (1.0 - self.overlap_ratio)) as usize).max(1)
    }
}

/// Ordering of peaks sharing a time frame. Time is always ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakOrder {
    /// Ascending frequency bin
    #[default]
    TimeFrequency,
    /// Descending magnitude, ascending frequency on ties
    TimeMagnitude,
}

/// Local-maximum search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Half-width of the neighborhood along the time axis, in frames
    pub neighborhood_time: usize,
    /// Half-width of the neighborhood along the frequency axis, in bins
    pub neighborhood_freq: usize,
    /// Cells below this magnitude (dB) are never peaks
    pub amplitude_floor: f32,
    /// Peaks must strictly exceed this magnitude (dB)
    pub min_peak_amplitude: f32,
    pub order: PeakOrder,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            neighborhood_time: 10,
            neighborhood_freq: 10,
            amplitude_floor: 0.0,
            min_peak_amplitude: 10.0,
            order: PeakOrder::TimeFrequency,
        }
    }
}

/// Peak pairing and hash truncation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    /// Maximum number of targets paired with one anchor
    pub fan_out: usize,
    /// Minimum frames between anchor and target (inclusive)
    pub min_time_delta: usize,
    /// Maximum frames between anchor and target (inclusive)
    pub max_time_delta: usize,
    /// Targets must differ from the anchor by more than this many bins
    pub min_freq_delta: usize,
    /// Width of the truncated digest, 1..=128
    pub hash_bits: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            fan_out: 15,
            min_time_delta: 0,
            max_time_delta: 200,
            min_freq_delta: 0,
            hash_bits: 80,
        }
    }
}

/// Result shaping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Keep only the best K candidates (None keeps all)
    pub top_k: Option<usize>,
}

/// Named presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigPreset {
    /// Balanced defaults for music libraries
    Standard,
    /// Denser peaks and more pairs per anchor; larger store, better on short noisy clips
    HighRecall,
    /// Sparser peaks, fewer pairs, shorter hashes; smaller store
    Compact,
}

impl ConfigPreset {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "standard" | "default" => Some(Self::Standard),
            "highrecall" | "high-recall" | "recall" => Some(Self::HighRecall),
            "compact" | "small" => Some(Self::Compact),
            _ => None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Self::Standard, Self::HighRecall, Self::Compact]
    }
}

/// Complete, immutable configuration handed to every component call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    pub spectrogram: SpectrogramConfig,
    pub peaks: PeakConfig,
    pub hashing: HashConfig,
    pub matching: MatchConfig,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self::from_preset(ConfigPreset::Standard)
    }
}

impl FingerprintConfig {
    pub fn from_preset(preset: ConfigPreset) -> Self {
        match preset {
            ConfigPreset::Standard => Self::standard(),
            ConfigPreset::HighRecall => Self::high_recall(),
            ConfigPreset::Compact => Self::compact(),
        }
    }

    fn standard() -> Self {
        Self {
            spectrogram: SpectrogramConfig::default(),
            peaks: PeakConfig::default(),
            hashing: HashConfig::default(),
            matching: MatchConfig::default(),
        }
    }

    fn high_recall() -> Self {
        Self {
            spectrogram: SpectrogramConfig {
                overlap_ratio: 0.75,
                ..SpectrogramConfig::default()
            },
            peaks: PeakConfig {
                neighborhood_time: 6,
                neighborhood_freq: 6,
                ..PeakConfig::default()
            },
            hashing: HashConfig {
                fan_out: 20,
                hash_bits: 96,
                ..HashConfig::default()
            },
            matching: MatchConfig::default(),
        }
    }

    fn compact() -> Self {
        Self {
            spectrogram: SpectrogramConfig::default(),
            peaks: PeakConfig {
                neighborhood_time: 20,
                neighborhood_freq: 20,
                min_peak_amplitude: 20.0,
                ..PeakConfig::default()
            },
            hashing: HashConfig {
                fan_out: 5,
                hash_bits: 64,
                ..HashConfig::default()
            },
            matching: MatchConfig::default(),
        }
    }

    /// Load a (possibly partial) configuration from a JSON file.
    ///
    /// Missing fields take the Standard preset values.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        let s = &self.spectrogram;
        if s.window_size < 2 {
            return Err(Error::Config(format!("window_size must be >= 2, got {}", s.window_size)));
        }
        if !(0.0..1.0).contains(&s.overlap_ratio) {
            return Err(Error::Config(format!(
                "overlap_ratio must be in [0, 1), got {}",
                s.overlap_ratio
            )));
        }

        let h = &self.hashing;
        if h.fan_out == 0 {
            return Err(Error::Config("fan_out must be at least 1".to_string()));
        }
        if h.min_time_delta > h.max_time_delta {
            return Err(Error::Config(format!(
                "min_time_delta ({}) exceeds max_time_delta ({})",
                h.min_time_delta, h.max_time_delta
            )));
        }
        if !(1..=128).contains(&h.hash_bits) {
            return Err(Error::Config(format!("hash_bits must be in 1..=128, got {}", h.hash_bits)));
        }

        if self.matching.top_k == Some(0) {
            return Err(Error::Config("top_k must be at least 1 when set".to_string()));
        }
        Ok(())
    }
}

/// Builder for custom configurations
pub struct ConfigBuilder {
    config: FingerprintConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: FingerprintConfig::default(),
        }
    }

    pub fn from_preset(preset: ConfigPreset) -> Self {
        Self {
            config: FingerprintConfig::from_preset(preset),
        }
    }

    pub fn window_size(mut self, size: usize) -> Self {
        self.config.spectrogram.window_size = size;
        self
    }

    pub fn overlap_ratio(mut self, ratio: f64) -> Self {
        self.config.spectrogram.overlap_ratio = ratio;
        self
    }

    pub fn window_function(mut self, window: WindowFunction) -> Self {
        self.config.spectrogram.window_function = window;
        self
    }

    pub fn neighborhood(mut self, time: usize, freq: usize) -> Self {
        self.config.peaks.neighborhood_time = time;
        self.config.peaks.neighborhood_freq = freq;
        self
    }

    pub fn amplitude_floor(mut self, floor: f32) -> Self {
        self.config.peaks.amplitude_floor = floor;
        self
    }

    pub fn min_peak_amplitude(mut self, amplitude: f32) -> Self {
        self.config.peaks.min_peak_amplitude = amplitude;
        self
    }

    pub fn peak_order(mut self, order: PeakOrder) -> Self {
        self.config.peaks.order = order;
        self
    }

    pub fn fan_out(mut self, fan_out: usize) -> Self {
        self.config.hashing.fan_out = fan_out;
        self
    }

    pub fn time_delta(mut self, min: usize, max: usize) -> Self {
        self.config.hashing.min_time_delta = min;
        self.config.hashing.max_time_delta = max;
        self
    }

    pub fn min_freq_delta(mut self, delta: usize) -> Self {
        self.config.hashing.min_freq_delta = delta;
        self
    }

    pub fn hash_bits(mut self, bits: u32) -> Self {
        self.config.hashing.hash_bits = bits;
        self
    }

    pub fn top_k(mut self, top_k: Option<usize>) -> Self {
        self.config.matching.top_k = top_k;
        self
    }

    pub fn build(self) -> Result<FingerprintConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
