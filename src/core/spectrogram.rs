// src/core/spectrogram.rs
//
// Short-time spectral analysis of one PCM channel into a dB magnitude grid.
// Frames that would run past the end of the channel are dropped so that
// frame indices map exactly onto sample offsets.

use log::debug;
use realfft::RealFftPlanner;

use super::dsp::power_to_db;
use crate::config::SpectrogramConfig;
use crate::error::{Error, Result};

/// Time-frequency magnitude grid, stored frame-major
#[derive(Debug, Clone)]
pub struct SpectrogramGrid {
    magnitudes: Vec<f32>,
    num_frames: usize,
    num_bins: usize,
    /// Hz covered by one frequency bin
    pub frequency_resolution: f64,
    /// Seconds between the starts of consecutive frames
    pub frame_duration: f64,
}

impl SpectrogramGrid {
    /// Build a grid from precomputed frames. All frames must have the same length.
    pub fn from_frames(frames: Vec<Vec<f32>>, frequency_resolution: f64, frame_duration: f64) -> Self {
        let num_frames = frames.len();
        let num_bins = frames.first().map_or(0, |f| f.len());
        let magnitudes = frames.into_iter().flatten().collect::<Vec<_>>();
        debug_assert_eq!(magnitudes.len(), num_frames * num_bins);
        Self {
            magnitudes,
            num_frames,
            num_bins,
            frequency_resolution,
            frame_duration,
        }
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn is_empty(&self) -> bool {
        self.num_frames == 0 || self.num_bins == 0
    }

    /// Magnitudes of one frame, indexed by frequency bin
    pub fn frame(&self, frame: usize) -> &[f32] {
        let start = frame * self.num_bins;
        &self.magnitudes[start..start + self.num_bins]
    }
}

/// Compute the magnitude spectrogram of one channel.
///
/// Each frame is windowed, transformed with a real-input FFT, and
/// converted to `10·log10(|X|² / Σw²)`.
pub fn build_spectrogram(
    samples: &[i16],
    sample_rate: u32,
    config: &SpectrogramConfig,
) -> Result<SpectrogramGrid> {
    let window_size = config.window_size;
    if samples.len() < window_size {
        return Err(Error::InsufficientSamples {
            samples: samples.len(),
            window: window_size,
        });
    }

    let hop_size = config.hop_size();
    let num_frames = (samples.len() - window_size) / hop_size + 1;
    let num_bins = window_size / 2 + 1;

    let window = config.window_function.generate(window_size);
    let window_energy: f64 = window.iter().map(|w| w * w).sum();

    let mut planner = RealFftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(window_size);
    let mut input = fft.make_input_vec();
    let mut spectrum = fft.make_output_vec();
    let mut scratch = fft.make_scratch_vec();

    let mut magnitudes = Vec::with_capacity(num_frames * num_bins);
    for frame_idx in 0..num_frames {
        let start = frame_idx * hop_size;
        let frame = &samples[start..start + window_size];

        for ((slot, &sample), &w) in input.iter_mut().zip(frame).zip(&window) {
            *slot = sample as f64 * w;
        }

        fft.process_with_scratch(&mut input, &mut spectrum, &mut scratch)?;

        magnitudes.extend(
            spectrum
                .iter()
                .map(|c| power_to_db(c.norm_sqr() / window_energy) as f32),
        );
    }

    debug!(
        "Spectrogram: {} samples -> {} frames x {} bins (hop {})",
        samples.len(),
        num_frames,
        num_bins,
        hop_size
    );

    Ok(SpectrogramGrid {
        magnitudes,
        num_frames,
        num_bins,
        frequency_resolution: sample_rate as f64 / window_size as f64,
        frame_duration: hop_size as f64 / sample_rate as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dsp::WindowFunction;
    use std::f64::consts::PI;

    fn config(window_size: usize, overlap_ratio: f64) -> SpectrogramConfig {
        SpectrogramConfig {
            window_size,
            overlap_ratio,
            window_function: WindowFunction::Hann,
        }
    }

    fn tone(freq: f64, sample_rate: u32, len: usize, amplitude: f64) -> Vec<i16> {
        (0..len)
            .map(|i| (amplitude * (2.0 * PI * freq * i as f64 / sample_rate as f64).sin()) as i16)
            .collect()
    }

    #[test]
    fn test_frame_count_drops_partial_frames() {
        let samples = vec![0i16; 1000];
        let grid = build_spectrogram(&samples, 8000, &config(256, 0.5)).unwrap();
        // (1000 - 256) / 128 + 1 = 6
        assert_eq!(grid.num_frames(), 6);
        assert_eq!(grid.num_bins(), 129);
    }

    #[test]
    fn test_insufficient_samples() {
        let samples = vec![0i16; 255];
        let err = build_spectrogram(&samples, 8000, &config(256, 0.5)).unwrap_err();
        assert!(matches!(err, Error::InsufficientSamples { samples: 255, window: 256 }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_exactly_one_window() {
        let samples = vec![0i16; 256];
        let grid = build_spectrogram(&samples, 8000, &config(256, 0.5)).unwrap();
        assert_eq!(grid.num_frames(), 1);
        assert!(grid.frame(0).iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_tone_lands_in_expected_bin() {
        // 1000 Hz at 8 kHz with 256-point window: 31.25 Hz per bin -> bin 32
        let samples = tone(1000.0, 8000, 4096, 8000.0);
        let grid = build_spectrogram(&samples, 8000, &config(256, 0.5)).unwrap();
        assert!((grid.frequency_resolution - 31.25).abs() < 1e-9);
        assert!((grid.frame_duration - 0.016).abs() < 1e-9);

        let frame = grid.frame(3);
        let (peak_bin, _) = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        assert_eq!(peak_bin, 32);
    }

    #[test]
    fn test_deterministic() {
        let samples = tone(440.0, 8000, 8000, 5000.0);
        let a = build_spectrogram(&samples, 8000, &config(512, 0.5)).unwrap();
        let b = build_spectrogram(&samples, 8000, &config(512, 0.5)).unwrap();
        assert_eq!(a.magnitudes, b.magnitudes);
    }

    #[test]
    fn test_shifted_input_reproduces_frames() {
        let samples = tone(700.0, 8000, 8000, 5000.0);
        let full = build_spectrogram(&samples, 8000, &config(512, 0.5)).unwrap();
        // Shift by exactly 3 hops
        let shifted = build_spectrogram(&samples[3 * 256..], 8000, &config(512, 0.5)).unwrap();
        assert_eq!(shifted.frame(0), full.frame(3));
    }
}
