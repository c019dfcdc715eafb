// src/core/peaks.rs
//
// Local-maximum picking over a spectrogram grid.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::spectrogram::SpectrogramGrid;
use crate::config::{PeakConfig, PeakOrder};

/// A spectral peak
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Time-frame index
    pub frame: usize,
    /// Frequency-bin index
    pub bin: usize,
    /// Magnitude in dB
    pub magnitude: f32,
}

/// Find the peaks of a grid.
///
/// A cell is a peak when it equals the maximum of its rectangular
/// neighborhood, is not below the amplitude floor, and strictly exceeds the
/// minimum peak amplitude. Output is ordered by frame ascending; within a
/// frame by `config.order`.
pub fn extract_peaks(grid: &SpectrogramGrid, config: &PeakConfig) -> Vec<Peak> {
    if grid.is_empty() {
        return Vec::new();
    }

    let local_max = neighborhood_max(grid, config.neighborhood_time, config.neighborhood_freq);
    let num_bins = grid.num_bins();

    let mut peaks = Vec::new();
    for frame in 0..grid.num_frames() {
        let row = grid.frame(frame);
        let max_row = &local_max[frame * num_bins..(frame + 1) * num_bins];
        for (bin, (&magnitude, &max)) in row.iter().zip(max_row).enumerate() {
            if magnitude < max
                || magnitude < config.amplitude_floor
                || magnitude <= config.min_peak_amplitude
            {
                continue;
            }
            peaks.push(Peak { frame, bin, magnitude });
        }
    }

    // Coincident points keep the strongest magnitude
    peaks.sort_by(|a, b| {
        a.frame
            .cmp(&b.frame)
            .then(a.bin.cmp(&b.bin))
            .then(b.magnitude.partial_cmp(&a.magnitude).unwrap_or(Ordering::Equal))
    });
    peaks.dedup_by_key(|p| (p.frame, p.bin));

    if config.order == PeakOrder::TimeMagnitude {
        peaks.sort_by(|a, b| {
            a.frame
                .cmp(&b.frame)
                .then(b.magnitude.partial_cmp(&a.magnitude).unwrap_or(Ordering::Equal))
                .then(a.bin.cmp(&b.bin))
        });
    }

    peaks
}

/// Separable rectangular maximum filter, clipped at the grid edges
fn neighborhood_max(grid: &SpectrogramGrid, half_time: usize, half_freq: usize) -> Vec<f32> {
    let num_frames = grid.num_frames();
    let num_bins = grid.num_bins();

    // Along frequency
    let mut freq_max = vec![f32::NEG_INFINITY; num_frames * num_bins];
    for frame in 0..num_frames {
        let row = grid.frame(frame);
        for bin in 0..num_bins {
            let lo = bin.saturating_sub(half_freq);
            let hi = (bin + half_freq).min(num_bins - 1);
            freq_max[frame * num_bins + bin] =
                row[lo..=hi].iter().copied().fold(f32::NEG_INFINITY, f32::max);
        }
    }

    // Along time
    let mut out = vec![f32::NEG_INFINITY; num_frames * num_bins];
    for frame in 0..num_frames {
        let lo = frame.saturating_sub(half_time);
        let hi = (frame + half_time).min(num_frames - 1);
        for bin in 0..num_bins {
            out[frame * num_bins + bin] = (lo..=hi)
                .map(|t| freq_max[t * num_bins + bin])
                .fold(f32::NEG_INFINITY, f32::max);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(frames: Vec<Vec<f32>>) -> SpectrogramGrid {
        SpectrogramGrid::from_frames(frames, 1.0, 1.0)
    }

    fn config(half: usize, floor: f32, min_peak: f32) -> PeakConfig {
        PeakConfig {
            neighborhood_time: half,
            neighborhood_freq: half,
            amplitude_floor: floor,
            min_peak_amplitude: min_peak,
            order: PeakOrder::TimeFrequency,
        }
    }

    #[test]
    fn test_single_peak() {
        let g = grid(vec![
            vec![1.0, 2.0, 1.0],
            vec![2.0, 9.0, 3.0],
            vec![1.0, 2.0, 1.0],
        ]);
        let peaks = extract_peaks(&g, &config(1, 0.0, 0.0));
        assert_eq!(peaks.len(), 1);
        assert_eq!((peaks[0].frame, peaks[0].bin), (1, 1));
        assert_eq!(peaks[0].magnitude, 9.0);
    }

    #[test]
    fn test_neighborhood_suppresses_weaker_maxima() {
        let g = grid(vec![
            vec![0.0, 0.0, 0.0, 0.0, 0.0],
            vec![0.0, 8.0, 0.0, 5.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 0.0],
        ]);
        // Half-width 1: both are local maxima
        assert_eq!(extract_peaks(&g, &config(1, 0.0, 1.0)).len(), 2);
        // Half-width 2: the 8.0 covers the 5.0
        let peaks = extract_peaks(&g, &config(2, 0.0, 1.0));
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].bin, 1);
    }

    #[test]
    fn test_thresholds() {
        let g = grid(vec![vec![0.0, 12.0, 0.0, 0.0, 0.0, 30.0, 0.0]]);
        let peaks = extract_peaks(&g, &config(1, 0.0, 15.0));
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].bin, 5);

        let peaks = extract_peaks(&g, &config(1, 31.0, 0.0));
        assert!(peaks.is_empty());
    }

    #[test]
    fn test_flat_silence_has_no_peaks() {
        let g = grid(vec![vec![0.0; 16]; 8]);
        assert!(extract_peaks(&g, &config(2, 0.0, 10.0)).is_empty());
    }

    #[test]
    fn test_empty_grid() {
        let g = grid(Vec::new());
        assert!(extract_peaks(&g, &PeakConfig::default()).is_empty());
    }

    #[test]
    fn test_ordering() {
        let g = grid(vec![
            vec![0.0, 20.0, 0.0, 0.0, 40.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            vec![30.0, 0.0, 0.0, 25.0, 0.0, 0.0],
        ]);
        let mut cfg = config(0, 0.0, 1.0);
        let peaks = extract_peaks(&g, &cfg);
        let order: Vec<_> = peaks.iter().map(|p| (p.frame, p.bin)).collect();
        assert_eq!(order, vec![(0, 1), (0, 4), (2, 0), (2, 3)]);

        cfg.order = PeakOrder::TimeMagnitude;
        let peaks = extract_peaks(&g, &cfg);
        let order: Vec<_> = peaks.iter().map(|p| (p.frame, p.bin)).collect();
        assert_eq!(order, vec![(0, 4), (0, 1), (2, 0), (2, 3)]);
    }
}
