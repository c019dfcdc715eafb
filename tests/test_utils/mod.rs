#![allow(dead_code)]

use std::f64::consts::PI;
use std::path::Path;

use audiomatch::{ConfigBuilder, FingerprintConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SAMPLE_RATE: u32 = 8000;
pub const WINDOW: usize = 512;
pub const HOP: usize = 256;

/// Small-window configuration suited to 8 kHz synthetic material
pub fn test_config() -> FingerprintConfig {
    ConfigBuilder::new()
        .window_size(WINDOW)
        .overlap_ratio(0.5)
        .neighborhood(3, 5)
        .min_peak_amplitude(65.0)
        .build()
        .expect("valid test config")
}

/// Seeded "song": short enveloped tones centred on frame centres, each at
/// an exact FFT bin frequency so peaks land on a single well-defined cell.
pub fn synth_song(seed: u64, seconds: f64) -> Vec<i16> {
    let mut rng = StdRng::seed_from_u64(seed);
    let len = (seconds * SAMPLE_RATE as f64) as usize;
    let mut acc = vec![0f64; len];

    let half = 4 * HOP;
    let notes = (seconds * 8.0) as usize;
    for _ in 0..notes {
        let centre = rng.gen_range(1..len / HOP) * HOP;
        let bin = rng.gen_range(20..230) as f64;
        let amplitude = rng.gen_range(2000.0..6000.0);
        let phase = rng.gen_range(0.0..2.0 * PI);

        let lo = centre.saturating_sub(half);
        let hi = (centre + half).min(len);
        for (n, slot) in acc.iter_mut().enumerate().take(hi).skip(lo) {
            let d = (n as f64 - centre as f64) / half as f64;
            let envelope = 0.5 * (1.0 + (PI * d).cos());
            *slot += amplitude * envelope * (2.0 * PI * bin * n as f64 / WINDOW as f64 + phase).sin();
        }
    }

    acc.into_iter()
        .map(|s| s.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16)
        .collect()
}

/// Add uniform noise in [-amplitude, amplitude] to `fraction` of the samples
pub fn add_noise(samples: &[i16], seed: u64, fraction: f64, amplitude: i16) -> Vec<i16> {
    let mut rng = StdRng::seed_from_u64(seed);
    samples
        .iter()
        .map(|&s| {
            if rng.gen_bool(fraction) {
                s.saturating_add(rng.gen_range(-amplitude..=amplitude))
            } else {
                s
            }
        })
        .collect()
}

/// Samples starting at `frame` hops, lasting `seconds`
pub fn clip(samples: &[i16], frame: usize, seconds: f64) -> Vec<i16> {
    let start = frame * HOP;
    let end = (start + (seconds * SAMPLE_RATE as f64) as usize).min(samples.len());
    samples[start..end].to_vec()
}

pub fn write_wav(path: &Path, channels: &[Vec<i16>]) {
    let spec = hound::WavSpec {
        channels: channels.len() as u16,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    for i in 0..channels[0].len() {
        for channel in channels {
            writer.write_sample(channel[i]).expect("write sample");
        }
    }
    writer.finalize().expect("finalize wav");
}

pub fn to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
