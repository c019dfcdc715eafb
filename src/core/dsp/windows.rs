//! Window function implementations

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Window functions for spectral analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowFunction {
    Rectangular,
    #[default]
    Hann,
    Hamming,
    Blackman,
}

impl WindowFunction {
    /// Generate symmetric window coefficients
    pub fn generate(&self, size: usize) -> Vec<f64> {
        if size < 2 {
            return vec![1.0; size];
        }
        match self {
            WindowFunction::Rectangular => vec![1.0; size],
            WindowFunction::Hann => Self::hann(size),
            WindowFunction::Hamming => Self::hamming(size),
            WindowFunction::Blackman => Self::blackman(size),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "rectangular" | "rect" | "none" => Some(Self::Rectangular),
            "hann" | "hanning" => Some(Self::Hann),
            "hamming" => Some(Self::Hamming),
            "blackman" => Some(Self::Blackman),
            _ => None,
        }
    }

    fn hann(size: usize) -> Vec<f64> {
        (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (size - 1) as f64).cos()))
            .collect()
    }

    fn hamming(size: usize) -> Vec<f64> {
        (0..size)
            .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (size - 1) as f64).cos())
            .collect()
    }

    fn blackman(size: usize) -> Vec<f64> {
        (0..size)
            .map(|i| {
                let x = 2.0 * PI * i as f64 / (size - 1) as f64;
                0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
            })
            .collect()
    }
}
