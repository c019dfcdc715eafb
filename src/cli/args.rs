//! CLI argument definitions

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ConfigPreset, FingerprintConfig};
use crate::core::dsp::WindowFunction;
use crate::core::AUDIO_EXTENSIONS;

#[derive(Parser, Debug)]
#[command(name = "audiomatch")]
#[command(version, about = "Register recordings and identify them from short clips")]
pub struct Cli {
    /// Fingerprint database snapshot (JSON)
    #[arg(long, global = true, env = "AUDIOMATCH_DB")]
    pub db: Option<PathBuf>,

    /// JSON configuration file; takes precedence over --preset
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Configuration preset: standard, high-recall, compact
    #[arg(long, global = true, default_value = "standard")]
    pub preset: String,

    /// Analysis window: hann, hamming, blackman, rectangular
    #[arg(long, global = true)]
    pub window: Option<String>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fingerprint a file, or every audio file under a directory
    Register {
        path: PathBuf,

        /// Song name (single files only; defaults to the file stem)
        #[arg(long)]
        name: Option<String>,

        /// Extensions picked up when scanning a directory
        #[arg(long, value_delimiter = ',')]
        ext: Vec<String>,
    },

    /// Identify an audio file
    Recognize {
        path: PathBuf,

        /// Only use the first N seconds
        #[arg(short, long)]
        limit: Option<f64>,

        /// Show at most K matches
        #[arg(long)]
        top: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Identify raw interleaved little-endian PCM
    RecognizeRaw {
        path: PathBuf,

        /// Sample rate in Hz
        #[arg(long)]
        rate: u32,

        /// Bytes per sample (1-4)
        #[arg(long, default_value_t = 2)]
        width: u8,

        #[arg(long, default_value_t = 1)]
        channels: u16,

        #[arg(short, long)]
        limit: Option<f64>,

        #[arg(long)]
        top: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// List registered songs
    Songs {
        #[arg(long)]
        json: bool,
    },

    /// Show catalog size
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Remove songs by id
    Forget {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

impl Cli {
    /// `--db`, or `<data dir>/audiomatch/db.json`
    pub fn db_path(&self) -> PathBuf {
        self.db.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("audiomatch")
                .join("db.json")
        })
    }

    pub fn fingerprint_config(&self) -> Result<FingerprintConfig> {
        let mut config = match &self.config {
            Some(path) => FingerprintConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => {
                let preset = ConfigPreset::from_name(&self.preset)
                    .ok_or_else(|| anyhow!("Unknown preset: {}", self.preset))?;
                FingerprintConfig::from_preset(preset)
            }
        };
        if let Some(name) = &self.window {
            config.spectrogram.window_function = WindowFunction::from_name(name)
                .ok_or_else(|| anyhow!("Unknown window function: {}", name))?;
        }
        Ok(config)
    }
}

/// Extensions from `--ext`, or the built-in list
pub fn extensions(ext: &[String]) -> Vec<&str> {
    if ext.is_empty() {
        AUDIO_EXTENSIONS.to_vec()
    } else {
        ext.iter().map(String::as_str).collect()
    }
}
