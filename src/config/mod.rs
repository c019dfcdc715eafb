//! Configuration module for audiomatch

mod profiles;

pub use profiles::{
    ConfigBuilder, ConfigPreset, FingerprintConfig, HashConfig, MatchConfig, PeakConfig,
    PeakOrder, SpectrogramConfig,
};
