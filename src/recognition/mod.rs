//! Recognition module for audiomatch

mod result;

pub use result::{MatchStrength, RecognitionResult, SongMatch};
