//! Output formatting for CLI results

use colorful::Colorful;

use crate::core::{CatalogStats, DirectorySummary, Registration};
use crate::recognition::{RecognitionResult, SongMatch};
use crate::store::Song;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Format a recognition result for terminal output
pub fn format_result(source: &str, result: &RecognitionResult, verbose: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}{}{}\n", BOLD, source, RESET));

    match result.best() {
        None => {
            output.push_str(&format!("  {}\n", "No match".red()));
        }
        Some(_) => {
            for (rank, m) in result.matches.iter().enumerate() {
                output.push_str(&format_match(rank + 1, m, verbose));
            }
        }
    }

    output.push_str(&format!(
        "  {}{} query fingerprints in {:.3}s (fingerprint {:.3}s, query {:.3}s, align {:.3}s){}\n",
        DIM,
        result.query_fingerprints,
        result.total_time,
        result.fingerprint_time,
        result.query_time,
        result.align_time,
        RESET
    ));

    output
}

fn format_match(rank: usize, m: &SongMatch, verbose: bool) -> String {
    let strength = m.strength();
    let mut output = format!(
        "  {}. {}{} {}{} {}(confidence: {:.0}%, offset: {:.2}s){}\n",
        rank,
        strength.color_code(),
        strength.symbol(),
        m.label(),
        RESET,
        DIM,
        m.confidence * 100.0,
        m.offset_seconds,
        RESET
    );

    if verbose {
        output.push_str(&format!(
            "      {}id: {} | aligned: {} | hits: {} | offset: {} frames{}\n",
            DIM, m.song_id, m.hashes_matched, m.total_hits, m.offset_frames, RESET
        ));
        if let (Some(stored), Some(conf)) = (m.fingerprinted_hashes, m.fingerprinted_confidence) {
            output.push_str(&format!(
                "      {}stored fingerprints: {} | song coverage: {:.1}%{}\n",
                DIM,
                stored,
                conf * 100.0,
                RESET
            ));
        }
    }

    output
}

pub fn format_registration(registration: &Registration) -> String {
    match registration {
        Registration::Registered {
            song_id,
            name,
            fingerprints,
        } => format!(
            "{} {} ({} fingerprints) {}{}{}",
            "✓".green(),
            name,
            fingerprints,
            DIM,
            song_id,
            RESET
        ),
        Registration::AlreadyKnown(song) => format!(
            "{} {} already registered {}{}{}",
            "—".yellow(),
            song.name,
            DIM,
            song.id,
            RESET
        ),
    }
}

pub fn format_directory_summary(summary: &DirectorySummary) -> String {
    let mut output = format!("\n{}Summary:{}\n", BOLD, RESET);
    output.push_str(&format!("  \x1b[32m✓ {} registered{}\n", summary.registered, RESET));
    if summary.skipped > 0 {
        output.push_str(&format!("  \x1b[90m— {} already known{}\n", summary.skipped, RESET));
    }
    if summary.failed > 0 {
        output.push_str(&format!("  \x1b[31m✗ {} failed{}\n", summary.failed, RESET));
    }
    output
}

pub fn format_songs(songs: &[Song]) -> String {
    if songs.is_empty() {
        return "No songs registered\n".to_string();
    }
    let mut output = String::new();
    for song in songs {
        output.push_str(&format!(
            "{}  {:<40} {:>8} fp  {}{}{}\n",
            song.id,
            song.name,
            song.total_hashes,
            DIM,
            song.created_at.format("%Y-%m-%d %H:%M"),
            RESET
        ));
    }
    output
}

pub fn format_stats(stats: &CatalogStats) -> String {
    format!(
        "{}Songs:{} {}\n{}Fingerprints:{} {}\n",
        BOLD, RESET, stats.songs, BOLD, RESET, stats.fingerprints
    )
}

/// Pretty-printed JSON for any serializable result
pub fn format_json<T: serde::Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}
