// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod output;

pub use args::{Cli, Command};
pub use output::{
    format_directory_summary, format_json, format_registration, format_result, format_songs,
    format_stats,
};

use anyhow::{anyhow, Context, Result};
use log::info;
use std::fs;
use std::path::Path;

use crate::core::{AudioSource, Catalog, RawPcmFormat};
use crate::recognition::RecognitionResult;
use crate::store::{MemoryStore, SongId};

/// Run one CLI command against the snapshot at `cli.db_path()`
pub fn run(cli: Cli) -> Result<()> {
    let config = cli.fingerprint_config()?;
    let db = cli.db_path();
    let store = MemoryStore::open(&db)
        .with_context(|| format!("Failed to open database {}", db.display()))?;
    let catalog = Catalog::new(store, config)?;

    match &cli.command {
        Command::Register { path, name, ext } => {
            if path.is_dir() {
                let extensions = args::extensions(ext);
                let summary = catalog
                    .register_directory(path, &extensions)
                    .with_context(|| format!("Failed to register {}", path.display()))?;
                print!("{}", format_directory_summary(&summary));
            } else {
                let registration = catalog
                    .register(&AudioSource::file(path.clone()), name.as_deref())
                    .with_context(|| format!("Failed to register {}", path.display()))?;
                println!("{}", format_registration(&registration));
            }
            save(&catalog, &db)?;
        }

        Command::Recognize {
            path,
            limit,
            top,
            json,
        } => {
            let source = AudioSource::file(path.clone()).with_limit(*limit);
            let result = catalog
                .recognize(&source)
                .with_context(|| format!("Failed to recognize {}", path.display()))?;
            print_result(path, result, *top, *json, cli.verbose)?;
        }

        Command::RecognizeRaw {
            path,
            rate,
            width,
            channels,
            limit,
            top,
            json,
        } => {
            let bytes =
                fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            let format = RawPcmFormat {
                sample_rate: *rate,
                sample_width: *width,
                channels: *channels,
            };
            let source = AudioSource::buffer(bytes, format).with_limit(*limit);
            let result = catalog
                .recognize(&source)
                .with_context(|| format!("Failed to recognize {}", path.display()))?;
            print_result(path, result, *top, *json, cli.verbose)?;
        }

        Command::Songs { json } => {
            let songs = catalog.songs()?;
            if *json {
                println!("{}", format_json(&songs)?);
            } else {
                print!("{}", format_songs(&songs));
            }
        }

        Command::Stats { json } => {
            let stats = catalog.stats()?;
            if *json {
                println!("{}", format_json(&stats)?);
            } else {
                print!("{}", format_stats(&stats));
            }
        }

        Command::Forget { ids } => {
            let ids = ids
                .iter()
                .map(|s| SongId::parse(s).ok_or_else(|| anyhow!("Invalid song id: {}", s)))
                .collect::<Result<Vec<_>>>()?;
            let removed = catalog.forget(&ids)?;
            println!("Removed {} song(s)", removed);
            save(&catalog, &db)?;
        }
    }

    Ok(())
}

fn print_result(
    path: &Path,
    mut result: RecognitionResult,
    top: Option<usize>,
    json: bool,
    verbose: bool,
) -> Result<()> {
    if let Some(k) = top {
        result.truncate(k);
    }
    if json {
        println!("{}", format_json(&result)?);
    } else {
        print!("{}", format_result(&path.display().to_string(), &result, verbose));
    }
    Ok(())
}

fn save(catalog: &Catalog<MemoryStore>, db: &Path) -> Result<()> {
    catalog
        .store()
        .save(db)
        .with_context(|| format!("Failed to save database {}", db.display()))?;
    info!("Database saved to {}", db.display());
    Ok(())
}
