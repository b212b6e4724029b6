extern crate env_logger;
#[macro_use]
extern crate log;
use std::{
    fs::File,
    io::{prelude::*, stdout, BufWriter},
    path::Path,
};

use anyhow::{Context, Result};
use clap::Parser;

mod cli;
mod count;
mod counts;
mod export;
mod extract;
mod file;
mod motif;
mod preset;
mod reader;
mod summary;
mod whitelist;

use cli::{Cli, Commands};
use whitelist::{BarcodeIndex, CollisionPolicy};

/// Creates a `BufWriter` for the given output option. This allows for an output file to be passed
/// or otherwise will default to using standard output.
///
/// If `output` is `Some`, it creates a file at the specified path and returns a `BufWriter` for it.
/// If `output` is `None`, it returns a `BufWriter` for the standard output.
///
/// # Arguments
///
/// * `output` - An `Option` containing the path to the output file as a `String`.
///
/// # Returns
///
/// A `Result` containing a `BufWriter` that implements `Write`.
fn get_writer(output: &Option<String>) -> Result<impl Write> {
    // get output as a BufWriter - equal to stdout if None
    let writer = BufWriter::new(match output {
        Some(ref x) => {
            let file = File::create(Path::new(x)).with_context(|| format!("Could not create {x}"))?;
            Box::new(file) as Box<dyn Write + Send>
        }
        None => Box::new(stdout()) as Box<dyn Write + Send>,
    });
    Ok(writer)
}

fn collision_policy(allow_collisions: bool) -> CollisionPolicy {
    if allow_collisions {
        CollisionPolicy::KeepFirst
    } else {
        CollisionPolicy::Reject
    }
}

fn try_main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let cli = Cli::parse();

    info!("dabcount v{}", cli::VERSION);

    match &cli.command {
        Commands::Count {
            r1,
            r2,
            cell_whitelist,
            antibody_whitelist,
            output,
            per_cell_dir,
            format,
            min_count,
            max_pairs,
            preset,
            allow_collisions,
            summary,
        } => {
            let opts = count::CountOptions {
                r1,
                r2,
                cell_whitelist,
                antibody_whitelist,
                layout: preset::get_layout(preset),
                policy: collision_policy(*allow_collisions),
                max_pairs: *max_pairs,
            };

            let count::CountResult {
                table,
                names,
                mut metadata,
            } = count::count(&opts)?;

            metadata.rows_written = match per_cell_dir {
                Some(dir) => export::write_per_cell(Path::new(dir), &table, &names, *min_count)?,
                None => {
                    let mut writer = get_writer(output)?;
                    let rows =
                        export::write_counts(&mut writer, &table, &names, *min_count, *format)?;
                    writer.flush()?;
                    rows
                }
            };

            summary::log_summary(&metadata);
            if let Some(path) = summary {
                summary::write_summary(&metadata, path)?;
            }

            info!("Completed successfully.")
        }
        Commands::Check {
            whitelist,
            allow_collisions,
        } => {
            let index = BarcodeIndex::from_path(whitelist, collision_policy(*allow_collisions))
                .with_context(|| format!("Could not build a correction index from {whitelist}"))?;

            println!("barcodes\t{}", index.len());
            println!("barcode_length\t{}", index.barcode_len());
            println!("correctable_sequences\t{}", index.neighborhood_len());
            println!("ambiguous_sequences\t{}", index.ambiguous_neighbors());
        }
    };
    Ok(())
}

fn main() {
    if let Err(err) = try_main() {
        error!("{}", err);

        // report any errors that are produced
        err.chain()
            .skip(1)
            .for_each(|cause| error!("  because: {}", cause));

        std::process::exit(1);
    }
}
