use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use itertools::Itertools;

use crate::file::RunMetadata;

fn percent(n: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * n as f64 / total as f64
    }
}

/// Logs the outcome of a `count` run.
pub fn log_summary(meta: &RunMetadata) {
    let pairs = meta.pair_count;

    info!("Summary over {pairs} pairs ({:.1}s):", meta.elapsed);
    info!(
        "  {} ({:.1}%) have a valid cell barcode",
        meta.valid_cell_count,
        percent(meta.valid_cell_count, pairs)
    );
    info!(
        "  {} ({:.1}%) have a valid antibody barcode",
        meta.valid_antibody_count,
        percent(meta.valid_antibody_count, pairs)
    );
    info!(
        "  {} ({:.1}%) have both",
        meta.both_valid_count,
        percent(meta.both_valid_count, pairs)
    );

    let cells = &meta.cell_rejections;
    debug!(
        "Cell barcode rejections ({}): motif not found {}, motif too early {}, first half unknown {}, second half unknown {}",
        cells.total(),
        cells.motif_not_found, cells.motif_too_early, cells.first_half_unknown, cells.second_half_unknown
    );

    let abs = &meta.antibody_rejections;
    debug!(
        "Antibody barcode rejections ({}): handles not found {}, unknown {}, wrong length {}",
        abs.total(),
        abs.handles_not_found,
        abs.unknown,
        abs.wrong_length.values().sum::<usize>()
    );
    if !abs.wrong_length.is_empty() {
        debug!(
            "Wrong length payloads: {}",
            abs.wrong_length
                .iter()
                .map(|(len, n)| format!("{len}bp x{n}"))
                .join(", ")
        );
    }

    info!("Unique cells: {}", meta.distinct_cells);
    info!("Rows written: {}", meta.rows_written);
}

/// Writes the run metadata as pretty-printed JSON.
pub fn write_summary(meta: &RunMetadata, path: &str) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Could not create {path}"))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, meta).context("Could not serialize run summary")?;
    writeln!(writer)?;
    writer.flush()?;

    info!("Wrote run summary to {path}");
    Ok(())
}
