use std::collections::HashMap;
use std::io::Read;
use std::time::Instant;

use anyhow::{bail, Context, Result};

use crate::counts::CountTable;
use crate::extract::{parse_antibody, parse_cell_barcode};
use crate::file::RunMetadata;
use crate::preset::ReadLayout;
use crate::reader::PairedRecordReader;
use crate::whitelist::{load_name_map, BarcodeIndex, CollisionPolicy};

const PROGRESS_INTERVAL: usize = 500_000;

/// Inputs and settings of a `count` run.
pub struct CountOptions<'a> {
    pub r1: &'a str,
    pub r2: &'a str,
    pub cell_whitelist: &'a str,
    pub antibody_whitelist: &'a str,
    pub layout: ReadLayout,
    pub policy: CollisionPolicy,
    /// stop after this many pairs
    pub max_pairs: Option<usize>,
}

/// The result of a `count` run, ready to be exported.
pub struct CountResult {
    pub table: CountTable,
    pub names: HashMap<String, String>,
    pub metadata: RunMetadata,
}

/// Loads a whitelist and checks that its barcodes have the length the read layout expects.
fn load_index(
    path: &str,
    kind: &str,
    expected_len: usize,
    policy: CollisionPolicy,
) -> Result<BarcodeIndex> {
    let index = BarcodeIndex::from_path(path, policy)
        .with_context(|| format!("Could not load {kind} whitelist"))?;

    if index.barcode_len() != expected_len {
        bail!(indoc::formatdoc! {"
            {kind} whitelist {path} contains {len} base barcodes, but the read layout expects \
            {expected_len} base barcodes",
            len = index.barcode_len()
        });
    }

    info!(
        "Loaded {} {kind} barcodes from {path} ({} correctable sequences)",
        index.len(),
        index.neighborhood_len()
    );
    Ok(index)
}

/// Counts antibody barcodes per cell over a pair of FASTQ files.
pub fn count(opts: &CountOptions) -> Result<CountResult> {
    let start = Instant::now();

    let cells = load_index(
        opts.cell_whitelist,
        "cell",
        opts.layout.cell_half_len,
        opts.policy,
    )?;
    let antibodies = load_index(
        opts.antibody_whitelist,
        "antibody",
        opts.layout.antibody_len,
        opts.policy,
    )?;
    let names = load_name_map(opts.antibody_whitelist)
        .context("Could not load antibody names")?;

    let mut reader = PairedRecordReader::from_paths(opts.r1, opts.r2)?;

    let mut metadata = RunMetadata {
        dabcount_version: crate::cli::VERSION.to_string(),
        r1_path: opts.r1.to_string(),
        r2_path: opts.r2.to_string(),
        cell_whitelist: opts.cell_whitelist.to_string(),
        antibody_whitelist: opts.antibody_whitelist.to_string(),
        run_date: format!("{:?}", chrono::offset::Local::now()),
        ..RunMetadata::default()
    };

    info!("Counting read pairs from {} and {}", opts.r1, opts.r2);
    let table = count_pairs(
        &mut reader,
        &opts.layout,
        &cells,
        &antibodies,
        opts.max_pairs,
        &mut metadata,
    )?;

    metadata.distinct_cells = table.cells();
    metadata.elapsed = start.elapsed().as_secs_f64();

    Ok(CountResult {
        table,
        names,
        metadata,
    })
}

/// Classifies every pair from `reader` and counts those with both a valid cell barcode and a valid
/// antibody barcode. Per-outcome tallies are accumulated into `metadata`.
///
/// # Errors
///
/// Any error from the reader stops the run; pairs whose barcodes cannot be assigned are only
/// tallied.
pub fn count_pairs<R: Read + Send>(
    reader: &mut PairedRecordReader<R>,
    layout: &ReadLayout,
    cells: &BarcodeIndex,
    antibodies: &BarcodeIndex,
    max_pairs: Option<usize>,
    metadata: &mut RunMetadata,
) -> Result<CountTable> {
    let mut table = CountTable::new();

    while max_pairs.map_or(true, |max| metadata.pair_count < max) {
        let Some(pair) = reader
            .next_pair()
            .with_context(|| format!("Could not read pair {}", metadata.pair_count + 1))?
        else {
            break;
        };

        metadata.pair_count += 1;
        if metadata.pair_count % PROGRESS_INTERVAL == 0 {
            info!("Processed: {} pairs", metadata.pair_count);
        }

        let cell = parse_cell_barcode(&pair.r1.seq, layout, cells);
        let antibody = parse_antibody(&pair.r2.seq, layout, antibodies);

        match cell {
            Ok(_) => metadata.valid_cell_count += 1,
            Err(reason) => metadata.cell_rejections.add(reason),
        }
        match antibody {
            Ok(_) => metadata.valid_antibody_count += 1,
            Err(reason) => metadata.antibody_rejections.add(reason),
        }

        if let (Ok(cell), Ok(antibody)) = (cell, antibody) {
            metadata.both_valid_count += 1;
            table.record(cell, antibody);
        }
    }

    if max_pairs.is_some_and(|max| metadata.pair_count >= max) {
        info!("Stopped after {} pairs", metadata.pair_count);
    }
    debug!(
        "Reader is {:?} after {} pairs; {} pairs counted",
        reader.state(),
        reader.pairs_read(),
        table.total()
    );

    Ok(table)
}
