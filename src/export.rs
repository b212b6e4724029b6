use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;

use crate::counts::CountTable;

/// Written in place of a name for antibody barcodes missing from the name map.
pub const UNKNOWN_NAME: &str = "UNKNOWN";

/// Table formats for the count output.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Csv,
    Tsv,
}

impl OutputFormat {
    pub fn delimiter(&self) -> u8 {
        match self {
            OutputFormat::Csv => b',',
            OutputFormat::Tsv => b'\t',
        }
    }
}

#[derive(Debug, Serialize)]
struct CountRow<'a> {
    cell_id: String,
    cell_barcode_1: &'a str,
    cell_barcode_2: &'a str,
    antibody_barcode: &'a str,
    antibody_name: &'a str,
    count: usize,
}

#[derive(Debug, Serialize)]
struct CellRow<'a> {
    antibody_name: &'a str,
    count: usize,
}

fn antibody_name<'a>(names: &'a HashMap<String, String>, barcode: &str) -> &'a str {
    names.get(barcode).map_or(UNKNOWN_NAME, String::as_str)
}

/// Writes every (cell, antibody) count of at least `min_count` as one row of a single table.
///
/// # Arguments
///
/// * `writer` - Destination of the table; a header row is always written.
/// * `table` - The counts to export.
/// * `names` - Antibody barcode to antibody name.
/// * `min_count` - Counts below this are left out.
/// * `format` - Field delimiter of the table.
///
/// # Returns
///
/// The number of rows written, excluding the header.
pub fn write_counts(
    writer: impl Write,
    table: &CountTable,
    names: &HashMap<String, String>,
    min_count: usize,
    format: OutputFormat,
) -> Result<usize> {
    let mut wtr = WriterBuilder::new()
        .delimiter(format.delimiter())
        .has_headers(false)
        .from_writer(writer);

    // written by hand so that an empty table still gets a header
    wtr.write_record([
        "cell_id",
        "cell_barcode_1",
        "cell_barcode_2",
        "antibody_barcode",
        "antibody_name",
        "count",
    ])?;

    let mut rows = 0;
    for (cell, antibodies) in table.iter() {
        let cell_id = cell.to_string();

        for (barcode, &count) in antibodies {
            if count < min_count {
                continue;
            }

            wtr.serialize(CountRow {
                cell_id: cell_id.clone(),
                cell_barcode_1: &cell.first,
                cell_barcode_2: &cell.second,
                antibody_barcode: barcode,
                antibody_name: antibody_name(names, barcode),
                count,
            })?;
            rows += 1;
        }
    }

    wtr.flush().context("Could not write the count table")?;
    Ok(rows)
}

/// Writes one `cell_<id>.csv` file into `dir` for every cell with at least one antibody count of
/// at least `min_count`, listing those antibodies by name. Cells with nothing to report get no
/// file.
///
/// # Returns
///
/// The number of antibody rows written across all files.
pub fn write_per_cell(
    dir: &Path,
    table: &CountTable,
    names: &HashMap<String, String>,
    min_count: usize,
) -> Result<usize> {
    create_dir_all(dir).with_context(|| format!("Could not create {}", dir.display()))?;

    let mut rows = 0;
    let mut files = 0;
    for (cell, antibodies) in table.iter() {
        let kept = antibodies
            .iter()
            .filter(|(_, count)| **count >= min_count)
            .collect::<Vec<_>>();

        if kept.is_empty() {
            continue;
        }

        let path = dir.join(format!("cell_{cell}.csv"));
        let file =
            File::create(&path).with_context(|| format!("Could not create {}", path.display()))?;

        let mut wtr = WriterBuilder::new().has_headers(true).from_writer(file);
        for (barcode, &count) in kept {
            wtr.serialize(CellRow {
                antibody_name: antibody_name(names, barcode),
                count,
            })?;
            rows += 1;
        }
        wtr.flush()
            .with_context(|| format!("Could not write {}", path.display()))?;
        files += 1;
    }

    info!("Wrote {files} per-cell files to {}", dir.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::CellBarcode;
    use indoc::indoc;

    fn cell(first: &str, second: &str) -> CellBarcode {
        CellBarcode {
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    fn table() -> CountTable {
        let mut table = CountTable::new();
        for _ in 0..12 {
            table.record(cell("TAGACCATG", "TGAACGGTT"), "CCGTGTTCCTCATTA");
        }
        for _ in 0..3 {
            table.record(cell("TAGACCATG", "TGAACGGTT"), "AAGTATCGTTTCGCA");
        }
        for _ in 0..10 {
            table.record(cell("CCTTGAACA", "TAGACCATG"), "AAGTATCGTTTCGCA");
        }
        for _ in 0..9 {
            table.record(cell("CCTTGAACA", "CCTTGAACA"), "CCGTGTTCCTCATTA");
        }
        table
    }

    fn names() -> HashMap<String, String> {
        HashMap::from([("CCGTGTTCCTCATTA".to_string(), "CD3".to_string())])
    }

    #[test]
    fn single_table() {
        let mut out = Vec::new();
        let rows = write_counts(&mut out, &table(), &names(), 10, OutputFormat::Csv).unwrap();

        assert_eq!(rows, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            indoc! {"
                cell_id,cell_barcode_1,cell_barcode_2,antibody_barcode,antibody_name,count
                TAGACCATG_TGAACGGTT,TAGACCATG,TGAACGGTT,CCGTGTTCCTCATTA,CD3,12
                CCTTGAACA_TAGACCATG,CCTTGAACA,TAGACCATG,AAGTATCGTTTCGCA,UNKNOWN,10
            "}
        );
    }

    #[test]
    fn tsv_with_no_threshold() {
        let mut out = Vec::new();
        let rows = write_counts(&mut out, &table(), &names(), 0, OutputFormat::Tsv).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert_eq!(rows, 4);
        assert_eq!(out.lines().count(), 5);
        assert!(out.contains("CCTTGAACA_CCTTGAACA\tCCTTGAACA\tCCTTGAACA\tCCGTGTTCCTCATTA\tCD3\t9\n"));
    }

    #[test]
    fn empty_table_has_header() {
        let mut out = Vec::new();
        let rows = write_counts(&mut out, &CountTable::new(), &names(), 10, OutputFormat::Csv)
            .unwrap();

        assert_eq!(rows, 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "cell_id,cell_barcode_1,cell_barcode_2,antibody_barcode,antibody_name,count\n"
        );
    }

    #[test]
    fn per_cell_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("cells");

        let rows = write_per_cell(&out, &table(), &names(), 10).unwrap();
        assert_eq!(rows, 2);

        let first = std::fs::read_to_string(out.join("cell_TAGACCATG_TGAACGGTT.csv")).unwrap();
        assert_eq!(first, "antibody_name,count\nCD3,12\n");

        let second = std::fs::read_to_string(out.join("cell_CCTTGAACA_TAGACCATG.csv")).unwrap();
        assert_eq!(second, "antibody_name,count\nUNKNOWN,10\n");

        // nothing reaches the threshold for this cell
        assert!(!out.join("cell_CCTTGAACA_CCTTGAACA.csv").exists());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 2);
    }
}
