use clap::builder::styling::AnsiColor;
use clap::builder::Styles;
use clap::{Parser, Subcommand};

use crate::export::OutputFormat;
use crate::preset::PresetLayout;

const fn extra_build_info() -> &'static str {
    match option_env!("CARGO_BUILD_DESC") {
        Some(e) => e,
        None => env!("CARGO_PKG_VERSION"),
    }
}
pub const VERSION: &str = extra_build_info();
const INFO_STRING: &str = "
🧫 dabcount version ";
const AFTER_STRING: &str = "
   ──────────────────────────────────
   per-cell antibody counts from DAb-seq paired reads";

// colouring of the help
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().bold())
    .usage(AnsiColor::BrightMagenta.on_default().bold())
    .literal(AnsiColor::BrightMagenta.on_default())
    .placeholder(AnsiColor::White.on_default());

#[derive(Parser)]
#[command(
    version = VERSION,
    about = format!("{}{}{}", INFO_STRING, VERSION, AFTER_STRING),
    arg_required_else_help = true,
    flatten_help = true,
    styles = STYLES
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count antibody barcodes per cell from a pair of .fastq files
    #[command(arg_required_else_help = true)]
    Count {
        /// the R1 .fastq, optionally compressed (gzip, bzip2, xz, zstd)
        r1: String,

        /// the R2 .fastq, in the same order as R1
        r2: String,

        /// cell barcode whitelist, with rows of the form BARCODE,IDENTIFIER
        #[arg(long)]
        cell_whitelist: String,

        /// antibody barcode whitelist, with rows of the form BARCODE,NAME
        #[arg(long)]
        antibody_whitelist: String,

        /// the output count table. defaults to standard output
        #[arg(short, long)]
        output: Option<String>,

        /// instead of a single table, write one cell_<ID>.csv file per cell into this directory
        #[arg(long, conflicts_with = "output")]
        per_cell_dir: Option<String>,

        /// format of the count table
        #[arg(long, value_enum, default_value = "csv")]
        format: OutputFormat,

        /// leave out (cell, antibody) combinations seen fewer than this many times
        #[arg(long, default_value_t = 10)]
        min_count: usize,

        /// stop after this many read pairs
        #[arg(long)]
        max_pairs: Option<usize>,

        #[arg(long, value_enum, default_value = "dab-seq")]
        preset: PresetLayout,

        /// when a sequence is one substitution away from two whitelist barcodes, assign it to the
        /// barcode listed first instead of failing
        #[arg(long, action)]
        allow_collisions: bool,

        /// write the run statistics to this .json file
        #[arg(long)]
        summary: Option<String>,
    },

    /// Check that a whitelist can be used for barcode correction, and report its size
    #[command(arg_required_else_help = true)]
    Check {
        /// the whitelist .csv
        whitelist: String,

        /// see `count --allow-collisions`
        #[arg(long, action)]
        allow_collisions: bool,
    },
}
