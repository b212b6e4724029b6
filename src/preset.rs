/// Enum representing the supported read layouts.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default)]
pub enum PresetLayout {
    /// Mission Bio Tapestri DAb-seq: split 9+9 cell barcode upstream of the R1 start motif,
    /// TotalSeq-B antibody barcode between the 5' and 3' handles of R2
    #[default]
    DabSeq,
}

/// Where the barcodes sit inside each mate, and how much noise is tolerated when locating them.
#[derive(Clone, Debug)]
pub struct ReadLayout {
    /// landmark immediately downstream of the second cell barcode half in R1
    pub r1_start_motif: &'static [u8],
    /// length of each cell barcode half
    pub cell_half_len: usize,
    /// 5' antibody handle in R2
    pub ab_handle_5p: &'static [u8],
    /// 3' antibody handle, variant A (payload is everything upstream of it)
    pub ab_handle_3p_a: &'static [u8],
    /// 3' antibody handle, variant B (payload sits between the 5' handle and this one)
    pub ab_handle_3p_b: &'static [u8],
    /// length of an antibody barcode
    pub antibody_len: usize,
    /// substitutions tolerated when locating any motif
    pub motif_mismatches: usize,
}

const DAB_SEQ: ReadLayout = ReadLayout {
    r1_start_motif: b"GTACTCGCAGTAGTC",
    cell_half_len: 9,
    ab_handle_5p: b"TGACTACGCTACTCATGG",
    ab_handle_3p_a: b"GCTTTAAGGCCGGTCCTAGC",
    ab_handle_3p_b: b"GAGCCGATCTAGTATCTCAGTCG",
    antibody_len: 15,
    motif_mismatches: 1,
};

impl Default for ReadLayout {
    fn default() -> Self {
        DAB_SEQ
    }
}

/// Returns the read layout for a preset.
///
/// # Arguments
///
/// * `preset` - A reference to a `PresetLayout` enum variant.
pub fn get_layout(preset: &PresetLayout) -> ReadLayout {
    match preset {
        PresetLayout::DabSeq => DAB_SEQ,
    }
}
