use std::fmt;

use crate::motif::find_first;
use crate::preset::ReadLayout;
use crate::whitelist::BarcodeIndex;

/// A corrected cell barcode, made of two halves read from different positions of R1.
///
/// # Fields
///
/// * `first` - The half at the very start of the read.
/// * `second` - The half immediately upstream of the start motif.
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
pub struct CellBarcode {
    pub first: String,
    pub second: String,
}

/// Formats the cell identifier, `FIRST_SECOND`. `_` is never a barcode symbol, so the halves
/// can always be recovered.
impl fmt::Display for CellBarcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.first, self.second)
    }
}

/// Why no cell barcode could be assigned to an R1 sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellRejection {
    MotifNotFound,
    /// the start motif leaves no room for the first half
    MotifTooEarly,
    FirstHalfUnknown,
    SecondHalfUnknown,
}

/// Why no antibody barcode could be assigned to an R2 sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AntibodyRejection {
    HandlesNotFound,
    WrongLength(usize),
    Unknown,
}

/// Extracts and corrects the cell barcode of an R1 sequence.
///
/// The read is expected to look like
///
/// ```text
/// [first half][linker][second half][start motif][insert...]
///  ^ offset 0          ^ motif - 9  ^ motif
/// ```
///
/// where the linker length varies between beads, so the second half is positioned relative to
/// the start motif rather than to the start of the read.
pub fn parse_cell_barcode(
    seq: &[u8],
    layout: &ReadLayout,
    barcodes: &BarcodeIndex,
) -> Result<CellBarcode, CellRejection> {
    let half = layout.cell_half_len;

    let motif_pos = find_first(seq, layout.r1_start_motif, layout.motif_mismatches)
        .ok_or(CellRejection::MotifNotFound)?;

    if motif_pos < half {
        return Err(CellRejection::MotifTooEarly);
    }

    let first = barcodes
        .lookup(&seq[..half])
        .ok_or(CellRejection::FirstHalfUnknown)?;
    let second = barcodes
        .lookup(&seq[motif_pos - half..motif_pos])
        .ok_or(CellRejection::SecondHalfUnknown)?;

    Ok(CellBarcode {
        first: first.to_string(),
        second: second.to_string(),
    })
}

/// Locates the antibody barcode in an R2 sequence, without checking its length or correcting it.
///
/// Two layouts are tried in order:
/// 1. `[..][5' handle][payload][3' handle B][..]`, if both handles are found and the 3' handle
///    starts after the 5' handle ends.
/// 2. `[payload][3' handle A][..]`
///
/// The first layout that locates a payload is used, even if a later one would give a payload of
/// the right length.
pub fn extract_antibody_payload<'a>(seq: &'a [u8], layout: &ReadLayout) -> Option<&'a [u8]> {
    let tolerance = layout.motif_mismatches;

    let pos_5p = find_first(seq, layout.ab_handle_5p, tolerance);
    let pos_3p_b = find_first(seq, layout.ab_handle_3p_b, tolerance);

    if let (Some(pos_5p), Some(pos_3p_b)) = (pos_5p, pos_3p_b) {
        let start = pos_5p + layout.ab_handle_5p.len();
        if pos_3p_b > start {
            return Some(&seq[start..pos_3p_b]);
        }
    }

    find_first(seq, layout.ab_handle_3p_a, tolerance).map(|pos_3p_a| &seq[..pos_3p_a])
}

/// Extracts and corrects the antibody barcode of an R2 sequence.
pub fn parse_antibody<'a>(
    seq: &[u8],
    layout: &ReadLayout,
    antibodies: &'a BarcodeIndex,
) -> Result<&'a str, AntibodyRejection> {
    let payload =
        extract_antibody_payload(seq, layout).ok_or(AntibodyRejection::HandlesNotFound)?;

    if payload.len() != layout.antibody_len {
        return Err(AntibodyRejection::WrongLength(payload.len()));
    }

    antibodies.lookup(payload).ok_or(AntibodyRejection::Unknown)
}
