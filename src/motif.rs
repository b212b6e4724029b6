/// Finds the leftmost offset at which `motif` occurs in `seq` with at most `max_mismatches`
/// substitutions.
///
/// Offsets are scanned left to right and the first one within tolerance is returned, even if a
/// later offset would match with fewer mismatches. Downstream barcode positions are derived from
/// this offset, so changing the tie-break changes which reads are assigned where.
///
/// # Returns
///
/// `None` if the motif is empty, longer than the sequence, or matches nowhere.
pub fn find_first(seq: &[u8], motif: &[u8], max_mismatches: usize) -> Option<usize> {
    if motif.is_empty() || motif.len() > seq.len() {
        return None;
    }

    (0..=seq.len() - motif.len()).find(|&start| {
        within_mismatches(&seq[start..start + motif.len()], motif, max_mismatches)
    })
}

/// Compares two equal-length slices position by position, giving up as soon as the number of
/// mismatches exceeds `max_mismatches`.
#[inline(always)]
fn within_mismatches(window: &[u8], motif: &[u8], max_mismatches: usize) -> bool {
    let mut mismatches = 0;
    for (a, b) in window.iter().zip(motif) {
        if a != b {
            mismatches += 1;
            if mismatches > max_mismatches {
                return false;
            }
        }
    }
    true
}
