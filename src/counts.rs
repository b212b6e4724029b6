use indexmap::IndexMap;

use crate::extract::CellBarcode;

/// Read counts for every (cell, antibody) combination seen so far.
///
/// Cells, and antibodies within a cell, iterate in the order they were first recorded.
#[derive(Default, Debug)]
pub struct CountTable {
    by_cell: IndexMap<CellBarcode, IndexMap<String, usize>>,
    total: usize,
}

impl CountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one read pair to the count of `antibody` in `cell`.
    pub fn record(&mut self, cell: CellBarcode, antibody: &str) {
        let antibodies = self.by_cell.entry(cell).or_default();

        // avoid allocating a new key for the common case of an antibody already seen in this cell
        match antibodies.get_mut(antibody) {
            Some(count) => *count += 1,
            None => {
                antibodies.insert(antibody.to_string(), 1);
            }
        }

        self.total += 1;
    }

    /// The number of read pairs recorded.
    pub fn total(&self) -> usize {
        self.total
    }

    /// The number of distinct cells.
    pub fn cells(&self) -> usize {
        self.by_cell.len()
    }

    /// The count for one antibody in one cell, where `cell_id` is formatted as `FIRST_SECOND`.
    #[cfg(test)]
    pub fn get(&self, cell_id: &str, antibody: &str) -> usize {
        let Some((first, second)) = cell_id.split_once('_') else {
            return 0;
        };
        let cell = CellBarcode {
            first: first.to_string(),
            second: second.to_string(),
        };

        self.by_cell
            .get(&cell)
            .and_then(|antibodies| antibodies.get(antibody))
            .copied()
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellBarcode, &IndexMap<String, usize>)> {
        self.by_cell.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(first: &str, second: &str) -> CellBarcode {
        CellBarcode {
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    #[test]
    fn counts_accumulate() {
        let mut table = CountTable::new();
        let a = cell("TAGACCATG", "TGAACGGTT");
        let b = cell("CCTTGAACA", "TAGACCATG");

        table.record(a.clone(), "CCGTGTTCCTCATTA");
        table.record(a.clone(), "CCGTGTTCCTCATTA");
        table.record(a.clone(), "AAGTATCGTTTCGCA");
        table.record(b.clone(), "CCGTGTTCCTCATTA");

        assert_eq!(table.total(), 4);
        assert_eq!(table.cells(), 2);
        assert_eq!(table.get("TAGACCATG_TGAACGGTT", "CCGTGTTCCTCATTA"), 2);
        assert_eq!(table.get("TAGACCATG_TGAACGGTT", "AAGTATCGTTTCGCA"), 1);
        assert_eq!(table.get("CCTTGAACA_TAGACCATG", "CCGTGTTCCTCATTA"), 1);
    }

    #[test]
    fn missing_entries_are_zero() {
        let mut table = CountTable::new();
        table.record(cell("TAGACCATG", "TGAACGGTT"), "CCGTGTTCCTCATTA");

        assert_eq!(table.get("TAGACCATG_TGAACGGTT", "AAGTATCGTTTCGCA"), 0);
        assert_eq!(table.get("TGAACGGTT_TAGACCATG", "CCGTGTTCCTCATTA"), 0);
        assert_eq!(table.get("not a cell", "CCGTGTTCCTCATTA"), 0);
    }

    #[test]
    fn halves_are_ordered() {
        let mut table = CountTable::new();
        table.record(cell("TAGACCATG", "TGAACGGTT"), "CCGTGTTCCTCATTA");
        table.record(cell("TGAACGGTT", "TAGACCATG"), "CCGTGTTCCTCATTA");
        assert_eq!(table.cells(), 2);
    }

    #[test]
    fn iterates_in_first_seen_order() {
        let mut table = CountTable::new();
        table.record(cell("CCTTGAACA", "CCTTGAACA"), "B");
        table.record(cell("TAGACCATG", "TGAACGGTT"), "A");
        table.record(cell("CCTTGAACA", "CCTTGAACA"), "A");
        table.record(cell("CCTTGAACA", "CCTTGAACA"), "B");

        let flat = table
            .iter()
            .flat_map(|(cell, abs)| abs.iter().map(move |(ab, n)| (cell.to_string(), ab.clone(), *n)))
            .collect::<Vec<_>>();

        assert_eq!(
            flat,
            vec![
                ("CCTTGAACA_CCTTGAACA".to_string(), "B".to_string(), 2),
                ("CCTTGAACA_CCTTGAACA".to_string(), "A".to_string(), 1),
                ("TAGACCATG_TGAACGGTT".to_string(), "A".to_string(), 1),
            ]
        );
    }

    #[test]
    fn total_is_sum_of_counts() {
        let mut table = CountTable::new();
        let cells = [cell("TAGACCATG", "TGAACGGTT"), cell("CCTTGAACA", "TAGACCATG")];
        let abs = ["CCGTGTTCCTCATTA", "AAGTATCGTTTCGCA", "GGGGGGGGGGGGGGG"];

        for i in 0..100 {
            table.record(cells[i % 2].clone(), abs[i % 3]);
        }

        let sum: usize = table.iter().flat_map(|(_, abs)| abs.values()).sum();
        assert_eq!(sum, 100);
        assert_eq!(table.total(), 100);
    }
}
