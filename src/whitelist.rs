use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use itertools::Itertools;
use thiserror::Error;

/// Symbols a sequenced base can take. Every single-substitution neighbor of a canonical
/// barcode is built over this alphabet, so an `N` call at one position is still corrected.
pub const BARCODE_ALPHABET: [u8; 5] = [b'A', b'C', b'G', b'T', b'N'];

/// What to do when two canonical barcodes share a single-substitution neighbor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Refuse to build the index.
    #[default]
    Reject,
    /// Keep whichever canonical barcode claimed the neighbor first. A canonical barcode always
    /// maps to itself, even if it is also a neighbor of an earlier barcode.
    KeepFirst,
}

/// Maps observed, possibly noisy barcodes back to the canonical barcode they were sequenced from.
///
/// Every barcode within Hamming distance 1 of a canonical barcode is precomputed at construction,
/// so that a query is a single hash table lookup.
#[derive(Debug)]
pub struct BarcodeIndex {
    canonical: Vec<String>,
    noisy_to_canonical: HashMap<Vec<u8>, usize>,
    barcode_len: usize,
    ambiguous: usize,
}

impl BarcodeIndex {
    /// Builds an index from an ordered list of canonical barcodes.
    ///
    /// Barcodes repeated in the list are only indexed once.
    ///
    /// # Errors
    ///
    /// * `WhitelistError::Empty` if there are no barcodes.
    /// * `WhitelistError::EmptyBarcode` / `WhitelistError::InconsistentLength` if the barcodes
    ///   are not all of the same, non-zero length.
    /// * `WhitelistError::Collision` if two barcodes are within distance 2 of each other and the
    ///   policy is `CollisionPolicy::Reject`.
    pub fn build<I, S>(barcodes: I, policy: CollisionPolicy) -> Result<Self, WhitelistError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = BarcodeIndex {
            canonical: Vec::new(),
            noisy_to_canonical: HashMap::new(),
            barcode_len: 0,
            ambiguous: 0,
        };

        // first, claim the canonical barcodes themselves so that no neighbor can shadow them
        let mut seen = HashMap::new();
        for (row, bc) in barcodes.into_iter().enumerate() {
            let bc: String = bc.into();

            if bc.is_empty() {
                return Err(WhitelistError::EmptyBarcode { row: row + 1 });
            }
            if index.canonical.is_empty() {
                index.barcode_len = bc.len();
            } else if bc.len() != index.barcode_len {
                return Err(WhitelistError::InconsistentLength {
                    len: bc.len(),
                    barcode: bc,
                    expected: index.barcode_len,
                });
            }

            if let Entry::Vacant(e) = seen.entry(bc.clone().into_bytes()) {
                e.insert(index.canonical.len());
                index.canonical.push(bc);
            }
        }

        if index.canonical.is_empty() {
            return Err(WhitelistError::Empty);
        }
        index.noisy_to_canonical = seen;

        let mut ambiguous = HashSet::new();
        for idx in 0..index.canonical.len() {
            index.add_hamming_neighbors(idx, policy, &mut ambiguous)?;
        }
        index.ambiguous = ambiguous.len();

        if index.ambiguous > 0 {
            warn!(
                "{} barcodes are one substitution away from more than one whitelist entry; \
                 they were assigned to the first entry",
                index.ambiguous
            );
        }

        Ok(index)
    }

    /// Builds an index from the first column of a comma-delimited whitelist file.
    pub fn from_path(path: impl AsRef<Path>, policy: CollisionPolicy) -> Result<Self, WhitelistError> {
        let rows = read_whitelist(path)?;
        Self::build(rows.into_iter().map(|r| r.barcode), policy)
    }

    /// Inserts every single-substitution variant of the canonical barcode at `idx`. Under
    /// `CollisionPolicy::KeepFirst`, variants already claimed by another barcode are collected
    /// into `ambiguous`, unless they are canonical barcodes themselves.
    fn add_hamming_neighbors(
        &mut self,
        idx: usize,
        policy: CollisionPolicy,
        ambiguous: &mut HashSet<Vec<u8>>,
    ) -> Result<(), WhitelistError> {
        let bc = self.canonical[idx].as_bytes().to_vec();

        for i in 0..bc.len() {
            for &base in BARCODE_ALPHABET.iter() {
                if base == bc[i] {
                    continue;
                }

                let mut neighbor = bc.clone();
                neighbor[i] = base;

                match self.noisy_to_canonical.entry(neighbor) {
                    Entry::Vacant(e) => {
                        e.insert(idx);
                    }
                    Entry::Occupied(e) if *e.get() != idx => match policy {
                        CollisionPolicy::Reject => {
                            return Err(WhitelistError::Collision {
                                neighbor: String::from_utf8_lossy(e.key()).into_owned(),
                                first: self.canonical[*e.get()].clone(),
                                second: self.canonical[idx].clone(),
                            })
                        }
                        CollisionPolicy::KeepFirst => {
                            if self.canonical[*e.get()].as_bytes() != e.key().as_slice() {
                                ambiguous.insert(e.key().clone());
                            }
                        }
                    },
                    Entry::Occupied(_) => (),
                }
            }
        }

        Ok(())
    }

    /// Returns the canonical barcode that `observed` was most likely sequenced from, or `None`
    /// if it is more than one substitution away from every whitelist entry.
    #[inline]
    pub fn lookup(&self, observed: &[u8]) -> Option<&str> {
        self.noisy_to_canonical
            .get(observed)
            .map(|&idx| self.canonical[idx].as_str())
    }

    /// Whether `barcode` is exactly a whitelist entry.
    #[cfg(test)]
    pub fn contains(&self, barcode: &[u8]) -> bool {
        self.lookup(barcode).is_some_and(|c| c.as_bytes() == barcode)
    }

    /// Number of canonical barcodes.
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    /// Number of observable barcodes that can be corrected, canonical barcodes included.
    pub fn neighborhood_len(&self) -> usize {
        self.noisy_to_canonical.len()
    }

    pub fn barcode_len(&self) -> usize {
        self.barcode_len
    }

    /// Neighbors that were claimed by more than one canonical barcode (always 0 unless built
    /// with `CollisionPolicy::KeepFirst`).
    pub fn ambiguous_neighbors(&self) -> usize {
        self.ambiguous
    }
}

/// One row of a whitelist: `barcode,label`. The label is a cell number for cell whitelists and
/// the antibody name for antibody whitelists.
#[derive(Debug, Clone, PartialEq)]
pub struct WhitelistRow {
    pub barcode: String,
    pub label: String,
}

/// Reads every row of a comma-delimited whitelist file. Blank lines are skipped. The barcode and
/// the label are trimmed of surrounding whitespace; whitespace inside the label is kept.
pub fn read_whitelist(path: impl AsRef<Path>) -> Result<Vec<WhitelistRow>, WhitelistError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| WhitelistError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    parse_whitelist(file).map_err(|e| e.with_path(path))
}

/// Parses whitelist rows from any reader.
pub fn parse_whitelist(src: impl Read) -> Result<Vec<WhitelistRow>, WhitelistError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::None)
        .from_reader(src);

    let mut rows = Vec::new();
    let mut record = StringRecord::new();

    loop {
        match rdr.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => (),
            Err(e) => {
                return Err(WhitelistError::Csv {
                    path: None,
                    source: e,
                })
            }
        }

        if record.len() < 2 {
            return Err(WhitelistError::MalformedRow {
                path: None,
                row: record.position().map_or(rows.len() + 1, |p| p.line() as usize),
                line: record.iter().join(","),
            });
        }

        rows.push(WhitelistRow {
            barcode: record[0].trim().to_string(),
            // names may themselves contain commas, so only the ends of the label are trimmed
            label: record.iter().skip(1).join(",").trim().to_string(),
        });
    }

    Ok(rows)
}

/// Loads the antibody barcode → antibody name map from an antibody whitelist file. If a barcode
/// is listed more than once, the last name wins.
pub fn load_name_map(path: impl AsRef<Path>) -> Result<HashMap<String, String>, WhitelistError> {
    Ok(read_whitelist(path)?
        .into_iter()
        .map(|r| (r.barcode, r.label))
        .collect())
}

#[derive(Error, Debug)]
pub enum WhitelistError {
    #[error("failed to open barcode whitelist {}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse barcode whitelist{}", display_path(path))]
    Csv {
        path: Option<PathBuf>,
        source: csv::Error,
    },

    #[error(
        "malformed barcode whitelist row {row}{}: expected `BARCODE,LABEL`, got `{line}`",
        display_path(path)
    )]
    MalformedRow {
        path: Option<PathBuf>,
        row: usize,
        line: String,
    },

    #[error("barcode whitelist row {row} has an empty barcode")]
    EmptyBarcode { row: usize },

    #[error("barcode {barcode} has length {len}, but the whitelist uses length {expected}")]
    InconsistentLength {
        barcode: String,
        len: usize,
        expected: usize,
    },

    #[error("barcode whitelist is empty")]
    Empty,

    #[error(
        "whitelist barcodes {first} and {second} are less than three substitutions apart \
         (both match {neighbor}), so errors in either cannot be corrected unambiguously
suggestion: pass --allow-collisions to assign such barcodes to the first whitelist entry"
    )]
    Collision {
        neighbor: String,
        first: String,
        second: String,
    },
}

impl WhitelistError {
    fn with_path(self, p: &Path) -> Self {
        match self {
            WhitelistError::Csv { source, .. } => WhitelistError::Csv {
                path: Some(p.to_path_buf()),
                source,
            },
            WhitelistError::MalformedRow { row, line, .. } => WhitelistError::MalformedRow {
                path: Some(p.to_path_buf()),
                row,
                line,
            },
            e => e,
        }
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" {}", p.display()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // pairwise Hamming distance >= 3
    const CELL_BCS: [&str; 3] = ["TAGACCATG", "TGAACGGTT", "CCTTGAACA"];

    fn index() -> BarcodeIndex {
        BarcodeIndex::build(CELL_BCS, CollisionPolicy::Reject).unwrap()
    }

    #[test]
    fn canonical_maps_to_itself() {
        let idx = index();
        for bc in CELL_BCS {
            assert_eq!(idx.lookup(bc.as_bytes()), Some(bc));
            assert!(idx.contains(bc.as_bytes()));
        }
    }

    #[test]
    fn every_single_substitution_is_corrected() {
        let idx = index();
        for bc in CELL_BCS {
            for i in 0..bc.len() {
                for &base in BARCODE_ALPHABET.iter() {
                    let mut variant = bc.as_bytes().to_vec();
                    variant[i] = base;
                    assert_eq!(idx.lookup(&variant), Some(bc), "{}", String::from_utf8_lossy(&variant));
                }
            }
        }
    }

    #[test]
    fn noisy_barcode_is_not_contained() {
        let idx = index();
        assert!(!idx.contains(b"TNGACCATG"));
        assert_eq!(idx.lookup(b"TNGACCATG"), Some("TAGACCATG"));
    }

    #[test]
    fn two_substitutions_are_not_corrected() {
        let idx = index();
        assert_eq!(idx.lookup(b"TNNACCATG"), None);
        assert_eq!(idx.lookup(b"AAAAAAAAA"), None);
        assert_eq!(idx.lookup(b"TAGACCAT"), None);
    }

    #[test]
    fn sizes() {
        let idx = index();
        assert_eq!(idx.len(), 3);
        assert_eq!(idx.barcode_len(), 9);
        // identity + 4 alternatives at each of 9 positions
        assert_eq!(idx.neighborhood_len(), 3 * (1 + 9 * 4));
        assert_eq!(idx.ambiguous_neighbors(), 0);
    }

    #[test]
    fn duplicates_are_indexed_once() {
        let idx = BarcodeIndex::build(["ACGTA", "ACGTA"], CollisionPolicy::Reject).unwrap();
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.neighborhood_len(), 1 + 5 * 4);
    }

    #[test]
    fn collision_is_rejected() {
        // distance 2: ACGTA and ACGGG share the neighbor ACGTG / ACGGA
        let err = BarcodeIndex::build(["ACGTA", "ACGGG"], CollisionPolicy::Reject).unwrap_err();
        assert!(matches!(err, WhitelistError::Collision { .. }));
    }

    #[test]
    fn adjacent_canonical_is_rejected() {
        let err = BarcodeIndex::build(["ACGTA", "ACGTC"], CollisionPolicy::Reject).unwrap_err();
        match err {
            WhitelistError::Collision { first, second, .. } => {
                assert_eq!(first, "ACGTC");
                assert_eq!(second, "ACGTA");
            }
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn collision_keep_first() {
        let idx = BarcodeIndex::build(["ACGTA", "ACGGG"], CollisionPolicy::KeepFirst).unwrap();
        assert_eq!(idx.lookup(b"ACGTG"), Some("ACGTA"));
        assert_eq!(idx.lookup(b"ACGGA"), Some("ACGTA"));
        assert_eq!(idx.ambiguous_neighbors(), 2);
    }

    #[test]
    fn canonical_beats_neighbor_under_keep_first() {
        let idx = BarcodeIndex::build(["ACGTA", "ACGTC"], CollisionPolicy::KeepFirst).unwrap();
        assert_eq!(idx.lookup(b"ACGTA"), Some("ACGTA"));
        assert_eq!(idx.lookup(b"ACGTC"), Some("ACGTC"));
        assert_eq!(idx.lookup(b"ACGTN"), Some("ACGTA"));
    }

    #[test]
    fn ambiguous_neighbors_are_counted_once() {
        // adjacent barcodes share TAGACCATA, TAGACCATT and TAGACCATN; each one also neighbors the
        // other, but both still map to themselves
        let idx =
            BarcodeIndex::build(["TAGACCATG", "TAGACCATC"], CollisionPolicy::KeepFirst).unwrap();
        assert_eq!(idx.ambiguous_neighbors(), 3);
        assert_eq!(idx.lookup(b"TAGACCATC"), Some("TAGACCATC"));
        assert_eq!(idx.lookup(b"TAGACCATT"), Some("TAGACCATG"));
        assert_eq!(idx.neighborhood_len(), 8 * 4 * 2 + 5);
    }

    #[test]
    fn empty_whitelist() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            BarcodeIndex::build(empty, CollisionPolicy::Reject),
            Err(WhitelistError::Empty)
        ));
    }

    #[test]
    fn inconsistent_length() {
        assert!(matches!(
            BarcodeIndex::build(["ACGTA", "ACGT"], CollisionPolicy::Reject),
            Err(WhitelistError::InconsistentLength { len: 4, expected: 5, .. })
        ));
    }

    #[test]
    fn parse_rows() {
        let src = "TAGACCATG,1\n\nTGAACGGTT , 2 \r\nCCGTGTTCCTCATTA,CD71\n";
        let rows = parse_whitelist(src.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].barcode, "TGAACGGTT");
        assert_eq!(rows[1].label, "2");
        assert_eq!(rows[2].label, "CD71");
    }

    #[test]
    fn label_keeps_inner_whitespace() {
        let src = "CCGTGTTCCTCATTA, CD45, RA \nAAGTATCGTTTCGCA,HLA-A,B,C\n";
        let rows = parse_whitelist(src.as_bytes()).unwrap();
        assert_eq!(rows[0].barcode, "CCGTGTTCCTCATTA");
        assert_eq!(rows[0].label, "CD45, RA");
        assert_eq!(rows[1].label, "HLA-A,B,C");
    }

    #[test]
    fn row_without_delimiter() {
        let src = "TAGACCATG,1\nTGAACGGTT\n";
        match parse_whitelist(src.as_bytes()).unwrap_err() {
            WhitelistError::MalformedRow { row, line, .. } => {
                assert_eq!(row, 2);
                assert_eq!(line, "TGAACGGTT");
            }
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            read_whitelist("whitelist_which_does_not_exist.csv"),
            Err(WhitelistError::Open { .. })
        ));
    }

    #[test]
    fn name_map_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("antibodies.csv");
        std::fs::write(&path, "CCGTGTTCCTCATTA,CD71\nAAGTATCGTTTCGCA,CD3\n").unwrap();

        let names = load_name_map(&path).unwrap();
        assert_eq!(names.get("CCGTGTTCCTCATTA").map(String::as_str), Some("CD71"));
        assert_eq!(names.len(), 2);

        let idx = BarcodeIndex::from_path(&path, CollisionPolicy::Reject).unwrap();
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.barcode_len(), 15);
    }
}
