use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::extract::{AntibodyRejection, CellRejection};

/// Statistics about one `count` run, logged at the end and optionally saved as JSON.
#[derive(Serialize, Deserialize, Default, Debug)]
pub struct RunMetadata {
    pub dabcount_version: String,
    pub r1_path: String,
    pub r2_path: String,
    pub cell_whitelist: String,
    pub antibody_whitelist: String,
    pub run_date: String,
    pub elapsed: f64,
    pub pair_count: usize,
    pub valid_cell_count: usize,
    pub valid_antibody_count: usize,
    pub both_valid_count: usize,
    pub cell_rejections: CellRejectionTally,
    pub antibody_rejections: AntibodyRejectionTally,
    pub distinct_cells: usize,
    pub rows_written: usize,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq)]
pub struct CellRejectionTally {
    pub motif_not_found: usize,
    pub motif_too_early: usize,
    pub first_half_unknown: usize,
    pub second_half_unknown: usize,
}

impl CellRejectionTally {
    pub fn add(&mut self, reason: CellRejection) {
        let n = match reason {
            CellRejection::MotifNotFound => &mut self.motif_not_found,
            CellRejection::MotifTooEarly => &mut self.motif_too_early,
            CellRejection::FirstHalfUnknown => &mut self.first_half_unknown,
            CellRejection::SecondHalfUnknown => &mut self.second_half_unknown,
        };
        *n += 1;
    }

    pub fn total(&self) -> usize {
        self.motif_not_found + self.motif_too_early + self.first_half_unknown + self.second_half_unknown
    }
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq)]
pub struct AntibodyRejectionTally {
    pub handles_not_found: usize,
    /// payload length => number of pairs
    pub wrong_length: BTreeMap<usize, usize>,
    pub unknown: usize,
}

impl AntibodyRejectionTally {
    pub fn add(&mut self, reason: AntibodyRejection) {
        match reason {
            AntibodyRejection::HandlesNotFound => self.handles_not_found += 1,
            AntibodyRejection::WrongLength(len) => *self.wrong_length.entry(len).or_insert(0) += 1,
            AntibodyRejection::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.handles_not_found + self.wrong_length.values().sum::<usize>() + self.unknown
    }
}
