mod fastq;

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use self::fastq::{FormatIssue, Record};

use self::fastq::{FastqReader, RecordError};

/// A decompressed FASTQ stream, whatever its on-disk compression.
pub type GenericReader = Box<dyn Read + Send>;

/// Which file of a pair a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mate {
    R1,
    R2,
}

impl fmt::Display for Mate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mate::R1 => f.write_str("R1"),
            Mate::R2 => f.write_str("R2"),
        }
    }
}

/// The two mates of one sequenced fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPair {
    pub r1: Record,
    pub r2: Record,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Ready,
    EndOfFile,
    /// A previous read failed; the streams can no longer be trusted to be aligned.
    Failed,
}

/// How R1 and R2 disagree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncIssue {
    #[error("R2 ended before R1")]
    Mate2Exhausted,

    #[error("R1 ended before R2")]
    Mate2Longer,

    #[error("R1 header `{r1}` does not match R2 header `{r2}`")]
    HeaderMismatch { r1: String, r2: String },
}

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("could not open {mate} file {}", path.display())]
    Open {
        mate: Mate,
        path: PathBuf,
        source: niffler::Error,
    },

    #[error("could not read {mate} file")]
    Io {
        mate: Mate,
        source: std::io::Error,
    },

    #[error("malformed {mate} record at line {line}: {issue}")]
    Format {
        mate: Mate,
        line: u64,
        issue: FormatIssue,
    },

    #[error("R1 and R2 are out of sync at pair {pair}: {issue}")]
    Sync { pair: u64, issue: SyncIssue },

    #[error("cannot continue reading after an earlier error")]
    Failed,
}

impl ReadError {
    fn from_record_error(e: RecordError, mate: Mate) -> Self {
        match e {
            RecordError::Format { line, issue } => ReadError::Format { mate, line, issue },
            RecordError::Io(source) => ReadError::Io { mate, source },
        }
    }
}

/// Reads R1 and R2 in lockstep, checking that every record is well formed and that the two
/// files describe the same fragments in the same order.
///
/// Any error leaves the reader in `ReaderState::Failed`: a corrupt or desynchronised stream
/// position cannot be recovered from, so every later call fails too.
pub struct PairedRecordReader<R: Read + Send> {
    r1: FastqReader<R>,
    r2: FastqReader<R>,
    state: ReaderState,
    pairs: u64,
}

impl PairedRecordReader<GenericReader> {
    /// Opens a pair of FASTQ files. Compressed files are decompressed transparently.
    pub fn from_paths(r1: impl AsRef<Path>, r2: impl AsRef<Path>) -> Result<Self, ReadError> {
        Ok(Self::new(
            open_fastq(r1.as_ref(), Mate::R1)?,
            open_fastq(r2.as_ref(), Mate::R2)?,
        ))
    }
}

impl<R: Read + Send> PairedRecordReader<R> {
    pub fn new(r1: R, r2: R) -> Self {
        Self {
            r1: FastqReader::new(r1),
            r2: FastqReader::new(r2),
            state: ReaderState::Ready,
            pairs: 0,
        }
    }

    /// Reads the next pair.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(pair))` if both mates were read and their headers agree.
    /// * `Ok(None)` once both files are exhausted.
    ///
    /// # Errors
    ///
    /// * `ReadError::Format` / `ReadError::Io` if either file cannot be parsed or read.
    /// * `ReadError::Sync` if one file ends before the other, or the header cores differ.
    /// * `ReadError::Failed` if any earlier call failed.
    pub fn next_pair(&mut self) -> Result<Option<ReadPair>, ReadError> {
        match self.state {
            ReaderState::Failed => return Err(ReadError::Failed),
            ReaderState::EndOfFile => return Ok(None),
            ReaderState::Ready => (),
        }

        let result = self.read_pair();
        match result {
            Ok(Some(_)) => self.pairs += 1,
            Ok(None) => self.state = ReaderState::EndOfFile,
            Err(_) => self.state = ReaderState::Failed,
        }
        result
    }

    fn read_pair(&mut self) -> Result<Option<ReadPair>, ReadError> {
        let pair = self.pairs + 1;

        let Some(r1) = self
            .r1
            .read_record()
            .map_err(|e| ReadError::from_record_error(e, Mate::R1))?
        else {
            // R1 is done, so R2 must be too
            return match self.read_r2()? {
                Some(_) => Err(ReadError::Sync {
                    pair,
                    issue: SyncIssue::Mate2Longer,
                }),
                None => Ok(None),
            };
        };

        let Some(r2) = self.read_r2()? else {
            return Err(ReadError::Sync {
                pair,
                issue: SyncIssue::Mate2Exhausted,
            });
        };

        if r1.core_header() != r2.core_header() {
            return Err(ReadError::Sync {
                pair,
                issue: SyncIssue::HeaderMismatch {
                    r1: String::from_utf8_lossy(&r1.header).into_owned(),
                    r2: String::from_utf8_lossy(&r2.header).into_owned(),
                },
            });
        }

        Ok(Some(ReadPair { r1, r2 }))
    }

    fn read_r2(&mut self) -> Result<Option<Record>, ReadError> {
        self.r2
            .read_record()
            .map_err(|e| ReadError::from_record_error(e, Mate::R2))
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Number of pairs successfully read so far.
    pub fn pairs_read(&self) -> u64 {
        self.pairs
    }
}

/// Iterates over pairs until both files are exhausted. Iteration stops after yielding the first
/// error.
impl<R: Read + Send> Iterator for PairedRecordReader<R> {
    type Item = Result<ReadPair, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == ReaderState::Failed {
            return None;
        }
        self.next_pair().transpose()
    }
}

fn open_fastq(path: &Path, mate: Mate) -> Result<GenericReader, ReadError> {
    let (reader, compression) = niffler::send::from_path(path).map_err(|source| ReadError::Open {
        mate,
        path: path.to_path_buf(),
        source,
    })?;

    debug!(
        "Opened {} file {} with compression {:?}",
        mate,
        path.display(),
        compression
    );
    Ok(reader)
}
