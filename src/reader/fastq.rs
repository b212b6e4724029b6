use std::io::Read;

use needletail::errors::{ParseError, ParseErrorKind};
use needletail::FastxReader;
use thiserror::Error;

/// One FASTQ record. The header is stored without its leading `@`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub header: Vec<u8>,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}

impl Record {
    /// The part of the header shared by both mates of a pair: everything before the first
    /// whitespace. For an Illumina header such as
    ///
    /// ```text
    /// @LH00266:77:222WGNLT4:1:1101:47563:1028 1:N:0:GNAAGATC+AGTCGAAN
    /// ```
    ///
    /// this is `LH00266:77:222WGNLT4:1:1101:47563:1028`, while the read number after the space
    /// differs between R1 and R2.
    pub fn core_header(&self) -> &[u8] {
        match self.header.iter().position(u8::is_ascii_whitespace) {
            Some(i) => &self.header[..i],
            None => &self.header,
        }
    }
}

/// What is structurally wrong with a FASTQ record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatIssue {
    #[error("header line does not start with '@'")]
    MissingHeaderMarker,

    #[error("separator line does not start with '+'")]
    MissingSeparatorMarker,

    #[error("sequence and quality have different lengths")]
    LengthMismatch,

    #[error("file ends in the middle of a record")]
    Truncated,
}

#[derive(Debug)]
pub(super) enum RecordError {
    Format { line: u64, issue: FormatIssue },
    Io(std::io::Error),
}

impl From<ParseError> for RecordError {
    fn from(e: ParseError) -> Self {
        let issue = match e.kind {
            ParseErrorKind::InvalidStart => FormatIssue::MissingHeaderMarker,
            ParseErrorKind::InvalidSeparator => FormatIssue::MissingSeparatorMarker,
            ParseErrorKind::UnequalLengths => FormatIssue::LengthMismatch,
            ParseErrorKind::UnexpectedEnd => FormatIssue::Truncated,
            _ => return RecordError::Io(std::io::Error::other(e.to_string())),
        };

        RecordError::Format {
            line: e.position.line,
            issue,
        }
    }
}

/// Reads validated FASTQ records from a single stream.
pub(super) struct FastqReader<R: Read + Send> {
    inner: needletail::parser::FastqReader<R>,
}

impl<R: Read + Send> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: needletail::parser::FastqReader::new(reader),
        }
    }

    /// Reads the next record.
    ///
    /// # Returns
    ///
    /// `Ok(None)` if the stream ends cleanly before a new record starts.
    pub fn read_record(&mut self) -> Result<Option<Record>, RecordError> {
        let Some(rec) = self.inner.next() else {
            return Ok(None);
        };
        let rec = rec?;

        Ok(Some(Record {
            header: rec.id().to_vec(),
            seq: rec.raw_seq().to_vec(),
            qual: rec.qual().unwrap_or_default().to_vec(),
        }))
    }
}
