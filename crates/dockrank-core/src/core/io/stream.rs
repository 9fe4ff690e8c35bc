use super::mol2::Mol2Format;
use super::pdb::{PdbFormat, PdbqtFormat};
use super::sdf::SdfFormat;
use super::traits::{LineSource, RecordFormat, SourceLine};
use super::{ParseFailure, RecordError, StructureFormat};
use crate::core::models::record::{MoleculeRecord, MoleculeRole};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::iter::FusedIterator;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    /// One record was malformed; the stream continues with the next record.
    #[error(transparent)]
    Record(#[from] RecordError),
    /// The underlying reader failed; the stream ends after yielding this error.
    #[error("I/O error after {records_read} records: {source}")]
    Io {
        records_read: usize,
        #[source]
        source: io::Error,
    },
}

impl StreamError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StreamError::Io { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Active,
    Exhausted,
}

/// A lazy, finite sequence of records read from one byte source.
///
/// Each item is either a parsed record or the failure of that one record; a
/// failure never ends the sequence. An I/O error from the reader is yielded once
/// and then the stream is exhausted. An exhausted stream cannot be restarted:
/// reading the source again requires a new stream.
#[derive(Debug)]
pub struct MoleculeStream<R> {
    source: LineSource<R>,
    format: StructureFormat,
    role: MoleculeRole,
    records_read: usize,
    state: StreamState,
}

impl<R: BufRead> MoleculeStream<R> {
    pub fn new(reader: R, format: StructureFormat, role: MoleculeRole) -> Self {
        Self {
            source: LineSource::new(reader),
            format,
            role,
            records_read: 0,
            state: StreamState::Active,
        }
    }

    pub fn format(&self) -> StructureFormat {
        self.format
    }

    pub fn role(&self) -> MoleculeRole {
        self.role
    }

    /// Number of records (parsed or failed) yielded so far.
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == StreamState::Exhausted
    }

    fn read_block(&mut self) -> io::Result<Option<Vec<SourceLine>>> {
        match self.format {
            StructureFormat::Sdf => SdfFormat::read_block(&mut self.source),
            StructureFormat::Mol2 => Mol2Format::read_block(&mut self.source),
            StructureFormat::Pdb => PdbFormat::read_block(&mut self.source),
            StructureFormat::Pdbqt => PdbqtFormat::read_block(&mut self.source),
        }
    }

    fn parse_block(&self, block: &[SourceLine]) -> Result<MoleculeRecord, ParseFailure> {
        match self.format {
            StructureFormat::Sdf => SdfFormat::parse_block(block, self.role),
            StructureFormat::Mol2 => Mol2Format::parse_block(block, self.role),
            StructureFormat::Pdb => PdbFormat::parse_block(block, self.role),
            StructureFormat::Pdbqt => PdbqtFormat::parse_block(block, self.role),
        }
    }
}

impl MoleculeStream<BufReader<File>> {
    /// Opens a file as a record stream.
    ///
    /// # Errors
    ///
    /// Returns the error from opening the file.
    pub fn open(
        path: impl AsRef<Path>,
        format: StructureFormat,
        role: MoleculeRole,
    ) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), format, role))
    }
}

impl<R: BufRead> Iterator for MoleculeStream<R> {
    type Item = Result<MoleculeRecord, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == StreamState::Exhausted {
            return None;
        }
        match self.read_block() {
            Ok(Some(block)) => {
                let record = self.records_read;
                self.records_read += 1;
                let parsed = match self.source.take_invalid_line(&block) {
                    Some(line) => Err(ParseFailure::syntax(line, "line is not valid UTF-8")),
                    None => self.parse_block(&block),
                };
                Some(parsed.map_err(|failure| RecordError { record, failure }.into()))
            }
            Ok(None) => {
                self.state = StreamState::Exhausted;
                None
            }
            Err(source) => {
                self.state = StreamState::Exhausted;
                Some(Err(StreamError::Io {
                    records_read: self.records_read,
                    source,
                }))
            }
        }
    }
}

impl<R: BufRead> FusedIterator for MoleculeStream<R> {}
