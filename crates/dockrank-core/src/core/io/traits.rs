use super::ParseFailure;
use crate::core::models::record::{MoleculeRecord, MoleculeRole};
use std::io::{self, BufRead};

/// A source line together with its 1-based line number.
pub type SourceLine = (usize, String);

/// Line-oriented view over a buffered reader with one line of lookahead.
///
/// Formats whose records are introduced by a header line (MOL2) need to see the
/// next header without consuming it; [`LineSource::peek_line`] provides that.
///
/// Lines that are not valid UTF-8 are decoded lossily and their numbers are
/// remembered, so the record containing them can be failed on its own instead
/// of ending the whole input.
#[derive(Debug)]
pub struct LineSource<R> {
    reader: R,
    line_no: usize,
    peeked: Option<SourceLine>,
    buf: Vec<u8>,
    invalid_lines: Vec<usize>,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            peeked: None,
            buf: Vec::new(),
            invalid_lines: Vec::new(),
        }
    }

    /// Returns the next line with trailing line terminators removed.
    pub fn next_line(&mut self) -> io::Result<Option<SourceLine>> {
        if let Some(line) = self.peeked.take() {
            return Ok(Some(line));
        }
        self.read_physical_line()
    }

    pub fn peek_line(&mut self) -> io::Result<Option<&SourceLine>> {
        if self.peeked.is_none() {
            self.peeked = self.read_physical_line()?;
        }
        Ok(self.peeked.as_ref())
    }

    /// Number of physical lines consumed from the reader so far.
    pub fn lines_read(&self) -> usize {
        self.line_no
    }

    /// Returns the first line of `block` that was not valid UTF-8, and forgets
    /// every recorded line up to the end of the block.
    pub fn take_invalid_line(&mut self, block: &[SourceLine]) -> Option<usize> {
        let last = block.last()?.0;
        let found = block
            .iter()
            .map(|(ln, _)| *ln)
            .find(|ln| self.invalid_lines.contains(ln));
        self.invalid_lines.retain(|&ln| ln > last);
        found
    }

    fn read_physical_line(&mut self) -> io::Result<Option<SourceLine>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        let content = match std::str::from_utf8(&self.buf) {
            Ok(text) => text.trim_end_matches(['\n', '\r']).to_string(),
            Err(_) => {
                self.invalid_lines.push(self.line_no);
                String::from_utf8_lossy(&self.buf)
                    .trim_end_matches(['\n', '\r'])
                    .to_string()
            }
        };
        Ok(Some((self.line_no, content)))
    }
}

/// Defines how a structure format is split into records and how one record is parsed.
///
/// Splitting and parsing are deliberately separate: `read_block` only looks for
/// record delimiters, so a record with broken content never affects where the
/// next record starts.
pub trait RecordFormat {
    /// Collects the raw lines of the next record.
    ///
    /// # Return
    ///
    /// Returns `Ok(None)` once the input holds no further records.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures of the underlying reader.
    fn read_block<R: BufRead>(source: &mut LineSource<R>) -> io::Result<Option<Vec<SourceLine>>>;

    /// Parses one block previously returned by [`RecordFormat::read_block`].
    ///
    /// # Errors
    ///
    /// Returns a [`ParseFailure`] describing the first problem found in the block.
    fn parse_block(block: &[SourceLine], role: MoleculeRole)
    -> Result<MoleculeRecord, ParseFailure>;
}

/// Returns the trimmed text in the byte range `start..end`, or `""` when the line is shorter.
pub(crate) fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    line.get(start..end).unwrap_or("").trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn line_source_strips_terminators_and_counts_lines() {
        let mut source = LineSource::new(Cursor::new("first\r\nsecond\nthird"));
        assert_eq!(source.next_line().unwrap(), Some((1, "first".to_string())));
        assert_eq!(source.next_line().unwrap(), Some((2, "second".to_string())));
        assert_eq!(source.next_line().unwrap(), Some((3, "third".to_string())));
        assert_eq!(source.next_line().unwrap(), None);
        assert_eq!(source.lines_read(), 3);
    }

    #[test]
    fn peek_does_not_consume_the_line() {
        let mut source = LineSource::new(Cursor::new("a\nb\n"));
        assert_eq!(source.peek_line().unwrap(), Some(&(1, "a".to_string())));
        assert_eq!(source.peek_line().unwrap(), Some(&(1, "a".to_string())));
        assert_eq!(source.next_line().unwrap(), Some((1, "a".to_string())));
        assert_eq!(source.next_line().unwrap(), Some((2, "b".to_string())));
    }

    #[test]
    fn invalid_utf8_is_decoded_and_remembered_per_line() {
        let mut source = LineSource::new(Cursor::new(b"ok\ncaf\xe9\nok again\n".to_vec()));
        let block: Vec<SourceLine> = (0..3)
            .map(|_| source.next_line().unwrap().unwrap())
            .collect();
        assert_eq!(block[1], (2, "caf\u{FFFD}".to_string()));
        assert_eq!(source.take_invalid_line(&block[..1]), None);
        assert_eq!(source.take_invalid_line(&block), Some(2));
        assert_eq!(source.take_invalid_line(&block), None);
    }

    #[test]
    fn slice_and_trim_tolerates_short_lines() {
        assert_eq!(slice_and_trim("ATOM   12", 6, 11), "12");
        assert_eq!(slice_and_trim("ATOM", 6, 11), "");
        assert_eq!(slice_and_trim("  x  ", 0, 100), "x");
    }
}
