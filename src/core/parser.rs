use crate::core::backpressure::Pausable;
use crate::domain::model::RawRow;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ImportError, Result};
use std::io::{self, Read};

const QUOTE: u8 = b'"';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    /// A quote inside a quoted field: either its end or the first half of `""`.
    QuoteInQuoted,
}

/// Follows the quoting of the bytes handed to the csv reader, which would
/// otherwise close a quoted field left open at end of input and hand back the
/// rest of the file as a single row. Ending inside a quote is a read error.
struct QuoteGuard<R> {
    inner: R,
    delimiter: u8,
    state: QuoteState,
    line: u64,
    opened_on: u64,
}

impl<R: Read> QuoteGuard<R> {
    fn new(inner: R, delimiter: u8) -> Self {
        Self {
            inner,
            delimiter,
            state: QuoteState::FieldStart,
            line: 1,
            opened_on: 0,
        }
    }

    fn track(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state = match (self.state, byte) {
                (QuoteState::FieldStart, QUOTE) => {
                    self.opened_on = self.line;
                    QuoteState::Quoted
                }
                (QuoteState::Quoted, QUOTE) => QuoteState::QuoteInQuoted,
                (QuoteState::Quoted, _) => QuoteState::Quoted,
                (QuoteState::QuoteInQuoted, QUOTE) => QuoteState::Quoted,
                (_, b'\r' | b'\n') => QuoteState::FieldStart,
                (_, b) if b == self.delimiter => QuoteState::FieldStart,
                _ => QuoteState::Unquoted,
            };
            if byte == b'\n' {
                self.line += 1;
            }
        }
    }
}

impl<R: Read> Read for QuoteGuard<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() && self.state == QuoteState::Quoted {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unterminated quoted field opened on line {}", self.opened_on),
            ));
        }
        self.track(&buf[..n]);
        Ok(n)
    }
}

/// Single-pass reader turning delimited text into [`RawRow`]s.
///
/// Fields are mapped to column names by position. Short lines leave the
/// trailing columns absent and extra fields are ignored. Blank lines never
/// produce a row. Any read error, including bytes that are not UTF-8 and a
/// quoted field still open at end of input, is a stream fault: the reader
/// cannot be trusted past that point.
pub struct RecordReader<R: Read> {
    reader: csv::Reader<QuoteGuard<R>>,
    columns: Vec<String>,
    record: csv::StringRecord,
    paused: bool,
    rows_read: u64,
}

impl<R: Read> RecordReader<R> {
    pub fn new(source: R, columns: Vec<String>, has_headers: bool, delimiter: u8) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(has_headers)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(QuoteGuard::new(source, delimiter));

        Self {
            reader,
            columns,
            record: csv::StringRecord::new(),
            paused: false,
            rows_read: 0,
        }
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(source: R, config: &C) -> Self {
        Self::new(
            source,
            config.columns().to_vec(),
            config.has_headers(),
            config.delimiter(),
        )
    }

    /// Next non-empty row, `Ok(None)` once the stream is exhausted.
    pub fn next_row(&mut self) -> Result<Option<RawRow>> {
        if self.paused {
            return Err(ImportError::SourceSuspended);
        }

        loop {
            let more = self
                .reader
                .read_record(&mut self.record)
                .map_err(|e| ImportError::StreamFault {
                    message: format!("after {} rows: {}", self.rows_read, e),
                })?;

            if !more {
                return Ok(None);
            }

            if self.record.len() == 1 && self.record[0].is_empty() {
                continue;
            }

            self.rows_read += 1;
            let row = self
                .columns
                .iter()
                .zip(self.record.iter())
                .map(|(column, value)| (column.as_str(), value))
                .collect();
            return Ok(Some(row));
        }
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }
}

impl<R: Read> Pausable for RecordReader<R> {
    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}
