//! Physical line numbers for csv records.
//!
//! The csv reader skips blank lines and lets quoted fields span lines, so a
//! record index is not a file line. Readers built here keep enough state to
//! recover the 1-based line each record starts on.

use std::collections::VecDeque;
use std::io::{self, Read};

use csv::{Reader, ReaderBuilder, StringRecord};

/// Byte pass-through that remembers where newlines sit
pub(crate) struct NewlineIndex<R> {
    inner: R,
    offset: u64,
    newlines: VecDeque<u64>,
}

impl<R> NewlineIndex<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            newlines: VecDeque::new(),
        }
    }

    /// Whether byte `at` is `\n`. Offsets below `at` are forgotten.
    fn is_newline(&mut self, at: u64) -> bool {
        while self.newlines.front().is_some_and(|&o| o < at) {
            self.newlines.pop_front();
        }
        self.newlines.front() == Some(&at)
    }
}

impl<R: Read> Read for NewlineIndex<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        for (i, &b) in buf[..n].iter().enumerate() {
            if b == b'\n' {
                self.newlines.push_back(self.offset + i as u64);
            }
        }
        self.offset += n as u64;
        Ok(n)
    }
}

/// Headed, flexible csv reader that can report physical lines
pub(crate) fn line_tracking_reader<R: Read>(reader: R) -> Reader<NewlineIndex<R>> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(NewlineIndex::new(reader))
}

/// Line the record just read by `reader` starts on.
///
/// The reader's line counter sits past every newline consumed so far,
/// including blank lines before the record. Taking back the newlines inside
/// quoted fields and a `\n` terminator leaves the record's first line. A `\r`
/// terminator or a final unterminated record leaves nothing to take back.
pub(crate) fn record_start_line<R: Read>(
    reader: &mut Reader<NewlineIndex<R>>,
    record: &StringRecord,
) -> u64 {
    let end = reader.position().clone();
    let embedded: u64 = record
        .iter()
        .map(|field| field.bytes().filter(|&b| b == b'\n').count() as u64)
        .sum();
    let terminated = end.byte() > 0 && reader.get_mut().is_newline(end.byte() - 1);
    end.line()
        .saturating_sub(embedded)
        .saturating_sub(u64::from(terminated))
}
