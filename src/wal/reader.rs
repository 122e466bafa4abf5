//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::Result;
use super::{WalEntry, HEADER_SIZE};

/// Reads entries from the WAL file
///
/// A truncated frame at the end of the file (partial header or partial
/// body) reads as end-of-log. A complete frame whose checksum does not
/// match yields `WalCorruption`, after which reading may continue with
/// the next frame.
pub struct WalReader {
    reader: BufReader<File>,
    /// Offset just past the last complete frame
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next entry from the WAL
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let mut header = [0u8; HEADER_SIZE];
        if !self.fill(&mut header)? {
            return Ok(None);
        }

        let (lsn, crc, len) = WalEntry::parse_header(&header);
        let mut body = vec![0u8; len];
        if !self.fill(&mut body)? {
            return Ok(None);
        }

        self.position += (HEADER_SIZE + len) as u64;
        WalEntry::from_parts(lsn, crc, &body).map(Some)
    }

    /// Offset just past the last complete frame read so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Iterate over all entries
    pub fn entries(self) -> WalIterator {
        WalIterator { reader: self }
    }

    /// Fill `buf` completely; `false` on a clean or partial EOF
    fn fill(&mut self, buf: &mut [u8]) -> Result<bool> {
        match self.reader.read_exact(buf) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Iterator over WAL entries
pub struct WalIterator {
    reader: WalReader,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_entry().transpose()
    }
}
