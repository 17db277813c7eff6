//! Buffered PDF input

use std::io::{Cursor, Read};

use tracing::debug;

use crate::error::{Error, Result};

/// In-memory, randomly addressable copy of an input PDF
///
/// PDF parsing needs to seek (the cross-reference table sits at the end of
/// the file), so the whole input is buffered once. Every call to
/// [`PdfSource::reader`] starts a fresh view at offset zero, which keeps the
/// page-count probe and the stamping pass independent of each other.
#[derive(Debug, Clone)]
pub struct PdfSource {
    data: Vec<u8>,
}

impl PdfSource {
    /// Read `reader` to the end and keep the bytes
    ///
    /// Fails with [`Error::InvalidPdf`] when the input is empty.
    pub fn load<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Wrap bytes that are already in memory
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::InvalidPdf("empty input".to_string()));
        }
        debug!(bytes = data.len(), "buffered PDF input");
        Ok(Self { data })
    }

    /// The complete input
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// A new seekable view positioned at the start of the input
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.data.as_slice())
    }
}
