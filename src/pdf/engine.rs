//! Page counting, range checks and stamping on top of a rendering engine
//!
//! The PDF internals live behind [`RenderEngine`]. This module owns the
//! validation around it and turns engine failures into the crate's error
//! kinds.

use std::collections::BTreeMap;
use std::io::{self, Write};

use tracing::debug;

use crate::error::{Error, Result};
use crate::instructions::InstructionSet;
use crate::pdf::source::PdfSource;
use crate::pdf::style::TextWatermark;

/// Capability the stamping pipeline needs from a PDF library
pub trait RenderEngine {
    /// Number of pages in the document
    fn count_pages(&self, pdf: &[u8]) -> Result<usize>;

    /// Stamp the listed pages (1-indexed) and return the complete new document
    fn add_watermarks(
        &self,
        pdf: &[u8],
        stamps: &BTreeMap<usize, TextWatermark>,
    ) -> Result<Vec<u8>>;
}

/// Ask the engine how many pages the document has
///
/// Any engine failure is reported as [`Error::InvalidPdf`].
pub fn page_count<E: RenderEngine + ?Sized>(engine: &E, source: &PdfSource) -> Result<usize> {
    let count = engine.count_pages(source.as_bytes()).map_err(|e| match e {
        Error::InvalidPdf(_) => e,
        other => Error::InvalidPdf(other.to_string()),
    })?;
    debug!(pages = count, "counted PDF pages");
    Ok(count)
}

/// Check that every requested page exists in a document of `total_pages`
pub fn validate_range(instructions: &InstructionSet, total_pages: usize) -> Result<()> {
    match instructions.iter().find(|(page, _)| *page > total_pages) {
        Some((page, _)) => Err(Error::PageOutOfRange { page, total: total_pages }),
        None => Ok(()),
    }
}

/// Write the stamped document to `sink`
///
/// With no instructions the input is copied byte for byte and the engine is
/// not consulted. Otherwise all stamps are applied in one engine call and the
/// finished document is written in one piece. The sink is flushed, not closed.
pub fn apply<E, W>(
    engine: &E,
    source: &PdfSource,
    instructions: &InstructionSet,
    sink: &mut W,
) -> Result<()>
where
    E: RenderEngine + ?Sized,
    W: Write + ?Sized,
{
    if instructions.is_empty() {
        debug!("no instructions, passing PDF through unchanged");
        io::copy(&mut source.reader(), sink)?;
        sink.flush()?;
        return Ok(());
    }

    let stamps: BTreeMap<usize, TextWatermark> = instructions
        .iter()
        .map(|(page, text)| (page, TextWatermark::new(text)))
        .collect();

    let output = engine.add_watermarks(source.as_bytes(), &stamps)?;
    debug!(stamped = stamps.len(), bytes = output.len(), "applied watermarks");

    sink.write_all(&output)?;
    sink.flush()?;
    Ok(())
}
