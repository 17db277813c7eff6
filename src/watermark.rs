//! Instruction-driven watermarking of a whole document

use std::io::{Read, Write};

use tracing::info;

use crate::error::Result;
use crate::instructions::parse_instructions;
use crate::pdf::{self, LopdfEngine, PdfSource, RenderEngine};

/// Stamp the pages listed in `instructions` and write the new PDF to `sink`
///
/// Steps run in order and the first failure is returned as is:
///
/// 1. parse the instruction text (the PDF is not read if this fails)
/// 2. buffer the PDF
/// 3. count its pages
/// 4. check every listed page exists
/// 5. stamp and write
///
/// Nothing is written to `sink` unless every earlier step succeeded. The
/// sink is written and flushed but never closed. The function keeps no
/// state between calls and may be called from many threads at once.
///
/// # Example
///
/// ```no_run
/// use std::fs::File;
///
/// let mut output = File::create("stamped.pdf")?;
/// pdf_stamp::watermark(
///     &mut output,
///     File::open("input.pdf")?,
///     "page,watermark_text\n1,CONFIDENTIAL\n".as_bytes(),
/// )?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn watermark<W, P, I>(sink: &mut W, pdf_input: P, instructions: I) -> Result<()>
where
    W: Write + ?Sized,
    P: Read,
    I: Read,
{
    watermark_with(&LopdfEngine, sink, pdf_input, instructions)
}

/// Same as [`watermark`], with a caller-supplied rendering engine
pub fn watermark_with<E, W, P, I>(engine: &E, sink: &mut W, pdf_input: P, instructions: I) -> Result<()>
where
    E: RenderEngine + ?Sized,
    W: Write + ?Sized,
    P: Read,
    I: Read,
{
    let instructions = parse_instructions(instructions)?;
    let source = PdfSource::load(pdf_input)?;
    let total_pages = pdf::page_count(engine, &source)?;
    pdf::validate_range(&instructions, total_pages)?;
    pdf::apply(engine, &source, &instructions, sink)?;

    info!(
        pages = total_pages,
        stamped = instructions.len(),
        "watermarked PDF"
    );
    Ok(())
}
