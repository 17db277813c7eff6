//! PDF metadata extraction

use lopdf::{Dictionary, Document, Object};

use crate::error::{Error, Result};

/// Look up `key` in `dict`, following one indirect reference
fn resolve<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Result<&'a Object> {
    let name = String::from_utf8_lossy(key);
    let object = dict
        .get(key)
        .map_err(|_| Error::InvalidPdf(format!("missing /{}", name)))?;

    match object {
        Object::Reference(id) => doc
            .get_object(*id)
            .map_err(|e| Error::InvalidPdf(format!("unresolvable /{}: {}", name, e))),
        other => Ok(other),
    }
}

/// Count pages by reading the Count field from the Pages dictionary
///
/// This is more reliable than walking the tree when intermediate nodes are
/// damaged, and it is what viewers report.
pub fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog = resolve(doc, &doc.trailer, b"Root")?
        .as_dict()
        .map_err(|_| Error::InvalidPdf("catalog is not a dictionary".to_string()))?;

    let pages = resolve(doc, catalog, b"Pages")?
        .as_dict()
        .map_err(|_| Error::InvalidPdf("page tree root is not a dictionary".to_string()))?;

    match resolve(doc, pages, b"Count")? {
        Object::Integer(n) if *n >= 0 => Ok(*n as usize),
        _ => Err(Error::InvalidPdf("page tree /Count is not a valid integer".to_string())),
    }
}

/// Parse a PDF held in memory
pub fn load_document(pdf: &[u8]) -> Result<Document> {
    Document::load_mem(pdf).map_err(|e| Error::InvalidPdf(e.to_string()))
}

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
}

/// UTF-8 text entry of the Info dictionary
fn info_text(info: Option<&Dictionary>, key: &[u8]) -> Option<String> {
    let bytes = info?.get(key).ok()?.as_str().ok()?;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Extract metadata from a PDF held in memory
pub fn extract_metadata(pdf: &[u8]) -> Result<PdfMetadata> {
    let doc = load_document(pdf)?;
    let page_count = count_pages_from_catalog(&doc)?;

    let info = resolve(&doc, &doc.trailer, b"Info")
        .ok()
        .and_then(|info| info.as_dict().ok());

    Ok(PdfMetadata {
        page_count,
        title: info_text(info, b"Title"),
        author: info_text(info, b"Author"),
    })
}

/// Count the number of pages in a PDF held in memory
pub fn count_pages(pdf: &[u8]) -> Result<usize> {
    let doc = load_document(pdf)?;
    count_pages_from_catalog(&doc)
}
