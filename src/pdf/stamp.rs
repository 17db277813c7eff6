//! Diagonal text stamps written directly into PDF pages using lopdf
//!
//! Each stamped page gets a small content stream of its own, placed before
//! the existing content so the page draws over the stamp. The stamp's font
//! and transparency state are registered in the page's own Resources
//! dictionary; inherited resources are copied down first so sibling pages
//! are left untouched.

use std::collections::{BTreeMap, HashMap};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

use crate::error::{Error, Result};
use crate::layout::{diagonal_placement, PageBox, StampPlacement};
use crate::pdf::engine::RenderEngine;
use crate::pdf::metadata::load_document;
use crate::pdf::style::TextWatermark;

/// Resource name of the stamp font inside a page's /Font dictionary
const FONT_RESOURCE: &str = "PdfStampFont";

/// Resource name of the stamp transparency state inside /ExtGState
const GSTATE_RESOURCE: &str = "PdfStampGS";

/// Guard against cyclic /Parent chains in broken page trees
const MAX_TREE_DEPTH: usize = 64;

/// Rendering engine backed by lopdf
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfEngine;

impl RenderEngine for LopdfEngine {
    /// Pages reachable through the page tree, the same set stamping resolves against
    fn count_pages(&self, pdf: &[u8]) -> Result<usize> {
        Ok(load_document(pdf)?.get_pages().len())
    }

    fn add_watermarks(
        &self,
        pdf: &[u8],
        stamps: &BTreeMap<usize, TextWatermark>,
    ) -> Result<Vec<u8>> {
        let mut doc = load_document(pdf)?;
        let pages = doc.get_pages();
        let mut fonts: HashMap<&'static str, ObjectId> = HashMap::new();

        for (&page_number, stamp) in stamps {
            let page_id = u32::try_from(page_number)
                .ok()
                .and_then(|n| pages.get(&n).copied())
                .ok_or_else(|| {
                    Error::InvalidPdf(format!("page {} not found in page tree", page_number))
                })?;

            let font_id = *fonts
                .entry(stamp.style.font)
                .or_insert_with(|| add_standard_font(&mut doc, stamp.style.font));
            let gstate_id = add_transparency_state(&mut doc, stamp.style.opacity);
            install_stamp_resources(&mut doc, page_id, font_id, gstate_id)?;

            let page_box = page_media_box(&doc, page_id);
            let placement = diagonal_placement(&page_box, &stamp.text, stamp.style.font_size);
            let content = stamp_content(stamp, &placement)?;
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

            prepend_content_to_page(&mut doc, page_id, content_id)?;

            debug!(page = page_number, text = %stamp.text, size = placement.font_size, "stamped page");
        }

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| Error::Stamping(format!("writing PDF: {}", e)))?;
        Ok(output)
    }
}

/// Add one of the standard 14 fonts with WinAnsi encoding
fn add_standard_font(doc: &mut Document, base_font: &str) -> ObjectId {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(base_font.as_bytes().to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    doc.add_object(Object::Dictionary(font))
}

/// Graphics state applying `opacity` to both fill and stroke
fn add_transparency_state(doc: &mut Document, opacity: f32) -> ObjectId {
    let mut state = Dictionary::new();
    state.set("Type", Object::Name(b"ExtGState".to_vec()));
    state.set("ca", Object::Real(opacity));
    state.set("CA", Object::Real(opacity));
    doc.add_object(Object::Dictionary(state))
}

/// Follow an indirect reference, if `object` is one
fn deref<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look up a page attribute, walking up the page tree for inherited values
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return deref(doc, value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(n) => Some(*n as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// The page's MediaBox, falling back to US Letter when absent or unusable
fn page_media_box(doc: &Document, page_id: ObjectId) -> PageBox {
    inherited(doc, page_id, b"MediaBox")
        .and_then(|object| object.as_array().ok())
        .and_then(|values| {
            let numbers: Vec<f32> = values
                .iter()
                .filter_map(|v| deref(doc, v).and_then(number))
                .collect();
            <[f32; 4]>::try_from(numbers).ok()
        })
        .and_then(PageBox::from_corners)
        .unwrap_or_else(PageBox::letter)
}

/// Give the page its own Resources with the stamp font and graphics state
fn install_stamp_resources(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
    gstate_id: ObjectId,
) -> Result<()> {
    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|object| object.as_dict().ok())
        .cloned()
        .unwrap_or_default();

    add_named_resource(doc, &mut resources, b"Font", FONT_RESOURCE, font_id);
    add_named_resource(doc, &mut resources, b"ExtGState", GSTATE_RESOURCE, gstate_id);

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| Error::InvalidPdf(format!("page object {:?}: {}", page_id, e)))?;
    page.set("Resources", Object::Dictionary(resources));

    Ok(())
}

/// Set `/category << /name id >>`, keeping the category's existing entries
fn add_named_resource(
    doc: &Document,
    resources: &mut Dictionary,
    category: &[u8],
    name: &str,
    id: ObjectId,
) {
    let mut entries = resources
        .get(category)
        .ok()
        .and_then(|object| deref(doc, object))
        .and_then(|object| object.as_dict().ok())
        .cloned()
        .unwrap_or_default();

    entries.set(name, Object::Reference(id));
    resources.set(category.to_vec(), Object::Dictionary(entries));
}

/// Encode text for a WinAnsi single-byte font; unmappable characters become `?`
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u8::try_from(u32::from(c)) {
            Ok(byte) if !c.is_control() => byte,
            _ => b'?',
        })
        .collect()
}

/// Content stream operators drawing one stamp
fn stamp_content(stamp: &TextWatermark, placement: &StampPlacement) -> Result<Vec<u8>> {
    let style = &stamp.style;
    let [a, b, c, d, e, f] = placement.matrix;
    let (dx, dy) = placement.offset;

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(GSTATE_RESOURCE.as_bytes().to_vec())]),
            Operation::new("g", vec![style.gray.into()]),
            Operation::new("G", vec![style.gray.into()]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), placement.font_size.into()],
            ),
            Operation::new("Tm", vec![a.into(), b.into(), c.into(), d.into(), e.into(), f.into()]),
            Operation::new("Td", vec![dx.into(), dy.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(&stamp.text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    };

    let mut bytes = content
        .encode()
        .map_err(|e| Error::Stamping(format!("encoding stamp content: {}", e)))?;
    // Streams in /Contents are joined before tokenizing
    bytes.push(b'\n');
    Ok(bytes)
}

/// Content references of a page, resolving a /Contents that points at an array
fn page_content_refs(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::InvalidPdf(format!("page object {:?}: {}", page_id, e)))?;

    let refs = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    Ok(refs)
}

fn set_page_contents(doc: &mut Document, page_id: ObjectId, contents: Vec<Object>) -> Result<()> {
    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| Error::InvalidPdf(format!("page object {:?}: {}", page_id, e)))?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// Prepend a content stream to a page's Contents
///
/// The stamp is drawn first, so the existing page content paints over it.
fn prepend_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    let mut contents = page_content_refs(doc, page_id)?;
    contents.insert(0, Object::Reference(new_content_id));
    set_page_contents(doc, page_id, contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::create::sample_document;

    fn stamp_pages(pdf: &[u8], pages: &[(usize, &str)]) -> Result<Vec<u8>> {
        let stamps = pages
            .iter()
            .map(|(page, text)| (*page, TextWatermark::new(*text)))
            .collect();
        LopdfEngine.add_watermarks(pdf, &stamps)
    }

    #[test]
    fn test_count_pages() {
        let pdf = sample_document(3).unwrap();
        assert_eq!(LopdfEngine.count_pages(&pdf).unwrap(), 3);
    }

    #[test]
    fn test_stamp_single_page() {
        let pdf = sample_document(3).unwrap();
        let output = stamp_pages(&pdf, &[(2, "CONFIDENTIAL")]).unwrap();

        let doc = Document::load_mem(&output).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 3);

        let stamped = String::from_utf8_lossy(&doc.get_page_content(pages[&2]).unwrap()).into_owned();
        assert!(stamped.contains("(CONFIDENTIAL) Tj"), "missing stamp: {}", stamped);
        assert!(stamped.contains("/PdfStampGS gs"));
        assert!(stamped.contains("Page 2 of 3"));

        let untouched = String::from_utf8_lossy(&doc.get_page_content(pages[&1]).unwrap()).into_owned();
        assert!(!untouched.contains("CONFIDENTIAL"));
    }

    #[test]
    fn test_stamp_is_drawn_beneath_content() {
        let pdf = sample_document(1).unwrap();
        let output = stamp_pages(&pdf, &[(1, "DRAFT")]).unwrap();

        let doc = Document::load_mem(&output).unwrap();
        let page_id = doc.get_pages()[&1];
        let content = String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned();

        let stamp_at = content.find("(DRAFT) Tj").unwrap();
        let label_at = content.find("Page 1 of 1").unwrap();
        assert!(stamp_at < label_at);
    }

    #[test]
    fn test_stamp_ends_on_token_boundary() {
        let pdf = sample_document(1).unwrap();
        let output = stamp_pages(&pdf, &[(1, "DRAFT")]).unwrap();

        let doc = Document::load_mem(&output).unwrap();
        let page_id = doc.get_pages()[&1];
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let operators: Vec<&str> = content.operations.iter().map(|op| op.operator.as_str()).collect();

        let restore = operators.iter().position(|op| *op == "Q").expect("stamp must restore state");
        assert_eq!(operators[restore + 1], "BT", "page content must follow the stamp: {:?}", operators);
        assert_eq!(operators.iter().filter(|op| **op == "BT").count(), 2);
        assert!(operators.iter().all(|op| op.len() <= 2), "merged operators: {:?}", operators);
    }

    #[test]
    fn test_count_follows_page_tree_not_count_entry() {
        let pdf = sample_document(3).unwrap();
        let mut doc = Document::load_mem(&pdf).unwrap();
        let root_id = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        let pages_id = doc.get_dictionary(root_id).unwrap().get(b"Pages").unwrap().as_reference().unwrap();
        doc.get_object_mut(pages_id)
            .and_then(Object::as_dict_mut)
            .unwrap()
            .set("Count", Object::Integer(5));
        let mut damaged = Vec::new();
        doc.save_to(&mut damaged).unwrap();

        assert_eq!(LopdfEngine.count_pages(&damaged).unwrap(), 3);

        let mut out = Vec::new();
        let err = crate::watermark(&mut out, damaged.as_slice(), "page,watermark_text\n5,X".as_bytes())
            .unwrap_err();
        assert!(matches!(err, Error::PageOutOfRange { page: 5, total: 3 }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_resources_copied_onto_stamped_page() {
        let pdf = sample_document(2).unwrap();
        let output = stamp_pages(&pdf, &[(1, "DRAFT")]).unwrap();

        let doc = Document::load_mem(&output).unwrap();
        let page_id = doc.get_pages()[&1];
        let resources = doc.get_dictionary(page_id).unwrap().get(b"Resources").unwrap();
        let resources = resources.as_dict().unwrap();

        let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
        assert!(fonts.has(b"F1"), "inherited font must be kept");
        assert!(fonts.has(FONT_RESOURCE.as_bytes()));

        let states = resources.get(b"ExtGState").unwrap().as_dict().unwrap();
        let state_id = states.get(GSTATE_RESOURCE.as_bytes()).unwrap().as_reference().unwrap();
        let state = doc.get_dictionary(state_id).unwrap();
        assert_eq!(number(state.get(b"ca").unwrap()), Some(0.3));
    }

    #[test]
    fn test_missing_page_is_invalid_pdf() {
        let pdf = sample_document(2).unwrap();
        let err = stamp_pages(&pdf, &[(3, "DRAFT")]).unwrap_err();
        assert!(matches!(err, Error::InvalidPdf(_)));
    }

    #[test]
    fn test_garbage_is_invalid_pdf() {
        let err = stamp_pages(b"not a pdf", &[(1, "DRAFT")]).unwrap_err();
        assert!(matches!(err, Error::InvalidPdf(_)));
    }

    #[test]
    fn test_media_box_is_inherited() {
        let pdf = sample_document(1).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        let page_id = doc.get_pages()[&1];
        let page_box = page_media_box(&doc, page_id);
        assert!((page_box.width() - PageBox::a4().width()).abs() < 0.01);
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("DRAFT"), b"DRAFT");
        assert_eq!(encode_win_ansi("Café"), b"Caf\xe9");
        assert_eq!(encode_win_ansi("機密"), b"??");
    }
}
