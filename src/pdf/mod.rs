//! PDF side of the pipeline

pub mod create;
pub mod engine;
pub mod metadata;
pub mod source;
pub mod stamp;
pub mod style;

// Re-export commonly used items
pub use create::sample_document;
pub use engine::{apply, page_count, validate_range, RenderEngine};
pub use metadata::{count_pages, extract_metadata, PdfMetadata};
pub use source::PdfSource;
pub use stamp::LopdfEngine;
pub use style::{TextWatermark, WatermarkStyle};
