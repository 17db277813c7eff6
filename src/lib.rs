//! PDF Stamp Library
//!
//! Applies diagonal, semi-transparent text watermarks to selected pages of a
//! PDF. Which page gets which text comes from a small CSV list:
//!
//! ```text
//! page,watermark_text
//! 1,CONFIDENTIAL
//! 3,DRAFT
//! ```
//!
//! Pages not listed pass through unchanged. This library provides:
//! - Instruction parsing with row-level validation
//! - Page counting and page-range checks
//! - Stamping through a pluggable [`pdf::RenderEngine`] (lopdf by default)
//! - Sample document generation for demos and tests
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//!
//! let mut output = File::create("stamped.pdf").expect("Failed to create output");
//! pdf_stamp::watermark(
//!     &mut output,
//!     File::open("input.pdf").expect("Failed to open PDF"),
//!     File::open("watermarks.csv").expect("Failed to open CSV"),
//! )
//! .expect("Failed to watermark");
//! ```

pub mod error;
pub mod instructions;
pub mod layout;
pub mod pdf;
pub mod watermark;

// Re-export commonly used items
pub use error::{Error, ErrorKind, Result};
pub use instructions::{parse_instructions, InstructionSet};
pub use watermark::{watermark, watermark_with};
