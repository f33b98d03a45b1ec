//! Report generation.
//!
//! Renders aggregated grading data into one self-contained HTML document
//! and writes it to disk.

pub mod charts;
pub mod embed;
pub mod generator;
pub mod writer;

pub use embed::{extract_embedded_data, ReportInput};
pub use generator::{render_minimal, synthesize, ReportOptions};
pub use writer::write_atomic;
