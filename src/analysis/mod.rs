//! Analysis modules.
//!
//! Statistics over reconciled grading data.

pub mod aggregator;
pub mod stats;

pub use aggregator::*;
