//! Analysis modules.
//!
//! Window generation and per-window aggregation over loaded tables.

pub mod aggregator;
pub mod windows;

pub use aggregator::*;
pub use windows::*;
