//! Output generation.
//!
//! Renders aggregated or raw tables as CSV or JSON.

pub mod generator;

pub use generator::*;
