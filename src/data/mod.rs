//! Synthetic data sources.
//!
//! Real traces come in through `io::ingest`; this module produces reproducible
//! noisy traces for demos and end-to-end checks.

pub mod sample;

pub use sample::*;
