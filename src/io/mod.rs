//! Input/output helpers.
//!
//! - trace CSV ingest + validation (`ingest`)
//! - x/y series export to CSV (`export`)
//! - fit report JSON read/write (`fitfile`)

pub mod export;
pub mod fitfile;
pub mod ingest;

pub use export::*;
pub use fitfile::*;
pub use ingest::*;
