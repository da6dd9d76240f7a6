//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - sample series (`Trace`)
//! - lineshape parameter sets (`LorentzianParams`, `TripletParams`) and seeds
//! - fit outputs (`FitOutcome`, `FitQuality`) and solver constraints (`Bounds`)
//! - the run configuration (`AnalysisConfig`)

pub mod types;

pub use types::*;
