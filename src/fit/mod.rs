//! Lineshape fitting.
//!
//! Responsibilities:
//!
//! - validate sample series and run the LM solver for a pointwise model (`fitter`)
//! - fit a single Lorentzian with data-derived seeds (`single`)
//! - estimate triplet seeds from the data (`estimate`) and fit the triplet (`triplet`)
//! - calibrate the x-axis from EOM sidebands and report linewidths (`calibrate`)

pub mod calibrate;
pub mod estimate;
pub mod fitter;
pub mod single;
pub mod triplet;

pub use calibrate::*;
pub use estimate::*;
pub use fitter::*;
pub use single::*;
pub use triplet::*;
