//! Mathematical utilities: least-squares solvers, sample statistics, unit
//! conversions and window functions.

pub mod levmar;
pub mod linalg;
pub mod stats;
pub mod units;
pub mod window;

pub use levmar::*;
pub use linalg::*;
pub use stats::*;
pub use units::*;
pub use window::*;
