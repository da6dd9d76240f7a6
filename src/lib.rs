//! `lineshape-fit` library crate.
//!
//! The binary (`lsfit`) is a thin wrapper around this library so that:
//!
//! - the fitting core is testable without spawning processes
//! - the numeric modules are reusable from other tools (acquisition scripts,
//!   notebooks, services)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
