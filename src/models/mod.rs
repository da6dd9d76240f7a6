//! Lineshape models.
//!
//! Models are implemented as small, pure functions so that fitting code can
//! stay generic over `f(x, params)`.

pub mod model;
pub mod shapes;

pub use model::*;
pub use shapes::*;
