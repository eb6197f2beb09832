//! Repository layer: case-scoped database operations.

mod case;
mod metadata;
mod store;

pub use case::*;
pub use metadata::*;
pub use store::*;
