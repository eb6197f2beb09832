pub mod case;
pub mod enums;
pub mod event;
pub mod narrative;
pub mod scenario;

pub use case::*;
pub use enums::*;
pub use event::*;
pub use narrative::*;
pub use scenario::*;
