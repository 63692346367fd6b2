pub mod anchor;
pub mod catalog;
pub mod projector;
pub mod target;

pub use anchor::*;
pub use catalog::*;
pub use projector::*;
pub use target::*;
