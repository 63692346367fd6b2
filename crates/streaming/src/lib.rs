pub mod fetch;
pub mod load_state;
pub mod loader;
pub mod sources;

pub use fetch::*;
pub use load_state::*;
pub use loader::*;
pub use sources::*;
