pub mod config;
pub mod events;
pub mod floor_view;

pub use config::*;
pub use events::*;
pub use floor_view::*;
