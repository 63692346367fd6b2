pub mod event_bus;
pub mod frame;
pub mod frame_loop;

pub use event_bus::*;
pub use frame::*;
pub use frame_loop::*;
