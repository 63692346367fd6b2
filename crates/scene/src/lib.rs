pub mod camera;
pub mod context;
pub mod controls;
pub mod framing;
pub mod lights;

pub use camera::*;
pub use context::*;
pub use controls::*;
pub use framing::*;
pub use lights::*;
