pub mod data_uri;
pub mod floors;
pub mod model;

pub use data_uri::*;
pub use floors::*;
pub use model::*;
