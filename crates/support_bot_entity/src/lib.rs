mod custom_type;
pub mod entities;

pub use custom_type::*;
pub use entities::*;
