pub mod prelude;

pub mod conversation;
pub mod user;
