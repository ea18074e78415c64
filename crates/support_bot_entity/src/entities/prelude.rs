pub use super::conversation::Entity as Conversation;
pub use super::user::Entity as User;
