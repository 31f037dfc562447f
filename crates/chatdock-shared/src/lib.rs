pub mod constants;
pub mod error;
pub mod models;
pub mod reactions;
pub mod types;

pub use error::SharedError;
pub use models::{Conversation, LastMessage, Member, Message, Reaction};
pub use types::{ConversationId, CurrentUser, MessageId, Role, UserId};
