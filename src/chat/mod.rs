//! Chat sessions answered from the indexed documents.

pub mod history;
pub mod prompt;
pub mod service;

pub use history::{ChatMessage, Role, SessionStore, SourceRef};
pub use service::{ChatReply, ChatService};
