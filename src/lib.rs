pub mod chat;
pub mod core;
pub mod llm;
pub mod pdf;
pub mod rag;
pub mod server;
pub mod state;
