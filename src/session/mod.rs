// src/session/mod.rs - Session lifecycle and shared conversation state

pub mod attachment;
pub mod history;
pub mod registry;

pub use attachment::Attachment;
pub use history::ConversationHistory;
pub use registry::{ActiveSession, SessionRegistry, SessionStatus};
