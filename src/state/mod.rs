pub mod conversation;
pub mod document;
pub mod history;

pub use conversation::{ConversationLog, LogMessage, Role};
pub use document::{DocumentSnapshot, DocumentSurface, TextDocument};
pub use history::{HistoryEntry, SessionHistory};
