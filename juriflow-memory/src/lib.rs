pub mod window;
mod window_tests;

pub use juriflow_core::{HistoryEntry, Role};
pub use window::{append, ConversationWindow, DEFAULT_WINDOW_SIZE};
