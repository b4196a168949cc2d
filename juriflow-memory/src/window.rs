use juriflow_core::{HistoryEntry, Role};

pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Bounded sliding window over a session's turns.
///
/// The window holds no state of its own; callers pass the current history in
/// and persist the returned sequence themselves.
#[derive(Clone, Copy, Debug)]
pub struct ConversationWindow {
    window_size: usize,
}

impl Default for ConversationWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl ConversationWindow {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn append(
        &self,
        session_id: &str,
        role: Role,
        content: impl Into<String>,
        mut history: Vec<HistoryEntry>,
    ) -> Vec<HistoryEntry> {
        history.push(HistoryEntry::now(role, content));
        self.truncate(session_id, history)
    }

    /// Keeps the most recent `window_size` entries, oldest dropped first.
    pub fn truncate(&self, session_id: &str, mut history: Vec<HistoryEntry>) -> Vec<HistoryEntry> {
        if history.len() > self.window_size {
            let evicted = history.len() - self.window_size;
            history.drain(..evicted);
            tracing::debug!(
                session_id = %session_id,
                evicted = evicted,
                "conversation history truncated"
            );
        }
        history
    }
}

/// [`ConversationWindow::append`] with the default window of 10 entries.
pub fn append(
    session_id: &str,
    role: Role,
    content: impl Into<String>,
    history: Vec<HistoryEntry>,
) -> Vec<HistoryEntry> {
    ConversationWindow::default().append(session_id, role, content, history)
}
