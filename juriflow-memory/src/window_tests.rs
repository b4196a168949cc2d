#[cfg(test)]
mod tests {
    use crate::window::{append, ConversationWindow};
    use juriflow_core::{HistoryEntry, Role};

    #[test]
    fn test_window_keeps_last_ten_of_fifteen() {
        let mut history = Vec::new();
        for i in 1..=15 {
            history = append("session-1", Role::User, format!("M{i}"), history);
        }

        assert_eq!(history.len(), 10);
        let contents: Vec<&str> = history.iter().map(|entry| entry.content.as_str()).collect();
        let expected: Vec<String> = (6..=15).map(|i| format!("M{i}")).collect();
        assert_eq!(contents, expected);
        assert!(history
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[test]
    fn test_window_boundary_exactly_n_messages() {
        let window = ConversationWindow::new(4);
        let mut history = Vec::new();
        for i in 1..=2 {
            history = window.append("s", Role::User, format!("Q{i}"), history);
            history = window.append("s", Role::Assistant, format!("A{i}"), history);
        }

        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content, "Q1");
        assert_eq!(history[3].content, "A2");
    }

    #[test]
    fn test_window_boundary_n_plus_one() {
        let window = ConversationWindow::new(4);
        let mut history = Vec::new();
        for content in ["Q1", "A1", "Q2", "A2", "Q3"] {
            history = window.append("s", Role::User, content, history);
        }

        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content, "A1");
        assert_eq!(history[3].content, "Q3");
    }

    #[test]
    fn test_append_is_pure_over_input() {
        let seed = vec![HistoryEntry::now(Role::User, "hello")];
        let first = append("s", Role::Assistant, "hi", seed.clone());
        let second = append("s", Role::Assistant, "hi", seed.clone());

        assert_eq!(seed.len(), 1);
        assert_eq!(first.len(), 2);
        assert_eq!(
            first.iter().map(|e| &e.content).collect::<Vec<_>>(),
            second.iter().map(|e| &e.content).collect::<Vec<_>>()
        );
        assert_eq!(first[1].role, Role::Assistant);
    }

    #[test]
    fn test_truncate_trims_oversized_persisted_history() {
        let window = ConversationWindow::default();
        let history: Vec<HistoryEntry> = (0..25)
            .map(|i| HistoryEntry::now(Role::User, format!("old-{i}")))
            .collect();
        let trimmed = window.truncate("s", history);
        assert_eq!(trimmed.len(), 10);
        assert_eq!(trimmed[0].content, "old-15");
    }

    #[test]
    fn test_zero_window_keeps_latest_entry() {
        let window = ConversationWindow::new(0);
        let history = window.append("s", Role::User, "only", Vec::new());
        assert_eq!(window.window_size(), 1);
        assert_eq!(history.len(), 1);
    }
}
