use std::time::Duration;

use juriflow_memory::DEFAULT_WINDOW_SIZE;

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Accept an empty query context. Meant for tests and smoke checks.
    pub allow_empty_context: bool,
    /// Upper bound on a single backend call.
    pub backend_timeout: Duration,
    /// Primary calls issued in partial-results mode.
    pub partial_result_attempts: usize,
    /// First sleep of the gradual backoff strategy.
    pub initial_backoff: Duration,
    pub history_window: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            allow_empty_context: false,
            backend_timeout: Duration::from_secs(120),
            partial_result_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            history_window: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl OrchestratorConfig {
    pub fn allow_empty_context(mut self, allowed: bool) -> Self {
        self.allow_empty_context = allowed;
        self
    }

    pub fn backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    pub fn partial_result_attempts(mut self, attempts: usize) -> Self {
        self.partial_result_attempts = attempts.max(1);
        self
    }

    pub fn initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    pub fn history_window(mut self, window_size: usize) -> Self {
        self.history_window = window_size;
        self
    }
}
