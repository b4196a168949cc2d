#[derive(Clone, Debug)]
pub struct ExecutionConfig {
    pub max_steps: usize,
    /// Re-dispatches the error node grants a failing node.
    pub max_node_retries: u32,
    /// Route through the research fan-out after input analysis.
    pub enable_research: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_steps: 50,
            max_node_retries: 2,
            enable_research: false,
        }
    }
}

impl ExecutionConfig {
    pub fn with_research(mut self, enabled: bool) -> Self {
        self.enable_research = enabled;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}
