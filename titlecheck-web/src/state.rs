//! Application state.

use std::sync::Arc;
use titlecheck_config::LlmSection;

/// Read-only state shared across handlers.
///
/// Each submission builds its own client and cache; nothing here is mutated
/// after startup.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<LlmSection>,
}

impl AppState {
    pub fn new(llm: LlmSection) -> Self {
        Self { llm: Arc::new(llm) }
    }
}
