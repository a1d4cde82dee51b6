use serde::{Deserialize, Serialize};

/// Reference engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on the linear memory, in bytes. Allocations past it fail
    /// the way `malloc` does when wasm memory cannot grow.
    pub memory_limit: u32,
}

impl EngineConfig {
    pub const DEFAULT_MEMORY_LIMIT: u32 = 16 * 1024 * 1024;
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory_limit: Self::DEFAULT_MEMORY_LIMIT,
        }
    }
}
