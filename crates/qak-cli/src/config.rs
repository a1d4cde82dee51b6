//! The `--config` file.
//!
//! ```toml
//! [session]
//! utf8_policy = "replace"
//!
//! [engine]
//! memory_limit = 1048576
//! ```

use std::path::Path;

use anyhow::Context;
use qak_abi::SessionConfig;
use qak_engine::EngineConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub session: SessionConfig,
    /// Only used by the reference engine.
    pub engine: EngineConfig,
}

impl CliConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
