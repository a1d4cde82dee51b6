use serde::{Deserialize, Serialize};

/// What to do with ill-formed UTF-8 in a string record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Utf8Policy {
    /// Fail with [`AbiError::InvalidUtf8`](crate::AbiError::InvalidUtf8).
    #[default]
    Reject,
    /// Substitute U+FFFD for each ill-formed sequence.
    Replace,
}

/// Session settings. Every field has a default, so an empty TOML table or
/// JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub utf8_policy: Utf8Policy,
    /// Refuse engines that report a different [`ABI_VERSION`](crate::ABI_VERSION).
    pub check_abi_version: bool,
    /// Delete modules the caller left alive when the session closes.
    pub release_modules_on_close: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            utf8_policy: Utf8Policy::Reject,
            check_abi_version: true,
            release_modules_on_close: true,
        }
    }
}
