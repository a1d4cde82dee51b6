//! What the CLI prints about each compiled file.

use qak_types::{Diagnostic, Token};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// One compiled file. Serialized as-is for `--json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub file: String,
    /// Hex SHA-256 of the source text.
    pub sha256: String,
    pub has_errors: bool,
    pub token_count: u32,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<Token>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub engine: String,
    pub engine_version: Option<u32>,
    pub files: Vec<FileReport>,
}

impl Report {
    pub fn has_errors(&self) -> bool {
        self.files.iter().any(|f| f.has_errors)
    }
}

pub fn source_digest(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// `file:line:start..end: message`
pub fn format_diagnostic(file: &str, diagnostic: &Diagnostic) -> String {
    format!("{file}:{}: {}", diagnostic.span.range(), diagnostic.message)
}
