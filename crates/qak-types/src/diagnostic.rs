use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Span;

/// A compiler diagnostic decoded from a diagnostic record.
///
/// Diagnostics are data: a module that carries them is still a valid module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span.range(), self.message)
    }
}
