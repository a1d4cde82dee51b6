use serde::{Deserialize, Serialize};

/// A module's source as read back from the engine: text plus file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    pub text: String,
    pub file_name: String,
}

impl Source {
    pub fn new(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            file_name: file_name.into(),
        }
    }
}

/// Holds source text with a line index for diagnostics rendering.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
    /// Cached line start byte offsets for fast line lookup.
    line_starts: Vec<usize>,
}

impl SourceFile {
    /// Create a new source file.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            name: name.into(),
            text,
            line_starts,
        }
    }

    /// Extract a source line by 1-based line number.
    ///
    /// Returns `None` if the line number is out of range.
    pub fn line(&self, line_number: u32) -> Option<&str> {
        let idx = line_number.checked_sub(1)? as usize;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&s| s.saturating_sub(1)) // strip the \n
            .unwrap_or(self.text.len());
        let line = &self.text[start..end];
        Some(line.trim_end_matches('\r'))
    }

    /// Byte offset at which a 1-based line starts.
    pub fn line_start(&self, line_number: u32) -> Option<usize> {
        let idx = line_number.checked_sub(1)? as usize;
        self.line_starts.get(idx).copied()
    }

    /// Get the total number of lines.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

impl From<&SourceFile> for Source {
    fn from(file: &SourceFile) -> Self {
        Source::new(file.name.clone(), file.text.clone())
    }
}
