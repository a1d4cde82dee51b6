use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a piece of source text: byte offsets plus line ordinals.
///
/// This is the engine-side view of a location. Offsets and lines are opaque
/// ordinals to the boundary layer; the reference engine uses byte offsets
/// and 1-based lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: u32,
    pub end: u32,
    pub start_line: u32,
    pub end_line: u32,
}

impl SourceRange {
    /// Create a new range.
    pub fn new(start: u32, end: u32, start_line: u32, end_line: u32) -> Self {
        Self {
            start,
            end,
            start_line,
            end_line,
        }
    }

    /// Create a zero-width range at a single position.
    pub fn point(offset: u32, line: u32) -> Self {
        Self::new(offset, offset, line, line)
    }

    /// Merge two ranges into one that covers both.
    pub fn merge(self, other: SourceRange) -> SourceRange {
        SourceRange::new(
            self.start.min(other.start),
            self.end.max(other.end),
            self.start_line.min(other.start_line),
            self.end_line.max(other.end_line),
        )
    }

    /// Length in bytes.
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `start <= end` and `start_line <= end_line`.
    pub fn is_well_ordered(&self) -> bool {
        self.start <= self.end && self.start_line <= self.end_line
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}..{}", self.start_line, self.start, self.end)
    }
}

/// A decoded source span: the text it covers plus its four ordinals.
///
/// Produced by the boundary layer from a span record. Owns its text, so it
/// stays valid after the engine frees or overwrites the bytes it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub start: u32,
    pub end: u32,
    pub start_line: u32,
    pub end_line: u32,
}

impl Span {
    /// Create a span from its text and range.
    pub fn new(text: impl Into<String>, range: SourceRange) -> Self {
        Self {
            text: text.into(),
            start: range.start,
            end: range.end,
            start_line: range.start_line,
            end_line: range.end_line,
        }
    }

    /// The ordinals without the text.
    pub fn range(&self) -> SourceRange {
        SourceRange::new(self.start, self.end, self.start_line, self.end_line)
    }

    pub fn is_well_ordered(&self) -> bool {
        self.range().is_well_ordered()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.range(), self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_point() {
        let r = SourceRange::point(7, 2);
        assert_eq!(r.start, 7);
        assert_eq!(r.end, 7);
        assert_eq!(r.start_line, 2);
        assert_eq!(r.end_line, 2);
        assert!(r.is_empty());
    }

    #[test]
    fn test_range_merge() {
        let a = SourceRange::new(4, 9, 1, 1);
        let b = SourceRange::new(12, 20, 2, 3);
        let merged = a.merge(b);
        assert_eq!(merged, SourceRange::new(4, 20, 1, 3));
        assert_eq!(b.merge(a), merged);
    }

    #[test]
    fn test_range_ordering() {
        assert!(SourceRange::new(0, 5, 1, 1).is_well_ordered());
        assert!(!SourceRange::new(6, 5, 1, 1).is_well_ordered());
        assert!(!SourceRange::new(0, 5, 2, 1).is_well_ordered());
    }

    #[test]
    fn test_range_display() {
        assert_eq!(SourceRange::new(3, 8, 2, 2).to_string(), "2:3..8");
    }

    #[test]
    fn test_span_roundtrips_range() {
        let range = SourceRange::new(0, 1, 1, 1);
        let span = Span::new("x", range);
        assert_eq!(span.range(), range);
        assert_eq!(span.text, "x");
        assert_eq!(span.to_string(), "1:0..1 \"x\"");
    }

    #[test]
    fn test_span_json_field_names() {
        let span = Span::new("abc", SourceRange::new(1, 4, 1, 1));
        let json = serde_json::to_string(&span).unwrap();
        assert_eq!(
            json,
            r#"{"text":"abc","start":1,"end":4,"start_line":1,"end_line":1}"#
        );
    }
}
