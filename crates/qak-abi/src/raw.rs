//! Records as the engine stores them: pointers and words, no host strings.
//!
//! `read` pulls a record out of linear memory, `write` puts one in. Both go
//! through the field tables in [`layout`](crate::layout). Engines use
//! `write` to populate output buffers; the decoders use `read` and then
//! resolve the string pointers.

use qak_types::SourceRange;

use crate::config::Utf8Policy;
use crate::error::{AbiError, AbiResult};
use crate::layout;
use crate::memory::LinearMemory;

/// `{ data, length }`: a borrowed view of UTF-8 bytes in linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawString {
    pub ptr: u32,
    pub len: u32,
}

impl RawString {
    pub fn new(ptr: u32, len: u32) -> Self {
        Self { ptr, len }
    }

    pub fn read<M: LinearMemory + ?Sized>(memory: &M, base: u32) -> AbiResult<Self> {
        Ok(Self {
            ptr: memory.read_u32(layout::string::DATA.at(base)?)?,
            len: memory.read_u32(layout::string::LENGTH.at(base)?)?,
        })
    }

    pub fn write<M: LinearMemory + ?Sized>(&self, memory: &mut M, base: u32) -> AbiResult<()> {
        memory.write_u32(layout::string::DATA.at(base)?, self.ptr)?;
        memory.write_u32(layout::string::LENGTH.at(base)?, self.len)
    }

    /// A sub-view `start..end` bytes into this string.
    pub fn slice(&self, start: u32, end: u32) -> Self {
        let start = start.min(self.len);
        let end = end.clamp(start, self.len);
        Self::new(self.ptr + start, end - start)
    }

    /// Copy the referenced bytes out and decode them.
    pub fn fetch<M: LinearMemory + ?Sized>(&self, memory: &M, policy: Utf8Policy) -> AbiResult<String> {
        let bytes = memory.read_bytes(self.ptr, self.len)?;
        match policy {
            Utf8Policy::Reject => String::from_utf8(bytes).map_err(|e| AbiError::InvalidUtf8 {
                offset: self.ptr,
                source: e.utf8_error(),
            }),
            Utf8Policy::Replace => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }
}

/// Span record: text view plus four ordinals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSpan {
    pub text: RawString,
    pub start: u32,
    pub end: u32,
    pub start_line: u32,
    pub end_line: u32,
}

impl RawSpan {
    pub fn new(text: RawString, range: SourceRange) -> Self {
        Self {
            text,
            start: range.start,
            end: range.end,
            start_line: range.start_line,
            end_line: range.end_line,
        }
    }

    pub fn range(&self) -> SourceRange {
        SourceRange::new(self.start, self.end, self.start_line, self.end_line)
    }

    pub fn read<M: LinearMemory + ?Sized>(memory: &M, base: u32) -> AbiResult<Self> {
        use layout::span::*;
        Ok(Self {
            text: RawString::read(memory, TEXT.at(base)?)?,
            start: memory.read_u32(START.at(base)?)?,
            end: memory.read_u32(END.at(base)?)?,
            start_line: memory.read_u32(START_LINE.at(base)?)?,
            end_line: memory.read_u32(END_LINE.at(base)?)?,
        })
    }

    pub fn write<M: LinearMemory + ?Sized>(&self, memory: &mut M, base: u32) -> AbiResult<()> {
        use layout::span::*;
        self.text.write(memory, TEXT.at(base)?)?;
        memory.write_u32(START.at(base)?, self.start)?;
        memory.write_u32(END.at(base)?, self.end)?;
        memory.write_u32(START_LINE.at(base)?, self.start_line)?;
        memory.write_u32(END_LINE.at(base)?, self.end_line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawToken {
    pub kind: u32,
    pub span: RawSpan,
}

impl RawToken {
    pub fn read<M: LinearMemory + ?Sized>(memory: &M, base: u32) -> AbiResult<Self> {
        Ok(Self {
            kind: memory.read_u32(layout::token::KIND.at(base)?)?,
            span: RawSpan::read(memory, layout::token::SPAN.at(base)?)?,
        })
    }

    pub fn write<M: LinearMemory + ?Sized>(&self, memory: &mut M, base: u32) -> AbiResult<()> {
        memory.write_u32(layout::token::KIND.at(base)?, self.kind)?;
        self.span.write(memory, layout::token::SPAN.at(base)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawDiagnostic {
    pub message: RawString,
    pub span: RawSpan,
}

impl RawDiagnostic {
    pub fn read<M: LinearMemory + ?Sized>(memory: &M, base: u32) -> AbiResult<Self> {
        Ok(Self {
            message: RawString::read(memory, layout::diagnostic::MESSAGE.at(base)?)?,
            span: RawSpan::read(memory, layout::diagnostic::SPAN.at(base)?)?,
        })
    }

    pub fn write<M: LinearMemory + ?Sized>(&self, memory: &mut M, base: u32) -> AbiResult<()> {
        self.message
            .write(memory, layout::diagnostic::MESSAGE.at(base)?)?;
        self.span.write(memory, layout::diagnostic::SPAN.at(base)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSource {
    pub data: RawString,
    pub file_name: RawString,
}

impl RawSource {
    pub fn read<M: LinearMemory + ?Sized>(memory: &M, base: u32) -> AbiResult<Self> {
        Ok(Self {
            data: RawString::read(memory, layout::source::DATA.at(base)?)?,
            file_name: RawString::read(memory, layout::source::FILE_NAME.at(base)?)?,
        })
    }

    pub fn write<M: LinearMemory + ?Sized>(&self, memory: &mut M, base: u32) -> AbiResult<()> {
        self.data.write(memory, layout::source::DATA.at(base)?)?;
        self.file_name
            .write(memory, layout::source::FILE_NAME.at(base)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::testing::TestMemory;

    #[test]
    fn test_span_record_byte_layout() {
        let mut mem = TestMemory::new(128);
        let span = RawSpan::new(RawString::new(0x40, 3), SourceRange::new(5, 8, 2, 2));
        span.write(&mut mem, 16).unwrap();

        let words: Vec<u32> = (0..6).map(|i| mem.read_u32(16 + i * 4).unwrap()).collect();
        assert_eq!(words, vec![0x40, 3, 5, 8, 2, 2]);
    }

    #[test]
    fn test_token_record_byte_layout() {
        let mut mem = TestMemory::new(128);
        let token = RawToken {
            kind: 38,
            span: RawSpan::new(RawString::new(0x50, 1), SourceRange::new(0, 1, 1, 1)),
        };
        token.write(&mut mem, 32).unwrap();
        assert_eq!(mem.read_u32(32).unwrap(), 38);
        assert_eq!(mem.read_u32(36).unwrap(), 0x50);
        assert_eq!(mem.read_u32(40).unwrap(), 1);
        assert_eq!(mem.read_u32(56).unwrap(), 1, "end_line is the last word");
        assert_eq!(RawToken::read(&mem, 32).unwrap(), token);
    }

    #[test]
    fn test_diagnostic_record_byte_layout() {
        let mut mem = TestMemory::new(128);
        let diag = RawDiagnostic {
            message: RawString::new(0x60, 12),
            span: RawSpan::new(RawString::new(0x70, 0), SourceRange::point(4, 1)),
        };
        diag.write(&mut mem, 8).unwrap();
        assert_eq!(mem.read_u32(8).unwrap(), 0x60);
        assert_eq!(mem.read_u32(12).unwrap(), 12);
        assert_eq!(mem.read_u32(16).unwrap(), 0x70, "span starts at +8");
        assert_eq!(RawDiagnostic::read(&mem, 8).unwrap(), diag);
    }

    #[test]
    fn test_source_record_byte_layout() {
        let mut mem = TestMemory::new(64);
        let source = RawSource {
            data: RawString::new(0x20, 5),
            file_name: RawString::new(0x30, 8),
        };
        source.write(&mut mem, 0).unwrap();
        assert_eq!(&mem.bytes[0..16], &[0x20, 0, 0, 0, 5, 0, 0, 0, 0x30, 0, 0, 0, 8, 0, 0, 0]);
    }

    #[test]
    fn test_fetch_utf8_policies() {
        let mut mem = TestMemory::new(64);
        mem.poke(40, &[b'a', 0xff, b'b']);
        let s = RawString::new(40, 3);
        let err = s.fetch(&mem, Utf8Policy::Reject).unwrap_err();
        assert!(matches!(err, AbiError::InvalidUtf8 { offset: 40, .. }));
        assert_eq!(s.fetch(&mem, Utf8Policy::Replace).unwrap(), "a\u{fffd}b");
    }

    #[test]
    fn test_fetch_out_of_bounds() {
        let mem = TestMemory::new(64);
        let err = RawString::new(60, 8).fetch(&mem, Utf8Policy::Reject).unwrap_err();
        assert!(matches!(err, AbiError::OutOfBounds { offset: 60, len: 8, .. }));
    }

    #[test]
    fn test_slice_clamps() {
        let s = RawString::new(100, 10);
        assert_eq!(s.slice(2, 5), RawString::new(102, 3));
        assert_eq!(s.slice(8, 20), RawString::new(108, 2));
        assert_eq!(s.slice(12, 14), RawString::new(110, 0));
    }
}
