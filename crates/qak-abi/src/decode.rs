//! Record decoders: linear memory in, owned [`qak_types`] values out.
//!
//! Decoding is two steps. The raw record is read through its layout table
//! (see [`raw`](crate::raw)), then every string it references is copied out
//! and validated. The result never borrows engine memory.

use qak_types::{Diagnostic, Source, Span, Token};

use crate::config::Utf8Policy;
use crate::error::{AbiError, AbiResult};
use crate::layout::{self, RecordLayout};
use crate::memory::LinearMemory;
use crate::raw::{RawDiagnostic, RawSource, RawSpan, RawString, RawToken};

/// A host value that has a fixed-size record in engine memory.
pub trait Record: Sized {
    const LAYOUT: RecordLayout;

    fn decode<M: LinearMemory + ?Sized>(memory: &M, base: u32, policy: Utf8Policy) -> AbiResult<Self>;
}

/// Decode the string record at `base`.
pub fn decode_string<M: LinearMemory + ?Sized>(
    memory: &M,
    base: u32,
    policy: Utf8Policy,
) -> AbiResult<String> {
    RawString::read(memory, base)?.fetch(memory, policy)
}

/// Decode the span record at `base`.
///
/// The ordinals are not interpreted beyond `start <= end` and
/// `start_line <= end_line`.
pub fn decode_span<M: LinearMemory + ?Sized>(
    memory: &M,
    base: u32,
    policy: Utf8Policy,
) -> AbiResult<Span> {
    let raw = RawSpan::read(memory, base)?;
    materialize_span(memory, &raw, base, policy)
}

pub fn decode_token<M: LinearMemory + ?Sized>(
    memory: &M,
    base: u32,
    policy: Utf8Policy,
) -> AbiResult<Token> {
    let raw = RawToken::read(memory, base)?;
    let span_base = layout::token::SPAN.at(base)?;
    let span = materialize_span(memory, &raw.span, span_base, policy)?;
    Ok(Token::new(raw.kind, span))
}

pub fn decode_diagnostic<M: LinearMemory + ?Sized>(
    memory: &M,
    base: u32,
    policy: Utf8Policy,
) -> AbiResult<Diagnostic> {
    let raw = RawDiagnostic::read(memory, base)?;
    let message = raw.message.fetch(memory, policy)?;
    let span_base = layout::diagnostic::SPAN.at(base)?;
    let span = materialize_span(memory, &raw.span, span_base, policy)?;
    Ok(Diagnostic::new(message, span))
}

pub fn decode_source<M: LinearMemory + ?Sized>(
    memory: &M,
    base: u32,
    policy: Utf8Policy,
) -> AbiResult<Source> {
    let raw = RawSource::read(memory, base)?;
    let text = raw.data.fetch(memory, policy)?;
    let file_name = raw.file_name.fetch(memory, policy)?;
    Ok(Source::new(file_name, text))
}

fn materialize_span<M: LinearMemory + ?Sized>(
    memory: &M,
    raw: &RawSpan,
    base: u32,
    policy: Utf8Policy,
) -> AbiResult<Span> {
    let range = raw.range();
    if range.start > range.end {
        return Err(malformed_span(base, format!("start {} > end {}", range.start, range.end)));
    }
    if range.start_line > range.end_line {
        return Err(malformed_span(
            base,
            format!("start_line {} > end_line {}", range.start_line, range.end_line),
        ));
    }
    let text = raw.text.fetch(memory, policy)?;
    Ok(Span::new(text, range))
}

fn malformed_span(offset: u32, reason: String) -> AbiError {
    AbiError::MalformedRecord {
        record: layout::span::LAYOUT.name,
        offset,
        reason,
    }
}

impl Record for Span {
    const LAYOUT: RecordLayout = layout::span::LAYOUT;

    fn decode<M: LinearMemory + ?Sized>(memory: &M, base: u32, policy: Utf8Policy) -> AbiResult<Self> {
        decode_span(memory, base, policy)
    }
}

impl Record for Token {
    const LAYOUT: RecordLayout = layout::token::LAYOUT;

    fn decode<M: LinearMemory + ?Sized>(memory: &M, base: u32, policy: Utf8Policy) -> AbiResult<Self> {
        decode_token(memory, base, policy)
    }
}

impl Record for Diagnostic {
    const LAYOUT: RecordLayout = layout::diagnostic::LAYOUT;

    fn decode<M: LinearMemory + ?Sized>(memory: &M, base: u32, policy: Utf8Policy) -> AbiResult<Self> {
        decode_diagnostic(memory, base, policy)
    }
}

impl Record for Source {
    const LAYOUT: RecordLayout = layout::source::LAYOUT;

    fn decode<M: LinearMemory + ?Sized>(memory: &M, base: u32, policy: Utf8Policy) -> AbiResult<Self> {
        decode_source(memory, base, policy)
    }
}
