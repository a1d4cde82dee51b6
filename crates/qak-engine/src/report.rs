//! Text the print entry points emit.

use qak_types::{SourceFile, SourceRange, TokenKind};

use crate::heap::Heap;

/// One block per error: a header naming file and line, the offending line,
/// and a caret underline of the error's span. Tabs in the line are kept in
/// the underline so the carets line up.
pub fn format_errors(file: &SourceFile, errors: &[(String, SourceRange)]) -> String {
    let mut out = String::new();
    for (message, range) in errors {
        out.push_str(&format!(
            "Error ({}:{}): {}\n",
            file.name, range.start_line, message
        ));
        let Some(line) = file.line(range.start_line).filter(|l| !l.is_empty()) else {
            continue;
        };
        out.push_str(line);
        out.push('\n');

        let line_start = file.line_start(range.start_line).unwrap_or_default() as i64;
        let error_start = i64::from(range.start) - line_start;
        let error_end = error_start + i64::from(range.len()) - 1;
        for (i, byte) in line.bytes().enumerate() {
            let i = i as i64;
            out.push(if i >= error_start && i <= error_end {
                '^'
            } else if byte == b'\t' {
                '\t'
            } else {
                ' '
            });
        }
        out.push('\n');
    }
    out.push('\n');
    out
}

/// One line per token: range, kind, text.
pub fn format_tokens(text: &str, tokens: impl IntoIterator<Item = (u32, SourceRange)>) -> String {
    let mut out = String::new();
    for (kind, range) in tokens {
        let kind = TokenKind::from_raw(kind).map_or_else(|| format!("#{kind}"), |k| k.to_string());
        let slice = text
            .get(range.start as usize..range.end as usize)
            .unwrap_or_default();
        out.push_str(&format!("{range} {kind}: {slice}\n"));
    }
    out
}

/// Live heap blocks followed by a summary line.
pub fn format_memory_usage(heap: &Heap) -> String {
    let stats = heap.stats();
    if stats.live_allocations == 0 {
        return "No allocations.\n".to_string();
    }
    let mut out = String::new();
    for (offset, size) in heap.blocks() {
        out.push_str(&format!("{offset:#010x}: {size} bytes\n"));
    }
    out.push_str(&format!(
        "{} allocations, {} bytes live, {} bytes peak, limit {} bytes\n",
        stats.live_allocations,
        stats.live_bytes,
        stats.peak_bytes,
        heap.limit()
    ));
    out
}
