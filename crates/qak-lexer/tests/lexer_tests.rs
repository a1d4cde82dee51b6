//! Tokenizer tests.
//!
//! Covers: simple and two-character tokens, number literals with suffixes,
//! character and string literals, identifiers and literal keywords,
//! comments, line tracking, error messages, and the 100-iteration
//! determinism test.

use qak_lexer::{tokenize, LexResult};
use qak_types::{SourceRange, TokenKind};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn kinds(source: &str) -> Vec<TokenKind> {
    let result = tokenize(source);
    assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
    result.tokens.iter().map(|t| t.kind).collect()
}

fn texts(source: &str) -> Vec<&str> {
    tokenize(source)
        .tokens
        .iter()
        .map(|t| t.text(source))
        .collect()
}

fn first_error(source: &str) -> String {
    let result: LexResult = tokenize(source);
    result
        .errors
        .first()
        .map(|e| e.message.clone())
        .unwrap_or_default()
}

// ─────────────────────────────────────────────────────────────────────
// Simple tokens
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_single_character_tokens() {
    let src = ". , ; : + - * / % ( ) [ ] { } < > = & | ^ ! ?";
    assert_eq!(
        kinds(src),
        vec![
            TokenKind::Period,
            TokenKind::Comma,
            TokenKind::Semicolon,
            TokenKind::Colon,
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Asterisk,
            TokenKind::ForwardSlash,
            TokenKind::Percentage,
            TokenKind::LeftParenthesis,
            TokenKind::RightParenthesis,
            TokenKind::LeftBracket,
            TokenKind::RightBracket,
            TokenKind::LeftCurly,
            TokenKind::RightCurly,
            TokenKind::Less,
            TokenKind::Greater,
            TokenKind::Assignment,
            TokenKind::And,
            TokenKind::Or,
            TokenKind::Xor,
            TokenKind::Not,
            TokenKind::QuestionMark,
        ]
    );
}

#[test]
fn test_two_character_tokens() {
    assert_eq!(
        kinds("<= >= != =="),
        vec![
            TokenKind::LessEqual,
            TokenKind::GreaterEqual,
            TokenKind::NotEqual,
            TokenKind::Equal,
        ]
    );
}

#[test]
fn test_two_character_token_spans() {
    let result = tokenize("a<=b");
    assert_eq!(result.tokens[1].range, SourceRange::new(1, 3, 1, 1));
}

#[test]
fn test_unknown_two_character_token() {
    assert_eq!(first_error("x += 1"), "Found unknown two character token");
}

#[test]
fn test_unknown_token() {
    assert_eq!(first_error("x = @"), "Unknown token");
    assert_eq!(first_error("\u{a7}"), "Unknown token");
}

// ─────────────────────────────────────────────────────────────────────
// Numbers
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_integer_and_float() {
    assert_eq!(
        kinds("123 1.5 7."),
        vec![
            TokenKind::IntegerLiteral,
            TokenKind::FloatLiteral,
            TokenKind::FloatLiteral,
        ]
    );
}

#[test]
fn test_hex_literal() {
    assert_eq!(kinds("0xff00"), vec![TokenKind::IntegerLiteral]);
    assert_eq!(texts("0xCAFE"), vec!["0xCAFE"]);
}

#[test]
fn test_number_suffixes() {
    assert_eq!(
        kinds("1b 2s 3l 4f 5d 1.5f 2.5d"),
        vec![
            TokenKind::ByteLiteral,
            TokenKind::ShortLiteral,
            TokenKind::LongLiteral,
            TokenKind::FloatLiteral,
            TokenKind::DoubleLiteral,
            TokenKind::FloatLiteral,
            TokenKind::DoubleLiteral,
        ]
    );
}

#[test]
fn test_fractional_suffix_errors() {
    assert_eq!(first_error("1.5b"), "Byte literal can not have a decimal point.");
    assert_eq!(first_error("1.5s"), "Short literal can not have a decimal point.");
    assert_eq!(first_error("1.5l"), "Long literal can not have a decimal point.");
}

// ─────────────────────────────────────────────────────────────────────
// Character & string literals
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_character_literals() {
    assert_eq!(
        kinds(r"'a' '\n' 'é'"),
        vec![TokenKind::CharacterLiteral; 3]
    );
    assert_eq!(texts(r"'\n'"), vec![r"'\n'"]);
}

#[test]
fn test_unclosed_character_literal() {
    assert_eq!(first_error("'ab'"), "Expected closing ' for character literal.");
}

#[test]
fn test_string_literal_keeps_escapes_and_quotes() {
    let src = r#"x = "say \"hi\"""#;
    assert_eq!(
        kinds(src),
        vec![
            TokenKind::Identifier,
            TokenKind::Assignment,
            TokenKind::StringLiteral,
        ]
    );
    assert_eq!(texts(src)[2], r#""say \"hi\"""#);
}

#[test]
fn test_unterminated_string() {
    assert_eq!(first_error("\"abc"), "String literal is not closed by double quote");
    assert_eq!(
        first_error("\"abc\nx\""),
        "String literal is not closed by double quote"
    );
}

#[test]
fn test_multibyte_string_offsets_are_bytes() {
    let result = tokenize("\"héllo\" x");
    assert_eq!(result.tokens[0].range.end, 8);
    assert_eq!(result.tokens[1].range, SourceRange::new(9, 10, 1, 1));
}

// ─────────────────────────────────────────────────────────────────────
// Identifiers
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_identifiers_and_literal_keywords() {
    assert_eq!(
        kinds("foo _bar true false nothing truth"),
        vec![
            TokenKind::Identifier,
            TokenKind::Identifier,
            TokenKind::BooleanLiteral,
            TokenKind::BooleanLiteral,
            TokenKind::NothingLiteral,
            TokenKind::Identifier,
        ]
    );
}

#[test]
fn test_keywords_are_identifiers() {
    assert_eq!(
        kinds("function var while if else return end"),
        vec![TokenKind::Identifier; 7]
    );
}

#[test]
fn test_unicode_identifier() {
    assert_eq!(kinds("größe = 1").first(), Some(&TokenKind::Identifier));
    assert_eq!(texts("größe = 1")[0], "größe");
}

#[test]
fn test_identifier_with_digits() {
    assert_eq!(texts("a1b2 3c"), vec!["a1b2", "3", "c"]);
}

// ─────────────────────────────────────────────────────────────────────
// Whitespace, comments, lines
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_empty_source() {
    let result = tokenize("");
    assert!(result.tokens.is_empty());
    assert!(!result.has_errors());
}

#[test]
fn test_whitespace_only() {
    assert!(kinds(" \t\r\n\n").is_empty());
}

#[test]
fn test_comments_skipped() {
    assert_eq!(
        kinds("# header\nx = 1 # trailing\n# done"),
        vec![
            TokenKind::Identifier,
            TokenKind::Assignment,
            TokenKind::IntegerLiteral,
        ]
    );
}

#[test]
fn test_line_numbers_are_one_based() {
    let result = tokenize("a\nb # c\n\nd");
    let lines: Vec<_> = result.tokens.iter().map(|t| t.range.start_line).collect();
    assert_eq!(lines, vec![1, 2, 4]);
}

#[test]
fn test_x_equals_one() {
    let result = tokenize("x = 1");
    let ranges: Vec<_> = result.tokens.iter().map(|t| (t.range.start, t.range.end)).collect();
    assert_eq!(ranges, vec![(0, 1), (2, 3), (4, 5)]);
}

#[test]
fn test_error_keeps_preceding_tokens() {
    let result = tokenize("x = 1 @ y");
    assert_eq!(result.tokens.len(), 3);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].range, SourceRange::new(6, 7, 1, 1));
}

// ─────────────────────────────────────────────────────────────────────
// Determinism
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_determinism_100_iterations() {
    let src = "function f(a: int): int\n  var b = a * 2 + 0x10 # twice\n  return b > 3 ? 'y' : \"no\"\nend\nf(1)";
    let first = tokenize(src);
    for i in 0..100 {
        assert_eq!(tokenize(src), first, "iteration {i} differs");
    }
}
