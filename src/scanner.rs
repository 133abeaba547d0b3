//! Lexical scanner for conformance scripts.
//!
//! A single forward pass over the source bytes that yields [`Token`]s lazily.
//! Errors do not stop the scan; they are collected so that one run reports
//! every lexical problem in the file.

use itertools::Itertools;
use phf::{Map, phf_map};

use crate::error::Diagnostic;
use crate::token::{Token, TokenKind};

/// Single-character escapes and the byte they stand for.
const SIMPLE_ESCAPES: Map<char, u8> = phf_map! {
    'a' => 0x07,
    'b' => 0x08,
    'f' => 0x0c,
    'n' => b'\n',
    'r' => b'\r',
    't' => b'\t',
    'v' => 0x0b,
    '\\' => b'\\',
};

pub struct Scanner<'a> {
    src: &'a [u8],
    /// Current character, `None` at end of input.
    ch: Option<char>,
    /// Byte offset of `ch`.
    offset: usize,
    /// Byte offset of the character after `ch`.
    next_offset: usize,
    finished: bool,
    errors: Vec<Diagnostic>,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        let mut scanner = Scanner {
            src,
            ch: None,
            offset: 0,
            next_offset: 0,
            finished: false,
            errors: Vec::new(),
        };
        scanner.advance();
        scanner
    }

    /// The buffer being scanned.
    pub fn source(&self) -> &'a [u8] {
        self.src
    }

    pub fn into_errors(self) -> Vec<Diagnostic> {
        self.errors
    }

    /// Scan the next token. Keeps returning [`TokenKind::Eof`] once the input
    /// is exhausted.
    pub fn scan_token(&mut self) -> Token {
        self.skip_whitespace();

        let offset = self.offset;
        let Some(ch) = self.ch else {
            return Token::new(TokenKind::Eof, "", offset);
        };

        if is_letter(ch) {
            self.scan_ident();
            return Token::new(TokenKind::Ident, self.text_from(offset), offset);
        }
        if ch.is_ascii_digit() {
            self.scan_int();
            return Token::new(TokenKind::Int, self.text_from(offset), offset);
        }

        self.advance();
        let kind = match ch {
            '\n' => TokenKind::Newline,
            ':' => {
                self.scan_template_part();
                TokenKind::TemplateStart
            }
            '}' => {
                self.scan_template_part();
                TokenKind::TemplateCont
            }
            '"' => {
                self.scan_string(offset);
                TokenKind::String
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '.' => TokenKind::Dot,
            '~' => TokenKind::Assert,
            '+' => TokenKind::Add,
            '-' => TokenKind::Sub,
            '*' => TokenKind::Mul,
            '/' => TokenKind::Quo,
            '%' => TokenKind::Rem,
            '=' => self.either('=', TokenKind::Eq, TokenKind::Assign),
            '!' => self.either('=', TokenKind::Ne, TokenKind::Not),
            '<' => self.either('=', TokenKind::Le, TokenKind::Lt),
            '>' => self.either('=', TokenKind::Ge, TokenKind::Gt),
            '&' => self.doubled('&', TokenKind::And, offset),
            '|' => self.doubled('|', TokenKind::Or, offset),
            _ => {
                self.error(offset, format!("invalid character {ch:?}"));
                TokenKind::Invalid
            }
        };
        Token::new(kind, self.text_from(offset), offset)
    }

    /// `second` following the current operator selects `long`, otherwise `short`.
    fn either(&mut self, second: char, long: TokenKind, short: TokenKind) -> TokenKind {
        if self.ch == Some(second) {
            self.advance();
            long
        } else {
            short
        }
    }

    /// Operators that only exist doubled (`&&`, `||`).
    fn doubled(&mut self, ch: char, kind: TokenKind, offset: usize) -> TokenKind {
        if self.ch == Some(ch) {
            self.advance();
            kind
        } else {
            self.error(offset, format!("expected '{ch}{ch}'"));
            TokenKind::Invalid
        }
    }

    fn scan_ident(&mut self) {
        while self.ch.is_some_and(|c| is_letter(c) || c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn scan_int(&mut self) {
        if self.ch == Some('0') {
            self.advance();
            if matches!(self.ch, Some('x' | 'X')) {
                self.advance();
                self.scan_digits(16);
            } else {
                self.scan_digits(8);
            }
        } else {
            self.scan_digits(10);
        }
    }

    fn scan_digits(&mut self, base: u32) {
        while self.ch.is_some_and(|c| c.is_digit(base)) {
            self.advance();
        }
    }

    /// Template text runs to the end of the line or to an opening `{`, which
    /// is included in the token. The leading `:` or `}` is already consumed.
    fn scan_template_part(&mut self) {
        while !matches!(self.ch, None | Some('\n' | '{')) {
            self.advance();
        }
        if self.ch == Some('{') {
            self.advance();
        }
    }

    /// The opening quote is already consumed; `start` is its offset.
    fn scan_string(&mut self, start: usize) {
        loop {
            match self.ch {
                Some('"') => {
                    self.advance();
                    return;
                }
                None | Some('\n') => {
                    self.error(start, "string not terminated");
                    return;
                }
                Some('\\') => {
                    self.advance();
                    self.scan_escape('"');
                }
                Some(_) => self.advance(),
            }
        }
    }

    /// Validate one escape sequence; the backslash is already consumed.
    fn scan_escape(&mut self, quote: char) {
        let offset = self.offset;

        let (mut digits, base, max) = match self.ch {
            Some(c) if c == quote || SIMPLE_ESCAPES.contains_key(&c) => {
                self.advance();
                return;
            }
            Some('0'..='7') => (3, 8, 0xff),
            Some('x') => {
                self.advance();
                (2, 16, 0xff)
            }
            Some('u') => {
                self.advance();
                (4, 16, char::MAX as u32)
            }
            Some('U') => {
                self.advance();
                (8, 16, char::MAX as u32)
            }
            Some('\n') | None => {
                self.error(offset, "unknown escape sequence");
                return;
            }
            Some(_) => {
                self.advance();
                self.error(offset, "unknown escape sequence");
                return;
            }
        };

        let mut value: u32 = 0;
        while digits > 0 {
            match self.ch.and_then(|c| c.to_digit(base)) {
                Some(d) => {
                    value = value * base + d;
                    self.advance();
                    digits -= 1;
                }
                None => {
                    let message = match self.ch {
                        None | Some('\n') => "escape sequence not terminated",
                        Some(_) => "illegal character in escape sequence",
                    };
                    self.error(self.offset, message);
                    break;
                }
            }
        }
        // Skip what is left of a broken escape, without running into the quote.
        while digits > 0 && self.ch.is_some_and(|c| c != quote && c != '\n') {
            self.advance();
            digits -= 1;
        }

        if value > max || (0xd800..0xe000).contains(&value) {
            self.error(offset, "escape sequence is invalid Unicode code point");
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.ch, Some(' ' | '\t' | '\r')) {
            self.advance();
        }
    }

    fn advance(&mut self) {
        if self.next_offset < self.src.len() {
            self.offset = self.next_offset;
            let (ch, width) = decode_char(&self.src[self.offset..]);
            self.next_offset += width;
            self.ch = Some(ch);
        } else {
            self.offset = self.src.len();
            self.ch = None;
        }
    }

    fn text_from(&self, start: usize) -> &'a [u8] {
        &self.src[start..self.offset]
    }

    fn error(&mut self, offset: usize, message: impl Into<String>) {
        self.errors.push(Diagnostic::new(offset, message));
    }
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    /// Yields every token up to and including the final `Eof`, then `None`.
    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.scan_token();
        self.finished = token.is(TokenKind::Eof);
        Some(token)
    }
}

fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Decode the UTF-8 character at the start of `bytes` (which must not be
/// empty). Malformed input decodes as U+FFFD, one byte wide.
fn decode_char(bytes: &[u8]) -> (char, usize) {
    let width = match bytes[0] {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    };
    bytes
        .get(..width)
        .and_then(|b| std::str::from_utf8(b).ok())
        .and_then(|s| s.chars().next())
        .map_or((char::REPLACEMENT_CHARACTER, 1), |ch| (ch, width))
}

/// Decode a quoted string literal (quotes included) into the bytes it denotes.
///
/// The scanner has already validated the literal, so this never fails:
/// anything malformed is kept as written and only reaches a script that will
/// not run anyway.
pub fn unquote(literal: &[u8]) -> Vec<u8> {
    let body = literal.strip_prefix(b"\"").unwrap_or(literal);
    let body = body.strip_suffix(b"\"").unwrap_or(body);

    let mut out = Vec::with_capacity(body.len());
    let mut bytes = body.iter().copied().peekable();
    while let Some(b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let Some(esc) = bytes.next() else {
            out.push(b'\\');
            break;
        };
        if let Some(&byte) = SIMPLE_ESCAPES.get(&char::from(esc)) {
            out.push(byte);
            continue;
        }
        let (len, radix) = match esc {
            b'"' => {
                out.push(b'"');
                continue;
            }
            b'0'..=b'7' => (2, 8),
            b'x' => (2, 16),
            b'u' => (4, 16),
            b'U' => (8, 16),
            _ => {
                out.extend_from_slice(&[b'\\', esc]);
                continue;
            }
        };
        let mut digits = String::new();
        if radix == 8 {
            digits.push(char::from(esc));
        }
        digits.extend(
            bytes
                .peeking_take_while(|b| char::from(*b).is_digit(radix))
                .take(len)
                .map(char::from),
        );
        let value = u32::from_str_radix(&digits, radix).unwrap_or(0);
        match esc {
            b'u' | b'U' => push_char(
                &mut out,
                char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER),
            ),
            _ => out.push(u8::try_from(value).unwrap_or(u8::MAX)),
        }
    }
    out
}

fn push_char(out: &mut Vec<u8>, ch: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use TokenKind::{
        Add, And, Assert, Assign, Dot, Eof, Eq, Ge, Gt, Ident, Int, Invalid, LParen, Le, Lt, Mul,
        Ne, Newline, Not, Or, Quo, RParen, Rem, Sub, TemplateCont, TemplateStart,
    };

    fn kinds(src: &str) -> Vec<TokenKind> {
        Scanner::new(src.as_bytes()).map(|t| t.kind).collect()
    }

    fn tokens(src: &str) -> Vec<(TokenKind, String)> {
        Scanner::new(src.as_bytes())
            .map(|t| (t.kind, t.text_str().into_owned()))
            .collect()
    }

    fn errors(src: &str) -> Vec<Diagnostic> {
        let mut scanner = Scanner::new(src.as_bytes());
        scanner.by_ref().for_each(drop);
        scanner.into_errors()
    }

    #[test]
    fn empty_input_is_just_eof() {
        assert_eq!(kinds(""), vec![Eof]);
    }

    #[test]
    fn iteration_stops_after_eof() {
        let mut scanner = Scanner::new(b"x");
        assert_eq!(scanner.next().map(|t| t.kind), Some(Ident));
        assert_eq!(scanner.next().map(|t| t.kind), Some(Eof));
        assert_eq!(scanner.next(), None);
        assert_eq!(scanner.scan_token().kind, Eof);
    }

    #[test]
    fn statement_markers_and_newlines() {
        assert_eq!(
            kinds("> a\n< b\n~ c\n"),
            vec![Gt, Ident, Newline, Lt, Ident, Newline, Assert, Ident, Newline, Eof]
        );
    }

    #[test]
    fn whitespace_is_skipped_but_newline_is_not() {
        assert_eq!(kinds(" \t\r x \r\n"), vec![Ident, Newline, Eof]);
    }

    #[test]
    fn operators() {
        assert_eq!(
            kinds("+ - * / % == != < > <= >= = ! && || . ( )"),
            vec![
                Add, Sub, Mul, Quo, Rem, Eq, Ne, Lt, Gt, Le, Ge, Assign, Not, And, Or, Dot,
                LParen, RParen, Eof
            ]
        );
    }

    #[test]
    fn identifiers_and_offsets() {
        let toks: Vec<Token> = Scanner::new(b"foo _bar9").collect();
        assert_eq!(toks[0], Token::new(Ident, "foo", 0));
        assert_eq!(toks[1], Token::new(Ident, "_bar9", 4));
        assert_eq!(toks[2], Token::new(Eof, "", 9));
    }

    #[test]
    fn integer_literals() {
        assert_eq!(
            tokens("123 0x1F 0X0a 017 0"),
            vec![
                (Int, "123".to_string()),
                (Int, "0x1F".to_string()),
                (Int, "0X0a".to_string()),
                (Int, "017".to_string()),
                (Int, "0".to_string()),
                (Eof, String::new()),
            ]
        );
    }

    #[test]
    fn octal_stops_at_non_octal_digit() {
        assert_eq!(
            tokens("08"),
            vec![
                (Int, "0".to_string()),
                (Int, "8".to_string()),
                (Eof, String::new())
            ]
        );
    }

    #[test]
    fn string_literal_keeps_quotes_and_escapes() {
        assert_eq!(
            tokens(r#""a\"b\n""#),
            vec![
                (TokenKind::String, r#""a\"b\n""#.to_string()),
                (Eof, String::new())
            ]
        );
    }

    #[test]
    fn template_with_embedded_expressions() {
        assert_eq!(
            tokens(":USER {name} x{n}\n"),
            vec![
                (TemplateStart, ":USER {".to_string()),
                (Ident, "name".to_string()),
                (TemplateCont, "} x{".to_string()),
                (Ident, "n".to_string()),
                (TemplateCont, "}".to_string()),
                (Newline, "\n".to_string()),
                (Eof, String::new()),
            ]
        );
    }

    #[test]
    fn template_text_is_raw() {
        assert_eq!(
            tokens(r#":a "b" \n"#),
            vec![
                (TemplateStart, r#":a "b" \n"#.to_string()),
                (Eof, String::new())
            ]
        );
    }

    #[test]
    fn template_keeps_bytes_and_carriage_return() {
        let toks: Vec<Token> = Scanner::new(b":A\xffB\r\n").collect();
        assert_eq!(
            toks,
            vec![
                Token::new(TemplateStart, b":A\xffB\r", 0),
                Token::new(Newline, "\n", 5),
                Token::new(Eof, "", 6),
            ]
        );
    }

    #[test]
    fn unterminated_string_is_anchored_at_quote() {
        assert_eq!(errors("x = \"abc\n"), vec![Diagnostic::new(4, "string not terminated")]);
        assert_eq!(
            kinds("\"abc\ny"),
            vec![TokenKind::String, Newline, Ident, Eof]
        );
    }

    #[test]
    fn single_ampersand_and_bar_are_errors() {
        assert_eq!(
            errors("a & b | c"),
            vec![Diagnostic::new(2, "expected '&&'"), Diagnostic::new(6, "expected '||'")]
        );
        assert_eq!(kinds("&"), vec![Invalid, Eof]);
    }

    #[test]
    fn invalid_characters_accumulate() {
        let errs = errors("@ x $\n#");
        assert_eq!(errs.len(), 3);
        assert_eq!(errs[0], Diagnostic::new(0, "invalid character '@'"));
        assert_eq!(errs[1].offset, 4);
        assert_eq!(errs[2].offset, 6);
    }

    #[test]
    fn non_ascii_character_is_reported_once() {
        let errs = errors("é x");
        assert_eq!(errs, vec![Diagnostic::new(0, "invalid character 'é'")]);
        assert_eq!(kinds("é x"), vec![Invalid, Ident, Eof]);
    }

    #[test]
    fn valid_escapes_produce_no_errors() {
        assert!(errors(r#""\a\b\f\n\r\t\v\\\" \101 \x41 é \U0001F600""#).is_empty());
    }

    #[test]
    fn unknown_escape() {
        assert_eq!(errors(r#""\q""#), vec![Diagnostic::new(2, "unknown escape sequence")]);
    }

    #[test]
    fn illegal_escape_digit() {
        assert_eq!(
            errors(r#""\x4g""#),
            vec![Diagnostic::new(4, "illegal character in escape sequence")]
        );
    }

    #[test]
    fn short_escape_before_quote() {
        assert_eq!(
            errors(r#""\x4""#),
            vec![Diagnostic::new(4, "illegal character in escape sequence")]
        );
    }

    #[test]
    fn surrogate_and_out_of_range_code_points() {
        assert_eq!(
            errors(r#""\ud800""#),
            vec![Diagnostic::new(2, "escape sequence is invalid Unicode code point")]
        );
        assert_eq!(
            errors(r#""\U00110000""#),
            vec![Diagnostic::new(2, "escape sequence is invalid Unicode code point")]
        );
        assert_eq!(
            errors(r#""\400""#),
            vec![Diagnostic::new(2, "escape sequence is invalid Unicode code point")]
        );
    }

    #[test]
    fn scanning_continues_after_errors() {
        assert_eq!(
            kinds("@ > \"x\"\n"),
            vec![Invalid, Gt, TokenKind::String, Newline, Eof]
        );
    }

    #[test]
    fn unquote_simple_escapes() {
        assert_eq!(unquote(br#""a\tb\r\n\\\"""#), b"a\tb\r\n\\\"".to_vec());
    }

    #[test]
    fn unquote_numeric_escapes() {
        assert_eq!(unquote(r#""\101\x42é""#.as_bytes()), "AB\u{e9}".as_bytes().to_vec());
        assert_eq!(unquote(br#""\xff""#), vec![0xff]);
        assert_eq!(unquote(br#""\U0001F600""#), "\u{1F600}".as_bytes().to_vec());
    }

    #[test]
    fn unquote_plain_text() {
        assert_eq!(unquote(br#""PING""#), b"PING".to_vec());
        assert_eq!(unquote(br#""""#), Vec::<u8>::new());
    }
}
