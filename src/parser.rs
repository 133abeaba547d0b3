//! Recursive descent parser for conformance scripts.
//!
//! Turns the scanner's tokens into an [`Expr`] tree. Syntax errors are
//! collected rather than returned early, so one pass reports everything that
//! is wrong with a script.
//!
//! Precedence, lowest first: assignment (right associative), `||`, `&&`, a
//! single comparison, concatenation by juxtaposition, `+ -`, `* / %`, unary
//! `!`, atoms.

use crate::ast::{BinOp, Expr};
use crate::error::{CompileError, Diagnostic};
use crate::scanner::{Scanner, unquote};
use crate::token::{Token, TokenKind};

/// Compile a script into its statement sequence.
///
/// Fails if the scanner or the parser reported anything; lexical errors are
/// returned in preference to syntax errors.
pub fn compile(source: &[u8]) -> Result<Expr, CompileError> {
    let mut parser = Parser::new(Scanner::new(source));
    let script = parser.parse_script();
    let (lexical, syntax) = parser.into_errors();
    if !lexical.is_empty() {
        return Err(CompileError::Lexical(lexical));
    }
    if !syntax.is_empty() {
        return Err(CompileError::Syntax(syntax));
    }
    Ok(script)
}

pub struct Parser<'a> {
    scanner: Scanner<'a>,
    /// One token of lookahead.
    tok: Token,
    errors: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    pub fn new(mut scanner: Scanner<'a>) -> Self {
        let tok = scanner.scan_token();
        Parser {
            scanner,
            tok,
            errors: Vec::new(),
        }
    }

    /// Lexical and syntax errors, in that order.
    pub fn into_errors(self) -> (Vec<Diagnostic>, Vec<Diagnostic>) {
        (self.scanner.into_errors(), self.errors)
    }

    pub fn parse_script(&mut self) -> Expr {
        let mut statements = Vec::new();
        loop {
            while self.tok.is(TokenKind::Newline) {
                self.advance();
            }
            if self.tok.is(TokenKind::Eof) {
                break;
            }
            statements.push(self.parse_statement());
        }
        Expr::Seq(statements)
    }

    fn parse_statement(&mut self) -> Expr {
        let stmt = match self.tok.kind {
            TokenKind::Gt => {
                self.advance();
                Expr::Send(Box::new(self.parse_assign()))
            }
            TokenKind::Lt => {
                self.advance();
                let start = self.tok.offset;
                let pattern = self.parse_assign();
                Expr::Receive {
                    pattern: Box::new(pattern),
                    source: self.source_since(start),
                }
            }
            TokenKind::Assert => {
                self.advance();
                let start = self.tok.offset;
                let cond = self.parse_assign();
                Expr::Assert {
                    cond: Box::new(cond),
                    source: self.source_since(start),
                }
            }
            _ => self.parse_assign(),
        };
        self.end_statement();
        stmt
    }

    /// A statement ends at a newline or at the end of input. Anything else is
    /// reported once and skipped up to the next line.
    fn end_statement(&mut self) {
        match self.tok.kind {
            TokenKind::Newline => self.advance(),
            TokenKind::Eof => {}
            kind => {
                self.error(self.tok.offset, format!("unexpected {kind}"));
                while !matches!(self.tok.kind, TokenKind::Newline | TokenKind::Eof) {
                    self.advance();
                }
                self.advance();
            }
        }
    }

    fn parse_assign(&mut self) -> Expr {
        let start = self.tok.offset;
        let lhs = self.parse_or();
        if !self.tok.is(TokenKind::Assign) {
            return lhs;
        }
        self.advance();
        let value = self.parse_assign();
        match lhs {
            Expr::Ident(name) => Expr::assign(name, value),
            other => {
                self.error(start, "not an identifier in assignment");
                other
            }
        }
    }

    fn parse_or(&mut self) -> Expr {
        let mut lhs = self.parse_and();
        while self.tok.is(TokenKind::Or) {
            self.advance();
            let rhs = self.parse_and();
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        lhs
    }

    fn parse_and(&mut self) -> Expr {
        let mut lhs = self.parse_compare();
        while self.tok.is(TokenKind::And) {
            self.advance();
            let rhs = self.parse_compare();
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        lhs
    }

    /// At most one comparison; `!=`, `<=` and `>=` lower to negations.
    fn parse_compare(&mut self) -> Expr {
        let lhs = self.parse_concat();
        let op = self.tok.kind;
        if !matches!(
            op,
            TokenKind::Eq
                | TokenKind::Ne
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::Le
                | TokenKind::Ge
        ) {
            return lhs;
        }
        self.advance();
        let rhs = self.parse_concat();
        match op {
            TokenKind::Eq => Expr::binary(BinOp::Eq, lhs, rhs),
            TokenKind::Ne => Expr::not(Expr::binary(BinOp::Eq, lhs, rhs)),
            TokenKind::Gt => Expr::binary(BinOp::Gt, lhs, rhs),
            TokenKind::Lt => Expr::binary(BinOp::Lt, lhs, rhs),
            TokenKind::Ge => Expr::not(Expr::binary(BinOp::Lt, lhs, rhs)),
            _ => Expr::not(Expr::binary(BinOp::Gt, lhs, rhs)),
        }
    }

    /// Adjacent operands concatenate, left associative: `"220 " . "\r\n"`.
    fn parse_concat(&mut self) -> Expr {
        let mut lhs = self.parse_additive();
        while starts_atom(self.tok.kind) {
            let rhs = self.parse_additive();
            lhs = Expr::concat(lhs, rhs);
        }
        lhs
    }

    fn parse_additive(&mut self) -> Expr {
        let mut lhs = self.parse_multiplicative();
        loop {
            let op = match self.tok.kind {
                TokenKind::Add => BinOp::Add,
                TokenKind::Sub => BinOp::Sub,
                _ => return lhs,
            };
            self.advance();
            let rhs = self.parse_multiplicative();
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn parse_multiplicative(&mut self) -> Expr {
        let mut lhs = self.parse_unary();
        loop {
            let op = match self.tok.kind {
                TokenKind::Mul => BinOp::Mul,
                TokenKind::Quo => BinOp::Quo,
                TokenKind::Rem => BinOp::Rem,
                _ => return lhs,
            };
            self.advance();
            let rhs = self.parse_unary();
            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> Expr {
        if self.tok.is(TokenKind::Not) {
            self.advance();
            return Expr::not(self.parse_unary());
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Expr {
        // A missing operand is reported without swallowing the line end, which
        // `end_statement` still needs.
        if matches!(self.tok.kind, TokenKind::Newline | TokenKind::Eof) {
            self.error(self.tok.offset, format!("unexpected {}", self.tok.kind));
            return placeholder();
        }

        let tok = self.bump();
        match tok.kind {
            TokenKind::Ident => Expr::Ident(tok.text_str().into_owned()),
            TokenKind::Int => match parse_int(&tok.text_str()) {
                Some(n) => Expr::Int(n),
                None => {
                    self.error(tok.offset, format!("malformed integer literal {}", tok.text_str()));
                    placeholder()
                }
            },
            TokenKind::String => Expr::Str(unquote(&tok.text)),
            TokenKind::Dot => Expr::Dot,
            TokenKind::LParen => {
                let inner = self.parse_assign();
                if self.tok.is(TokenKind::RParen) {
                    self.advance();
                } else {
                    self.error(self.tok.offset, format!("expected ')', found {}", self.tok.kind));
                }
                inner
            }
            TokenKind::TemplateStart => self.parse_template(&tok.text),
            kind => {
                self.error(tok.offset, format!("unexpected {kind}"));
                placeholder()
            }
        }
    }

    /// Lower a template into a right-nested chain of concatenations, ending
    /// with the implicit CRLF.
    fn parse_template(&mut self, first: &[u8]) -> Expr {
        let (text, mut more) = template_segment(first);
        let mut parts = vec![Expr::Str(text)];
        while more {
            parts.push(self.parse_assign());
            if !self.tok.is(TokenKind::TemplateCont) {
                self.error(self.tok.offset, format!("unexpected {}", self.tok.kind));
                break;
            }
            let segment = self.bump();
            let (text, cont) = template_segment(&segment.text);
            parts.push(Expr::Str(text));
            more = cont;
        }
        parts.push(Expr::str("\r\n"));
        parts
            .into_iter()
            .rev()
            .reduce(|rest, part| Expr::concat(part, rest))
            .unwrap_or_else(placeholder)
    }

    /// Source text from `start` up to the current token, trailing blanks removed.
    fn source_since(&self, start: usize) -> String {
        let end = self.tok.offset.max(start);
        String::from_utf8_lossy(&self.scanner.source()[start..end])
            .trim_end()
            .to_string()
    }

    fn advance(&mut self) {
        self.tok = self.scanner.scan_token();
    }

    /// Consume the current token and return it.
    fn bump(&mut self) -> Token {
        let next = self.scanner.scan_token();
        std::mem::replace(&mut self.tok, next)
    }

    fn error(&mut self, offset: usize, message: impl Into<String>) {
        self.errors.push(Diagnostic::new(offset, message));
    }
}

fn starts_atom(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident
            | TokenKind::Int
            | TokenKind::String
            | TokenKind::Dot
            | TokenKind::LParen
            | TokenKind::TemplateStart
    )
}

/// Stands in for a node that failed to parse; a script with errors never runs.
fn placeholder() -> Expr {
    Expr::Str(Vec::new())
}

/// Split a template token into its text and whether an embedded expression
/// follows. Everything between the delimiters is kept byte for byte.
fn template_segment(text: &[u8]) -> (Vec<u8>, bool) {
    let body = text.get(1..).unwrap_or_default();
    match body.strip_suffix(b"{") {
        Some(body) => (body.to_vec(), true),
        None => (body.to_vec(), false),
    }
}

/// Decimal, `0x` hexadecimal or leading-zero octal.
fn parse_int(text: &str) -> Option<i64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else if text.len() > 1
        && let Some(oct) = text.strip_prefix('0')
    {
        i64::from_str_radix(oct, 8).ok()
    } else {
        text.parse().ok()
    }
}
