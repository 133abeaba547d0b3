//! Tokens produced by the [`Scanner`](crate::scanner::Scanner).

use std::borrow::Cow;
use std::fmt;

/// The closed set of token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Invalid,
    Eof,
    Newline,
    /// `foo`
    Ident,
    /// `123`, `0x7f`, `017`
    Int,
    /// `"abc"`
    String,
    /// `:text{` or `:text` up to the end of the line
    TemplateStart,
    /// `}text{` or `}text` up to the end of the line
    TemplateCont,
    /// `~`
    Assert,
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Assign,
    Not,
    Dot,
    Or,
    And,
    LParen,
    RParen,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Invalid => "INVALID",
            TokenKind::Eof => "EOF",
            TokenKind::Newline => "NL",
            TokenKind::Ident => "IDENT",
            TokenKind::Int => "INT",
            TokenKind::String => "STRING",
            TokenKind::TemplateStart => "TSTART",
            TokenKind::TemplateCont => "TCONT",
            TokenKind::Assert => "'~'",
            TokenKind::Add => "'+'",
            TokenKind::Sub => "'-'",
            TokenKind::Mul => "'*'",
            TokenKind::Quo => "'/'",
            TokenKind::Rem => "'%'",
            TokenKind::Eq => "'=='",
            TokenKind::Ne => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Gt => "'>'",
            TokenKind::Le => "'<='",
            TokenKind::Ge => "'>='",
            TokenKind::Assign => "'='",
            TokenKind::Not => "'!'",
            TokenKind::Dot => "'.'",
            TokenKind::Or => "'||'",
            TokenKind::And => "'&&'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single token: its kind, the source bytes it covers and its byte offset.
///
/// For template segments the text keeps the opening `:`/`}` and, when the
/// segment is followed by an embedded expression, the closing `{`. The bytes
/// are exactly those of the source, valid UTF-8 or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: Vec<u8>,
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<Vec<u8>>, offset: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            offset,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// The text as a string, for identifiers, numbers and messages.
    pub fn text_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.text)
    }
}
