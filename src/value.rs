//! Runtime values and their coercions.
//!
//! Coercions are total. Converting a string to an integer or a boolean never
//! looks at its contents: every string is `0` and `true`. Scripts that need to
//! compare captured digits must do so textually.

use std::borrow::Cow;
use std::fmt;

/// A value produced by evaluating an expression. Strings are byte strings,
/// since they are compared against whatever arrives on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Str(Vec<u8>),
    Int(i64),
    Bool(bool),
}

impl Value {
    /// String coercion: integers as decimal text, booleans as `true`/`false`.
    pub fn to_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Value::Str(s) => Cow::Borrowed(s.as_slice()),
            Value::Int(n) => Cow::Owned(n.to_string().into_bytes()),
            Value::Bool(b) => Cow::Borrowed(if *b { &b"true"[..] } else { &b"false"[..] }),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Value::Str(s) => s,
            other => other.to_bytes().into_owned(),
        }
    }

    pub fn to_int(&self) -> i64 {
        match self {
            Value::Int(n) => *n,
            Value::Str(_) | Value::Bool(_) => 0,
        }
    }

    pub fn to_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Str(_) | Value::Int(_) => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "\"{}\"", s.escape_ascii()),
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.as_bytes().to_vec())
    }
}

impl From<&[u8]> for Value {
    fn from(s: &[u8]) -> Self {
        Value::Str(s.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(s: Vec<u8>) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_coercions() {
        let v = Value::from("42");
        assert_eq!(&*v.to_bytes(), b"42");
        assert_eq!(v.to_int(), 0);
        assert!(v.to_bool());
    }

    #[test]
    fn empty_string_is_still_true() {
        assert!(Value::from("").to_bool());
    }

    #[test]
    fn integer_coercions() {
        let v = Value::from(-17);
        assert_eq!(&*v.to_bytes(), b"-17");
        assert_eq!(v.to_int(), -17);
        assert!(v.to_bool());
        assert!(Value::from(0).to_bool());
    }

    #[test]
    fn boolean_coercions() {
        assert_eq!(&*Value::from(true).to_bytes(), b"true");
        assert_eq!(&*Value::from(false).to_bytes(), b"false");
        assert_eq!(Value::from(true).to_int(), 0);
        assert!(!Value::from(false).to_bool());
    }

    #[test]
    fn into_bytes() {
        assert_eq!(Value::from(7).into_bytes(), b"7".to_vec());
        assert_eq!(Value::from("x").into_bytes(), b"x".to_vec());
    }

    #[test]
    fn display() {
        assert_eq!(Value::from("a\r\n").to_string(), r#""a\r\n""#);
        assert_eq!(Value::from(5).to_string(), "5");
        assert_eq!(Value::from(false).to_string(), "false");
    }
}
