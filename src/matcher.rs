//! Concatenation, in both directions.
//!
//! Without a match context a concatenation simply joins the string forms of
//! its operands. With one, it splits the context between the operands so that
//! each side matches its part. The cheap cases are tried first: if either side
//! evaluates without needing the context, it is used as a literal prefix or
//! suffix and only the other side sees the remainder. Otherwise every split
//! point is tried and exactly one must succeed.
//!
//! Split points are the character starts of the context, so the whole context
//! is never given to the left operand and a multi-byte UTF-8 sequence is never
//! cut in two. Bytes that are not valid UTF-8 each count as a character. An
//! empty context has no split points at all.

use log::trace;

use crate::ast::Expr;
use crate::environment::Scope;
use crate::error::RuntimeError;
use crate::interpreter::eval;
use crate::value::Value;

/// Evaluate `lhs rhs` as a concatenation in `scope`.
pub fn eval_concat(lhs: &Expr, rhs: &Expr, scope: &mut Scope<'_, '_>) -> Result<Value, RuntimeError> {
    // Probe both sides with the context cleared.
    let left = probe(eval(lhs, &mut scope.narrow(None)))?;
    let right = probe(eval(rhs, &mut scope.narrow(None)))?;

    if let (Some(left), Some(right)) = (&left, &right) {
        return Ok(join(left, right));
    }

    let Some(data) = scope.dot() else {
        trace!("concat: operand needs a match context and none is set");
        return Err(RuntimeError::NoMatch);
    };

    match (left, right) {
        (Some(left), _) => {
            let prefix = left.into_bytes();
            let Some(rest) = data.strip_prefix(prefix.as_slice()) else {
                trace!("concat: \"{}\" is not a prefix of \"{}\"", prefix.escape_ascii(), data.escape_ascii());
                return Err(RuntimeError::NoMatch);
            };
            let right = eval(rhs, &mut scope.narrow(Some(rest)))?;
            Ok(join(&Value::Str(prefix), &right))
        }
        (None, Some(right)) => {
            let suffix = right.into_bytes();
            let Some(rest) = data.strip_suffix(suffix.as_slice()) else {
                trace!("concat: \"{}\" is not a suffix of \"{}\"", suffix.escape_ascii(), data.escape_ascii());
                return Err(RuntimeError::NoMatch);
            };
            let left = eval(lhs, &mut scope.narrow(Some(rest)))?;
            Ok(join(&left, &Value::Str(suffix)))
        }
        (None, None) => split(lhs, rhs, data, scope),
    }
}

/// Try every split point of `data` and accept the only one that works.
fn split(lhs: &Expr, rhs: &Expr, data: &[u8], scope: &mut Scope<'_, '_>) -> Result<Value, RuntimeError> {
    let mut hit = None;
    for at in split_points(data) {
        let (head, tail) = data.split_at(at);
        if probe(eval(lhs, &mut scope.narrow(Some(head))))?.is_none() {
            continue;
        }
        if probe(eval(rhs, &mut scope.narrow(Some(tail))))?.is_none() {
            continue;
        }
        if let Some(first) = hit {
            trace!("concat: \"{}\" splits at both {first} and {at}", data.escape_ascii());
            return Err(RuntimeError::Ambiguous);
        }
        hit = Some(at);
    }

    let Some(at) = hit else {
        trace!("concat: no split of \"{}\" matches", data.escape_ascii());
        return Err(RuntimeError::NoMatch);
    };
    trace!("concat: \"{}\" splits at {at}", data.escape_ascii());

    // Probes after the hit may have rebound names; replay the winner so the
    // bindings it made are the ones left behind.
    let (head, tail) = data.split_at(at);
    let left = eval(lhs, &mut scope.narrow(Some(head)))?;
    let right = eval(rhs, &mut scope.narrow(Some(tail)))?;
    Ok(join(&left, &right))
}

/// Offsets at which a character starts.
fn split_points(data: &[u8]) -> Vec<usize> {
    let mut points = Vec::with_capacity(data.len());
    let mut base = 0;
    for chunk in data.utf8_chunks() {
        let valid = chunk.valid();
        points.extend(valid.char_indices().map(|(i, _)| base + i));
        base += valid.len();
        let invalid = chunk.invalid().len();
        points.extend(base..base + invalid);
        base += invalid;
    }
    points
}

/// Turn a match failure into `None`, leaving every other outcome alone.
pub fn probe(result: Result<Value, RuntimeError>) -> Result<Option<Value>, RuntimeError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_match_failure() => Ok(None),
        Err(err) => Err(err),
    }
}

fn join(left: &Value, right: &Value) -> Value {
    let mut joined = left.to_bytes().into_owned();
    joined.extend_from_slice(&right.to_bytes());
    Value::Str(joined)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ast::BinOp;
    use crate::environment::Environment;

    fn dot() -> Expr {
        Expr::Dot
    }

    fn matching(expr: &Expr, data: &[u8]) -> Result<Value, RuntimeError> {
        let mut conn = Cursor::new(Vec::new());
        let mut env = Environment::new(&mut conn);
        let mut scope = env.scope();
        eval(expr, &mut scope.narrow(Some(data)))
    }

    fn bindings_after(expr: &Expr, data: &[u8], names: &[&str]) -> Vec<Option<Value>> {
        let mut conn = Cursor::new(Vec::new());
        let mut env = Environment::new(&mut conn);
        {
            let mut scope = env.scope();
            eval(expr, &mut scope.narrow(Some(data))).expect("match should succeed");
        }
        names.iter().map(|name| env.lookup(name).cloned()).collect()
    }

    // --- Without a context ---

    #[test]
    fn joins_string_forms() {
        let mut conn = Cursor::new(Vec::new());
        let mut env = Environment::new(&mut conn);
        let truth = Expr::binary(BinOp::Eq, Expr::Int(1), Expr::Int(1));
        let expr = Expr::concat(Expr::Int(42), Expr::concat(Expr::str(" "), truth));
        let value = eval(&expr, &mut env.scope()).unwrap();
        assert_eq!(value, Value::from("42 true"));
    }

    #[test]
    fn context_dependent_operand_without_context_fails() {
        let mut conn = Cursor::new(Vec::new());
        let mut env = Environment::new(&mut conn);
        let expr = Expr::concat(Expr::str("a"), dot());
        assert!(matches!(eval(&expr, &mut env.scope()), Err(RuntimeError::NoMatch)));
    }

    // --- Literal prefix and suffix ---

    #[test]
    fn self_sufficient_operands_ignore_the_context() {
        let expr = Expr::concat(Expr::str("a"), Expr::str("b"));
        assert_eq!(matching(&expr, b"zzz").unwrap(), Value::from("ab"));
    }

    #[test]
    fn literal_prefix_hands_the_rest_to_the_right() {
        let expr = Expr::concat(Expr::str("x"), dot());
        assert_eq!(matching(&expr, b"xyz").unwrap(), Value::from("xyz"));
    }

    #[test]
    fn missing_prefix_is_no_match() {
        let expr = Expr::concat(Expr::str("x"), dot());
        assert!(matches!(matching(&expr, b"yz"), Err(RuntimeError::NoMatch)));
    }

    #[test]
    fn literal_suffix_hands_the_rest_to_the_left() {
        let expr = Expr::concat(Expr::assign("body", dot()), Expr::str("\r\n"));
        assert_eq!(
            bindings_after(&expr, b"abc\r\n", &["body"]),
            vec![Some(Value::from("abc"))]
        );
    }

    #[test]
    fn missing_suffix_is_no_match() {
        let expr = Expr::concat(dot(), Expr::str("\r\n"));
        assert!(matches!(matching(&expr, b"abc\n"), Err(RuntimeError::NoMatch)));
    }

    #[test]
    fn greeting_with_wildcard_middle() {
        let expr = Expr::concat(Expr::concat(Expr::str("220 "), dot()), Expr::str("\r\n"));
        assert_eq!(matching(&expr, b"220 ready\r\n").unwrap(), Value::from("220 ready\r\n"));
    }

    // --- Split search ---

    #[test]
    fn unique_split_binds_both_sides() {
        let expr = Expr::concat(
            Expr::assign("a", dot()),
            Expr::concat(Expr::str(" "), Expr::assign("b", dot())),
        );
        assert_eq!(
            bindings_after(&expr, b"foo bar", &["a", "b"]),
            vec![Some(Value::from("foo")), Some(Value::from("bar"))]
        );
    }

    #[test]
    fn two_wildcards_are_ambiguous() {
        let expr = Expr::concat(dot(), dot());
        assert!(matches!(matching(&expr, b"ab"), Err(RuntimeError::Ambiguous)));
    }

    #[test]
    fn single_byte_has_one_split() {
        let expr = Expr::concat(Expr::assign("a", dot()), Expr::assign("b", dot()));
        assert_eq!(
            bindings_after(&expr, b"q", &["a", "b"]),
            vec![Some(Value::from("")), Some(Value::from("q"))]
        );
    }

    #[test]
    fn splits_fall_between_characters() {
        let expr = Expr::concat(Expr::assign("a", dot()), Expr::assign("b", dot()));
        assert_eq!(
            bindings_after(&expr, "é".as_bytes(), &["a", "b"]),
            vec![Some(Value::from("")), Some(Value::from("é"))]
        );
        assert!(matches!(matching(&expr, "éa".as_bytes()), Err(RuntimeError::Ambiguous)));
    }

    #[test]
    fn malformed_bytes_split_one_at_a_time() {
        assert_eq!(split_points(b"a\xff\xfeb"), vec![0, 1, 2, 3]);
        assert_eq!(split_points("xé€".as_bytes()), vec![0, 1, 3]);
        assert_eq!(split_points(b"\xe2\x82A"), vec![0, 1, 2]);
        assert!(split_points(b"").is_empty());
        let expr = Expr::concat(dot(), dot());
        assert!(matches!(matching(&expr, b"\xff\xfe"), Err(RuntimeError::Ambiguous)));
    }

    #[test]
    fn empty_context_has_no_splits() {
        let expr = Expr::concat(dot(), dot());
        assert!(matches!(matching(&expr, b""), Err(RuntimeError::NoMatch)));
    }

    #[test]
    fn repeated_separator_is_ambiguous() {
        let expr = Expr::concat(dot(), Expr::concat(Expr::str(" "), dot()));
        assert!(matches!(matching(&expr, b"a b c"), Err(RuntimeError::Ambiguous)));
    }

    #[test]
    fn nested_ambiguity_is_not_a_hit() {
        // The inner `. .` is ambiguous for every tail longer than one byte, so
        // only the split leaving "c" for it succeeds.
        let expr = Expr::concat(Expr::assign("a", dot()), Expr::concat(dot(), dot()));
        assert_eq!(
            bindings_after(&expr, b"abc", &["a"]),
            vec![Some(Value::from("ab"))]
        );
    }

    // --- Errors ---

    #[test]
    fn fatal_errors_escape_the_search() {
        let expr = Expr::concat(Expr::ident("missing"), dot());
        assert!(matches!(matching(&expr, b"abc"), Err(RuntimeError::Unbound(name)) if name == "missing"));
    }

    #[test]
    fn probe_only_absorbs_match_failures() {
        assert_eq!(probe(Ok(Value::from(1))).unwrap(), Some(Value::from(1)));
        assert_eq!(probe(Err(RuntimeError::NoMatch)).unwrap(), None);
        assert_eq!(probe(Err(RuntimeError::Ambiguous)).unwrap(), None);
        assert!(probe(Err(RuntimeError::DivisionByZero)).is_err());
    }
}
