//! `Environment`: the state one script run evaluates against.
//!
//! The environment owns the binding table and borrows the connection. The
//! match context is not part of it; it lives in a [`Scope`], a short-lived
//! view that pairs the environment with the text currently being matched.
//! Narrowing a scope reborrows the environment, so a narrowed view can never
//! outlive the evaluation that created it, and the caller's match context is
//! untouched when it ends.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::value::Value;

/// An ordered, reliable byte stream to the system under test.
pub trait Connection: Read + Write {}

impl<T: Read + Write> Connection for T {}

/// Source for the reserved `now` identifier.
pub trait Clock {
    fn now(&self) -> i64;
}

/// Nanoseconds since the UNIX epoch.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
    }
}

/// Always reports the same instant.
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

/// Bindings, connection and clock for a single script run.
pub struct Environment<'c> {
    conn: &'c mut dyn Connection,
    bindings: HashMap<String, Value>,
    clock: Box<dyn Clock>,
}

impl<'c> Environment<'c> {
    pub fn new(conn: &'c mut dyn Connection) -> Self {
        Self {
            conn,
            bindings: HashMap::new(),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn bind(&mut self, name: &str, value: Value) {
        debug!("{name} = {value}");
        self.bindings.insert(name.to_string(), value);
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    pub fn connection(&mut self) -> &mut (dyn Connection + 'c) {
        &mut *self.conn
    }

    /// A scope with no match context, as used by every statement.
    pub fn scope(&mut self) -> Scope<'_, 'c> {
        Scope {
            env: self,
            dot: None,
        }
    }
}

/// An environment together with the text a pattern is being matched against.
pub struct Scope<'e, 'c> {
    env: &'e mut Environment<'c>,
    dot: Option<&'e [u8]>,
}

impl<'e, 'c> Scope<'e, 'c> {
    /// The current match context, if any.
    pub fn dot(&self) -> Option<&'e [u8]> {
        self.dot
    }

    /// Reborrow the environment with a different match context.
    pub fn narrow<'n>(&'n mut self, dot: Option<&'n [u8]>) -> Scope<'n, 'c> {
        Scope {
            env: &mut *self.env,
            dot,
        }
    }

    pub fn env(&mut self) -> &mut Environment<'c> {
        self.env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_persist_across_scopes() {
        let mut conn = std::io::Cursor::new(Vec::new());
        let mut env = Environment::new(&mut conn);
        env.scope().env().bind("x", Value::from(1));
        assert_eq!(env.lookup("x"), Some(&Value::from(1)));
        env.bind("x", Value::from("two"));
        assert_eq!(env.lookup("x"), Some(&Value::from("two")));
        assert_eq!(env.lookup("y"), None);
    }

    #[test]
    fn narrowing_leaves_the_outer_context_alone() {
        let mut conn = std::io::Cursor::new(Vec::new());
        let mut env = Environment::new(&mut conn);
        let data = b"hello".to_vec();
        let mut outer = env.scope();
        assert_eq!(outer.dot(), None);
        {
            let mut inner = outer.narrow(Some(data.as_slice()));
            assert_eq!(inner.dot(), Some(&b"hello"[..]));
            let innermost = inner.narrow(Some(&data[1..]));
            assert_eq!(innermost.dot(), Some(&b"ello"[..]));
            assert_eq!(inner.dot(), Some(&b"hello"[..]));
        }
        assert_eq!(outer.dot(), None);
    }

    #[test]
    fn narrowed_scope_writes_through_to_bindings() {
        let mut conn = std::io::Cursor::new(Vec::new());
        let mut env = Environment::new(&mut conn);
        {
            let mut scope = env.scope();
            scope.narrow(Some(&b"abc"[..])).env().bind("k", Value::from(true));
        }
        assert_eq!(env.lookup("k"), Some(&Value::from(true)));
    }

    #[test]
    fn fixed_clock() {
        let mut conn = std::io::Cursor::new(Vec::new());
        let env = Environment::new(&mut conn).with_clock(FixedClock(1234));
        assert_eq!(env.now(), 1234);
    }

    #[test]
    fn system_clock_is_after_the_epoch() {
        assert!(SystemClock.now() > 0);
    }
}
