//! The three statements that talk to the system under test: send, receive
//! and assert.

use std::io::{self, Read};

use log::info;

use crate::ast::Expr;
use crate::environment::Scope;
use crate::error::RuntimeError;
use crate::interpreter::eval;
use crate::value::Value;

/// `> expr`: write the string form of `expr` to the connection.
pub fn send(expr: &Expr, scope: &mut Scope<'_, '_>) -> Result<Value, RuntimeError> {
    let data = eval(expr, &mut scope.narrow(None))?.into_bytes();
    let conn = scope.env().connection();
    conn.write_all(&data)
        .and_then(|()| conn.flush())
        .map_err(RuntimeError::Send)?;
    info!("> \"{}\"", data.escape_ascii());
    Ok(Value::Str(data))
}

/// `< pattern`: read one CRLF-terminated line and match `pattern` against it.
///
/// The pattern must reproduce the line exactly. A literal pattern ignores the
/// match context altogether, so it is this final comparison that rejects a
/// line that differs from it.
pub fn receive(pattern: &Expr, source: &str, scope: &mut Scope<'_, '_>) -> Result<Value, RuntimeError> {
    let line = read_line(scope.env().connection())?;
    info!("< \"{}\"", line.escape_ascii());

    let outcome = eval(pattern, &mut scope.narrow(Some(&line[..])));
    let matched = match outcome {
        Ok(value) => value.into_bytes(),
        Err(RuntimeError::NoMatch) => {
            return Err(RuntimeError::ReceiveNoMatch {
                line,
                pattern: source.to_string(),
            });
        }
        Err(RuntimeError::Ambiguous) => {
            return Err(RuntimeError::ReceiveAmbiguous {
                line,
                pattern: source.to_string(),
            });
        }
        Err(err) => return Err(err),
    };
    if matched != line {
        return Err(RuntimeError::ReceiveMismatch { line, matched });
    }
    Ok(Value::Str(line))
}

/// `~ cond`: fail unless `cond` is true.
pub fn assert(cond: &Expr, source: &str, scope: &mut Scope<'_, '_>) -> Result<Value, RuntimeError> {
    if eval(cond, &mut scope.narrow(None))?.to_bool() {
        Ok(Value::Bool(true))
    } else {
        Err(RuntimeError::AssertionFailed {
            source_text: source.to_string(),
        })
    }
}

/// Read up to and including the next CRLF. Bytes are taken one at a time so
/// nothing past the line is consumed from the stream.
pub fn read_line<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>, RuntimeError> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    while !line.ends_with(b"\r\n") {
        match reader.read(&mut byte) {
            Ok(0) => return Err(RuntimeError::ClosedMidLine { partial: line }),
            Ok(_) => line.push(byte[0]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(RuntimeError::Receive(err)),
        }
    }
    Ok(line)
}
