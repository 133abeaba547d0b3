//! Tree-walking evaluator for compiled scripts.
//!
//! [`execute`] runs the statements of a script in order against an
//! [`Environment`] and stops at the first failure. [`eval`] evaluates a single
//! expression in a [`Scope`]; it is also the entry point the matcher and the
//! protocol statements recurse through.

use log::debug;

use crate::ast::{BinOp, Expr};
use crate::environment::{Environment, Scope};
use crate::error::RuntimeError;
use crate::matcher::eval_concat;
use crate::protocol;
use crate::value::Value;

/// The identifier that reads the environment's clock instead of a binding.
pub const NOW: &str = "now";

/// Execute a compiled script. Top-level entry point.
///
/// Every statement starts without a match context. A match failure that
/// escapes a statement ends the run like any other error.
pub fn execute(script: &Expr, env: &mut Environment<'_>) -> Result<(), RuntimeError> {
    for (index, stmt) in script.statements().iter().enumerate() {
        debug!("statement {}: {stmt:?}", index + 1);
        eval(stmt, &mut env.scope())?;
    }
    Ok(())
}

/// Evaluate `expr` in `scope`.
pub fn eval(expr: &Expr, scope: &mut Scope<'_, '_>) -> Result<Value, RuntimeError> {
    match expr {
        Expr::Seq(stmts) => {
            let mut last = Value::Str(Vec::new());
            for stmt in stmts {
                last = eval(stmt, scope)?;
            }
            Ok(last)
        }
        Expr::Or(lhs, rhs) => {
            let value = eval(lhs, scope)?.to_bool() || eval(rhs, scope)?.to_bool();
            Ok(Value::Bool(value))
        }
        Expr::And(lhs, rhs) => {
            let value = eval(lhs, scope)?.to_bool() && eval(rhs, scope)?.to_bool();
            Ok(Value::Bool(value))
        }
        Expr::Not(x) => Ok(Value::Bool(!eval(x, scope)?.to_bool())),
        Expr::Binary { op, lhs, rhs } => {
            let a = eval(lhs, scope)?.to_int();
            let b = eval(rhs, scope)?.to_int();
            eval_binary(*op, a, b)
        }
        Expr::Ident(name) => lookup(name, scope.env()),
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Dot => scope.dot().map(Value::from).ok_or(RuntimeError::NoMatch),
        Expr::Concat(lhs, rhs) => eval_concat(lhs, rhs, scope),
        Expr::Assign { name, value } => {
            let value = eval(value, scope)?;
            scope.env().bind(name, value.clone());
            Ok(value)
        }
        Expr::Send(x) => protocol::send(x, scope),
        Expr::Receive { pattern, source } => protocol::receive(pattern, source, scope),
        Expr::Assert { cond, source } => protocol::assert(cond, source, scope),
    }
}

fn lookup(name: &str, env: &Environment<'_>) -> Result<Value, RuntimeError> {
    if name == NOW {
        return Ok(Value::Int(env.now()));
    }
    env.lookup(name)
        .cloned()
        .ok_or_else(|| RuntimeError::Unbound(name.to_string()))
}

/// Integer arithmetic wraps on overflow.
fn eval_binary(op: BinOp, a: i64, b: i64) -> Result<Value, RuntimeError> {
    let value = match op {
        BinOp::Add => Value::Int(a.wrapping_add(b)),
        BinOp::Sub => Value::Int(a.wrapping_sub(b)),
        BinOp::Mul => Value::Int(a.wrapping_mul(b)),
        BinOp::Quo | BinOp::Rem if b == 0 => return Err(RuntimeError::DivisionByZero),
        BinOp::Quo => Value::Int(a.wrapping_div(b)),
        BinOp::Rem => Value::Int(a.wrapping_rem(b)),
        BinOp::Eq => Value::Bool(a == b),
        BinOp::Gt => Value::Bool(a > b),
        BinOp::Lt => Value::Bool(a < b),
    };
    Ok(value)
}
