//! Conformance scripts for line-oriented network protocols.
//!
//! A script alternates between sending lines to a server, receiving lines and
//! matching them against patterns, and asserting on values captured along the
//! way. Patterns are ordinary expressions: inside a receive, `.` stands for
//! the text being matched and concatenation splits it between its operands.
//!
//! # Example
//!
//! ```rust
//! use std::io::Cursor;
//!
//! use wirecheck::{Environment, Value, compile, execute};
//!
//! let script = compile(b"< :220 {host = .} ready\n~ 1 + 1 == 2\n")?;
//!
//! let mut conn = Cursor::new(b"220 mail.example.org ready\r\n".to_vec());
//! let mut env = Environment::new(&mut conn);
//! execute(&script, &mut env)?;
//!
//! assert_eq!(env.lookup("host"), Some(&Value::from("mail.example.org")));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod ast;
mod environment;
mod error;
mod interpreter;
mod matcher;
mod parser;
mod position;
mod protocol;
pub mod scanner;
pub mod token;
mod value;

pub use ast::{BinOp, Expr};
pub use environment::{Clock, Connection, Environment, FixedClock, Scope, SystemClock};
pub use error::{CompileError, Diagnostic, RuntimeError};
pub use interpreter::{eval, execute};
pub use parser::{Parser, compile};
pub use position::Position;
pub use protocol::read_line;
pub use scanner::Scanner;
pub use value::Value;
