//! Expression tree for parsed scripts.
//!
//! A script is an [`Expr::Seq`] of statements. Every composite node owns its
//! children; the tree is never shared or mutated after parsing.

/// Arithmetic and comparison operators. Both operands are coerced to integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    Eq,
    Gt,
    Lt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Statements executed in order; evaluates to nothing useful.
    Seq(Vec<Expr>),
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Ident(String),
    Int(i64),
    Str(Vec<u8>),
    /// `.`, the text currently being matched.
    Dot,
    /// Joins two strings, or splits the match context between them.
    Concat(Box<Expr>, Box<Expr>),
    Assign {
        name: String,
        value: Box<Expr>,
    },
    /// `> expr`
    Send(Box<Expr>),
    /// `< expr`, keeping the pattern's source text for diagnostics.
    Receive {
        pattern: Box<Expr>,
        source: String,
    },
    /// `~ expr`, keeping the condition's source text for diagnostics.
    Assert {
        cond: Box<Expr>,
        source: String,
    },
}

impl Expr {
    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn not(x: Expr) -> Expr {
        Expr::Not(Box::new(x))
    }

    pub fn concat(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Concat(Box::new(lhs), Box::new(rhs))
    }

    pub fn str(s: impl AsRef<[u8]>) -> Expr {
        Expr::Str(s.as_ref().to_vec())
    }

    pub fn ident(name: impl Into<String>) -> Expr {
        Expr::Ident(name.into())
    }

    pub fn assign(name: impl Into<String>, value: Expr) -> Expr {
        Expr::Assign {
            name: name.into(),
            value: Box::new(value),
        }
    }

    /// The statements of a script, or the expression itself if it is not a
    /// sequence.
    pub fn statements(&self) -> &[Expr] {
        match self {
            Expr::Seq(stmts) => stmts,
            other => std::slice::from_ref(other),
        }
    }
}
