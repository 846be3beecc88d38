//! Expression tree produced by the parser.

use serde::Serialize;

/// One calendar operation with its optional textual argument.
///
/// `op` is the lowercase operation name (`"+"`, `"-"`, `"endofmonth"`,
/// `"round"`, ...). An empty `value` means "no argument".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub op: String,
    pub value: String,
}

impl Operation {
    pub fn new(op: impl Into<String>, value: impl Into<String>) -> Self {
        Operation {
            op: op.into(),
            value: value.into(),
        }
    }
}

/// A pair of expressions evaluated once per iteration with `$begin` and
/// `$end` bound to that iteration's interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transform {
    pub begin: Expr,
    pub end: Expr,
}

/// A node of the expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Expr {
    /// Keyword, ISO literal, bare time or signed relative literal.
    Date(String),
    /// An operation outside of a pipeline. Only produced for keyword
    /// operations found where a date was expected.
    Operation(Operation),
    /// Operations folded left to right over the base's value.
    Pipe {
        base: Box<Expr>,
        operations: Vec<Operation>,
    },
    /// Two sub-expressions denoting an interval.
    Range { start: Box<Expr>, end: Box<Expr> },
    /// `$name`, including the dollar sign.
    Variable(String),
    Transform(Box<Transform>),
}

impl Expr {
    /// Whether this expression denotes a range, either directly or as the
    /// base of a pipeline (`a...b | endOfMonth`).
    pub fn is_range(&self) -> bool {
        match self {
            Expr::Range { .. } => true,
            Expr::Pipe { base, .. } => base.is_range(),
            _ => false,
        }
    }
}
