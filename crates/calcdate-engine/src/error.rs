//! Error types for calcdate-engine operations.
//!
//! One enum per layer of the pipeline. Every layer converts into
//! [`CalcError`] so callers that do not care where a failure came from can
//! use a single `?`.

use thiserror::Error;

use crate::lexer::Token;

/// Failure while scanning expression text into tokens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedCharacter { ch: char, pos: usize },

    #[error("malformed range operator at position {pos}: expected '...'")]
    MalformedRange { pos: usize },

    #[error("malformed ISO date '{text}' at position {pos}")]
    MalformedIsoDate { text: String, pos: usize },
}

/// Failure while building an expression tree from tokens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("empty expression")]
    EmptyExpression,

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{}' at position {}", .0.text, .0.pos)]
    UnexpectedToken(Token),

    #[error("expected unit or number after operator '{}' at position {}", .0.text, .0.pos)]
    MissingOperand(Token),

    #[error("unknown operation keyword '{}' at position {}", .0.text, .0.pos)]
    UnknownKeyword(Token),

    #[error("unexpected trailing input '{}' at position {}", .0.text, .0.pos)]
    TrailingInput(Token),

    #[error("transform must have exactly two parts separated by comma, found {0}")]
    InvalidTransform(usize),

    #[error("failed to parse transform {part} expression: {source}")]
    TransformPart {
        part: &'static str,
        source: Box<ParseError>,
    },
}

/// Failure while evaluating an expression tree or a calendar operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("unknown time unit '{0}'")]
    UnknownUnit(String),

    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("invalid date value '{0}'")]
    InvalidDateValue(String),

    #[error("invalid argument '{value}' for operation '{op}'")]
    InvalidArgument { op: String, value: String },

    #[error("variable not found in context: {0}")]
    MissingVariable(String),

    #[error("range expressions must be evaluated with evaluate_range")]
    RangeNotSingleValue,

    #[error("transform expressions must be evaluated with evaluate_transform")]
    TransformNotSingleValue,

    #[error("operation '{0}' cannot be evaluated without a base date")]
    OperationWithoutBase(String),

    #[error("not a range expression")]
    NotARange,

    #[error("date arithmetic out of range: {0}")]
    OutOfRange(String),
}

/// Failure while iterating a date range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IterationError {
    #[error("invalid interval format '{0}'")]
    InvalidInterval(String),

    #[error("too many iterations (max {limit})")]
    TooManyIterations { limit: usize },

    #[error("range start is after range end")]
    InvertedRange,

    #[error("an interval requires a range expression")]
    IntervalWithoutRange,

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Umbrella error for the top-level entry points.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalcError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Iteration(#[from] IterationError),

    #[error("invalid timezone: '{0}'")]
    InvalidTimezone(String),
}

impl From<LexError> for CalcError {
    fn from(err: LexError) -> Self {
        CalcError::Parse(ParseError::Lex(err))
    }
}

pub type Result<T> = std::result::Result<T, CalcError>;
