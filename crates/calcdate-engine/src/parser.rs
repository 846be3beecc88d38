//! Recursive-descent parser for date expressions.
//!
//! ```text
//! expression   := primary (rangeTail | pipelineTail | bareOpsTail)? EOF
//! rangeTail    := '...' primary (bareOpsTail | pipelineTail)?
//! pipelineTail := ('|' operation operation*)+
//! bareOpsTail  := operation+ pipelineTail?
//! operation    := ('+'|'-') (unit | number) | unit | keyword [argument]
//! primary      := variable | dateKeyword | date | time | quantity
//! ```
//!
//! Bare operations and piped operations build the same [`Expr::Pipe`], so
//! `today +1d` and `today | +1d` parse to identical trees.

use tracing::debug;

use crate::ast::{Expr, Operation, Transform};
use crate::error::ParseError;
use crate::lexer::{tokenize, Token, TokenKind, DATE_KEYWORDS};

/// Keyword operations that consume an argument token when one follows.
const ARGUMENT_KEYWORDS: &[&str] = &["day", "time", "round", "trunc"];

/// Parse an expression string into a tree.
///
/// # Errors
///
/// Returns [`ParseError::Lex`] when tokenization fails, and the other
/// [`ParseError`] variants for structurally invalid input.
///
/// # Examples
///
/// ```
/// use calcdate_engine::parser::parse;
///
/// assert_eq!(parse("today +1d").unwrap(), parse("today | +1d").unwrap());
/// ```
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    let expr = Parser::new(&tokens).parse()?;
    debug!(input, ?expr, "parsed expression");
    Ok(expr)
}

/// Parse a transform: exactly two comma-separated expressions, the first
/// producing the new begin and the second the new end.
///
/// # Errors
///
/// Returns [`ParseError::InvalidTransform`] when the input does not split
/// into exactly two parts, or [`ParseError::TransformPart`] wrapping the
/// failure of either side.
pub fn parse_transform(input: &str) -> Result<Transform, ParseError> {
    let parts: Vec<&str> = input.split(',').collect();
    let [begin, end] = parts.as_slice() else {
        return Err(ParseError::InvalidTransform(parts.len()));
    };

    let begin = parse(begin.trim()).map_err(|e| ParseError::TransformPart {
        part: "begin",
        source: Box::new(e),
    })?;
    let end = parse(end.trim()).map_err(|e| ParseError::TransformPart {
        part: "end",
        source: Box::new(e),
    })?;

    Ok(Transform { begin, end })
}

/// Cursor over a token slice. The slice always ends with
/// [`TokenKind::Eof`], which [`Parser::current`] keeps returning once
/// reached.
pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Parser { tokens, pos: 0 }
    }

    /// Parse one complete expression; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        if self.current_kind() == TokenKind::Eof {
            return Err(ParseError::EmptyExpression);
        }
        let expr = self.parse_expression()?;
        match self.current() {
            Some(token) if token.kind != TokenKind::Eof => {
                Err(ParseError::TrailingInput(token.clone()))
            }
            _ => Ok(expr),
        }
    }

    fn current(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> TokenKind {
        self.current().map_or(TokenKind::Eof, |t| t.kind)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at_operation(&self) -> bool {
        matches!(
            self.current_kind(),
            TokenKind::Operator | TokenKind::Unit | TokenKind::Keyword
        )
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.parse_primary()?;

        if self.current_kind() == TokenKind::Range {
            self.advance();
            let end = self.parse_primary()?;
            node = Expr::Range {
                start: Box::new(node),
                end: Box::new(end),
            };
        }

        let mut operations = Vec::new();
        while self.at_operation() {
            operations.push(self.parse_operation()?);
        }
        while self.current_kind() == TokenKind::Pipe {
            self.advance();
            operations.push(self.parse_operation()?);
            while self.at_operation() {
                operations.push(self.parse_operation()?);
            }
        }

        if operations.is_empty() {
            Ok(node)
        } else {
            Ok(Expr::Pipe {
                base: Box::new(node),
                operations,
            })
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.current() else {
            return Err(ParseError::UnexpectedEnd);
        };

        match token.kind {
            TokenKind::Variable => {
                self.advance();
                Ok(Expr::Variable(token.text.clone()))
            }
            TokenKind::Keyword if DATE_KEYWORDS.contains(&token.text.as_str()) => {
                self.advance();
                Ok(Expr::Date(token.text.clone()))
            }
            TokenKind::Keyword => Ok(Expr::Operation(self.parse_operation()?)),
            TokenKind::Date | TokenKind::Time | TokenKind::Unit => {
                self.advance();
                Ok(Expr::Date(token.text.clone()))
            }
            TokenKind::Operator => {
                // "+ 1d" at the start of an expression is the same relative
                // literal as "+1d".
                self.advance();
                let operand = self.expect_operand(token)?;
                Ok(Expr::Date(format!("{}{}", token.text, operand.text)))
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEnd),
            _ => Err(ParseError::UnexpectedToken(token.clone())),
        }
    }

    fn expect_operand(&mut self, operator: &Token) -> Result<&'t Token, ParseError> {
        match self.current() {
            Some(t) if matches!(t.kind, TokenKind::Unit | TokenKind::Number) => {
                self.advance();
                Ok(t)
            }
            _ => Err(ParseError::MissingOperand(operator.clone())),
        }
    }

    fn parse_operation(&mut self) -> Result<Operation, ParseError> {
        let Some(token) = self.current() else {
            return Err(ParseError::UnexpectedEnd);
        };

        match token.kind {
            TokenKind::Operator => {
                self.advance();
                let operand = self.expect_operand(token)?;
                Ok(Operation::new(&token.text, &operand.text))
            }
            TokenKind::Unit => {
                self.advance();
                let text = token.text.as_str();
                let op = match text {
                    t if t.starts_with('-') => Operation::new("-", &t[1..]),
                    t if t.starts_with('+') => Operation::new("+", &t[1..]),
                    t => Operation::new("+", t),
                };
                Ok(op)
            }
            TokenKind::Keyword => {
                self.advance();
                let keyword = token.text.as_str();
                if ARGUMENT_KEYWORDS.contains(&keyword) {
                    let value = match self.current() {
                        Some(arg)
                            if matches!(
                                arg.kind,
                                TokenKind::Number | TokenKind::Time | TokenKind::Keyword
                            ) =>
                        {
                            self.advance();
                            arg.text.clone()
                        }
                        _ => String::new(),
                    };
                    return Ok(Operation::new(keyword, value));
                }
                if keyword.starts_with("startof")
                    || keyword.starts_with("endof")
                    || keyword == "start"
                    || keyword == "end"
                {
                    return Ok(Operation::new(keyword, ""));
                }
                Err(ParseError::UnknownKeyword(token.clone()))
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEnd),
            _ => Err(ParseError::UnexpectedToken(token.clone())),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
