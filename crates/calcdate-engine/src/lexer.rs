//! Tokenizer for date expressions.
//!
//! Scans left to right over the raw expression and produces a flat token
//! list that always ends with a single [`TokenKind::Eof`]. The scan is
//! byte-oriented: every meaningful character of the language is ASCII, and
//! anything else is reported as an unexpected character.
//!
//! The interesting part is the digit branch, which has to tell apart
//!
//! - ISO dates, optionally followed by a time of day and a timezone suffix
//!   (`2024-01-15`, `2024-01-15T10:30:00Z`, `2024-01-15 10:30:00 CET`),
//! - bare times (`14:30`, `14:30:15`),
//! - quantities with an optional unit (`15`, `3d`, `2M`).

use serde::Serialize;
use tracing::trace;

use crate::error::LexError;

/// The closed set of token categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    /// End of input. Always the last token, exactly once.
    Eof,
    /// ISO date literal or a free-form word that is not a keyword.
    Date,
    /// Bare time of day (`HH:MM[:SS]`).
    Time,
    /// A lone `+` or `-` not immediately followed by a digit.
    Operator,
    /// A quantity with a unit suffix, optionally signed (`1d`, `+2w`, `-3M`).
    Unit,
    /// An unsigned quantity with no unit suffix.
    Number,
    Pipe,
    Range,
    Variable,
    Keyword,
    Comma,
    LParen,
    RParen,
}

/// A lexical token with the byte offset where it starts.
///
/// Keyword text is case-folded to lowercase; every other kind keeps the
/// source text verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub pos: usize,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, pos: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            pos,
        }
    }
}

/// Unit suffixes accepted on quantities.
pub const UNIT_CHARS: &[u8] = b"dwMYhmsq";

/// Timezone abbreviations recognized after an ISO date-time.
pub const TIMEZONE_ABBREVIATIONS: &[&str] = &[
    "UTC", "GMT", "EST", "CST", "MST", "PST", "EDT", "CDT", "MDT", "PDT", "CET", "CEST", "JST",
    "IST", "BST", "AEST", "AEDT",
];

/// Keywords that denote a date on their own.
pub const DATE_KEYWORDS: &[&str] = &[
    "today",
    "now",
    "yesterday",
    "tomorrow",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Every word the tokenizer classifies as a keyword (lowercase).
const KEYWORDS: &[&str] = &[
    "today",
    "now",
    "yesterday",
    "tomorrow",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
    "start",
    "end",
    "startof",
    "endof",
    "startofday",
    "endofday",
    "startofweek",
    "endofweek",
    "startofmonth",
    "endofmonth",
    "startofyear",
    "endofyear",
    "startofquarter",
    "endofquarter",
    "startofhour",
    "endofhour",
    "startofminute",
    "endofminute",
    "startofsecond",
    "endofsecond",
    "round",
    "trunc",
    "day",
    "time",
    "month",
    "year",
    "week",
    "quarter",
    "hour",
    "minute",
    "second",
];

const TZ_NAME_MIN_LEN: usize = 2;
const TZ_NAME_MAX_LEN: usize = 5;

/// Tokenize an expression.
///
/// # Errors
///
/// Returns a [`LexError`] for characters outside the language, a lone or
/// doubled `.`, and ISO date-times whose time or timezone tail is malformed.
///
/// # Examples
///
/// ```
/// use calcdate_engine::lexer::{tokenize, TokenKind};
///
/// let kinds: Vec<_> = tokenize("today +1d").unwrap().iter().map(|t| t.kind).collect();
/// assert_eq!(kinds, vec![TokenKind::Keyword, TokenKind::Unit, TokenKind::Eof]);
/// ```
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(input);
    while lexer.pos < lexer.bytes.len() {
        lexer.next_token()?;
    }
    let eof = lexer.pos;
    lexer.tokens.push(Token::new(TokenKind::Eof, "", eof));
    trace!(input, tokens = lexer.tokens.len(), "tokenized expression");
    Ok(lexer.tokens)
}

struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn digit_at(&self, offset: usize) -> bool {
        self.peek_at(offset).is_some_and(|b| b.is_ascii_digit())
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        let text = &self.input[start..self.pos];
        self.tokens.push(Token::new(kind, text, start));
    }

    fn next_token(&mut self) -> Result<(), LexError> {
        self.skip_whitespace();
        let Some(ch) = self.peek_at(0) else {
            return Ok(());
        };
        let start = self.pos;

        let single = match ch {
            b'|' => Some(TokenKind::Pipe),
            b',' => Some(TokenKind::Comma),
            b'(' => Some(TokenKind::LParen),
            b')' => Some(TokenKind::RParen),
            _ => None,
        };
        if let Some(kind) = single {
            self.pos += 1;
            self.push(kind, start);
            return Ok(());
        }

        match ch {
            b'+' | b'-' => {
                if self.digit_at(1) {
                    self.read_quantity();
                } else {
                    self.pos += 1;
                    self.push(TokenKind::Operator, start);
                }
                Ok(())
            }
            b'$' => {
                self.read_variable();
                Ok(())
            }
            b'.' => self.read_range(),
            c if c.is_ascii_digit() => self.read_date_or_quantity(),
            c if c.is_ascii_alphabetic() => {
                self.read_word();
                Ok(())
            }
            _ => {
                let ch = self.input[start..].chars().next().unwrap_or('\0');
                Err(LexError::UnexpectedCharacter { ch, pos: start })
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_at(0).is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn read_range(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        if self.bytes[self.pos..].starts_with(b"...") {
            self.pos += 3;
            self.push(TokenKind::Range, start);
            Ok(())
        } else {
            Err(LexError::MalformedRange { pos: start })
        }
    }

    fn read_variable(&mut self) {
        let start = self.pos;
        self.pos += 1;
        self.skip_alphanumeric();
        self.push(TokenKind::Variable, start);
    }

    fn skip_alphanumeric(&mut self) {
        while self.peek_at(0).is_some_and(|b| b.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
    }

    fn skip_digits(&mut self) {
        while self.digit_at(0) {
            self.pos += 1;
        }
    }

    /// `[+-]?<digits><unit>?`: a [`TokenKind::Unit`] when signed or
    /// suffixed, otherwise a bare [`TokenKind::Number`].
    fn read_quantity(&mut self) {
        let start = self.pos;
        let signed = matches!(self.peek_at(0), Some(b'+' | b'-'));
        if signed {
            self.pos += 1;
        }
        self.skip_digits();
        let has_unit = self.peek_at(0).is_some_and(|b| UNIT_CHARS.contains(&b));
        if has_unit {
            self.pos += 1;
        }
        let kind = if signed || has_unit {
            TokenKind::Unit
        } else {
            TokenKind::Number
        };
        self.push(kind, start);
    }

    fn read_date_or_quantity(&mut self) -> Result<(), LexError> {
        if self.looks_like_iso_date() {
            return self.read_iso_date();
        }
        if self.looks_like_time(0) {
            let start = self.pos;
            self.pos += self.time_len(0);
            self.push(TokenKind::Time, start);
            return Ok(());
        }
        self.read_quantity();
        Ok(())
    }

    // ── ISO date scanning ───────────────────────────────────────────────

    /// `YYYY-MM-DD` at the cursor.
    fn looks_like_iso_date(&self) -> bool {
        (0..10).all(|i| match i {
            4 | 7 => self.peek_at(i) == Some(b'-'),
            _ => self.digit_at(i),
        })
    }

    /// `HH:MM` at `offset` from the cursor.
    fn looks_like_time(&self, offset: usize) -> bool {
        self.digit_at(offset)
            && self.digit_at(offset + 1)
            && self.peek_at(offset + 2) == Some(b':')
            && self.digit_at(offset + 3)
            && self.digit_at(offset + 4)
    }

    /// Length of `HH:MM` or `HH:MM:SS` at `offset`; caller has checked
    /// [`Self::looks_like_time`].
    fn time_len(&self, offset: usize) -> usize {
        let seconds = self.peek_at(offset + 5) == Some(b':')
            && self.digit_at(offset + 6)
            && self.digit_at(offset + 7);
        if seconds {
            8
        } else {
            5
        }
    }

    fn read_iso_date(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.pos += 10;

        if self.read_time_of_day(start)? {
            self.read_timezone(start)?;
        }

        self.push(TokenKind::Date, start);
        Ok(())
    }

    /// Consume a `T` or space separated time of day. A `T` commits to a
    /// time; a space only does when a time actually follows it.
    fn read_time_of_day(&mut self, start: usize) -> Result<bool, LexError> {
        match self.peek_at(0) {
            Some(b'T') => {
                if !self.looks_like_time(1) {
                    return Err(self.malformed_iso(start, 1));
                }
                self.pos += 1 + self.time_len(1);
                Ok(true)
            }
            Some(b' ') if self.looks_like_time(1) => {
                self.pos += 1 + self.time_len(1);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn read_timezone(&mut self, start: usize) -> Result<(), LexError> {
        match self.peek_at(0) {
            Some(b'Z') => {
                self.pos += 1;
                Ok(())
            }
            Some(b'+' | b'-') => self.read_numeric_offset(start),
            Some(b' ') => {
                self.read_timezone_name_after_space();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// `±HH`, `±HHMM` or `±HH:MM`.
    fn read_numeric_offset(&mut self, start: usize) -> Result<(), LexError> {
        self.pos += 1;
        let digits_start = self.pos;
        self.skip_digits();
        let mut digits = self.pos - digits_start;
        if digits == 2 && self.peek_at(0) == Some(b':') {
            self.pos += 1;
            let minutes_start = self.pos;
            self.skip_digits();
            if self.pos - minutes_start != 2 {
                return Err(self.malformed_iso(start, 0));
            }
            digits += 2;
        }
        if digits != 2 && digits != 4 {
            return Err(self.malformed_iso(start, 0));
        }
        Ok(())
    }

    /// A space followed by a recognized abbreviation. When the word is not
    /// on the allow-list the cursor goes back to the space, leaving it as a
    /// separator for the next token.
    fn read_timezone_name_after_space(&mut self) {
        let space = self.pos;
        self.pos += 1;
        let name_start = self.pos;
        while self.peek_at(0).is_some_and(|b| b.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let len = self.pos - name_start;
        let followed_by_word = self.peek_at(0).is_some_and(|b| b.is_ascii_alphanumeric());
        let name = &self.input[name_start..self.pos];
        let recognized = (TZ_NAME_MIN_LEN..=TZ_NAME_MAX_LEN).contains(&len)
            && !followed_by_word
            && is_timezone_abbreviation(name);
        if !recognized {
            self.pos = space;
        }
    }

    fn malformed_iso(&self, start: usize, extra: usize) -> LexError {
        let end = (self.pos + extra).min(self.bytes.len());
        LexError::MalformedIsoDate {
            text: self.input[start..end].to_string(),
            pos: start,
        }
    }

    // ── words ───────────────────────────────────────────────────────────

    fn read_word(&mut self) {
        let start = self.pos;
        self.skip_alphanumeric();
        let word = &self.input[start..self.pos];
        let lower = word.to_ascii_lowercase();
        if KEYWORDS.contains(&lower.as_str()) {
            self.tokens.push(Token::new(TokenKind::Keyword, lower, start));
        } else {
            self.push(TokenKind::Date, start);
        }
    }
}

/// Whether `name` is one of the recognized timezone abbreviations
/// (case-insensitive).
pub fn is_timezone_abbreviation(name: &str) -> bool {
    TIMEZONE_ABBREVIATIONS
        .iter()
        .any(|tz| tz.eq_ignore_ascii_case(name))
}

// ── Tests ───────────────────────────────────────────────────────────────────
