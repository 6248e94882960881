//! Error taxonomy for every layer of the crate (spec §7).
//!
//! Each layer gets its own [`thiserror::Error`] enum, the same shape as the
//! teacher's `AnalyzeError` / `ParseError` / `RuleError` enums in
//! `analyze.rs` and `rules/mod.rs`: one variant per failure mode, a
//! `#[error("...")]` message, and `From` impls chaining a lower layer's
//! error into the layer above it.

use crate::span::Span;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("unterminated string literal starting at {0}")]
    UnterminatedString(Span),
    #[error("unterminated quoted identifier starting at {0}")]
    UnterminatedQuotedIdent(Span),
    #[error("unterminated block comment starting at {0}")]
    UnterminatedBlockComment(Span),
    #[error("unterminated dollar-quoted string starting at {0}")]
    UnterminatedDollarQuote(Span),
    #[error("invalid numeric literal {1:?} at {0}")]
    InvalidNumber(Span, String),
    #[error("illegal character {1:?} at {0}")]
    IllegalCharacter(Span, char),
}

impl LexError {
    pub fn span(&self) -> Span {
        match *self {
            LexError::UnterminatedString(s)
            | LexError::UnterminatedQuotedIdent(s)
            | LexError::UnterminatedBlockComment(s)
            | LexError::UnterminatedDollarQuote(s)
            | LexError::InvalidNumber(s, _)
            | LexError::IllegalCharacter(s, _) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("at {span}: expected {expected}, found {found}")]
    UnexpectedToken {
        span: Span,
        expected: String,
        found: String,
    },
    #[error("at {0}: chained comparisons are not allowed, parenthesize the expression")]
    ChainedComparison(Span),
    #[error("at {0}: LATERAL requires a subquery or function source, not a base table")]
    InvalidLateralTarget(Span),
    #[error("at {0}: duplicate CTE name {1:?} at the same level")]
    DuplicateCte(Span, String),
    #[error("at {0}: empty select list")]
    EmptySelectList(Span),
    #[error("at {0}: empty WITH block")]
    EmptyWithBlock(Span),
    #[error("at {0}: recursive CTE has no anchor term")]
    MissingRecursiveAnchor(Span),
    #[error("unexpected end of input, expected {0}")]
    UnexpectedEof(String),
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::Lex(e) => Some(e.span()),
            ParseError::UnexpectedToken { span, .. }
            | ParseError::ChainedComparison(span)
            | ParseError::InvalidLateralTarget(span)
            | ParseError::DuplicateCte(span, _)
            | ParseError::EmptySelectList(span)
            | ParseError::EmptyWithBlock(span)
            | ParseError::MissingRecursiveAnchor(span) => Some(*span),
            ParseError::UnexpectedEof(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("column {0:?} is ambiguous between {1:?}")]
    AmbiguousColumn(String, Vec<String>),
    #[error("unknown column {0:?}")]
    UnknownColumn(String),
    #[error("CTE {0:?} is redefined with a different body")]
    ConflictingCte(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),
    #[error("invalid injection spec for column {0:?}: {1}")]
    InvalidInjectionSpec(String, String),
    #[error("query already has LIMIT or OFFSET")]
    ConflictingLimitOffset,
    #[error("page must be >= 1, got {0}")]
    InvalidPage(i64),
    #[error("pageSize must be >= 1, got {0}")]
    InvalidPageSize(i64),
    #[error("pageSize {0} exceeds configured maximum {1}")]
    PageSizeTooLarge(i64, i64),
    #[error("all injection parameters were undefined")]
    AllParametersUndefined,
    #[error("unknown fixture table {0:?}")]
    UnknownFixture(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrintError {
    #[error("node unsupported by the {0} preset: {1}")]
    UnsupportedForPreset(String, String),
    #[error("parameter style {0} cannot mix named and positional placeholders")]
    MixedParameterStyle(String),
}
