//! Recursive-descent parser over the token stream (spec §4.2).
//!
//! Kept from the teacher: a single cursor-holding `Parser` struct with
//! `at`/`bump`/`expect` primitives (`src/parser.rs` + `grammar/mod.rs`
//! usage), one grammar file per construct under a dedicated submodule
//! (`grammar/query.rs`, `grammar/expressions.rs`, ...), and a Pratt loop
//! for value expressions (`grammar/expressions.rs`'s `expr_bp`). Redesigned
//! to build the typed [`crate::ast`] directly instead of rowan tree events,
//! per spec §9.

mod dml;
mod expr;
mod query;

use crate::ast::{ObjectName, ParamRef, Statement};
use crate::error::ParseError;
use crate::lexer::{self, CommentPosition, Comments, Keyword, Token, TokenKind};
use crate::span::Span;

/// Parser-wide options (spec §9's open question (b)).
///
/// `intersect_precedence` controls whether `INTERSECT` binds tighter than
/// `UNION`/`EXCEPT` (standard-conforming, the default) or is folded into
/// the same left-to-right chain as the other set operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    pub intersect_precedence: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            intersect_precedence: true,
        }
    }
}

/// Parses a single SELECT-family query (spec's `parse_select`).
pub fn parse_select(text: &str) -> Result<crate::ast::Query, ParseError> {
    parse_select_with_options(text, ParserOptions::default())
}

pub fn parse_select_with_options(
    text: &str,
    options: ParserOptions,
) -> Result<crate::ast::Query, ParseError> {
    let tokens = lexer::tokenize(text).map_err(ParseError::Lex)?;
    let mut p = Parser::new(tokens, options);
    let q = query::parse_query(&mut p)?;
    p.expect_eof()?;
    Ok(q)
}

/// Auto-detects the statement kind from the first significant keyword and
/// parses it (spec's `parse_statement`).
pub fn parse_statement(text: &str) -> Result<Statement, ParseError> {
    parse_statement_with_options(text, ParserOptions::default())
}

pub fn parse_statement_with_options(
    text: &str,
    options: ParserOptions,
) -> Result<Statement, ParseError> {
    let tokens = lexer::tokenize(text).map_err(ParseError::Lex)?;
    let mut p = Parser::new(tokens, options);
    let stmt = parse_statement_inner(&mut p)?;
    p.expect_eof()?;
    Ok(stmt)
}

/// Result of a position-bounded parse (spec §4.2's error-recovery mode).
#[derive(Debug)]
pub struct PartialParseResult {
    pub ast: Option<Statement>,
    pub last_token: Option<Token>,
    pub stopped_at_cursor: bool,
    pub recovery_attempts: u32,
}

/// Parses as much of `text` as possible, stopping at `cursor` (a byte
/// offset) instead of failing fatally on the first error.
///
/// The token stream is truncated to the tokens that start before
/// `cursor` before parsing even begins, so the grammar never looks past
/// the requested position. If the full truncated prefix doesn't parse
/// as a complete statement (the common case — the cursor usually sits
/// mid-clause), tokens are dropped one at a time from the end and the
/// parse is retried, each retry counted in `recovery_attempts`, until a
/// prefix parses cleanly or none does.
pub fn parse_to_position(text: &str, cursor: u32) -> PartialParseResult {
    let tokens = match lexer::tokenize(text) {
        Ok(t) => t,
        Err(_) => {
            return PartialParseResult {
                ast: None,
                last_token: None,
                stopped_at_cursor: false,
                recovery_attempts: 0,
            }
        }
    };
    // `tokenize` always appends a trailing `Eof` token; keep it separate
    // so it can be re-appended to every truncated candidate without
    // being counted as part of the visible (pre-cursor) window.
    let eof = tokens.last().cloned();
    let real_tokens = &tokens[..tokens.len().saturating_sub(1)];
    let cut = real_tokens.iter().take_while(|t| t.span.start() < cursor).count();
    let visible = &real_tokens[..cut];
    let stopped_at_cursor = cut < real_tokens.len();

    let mut recovery_attempts = 0;
    let mut end = visible.len();
    loop {
        let mut candidate: Vec<Token> = visible[..end].to_vec();
        if let Some(eof_tok) = &eof {
            candidate.push(eof_tok.clone());
        }
        let mut p = Parser::new(candidate, ParserOptions::default());
        if let Ok(stmt) = parse_statement_inner(&mut p) {
            let last_token = p.tokens.get(p.pos.saturating_sub(1)).cloned();
            return PartialParseResult {
                ast: Some(stmt),
                last_token,
                stopped_at_cursor,
                recovery_attempts,
            };
        }
        if end == 0 {
            break;
        }
        recovery_attempts += 1;
        end -= 1;
    }

    PartialParseResult {
        ast: None,
        last_token: visible.last().cloned(),
        stopped_at_cursor,
        recovery_attempts,
    }
}

fn parse_statement_inner(p: &mut Parser) -> Result<Statement, ParseError> {
    let start = p.pos;
    let with = if p.at_kw(Keyword::With) {
        Some(query::parse_with_block(p)?)
    } else {
        None
    };

    let kind = if p.at_kw(Keyword::Insert) {
        crate::ast::StatementKind::Insert(Box::new(dml::parse_insert(p, with)?))
    } else if p.at_kw(Keyword::Update) {
        crate::ast::StatementKind::Update(Box::new(dml::parse_update(p, with)?))
    } else if p.at_kw(Keyword::Delete) {
        crate::ast::StatementKind::Delete(Box::new(dml::parse_delete(p, with)?))
    } else if p.at_kw(Keyword::Merge) {
        crate::ast::StatementKind::Merge(Box::new(dml::parse_merge(p)?))
    } else {
        crate::ast::StatementKind::Query(query::parse_query_with(p, with)?)
    };

    let comments = p.finish_comments(start);
    let mut stmt = Statement::new(kind).with_comments(comments);
    stmt.span = Some(p.span_from(start));
    Ok(stmt)
}

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    anon_counter: u32,
    options: ParserOptions,
}

/// Parses a schema-qualified or bare name (`schema.table`, `table`);
/// shared by expression, clause and statement parsers.
pub(crate) fn parse_object_name(p: &mut Parser) -> Result<ObjectName, ParseError> {
    let first = p.expect_ident()?;
    if p.eat_punct(".") {
        let second = p.expect_ident()?;
        Ok(ObjectName {
            schema: Some(first),
            name: second,
        })
    } else {
        Ok(ObjectName::unqualified(first))
    }
}

impl Parser {
    fn new(tokens: Vec<Token>, options: ParserOptions) -> Self {
        Self {
            tokens,
            pos: 0,
            anon_counter: 0,
            options,
        }
    }

    pub(crate) fn intersect_precedence(&self) -> bool {
        self.options.intersect_precedence
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    pub(crate) fn current_text(&self) -> &str {
        &self.current().text
    }

    pub(crate) fn at_eof(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    pub(crate) fn at_kw(&self, kw: Keyword) -> bool {
        matches!(self.current_kind(), TokenKind::Keyword(k) if k == kw)
    }

    pub(crate) fn at_kind(&self, kind: TokenKind) -> bool {
        std::mem::discriminant(&self.current_kind()) == std::mem::discriminant(&kind)
    }

    pub(crate) fn at_punct(&self, text: &str) -> bool {
        matches!(self.current_kind(), TokenKind::Punctuation) && self.current_text() == text
    }

    pub(crate) fn at_op(&self, text: &str) -> bool {
        matches!(self.current_kind(), TokenKind::Operator) && self.current_text() == text
    }

    pub(crate) fn peek_kw(&self, offset: usize) -> Option<Keyword> {
        match self.tokens.get(self.pos + offset).map(|t| t.kind) {
            Some(TokenKind::Keyword(k)) => Some(k),
            _ => None,
        }
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    pub(crate) fn peek_text(&self, offset: usize) -> &str {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.text.as_str())
            .unwrap_or("")
    }

    /// Decodes a parameter placeholder lexeme, numbering anonymous `?`
    /// placeholders in document order as they are encountered (spec §4.1).
    pub(crate) fn param_ref_from_text(&mut self, text: &str) -> ParamRef {
        if text == "?" {
            self.anon_counter += 1;
            return ParamRef::Anonymous(self.anon_counter);
        }
        if let Some(rest) = text.strip_prefix('$') {
            return ParamRef::Positional(rest.parse().unwrap_or(0));
        }
        if let Some(rest) = text.strip_prefix(':') {
            return ParamRef::Named(rest.to_string());
        }
        if let Some(rest) = text.strip_prefix('@') {
            return ParamRef::Named(rest.to_string());
        }
        ParamRef::Named(text.to_string())
    }

    pub(crate) fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn eat_kw(&mut self, kw: Keyword) -> bool {
        if self.at_kw(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_punct(&mut self, text: &str) -> bool {
        if self.at_punct(text) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_op(&mut self, text: &str) -> bool {
        if self.at_op(text) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_kw(&mut self, kw: Keyword) -> Result<Token, ParseError> {
        if self.at_kw(kw) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(format!("{kw:?}")))
        }
    }

    pub(crate) fn expect_punct(&mut self, text: &str) -> Result<Token, ParseError> {
        if self.at_punct(text) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(format!("{text:?}")))
        }
    }

    pub(crate) fn expect_op(&mut self, text: &str) -> Result<Token, ParseError> {
        if self.at_op(text) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(format!("{text:?}")))
        }
    }

    pub(crate) fn expect_ident(&mut self) -> Result<crate::ast::Ident, ParseError> {
        match self.current_kind() {
            TokenKind::Identifier => {
                let tok = self.bump();
                Ok(crate::ast::Ident::new(tok.text))
            }
            TokenKind::QuotedIdentifier => {
                let tok = self.bump();
                let inner = &tok.text[1..tok.text.len() - 1];
                Ok(crate::ast::Ident::quoted(inner.replace("\"\"", "\"")))
            }
            TokenKind::Keyword(kw) => {
                // Unreserved keywords are accepted as identifiers in most
                // clause positions (e.g. a column named `first`).
                let tok = self.bump();
                let _ = kw;
                Ok(crate::ast::Ident::new(tok.text))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    pub(crate) fn expect_eof(&mut self) -> Result<(), ParseError> {
        if self.at_eof() {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    pub(crate) fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        ParseError::UnexpectedToken {
            span: self.current().span,
            expected: expected.into(),
            found: self.current_kind().to_string(),
        }
    }

    pub(crate) fn span_from(&self, start: usize) -> Span {
        let start_span = self.tokens[start].span;
        let end_idx = self.pos.saturating_sub(1).max(start).min(self.tokens.len() - 1);
        start_span.cover(self.tokens[end_idx].span)
    }

    /// Comments attached to the first token of a node plus comments
    /// attached to its last consumed token (see `SPEC_FULL.md` §9(a)).
    ///
    /// Also rescues comments trailing the token immediately before
    /// `start`: a comment with no intervening newline attaches (lexer
    /// side) as an `after` comment on whatever token precedes it, which
    /// is frequently a keyword or punctuation that never becomes an AST
    /// node of its own (`SELECT`, `,`, `(`). Without this, such comments
    /// are silently dropped because no node's own span ever starts or
    /// ends on that keyword token.
    pub(crate) fn finish_comments(&self, start: usize) -> Comments {
        let mut before = Vec::new();
        if start > 0 {
            if let Some(prev) = self.tokens.get(start - 1) {
                before.extend(prev.comments.after.iter().cloned().map(|mut c| {
                    c.position = CommentPosition::Before;
                    c
                }));
            }
        }
        before.extend(
            self.tokens
                .get(start)
                .map(|t| t.comments.before.clone())
                .unwrap_or_default(),
        );
        let after_idx = self.pos.saturating_sub(1);
        let after = if after_idx >= start {
            self.tokens
                .get(after_idx)
                .map(|t| t.comments.after.clone())
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        Comments { before, after }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_select_basic() {
        let q = parse_select("SELECT a, b FROM t").unwrap();
        match q.kind {
            crate::ast::QueryKind::Simple(s) => {
                assert_eq!(s.select.items.len(), 2);
                assert_eq!(s.from.len(), 1);
            }
            _ => panic!("expected simple select"),
        }
    }

    #[test]
    fn parse_statement_dispatch_insert() {
        let stmt = parse_statement("INSERT INTO t (a) VALUES (1)").unwrap();
        assert!(matches!(stmt.kind, crate::ast::StatementKind::Insert(_)));
    }

    #[test]
    fn reports_unexpected_token_span() {
        let err = parse_select("SELECT FROM").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn parse_to_position_on_complete_statement_before_cursor() {
        let text = "SELECT a FROM t";
        let result = parse_to_position(text, text.len() as u32);
        assert!(result.ast.is_some());
        assert!(!result.stopped_at_cursor);
        assert_eq!(result.recovery_attempts, 0);
    }

    #[test]
    fn parse_to_position_recovers_from_trailing_garbage_at_cursor() {
        // cursor sits right after `t`, mid-typing a WHERE clause the user
        // hasn't finished yet.
        let text = "SELECT a FROM t WHERE";
        let cursor = text.find("WHERE").unwrap() as u32;
        let result = parse_to_position(text, cursor);
        let stmt = result.ast.expect("should recover a statement up to the cursor");
        match stmt.kind {
            crate::ast::StatementKind::Query(q) => match q.kind {
                crate::ast::QueryKind::Simple(s) => assert_eq!(s.from.len(), 1),
                _ => panic!("expected simple select"),
            },
            _ => panic!("expected query"),
        }
        assert!(result.stopped_at_cursor);
    }

    #[test]
    fn parse_to_position_gives_up_cleanly_on_unparseable_prefix() {
        let result = parse_to_position("FROM", 4);
        assert!(result.ast.is_none());
        assert!(result.recovery_attempts > 0);
    }
}
