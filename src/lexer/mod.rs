//! Source tokenizer (spec §4.1).
//!
//! Scans source text into a flat, position-tracked token stream. The
//! teacher's `Lexer<'a>` (`lexer/mod.rs`) wraps a `logos`-generated
//! scanner behind an `Iterator<Item = Token<'a>>`; dollar-quoted strings
//! and nested block comments need a dynamically matched delimiter that a
//! regex-per-variant lexer generator cannot express, so this tokenizer
//! keeps the teacher's `Lexer`/`Token` shape but drives the scan by hand
//! over a character cursor, the way the teacher's own legacy
//! `nom`/`LocatedSpan`-based `parser.rs` tracked position.

mod comment;
mod token;

pub use comment::{Comment, CommentPosition, Comments};
pub use token::{Keyword, TokenKind};

use crate::error::LexError;
use crate::span::Span;

/// A single recognized unit of source text, plus any comments attached to
/// it (spec §3.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
    pub comments: Comments,
}

const OPERATOR_CHARS: &[char] = &[
    '+', '-', '*', '/', '<', '>', '=', '!', '~', '@', '#', '%', '^', '&', '|', '?',
];

/// Tokenizes `source`, returning the significant lexeme stream terminated
/// by an `Eof` token (spec §4.1's contract).
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Scanner::new(source).run()
}

struct RawToken {
    kind: RawKind,
    text: String,
    span: Span,
}

enum RawKind {
    Whitespace,
    Comment,
    Significant(TokenKind),
}

struct Scanner<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    idx: usize,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            idx: 0,
        }
    }

    fn len(&self) -> usize {
        self.source.len() as u32 as usize
    }

    fn byte_offset(&self, idx: usize) -> u32 {
        self.chars
            .get(idx)
            .map(|(b, _)| *b as u32)
            .unwrap_or(self.len() as u32)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).map(|(_, c)| *c)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.idx + offset).map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.idx += 1;
        }
        c
    }

    fn slice_from(&self, start_idx: usize) -> String {
        let start = self.byte_offset(start_idx);
        let end = self.byte_offset(self.idx);
        self.source[start as usize..end as usize].to_string()
    }

    fn span_from(&self, start_idx: usize) -> Span {
        Span::new(self.byte_offset(start_idx), self.byte_offset(self.idx))
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut raw = Vec::new();
        loop {
            let start = self.idx;
            match self.next_raw(start)? {
                Some(tok) => raw.push(tok),
                None => break,
            }
        }
        raw.push(RawToken {
            kind: RawKind::Significant(TokenKind::Eof),
            text: String::new(),
            span: Span::new(self.len() as u32, self.len() as u32),
        });

        Ok(attach_comments(raw))
    }

    /// Scans one raw token (possibly trivia). `Ok(None)` signals EOF.
    fn next_raw(&mut self, start: usize) -> Result<Option<RawToken>, LexError> {
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        if c.is_whitespace() {
            while self.peek().is_some_and(|c| c.is_whitespace()) {
                self.bump();
            }
            return Ok(Some(RawToken {
                kind: RawKind::Whitespace,
                text: self.slice_from(start),
                span: self.span_from(start),
            }));
        }

        if c == '-' && self.peek_at(1) == Some('-') {
            while self.peek().is_some_and(|c| c != '\n') {
                self.bump();
            }
            return Ok(Some(RawToken {
                kind: RawKind::Comment,
                text: self.slice_from(start),
                span: self.span_from(start),
            }));
        }

        if c == '/' && self.peek_at(1) == Some('*') {
            return self.scan_block_comment(start).map(Some);
        }

        if c.is_ascii_digit() {
            return self.scan_number(start).map(Some);
        }

        if c == 'e' || c == 'E' {
            if self.peek_at(1) == Some('\'') {
                return self.scan_escape_string(start).map(Some);
            }
        }

        if is_ident_start(c) {
            return Ok(Some(self.scan_identifier(start)));
        }

        if c == '"' {
            return self.scan_quoted_ident(start).map(Some);
        }

        if c == '\'' {
            return self.scan_string(start).map(Some);
        }

        if c == '$' {
            return self.scan_dollar(start).map(Some);
        }

        if c == ':' {
            return Ok(Some(self.scan_colon(start)));
        }

        if c == '@' {
            if self.peek_at(1).is_some_and(is_ident_start) {
                self.bump();
                while self.peek().is_some_and(is_ident_continue) {
                    self.bump();
                }
                return Ok(Some(RawToken {
                    kind: RawKind::Significant(TokenKind::ParameterPlaceholder),
                    text: self.slice_from(start),
                    span: self.span_from(start),
                }));
            }
        }

        if c == '?' {
            self.bump();
            if self.peek().is_some_and(|c| OPERATOR_CHARS.contains(&c)) {
                while self.peek().is_some_and(|c| OPERATOR_CHARS.contains(&c)) {
                    self.bump();
                }
                return Ok(Some(RawToken {
                    kind: RawKind::Significant(TokenKind::Operator),
                    text: self.slice_from(start),
                    span: self.span_from(start),
                }));
            }
            return Ok(Some(RawToken {
                kind: RawKind::Significant(TokenKind::ParameterPlaceholder),
                text: self.slice_from(start),
                span: self.span_from(start),
            }));
        }

        if OPERATOR_CHARS.contains(&c) {
            while self.peek().is_some_and(|c| OPERATOR_CHARS.contains(&c)) {
                self.bump();
            }
            return Ok(Some(RawToken {
                kind: RawKind::Significant(TokenKind::Operator),
                text: self.slice_from(start),
                span: self.span_from(start),
            }));
        }

        if matches!(c, '(' | ')' | ',' | ';' | '[' | ']' | '.') {
            self.bump();
            return Ok(Some(RawToken {
                kind: RawKind::Significant(TokenKind::Punctuation),
                text: self.slice_from(start),
                span: self.span_from(start),
            }));
        }

        let span = self.span_from(start);
        self.bump();
        Err(LexError::IllegalCharacter(span, c))
    }

    fn scan_block_comment(&mut self, start: usize) -> Result<RawToken, LexError> {
        self.bump(); // '/'
        self.bump(); // '*'
        let mut depth = 1usize;

        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some('/'), Some('*')) => {
                    self.bump();
                    self.bump();
                    depth += 1;
                }
                (Some('*'), Some('/')) => {
                    self.bump();
                    self.bump();
                    depth -= 1;
                    if depth == 0 {
                        return Ok(RawToken {
                            kind: RawKind::Comment,
                            text: self.slice_from(start),
                            span: self.span_from(start),
                        });
                    }
                }
                (Some(_), _) => {
                    self.bump();
                }
                (None, _) => {
                    return Err(LexError::UnterminatedBlockComment(self.span_from(start)));
                }
            }
        }
    }

    fn scan_number(&mut self, start: usize) -> Result<RawToken, LexError> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let save = self.idx;
            self.bump();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.bump();
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            } else {
                self.idx = save;
            }
        }

        if self.peek().is_some_and(is_ident_continue) {
            while self.peek().is_some_and(is_ident_continue) {
                self.bump();
            }
            return Err(LexError::InvalidNumber(
                self.span_from(start),
                self.slice_from(start),
            ));
        }

        Ok(RawToken {
            kind: RawKind::Significant(TokenKind::NumericLiteral),
            text: self.slice_from(start),
            span: self.span_from(start),
        })
    }

    fn scan_identifier(&mut self, start: usize) -> RawToken {
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        let text = self.slice_from(start);
        let kind = Keyword::lookup(&text)
            .map(TokenKind::Keyword)
            .unwrap_or(TokenKind::Identifier);
        RawToken {
            kind: RawKind::Significant(kind),
            text,
            span: self.span_from(start),
        }
    }

    fn scan_quoted_ident(&mut self, start: usize) -> Result<RawToken, LexError> {
        self.bump(); // opening quote
        loop {
            match self.peek() {
                Some('"') => {
                    self.bump();
                    if self.peek() == Some('"') {
                        self.bump();
                        continue;
                    }
                    return Ok(RawToken {
                        kind: RawKind::Significant(TokenKind::QuotedIdentifier),
                        text: self.slice_from(start),
                        span: self.span_from(start),
                    });
                }
                Some(_) => {
                    self.bump();
                }
                None => return Err(LexError::UnterminatedQuotedIdent(self.span_from(start))),
            }
        }
    }

    fn scan_string(&mut self, start: usize) -> Result<RawToken, LexError> {
        self.bump(); // opening quote
        loop {
            match self.peek() {
                Some('\'') => {
                    self.bump();
                    if self.peek() == Some('\'') {
                        self.bump();
                        continue;
                    }
                    return Ok(RawToken {
                        kind: RawKind::Significant(TokenKind::StringLiteral),
                        text: self.slice_from(start),
                        span: self.span_from(start),
                    });
                }
                Some(_) => {
                    self.bump();
                }
                None => return Err(LexError::UnterminatedString(self.span_from(start))),
            }
        }
    }

    fn scan_escape_string(&mut self, start: usize) -> Result<RawToken, LexError> {
        self.bump(); // 'E'/'e'
        self.bump(); // opening quote
        loop {
            match self.peek() {
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some('\'') => {
                    self.bump();
                    if self.peek() == Some('\'') {
                        self.bump();
                        continue;
                    }
                    return Ok(RawToken {
                        kind: RawKind::Significant(TokenKind::StringLiteral),
                        text: self.slice_from(start),
                        span: self.span_from(start),
                    });
                }
                Some(_) => {
                    self.bump();
                }
                None => return Err(LexError::UnterminatedString(self.span_from(start))),
            }
        }
    }

    /// Dollar-quoted literals (`$tag$ ... $tag$`), positional parameters
    /// (`$1`), or an unsupported lone `$`.
    fn scan_dollar(&mut self, start: usize) -> Result<RawToken, LexError> {
        if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
            return Ok(RawToken {
                kind: RawKind::Significant(TokenKind::ParameterPlaceholder),
                text: self.slice_from(start),
                span: self.span_from(start),
            });
        }

        let tag_start = self.idx;
        self.bump(); // opening '$'
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        if self.peek() != Some('$') {
            let span = self.span_from(start);
            return Err(LexError::IllegalCharacter(span, '$'));
        }
        self.bump(); // closing '$' of the opening tag
        let tag = self.slice_from(tag_start);

        loop {
            if self.peek().is_none() {
                return Err(LexError::UnterminatedDollarQuote(self.span_from(start)));
            }
            if self.peek() == Some('$') && self.matches_ahead(&tag) {
                for _ in 0..tag.chars().count() {
                    self.bump();
                }
                return Ok(RawToken {
                    kind: RawKind::Significant(TokenKind::StringLiteral),
                    text: self.slice_from(start),
                    span: self.span_from(start),
                });
            }
            self.bump();
        }
    }

    fn matches_ahead(&self, needle: &str) -> bool {
        needle.chars().enumerate().all(|(i, ch)| self.peek_at(i) == Some(ch))
    }

    /// `::` cast operator, `:name` named parameter, or a bare `:`.
    fn scan_colon(&mut self, start: usize) -> RawToken {
        if self.peek_at(1) == Some(':') {
            self.bump();
            self.bump();
            return RawToken {
                kind: RawKind::Significant(TokenKind::Operator),
                text: self.slice_from(start),
                span: self.span_from(start),
            };
        }
        if self.peek_at(1).is_some_and(is_ident_start) {
            self.bump();
            while self.peek().is_some_and(is_ident_continue) {
                self.bump();
            }
            return RawToken {
                kind: RawKind::Significant(TokenKind::ParameterPlaceholder),
                text: self.slice_from(start),
                span: self.span_from(start),
            };
        }
        self.bump();
        RawToken {
            kind: RawKind::Significant(TokenKind::Operator),
            text: self.slice_from(start),
            span: self.span_from(start),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Attaches trivia comments to the nearest significant token (spec §4.1).
fn attach_comments(raw: Vec<RawToken>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::new();
    let mut pending_before: Vec<Comment> = Vec::new();
    let mut newline_since_last_significant = true;

    for tok in raw {
        match tok.kind {
            RawKind::Whitespace => {
                if tok.text.contains('\n') {
                    newline_since_last_significant = true;
                }
            }
            RawKind::Comment => {
                let comment = Comment {
                    position: CommentPosition::Before,
                    text: tok.text,
                    span: tok.span,
                };
                if !newline_since_last_significant {
                    if let Some(last) = out.last_mut() {
                        last.comments.after.push(Comment {
                            position: CommentPosition::After,
                            ..comment
                        });
                        continue;
                    }
                }
                pending_before.push(comment);
            }
            RawKind::Significant(kind) => {
                out.push(Token {
                    kind,
                    text: tok.text,
                    span: tok.span,
                    comments: Comments {
                        before: std::mem::take(&mut pending_before),
                        after: Vec::new(),
                    },
                });
                newline_since_last_significant = false;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_spaces_and_newlines_are_discarded() {
        assert_eq!(kinds("  \n\t"), vec![TokenKind::Eof]);
    }

    #[test]
    fn lex_ident() {
        let tokens = tokenize("hello").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text, "hello");
    }

    #[test]
    fn lex_keyword_case_insensitive() {
        let tokens = tokenize("Select").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Keyword(Keyword::Select));
    }

    #[test]
    fn lex_quoted_identifier_preserves_case_and_escapes() {
        let tokens = tokenize(r#""He said ""hi""""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::QuotedIdentifier);
        assert_eq!(tokens[0].text, r#""He said ""hi""""#);
    }

    #[test]
    fn lex_string_with_doubled_quote_escape() {
        let tokens = tokenize("'it''s'").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, "'it''s'");
    }

    #[test]
    fn lex_escape_string_with_backslash() {
        let tokens = tokenize(r"E'a\nb'").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
    }

    #[test]
    fn lex_dollar_quoted_string() {
        let tokens = tokenize("$tag$it's a trap$tag$").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, "$tag$it's a trap$tag$");
    }

    #[test]
    fn lex_dollar_dollar_string() {
        let tokens = tokenize("$$hello$$").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
    }

    #[test]
    fn lex_nested_block_comment() {
        let tokens = tokenize("/* outer /* inner */ still outer */ x").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text, "x");
        assert_eq!(tokens[0].comments.before.len(), 1);
    }

    #[test]
    fn lex_unterminated_block_comment_errors() {
        assert!(matches!(
            tokenize("/* never closed"),
            Err(LexError::UnterminatedBlockComment(_))
        ));
    }

    #[test]
    fn lex_numeric_forms() {
        assert_eq!(kinds("1").first(), Some(&TokenKind::NumericLiteral));
        assert_eq!(kinds("1.5")[0], TokenKind::NumericLiteral);
        assert_eq!(kinds("1.5e-10")[0], TokenKind::NumericLiteral);
    }

    #[test]
    fn lex_placeholders() {
        assert_eq!(kinds("?")[0], TokenKind::ParameterPlaceholder);
        assert_eq!(kinds("$1")[0], TokenKind::ParameterPlaceholder);
        assert_eq!(kinds(":name")[0], TokenKind::ParameterPlaceholder);
        assert_eq!(kinds("@name")[0], TokenKind::ParameterPlaceholder);
    }

    #[test]
    fn lex_cast_operator() {
        assert_eq!(kinds("::")[0], TokenKind::Operator);
    }

    #[test]
    fn lex_multi_char_operator_longest_match() {
        let tokens = tokenize("a <= b").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Operator);
        assert_eq!(tokens[1].text, "<=");
    }

    #[test]
    fn comment_attaches_after_same_line_token() {
        let tokens = tokenize("a -- trailing\nb").unwrap();
        assert_eq!(tokens[0].comments.after.len(), 1);
        assert_eq!(tokens[1].comments.before.len(), 0);
    }

    #[test]
    fn comment_attaches_before_next_token_after_newline() {
        let tokens = tokenize("a\n-- leading\nb").unwrap();
        assert_eq!(tokens[0].comments.after.len(), 0);
        assert_eq!(tokens[1].comments.before.len(), 1);
    }

    #[test]
    fn trailing_comment_attaches_to_eof() {
        let tokens = tokenize("a\n-- trailing at eof").unwrap();
        let eof = tokens.last().unwrap();
        assert_eq!(eof.kind, TokenKind::Eof);
        assert_eq!(eof.comments.before.len(), 1);
    }
}
