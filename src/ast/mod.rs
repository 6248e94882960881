//! Typed AST for SELECT / INSERT / UPDATE / DELETE / MERGE / VALUES (spec §3.2).
//!
//! The teacher generates one wrapper struct per `SyntaxKind` variant with
//! its `typed_syntax_node!`/`typed_syntax!` macros (`ast/mod.rs`), each
//! wrapping a `rowan` node with `cast`/`syntax` accessors. Every node here
//! is redesigned as an immutable, owned sum type (spec §9's "class
//! hierarchy with visitor double dispatch" / "shared mutable nodes with
//! back-references" flags), but the *pattern* of a small macro generating
//! the repetitive wrapper boilerplate is kept: [`ast_node!`] generates a
//! `{ kind, span, comments }` wrapper the same way `typed_syntax!`
//! generates a `{ syntax }` wrapper.

mod dml;
mod expr;
mod query;

pub use dml::*;
pub use expr::*;
pub use query::*;

use crate::lexer::Comments;
use crate::span::Span;

/// Generates a node wrapper carrying a payload `kind`, an optional
/// [`Span`], and any attached [`Comments`] (spec §3.2: "all carrying an
/// optional `comments` field and an optional `source_span`").
macro_rules! ast_node {
    ($(#[$meta:meta])* $name:ident($kind:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub kind: $kind,
            pub span: Option<Span>,
            pub comments: Comments,
        }

        impl $name {
            pub fn new(kind: $kind) -> Self {
                Self {
                    kind,
                    span: None,
                    comments: Comments::default(),
                }
            }

            pub fn with_span(mut self, span: Span) -> Self {
                self.span = Some(span);
                self
            }

            pub fn with_comments(mut self, comments: Comments) -> Self {
                self.comments = comments;
                self
            }
        }
    };
}

pub(crate) use ast_node;

/// A SQL identifier, quoted or not.
///
/// Generalized from the teacher's `SqlIdent` (`src/util.rs`): equality
/// and hashing fold case for unquoted identifiers and compare exactly for
/// quoted ones, matching PostgreSQL identifier semantics.
#[derive(Debug, Clone)]
pub struct Ident {
    pub text: String,
    pub quoted: bool,
}

impl Ident {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
        }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: true,
        }
    }
}

impl PartialEq for Ident {
    fn eq(&self, other: &Self) -> bool {
        if self.quoted != other.quoted {
            return false;
        }
        if self.quoted {
            self.text == other.text
        } else {
            self.text.eq_ignore_ascii_case(&other.text)
        }
    }
}

impl Eq for Ident {}

impl std::hash::Hash for Ident {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.quoted.hash(state);
        if self.quoted {
            self.text.hash(state);
        } else {
            self.text.to_ascii_lowercase().hash(state);
        }
    }
}

/// A possibly schema-qualified name (`schema.table`, `table`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectName {
    pub schema: Option<Ident>,
    pub name: Ident,
}

impl ObjectName {
    pub fn unqualified(name: Ident) -> Self {
        Self { schema: None, name }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_sql(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
            Pow => "^",
            Concat => "||",
            Eq => "=",
            NotEq => "<>",
            Lt => "<",
            LtEq => "<=",
            Gt => ">",
            GtEq => ">=",
            And => "and",
            Or => "or",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Number(String),
    String(String),
    Boolean(bool),
    Null,
    Typed { type_name: String, value: Box<Literal> },
}

/// A parameter reference; anonymous placeholders are numbered in document
/// order by the parser (spec §4.1).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamRef {
    Anonymous(u32),
    Positional(u32),
    Named(String),
}

/// Direction used by `ORDER BY` and ordering-sensitive transformers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}
