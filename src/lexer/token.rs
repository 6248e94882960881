//! Token kinds produced by the tokenizer (spec §3.1, §4.1).

use std::fmt;

/// The kind of a single lexeme.
///
/// Mirrors the teacher's `TokenKind` enum (`lexer/token.rs`) in shape —
/// one variant per lexical category, case-insensitive keyword matching,
/// a `Display` impl for diagnostics — generalized from PL/SQL's keyword
/// set to ANSI/PostgreSQL value-expression and clause keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    QuotedIdentifier,
    NumericLiteral,
    StringLiteral,
    ParameterPlaceholder,
    Keyword(Keyword),
    Operator,
    /// `( ) , ; [ ] .`
    Punctuation,
    Comment,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::QuotedIdentifier => write!(f, "quoted identifier"),
            TokenKind::NumericLiteral => write!(f, "numeric literal"),
            TokenKind::StringLiteral => write!(f, "string literal"),
            TokenKind::ParameterPlaceholder => write!(f, "parameter placeholder"),
            TokenKind::Keyword(kw) => write!(f, "keyword {kw:?}"),
            TokenKind::Operator => write!(f, "operator"),
            TokenKind::Punctuation => write!(f, "punctuation"),
            TokenKind::Comment => write!(f, "comment"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// Reserved words relevant to value expressions and clause parsing.
///
/// Not exhaustive of every PostgreSQL keyword (spec.md scopes this crate
/// to SELECT/INSERT/UPDATE/DELETE/MERGE/VALUES); unreserved identifiers
/// that happen to collide with a SQL keyword the parser does not treat
/// specially simply lex as [`TokenKind::Identifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Keyword {
    Select, From, Where, Group, By, Having, Window, Order, Limit, Offset, Fetch, First, Next,
    Rows, Only, With, Recursive, As, Values, Into, Insert, Update, Delete, Merge, Set, Using,
    On, Conflict, Do, Nothing, Returning, Matched, Not,
    Union, Intersect, Except, All, Distinct,
    Join, Inner, Left, Right, Full, Cross, Lateral, Natural, Outer,
    And, Or, Is, Null, True, False, Between, In, Like, Ilike, Exists, Any, Some,
    Case, When, Then, Else, End, Cast, Array, Row, Filter, Over, Partition, Asc, Desc, Nulls,
    Last, Materialized, Within, Rollup, Cube, Grouping, Sets, For, Share,
    Default, Constraint, Current, Unbounded, Preceding, Following, Ties,
    No, Key, Skip, Locked, Nowait, Range, Groups, Of,
}

impl Keyword {
    /// Looks up the keyword for a case-insensitive identifier, if any.
    ///
    /// A `match` over a `const` table, not a `lazy_static!` global map —
    /// per the module-local-constants redesign flag (spec §9).
    pub fn lookup(text: &str) -> Option<Keyword> {
        use Keyword::*;
        Some(match text.to_ascii_uppercase().as_str() {
            "SELECT" => Select,
            "FROM" => From,
            "WHERE" => Where,
            "GROUP" => Group,
            "BY" => By,
            "HAVING" => Having,
            "WINDOW" => Window,
            "ORDER" => Order,
            "LIMIT" => Limit,
            "OFFSET" => Offset,
            "FETCH" => Fetch,
            "FIRST" => First,
            "NEXT" => Next,
            "ROWS" => Rows,
            "ONLY" => Only,
            "WITH" => With,
            "RECURSIVE" => Recursive,
            "AS" => As,
            "VALUES" => Values,
            "INTO" => Into,
            "INSERT" => Insert,
            "UPDATE" => Update,
            "DELETE" => Delete,
            "MERGE" => Merge,
            "SET" => Set,
            "USING" => Using,
            "ON" => On,
            "CONFLICT" => Conflict,
            "DO" => Do,
            "NOTHING" => Nothing,
            "RETURNING" => Returning,
            "MATCHED" => Matched,
            "NOT" => Not,
            "UNION" => Union,
            "INTERSECT" => Intersect,
            "EXCEPT" => Except,
            "ALL" => All,
            "DISTINCT" => Distinct,
            "JOIN" => Join,
            "INNER" => Inner,
            "LEFT" => Left,
            "RIGHT" => Right,
            "FULL" => Full,
            "CROSS" => Cross,
            "LATERAL" => Lateral,
            "NATURAL" => Natural,
            "OUTER" => Outer,
            "AND" => And,
            "OR" => Or,
            "IS" => Is,
            "NULL" => Null,
            "TRUE" => True,
            "FALSE" => False,
            "BETWEEN" => Between,
            "IN" => In,
            "LIKE" => Like,
            "ILIKE" => Ilike,
            "EXISTS" => Exists,
            "ANY" => Any,
            "SOME" => Some,
            "CASE" => Case,
            "WHEN" => When,
            "THEN" => Then,
            "ELSE" => Else,
            "END" => End,
            "CAST" => Cast,
            "ARRAY" => Array,
            "ROW" => Row,
            "FILTER" => Filter,
            "OVER" => Over,
            "PARTITION" => Partition,
            "ASC" => Asc,
            "DESC" => Desc,
            "NULLS" => Nulls,
            "LAST" => Last,
            "MATERIALIZED" => Materialized,
            "WITHIN" => Within,
            "ROLLUP" => Rollup,
            "CUBE" => Cube,
            "GROUPING" => Grouping,
            "SETS" => Sets,
            "FOR" => For,
            "SHARE" => Share,
            "DEFAULT" => Default,
            "CONSTRAINT" => Constraint,
            "CURRENT" => Current,
            "UNBOUNDED" => Unbounded,
            "PRECEDING" => Preceding,
            "FOLLOWING" => Following,
            "TIES" => Ties,
            "NO" => No,
            "KEY" => Key,
            "SKIP" => Skip,
            "LOCKED" => Locked,
            "NOWAIT" => Nowait,
            "RANGE" => Range,
            "GROUPS" => Groups,
            "OF" => Of,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(Keyword::lookup("select"), Some(Keyword::Select));
        assert_eq!(Keyword::lookup("SeLeCt"), Some(Keyword::Select));
        assert_eq!(Keyword::lookup("selected"), None);
    }
}
