//! Formatting options and dialect presets (spec §4.6, §6's option table).
//!
//! Grounded in `PRQL-prql`'s `codegen::WriteOpt` (`crates/prql_ast/src/codegen.rs`):
//! a plain, `Clone`-able options struct threaded through the printer by value,
//! the same way `WriteOpt` carries `tab`/`indent`/`max_width` through `write`.
//! Module-local preset constants replace the teacher's pattern of global
//! keyword tables (spec §9's "global singletons" redesign flag).

/// Seeds the other formatting knobs for a target dialect (spec §6: "A
/// preset seeds identifier escape, parameter symbol, and parameter
/// style; explicit options override the preset").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Postgres,
    MySql,
    SqlServer,
    Sqlite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordCase {
    Upper,
    Lower,
    Preserve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterStyle {
    Anonymous,
    Indexed,
    Named,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineBreak {
    Before,
    After,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithClauseStyle {
    Inline,
    Newline,
    FullNewline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    Block,
    Line,
    Smart,
}

/// Start/end delimiters for quoted identifiers (spec §6's
/// `identifierEscape`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierEscape {
    pub start: char,
    pub end: char,
}

/// The prefix (anonymous/indexed styles) or start/end pair (named style)
/// used for parameter placeholders (spec §6's `parameterSymbol`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSymbol {
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    pub identifier_escape: IdentifierEscape,
    pub parameter_symbol: ParameterSymbol,
    pub parameter_style: ParameterStyle,
    pub keyword_case: KeywordCase,
    pub indent_size: u8,
    pub indent_char: char,
    pub newline: &'static str,
    pub comma_break: LineBreak,
    pub and_break: LineBreak,
    pub or_break: LineBreak,
    pub with_clause_style: WithClauseStyle,
    pub parentheses_one_line: bool,
    pub between_one_line: bool,
    pub values_one_line: bool,
    pub join_one_line: bool,
    pub case_one_line: bool,
    pub subquery_one_line: bool,
    pub insert_columns_one_line: bool,
    pub when_one_line: bool,
    pub export_comment: bool,
    pub comment_style: CommentStyle,
}

impl FormatOptions {
    /// Starts from a dialect preset, then lets the caller override
    /// individual fields (spec §4.6's "Style presets").
    pub fn from_preset(preset: Preset) -> Self {
        let (identifier_escape, parameter_symbol, parameter_style) = match preset {
            Preset::Postgres => (
                IdentifierEscape { start: '"', end: '"' },
                ParameterSymbol { prefix: ":".into() },
                ParameterStyle::Named,
            ),
            Preset::MySql => (
                IdentifierEscape { start: '`', end: '`' },
                ParameterSymbol { prefix: "?".into() },
                ParameterStyle::Anonymous,
            ),
            Preset::SqlServer => (
                IdentifierEscape { start: '[', end: ']' },
                ParameterSymbol { prefix: "@".into() },
                ParameterStyle::Named,
            ),
            Preset::Sqlite => (
                IdentifierEscape { start: '"', end: '"' },
                ParameterSymbol { prefix: "?".into() },
                ParameterStyle::Indexed,
            ),
        };

        Self {
            identifier_escape,
            parameter_symbol,
            parameter_style,
            keyword_case: KeywordCase::Lower,
            indent_size: 2,
            indent_char: ' ',
            newline: "\n",
            comma_break: LineBreak::None,
            and_break: LineBreak::None,
            or_break: LineBreak::None,
            with_clause_style: WithClauseStyle::Newline,
            parentheses_one_line: true,
            between_one_line: true,
            values_one_line: true,
            join_one_line: true,
            case_one_line: false,
            subquery_one_line: false,
            insert_columns_one_line: true,
            when_one_line: true,
            export_comment: false,
            comment_style: CommentStyle::Smart,
        }
    }
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self::from_preset(Preset::Postgres)
    }
}
