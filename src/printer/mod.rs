//! AST → SQL text printer (spec §4.6).
//!
//! Grounded in `PRQL-prql`'s `codegen::WriteSource` walk
//! (`crates/prql_ast/src/codegen.rs`): one function per node category,
//! each appending onto a shared buffer rather than returning fragments to
//! splice, since this printer (unlike PRQL's) never needs to retry at a
//! narrower width. Comment re-emission and parameter renumbering are new
//! additions with no teacher analogue, built directly from spec §4.6's
//! contract.

mod expr;
mod options;

pub use options::{
    CommentStyle, FormatOptions, IdentifierEscape, KeywordCase, LineBreak, ParameterStyle,
    ParameterSymbol, Preset, WithClauseStyle,
};

use indexmap::IndexMap;

use crate::ast::*;
use crate::error::PrintError;
use crate::lexer::{Comment, CommentPosition, Comments};

/// The renumbered set of parameter placeholders encountered while
/// printing, in left-to-right document order (spec §4.6: "Parameter
/// numbering is assigned at emission time by left-to-right document
/// order").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Params {
    /// Anonymous/indexed styles: the assigned index of each placeholder,
    /// in emission order. Forms the sequence `1..n` with no gaps.
    Ordered(Vec<u32>),
    /// Named style: each distinct parameter name mapped to its assigned
    /// index, in first-occurrence order.
    Named(IndexMap<String, u32>),
}

/// Formats `statement` using the `postgres` preset's defaults.
pub fn format(statement: &Statement) -> Result<(String, Params), PrintError> {
    format_with_options(statement, &FormatOptions::default())
}

pub fn format_with_options(
    statement: &Statement,
    options: &FormatOptions,
) -> Result<(String, Params), PrintError> {
    let mut printer = Printer::new(options);
    printer.print_statement(statement)?;
    Ok((printer.buf, printer.finish_params()))
}

pub(crate) struct Printer<'o> {
    pub(crate) buf: String,
    pub(crate) options: &'o FormatOptions,
    pub(crate) indent: u32,
    next_param_index: u32,
    ordered_params: Vec<u32>,
    named_params: IndexMap<String, u32>,
}

impl<'o> Printer<'o> {
    fn new(options: &'o FormatOptions) -> Self {
        Self {
            buf: String::new(),
            options,
            indent: 0,
            next_param_index: 1,
            ordered_params: Vec::new(),
            named_params: IndexMap::new(),
        }
    }

    fn finish_params(self) -> Params {
        match self.options.parameter_style {
            ParameterStyle::Named => Params::Named(self.named_params),
            ParameterStyle::Anonymous | ParameterStyle::Indexed => {
                Params::Ordered(self.ordered_params)
            }
        }
    }

    pub(crate) fn kw(&self, text: &str) -> String {
        match self.options.keyword_case {
            KeywordCase::Upper => text.to_ascii_uppercase(),
            KeywordCase::Lower => text.to_ascii_lowercase(),
            KeywordCase::Preserve => text.to_string(),
        }
    }

    pub(crate) fn push_kw(&mut self, text: &str) {
        let text = self.kw(text);
        self.buf.push_str(&text);
    }

    pub(crate) fn push(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    pub(crate) fn push_char(&mut self, c: char) {
        self.buf.push(c);
    }

    pub(crate) fn push_space(&mut self) {
        self.buf.push(' ');
    }

    pub(crate) fn push_newline_indent(&mut self) {
        self.buf.push_str(self.options.newline);
        let width = self.options.indent_size as usize * self.indent as usize;
        self.buf
            .extend(std::iter::repeat(self.options.indent_char).take(width));
    }

    pub(crate) fn push_ident(&mut self, ident: &Ident) {
        if ident.quoted || needs_quoting(&ident.text) {
            let esc = &self.options.identifier_escape;
            self.buf.push(esc.start);
            self.buf.push_str(&ident.text.replace(esc.end, &format!("{0}{0}", esc.end)));
            self.buf.push(esc.end);
        } else {
            self.buf.push_str(&ident.text);
        }
    }

    pub(crate) fn push_object_name(&mut self, name: &ObjectName) {
        if let Some(schema) = &name.schema {
            self.push_ident(schema);
            self.push_char('.');
        }
        self.push_ident(&name.name);
    }

    pub(crate) fn push_comments_before(&mut self, comments: &Comments) {
        if self.options.export_comment {
            for c in &comments.before {
                let as_block = self.comment_as_block(c);
                self.push_comment(c);
                if as_block {
                    self.push_space();
                }
            }
        }
    }

    pub(crate) fn push_comments_after(&mut self, comments: &Comments) {
        if self.options.export_comment {
            for c in &comments.after {
                self.push_space();
                self.push_comment(c);
            }
        }
    }

    fn comment_as_block(&self, comment: &Comment) -> bool {
        match self.options.comment_style {
            CommentStyle::Block => true,
            CommentStyle::Line => false,
            CommentStyle::Smart => matches!(comment.position, CommentPosition::Before),
        }
    }

    /// Emits `comment`. A line-style comment runs to the end of the
    /// physical line, so it must be followed by a newline or it would
    /// silently comment out whatever the caller writes next.
    fn push_comment(&mut self, comment: &Comment) {
        if self.comment_as_block(comment) {
            self.push("/* ");
            self.push(comment.text.trim());
            self.push(" */");
        } else {
            self.push("-- ");
            self.push(comment.text.trim());
            self.push_newline_indent();
        }
    }

    fn next_anonymous_param(&mut self) -> u32 {
        let idx = self.next_param_index;
        self.next_param_index += 1;
        self.ordered_params.push(idx);
        idx
    }

    fn named_param(&mut self, name: &str) -> u32 {
        if let Some(idx) = self.named_params.get(name) {
            *idx
        } else {
            let idx = self.next_param_index;
            self.next_param_index += 1;
            self.named_params.insert(name.to_string(), idx);
            idx
        }
    }

    pub(crate) fn push_param(&mut self, param: &ParamRef) {
        let symbol = &self.options.parameter_symbol.prefix;
        match param {
            ParamRef::Anonymous(_) => {
                self.next_anonymous_param();
                self.push(symbol);
            }
            ParamRef::Positional(n) => {
                self.ordered_params.push(*n);
                self.push(symbol);
                self.push(&n.to_string());
            }
            ParamRef::Named(name) => {
                let idx = self.named_param(name);
                match self.options.parameter_style {
                    ParameterStyle::Named => {
                        self.push(symbol);
                        self.push(name);
                    }
                    _ => {
                        self.push(symbol);
                        self.push(&idx.to_string());
                    }
                }
            }
        }
    }

    fn print_statement(&mut self, stmt: &Statement) -> Result<(), PrintError> {
        self.push_comments_before(&stmt.comments);
        match &stmt.kind {
            StatementKind::Query(q) => self.print_query(q)?,
            StatementKind::Insert(i) => self.print_insert(i)?,
            StatementKind::Update(u) => self.print_update(u)?,
            StatementKind::Delete(d) => self.print_delete(d)?,
            StatementKind::Merge(m) => self.print_merge(m)?,
        }
        self.push_comments_after(&stmt.comments);
        Ok(())
    }

    fn print_query(&mut self, query: &Query) -> Result<(), PrintError> {
        self.push_comments_before(&query.comments);
        match &query.kind {
            QueryKind::Simple(s) => self.print_simple_select(s)?,
            QueryKind::Binary(b) => self.print_binary_select(b)?,
            QueryKind::Values(v) => self.print_values(v)?,
        }
        self.push_comments_after(&query.comments);
        Ok(())
    }

    fn print_binary_select(&mut self, binary: &BinarySelect) -> Result<(), PrintError> {
        self.print_query(&binary.left)?;
        self.push_newline_indent();
        self.push_kw(set_operator_keyword(binary.op));
        self.push_newline_indent();
        self.print_query(&binary.right)?;
        Ok(())
    }

    fn print_values(&mut self, values: &ValuesQuery) -> Result<(), PrintError> {
        self.push_kw("values");
        self.push_space();
        for (i, row) in values.rows.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_char('(');
            for (j, expr) in row.iter().enumerate() {
                if j > 0 {
                    self.push(", ");
                }
                self.print_expr(expr)?;
            }
            self.push_char(')');
        }
        Ok(())
    }

    fn print_with_block(&mut self, with: &WithBlock) -> Result<(), PrintError> {
        self.push_kw("with");
        self.push_space();
        if with.recursive {
            self.push_kw("recursive");
            self.push_space();
        }
        for (i, cte) in with.ctes.iter().enumerate() {
            if i > 0 {
                self.push_char(',');
                self.push_newline_indent();
            }
            self.push_ident(&cte.name);
            if !cte.column_aliases.is_empty() {
                self.push(" (");
                for (j, c) in cte.column_aliases.iter().enumerate() {
                    if j > 0 {
                        self.push(", ");
                    }
                    self.push_ident(c);
                }
                self.push_char(')');
            }
            self.push_space();
            self.push_kw("as");
            self.push_space();
            if let Some(materialized) = cte.materialized {
                if !materialized {
                    self.push_kw("not");
                    self.push_space();
                }
                self.push_kw("materialized");
                self.push_space();
            }
            self.push_char('(');
            self.indent += 1;
            self.print_query(&cte.body)?;
            self.indent -= 1;
            self.push_char(')');
        }
        self.push_newline_indent();
        Ok(())
    }

    fn print_simple_select(&mut self, select: &SimpleSelect) -> Result<(), PrintError> {
        if let Some(with) = &select.with {
            self.print_with_block(with)?;
        }
        self.push_kw("select");
        match &select.select.distinct {
            Distinct::None | Distinct::All => {}
            Distinct::Distinct => {
                self.push_space();
                self.push_kw("distinct");
            }
            Distinct::DistinctOn(exprs) => {
                self.push_space();
                self.push_kw("distinct on");
                self.push(" (");
                for (i, e) in exprs.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.print_expr(e)?;
                }
                self.push_char(')');
            }
        }
        self.push_space();
        for (i, item) in select.select.items.iter().enumerate() {
            if i > 0 {
                self.push_comma_break();
            }
            self.print_select_item(item)?;
        }

        if !select.from.is_empty() {
            self.push_newline_indent();
            self.push_kw("from");
            self.push_space();
            for (i, item) in select.from.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.print_from_item(item)?;
            }
        }

        if let Some(r#where) = &select.r#where {
            self.push_newline_indent();
            self.push_kw("where");
            self.push_space();
            self.print_expr(r#where)?;
        }

        if let Some(group_by) = &select.group_by {
            self.push_newline_indent();
            self.push_kw("group by");
            self.push_space();
            self.print_group_by(group_by)?;
        }

        if let Some(having) = &select.having {
            self.push_newline_indent();
            self.push_kw("having");
            self.push_space();
            self.print_expr(having)?;
        }

        if !select.windows.is_empty() {
            self.push_newline_indent();
            self.push_kw("window");
            self.push_space();
            for (i, (name, def)) in select.windows.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.push_ident(name);
                self.push_space();
                self.push_kw("as");
                self.push_space();
                self.push_char('(');
                self.print_window_definition(def)?;
                self.push_char(')');
            }
        }

        if !select.order_by.is_empty() {
            self.push_newline_indent();
            self.push_kw("order by");
            self.push_space();
            for (i, item) in select.order_by.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.print_order_by_item(item)?;
            }
        }

        if let Some(limit) = &select.limit {
            self.push_newline_indent();
            self.push_kw("limit");
            self.push_space();
            self.print_expr(limit)?;
        }

        if let Some(offset) = &select.offset {
            self.push_newline_indent();
            self.push_kw("offset");
            self.push_space();
            self.print_expr(offset)?;
        }

        if let Some(fetch) = &select.fetch {
            self.push_newline_indent();
            self.push_kw("fetch first");
            self.push_space();
            self.print_expr(&fetch.count)?;
            self.push_space();
            self.push_kw("rows");
            self.push_space();
            self.push_kw(if fetch.with_ties { "with ties" } else { "only" });
        }

        if let Some(locking) = &select.for_update {
            self.push_newline_indent();
            self.push_kw("for");
            self.push_space();
            self.push_kw(locking_strength_keyword(locking.strength));
            if !locking.of.is_empty() {
                self.push_space();
                self.push_kw("of");
                self.push_space();
                for (i, name) in locking.of.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push_object_name(name);
                }
            }
            if locking.nowait {
                self.push_space();
                self.push_kw("nowait");
            }
            if locking.skip_locked {
                self.push_space();
                self.push_kw("skip locked");
            }
        }

        Ok(())
    }

    fn push_comma_break(&mut self) {
        match self.options.comma_break {
            LineBreak::Before => {
                self.push_newline_indent();
                self.push(", ");
            }
            LineBreak::After => {
                self.push_char(',');
                self.push_newline_indent();
            }
            LineBreak::None => self.push(", "),
        }
    }

    fn print_select_item(&mut self, item: &SelectItem) -> Result<(), PrintError> {
        match item {
            SelectItem::Wildcard => self.push_char('*'),
            SelectItem::QualifiedWildcard(table) => {
                self.push_ident(table);
                self.push(".*");
            }
            SelectItem::Expr { expr, alias } => {
                self.print_expr(expr)?;
                if let Some(alias) = alias {
                    self.push_space();
                    self.push_kw("as");
                    self.push_space();
                    self.push_ident(alias);
                }
            }
        }
        Ok(())
    }

    fn print_group_by(&mut self, group_by: &GroupByClause) -> Result<(), PrintError> {
        match &group_by.mode {
            GroupByMode::Plain => self.print_expr_list(&group_by.exprs)?,
            GroupByMode::Rollup => {
                self.push_kw("rollup");
                self.push_char('(');
                self.print_expr_list(&group_by.exprs)?;
                self.push_char(')');
            }
            GroupByMode::Cube => {
                self.push_kw("cube");
                self.push_char('(');
                self.print_expr_list(&group_by.exprs)?;
                self.push_char(')');
            }
            GroupByMode::GroupingSets(sets) => {
                self.push_kw("grouping sets");
                self.push(" (");
                for (i, set) in sets.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push_char('(');
                    self.print_expr_list(set)?;
                    self.push_char(')');
                }
                self.push_char(')');
            }
        }
        Ok(())
    }

    fn print_expr_list(&mut self, exprs: &[Expr]) -> Result<(), PrintError> {
        for (i, e) in exprs.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.print_expr(e)?;
        }
        Ok(())
    }

    fn print_order_by_item(&mut self, item: &OrderByItem) -> Result<(), PrintError> {
        self.print_expr(&item.expr)?;
        if let Some(dir) = item.direction {
            self.push_space();
            self.push_kw(match dir {
                SortDirection::Asc => "asc",
                SortDirection::Desc => "desc",
            });
        }
        if let Some(nulls) = item.nulls {
            self.push_space();
            self.push_kw("nulls");
            self.push_space();
            self.push_kw(match nulls {
                NullsOrder::First => "first",
                NullsOrder::Last => "last",
            });
        }
        Ok(())
    }

    fn print_from_item(&mut self, item: &FromItem) -> Result<(), PrintError> {
        self.push_comments_before(&item.comments);
        match &item.kind {
            FromItemKind::Table {
                name,
                alias,
                column_aliases,
            } => {
                self.push_object_name(name);
                self.print_alias(alias.as_ref(), column_aliases)?;
            }
            FromItemKind::Subquery {
                query,
                alias,
                column_aliases,
                lateral,
            } => {
                if *lateral {
                    self.push_kw("lateral");
                    self.push_space();
                }
                self.push_char('(');
                self.indent += 1;
                self.print_query(query)?;
                self.indent -= 1;
                self.push_char(')');
                self.push_space();
                self.push_kw("as");
                self.push_space();
                self.push_ident(alias);
                self.print_column_aliases(column_aliases)?;
            }
            FromItemKind::Values {
                query,
                alias,
                column_aliases,
            } => {
                self.push_char('(');
                self.print_values(query)?;
                self.push_char(')');
                self.push_space();
                self.push_kw("as");
                self.push_space();
                self.push_ident(alias);
                self.print_column_aliases(column_aliases)?;
            }
            FromItemKind::Function {
                call,
                alias,
                column_aliases,
                lateral,
            } => {
                if *lateral {
                    self.push_kw("lateral");
                    self.push_space();
                }
                self.print_function_call(call)?;
                self.print_alias(alias.as_ref(), column_aliases)?;
            }
            FromItemKind::Join(join) => self.print_join(join)?,
        }
        self.push_comments_after(&item.comments);
        Ok(())
    }

    fn print_alias(
        &mut self,
        alias: Option<&Ident>,
        column_aliases: &[Ident],
    ) -> Result<(), PrintError> {
        if let Some(alias) = alias {
            self.push_space();
            self.push_kw("as");
            self.push_space();
            self.push_ident(alias);
            self.print_column_aliases(column_aliases)?;
        }
        Ok(())
    }

    fn print_column_aliases(&mut self, column_aliases: &[Ident]) -> Result<(), PrintError> {
        if !column_aliases.is_empty() {
            self.push(" (");
            for (i, c) in column_aliases.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.push_ident(c);
            }
            self.push_char(')');
        }
        Ok(())
    }

    fn print_join(&mut self, join: &Join) -> Result<(), PrintError> {
        self.print_from_item(&join.left)?;
        if self.options.join_one_line {
            self.push_space();
        } else {
            self.push_newline_indent();
        }
        self.push_kw(join_kind_keyword(join.kind));
        self.push_space();
        self.print_from_item(&join.right)?;
        match &join.condition {
            JoinCondition::On(expr) => {
                self.push_space();
                self.push_kw("on");
                self.push_space();
                self.print_expr(expr)?;
            }
            JoinCondition::Using(cols) => {
                self.push_space();
                self.push_kw("using");
                self.push(" (");
                for (i, c) in cols.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push_ident(c);
                }
                self.push_char(')');
            }
            JoinCondition::Natural | JoinCondition::None => {}
        }
        Ok(())
    }

    fn print_window_definition(&mut self, def: &WindowDefinition) -> Result<(), PrintError> {
        let mut wrote = false;
        if let Some(base) = &def.base {
            self.push_ident(base);
            wrote = true;
        }
        if !def.partition_by.is_empty() {
            if wrote {
                self.push_space();
            }
            self.push_kw("partition by");
            self.push_space();
            self.print_expr_list(&def.partition_by)?;
            wrote = true;
        }
        if !def.order_by.is_empty() {
            if wrote {
                self.push_space();
            }
            self.push_kw("order by");
            self.push_space();
            for (i, item) in def.order_by.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.print_order_by_item(item)?;
            }
            wrote = true;
        }
        if let Some(frame) = &def.frame {
            if wrote {
                self.push_space();
            }
            self.push_kw(match frame.unit {
                FrameUnit::Rows => "rows",
                FrameUnit::Range => "range",
                FrameUnit::Groups => "groups",
            });
            self.push_space();
            if let Some(end) = &frame.end {
                self.push_kw("between");
                self.push_space();
                self.print_frame_bound(&frame.start)?;
                self.push_space();
                self.push_kw("and");
                self.push_space();
                self.print_frame_bound(end)?;
            } else {
                self.print_frame_bound(&frame.start)?;
            }
        }
        Ok(())
    }

    fn print_frame_bound(&mut self, bound: &FrameBound) -> Result<(), PrintError> {
        match bound {
            FrameBound::UnboundedPreceding => {
                self.push_kw("unbounded preceding");
            }
            FrameBound::UnboundedFollowing => {
                self.push_kw("unbounded following");
            }
            FrameBound::CurrentRow => {
                self.push_kw("current row");
            }
            FrameBound::Preceding(e) => {
                self.print_expr(e)?;
                self.push_space();
                self.push_kw("preceding");
            }
            FrameBound::Following(e) => {
                self.print_expr(e)?;
                self.push_space();
                self.push_kw("following");
            }
        }
        Ok(())
    }

    fn print_function_call(&mut self, call: &FunctionCall) -> Result<(), PrintError> {
        self.push_object_name(&call.name);
        self.push_char('(');
        if call.distinct {
            self.push_kw("distinct");
            self.push_space();
        }
        self.print_expr_list(&call.args)?;
        self.push_char(')');
        if let Some(filter) = &call.filter {
            self.push_space();
            self.push_kw("filter");
            self.push(" (");
            self.push_kw("where");
            self.push_space();
            self.print_expr(filter)?;
            self.push_char(')');
        }
        if let Some(within_group) = &call.within_group {
            self.push_space();
            self.push_kw("within group");
            self.push(" (");
            self.push_kw("order by");
            self.push_space();
            for (i, item) in within_group.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.print_order_by_item(item)?;
            }
            self.push_char(')');
        }
        if let Some(over) = &call.over {
            self.push_space();
            self.push_kw("over");
            self.push_space();
            match over {
                WindowSpec::Named(name) => self.push_ident(name),
                WindowSpec::Inline(def) => {
                    self.push_char('(');
                    self.print_window_definition(def)?;
                    self.push_char(')');
                }
            }
        }
        Ok(())
    }

    fn print_insert(&mut self, insert: &Insert) -> Result<(), PrintError> {
        if let Some(with) = &insert.with {
            self.print_with_block(with)?;
        }
        self.push_kw("insert into");
        self.push_space();
        self.push_object_name(&insert.target);
        if let Some(columns) = &insert.columns {
            self.push(" (");
            for (i, c) in columns.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.push_ident(c);
            }
            self.push_char(')');
        }
        self.push_newline_indent();
        match &insert.source {
            InsertSource::DefaultValues => {
                self.push_kw("default values");
            }
            InsertSource::Query(q) => self.print_query(q)?,
        }
        if let Some(on_conflict) = &insert.on_conflict {
            self.push_newline_indent();
            self.push_kw("on conflict");
            self.print_on_conflict(on_conflict)?;
        }
        if let Some(returning) = &insert.returning {
            self.push_newline_indent();
            self.push_kw("returning");
            self.push_space();
            for (i, item) in returning.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.print_select_item(item)?;
            }
        }
        Ok(())
    }

    fn print_on_conflict(&mut self, on_conflict: &OnConflict) -> Result<(), PrintError> {
        if let Some(target) = &on_conflict.target {
            self.push_space();
            match target {
                ConflictTarget::Columns(cols) => {
                    self.push_char('(');
                    for (i, c) in cols.iter().enumerate() {
                        if i > 0 {
                            self.push(", ");
                        }
                        self.push_ident(c);
                    }
                    self.push_char(')');
                }
                ConflictTarget::Constraint(name) => {
                    self.push_kw("on constraint");
                    self.push_space();
                    self.push_ident(name);
                }
            }
        }
        self.push_space();
        self.push_kw("do");
        self.push_space();
        match &on_conflict.action {
            ConflictAction::DoNothing => self.push_kw("nothing"),
            ConflictAction::DoUpdate { set, r#where } => {
                self.push_kw("update set");
                self.push_space();
                self.print_set_items(set)?;
                if let Some(r#where) = r#where {
                    self.push_space();
                    self.push_kw("where");
                    self.push_space();
                    self.print_expr(r#where)?;
                }
            }
        }
        Ok(())
    }

    fn print_set_items(&mut self, items: &[SetItem]) -> Result<(), PrintError> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_ident(&item.column);
            self.push(" = ");
            self.print_expr(&item.value)?;
        }
        Ok(())
    }

    fn print_update(&mut self, update: &Update) -> Result<(), PrintError> {
        if let Some(with) = &update.with {
            self.print_with_block(with)?;
        }
        self.push_kw("update");
        self.push_space();
        self.push_object_name(&update.target);
        if let Some(alias) = &update.alias {
            self.push_space();
            self.push_ident(alias);
        }
        self.push_newline_indent();
        self.push_kw("set");
        self.push_space();
        self.print_set_items(&update.set)?;
        if !update.from.is_empty() {
            self.push_newline_indent();
            self.push_kw("from");
            self.push_space();
            for (i, item) in update.from.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.print_from_item(item)?;
            }
        }
        if let Some(r#where) = &update.r#where {
            self.push_newline_indent();
            self.push_kw("where");
            self.push_space();
            self.print_expr(r#where)?;
        }
        if let Some(returning) = &update.returning {
            self.push_newline_indent();
            self.push_kw("returning");
            self.push_space();
            for (i, item) in returning.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.print_select_item(item)?;
            }
        }
        Ok(())
    }

    fn print_delete(&mut self, delete: &Delete) -> Result<(), PrintError> {
        if let Some(with) = &delete.with {
            self.print_with_block(with)?;
        }
        self.push_kw("delete from");
        self.push_space();
        self.push_object_name(&delete.target);
        if let Some(alias) = &delete.alias {
            self.push_space();
            self.push_ident(alias);
        }
        if !delete.using.is_empty() {
            self.push_newline_indent();
            self.push_kw("using");
            self.push_space();
            for (i, item) in delete.using.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.print_from_item(item)?;
            }
        }
        if let Some(r#where) = &delete.r#where {
            self.push_newline_indent();
            self.push_kw("where");
            self.push_space();
            self.print_expr(r#where)?;
        }
        if let Some(returning) = &delete.returning {
            self.push_newline_indent();
            self.push_kw("returning");
            self.push_space();
            for (i, item) in returning.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.print_select_item(item)?;
            }
        }
        Ok(())
    }

    fn print_merge(&mut self, merge: &Merge) -> Result<(), PrintError> {
        self.push_kw("merge into");
        self.push_space();
        self.push_object_name(&merge.target);
        if let Some(alias) = &merge.target_alias {
            self.push_space();
            self.push_ident(alias);
        }
        self.push_newline_indent();
        self.push_kw("using");
        self.push_space();
        self.print_from_item(&merge.using)?;
        self.push_space();
        self.push_kw("on");
        self.push_space();
        self.print_expr(&merge.on)?;
        for clause in &merge.when_clauses {
            self.push_newline_indent();
            self.push_kw("when");
            self.push_space();
            self.push_kw(if clause.matched { "matched" } else { "not matched" });
            if let Some(cond) = &clause.additional_condition {
                self.push_space();
                self.push_kw("and");
                self.push_space();
                self.print_expr(cond)?;
            }
            self.push_space();
            self.push_kw("then");
            self.push_space();
            match &clause.action {
                MergeAction::Update(set) => {
                    self.push_kw("update set");
                    self.push_space();
                    self.print_set_items(set)?;
                }
                MergeAction::Delete => self.push_kw("delete"),
                MergeAction::DoNothing => self.push_kw("do nothing"),
                MergeAction::Insert { columns, values } => {
                    self.push_kw("insert");
                    if let Some(columns) = columns {
                        self.push(" (");
                        for (i, c) in columns.iter().enumerate() {
                            if i > 0 {
                                self.push(", ");
                            }
                            self.push_ident(c);
                        }
                        self.push_char(')');
                    }
                    self.push_space();
                    self.push_kw("values");
                    self.push(" (");
                    self.print_expr_list(values)?;
                    self.push_char(')');
                }
            }
        }
        Ok(())
    }
}

fn needs_quoting(text: &str) -> bool {
    let starts_ok = text
        .chars()
        .next()
        .map(|c| c.is_ascii_lowercase() || c == '_')
        .unwrap_or(false);
    let plain_body = starts_ok
        && text
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    !plain_body || crate::lexer::Keyword::lookup(text).is_some()
}

fn set_operator_keyword(op: SetOperator) -> &'static str {
    match op {
        SetOperator::Union => "union",
        SetOperator::UnionAll => "union all",
        SetOperator::Intersect => "intersect",
        SetOperator::IntersectAll => "intersect all",
        SetOperator::Except => "except",
        SetOperator::ExceptAll => "except all",
    }
}

fn join_kind_keyword(kind: JoinKind) -> &'static str {
    match kind {
        JoinKind::Inner => "join",
        JoinKind::Left => "left join",
        JoinKind::Right => "right join",
        JoinKind::Full => "full join",
        JoinKind::Cross => "cross join",
        JoinKind::LateralInner => "join",
        JoinKind::LateralLeft => "left join",
    }
}

fn locking_strength_keyword(strength: LockingStrength) -> &'static str {
    match strength {
        LockingStrength::Update => "update",
        LockingStrength::NoKeyUpdate => "no key update",
        LockingStrength::Share => "share",
        LockingStrength::KeyShare => "key share",
    }
}
