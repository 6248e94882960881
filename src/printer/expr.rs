//! Expression printing with precedence-aware parenthesization.
//!
//! Grounded in `PRQL-prql`'s `codegen::binding_strength` (`crates/prql_ast/src/codegen.rs`):
//! each expression carries a binding strength, and a child is wrapped in
//! parentheses only when its own strength is lower than the strength the
//! parent requires. The strength ladder mirrors `parser/expr.rs`'s
//! precedence climb, in reverse: tighter-binding operators get the higher
//! numbers.

use crate::ast::{BinaryOp, ColumnName, Expr, ExprKind, Literal, UnaryOp};
use crate::error::PrintError;

use super::Printer;

fn binary_strength(op: BinaryOp) -> u8 {
    use BinaryOp::*;
    match op {
        Or => 1,
        And => 2,
        Eq | NotEq | Lt | LtEq | Gt | GtEq => 4,
        Concat | Add | Sub => 5,
        Mul | Div | Mod => 6,
        Pow => 7,
    }
}

/// Strength of the outermost operator in `expr`, used to decide whether
/// a child needs wrapping when printed under a given parent strength.
fn expr_strength(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::Binary { op, .. } => binary_strength(*op),
        ExprKind::Unary {
            op: UnaryOp::Not, ..
        } => 3,
        ExprKind::Unary { .. } => 8,
        ExprKind::Between { .. }
        | ExprKind::InList { .. }
        | ExprKind::InSubquery { .. }
        | ExprKind::Like { .. }
        | ExprKind::IsNull { .. }
        | ExprKind::IsDistinctFrom { .. } => 4,
        ExprKind::Cast { .. } => 9,
        _ => 10,
    }
}

impl<'o> Printer<'o> {
    pub(crate) fn print_expr(&mut self, expr: &Expr) -> Result<(), PrintError> {
        self.push_comments_before(&expr.comments);
        self.print_expr_kind(&expr.kind)?;
        self.push_comments_after(&expr.comments);
        Ok(())
    }

    /// Prints `child` wrapped in parentheses if its binding strength is
    /// lower than `min_strength` (i.e. it would be misparsed unparenthesized).
    fn print_operand(&mut self, child: &Expr, min_strength: u8) -> Result<(), PrintError> {
        let needs_parens = expr_strength(child) < min_strength;
        if needs_parens {
            self.push_char('(');
            self.print_expr(child)?;
            self.push_char(')');
        } else {
            self.print_expr(child)?;
        }
        Ok(())
    }

    fn print_expr_kind(&mut self, kind: &ExprKind) -> Result<(), PrintError> {
        match kind {
            ExprKind::Column(col) => {
                if let Some(table) = &col.table {
                    self.push_ident(table);
                    self.push_char('.');
                }
                match &col.column {
                    ColumnName::Named(ident) => self.push_ident(ident),
                    ColumnName::Wildcard => self.push_char('*'),
                }
            }
            ExprKind::Literal(lit) => self.print_literal(lit),
            ExprKind::Parameter(param) => self.push_param(param),
            ExprKind::Function(call) => self.print_function_call(call)?,
            ExprKind::Unary { op, expr } => {
                let strength = match op {
                    UnaryOp::Not => 3,
                    UnaryOp::Plus | UnaryOp::Minus => 8,
                };
                match op {
                    UnaryOp::Plus => self.push_char('+'),
                    UnaryOp::Minus => self.push_char('-'),
                    UnaryOp::Not => {
                        self.push_kw("not");
                        self.push_space();
                    }
                }
                self.print_operand(expr, strength)?;
            }
            ExprKind::Binary { op, left, right } => {
                let strength = binary_strength(*op);
                self.print_operand(left, strength)?;
                self.push_space();
                self.push_kw(op.as_sql());
                self.push_space();
                self.print_operand(right, strength + 1)?;
            }
            ExprKind::Between {
                expr,
                negated,
                low,
                high,
            } => {
                self.print_operand(expr, 4)?;
                self.push_space();
                if *negated {
                    self.push_kw("not");
                    self.push_space();
                }
                self.push_kw("between");
                self.push_space();
                self.print_operand(low, 5)?;
                self.push_space();
                self.push_kw("and");
                self.push_space();
                self.print_operand(high, 5)?;
            }
            ExprKind::InList {
                expr,
                negated,
                list,
            } => {
                self.print_operand(expr, 4)?;
                self.push_space();
                if *negated {
                    self.push_kw("not");
                    self.push_space();
                }
                self.push_kw("in");
                self.push(" (");
                self.print_expr_list(list)?;
                self.push_char(')');
            }
            ExprKind::InSubquery {
                expr,
                negated,
                subquery,
            } => {
                self.print_operand(expr, 4)?;
                self.push_space();
                if *negated {
                    self.push_kw("not");
                    self.push_space();
                }
                self.push_kw("in");
                self.push(" (");
                self.print_query(subquery)?;
                self.push_char(')');
            }
            ExprKind::Like {
                expr,
                negated,
                case_insensitive,
                pattern,
            } => {
                self.print_operand(expr, 4)?;
                self.push_space();
                if *negated {
                    self.push_kw("not");
                    self.push_space();
                }
                self.push_kw(if *case_insensitive { "ilike" } else { "like" });
                self.push_space();
                self.print_operand(pattern, 5)?;
            }
            ExprKind::IsNull { expr, negated } => {
                self.print_operand(expr, 4)?;
                self.push_space();
                self.push_kw("is");
                self.push_space();
                if *negated {
                    self.push_kw("not");
                    self.push_space();
                }
                self.push_kw("null");
            }
            ExprKind::IsDistinctFrom {
                left,
                right,
                negated,
            } => {
                self.print_operand(left, 4)?;
                self.push_space();
                self.push_kw("is");
                self.push_space();
                if *negated {
                    self.push_kw("not");
                    self.push_space();
                }
                self.push_kw("distinct from");
                self.push_space();
                self.print_operand(right, 4)?;
            }
            ExprKind::Case {
                operand,
                branches,
                else_branch,
            } => {
                self.push_kw("case");
                if let Some(operand) = operand {
                    self.push_space();
                    self.print_expr(operand)?;
                }
                for (when, then) in branches {
                    self.push_space();
                    self.push_kw("when");
                    self.push_space();
                    self.print_expr(when)?;
                    self.push_space();
                    self.push_kw("then");
                    self.push_space();
                    self.print_expr(then)?;
                }
                if let Some(else_branch) = else_branch {
                    self.push_space();
                    self.push_kw("else");
                    self.push_space();
                    self.print_expr(else_branch)?;
                }
                self.push_space();
                self.push_kw("end");
            }
            ExprKind::Cast { expr, type_name } => {
                self.print_operand(expr, 9)?;
                self.push("::");
                self.push(type_name);
            }
            ExprKind::Array(items) => {
                self.push_kw("array");
                self.push_char('[');
                self.print_expr_list(items)?;
                self.push_char(']');
            }
            ExprKind::Row(items) => {
                self.push_kw("row");
                self.push_char('(');
                self.print_expr_list(items)?;
                self.push_char(')');
            }
            ExprKind::Paren(inner) => {
                self.push_char('(');
                self.print_expr(inner)?;
                self.push_char(')');
            }
            ExprKind::Subquery(query) => {
                self.push_char('(');
                self.print_query(query)?;
                self.push_char(')');
            }
            ExprKind::Exists { negated, subquery } => {
                if *negated {
                    self.push_kw("not");
                    self.push_space();
                }
                self.push_kw("exists");
                self.push(" (");
                self.print_query(subquery)?;
                self.push_char(')');
            }
        }
        Ok(())
    }

    fn print_literal(&mut self, lit: &Literal) {
        match lit {
            Literal::Number(n) => self.push(n),
            Literal::String(s) => {
                self.push_char('\'');
                self.push(&s.replace('\'', "''"));
                self.push_char('\'');
            }
            Literal::Boolean(b) => self.push_kw(if *b { "true" } else { "false" }),
            Literal::Null => self.push_kw("null"),
            Literal::Typed { type_name, value } => {
                self.print_literal(value);
                self.push("::");
                self.push(type_name);
            }
        }
    }
}
