//! Filter predicates: one column compared against a value, a value list,
//! or a literal SQL expression.
//!
//! [`Predicate::build`] is the single entry point; it dispatches on the
//! operator and the right-hand side kind, so `IN` always gets a list or an
//! expression and scalar operators always get a single value.

use crate::error::{SqlError, SqlResult};
use crate::fragment::{Fragment, Param, SqlExpr};
use crate::ident;
use crate::types::{CmpOp, LogicOp};
use tokio_postgres::types::ToSql;

/// The right-hand side of a predicate.
#[derive(Clone, Debug)]
pub enum Rhs {
    /// A single bound value.
    Value(Param),
    /// A list of bound values, for `IN`.
    List(Vec<Param>),
    /// A literal SQL expression spliced verbatim.
    Expr(SqlExpr),
}

impl Rhs {
    /// A single bound value.
    pub fn value<T: ToSql + Send + Sync + 'static>(value: T) -> Self {
        Self::Value(Param::new(value))
    }

    /// A list of bound values.
    pub fn list<T: ToSql + Send + Sync + 'static>(values: impl IntoIterator<Item = T>) -> Self {
        Self::List(values.into_iter().map(Param::new).collect())
    }

    /// A literal SQL expression.
    pub fn expr(raw: impl Into<String>) -> Self {
        Self::Expr(SqlExpr::new(raw))
    }
}

impl From<SqlExpr> for Rhs {
    fn from(expr: SqlExpr) -> Self {
        Self::Expr(expr)
    }
}

#[derive(Clone, Debug)]
enum PredicateKind {
    /// `column <op> $n`
    Compare { op: CmpOp, value: Param },
    /// `column IN ($n, ...)`
    InList { values: Vec<Param> },
    /// `column <op> <expr>`
    CompareExpr { op: CmpOp, expr: SqlExpr },
    /// `column IN <expr>`
    InExpr { expr: SqlExpr },
}

/// A single filter predicate with an optional preceding connective.
///
/// The connective (`AND`/`OR`) says how this predicate attaches to the one
/// before it; the WHERE clause ignores it for the first predicate.
#[derive(Clone, Debug)]
pub struct Predicate {
    column: String,
    connective: Option<LogicOp>,
    kind: PredicateKind,
}

impl Predicate {
    /// Build a predicate, dispatching on the operator and right-hand side.
    ///
    /// `In` requires a non-empty list or an expression; every other
    /// operator requires a single value or an expression. The column is
    /// validated as a bare identifier path.
    pub fn build(
        column: &str,
        op: CmpOp,
        rhs: Rhs,
        connective: Option<LogicOp>,
    ) -> SqlResult<Self> {
        ident::check(column)?;

        let kind = match (op, rhs) {
            (CmpOp::In, Rhs::List(values)) => {
                if values.is_empty() {
                    return Err(SqlError::validation(format!(
                        "IN predicate on '{}' requires a non-empty value list",
                        column
                    )));
                }
                PredicateKind::InList { values }
            }
            (CmpOp::In, Rhs::Expr(expr)) => PredicateKind::InExpr { expr },
            (CmpOp::In, Rhs::Value(_)) => {
                return Err(SqlError::validation(format!(
                    "IN predicate on '{}' requires a value list, not a single value",
                    column
                )));
            }
            (op, Rhs::Value(value)) => PredicateKind::Compare { op, value },
            (op, Rhs::Expr(expr)) => PredicateKind::CompareExpr { op, expr },
            (op, Rhs::List(_)) => {
                return Err(SqlError::validation(format!(
                    "operator '{}' on '{}' takes a single value, not a list",
                    op.as_sql(),
                    column
                )));
            }
        };

        Ok(Self {
            column: column.to_string(),
            connective,
            kind,
        })
    }

    /// The connective preceding this predicate, if any.
    pub fn connective(&self) -> Option<LogicOp> {
        self.connective
    }

    /// Render this predicate as a fragment, without its connective.
    pub fn render(&self) -> Fragment {
        let mut f = Fragment::empty();
        match &self.kind {
            PredicateKind::Compare { op, value } => {
                f.push(&self.column);
                f.push(" ");
                f.push(op.as_sql());
                f.push(" ");
                f.push_param(value.clone());
            }
            PredicateKind::InList { values } => {
                f.push(&self.column);
                f.push(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.push(", ");
                    }
                    f.push_param(value.clone());
                }
                f.push(")");
            }
            PredicateKind::CompareExpr { op, expr } => {
                f.push(&format!("{} {} {}", self.column, op.as_sql(), expr));
            }
            PredicateKind::InExpr { expr } => {
                f.push(&format!("{} IN {}", self.column, expr));
            }
        }
        f
    }
}
