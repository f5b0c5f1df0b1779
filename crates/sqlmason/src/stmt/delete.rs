//! DELETE statement builder.

use crate::clause::WhereClause;
use crate::client::SqlExecutor;
use crate::error::{SqlError, SqlResult};
use crate::fragment::Fragment;
use crate::ident;
use crate::predicate::Rhs;
use crate::schema::Table;
use crate::types::{CmpOp, LogicOp};
use tokio_postgres::types::ToSql;

/// Fluent DELETE builder over a table definition.
///
/// Rendering fails without at least one WHERE predicate; an unfiltered
/// DELETE is never emitted.
#[derive(Clone, Debug)]
pub struct DeleteBuilder<'a> {
    table: &'a Table,
    where_clause: WhereClause,
}

impl<'a> DeleteBuilder<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self {
            table,
            where_clause: WhereClause::new(),
        }
    }

    /// Add a predicate joined by AND.
    pub fn filter(mut self, column: &str, op: CmpOp, rhs: Rhs) -> SqlResult<Self> {
        self.where_clause.add(column, op, rhs, LogicOp::And)?;
        Ok(self)
    }

    /// Add a predicate joined by OR.
    pub fn or_filter(mut self, column: &str, op: CmpOp, rhs: Rhs) -> SqlResult<Self> {
        self.where_clause.add(column, op, rhs, LogicOp::Or)?;
        Ok(self)
    }

    // ==================== Filter sugar ====================

    pub fn eq<T: ToSql + Send + Sync + 'static>(self, column: &str, value: T) -> SqlResult<Self> {
        self.filter(column, CmpOp::Eq, Rhs::value(value))
    }

    pub fn ne<T: ToSql + Send + Sync + 'static>(self, column: &str, value: T) -> SqlResult<Self> {
        self.filter(column, CmpOp::Ne, Rhs::value(value))
    }

    pub fn gt<T: ToSql + Send + Sync + 'static>(self, column: &str, value: T) -> SqlResult<Self> {
        self.filter(column, CmpOp::Gt, Rhs::value(value))
    }

    pub fn gte<T: ToSql + Send + Sync + 'static>(self, column: &str, value: T) -> SqlResult<Self> {
        self.filter(column, CmpOp::Gte, Rhs::value(value))
    }

    pub fn lt<T: ToSql + Send + Sync + 'static>(self, column: &str, value: T) -> SqlResult<Self> {
        self.filter(column, CmpOp::Lt, Rhs::value(value))
    }

    pub fn lte<T: ToSql + Send + Sync + 'static>(self, column: &str, value: T) -> SqlResult<Self> {
        self.filter(column, CmpOp::Lte, Rhs::value(value))
    }

    pub fn like(self, column: &str, pattern: &str) -> SqlResult<Self> {
        self.filter(column, CmpOp::Like, Rhs::value(pattern.to_string()))
    }

    pub fn in_list<T: ToSql + Send + Sync + 'static>(
        self,
        column: &str,
        values: Vec<T>,
    ) -> SqlResult<Self> {
        self.filter(column, CmpOp::In, Rhs::list(values))
    }

    /// Compare a column against a literal SQL expression.
    pub fn filter_expr(self, column: &str, op: CmpOp, raw: impl Into<String>) -> SqlResult<Self> {
        self.filter(column, op, Rhs::expr(raw))
    }

    /// Render the statement.
    pub fn render(&self) -> SqlResult<Fragment> {
        if self.where_clause.is_empty() {
            return Err(SqlError::validation(format!(
                "DELETE on '{}' without a WHERE clause is not allowed",
                self.table.name()
            )));
        }

        Ok(Fragment::join_all(
            [
                Fragment::raw(format!("DELETE FROM {}", ident::quote(self.table.name())?)),
                self.where_clause.fragment(),
            ],
            " ",
        ))
    }

    /// Render the statement text, for logging and debugging.
    pub fn to_sql(&self) -> SqlResult<String> {
        Ok(self.render()?.to_sql())
    }

    /// Render and execute, returning the affected row count.
    pub async fn execute(&self, conn: &impl SqlExecutor) -> SqlResult<u64> {
        self.render()?.execute(conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;
    use crate::stmt::delete;
    use crate::types::ColumnType;

    fn users() -> Table {
        Table::new(
            "users",
            vec![
                Column::new("id", ColumnType::Int),
                Column::new("status", ColumnType::Text),
            ],
        )
        .unwrap()
    }

    #[test]
    fn renders_delete_with_where() {
        let users = users();
        let f = delete(&users).eq("id", 7).unwrap().render().unwrap();
        assert_eq!(f.to_sql(), "DELETE FROM \"users\" WHERE id = $1");
        assert_eq!(f.params_ref().len(), 1);
    }

    #[test]
    fn predicates_chain_with_connectives() {
        let users = users();
        let f = delete(&users)
            .eq("status", "stale")
            .unwrap()
            .or_filter("status", CmpOp::Eq, Rhs::value("orphaned"))
            .unwrap()
            .render()
            .unwrap();

        assert_eq!(
            f.to_sql(),
            "DELETE FROM \"users\" WHERE status = $1 OR status = $2"
        );
    }

    #[test]
    fn refuses_to_render_without_where() {
        let users = users();
        let err = delete(&users).render().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn in_list_filters_bind_every_value() {
        let users = users();
        let f = delete(&users).in_list("id", vec![1, 2]).unwrap().render().unwrap();
        assert_eq!(f.to_sql(), "DELETE FROM \"users\" WHERE id IN ($1, $2)");
        assert_eq!(f.params_ref().len(), 2);
    }
}
