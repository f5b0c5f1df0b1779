//! UPDATE statement builder.

use crate::clause::{SetClause, WhereClause};
use crate::client::SqlExecutor;
use crate::error::{SqlError, SqlResult};
use crate::fragment::Fragment;
use crate::ident;
use crate::predicate::Rhs;
use crate::schema::Table;
use crate::types::{CmpOp, LogicOp};
use tokio_postgres::types::ToSql;

/// Fluent UPDATE builder over a table definition.
///
/// Rendering fails without at least one SET assignment and at least one
/// WHERE predicate; an unfiltered UPDATE is never emitted.
#[derive(Clone, Debug)]
pub struct UpdateBuilder<'a> {
    table: &'a Table,
    set: SetClause,
    where_clause: WhereClause,
}

impl<'a> UpdateBuilder<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self {
            table,
            set: SetClause::new(),
            where_clause: WhereClause::new(),
        }
    }

    /// Assign a value to a column. Assigning the same column again
    /// replaces the earlier value.
    pub fn set<T: ToSql + Send + Sync + 'static>(
        mut self,
        column: &str,
        value: T,
    ) -> SqlResult<Self> {
        self.set.assign(column, value)?;
        Ok(self)
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
        if self.set.is_empty() {
            return Err(SqlError::validation(format!(
                "UPDATE on '{}' requires at least one SET assignment",
                self.table.name()
            )));
        }
        if self.where_clause.is_empty() {
            return Err(SqlError::validation(format!(
                "UPDATE on '{}' without a WHERE clause is not allowed",
                self.table.name()
            )));
        }

        Ok(Fragment::join_all(
            [
                Fragment::raw(format!("UPDATE {}", ident::quote(self.table.name())?)),
                self.set.fragment(),
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
    use crate::stmt::update;
    use crate::types::ColumnType;

    fn users() -> Table {
        Table::new(
            "users",
            vec![
                Column::new("id", ColumnType::Int),
                Column::new("name", ColumnType::Text),
                Column::new("age", ColumnType::Int),
            ],
        )
        .unwrap()
    }

    #[test]
    fn renders_set_then_where() {
        let users = users();
        let f = update(&users)
            .set("name", "ana")
            .unwrap()
            .set("age", 31)
            .unwrap()
            .eq("id", 7)
            .unwrap()
            .render()
            .unwrap();

        assert_eq!(
            f.to_sql(),
            "UPDATE \"users\" SET name = $1, age = $2 WHERE id = $3"
        );
        assert_eq!(f.params_ref().len(), 3);
    }

    #[test]
    fn reassigning_a_column_keeps_one_binding() {
        let users = users();
        let f = update(&users)
            .set("name", "ana")
            .unwrap()
            .set("name", "bea")
            .unwrap()
            .eq("id", 7)
            .unwrap()
            .render()
            .unwrap();

        assert_eq!(f.to_sql(), "UPDATE \"users\" SET name = $1 WHERE id = $2");
        assert_eq!(f.params_ref().len(), 2);
    }

    #[test]
    fn refuses_to_render_without_where() {
        let users = users();
        let err = update(&users).set("name", "x").unwrap().render().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn refuses_to_render_without_set() {
        let users = users();
        let err = update(&users).eq("id", 1).unwrap().render().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn rejects_malformed_set_column() {
        let users = users();
        assert!(update(&users).set("name; --", "x").is_err());
    }
}
