//! SELECT statement builder.

use crate::clause::{JoinClause, LimitClause, OrderByClause, WhereClause};
use crate::client::SqlExecutor;
use crate::error::SqlResult;
use crate::fragment::Fragment;
use crate::ident;
use crate::schema::Table;
use crate::types::{CmpOp, JoinKind, LogicOp, SortDir};
use crate::predicate::Rhs;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Fluent SELECT builder over a table definition.
///
/// Clause order in the rendered statement is fixed: column list, FROM,
/// joins, WHERE, ORDER BY, LIMIT. With no explicit column list the
/// statement selects `"table".*`.
#[derive(Clone, Debug)]
pub struct SelectBuilder<'a> {
    table: &'a Table,
    columns: Vec<String>,
    distinct: bool,
    joins: JoinClause,
    where_clause: WhereClause,
    order_by: OrderByClause,
    limit: LimitClause,
}

impl<'a> SelectBuilder<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self {
            table,
            columns: Vec::new(),
            distinct: false,
            joins: JoinClause::new(),
            where_clause: WhereClause::new(),
            order_by: OrderByClause::new(),
            limit: LimitClause::new(),
        }
    }

    /// Select specific columns instead of `*`.
    pub fn columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Deduplicate result rows.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// INNER JOIN `other`, with the ON condition inferred from declared
    /// foreign keys.
    pub fn join(self, other: &Table) -> SqlResult<Self> {
        self.join_kind(other, JoinKind::Inner)
    }

    /// Join `other` with an explicit join flavor.
    pub fn join_kind(mut self, other: &Table, kind: JoinKind) -> SqlResult<Self> {
        self.joins.add(self.table, other, kind)?;
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

    /// Sort ascending by `column`. Repeated calls accumulate.
    pub fn order_by(mut self, column: &str) -> SqlResult<Self> {
        self.order_by.add(column, SortDir::Asc)?;
        Ok(self)
    }

    /// Sort descending by `column`.
    pub fn order_by_desc(mut self, column: &str) -> SqlResult<Self> {
        self.order_by.add(column, SortDir::Desc)?;
        Ok(self)
    }

    /// Cap the result set. The value is bound as a parameter.
    pub fn limit(mut self, n: i64) -> SqlResult<Self> {
        self.limit.set(n)?;
        Ok(self)
    }

    /// Render the statement.
    pub fn render(&self) -> SqlResult<Fragment> {
        let table_name = ident::quote(self.table.name())?;
        let head = if self.distinct {
            "SELECT DISTINCT"
        } else {
            "SELECT"
        };
        let column_list = if self.columns.is_empty() {
            format!("{}.*", table_name)
        } else {
            self.columns
                .iter()
                .map(|c| ident::quote(c))
                .collect::<SqlResult<Vec<_>>>()?
                .join(", ")
        };

        Ok(Fragment::join_all(
            [
                Fragment::raw(format!("{} {}", head, column_list)),
                Fragment::raw(format!("FROM {}", table_name)),
                self.joins.fragment(),
                self.where_clause.fragment(),
                self.order_by.fragment(),
                self.limit.fragment(),
            ],
            " ",
        ))
    }

    /// Render the statement text, for logging and debugging.
    pub fn to_sql(&self) -> SqlResult<String> {
        Ok(self.render()?.to_sql())
    }

    /// Render and fetch all rows.
    pub async fn fetch_all(&self, conn: &impl SqlExecutor) -> SqlResult<Vec<Row>> {
        self.render()?.fetch_all(conn).await
    }

    /// Render and fetch at most one row.
    pub async fn fetch_opt(&self, conn: &impl SqlExecutor) -> SqlResult<Option<Row>> {
        self.render()?.fetch_opt(conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ForeignKey};
    use crate::stmt::select;
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

    fn orders() -> Table {
        Table::new(
            "orders",
            vec![
                Column::new("id", ColumnType::Int),
                Column::new("user_id", ColumnType::Int),
            ],
        )
        .unwrap()
        .foreign_key(ForeignKey::single("user_id", "users", "id").unwrap())
        .unwrap()
    }

    #[test]
    fn bare_select_uses_star() {
        let users = users();
        let f = select(&users).render().unwrap();
        assert_eq!(f.to_sql(), "SELECT \"users\".* FROM \"users\"");
        assert_eq!(f.params_ref().len(), 0);
    }

    #[test]
    fn explicit_columns_are_quoted() {
        let users = users();
        let sql = select(&users)
            .columns(["id", "name"])
            .to_sql()
            .unwrap();
        assert_eq!(sql, "SELECT \"id\", \"name\" FROM \"users\"");
    }

    #[test]
    fn distinct_prefixes_the_column_list() {
        let users = users();
        let sql = select(&users).distinct().columns(["name"]).to_sql().unwrap();
        assert_eq!(sql, "SELECT DISTINCT \"name\" FROM \"users\"");
    }

    #[test]
    fn clauses_render_in_fixed_order() {
        let users = users();
        let orders = orders();
        let f = select(&users)
            .join(&orders)
            .unwrap()
            .gte("age", 18)
            .unwrap()
            .or_filter("name", CmpOp::Like, Rhs::value("a%"))
            .unwrap()
            .order_by_desc("age")
            .unwrap()
            .limit(10)
            .unwrap()
            .render()
            .unwrap();

        assert_eq!(
            f.to_sql(),
            "SELECT \"users\".* FROM \"users\" \
             INNER JOIN \"orders\" ON \"orders\".\"user_id\" = \"users\".\"id\" \
             WHERE age >= $1 OR name LIKE $2 \
             ORDER BY age DESC LIMIT $3"
        );
        assert_eq!(f.params_ref().len(), 3);
    }

    #[test]
    fn in_list_and_expression_filters_compose() {
        let users = users();
        let f = select(&users)
            .in_list("id", vec![1, 2, 3])
            .unwrap()
            .filter_expr("age", CmpOp::Lt, "(SELECT AVG(age) FROM users)")
            .unwrap()
            .render()
            .unwrap();

        assert_eq!(
            f.to_sql(),
            "SELECT \"users\".* FROM \"users\" \
             WHERE id IN ($1, $2, $3) AND age < (SELECT AVG(age) FROM users)"
        );
        assert_eq!(f.params_ref().len(), 3);
    }

    #[test]
    fn join_without_relationship_fails() {
        let users = users();
        let tags = Table::new("tags", vec![Column::new("id", ColumnType::Int)]).unwrap();
        assert!(select(&users).join(&tags).is_err());
    }

    #[test]
    fn limit_zero_is_rejected() {
        let users = users();
        assert!(select(&users).limit(0).is_err());
    }
}
