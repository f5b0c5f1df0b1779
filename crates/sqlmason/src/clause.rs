//! Clause managers: WHERE, JOIN, ORDER BY, LIMIT, and SET.
//!
//! Each manager accumulates entries and renders a fragment on demand; an
//! empty manager renders an empty fragment, which the statement builders
//! drop when assembling the final text.

use crate::error::{SqlError, SqlResult};
use crate::fragment::{Fragment, Param};
use crate::ident;
use crate::predicate::{Predicate, Rhs};
use crate::schema::Table;
use crate::types::{CmpOp, JoinKind, LogicOp, SortDir};
use tokio_postgres::types::ToSql;

/// Accumulates predicates and renders `WHERE p1 AND p2 OR p3 ...`.
///
/// Each predicate after the first is attached by its own connective,
/// defaulting to `AND`. The first predicate's connective is ignored.
#[derive(Clone, Debug, Default)]
pub struct WhereClause {
    predicates: Vec<Predicate>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate joined to the previous one by `connective`.
    pub fn add(
        &mut self,
        column: &str,
        op: CmpOp,
        rhs: Rhs,
        connective: LogicOp,
    ) -> SqlResult<()> {
        let predicate = Predicate::build(column, op, rhs, Some(connective))?;
        self.predicates.push(predicate);
        Ok(())
    }

    /// Add an already-built predicate.
    pub fn add_predicate(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Render the clause, or an empty fragment when no predicates exist.
    pub fn fragment(&self) -> Fragment {
        if self.predicates.is_empty() {
            return Fragment::empty();
        }

        let mut f = Fragment::raw("WHERE");
        for (i, predicate) in self.predicates.iter().enumerate() {
            f.push(" ");
            if i > 0 {
                f.push(predicate.connective().unwrap_or(LogicOp::And).as_sql());
                f.push(" ");
            }
            f.append(predicate.render());
        }
        f
    }
}

/// Accumulates JOIN entries inferred from declared foreign keys.
#[derive(Clone, Debug, Default)]
pub struct JoinClause {
    joins: Vec<Fragment>,
}

impl JoinClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a join between `base` and `other`, inferring the ON condition
    /// from foreign keys declared on either side. Fails when no foreign
    /// key relates the two tables.
    pub fn add(&mut self, base: &Table, other: &Table, kind: JoinKind) -> SqlResult<()> {
        let mut pairs = Vec::new();
        collect_on_pairs(base, other, &mut pairs)?;
        collect_on_pairs(other, base, &mut pairs)?;

        if pairs.is_empty() {
            return Err(SqlError::validation(format!(
                "no foreign key relationship between '{}' and '{}'",
                base.name(),
                other.name()
            )));
        }

        self.joins.push(Fragment::raw(format!(
            "{} {} ON {}",
            kind.as_sql(),
            ident::quote(other.name())?,
            pairs.join(" AND ")
        )));
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Render all joins in insertion order, space-separated.
    pub fn fragment(&self) -> Fragment {
        Fragment::join_all(self.joins.iter().cloned(), " ")
    }
}

/// Collect `owner.local = referenced.remote` pairs for every foreign key
/// on `owner` that points at `referenced`.
fn collect_on_pairs(owner: &Table, referenced: &Table, pairs: &mut Vec<String>) -> SqlResult<()> {
    let owner_name = ident::quote(owner.name())?;
    let referenced_name = ident::quote(referenced.name())?;

    for fk in owner.foreign_keys() {
        if fk.referenced_table() != referenced.name() {
            continue;
        }
        for (local, remote) in fk.local_columns().iter().zip(fk.referenced_columns()) {
            pairs.push(format!(
                "{}.{} = {}.{}",
                owner_name,
                ident::quote(local)?,
                referenced_name,
                ident::quote(remote)?
            ));
        }
    }
    Ok(())
}

/// Accumulates ORDER BY items in insertion order.
#[derive(Clone, Debug, Default)]
pub struct OrderByClause {
    items: Vec<(String, SortDir)>,
}

impl OrderByClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sort item. The column is validated as a bare identifier path.
    pub fn add(&mut self, column: &str, direction: SortDir) -> SqlResult<()> {
        ident::check(column)?;
        self.items.push((column.to_string(), direction));
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn fragment(&self) -> Fragment {
        if self.items.is_empty() {
            return Fragment::empty();
        }
        let rendered = self
            .items
            .iter()
            .map(|(column, direction)| format!("{} {}", column, direction.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        Fragment::raw(format!("ORDER BY {}", rendered))
    }
}

/// Holds an optional row limit, rendered as a bound parameter.
#[derive(Clone, Debug, Default)]
pub struct LimitClause {
    limit: Option<i64>,
}

impl LimitClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limit. Must be a positive integer; setting again replaces
    /// the previous value.
    pub fn set(&mut self, n: i64) -> SqlResult<()> {
        if n < 1 {
            return Err(SqlError::validation(format!(
                "LIMIT must be a positive integer, got {}",
                n
            )));
        }
        self.limit = Some(n);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.limit.is_none()
    }

    pub fn fragment(&self) -> Fragment {
        match self.limit {
            Some(n) => {
                let mut f = Fragment::raw("LIMIT");
                f.push(" ").push_bind(n);
                f
            }
            None => Fragment::empty(),
        }
    }
}

/// Accumulates SET assignments for UPDATE statements.
///
/// Assigning the same column twice replaces the earlier value in place,
/// keeping the column's original position.
#[derive(Clone, Debug, Default)]
pub struct SetClause {
    entries: Vec<(String, Param)>,
}

impl SetClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a value to a column.
    pub fn assign<T>(&mut self, column: &str, value: T) -> SqlResult<()>
    where
        T: ToSql + Send + Sync + 'static,
    {
        self.assign_param(column, Param::new(value))
    }

    /// Assign a pre-wrapped parameter to a column.
    pub fn assign_param(&mut self, column: &str, value: Param) -> SqlResult<()> {
        ident::check(column)?;
        match self.entries.iter_mut().find(|(name, _)| name == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column.to_string(), value)),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fragment(&self) -> Fragment {
        if self.entries.is_empty() {
            return Fragment::empty();
        }
        let mut f = Fragment::raw("SET");
        for (i, (column, value)) in self.entries.iter().enumerate() {
            f.push(if i > 0 { ", " } else { " " });
            f.push(column);
            f.push(" = ");
            f.push_param(value.clone());
        }
        f
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ForeignKey, Table};
    use crate::types::ColumnType;

    fn users() -> Table {
        Table::new(
            "users",
            vec![
                Column::new("id", ColumnType::Int),
                Column::new("name", ColumnType::Text),
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
    fn where_joins_predicates_with_their_connectives() {
        let mut w = WhereClause::new();
        w.add("a", CmpOp::Eq, Rhs::value(1), LogicOp::And).unwrap();
        w.add("b", CmpOp::Gt, Rhs::value(2), LogicOp::And).unwrap();
        w.add("c", CmpOp::Lt, Rhs::value(3), LogicOp::Or).unwrap();

        let f = w.fragment();
        assert_eq!(f.to_sql(), "WHERE a = $1 AND b > $2 OR c < $3");
        assert_eq!(f.params_ref().len(), 3);
    }

    #[test]
    fn where_ignores_first_connective() {
        let mut w = WhereClause::new();
        w.add("a", CmpOp::Eq, Rhs::value(1), LogicOp::Or).unwrap();
        assert_eq!(w.fragment().to_sql(), "WHERE a = $1");
    }

    #[test]
    fn empty_where_renders_nothing() {
        assert!(WhereClause::new().fragment().is_empty());
    }

    #[test]
    fn join_infers_on_condition_from_foreign_key() {
        let users = users();
        let orders = orders();
        let mut j = JoinClause::new();
        j.add(&orders, &users, JoinKind::Inner).unwrap();

        assert_eq!(
            j.fragment().to_sql(),
            "INNER JOIN \"users\" ON \"orders\".\"user_id\" = \"users\".\"id\""
        );
    }

    #[test]
    fn join_works_from_either_side() {
        let users = users();
        let orders = orders();
        let mut j = JoinClause::new();
        j.add(&users, &orders, JoinKind::Left).unwrap();

        assert_eq!(
            j.fragment().to_sql(),
            "LEFT JOIN \"orders\" ON \"orders\".\"user_id\" = \"users\".\"id\""
        );
    }

    #[test]
    fn join_fails_without_relationship() {
        let users = users();
        let other = Table::new("tags", vec![Column::new("id", ColumnType::Int)]).unwrap();
        let mut j = JoinClause::new();
        assert!(j.add(&users, &other, JoinKind::Inner).is_err());
    }

    #[test]
    fn order_by_renders_items_in_insertion_order() {
        let mut o = OrderByClause::new();
        o.add("name", SortDir::Asc).unwrap();
        o.add("created_at", SortDir::Desc).unwrap();
        assert_eq!(o.fragment().to_sql(), "ORDER BY name ASC, created_at DESC");
    }

    #[test]
    fn order_by_rejects_malformed_columns() {
        let mut o = OrderByClause::new();
        assert!(o.add("name; --", SortDir::Asc).is_err());
    }

    #[test]
    fn limit_binds_its_value() {
        let mut l = LimitClause::new();
        l.set(10).unwrap();
        let f = l.fragment();
        assert_eq!(f.to_sql(), "LIMIT $1");
        assert_eq!(f.params_ref().len(), 1);
    }

    #[test]
    fn limit_rejects_non_positive_values() {
        let mut l = LimitClause::new();
        assert!(l.set(0).is_err());
        assert!(l.set(-5).is_err());
    }

    #[test]
    fn set_renders_assignments_and_overwrites_in_place() {
        let mut s = SetClause::new();
        s.assign("name", "ana").unwrap();
        s.assign("age", 30).unwrap();
        s.assign("name", "bea").unwrap();

        let f = s.fragment();
        assert_eq!(f.to_sql(), "SET name = $1, age = $2");
        assert_eq!(f.params_ref().len(), 2);
    }
}
