//! Schema model: columns, keys, tables, and databases, plus the DDL and
//! INSERT statements generated from them.

use crate::error::{SqlError, SqlResult};
use crate::fragment::{Fragment, Param, SqlExpr};
use crate::guard;
use crate::ident;
use crate::types::{ColumnType, Constraint, RefAction};
use std::collections::HashMap;
use tokio_postgres::types::ToSql;

/// A value destined for an INSERT: either a bound parameter or a literal
/// SQL expression spliced into the statement text.
#[derive(Clone, Debug)]
pub enum Value {
    Param(Param),
    Expr(SqlExpr),
}

impl Value {
    /// A bound parameter value.
    pub fn of<T: ToSql + Send + Sync + 'static>(value: T) -> Self {
        Self::Param(Param::new(value))
    }

    /// A literal SQL expression, such as `NOW()`.
    pub fn expr(raw: impl Into<String>) -> Self {
        Self::Expr(SqlExpr::new(raw))
    }
}

impl From<SqlExpr> for Value {
    fn from(expr: SqlExpr) -> Self {
        Self::Expr(expr)
    }
}

/// A column definition: name, type, and zero or more constraints.
#[derive(Clone, Debug)]
pub struct Column {
    name: String,
    column_type: ColumnType,
    constraints: Vec<Constraint>,
}

impl Column {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.trim().to_string(),
            column_type,
            constraints: Vec::new(),
        }
    }

    /// Attach a constraint, keeping declaration order.
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    pub fn has_constraint(&self, constraint: &Constraint) -> bool {
        self.constraints.contains(constraint)
    }

    /// Render the column definition line for CREATE TABLE.
    pub fn create_fragment(&self) -> SqlResult<Fragment> {
        let mut text = format!("{} {}", ident::quote(&self.name)?, self.column_type.as_sql());
        for constraint in &self.constraints {
            text.push(' ');
            text.push_str(&constraint.as_sql());
        }
        Ok(Fragment::raw(text))
    }
}

/// A table-level primary key over one or more columns.
#[derive(Clone, Debug)]
pub struct PrimaryKey {
    columns: Vec<String>,
}

impl PrimaryKey {
    /// A single-column primary key.
    pub fn single(column: &str) -> SqlResult<Self> {
        Self::build(vec![column.to_string()], 1)
    }

    /// A composite primary key over two or more columns.
    pub fn composite(columns: impl IntoIterator<Item = impl Into<String>>) -> SqlResult<Self> {
        Self::build(columns.into_iter().map(Into::into).collect(), 2)
    }

    fn build(columns: Vec<String>, minimum: usize) -> SqlResult<Self> {
        let columns: Vec<String> = columns.iter().map(|c| c.trim().to_string()).collect();
        if columns.len() < minimum || columns.iter().any(String::is_empty) {
            return Err(SqlError::validation(
                "primary key requires non-empty column names",
            ));
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn create_fragment(&self) -> SqlResult<Fragment> {
        let quoted = self
            .columns
            .iter()
            .map(|c| ident::quote(c))
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(Fragment::raw(format!("PRIMARY KEY ({})", quoted.join(", "))))
    }
}

/// A foreign key from local columns to a referenced table's columns, with
/// optional referential actions.
#[derive(Clone, Debug)]
pub struct ForeignKey {
    local_columns: Vec<String>,
    referenced_table: String,
    referenced_columns: Vec<String>,
    on_delete: Option<RefAction>,
    on_update: Option<RefAction>,
}

impl ForeignKey {
    /// A single-column foreign key.
    pub fn single(local: &str, referenced_table: &str, referenced: &str) -> SqlResult<Self> {
        Self::build(
            vec![local.to_string()],
            referenced_table,
            vec![referenced.to_string()],
            1,
        )
    }

    /// A composite foreign key. Both column lists need two or more entries
    /// and equal length.
    pub fn composite(
        local: impl IntoIterator<Item = impl Into<String>>,
        referenced_table: &str,
        referenced: impl IntoIterator<Item = impl Into<String>>,
    ) -> SqlResult<Self> {
        Self::build(
            local.into_iter().map(Into::into).collect(),
            referenced_table,
            referenced.into_iter().map(Into::into).collect(),
            2,
        )
    }

    fn build(
        local: Vec<String>,
        referenced_table: &str,
        referenced: Vec<String>,
        minimum: usize,
    ) -> SqlResult<Self> {
        let local: Vec<String> = local.iter().map(|c| c.trim().to_string()).collect();
        let referenced: Vec<String> = referenced.iter().map(|c| c.trim().to_string()).collect();
        let referenced_table = referenced_table.trim();

        if referenced_table.is_empty() {
            return Err(SqlError::validation(
                "foreign key requires a referenced table name",
            ));
        }
        if local.len() < minimum
            || local.len() != referenced.len()
            || local.iter().chain(&referenced).any(|c| c.is_empty())
        {
            return Err(SqlError::validation(
                "foreign key requires matching non-empty column lists",
            ));
        }

        Ok(Self {
            local_columns: local,
            referenced_table: referenced_table.to_string(),
            referenced_columns: referenced,
            on_delete: None,
            on_update: None,
        })
    }

    pub fn on_delete(mut self, action: RefAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    pub fn on_update(mut self, action: RefAction) -> Self {
        self.on_update = Some(action);
        self
    }

    pub fn local_columns(&self) -> &[String] {
        &self.local_columns
    }

    pub fn referenced_table(&self) -> &str {
        &self.referenced_table
    }

    pub fn referenced_columns(&self) -> &[String] {
        &self.referenced_columns
    }

    fn create_fragment(&self) -> SqlResult<Fragment> {
        let local = self
            .local_columns
            .iter()
            .map(|c| ident::quote(c))
            .collect::<SqlResult<Vec<_>>>()?;
        let referenced = self
            .referenced_columns
            .iter()
            .map(|c| ident::quote(c))
            .collect::<SqlResult<Vec<_>>>()?;

        let mut text = format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            local.join(", "),
            ident::quote(&self.referenced_table)?,
            referenced.join(", ")
        );
        if let Some(action) = self.on_delete {
            text.push_str(&format!(" ON DELETE {}", action.as_sql()));
        }
        if let Some(action) = self.on_update {
            text.push_str(&format!(" ON UPDATE {}", action.as_sql()));
        }
        Ok(Fragment::raw(text))
    }
}

/// A table definition: columns plus optional table-level keys.
#[derive(Clone, Debug)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    primary_key: Option<PrimaryKey>,
    foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Define a table. Column names must be non-empty and unique.
    pub fn new(name: &str, columns: Vec<Column>) -> SqlResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SqlError::validation("table name cannot be empty"));
        }

        let mut seen: Vec<&str> = Vec::with_capacity(columns.len());
        for column in &columns {
            if column.name().is_empty() {
                return Err(SqlError::validation(format!(
                    "table '{}' has a column with an empty name",
                    name
                )));
            }
            if seen.contains(&column.name()) {
                return Err(SqlError::validation(format!(
                    "table '{}' declares column '{}' twice",
                    name,
                    column.name()
                )));
            }
            seen.push(column.name());
        }

        Ok(Self {
            name: name.to_string(),
            columns,
            primary_key: None,
            foreign_keys: Vec::new(),
        })
    }

    /// Attach a table-level primary key. Its columns must exist, and no
    /// column may also carry a per-column PRIMARY KEY constraint.
    pub fn primary_key(mut self, pk: PrimaryKey) -> SqlResult<Self> {
        for column in pk.columns() {
            if !self.has_column(column) {
                return Err(SqlError::validation(format!(
                    "primary key column '{}' does not exist in table '{}'",
                    column, self.name
                )));
            }
        }
        if self
            .columns
            .iter()
            .any(|c| c.has_constraint(&Constraint::PrimaryKey))
        {
            return Err(SqlError::validation(format!(
                "table '{}' mixes a table-level primary key with a per-column PRIMARY KEY constraint",
                self.name
            )));
        }
        self.primary_key = Some(pk);
        Ok(self)
    }

    /// Attach a foreign key. Its local columns must exist.
    pub fn foreign_key(mut self, fk: ForeignKey) -> SqlResult<Self> {
        for column in fk.local_columns() {
            if !self.has_column(column) {
                return Err(SqlError::validation(format!(
                    "foreign key column '{}' does not exist in table '{}'",
                    column, self.name
                )));
            }
        }
        self.foreign_keys.push(fk);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name() == name)
    }

    /// Render the CREATE TABLE statement: column definitions first, then
    /// foreign keys, then the table-level primary key.
    pub fn create_fragment(&self) -> SqlResult<Fragment> {
        let mut definitions = Vec::new();
        for column in &self.columns {
            definitions.push(column.create_fragment()?);
        }
        for fk in &self.foreign_keys {
            definitions.push(fk.create_fragment()?);
        }
        if let Some(pk) = &self.primary_key {
            definitions.push(pk.create_fragment()?);
        }

        let mut f = Fragment::empty();
        f.push(&format!("CREATE TABLE {} (\n    ", ident::quote(&self.name)?));
        f.append(Fragment::join_all(definitions, ",\n    "));
        f.push("\n)");
        Ok(f)
    }

    /// Build a single-row INSERT. Expression values are spliced verbatim,
    /// everything else is bound.
    pub fn insert(&self, row: Vec<(&str, Value)>) -> SqlResult<Fragment> {
        if row.is_empty() {
            return Err(SqlError::validation(format!(
                "insert into '{}' requires at least one column",
                self.name
            )));
        }

        let mut columns = Vec::with_capacity(row.len());
        for (column, _) in &row {
            if !self.has_column(column) {
                return Err(SqlError::validation(format!(
                    "column '{}' does not exist in table '{}'",
                    column, self.name
                )));
            }
            columns.push(ident::quote(column)?);
        }

        let mut f = Fragment::empty();
        f.push(&format!(
            "INSERT INTO {} ({}) VALUES (",
            ident::quote(&self.name)?,
            columns.join(", ")
        ));
        for (i, (_, value)) in row.iter().enumerate() {
            if i > 0 {
                f.push(", ");
            }
            match value {
                Value::Param(param) => {
                    f.push_param(param.clone());
                }
                Value::Expr(expr) => {
                    f.push(expr.as_str());
                }
            }
        }
        f.push(")");
        Ok(f)
    }

    /// Prepare a multi-row insert set. Every row must supply the same
    /// columns as the first row; expression values are not allowed, since
    /// the rows all bind against one prepared template.
    pub fn insert_set(&self, rows: Vec<Vec<(&str, Value)>>) -> SqlResult<InsertSet> {
        let Some(first) = rows.first() else {
            return Err(SqlError::validation(format!(
                "insert set for '{}' requires at least one row",
                self.name
            )));
        };

        let columns: Vec<String> = first.iter().map(|(c, _)| c.to_string()).collect();
        for column in &columns {
            if !self.has_column(column) {
                return Err(SqlError::validation(format!(
                    "column '{}' does not exist in table '{}'",
                    column, self.name
                )));
            }
        }

        let mut data = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(SqlError::validation(format!(
                    "insert set row {} has {} values, expected {}",
                    index,
                    row.len(),
                    columns.len()
                )));
            }
            let mut params = Vec::with_capacity(columns.len());
            for column in &columns {
                let value = row
                    .iter()
                    .find(|(c, _)| *c == column.as_str())
                    .map(|(_, v)| v)
                    .ok_or_else(|| {
                        SqlError::validation(format!(
                            "insert set row {} is missing column '{}'",
                            index, column
                        ))
                    })?;
                match value {
                    Value::Param(param) => params.push(param.clone()),
                    Value::Expr(_) => {
                        return Err(SqlError::validation(format!(
                            "insert set row {} uses a literal expression; bulk inserts bind all values",
                            index
                        )));
                    }
                }
            }
            data.push(params);
        }

        InsertSet::new(&self.name, columns, data)
    }
}

/// A validated multi-row insert: one statement template plus the rows to
/// bind against it.
#[derive(Clone, Debug)]
pub struct InsertSet {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Param>>,
}

impl InsertSet {
    /// Build an insert set directly. The table and column names must be
    /// non-empty and every row must match the column arity.
    pub fn new(table: &str, columns: Vec<String>, rows: Vec<Vec<Param>>) -> SqlResult<Self> {
        let table = table.trim();
        if table.is_empty() {
            return Err(SqlError::validation("insert set requires a table name"));
        }
        if columns.is_empty() || columns.iter().any(|c| c.trim().is_empty()) {
            return Err(SqlError::validation(
                "insert set requires non-empty column names",
            ));
        }
        if rows.is_empty() {
            return Err(SqlError::validation("insert set requires at least one row"));
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != columns.len()) {
            return Err(SqlError::validation(format!(
                "insert set row {} has {} values, expected {}",
                bad,
                rows[bad].len(),
                columns.len()
            )));
        }

        Ok(Self {
            table: table.to_string(),
            columns,
            rows,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Param>] {
        &self.rows
    }

    /// Number of rows; always at least one, empty sets are rejected at
    /// construction.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The INSERT template every row binds against.
    pub fn template(&self) -> SqlResult<String> {
        let columns = self
            .columns
            .iter()
            .map(|c| ident::quote(c))
            .collect::<SqlResult<Vec<_>>>()?;
        let placeholders = (1..=self.columns.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            ident::quote(&self.table)?,
            columns.join(", "),
            placeholders
        ))
    }
}

/// A named collection of tables. Generates the full CREATE TABLE script
/// with tables ordered so referenced tables come first.
#[derive(Clone, Debug)]
pub struct Database {
    name: String,
    tables: Vec<Table>,
}

impl Database {
    pub fn new(name: &str) -> SqlResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SqlError::validation("database name cannot be empty"));
        }
        Ok(Self {
            name: name.to_string(),
            tables: Vec::new(),
        })
    }

    /// Register a table. Table names must be unique within the database.
    pub fn add_table(&mut self, table: Table) -> SqlResult<()> {
        if self.tables.iter().any(|t| t.name() == table.name()) {
            return Err(SqlError::validation(format!(
                "database '{}' already has a table named '{}'",
                self.name,
                table.name()
            )));
        }
        tracing::debug!(database = %self.name, table = %table.name(), "registered table");
        self.tables.push(table);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name() == name)
    }

    /// Render the CREATE TABLE script for all tables, dependency-ordered,
    /// statements separated by `;` and the script `;`-terminated.
    pub fn create_all_fragment(&self) -> SqlResult<Fragment> {
        if self.tables.is_empty() {
            return Ok(Fragment::empty());
        }

        let mut statements = Vec::new();
        for table in self.creation_order()? {
            statements.push(table.create_fragment()?);
        }
        let mut script = Fragment::join_all(statements, ";\n\n");
        script.push(";");
        guard::validate(&script)?;
        Ok(script)
    }

    /// Topological order over the foreign-key graph: a table comes after
    /// every table it references. Insertion order breaks ties;
    /// self-references are ignored. A reference cycle is an error.
    fn creation_order(&self) -> SqlResult<Vec<&Table>> {
        let count = self.tables.len();
        let index: HashMap<&str, usize> = self
            .tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name(), i))
            .collect();

        let mut in_degree = vec![0usize; count];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (i, table) in self.tables.iter().enumerate() {
            for fk in table.foreign_keys() {
                if let Some(&target) = index.get(fk.referenced_table()) {
                    if target != i {
                        in_degree[i] += 1;
                        dependents[target].push(i);
                    }
                }
            }
        }

        let mut ready: Vec<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(count);
        while !ready.is_empty() {
            // smallest index first keeps the order stable
            let i = ready.remove(0);
            order.push(&self.tables[i]);
            for &dependent in &dependents[i] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    let pos = ready.partition_point(|&r| r < dependent);
                    ready.insert(pos, dependent);
                }
            }
        }

        if order.len() != count {
            let stuck: Vec<&str> = self
                .tables
                .iter()
                .enumerate()
                .filter(|(i, _)| in_degree[*i] > 0)
                .map(|(_, t)| t.name())
                .collect();
            return Err(SqlError::validation(format!(
                "circular foreign-key reference between tables: {}",
                stuck.join(", ")
            )));
        }
        Ok(order)
    }
}
