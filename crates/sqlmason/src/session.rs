//! Execution session: a scoped connection that runs generated statements.

use crate::error::{SqlError, SqlResult};
use crate::fragment::Fragment;
use crate::guard;
use crate::ident;
use crate::schema::InsertSet;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Config, NoTls, Row};

/// A live database session owning one connection.
///
/// The driver's connection future runs on a spawned task; the session
/// holds the client half. Statements built elsewhere in the crate execute
/// here, with the rendered SQL scanned by [`guard`] first.
pub struct Session {
    config: Config,
    client: tokio_postgres::Client,
}

impl Session {
    /// Connect using a prepared [`Config`].
    pub async fn connect(config: Config) -> SqlResult<Self> {
        let client = spawn_connection(&config).await?;
        Ok(Self { config, client })
    }

    /// Connect using a `key=value` connection string.
    pub async fn connect_str(params: &str) -> SqlResult<Self> {
        let config: Config = params
            .parse()
            .map_err(|e: tokio_postgres::Error| SqlError::Connection(e.to_string()))?;
        Self::connect(config).await
    }

    /// The underlying client, for direct driver access.
    pub fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }

    /// Mutable client access, for direct driver use.
    pub fn client_mut(&mut self) -> &mut tokio_postgres::Client {
        &mut self.client
    }

    /// Begin a transaction on this session's connection.
    ///
    /// Returns the raw driver error so [`crate::transaction!`] can wrap a
    /// `Session` and a bare client the same way.
    pub async fn transaction(
        &mut self,
    ) -> Result<tokio_postgres::Transaction<'_>, tokio_postgres::Error> {
        self.client.transaction().await
    }

    /// Drop and recreate a database, then make it this session's default.
    ///
    /// Postgres cannot switch databases on a live connection, so the
    /// session reconnects with the new database name.
    pub async fn prepare_clean_database(&mut self, name: &str) -> SqlResult<()> {
        let quoted = ident::quote(name)?;
        tracing::info!(database = name, "dropping and recreating database");

        self.client
            .batch_execute(&format!("DROP DATABASE IF EXISTS {}", quoted))
            .await
            .map_err(SqlError::from_db_error)?;
        self.client
            .batch_execute(&format!("CREATE DATABASE {}", quoted))
            .await
            .map_err(SqlError::from_db_error)?;

        let mut config = self.config.clone();
        config.dbname(name);
        self.client = spawn_connection(&config).await?;
        self.config = config;
        Ok(())
    }

    /// Run a multi-statement script, split on `;`, inside one transaction.
    ///
    /// DDL statements may commit implicitly on some servers, so a failure
    /// of the final explicit commit is logged and tolerated.
    pub async fn run_script(&mut self, script: &str) -> SqlResult<()> {
        guard::validate_text(script)?;

        let tx = self
            .client
            .transaction()
            .await
            .map_err(SqlError::from_db_error)?;
        for statement in script.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            tracing::debug!(statement, "running script statement");
            tx.batch_execute(statement)
                .await
                .map_err(SqlError::from_db_error)?;
        }
        if let Err(e) = tx.commit().await {
            tracing::warn!(error = %e, "script commit failed after execution");
        }
        Ok(())
    }

    /// Run a generated script fragment, such as a database's CREATE TABLE
    /// script.
    pub async fn run_fragment_script(&mut self, fragment: &Fragment) -> SqlResult<()> {
        self.run_script(&fragment.to_sql()).await
    }

    /// Execute a data-modifying fragment and return the affected row count.
    pub async fn modify(&self, fragment: &Fragment) -> SqlResult<u64> {
        guard::validate(fragment)?;
        tracing::debug!(sql = %fragment, "executing statement");
        fragment.execute(&self.client).await
    }

    /// Execute a prepared multi-row insert inside one transaction,
    /// binding each row against a single statement template.
    pub async fn insert_set(&mut self, set: &InsertSet) -> SqlResult<u64> {
        let template = set.template()?;
        guard::validate_text(&template)?;
        tracing::debug!(template = %template, rows = set.row_count(), "bulk insert");

        let tx = self
            .client
            .transaction()
            .await
            .map_err(SqlError::from_db_error)?;
        let statement = tx
            .prepare(&template)
            .await
            .map_err(|e| batch_error(&template, e))?;

        let mut affected = 0u64;
        for row in set.rows() {
            let params: Vec<&(dyn ToSql + Sync)> = row.iter().map(|p| p.as_sql_ref()).collect();
            affected += tx
                .execute(&statement, &params)
                .await
                .map_err(|e| batch_error(&template, e))?;
        }
        tx.commit().await.map_err(SqlError::from_db_error)?;
        Ok(affected)
    }

    /// Execute a query fragment and return all rows.
    pub async fn query(&self, fragment: &Fragment) -> SqlResult<Vec<Row>> {
        guard::validate(fragment)?;
        tracing::debug!(sql = %fragment, "executing query");
        fragment.fetch_all(&self.client).await
    }

    /// Execute a query fragment and return the first row, if any.
    /// Extra rows in the result are ignored, not an error.
    pub async fn query_one(&self, fragment: &Fragment) -> SqlResult<Option<Row>> {
        guard::validate(fragment)?;
        tracing::debug!(sql = %fragment, "executing single-row query");
        fragment.fetch_first(&self.client).await
    }
}

async fn spawn_connection(config: &Config) -> SqlResult<tokio_postgres::Client> {
    let (client, connection) = config
        .connect(NoTls)
        .await
        .map_err(|e| SqlError::Connection(e.to_string()))?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "database connection terminated");
        }
    });
    Ok(client)
}

/// Wrap a driver error with a preview of the failing insert template.
fn batch_error(template: &str, err: tokio_postgres::Error) -> SqlError {
    let preview: String = template.chars().take(120).collect();
    SqlError::BatchInsert {
        template: preview,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn script_splitting_skips_blank_statements() {
        let script = "CREATE TABLE a (x INT);\n\nCREATE TABLE b (y INT);";
        let statements: Vec<&str> = script
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        assert_eq!(
            statements,
            vec!["CREATE TABLE a (x INT)", "CREATE TABLE b (y INT)"]
        );
    }
}
