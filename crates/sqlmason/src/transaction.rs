//! Transaction helper macro.
//!
//! Pass a transaction into APIs that accept [`crate::SqlExecutor`]; this
//! keeps statement execution easy to compose with or without transactions.
//!
//! # Example
//!
//! ```ignore
//! use sqlmason::{SqlResult, stmt};
//!
//! # async fn demo(session: &mut sqlmason::Session, accounts: &sqlmason::Table) -> SqlResult<()> {
//! sqlmason::transaction!(session, tx, {
//!     stmt::update(accounts)
//!         .set("balance", 0_i64)?
//!         .eq("id", 1_i64)?
//!         .execute(&tx)
//!         .await?;
//!     Ok(())
//! })?;
//! # Ok(()) }
//! ```

/// Runs the given block inside a database transaction.
///
/// - Begins a transaction via `$client.transaction().await`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`; a failed rollback is reported together with
///   the original error.
///
/// The block must evaluate to `sqlmason::SqlResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        let $tx = ($client)
            .transaction()
            .await
            .map_err($crate::SqlError::from_db_error)?;

        let __sqlmason_tx_body_result = async { $body }.await;
        match __sqlmason_tx_body_result {
            Ok(value) => {
                $tx.commit()
                    .await
                    .map_err($crate::SqlError::from_db_error)?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::SqlError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}
