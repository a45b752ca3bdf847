//! Transaction helper macro.
//!
//! Builders and the CRUD façade accept any [`GenericClient`](crate::GenericClient),
//! so the same calls run unchanged inside a transaction.
//!
//! # Example
//!
//! ```ignore
//! let mut client = ctx.client().await?;
//! pgcrud::transaction!(&mut client, tx, {
//!     users.create(&tx, RowData::new().with("name", "alice")).await?;
//!     audit.create(&tx, RowData::new().with("action", "signup")).await?;
//!     Ok(())
//! })?;
//! ```

/// Runs the given block inside a database transaction.
///
/// - Begins a transaction via `$client.transaction().await`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `pgcrud::OrmResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        let $tx = ($client)
            .transaction()
            .await
            .map_err($crate::OrmError::from_db_error)?;

        let __pgcrud_tx_body_result = async { $body }.await;
        match __pgcrud_tx_body_result {
            Ok(value) => {
                $tx.commit()
                    .await
                    .map_err($crate::OrmError::from_db_error)?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::OrmError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}
