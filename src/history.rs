//! Migration log — tracks applied migration ids in a meta-table.
//!
//! The `xmigrate` table is created lazily on first use and excluded from
//! catalog dumps. Migration ids are lexicographically ordered strings
//! (timestamps), so "highest id" is a plain descending sort.

use thiserror::Error;
use tokio_postgres::Client;

/// Name of the migration-log table.
pub const LOG_TABLE: &str = "xmigrate";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("database error: {0}")]
    Db(#[from] tokio_postgres::Error),
}

/// Create the log table if it does not exist yet.
pub async fn ensure_log_table(client: &Client) -> Result<(), HistoryError> {
    let existing = client
        .query_opt(
            "select table_name from information_schema.tables \
             where table_schema = 'public' and table_name = $1",
            &[&LOG_TABLE],
        )
        .await?;

    if existing.is_none() {
        client
            .batch_execute(
                "create table xmigrate (\
                   id serial primary key, \
                   migrate_id varchar not null unique, \
                   created_at timestamp with time zone default current_timestamp\
                 )",
            )
            .await?;
    }

    Ok(())
}

/// Return the highest applied migration id, or the empty string when no
/// migration has been recorded. Creates the log table lazily.
pub async fn check_current(client: &Client) -> Result<String, HistoryError> {
    ensure_log_table(client).await?;

    let row = client
        .query_opt(
            "select migrate_id from xmigrate order by migrate_id desc limit 1",
            &[],
        )
        .await?;

    Ok(row.map(|r| r.get("migrate_id")).unwrap_or_default())
}

/// Record a migration id as applied.
pub async fn record(client: &Client, migrate_id: &str) -> Result<(), HistoryError> {
    client
        .execute(
            "insert into xmigrate (migrate_id) values ($1)",
            &[&migrate_id],
        )
        .await?;
    Ok(())
}
