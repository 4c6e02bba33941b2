// src/db.rs

use std::str::FromStr;

use sqlx::{
    SqlitePool,
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};

/// Schema migrations embedded at compile time.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Opens a pool against `database_url`, creating the database file if needed.
///
/// Foreign keys are enforced by the connect options, which the cascading
/// deletes in the schema rely on.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        // An in-memory database lives only as long as its connection.
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

/// Connects and brings the schema up to date.
pub async fn connect_and_migrate(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let pool = connect(database_url, max_connections).await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}
