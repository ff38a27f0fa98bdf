//! Database configuration for the `SQLite` record store.
//!
//! Handles the connection and creates the `records` table from the entity
//! definition with `Schema::create_table_from_entity`, so the schema always
//! matches the Rust struct without hand-written SQL.

use crate::entities::Record;
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Connects to `url` and makes sure the `records` table exists.
///
/// # Errors
/// Returns an error when the connection or table creation fails.
pub async fn create_connection(url: &str) -> Result<DatabaseConnection> {
    let db = Database::connect(url).await?;
    create_tables(&db).await?;
    Ok(db)
}

/// Creates the `records` table if it is not there yet.
///
/// # Errors
/// Returns an error when the statement fails.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut record_table = schema.create_table_from_entity(Record);
    record_table.if_not_exists();

    db.execute(builder.build(&record_table)).await?;

    Ok(())
}
