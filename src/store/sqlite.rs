//! `SQLite` backend built on the `records` entity.

use super::{KeyValueStore, Namespace};
use crate::{
    entities::{Record, RecordColumn, record},
    errors::Result,
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde_json::Value;
use tracing::warn;

/// Records stored in one `SeaORM` table.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: DatabaseConnection,
}

impl SqliteStore {
    /// Wraps an open connection whose tables already exist.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Connects to `url` and creates the table if needed.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened.
    pub async fn connect(url: &str) -> Result<Self> {
        let db = crate::config::database::create_connection(url).await?;
        Ok(Self::new(db))
    }

    async fn next_position(&self, namespace: Namespace) -> Result<i64> {
        let last = Record::find()
            .filter(RecordColumn::Namespace.eq(namespace.as_str()))
            .order_by_desc(RecordColumn::Position)
            .one(&self.db)
            .await?;
        Ok(last.map_or(0, |r| r.position + 1))
    }
}

fn new_record(
    namespace: Namespace,
    key: String,
    position: i64,
    value: &Value,
) -> Result<record::ActiveModel> {
    Ok(record::ActiveModel {
        namespace: Set(namespace.as_str().to_string()),
        record_key: Set(key),
        position: Set(position),
        value: Set(serde_json::to_string(value)?),
        updated_at: Set(chrono::Utc::now().naive_utc()),
    })
}

impl KeyValueStore for SqliteStore {
    async fn get(&self, namespace: Namespace, key: &str) -> Result<Option<Value>> {
        let found = Record::find_by_id((namespace.as_str().to_string(), key.to_string()))
            .one(&self.db)
            .await?;
        match found {
            Some(model) => Ok(Some(serde_json::from_str(&model.value)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, namespace: Namespace, key: &str, value: Value) -> Result<()> {
        let existing = Record::find_by_id((namespace.as_str().to_string(), key.to_string()))
            .one(&self.db)
            .await?;

        if let Some(model) = existing {
            let mut active: record::ActiveModel = model.into();
            active.value = Set(serde_json::to_string(&value)?);
            active.updated_at = Set(chrono::Utc::now().naive_utc());
            active.update(&self.db).await?;
        } else {
            let position = self.next_position(namespace).await?;
            new_record(namespace, key.to_string(), position, &value)?
                .insert(&self.db)
                .await?;
        }
        Ok(())
    }

    async fn list(&self, namespace: Namespace) -> Result<Vec<(String, Value)>> {
        let rows = Record::find()
            .filter(RecordColumn::Namespace.eq(namespace.as_str()))
            .order_by_asc(RecordColumn::Position)
            .order_by_asc(RecordColumn::RecordKey)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match serde_json::from_str(&row.value) {
                Ok(value) => Some((row.record_key, value)),
                Err(e) => {
                    warn!(
                        "Skipping malformed record {}/{}: {}",
                        row.namespace, row.record_key, e
                    );
                    None
                }
            })
            .collect())
    }

    async fn replace(&self, namespace: Namespace, records: Vec<(String, Value)>) -> Result<()> {
        let models = records
            .into_iter()
            .zip(0_i64..)
            .map(|((key, value), position)| new_record(namespace, key, position, &value))
            .collect::<Result<Vec<_>>>()?;

        let txn = self.db.begin().await?;
        Record::delete_many()
            .filter(RecordColumn::Namespace.eq(namespace.as_str()))
            .exec(&txn)
            .await?;
        if !models.is_empty() {
            Record::insert_many(models).exec(&txn).await?;
        }
        txn.commit().await?;
        Ok(())
    }
}
