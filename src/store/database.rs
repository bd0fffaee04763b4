//! `SeaORM` implementation of the key-value store.
//!
//! Every key is one row in the `kv_entries` table. `set` looks the key up and
//! either updates the row or inserts a new one, so concurrent writers resolve
//! as last-write-wins at the database.

use crate::{
    entities::{KvEntry, kv_entry},
    errors::Result,
    store::KeyValueStore,
};
use chrono::Utc;
use sea_orm::{DatabaseConnection, Set, prelude::*};
use tracing::trace;

/// Key-value store persisted in a database table.
#[derive(Debug, Clone)]
pub struct DatabaseStore {
    db: DatabaseConnection,
}

impl DatabaseStore {
    /// Wraps an open connection. The table must already exist, see
    /// [`crate::config::database::create_tables`].
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl KeyValueStore for DatabaseStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entry = KvEntry::find()
            .filter(kv_entry::Column::Key.eq(key))
            .one(&self.db)
            .await?;

        Ok(entry.map(|e| e.value))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let now = Utc::now().naive_utc();
        trace!("database store set {} ({} bytes)", key, value.len());

        let existing = KvEntry::find()
            .filter(kv_entry::Column::Key.eq(key))
            .one(&self.db)
            .await?;

        if let Some(entry) = existing {
            let mut active_model: kv_entry::ActiveModel = entry.into();
            active_model.value = Set(value);
            active_model.updated_at = Set(now);
            active_model.update(&self.db).await?;
        } else {
            let new_entry = kv_entry::ActiveModel {
                key: Set(key.to_string()),
                value: Set(value),
                updated_at: Set(now),
                ..Default::default()
            };
            new_entry.insert(&self.db).await?;
        }

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        KvEntry::delete_many()
            .filter(kv_entry::Column::Key.eq(key))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
