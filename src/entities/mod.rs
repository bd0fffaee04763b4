//! Entity module - Contains the SeaORM entity definitions for the database.
//! The tracker keeps no relational schema: every collection is stored as a
//! JSON document in a single key-value table.

pub mod kv_entry;

pub use kv_entry::{Entity as KvEntry, Model as KvEntryModel};
