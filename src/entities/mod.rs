//! Entity module - `SeaORM` entity definitions for the database record store.

pub mod record;

pub use record::{Column as RecordColumn, Entity as Record, Model as RecordModel};
