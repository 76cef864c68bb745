//! PostgreSQL adapters for the record store ports.

mod record_store;

pub use record_store::{
    bid_store, workflow_store, PgEmdStore, PgRecordStore, PgTenderReader,
};
