pub mod manager;
pub mod memory;
pub mod postgres;
pub mod query_builder;
pub mod store;
pub mod models;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{document_id, Collection, DocumentStore, FindQuery};
