//! Document store implementations.

mod memory;
mod postgres;

pub use memory::InMemoryDocumentStore;
pub use postgres::PgDocumentStore;
