pub mod manager;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStudentStore;
pub use postgres::PgStudentStore;
pub use repository::{RepositoryError, StudentPage, StudentRepository};
pub use store::{Document, StoreError, StudentStore};
