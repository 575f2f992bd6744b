pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod forms;
pub mod manager;
pub mod memory;
pub mod models;
pub mod password;
pub mod schema;
pub mod store;

pub use database::DatabaseManager;
pub use error::{CatalogError, CatalogResult};
pub use manager::CatalogManager;
pub use memory::MemoryCatalogStore;
pub use store::CatalogStore;
