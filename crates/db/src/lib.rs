pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod storage;

pub use connection::{connect, connect_with_settings, ping, DbPool};
pub use fixtures::{DemoDataset, SeedSummary};
pub use repositories::RepositoryError;
pub use storage::Storage;
