mod config;
mod storage;

pub use config::PgStoreConfig;
pub use storage::PgOrderStore;
