// riskwatch-core/src/infrastructure/adapters/mod.rs

pub mod duckdb;
pub mod schema;

pub use self::duckdb::DuckDBStore;
