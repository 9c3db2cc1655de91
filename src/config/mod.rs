pub mod config;

pub use config::{BufferPoolConfig, BufferPoolConfigBuilder, ReplacementStrategy, RUST_DB_DATA_DIR};
