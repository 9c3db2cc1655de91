use std::path::PathBuf;

use serde::Deserialize;

use crate::common::{Error, Result};

/// Default directory page files are created/opened under when a caller
/// does not configure one explicitly.
pub const RUST_DB_DATA_DIR: &str = ".";

/// Default number of frames when a pool size is not supplied.
pub const DEFAULT_POOL_SIZE: usize = 16;

/// Which [`crate::buffer::ReplacementPolicy`] the pool should hand out
/// frames with. `LruK`'s `k` mirrors the teacher's `replacer_k` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplacementStrategy {
    Fifo,
    LruK { k: usize },
}

impl Default for ReplacementStrategy {
    fn default() -> Self {
        ReplacementStrategy::Fifo
    }
}

/// Buffer pool configuration, loadable from a TOML file, `BUFFERPOOL_*`
/// environment variables, or built directly via [`BufferPoolConfig::builder`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BufferPoolConfig {
    pub pool_size: usize,
    pub strategy: ReplacementStrategy,
    pub data_dir: PathBuf,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            strategy: ReplacementStrategy::default(),
            data_dir: PathBuf::from(RUST_DB_DATA_DIR),
        }
    }
}

impl BufferPoolConfig {
    pub fn builder() -> BufferPoolConfigBuilder {
        BufferPoolConfigBuilder::default()
    }

    /// Loads configuration layered as: built-in defaults, an optional TOML
    /// file at `path`, then `BUFFERPOOL_*` environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("pool_size", DEFAULT_POOL_SIZE as i64)
            .map_err(|e| Error::Config(e.to_string()))?
            .set_default("data_dir", RUST_DB_DATA_DIR)
            .map_err(|e| Error::Config(e.to_string()))?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("BUFFERPOOL"))
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        let pool_size: usize = settings
            .get("pool_size")
            .map_err(|e| Error::Config(e.to_string()))?;
        let data_dir: PathBuf = settings
            .get_string("data_dir")
            .map_err(|e| Error::Config(e.to_string()))?
            .into();

        Self::validate_pool_size(pool_size)?;

        Ok(Self {
            pool_size,
            strategy: ReplacementStrategy::default(),
            data_dir,
        })
    }

    fn validate_pool_size(pool_size: usize) -> Result<()> {
        if pool_size == 0 {
            return Err(Error::Config("pool_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct BufferPoolConfigBuilder {
    pool_size: Option<usize>,
    strategy: Option<ReplacementStrategy>,
    data_dir: Option<PathBuf>,
}

impl BufferPoolConfigBuilder {
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = Some(pool_size);
        self
    }

    pub fn strategy(mut self, strategy: ReplacementStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    pub fn build(self) -> Result<BufferPoolConfig> {
        let pool_size = self.pool_size.unwrap_or(DEFAULT_POOL_SIZE);
        BufferPoolConfig::validate_pool_size(pool_size)?;

        Ok(BufferPoolConfig {
            pool_size,
            strategy: self.strategy.unwrap_or_default(),
            data_dir: self.data_dir.unwrap_or_else(|| PathBuf::from(RUST_DB_DATA_DIR)),
        })
    }
}
