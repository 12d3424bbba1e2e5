use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

use crate::index::{CHUNK_OVERLAP, CHUNK_SIZE};
use crate::validate::MAX_QTR_REVENUE;

/// Process-wide configuration, read once at startup. Missing API credentials
/// are startup-fatal; the tuning knobs all have defaults.
#[derive(Clone, Debug)]
pub struct PnlConfig {
    pub openai_key: String,
    pub database_url: String,
    pub data_dir: PathBuf,
    pub max_qtr_revenue: f64,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl PnlConfig {
    pub fn from_env() -> Result<Self> {
        let openai_key = std::env::var("OPENAI_KEY")
            .map_err(|_| anyhow!("OPENAI_KEY environment variable not set"))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow!("DATABASE_URL environment variable not set"))?;

        let data_dir = PathBuf::from(
            std::env::var("PNL_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
        );

        Ok(Self {
            openai_key,
            database_url,
            data_dir,
            max_qtr_revenue: env_or("MAX_QTR_REVENUE", MAX_QTR_REVENUE)?,
            chunk_size: env_or("CHUNK_SIZE", CHUNK_SIZE)?,
            chunk_overlap: env_or("CHUNK_OVERLAP", CHUNK_OVERLAP)?,
        })
    }

    /// Raw PDFs, one subdirectory per company.
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    /// Extracted artifacts: json/, csv/ and txt/ per company.
    pub fn interim_dir(&self) -> PathBuf {
        self.data_dir.join("interim")
    }

    /// Merged per-company record arrays for static consumption.
    pub fn export_dir(&self) -> PathBuf {
        self.data_dir.join("export")
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {}: {}", name, raw)),
        Err(_) => Ok(default),
    }
}
