//! # Configuration
//!
//! Server settings for `serve`. clap resolves each value from the flag,
//! then its `RNACENTRAL_*` environment variable, then the default.

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const ENV_DB: &str = "RNACENTRAL_DB";
pub const ENV_BIND: &str = "RNACENTRAL_BIND";
pub const ENV_BASE_URL: &str = "RNACENTRAL_BASE_URL";
pub const ENV_NHMMER_BIN: &str = "RNACENTRAL_NHMMER_BIN";
pub const ENV_NHMMER_DB: &str = "RNACENTRAL_NHMMER_DB";
pub const ENV_WORK_DIR: &str = "RNACENTRAL_WORK_DIR";
pub const ENV_SEARCH_WORKERS: &str = "RNACENTRAL_SEARCH_WORKERS";
pub const ENV_JOB_TTL: &str = "RNACENTRAL_JOB_TTL";

/// A configuration value that could not be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one search worker is required")]
    ZeroWorkers,
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("rnacentral-search")
}

/// `serve` flags.
#[derive(Debug, Clone, Args)]
pub struct ServeOptions {
    /// Listen address, `host:port`.
    #[arg(long, env = ENV_BIND, default_value = "127.0.0.1:8000")]
    pub bind: String,

    /// Public url prefix used in hyperlinks.
    #[arg(long, env = ENV_BASE_URL, default_value = "http://127.0.0.1:8000")]
    pub base_url: String,

    #[arg(long, env = ENV_NHMMER_BIN, default_value = "nhmmer")]
    pub nhmmer_bin: PathBuf,

    /// FASTA file searched by nhmmer.
    #[arg(long, env = ENV_NHMMER_DB, default_value = "rnacentral_nhmmer.fasta")]
    pub nhmmer_db: PathBuf,

    /// Scratch directory for query and output files.
    #[arg(long, env = ENV_WORK_DIR, default_value_os_t = default_work_dir())]
    pub work_dir: PathBuf,

    #[arg(long, env = ENV_SEARCH_WORKERS, default_value_t = 2)]
    pub search_workers: usize,

    /// Seconds finished jobs and their results are kept.
    #[arg(long, env = ENV_JOB_TTL, default_value_t = 24 * 60 * 60)]
    pub job_ttl: u64,
}

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// redb catalogue file.
    pub db_path: PathBuf,
    pub bind: String,
    /// Public url prefix, without trailing slash.
    pub base_url: String,
    pub nhmmer_bin: PathBuf,
    pub nhmmer_db: PathBuf,
    pub work_dir: PathBuf,
    pub search_workers: usize,
    pub job_ttl: Duration,
}

impl ServeOptions {
    /// Validate the options and pair them with the catalogue path.
    pub fn into_config(self, db_path: PathBuf) -> Result<Config, ConfigError> {
        if self.search_workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(Config {
            db_path,
            bind: self.bind,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            nhmmer_bin: self.nhmmer_bin,
            nhmmer_db: self.nhmmer_db,
            work_dir: self.work_dir,
            search_workers: self.search_workers,
            job_ttl: Duration::from_secs(self.job_ttl),
        })
    }
}
