//! Process configuration.
//!
//! Read once at startup from the environment. Unknown variables are ignored;
//! the recognized set is listed in [`Config::from_env`].

use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CoreError, Result};

pub const DEFAULT_DB_PATH: &str = "gaffer.sqlite";
pub const DEFAULT_WORLD_SEED: u64 = 42;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path of the embedded sqlite event store.
    pub db_path: PathBuf,
    /// Truncate the event store on startup.
    pub reset_db: bool,
    /// World seed; every derived stream hangs off this value.
    pub world_seed: u64,
    /// Soft-state collaborator selector: "offline" or "none".
    pub llm_provider: String,
    pub llm_temperature: f64,
    pub llm_max_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            reset_db: false,
            world_seed: DEFAULT_WORLD_SEED,
            llm_provider: "offline".to_string(),
            llm_temperature: 0.7,
            llm_max_tokens: 512,
        }
    }
}

impl Config {
    /// Build from `DB_PATH`, `RESET_DB`, `LLM_PROVIDER`, `LLM_TEMPERATURE`,
    /// `LLM_MAX_TOKENS` (and `WORLD_SEED`), falling back to defaults for
    /// anything unset. Any other environment variable is ignored.
    pub fn from_env() -> Result<Self> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::raw().only(&[
                "DB_PATH",
                "RESET_DB",
                "WORLD_SEED",
                "LLM_PROVIDER",
                "LLM_TEMPERATURE",
                "LLM_MAX_TOKENS",
            ]))
            .extract()
            .map_err(|e| CoreError::Config(e.to_string()))
    }
}
