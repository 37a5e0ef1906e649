use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

const DEFAULT_LLM_MODEL: &str = "claude-sonnet-4-5";

/// Where the session blob is kept between restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateBackend {
    File,
    Redis,
    Memory,
}

impl FromStr for StateBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StateBackend::File),
            "redis" => Ok(StateBackend::Redis),
            "memory" => Ok(StateBackend::Memory),
            other => bail!("STATE_BACKEND must be one of file, redis, memory (got '{other}')"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Only the Redis backend has a required variable; everything else defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Without a key the service runs on the fallback question pool and the heuristic scorer.
    pub anthropic_api_key: Option<String>,
    pub llm_model: String,
    pub interview_role: String,
    pub state_backend: StateBackend,
    pub state_path: PathBuf,
    pub redis_url: Option<String>,
    pub state_key: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let state_backend: StateBackend = optional_env("STATE_BACKEND")
            .unwrap_or_else(|| "file".to_string())
            .parse()?;
        let redis_url = optional_env("REDIS_URL");
        if state_backend == StateBackend::Redis && redis_url.is_none() {
            bail!("REDIS_URL is required when STATE_BACKEND=redis");
        }

        Ok(Config {
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            llm_model: optional_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            interview_role: optional_env("INTERVIEW_ROLE")
                .unwrap_or_else(|| "frontend developer".to_string()),
            state_backend,
            state_path: optional_env("STATE_PATH")
                .unwrap_or_else(|| "interview-state.json".to_string())
                .into(),
            redis_url,
            state_key: optional_env("STATE_KEY").unwrap_or_else(|| "interview-storage".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Unset and blank are treated the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
