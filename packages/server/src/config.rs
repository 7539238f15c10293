use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

use crate::kernel::{DEFAULT_CONCURRENCY, DEFAULT_GENERATION_MODEL};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub generation_model: String,
    pub max_completion_tokens: u32,
    /// Size of the shared generation permit pool
    pub generation_concurrency: usize,
    /// Start task generation as soon as an outline completes
    pub auto_dispatch: bool,
    pub upload_folder: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://coursegen.db".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            openai_api_key: env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set")?,
            openai_base_url: env::var("OPENAI_BASE_URL").ok(),
            generation_model: env::var("GENERATION_MODEL")
                .unwrap_or_else(|_| DEFAULT_GENERATION_MODEL.to_string()),
            max_completion_tokens: env::var("GENERATION_MAX_COMPLETION_TOKENS")
                .unwrap_or_else(|_| "16000".to_string())
                .parse()
                .context("GENERATION_MAX_COMPLETION_TOKENS must be a valid number")?,
            generation_concurrency: env::var("GENERATION_CONCURRENCY")
                .unwrap_or_else(|_| DEFAULT_CONCURRENCY.to_string())
                .parse()
                .context("GENERATION_CONCURRENCY must be a valid number")?,
            auto_dispatch: env::var("GENERATION_AUTO_DISPATCH")
                .map(|v| parse_flag(&v))
                .unwrap_or(Ok(true))
                .context("GENERATION_AUTO_DISPATCH must be true or false")?,
            upload_folder: env::var("UPLOAD_FOLDER")
                .unwrap_or_else(|_| "uploads".to_string())
                .into(),
        })
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognized flag value {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(parse_flag(" on ").unwrap());
        assert!(!parse_flag("0").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
