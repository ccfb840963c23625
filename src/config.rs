use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

const DEFAULT_CACHE_FILE: &str = "data/api-results.json";
const DEFAULT_FAVORITES_FILE: &str = "data/favorites.json";

/// Runtime settings, all read from the environment. `TMDB_API_KEY` is the
/// only required variable; the two file locations default to `data/`.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub cache_file: PathBuf,
    pub favorites_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("TMDB_API_KEY").context("TMDB_API_KEY not set")?;
        let cache_file = env::var("CINESHELF_CACHE_FILE")
            .unwrap_or_else(|_| DEFAULT_CACHE_FILE.to_string())
            .into();
        let favorites_file = env::var("CINESHELF_FAVORITES_FILE")
            .unwrap_or_else(|_| DEFAULT_FAVORITES_FILE.to_string())
            .into();
        Ok(Self {
            api_key,
            cache_file,
            favorites_file,
        })
    }
}
