use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::collection::{Movies, SearchCriteria};
use crate::models::Movie;

/// One page of catalog results as stored on disk. The favorites file uses
/// the same shape with the page numbers pinned at 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachePage {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page")]
    pub total_pages: u32,
    #[serde(default)]
    pub results: Vec<Movie>,
}

fn default_page() -> u32 {
    1
}

impl Default for CachePage {
    /// The neutral page: no entries, page 1 of 1.
    fn default() -> Self {
        Self {
            page: 1,
            total_pages: 1,
            results: Vec::new(),
        }
    }
}

/// Reads one cached page. A missing, empty, or truncated file degrades to
/// the neutral page so the caller simply sees zero entries; content that
/// violates the page schema is an error for the caller to handle.
pub struct CacheReader {
    page: CachePage,
}

impl CacheReader {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("cache file {} not found, treating as empty", path.display());
                return Ok(Self {
                    page: CachePage::default(),
                });
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read cache file {}", path.display()));
            }
        };
        match serde_json::from_str::<CachePage>(&raw) {
            Ok(page) => Ok(Self { page }),
            Err(err) if err.classify() == Category::Eof => {
                debug!("cache file {} is truncated, treating as empty", path.display());
                Ok(Self {
                    page: CachePage::default(),
                })
            }
            Err(err) => Err(err).with_context(|| {
                format!("cache file {} does not match the page schema", path.display())
            }),
        }
    }

    /// Every entry of the page, or `None` when the page holds none. The
    /// absent value tells "this page is empty" apart from "a filter
    /// matched nothing"; callers branch on it before iterating.
    pub fn find_all_movies(&self) -> Option<Movies> {
        if self.page.results.is_empty() {
            return None;
        }
        Some(Movies::from_entries(self.page.results.clone()))
    }

    /// Title/year convenience filter used for favorites lookups. With no
    /// criteria at all there is nothing to look up, which is also the
    /// absent value.
    pub fn find_movies(&self, title: &str, release_year: &str) -> Option<Movies> {
        if title.is_empty() && release_year.is_empty() {
            return None;
        }
        let all = self.find_all_movies()?;
        Some(all.find_by_criteria(&SearchCriteria {
            title: title.to_string(),
            release_year: release_year.to_string(),
            ..SearchCriteria::default()
        }))
    }

    pub fn current_page(&self) -> u32 {
        self.page.page
    }

    pub fn total_pages(&self) -> u32 {
        self.page.total_pages
    }
}

/// Writes pages for both the catalog cache and the favorites file. Every
/// write goes through a temporary sibling and a rename, so an interrupted
/// write leaves the previous file untouched.
#[derive(Debug, Clone)]
pub struct CacheWriter {
    path: PathBuf,
}

impl CacheWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persists a full collection under the favorites shape (page 1 of 1).
    pub fn save(&self, movies: &Movies) -> Result<()> {
        self.save_page(&CachePage {
            page: 1,
            total_pages: 1,
            results: movies.iter().cloned().collect(),
        })
    }

    /// Persists one catalog page exactly as fetched, pagination included.
    pub fn save_page(&self, page: &CachePage) -> Result<()> {
        let body = serde_json::to_string_pretty(page).context("failed to encode cache page")?;
        self.write_atomic(body.as_bytes())
    }

    /// Resets the target to the neutral empty page.
    pub fn clean(&self) -> Result<()> {
        self.save_page(&CachePage::default())
    }

    fn write_atomic(&self, bytes: &[u8]) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to move {} into place", tmp.display()))?;
        Ok(())
    }
}

/// Builds a wire entry for tests and probes without spelling out every
/// field at each call site.
#[cfg(test)]
pub(crate) fn test_entry(id: i64, title: &str, release_date: &str, vote_count: u32) -> Movie {
    Movie {
        id,
        title: title.to_string(),
        original_title: title.to_string(),
        release_date: release_date.to_string(),
        genre_ids: vec![99],
        vote_average: 5.8,
        vote_count,
        overview: String::new(),
        poster_path: String::new(),
        backdrop_path: String::new(),
        adult: false,
        video: false,
        popularity: 1.2,
    }
}
