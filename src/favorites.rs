use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::cache::{CacheReader, CacheWriter};
use crate::collection::{Movies, SearchCriteria};

/// The user's favorites list, mirrored to disk after every change. Ids are
/// unique here even though the underlying collection allows duplicates.
pub struct Favorites {
    movies: Movies,
    writer: CacheWriter,
}

impl Favorites {
    /// Loads the list persisted at `path`, starting empty when the file
    /// does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = CacheReader::load(path)
            .with_context(|| format!("failed to load favorites from {}", path.display()))?;
        let movies = reader.find_all_movies().unwrap_or_default();
        debug!("loaded {} favorite(s) from {}", movies.len(), path.display());
        Ok(Self {
            movies,
            writer: CacheWriter::new(path),
        })
    }

    /// Adds every record of `selection` whose id is not already present.
    /// Returns how many records were actually added; the file is only
    /// rewritten when that number is nonzero.
    pub fn add(&mut self, selection: &Movies) -> Result<usize> {
        let mut added = 0;
        for movie in selection.iter() {
            if self.movies.contains_id(movie.id) {
                continue;
            }
            self.movies.add(Some(movie.clone()));
            added += 1;
        }
        if added > 0 {
            self.persist()?;
            info!("added {} favorite(s)", added);
        }
        Ok(added)
    }

    /// Drops every record whose id appears in `selection` and returns how
    /// many were dropped.
    pub fn remove(&mut self, selection: &Movies) -> Result<usize> {
        let removed = self.movies.remove_all(selection);
        if removed > 0 {
            self.persist()?;
            info!("removed {} favorite(s)", removed);
        }
        Ok(removed)
    }

    /// Filters the list the same way the catalog is filtered. Returns a
    /// detached collection, so removals done afterwards do not invalidate
    /// the result the user is looking at.
    pub fn find_movies(&self, criteria: &SearchCriteria) -> Movies {
        self.movies.find_by_criteria(criteria)
    }

    /// Empties the list and the file behind it.
    pub fn clear(&mut self) -> Result<()> {
        if self.movies.is_empty() {
            return Ok(());
        }
        self.movies.clear();
        self.persist()?;
        info!("cleared the favorites list");
        Ok(())
    }

    pub fn movies(&self) -> &Movies {
        &self.movies
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    fn persist(&self) -> Result<()> {
        self.writer
            .save(&self.movies)
            .context("failed to persist the favorites list")
    }
}

impl fmt::Display for Favorites {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.movies.fmt(f)
    }
}
