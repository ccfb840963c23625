//! Terminal TMDB browser: cached catalog pages, criteria search, and a
//! favorites list persisted across sessions.

pub mod app;
pub mod cache;
pub mod collection;
pub mod config;
pub mod favorites;
pub mod models;
pub mod tmdb;
