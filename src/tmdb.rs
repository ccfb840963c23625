use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use std::env;

use crate::cache::{CachePage, CacheWriter};
use crate::collection::SearchCriteria;

const TMDB_BASE: &str = "https://api.themoviedb.org/3";

/// Seam between the command loop and TMDB. The loop never builds a
/// request itself: it asks for a page to be refreshed into the cache file
/// and reads the result back through the cache reader.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn fetch_genres(&self) -> Result<GenreTable>;
    async fn refresh_popular(&self, page: u32) -> Result<()>;
    async fn refresh_search(&self, criteria: &SearchCriteria, page: u32) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    cache: CacheWriter,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, cache: CacheWriter) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            cache,
        }
    }

    pub fn from_env(cache: CacheWriter) -> Result<Self> {
        let api_key = env::var("TMDB_API_KEY").context("TMDB_API_KEY not set")?;
        Ok(Self::new(api_key, cache))
    }

    fn popular_url(&self, page: u32) -> String {
        format!(
            "{TMDB_BASE}/discover/movie?include_adult=false&sort_by=popularity.desc&page={page}&api_key={}",
            self.api_key
        )
    }

    /// A title query goes to the search endpoint, which only understands
    /// the title and the release year. Everything else goes to discover,
    /// which takes the remaining filters as query parameters.
    fn search_url(&self, criteria: &SearchCriteria, page: u32) -> String {
        if !criteria.title.is_empty() {
            let mut url = format!(
                "{TMDB_BASE}/search/movie?query={}&include_adult=false&page={page}&api_key={}",
                urlencoding::encode(&criteria.title),
                self.api_key
            );
            if !criteria.release_year.is_empty() {
                url.push_str(&format!(
                    "&primary_release_year={}",
                    urlencoding::encode(&criteria.release_year)
                ));
            }
            return url;
        }
        let mut url = format!(
            "{TMDB_BASE}/discover/movie?include_adult=false&page={page}&api_key={}",
            self.api_key
        );
        if !criteria.release_year.is_empty() {
            url.push_str(&format!(
                "&primary_release_year={}",
                urlencoding::encode(&criteria.release_year)
            ));
        }
        if let Some(min) = criteria.min_vote_average {
            url.push_str(&format!("&vote_average.gte={min}"));
        }
        if !criteria.genre_ids.is_empty() {
            let ids = criteria
                .genre_ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            url.push_str(&format!("&with_genres={ids}"));
        }
        url
    }

    /// Fetches one catalog page and persists it, so the schema is checked
    /// before anything reaches the cache file.
    async fn fetch_into_cache(&self, url: &str) -> Result<()> {
        let page: CachePage = self.get_json(url).await?;
        self.cache.save_page(&page)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .context("request failed")?;
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        if !status.is_success() {
            return Err(anyhow!("{} -> {}", url, text));
        }
        let parsed: T = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(parsed)
    }
}

#[async_trait]
impl CatalogApi for TmdbClient {
    async fn fetch_genres(&self) -> Result<GenreTable> {
        #[derive(Deserialize)]
        struct GenreEntry {
            id: i64,
            name: String,
        }
        #[derive(Deserialize)]
        struct GenreResponse {
            genres: Vec<GenreEntry>,
        }

        let url = format!("{TMDB_BASE}/genre/movie/list?api_key={}", self.api_key);
        let data: GenreResponse = self.get_json(&url).await?;
        if data.genres.is_empty() {
            return Err(anyhow!("TMDB returned an empty genre list"));
        }
        Ok(GenreTable::new(
            data.genres.into_iter().map(|g| (g.id, g.name)).collect(),
        ))
    }

    async fn refresh_popular(&self, page: u32) -> Result<()> {
        self.fetch_into_cache(&self.popular_url(page)).await
    }

    async fn refresh_search(&self, criteria: &SearchCriteria, page: u32) -> Result<()> {
        self.fetch_into_cache(&self.search_url(criteria, page)).await
    }
}

static BUILTIN_GENRES: Lazy<Vec<(i64, String)>> = Lazy::new(|| {
    [
        (28, "Action"),
        (12, "Adventure"),
        (16, "Animation"),
        (35, "Comedy"),
        (80, "Crime"),
        (99, "Documentary"),
        (18, "Drama"),
        (10751, "Family"),
        (14, "Fantasy"),
        (36, "History"),
        (27, "Horror"),
        (10402, "Music"),
        (9648, "Mystery"),
        (10749, "Romance"),
        (878, "Science Fiction"),
        (10770, "TV Movie"),
        (53, "Thriller"),
        (10752, "War"),
        (37, "Western"),
    ]
    .into_iter()
    .map(|(id, name)| (id, name.to_string()))
    .collect()
});

/// Ordered (id, name) pairs from `/genre/movie/list`. Lookup is by exact
/// name, so the caller normalizes user input first.
#[derive(Debug, Clone)]
pub struct GenreTable {
    entries: Vec<(i64, String)>,
}

impl GenreTable {
    pub fn new(entries: Vec<(i64, String)>) -> Self {
        Self { entries }
    }

    /// The TMDB movie genre list shipped with the binary, used when the
    /// startup fetch fails so the search command keeps working offline.
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_GENRES.clone(),
        }
    }

    pub fn id_for(&self, name: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|(_, entry)| entry == name)
            .map(|(id, _)| *id)
    }

    /// One bullet per genre name, for the search prompt.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (_, name) in &self.entries {
            out.push_str("  • ");
            out.push_str(name);
            out.push('\n');
        }
        out
    }
}

/// Trims, lowercases, then uppercases the first letter only, matching how
/// genre input has always been read. "science fiction" becomes
/// "Science fiction" and will not match the table entry
/// "Science Fiction"; single-word names come out right.
pub fn normalize_genre_name(input: &str) -> String {
    let lower = input.trim().to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    // The guard is returned so the cache directory outlives the writer.
    fn client() -> (TempDir, TmdbClient) {
        let dir = tempdir().unwrap();
        let client = TmdbClient::new("test-key", CacheWriter::new(dir.path().join("cache.json")));
        (dir, client)
    }

    #[test]
    fn normalization_uppercases_the_first_letter_only() {
        assert_eq!(normalize_genre_name("drama"), "Drama");
        assert_eq!(normalize_genre_name("  DRAMA  "), "Drama");
        assert_eq!(normalize_genre_name("science fiction"), "Science fiction");
        assert_eq!(normalize_genre_name(""), "");
        assert_eq!(normalize_genre_name("   "), "");
    }

    #[test]
    fn single_word_genres_resolve_through_normalization() {
        let table = GenreTable::builtin();
        assert_eq!(table.id_for(&normalize_genre_name("drama")), Some(18));
        assert_eq!(table.id_for(&normalize_genre_name(" horror ")), Some(27));
    }

    #[test]
    fn multi_word_genres_only_match_their_exact_capitalization() {
        let table = GenreTable::builtin();
        assert_eq!(table.id_for("Science Fiction"), Some(878));
        // Normalization lowercases the second word, which misses the entry.
        assert_eq!(table.id_for(&normalize_genre_name("science fiction")), None);
    }

    #[test]
    fn unknown_genres_have_no_id() {
        assert_eq!(GenreTable::builtin().id_for("Telenovela"), None);
    }

    #[test]
    fn genre_rendering_is_one_bullet_per_name() {
        let table = GenreTable::new(vec![(18, "Drama".to_string()), (27, "Horror".to_string())]);
        assert_eq!(table.render(), "  • Drama\n  • Horror\n");
    }

    #[test]
    fn title_queries_use_the_search_endpoint() {
        let (_dir, client) = client();
        let url = client.search_url(
            &SearchCriteria {
                title: "Blacksmith Scene".to_string(),
                release_year: "1893".to_string(),
                ..SearchCriteria::default()
            },
            2,
        );
        assert!(url.contains("/search/movie?"));
        assert!(url.contains("query=Blacksmith%20Scene"));
        assert!(url.contains("page=2"));
        assert!(url.contains("primary_release_year=1893"));
    }

    #[test]
    fn titleless_queries_use_discover_with_the_remaining_filters() {
        let (_dir, client) = client();
        let url = client.search_url(
            &SearchCriteria {
                release_year: "1890".to_string(),
                genre_ids: vec![99, 36],
                min_vote_average: Some(5.5),
                ..SearchCriteria::default()
            },
            1,
        );
        assert!(url.contains("/discover/movie?"));
        assert!(url.contains("primary_release_year=1890"));
        assert!(url.contains("vote_average.gte=5.5"));
        assert!(url.contains("with_genres=99,36"));
    }

    #[test]
    fn popular_pages_are_sorted_by_descending_popularity() {
        let (_dir, client) = client();
        let url = client.popular_url(3);
        assert!(url.contains("/discover/movie?"));
        assert!(url.contains("sort_by=popularity.desc"));
        assert!(url.contains("page=3"));
    }
}
