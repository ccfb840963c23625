//! Fetch one TMDB discover page through the catalog client and print what
//! the cache reader sees afterwards.
//! Usage:
//!   cargo run --bin tmdb_page -- [page_number]
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{Context, Result};
use cineshelf::cache::{CacheReader, CacheWriter};
use cineshelf::collection::EMPTY_LIST_MESSAGE;
use cineshelf::tmdb::{CatalogApi, TmdbClient};
use dotenvy::dotenv;
use std::env;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    let page: u32 = match args.get(1) {
        Some(raw) => raw.parse().context("page_number must be an integer")?,
        None => 1,
    };

    let target = env::temp_dir().join("cineshelf-probe.json");
    let client = TmdbClient::from_env(CacheWriter::new(&target))?;
    client.refresh_popular(page).await?;

    let reader = CacheReader::load(&target)?;
    println!("page ({}/{})", reader.current_page(), reader.total_pages());
    match reader.find_all_movies() {
        Some(movies) => print!("{}", movies.render_with_id()),
        None => println!("{EMPTY_LIST_MESSAGE}"),
    }
    println!("cached at {}", target.display());
    Ok(())
}
