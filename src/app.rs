use crate::cache::{CacheReader, CacheWriter};
use crate::collection::{Movies, SearchCriteria, EMPTY_LIST_MESSAGE};
use crate::config::Config;
use crate::favorites::Favorites;
use crate::models::Movie;
use crate::tmdb::{normalize_genre_name, CatalogApi, GenreTable, TmdbClient};
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

const COMMANDS: [&str; 8] = [
    "[1] catalog: see popular movies at the moment",
    "[2] search: show specific movies based on your criteria",
    "[3] details: see detailed information about one movie of your precedent research",
    "[4] add: add one movie to your favorite list",
    "[5] remove: remove one movie to your favorite list",
    "[6] favorites: see movies in your favorite list",
    "[7] clear: remove all the movies from your favorite list",
    "[8] exit: leave the application",
];

/// Which endpoint a page-navigation step refreshes from. Search keeps the
/// criteria of the query that opened the navigation.
enum PageSource<'a> {
    Popular,
    Search(&'a SearchCriteria),
}

/// The interactive command loop. Input and output are generic so tests
/// can drive a full session from a scripted buffer.
pub struct App<R, W> {
    input: R,
    out: W,
    api: Arc<dyn CatalogApi>,
    genres: GenreTable,
    favorites: Favorites,
    cache_file: PathBuf,
}

/// Wires the real collaborators and hands control to the loop on stdio.
pub async fn run(config: Config) -> Result<()> {
    let api: Arc<dyn CatalogApi> = Arc::new(TmdbClient::new(
        config.api_key.clone(),
        CacheWriter::new(&config.cache_file),
    ));
    let genres = match api.fetch_genres().await {
        Ok(table) => table,
        Err(e) => {
            warn!("Failed to fetch the TMDB genre list, using built-in table: {}", e);
            GenreTable::builtin()
        }
    };
    let favorites = Favorites::load(&config.favorites_file)?;
    info!("favorites loaded with {} entr(ies)", favorites.len());

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut app = App::new(
        stdin.lock(),
        stdout.lock(),
        api,
        genres,
        favorites,
        config.cache_file,
    );
    app.run().await
}

impl<R: BufRead, W: Write> App<R, W> {
    pub fn new(
        input: R,
        out: W,
        api: Arc<dyn CatalogApi>,
        genres: GenreTable,
        favorites: Favorites,
        cache_file: PathBuf,
    ) -> Self {
        Self {
            input,
            out,
            api,
            genres,
            favorites,
            cache_file,
        }
    }

    /// Runs the command loop until the user confirms the exit command or
    /// the input stream ends. A failing command prints its error and
    /// returns to the prompt; only I/O on the loop's own handles aborts.
    pub async fn run(&mut self) -> Result<()> {
        // Last session's catalog pages are stale by definition.
        CacheWriter::new(&self.cache_file).clean()?;

        loop {
            self.help()?;
            let Some(command) = self.ask_value("\nInput your command: ")? else {
                break;
            };
            let command = command.trim().to_lowercase();
            writeln!(self.out)?;

            if command == "8" {
                if self.ask_to_confirm("Are you sure that you want to leave the application?")? {
                    break;
                }
                continue;
            }

            let outcome = match command.as_str() {
                "1" => self.catalog().await,
                "2" => self.search().await,
                "3" => self.details(),
                "4" => self.add().await,
                "5" => self.remove(),
                "6" => self.show_favorites(),
                "7" => self.clear_favorites(),
                other => {
                    writeln!(self.out, "*** Command '{other}' doesn't exist. ***")?;
                    Ok(())
                }
            };
            if let Err(e) = outcome {
                error!("command '{}' failed: {:#}", command, e);
                writeln!(self.out, "An error occurred: {e:#}")?;
            }
        }
        Ok(())
    }

    fn help(&mut self) -> Result<()> {
        writeln!(self.out, "\nCommands available: ")?;
        for command in COMMANDS {
            writeln!(self.out, "•{command}")?;
        }
        Ok(())
    }

    /// Prints the prompt on its own line and reads the next input line.
    /// `None` means the input stream is exhausted.
    fn ask_value(&mut self, message: &str) -> Result<Option<String>> {
        writeln!(self.out, "{message}")?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("failed to read input")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches('\n').trim_end_matches('\r').to_string()))
    }

    /// Loops until the user answers `y` or `n`. Exhausted input counts as
    /// a no, so scripted sessions come to rest instead of spinning.
    fn ask_to_confirm(&mut self, message: &str) -> Result<bool> {
        loop {
            let Some(answer) = self.ask_value(&format!("{message} [Y/n]: "))? else {
                return Ok(false);
            };
            match answer.trim().to_lowercase().as_str() {
                "y" => return Ok(true),
                "n" => return Ok(false),
                _ => {}
            }
        }
    }

    async fn refresh(&self, source: &PageSource<'_>, page: u32) -> Result<()> {
        match source {
            PageSource::Popular => self.api.refresh_popular(page).await,
            PageSource::Search(criteria) => self.api.refresh_search(criteria, page).await,
        }
    }

    fn listing(reader: &CacheReader) -> String {
        match reader.find_all_movies() {
            Some(movies) => movies.to_string(),
            None => EMPTY_LIST_MESSAGE.to_string(),
        }
    }

    async fn catalog(&mut self) -> Result<()> {
        self.refresh(&PageSource::Popular, 1).await?;
        self.page_loop(
            "The most popular movies at the moment are listed below: ",
            &PageSource::Popular,
        )
        .await
    }

    /// Shows the current cache page under `header`, then keeps serving
    /// navigation requests until the user leaves. Every iteration re-reads
    /// the cache file, which a successful refresh has just replaced.
    async fn page_loop(&mut self, header: &str, source: &PageSource<'_>) -> Result<()> {
        loop {
            let reader = CacheReader::load(&self.cache_file)?;
            writeln!(self.out, "{header}\n{}", Self::listing(&reader))?;
            if !self
                .ask_page_action(reader.current_page(), reader.total_pages(), source)
                .await?
            {
                return Ok(());
            }
        }
    }

    /// One round of the page-navigation prompt. Returns false when the
    /// user leaves the navigation, true after a page refresh.
    async fn ask_page_action(
        &mut self,
        current: u32,
        total: u32,
        source: &PageSource<'_>,
    ) -> Result<bool> {
        let message = format!(
            "Choose your action: [0] Continue/Leave command, [1] Previous Page, [2] Next Page, [3] Specify Page | page ({current}/{total})"
        );
        loop {
            let Some(choice) = self.ask_value(&message)? else {
                return Ok(false);
            };
            match choice.as_str() {
                "0" => return Ok(false),
                "1" => {
                    if current > 1 {
                        self.refresh(source, current - 1).await?;
                        return Ok(true);
                    }
                    writeln!(self.out, "\nThere is no precedent page.")?;
                }
                "2" => {
                    if current < total {
                        self.refresh(source, current + 1).await?;
                        return Ok(true);
                    }
                    writeln!(self.out, "\nThere is no next page.")?;
                }
                "3" => {
                    let Some(number) = self.ask_value("Enter page number: ")? else {
                        return Ok(false);
                    };
                    match number.trim().parse::<u32>() {
                        Ok(n) if n >= 1 && n <= total => {
                            self.refresh(source, n).await?;
                            return Ok(true);
                        }
                        _ => writeln!(self.out, "Page number unavailable.")?,
                    }
                }
                _ => writeln!(self.out, "Please enter a valid option.")?,
            }
        }
    }

    /// The search command: collect the four criteria, then page through
    /// the results. Refusing to search with no criteria at all mirrors the
    /// catalog service, which would answer with an unfiltered firehose.
    async fn search(&mut self) -> Result<()> {
        let title = self.ask_value("Title of the movie: ")?.unwrap_or_default();
        let release_year = self.ask_value("Year of release: ")?.unwrap_or_default();
        let min_vote_average = self.ask_min_rate()?;
        let genre_ids = self.ask_genres()?;

        let criteria = SearchCriteria {
            title,
            release_year,
            genre_ids,
            min_vote_average,
        };
        if criteria.is_empty() {
            writeln!(
                self.out,
                "No information sent. \nPlease give me more details for your next search."
            )?;
            return Ok(());
        }

        self.refresh(&PageSource::Search(&criteria), 1).await?;
        self.page_loop(
            "\nYour list of movies found in your search: ",
            &PageSource::Search(&criteria),
        )
        .await
    }

    /// Empty input means no minimum; anything else must parse as a number.
    fn ask_min_rate(&mut self) -> Result<Option<f64>> {
        loop {
            let Some(input) = self.ask_value("Movie's minimum rate: ")? else {
                return Ok(None);
            };
            let trimmed = input.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            match trimmed.parse::<f64>() {
                Ok(rate) => return Ok(Some(rate)),
                Err(_) => writeln!(self.out, "Please enter a valid rate.")?,
            }
        }
    }

    /// Optional genre filters. Names are checked against the genre table
    /// after normalization; unknown names are reported and skipped.
    fn ask_genres(&mut self) -> Result<Vec<i64>> {
        let mut ids = Vec::new();
        if !self.ask_to_confirm("Do you want to specify one or more genres?")? {
            return Ok(ids);
        }
        writeln!(self.out, "\nList of genres: \n{}", self.genres.render())?;
        loop {
            let Some(input) = self.ask_value("Enter genre name: ")? else {
                break;
            };
            match self.genres.id_for(&normalize_genre_name(&input)) {
                Some(id) => ids.push(id),
                None => writeln!(self.out, "Genre not found. Please enter a valid genre.")?,
            }
            if !self.ask_to_confirm("Do you want to add more genres?")? {
                break;
            }
        }
        Ok(ids)
    }

    /// Lists the last fetched page and prints the full record the user
    /// picks from it.
    fn details(&mut self) -> Result<()> {
        let reader = CacheReader::load(&self.cache_file)?;
        writeln!(
            self.out,
            "Below the movies from your precedent search: \n{}",
            Self::listing(&reader)
        )?;
        match reader.find_all_movies() {
            Some(movies) => {
                if let Some(movie) =
                    self.select_movie_by_index(&movies, "Enter the index of the movie: ")?
                {
                    writeln!(self.out, "{}", movie.details())?;
                }
            }
            None => writeln!(self.out, "There was no movie.")?,
        }
        Ok(())
    }

    /// Asks for a 1-based index until it lands on a record. `None` when
    /// the input runs out before a valid pick.
    fn select_movie_by_index(
        &mut self,
        movies: &Movies,
        message: &str,
    ) -> Result<Option<Movie>> {
        loop {
            let Some(input) = self.ask_value(message)? else {
                return Ok(None);
            };
            match input.trim().parse::<usize>() {
                Ok(index) => match movies.find_by_index(index) {
                    Ok(movie) => return Ok(Some(movie.clone())),
                    Err(e) => writeln!(self.out, "{e}")?,
                },
                Err(_) => writeln!(self.out, "Please enter a valid index.")?,
            }
        }
    }

    /// The add command: run a search, pick from the resulting page, store
    /// the pick, repeat on request, then show the updated list.
    async fn add(&mut self) -> Result<()> {
        loop {
            self.search().await?;
            let reader = CacheReader::load(&self.cache_file)?;
            if let Some(found) = reader.find_all_movies() {
                let selection = if found.len() > 1 {
                    self.select_movie_by_index(
                        &found,
                        "Index of the movie to add to your favorites: ",
                    )?
                } else {
                    found.find_by_index(1).ok().cloned()
                };
                if let Some(movie) = selection {
                    self.favorites.add(&Movies::single(movie))?;
                }
            }
            if !self.ask_to_confirm("Do you want to add another movie?")? {
                break;
            }
        }
        self.print_favorites_update()
    }

    /// The remove command works on the favorites list alone: filter it by
    /// title and year, pick when several match, repeat on request.
    fn remove(&mut self) -> Result<()> {
        loop {
            if self.favorites.is_empty() {
                break;
            }
            writeln!(self.out, "Your actual favorites list: ")?;
            writeln!(self.out, "{}", self.favorites)?;
            let title = self
                .ask_value("Title of the movie to remove: ")?
                .unwrap_or_default();
            let release_year = self.ask_value("Year of release: ")?.unwrap_or_default();
            let found = self.favorites.find_movies(&SearchCriteria {
                title,
                release_year,
                ..SearchCriteria::default()
            });
            if !found.is_empty() {
                let selection = if found.len() > 1 {
                    self.select_movie_by_index(
                        &found,
                        "Index of the movie to remove from your favorites: ",
                    )?
                } else {
                    found.find_by_index(1).ok().cloned()
                };
                if let Some(movie) = selection {
                    self.favorites.remove(&Movies::single(movie))?;
                }
            }
            if !self.ask_to_confirm("Do you want to remove another movie?")? {
                break;
            }
        }
        self.print_favorites_update()
    }

    fn show_favorites(&mut self) -> Result<()> {
        writeln!(self.out, "{}", self.favorites)?;
        Ok(())
    }

    fn clear_favorites(&mut self) -> Result<()> {
        if self.ask_to_confirm("Are you sure that you want to delete your favourites?")? {
            self.favorites.clear()?;
            writeln!(self.out, "Your favorite list has been cleared.")?;
        }
        Ok(())
    }

    fn print_favorites_update(&mut self) -> Result<()> {
        writeln!(self.out, "\nYour favorites list updated: ")?;
        writeln!(self.out, "{}", self.favorites)?;
        Ok(())
    }
}
