use anyhow::{bail, Result};
use std::fmt;

use crate::models::Movie;

/// Rendered in place of the listing when a collection is empty. Callers
/// compare against this exact string, so it never changes shape.
pub const EMPTY_LIST_MESSAGE: &str = "Your list of movies is empty.";

/// Ordered collection of movies. Insertion order is display order, and
/// duplicates by id are allowed; operations that need id uniqueness (the
/// favorites store) enforce it themselves.
#[derive(Debug, Clone, Default)]
pub struct Movies {
    entries: Vec<Movie>,
}

/// The four search filters. An empty field puts no constraint on the
/// result, so the default value matches every record.
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    pub title: String,
    pub release_year: String,
    pub genre_ids: Vec<i64>,
    pub min_vote_average: Option<f64>,
}

impl SearchCriteria {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.release_year.is_empty()
            && self.genre_ids.is_empty()
            && self.min_vote_average.is_none()
    }
}

impl Movies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<Movie>) -> Self {
        Self { entries }
    }

    pub fn single(movie: Movie) -> Self {
        Self {
            entries: vec![movie],
        }
    }

    /// Appends a record; an absent record is ignored.
    pub fn add(&mut self, movie: Option<Movie>) {
        if let Some(movie) = movie {
            self.entries.push(movie);
        }
    }

    /// Appends every record of `other`, keeping its order.
    pub fn add_all(&mut self, other: &Movies) {
        self.entries.extend(other.entries.iter().cloned());
    }

    /// Looks up a record by the 1-based index shown to the user.
    pub fn find_by_index(&self, index: usize) -> Result<&Movie> {
        if index == 0 || index > self.entries.len() {
            bail!(
                "no movie at index {} (the list has {} entries)",
                index,
                self.entries.len()
            );
        }
        Ok(&self.entries[index - 1])
    }

    /// Returns a new collection holding every record that matches all four
    /// criteria. Filtering never mutates the source, so results already
    /// shown to the caller stay valid across repeated searches.
    pub fn find_by_criteria(&self, criteria: &SearchCriteria) -> Movies {
        let entries = self
            .entries
            .iter()
            .filter(|movie| {
                movie.matches_title(&criteria.title)
                    && movie.matches_release_year(&criteria.release_year)
                    && (criteria.genre_ids.is_empty()
                        || movie
                            .genre_ids
                            .iter()
                            .any(|id| criteria.genre_ids.contains(id)))
                    && criteria
                        .min_vote_average
                        .map_or(true, |min| movie.vote_average >= min)
            })
            .cloned()
            .collect();
        Movies { entries }
    }

    pub fn contains_id(&self, id: i64) -> bool {
        self.entries.iter().any(|movie| movie.id == id)
    }

    /// Drops every record whose id appears in `other`; returns the number
    /// of records removed.
    pub fn remove_all(&mut self, other: &Movies) -> usize {
        let before = self.entries.len();
        self.entries.retain(|movie| !other.contains_id(movie.id));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Movie> {
        self.entries.iter()
    }

    /// Like the `Display` rendering but with the catalog id on each line.
    pub fn render_with_id(&self) -> String {
        if self.entries.is_empty() {
            return EMPTY_LIST_MESSAGE.to_string();
        }
        let mut out = String::new();
        for movie in &self.entries {
            out.push_str(&movie.line_with_id());
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Movies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return f.write_str(EMPTY_LIST_MESSAGE);
        }
        for movie in &self.entries {
            writeln!(f, "{}", movie)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: i64, title: &str, release_date: &str, vote: f64, genres: &[i64]) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            original_title: title.to_string(),
            release_date: release_date.to_string(),
            genre_ids: genres.to_vec(),
            vote_average: vote,
            vote_count: 10,
            overview: String::new(),
            poster_path: String::new(),
            backdrop_path: String::new(),
            adult: false,
            video: false,
            popularity: 1.0,
        }
    }

    fn sample() -> Movies {
        Movies::from_entries(vec![
            movie(1, "Monkeyshines, No. 1", "1890-11-21", 6.8, &[99]),
            movie(2, "Monkeyshines, No. 2", "1890-11-21", 6.3, &[99]),
            movie(3, "Blacksmith Scene", "1893-05-09", 6.2, &[99, 36]),
            movie(4, "Escrime", "1891-01-01", 5.2, &[99]),
        ])
    }

    #[test]
    fn renders_the_placeholder_when_empty() {
        let movies = Movies::new();
        assert_eq!(movies.to_string(), EMPTY_LIST_MESSAGE);
        assert_eq!(movies.render_with_id(), EMPTY_LIST_MESSAGE);
    }

    #[test]
    fn renders_one_line_per_record_in_insertion_order() {
        let a = movie(2, "Second", "2023", 1.0, &[]);
        let b = movie(1, "First", "2023", 2.0, &[]);
        let mut movies = Movies::new();
        movies.add(Some(a.clone()));
        movies.add(Some(b.clone()));
        assert_eq!(movies.to_string(), format!("{}\n{}\n", a, b));
        assert_eq!(
            movies.render_with_id(),
            format!("{}\n{}\n", a.line_with_id(), b.line_with_id())
        );
    }

    #[test]
    fn absent_record_add_is_a_no_op() {
        let mut movies = sample();
        let rendered = movies.to_string();
        movies.add(None);
        assert_eq!(movies.to_string(), rendered);
        assert_eq!(movies.len(), 4);
    }

    #[test]
    fn add_all_appends_in_order() {
        let mut movies = Movies::single(movie(10, "Head", "2000", 5.0, &[]));
        movies.add_all(&sample());
        assert_eq!(movies.len(), 5);
        let titles: Vec<_> = movies.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles[0], "Head");
        assert_eq!(titles[1], "Monkeyshines, No. 1");
        assert_eq!(titles[4], "Escrime");
    }

    #[test]
    fn index_lookup_is_one_based() {
        let movies = sample();
        assert_eq!(movies.find_by_index(1).unwrap().title, "Monkeyshines, No. 1");
        assert_eq!(movies.find_by_index(4).unwrap().title, "Escrime");
        assert!(movies.find_by_index(0).is_err());
        assert!(movies.find_by_index(5).is_err());
    }

    #[test]
    fn all_empty_criteria_returns_same_size_and_order() {
        let movies = sample();
        let found = movies.find_by_criteria(&SearchCriteria::default());
        assert_eq!(found.len(), movies.len());
        let titles: Vec<_> = found.iter().map(|m| m.title.as_str()).collect();
        let expected: Vec<_> = movies.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, expected);
    }

    #[test]
    fn min_vote_filter_keeps_only_records_at_or_above_the_bound() {
        let movies = sample();
        let found = movies.find_by_criteria(&SearchCriteria {
            min_vote_average: Some(6.3),
            ..SearchCriteria::default()
        });
        assert_eq!(found.len(), 2);
        for m in found.iter() {
            assert!(m.vote_average >= 6.3);
        }
    }

    #[test]
    fn genre_filter_matches_on_set_intersection() {
        let movies = sample();
        let found = movies.find_by_criteria(&SearchCriteria {
            genre_ids: vec![36, 12],
            ..SearchCriteria::default()
        });
        assert_eq!(found.len(), 1);
        assert_eq!(found.find_by_index(1).unwrap().title, "Blacksmith Scene");
    }

    #[test]
    fn criteria_are_combined_with_and() {
        let movies = sample();
        let found = movies.find_by_criteria(&SearchCriteria {
            title: "Monkeyshines".to_string(),
            release_year: "1890".to_string(),
            min_vote_average: Some(6.5),
            ..SearchCriteria::default()
        });
        assert_eq!(found.len(), 1);
        assert_eq!(found.find_by_index(1).unwrap().title, "Monkeyshines, No. 1");
    }

    #[test]
    fn no_match_yields_an_empty_collection_not_an_error() {
        let movies = sample();
        let found = movies.find_by_criteria(&SearchCriteria {
            title: "Arrival of a Train".to_string(),
            ..SearchCriteria::default()
        });
        assert!(found.is_empty());
        assert_eq!(found.to_string(), EMPTY_LIST_MESSAGE);
    }

    #[test]
    fn remove_all_drops_records_by_id_only() {
        let mut movies = sample();
        // Same id, different title: identity is the id.
        let doppelganger = movie(4, "Fencing, renamed", "1900", 9.9, &[]);
        let removed = movies.remove_all(&Movies::single(doppelganger));
        assert_eq!(removed, 1);
        assert!(!movies.contains_id(4));
        assert_eq!(movies.len(), 3);
    }

    #[test]
    fn removing_an_absent_id_changes_nothing() {
        let mut movies = sample();
        let removed = movies.remove_all(&Movies::single(movie(99, "Ghost", "1900", 1.0, &[])));
        assert_eq!(removed, 0);
        assert_eq!(movies.len(), 4);
    }
}
