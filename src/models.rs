use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One movie as the catalog service describes it. Field names match the
/// wire schema of a cache page, so this type deserializes straight from
/// a `results` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub original_title: String,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub release_date: String,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    pub vote_average: f64,
    pub vote_count: u32,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub overview: String,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub poster_path: String,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub backdrop_path: String,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub video: bool,
    pub popularity: f64,
}

impl Movie {
    /// Case-sensitive containment check; an empty filter matches everything.
    pub fn matches_title(&self, filter: &str) -> bool {
        filter.is_empty() || self.title.contains(filter)
    }

    /// Containment check on the release date, so a four-digit year matches
    /// any date string that contains it. An empty filter matches everything.
    pub fn matches_release_year(&self, filter: &str) -> bool {
        filter.is_empty() || self.release_date.contains(filter)
    }

    pub fn year(&self) -> &str {
        self.release_date.get(..4).unwrap_or("")
    }

    pub fn line_with_id(&self) -> String {
        format!("[{}] {}", self.id, self)
    }

    /// Long-form rendering of every attribute, used by the details command.
    pub fn details(&self) -> String {
        let genres = self
            .genre_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Title: {}\n\
             Original title: {}\n\
             Release date: {}\n\
             Genre ids: {}\n\
             Rating: {:.1}/10 ({} votes)\n\
             Popularity: {}\n\
             Adult: {}\n\
             Video: {}\n\
             Overview: {}\n\
             Poster path: {}\n\
             Backdrop path: {}\n\
             TMDB id: {}",
            self.title,
            self.original_title,
            self.release_date,
            genres,
            self.vote_average,
            self.vote_count,
            self.popularity,
            self.adult,
            self.video,
            self.overview,
            self.poster_path,
            self.backdrop_path,
            self.id,
        )
    }
}

impl fmt::Display for Movie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = match self.year() {
            "" => "unknown",
            y => y,
        };
        write!(f, "{} ({}), rating: {:.1}", self.title, year, self.vote_average)
    }
}

// The catalog sends `null` for absent text fields; the record keeps plain
// strings with empty meaning absent.
fn null_to_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(title: &str, release_date: &str) -> Movie {
        Movie {
            id: 1,
            title: title.to_string(),
            original_title: title.to_string(),
            release_date: release_date.to_string(),
            genre_ids: vec![99],
            vote_average: 6.8,
            vote_count: 90,
            overview: String::new(),
            poster_path: String::new(),
            backdrop_path: String::new(),
            adult: false,
            video: false,
            popularity: 1.4,
        }
    }

    #[test]
    fn title_match_is_case_sensitive_containment() {
        let m = movie("Monkeyshines, No. 1", "1890-11-21");
        assert!(m.matches_title("Monkeyshines"));
        assert!(m.matches_title("shines, No"));
        assert!(!m.matches_title("monkeyshines"));
    }

    #[test]
    fn empty_filters_match_everything() {
        let m = movie("Escrime", "");
        assert!(m.matches_title(""));
        assert!(m.matches_release_year(""));
    }

    #[test]
    fn release_year_match_is_containment_on_the_date() {
        let m = movie("Monkeyshines, No. 1", "1890-11-21");
        assert!(m.matches_release_year("1890"));
        assert!(m.matches_release_year("1890-11"));
        assert!(!m.matches_release_year("1891"));
    }

    #[test]
    fn year_is_the_date_prefix_and_tolerates_short_dates() {
        assert_eq!(movie("A", "1890-11-21").year(), "1890");
        assert_eq!(movie("B", "2023").year(), "2023");
        assert_eq!(movie("C", "").year(), "");
        assert_eq!(movie("D", "18").year(), "");
    }

    #[test]
    fn display_is_one_line_with_year_and_rating() {
        let m = movie("Escrime", "1890-01-01");
        assert_eq!(m.to_string(), "Escrime (1890), rating: 6.8");
        let undated = movie("Escrime", "");
        assert_eq!(undated.to_string(), "Escrime (unknown), rating: 6.8");
    }

    #[test]
    fn null_text_fields_deserialize_as_empty_strings() {
        let raw = r#"{
            "id": 243, "title": "Escrime", "original_title": "Escrime",
            "release_date": null, "genre_ids": [99], "vote_average": 5.2,
            "vote_count": 4, "overview": "Fencing.", "poster_path": null,
            "backdrop_path": null, "adult": false, "video": false,
            "popularity": 0.6
        }"#;
        let m: Movie = serde_json::from_str(raw).expect("entry should parse");
        assert_eq!(m.release_date, "");
        assert_eq!(m.poster_path, "");
        assert_eq!(m.backdrop_path, "");
        assert_eq!(m.overview, "Fencing.");
    }

    #[test]
    fn details_renders_every_attribute() {
        let m = movie("Monkeyshines, No. 1", "1890-11-21");
        let details = m.details();
        assert!(details.contains("Title: Monkeyshines, No. 1"));
        assert!(details.contains("Release date: 1890-11-21"));
        assert!(details.contains("Genre ids: 99"));
        assert!(details.contains("Rating: 6.8/10 (90 votes)"));
        assert!(details.contains("TMDB id: 1"));
    }
}
