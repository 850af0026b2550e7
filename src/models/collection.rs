use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::movie::MovieRecord;

/// The baked dataset as written by `build-dataset`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieCollection {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stats: DatasetStats,
    #[serde(default)]
    pub movies: Vec<MovieRecord>,
}

impl MovieCollection {
    /// Wraps a finished set of records, computing aggregate statistics once
    pub fn new(movies: Vec<MovieRecord>, generated_at: DateTime<Utc>) -> Self {
        Self {
            count: movies.len(),
            generated_at: Some(generated_at),
            stats: DatasetStats::compute(&movies),
            movies,
        }
    }
}

/// Id, title and year of a movie, for places that only need a reference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub id: i64,
    pub title: String,
    pub release_year: Option<i32>,
}

impl From<&MovieRecord> for MovieSummary {
    fn from(movie: &MovieRecord) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            release_year: movie.release_year,
        }
    }
}

/// Aggregates computed at dataset-build time
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DatasetStats {
    #[serde(default)]
    pub avg_rating: f64,
    #[serde(default)]
    pub oldest_movie: Option<MovieSummary>,
    #[serde(default)]
    pub newest_movie: Option<MovieSummary>,
    /// Sum of known runtimes, in minutes
    #[serde(default)]
    pub total_runtime: u64,
}

impl DatasetStats {
    pub fn compute(movies: &[MovieRecord]) -> Self {
        if movies.is_empty() {
            return Self::default();
        }

        let total: f64 = movies.iter().map(|m| m.vote_average).sum();
        let avg_rating = (total / movies.len() as f64 * 100.0).round() / 100.0;

        // First wins on equal years, so the result is stable for a given order.
        let mut oldest: Option<&MovieRecord> = None;
        let mut newest: Option<&MovieRecord> = None;
        for movie in movies {
            let Some(year) = movie.release_year else {
                continue;
            };
            if oldest.map_or(true, |o| year < o.release_year.unwrap_or(i32::MAX)) {
                oldest = Some(movie);
            }
            if newest.map_or(true, |n| year > n.release_year.unwrap_or(i32::MIN)) {
                newest = Some(movie);
            }
        }

        Self {
            avg_rating,
            oldest_movie: oldest.map(MovieSummary::from),
            newest_movie: newest.map(MovieSummary::from),
            total_runtime: movies.iter().filter_map(|m| m.runtime).map(u64::from).sum(),
        }
    }
}

/// Number of movies carrying a given mood tag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoodCount {
    pub tag: String,
    pub count: usize,
}
