use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// TMDb image CDN root; sizes are appended as a path segment
pub const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
pub const POSTER_SIZE: &str = "w500";
pub const BACKDROP_SIZE: &str = "original";
const YOUTUBE_WATCH_BASE: &str = "https://www.youtube.com/watch?v=";

/// A genre as TMDb names it; names are not unique across the dataset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Genre {
    #[serde(default)]
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Keyword {
    #[serde(default)]
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastMember {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    #[serde(default)]
    pub id: i64,
    pub name: String,
}

/// Coarse release-year bucket used for display grouping
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Era {
    Classic,
    Vintage,
    Modern,
    #[default]
    Contemporary,
}

impl Era {
    /// Buckets a release year; movies with no known year count as contemporary
    pub fn from_year(year: Option<i32>) -> Self {
        match year {
            Some(y) if y < 1950 => Era::Classic,
            Some(y) if y < 1980 => Era::Vintage,
            Some(y) if y < 2000 => Era::Modern,
            _ => Era::Contemporary,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Era::Classic => "classic",
            Era::Vintage => "vintage",
            Era::Modern => "modern",
            Era::Contemporary => "contemporary",
        }
    }
}

impl Display for Era {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Era {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "classic" => Ok(Era::Classic),
            "vintage" => Ok(Era::Vintage),
            "modern" => Ok(Era::Modern),
            "contemporary" => Ok(Era::Contemporary),
            other => Err(format!("unknown era '{}'", other)),
        }
    }
}

/// A fully enriched movie as it lives in the baked dataset
///
/// Records are deserialized through a permissive wire shape, so every collection
/// field is present (possibly empty) and every derived field is filled in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "MovieRecordWire")]
pub struct MovieRecord {
    pub id: i64,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub release_date: Option<String>,
    pub release_year: Option<i32>,
    pub genres: Vec<Genre>,
    pub keywords: Vec<Keyword>,
    pub vote_average: f64,
    pub vote_count: u32,
    pub score_percent: u8,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub trailer_url: Option<String>,
    pub cast: Vec<CastMember>,
    pub directors: Vec<Person>,
    pub ai_review: Option<String>,
    pub mood_tags: Option<Vec<String>>,
    pub watch_suggestion: Option<String>,
    pub era: Era,
    pub runtime: Option<u32>,
    pub certification: Option<String>,
    pub original_language: Option<String>,
    pub tagline: Option<String>,
}

impl MovieRecord {
    /// Mood tags, or an empty slice when enrichment never produced any
    pub fn mood_tags(&self) -> &[String] {
        self.mood_tags.as_deref().unwrap_or_default()
    }

    pub fn has_genre(&self, name: &str) -> bool {
        self.genres.iter().any(|g| g.name == name)
    }
}

/// Shape accepted on the way in: every field optional, paths or URLs
#[derive(Debug, Deserialize)]
struct MovieRecordWire {
    id: i64,
    title: Option<String>,
    original_title: Option<String>,
    overview: Option<String>,
    release_date: Option<String>,
    release_year: Option<i32>,
    genres: Option<Vec<Genre>>,
    keywords: Option<Vec<Keyword>>,
    vote_average: Option<f64>,
    vote_count: Option<u32>,
    score_percent: Option<f64>,
    poster_url: Option<String>,
    poster_path: Option<String>,
    backdrop_url: Option<String>,
    backdrop_path: Option<String>,
    trailer_url: Option<String>,
    trailer_key: Option<String>,
    cast: Option<Vec<CastMember>>,
    directors: Option<Vec<Person>>,
    ai_review: Option<String>,
    mood_tags: Option<Vec<String>>,
    watch_suggestion: Option<String>,
    era: Option<Era>,
    runtime: Option<u32>,
    certification: Option<String>,
    original_language: Option<String>,
    tagline: Option<String>,
}

impl From<MovieRecordWire> for MovieRecord {
    fn from(wire: MovieRecordWire) -> Self {
        let vote_average = wire.vote_average.unwrap_or(0.0);
        let score_percent = match wire.score_percent {
            Some(score) => score.round().clamp(0.0, 100.0) as u8,
            None => score_percent_from_vote(vote_average),
        };
        let release_year = wire
            .release_year
            .or_else(|| year_from_date(wire.release_date.as_deref()));
        let title = wire.title.unwrap_or_default();

        MovieRecord {
            id: wire.id,
            original_title: wire.original_title.unwrap_or_else(|| title.clone()),
            title,
            overview: wire.overview.unwrap_or_default(),
            release_date: wire.release_date,
            release_year,
            genres: wire.genres.unwrap_or_default(),
            keywords: wire.keywords.unwrap_or_default(),
            vote_average,
            vote_count: wire.vote_count.unwrap_or(0),
            score_percent,
            poster_url: wire
                .poster_url
                .or_else(|| wire.poster_path.as_deref().and_then(|p| image_url(p, POSTER_SIZE))),
            backdrop_url: wire.backdrop_url.or_else(|| {
                wire.backdrop_path
                    .as_deref()
                    .and_then(|p| image_url(p, BACKDROP_SIZE))
            }),
            trailer_url: wire
                .trailer_url
                .or_else(|| wire.trailer_key.as_deref().and_then(trailer_url)),
            cast: wire.cast.unwrap_or_default(),
            directors: wire.directors.unwrap_or_default(),
            ai_review: wire.ai_review,
            mood_tags: wire.mood_tags,
            watch_suggestion: wire.watch_suggestion,
            era: wire.era.unwrap_or_else(|| Era::from_year(release_year)),
            runtime: wire.runtime,
            certification: wire.certification,
            original_language: wire.original_language,
            tagline: wire.tagline,
        }
    }
}

/// `round(vote_average * 10)`, clamped to 0..=100
pub fn score_percent_from_vote(vote_average: f64) -> u8 {
    if !vote_average.is_finite() {
        return 0;
    }
    (vote_average * 10.0).round().clamp(0.0, 100.0) as u8
}

/// Leading four-digit year of an ISO date
pub fn year_from_date(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

/// Builds a CDN URL from a TMDb image path; absolute URLs pass through
pub fn image_url(path: &str, size: &str) -> Option<String> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    if path.starts_with("http://") || path.starts_with("https://") {
        return Some(path.to_string());
    }
    if path.starts_with('/') {
        Some(format!("{}/{}{}", TMDB_IMAGE_BASE, size, path))
    } else {
        Some(format!("{}/{}/{}", TMDB_IMAGE_BASE, size, path))
    }
}

/// YouTube watch URL for a video key
pub fn trailer_url(key: &str) -> Option<String> {
    let key = key.trim();
    if key.is_empty() {
        None
    } else {
        Some(format!("{}{}", YOUTUBE_WATCH_BASE, key))
    }
}
