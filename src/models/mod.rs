use serde::{Deserialize, Serialize};

pub mod collection;
pub mod mood;
pub mod movie;

pub use collection::{DatasetStats, MoodCount, MovieCollection, MovieSummary};
pub use mood::{LabeledMood, Mood, MoodDefinition, MoodKey};
pub use movie::{CastMember, Era, Genre, Keyword, MovieRecord, Person};

use movie::{image_url, score_percent_from_vote, trailer_url, year_from_date, BACKDROP_SIZE, POSTER_SIZE};

const MAX_CAST: usize = 10;
const MAX_KEYWORDS: usize = 10;
const CERTIFICATION_COUNTRY: &str = "US";

// ============================================================================
// TMDb API Types
// ============================================================================

/// Filters accepted by TMDb `/discover/movie`
///
/// Field names on the way in use underscores (query strings, tool-call
/// arguments); on the way out they are renamed to TMDb's dotted parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiscoverQuery {
    /// Comma-separated genre ids (`,` = AND, `|` = OR)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_genres: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub without_genres: Option<String>,

    /// Comma-separated keyword ids or free text, as the caller supplied it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_keywords: Option<String>,

    #[serde(
        default,
        rename(serialize = "vote_average.gte"),
        skip_serializing_if = "Option::is_none"
    )]
    pub vote_average_gte: Option<f64>,

    #[serde(
        default,
        rename(serialize = "vote_count.gte"),
        skip_serializing_if = "Option::is_none"
    )]
    pub vote_count_gte: Option<u32>,

    #[serde(
        default,
        rename(serialize = "primary_release_date.gte"),
        skip_serializing_if = "Option::is_none"
    )]
    pub release_date_gte: Option<String>,

    #[serde(
        default,
        rename(serialize = "primary_release_date.lte"),
        skip_serializing_if = "Option::is_none"
    )]
    pub release_date_lte: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_release_year: Option<i32>,

    /// e.g. `popularity.desc`, `vote_average.desc`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_original_language: Option<String>,

    #[serde(
        default,
        rename(serialize = "with_runtime.gte"),
        skip_serializing_if = "Option::is_none"
    )]
    pub with_runtime_gte: Option<u32>,

    #[serde(
        default,
        rename(serialize = "with_runtime.lte"),
        skip_serializing_if = "Option::is_none"
    )]
    pub with_runtime_lte: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_adult: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl DiscoverQuery {
    /// Stable textual form used as a cache key
    pub fn cache_fragment(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Movie summary as returned by discover/search/top-rated listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbMovieSummary {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u32,
    #[serde(default)]
    pub popularity: f64,
    /// Unresolved genre ids; listings do not carry genre names
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub original_language: Option<String>,
}

/// One page of a TMDb listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoviePage {
    pub page: u32,
    pub results: Vec<TmdbMovieSummary>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

/// Response from GET /movie/{id} with credits, videos, keywords and
/// release dates appended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbMovieDetails {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u32,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub credits: Option<TmdbCredits>,
    #[serde(default)]
    pub videos: Option<TmdbVideos>,
    #[serde(default)]
    pub keywords: Option<TmdbKeywords>,
    #[serde(default)]
    pub release_dates: Option<TmdbReleaseDates>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<TmdbCastMember>,
    #[serde(default)]
    pub crew: Vec<TmdbCrewMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbCastMember {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbCrewMember {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub job: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TmdbVideos {
    #[serde(default)]
    pub results: Vec<TmdbVideo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbVideo {
    pub key: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
    #[serde(default)]
    pub official: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TmdbKeywords {
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TmdbReleaseDates {
    #[serde(default)]
    pub results: Vec<TmdbCountryReleases>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbCountryReleases {
    pub iso_3166_1: String,
    #[serde(default)]
    pub release_dates: Vec<TmdbReleaseDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbReleaseDate {
    #[serde(default)]
    pub certification: String,
}

impl TmdbMovieDetails {
    /// YouTube key of the best trailer: official trailers first, then any trailer
    fn trailer_key(&self) -> Option<&str> {
        let videos = self.videos.as_ref()?;
        let trailers = || {
            videos
                .results
                .iter()
                .filter(|v| v.site == "YouTube" && v.video_type == "Trailer")
        };
        trailers()
            .find(|v| v.official)
            .or_else(|| trailers().next())
            .map(|v| v.key.as_str())
    }

    fn certification(&self) -> Option<String> {
        self.release_dates
            .as_ref()?
            .results
            .iter()
            .find(|r| r.iso_3166_1 == CERTIFICATION_COUNTRY)?
            .release_dates
            .iter()
            .map(|d| d.certification.trim())
            .find(|c| !c.is_empty())
            .map(str::to_string)
    }
}

impl From<TmdbMovieDetails> for MovieRecord {
    fn from(details: TmdbMovieDetails) -> Self {
        let release_year = year_from_date(details.release_date.as_deref());
        let trailer = details.trailer_key().and_then(trailer_url);
        let certification = details.certification();

        let credits = details.credits.unwrap_or_default();
        let mut cast = credits.cast;
        cast.sort_by_key(|c| c.order);
        let cast = cast
            .into_iter()
            .take(MAX_CAST)
            .map(|c| CastMember {
                id: c.id,
                name: c.name,
                character: c.character,
            })
            .collect();
        let directors = credits
            .crew
            .into_iter()
            .filter(|c| c.job == "Director")
            .map(|c| Person { id: c.id, name: c.name })
            .collect();

        let keywords = details
            .keywords
            .map(|k| k.keywords.into_iter().take(MAX_KEYWORDS).collect())
            .unwrap_or_default();

        MovieRecord {
            id: details.id,
            original_title: details
                .original_title
                .unwrap_or_else(|| details.title.clone()),
            title: details.title,
            overview: details.overview.unwrap_or_default(),
            release_date: details.release_date,
            release_year,
            genres: details.genres,
            keywords,
            vote_average: details.vote_average,
            vote_count: details.vote_count,
            score_percent: score_percent_from_vote(details.vote_average),
            poster_url: details
                .poster_path
                .as_deref()
                .and_then(|p| image_url(p, POSTER_SIZE)),
            backdrop_url: details
                .backdrop_path
                .as_deref()
                .and_then(|p| image_url(p, BACKDROP_SIZE)),
            trailer_url: trailer,
            cast,
            directors,
            ai_review: None,
            mood_tags: None,
            watch_suggestion: None,
            era: Era::from_year(release_year),
            runtime: details.runtime,
            certification,
            original_language: details.original_language,
            tagline: details.tagline.filter(|t| !t.is_empty()),
        }
    }
}
