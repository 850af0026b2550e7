/// Movie metadata provider abstraction
///
/// The live discovery route, the chat tool and the dataset build pipeline all
/// reach TMDb through this trait, so tests can substitute a mock.
use crate::{
    error::AppResult,
    models::{DiscoverQuery, MoviePage, TmdbMovieDetails},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieProvider: Send + Sync {
    /// Filtered discovery; the query is forwarded as-is
    async fn discover(&self, query: &DiscoverQuery) -> AppResult<MoviePage>;

    /// Full details for one movie, with credits, videos, keywords and
    /// certifications appended
    async fn movie_details(&self, id: i64) -> AppResult<TmdbMovieDetails>;

    /// One page of the top-rated listing
    async fn top_rated(&self, page: u32) -> AppResult<MoviePage>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
