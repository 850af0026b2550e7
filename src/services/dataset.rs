use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::OnceLock;

use crate::{
    error::{AppError, AppResult},
    models::{DatasetStats, Era, MoodCount, MoodDefinition, MovieCollection, MovieRecord},
    services::recommendations,
};

/// Read-only access to the baked dataset
///
/// Loaded once per process. The tag list and the tag grouping are computed on
/// first use and kept for the lifetime of the store; there is no reload.
pub struct MovieStore {
    collection: MovieCollection,
    by_id: HashMap<i64, usize>,
    mood_tags: OnceLock<Vec<String>>,
    mood_groups: OnceLock<BTreeMap<String, Vec<usize>>>,
}

impl MovieStore {
    /// Reads and parses the dataset file
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let collection: MovieCollection = serde_json::from_str(&raw)?;

        if collection.count != 0 && collection.count != collection.movies.len() {
            tracing::warn!(
                declared = collection.count,
                actual = collection.movies.len(),
                "Dataset count does not match number of movies"
            );
        }

        tracing::info!(
            path = %path.display(),
            movies = collection.movies.len(),
            generated_at = ?collection.generated_at,
            "Loaded movie dataset"
        );

        Ok(Self::from_collection(collection))
    }

    pub fn from_collection(collection: MovieCollection) -> Self {
        // First occurrence wins when an id repeats.
        let mut by_id = HashMap::with_capacity(collection.movies.len());
        for (idx, movie) in collection.movies.iter().enumerate() {
            by_id.entry(movie.id).or_insert(idx);
        }

        Self {
            collection,
            by_id,
            mood_tags: OnceLock::new(),
            mood_groups: OnceLock::new(),
        }
    }

    pub fn from_movies(movies: Vec<MovieRecord>) -> Self {
        Self::from_collection(MovieCollection::new(movies, chrono::Utc::now()))
    }

    pub fn movies(&self) -> &[MovieRecord] {
        &self.collection.movies
    }

    pub fn collection(&self) -> &MovieCollection {
        &self.collection
    }

    pub fn stats(&self) -> &DatasetStats {
        &self.collection.stats
    }

    pub fn len(&self) -> usize {
        self.collection.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.movies.is_empty()
    }

    pub fn movie(&self, id: i64) -> Option<&MovieRecord> {
        self.by_id.get(&id).map(|&idx| &self.collection.movies[idx])
    }

    /// Ranked movies for a mood; see [`recommendations::recommend`]
    pub fn recommend(&self, mood: &MoodDefinition, limit: usize) -> Vec<&MovieRecord> {
        let result = recommendations::recommend(self.movies(), mood, limit);
        tracing::debug!(mood = mood.id, limit, returned = result.len(), "Recommendations computed");
        result
    }

    /// Distinct lower-cased mood tags present in the dataset, ascending
    pub fn mood_tags(&self) -> &[String] {
        self.mood_tags
            .get_or_init(|| recommendations::mood_tags(self.movies()))
    }

    fn mood_groups(&self) -> &BTreeMap<String, Vec<usize>> {
        self.mood_groups
            .get_or_init(|| recommendations::group_indices_by_mood_tag(self.movies()))
    }

    /// Every movie under each of its mood tags, groups ordered by rating
    pub fn group_by_mood_tags(&self) -> BTreeMap<&str, Vec<&MovieRecord>> {
        self.mood_groups()
            .iter()
            .map(|(tag, indices)| (tag.as_str(), self.resolve(indices)))
            .collect()
    }

    /// Movies carrying one mood tag (case-insensitive), ordered by rating
    pub fn movies_with_mood_tag(&self, tag: &str) -> AppResult<Vec<&MovieRecord>> {
        self.mood_groups()
            .get(&tag.trim().to_lowercase())
            .map(|indices| self.resolve(indices))
            .ok_or_else(|| AppError::NotFound(format!("No movies tagged '{}'", tag)))
    }

    /// Mood tags by number of movies carrying them
    pub fn top_moods(&self, limit: usize) -> Vec<MoodCount> {
        recommendations::top_moods(
            self.mood_groups().iter().map(|(tag, indices)| (tag, indices.len())),
            limit,
        )
    }

    pub fn movies_by_genre(&self, genre: &str) -> Vec<&MovieRecord> {
        let wanted = genre.trim().to_lowercase();
        let mut movies: Vec<&MovieRecord> = self
            .movies()
            .iter()
            .filter(|m| m.genres.iter().any(|g| g.name.to_lowercase() == wanted))
            .collect();
        recommendations::sort_by_score(&mut movies);
        movies
    }

    pub fn movies_by_era(&self, era: Era) -> Vec<&MovieRecord> {
        let mut movies: Vec<&MovieRecord> =
            self.movies().iter().filter(|m| m.era == era).collect();
        recommendations::sort_by_score(&mut movies);
        movies
    }

    /// Case-insensitive substring search over title and original title
    pub fn search(&self, query: &str, limit: usize) -> AppResult<Vec<&MovieRecord>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let mut movies: Vec<&MovieRecord> = self
            .movies()
            .iter()
            .filter(|m| {
                m.title.to_lowercase().contains(&query)
                    || m.original_title.to_lowercase().contains(&query)
            })
            .collect();
        recommendations::sort_by_score(&mut movies);
        movies.truncate(limit);
        Ok(movies)
    }

    pub fn similar_movies(&self, id: i64, limit: usize) -> AppResult<Vec<&MovieRecord>> {
        let target = self
            .movie(id)
            .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", id)))?;
        Ok(recommendations::similar_movies(self.movies(), target, limit))
    }

    pub fn top_rated(&self, limit: usize) -> Vec<&MovieRecord> {
        recommendations::recommend_popular(self.movies(), limit)
    }

    fn resolve(&self, indices: &[usize]) -> Vec<&MovieRecord> {
        indices.iter().map(|&i| &self.collection.movies[i]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Mood, MoodKey};
    use std::io::Write;

    fn store() -> MovieStore {
        let movies: Vec<MovieRecord> = serde_json::from_value(serde_json::json!([
            {"id": 1, "title": "Amélie", "original_title": "Le Fabuleux Destin d'Amélie Poulain",
             "release_year": 2001, "genres": [{"id": 35, "name": "Comedy"}, {"id": 10749, "name": "Romance"}],
             "mood_tags": ["Whimsical", "Heartwarming", "Dreamy", "Quirky", "Uplifting"], "vote_average": 7.9},
            {"id": 2, "title": "Se7en", "release_year": 1995, "genres": [{"id": 80, "name": "Crime"}],
             "mood_tags": ["Dark", "Tense", "Gritty", "Bleak", "Haunting"], "vote_average": 8.4},
            {"id": 3, "title": "Casablanca", "release_year": 1942, "genres": [{"id": 10749, "name": "Romance"}],
             "vote_average": 8.2},
            {"id": 4, "title": "Heat", "release_year": 1995, "genres": [{"id": 80, "name": "Crime"}],
             "mood_tags": ["tense", "gritty", "cool", "epic", "moody"], "vote_average": 7.9}
        ]))
        .unwrap();
        MovieStore::from_movies(movies)
    }

    #[test]
    fn test_lookup_by_id() {
        let store = store();
        assert_eq!(store.movie(2).unwrap().title, "Se7en");
        assert!(store.movie(99).is_none());
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_recommend_through_store() {
        let store = store();
        let result = store.recommend(Mood::Happy.definition(), 2);
        assert_eq!(result[0].id, 1);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_mood_tags_are_memoized() {
        let store = store();
        let first = store.mood_tags().as_ptr();
        let second = store.mood_tags().as_ptr();
        assert_eq!(first, second);
        assert!(store.mood_tags().contains(&"tense".to_string()));
    }

    #[test]
    fn test_group_and_lookup_by_tag() {
        let store = store();
        let groups = store.group_by_mood_tags();
        assert_eq!(groups["tense"].iter().map(|m| m.id).collect::<Vec<_>>(), vec![2, 4]);

        let tense = store.movies_with_mood_tag("TENSE").unwrap();
        assert_eq!(tense.len(), 2);
        assert!(matches!(
            store.movies_with_mood_tag("serene"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_top_moods() {
        let store = store();
        let top = store.top_moods(2);
        assert_eq!(top[0].tag, "gritty");
        assert_eq!(top[0].count, 2);
        assert_eq!(top[1].tag, "tense");
    }

    #[test]
    fn test_filters() {
        let store = store();
        assert_eq!(store.movies_by_genre("romance").len(), 2);
        assert_eq!(store.movies_by_era(Era::Classic)[0].id, 3);
        assert_eq!(store.search("fabuleux", 10).unwrap()[0].id, 1);
        assert!(matches!(store.search("  ", 10), Err(AppError::InvalidInput(_))));
        assert_eq!(store.top_rated(1)[0].id, 2);
    }

    #[test]
    fn test_similar_movies_for_unknown_id() {
        let store = store();
        assert!(matches!(store.similar_movies(42, 3), Err(AppError::NotFound(_))));
        assert_eq!(store.similar_movies(2, 3).unwrap()[0].id, 4);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"count": 1, "generated_at": "2024-05-01T12:00:00Z", "movies": [{{"id": 10, "title": "Jaws"}}]}}"#
        )
        .unwrap();

        let store = MovieStore::load(file.path()).unwrap();
        assert_eq!(store.movie(10).unwrap().title, "Jaws");
        assert!(store.collection().generated_at.is_some());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = MovieStore::load("/definitely/not/here.json");
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn test_load_malformed_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(MovieStore::load(file.path()), Err(AppError::Json(_))));
    }
}
