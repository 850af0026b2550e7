//! Mood matching and ranking over an in-memory movie list
//!
//! Everything here is a pure function over borrowed records. Callers that
//! want memoized views go through [`crate::services::dataset::MovieStore`].

use std::collections::{BTreeMap, HashSet};

use crate::models::{MoodCount, MoodDefinition, MovieRecord};

/// Stage of the cascading fill that selected a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    MoodTag,
    Keyword,
    Genre,
    Popularity,
}

impl Tier {
    const ORDER: [Tier; 4] = [Tier::MoodTag, Tier::Keyword, Tier::Genre, Tier::Popularity];

    fn matches(&self, movie: &MovieRecord, criteria: &MoodCriteria) -> bool {
        match self {
            Tier::MoodTag => movie
                .mood_tags()
                .iter()
                .any(|tag| criteria.matches_text(&tag.to_lowercase())),
            Tier::Keyword => movie.keywords.iter().any(|k| {
                let name = k.name.to_lowercase();
                criteria.stems.iter().any(|stem| name.contains(stem))
            }),
            Tier::Genre => criteria.genres.iter().any(|g| movie.has_genre(g)),
            Tier::Popularity => true,
        }
    }
}

/// Lower-cased view of a mood definition, built once per call
struct MoodCriteria<'d> {
    label: String,
    stems: &'d [&'static str],
    genres: &'d [&'static str],
}

impl<'d> MoodCriteria<'d> {
    fn new(mood: &'d MoodDefinition) -> Self {
        Self {
            label: mood.label.to_lowercase(),
            stems: mood.keywords,
            genres: mood.genres,
        }
    }

    /// Plain substring containment: "untense" matches the stem "tense"
    fn matches_text(&self, lowered: &str) -> bool {
        (!self.label.is_empty() && lowered.contains(self.label.as_str()))
            || self.stems.iter().any(|stem| lowered.contains(stem))
    }
}

/// Ranks movies for a mood, best first, at most `limit` long, no repeated ids
///
/// Tiers fill greedily in order: AI mood tags, TMDb keywords, genres, then
/// raw popularity. Each tier only sees records no earlier tier selected and
/// is sorted by `score_percent` descending (stable). Evaluation stops as soon
/// as `limit` records are collected.
pub fn recommend<'a>(
    movies: &'a [MovieRecord],
    mood: &MoodDefinition,
    limit: usize,
) -> Vec<&'a MovieRecord> {
    recommend_with_tiers(movies, mood, limit)
        .into_iter()
        .map(|(movie, _)| movie)
        .collect()
}

/// As [`recommend`], keeping the tier each record came from
pub fn recommend_with_tiers<'a>(
    movies: &'a [MovieRecord],
    mood: &MoodDefinition,
    limit: usize,
) -> Vec<(&'a MovieRecord, Tier)> {
    let criteria = MoodCriteria::new(mood);
    let mut selected: Vec<(&MovieRecord, Tier)> = Vec::with_capacity(limit.min(movies.len()));
    let mut seen: HashSet<i64> = HashSet::new();

    for tier in Tier::ORDER {
        if selected.len() >= limit {
            break;
        }

        let mut candidates: Vec<&MovieRecord> = movies
            .iter()
            .filter(|m| !seen.contains(&m.id) && tier.matches(m, &criteria))
            .collect();
        sort_by_score(&mut candidates);

        for movie in candidates {
            if selected.len() >= limit {
                break;
            }
            if seen.insert(movie.id) {
                selected.push((movie, tier));
            }
        }

        tracing::trace!(mood = mood.id, tier = ?tier, selected = selected.len(), "Tier filled");
    }

    selected
}

/// Highest `score_percent` first, ignoring mood entirely
pub fn recommend_popular(movies: &[MovieRecord], limit: usize) -> Vec<&MovieRecord> {
    let mut ranked: Vec<&MovieRecord> = movies.iter().collect();
    sort_by_score(&mut ranked);

    let mut seen = HashSet::new();
    ranked
        .into_iter()
        .filter(|m| seen.insert(m.id))
        .take(limit)
        .collect()
}

/// Stable sort by `score_percent`, highest first
pub fn sort_by_score(movies: &mut [&MovieRecord]) {
    movies.sort_by(|a, b| b.score_percent.cmp(&a.score_percent));
}

/// Indices of every movie under each lower-cased mood tag it carries
///
/// A movie appears once per distinct tag, and a repeated id only under its
/// first occurrence. Each group is ordered by `vote_average` descending.
pub fn group_indices_by_mood_tag(movies: &[MovieRecord]) -> BTreeMap<String, Vec<usize>> {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut seen: HashSet<i64> = HashSet::new();

    for (idx, movie) in movies.iter().enumerate() {
        if !seen.insert(movie.id) {
            continue;
        }
        let tags: HashSet<String> = movie.mood_tags().iter().map(|t| t.to_lowercase()).collect();
        for tag in tags {
            groups.entry(tag).or_default().push(idx);
        }
    }

    for indices in groups.values_mut() {
        indices.sort_by(|&a, &b| movies[b].vote_average.total_cmp(&movies[a].vote_average));
    }

    groups
}

/// Movies grouped under every mood tag present in the dataset
pub fn group_by_mood_tags(movies: &[MovieRecord]) -> BTreeMap<String, Vec<&MovieRecord>> {
    group_indices_by_mood_tag(movies)
        .into_iter()
        .map(|(tag, indices)| (tag, indices.into_iter().map(|i| &movies[i]).collect()))
        .collect()
}

/// Distinct lower-cased mood tags, ascending
pub fn mood_tags(movies: &[MovieRecord]) -> Vec<String> {
    group_indices_by_mood_tag(movies).into_keys().collect()
}

/// Most common mood tags; ties go to the alphabetically first tag
pub fn top_moods<'t, I>(groups: I, limit: usize) -> Vec<MoodCount>
where
    I: IntoIterator<Item = (&'t String, usize)>,
{
    let mut counts: Vec<MoodCount> = groups
        .into_iter()
        .map(|(tag, count)| MoodCount {
            tag: tag.clone(),
            count,
        })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    counts.truncate(limit);
    counts
}

/// Movies sharing genres or mood tags with `target`, most overlap first
pub fn similar_movies<'a>(
    movies: &'a [MovieRecord],
    target: &MovieRecord,
    limit: usize,
) -> Vec<&'a MovieRecord> {
    let target_genres: HashSet<&str> = target.genres.iter().map(|g| g.name.as_str()).collect();
    let target_tags: HashSet<String> = target.mood_tags().iter().map(|t| t.to_lowercase()).collect();

    let mut scored: Vec<(usize, &MovieRecord)> = movies
        .iter()
        .filter(|m| m.id != target.id)
        .filter_map(|m| {
            let shared_genres = m
                .genres
                .iter()
                .filter(|g| target_genres.contains(g.name.as_str()))
                .count();
            let shared_tags = m
                .mood_tags()
                .iter()
                .map(|t| t.to_lowercase())
                .collect::<HashSet<_>>()
                .intersection(&target_tags)
                .count();
            let overlap = shared_genres + shared_tags;
            (overlap > 0).then_some((overlap, m))
        })
        .collect();

    scored.sort_by(|(oa, a), (ob, b)| ob.cmp(oa).then_with(|| b.score_percent.cmp(&a.score_percent)));

    let mut seen = HashSet::new();
    scored
        .into_iter()
        .map(|(_, m)| m)
        .filter(|m| seen.insert(m.id))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Mood, MoodKey};

    fn movie(json: serde_json::Value) -> MovieRecord {
        serde_json::from_value(json).unwrap()
    }

    fn ids(movies: &[&MovieRecord]) -> Vec<i64> {
        movies.iter().map(|m| m.id).collect()
    }

    /// A: tagged "uplifting"; B: comedy only; C: nothing but a high score
    fn scenario_fixture() -> Vec<MovieRecord> {
        vec![
            movie(serde_json::json!({"id": 1, "title": "A", "mood_tags": ["uplifting"], "score_percent": 90})),
            movie(serde_json::json!({"id": 2, "title": "B", "genres": [{"id": 35, "name": "Comedy"}], "score_percent": 95})),
            movie(serde_json::json!({"id": 3, "title": "C", "score_percent": 99})),
        ]
    }

    const NOWHERE: MoodDefinition = MoodDefinition {
        id: "nowhere",
        label: "Nowhere",
        emoji: "",
        keywords: &["zzz-no-match"],
        genres: &["No Such Genre"],
    };

    #[test]
    fn test_tier_precedence_over_score() {
        let movies = scenario_fixture();
        let result = recommend(&movies, Mood::Happy.definition(), 3);
        assert_eq!(ids(&result), vec![1, 2, 3]);
    }

    #[test]
    fn test_limit_one_takes_tag_match_only() {
        let movies = scenario_fixture();
        let result = recommend(&movies, Mood::Happy.definition(), 1);
        assert_eq!(ids(&result), vec![1]);
    }

    #[test]
    fn test_tiers_are_reported() {
        let movies = scenario_fixture();
        let tiers: Vec<Tier> = recommend_with_tiers(&movies, Mood::Happy.definition(), 3)
            .into_iter()
            .map(|(_, t)| t)
            .collect();
        assert_eq!(tiers, vec![Tier::MoodTag, Tier::Genre, Tier::Popularity]);
    }

    #[test]
    fn test_zero_limit_and_empty_dataset() {
        let movies = scenario_fixture();
        assert!(recommend(&movies, Mood::Happy.definition(), 0).is_empty());
        assert!(recommend(&[], Mood::Happy.definition(), 5).is_empty());
    }

    #[test]
    fn test_label_matches_mood_tag() {
        let movies = vec![
            movie(serde_json::json!({"id": 1, "mood_tags": ["Happy-go-lucky"], "score_percent": 10})),
            movie(serde_json::json!({"id": 2, "score_percent": 80})),
        ];
        let result = recommend(&movies, Mood::Happy.definition(), 2);
        assert_eq!(ids(&result), vec![1, 2]);
    }

    #[test]
    fn test_keyword_tier_uses_substring() {
        let movies = vec![
            movie(serde_json::json!({"id": 1, "keywords": [{"id": 9, "name": "Heist Movie"}], "score_percent": 40})),
            movie(serde_json::json!({"id": 2, "genres": [{"id": 28, "name": "Action"}], "score_percent": 90})),
        ];
        let result = recommend_with_tiers(&movies, Mood::Excited.definition(), 2);
        assert_eq!(result[0].0.id, 1);
        assert_eq!(result[0].1, Tier::Keyword);
        assert_eq!(result[1].1, Tier::Genre);
    }

    #[test]
    fn test_genre_tier_is_exact_match() {
        let movies = vec![movie(
            serde_json::json!({"id": 1, "genres": [{"id": 35, "name": "comedy"}], "score_percent": 50}),
        )];
        let result = recommend_with_tiers(&movies, Mood::Happy.definition(), 1);
        assert_eq!(result[0].1, Tier::Popularity);
    }

    #[test]
    fn test_each_tier_sorted_by_score() {
        let movies = vec![
            movie(serde_json::json!({"id": 1, "mood_tags": ["uplifting"], "score_percent": 50})),
            movie(serde_json::json!({"id": 2, "mood_tags": ["joyful"], "score_percent": 70})),
            movie(serde_json::json!({"id": 3, "genres": [{"name": "Family"}], "score_percent": 60})),
            movie(serde_json::json!({"id": 4, "genres": [{"name": "Comedy"}], "score_percent": 65})),
        ];
        let result = recommend(&movies, Mood::Happy.definition(), 4);
        assert_eq!(ids(&result), vec![2, 1, 4, 3]);
    }

    #[test]
    fn test_equal_scores_keep_dataset_order() {
        let movies = vec![
            movie(serde_json::json!({"id": 5, "score_percent": 70})),
            movie(serde_json::json!({"id": 6, "score_percent": 70})),
            movie(serde_json::json!({"id": 7, "score_percent": 70})),
        ];
        let result = recommend(&movies, &NOWHERE, 3);
        assert_eq!(ids(&result), vec![5, 6, 7]);
    }

    #[test]
    fn test_fallback_is_top_by_score() {
        let movies: Vec<MovieRecord> = [40, 95, 10, 77, 88]
            .iter()
            .enumerate()
            .map(|(i, s)| movie(serde_json::json!({"id": i as i64 + 1, "score_percent": s})))
            .collect();
        let result = recommend(&movies, &NOWHERE, 3);
        assert_eq!(ids(&result), vec![2, 5, 4]);
    }

    #[test]
    fn test_missing_scores_rank_last() {
        let movies = vec![
            movie(serde_json::json!({"id": 1})),
            movie(serde_json::json!({"id": 2, "vote_average": 6.1})),
            movie(serde_json::json!({"id": 3, "score_percent": 12})),
        ];
        let result = recommend(&movies, &NOWHERE, 3);
        assert_eq!(ids(&result), vec![2, 3, 1]);
    }

    #[test]
    fn test_no_duplicates_even_with_repeated_ids() {
        let movies = vec![
            movie(serde_json::json!({"id": 1, "mood_tags": ["uplifting"], "score_percent": 90})),
            movie(serde_json::json!({"id": 1, "mood_tags": ["uplifting"], "score_percent": 90})),
            movie(serde_json::json!({"id": 2, "score_percent": 10})),
        ];
        let result = recommend(&movies, Mood::Happy.definition(), 5);
        assert_eq!(ids(&result), vec![1, 2]);
    }

    #[test]
    fn test_length_is_min_of_limit_and_dataset() {
        let movies = scenario_fixture();
        for mood in Mood::all() {
            for limit in 0..6 {
                let result = recommend(&movies, mood.definition(), limit);
                assert_eq!(result.len(), limit.min(movies.len()));
                let unique: HashSet<i64> = result.iter().map(|m| m.id).collect();
                assert_eq!(unique.len(), result.len());
            }
        }
    }

    #[test]
    fn test_recommend_is_idempotent() {
        let movies = scenario_fixture();
        let first = ids(&recommend(&movies, Mood::Sad.definition(), 3));
        let second = ids(&recommend(&movies, Mood::Sad.definition(), 3));
        assert_eq!(first, second);
    }

    #[test]
    fn test_grouping_lowercases_and_sorts_by_rating() {
        let movies = vec![
            movie(serde_json::json!({"id": 1, "mood_tags": ["Heartwarming", "TENSE"], "vote_average": 6.0})),
            movie(serde_json::json!({"id": 2, "mood_tags": ["tense"], "vote_average": 8.0})),
            movie(serde_json::json!({"id": 3, "mood_tags": ["Tense", "tense"], "vote_average": 7.0})),
        ];
        let groups = group_by_mood_tags(&movies);

        assert_eq!(ids(&groups["heartwarming"]), vec![1]);
        assert_eq!(ids(&groups["tense"]), vec![2, 3, 1]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_grouping_emits_repeated_id_once() {
        let movies = vec![
            movie(serde_json::json!({"id": 7, "mood_tags": ["Eerie"], "vote_average": 7.0})),
            movie(serde_json::json!({"id": 8, "mood_tags": ["eerie"], "vote_average": 6.0})),
            movie(serde_json::json!({"id": 7, "mood_tags": ["eerie", "cold"], "vote_average": 9.0})),
        ];
        let groups = group_by_mood_tags(&movies);

        assert_eq!(ids(&groups["eerie"]), vec![7, 8]);
        assert_eq!(groups["eerie"][0].vote_average, 7.0);
        assert!(!groups.contains_key("cold"));
        assert_eq!(mood_tags(&movies), vec!["eerie"]);
    }

    #[test]
    fn test_grouping_completeness() {
        let movies = vec![
            movie(serde_json::json!({"id": 1, "mood_tags": ["Dreamy", "Bittersweet"]})),
            movie(serde_json::json!({"id": 2, "mood_tags": ["bittersweet"]})),
            movie(serde_json::json!({"id": 3})),
        ];
        let groups = group_by_mood_tags(&movies);
        for m in &movies {
            for tag in m.mood_tags() {
                assert!(groups[&tag.to_lowercase()].iter().any(|g| g.id == m.id));
            }
        }
    }

    #[test]
    fn test_mood_tags_sorted_distinct_lowercase() {
        let movies = vec![
            movie(serde_json::json!({"id": 1, "mood_tags": ["Tense", "dark"]})),
            movie(serde_json::json!({"id": 2, "mood_tags": ["tense", "Airy"]})),
        ];
        assert_eq!(mood_tags(&movies), vec!["airy", "dark", "tense"]);
    }

    #[test]
    fn test_mood_tags_empty_without_enrichment() {
        let movies = vec![movie(serde_json::json!({"id": 1})), movie(serde_json::json!({"id": 2}))];
        assert!(mood_tags(&movies).is_empty());
    }

    #[test]
    fn test_top_moods_by_count_then_tag() {
        let movies = vec![
            movie(serde_json::json!({"id": 1, "mood_tags": ["tense", "dark"]})),
            movie(serde_json::json!({"id": 2, "mood_tags": ["tense", "airy"]})),
            movie(serde_json::json!({"id": 3, "mood_tags": ["dark", "tense"]})),
        ];
        let groups = group_by_mood_tags(&movies);
        let top = top_moods(groups.iter().map(|(t, m)| (t, m.len())), 2);
        assert_eq!(
            top,
            vec![
                MoodCount { tag: "tense".to_string(), count: 3 },
                MoodCount { tag: "dark".to_string(), count: 2 },
            ]
        );
    }

    #[test]
    fn test_similar_movies_rank_by_overlap() {
        let movies = vec![
            movie(serde_json::json!({"id": 1, "genres": [{"name": "Drama"}, {"name": "Crime"}], "mood_tags": ["gritty"]})),
            movie(serde_json::json!({"id": 2, "genres": [{"name": "Drama"}], "score_percent": 90})),
            movie(serde_json::json!({"id": 3, "genres": [{"name": "Crime"}], "mood_tags": ["Gritty"], "score_percent": 50})),
            movie(serde_json::json!({"id": 4, "genres": [{"name": "Comedy"}], "score_percent": 99})),
        ];
        let result = similar_movies(&movies, &movies[0], 5);
        assert_eq!(ids(&result), vec![3, 2]);
    }
}
