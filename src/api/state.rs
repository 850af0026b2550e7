use std::sync::Arc;

use crate::{
    config::Config,
    services::{ChatService, MovieProvider, MovieStore},
};

const DEFAULT_LIMIT: usize = 12;
const MAX_LIMIT: usize = 50;

/// Shared application state
///
/// The store is read-only; TMDb discovery and chat are optional and their
/// routes answer 503 when the backing service is not configured.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MovieStore>,
    pub provider: Option<Arc<dyn MovieProvider>>,
    pub chat: Option<Arc<ChatService>>,
    pub default_limit: usize,
    pub max_limit: usize,
}

impl AppState {
    pub fn new(store: MovieStore) -> Self {
        Self {
            store: Arc::new(store),
            provider: None,
            chat: None,
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn MovieProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_chat(mut self, chat: Arc<ChatService>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_limits(mut self, config: &Config) -> Self {
        self.max_limit = config.max_limit.max(1);
        self.default_limit = config.default_limit.min(self.max_limit);
        self
    }

    /// Requested list length, defaulted and clamped to the configured maximum
    pub fn limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_defaults_and_clamps() {
        let state = AppState::new(MovieStore::from_movies(Vec::new()));
        assert_eq!(state.limit(None), 12);
        assert_eq!(state.limit(Some(5)), 5);
        assert_eq!(state.limit(Some(0)), 0);
        assert_eq!(state.limit(Some(500)), 50);
    }

    #[test]
    fn test_limits_from_config() {
        let config = Config::from_vars(vec![
            ("DEFAULT_LIMIT".to_string(), "80".to_string()),
            ("MAX_LIMIT".to_string(), "20".to_string()),
        ])
        .unwrap();
        let state = AppState::new(MovieStore::from_movies(Vec::new())).with_limits(&config);
        assert_eq!(state.max_limit, 20);
        assert_eq!(state.limit(None), 20);
    }
}
