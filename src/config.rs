use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Path to the baked movie dataset (JSON)
    #[serde(default = "default_dataset_path")]
    pub dataset_path: String,

    /// Redis connection URL; response caching is disabled when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// TMDb API key; discovery and chat are disabled when unset
    #[serde(default)]
    pub tmdb_api_key: Option<String>,

    /// TMDb API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Gemini API key; chat and dataset enrichment are disabled when unset
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// Gemini API base URL
    #[serde(default = "default_gemini_api_url")]
    pub gemini_api_url: String,

    /// Gemini model name
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Recommendation length when the request does not name one
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Upper bound on any requested list length
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

fn default_dataset_path() -> String {
    "data/movies.json".to_string()
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_gemini_api_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_limit() -> usize {
    12
}

fn default_max_limit() -> usize {
    50
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Load configuration from an explicit set of key/value pairs
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Socket address the server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
