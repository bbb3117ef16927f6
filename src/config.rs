use crate::error::{PipelineError, PipelineResult};
use crate::genres::GenreVocabulary;
use serde::Deserialize;
use std::path::PathBuf;

/// Prefix of every environment variable read by [`PipelineConfig::from_env`]
pub const ENV_PREFIX: &str = "MOVIE_MERGE_";

/// Pipeline configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Where the IMDb archives are downloaded and extracted
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory holding users.dat, movies.dat and ratings.dat
    #[serde(default = "default_movielens_dir")]
    pub movielens_dir: PathBuf,

    /// Where the runner writes the merged table and the run report
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Base URL of the IMDb dataset dumps
    #[serde(default = "default_imdb_base_url")]
    pub imdb_base_url: String,

    #[serde(default)]
    pub genre_vocabulary: GenreVocabulary,

    /// Derive the `features` text column before TF-IDF
    #[serde(default = "default_true")]
    pub compose_features: bool,

    /// Reuse previously extracted TSV files instead of downloading
    #[serde(default)]
    pub offline: bool,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/imdb")
}

fn default_movielens_dir() -> PathBuf {
    PathBuf::from("data/ml-1m")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

fn default_imdb_base_url() -> String {
    "https://datasets.imdbws.com".to_string()
}

fn default_true() -> bool {
    true
}

fn default_http_timeout_secs() -> u64 {
    30
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            data_dir: default_data_dir(),
            movielens_dir: default_movielens_dir(),
            output_dir: default_output_dir(),
            imdb_base_url: default_imdb_base_url(),
            genre_vocabulary: GenreVocabulary::default(),
            compose_features: default_true(),
            offline: false,
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from `MOVIE_MERGE_*` environment variables
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> PipelineResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_iter(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs (prefixed names)
    pub fn from_iter<I>(vars: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .map_err(|e| PipelineError::Config(format!("Failed to load config: {}", e)))
    }
}
