// Movie Merge - Core Library
// Exposes every preprocessing stage for the runner, the recommender and tests

pub mod error;
pub mod table;
pub mod titles;
pub mod genres;
pub mod movielens;      // Local ratings corpus (users/movies/ratings .dat)
pub mod acquisition;    // IMDb dumps: download, gunzip, TSV load
pub mod catalog;
pub mod merge;
pub mod stop_words;
pub mod features;       // TF-IDF over the merged catalog
pub mod sparse;
pub mod user_item;
pub mod config;
pub mod pipeline;

// Re-export commonly used types
pub use error::{PipelineError, PipelineResult};
pub use table::{Cell, Column, JoinKind, Table};
pub use titles::{decompose_title, normalize_title, relocate_article, TitleParts};
pub use genres::GenreVocabulary;
pub use movielens::{LocalDatasets, RawMovie, RawRating, RawUser, Rating, RecordParser, User};
#[cfg(feature = "download")]
pub use acquisition::{acquire_catalog, Downloader};
pub use acquisition::{
    imdb_sources, load_extracted_catalog, CatalogDatasets, DatasetArtifact, DatasetSource,
};
pub use features::{TfidfMatrix, TfidfVectorizer};
pub use sparse::CsrMatrix;
pub use user_item::UserItemMatrix;
pub use config::PipelineConfig;
pub use pipeline::{preprocess_datasets, PipelineOptions, PipelineOutput, PipelineReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
