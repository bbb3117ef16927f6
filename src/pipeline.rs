// 🔄 Preprocessing Pipeline - six input tables → merged catalog + matrices
//
// Local side:   namespace ids → decompose titles → coerce ratings
// Both:         genre indicators
// Catalog side: filter title types → rename shared columns
// Both:         title join keys
// Then:         join → reconcile duplicates → attach ratings → TF-IDF → pivot

use crate::acquisition::{CatalogDatasets, DatasetArtifact};
use crate::catalog::{prepare_catalog, ORIGINAL_TITLE, PRIMARY_TITLE};
use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::features::{compose_features, tfidf_matrix, TfidfMatrix, FEATURES_COLUMN};
use crate::genres::{
    encode_genres, encode_own_genres, genre_vocabulary, GenreVocabulary, GENRES_COLUMN,
};
use crate::merge::{attach_ratings, join_catalog, reconcile_duplicate_columns};
use crate::movielens::{
    coerce_ratings, movie_table, namespace_users, LocalDatasets, Rating, User, MOVIE_ID_COLUMN,
};
use crate::sparse::CsrMatrix;
use crate::table::Table;
use crate::titles::add_title_keys;
use crate::user_item::UserItemMatrix;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub genre_vocabulary: GenreVocabulary,
    /// Derive `features` from titles and genres when the table has none
    pub compose_features: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            genre_vocabulary: GenreVocabulary::Union,
            compose_features: true,
        }
    }
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(config: &PipelineConfig) -> Self {
        PipelineOptions {
            genre_vocabulary: config.genre_vocabulary,
            compose_features: config.compose_features,
        }
    }
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub genre_vocabulary: GenreVocabulary,
    pub persons: usize,
    pub catalog_titles: usize,
    pub catalog_titles_kept: usize,
    pub local_movies: usize,
    pub merged_rows: usize,
    pub unmatched_movies: usize,
    pub users: usize,
    pub ratings: usize,
    pub genre_columns: usize,
    pub tfidf_terms: usize,
    pub rating_matrix_shape: (usize, usize),
    pub rating_matrix_nnz: usize,
    #[serde(default)]
    pub artifacts: Vec<DatasetArtifact>,
}

impl PipelineReport {
    pub fn summary(&self) -> String {
        format!(
            "Run {}: {} of {} local movies matched {} catalog titles, {} genre columns, {} TF-IDF terms, {}x{} rating matrix ({} ratings)",
            self.run_id,
            self.local_movies - self.unmatched_movies,
            self.local_movies,
            self.catalog_titles_kept,
            self.genre_columns,
            self.tfidf_terms,
            self.rating_matrix_shape.0,
            self.rating_matrix_shape.1,
            self.rating_matrix_nnz
        )
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Everything handed to the downstream recommender
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub merged_movies: Table,
    /// Row `i` describes `merged_movies` row `i`
    pub tfidf: TfidfMatrix,
    pub user_item: UserItemMatrix,
    pub csr_ratings: CsrMatrix,
    pub users: Vec<User>,
    pub ratings: Vec<Rating>,
    pub report: PipelineReport,
}

/// Reconcile the local and catalog datasets and derive the numeric artifacts
///
/// Any malformed title or rating aborts the run. A merge that matches nothing
/// still succeeds with empty outputs.
pub fn preprocess_datasets(
    local: LocalDatasets,
    catalog: CatalogDatasets,
    options: &PipelineOptions,
) -> PipelineResult<PipelineOutput> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!(%run_id, vocabulary = options.genre_vocabulary.name(), "starting preprocessing");

    // Local side
    let users = namespace_users(local.users);
    let ratings = coerce_ratings(local.ratings)?;
    let mut movies = movie_table(&local.movies)?;
    let local_movies = movies.n_rows();

    // Catalog side. Genres are encoded before title types are filtered, so
    // genres found only on dropped titles still get an all-zero column.
    let persons = catalog.name_basics.n_rows();
    let catalog_titles = catalog.title_basics.n_rows();
    let mut titles = catalog.title_basics;

    let genres = match options.genre_vocabulary {
        GenreVocabulary::Union => {
            let vocabulary = genre_vocabulary(&[&movies, &titles], GENRES_COLUMN)?;
            encode_genres(&mut movies, GENRES_COLUMN, &vocabulary)?;
            encode_genres(&mut titles, GENRES_COLUMN, &vocabulary)?;
            vocabulary
        }
        GenreVocabulary::PerTable => {
            let mut vocabulary = encode_own_genres(&mut movies, GENRES_COLUMN)?;
            vocabulary.extend(encode_own_genres(&mut titles, GENRES_COLUMN)?);
            vocabulary
        }
    };
    info!(genres = genres.len(), "encoded genre indicators");

    let mut titles = prepare_catalog(titles)?;
    let catalog_titles_kept = titles.n_rows();

    for table in [&mut movies, &mut titles] {
        add_title_keys(table, &[PRIMARY_TITLE, ORIGINAL_TITLE])?;
    }

    // Merge
    let mut merged = join_catalog(&movies, &titles)?;
    reconcile_duplicate_columns(&mut merged)?;
    let mut merged = attach_ratings(&merged, &catalog.title_ratings)?;

    let matched: HashSet<String> = merged
        .require(MOVIE_ID_COLUMN)?
        .cells
        .iter()
        .filter_map(|c| c.key())
        .collect();
    let unmatched_movies = movies
        .require(MOVIE_ID_COLUMN)?
        .cells
        .iter()
        .filter(|c| c.key().map_or(true, |id| !matched.contains(&id)))
        .count();
    if unmatched_movies > 0 {
        warn!(unmatched_movies, "local movies without a catalog match were dropped");
    }

    // Numeric artifacts
    if options.compose_features {
        compose_features(&mut merged, &genres)?;
    }
    let tfidf = tfidf_matrix(&merged, FEATURES_COLUMN)?;

    let user_item = UserItemMatrix::from_ratings(&ratings)?;
    let csr_ratings = user_item.to_csr();

    let report = PipelineReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        genre_vocabulary: options.genre_vocabulary,
        persons,
        catalog_titles,
        catalog_titles_kept,
        local_movies,
        merged_rows: merged.n_rows(),
        unmatched_movies,
        users: users.len(),
        ratings: ratings.len(),
        genre_columns: genres.len(),
        tfidf_terms: tfidf.vocabulary.len(),
        rating_matrix_shape: user_item.shape(),
        rating_matrix_nnz: csr_ratings.nnz(),
        artifacts: Vec::new(),
    };
    info!("{}", report.summary());

    Ok(PipelineOutput {
        merged_movies: merged,
        tfidf,
        user_item,
        csr_ratings,
        users,
        ratings,
        report,
    })
}
