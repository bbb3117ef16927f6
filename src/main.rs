use anyhow::{Context, Result};
use std::fs;
use tracing_subscriber::EnvFilter;

use movie_merge::{
    imdb_sources, load_extracted_catalog, preprocess_datasets, CatalogDatasets, DatasetArtifact,
    LocalDatasets, PipelineConfig, PipelineOptions,
};

const MERGED_FILE: &str = "merged_movies.csv";
const REPORT_FILE: &str = "report.json";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = PipelineConfig::from_env()?;

    println!("🎬 Movie Merge v{} - ratings corpus × IMDb catalog", movie_merge::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Catalog
    println!("\n📥 Acquiring IMDb catalog...");
    let (catalog, artifacts) = acquire(&config)?;
    for artifact in &artifacts {
        println!("✓ {} ({} bytes, sha256 {})", artifact.name, artifact.bytes, &artifact.sha256[..12]);
    }

    // 2. Local corpus
    println!("\n📂 Loading local ratings corpus...");
    let local = LocalDatasets::load(&config.movielens_dir)
        .with_context(|| format!("loading {}", config.movielens_dir.display()))?;
    println!(
        "✓ {} users, {} movies, {} ratings",
        local.users.len(),
        local.movies.len(),
        local.ratings.len()
    );

    // 3. Merge + features
    println!("\n🔄 Preprocessing...");
    let mut output = preprocess_datasets(local, catalog, &PipelineOptions::from(&config))?;
    output.report.artifacts = artifacts;

    // 4. Write outputs
    println!("\n💾 Writing outputs...");
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;

    let merged_path = config.output_dir.join(MERGED_FILE);
    output.merged_movies.write_csv(&merged_path)?;
    println!("✓ {}", merged_path.display());

    let report_path = config.output_dir.join(REPORT_FILE);
    fs::write(&report_path, serde_json::to_string_pretty(&output.report)?)
        .with_context(|| format!("writing {}", report_path.display()))?;
    println!("✓ {}", report_path.display());

    // 5. Summary
    let report = &output.report;
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Merged {} of {} local movies", report.merged_rows, report.local_movies);
    if report.unmatched_movies > 0 {
        println!("⚠️  {} movies had no catalog match", report.unmatched_movies);
    }
    println!("✓ TF-IDF: {} × {} terms", output.tfidf.matrix.n_rows(), report.tfidf_terms);
    println!(
        "✓ Ratings: {} × {} ({} non-zero)",
        report.rating_matrix_shape.0, report.rating_matrix_shape.1, report.rating_matrix_nnz
    );

    Ok(())
}

fn acquire(config: &PipelineConfig) -> Result<(CatalogDatasets, Vec<DatasetArtifact>)> {
    let sources = imdb_sources(&config.imdb_base_url);
    if config.offline {
        return Ok(load_extracted_catalog(&sources, &config.data_dir)?);
    }
    download_catalog(config, &sources)
}

#[cfg(feature = "download")]
fn download_catalog(
    config: &PipelineConfig,
    sources: &[movie_merge::DatasetSource],
) -> Result<(CatalogDatasets, Vec<DatasetArtifact>)> {
    let downloader =
        movie_merge::Downloader::new(std::time::Duration::from_secs(config.http_timeout_secs));
    Ok(movie_merge::acquire_catalog(sources, &config.data_dir, &downloader)?)
}

#[cfg(not(feature = "download"))]
fn download_catalog(
    config: &PipelineConfig,
    sources: &[movie_merge::DatasetSource],
) -> Result<(CatalogDatasets, Vec<DatasetArtifact>)> {
    eprintln!("⚠️  Built without the download feature, reading extracted files");
    Ok(load_extracted_catalog(sources, &config.data_dir)?)
}
