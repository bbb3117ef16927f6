// 📥 Dataset Acquisition - IMDb dumps: download → gunzip → all-text tables
//
// Any network, archive or filesystem failure aborts the whole load.

use crate::error::{PipelineError, PipelineResult};
use crate::table::{Cell, Table};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const NAME_BASICS: &str = "name.basics";
pub const TITLE_BASICS: &str = "title.basics";
pub const TITLE_RATINGS: &str = "title.ratings";

/// Null marker used throughout the IMDb dumps
pub const IMDB_NULL: &str = "\\N";

// ============================================================================
// SOURCES & ARTIFACTS
// ============================================================================

/// One remote dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSource {
    pub name: String,
    pub url: String,
}

impl DatasetSource {
    pub fn archive_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(format!("{}.tsv.gz", self.name))
    }

    pub fn extracted_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(format!("{}.tsv", self.name))
    }
}

/// The three IMDb dumps under `base_url`
pub fn imdb_sources(base_url: &str) -> Vec<DatasetSource> {
    let base = base_url.trim_end_matches('/');
    [NAME_BASICS, TITLE_BASICS, TITLE_RATINGS]
        .iter()
        .map(|name| DatasetSource {
            name: name.to_string(),
            url: format!("{}/{}.tsv.gz", base, name),
        })
        .collect()
}

/// Provenance of one extracted file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetArtifact {
    pub name: String,
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: u64,
}

/// The three catalog tables, every column text
#[derive(Debug, Clone)]
pub struct CatalogDatasets {
    pub name_basics: Table,
    pub title_basics: Table,
    pub title_ratings: Table,
}

// ============================================================================
// DOWNLOAD (feature = "download")
// ============================================================================

#[cfg(feature = "download")]
pub struct Downloader {
    agent: ureq::Agent,
}

#[cfg(feature = "download")]
impl Downloader {
    pub fn new(timeout: std::time::Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .build();
        Downloader { agent }
    }

    /// Stream `url` into `dest`; any non-2xx status is an error
    pub fn download(&self, url: &str, dest: &Path) -> PipelineResult<u64> {
        let response = self.agent.get(url).call().map_err(|e| PipelineError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let mut reader = response.into_reader();
        let file = File::create(dest).map_err(|e| PipelineError::io(dest, e))?;
        let mut writer = BufWriter::new(file);
        let written = io::copy(&mut reader, &mut writer).map_err(|e| PipelineError::io(dest, e))?;
        writer.flush().map_err(|e| PipelineError::io(dest, e))?;

        debug!(url, bytes = written, "downloaded archive");
        Ok(written)
    }
}

// ============================================================================
// EXTRACT & LOAD
// ============================================================================

/// Decompress a gzip file; a truncated or corrupt archive fails
pub fn extract_gz(archive: &Path, dest: &Path) -> PipelineResult<u64> {
    let file = File::open(archive).map_err(|e| PipelineError::io(archive, e))?;
    let mut decoder = GzDecoder::new(BufReader::new(file));

    let out = File::create(dest).map_err(|e| PipelineError::io(dest, e))?;
    let mut writer = BufWriter::new(out);
    let written = io::copy(&mut decoder, &mut writer).map_err(|e| PipelineError::io(archive, e))?;
    writer.flush().map_err(|e| PipelineError::io(dest, e))?;

    debug!(archive = %archive.display(), bytes = written, "extracted archive");
    Ok(written)
}

/// SHA-256 and size of a file
pub fn file_digest(path: &Path) -> PipelineResult<(String, u64)> {
    let mut file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut hasher = Sha256::new();
    let bytes = io::copy(&mut file, &mut hasher).map_err(|e| PipelineError::io(path, e))?;
    Ok((format!("{:x}", hasher.finalize()), bytes))
}

/// Load a tab-separated file with a header row; every value stays text
///
/// Fields are not quoted. Empty fields and `\N` load as missing.
pub fn load_tsv(path: &Path, name: &str) -> PipelineResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .has_headers(true)
        .from_path(path)
        .map_err(|e| PipelineError::csv(path, e))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::csv(path, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| PipelineError::csv(path, e))?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() || field == IMDB_NULL {
                        Cell::Missing
                    } else {
                        Cell::from(field)
                    }
                })
                .collect(),
        );
    }

    let table = Table::from_rows(name, headers, rows)?;
    info!(name, rows = table.n_rows(), columns = table.n_cols(), "loaded TSV");
    Ok(table)
}

fn ensure_dir(dir: &Path) -> PipelineResult<()> {
    fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))
}

fn artifact(source: &DatasetSource, path: PathBuf) -> PipelineResult<DatasetArtifact> {
    let (sha256, bytes) = file_digest(&path)?;
    info!(name = %source.name, sha256 = %sha256, bytes, "dataset ready");
    Ok(DatasetArtifact {
        name: source.name.clone(),
        path,
        sha256,
        bytes,
    })
}

fn load_sources(
    sources: &[DatasetSource],
    data_dir: &Path,
) -> PipelineResult<CatalogDatasets> {
    let load = |name: &str| -> PipelineResult<Table> {
        let source = sources
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| PipelineError::Config(format!("no source configured for {}", name)))?;
        load_tsv(&source.extracted_path(data_dir), name)
    };

    Ok(CatalogDatasets {
        name_basics: load(NAME_BASICS)?,
        title_basics: load(TITLE_BASICS)?,
        title_ratings: load(TITLE_RATINGS)?,
    })
}

/// Download, extract and load every source into `data_dir`
#[cfg(feature = "download")]
pub fn acquire_catalog(
    sources: &[DatasetSource],
    data_dir: &Path,
    downloader: &Downloader,
) -> PipelineResult<(CatalogDatasets, Vec<DatasetArtifact>)> {
    ensure_dir(data_dir)?;

    let mut artifacts = Vec::with_capacity(sources.len());
    for source in sources {
        let archive = source.archive_path(data_dir);
        let extracted = source.extracted_path(data_dir);

        info!(name = %source.name, url = %source.url, "downloading");
        downloader.download(&source.url, &archive)?;

        info!(name = %source.name, "extracting");
        extract_gz(&archive, &extracted)?;

        artifacts.push(artifact(source, extracted)?);
    }

    Ok((load_sources(sources, data_dir)?, artifacts))
}

/// Load previously extracted sources from `data_dir` without any network access
pub fn load_extracted_catalog(
    sources: &[DatasetSource],
    data_dir: &Path,
) -> PipelineResult<(CatalogDatasets, Vec<DatasetArtifact>)> {
    ensure_dir(data_dir)?;

    let artifacts = sources
        .iter()
        .map(|s| artifact(s, s.extracted_path(data_dir)))
        .collect::<PipelineResult<Vec<_>>>()?;

    Ok((load_sources(sources, data_dir)?, artifacts))
}

// ============================================================================
// TESTS
// ============================================================================
