// 🏗️ Local Dataset Parsers - MovieLens `::`-delimited relations
//
// users.dat   UserID::Gender::Age::Occupation::Zip-code
// movies.dat  MovieID::Title::Genres
// ratings.dat UserID::MovieID::Rating::Timestamp
//
// Files have no header and are Latin-1 encoded (UTF-8 is accepted too).

use crate::catalog::{DATE, ORIGINAL_TITLE, PRIMARY_TITLE};
use crate::error::{PipelineError, PipelineResult};
use crate::genres::GENRES_COLUMN;
use crate::table::{Cell, Table};
use crate::titles::{
    decompose_title, namespace_id, relocate_article, AGE_GROUP_PREFIX, MOVIE_PREFIX,
    OCCUPATION_PREFIX, USER_PREFIX,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

pub const FIELD_SEPARATOR: &str = "::";

pub const USERS_FILE: &str = "users.dat";
pub const MOVIES_FILE: &str = "movies.dat";
pub const RATINGS_FILE: &str = "ratings.dat";

pub const MOVIE_ID_COLUMN: &str = "movie_id";

// ============================================================================
// RAW RECORDS (as read, every field text)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUser {
    pub user_id: String,
    pub gender: String,
    pub age: String,
    pub occupation: String,
    pub zip_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMovie {
    pub movie_id: String,
    pub title: String,
    pub genres: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRating {
    pub user_id: String,
    pub movie_id: String,
    pub rating: String,
    pub timestamp: String,
}

// ============================================================================
// RECORD PARSER TRAIT
// ============================================================================

/// One local relation file
///
/// Implementors only map already-split fields to a record; reading, decoding
/// and field-count checks live in [`parse_records`].
pub trait RecordParser {
    type Record;

    /// File name inside the MovieLens directory
    fn file_name(&self) -> &str;

    /// Exact number of `::`-separated fields per line
    fn field_count(&self) -> usize;

    fn parse_fields(&self, fields: &[&str]) -> Self::Record;
}

pub struct UsersParser;

impl RecordParser for UsersParser {
    type Record = RawUser;

    fn file_name(&self) -> &str {
        USERS_FILE
    }

    fn field_count(&self) -> usize {
        5
    }

    fn parse_fields(&self, fields: &[&str]) -> RawUser {
        RawUser {
            user_id: fields[0].to_string(),
            gender: fields[1].to_string(),
            age: fields[2].to_string(),
            occupation: fields[3].to_string(),
            zip_code: fields[4].to_string(),
        }
    }
}

pub struct MoviesParser;

impl RecordParser for MoviesParser {
    type Record = RawMovie;

    fn file_name(&self) -> &str {
        MOVIES_FILE
    }

    fn field_count(&self) -> usize {
        3
    }

    fn parse_fields(&self, fields: &[&str]) -> RawMovie {
        RawMovie {
            movie_id: fields[0].to_string(),
            title: fields[1].to_string(),
            genres: fields[2].to_string(),
        }
    }
}

pub struct RatingsParser;

impl RecordParser for RatingsParser {
    type Record = RawRating;

    fn file_name(&self) -> &str {
        RATINGS_FILE
    }

    fn field_count(&self) -> usize {
        4
    }

    fn parse_fields(&self, fields: &[&str]) -> RawRating {
        RawRating {
            user_id: fields[0].to_string(),
            movie_id: fields[1].to_string(),
            rating: fields[2].to_string(),
            timestamp: fields[3].to_string(),
        }
    }
}

/// Split each non-blank line on `::` and hand the fields to the parser
pub fn parse_records<P: RecordParser>(parser: &P, text: &str) -> PipelineResult<Vec<P::Record>> {
    let mut records = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() != parser.field_count() {
            return Err(PipelineError::MalformedRecord {
                file: parser.file_name().to_string(),
                line: line_num + 1,
                message: format!(
                    "expected {} fields, got {}",
                    parser.field_count(),
                    fields.len()
                ),
            });
        }

        records.push(parser.parse_fields(&fields));
    }

    Ok(records)
}

/// Read `dir/<file_name>` and parse it
pub fn read_records<P: RecordParser>(parser: &P, dir: &Path) -> PipelineResult<Vec<P::Record>> {
    let path = dir.join(parser.file_name());
    let bytes = std::fs::read(&path).map_err(|e| PipelineError::io(&path, e))?;
    let text = decode_text(bytes);

    let records = parse_records(parser, &text)?;
    debug!(path = %path.display(), records = records.len(), "read local relation");
    Ok(records)
}

/// UTF-8 when valid, otherwise Latin-1 (every byte is one code point)
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

// ============================================================================
// LOCAL DATASETS
// ============================================================================

/// The three locally-supplied relations, as read
#[derive(Debug, Clone, Default)]
pub struct LocalDatasets {
    pub users: Vec<RawUser>,
    pub movies: Vec<RawMovie>,
    pub ratings: Vec<RawRating>,
}

impl LocalDatasets {
    pub fn load(dir: &Path) -> PipelineResult<Self> {
        let datasets = LocalDatasets {
            users: read_records(&UsersParser, dir)?,
            movies: read_records(&MoviesParser, dir)?,
            ratings: read_records(&RatingsParser, dir)?,
        };
        info!(
            users = datasets.users.len(),
            movies = datasets.movies.len(),
            ratings = datasets.ratings.len(),
            "loaded local datasets from {}",
            dir.display()
        );
        Ok(datasets)
    }
}

// ============================================================================
// NAMESPACED / COERCED RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub gender: String,
    pub age_group: String,
    pub occupation: String,
    pub zip_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: String,
    pub movie_id: String,
    pub rating: f64,
    pub timestamp: DateTime<Utc>,
}

/// Tag user ids, age groups and occupations with their namespaces
pub fn namespace_users(users: Vec<RawUser>) -> Vec<User> {
    users
        .into_iter()
        .map(|u| User {
            user_id: namespace_id(USER_PREFIX, &u.user_id),
            gender: u.gender,
            age_group: namespace_id(AGE_GROUP_PREFIX, &u.age),
            occupation: namespace_id(OCCUPATION_PREFIX, &u.occupation),
            zip_code: u.zip_code,
        })
        .collect()
}

/// Namespace ids and parse rating/timestamp; any malformed value fails
pub fn coerce_rating(raw: RawRating) -> PipelineResult<Rating> {
    let user_id = namespace_id(USER_PREFIX, &raw.user_id);
    let movie_id = namespace_id(MOVIE_PREFIX, &raw.movie_id);

    let rating = match raw.rating.trim().parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            return Err(PipelineError::InvalidRating {
                value: raw.rating,
                user_id,
                movie_id,
            })
        }
    };

    let timestamp = raw
        .timestamp
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
    let timestamp = match timestamp {
        Some(t) => t,
        None => {
            return Err(PipelineError::InvalidTimestamp {
                value: raw.timestamp,
                user_id,
                movie_id,
            })
        }
    };

    Ok(Rating {
        user_id,
        movie_id,
        rating,
        timestamp,
    })
}

pub fn coerce_ratings(ratings: Vec<RawRating>) -> PipelineResult<Vec<Rating>> {
    ratings.into_iter().map(coerce_rating).collect()
}

/// Local movies as a table ready for title keys and genre encoding
///
/// Columns: `movie_id`, `primary_title` (article relocated), `date`,
/// `original_title` (per-row, possibly missing), `genres`.
pub fn movie_table(movies: &[RawMovie]) -> PipelineResult<Table> {
    let headers = [MOVIE_ID_COLUMN, PRIMARY_TITLE, DATE, ORIGINAL_TITLE, GENRES_COLUMN];

    let rows = movies
        .iter()
        .map(|m| -> PipelineResult<Vec<Cell>> {
            let parts = decompose_title(&m.title)?;
            Ok(vec![
                Cell::Text(namespace_id(MOVIE_PREFIX, &m.movie_id)),
                Cell::Text(relocate_article(&parts.title)),
                Cell::Text(parts.year),
                Cell::from(parts.original_title),
                Cell::from(m.genres.as_str()),
            ])
        })
        .collect::<PipelineResult<Vec<_>>>()?;

    Table::from_rows(
        MOVIES_FILE,
        headers.iter().map(|h| h.to_string()).collect(),
        rows,
    )
}

// ============================================================================
// TESTS
// ============================================================================
