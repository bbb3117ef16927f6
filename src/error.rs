use std::path::PathBuf;

/// Pipeline-level errors
///
/// Every variant is fatal for the run: nothing is retried and no partial output
/// is produced. A join that matches zero rows is NOT an error.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("HTTP request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed record in {file} line {line}: {message}")]
    MalformedRecord {
        file: String,
        line: usize,
        message: String,
    },

    #[error("Title too short to hold a \" (YYYY)\" suffix: {title:?}")]
    TitleTooShort { title: String },

    #[error("Invalid rating {value:?} for {user_id}/{movie_id}")]
    InvalidRating {
        value: String,
        user_id: String,
        movie_id: String,
    },

    #[error("Invalid timestamp {value:?} for {user_id}/{movie_id}")]
    InvalidTimestamp {
        value: String,
        user_id: String,
        movie_id: String,
    },

    #[error("Table '{table}' has no column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("Column '{column}' has {actual} rows, table '{table}' has {expected}")]
    ColumnLength {
        table: String,
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate rating for {movie_id} by {user_id}")]
    DuplicateRating { movie_id: String, user_id: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        PipelineError::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn missing_column(table: &str, column: &str) -> Self {
        PipelineError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
