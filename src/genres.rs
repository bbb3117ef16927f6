// 🏷️ Genre Vocabulary - pipe-delimited genre lists → 0/1 indicator columns

use crate::error::PipelineResult;
use crate::table::{Cell, Column, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const GENRES_COLUMN: &str = "genres";
pub const GENRE_SEPARATOR: char = '|';

/// How the indicator vocabulary is built when two catalogs are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenreVocabulary {
    /// One vocabulary over both catalogs; after the join each indicator
    /// keeps the local value unless it is missing
    #[default]
    Union,
    /// Each catalog gets its own vocabulary; overlapping indicators are
    /// reconciled like any other duplicate column
    PerTable,
}

impl GenreVocabulary {
    pub fn name(&self) -> &str {
        match self {
            GenreVocabulary::Union => "union",
            GenreVocabulary::PerTable => "per_table",
        }
    }
}

/// Genre tokens of one cell; missing lists and empty tokens contribute nothing
pub fn split_genres(cell: &Cell) -> Vec<&str> {
    match cell.as_str() {
        Some(list) => list
            .split(GENRE_SEPARATOR)
            .filter(|g| !g.is_empty())
            .collect(),
        None => Vec::new(),
    }
}

/// Distinct genre tokens across the given tables
pub fn genre_vocabulary(tables: &[&Table], column: &str) -> PipelineResult<BTreeSet<String>> {
    let mut vocabulary = BTreeSet::new();
    for table in tables {
        for cell in &table.require(column)?.cells {
            vocabulary.extend(split_genres(cell).into_iter().map(str::to_string));
        }
    }
    Ok(vocabulary)
}

/// Replace the delimited genre column with one indicator column per token
///
/// Indicator columns are appended in vocabulary order; 1 means the token
/// appears in that row's list.
pub fn encode_genres(
    table: &mut Table,
    column: &str,
    vocabulary: &BTreeSet<String>,
) -> PipelineResult<()> {
    let rows: Vec<Vec<String>> = table
        .require(column)?
        .cells
        .iter()
        .map(|cell| split_genres(cell).into_iter().map(str::to_string).collect())
        .collect();

    for genre in vocabulary {
        let cells = rows
            .iter()
            .map(|genres| Cell::Int(i64::from(genres.contains(genre))))
            .collect();
        table.set_column(Column::new(genre.clone(), cells))?;
    }

    table.drop_columns(&[column]);
    Ok(())
}

/// Vocabularize a table against its own genres only
pub fn encode_own_genres(table: &mut Table, column: &str) -> PipelineResult<BTreeSet<String>> {
    let vocabulary = genre_vocabulary(&[table], column)?;
    encode_genres(table, column, &vocabulary)?;
    Ok(vocabulary)
}

// ============================================================================
// TESTS
// ============================================================================
