// 📝 Text Features - feature text per movie and its TF-IDF matrix
//
// Weighting follows the usual vectorizer defaults:
//   tf  = raw term count in the document
//   idf = ln((1 + n_docs) / (1 + doc_freq)) + 1
//   each row scaled to unit L2 norm

use crate::catalog::{ORIGINAL_TITLE, PRIMARY_TITLE};
use crate::error::PipelineResult;
use crate::sparse::CsrMatrix;
use crate::stop_words::ENGLISH_STOP_WORDS;
use crate::table::{Cell, Column, Table};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::info;

pub const FEATURES_COLUMN: &str = "features";

// ============================================================================
// FEATURE TEXT
// ============================================================================

/// Add a `features` column: title, original title and active genre names
///
/// A table that already carries `features` is left untouched.
pub fn compose_features(table: &mut Table, genres: &BTreeSet<String>) -> PipelineResult<()> {
    if table.has_column(FEATURES_COLUMN) {
        return Ok(());
    }

    let titles = &table.require(PRIMARY_TITLE)?.cells;
    let originals = table.column(ORIGINAL_TITLE).map(|c| &c.cells);
    let indicators: Vec<(&str, &Vec<Cell>)> = genres
        .iter()
        .filter_map(|g| table.column(g).map(|c| (g.as_str(), &c.cells)))
        .collect();

    let cells: Vec<Cell> = (0..table.n_rows())
        .map(|row| {
            let mut parts: Vec<String> = Vec::new();
            if let Some(title) = titles[row].key() {
                parts.push(title);
            }
            if let Some(original) = originals.and_then(|o| o[row].key()) {
                parts.push(original);
            }
            for (genre, cells) in &indicators {
                if cells[row].as_f64().unwrap_or(0.0) > 0.0 {
                    parts.push(genre.to_string());
                }
            }
            Cell::Text(parts.join(" "))
        })
        .collect();

    table.set_column(Column::new(FEATURES_COLUMN, cells))
}

// ============================================================================
// TF-IDF
// ============================================================================

/// Term-weighted document matrix plus the terms its columns stand for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfMatrix {
    /// Sorted vocabulary; column `i` is `vocabulary[i]`
    pub vocabulary: Vec<String>,
    pub idf: Vec<f64>,
    pub matrix: CsrMatrix,
}

impl TfidfMatrix {
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary
            .binary_search_by(|t| t.as_str().cmp(term))
            .ok()
    }

    /// Weight of `term` in document `row`; 0 for unknown terms
    pub fn weight(&self, row: usize, term: &str) -> f64 {
        self.term_index(term)
            .map(|col| self.matrix.get(row, col))
            .unwrap_or(0.0)
    }
}

pub struct TfidfVectorizer {
    stop_words: HashSet<&'static str>,
}

impl TfidfVectorizer {
    /// Vectorizer that drops English stop words
    pub fn english() -> Self {
        TfidfVectorizer {
            stop_words: ENGLISH_STOP_WORDS.iter().copied().collect(),
        }
    }

    /// Vectorizer that keeps every token
    pub fn without_stop_words() -> Self {
        TfidfVectorizer {
            stop_words: HashSet::new(),
        }
    }

    /// Lowercased runs of two or more word characters, minus stop words
    pub fn tokenize(&self, doc: &str) -> Vec<String> {
        doc.to_lowercase()
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| t.chars().count() >= 2)
            .filter(|t| !self.stop_words.contains(t))
            .map(str::to_string)
            .collect()
    }

    pub fn fit_transform(&self, docs: &[&str]) -> TfidfMatrix {
        let tokenized: Vec<Vec<String>> = docs.iter().map(|d| self.tokenize(d)).collect();

        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in &tokenized {
            let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let n_docs = docs.len() as f64;
        let vocabulary: Vec<String> = doc_freq.keys().map(|t| t.to_string()).collect();
        let idf: Vec<f64> = doc_freq
            .values()
            .map(|&df| ((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0)
            .collect();
        let index: HashMap<&str, usize> = doc_freq
            .keys()
            .enumerate()
            .map(|(i, t)| (*t, i))
            .collect();

        let rows: Vec<Vec<(usize, f64)>> = tokenized
            .iter()
            .map(|tokens| {
                let mut counts: HashMap<usize, f64> = HashMap::new();
                for token in tokens {
                    *counts.entry(index[token.as_str()]).or_insert(0.0) += 1.0;
                }

                let mut weights: Vec<(usize, f64)> = counts
                    .into_iter()
                    .map(|(col, tf)| (col, tf * idf[col]))
                    .collect();

                let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, w) in &mut weights {
                        *w /= norm;
                    }
                }
                weights
            })
            .collect();

        let matrix = CsrMatrix::from_rows(vocabulary.len(), rows);
        TfidfMatrix {
            vocabulary,
            idf,
            matrix,
        }
    }
}

/// TF-IDF over a text column; one matrix row per table row
///
/// The column must exist. Missing cells count as empty documents.
pub fn tfidf_matrix(table: &Table, column: &str) -> PipelineResult<TfidfMatrix> {
    let docs: Vec<String> = table
        .require(column)?
        .cells
        .iter()
        .map(Cell::to_string)
        .collect();
    let refs: Vec<&str> = docs.iter().map(String::as_str).collect();

    let tfidf = TfidfVectorizer::english().fit_transform(&refs);
    info!(
        documents = tfidf.matrix.n_rows(),
        terms = tfidf.vocabulary.len(),
        nnz = tfidf.matrix.nnz(),
        "built TF-IDF matrix"
    );
    Ok(tfidf)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_tokenize() {
        let vectorizer = TfidfVectorizer::english();
        assert_eq!(
            vectorizer.tokenize("The Matrix: a Sci-Fi classic, 1999!"),
            vec!["matrix", "sci", "fi", "classic", "1999"]
        );
    }

    #[test]
    fn test_fit_transform_weights() {
        let tfidf = TfidfVectorizer::english()
            .fit_transform(&["Toy Story Animation", "the story of comedy"]);

        assert_eq!(tfidf.vocabulary, vec!["animation", "comedy", "story", "toy"]);
        assert_eq!(tfidf.matrix.shape(), (2, 4));

        let rare = (3.0f64 / 2.0).ln() + 1.0;
        assert!(close(tfidf.idf[tfidf.term_index("story").unwrap()], 1.0));
        assert!(close(tfidf.idf[tfidf.term_index("toy").unwrap()], rare));

        let norm = (2.0 * rare * rare + 1.0).sqrt();
        assert!(close(tfidf.weight(0, "story"), 1.0 / norm));
        assert!(close(tfidf.weight(0, "toy"), rare / norm));
        assert_eq!(tfidf.weight(1, "toy"), 0.0);
        assert_eq!(tfidf.weight(0, "the"), 0.0);
    }

    #[test]
    fn test_rows_are_unit_length() {
        let tfidf = TfidfVectorizer::english()
            .fit_transform(&["heat heat crime", "crime drama", "", "the of and"]);

        for row in 0..2 {
            let norm: f64 = tfidf.matrix.row(row).map(|(_, w)| w * w).sum();
            assert!(close(norm, 1.0));
        }
        assert_eq!(tfidf.matrix.row(2).count(), 0);
        assert_eq!(tfidf.matrix.row(3).count(), 0);
    }

    #[test]
    fn test_tfidf_requires_features_column() {
        let table = Table::from_rows(
            "merged",
            vec!["primary_title".to_string()],
            vec![vec![Cell::from("Heat")]],
        )
        .unwrap();

        let result = tfidf_matrix(&table, FEATURES_COLUMN);
        assert!(matches!(result, Err(PipelineError::MissingColumn { .. })));
    }

    #[test]
    fn test_compose_features() {
        let mut table = Table::from_rows(
            "merged",
            vec![
                "primary_title".to_string(),
                "original_title".to_string(),
                "Animation".to_string(),
                "Comedy".to_string(),
                "Drama".to_string(),
            ],
            vec![vec![
                Cell::from("Toy Story"),
                Cell::Missing,
                Cell::Int(1),
                Cell::Int(1),
                Cell::Int(0),
            ]],
        )
        .unwrap();
        let genres: BTreeSet<String> =
            ["Animation", "Comedy", "Drama"].iter().map(|g| g.to_string()).collect();

        compose_features(&mut table, &genres).unwrap();

        assert_eq!(
            table.cell(FEATURES_COLUMN, 0),
            Some(&Cell::from("Toy Story Animation Comedy"))
        );
    }
}
