// 🧮 Table - Column-oriented in-memory relation
// Every dynamically shaped dataset in the pipeline (catalog dumps, local movies,
// the merged table) lives in one of these.

use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// Suffix applied to an overlapping left-side column by [`Table::join`]
pub const LEFT_SUFFIX: &str = "_x";

/// Suffix applied to an overlapping right-side column by [`Table::join`]
pub const RIGHT_SUFFIX: &str = "_y";

// ============================================================================
// CELL
// ============================================================================

/// One value in a column
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Missing,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Borrow the text payload (only `Text` cells)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Join key representation; missing cells never match anything
    pub fn key(&self) -> Option<String> {
        match self {
            Cell::Missing => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        value.map(Cell::Text).unwrap_or(Cell::Missing)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

// ============================================================================
// COLUMN
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Column {
            name: name.into(),
            cells,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ============================================================================
// TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    n_rows: usize,
}

/// Which unmatched rows a join keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Only rows with a match on both sides
    Inner,
    /// Every left row; unmatched right columns are `Missing`
    Left,
}

impl Table {
    /// Create an empty table (no columns, no rows)
    pub fn new(name: impl Into<String>) -> Self {
        Table {
            name: name.into(),
            columns: Vec::new(),
            n_rows: 0,
        }
    }

    /// Build a table from a header and row-major records
    pub fn from_rows(
        name: impl Into<String>,
        headers: Vec<String>,
        rows: Vec<Vec<Cell>>,
    ) -> PipelineResult<Self> {
        let name = name.into();
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|h| Column::new(h, Vec::with_capacity(rows.len())))
            .collect();

        let n_rows = rows.len();
        for (line, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(PipelineError::MalformedRecord {
                    file: name.clone(),
                    line: line + 1,
                    message: format!("expected {} fields, got {}", columns.len(), row.len()),
                });
            }
            for (column, cell) in columns.iter_mut().zip(row) {
                column.cells.push(cell);
            }
        }

        Ok(Table {
            name,
            columns,
            n_rows,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// First column with the given name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Like [`Table::column`] but fails fast with `MissingColumn`
    pub fn require(&self, name: &str) -> PipelineResult<&Column> {
        self.column(name)
            .ok_or_else(|| PipelineError::missing_column(&self.name, name))
    }

    pub fn cell(&self, column: &str, row: usize) -> Option<&Cell> {
        self.column(column).and_then(|c| c.cells.get(row))
    }

    /// Append a column, or replace an existing one with the same name
    pub fn set_column(&mut self, column: Column) -> PipelineResult<()> {
        if self.columns.is_empty() {
            self.n_rows = column.len();
        } else if column.len() != self.n_rows {
            return Err(PipelineError::ColumnLength {
                table: self.name.clone(),
                column: column.name,
                expected: self.n_rows,
                actual: column.cells.len(),
            });
        }

        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Remove the named columns; names that are absent are ignored
    pub fn drop_columns(&mut self, names: &[&str]) {
        self.columns.retain(|c| !names.contains(&c.name.as_str()));
    }

    pub fn rename_columns(&mut self, renames: &[(&str, &str)]) {
        for column in &mut self.columns {
            if let Some((_, to)) = renames.iter().find(|(from, _)| *from == column.name) {
                column.name = to.to_string();
            }
        }
    }

    /// Rewrite every cell of a column in place
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> PipelineResult<()>
    where
        F: FnMut(&Cell) -> PipelineResult<Cell>,
    {
        let table = self.name.clone();
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| PipelineError::missing_column(&table, name))?;

        for cell in &mut column.cells {
            *cell = f(cell)?;
        }
        Ok(())
    }

    /// Keep rows where `mask[row]` is true
    pub fn retain_rows(&mut self, mask: &[bool]) -> PipelineResult<()> {
        if mask.len() != self.n_rows {
            return Err(PipelineError::ColumnLength {
                table: self.name.clone(),
                column: "<row mask>".to_string(),
                expected: self.n_rows,
                actual: mask.len(),
            });
        }

        for column in &mut self.columns {
            let mut keep = mask.iter();
            column.cells.retain(|_| *keep.next().unwrap_or(&false));
        }
        self.n_rows = mask.iter().filter(|&&m| m).count();
        Ok(())
    }

    /// Projection onto the named columns, in the given order
    pub fn select(&self, names: &[&str]) -> PipelineResult<Table> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            columns.push(self.require(name)?.clone());
        }
        Ok(Table {
            name: self.name.clone(),
            columns,
            n_rows: self.n_rows,
        })
    }

    /// Relational join on equal key values
    ///
    /// Key columns appear once, taken from the left side. Other columns present
    /// on both sides get `_x` (left) and `_y` (right) suffixes. Rows with a
    /// missing key never match. Output order follows the left table; a left row
    /// with several matches expands to one row per match.
    pub fn join(&self, right: &Table, on: &[&str], kind: JoinKind) -> PipelineResult<Table> {
        let left_keys = on
            .iter()
            .map(|c| self.require(c))
            .collect::<PipelineResult<Vec<_>>>()?;
        let right_keys = on
            .iter()
            .map(|c| right.require(c))
            .collect::<PipelineResult<Vec<_>>>()?;

        let mut index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
        for row in 0..right.n_rows {
            if let Some(key) = row_key(&right_keys, row) {
                index.entry(key).or_default().push(row);
            }
        }

        let mut left_rows = Vec::new();
        let mut right_rows: Vec<Option<usize>> = Vec::new();
        for row in 0..self.n_rows {
            match row_key(&left_keys, row).and_then(|key| index.get(&key)) {
                Some(matches) => {
                    for &r in matches {
                        left_rows.push(row);
                        right_rows.push(Some(r));
                    }
                }
                None => {
                    if kind == JoinKind::Left {
                        left_rows.push(row);
                        right_rows.push(None);
                    }
                }
            }
        }

        let key_set: HashSet<&str> = on.iter().copied().collect();
        let left_names: HashSet<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        let right_names: HashSet<&str> = right.columns.iter().map(|c| c.name.as_str()).collect();

        let mut columns = Vec::with_capacity(self.columns.len() + right.columns.len());

        for column in &self.columns {
            let overlaps = !key_set.contains(column.name.as_str())
                && right_names.contains(column.name.as_str());
            let name = if overlaps {
                format!("{}{}", column.name, LEFT_SUFFIX)
            } else {
                column.name.clone()
            };
            let cells = left_rows.iter().map(|&r| column.cells[r].clone()).collect();
            columns.push(Column::new(name, cells));
        }

        for column in &right.columns {
            if key_set.contains(column.name.as_str()) {
                continue;
            }
            let name = if left_names.contains(column.name.as_str()) {
                format!("{}{}", column.name, RIGHT_SUFFIX)
            } else {
                column.name.clone()
            };
            let cells = right_rows
                .iter()
                .map(|r| r.map(|r| column.cells[r].clone()).unwrap_or_default())
                .collect();
            columns.push(Column::new(name, cells));
        }

        Ok(Table {
            name: self.name.clone(),
            columns,
            n_rows: left_rows.len(),
        })
    }

    /// Drop every column whose name repeats an earlier one
    ///
    /// Returns the names of the dropped columns.
    pub fn dedup_column_names(&mut self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut dropped = Vec::new();
        self.columns.retain(|c| {
            if seen.insert(c.name.clone()) {
                true
            } else {
                dropped.push(c.name.clone());
                false
            }
        });
        dropped
    }

    /// Write the table as comma-separated values with a header row
    pub fn write_csv(&self, path: &Path) -> PipelineResult<()> {
        let mut writer = csv::Writer::from_path(path).map_err(|e| PipelineError::csv(path, e))?;

        writer
            .write_record(self.columns.iter().map(|c| c.name.as_str()))
            .map_err(|e| PipelineError::csv(path, e))?;

        for row in 0..self.n_rows {
            let record: Vec<String> = self.columns.iter().map(|c| c.cells[row].to_string()).collect();
            writer
                .write_record(&record)
                .map_err(|e| PipelineError::csv(path, e))?;
        }

        writer.flush().map_err(|e| PipelineError::io(path, e))?;
        Ok(())
    }
}

fn row_key(keys: &[&Column], row: usize) -> Option<Vec<String>> {
    keys.iter().map(|c| c.cells[row].key()).collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn text_table(name: &str, headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_rows(
            name,
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| Cell::from(*v)).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows_rejects_ragged_rows() {
        let result = Table::from_rows(
            "ragged",
            vec!["a".to_string(), "b".to_string()],
            vec![vec![Cell::from("1")]],
        );
        assert!(matches!(
            result,
            Err(PipelineError::MalformedRecord { line: 1, .. })
        ));
    }

    #[test]
    fn test_require_missing_column() {
        let table = text_table("movies", &["title"], &[&["Heat"]]);
        let err = table.require("features").unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { .. }));
        assert_eq!(err.to_string(), "Table 'movies' has no column 'features'");
    }

    #[test]
    fn test_set_column_length_check() {
        let mut table = text_table("t", &["a"], &[&["1"], &["2"]]);
        let result = table.set_column(Column::new("b", vec![Cell::Int(1)]));
        assert!(matches!(result, Err(PipelineError::ColumnLength { .. })));

        table
            .set_column(Column::new("a", vec![Cell::Int(1), Cell::Int(2)]))
            .unwrap();
        assert_eq!(table.n_cols(), 1);
        assert_eq!(table.cell("a", 1), Some(&Cell::Int(2)));
    }

    #[test]
    fn test_inner_join_suffixes_overlapping_columns() {
        let left = text_table("left", &["key", "title"], &[&["a", "L1"], &["b", "L2"]]);
        let right = text_table(
            "right",
            &["key", "title", "id"],
            &[&["a", "R1", "tt1"], &["c", "R3", "tt3"]],
        );

        let joined = left.join(&right, &["key"], JoinKind::Inner).unwrap();

        assert_eq!(joined.n_rows(), 1);
        assert_eq!(joined.column_names(), vec!["key", "title_x", "title_y", "id"]);
        assert_eq!(joined.cell("title_y", 0), Some(&Cell::from("R1")));
        assert_eq!(joined.cell("id", 0), Some(&Cell::from("tt1")));
    }

    #[test]
    fn test_left_join_keeps_unmatched_rows() {
        let left = text_table("left", &["id"], &[&["tt1"], &["tt2"]]);
        let right = text_table("right", &["id", "score"], &[&["tt2", "7.1"]]);

        let joined = left.join(&right, &["id"], JoinKind::Left).unwrap();

        assert_eq!(joined.n_rows(), 2);
        assert_eq!(joined.cell("score", 0), Some(&Cell::Missing));
        assert_eq!(joined.cell("score", 1), Some(&Cell::from("7.1")));
    }

    #[test]
    fn test_join_missing_keys_never_match() {
        let mut left = text_table("left", &["id"], &[&["x"]]);
        left.map_column("id", |_| Ok(Cell::Missing)).unwrap();
        let mut right = text_table("right", &["id", "v"], &[&["x", "1"]]);
        right.map_column("id", |_| Ok(Cell::Missing)).unwrap();

        let joined = left.join(&right, &["id"], JoinKind::Inner).unwrap();
        assert!(joined.is_empty());
    }

    #[test]
    fn test_join_many_to_many_expands() {
        let left = text_table("left", &["k", "l"], &[&["a", "1"], &["a", "2"]]);
        let right = text_table("right", &["k", "r"], &[&["a", "x"], &["a", "y"]]);

        let joined = left.join(&right, &["k"], JoinKind::Inner).unwrap();
        assert_eq!(joined.n_rows(), 4);
        assert_eq!(joined.cell("l", 0), Some(&Cell::from("1")));
        assert_eq!(joined.cell("r", 1), Some(&Cell::from("y")));
    }

    #[test]
    fn test_retain_rows_and_dedup() {
        let mut table = text_table("t", &["a", "b"], &[&["1", "x"], &["2", "y"], &["3", "z"]]);
        table.retain_rows(&[true, false, true]).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.cell("a", 1), Some(&Cell::from("3")));

        table.rename_columns(&[("b", "a")]);
        let dropped = table.dedup_column_names();
        assert_eq!(dropped, vec!["a".to_string()]);
        assert_eq!(table.column_names(), vec!["a"]);
        assert_eq!(table.cell("a", 0), Some(&Cell::from("1")));
    }

    #[test]
    fn test_cell_keys() {
        assert_eq!(Cell::from("1995").key(), Cell::Int(1995).key());
        assert_eq!(Cell::Missing.key(), None);
        assert_eq!(Cell::Float(4.5).to_string(), "4.5");
    }
}
