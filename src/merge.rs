// ⚖️ Catalog Merge - join the local and catalog movie tables
//
// Steps, in order:
//   1. inner join on (normalized primary title, release year)
//   2. fold `_x`/`_y` duplicate columns back into one column
//   3. left join the aggregate IMDb rating by title id
//
// A join that matches nothing is not an error: the downstream recommender
// just receives an empty table.

use crate::catalog::{AVERAGE_RATING_COLUMN, DATE, PRIMARY_TITLE, TITLE_ID_COLUMN};
use crate::error::PipelineResult;
use crate::table::{Cell, Column, JoinKind, Table, LEFT_SUFFIX, RIGHT_SUFFIX};
use crate::titles::processed_column_name;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

// ============================================================================
// JOIN
// ============================================================================

/// Key columns shared by the local table and the prepared catalog
pub fn join_keys() -> [String; 2] {
    [processed_column_name(PRIMARY_TITLE), DATE.to_string()]
}

/// Inner join local movies with catalog titles on normalized title + year
///
/// Local movies without a catalog match are absent from the result.
pub fn join_catalog(local: &Table, catalog: &Table) -> PipelineResult<Table> {
    let keys = join_keys();
    let on: Vec<&str> = keys.iter().map(String::as_str).collect();

    let merged = local.join(catalog, &on, JoinKind::Inner)?;

    if merged.is_empty() && !local.is_empty() {
        warn!(
            local_movies = local.n_rows(),
            catalog_titles = catalog.n_rows(),
            "no local movie matched the catalog"
        );
    }
    info!(
        local_movies = local.n_rows(),
        merged_rows = merged.n_rows(),
        "joined local movies with catalog"
    );

    Ok(merged)
}

// ============================================================================
// DUPLICATE COLUMNS
// ============================================================================

/// First non-missing of `left`, then `right`
fn prefer_left(left: &Cell, right: &Cell) -> Cell {
    if left.is_missing() {
        right.clone()
    } else {
        left.clone()
    }
}

/// Fold every `<base>_x`/`<base>_y` pair produced by a join into `<base>`
///
/// Each pair keeps the left value unless it is missing, genre indicators
/// included. A suffixed column without a partner is renamed to its base name.
/// Columns whose names collide after renaming keep only the first occurrence.
pub fn reconcile_duplicate_columns(table: &mut Table) -> PipelineResult<()> {
    let names: Vec<String> = table.column_names().iter().map(|n| n.to_string()).collect();
    let y_cols: BTreeSet<&str> = names
        .iter()
        .filter(|n| n.ends_with(RIGHT_SUFFIX))
        .map(String::as_str)
        .collect();

    for x_col in names.iter().filter(|n| n.ends_with(LEFT_SUFFIX)) {
        let base = &x_col[..x_col.len() - LEFT_SUFFIX.len()];
        let y_col = format!("{}{}", base, RIGHT_SUFFIX);

        if y_cols.contains(y_col.as_str()) {
            let cells: Vec<Cell> = table
                .require(x_col)?
                .cells
                .iter()
                .zip(&table.require(&y_col)?.cells)
                .map(|(l, r)| prefer_left(l, r))
                .collect();

            table.drop_columns(&[x_col.as_str(), y_col.as_str()]);
            table.set_column(Column::new(base, cells))?;
            debug!(column = base, "combined duplicate columns");
        } else {
            table.rename_columns(&[(x_col.as_str(), base)]);
        }
    }

    for y_col in y_cols {
        if table.has_column(y_col) {
            let base = &y_col[..y_col.len() - RIGHT_SUFFIX.len()];
            table.rename_columns(&[(y_col, base)]);
        }
    }

    let dropped = table.dedup_column_names();
    if !dropped.is_empty() {
        debug!(?dropped, "dropped duplicate column names");
    }
    Ok(())
}

// ============================================================================
// RATINGS
// ============================================================================

/// Left join `averageRating` from the rating aggregates by title id
///
/// Ratings are coerced to floats on a best-effort basis; values that don't
/// parse become missing.
pub fn attach_ratings(table: &Table, ratings: &Table) -> PipelineResult<Table> {
    let mut lookup = ratings.select(&[TITLE_ID_COLUMN, AVERAGE_RATING_COLUMN])?;

    let mut unparsed = 0usize;
    lookup.map_column(AVERAGE_RATING_COLUMN, |cell| {
        Ok(match cell {
            Cell::Text(s) => match s.trim().parse::<f64>() {
                Ok(v) => Cell::Float(v),
                Err(_) => {
                    unparsed += 1;
                    Cell::Missing
                }
            },
            other => other.clone(),
        })
    })?;
    if unparsed > 0 {
        warn!(unparsed, "aggregate ratings that are not numbers were dropped");
    }

    let rated = table.join(&lookup, &[TITLE_ID_COLUMN], JoinKind::Left)?;
    let with_rating = rated
        .require(AVERAGE_RATING_COLUMN)?
        .cells
        .iter()
        .filter(|c| !c.is_missing())
        .count();
    info!(rows = rated.n_rows(), with_rating, "attached aggregate ratings");

    Ok(rated)
}

// ============================================================================
// TESTS
// ============================================================================
