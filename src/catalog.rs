// 📚 Catalog Preparation - shape the IMDb title dump for the join

use crate::error::PipelineResult;
use crate::table::Table;
use tracing::info;

pub const TITLE_ID_COLUMN: &str = "tconst";
pub const TITLE_TYPE_COLUMN: &str = "titleType";
pub const AVERAGE_RATING_COLUMN: &str = "averageRating";

pub const PRIMARY_TITLE: &str = "primary_title";
pub const ORIGINAL_TITLE: &str = "original_title";
pub const DATE: &str = "date";

/// Title types that can correspond to a rated movie
pub const KEPT_TITLE_TYPES: [&str; 3] = ["movie", "short", "tvSeries"];

/// Catalog columns renamed onto the shared vocabulary of the local table
const CATALOG_RENAMES: [(&str, &str); 3] = [
    ("primaryTitle", PRIMARY_TITLE),
    ("originalTitle", ORIGINAL_TITLE),
    ("startYear", DATE),
];

/// Columns with no use downstream
const CATALOG_DROPS: [&str; 4] = ["isAdult", "endYear", "runtimeMinutes", TITLE_TYPE_COLUMN];

/// Keep movie-like titles, rename shared attributes, drop the rest
pub fn prepare_catalog(mut titles: Table) -> PipelineResult<Table> {
    let before = titles.n_rows();

    let mask: Vec<bool> = titles
        .require(TITLE_TYPE_COLUMN)?
        .cells
        .iter()
        .map(|cell| {
            cell.as_str()
                .map(|t| KEPT_TITLE_TYPES.contains(&t))
                .unwrap_or(false)
        })
        .collect();
    titles.retain_rows(&mask)?;

    for (from, _) in CATALOG_RENAMES {
        titles.require(from)?;
    }
    titles.rename_columns(&CATALOG_RENAMES);
    titles.drop_columns(&CATALOG_DROPS);

    info!(
        before,
        after = titles.n_rows(),
        "filtered catalog titles to {:?}",
        KEPT_TITLE_TYPES
    );

    Ok(titles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::table::Cell;

    fn basics(rows: &[[&str; 9]]) -> Table {
        let headers = [
            "tconst",
            "titleType",
            "primaryTitle",
            "originalTitle",
            "isAdult",
            "startYear",
            "endYear",
            "runtimeMinutes",
            "genres",
        ];
        Table::from_rows(
            "title.basics",
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| Cell::from(*v)).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_prepare_catalog_filters_and_renames() {
        let titles = basics(&[
            ["tt0114709", "movie", "Toy Story", "Toy Story", "0", "1995", "", "81", "Animation|Comedy"],
            ["tt0000001", "tvEpisode", "Pilot", "Pilot", "0", "1990", "", "22", "Drama"],
            ["tt0000002", "short", "Short", "Short", "0", "1999", "", "5", "Short"],
            ["tt0000003", "tvSeries", "Show", "Show", "0", "2001", "2005", "30", "Drama"],
        ]);

        let catalog = prepare_catalog(titles).unwrap();

        assert_eq!(catalog.n_rows(), 3);
        assert_eq!(
            catalog.column_names(),
            vec!["tconst", "primary_title", "original_title", "date", "genres"]
        );
        assert_eq!(catalog.cell(DATE, 0), Some(&Cell::from("1995")));
        assert_eq!(catalog.cell(TITLE_ID_COLUMN, 1), Some(&Cell::from("tt0000002")));
    }

    #[test]
    fn test_prepare_catalog_requires_title_type() {
        let mut titles = basics(&[]);
        titles.drop_columns(&["titleType"]);
        let result = prepare_catalog(titles);
        assert!(matches!(result, Err(PipelineError::MissingColumn { .. })));
    }
}
