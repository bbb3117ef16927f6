// 🎬 Title Normalization - identifiers, titles and join keys
// Pure per-row functions; the table-level helpers just map them over a column.

use crate::error::{PipelineError, PipelineResult};
use crate::table::{Cell, Column, Table};
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

pub const USER_PREFIX: &str = "user_";
pub const MOVIE_PREFIX: &str = "movie_";
pub const AGE_GROUP_PREFIX: &str = "group_";
pub const OCCUPATION_PREFIX: &str = "occupation_";

/// Suffix of the derived join-key column for a title column
pub const PROCESSED_SUFFIX: &str = "_processed";

/// Articles stored as a trailing ", X" suffix in local titles
const TRAILING_ARTICLES: [&str; 2] = ["The", "Les"];

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Prefix a raw local identifier so it can't collide with catalog ids
///
/// `namespace_id(USER_PREFIX, "7")` → `"user_7"`
pub fn namespace_id(prefix: &str, raw: &str) -> String {
    format!("{}{}", prefix, raw.trim())
}

// ============================================================================
// TITLE DECOMPOSITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleParts {
    /// Display title, article not yet relocated
    pub title: String,
    /// The four characters inside the trailing parenthetical
    pub year: String,
    /// Alternate title from an earlier parenthetical, e.g. the French title
    pub original_title: Option<String>,
}

/// Split `"Title (YYYY)"` into its parts
///
/// The year is sliced positionally from the last seven characters, so a title
/// that does not follow the format yields garbage rather than an error. Only a
/// title too short to slice fails.
///
/// ```
/// use movie_merge::titles::decompose_title;
///
/// let parts = decompose_title("City of Lost Children, The (Cité des enfants perdus, La) (1995)").unwrap();
/// assert_eq!(parts.title, "City of Lost Children, The");
/// assert_eq!(parts.year, "1995");
/// assert_eq!(parts.original_title.as_deref(), Some("Cité des enfants perdus, La"));
/// ```
pub fn decompose_title(raw: &str) -> PipelineResult<TitleParts> {
    let chars: Vec<char> = raw.chars().collect();
    let n = chars.len();
    if n < 7 {
        return Err(PipelineError::TitleTooShort {
            title: raw.to_string(),
        });
    }

    let year: String = chars[n - 5..n - 1].iter().collect();
    let head: String = chars[..n - 7].iter().collect();

    if !year.chars().all(|c| c.is_ascii_digit()) {
        warn!(title = raw, year = %year, "title does not end in a (YYYY) year");
    }

    let (title, original_title) = split_original_title(&head);

    Ok(TitleParts {
        title,
        year,
        original_title,
    })
}

/// Pull the outermost parenthetical (first `(` to last `)`) out of a title
fn split_original_title(head: &str) -> (String, Option<String>) {
    match (head.find('('), head.rfind(')')) {
        (Some(open), Some(close)) if open < close => {
            let original = head[open + 1..close].to_string();
            let title = format!("{}{}", &head[..open], &head[close + 1..]);
            (title.trim().to_string(), Some(original))
        }
        _ => (head.trim().to_string(), None),
    }
}

/// Move a trailing article to the front: `"Godfather, The"` → `"The Godfather"`
///
/// Only "The" and "Les" are handled. Idempotent.
pub fn relocate_article(title: &str) -> String {
    for article in TRAILING_ARTICLES {
        let suffix = format!(", {}", article);
        if let Some(stem) = title.strip_suffix(suffix.as_str()) {
            return format!("{} {}", article, stem);
        }
    }
    title.to_string()
}

// ============================================================================
// JOIN KEYS
// ============================================================================

/// Join key for a title: no whitespace, lowercase, ASCII-folded
///
/// Characters without an ASCII decomposition are dropped, so `"Amélie"` and
/// `"amelie"` share a key.
pub fn normalize_title(title: &str) -> String {
    let compact: String = title
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    compact.nfkd().filter(char::is_ascii).collect()
}

/// Name of the join-key column derived from `column`
pub fn processed_column_name(column: &str) -> String {
    format!("{}{}", column, PROCESSED_SUFFIX)
}

/// Add a `<column>_processed` key column for each named title column
///
/// Missing titles give missing keys. Text and numeric cells are both keyed by
/// their display form.
pub fn add_title_keys(table: &mut Table, columns: &[&str]) -> PipelineResult<()> {
    for name in columns {
        let cells = table
            .require(name)?
            .cells
            .iter()
            .map(|cell| match cell {
                Cell::Missing => Cell::Missing,
                other => Cell::Text(normalize_title(&other.to_string())),
            })
            .collect();
        table.set_column(Column::new(processed_column_name(name), cells))?;
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_id() {
        assert_eq!(namespace_id(USER_PREFIX, "7"), "user_7");
        assert_eq!(namespace_id(MOVIE_PREFIX, " 42 "), "movie_42");
    }

    #[test]
    fn test_decompose_simple_title() {
        let parts = decompose_title("Toy Story (1995)").unwrap();
        assert_eq!(parts.title, "Toy Story");
        assert_eq!(parts.year, "1995");
        assert_eq!(parts.original_title, None);
    }

    #[test]
    fn test_decompose_round_trip() {
        for raw in ["Toy Story (1995)", "Heat (1995)", "Twelve Monkeys (1995)", "Se7en (1995)"] {
            let parts = decompose_title(raw).unwrap();
            assert_eq!(format!("{} ({})", parts.title, parts.year), raw);
        }
    }

    #[test]
    fn test_decompose_extracts_original_title_per_row() {
        let first = decompose_title("Shanghai Triad (Yao a yao yao dao waipo qiao) (1995)").unwrap();
        let second = decompose_title("Jumanji (1995)").unwrap();

        assert_eq!(first.title, "Shanghai Triad");
        assert_eq!(
            first.original_title.as_deref(),
            Some("Yao a yao yao dao waipo qiao")
        );
        assert_eq!(second.original_title, None);
    }

    #[test]
    fn test_decompose_multibyte_title() {
        let parts = decompose_title("Amélie (2001)").unwrap();
        assert_eq!(parts.title, "Amélie");
        assert_eq!(parts.year, "2001");
    }

    #[test]
    fn test_decompose_too_short() {
        let result = decompose_title("(1995");
        assert!(matches!(result, Err(PipelineError::TitleTooShort { .. })));
    }

    #[test]
    fn test_decompose_bad_format_is_not_an_error() {
        // Garbage in, garbage out: still sliced positionally
        let parts = decompose_title("No year here").unwrap();
        assert_eq!(parts.year, " her");
        assert_eq!(parts.title, "No ye");
    }

    #[test]
    fn test_relocate_article() {
        assert_eq!(relocate_article("Matrix, The"), "The Matrix");
        assert_eq!(relocate_article("Trois Couleurs, Les"), "Les Trois Couleurs");
        assert_eq!(relocate_article("Toy Story"), "Toy Story");
        assert_eq!(relocate_article("Grand Bleu, Le"), "Grand Bleu, Le");
    }

    #[test]
    fn test_relocate_article_idempotent() {
        for title in ["Matrix, The", "Trois Couleurs, Les", "Heat"] {
            let once = relocate_article(title);
            assert_eq!(relocate_article(&once), once);
        }
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Amélie"), normalize_title("amelie"));
        assert_eq!(normalize_title("Toy Story"), "toystory");
        assert_eq!(normalize_title("  TOY\tstory "), "toystory");
        assert_eq!(normalize_title("Léon: The Professional"), "leon:theprofessional");
    }

    #[test]
    fn test_add_title_keys() {
        let mut table = Table::from_rows(
            "movies",
            vec!["primary_title".to_string(), "original_title".to_string()],
            vec![vec![Cell::from("The Matrix"), Cell::Missing]],
        )
        .unwrap();

        add_title_keys(&mut table, &["primary_title", "original_title"]).unwrap();

        assert_eq!(
            table.cell("primary_title_processed", 0),
            Some(&Cell::from("thematrix"))
        );
        assert_eq!(table.cell("original_title_processed", 0), Some(&Cell::Missing));
    }
}
