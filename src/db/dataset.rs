use crate::{
    error::{AppError, AppResult},
    models::Movie,
};

/// Bundled catalog used to bootstrap an empty store.
///
/// Tab-separated columns: external id, title, comma-separated genres, year,
/// average rating (0-10), vote count (possibly comma-grouped).
pub const BUNDLED_DATASET: &str = include_str!("../../data/top_movies.tsv");

const FIELD_COUNT: usize = 6;

/// Parses a tabular catalog export into movies
///
/// Catalog ids are assigned as strictly increasing 1-based row order; the
/// external id column is provenance only. Malformed rows fail the whole
/// import rather than silently shrinking the catalog, which would shift the
/// row-order ids of everything below them.
pub fn parse_catalog(input: &str) -> AppResult<Vec<Movie>> {
    let mut movies = Vec::new();

    for (index, line) in input.lines().enumerate() {
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != FIELD_COUNT {
            return Err(AppError::Import {
                line: line_number,
                reason: format!(
                    "expected {} tab-separated fields, got {}",
                    FIELD_COUNT,
                    fields.len()
                ),
            });
        }

        let title = fields[1].trim();
        if title.is_empty() {
            return Err(AppError::Import {
                line: line_number,
                reason: "empty title".to_string(),
            });
        }

        let genres: Vec<String> = fields[2]
            .split(',')
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();

        let year = fields[3].trim().parse::<i32>().map_err(|e| AppError::Import {
            line: line_number,
            reason: format!("invalid year '{}': {}", fields[3], e),
        })?;

        let average_rating = fields[4]
            .trim()
            .parse::<f64>()
            .map_err(|e| AppError::Import {
                line: line_number,
                reason: format!("invalid average rating '{}': {}", fields[4], e),
            })?;
        if !(0.0..=10.0).contains(&average_rating) {
            return Err(AppError::Import {
                line: line_number,
                reason: format!("average rating {} outside 0-10", average_rating),
            });
        }

        // Vote counts arrive comma-grouped, e.g. "1,234"
        let rating_count = fields[5]
            .trim()
            .replace(',', "")
            .parse::<u64>()
            .map_err(|e| AppError::Import {
                line: line_number,
                reason: format!("invalid rating count '{}': {}", fields[5], e),
            })?;

        movies.push(Movie {
            id: movies.len() as u32 + 1,
            title: title.to_string(),
            genres,
            year,
            average_rating,
            rating_count,
        });
    }

    tracing::debug!(movie_count = movies.len(), "Parsed catalog dataset");
    Ok(movies)
}
