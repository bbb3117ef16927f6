// 👥 User-Item Matrix - movie × user rating grid

use crate::error::{PipelineError, PipelineResult};
use crate::movielens::Rating;
use crate::sparse::CsrMatrix;
use std::collections::{BTreeSet, HashMap};
use tracing::info;

/// Dense movie-by-user rating grid with label lookups
///
/// Rows are movie ids and columns user ids, both sorted lexicographically.
/// Unrated pairs hold 0.
#[derive(Debug, Clone, PartialEq)]
pub struct UserItemMatrix {
    movie_ids: Vec<String>,
    user_ids: Vec<String>,
    values: Vec<f64>,
    movie_index: HashMap<String, usize>,
    user_index: HashMap<String, usize>,
}

impl UserItemMatrix {
    /// Pivot rating records; the same (movie, user) pair twice is an error
    pub fn from_ratings(ratings: &[Rating]) -> PipelineResult<Self> {
        let movie_ids: Vec<String> = ratings
            .iter()
            .map(|r| r.movie_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let user_ids: Vec<String> = ratings
            .iter()
            .map(|r| r.user_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let movie_index: HashMap<String, usize> = movie_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        let user_index: HashMap<String, usize> = user_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let n_users = user_ids.len();
        let mut values = vec![0.0; movie_ids.len() * n_users];
        let mut filled = vec![false; values.len()];

        for rating in ratings {
            let cell = movie_index[&rating.movie_id] * n_users + user_index[&rating.user_id];
            if filled[cell] {
                return Err(PipelineError::DuplicateRating {
                    movie_id: rating.movie_id.clone(),
                    user_id: rating.user_id.clone(),
                });
            }
            filled[cell] = true;
            values[cell] = rating.rating;
        }

        info!(
            movies = movie_ids.len(),
            users = n_users,
            ratings = ratings.len(),
            "pivoted user-item matrix"
        );

        Ok(UserItemMatrix {
            movie_ids,
            user_ids,
            values,
            movie_index,
            user_index,
        })
    }

    pub fn movie_ids(&self) -> &[String] {
        &self.movie_ids
    }

    pub fn user_ids(&self) -> &[String] {
        &self.user_ids
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.movie_ids.len(), self.user_ids.len())
    }

    /// Row-major dense values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn movie_row(&self, movie_id: &str) -> Option<usize> {
        self.movie_index.get(movie_id).copied()
    }

    pub fn user_column(&self, user_id: &str) -> Option<usize> {
        self.user_index.get(user_id).copied()
    }

    /// Rating of `movie_id` by `user_id`; `None` when either label is unknown
    pub fn get(&self, movie_id: &str, user_id: &str) -> Option<f64> {
        let row = self.movie_row(movie_id)?;
        let col = self.user_column(user_id)?;
        Some(self.values[row * self.user_ids.len() + col])
    }

    /// Compressed form with the same row/column order
    pub fn to_csr(&self) -> CsrMatrix {
        CsrMatrix::from_dense(self.movie_ids.len(), self.user_ids.len(), &self.values)
    }
}
