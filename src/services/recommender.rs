use std::collections::{HashMap, HashSet};

use thiserror::Error;

/// Error types for the recommender
#[derive(Debug, Error)]
pub enum RecommenderError {
    #[error("user {0} is not present in the rating snapshot")]
    UnknownUser(String),
}

/// Sparse user-item rating snapshot
///
/// Outer key is the user id, inner key is the item id. Built once per
/// recommendation request from recent rating records and treated as
/// read-only afterwards.
#[derive(Debug, Default, Clone)]
pub struct RatingMatrix {
    rows: HashMap<String, HashMap<String, f64>>,
}

impl RatingMatrix {
    /// Builds a matrix from (user id, item id, score) triples
    ///
    /// Records are expected ordered by user id with a row cap already applied
    /// by the caller's query. Non-finite scores are skipped, and once
    /// `max_users` distinct users have been admitted, records for further
    /// users are dropped; the cap bounds the pairwise similarity cost.
    pub fn from_triples(
        triples: impl IntoIterator<Item = (String, String, f64)>,
        max_users: usize,
    ) -> Self {
        let mut rows: HashMap<String, HashMap<String, f64>> = HashMap::new();

        for (user_id, item_id, score) in triples {
            if !score.is_finite() {
                tracing::debug!(user_id = %user_id, item_id = %item_id, "skipping non-finite score");
                continue;
            }
            if !rows.contains_key(&user_id) && rows.len() >= max_users {
                continue;
            }
            rows.entry(user_id).or_default().insert(item_id, score);
        }

        Self { rows }
    }

    pub fn user_count(&self) -> usize {
        self.rows.len()
    }

    pub fn contains_user(&self, user_id: &str) -> bool {
        self.rows.contains_key(user_id)
    }

    /// Returns one user's rated items, if the user is in the snapshot
    pub fn row(&self, user_id: &str) -> Option<&HashMap<String, f64>> {
        self.rows.get(user_id)
    }
}

/// Pearson correlation between two users' rows, restricted to common items
///
/// Returns `None` when the rows share no items (no signal can be computed)
/// or when the computation degenerates to a non-finite value; a pair with
/// zero variance over the common items yields `Some(0.0)`, which is a
/// defined result and distinct from the no-common-items case.
pub fn pearson(user1: &HashMap<String, f64>, user2: &HashMap<String, f64>) -> Option<f64> {
    let common: Vec<&String> = user1.keys().filter(|item| user2.contains_key(*item)).collect();
    if common.is_empty() {
        return None;
    }

    let n = common.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2, mut sum_y2) = (0.0, 0.0, 0.0, 0.0, 0.0);

    for item in common {
        let x = user1[item];
        let y = user2[item];
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
        sum_y2 += y * y;
    }

    let numerator = sum_xy - (sum_x * sum_y) / n;
    // The max(0, ..) clamp keeps floating-point cancellation in the variance
    // terms from feeding a tiny negative into sqrt.
    let denominator =
        (sum_x2 - sum_x * sum_x / n).max(0.0).sqrt() * (sum_y2 - sum_y * sum_y / n).max(0.0).sqrt();

    if denominator == 0.0 {
        return Some(0.0);
    }

    let coefficient = numerator / denominator;
    coefficient.is_finite().then_some(coefficient)
}

/// User-based collaborative filtering over a rating snapshot
///
/// Pure read-only view: computes pairwise Pearson similarity against the
/// target user, ranks neighbors by similarity strength, and aggregates the
/// neighbors' items the target has not rated yet.
pub struct Recommender<'a> {
    matrix: &'a RatingMatrix,
}

impl<'a> Recommender<'a> {
    pub fn new(matrix: &'a RatingMatrix) -> Self {
        Self { matrix }
    }

    /// Finds the up-to-n users most similar to the target
    ///
    /// Pairs whose correlation is indeterminate contribute no signal and are
    /// excluded; a defined 0.0 is kept. Neighbors are ordered by the absolute
    /// value of the coefficient, so a strongly anti-correlated user ranks as
    /// high as a strongly correlated one. The order among neighbors with equal
    /// |coefficient| is implementation-defined.
    pub fn nearest_neighbors(
        &self,
        user_id: &str,
        n: usize,
    ) -> Result<Vec<(String, f64)>, RecommenderError> {
        let target = self
            .matrix
            .row(user_id)
            .ok_or_else(|| RecommenderError::UnknownUser(user_id.to_string()))?;

        let mut similarities: Vec<(String, f64)> = self
            .matrix
            .rows
            .iter()
            .filter(|(other, _)| other.as_str() != user_id)
            .filter_map(|(other, items)| pearson(target, items).map(|sim| (other.clone(), sim)))
            .collect();

        similarities.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        similarities.truncate(n);

        Ok(similarities)
    }

    /// Collects items rated by the top neighbors but not by the target
    ///
    /// The result is an unranked set; callers apply catalog filtering and
    /// popularity ordering downstream.
    pub fn recommend(
        &self,
        user_id: &str,
        n_neighbors: usize,
    ) -> Result<HashSet<String>, RecommenderError> {
        let target = self
            .matrix
            .row(user_id)
            .ok_or_else(|| RecommenderError::UnknownUser(user_id.to_string()))?;

        let mut recommendations = HashSet::new();
        for (neighbor, _) in self.nearest_neighbors(user_id, n_neighbors)? {
            if let Some(items) = self.matrix.row(&neighbor) {
                for item in items.keys() {
                    if !target.contains_key(item) {
                        recommendations.insert(item.clone());
                    }
                }
            }
        }

        Ok(recommendations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[(&str, &[(&str, f64)])]) -> RatingMatrix {
        RatingMatrix::from_triples(
            rows.iter().flat_map(|(user, items)| {
                items
                    .iter()
                    .map(move |(item, score)| (user.to_string(), item.to_string(), *score))
            }),
            usize::MAX,
        )
    }

    fn row(items: &[(&str, f64)]) -> HashMap<String, f64> {
        items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_pearson_no_common_items_is_indeterminate() {
        let a = row(&[("a", 5.0), ("b", 3.0)]);
        let b = row(&[("c", 4.0), ("d", 2.0)]);
        assert_eq!(pearson(&a, &b), None);
    }

    #[test]
    fn test_pearson_perfect_correlation() {
        let a = row(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        let b = row(&[("a", 2.0), ("b", 4.0), ("c", 6.0)]);
        let sim = pearson(&a, &b).unwrap();
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_perfect_anti_correlation() {
        let a = row(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        let b = row(&[("a", 3.0), ("b", 2.0), ("c", 1.0)]);
        let sim = pearson(&a, &b).unwrap();
        assert!((sim + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pearson_zero_variance_is_defined_zero() {
        // Constant rows have no variance; the defined result is 0.0, not None.
        let a = row(&[("a", 4.0), ("b", 4.0)]);
        let b = row(&[("a", 4.0), ("b", 4.0)]);
        assert_eq!(pearson(&a, &b), Some(0.0));
    }

    #[test]
    fn test_pearson_one_sided_zero_variance() {
        let a = row(&[("a", 4.0), ("b", 4.0)]);
        let b = row(&[("a", 1.0), ("b", 5.0)]);
        assert_eq!(pearson(&a, &b), Some(0.0));
    }

    #[test]
    fn test_pearson_stays_within_unit_interval() {
        let a = row(&[("a", 5.0), ("b", 1.0), ("c", 4.0), ("d", 2.0)]);
        let b = row(&[("a", 4.0), ("b", 2.0), ("c", 5.0), ("d", 1.0)]);
        let sim = pearson(&a, &b).unwrap();
        assert!(sim >= -1.0 - 1e-9 && sim <= 1.0 + 1e-9);
    }

    #[test]
    fn test_pearson_non_finite_score_is_indeterminate() {
        let a = row(&[("a", f64::NAN), ("b", 3.0)]);
        let b = row(&[("a", 5.0), ("b", 3.0)]);
        assert_eq!(pearson(&a, &b), None);
    }

    #[test]
    fn test_matrix_skips_non_finite_scores() {
        let m = RatingMatrix::from_triples(
            vec![
                ("u1".to_string(), "a".to_string(), 5.0),
                ("u1".to_string(), "b".to_string(), f64::INFINITY),
            ],
            10,
        );
        assert_eq!(m.row("u1").unwrap().len(), 1);
    }

    #[test]
    fn test_matrix_caps_distinct_users() {
        let m = RatingMatrix::from_triples(
            vec![
                ("u1".to_string(), "a".to_string(), 1.0),
                ("u2".to_string(), "a".to_string(), 2.0),
                ("u3".to_string(), "a".to_string(), 3.0),
                ("u1".to_string(), "b".to_string(), 4.0),
            ],
            2,
        );
        assert_eq!(m.user_count(), 2);
        assert!(!m.contains_user("u3"));
        // Records for already-admitted users still land after the cap is hit.
        assert_eq!(m.row("u1").unwrap().len(), 2);
    }

    #[test]
    fn test_nearest_neighbors_unknown_user() {
        let m = matrix(&[("u1", &[("a", 5.0)])]);
        let recommender = Recommender::new(&m);
        let result = recommender.nearest_neighbors("ghost", 3);
        assert!(matches!(result, Err(RecommenderError::UnknownUser(_))));
    }

    #[test]
    fn test_nearest_neighbors_excludes_target_and_truncates() {
        let m = matrix(&[
            ("u1", &[("a", 5.0), ("b", 3.0)]),
            ("u2", &[("a", 4.0), ("b", 2.0)]),
            ("u3", &[("a", 1.0), ("b", 5.0)]),
            ("u4", &[("a", 2.0), ("b", 2.0)]),
        ]);
        let recommender = Recommender::new(&m);
        let neighbors = recommender.nearest_neighbors("u1", 2).unwrap();
        assert!(neighbors.len() <= 2);
        assert!(neighbors.iter().all(|(id, _)| id != "u1"));
    }

    #[test]
    fn test_nearest_neighbors_ranks_by_absolute_value() {
        // u2 is perfectly correlated, u3 perfectly anti-correlated; both carry
        // |1.0| and the tie order is implementation-defined, so only the
        // strength is asserted.
        let m = matrix(&[
            ("u1", &[("a", 5.0), ("b", 3.0)]),
            ("u2", &[("a", 5.0), ("b", 3.0)]),
            ("u3", &[("a", 1.0), ("b", 5.0)]),
        ]);
        let recommender = Recommender::new(&m);
        let neighbors = recommender.nearest_neighbors("u1", 1).unwrap();
        assert_eq!(neighbors.len(), 1);
        assert!((neighbors[0].1.abs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_neighbors_prefers_stronger_signal() {
        let m = matrix(&[
            ("u1", &[("a", 1.0), ("b", 2.0), ("c", 3.0)]),
            ("u2", &[("a", 1.0), ("b", 2.0), ("c", 3.0)]),
            ("u3", &[("a", 2.0), ("b", 1.0), ("c", 2.5)]),
        ]);
        let recommender = Recommender::new(&m);
        let neighbors = recommender.nearest_neighbors("u1", 2).unwrap();
        assert_eq!(neighbors[0].0, "u2");
    }

    #[test]
    fn test_nearest_neighbors_excludes_indeterminate_pairs() {
        // No overlap at all: u2 contributes no signal and is dropped, not
        // ranked at zero.
        let m = matrix(&[("u1", &[("a", 5.0)]), ("u2", &[("b", 4.0)])]);
        let recommender = Recommender::new(&m);
        let neighbors = recommender.nearest_neighbors("u1", 1).unwrap();
        assert!(neighbors.is_empty());
    }

    #[test]
    fn test_nearest_neighbors_keeps_defined_zero() {
        let m = matrix(&[
            ("u1", &[("a", 3.0), ("b", 3.0)]),
            ("u2", &[("a", 1.0), ("b", 5.0)]),
        ]);
        let recommender = Recommender::new(&m);
        let neighbors = recommender.nearest_neighbors("u1", 1).unwrap();
        assert_eq!(neighbors, vec![("u2".to_string(), 0.0)]);
    }

    #[test]
    fn test_recommend_only_unseen_items() {
        let m = matrix(&[
            ("u1", &[("a", 5.0), ("b", 3.0)]),
            ("u2", &[("a", 5.0), ("b", 3.0), ("c", 4.0)]),
        ]);
        let recommender = Recommender::new(&m);
        let items = recommender.recommend("u1", 1).unwrap();
        assert_eq!(items, HashSet::from(["c".to_string()]));
    }

    #[test]
    fn test_recommend_never_returns_rated_items() {
        let m = matrix(&[
            ("u1", &[("a", 5.0), ("b", 3.0), ("d", 1.0)]),
            ("u2", &[("a", 4.0), ("b", 2.0), ("c", 5.0), ("d", 2.0)]),
            ("u3", &[("a", 1.0), ("b", 5.0), ("e", 3.0)]),
        ]);
        let recommender = Recommender::new(&m);
        let items = recommender.recommend("u1", 2).unwrap();
        for rated in ["a", "b", "d"] {
            assert!(!items.contains(rated));
        }
    }

    #[test]
    fn test_recommend_unknown_user() {
        let m = matrix(&[("u1", &[("a", 5.0)])]);
        let recommender = Recommender::new(&m);
        assert!(matches!(
            recommender.recommend("ghost", 2),
            Err(RecommenderError::UnknownUser(_))
        ));
    }

    #[test]
    fn test_recommend_no_neighbors_yields_empty_set() {
        let m = matrix(&[("u1", &[("a", 5.0)]), ("u2", &[("b", 4.0)])]);
        let recommender = Recommender::new(&m);
        let items = recommender.recommend("u1", 3).unwrap();
        assert!(items.is_empty());
    }
}
