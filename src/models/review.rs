use chrono::{DateTime, Utc};
use serde::Serialize;

/// A review row joined with its author's username for display. Reviews only
/// exist under a parent variety; deleting the variety removes them.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: i64,
    pub chai_id: i64,
    pub user_id: i64,
    pub username: String,
    pub rating: i64,
    pub comment: String,
    pub date_added: DateTime<Utc>,
}

/// A filled inline row from the variety form that creates a new review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: i64,
    pub rating: i64,
    pub comment: String,
}

/// An inline row for an existing review: either updated in place or, when
/// the delete box was ticked, removed.
#[derive(Debug, Clone)]
pub struct ReviewEdit {
    pub id: i64,
    pub user_id: i64,
    pub rating: i64,
    pub comment: String,
    pub delete: bool,
}
