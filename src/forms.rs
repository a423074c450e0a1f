//! Decoding of url-encoded admin form bodies.
//!
//! The admin screens submit three shapes that a plain key/value map cannot
//! carry: a multi-select that repeats its key once per chosen option, inline
//! review rows keyed by review id, and a fixed number of blank "extra" rows
//! for new reviews. Handlers therefore extract bodies as
//! `web::Form<Vec<(String, String)>>` and query them through [`FormData`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::AppError;
use crate::models::chai::ChaiType;
use crate::models::review::{NewReview, ReviewEdit};

/// Number of blank inline review rows appended to every variety form.
pub const INLINE_REVIEW_ROWS: usize = 2;

/// An ordered bag of decoded form pairs with typed accessors.
#[derive(Debug, Clone)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        FormData { pairs }
    }

    /// First value for `key`, untrimmed, if the key was submitted at all.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value submitted under `key`, in order. Multi-selects repeat
    /// their key once per selected option.
    pub fn all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Trimmed text value, empty when the key is absent.
    pub fn text(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().trim().to_string()
    }

    /// Trimmed text value, falling back to `default` when blank or absent.
    pub fn text_or(&self, key: &str, default: &str) -> String {
        let value = self.text(key);
        if value.is_empty() {
            default.to_string()
        } else {
            value
        }
    }

    /// Checkboxes submit their key only when ticked.
    pub fn checkbox(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn i64(&self, key: &str) -> Result<i64, AppError> {
        let raw = self.text(key);
        raw.parse().map_err(|_| {
            AppError::BadRequest(format!("expected a number in {key}, got {raw:?}"))
        })
    }

    /// All values of a repeated key parsed as ids; an empty selection is an
    /// empty list, not an error.
    pub fn i64_list(&self, key: &str) -> Result<Vec<i64>, AppError> {
        self.all(key)
            .into_iter()
            .map(|raw| {
                raw.trim().parse().map_err(|_| {
                    AppError::BadRequest(format!("expected a number in {key}, got {raw:?}"))
                })
            })
            .collect()
    }

    pub fn f64_or(&self, key: &str, default: f64) -> Result<f64, AppError> {
        let raw = self.text(key);
        if raw.is_empty() {
            return Ok(default);
        }
        raw.parse().map_err(|_| {
            AppError::BadRequest(format!("expected a number in {key}, got {raw:?}"))
        })
    }

    pub fn chai_type(&self, key: &str) -> Result<ChaiType, AppError> {
        let raw = self.text(key);
        ChaiType::from_code(&raw)
            .ok_or_else(|| AppError::BadRequest(format!("unknown chai type code {raw:?}")))
    }

    /// Required timestamp, accepting what a `datetime-local` input submits
    /// as well as RFC 3339 and bare dates.
    pub fn datetime(&self, key: &str) -> Result<DateTime<Utc>, AppError> {
        let raw = self.text(key);
        if raw.is_empty() {
            return Err(AppError::BadRequest(format!("{key} is required")));
        }
        parse_datetime(&raw)
            .ok_or_else(|| AppError::BadRequest(format!("invalid timestamp in {key}: {raw:?}")))
    }

    /// Optional timestamp: blank means "use `default`".
    pub fn datetime_or(
        &self,
        key: &str,
        default: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, AppError> {
        let raw = self.text(key);
        if raw.is_empty() {
            return Ok(default);
        }
        parse_datetime(&raw)
            .ok_or_else(|| AppError::BadRequest(format!("invalid timestamp in {key}: {raw:?}")))
    }
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// Rows for reviews that already exist, keyed by the hidden `review_id`
/// inputs the edit form renders one of per review.
pub fn existing_review_rows(form: &FormData) -> Result<Vec<ReviewEdit>, AppError> {
    let mut rows = Vec::new();
    for raw_id in form.all("review_id") {
        let id: i64 = raw_id.trim().parse().map_err(|_| {
            AppError::BadRequest(format!("expected a review id, got {raw_id:?}"))
        })?;
        rows.push(ReviewEdit {
            id,
            user_id: form.i64(&format!("user_{id}"))?,
            rating: form.i64(&format!("rating_{id}"))?,
            comment: form.text(&format!("comment_{id}")),
            delete: form.checkbox(&format!("delete_{id}")),
        });
    }
    Ok(rows)
}

/// The blank extra rows. A row left completely untouched (no rating, no
/// comment) is skipped, matching how the admin treats unused inline rows.
pub fn new_review_rows(form: &FormData) -> Result<Vec<NewReview>, AppError> {
    let mut rows = Vec::new();
    for slot in 1..=INLINE_REVIEW_ROWS {
        let rating = form.text(&format!("new_rating_{slot}"));
        let comment = form.text(&format!("new_comment_{slot}"));
        if rating.is_empty() && comment.is_empty() {
            continue;
        }
        let rating: i64 = rating.parse().map_err(|_| {
            AppError::BadRequest(format!("expected a rating in inline row {slot}, got {rating:?}"))
        })?;
        rows.push(NewReview {
            user_id: form.i64(&format!("new_user_{slot}"))?,
            rating,
            comment,
        });
    }
    Ok(rows)
}
