use chrono::{DateTime, Utc};
use serde::Serialize;

/// A certification record, joined with its variety's name for list columns.
/// At most one certificate per variety (UNIQUE on `chai_id`); deleting the
/// variety deletes the certificate with it.
#[derive(Debug, Clone, Serialize)]
pub struct Certificate {
    pub id: i64,
    pub chai_id: i64,
    pub chai_name: String,
    pub certificate_number: String,
    pub issued_date: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}
