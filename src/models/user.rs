use serde::Serialize;

/// A review author. The schema seeds a default `admin` row; everything else
/// about account management sits outside this application.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}
