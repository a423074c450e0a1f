use serde::Serialize;

/// A store that stocks chai varieties. The association is many-to-many
/// through the `store_varieties` junction table.
#[derive(Debug, Clone, Serialize)]
pub struct Store {
    pub id: i64,
    pub name: String,
    pub location: String,
}
