use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Description applied when the admin form leaves the field blank.
pub const DEFAULT_DESCRIPTION: &str = "Delicious Chai";
/// Price applied when the admin form leaves the field blank.
pub const DEFAULT_PRICE: f64 = 20.0;

/// The five chai types on offer. Stored in the database as two-letter codes
/// so rows stay compact; rendered in pages as the upper-case label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaiType {
    Masala,
    Ginger,
    Kiwi,
    Plain,
    Elachi,
}

impl ChaiType {
    pub const ALL: [ChaiType; 5] = [
        ChaiType::Masala,
        ChaiType::Ginger,
        ChaiType::Kiwi,
        ChaiType::Plain,
        ChaiType::Elachi,
    ];

    /// Two-letter code persisted in the `type` column.
    pub fn code(self) -> &'static str {
        match self {
            ChaiType::Masala => "ML",
            ChaiType::Ginger => "GR",
            ChaiType::Kiwi => "KL",
            ChaiType::Plain => "PL",
            ChaiType::Elachi => "EL",
        }
    }

    /// Label shown in list columns and select widgets.
    pub fn label(self) -> &'static str {
        match self {
            ChaiType::Masala => "MASALA",
            ChaiType::Ginger => "GINGER",
            ChaiType::Kiwi => "KIWI",
            ChaiType::Plain => "PLAIN",
            ChaiType::Elachi => "ELACHI",
        }
    }

    pub fn from_code(code: &str) -> Option<ChaiType> {
        ChaiType::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Code/label pairs for building the type select in forms.
    pub fn options() -> Vec<TypeOption> {
        ChaiType::ALL
            .into_iter()
            .map(|t| TypeOption {
                code: t.code(),
                label: t.label(),
            })
            .collect()
    }
}

// Templates compare and print the label, so the type serializes as it.
impl Serialize for ChaiType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl fmt::Display for ChaiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One entry of the type select widget.
#[derive(Debug, Clone, Serialize)]
pub struct TypeOption {
    pub code: &'static str,
    pub label: &'static str,
}

/// A chai variety row as stored. Owns zero or more reviews, is stocked by
/// zero or more stores and holds at most one certificate.
#[derive(Debug, Clone, Serialize)]
pub struct Chai {
    pub id: i64,
    pub name: String,
    pub image: String, // file reference under the media root; empty when unset
    pub date_added: DateTime<Utc>,
    #[serde(rename = "type")]
    pub chai_type: ChaiType,
    pub description: String,
    pub price: f64,
}

/// The editable fields of a variety, captured from the admin form. Used for
/// both create and update; `date_added` is set by the store at insert time.
#[derive(Debug, Clone)]
pub struct ChaiFields {
    pub name: String,
    pub image: String,
    pub chai_type: ChaiType,
    pub description: String,
    pub price: f64,
}
