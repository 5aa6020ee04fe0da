use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted property image row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageRecord {
    pub id: Uuid,
    pub property_id: Uuid,
    pub url: String,
    pub is_primary: bool,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for one image insert during a curator commit. Position is the
/// image's index in the in-memory set at commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImageRecord {
    pub url: String,
    pub is_primary: bool,
    pub position: i64,
}

/// A valuation report row. The property reference is weak: reports survive
/// independently of the property they value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub id: Uuid,
    pub property_id: Uuid,
    pub valuation: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Stored `(text, provenance)` of one report section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotRecord {
    pub text: String,
    pub provenance: String,
    pub updated_at: DateTime<Utc>,
}
