use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three AI-assisted text sections of a valuation report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Description,
    MarketAnalysis,
    ExecutiveSummary,
}

impl SlotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKind::Description => "description",
            SlotKind::MarketAnalysis => "market_analysis",
            SlotKind::ExecutiveSummary => "executive_summary",
        }
    }

    pub fn parse(s: &str) -> Option<SlotKind> {
        match s {
            "description" => Some(SlotKind::Description),
            "market_analysis" => Some(SlotKind::MarketAnalysis),
            "executive_summary" => Some(SlotKind::ExecutiveSummary),
            _ => None,
        }
    }

    /// Provider token budget per section. Sized for the expected lengths
    /// (200-300 / 300-500 / 150-250 words respectively).
    pub fn max_tokens(&self) -> u32 {
        match self {
            SlotKind::Description => 500,
            SlotKind::MarketAnalysis => 800,
            SlotKind::ExecutiveSummary => 400,
        }
    }
}

/// Current text of a slot, tagged by where it came from. One variant per
/// provenance so that "generated with no text" cannot be represented.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SlotContent {
    Empty,
    Generated(String),
    Edited(String),
}

impl SlotContent {
    pub fn text(&self) -> &str {
        match self {
            SlotContent::Empty => "",
            SlotContent::Generated(t) | SlotContent::Edited(t) => t,
        }
    }

    pub fn provenance(&self) -> &'static str {
        match self {
            SlotContent::Empty => "none",
            SlotContent::Generated(_) => "generated",
            SlotContent::Edited(_) => "edited",
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, SlotContent::Empty)
    }

    /// Rebuild from a stored `(text, provenance)` pair. Empty text is an
    /// empty slot; non-empty text with an unrecognized provenance tag is
    /// kept as `Edited` rather than dropped.
    pub fn from_stored(text: &str, provenance: &str) -> SlotContent {
        if text.is_empty() {
            return SlotContent::Empty;
        }
        match provenance {
            "generated" => SlotContent::Generated(text.to_string()),
            _ => SlotContent::Edited(text.to_string()),
        }
    }
}

/// One AI-assisted section of a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentSlot {
    pub kind: SlotKind,
    pub content: SlotContent,
}

impl ContentSlot {
    pub fn empty(kind: SlotKind) -> Self {
        Self {
            kind,
            content: SlotContent::Empty,
        }
    }
}

/// A file staged by the user but not yet pushed to blob storage.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StagedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for StagedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedFile")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// One image of a property's image set.
///
/// `id` and `url` are absent while the image is only staged locally; both
/// are filled in by `curator::commit` once the binary upload and the record
/// insert have gone through.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertyImage {
    pub id: Option<Uuid>,
    pub url: Option<String>,
    pub is_primary: bool,
    pub upload: Option<StagedFile>,
}

impl PropertyImage {
    pub fn staged(file: StagedFile) -> Self {
        Self {
            id: None,
            url: None,
            is_primary: false,
            upload: Some(file),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// Postal address of a property.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// Read-only projection of a property used as generation input. Assembled
/// by the caller (or `db::fetch_property_snapshot`) and never mutated by
/// the curation logic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertySnapshot {
    pub title: String,
    pub property_type: String,
    pub price: f64,
    pub bedrooms: u32,
    pub bathrooms: f64,
    pub square_feet: u32,
    pub year_built: i32,
    pub address: Address,
    pub features: Vec<String>,
    pub amenities: Vec<String>,
}
