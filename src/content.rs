//! Content slot manager: the generate / edit / persist lifecycle of one
//! report section.
//!
//! Each slot walks Empty -> Generated -> Edited -> Generated -> ... A
//! failed generation is a self-loop: the slot keeps its previous text and
//! provenance untouched.

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{self, Pool};
use crate::model::{ContentSlot, PropertySnapshot, SlotContent, SlotKind};
use crate::prompts::{self, PromptTemplates};
use crate::provider::TextGenerator;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("executive summary requires a valuation figure")]
    MissingValuation,
    #[error("generation failed for {kind}: {reason}", kind = .kind.as_str())]
    GenerationFailed { kind: SlotKind, reason: String },
    #[error("failed to persist {kind} section", kind = .kind.as_str())]
    StoreWriteFailed {
        kind: SlotKind,
        #[source]
        source: anyhow::Error,
    },
}

/// Build the prompt for the slot, call the provider and replace the slot's
/// text wholesale on success. On any failure the slot is left exactly as it
/// was.
///
/// `max_chars` caps the accepted text length; overlong completions are
/// truncated on a char boundary.
pub async fn generate(
    provider: &dyn TextGenerator,
    templates: &PromptTemplates,
    slot: &mut ContentSlot,
    snapshot: &PropertySnapshot,
    valuation: Option<f64>,
    max_chars: Option<usize>,
) -> Result<String, ContentError> {
    if slot.kind == SlotKind::ExecutiveSummary && valuation.is_none() {
        return Err(ContentError::MissingValuation);
    }

    let prompt = prompts::render(templates, slot.kind, snapshot, valuation);
    let text = provider
        .generate(&prompt, slot.kind.max_tokens())
        .await
        .map_err(|err| {
            warn!(kind = slot.kind.as_str(), ?err, "generation failed");
            ContentError::GenerationFailed {
                kind: slot.kind,
                reason: err.to_string(),
            }
        })?;

    if text.trim().is_empty() {
        return Err(ContentError::GenerationFailed {
            kind: slot.kind,
            reason: "provider returned empty text".to_string(),
        });
    }

    let text = truncate_chars(text, max_chars);
    info!(
        kind = slot.kind.as_str(),
        chars = text.chars().count(),
        "slot generated"
    );
    slot.content = SlotContent::Generated(text.clone());
    Ok(text)
}

/// Replace the slot's text with a human edit. Purely local; accepts any
/// string — rejecting empty saves is the calling form's concern.
pub fn edit(slot: &mut ContentSlot, new_text: impl Into<String>) {
    slot.content = SlotContent::Edited(new_text.into());
}

/// Write the slot's current `(text, provenance)` to the record store, keyed
/// by report and kind. The in-memory slot is unchanged either way.
pub async fn persist(pool: &Pool, report_id: Uuid, slot: &ContentSlot) -> Result<(), ContentError> {
    db::write_slot(
        pool,
        report_id,
        slot.kind,
        slot.content.text(),
        slot.content.provenance(),
    )
    .await
    .map_err(|source| ContentError::StoreWriteFailed {
        kind: slot.kind,
        source,
    })
}

/// Rebuild a slot from the record store; an absent row is an empty slot.
pub async fn load_slot(pool: &Pool, report_id: Uuid, kind: SlotKind) -> anyhow::Result<ContentSlot> {
    let content = match db::read_slot(pool, report_id, kind).await? {
        Some(row) => SlotContent::from_stored(&row.text, &row.provenance),
        None => SlotContent::Empty,
    };
    Ok(ContentSlot { kind, content })
}

fn truncate_chars(text: String, max_chars: Option<usize>) -> String {
    match max_chars {
        Some(max) if text.chars().count() > max => text.chars().take(max).collect(),
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_sets_edited_provenance() {
        let mut slot = ContentSlot::empty(SlotKind::Description);
        edit(&mut slot, "hand-written");
        assert_eq!(slot.content, SlotContent::Edited("hand-written".into()));
    }

    #[test]
    fn edit_accepts_empty_string() {
        let mut slot = ContentSlot {
            kind: SlotKind::Description,
            content: SlotContent::Generated("old".into()),
        };
        edit(&mut slot, "");
        assert_eq!(slot.content, SlotContent::Edited(String::new()));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("áéíóú".into(), Some(3)), "áéí");
        assert_eq!(truncate_chars("short".into(), Some(100)), "short");
        assert_eq!(truncate_chars("unbounded".into(), None), "unbounded");
    }
}
