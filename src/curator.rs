//! Asset curator: the ordered image set of one property.
//!
//! `stage_images`, `remove_image` and `set_primary` are pure functions over
//! an in-memory sequence; every mutation ends by re-establishing the
//! single-primary invariant. `commit` is the only operation with side
//! effects: it pushes staged binaries through the upload collaborator and
//! inserts a record per newly committed image.

use futures::future::join_all;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{self, NewImageRecord, Pool};
use crate::model::{PropertyImage, StagedFile};
use crate::storage::BlobUploader;

#[derive(Debug, Error)]
pub enum CuratorError {
    #[error("cannot stage {staged} more image(s): set has {current} of {max} allowed")]
    CapacityExceeded {
        current: usize,
        staged: usize,
        max: usize,
    },
    #[error("image index {index} out of range (set has {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Why one image of a commit did not make it into the record store.
#[derive(Debug)]
pub enum CommitFailure {
    Upload { index: usize, reason: String },
    Store { index: usize, reason: String },
}

impl CommitFailure {
    pub fn index(&self) -> usize {
        match self {
            CommitFailure::Upload { index, .. } | CommitFailure::Store { index, .. } => *index,
        }
    }
}

/// Per-item result of a commit. Successes are never rolled back; images
/// listed in `failed` keep whatever progress they made (a failed store
/// insert retains the uploaded URL so a retry skips the re-upload).
#[derive(Debug)]
pub struct CommitOutcome {
    pub images: Vec<PropertyImage>,
    pub committed: Vec<usize>,
    pub failed: Vec<CommitFailure>,
}

impl CommitOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Rebuild the in-memory set from the stored records of a property,
/// preserving order and the primary flag.
pub fn from_records(records: &[db::ImageRecord]) -> Vec<PropertyImage> {
    records
        .iter()
        .map(|r| PropertyImage {
            id: Some(r.id),
            url: Some(r.url.clone()),
            is_primary: r.is_primary,
            upload: None,
        })
        .collect()
}

/// Append staged files to the set. Rejected atomically with
/// `CapacityExceeded` when the result would exceed `max_images` — no
/// partial append.
pub fn stage_images(
    set: &[PropertyImage],
    files: Vec<StagedFile>,
    max_images: usize,
) -> Result<Vec<PropertyImage>, CuratorError> {
    if set.len() + files.len() > max_images {
        return Err(CuratorError::CapacityExceeded {
            current: set.len(),
            staged: files.len(),
            max: max_images,
        });
    }

    let mut next: Vec<PropertyImage> = set.to_vec();
    next.extend(files.into_iter().map(PropertyImage::staged));
    reestablish_primary(&mut next);
    Ok(next)
}

/// Remove the image at `index`. If it was the primary and images remain,
/// the first remaining image takes over.
pub fn remove_image(
    set: &[PropertyImage],
    index: usize,
) -> Result<Vec<PropertyImage>, CuratorError> {
    if index >= set.len() {
        return Err(CuratorError::IndexOutOfRange {
            index,
            len: set.len(),
        });
    }

    let mut next: Vec<PropertyImage> = set.to_vec();
    next.remove(index);
    reestablish_primary(&mut next);
    Ok(next)
}

/// Designate the image at `index` as primary, clearing the flag everywhere
/// else. Idempotent when already primary.
pub fn set_primary(
    set: &[PropertyImage],
    index: usize,
) -> Result<Vec<PropertyImage>, CuratorError> {
    if index >= set.len() {
        return Err(CuratorError::IndexOutOfRange {
            index,
            len: set.len(),
        });
    }

    let mut next: Vec<PropertyImage> = set.to_vec();
    for (i, image) in next.iter_mut().enumerate() {
        image.is_primary = i == index;
    }
    Ok(next)
}

/// Restore the invariant: a non-empty set has exactly one primary. The
/// first image wins both when no primary exists (covers the very first
/// staged image) and when more than one slipped in.
pub fn reestablish_primary(set: &mut [PropertyImage]) {
    if set.is_empty() {
        return;
    }
    let Some(first_primary) = set.iter().position(|img| img.is_primary) else {
        set[0].is_primary = true;
        return;
    };
    for (i, image) in set.iter_mut().enumerate() {
        image.is_primary = i == first_primary;
    }
}

/// Upload every staged payload and insert a record for each image whose own
/// upload succeeded, tagging `is_primary` and position from in-memory
/// state. Uploads are issued concurrently; a record insert never happens
/// before the corresponding upload has returned success.
pub async fn commit(
    pool: &Pool,
    uploader: &dyn BlobUploader,
    property_id: Uuid,
    set: Vec<PropertyImage>,
) -> CommitOutcome {
    let mut images = set;
    let mut committed = Vec::new();
    let mut failed = Vec::new();

    // Phase 1: push pending binaries, independently per image.
    let pending: Vec<(usize, StagedFile)> = images
        .iter()
        .enumerate()
        .filter_map(|(i, img)| match (&img.upload, &img.url) {
            (Some(file), None) => Some((i, file.clone())),
            _ => None,
        })
        .collect();

    let uploads = join_all(pending.iter().map(|(_, file)| uploader.upload(file))).await;

    for ((index, _), result) in pending.into_iter().zip(uploads) {
        match result {
            Ok(url) => {
                images[index].url = Some(url);
                images[index].upload = None;
            }
            Err(err) => {
                warn!(index, ?err, "image upload failed");
                failed.push(CommitFailure::Upload {
                    index,
                    reason: err.to_string(),
                });
            }
        }
    }

    // Phase 2: insert records for uploaded-but-unpersisted images.
    let to_insert: Vec<usize> = images
        .iter()
        .enumerate()
        .filter(|(_, img)| img.url.is_some() && img.id.is_none())
        .map(|(i, _)| i)
        .collect();

    if !to_insert.is_empty() {
        let records: Vec<NewImageRecord> = to_insert
            .iter()
            .map(|&i| NewImageRecord {
                url: images[i].url.clone().unwrap_or_default(),
                is_primary: images[i].is_primary,
                position: i as i64,
            })
            .collect();

        match db::insert_images(pool, property_id, &records).await {
            Ok(ids) => {
                for (&index, id) in to_insert.iter().zip(ids) {
                    images[index].id = Some(id);
                    committed.push(index);
                }
                info!(
                    property_id = %property_id,
                    count = committed.len(),
                    "committed image records"
                );
            }
            Err(err) => {
                warn!(property_id = %property_id, ?err, "image record insert failed");
                for &index in &to_insert {
                    failed.push(CommitFailure::Store {
                        index,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    failed.sort_by_key(|f| f.index());
    CommitOutcome {
        images,
        committed,
        failed,
    }
}
