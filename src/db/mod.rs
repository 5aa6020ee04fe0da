//! Record store: entity models and SQL repositories.
//!
//! Split into two submodules:
//! - `model`: typed rows returned by the repositories.
//! - `repo`: SQL-only functions that map rows into those types.
//!
//! External modules import from `listing_curator::db` — the repository API
//! and row types are re-exported here.

pub mod model;
pub mod repo;

pub use model::{ImageRecord, NewImageRecord, Report, SlotRecord};
pub use repo::*;
