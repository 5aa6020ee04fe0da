//! Content-and-asset curation engine for a property-listing and
//! valuation-report application.
//!
//! Two independent components, composed only by the caller:
//! - [`curator`] keeps a property's ordered image set consistent (exactly
//!   one primary image) and commits staged binaries through the upload
//!   collaborator into the record store.
//! - [`content`] drives the generate / edit / persist lifecycle of the
//!   AI-assisted report sections, with the text provider behind a trait.

pub mod config;
pub mod content;
pub mod curator;
pub mod db;
pub mod model;
pub mod prompts;
pub mod provider;
pub mod storage;
