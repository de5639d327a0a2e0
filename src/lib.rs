//! Incremental BeatSaver map harvester.
//!
//! Walks the `/maps/latest` feed newest-first, persists each map's metadata
//! and payload archive into a per-map directory, skips maps already on disk,
//! and repairs half-finished downloads at startup. A separate pass expands
//! the downloaded archives in place.

pub mod config;
pub mod corpus;
pub mod domain;
pub mod error;
pub mod expand;
pub mod feed;
pub mod harvester;
pub mod store;
