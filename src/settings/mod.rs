// src/settings/mod.rs

//! Settings-file bookkeeping.
//!
//! This module is responsible for:
//! - caching each project's settings-file set ([`registry`]),
//! - classifying raw file events into effective modification types, with
//!   glob-based ignore and adjustment rules ([`classify`]),
//! - accumulating and partitioning per-path changes between reload snapshots
//!   ([`journal`]).
//!
//! It does **not** know about scheduling or policy; it only turns filesystem
//! facts into per-project modification state.

pub mod classify;
pub mod journal;
pub mod registry;

pub use classify::{Classification, FileEventContext, ModificationClassifier};
pub use journal::ChangeJournal;
pub use registry::SettingsRegistry;
