// src/lib.rs

//! Auto-reload coordination for build-system settings files.
//!
//! The hosting application registers one [`ProjectAware`] collaborator per
//! imported build descriptor and feeds raw file events into the
//! [`ProjectTracker`]. The tracker classifies each event, accumulates the
//! changed paths per project, keeps a causally-stamped status machine per
//! project, and schedules debounced, collision-safe reloads according to
//! the global [`AutoReloadType`] policy. Projects that cannot auto-reload
//! surface through [`ProjectTracker::projects_needing_notification`].

pub mod errors;
pub mod listener;
pub mod logging;
pub mod project;
pub mod scheduler;
pub mod settings;
pub mod stamp;
pub mod status;
pub mod tracker;
pub mod types;

pub use crate::errors::{ReloadTrackError, Result};
pub use crate::listener::Subscription;
pub use crate::project::{
    ProjectAware, ProjectAwareListener, ProjectId, ReloadContext, SettingsFilesContext,
};
pub use crate::stamp::{Stamp, StampSource};
pub use crate::status::{ProjectStatus, StatusKind};
pub use crate::tracker::{
    ChangeNature, FileEvent, ProjectTracker, TrackerOptions, TrackerStateSnapshot,
};
pub use crate::types::{
    AutoReloadType, FileEventKind, ModificationType, ReloadCollisionPolicy, ReloadStatus,
};
