// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::project::ProjectId;

#[derive(Error, Debug)]
pub enum ReloadTrackError {
    #[error("Project already registered: {0}")]
    DuplicateProject(ProjectId),

    #[error("Project not registered: {0}")]
    UnknownProject(ProjectId),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("State file parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("State file serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ReloadTrackError>;
