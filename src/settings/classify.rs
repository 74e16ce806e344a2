// src/settings/classify.rs

//! Classification of raw file events into effective modification types.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::trace;

use crate::types::{FileEventKind, ModificationType, ReloadProgress};

/// Everything a rule may key off when deciding how to treat an event.
#[derive(Debug, Clone, Copy)]
pub struct FileEventContext<'a> {
    pub path: &'a Path,
    pub kind: FileEventKind,
    pub modification: ModificationType,
    pub reload: ReloadProgress,
}

/// Result of classifying a single settings-file event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Process the event with this effective modification type.
    Track(ModificationType),
    /// Drop the event entirely (ignore rule or generated-during-reload).
    Ignored,
}

type AdjustFn = dyn Fn(&Path, ModificationType) -> ModificationType + Send + Sync;
type IgnoreFn = dyn Fn(&FileEventContext<'_>) -> bool + Send + Sync;

struct IgnoreRule {
    paths: GlobSet,
    when: Arc<IgnoreFn>,
}

/// Classifies settings-file events, applying ignore and adjustment rules.
///
/// Membership in the settings set is decided by the caller (via
/// [`crate::settings::SettingsRegistry`]); this type only decides how a
/// member event is treated.
#[derive(Default)]
pub struct ModificationClassifier {
    adjusters: Vec<Arc<AdjustFn>>,
    ignores: Vec<IgnoreRule>,
}

impl ModificationClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an adjustment rule, e.g. downgrading Internal changes to
    /// generated lock/marker files to `Hidden`.
    ///
    /// Rules are applied in installation order; each sees the previous
    /// rule's output. A rule that maps External to Hidden is honoured — the
    /// classifier itself never hides an External change, only an explicit
    /// rule match does.
    pub fn add_adjustment_rule(
        &mut self,
        rule: impl Fn(&Path, ModificationType) -> ModificationType + Send + Sync + 'static,
    ) {
        self.adjusters.push(Arc::new(rule));
    }

    /// Ignore events on paths matching `pattern` whenever `when` returns
    /// true for the event context.
    pub fn add_ignore_rule(
        &mut self,
        pattern: &str,
        when: impl Fn(&FileEventContext<'_>) -> bool + Send + Sync + 'static,
    ) -> Result<()> {
        let glob = Glob::new(pattern)
            .with_context(|| format!("invalid ignore pattern: {pattern}"))?;
        let mut builder = GlobSetBuilder::new();
        builder.add(glob);
        self.ignores.push(IgnoreRule {
            paths: builder.build()?,
            when: Arc::new(when),
        });
        Ok(())
    }

    /// Classify a settings-file event.
    pub fn classify(&self, ctx: &FileEventContext<'_>) -> Classification {
        // Files appearing on disk while a reload is executing are the
        // reload's own output, not a user change.
        if ctx.kind == FileEventKind::Create
            && ctx.modification == ModificationType::External
            && ctx.reload == ReloadProgress::InProgress
        {
            trace!(path = ?ctx.path, "external creation during reload; ignored as generated");
            return Classification::Ignored;
        }

        for rule in &self.ignores {
            if rule.paths.is_match(ctx.path) && (rule.when)(ctx) {
                trace!(path = ?ctx.path, "event matched ignore rule");
                return Classification::Ignored;
            }
        }

        let mut ty = ctx.modification;
        for adjust in &self.adjusters {
            ty = adjust(ctx.path, ty);
        }

        Classification::Track(ty)
    }
}

impl std::fmt::Debug for ModificationClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModificationClassifier")
            .field("adjusters", &self.adjusters.len())
            .field("ignores", &self.ignores.len())
            .finish()
    }
}
