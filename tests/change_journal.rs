// tests/change_journal.rs

//! Event-merging and snapshot behaviour of the per-project change journal.

use std::path::{Path, PathBuf};

use reloadtrack::FileEventKind;
use reloadtrack::settings::ChangeJournal;

fn p(s: &str) -> PathBuf {
    PathBuf::from(s)
}

#[test]
fn delete_then_recreate_reads_as_update() {
    let mut journal = ChangeJournal::new();
    journal.record(Path::new("build.gradle"), FileEventKind::Delete);
    journal.record(Path::new("build.gradle"), FileEventKind::Create);

    let (ctx, undefined) = journal.snapshot();
    assert!(!undefined);
    assert!(ctx.created.is_empty());
    assert!(ctx.deleted.is_empty());
    assert_eq!(ctx.updated, [p("build.gradle")].into());
}

#[test]
fn create_then_delete_cancels_out() {
    let mut journal = ChangeJournal::new();
    journal.record(Path::new("scratch.toml"), FileEventKind::Create);
    journal.record(Path::new("scratch.toml"), FileEventKind::Update);
    journal.record(Path::new("scratch.toml"), FileEventKind::Delete);

    assert!(journal.is_empty());
}

#[test]
fn snapshot_partitions_are_disjoint_and_drain() {
    let mut journal = ChangeJournal::new();
    journal.record(Path::new("a.toml"), FileEventKind::Create);
    journal.record(Path::new("b.toml"), FileEventKind::Update);
    journal.record(Path::new("c.toml"), FileEventKind::Delete);

    let (ctx, _) = journal.snapshot();
    assert_eq!(ctx.created, [p("a.toml")].into());
    assert_eq!(ctx.updated, [p("b.toml")].into());
    assert_eq!(ctx.deleted, [p("c.toml")].into());

    assert!(journal.is_empty());
    let (ctx, undefined) = journal.snapshot();
    assert!(ctx.is_empty());
    assert!(!undefined);
}

#[test]
fn undefined_flag_survives_until_snapshot() {
    let mut journal = ChangeJournal::new();
    journal.mark_undefined();
    assert!(!journal.is_empty());

    let (ctx, undefined) = journal.snapshot();
    assert!(ctx.is_empty());
    assert!(undefined);
    assert!(journal.is_empty());
}

#[test]
fn revert_removes_the_path() {
    let mut journal = ChangeJournal::new();
    journal.record(Path::new("a.toml"), FileEventKind::Update);
    journal.record(Path::new("b.toml"), FileEventKind::Update);

    journal.remove(Path::new("a.toml"));
    assert!(!journal.is_empty());
    journal.remove(Path::new("b.toml"));
    assert!(journal.is_empty());
}

#[test]
fn restore_after_failed_reload_prefers_newer_events() {
    let mut journal = ChangeJournal::new();
    journal.record(Path::new("a.toml"), FileEventKind::Update);
    let (snapshot, undefined) = journal.snapshot();

    // Changes that landed while the failed reload was executing.
    journal.record(Path::new("a.toml"), FileEventKind::Delete);
    journal.record(Path::new("b.toml"), FileEventKind::Create);

    journal.restore(snapshot, undefined);

    let (ctx, undefined) = journal.snapshot();
    assert!(!undefined);
    // Update (old) followed by Delete (new) collapses to Delete.
    assert_eq!(ctx.deleted, [p("a.toml")].into());
    assert_eq!(ctx.created, [p("b.toml")].into());
}
