// tests/tracker_policy.rs

//! Auto-reload policy gating and classification rules at the tracker level.

use std::error::Error;

use reloadtrack::{
    AutoReloadType, FileEvent, FileEventKind, ModificationType, ProjectTracker, StatusKind,
    TrackerOptions,
};
use reloadtrack_test_utils::init_tracing;
use reloadtrack_test_utils::mock_project::MockProjectAware;

type TestResult = Result<(), Box<dyn Error>>;

fn sync_tracker(policy: AutoReloadType) -> ProjectTracker {
    ProjectTracker::with_options(TrackerOptions {
        async_execution: false,
        auto_reload_type: policy,
        ..TrackerOptions::default()
    })
}

fn update(path: &str, ty: ModificationType) -> FileEvent {
    FileEvent::new(path, FileEventKind::Update, ty)
}

#[tokio::test]
async fn policy_none_disables_all_reloads() -> TestResult {
    init_tracing();
    let tracker = sync_tracker(AutoReloadType::None);
    let project = MockProjectAware::new("gradle", "/p");
    project.register_settings_file("/p/build.toml");

    tracker.register(project.clone()).await?;
    assert_eq!(project.reload_count(), 0);
    assert_eq!(
        tracker.projects_needing_notification(),
        [project.id()].into()
    );

    tracker.handle_file_event(update("/p/build.toml", ModificationType::External)).await;
    assert_eq!(project.reload_count(), 0);

    // The explicit button still works.
    tracker.schedule_reload(&project.id()).await?;
    assert_eq!(project.reload_count(), 1);
    assert!(tracker.is_up_to_date(&project.id())?);
    Ok(())
}

#[tokio::test]
async fn policy_all_reloads_on_internal_changes() -> TestResult {
    init_tracing();
    let tracker = sync_tracker(AutoReloadType::All);
    let project = MockProjectAware::new("gradle", "/p");
    project.register_settings_file("/p/build.toml");
    tracker.register(project.clone()).await?;

    tracker.handle_file_event(update("/p/build.toml", ModificationType::Internal)).await;
    assert_eq!(project.reload_count(), 2);
    assert!(tracker.is_up_to_date(&project.id())?);
    Ok(())
}

#[tokio::test]
async fn loosening_the_policy_reconciles_pending_changes() -> TestResult {
    init_tracing();
    let tracker = sync_tracker(AutoReloadType::Selective);
    let project = MockProjectAware::new("gradle", "/p");
    project.register_settings_file("/p/build.toml");
    tracker.register(project.clone()).await?;

    tracker.set_auto_reload_type(AutoReloadType::None).await;
    tracker.handle_file_event(update("/p/build.toml", ModificationType::External)).await;
    assert_eq!(project.reload_count(), 1);
    assert_eq!(tracker.status_kind(&project.id())?, StatusKind::Modified);

    tracker.set_auto_reload_type(AutoReloadType::Selective).await;
    assert_eq!(project.reload_count(), 2);
    assert!(tracker.is_up_to_date(&project.id())?);
    Ok(())
}

#[tokio::test]
async fn tightening_the_policy_never_reloads() -> TestResult {
    init_tracing();
    let tracker = sync_tracker(AutoReloadType::Selective);
    let project = MockProjectAware::new("gradle", "/p");
    project.register_settings_file("/p/build.toml");
    tracker.register(project.clone()).await?;

    tracker.set_auto_reload_type(AutoReloadType::None).await;
    tracker.handle_file_event(update("/p/build.toml", ModificationType::Internal)).await;

    // Internal changes stay pending under Selective as well; switching back
    // must not reload them.
    tracker.set_auto_reload_type(AutoReloadType::Selective).await;
    assert_eq!(project.reload_count(), 1);
    assert_eq!(tracker.status_kind(&project.id())?, StatusKind::Modified);
    Ok(())
}

#[tokio::test]
async fn merged_internal_change_blocks_auto_reload() -> TestResult {
    init_tracing();
    let tracker = sync_tracker(AutoReloadType::Selective);
    let project = MockProjectAware::new("gradle", "/p");
    project.register_settings_file("/p/build.toml");
    project.register_settings_file("/p/settings.toml");
    tracker.register(project.clone()).await?;

    tracker.set_auto_reload_type(AutoReloadType::None).await;
    tracker.handle_file_event(update("/p/build.toml", ModificationType::Internal)).await;
    tracker.set_auto_reload_type(AutoReloadType::Selective).await;

    // An external change on top of a pending internal one must not reload:
    // the internal part still needs user confirmation.
    tracker.handle_file_event(update("/p/settings.toml", ModificationType::External)).await;
    assert_eq!(project.reload_count(), 1);
    assert_eq!(
        tracker.projects_needing_notification(),
        [project.id()].into()
    );
    Ok(())
}

#[tokio::test]
async fn hidden_changes_neither_reload_nor_notify() -> TestResult {
    init_tracing();
    let tracker = sync_tracker(AutoReloadType::All);
    let project = MockProjectAware::new("gradle", "/p");
    project.register_settings_file("/p/build.toml");
    project.register_settings_file("/p/generated.marker");
    tracker.register(project.clone()).await?;

    tracker.add_adjustment_rule(|path, ty| {
        if path.extension().is_some_and(|e| e == "marker") {
            ModificationType::Hidden
        } else {
            ty
        }
    });

    tracker
        .handle_file_event(update("/p/generated.marker", ModificationType::External))
        .await;
    assert_eq!(project.reload_count(), 1);
    assert!(!tracker.is_up_to_date(&project.id())?);
    assert!(tracker.projects_needing_notification().is_empty());

    // A real change afterwards covers the hidden one too.
    tracker.handle_file_event(update("/p/build.toml", ModificationType::External)).await;
    assert_eq!(project.reload_count(), 2);
    assert!(tracker.is_up_to_date(&project.id())?);
    Ok(())
}

#[tokio::test]
async fn ignore_rules_drop_events_entirely() -> TestResult {
    init_tracing();
    let tracker = sync_tracker(AutoReloadType::All);
    let project = MockProjectAware::new("gradle", "/p");
    project.register_settings_file("/p/deps.lock");
    tracker.register(project.clone()).await?;

    tracker.add_ignore_rule("**/*.lock", |_| true)?;

    tracker.handle_file_event(update("/p/deps.lock", ModificationType::External)).await;
    assert_eq!(project.reload_count(), 1);
    assert!(tracker.is_up_to_date(&project.id())?);
    assert!(tracker.projects_needing_notification().is_empty());
    Ok(())
}
