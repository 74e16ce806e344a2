// tests/classify_rules.rs

//! Ignore and adjustment rules of the modification classifier.

use std::path::Path;

use reloadtrack::settings::{Classification, FileEventContext, ModificationClassifier};
use reloadtrack::types::{FileEventKind, ModificationType, ReloadProgress};

fn ctx<'a>(
    path: &'a Path,
    kind: FileEventKind,
    modification: ModificationType,
    reload: ReloadProgress,
) -> FileEventContext<'a> {
    FileEventContext {
        path,
        kind,
        modification,
        reload,
    }
}

#[test]
fn plain_event_tracks_with_its_own_type() {
    let classifier = ModificationClassifier::new();
    let c = classifier.classify(&ctx(
        Path::new("/p/build.toml"),
        FileEventKind::Update,
        ModificationType::External,
        ReloadProgress::NotStarted,
    ));
    assert_eq!(c, Classification::Track(ModificationType::External));
}

#[test]
fn external_creation_during_reload_is_generated_output() {
    let classifier = ModificationClassifier::new();
    let c = classifier.classify(&ctx(
        Path::new("/p/generated.lock"),
        FileEventKind::Create,
        ModificationType::External,
        ReloadProgress::InProgress,
    ));
    assert_eq!(c, Classification::Ignored);

    // Updates during a reload are still real changes.
    let c = classifier.classify(&ctx(
        Path::new("/p/build.toml"),
        FileEventKind::Update,
        ModificationType::External,
        ReloadProgress::InProgress,
    ));
    assert_eq!(c, Classification::Track(ModificationType::External));
}

#[test]
fn ignore_rule_matches_glob_and_condition() {
    let mut classifier = ModificationClassifier::new();
    classifier
        .add_ignore_rule("**/*.lock", |ctx| ctx.kind != FileEventKind::Delete)
        .unwrap();

    let c = classifier.classify(&ctx(
        Path::new("/p/deps.lock"),
        FileEventKind::Update,
        ModificationType::External,
        ReloadProgress::NotStarted,
    ));
    assert_eq!(c, Classification::Ignored);

    // Condition does not hold: event is tracked.
    let c = classifier.classify(&ctx(
        Path::new("/p/deps.lock"),
        FileEventKind::Delete,
        ModificationType::External,
        ReloadProgress::NotStarted,
    ));
    assert_eq!(c, Classification::Track(ModificationType::External));

    // Different path: rule does not apply.
    let c = classifier.classify(&ctx(
        Path::new("/p/build.toml"),
        FileEventKind::Update,
        ModificationType::External,
        ReloadProgress::NotStarted,
    ));
    assert_eq!(c, Classification::Track(ModificationType::External));
}

#[test]
fn adjustment_rules_chain_in_order() {
    let mut classifier = ModificationClassifier::new();
    classifier.add_adjustment_rule(|path, ty| {
        if path.ends_with("marker.txt") {
            ModificationType::Hidden
        } else {
            ty
        }
    });
    classifier.add_adjustment_rule(|_, ty| {
        if ty == ModificationType::Internal {
            ModificationType::External
        } else {
            ty
        }
    });

    let c = classifier.classify(&ctx(
        Path::new("/p/marker.txt"),
        FileEventKind::Update,
        ModificationType::Internal,
        ReloadProgress::NotStarted,
    ));
    assert_eq!(c, Classification::Track(ModificationType::Hidden));

    let c = classifier.classify(&ctx(
        Path::new("/p/build.toml"),
        FileEventKind::Update,
        ModificationType::Internal,
        ReloadProgress::NotStarted,
    ));
    assert_eq!(c, Classification::Track(ModificationType::External));
}

#[test]
fn invalid_ignore_pattern_is_rejected() {
    let mut classifier = ModificationClassifier::new();
    assert!(classifier.add_ignore_rule("a{b", |_| true).is_err());
}
