//! Campuses stored in the legacy `universities` shape.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use campus_hub_admin::models::{DesiredDorm, StorageShape};
use campus_hub_admin::services::{EditSession, SaveOutcome};
use campus_hub_core::{CampusId, LocationId};
use campus_hub_integration_tests::{CAMPUS_ID, TestContext, actor};
use serde_json::json;

#[tokio::test]
async fn test_legacy_campus_resolves_with_dorms() {
    let ctx = TestContext::new();
    ctx.seed_legacy_campus().await;

    let snapshot = ctx
        .engine()
        .snapshot(&CampusId::new(CAMPUS_ID))
        .await
        .unwrap();

    assert_eq!(snapshot.campus.shape, StorageShape::Legacy);
    // No isUniversity field on the legacy record.
    assert!(snapshot.campus.is_university);
    assert_eq!(snapshot.campus.short_name.as_deref(), Some("SU"));
    assert_eq!(snapshot.campus.admin_emails[0].as_str(), "dean@state.edu");
    assert_eq!(
        snapshot.campus.logo_url.as_deref(),
        Some("https://cdn.example/state.png")
    );
    let names: Vec<&str> = snapshot.dorms.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Pioneer Hall", "Old Main"]);
    assert_eq!(
        snapshot.dorms[0].location_id.as_ref().map(LocationId::as_str),
        Some("north")
    );
}

#[tokio::test]
async fn test_legacy_flag_false_is_respected() {
    let ctx = TestContext::new();
    ctx.put(
        "universities",
        CAMPUS_ID,
        json!({"name": "Community College", "isUniversity": false}),
    )
    .await;

    let snapshot = ctx
        .engine()
        .snapshot(&CampusId::new(CAMPUS_ID))
        .await
        .unwrap();
    assert!(!snapshot.campus.is_university);
}

#[tokio::test]
async fn test_save_migrates_legacy_campus() {
    let ctx = TestContext::new();
    ctx.seed_legacy_campus().await;

    let mut session = EditSession::load(&ctx.engine(), CampusId::new(CAMPUS_ID), actor())
        .await
        .unwrap();
    session.add_dorm(DesiredDorm::new("North Tower"));
    let outcome = session.save(&ctx.engine()).await.unwrap();
    let SaveOutcome::Saved(report) = outcome else {
        panic!("save held: {outcome:?}");
    };

    // The legacy child collection is always empty after a save.
    assert_eq!(ctx.store.len("universities/state/dorms").await, 0);
    assert_eq!(report.stats.legacy_dorms_purged, 2);
    assert_eq!(ctx.store.len("campuses/state/dorms").await, 3);
    // The legacy record itself is left as is.
    assert_eq!(ctx.store.len("universities").await, 1);

    assert_eq!(report.snapshot.campus.shape, StorageShape::Current);
    assert_eq!(report.snapshot.campus.name, "State University");
    assert_eq!(report.snapshot.dorms.len(), 3);
    assert_eq!(session.campus().short_name.as_deref(), Some("SU"));
    assert!(session.dorms().iter().all(|d| d.identity.is_identified()));
    assert!(session.pending().is_empty());
}

#[tokio::test]
async fn test_current_shape_wins_over_legacy() {
    let ctx = TestContext::new();
    ctx.seed_legacy_campus().await;
    ctx.seed_campus().await;

    let snapshot = ctx
        .engine()
        .snapshot(&CampusId::new(CAMPUS_ID))
        .await
        .unwrap();
    assert_eq!(snapshot.campus.shape, StorageShape::Current);
    assert_eq!(snapshot.campus.locations.len(), 2);
    // Current record has no dorms yet, so the legacy rows still show.
    assert_eq!(snapshot.dorms.len(), 2);
}
