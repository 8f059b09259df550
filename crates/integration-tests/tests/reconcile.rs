//! End-to-end saves through the edit session against the in-memory store.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use campus_hub_admin::db::{ClubRepository, DualPathResolver};
use campus_hub_admin::models::{DesiredDefaultClub, DesiredDorm, PendingDeletions};
use campus_hub_admin::services::{EditSession, ReconcileRequest, SaveOutcome};
use campus_hub_core::{CampusId, ClubId, LocationId};
use campus_hub_integration_tests::{CAMPUS_ID, TestContext, actor};
use serde_json::json;

fn campus_id() -> CampusId {
    CampusId::new(CAMPUS_ID)
}

async fn save(session: &mut EditSession, ctx: &TestContext) {
    let outcome = session.save(&ctx.engine()).await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved(_)), "{outcome:?}");
}

// =============================================================================
// Idempotence
// =============================================================================

#[tokio::test]
async fn test_same_save_twice_leaves_store_unchanged() {
    let ctx = TestContext::new();
    ctx.seed_campus().await;
    ctx.seed_account("acct-dean", "dean@state.edu").await;

    let mut session = EditSession::load(&ctx.engine(), campus_id(), actor())
        .await
        .unwrap();
    let mut dorm = DesiredDorm::new("Pioneer Hall");
    dorm.location_id = Some(LocationId::new("south"));
    session.add_dorm(dorm);
    session.add_dorm(DesiredDorm::new("Old Main"));
    let mut chess = DesiredDefaultClub::new("Chess");
    chess.category = Some("games".into());
    session.add_default_club(chess);
    save(&mut session, &ctx).await;

    let after_first = ctx.store.snapshot().await;
    let clubs_after_first = ctx.store.len("clubs").await;

    save(&mut session, &ctx).await;

    assert_eq!(ctx.store.snapshot().await, after_first);
    assert_eq!(ctx.store.len("clubs").await, clubs_after_first);
    assert_eq!(clubs_after_first, 3);
}

#[tokio::test]
async fn test_pioneer_hall_saved_twice_has_one_club() {
    let ctx = TestContext::new();
    ctx.seed_campus().await;

    let campus = EditSession::load(&ctx.engine(), campus_id(), actor())
        .await
        .unwrap()
        .campus()
        .clone();

    for _ in 0..2 {
        ctx.engine()
            .reconcile(ReconcileRequest {
                campus_id: campus_id(),
                campus: campus.clone(),
                dorms: vec![DesiredDorm::new("Pioneer Hall")],
                default_clubs: vec![],
                pending: PendingDeletions::default(),
                actor: actor(),
            })
            .await
            .unwrap();
    }

    let clubs = ClubRepository::new(&ctx.store, &ctx.collections)
        .list_for_campus(&campus_id())
        .await
        .unwrap();
    assert_eq!(clubs.len(), 1);
    assert_eq!(clubs[0].name, "Pioneer Hall");
    assert_eq!(clubs[0].category.as_deref(), Some("dorm"));
    assert!(!clubs[0].is_default);
    assert_eq!(ctx.store.len("campuses/state/dorms").await, 1);
}

#[tokio::test]
async fn test_new_club_owned_by_actor() {
    let ctx = TestContext::new();
    ctx.seed_campus().await;

    let mut session = EditSession::load(&ctx.engine(), campus_id(), actor())
        .await
        .unwrap();
    session.add_dorm(DesiredDorm::new("Pioneer Hall"));
    save(&mut session, &ctx).await;

    let clubs = ClubRepository::new(&ctx.store, &ctx.collections);
    let club = clubs
        .find_dorm_club(&campus_id(), "Pioneer Hall")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(club.member_count, 1);
    assert_eq!(club.admin_ids, vec![actor().account_id]);
    assert_eq!(club.admin_emails.len(), 1);
    assert_eq!(club.admin_emails[0].as_str(), "dean@state.edu");

    let members = clubs.members(&club.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].account_id, actor().account_id);
}

// =============================================================================
// Orphan Cleanup
// =============================================================================

async fn seed_three_dorms(ctx: &TestContext) -> EditSession {
    ctx.seed_campus().await;
    let mut session = EditSession::load(&ctx.engine(), campus_id(), actor())
        .await
        .unwrap();
    for name in ["A", "B", "C"] {
        session.add_dorm(DesiredDorm::new(name));
    }
    save(&mut session, ctx).await;
    session
}

async fn dorm_names(ctx: &TestContext) -> Vec<String> {
    let mut names: Vec<String> = DualPathResolver::new(&ctx.store, &ctx.collections)
        .resolve_child_list(&campus_id())
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.name)
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_orphan_dorm_row_deleted_and_unqueued_club_survives() {
    let ctx = TestContext::new();
    let session = seed_three_dorms(&ctx).await;

    // Bypass the session so B is dropped without being queued.
    let dorms = session
        .dorms()
        .iter()
        .filter(|d| d.name != "B")
        .cloned()
        .collect();
    let report = ctx
        .engine()
        .reconcile(ReconcileRequest {
            campus_id: campus_id(),
            campus: session.campus().clone(),
            dorms,
            default_clubs: vec![],
            pending: PendingDeletions::default(),
            actor: actor(),
        })
        .await
        .unwrap();

    assert_eq!(report.stats.dorms_deleted, 1);
    assert_eq!(dorm_names(&ctx).await, vec!["A", "C"]);
    let clubs = ClubRepository::new(&ctx.store, &ctx.collections);
    assert!(
        clubs
            .find_dorm_club(&campus_id(), "B")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_removed_dorm_club_deleted_after_confirmation() {
    let ctx = TestContext::new();
    let mut session = seed_three_dorms(&ctx).await;
    let clubs = ClubRepository::new(&ctx.store, &ctx.collections);
    let b_club = clubs
        .find_dorm_club(&campus_id(), "B")
        .await
        .unwrap()
        .unwrap();

    session.remove_dorm("B").unwrap();
    let engine = ctx.engine();
    let mut outcome = session.save(&engine).await.unwrap();
    while let SaveOutcome::AwaitingConfirmation(_) = outcome {
        outcome = session.advance(&engine).await.unwrap();
    }

    assert_eq!(dorm_names(&ctx).await, vec!["A", "C"]);
    assert!(clubs.get(&b_club.id).await.unwrap().is_none());
    assert!(clubs.members(&b_club.id).await.unwrap().is_empty());
    assert!(session.pending().is_empty());
}

// =============================================================================
// Default-Club Partition
// =============================================================================

#[tokio::test]
async fn test_dorm_and_default_paths_never_cross() {
    let ctx = TestContext::new();
    ctx.seed_campus().await;

    let mut session = EditSession::load(&ctx.engine(), campus_id(), actor())
        .await
        .unwrap();
    // Same name on both paths stays two separate clubs.
    session.add_dorm(DesiredDorm::new("Commons"));
    session.add_dorm(DesiredDorm::new("Pioneer Hall"));
    let mut commons = DesiredDefaultClub::new("Commons");
    commons.category = Some("social".into());
    session.add_default_club(commons);
    session.add_default_club(DesiredDefaultClub::new("Chess"));
    save(&mut session, &ctx).await;

    let clubs = ClubRepository::new(&ctx.store, &ctx.collections)
        .list_for_campus(&campus_id())
        .await
        .unwrap();
    assert_eq!(clubs.len(), 4);
    for club in &clubs {
        if club.is_default {
            assert_ne!(club.category.as_deref(), Some("dorm"), "{}", club.name);
        } else {
            assert_eq!(club.category.as_deref(), Some("dorm"), "{}", club.name);
        }
    }
    assert_eq!(clubs.iter().filter(|c| c.is_default).count(), 2);
    assert_eq!(session.default_clubs().len(), 2);
    assert!(session.default_clubs().iter().all(|c| c.identity.is_identified()));
}

#[tokio::test]
async fn test_renamed_default_club_keeps_its_record() {
    let ctx = TestContext::new();
    ctx.seed_campus().await;

    let mut session = EditSession::load(&ctx.engine(), campus_id(), actor())
        .await
        .unwrap();
    session.add_default_club(DesiredDefaultClub::new("Chess"));
    save(&mut session, &ctx).await;
    let id = session.default_clubs()[0].identity.id().cloned().unwrap();

    session.default_club_mut("Chess").unwrap().name = "Chess Society".into();
    save(&mut session, &ctx).await;

    let club = ClubRepository::new(&ctx.store, &ctx.collections)
        .get(&id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(club.name, "Chess Society");
    assert_eq!(ctx.store.len("clubs").await, 1);
}

// =============================================================================
// Clubs Created Outside the Engine
// =============================================================================

#[tokio::test]
async fn test_existing_club_without_default_flag_is_reused() {
    let ctx = TestContext::new();
    ctx.seed_campus().await;
    ctx.put(
        "clubs",
        "club-old",
        json!({"name": "Pioneer Hall", "campusId": CAMPUS_ID, "category": "dorm"}),
    )
    .await;

    let mut session = EditSession::load(&ctx.engine(), campus_id(), actor())
        .await
        .unwrap();
    session.add_dorm(DesiredDorm::new("Pioneer Hall"));
    save(&mut session, &ctx).await;
    save(&mut session, &ctx).await;

    let clubs = ClubRepository::new(&ctx.store, &ctx.collections)
        .list_for_campus(&campus_id())
        .await
        .unwrap();
    assert_eq!(clubs.len(), 1);
    assert_eq!(clubs[0].id, ClubId::new("club-old"));
    assert!(!clubs[0].is_default);
    assert!(session.default_clubs().is_empty());
}

#[tokio::test]
async fn test_names_are_matched_exactly() {
    let ctx = TestContext::new();
    ctx.seed_campus().await;
    ctx.put(
        "clubs",
        "club-old",
        json!({"name": "Pioneer Hall ", "campusId": CAMPUS_ID, "isDefault": false, "category": "dorm"}),
    )
    .await;

    let mut session = EditSession::load(&ctx.engine(), campus_id(), actor())
        .await
        .unwrap();
    session.add_dorm(DesiredDorm::new("Pioneer Hall "));
    save(&mut session, &ctx).await;

    assert_eq!(ctx.store.len("clubs").await, 1);
    assert_eq!(dorm_names(&ctx).await, vec!["Pioneer Hall "]);
    assert!(session.dorm_mut("Pioneer Hall ").is_ok());
}

#[tokio::test]
async fn test_renamed_dorm_gets_new_club_and_old_club_stays() {
    let ctx = TestContext::new();
    let mut session = seed_three_dorms(&ctx).await;
    let clubs = ClubRepository::new(&ctx.store, &ctx.collections);
    let old_club = clubs
        .find_dorm_club(&campus_id(), "B")
        .await
        .unwrap()
        .unwrap();
    let dorm_id = session.dorm_mut("B").unwrap().identity.id().cloned().unwrap();

    session.dorm_mut("B").unwrap().name = "Founders Hall".into();
    let outcome = session.save(&ctx.engine()).await.unwrap();
    let SaveOutcome::Saved(report) = outcome else {
        panic!("rename was held at the gate: {outcome:?}");
    };

    // The row keeps its id; club binding goes by name.
    assert_eq!(report.stats.dorms_deleted, 0);
    assert_eq!(report.stats.dorm_clubs_created, 1);
    assert_eq!(dorm_names(&ctx).await, vec!["A", "C", "Founders Hall"]);
    let renamed = session
        .dorms()
        .iter()
        .find(|d| d.name == "Founders Hall")
        .unwrap();
    assert_eq!(renamed.identity.id(), Some(&dorm_id));

    assert!(clubs.get(&old_club.id).await.unwrap().is_some());
    assert!(
        clubs
            .find_dorm_club(&campus_id(), "Founders Hall")
            .await
            .unwrap()
            .is_some()
    );
    assert_eq!(ctx.store.len("clubs").await, 4);
}
