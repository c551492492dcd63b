//! Behavior tests against a live Postgres.
//!
//! Set DATABASE_URL and run with `cargo test -- --ignored`. The schema is
//! created on first use; tests use disjoint user id ranges and fresh shift
//! UUIDs so they can run in parallel against a shared database.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures_util::future::join_all;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    extractors::{Actor, Role},
    marketplace::{
        ops::Marketplace,
        shift_ref::{PgShiftReference, ShiftReference},
        sweeper,
    },
    models::{
        CreateListingInput, CreateSwapInput, ListingKind, ListingStatus, ReviewInput,
        ShiftSummary, SwapStatus,
    },
    AppError, AppResult,
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS shifts (
        id UUID PRIMARY KEY,
        store_id INTEGER NOT NULL,
        assignee_id INTEGER,
        starts_at TIMESTAMPTZ NOT NULL,
        ends_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS listings (
        id SERIAL PRIMARY KEY,
        shift_id UUID NOT NULL,
        kind TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'PENDING',
        offered_by INTEGER NOT NULL,
        claimed_by INTEGER,
        note TEXT,
        reviewed_by INTEGER,
        reviewed_at TIMESTAMPTZ,
        expires_at TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS swap_requests (
        id SERIAL PRIMARY KEY,
        from_shift_id UUID NOT NULL,
        to_shift_id UUID NOT NULL,
        from_user_id INTEGER NOT NULL,
        to_user_id INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'PENDING_PEER',
        peer_confirmed BOOLEAN NOT NULL DEFAULT FALSE,
        note TEXT,
        reviewed_by INTEGER,
        reviewed_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_listings_active_shift ON listings (shift_id)
        WHERE status IN ('PENDING', 'CLAIMED')",
    "CREATE INDEX IF NOT EXISTS idx_listings_expiry ON listings (expires_at)
        WHERE status IN ('PENDING', 'CLAIMED')",
];

async fn test_pool() -> PgPool {
    let url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set to run these tests");
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to {}: {}", url, e));
    setup_schema(&pool).await;
    pool
}

async fn setup_schema(pool: &PgPool) {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .unwrap_or_else(|e| panic!("schema statement failed: {}", e));
    }
}

async fn seed_shift(pool: &PgPool, assignee_id: Option<i32>, starts_in_hours: i64) -> Uuid {
    let id = Uuid::new_v4();
    let starts_at = Utc::now() + Duration::hours(starts_in_hours);
    sqlx::query(
        "INSERT INTO shifts (id, store_id, assignee_id, starts_at, ends_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(1)
    .bind(assignee_id)
    .bind(starts_at)
    .bind(starts_at + Duration::hours(8))
    .execute(pool)
    .await
    .unwrap_or_else(|e| panic!("seed shift failed: {}", e));
    id
}

/// Inserts a listing whose deadline already passed, something the public API
/// refuses to create.
async fn seed_stale_listing(
    pool: &PgPool,
    shift_id: Uuid,
    offered_by: i32,
    claimed_by: Option<i32>,
) -> i32 {
    let status = if claimed_by.is_some() {
        "CLAIMED"
    } else {
        "PENDING"
    };
    sqlx::query_scalar(
        "INSERT INTO listings (shift_id, kind, status, offered_by, claimed_by, expires_at)
         VALUES ($1, 'GIVE_AWAY', $2, $3, $4, NOW() - INTERVAL '1 minute')
         RETURNING id",
    )
    .bind(shift_id)
    .bind(status)
    .bind(offered_by)
    .bind(claimed_by)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("seed listing failed: {}", e))
}

async fn assignee_of(pool: &PgPool, shift_id: Uuid) -> Option<i32> {
    sqlx::query_scalar("SELECT assignee_id FROM shifts WHERE id = $1")
        .bind(shift_id)
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| panic!("shift lookup failed: {}", e))
}

fn staff(id: i32) -> Actor {
    Actor {
        id,
        role: Role::Staff,
    }
}

fn manager(id: i32) -> Actor {
    Actor {
        id,
        role: Role::Manager,
    }
}

fn give_away(shift_id: Uuid) -> CreateListingInput {
    CreateListingInput {
        shift_id,
        kind: ListingKind::GiveAway,
        expires_at: None,
    }
}

fn approve_with_no_note() -> ReviewInput {
    ReviewInput {
        approve: true,
        note: None,
    }
}

/// Delegates to the real rota but fails one chosen reassign call, to drive
/// the compensation paths.
struct FlakyShiftReference {
    inner: PgShiftReference,
    fail_on_call: usize,
    calls: AtomicUsize,
}

impl FlakyShiftReference {
    fn new(pool: PgPool, fail_on_call: usize) -> Self {
        Self {
            inner: PgShiftReference::new(pool),
            fail_on_call,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ShiftReference for FlakyShiftReference {
    async fn get_shift(&self, shift_id: Uuid) -> AppResult<Option<ShiftSummary>> {
        self.inner.get_shift(shift_id).await
    }

    async fn reassign(
        &self,
        shift_id: Uuid,
        from_user_id: i32,
        to_user_id: i32,
    ) -> AppResult<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == self.fail_on_call {
            return Err(AppError::ReassignmentFailed(
                "rota service rejected the move".to_string(),
            ));
        }
        self.inner.reassign(shift_id, from_user_id, to_user_id).await
    }
}

fn flaky_market(pool: &PgPool, fail_on_call: usize) -> Marketplace {
    let shifts: Arc<dyn ShiftReference> =
        Arc::new(FlakyShiftReference::new(pool.clone(), fail_on_call));
    Marketplace::with_shift_reference(pool.clone(), shifts)
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn two_concurrent_claims_produce_exactly_one_winner() {
    let pool = test_pool().await;
    let market = Marketplace::new(pool.clone());

    let shift_id = seed_shift(&pool, Some(9001), 24).await;
    let listing = market
        .create_listing(staff(9001), give_away(shift_id))
        .await
        .unwrap_or_else(|e| panic!("create failed: {}", e));

    let claim_futures = (9002..9010).map(|claimant| {
        let market = market.clone();
        async move { (claimant, market.claim_listing(staff(claimant), listing.id).await) }
    });
    let outcomes = join_all(claim_futures).await;

    let winners: Vec<i32> = outcomes
        .iter()
        .filter(|(_, outcome)| outcome.is_ok())
        .map(|(claimant, _)| *claimant)
        .collect();
    assert_eq!(winners.len(), 1, "exactly one claimant may win");

    for (claimant, outcome) in &outcomes {
        let Err(e) = outcome else { continue };
        match e {
            AppError::ClaimLost { status } => assert_eq!(*status, ListingStatus::Claimed),
            AppError::InvalidState(msg) => assert!(
                msg.contains("not PENDING"),
                "claimant {} got unexpected denial: {}",
                claimant,
                msg
            ),
            other => panic!("claimant {} got unexpected error: {:?}", claimant, other),
        }
    }

    let settled = market
        .listings
        .fetch(listing.id)
        .await
        .unwrap_or_else(|e| panic!("fetch failed: {}", e));
    assert_eq!(settled.status, ListingStatus::Claimed);
    assert_eq!(settled.claimed_by, Some(winners[0]));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn give_away_lifecycle_reassigns_the_shift() {
    let pool = test_pool().await;
    let market = Marketplace::new(pool.clone());

    let shift_id = seed_shift(&pool, Some(9101), 24).await;
    let listing = market
        .create_listing(staff(9101), give_away(shift_id))
        .await
        .unwrap_or_else(|e| panic!("create failed: {}", e));
    assert_eq!(listing.status, ListingStatus::Pending);

    let claimed = market
        .claim_listing(staff(9102), listing.id)
        .await
        .unwrap_or_else(|e| panic!("claim failed: {}", e));
    assert_eq!(claimed.status, ListingStatus::Claimed);
    assert_eq!(claimed.claimed_by, Some(9102));

    let approved = market
        .review_listing(
            manager(9190),
            listing.id,
            ReviewInput {
                approve: true,
                note: Some("covered".to_string()),
            },
        )
        .await
        .unwrap_or_else(|e| panic!("review failed: {}", e));
    assert_eq!(approved.status, ListingStatus::Approved);
    assert_eq!(approved.reviewed_by, Some(9190));
    assert_eq!(approved.claimed_by, Some(9102));

    assert_eq!(assignee_of(&pool, shift_id).await, Some(9102));

    let err = market
        .claim_listing(staff(9103), listing.id)
        .await
        .expect_err("approved listing must not be claimable");
    match err {
        AppError::InvalidState(msg) => assert!(msg.contains("not PENDING")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn failed_reassignment_rolls_back_the_approval() {
    let pool = test_pool().await;
    let market = flaky_market(&pool, 0);

    let shift_id = seed_shift(&pool, Some(9201), 24).await;
    let listing = market
        .create_listing(staff(9201), give_away(shift_id))
        .await
        .unwrap_or_else(|e| panic!("create failed: {}", e));
    market
        .claim_listing(staff(9202), listing.id)
        .await
        .unwrap_or_else(|e| panic!("claim failed: {}", e));

    let err = market
        .review_listing(manager(9290), listing.id, approve_with_no_note())
        .await
        .expect_err("reassignment was set up to fail");
    match err {
        AppError::ReassignmentFailed(_) => {}
        other => panic!("unexpected error: {:?}", other),
    }

    let settled = market
        .listings
        .fetch(listing.id)
        .await
        .unwrap_or_else(|e| panic!("fetch failed: {}", e));
    assert_eq!(settled.status, ListingStatus::Claimed);
    assert_eq!(settled.claimed_by, Some(9202));
    assert!(settled.reviewed_by.is_none());
    assert!(settled.reviewed_at.is_none());
    assert_eq!(assignee_of(&pool, shift_id).await, Some(9201));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn swap_approval_exchanges_both_assignees() {
    let pool = test_pool().await;
    let market = Marketplace::new(pool.clone());

    let first = seed_shift(&pool, Some(9301), 24).await;
    let second = seed_shift(&pool, Some(9302), 48).await;

    let swap = market
        .create_swap(
            staff(9301),
            CreateSwapInput {
                from_shift_id: first,
                to_shift_id: second,
            },
        )
        .await
        .unwrap_or_else(|e| panic!("create failed: {}", e));
    assert_eq!(swap.status, SwapStatus::PendingPeer);
    assert_eq!(swap.to_user_id, 9302);

    let confirmed = market
        .confirm_swap(staff(9302), swap.id, true)
        .await
        .unwrap_or_else(|e| panic!("confirm failed: {}", e));
    assert_eq!(confirmed.status, SwapStatus::PendingManager);
    assert!(confirmed.peer_confirmed);

    let approved = market
        .review_swap(manager(9390), swap.id, approve_with_no_note())
        .await
        .unwrap_or_else(|e| panic!("review failed: {}", e));
    assert_eq!(approved.status, SwapStatus::Approved);
    assert_eq!(approved.reviewed_by, Some(9390));

    assert_eq!(assignee_of(&pool, first).await, Some(9302));
    assert_eq!(assignee_of(&pool, second).await, Some(9301));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn swap_rollback_reverses_the_first_reassignment() {
    let pool = test_pool().await;
    let market = flaky_market(&pool, 1);

    let first = seed_shift(&pool, Some(9401), 24).await;
    let second = seed_shift(&pool, Some(9402), 48).await;

    let swap = market
        .create_swap(
            staff(9401),
            CreateSwapInput {
                from_shift_id: first,
                to_shift_id: second,
            },
        )
        .await
        .unwrap_or_else(|e| panic!("create failed: {}", e));
    market
        .confirm_swap(staff(9402), swap.id, true)
        .await
        .unwrap_or_else(|e| panic!("confirm failed: {}", e));

    let err = market
        .review_swap(manager(9490), swap.id, approve_with_no_note())
        .await
        .expect_err("second reassignment was set up to fail");
    match err {
        AppError::ReassignmentFailed(_) => {}
        other => panic!("unexpected error: {:?}", other),
    }

    let settled = market
        .swaps
        .fetch(swap.id)
        .await
        .unwrap_or_else(|e| panic!("fetch failed: {}", e));
    assert_eq!(settled.status, SwapStatus::PendingManager);
    assert!(settled.peer_confirmed);
    assert!(settled.reviewed_by.is_none());

    assert_eq!(assignee_of(&pool, first).await, Some(9401));
    assert_eq!(assignee_of(&pool, second).await, Some(9402));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn approval_and_expiry_race_settles_on_one_terminal_status() {
    let pool = test_pool().await;
    let market = Marketplace::new(pool.clone());

    let shift_id = seed_shift(&pool, Some(9501), 24).await;
    let listing_id = seed_stale_listing(&pool, shift_id, 9501, Some(9502)).await;

    let (review_outcome, sweep_outcome) = tokio::join!(
        market.review_listing(manager(9590), listing_id, approve_with_no_note()),
        sweeper::sweep_once(&market),
    );
    sweep_outcome.unwrap_or_else(|e| panic!("sweep failed: {}", e));

    let settled = market
        .listings
        .fetch(listing_id)
        .await
        .unwrap_or_else(|e| panic!("fetch failed: {}", e));

    match review_outcome {
        Ok(approved) => {
            assert_eq!(approved.status, ListingStatus::Approved);
            assert_eq!(settled.status, ListingStatus::Approved);
            assert_eq!(settled.claimed_by, Some(9502));
            assert_eq!(assignee_of(&pool, shift_id).await, Some(9502));
        }
        Err(AppError::InvalidState(_)) => {
            assert_eq!(settled.status, ListingStatus::Expired);
            assert!(settled.claimed_by.is_none());
            assert!(settled.reviewed_by.is_none());
            assert_eq!(assignee_of(&pool, shift_id).await, Some(9501));
        }
        Err(other) => panic!("unexpected review outcome: {:?}", other),
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn declined_swap_blocks_manager_review() {
    let pool = test_pool().await;
    let market = Marketplace::new(pool.clone());

    let first = seed_shift(&pool, Some(9601), 24).await;
    let second = seed_shift(&pool, Some(9602), 48).await;

    let swap = market
        .create_swap(
            staff(9601),
            CreateSwapInput {
                from_shift_id: first,
                to_shift_id: second,
            },
        )
        .await
        .unwrap_or_else(|e| panic!("create failed: {}", e));

    let declined = market
        .confirm_swap(staff(9602), swap.id, false)
        .await
        .unwrap_or_else(|e| panic!("confirm failed: {}", e));
    assert_eq!(declined.status, SwapStatus::Cancelled);

    let err = market
        .review_swap(manager(9690), swap.id, approve_with_no_note())
        .await
        .expect_err("declined swap must not be reviewable");
    match err {
        AppError::InvalidState(msg) => assert!(msg.contains("not PENDING_MANAGER")),
        other => panic!("unexpected error: {:?}", other),
    }

    assert_eq!(assignee_of(&pool, first).await, Some(9601));
    assert_eq!(assignee_of(&pool, second).await, Some(9602));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_active_listing_is_refused() {
    let pool = test_pool().await;
    let market = Marketplace::new(pool.clone());

    let shift_id = seed_shift(&pool, Some(9701), 24).await;
    let first = market
        .create_listing(staff(9701), give_away(shift_id))
        .await
        .unwrap_or_else(|e| panic!("create failed: {}", e));

    let err = market
        .create_listing(staff(9701), give_away(shift_id))
        .await
        .expect_err("second active listing for the same shift must be refused");
    match err {
        AppError::InvalidState(msg) => assert!(msg.contains("already has an active listing")),
        other => panic!("unexpected error: {:?}", other),
    }

    market
        .cancel_listing(staff(9701), first.id)
        .await
        .unwrap_or_else(|e| panic!("cancel failed: {}", e));

    let replacement = market
        .create_listing(staff(9701), give_away(shift_id))
        .await
        .unwrap_or_else(|e| panic!("re-create after cancel failed: {}", e));
    assert_ne!(replacement.id, first.id);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn sweeper_expires_stale_pending_listings() {
    let pool = test_pool().await;
    let market = Marketplace::new(pool.clone());

    let shift_id = seed_shift(&pool, Some(9801), 24).await;
    let listing_id = seed_stale_listing(&pool, shift_id, 9801, None).await;

    sweeper::sweep_once(&market)
        .await
        .unwrap_or_else(|e| panic!("sweep failed: {}", e));

    let settled = market
        .listings
        .fetch(listing_id)
        .await
        .unwrap_or_else(|e| panic!("fetch failed: {}", e));
    assert_eq!(settled.status, ListingStatus::Expired);

    let err = market
        .claim_listing(staff(9802), listing_id)
        .await
        .expect_err("expired listing must not be claimable");
    match err {
        AppError::InvalidState(msg) => assert!(msg.contains("not PENDING")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn my_requests_and_approvals_queue_follow_roles() {
    let pool = test_pool().await;
    let market = Marketplace::new(pool.clone());

    let own_shift = seed_shift(&pool, Some(9901), 24).await;
    let listing = market
        .create_listing(staff(9901), give_away(own_shift))
        .await
        .unwrap_or_else(|e| panic!("create failed: {}", e));

    let from_shift = seed_shift(&pool, Some(9902), 30).await;
    let to_shift = seed_shift(&pool, Some(9903), 31).await;
    let swap = market
        .create_swap(
            staff(9902),
            CreateSwapInput {
                from_shift_id: from_shift,
                to_shift_id: to_shift,
            },
        )
        .await
        .unwrap_or_else(|e| panic!("create swap failed: {}", e));

    let mine = market
        .my_requests(staff(9901))
        .await
        .unwrap_or_else(|e| panic!("my_requests failed: {}", e));
    assert!(mine.listings.iter().any(|l| l.id == listing.id));

    let target_view = market
        .my_requests(staff(9903))
        .await
        .unwrap_or_else(|e| panic!("my_requests failed: {}", e));
    assert!(target_view.swaps.iter().any(|s| s.id == swap.id));

    let incoming = market
        .swaps
        .incoming(9903)
        .await
        .unwrap_or_else(|e| panic!("incoming failed: {}", e));
    assert!(incoming.iter().any(|s| s.id == swap.id));

    let counts = market
        .dashboard(staff(9903))
        .await
        .unwrap_or_else(|e| panic!("dashboard failed: {}", e));
    assert!(counts.incoming >= 1);
    assert_eq!(counts.approvals, 0);

    let err = market
        .approvals_queue(staff(9901))
        .await
        .expect_err("staff must not see the approvals queue");
    match err {
        AppError::Unauthorized(_) => {}
        other => panic!("unexpected error: {:?}", other),
    }

    market
        .approvals_queue(manager(9990))
        .await
        .unwrap_or_else(|e| panic!("manager queue failed: {}", e));
}
