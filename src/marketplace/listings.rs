//! Persistence for give-away listings, including the arbitrated claim.
//!
//! Every transition is a status-guarded UPDATE: the WHERE clause re-checks
//! the status the caller validated against, under the row lock the statement
//! itself takes. Zero rows affected means a concurrent writer got there
//! first; callers re-read the row to report what now holds.
//!
//! Expected schema:
//! ```sql
//! CREATE TABLE listings (
//!     id SERIAL PRIMARY KEY,
//!     shift_id UUID NOT NULL,
//!     kind TEXT NOT NULL,
//!     status TEXT NOT NULL DEFAULT 'PENDING',
//!     offered_by INTEGER NOT NULL,
//!     claimed_by INTEGER,
//!     note TEXT,
//!     reviewed_by INTEGER,
//!     reviewed_at TIMESTAMPTZ,
//!     expires_at TIMESTAMPTZ NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//!
//! -- one live listing per shift
//! CREATE UNIQUE INDEX idx_listings_active_shift ON listings (shift_id)
//!     WHERE status IN ('PENDING', 'CLAIMED');
//! CREATE INDEX idx_listings_expiry ON listings (expires_at)
//!     WHERE status IN ('PENDING', 'CLAIMED');
//! ```

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::{Listing, ListingKind, ListingRow, ListingStatus},
    AppError, AppResult,
};

const LISTING_COLUMNS: &str = "id, shift_id, kind, status, offered_by, claimed_by, note, \
     reviewed_by, reviewed_at, expires_at, created_at, updated_at";

/// Result of an arbitrated claim attempt. Losing the race is a normal
/// business outcome, not an error.
#[derive(Debug)]
pub enum ClaimOutcome {
    Won(Listing),
    Lost(ListingStatus),
}

#[derive(Clone)]
pub struct ListingStore {
    pool: PgPool,
}

impl ListingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        shift_id: Uuid,
        kind: ListingKind,
        offered_by: i32,
        expires_at: DateTime<Utc>,
    ) -> AppResult<Listing> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            INSERT INTO listings (shift_id, kind, offered_by, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            LISTING_COLUMNS
        ))
        .bind(shift_id)
        .bind(kind.as_str())
        .bind(offered_by)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::InvalidState(format!(
                    "shift {} already has an active listing",
                    shift_id
                ))
            }
            other => {
                tracing::error!(error = %other, shift_id = %shift_id, "Failed to insert listing");
                AppError::Database(other)
            }
        })?;

        row.try_into()
    }

    pub async fn fetch(&self, id: i32) -> AppResult<Listing> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {} FROM listings WHERE id = $1",
            LISTING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, listing_id = id, "Failed to fetch listing");
            e
        })?
        .ok_or_else(|| AppError::NotFound(format!("Listing {} not found", id)))?;

        row.try_into()
    }

    /// Cheap pre-check for the one-live-listing-per-shift rule; the unique
    /// partial index is the authoritative guard.
    pub async fn exists_active_for_shift(&self, shift_id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM listings
                WHERE shift_id = $1 AND status IN ('PENDING', 'CLAIMED')
            )
            "#,
        )
        .bind(shift_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, shift_id = %shift_id, "Failed to check for active listing");
            e
        })?;

        Ok(exists)
    }

    /// The arbitrated claim. The UPDATE re-checks PENDING under its own row
    /// lock, so two concurrent claimants cannot both win; the loser re-reads
    /// the listing to report the status that beat them.
    pub async fn try_claim(&self, id: i32, claimant_id: i32) -> AppResult<ClaimOutcome> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            UPDATE listings
            SET status = 'CLAIMED', claimed_by = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING {}
            "#,
            LISTING_COLUMNS
        ))
        .bind(id)
        .bind(claimant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, listing_id = id, claimant_id, "Claim update failed");
            e
        })?;

        match row {
            Some(row) => Ok(ClaimOutcome::Won(row.try_into()?)),
            None => {
                let current = self.fetch(id).await?;
                Ok(ClaimOutcome::Lost(current.status))
            }
        }
    }

    /// Guarded cancel; the claim is released in the same statement.
    pub async fn cancel(&self, id: i32) -> AppResult<Option<Listing>> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            UPDATE listings
            SET status = 'CANCELLED', claimed_by = NULL, updated_at = NOW()
            WHERE id = $1 AND status IN ('PENDING', 'CLAIMED')
            RETURNING {}
            "#,
            LISTING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, listing_id = id, "Cancel update failed");
            e
        })?;

        row.map(Listing::try_from).transpose()
    }

    /// Guarded approve. The claimant stays on the record; the reassignment
    /// that follows is the approval gateway's job.
    pub async fn approve(
        &self,
        id: i32,
        reviewer_id: i32,
        note: Option<&str>,
    ) -> AppResult<Option<Listing>> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            UPDATE listings
            SET status = 'APPROVED', reviewed_by = $2, reviewed_at = NOW(),
                note = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'CLAIMED'
            RETURNING {}
            "#,
            LISTING_COLUMNS
        ))
        .bind(id)
        .bind(reviewer_id)
        .bind(note)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, listing_id = id, reviewer_id, "Approve update failed");
            e
        })?;

        row.map(Listing::try_from).transpose()
    }

    /// Guarded reject; releases the claimant but keeps the terminal record
    /// with reviewer and note for audit.
    pub async fn reject(
        &self,
        id: i32,
        reviewer_id: i32,
        note: Option<&str>,
    ) -> AppResult<Option<Listing>> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            UPDATE listings
            SET status = 'REJECTED', claimed_by = NULL, reviewed_by = $2,
                reviewed_at = NOW(), note = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'CLAIMED'
            RETURNING {}
            "#,
            LISTING_COLUMNS
        ))
        .bind(id)
        .bind(reviewer_id)
        .bind(note)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, listing_id = id, reviewer_id, "Reject update failed");
            e
        })?;

        row.map(Listing::try_from).transpose()
    }

    /// Compensating rollback after a failed reassignment: back to CLAIMED
    /// with the review fields cleared. Guarded on APPROVED so the rollback
    /// can never clobber a later transition.
    pub async fn revert_approval(&self, id: i32) -> AppResult<Option<Listing>> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            UPDATE listings
            SET status = 'CLAIMED', reviewed_by = NULL, reviewed_at = NULL,
                note = NULL, updated_at = NOW()
            WHERE id = $1 AND status = 'APPROVED'
            RETURNING {}
            "#,
            LISTING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, listing_id = id, "Approval rollback update failed");
            e
        })?;

        row.map(Listing::try_from).transpose()
    }

    /// Listings the sweeper should look at: live ones past their deadline.
    pub async fn expiry_candidates(&self) -> AppResult<Vec<Listing>> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            SELECT {} FROM listings
            WHERE status IN ('PENDING', 'CLAIMED') AND expires_at <= NOW()
            ORDER BY expires_at
            "#,
            LISTING_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch expiry candidates");
            e
        })?;

        rows.into_iter().map(Listing::try_from).collect()
    }

    /// Guarded expiry. Both the pre-read status and the deadline are
    /// re-checked, so a concurrent review, cancel or claim wins cleanly and
    /// this becomes a no-op.
    pub async fn mark_expired(&self, id: i32, from_status: ListingStatus) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE listings
            SET status = 'EXPIRED', claimed_by = NULL, updated_at = NOW()
            WHERE id = $1 AND status = $2 AND expires_at <= NOW()
            "#,
        )
        .bind(id)
        .bind(from_status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, listing_id = id, "Expiry update failed");
            e
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// The claimable board: PENDING listings still ahead of their deadline,
    /// optionally narrowed to one store.
    pub async fn open(&self, store_id: Option<i32>) -> AppResult<Vec<Listing>> {
        let mut sql = r#"
            SELECT l.id, l.shift_id, l.kind, l.status, l.offered_by, l.claimed_by,
                   l.note, l.reviewed_by, l.reviewed_at, l.expires_at, l.created_at,
                   l.updated_at
            FROM listings l
            JOIN shifts s ON s.id = l.shift_id
            WHERE l.status = 'PENDING' AND l.expires_at > NOW()
            "#
        .to_string();

        let rows = if let Some(store_id) = store_id {
            sql.push_str(" AND s.store_id = $1 ORDER BY l.created_at DESC");
            sqlx::query_as::<_, ListingRow>(&sql)
                .bind(store_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, store_id, "Failed to fetch open listings");
                    e
                })?
        } else {
            sql.push_str(" ORDER BY l.created_at DESC");
            sqlx::query_as::<_, ListingRow>(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to fetch open listings");
                    e
                })?
        };

        rows.into_iter().map(Listing::try_from).collect()
    }

    /// Everything the user is involved in, either side, newest first.
    pub async fn mine(&self, user_id: i32) -> AppResult<Vec<Listing>> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            SELECT {} FROM listings
            WHERE offered_by = $1 OR claimed_by = $1
            ORDER BY created_at DESC
            "#,
            LISTING_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id, "Failed to fetch user's listings");
            e
        })?;

        rows.into_iter().map(Listing::try_from).collect()
    }

    /// Manager queue: claims waiting on a decision, oldest first.
    pub async fn awaiting_review(&self) -> AppResult<Vec<Listing>> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            SELECT {} FROM listings
            WHERE status = 'CLAIMED'
            ORDER BY created_at ASC
            "#,
            LISTING_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch review queue");
            e
        })?;

        rows.into_iter().map(Listing::try_from).collect()
    }

    pub async fn count_open(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM listings WHERE status = 'PENDING' AND expires_at > NOW()",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn count_active_for(&self, user_id: i32) -> AppResult<i64> {
        let count = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM listings
            WHERE (offered_by = $1 OR claimed_by = $1)
              AND status IN ('PENDING', 'CLAIMED')
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn count_awaiting_review(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM listings WHERE status = 'CLAIMED'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
