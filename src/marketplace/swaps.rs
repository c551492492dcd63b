//! Persistence for two-party swap requests.
//!
//! Same guarded-UPDATE discipline as the listing store: the WHERE clause
//! re-checks the status the caller validated against, and zero rows affected
//! means someone else moved the request first.
//!
//! Expected schema:
//! ```sql
//! CREATE TABLE swap_requests (
//!     id SERIAL PRIMARY KEY,
//!     from_shift_id UUID NOT NULL,
//!     to_shift_id UUID NOT NULL,
//!     from_user_id INTEGER NOT NULL,
//!     to_user_id INTEGER NOT NULL,
//!     status TEXT NOT NULL DEFAULT 'PENDING_PEER',
//!     peer_confirmed BOOLEAN NOT NULL DEFAULT FALSE,
//!     note TEXT,
//!     reviewed_by INTEGER,
//!     reviewed_at TIMESTAMPTZ,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::{SwapRequest, SwapRequestRow},
    AppError, AppResult,
};

const SWAP_COLUMNS: &str = "id, from_shift_id, to_shift_id, from_user_id, to_user_id, status, \
     peer_confirmed, note, reviewed_by, reviewed_at, created_at, updated_at";

#[derive(Clone)]
pub struct SwapStore {
    pool: PgPool,
}

impl SwapStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        from_shift_id: Uuid,
        to_shift_id: Uuid,
        from_user_id: i32,
        to_user_id: i32,
    ) -> AppResult<SwapRequest> {
        let row = sqlx::query_as::<_, SwapRequestRow>(&format!(
            r#"
            INSERT INTO swap_requests (from_shift_id, to_shift_id, from_user_id, to_user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            SWAP_COLUMNS
        ))
        .bind(from_shift_id)
        .bind(to_shift_id)
        .bind(from_user_id)
        .bind(to_user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, from_user_id, to_user_id, "Failed to insert swap request");
            e
        })?;

        row.try_into()
    }

    pub async fn fetch(&self, id: i32) -> AppResult<SwapRequest> {
        let row = sqlx::query_as::<_, SwapRequestRow>(&format!(
            "SELECT {} FROM swap_requests WHERE id = $1",
            SWAP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, swap_id = id, "Failed to fetch swap request");
            e
        })?
        .ok_or_else(|| AppError::NotFound(format!("Swap request {} not found", id)))?;

        row.try_into()
    }

    /// Counterparty response, guarded on PENDING_PEER. Accepting records the
    /// confirmation and hands the request to the manager queue; declining
    /// terminates it.
    pub async fn confirm(&self, id: i32, accept: bool) -> AppResult<Option<SwapRequest>> {
        let sql = if accept {
            format!(
                r#"
                UPDATE swap_requests
                SET status = 'PENDING_MANAGER', peer_confirmed = TRUE, updated_at = NOW()
                WHERE id = $1 AND status = 'PENDING_PEER'
                RETURNING {}
                "#,
                SWAP_COLUMNS
            )
        } else {
            format!(
                r#"
                UPDATE swap_requests
                SET status = 'CANCELLED', updated_at = NOW()
                WHERE id = $1 AND status = 'PENDING_PEER'
                RETURNING {}
                "#,
                SWAP_COLUMNS
            )
        };

        let row = sqlx::query_as::<_, SwapRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, swap_id = id, accept, "Confirm update failed");
                e
            })?;

        row.map(SwapRequest::try_from).transpose()
    }

    /// Guarded approve. The peer-confirmed re-check backs the invariant that
    /// APPROVED is only reachable after the counterparty agreed.
    pub async fn approve(
        &self,
        id: i32,
        reviewer_id: i32,
        note: Option<&str>,
    ) -> AppResult<Option<SwapRequest>> {
        let row = sqlx::query_as::<_, SwapRequestRow>(&format!(
            r#"
            UPDATE swap_requests
            SET status = 'APPROVED', reviewed_by = $2, reviewed_at = NOW(),
                note = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING_MANAGER' AND peer_confirmed = TRUE
            RETURNING {}
            "#,
            SWAP_COLUMNS
        ))
        .bind(id)
        .bind(reviewer_id)
        .bind(note)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, swap_id = id, reviewer_id, "Approve update failed");
            e
        })?;

        row.map(SwapRequest::try_from).transpose()
    }

    pub async fn reject(
        &self,
        id: i32,
        reviewer_id: i32,
        note: Option<&str>,
    ) -> AppResult<Option<SwapRequest>> {
        let row = sqlx::query_as::<_, SwapRequestRow>(&format!(
            r#"
            UPDATE swap_requests
            SET status = 'REJECTED', reviewed_by = $2, reviewed_at = NOW(),
                note = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING_MANAGER'
            RETURNING {}
            "#,
            SWAP_COLUMNS
        ))
        .bind(id)
        .bind(reviewer_id)
        .bind(note)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, swap_id = id, reviewer_id, "Reject update failed");
            e
        })?;

        row.map(SwapRequest::try_from).transpose()
    }

    /// Compensating rollback after a failed reassignment: back to the
    /// manager queue with the review fields cleared. The peer confirmation
    /// stands.
    pub async fn revert_approval(&self, id: i32) -> AppResult<Option<SwapRequest>> {
        let row = sqlx::query_as::<_, SwapRequestRow>(&format!(
            r#"
            UPDATE swap_requests
            SET status = 'PENDING_MANAGER', reviewed_by = NULL, reviewed_at = NULL,
                note = NULL, updated_at = NOW()
            WHERE id = $1 AND status = 'APPROVED'
            RETURNING {}
            "#,
            SWAP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, swap_id = id, "Approval rollback update failed");
            e
        })?;

        row.map(SwapRequest::try_from).transpose()
    }

    pub async fn cancel(&self, id: i32) -> AppResult<Option<SwapRequest>> {
        let row = sqlx::query_as::<_, SwapRequestRow>(&format!(
            r#"
            UPDATE swap_requests
            SET status = 'CANCELLED', updated_at = NOW()
            WHERE id = $1 AND status IN ('PENDING_PEER', 'PENDING_MANAGER')
            RETURNING {}
            "#,
            SWAP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, swap_id = id, "Cancel update failed");
            e
        })?;

        row.map(SwapRequest::try_from).transpose()
    }

    /// Everything the user is involved in, either side, newest first.
    pub async fn mine(&self, user_id: i32) -> AppResult<Vec<SwapRequest>> {
        let rows = sqlx::query_as::<_, SwapRequestRow>(&format!(
            r#"
            SELECT {} FROM swap_requests
            WHERE from_user_id = $1 OR to_user_id = $1
            ORDER BY created_at DESC
            "#,
            SWAP_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id, "Failed to fetch user's swap requests");
            e
        })?;

        rows.into_iter().map(SwapRequest::try_from).collect()
    }

    /// Proposals waiting on this user's answer.
    pub async fn incoming(&self, user_id: i32) -> AppResult<Vec<SwapRequest>> {
        let rows = sqlx::query_as::<_, SwapRequestRow>(&format!(
            r#"
            SELECT {} FROM swap_requests
            WHERE to_user_id = $1 AND status = 'PENDING_PEER'
            ORDER BY created_at DESC
            "#,
            SWAP_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id, "Failed to fetch incoming swap requests");
            e
        })?;

        rows.into_iter().map(SwapRequest::try_from).collect()
    }

    /// Manager queue: confirmed swaps waiting on a decision, oldest first.
    pub async fn awaiting_review(&self) -> AppResult<Vec<SwapRequest>> {
        let rows = sqlx::query_as::<_, SwapRequestRow>(&format!(
            r#"
            SELECT {} FROM swap_requests
            WHERE status = 'PENDING_MANAGER'
            ORDER BY created_at ASC
            "#,
            SWAP_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch swap review queue");
            e
        })?;

        rows.into_iter().map(SwapRequest::try_from).collect()
    }

    pub async fn count_active_for(&self, user_id: i32) -> AppResult<i64> {
        let count = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM swap_requests
            WHERE (from_user_id = $1 OR to_user_id = $1)
              AND status IN ('PENDING_PEER', 'PENDING_MANAGER')
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn count_incoming(&self, user_id: i32) -> AppResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM swap_requests WHERE to_user_id = $1 AND status = 'PENDING_PEER'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn count_awaiting_review(&self) -> AppResult<i64> {
        let count =
            sqlx::query_scalar("SELECT COUNT(*) FROM swap_requests WHERE status = 'PENDING_MANAGER'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
