use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{AppError, AppResult};

/// Lifecycle of a two-party swap. PENDING_PEER waits on the counterparty,
/// PENDING_MANAGER on the rota manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapStatus {
    PendingPeer,
    PendingManager,
    Approved,
    Rejected,
    Cancelled,
}

impl SwapStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapStatus::PendingPeer => "PENDING_PEER",
            SwapStatus::PendingManager => "PENDING_MANAGER",
            SwapStatus::Approved => "APPROVED",
            SwapStatus::Rejected => "REJECTED",
            SwapStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(raw: &str) -> Option<SwapStatus> {
        match raw {
            "PENDING_PEER" => Some(SwapStatus::PendingPeer),
            "PENDING_MANAGER" => Some(SwapStatus::PendingManager),
            "APPROVED" => Some(SwapStatus::Approved),
            "REJECTED" => Some(SwapStatus::Rejected),
            "CANCELLED" => Some(SwapStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SwapStatus::Approved | SwapStatus::Rejected | SwapStatus::Cancelled
        )
    }
}

impl std::fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proposed exchange of two shifts between two named users. The target
/// user is pinned at creation from the counter-shift's assignee.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SwapRequest {
    pub id: i32,
    pub from_shift_id: Uuid,
    pub to_shift_id: Uuid,
    pub from_user_id: i32,
    pub to_user_id: i32,
    pub status: SwapStatus,
    pub peer_confirmed: bool,
    pub note: Option<String>,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct SwapRequestRow {
    pub id: i32,
    pub from_shift_id: Uuid,
    pub to_shift_id: Uuid,
    pub from_user_id: i32,
    pub to_user_id: i32,
    pub status: String,
    pub peer_confirmed: bool,
    pub note: Option<String>,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SwapRequestRow> for SwapRequest {
    type Error = AppError;

    fn try_from(row: SwapRequestRow) -> AppResult<SwapRequest> {
        let status = SwapStatus::parse(&row.status).ok_or_else(|| {
            AppError::Internal(format!(
                "swap request {} has unknown status {:?} in the database",
                row.id, row.status
            ))
        })?;

        Ok(SwapRequest {
            id: row.id,
            from_shift_id: row.from_shift_id,
            to_shift_id: row.to_shift_id,
            from_user_id: row.from_user_id,
            to_user_id: row.to_user_id,
            status,
            peer_confirmed: row.peer_confirmed,
            note: row.note,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_round_trips() {
        for status in [
            SwapStatus::PendingPeer,
            SwapStatus::PendingManager,
            SwapStatus::Approved,
            SwapStatus::Rejected,
            SwapStatus::Cancelled,
        ] {
            assert_eq!(SwapStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SwapStatus::parse("PENDING"), None);
    }

    #[test]
    fn only_the_three_final_statuses_are_terminal() {
        assert!(!SwapStatus::PendingPeer.is_terminal());
        assert!(!SwapStatus::PendingManager.is_terminal());
        assert!(SwapStatus::Approved.is_terminal());
        assert!(SwapStatus::Rejected.is_terminal());
        assert!(SwapStatus::Cancelled.is_terminal());
    }
}
