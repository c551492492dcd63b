use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{AppError, AppResult};

/// Lifecycle of a listing. Stored as TEXT; terminal statuses admit no
/// further transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    Pending,
    Claimed,
    Approved,
    Rejected,
    Cancelled,
    Expired,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Pending => "PENDING",
            ListingStatus::Claimed => "CLAIMED",
            ListingStatus::Approved => "APPROVED",
            ListingStatus::Rejected => "REJECTED",
            ListingStatus::Cancelled => "CANCELLED",
            ListingStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(raw: &str) -> Option<ListingStatus> {
        match raw {
            "PENDING" => Some(ListingStatus::Pending),
            "CLAIMED" => Some(ListingStatus::Claimed),
            "APPROVED" => Some(ListingStatus::Approved),
            "REJECTED" => Some(ListingStatus::Rejected),
            "CANCELLED" => Some(ListingStatus::Cancelled),
            "EXPIRED" => Some(ListingStatus::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ListingStatus::Approved
                | ListingStatus::Rejected
                | ListingStatus::Cancelled
                | ListingStatus::Expired
        )
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of transfer the listing offers. OPEN is reserved and behaves
/// exactly like GIVE_AWAY; two-way exchanges are `SwapRequest`s, so a
/// listing is never created with kind SWAP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingKind {
    GiveAway,
    Swap,
    Open,
}

impl ListingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingKind::GiveAway => "GIVE_AWAY",
            ListingKind::Swap => "SWAP",
            ListingKind::Open => "OPEN",
        }
    }

    pub fn parse(raw: &str) -> Option<ListingKind> {
        match raw {
            "GIVE_AWAY" => Some(ListingKind::GiveAway),
            "SWAP" => Some(ListingKind::Swap),
            "OPEN" => Some(ListingKind::Open),
            _ => None,
        }
    }
}

impl std::fmt::Display for ListingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One shift offered for transfer. The shift itself is referenced by id
/// only; its timing and assignee live in the shift reference.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Listing {
    pub id: i32,
    pub shift_id: Uuid,
    pub kind: ListingKind,
    pub status: ListingStatus,
    pub offered_by: i32,
    pub claimed_by: Option<i32>,
    pub note: Option<String>,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw row shape; status/kind come back as TEXT and are narrowed when
/// converting into [`Listing`].
#[derive(Debug, FromRow)]
pub struct ListingRow {
    pub id: i32,
    pub shift_id: Uuid,
    pub kind: String,
    pub status: String,
    pub offered_by: i32,
    pub claimed_by: Option<i32>,
    pub note: Option<String>,
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = AppError;

    fn try_from(row: ListingRow) -> AppResult<Listing> {
        let status = ListingStatus::parse(&row.status).ok_or_else(|| {
            AppError::Internal(format!(
                "listing {} has unknown status {:?} in the database",
                row.id, row.status
            ))
        })?;

        let kind = ListingKind::parse(&row.kind).ok_or_else(|| {
            AppError::Internal(format!(
                "listing {} has unknown kind {:?} in the database",
                row.id, row.kind
            ))
        })?;

        Ok(Listing {
            id: row.id,
            shift_id: row.shift_id,
            kind,
            status,
            offered_by: row.offered_by,
            claimed_by: row.claimed_by,
            note: row.note,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
