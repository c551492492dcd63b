use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Listing, ListingKind, SwapRequest};

/// Input for offering a shift on the exchange.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateListingInput {
    pub shift_id: Uuid,
    pub kind: ListingKind,
    /// Optional explicit deadline; defaults to the shift's start time.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Input for proposing a two-way exchange. The target user is derived from
/// the counter-shift's current assignee.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateSwapInput {
    pub from_shift_id: Uuid,
    pub to_shift_id: Uuid,
}

/// Manager decision on a claimed listing or peer-confirmed swap.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewInput {
    pub approve: bool,
    pub note: Option<String>,
}

/// Counterparty response to a proposed swap.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfirmSwapInput {
    pub accept: bool,
}

/// Everything the calling user currently has in flight, both sides.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MyRequests {
    pub listings: Vec<Listing>,
    pub swaps: Vec<SwapRequest>,
}

/// Work waiting on a manager decision.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApprovalsQueue {
    pub listings: Vec<Listing>,
    pub swaps: Vec<SwapRequest>,
}

/// Counts for the marketplace landing page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct DashboardCounts {
    pub open: i64,
    pub mine: i64,
    pub incoming: i64,
    pub approvals: i64,
}
