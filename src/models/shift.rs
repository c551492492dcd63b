use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// What the shift reference tells us about a shift. This is a read-only
/// snapshot; the exchange never stores it, only the shift id.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ShiftSummary {
    pub shift_id: Uuid,
    pub assignee_id: Option<i32>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub store_id: i32,
}
