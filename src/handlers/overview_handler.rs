use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{
    extractors::Actor,
    models::{ApprovalsQueue, DashboardCounts, MyRequests},
    AppResult, AppState,
};

/// GET /api/marketplace/my
#[utoipa::path(
    get,
    path = "/api/marketplace/my",
    responses(
        (status = 200, description = "Everything the caller has in flight, both sides", body = MyRequests)
    ),
    security(("actor_id" = [], "actor_role" = [])),
    tag = "overview"
)]
pub async fn get_my_requests(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> AppResult<Json<MyRequests>> {
    let requests = state.market.my_requests(actor).await?;
    Ok(Json(requests))
}

/// GET /api/marketplace/approvals
#[utoipa::path(
    get,
    path = "/api/marketplace/approvals",
    responses(
        (status = 200, description = "Work awaiting a manager decision, oldest first", body = ApprovalsQueue),
        (status = 403, description = "Caller is staff")
    ),
    security(("actor_id" = [], "actor_role" = [])),
    tag = "overview"
)]
pub async fn get_approvals_queue(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> AppResult<Json<ApprovalsQueue>> {
    let queue = state.market.approvals_queue(actor).await?;
    Ok(Json(queue))
}

/// GET /api/marketplace/dashboard
#[utoipa::path(
    get,
    path = "/api/marketplace/dashboard",
    responses(
        (status = 200, description = "Counts for the marketplace landing page", body = DashboardCounts)
    ),
    security(("actor_id" = [], "actor_role" = [])),
    tag = "overview"
)]
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> AppResult<Json<DashboardCounts>> {
    let counts = state.market.dashboard(actor).await?;
    Ok(Json(counts))
}
