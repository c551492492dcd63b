use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{
    extractors::Actor,
    models::{ConfirmSwapInput, CreateSwapInput, ReviewInput, SwapRequest},
    AppResult, AppState,
};

/// POST /api/marketplace/swaps
#[utoipa::path(
    post,
    path = "/api/marketplace/swaps",
    request_body = CreateSwapInput,
    responses(
        (status = 200, description = "Swap proposed to the counter-shift's assignee", body = SwapRequest),
        (status = 404, description = "Either shift not found"),
        (status = 422, description = "Cannot swap with yourself")
    ),
    security(("actor_id" = [], "actor_role" = [])),
    tag = "swaps"
)]
pub async fn create_swap(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(input): Json<CreateSwapInput>,
) -> AppResult<Json<SwapRequest>> {
    let swap = state.market.create_swap(actor, input).await?;
    Ok(Json(swap))
}

/// GET /api/marketplace/swaps/{id}
#[utoipa::path(
    get,
    path = "/api/marketplace/swaps/{id}",
    params(("id" = i32, Path, description = "Swap request id")),
    responses(
        (status = 200, description = "Swap request by id", body = SwapRequest),
        (status = 404, description = "Swap request not found")
    ),
    security(("actor_id" = [], "actor_role" = [])),
    tag = "swaps"
)]
pub async fn get_swap(
    State(state): State<Arc<AppState>>,
    _actor: Actor,
    Path(id): Path<i32>,
) -> AppResult<Json<SwapRequest>> {
    let swap = state.market.swaps.fetch(id).await?;
    Ok(Json(swap))
}

/// GET /api/marketplace/incoming
#[utoipa::path(
    get,
    path = "/api/marketplace/incoming",
    responses(
        (status = 200, description = "Swap proposals awaiting the caller's answer", body = Vec<SwapRequest>)
    ),
    security(("actor_id" = [], "actor_role" = [])),
    tag = "swaps"
)]
pub async fn get_incoming_swaps(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> AppResult<Json<Vec<SwapRequest>>> {
    let swaps = state.market.swaps.incoming(actor.id).await?;
    Ok(Json(swaps))
}

/// POST /api/marketplace/swaps/{id}/confirm
#[utoipa::path(
    post,
    path = "/api/marketplace/swaps/{id}/confirm",
    params(("id" = i32, Path, description = "Swap request id")),
    request_body = ConfirmSwapInput,
    responses(
        (status = 200, description = "Counterparty answer recorded", body = SwapRequest),
        (status = 403, description = "Caller is not the swap target"),
        (status = 409, description = "Swap is not awaiting the counterparty")
    ),
    security(("actor_id" = [], "actor_role" = [])),
    tag = "swaps"
)]
pub async fn confirm_swap(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<i32>,
    Json(input): Json<ConfirmSwapInput>,
) -> AppResult<Json<SwapRequest>> {
    let swap = state.market.confirm_swap(actor, id, input.accept).await?;
    Ok(Json(swap))
}

/// POST /api/marketplace/swaps/{id}/review
#[utoipa::path(
    post,
    path = "/api/marketplace/swaps/{id}/review",
    params(("id" = i32, Path, description = "Swap request id")),
    request_body = ReviewInput,
    responses(
        (status = 200, description = "Review recorded", body = SwapRequest),
        (status = 403, description = "Caller is not a manager"),
        (status = 409, description = "Swap is not awaiting review"),
        (status = 502, description = "Reassignment failed, approval rolled back")
    ),
    security(("actor_id" = [], "actor_role" = [])),
    tag = "swaps"
)]
pub async fn review_swap(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<i32>,
    Json(input): Json<ReviewInput>,
) -> AppResult<Json<SwapRequest>> {
    let swap = state.market.review_swap(actor, id, input).await?;
    Ok(Json(swap))
}

/// DELETE /api/marketplace/swaps/{id}
#[utoipa::path(
    delete,
    path = "/api/marketplace/swaps/{id}",
    params(("id" = i32, Path, description = "Swap request id")),
    responses(
        (status = 200, description = "Swap cancelled", body = SwapRequest),
        (status = 403, description = "Caller is not a participant"),
        (status = 409, description = "Swap is already settled")
    ),
    security(("actor_id" = [], "actor_role" = [])),
    tag = "swaps"
)]
pub async fn cancel_swap(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<i32>,
) -> AppResult<Json<SwapRequest>> {
    let swap = state.market.cancel_swap(actor, id).await?;
    Ok(Json(swap))
}
