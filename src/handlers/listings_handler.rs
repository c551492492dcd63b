use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::{
    extractors::Actor,
    models::{CreateListingInput, Listing, ReviewInput},
    AppResult, AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct OpenBoardQuery {
    #[serde(rename = "storeId")]
    pub store_id: Option<i32>,
}

/// GET /api/marketplace/open?storeId=
#[utoipa::path(
    get,
    path = "/api/marketplace/open",
    params(OpenBoardQuery),
    responses(
        (status = 200, description = "Claimable listings, soonest deadline first", body = Vec<Listing>)
    ),
    security(("actor_id" = [], "actor_role" = [])),
    tag = "listings"
)]
pub async fn get_open_listings(
    State(state): State<Arc<AppState>>,
    _actor: Actor,
    Query(query): Query<OpenBoardQuery>,
) -> AppResult<Json<Vec<Listing>>> {
    tracing::debug!(store_id = ?query.store_id, "get_open_listings called");
    let listings = state.market.listings.open(query.store_id).await?;
    Ok(Json(listings))
}

/// POST /api/marketplace/listings
#[utoipa::path(
    post,
    path = "/api/marketplace/listings",
    request_body = CreateListingInput,
    responses(
        (status = 200, description = "Listing created", body = Listing),
        (status = 404, description = "Shift not found"),
        (status = 409, description = "Shift already has an active listing")
    ),
    security(("actor_id" = [], "actor_role" = [])),
    tag = "listings"
)]
pub async fn create_listing(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(input): Json<CreateListingInput>,
) -> AppResult<Json<Listing>> {
    let listing = state.market.create_listing(actor, input).await?;
    Ok(Json(listing))
}

/// GET /api/marketplace/listings/{id}
#[utoipa::path(
    get,
    path = "/api/marketplace/listings/{id}",
    params(("id" = i32, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Listing by id", body = Listing),
        (status = 404, description = "Listing not found")
    ),
    security(("actor_id" = [], "actor_role" = [])),
    tag = "listings"
)]
pub async fn get_listing(
    State(state): State<Arc<AppState>>,
    _actor: Actor,
    Path(id): Path<i32>,
) -> AppResult<Json<Listing>> {
    let listing = state.market.listings.fetch(id).await?;
    Ok(Json(listing))
}

/// POST /api/marketplace/listings/{id}/claim
#[utoipa::path(
    post,
    path = "/api/marketplace/listings/{id}/claim",
    params(("id" = i32, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Claim won", body = Listing),
        (status = 409, description = "Listing not claimable, or someone else claimed it first")
    ),
    security(("actor_id" = [], "actor_role" = [])),
    tag = "listings"
)]
pub async fn claim_listing(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<i32>,
) -> AppResult<Json<Listing>> {
    let listing = state.market.claim_listing(actor, id).await?;
    Ok(Json(listing))
}

/// POST /api/marketplace/listings/{id}/review
#[utoipa::path(
    post,
    path = "/api/marketplace/listings/{id}/review",
    params(("id" = i32, Path, description = "Listing id")),
    request_body = ReviewInput,
    responses(
        (status = 200, description = "Review recorded", body = Listing),
        (status = 403, description = "Caller is not a manager"),
        (status = 409, description = "Listing is not awaiting review"),
        (status = 502, description = "Reassignment failed, approval rolled back")
    ),
    security(("actor_id" = [], "actor_role" = [])),
    tag = "listings"
)]
pub async fn review_listing(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<i32>,
    Json(input): Json<ReviewInput>,
) -> AppResult<Json<Listing>> {
    let listing = state.market.review_listing(actor, id, input).await?;
    Ok(Json(listing))
}

/// DELETE /api/marketplace/listings/{id}
#[utoipa::path(
    delete,
    path = "/api/marketplace/listings/{id}",
    params(("id" = i32, Path, description = "Listing id")),
    responses(
        (status = 200, description = "Listing cancelled", body = Listing),
        (status = 403, description = "Caller does not own the listing"),
        (status = 409, description = "Listing is already settled")
    ),
    security(("actor_id" = [], "actor_role" = [])),
    tag = "listings"
)]
pub async fn cancel_listing(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<i32>,
) -> AppResult<Json<Listing>> {
    let listing = state.market.cancel_listing(actor, id).await?;
    Ok(Json(listing))
}
