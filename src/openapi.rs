use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use crate::extractors::actor::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shift Exchange API",
        version = "0.1.0",
        description = "Give-away listings and two-party swaps for rota shifts, with manager approval"
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        crate::handlers::health::health_check,
        crate::handlers::listings_handler::get_open_listings,
        crate::handlers::listings_handler::create_listing,
        crate::handlers::listings_handler::get_listing,
        crate::handlers::listings_handler::claim_listing,
        crate::handlers::listings_handler::review_listing,
        crate::handlers::listings_handler::cancel_listing,
        crate::handlers::swaps_handler::create_swap,
        crate::handlers::swaps_handler::get_swap,
        crate::handlers::swaps_handler::get_incoming_swaps,
        crate::handlers::swaps_handler::confirm_swap,
        crate::handlers::swaps_handler::review_swap,
        crate::handlers::swaps_handler::cancel_swap,
        crate::handlers::overview_handler::get_my_requests,
        crate::handlers::overview_handler::get_approvals_queue,
        crate::handlers::overview_handler::get_dashboard,
    ),
    components(schemas(
        crate::models::Listing,
        crate::models::ListingKind,
        crate::models::ListingStatus,
        crate::models::SwapRequest,
        crate::models::SwapStatus,
        crate::models::CreateListingInput,
        crate::models::CreateSwapInput,
        crate::models::ReviewInput,
        crate::models::ConfirmSwapInput,
        crate::models::MyRequests,
        crate::models::ApprovalsQueue,
        crate::models::DashboardCounts,
    )),
    tags(
        (name = "system", description = "Health and diagnostics"),
        (name = "listings", description = "Give-away listings and claim arbitration"),
        (name = "swaps", description = "Two-party shift swaps"),
        (name = "overview", description = "Per-user and manager views")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Documents the identity headers the gateway injects in front of us.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "actor_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ACTOR_ID_HEADER))),
            );
            components.add_security_scheme(
                "actor_role",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ACTOR_ROLE_HEADER))),
            );
        }
    }
}
