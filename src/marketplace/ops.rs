//! The marketplace facade. One method per operation: validate against the
//! entity as last read, apply through a guarded store update, and for
//! approvals hand over to the reassignment gateway.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use sqlx::PgPool;

use crate::{
    extractors::{Actor, Role},
    marketplace::{
        approval,
        listings::{ClaimOutcome, ListingStore},
        shift_ref::{PgShiftReference, ShiftReference},
        swaps::SwapStore,
        transitions::{self, ListingAction, SwapAction},
    },
    models::{
        ApprovalsQueue, CreateListingInput, CreateSwapInput, DashboardCounts, Listing, MyRequests,
        ReviewInput, SwapRequest,
    },
    AppError, AppResult,
};

#[derive(Clone)]
pub struct Marketplace {
    pub listings: ListingStore,
    pub swaps: SwapStore,
    shifts: Arc<dyn ShiftReference>,
}

impl Marketplace {
    pub fn new(pool: PgPool) -> Self {
        let shifts: Arc<dyn ShiftReference> = Arc::new(PgShiftReference::new(pool.clone()));
        Self::with_shift_reference(pool, shifts)
    }

    /// Wire in a different rota backend, e.g. a remote service client.
    pub fn with_shift_reference(pool: PgPool, shifts: Arc<dyn ShiftReference>) -> Self {
        Self {
            listings: ListingStore::new(pool.clone()),
            swaps: SwapStore::new(pool),
            shifts,
        }
    }

    pub async fn create_listing(
        &self,
        actor: Actor,
        input: CreateListingInput,
    ) -> AppResult<Listing> {
        let shift = self
            .shifts
            .get_shift(input.shift_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shift {} not found", input.shift_id)))?;

        let expires_at = input.expires_at.unwrap_or(shift.starts_at);
        if expires_at > shift.starts_at {
            return Err(AppError::BadRequest(
                "expires_at cannot be after the shift starts".to_string(),
            ));
        }
        transitions::authorize_listing_create(&actor, input.kind, &shift, expires_at, Utc::now())?;

        if self.listings.exists_active_for_shift(input.shift_id).await? {
            return Err(AppError::InvalidState(format!(
                "shift {} already has an active listing",
                input.shift_id
            )));
        }

        let listing = self
            .listings
            .insert(input.shift_id, input.kind, actor.id, expires_at)
            .await?;

        tracing::info!(
            listing_id = listing.id,
            shift_id = %listing.shift_id,
            offered_by = actor.id,
            "Listing created"
        );
        Ok(listing)
    }

    /// First committed claim wins; everyone else gets the race outcome with
    /// the status that beat them.
    pub async fn claim_listing(&self, actor: Actor, id: i32) -> AppResult<Listing> {
        let listing = self.listings.fetch(id).await?;
        transitions::next_listing_status(&listing, &ListingAction::Claim { actor: &actor })?;

        match self.listings.try_claim(id, actor.id).await? {
            ClaimOutcome::Won(updated) => {
                counter!("marketplace_claims_total", "outcome" => "won").increment(1);
                tracing::info!(listing_id = id, claimant = actor.id, "Claim won");
                Ok(updated)
            }
            ClaimOutcome::Lost(status) => {
                counter!("marketplace_claims_total", "outcome" => "lost").increment(1);
                tracing::info!(listing_id = id, claimant = actor.id, status = %status, "Claim lost");
                Err(AppError::ClaimLost { status })
            }
        }
    }

    pub async fn cancel_listing(&self, actor: Actor, id: i32) -> AppResult<Listing> {
        let listing = self.listings.fetch(id).await?;
        transitions::next_listing_status(&listing, &ListingAction::Cancel { actor: &actor })?;

        match self.listings.cancel(id).await? {
            Some(updated) => {
                tracing::info!(listing_id = id, offered_by = actor.id, "Listing cancelled");
                Ok(updated)
            }
            None => {
                let current = self.listings.fetch(id).await?;
                Err(AppError::InvalidState(format!(
                    "cannot cancel a listing with status {}",
                    current.status
                )))
            }
        }
    }

    pub async fn review_listing(
        &self,
        actor: Actor,
        id: i32,
        input: ReviewInput,
    ) -> AppResult<Listing> {
        let listing = self.listings.fetch(id).await?;
        transitions::next_listing_status(
            &listing,
            &ListingAction::Review {
                actor: &actor,
                approve: input.approve,
            },
        )?;

        if input.approve {
            return approval::approve_listing(
                &self.listings,
                self.shifts.as_ref(),
                &listing,
                actor.id,
                input.note.as_deref(),
            )
            .await;
        }

        match self
            .listings
            .reject(id, actor.id, input.note.as_deref())
            .await?
        {
            Some(updated) => {
                tracing::info!(listing_id = id, reviewer_id = actor.id, "Listing rejected");
                Ok(updated)
            }
            None => {
                let current = self.listings.fetch(id).await?;
                Err(AppError::InvalidState(format!(
                    "listing is not CLAIMED, current status: {}",
                    current.status
                )))
            }
        }
    }

    pub async fn create_swap(
        &self,
        actor: Actor,
        input: CreateSwapInput,
    ) -> AppResult<SwapRequest> {
        let from_shift = self
            .shifts
            .get_shift(input.from_shift_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Shift {} not found", input.from_shift_id))
            })?;
        let to_shift = self
            .shifts
            .get_shift(input.to_shift_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Shift {} not found", input.to_shift_id)))?;

        let to_user = transitions::authorize_swap_create(&actor, &from_shift, &to_shift)?;

        let swap = self
            .swaps
            .insert(input.from_shift_id, input.to_shift_id, actor.id, to_user)
            .await?;

        tracing::info!(
            swap_id = swap.id,
            from_user = actor.id,
            to_user,
            "Swap proposed"
        );
        Ok(swap)
    }

    pub async fn confirm_swap(
        &self,
        actor: Actor,
        id: i32,
        accept: bool,
    ) -> AppResult<SwapRequest> {
        let swap = self.swaps.fetch(id).await?;
        transitions::next_swap_status(
            &swap,
            &SwapAction::Confirm {
                actor: &actor,
                accept,
            },
        )?;

        match self.swaps.confirm(id, accept).await? {
            Some(updated) => {
                tracing::info!(swap_id = id, accept, "Swap confirmation recorded");
                Ok(updated)
            }
            None => {
                let current = self.swaps.fetch(id).await?;
                Err(AppError::InvalidState(format!(
                    "swap is not PENDING_PEER, current status: {}",
                    current.status
                )))
            }
        }
    }

    pub async fn review_swap(
        &self,
        actor: Actor,
        id: i32,
        input: ReviewInput,
    ) -> AppResult<SwapRequest> {
        let swap = self.swaps.fetch(id).await?;
        transitions::next_swap_status(
            &swap,
            &SwapAction::Review {
                actor: &actor,
                approve: input.approve,
            },
        )?;

        if input.approve {
            return approval::approve_swap(
                &self.swaps,
                self.shifts.as_ref(),
                &swap,
                actor.id,
                input.note.as_deref(),
            )
            .await;
        }

        match self.swaps.reject(id, actor.id, input.note.as_deref()).await? {
            Some(updated) => {
                tracing::info!(swap_id = id, reviewer_id = actor.id, "Swap rejected");
                Ok(updated)
            }
            None => {
                let current = self.swaps.fetch(id).await?;
                Err(AppError::InvalidState(format!(
                    "swap is not PENDING_MANAGER, current status: {}",
                    current.status
                )))
            }
        }
    }

    pub async fn cancel_swap(&self, actor: Actor, id: i32) -> AppResult<SwapRequest> {
        let swap = self.swaps.fetch(id).await?;
        transitions::next_swap_status(&swap, &SwapAction::Cancel { actor: &actor })?;

        match self.swaps.cancel(id).await? {
            Some(updated) => {
                tracing::info!(swap_id = id, by = actor.id, "Swap cancelled");
                Ok(updated)
            }
            None => {
                let current = self.swaps.fetch(id).await?;
                Err(AppError::InvalidState(format!(
                    "cannot cancel a swap with status {}",
                    current.status
                )))
            }
        }
    }

    pub async fn my_requests(&self, actor: Actor) -> AppResult<MyRequests> {
        let listings = self.listings.mine(actor.id).await?;
        let swaps = self.swaps.mine(actor.id).await?;
        Ok(MyRequests { listings, swaps })
    }

    pub async fn approvals_queue(&self, actor: Actor) -> AppResult<ApprovalsQueue> {
        if actor.role == Role::Staff {
            return Err(AppError::Unauthorized(
                "only managers and owners may view the approvals queue".to_string(),
            ));
        }
        let listings = self.listings.awaiting_review().await?;
        let swaps = self.swaps.awaiting_review().await?;
        Ok(ApprovalsQueue { listings, swaps })
    }

    pub async fn dashboard(&self, actor: Actor) -> AppResult<DashboardCounts> {
        let open = self.listings.count_open().await?;
        let mine = self.listings.count_active_for(actor.id).await?
            + self.swaps.count_active_for(actor.id).await?;
        let incoming = self.swaps.count_incoming(actor.id).await?;
        let approvals = if actor.role == Role::Staff {
            0
        } else {
            self.listings.count_awaiting_review().await?
                + self.swaps.count_awaiting_review().await?
        };

        Ok(DashboardCounts {
            open,
            mine,
            incoming,
            approvals,
        })
    }
}
