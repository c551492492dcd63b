//! Pure decision table for every listing/swap transition.
//!
//! Each operation funnels through here before touching the store: given the
//! entity as last read, the requested action and the verified actor, the
//! functions either return the status the entity moves to or a typed denial.
//! The store then applies the transition with a status-guarded UPDATE, so the
//! precondition checked here is re-checked at execution time.

use chrono::{DateTime, Utc};

use crate::{
    extractors::{Actor, Role},
    models::{Listing, ListingKind, ListingStatus, ShiftSummary, SwapRequest, SwapStatus},
    AppError, AppResult,
};

pub enum ListingAction<'a> {
    Claim { actor: &'a Actor },
    Review { actor: &'a Actor, approve: bool },
    Cancel { actor: &'a Actor },
    /// System-initiated; no actor involved.
    Expire { now: DateTime<Utc> },
}

pub enum SwapAction<'a> {
    Confirm { actor: &'a Actor, accept: bool },
    Review { actor: &'a Actor, approve: bool },
    Cancel { actor: &'a Actor },
}

/// Preconditions for offering a shift. The one-active-listing-per-shift rule
/// needs the store and is enforced there.
pub fn authorize_listing_create(
    actor: &Actor,
    kind: ListingKind,
    shift: &ShiftSummary,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if actor.role != Role::Staff {
        return Err(AppError::Unauthorized(format!(
            "only staff may offer a shift, caller is {}",
            actor.role
        )));
    }

    if kind == ListingKind::Swap {
        return Err(AppError::BadRequest(
            "two-way exchanges go through the swap endpoints".to_string(),
        ));
    }

    if shift.assignee_id != Some(actor.id) {
        return Err(AppError::Unauthorized(
            "you can only list your own shifts".to_string(),
        ));
    }

    if expires_at <= now {
        return Err(AppError::BadRequest(
            "expires_at must be in the future".to_string(),
        ));
    }

    Ok(())
}

/// Preconditions for proposing a swap. Returns the target user derived from
/// the counter-shift's assignee.
pub fn authorize_swap_create(
    actor: &Actor,
    from_shift: &ShiftSummary,
    to_shift: &ShiftSummary,
) -> AppResult<i32> {
    if actor.role != Role::Staff {
        return Err(AppError::Unauthorized(format!(
            "only staff may propose a swap, caller is {}",
            actor.role
        )));
    }

    if from_shift.assignee_id != Some(actor.id) {
        return Err(AppError::Unauthorized(
            "you can only swap your own shifts".to_string(),
        ));
    }

    let to_user = to_shift.assignee_id.ok_or_else(|| {
        AppError::InvalidState("target shift has no assignee to swap with".to_string())
    })?;

    if to_user == actor.id {
        return Err(AppError::SelfReference(
            "cannot propose a swap with yourself".to_string(),
        ));
    }

    Ok(to_user)
}

pub fn next_listing_status(
    listing: &Listing,
    action: &ListingAction<'_>,
) -> AppResult<ListingStatus> {
    match action {
        ListingAction::Claim { actor } => {
            if actor.role != Role::Staff {
                return Err(AppError::Unauthorized(format!(
                    "only staff may claim a listing, caller is {}",
                    actor.role
                )));
            }
            if actor.id == listing.offered_by {
                return Err(AppError::SelfReference(
                    "cannot claim your own listing".to_string(),
                ));
            }
            if listing.status != ListingStatus::Pending {
                return Err(AppError::InvalidState(format!(
                    "listing is not PENDING, current status: {}",
                    listing.status
                )));
            }
            Ok(ListingStatus::Claimed)
        }

        ListingAction::Review { actor, approve } => {
            if actor.role != Role::Manager {
                return Err(AppError::Unauthorized(format!(
                    "only a manager may review a listing, caller is {}",
                    actor.role
                )));
            }
            if listing.status != ListingStatus::Claimed {
                return Err(AppError::InvalidState(format!(
                    "listing is not CLAIMED, current status: {}",
                    listing.status
                )));
            }
            Ok(if *approve {
                ListingStatus::Approved
            } else {
                ListingStatus::Rejected
            })
        }

        ListingAction::Cancel { actor } => {
            if actor.role != Role::Staff || actor.id != listing.offered_by {
                return Err(AppError::Unauthorized(
                    "you can only cancel your own listings".to_string(),
                ));
            }
            if listing.status.is_terminal() {
                return Err(AppError::InvalidState(format!(
                    "cannot cancel a listing with status {}",
                    listing.status
                )));
            }
            Ok(ListingStatus::Cancelled)
        }

        ListingAction::Expire { now } => {
            if listing.status.is_terminal() {
                return Err(AppError::InvalidState(format!(
                    "listing is already {}",
                    listing.status
                )));
            }
            if *now < listing.expires_at {
                return Err(AppError::InvalidState(
                    "listing has not reached its deadline".to_string(),
                ));
            }
            Ok(ListingStatus::Expired)
        }
    }
}

pub fn next_swap_status(swap: &SwapRequest, action: &SwapAction<'_>) -> AppResult<SwapStatus> {
    match action {
        SwapAction::Confirm { actor, accept } => {
            if actor.role != Role::Staff || actor.id != swap.to_user_id {
                return Err(AppError::Unauthorized(
                    "you are not the target of this swap".to_string(),
                ));
            }
            if swap.status != SwapStatus::PendingPeer {
                return Err(AppError::InvalidState(format!(
                    "swap is not PENDING_PEER, current status: {}",
                    swap.status
                )));
            }
            Ok(if *accept {
                SwapStatus::PendingManager
            } else {
                SwapStatus::Cancelled
            })
        }

        SwapAction::Review { actor, approve } => {
            if actor.role != Role::Manager {
                return Err(AppError::Unauthorized(format!(
                    "only a manager may review a swap, caller is {}",
                    actor.role
                )));
            }
            if swap.status != SwapStatus::PendingManager {
                return Err(AppError::InvalidState(format!(
                    "swap is not PENDING_MANAGER, current status: {}",
                    swap.status
                )));
            }
            if *approve && !swap.peer_confirmed {
                return Err(AppError::InvalidState(
                    "swap has not been confirmed by the counterparty".to_string(),
                ));
            }
            Ok(if *approve {
                SwapStatus::Approved
            } else {
                SwapStatus::Rejected
            })
        }

        SwapAction::Cancel { actor } => {
            let participant = actor.id == swap.from_user_id || actor.id == swap.to_user_id;
            if actor.role != Role::Staff || !participant {
                return Err(AppError::Unauthorized(
                    "you are not a participant in this swap".to_string(),
                ));
            }
            if swap.status.is_terminal() {
                return Err(AppError::InvalidState(format!(
                    "cannot cancel a swap with status {}",
                    swap.status
                )));
            }
            Ok(SwapStatus::Cancelled)
        }
    }
}
