//! Manager approval and the reassignment that follows it.
//!
//! Ordering rule: the status transition is committed to the database first,
//! then the rota is asked to move the assignment. A failed reassignment is
//! compensated by reverting the just-committed approval, so no row is ever
//! left APPROVED while the shift still belongs to the original holder. No
//! database lock is held across the rota call.

use crate::{
    marketplace::{listings::ListingStore, shift_ref::ShiftReference, swaps::SwapStore},
    models::{Listing, SwapRequest},
    AppError, AppResult,
};

/// Approve a claimed listing and hand the shift to the claimant.
pub async fn approve_listing(
    listings: &ListingStore,
    shifts: &dyn ShiftReference,
    listing: &Listing,
    reviewer_id: i32,
    note: Option<&str>,
) -> AppResult<Listing> {
    let claimant = listing.claimed_by.ok_or_else(|| {
        AppError::Internal(format!("listing {} is CLAIMED but has no claimant", listing.id))
    })?;

    let committed = match listings.approve(listing.id, reviewer_id, note).await? {
        Some(updated) => updated,
        None => {
            let current = listings.fetch(listing.id).await?;
            return Err(AppError::InvalidState(format!(
                "listing is not CLAIMED, current status: {}",
                current.status
            )));
        }
    };

    if let Err(e) = shifts
        .reassign(listing.shift_id, listing.offered_by, claimant)
        .await
    {
        tracing::warn!(
            error = %e,
            listing_id = listing.id,
            shift_id = %listing.shift_id,
            "Reassignment failed, reverting approval"
        );
        roll_back_listing(listings, listing.id).await;
        return Err(reassignment_error(e));
    }

    tracing::info!(
        listing_id = listing.id,
        shift_id = %listing.shift_id,
        claimant,
        reviewer_id,
        "Listing approved and shift reassigned"
    );
    Ok(committed)
}

/// Approve a confirmed swap and exchange the two assignments.
pub async fn approve_swap(
    swaps: &SwapStore,
    shifts: &dyn ShiftReference,
    swap: &SwapRequest,
    reviewer_id: i32,
    note: Option<&str>,
) -> AppResult<SwapRequest> {
    let committed = match swaps.approve(swap.id, reviewer_id, note).await? {
        Some(updated) => updated,
        None => {
            let current = swaps.fetch(swap.id).await?;
            return Err(AppError::InvalidState(format!(
                "swap is not PENDING_MANAGER, current status: {}",
                current.status
            )));
        }
    };

    if let Err(e) = shifts
        .reassign(swap.from_shift_id, swap.from_user_id, swap.to_user_id)
        .await
    {
        tracing::warn!(
            error = %e,
            swap_id = swap.id,
            shift_id = %swap.from_shift_id,
            "First reassignment failed, reverting approval"
        );
        roll_back_swap(swaps, swap.id).await;
        return Err(reassignment_error(e));
    }

    if let Err(e) = shifts
        .reassign(swap.to_shift_id, swap.to_user_id, swap.from_user_id)
        .await
    {
        tracing::warn!(
            error = %e,
            swap_id = swap.id,
            shift_id = %swap.to_shift_id,
            "Second reassignment failed, reversing the first and reverting approval"
        );
        if let Err(reverse_err) = shifts
            .reassign(swap.from_shift_id, swap.to_user_id, swap.from_user_id)
            .await
        {
            tracing::error!(
                error = %reverse_err,
                swap_id = swap.id,
                shift_id = %swap.from_shift_id,
                "Could not reverse the first reassignment, shifts need manual repair"
            );
        }
        roll_back_swap(swaps, swap.id).await;
        return Err(reassignment_error(e));
    }

    tracing::info!(
        swap_id = swap.id,
        from_shift_id = %swap.from_shift_id,
        to_shift_id = %swap.to_shift_id,
        reviewer_id,
        "Swap approved and both shifts reassigned"
    );
    Ok(committed)
}

async fn roll_back_listing(listings: &ListingStore, id: i32) {
    match listings.revert_approval(id).await {
        Ok(Some(_)) => tracing::info!(listing_id = id, "Approval reverted"),
        Ok(None) => {
            tracing::error!(listing_id = id, "Approval rollback found no APPROVED row")
        }
        Err(e) => tracing::error!(error = %e, listing_id = id, "Approval rollback failed"),
    }
}

async fn roll_back_swap(swaps: &SwapStore, id: i32) {
    match swaps.revert_approval(id).await {
        Ok(Some(_)) => tracing::info!(swap_id = id, "Approval reverted"),
        Ok(None) => tracing::error!(swap_id = id, "Approval rollback found no APPROVED row"),
        Err(e) => tracing::error!(error = %e, swap_id = id, "Approval rollback failed"),
    }
}

/// Whatever went wrong on the rota side surfaces to the caller as a
/// reassignment failure, not as our own error class.
fn reassignment_error(e: AppError) -> AppError {
    match e {
        AppError::ReassignmentFailed(_) => e,
        other => AppError::ReassignmentFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassignment_failure_passes_through() {
        let e = reassignment_error(AppError::ReassignmentFailed("rota said no".into()));
        match e {
            AppError::ReassignmentFailed(msg) => assert_eq!(msg, "rota said no"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn other_errors_are_wrapped_as_reassignment_failures() {
        let e = reassignment_error(AppError::Internal("connection reset".into()));
        match e {
            AppError::ReassignmentFailed(msg) => assert!(msg.contains("connection reset")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
