//! Background expiry of listings past their deadline.
//!
//! Each pass re-validates every candidate and expires it with a guarded
//! update, so a claim or approval landing mid-sweep always wins over the
//! sweeper. One failing listing never aborts the pass.

use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{
    marketplace::{
        ops::Marketplace,
        transitions::{self, ListingAction},
    },
    AppResult,
};

pub fn spawn(market: Marketplace, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match sweep_once(&market).await {
                Ok(0) => {}
                Ok(expired) => tracing::info!(expired, "Expiry sweep finished"),
                Err(e) => tracing::error!(error = %e, "Expiry sweep failed"),
            }
        }
    })
}

/// One full pass over the overdue listings. Returns how many were expired.
pub async fn sweep_once(market: &Marketplace) -> AppResult<u64> {
    let candidates = market.listings.expiry_candidates().await?;
    let now = Utc::now();
    let mut expired = 0u64;

    for listing in candidates {
        if let Err(e) = transitions::next_listing_status(&listing, &ListingAction::Expire { now })
        {
            tracing::debug!(listing_id = listing.id, error = %e, "Candidate no longer expirable");
            continue;
        }

        match market.listings.mark_expired(listing.id, listing.status).await {
            Ok(true) => {
                counter!("marketplace_listings_expired_total").increment(1);
                tracing::info!(
                    listing_id = listing.id,
                    shift_id = %listing.shift_id,
                    from_status = %listing.status,
                    "Listing expired"
                );
                expired += 1;
            }
            Ok(false) => {
                tracing::debug!(listing_id = listing.id, "Listing moved before expiry landed");
            }
            Err(e) => {
                tracing::warn!(error = %e, listing_id = listing.id, "Failed to expire listing");
            }
        }
    }

    Ok(expired)
}
