pub mod approval;
pub mod listings;
pub mod ops;
pub mod shift_ref;
pub mod swaps;
pub mod sweeper;
pub mod transitions;

#[cfg(test)]
mod pg_tests;

pub use listings::{ClaimOutcome, ListingStore};
pub use ops::Marketplace;
pub use shift_ref::{PgShiftReference, ShiftReference};
pub use swaps::SwapStore;
