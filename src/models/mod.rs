pub mod inputs;
pub mod listing;
pub mod shift;
pub mod swap;

pub use inputs::{
    ApprovalsQueue, ConfirmSwapInput, CreateListingInput, CreateSwapInput, DashboardCounts,
    MyRequests, ReviewInput,
};
pub use listing::{Listing, ListingKind, ListingRow, ListingStatus};
pub use shift::ShiftSummary;
pub use swap::{SwapRequest, SwapRequestRow, SwapStatus};
