//! Bid module - finite-state controller for bids.

mod aggregate;
mod events;
mod status;

pub use aggregate::Bid;
pub use events::BidEvent;
pub use status::BidStatus;
