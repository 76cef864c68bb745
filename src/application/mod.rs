//! Application layer - lifecycle services over the domain aggregates.
//!
//! Each service is the single writer for its aggregate: it loads with a
//! version, applies the domain transition, saves conditionally, and
//! hands recorded events to the dispatcher after the commit.

mod bid_lifecycle;
mod emd_lifecycle;
mod workflow_engine;

pub use bid_lifecycle::BidLifecycle;
pub use emd_lifecycle::{EmdLifecycle, SweepCancel, SweepReport};
pub use workflow_engine::WorkflowEngine;
