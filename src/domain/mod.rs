//! Domain layer - aggregates, value objects, and state machines.
//!
//! Ownership boundaries: a `WorkflowInstance` owns its stages and
//! history; `Bid` and `Emd` are independent aggregates referenced by id.
//! Cross-aggregate effects always go through the owning aggregate's own
//! lifecycle controller.

pub mod bid;
pub mod emd;
pub mod foundation;
pub mod tender;
pub mod workflow;
