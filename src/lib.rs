//! Tender Desk - Procurement Lifecycle Coordination Core
//!
//! Coordinates procurement approval workflows, bid and earnest-money
//! deposit state machines, and realtime fan-out of their transitions to
//! subscribed connections. Transport, authentication, and persistence
//! schema live behind ports; the core is adaptable behind any RPC or
//! HTTP layer.

pub mod adapters;
pub mod application;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod ports;
