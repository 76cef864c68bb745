//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, enums, and error types
//! that form the vocabulary of the procurement domain.

mod errors;
mod events;
mod ids;
mod money;
mod roles;
mod state_machine;
mod timestamp;
mod topic;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{EventId, Notification};
pub use ids::{ActorId, BidId, ConnectionId, EmdId, OrgId, TenderId, WorkflowId};
pub use money::{Currency, Money};
pub use roles::{Actor, ActorRole};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
pub use topic::{EntityKind, EntityRef, Topic};
