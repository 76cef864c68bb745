//! State machine trait for status enums.
//!
//! Provides a consistent interface for validating and performing state
//! transitions across entity lifecycle statuses (Workflow, Stage, Bid, EMD).

use super::DomainError;

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for BidStatus {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!(
///             (self, target),
///             (Draft, Submitted) |
///             (Submitted, UnderReview) |
///             // ... etc
///         )
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Draft => vec![Submitted],
///             // ... etc
///         }
///     }
/// }
///
/// // Usage:
/// let new_status = current.transition_to(BidStatus::Submitted, "Bid", &bid_id)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug + std::fmt::Display {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if the edge
    /// does not exist.
    ///
    /// This is the preferred way to change state; the returned error
    /// names the entity, the current state, and the attempted state.
    fn transition_to(
        &self,
        target: Self,
        entity: &'static str,
        entity_id: impl std::fmt::Display,
    ) -> Result<Self, DomainError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(DomainError::invalid_transition(entity, entity_id, self, target))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
