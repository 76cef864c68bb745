//! Error types for the domain layer.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must not be negative, got {actual}")]
    Negative { field: String, actual: i64 },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates a negative value validation error.
    pub fn negative(field: impl Into<String>, actual: i64) -> Self {
        ValidationError::Negative {
            field: field.into(),
            actual,
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error codes organized by category.
///
/// The lifecycle codes are safe to surface to API callers as-is: they
/// name the entity and the states involved but reveal no secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Lifecycle errors
    /// Operation is not valid for the entity's current status.
    InvalidState,
    /// The requested state-machine edge does not exist.
    InvalidTransition,
    /// The acting principal lacks the required role.
    Unauthorized,
    /// A required linked entity is missing or in the wrong state.
    PreconditionFailed,
    /// The addressed entity (or stage) does not exist.
    NotFound,
    /// Optimistic-version race; retry from a fresh read.
    Conflict,

    // Validation errors
    ValidationFailed,

    // Infrastructure errors
    StoreError,
    Timeout,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::InvalidTransition => "INVALID_TRANSITION",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::PreconditionFailed => "PRECONDITION_FAILED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::StoreError => "STORE_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code, message, and structured details.
///
/// Details carry the offending entity id and the current vs. attempted
/// state under stable keys (`entity`, `entity_id`, `current`,
/// `attempted`), so upstream layers can render precise messages without
/// parsing ours.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Operation not valid for the entity's current status.
    pub fn invalid_state(
        entity: &'static str,
        entity_id: impl fmt::Display,
        current: impl fmt::Display,
        attempted: impl fmt::Display,
    ) -> Self {
        Self::new(
            ErrorCode::InvalidState,
            format!("{} {} is {}, cannot {}", entity, entity_id, current, attempted),
        )
        .with_entity(entity, entity_id)
        .with_detail("current", current.to_string())
        .with_detail("attempted", attempted.to_string())
    }

    /// The requested state-machine edge does not exist.
    pub fn invalid_transition(
        entity: &'static str,
        entity_id: impl fmt::Display,
        from: impl fmt::Display,
        to: impl fmt::Display,
    ) -> Self {
        Self::new(
            ErrorCode::InvalidTransition,
            format!("{} {}: no transition from {} to {}", entity, entity_id, from, to),
        )
        .with_entity(entity, entity_id)
        .with_detail("current", from.to_string())
        .with_detail("attempted", to.to_string())
    }

    /// The acting principal lacks the required role.
    pub fn unauthorized(
        entity: &'static str,
        entity_id: impl fmt::Display,
        required: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        Self::new(
            ErrorCode::Unauthorized,
            format!(
                "{} {} requires role {}, actor has {}",
                entity, entity_id, required, actual
            ),
        )
        .with_entity(entity, entity_id)
        .with_detail("required_role", required.to_string())
        .with_detail("actor_role", actual.to_string())
    }

    /// A required linked entity is missing or in the wrong state.
    pub fn precondition_failed(
        entity: &'static str,
        entity_id: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        Self::new(
            ErrorCode::PreconditionFailed,
            format!("{} {}: {}", entity, entity_id, reason),
        )
        .with_entity(entity, entity_id)
        .with_detail("reason", reason)
    }

    /// The addressed entity does not exist.
    pub fn not_found(entity: &'static str, entity_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", entity, entity_id),
        )
        .with_entity(entity, entity_id)
    }

    /// Optimistic-version race on save.
    pub fn conflict(entity: &'static str, entity_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::Conflict,
            format!("{} {} was modified concurrently, retry from a fresh read", entity, entity_id),
        )
        .with_entity(entity, entity_id)
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message).with_detail("field", field.into())
    }

    /// Infrastructure failure in the record store.
    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreError, message)
    }

    /// A bounded timeout elapsed before the operation finished.
    pub fn timeout(operation: impl Into<String>) -> Self {
        let operation = operation.into();
        Self::new(ErrorCode::Timeout, format!("operation timed out: {}", operation))
            .with_detail("operation", operation)
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    fn with_entity(self, entity: &'static str, entity_id: impl fmt::Display) -> Self {
        self.with_detail("entity", entity)
            .with_detail("entity_id", entity_id.to_string())
    }

    /// True if the caller may retry the same request after a fresh read.
    ///
    /// Only version races are retryable; every other lifecycle error is
    /// terminal for that request.
    pub fn is_retryable(&self) -> bool {
        self.code == ErrorCode::Conflict
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        DomainError::new(ErrorCode::ValidationFailed, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_empty_field_displays_correctly() {
        let err = ValidationError::empty_field("remarks");
        assert_eq!(format!("{}", err), "Field 'remarks' cannot be empty");
    }

    #[test]
    fn domain_error_displays_code_and_message() {
        let err = DomainError::not_found("Bid", "bid-17");
        assert_eq!(format!("{}", err), "[NOT_FOUND] Bid not found: bid-17");
    }

    #[test]
    fn invalid_transition_carries_states_in_details() {
        let err = DomainError::invalid_transition("Bid", "bid-1", "draft", "awarded");
        assert_eq!(err.code, ErrorCode::InvalidTransition);
        assert_eq!(err.details.get("current"), Some(&"draft".to_string()));
        assert_eq!(err.details.get("attempted"), Some(&"awarded".to_string()));
        assert_eq!(err.details.get("entity_id"), Some(&"bid-1".to_string()));
    }

    #[test]
    fn only_conflict_is_retryable() {
        assert!(DomainError::conflict("Workflow", "wf-1").is_retryable());
        assert!(!DomainError::not_found("Workflow", "wf-1").is_retryable());
        assert!(!DomainError::invalid_state("Workflow", "wf-1", "draft", "advance").is_retryable());
        assert!(!DomainError::timeout("save workflow").is_retryable());
    }

    #[test]
    fn unauthorized_names_both_roles() {
        let err = DomainError::unauthorized("Stage", "Final-Approval", "approver", "officer");
        assert_eq!(err.details.get("required_role"), Some(&"approver".to_string()));
        assert_eq!(err.details.get("actor_role"), Some(&"officer".to_string()));
    }

    #[test]
    fn validation_error_converts_to_domain_error() {
        let err: DomainError = ValidationError::empty_field("reason").into();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }
}
