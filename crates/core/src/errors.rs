use thiserror::Error;

use crate::{
    domain::intent::{Intent, SlotKey},
    flows::FlowTransitionError,
    store::StoreError,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("arguments for {intent} requested while slots are missing: {missing:?}")]
    PrematureExtraction { intent: Intent, missing: Vec<SlotKey> },
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("invalid profile: {0}")]
    InvalidProfile(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "I couldn't use that answer. Please try again.",
            Self::ServiceUnavailable { .. } => {
                "The coach is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value.to_string())
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(DomainError::InvalidProfile(message)) => {
                Self::BadRequest { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Domain(DomainError::PrematureExtraction { .. })
            | ApplicationError::Domain(DomainError::FlowTransition(_)) => Self::BadRequest {
                message: "conversation validation failed".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Domain(DomainError::InvariantViolation(message)) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::intent::{Intent, SlotKey};
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn premature_extraction_maps_to_bad_request() {
        let interface = ApplicationError::from(DomainError::PrematureExtraction {
            intent: Intent::GenerateWorkout,
            missing: vec![SlotKey::Frequency],
        })
        .into_interface("session-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "session-1"
        ));
        assert_eq!(interface.user_message(), "I couldn't use that answer. Please try again.");
    }

    #[test]
    fn premature_extraction_names_missing_slots() {
        let error = DomainError::PrematureExtraction {
            intent: Intent::GenerateNutrition,
            missing: vec![SlotKey::Macros, SlotKey::DietaryPrefs],
        };
        let message = error.to_string();
        assert!(message.contains("generate_nutrition"));
        assert!(message.contains("Macros"));
    }

    #[test]
    fn persistence_error_maps_to_service_unavailable() {
        let interface = ApplicationError::Persistence("state file is read-only".to_owned())
            .into_interface("session-2");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The coach is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn invariant_violation_maps_to_internal() {
        let interface = ApplicationError::from(DomainError::InvariantViolation(
            "transition produced no turn outcome".to_owned(),
        ))
        .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
