use thiserror::Error;

use crate::flows::FlowTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("pricing requires answers for {missing:?}")]
    MissingPricingInputs { missing: Vec<String> },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("unknown session: {0}")]
    SessionNotFound(String),
    #[error("{collaborator} collaborator failure: {message}")]
    Collaborator { collaborator: String, message: String },
    #[error("configuration failure: {0}")]
    Configuration(String),
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
            Self::BadRequest { .. } => {
                "No pudimos procesar la solicitud. Revisa los datos e intenta de nuevo."
            }
            Self::ServiceUnavailable { .. } => {
                "El servicio no está disponible por el momento. Intenta nuevamente en unos minutos."
            }
            Self::Internal { .. } => "Ocurrió un error inesperado.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
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

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::SessionNotFound(session_id) => Self::BadRequest {
                message: format!("unknown session: {session_id}"),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Collaborator { collaborator, message } => Self::ServiceUnavailable {
                message: format!("{collaborator}: {message}"),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn domain_error_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(DomainError::InvariantViolation(
            "bathroom answer before bed answer".to_owned(),
        ))
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
    }

    #[test]
    fn bad_request_has_user_safe_message() {
        let interface = ApplicationError::SessionNotFound("s-404".to_owned()).into_interface("req-2");

        assert_eq!(
            interface.user_message(),
            "No pudimos procesar la solicitud. Revisa los datos e intenta de nuevo."
        );
        assert_eq!(interface.correlation_id(), "req-2");
    }

    #[test]
    fn collaborator_error_maps_to_service_unavailable() {
        let interface = ApplicationError::Collaborator {
            collaborator: "document_renderer".to_owned(),
            message: "template render failed".to_owned(),
        }
        .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "El servicio no está disponible por el momento. Intenta nuevamente en unos minutos."
        );
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface = ApplicationError::Configuration("missing webhook url".to_owned())
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "Ocurrió un error inesperado.");
    }

    #[test]
    fn missing_pricing_inputs_surface_as_bad_request() {
        let interface = ApplicationError::from(DomainError::MissingPricingInputs {
            missing: vec!["square_meters".to_owned()],
        })
        .into_interface("req-5");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref message, .. } if message.contains("square_meters")
        ));
    }
}
