use thiserror::Error;

/// Failure reported by the remote generation service or the transport in front of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceError {
    pub message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotConfigured,
    Service,
    EmptyInput,
}

/// Every way an action can end without text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("AI assistant is not configured: set PENWRIGHT_API_KEY")]
    NotConfigured,
    #[error("AI error: {0}")]
    Service(#[from] ServiceError),
    #[error("nothing to process")]
    EmptyInput,
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::NotConfigured => ErrorKind::NotConfigured,
            ActionError::Service(_) => ErrorKind::Service,
            ActionError::EmptyInput => ErrorKind::EmptyInput,
        }
    }

    pub fn service(message: impl Into<String>) -> Self {
        ActionError::Service(ServiceError::new(message))
    }
}

/// Outcome delivered to every completion callback: text or error, never both.
pub type ActionResult = Result<String, ActionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_message_is_preserved() {
        let error: ActionError = ServiceError::new("quota exceeded").into();
        assert_eq!(error.kind(), ErrorKind::Service);
        assert_eq!(error.to_string(), "AI error: quota exceeded");
    }
}
