use thiserror::Error;

/// Transport-level failures, before turn classification.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned status {status}")]
    Status {
        status: u16,
        /// `error` field from the response body, when parseable.
        error_message: Option<String>,
    },
}

/// Terminal outcome taxonomy for a failed turn, plus local validation.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("message is empty after trimming")]
    EmptyMessage,
    #[error("message length {length} exceeds {max} UTF-16 units")]
    MessageTooLong { length: usize, max: usize },
    #[error("another turn is already in flight")]
    TurnInFlight,
    #[error("request timed out after {0} seconds")]
    Timeout(u64),
    #[error("network error: {0}")]
    Network(String),
    #[error("server error (status {status})")]
    Server {
        status: u16,
        message: Option<String>,
    },
}

impl TurnError {
    /// User-visible notice for the inline conversation alert.
    pub fn user_notice(&self) -> String {
        match self {
            TurnError::EmptyMessage => "Please enter a message".to_string(),
            TurnError::MessageTooLong { .. } => {
                "Message too long. Please keep it under 1000 characters.".to_string()
            }
            TurnError::TurnInFlight => {
                "Please wait for the current response before sending another message.".to_string()
            }
            TurnError::Timeout(_) => {
                "Request timed out. The server may be processing a complex query. Please try again."
                    .to_string()
            }
            TurnError::Network(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            TurnError::Server { message, .. } => message
                .clone()
                .unwrap_or_else(|| "Server error occurred. Please try again.".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_notice_prefers_service_supplied_message() {
        let err = TurnError::Server {
            status: 400,
            message: Some("Message cannot be empty".to_string()),
        };
        assert_eq!(err.user_notice(), "Message cannot be empty");

        let generic = TurnError::Server {
            status: 500,
            message: None,
        };
        assert_eq!(generic.user_notice(), "Server error occurred. Please try again.");
    }
}
