use thiserror::Error;

/// Failures talking to the performance backend.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("backend returned {status}: {}", message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Message to show the user: the backend's own wording when it sent one.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Status {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_wins_over_fallback() {
        let err = ApiError::Status {
            status: 500,
            message: Some("Leaderboard unavailable".to_string()),
        };
        assert_eq!(err.user_message("Failed"), "Leaderboard unavailable");
    }

    #[test]
    fn blank_or_missing_message_uses_fallback() {
        let missing = ApiError::Status {
            status: 502,
            message: None,
        };
        let blank = ApiError::Status {
            status: 500,
            message: Some("  ".to_string()),
        };
        assert_eq!(missing.user_message("Failed to fetch"), "Failed to fetch");
        assert_eq!(blank.user_message("Failed to fetch"), "Failed to fetch");
    }

    #[test]
    fn decode_errors_use_fallback() {
        let err: ApiError = serde_json::from_str::<u32>("\"x\"").unwrap_err().into();
        assert_eq!(err.user_message("Failed to fetch trends"), "Failed to fetch trends");
    }
}
