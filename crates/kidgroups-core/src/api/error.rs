use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - session may be expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Structured refusal from a table query or remote procedure.
    /// `message` is meant to be shown to the user as-is.
    #[error("{message}")]
    Rejected { code: Option<String>, message: String },

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body shape shared by the table API and the auth API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<serde_json::Value>,
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
}

impl ErrorBody {
    fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.error_description.as_deref())
            .filter(|m| !m.trim().is_empty())
    }

    fn code(&self) -> Option<String> {
        match &self.code {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl GatewayError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
        let truncated = Self::truncate_body(body);
        // Structured bodies carry the text worth showing; raw bodies are kept
        let detail = parsed
            .as_ref()
            .and_then(ErrorBody::message)
            .map(str::to_string)
            .unwrap_or_else(|| truncated.clone());
        match status.as_u16() {
            401 => GatewayError::Unauthorized,
            403 => GatewayError::AccessDenied(detail),
            404 => GatewayError::NotFound(detail),
            500..=599 => GatewayError::ServerError(detail),
            _ => match parsed.as_ref().and_then(|p| p.message().map(|m| (p.code(), m))) {
                Some((code, message)) => GatewayError::Rejected {
                    code,
                    message: message.to_string(),
                },
                None => GatewayError::InvalidResponse(format!("Status {}: {}", status, truncated)),
            },
        }
    }

    /// Message suitable for an alert dialog.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Rejected { message, .. } => message.clone(),
            GatewayError::Unauthorized => "Session expired. Please log in again.".to_string(),
            GatewayError::NetworkError(_) => {
                "Unable to reach the server. Check your internet connection.".to_string()
            }
            other => other.to_string(),
        }
    }
}
