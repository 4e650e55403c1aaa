use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Every outcome of a lifecycle operation that is not a success.
///
/// All of these are expected conditions the caller can act on; none of them
/// indicates a bug in the service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("invalid request body: {0}")]
    InvalidRequest(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("validity must be between 1 and 1440 minutes, got {0}")]
    InvalidValidity(i64),

    #[error("shortcode must be 3-10 letters or digits: {0}")]
    InvalidShortcode(String),

    #[error("shortcode already exists: {0}")]
    CodeTaken(String),

    #[error("could not allocate a free shortcode after {0} attempts")]
    AllocationExhausted(u32),

    #[error("shortcode not found: {0}")]
    UnknownCode(String),

    #[error("short link has expired: {0}")]
    Expired(String),
}

pub type Result<T> = std::result::Result<T, LinkError>;

impl LinkError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidUrl(_)
            | Self::InvalidValidity(_)
            | Self::InvalidShortcode(_) => StatusCode::BAD_REQUEST,
            Self::CodeTaken(_) => StatusCode::CONFLICT,
            Self::UnknownCode(_) => StatusCode::NOT_FOUND,
            Self::Expired(_) => StatusCode::GONE,
            Self::AllocationExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for LinkError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            LinkError::InvalidRequest("bad json".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LinkError::InvalidUrl("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LinkError::InvalidValidity(5000).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LinkError::InvalidShortcode("a".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(LinkError::CodeTaken("abc".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            LinkError::UnknownCode("abc".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(LinkError::Expired("abc".into()).status(), StatusCode::GONE);
        assert_eq!(
            LinkError::AllocationExhausted(10).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
