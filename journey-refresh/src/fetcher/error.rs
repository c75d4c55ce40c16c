//! Trip fetcher error types.

use std::fmt;
use std::time::Duration;

/// Errors from fetching journeys.
///
/// All of these are transient from the coordinator's point of view: the
/// session goes to `Failed` and the next trigger tries again.
#[derive(Debug)]
pub enum FetchError {
    /// HTTP request failed (network error, connect timeout, etc.)
    Http(reqwest::Error),

    /// JSON deserialization failed
    Json {
        message: String,
        body: Option<String>,
    },

    /// API returned an error status code
    ApiError { status: u16, message: String },

    /// Rate limited by the API
    RateLimited,

    /// Invalid API key or unauthorized
    Unauthorized,

    /// The fetch did not complete before its deadline
    Timeout(Duration),

    /// Feature not configured or not available
    NotConfigured(String),
}

impl FetchError {
    /// Short user-facing reason, suitable for a "couldn't refresh" banner.
    pub fn reason(&self) -> String {
        match self {
            FetchError::Http(_) | FetchError::Timeout(_) => "network unavailable".to_string(),
            FetchError::RateLimited => "too many requests".to_string(),
            FetchError::Unauthorized => "not authorised".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Http(e) => write!(f, "HTTP error: {e}"),
            FetchError::Json { message, body } => {
                write!(f, "JSON parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            FetchError::ApiError { status, message } => {
                write!(f, "API error {status}: {message}")
            }
            FetchError::RateLimited => write!(f, "rate limited by trip planner API"),
            FetchError::Unauthorized => write!(f, "unauthorized (invalid API key)"),
            FetchError::Timeout(after) => write!(f, "fetch timed out after {}s", after.as_secs()),
            FetchError::NotConfigured(msg) => write!(f, "not configured: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FetchError::RateLimited;
        assert_eq!(err.to_string(), "rate limited by trip planner API");

        let err = FetchError::ApiError {
            status: 500,
            message: "Internal Server Error".into(),
        };
        assert_eq!(err.to_string(), "API error 500: Internal Server Error");

        let err = FetchError::Json {
            message: "expected string".into(),
            body: Some("{}".into()),
        };
        assert!(err.to_string().contains("JSON parse error"));
        assert!(err.to_string().contains("expected string"));

        let err = FetchError::Timeout(Duration::from_secs(20));
        assert_eq!(err.to_string(), "fetch timed out after 20s");
    }

    #[test]
    fn reason_hides_transport_details() {
        assert_eq!(
            FetchError::Timeout(Duration::from_secs(1)).reason(),
            "network unavailable"
        );
        assert_eq!(FetchError::Unauthorized.reason(), "not authorised");
    }
}
