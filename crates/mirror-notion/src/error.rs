//! Error types for Notion API access.

/// Error from Notion API operations.
#[derive(Debug, thiserror::Error)]
pub enum NotionError {
    /// HTTP request failed (network error, timeout, body read, etc).
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] ureq::Error),

    /// HTTP response error (server returned error status).
    #[error("HTTP error: {status} - {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure injected by the in-memory mock.
    #[error("mock failure: {0}")]
    Mock(String),
}

impl NotionError {
    /// HTTP status of the failed response, if the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server asked us to slow down.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only_for_http_errors() {
        let err = NotionError::Http {
            status: 429,
            body: "rate_limited".to_owned(),
        };
        assert_eq!(err.status(), Some(429));
        assert!(err.is_rate_limited());

        let err = NotionError::Mock("boom".to_owned());
        assert_eq!(err.status(), None);
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn test_display_includes_status_and_body() {
        let err = NotionError::Http {
            status: 502,
            body: "bad gateway".to_owned(),
        };
        assert_eq!(err.to_string(), "HTTP error: 502 - bad gateway");
    }

    #[test]
    fn test_display_keeps_transport_cause() {
        let err = NotionError::from(ureq::Error::HostNotFound);
        assert_eq!(
            err.to_string(),
            format!("HTTP request failed: {}", ureq::Error::HostNotFound)
        );

        let err = NotionError::from(serde_json::from_str::<serde_json::Value>("{").unwrap_err());
        assert!(err.to_string().starts_with("JSON error: EOF"));
    }
}
