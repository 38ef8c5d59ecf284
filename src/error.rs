use thiserror::Error;

/// Failure of an inventory or detail request.
///
/// A queued inventory is not represented here; see
/// [`crate::bgg::collection::CollectionOutcome::Pending`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{endpoint} request failed: {message}")]
    Network {
        endpoint: &'static str,
        status: Option<u16>,
        message: String,
    },
    #[error("{endpoint} response failed validation: {message}")]
    Validation {
        endpoint: &'static str,
        message: String,
    },
}

impl FetchError {
    pub fn network_status(endpoint: &'static str, status: reqwest::StatusCode) -> Self {
        let message = match status.canonical_reason() {
            Some(reason) => format!("{} {reason}", status.as_u16()),
            None => status.as_u16().to_string(),
        };
        Self::Network {
            endpoint,
            status: Some(status.as_u16()),
            message,
        }
    }

    pub fn transport(endpoint: &'static str, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("timed out: {err}")
        } else {
            err.to_string()
        };
        Self::Network {
            endpoint,
            status: err.status().map(|s| s.as_u16()),
            message,
        }
    }

    pub fn validation(endpoint: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            endpoint,
            message: message.into(),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("spawn renderer {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("renderer failed ({status}): {stderr}")]
    Failed { status: String, stderr: String },
    #[error("renderer timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("renderer produced no document")]
    MissingOutput,
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}
