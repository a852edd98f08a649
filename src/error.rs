// src/error.rs
//! Error taxonomy for a single refresh tick.
//!
//! Nothing here ever reaches the scheduler: every tick converts these into a
//! fallback render (see `feed::scheduler`).

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Network-level failure while fetching one source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS, DNS or body-read failure.
    #[error("transport error for source `{source_id}`: {cause}")]
    Transport {
        source_id: String,
        #[source]
        cause: BoxError,
    },

    /// The server answered with a non-2xx status.
    #[error("source `{source_id}` answered HTTP {status}")]
    Status { source_id: String, status: u16 },
}

impl FetchError {
    pub fn transport(source_id: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self::Transport {
            source_id: source_id.into(),
            cause: cause.into(),
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            Self::Transport { source_id, .. } | Self::Status { source_id, .. } => source_id,
        }
    }
}

/// Malformed or unexpectedly shaped payload.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid XML: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("unexpected payload shape: {0}")]
    Shape(String),
}

/// Anything a tick can fail with before it reaches the renderer.
#[derive(Debug, Error)]
pub enum TickError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("parse error for source `{source_id}`: {reason}")]
    Parse { source_id: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_keeps_source_id_and_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let e = FetchError::transport("eew", io);
        assert_eq!(e.source_id(), "eew");
        assert!(e.to_string().contains("refused"));
        assert!(std::error::Error::source(&e).is_some());

        let s = FetchError::Status {
            source_id: "news".into(),
            status: 503,
        };
        assert_eq!(s.source_id(), "news");
        assert!(s.to_string().contains("503"));
    }
}
