//! Error types for the ingress controller

use thiserror::Error;

/// Error variants are named with the `Error` suffix for clarity (e.g., `KubeError`).
/// This is idiomatic for error enums and improves readability at call sites.
#[allow(clippy::enum_variant_names)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Missing object key: {0}")]
    MissingObjectKey(&'static str),

    #[error("Invalid ingress template: {0}")]
    InvalidTemplate(String),

    #[error("Initial cache sync failed: {0}")]
    InitialSyncError(String),
}

impl Error {
    /// Check if this error is retryable.
    ///
    /// Retryable errors are requeued with backoff; permanent errors are
    /// logged and dropped, since retrying cannot help.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::KubeError(e) => {
                match e {
                    kube::Error::Api(api_err) => {
                        // 4xx errors (except 409 Conflict, 429 TooManyRequests) are usually not retryable
                        let code = api_err.code;
                        if (400..500).contains(&code) {
                            return code == 409 || code == 429;
                        }
                        // 5xx errors are retryable
                        true
                    }
                    // Network and other errors are retryable
                    _ => true,
                }
            }
            // A malformed input object or template cannot heal on retry
            Error::MissingObjectKey(_) => false,
            Error::InvalidTemplate(_) => false,
            // Sync failure is fatal at startup, never retried per-key
            Error::InitialSyncError(_) => false,
        }
    }

    /// Short class label for metrics, keyed by error kind rather than message.
    pub fn class(&self) -> &'static str {
        match self {
            Error::KubeError(_) => "kube_api",
            Error::MissingObjectKey(_) => "missing_object_key",
            Error::InvalidTemplate(_) => "invalid_template",
            Error::InitialSyncError(_) => "initial_sync",
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
