//! Error taxonomy for the ONS client.
//!
//! Errors fall into three families:
//! - transport failures (network, timeout, non-2xx, undecodable JSON),
//!   which are safe to retry with backoff;
//! - not-found failures naming the missing resource, which are not;
//! - client-side precondition failures raised before any network call.
//!
//! Per-record value parse failures are *not* variants here: they are
//! collected into [`crate::models::ObservationSet::failures`] so a partial
//! result stays usable.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Network-level failure: connect/timeout errors, non-success HTTP
    /// status, or a response body that is not decodable JSON.
    #[error("GET {url} failed{}", transport_suffix(*timeout, *status))]
    Transport {
        url: String,
        /// HTTP status when the server answered with a non-success code.
        status: Option<u16>,
        /// True when the failure was a client-side timeout.
        timeout: bool,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("dataset not found: {0}")]
    DatasetNotFound(String),

    #[error("edition not found: {dataset}/{edition}")]
    EditionNotFound { dataset: String, edition: String },

    /// A previously resolved version URL no longer answers.
    #[error("version not found: {0}")]
    VersionNotFound(String),

    #[error("dimension not found: {0}")]
    DimensionNotFound(String),

    /// Dataset exists but no edition carries a published version.
    #[error("no versions available for dataset: {0}")]
    NoVersionsAvailable(String),

    /// Raised client-side before the observations request; lists *every*
    /// unassigned dimension at once (the live API reports only the first).
    #[error("incomplete dimension assignment, missing: {}", missing.join(", "))]
    IncompleteAssignment { missing: Vec<String> },

    /// The observations endpoint accepts at most one wildcarded dimension.
    #[error("more than one wildcard dimension: {}", dimensions.join(", "))]
    TooManyWildcards { dimensions: Vec<String> },

    #[error("write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("write {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

impl Error {
    /// True for failures where a retry with backoff can plausibly succeed:
    /// network errors, timeouts and 5xx responses. Not-found and
    /// precondition errors are permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { status, .. } => status.is_none_or(|s| s >= 500),
            _ => false,
        }
    }

    /// True when the failure was a client-side timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport { timeout: true, .. })
    }

    pub(crate) fn is_http_status(&self, code: u16) -> bool {
        matches!(self, Error::Transport { status: Some(s), .. } if *s == code)
    }
}

fn transport_suffix(timeout: bool, status: Option<u16>) -> String {
    if timeout {
        " (timed out)".to_string()
    } else if let Some(s) = status {
        format!(" with HTTP {s}")
    } else {
        String::new()
    }
}

/// A single observation whose value field could not be parsed as a float
/// (the API encodes suppressed/missing values as sentinel strings such as
/// `"."`). Collected per record; never aborts a fetch.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("unparseable observation value {raw:?} for period {period_id}")]
pub struct ValueParseError {
    pub period_id: String,
    pub period_label: String,
    /// The raw value text as returned by the API.
    pub raw: String,
}
