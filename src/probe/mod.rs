//! Liveness probing: the [`Prober`] transport seam, the classification policy,
//! and the bounded-concurrency [`ProbeEngine`].

mod engine;
mod http;

pub use engine::ProbeEngine;
pub use http::HttpProber;

use crate::error::ProbeError;
use crate::types::{LinkRecord, ProbeResult, ProbeStatus};

/// Final HTTP status of a probe, or why no status was obtained
pub type ProbeOutcome = std::result::Result<u16, ProbeError>;

/// Abstraction over the single request issued per URL, enabling testability.
///
/// Implementations perform exactly one attempt and report the final status
/// after redirects. They never retry.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    /// Probe `url` once
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// Whether a final HTTP status counts as a working link
///
/// 2xx and 3xx are working. 5xx is working only when `keep_server_errors` is
/// set. Everything else (1xx, 4xx, out-of-range codes) is not.
///
/// # Examples
///
/// ```
/// use m3u_sweep::probe::is_working_status;
///
/// assert!(is_working_status(200, false));
/// assert!(is_working_status(302, false));
/// assert!(!is_working_status(404, true));
/// assert!(!is_working_status(503, false));
/// assert!(is_working_status(503, true));
/// ```
#[must_use]
pub fn is_working_status(status: u16, keep_server_errors: bool) -> bool {
    match status {
        200..=399 => true,
        500..=599 => keep_server_errors,
        _ => false,
    }
}

/// Turn a probe outcome into the immutable result for `record`
pub fn classify(record: LinkRecord, outcome: ProbeOutcome, keep_server_errors: bool) -> ProbeResult {
    match outcome {
        Ok(code) => ProbeResult {
            record,
            is_working: is_working_status(code, keep_server_errors),
            status: ProbeStatus::Http(code),
            error: None,
        },
        Err(error) => ProbeResult {
            record,
            is_working: false,
            status: ProbeStatus::TransportFailure,
            error: Some(error),
        },
    }
}
