//! Core types and events for m3u-sweep

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ProbeError;

/// A unique playlist entry: one URL plus the EXTINF line that preceded it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// The `http://` or `https://` URL, exactly as written in the playlist
    pub url: String,
    /// The `#EXTINF:...` line immediately preceding the URL, if any
    pub extinf: Option<String>,
    /// Position among the unique links of the input, used to restore order
    pub original_index: usize,
}

/// Final outcome of a probe at the HTTP level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "code")]
pub enum ProbeStatus {
    /// The server answered; final status code after the redirect chain
    Http(u16),
    /// No HTTP status was obtained (timeout, refused, DNS, TLS, redirects)
    TransportFailure,
}

impl ProbeStatus {
    /// The status code, if the server answered
    pub fn code(&self) -> Option<u16> {
        match self {
            ProbeStatus::Http(code) => Some(*code),
            ProbeStatus::TransportFailure => None,
        }
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStatus::Http(code) => write!(f, "HTTP {}", code),
            ProbeStatus::TransportFailure => write!(f, "no response"),
        }
    }
}

/// Outcome of probing one [`LinkRecord`]
///
/// Produced exactly once per record by the probe engine and never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeResult {
    /// The probed record
    pub record: LinkRecord,
    /// Whether the link survives into the output
    pub is_working: bool,
    /// Final status code, or the transport-failure sentinel
    pub status: ProbeStatus,
    /// Why the probe failed at the transport level, if it did
    pub error: Option<ProbeError>,
}

impl ProbeResult {
    /// Human-readable failure detail, if any
    pub fn error_detail(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

/// In-memory playlist before probing
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlaylistDocument {
    /// The `#EXTM3U` line the input began with, attributes included
    pub header: Option<String>,
    /// Unique links in input order
    pub records: Vec<LinkRecord>,
}

impl PlaylistDocument {
    /// Whether the input began with a `#EXTM3U` marker
    pub fn has_header(&self) -> bool {
        self.header.is_some()
    }
}

/// A link that did not survive validation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedLink {
    /// The URL
    pub url: String,
    /// Final status, or transport failure
    pub status: ProbeStatus,
    /// Transport error detail, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Counts and outcome of a validation run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Playlist that was read
    pub input_path: PathBuf,
    /// Where the cleaned playlist goes
    pub output_path: PathBuf,
    /// Whether the input carried a `#EXTM3U` header
    pub has_header: bool,
    /// Number of unique links found
    pub unique_links: usize,
    /// Number of duplicate URL lines dropped before probing
    pub duplicates_skipped: usize,
    /// Links classified as working
    pub working: usize,
    /// Links classified as non-working
    pub non_working: usize,
    /// Whether the output file was written (false for dry runs)
    pub written: bool,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Non-working links in original order
    pub failed: Vec<FailedLink>,
}

impl ValidationSummary {
    /// Whether the playlist contained no links at all
    pub fn is_empty(&self) -> bool {
        self.unique_links == 0
    }
}

/// Progress events emitted during a validation run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The playlist was parsed
    Parsed {
        /// Unique links that will be probed
        unique_links: usize,
        /// Duplicate URL lines dropped
        duplicates: usize,
    },

    /// The playlist contained no links; nothing will be probed
    EmptyPlaylist,

    /// One probe finished
    ProbeCompleted {
        /// Probes finished so far (including this one)
        completed: usize,
        /// Total probes in this run
        total: usize,
        /// The probed URL
        url: String,
        /// Classification of this URL
        working: bool,
    },

    /// The cleaned playlist was moved into place
    Written {
        /// Destination path
        path: PathBuf,
        /// Links written
        links: usize,
    },

    /// The run is complete
    Finished {
        /// Links classified as working
        working: usize,
        /// Links classified as non-working
        non_working: usize,
    },
}
