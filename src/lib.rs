//! # m3u-sweep
//!
//! Concurrent liveness checker and cleaner for extended M3U playlists.
//!
//! A run parses the playlist, drops duplicate URLs, sends one bounded-timeout
//! HTTP HEAD request per unique URL with bounded concurrency, and rewrites the
//! playlist with only the working links. Original order and `#EXTINF`
//! associations are kept, and the destination is replaced atomically.
//!
//! ## Quick Start
//!
//! ```no_run
//! use m3u_sweep::{Config, PlaylistValidator, Event};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::new("iptv.m3u");
//!     config.probe.concurrency_limit = 20;
//!
//!     let validator = PlaylistValidator::new(config)?;
//!
//!     // Subscribe to progress events
//!     let mut events = validator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             if let Event::ProbeCompleted { completed, total, .. } = event {
//!                 println!("{completed}/{total}");
//!             }
//!         }
//!     });
//!
//!     let summary = validator.validate().await?;
//!     println!("kept {} of {}", summary.working, summary.unique_links);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Playlist serialization and atomic replacement
pub mod assembler;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Extended M3U parsing
pub mod parser;
/// HTTP liveness probing
pub mod probe;
/// Core types and events
pub mod types;
/// Run orchestration
pub mod validator;

// Re-export commonly used types
pub use config::{Config, DuplicateMatch, ProbeConfig};
pub use error::{Error, ProbeError, Result, ToExitCode};
pub use parser::{ParsedPlaylist, parse_playlist, read_playlist};
pub use probe::{HttpProber, ProbeEngine, Prober};
pub use types::{
    Event, FailedLink, LinkRecord, PlaylistDocument, ProbeResult, ProbeStatus, ValidationSummary,
};
pub use validator::PlaylistValidator;

/// Run a validation, cancelling it cleanly on a termination signal.
///
/// On a signal the validator is shut down: pending probes are dropped and the
/// destination is not written, so [`Error::Cancelled`] is returned and the
/// existing playlist is left intact.
///
/// Listens for SIGTERM and SIGINT on Unix, Ctrl+C elsewhere.
///
/// # Example
///
/// ```no_run
/// use m3u_sweep::{Config, PlaylistValidator, validate_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let validator = PlaylistValidator::new(Config::new("iptv.m3u"))?;
///     let summary = validate_with_shutdown(&validator).await?;
///     println!("{} working", summary.working);
///     Ok(())
/// }
/// ```
pub async fn validate_with_shutdown(validator: &PlaylistValidator) -> Result<ValidationSummary> {
    let run = validator.validate();
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result,
        _ = wait_for_signal() => {
            validator.shutdown();
            run.await
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in sandboxes; fall back to whatever is available.
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut term), Ok(mut int)) => {
            let name = tokio::select! {
                _ = term.recv() => "SIGTERM",
                _ = int.recv() => "SIGINT",
            };
            tracing::info!(signal = name, "stopping validation");
        }
        (Ok(mut only), Err(e)) | (Err(e), Ok(mut only)) => {
            tracing::warn!(error = %e, "only one termination signal could be registered");
            only.recv().await;
            tracing::info!("stopping validation");
        }
        (Err(e), Err(_)) => {
            tracing::warn!(error = %e, "signal registration failed, falling back to ctrl_c");
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            tracing::info!("stopping validation");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!(signal = "ctrl_c", "stopping validation"),
        Err(e) => {
            tracing::error!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
