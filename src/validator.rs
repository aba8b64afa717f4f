//! Validation run orchestration: parse, probe, assemble, write.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::assembler::{assemble, write_atomic_async};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::parser::read_playlist;
use crate::probe::{HttpProber, ProbeEngine, Prober};
use crate::types::{Event, FailedLink, ValidationSummary};

/// Capacity of the event broadcast channel; slow subscribers lag rather than block probes.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Runs one playlist through parse -> probe -> assemble -> atomic write.
///
/// ```no_run
/// use m3u_sweep::{Config, PlaylistValidator};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut config = Config::new("channels.m3u");
///     config.output_path = Some("channels.clean.m3u".into());
///
///     let validator = PlaylistValidator::new(config)?;
///     let summary = validator.validate().await?;
///
///     println!("{} working, {} dropped", summary.working, summary.non_working);
///     Ok(())
/// }
/// ```
pub struct PlaylistValidator {
    config: Arc<Config>,
    prober: Arc<dyn Prober>,
    event_tx: broadcast::Sender<Event>,
    cancel_token: CancellationToken,
}

impl PlaylistValidator {
    /// Create a validator probing over HTTP
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for invalid settings, [`Error::HttpClient`] if the
    /// HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let prober = Arc::new(HttpProber::new(&config.probe)?);
        Self::with_prober(config, prober)
    }

    /// Create a validator with a custom [`Prober`]
    pub fn with_prober(config: Config, prober: Arc<dyn Prober>) -> Result<Self> {
        config.validate()?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            config: Arc::new(config),
            prober,
            event_tx,
            cancel_token: CancellationToken::new(),
        })
    }

    /// Subscribe to progress events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Stop probing and skip the write; [`validate`](Self::validate) then
    /// returns [`Error::Cancelled`].
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    /// Run the validation
    ///
    /// Per-URL failures only show up in the summary. Input errors, output
    /// write errors and cancellation abort the run before the destination is
    /// touched.
    pub async fn validate(&self) -> Result<ValidationSummary> {
        let started_at = Utc::now();
        let input_path = self.config.input_path.clone();
        let output_path = self.config.resolved_output_path().to_path_buf();

        let parsed = read_playlist(&input_path, self.config.duplicate_match).await?;
        let document = parsed.document;

        tracing::info!(
            path = %input_path.display(),
            unique_links = document.records.len(),
            duplicates = parsed.duplicate_count,
            has_header = document.has_header(),
            "playlist parsed"
        );
        self.event_tx
            .send(Event::Parsed {
                unique_links: document.records.len(),
                duplicates: parsed.duplicate_count,
            })
            .ok();

        let results = if document.records.is_empty() {
            tracing::warn!(path = %input_path.display(), "nothing to check");
            self.event_tx.send(Event::EmptyPlaylist).ok();
            Vec::new()
        } else {
            let engine = ProbeEngine::new(
                Arc::clone(&self.prober),
                self.config.probe.concurrency_limit,
                self.config.probe.keep_server_errors,
            )
            .with_events(self.event_tx.clone());
            engine.probe_all(&document.records, &self.cancel_token).await?
        };

        let working = results.iter().filter(|r| r.is_working).count();
        let non_working = results.len() - working;
        let failed: Vec<FailedLink> = results
            .iter()
            .filter(|r| !r.is_working)
            .map(|r| FailedLink {
                url: r.record.url.clone(),
                status: r.status,
                error: r.error_detail(),
            })
            .collect();

        let output = assemble(&results, document.header.as_deref());

        let written = if self.config.dry_run {
            tracing::info!(path = %output_path.display(), "dry run, output not written");
            false
        } else {
            if self.cancel_token.is_cancelled() {
                return Err(Error::Cancelled);
            }
            write_atomic_async(output_path.clone(), output.into_bytes()).await?;
            tracing::info!(path = %output_path.display(), links = working, "cleaned playlist written");
            self.event_tx
                .send(Event::Written {
                    path: output_path.clone(),
                    links: working,
                })
                .ok();
            true
        };

        tracing::info!(
            unique_links = document.records.len(),
            duplicates = parsed.duplicate_count,
            working,
            non_working,
            "validation finished"
        );
        self.event_tx
            .send(Event::Finished {
                working,
                non_working,
            })
            .ok();

        Ok(ValidationSummary {
            input_path,
            output_path,
            has_header: document.has_header(),
            unique_links: document.records.len(),
            duplicates_skipped: parsed.duplicate_count,
            working,
            non_working,
            written,
            started_at,
            finished_at: Utc::now(),
            failed,
        })
    }
}
