use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;
use tracing::{Level, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use m3u_sweep::{
    Config, DuplicateMatch, Event, PlaylistValidator, Result, ToExitCode, ValidationSummary,
    validate_with_shutdown,
};

/// Check every link of an M3U playlist and drop the dead ones.
#[derive(Debug, Parser)]
#[command(name = "m3u-sweep", version, about)]
struct Args {
    /// Playlist to check
    input: PathBuf,

    /// Write the cleaned playlist here instead of overwriting the input
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Maximum simultaneous probes [default: 50]
    #[arg(short, long, value_name = "N")]
    concurrency: Option<usize>,

    /// Per-request timeout in seconds [default: 5]
    #[arg(short, long, value_name = "SECS")]
    timeout: Option<f64>,

    /// User-Agent header sent with each probe
    #[arg(short, long, value_name = "UA")]
    user_agent: Option<String>,

    /// Keep links answering with a 5xx status
    #[arg(long)]
    keep_server_errors: bool,

    /// Compare URLs case-insensitively when removing duplicates
    #[arg(long)]
    ignore_case: bool,

    /// Maximum redirects to follow per probe [default: 10]
    #[arg(long, value_name = "N")]
    max_redirects: Option<usize>,

    /// Probe and report without writing anything
    #[arg(long)]
    dry_run: bool,

    /// JSON file with default settings; flags override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let json = args.json;
    match run(args).await {
        Ok(summary) => print_summary(&summary, json),
        Err(e) => {
            if json {
                let error_json = serde_json::json!({
                    "status": "error",
                    "code": e.error_code(),
                    "message": e.to_string(),
                });
                println!("{error_json}");
            } else {
                error!("{}", e);
            }
            process::exit(e.exit_code());
        }
    }
}

async fn run(args: Args) -> Result<ValidationSummary> {
    let config = build_config(&args)?;
    let validator = PlaylistValidator::new(config)?;

    let progress = if args.json || args.quiet {
        None
    } else {
        Some(spawn_progress(&validator))
    };

    let result = validate_with_shutdown(&validator).await;

    if let Some(handle) = progress {
        handle.abort();
    }
    result
}

fn build_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };

    config.input_path = args.input.clone();
    if let Some(output) = &args.output {
        config.output_path = Some(output.clone());
    }
    if let Some(n) = args.concurrency {
        config.probe.concurrency_limit = n;
    }
    if let Some(secs) = args.timeout {
        config.probe.timeout = Duration::try_from_secs_f64(secs)
            .map_err(|e| m3u_sweep::Error::config("timeout", e.to_string()))?;
    }
    if let Some(ua) = &args.user_agent {
        config.probe.user_agent = ua.clone();
    }
    if let Some(n) = args.max_redirects {
        config.probe.max_redirects = n;
    }
    if args.keep_server_errors {
        config.probe.keep_server_errors = true;
    }
    if args.ignore_case {
        config.duplicate_match = DuplicateMatch::CaseInsensitive;
    }
    if args.dry_run {
        config.dry_run = true;
    }

    Ok(config)
}

fn spawn_progress(validator: &PlaylistValidator) -> tokio::task::JoinHandle<()> {
    let mut events = validator.subscribe();
    tokio::spawn(async move {
        let mut bar: Option<ProgressBar> = None;
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };
            match event {
                Event::Parsed { unique_links, .. } if unique_links > 0 => {
                    let pb = ProgressBar::new(unique_links as u64);
                    if let Ok(style) =
                        ProgressStyle::with_template("{bar:30.green} {pos}/{len} {msg}")
                    {
                        pb.set_style(style);
                    }
                    bar = Some(pb);
                }
                Event::ProbeCompleted { completed, .. } => {
                    if let Some(pb) = &bar {
                        pb.set_position(completed as u64);
                    }
                }
                Event::Finished { .. } => break,
                _ => {}
            }
        }
        if let Some(pb) = bar {
            pb.finish_and_clear();
        }
    })
}

fn print_summary(summary: &ValidationSummary, json: bool) {
    if json {
        match serde_json::to_string_pretty(summary) {
            Ok(out) => println!("{out}"),
            Err(e) => error!("failed to serialize summary: {}", e),
        }
        return;
    }

    if summary.is_empty() {
        println!("No links found in {}; nothing to check.", summary.input_path.display());
        return;
    }

    println!("Unique links:       {}", summary.unique_links);
    println!("Duplicates skipped: {}", summary.duplicates_skipped);
    println!("Working:            {}", summary.working);
    println!("Non-working:        {}", summary.non_working);
    for link in &summary.failed {
        match &link.error {
            Some(err) => println!("  x {} ({})", link.url, err),
            None => println!("  x {} ({})", link.url, link.status),
        }
    }
    if summary.written {
        println!("Saved to {}", summary.output_path.display());
    } else {
        println!("Dry run: {} left unchanged", summary.output_path.display());
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
