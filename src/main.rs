use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use icmptrace::cli::Args;
use icmptrace::config::Config;
use icmptrace::export::{OutputFormat, run_reporter, write_banner};
use icmptrace::lookup::{DnsLookup, resolve_target};
use icmptrace::probe::check_permissions;
use icmptrace::state::TraceOutcome;
use icmptrace::trace::{ProbeEngine, TraceController};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logs go to stderr so they never interleave with hop lines
    let default_level = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(outcome) => {
            debug!(?outcome, "trace finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("icmptrace: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<TraceOutcome> {
    let config = Config::from(&args);
    config.validate()?;

    let target = resolve_target(&args.host)?;

    // Check permissions early, before any output
    check_permissions()?;

    if !config.json {
        write_banner(&args.host, target, &config, std::io::stdout().lock())?;
    }

    // Cancellation token for graceful shutdown
    let cancel = CancellationToken::new();

    // Setup Ctrl+C handler
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        cancel_clone.cancel();
    });

    // Probing blocks on the socket, so it gets its own thread; hops flow to
    // the reporter in TTL order
    let (mut reports, receiver) = mpsc::unbounded_channel();
    let engine = ProbeEngine::new(target, &config);
    debug!(identifier = engine.identifier(), %target, "starting trace");
    let mut controller = TraceController::new(engine, &config, cancel.clone());
    let trace = tokio::task::spawn_blocking(move || controller.run(&mut reports));

    let dns = config.dns_enabled.then(DnsLookup::new);
    let format = if config.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    if let Err(e) = run_reporter(receiver, dns, format, std::io::stdout()).await {
        cancel.cancel();
        return Err(e.context("failed to write hop report"));
    }

    let outcome = trace.await.context("trace thread panicked")??;
    Ok(outcome)
}
