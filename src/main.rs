//! CLI entry point for the attachments tool.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use attachments_core::{
    AttachmentChecker, AttachmentManager, CacheStore, HttpReachabilityProbe, HttpUrlResolver,
    ProgressRegistry, RemoteRef, StaticTokenProvider, TracingNotificationSink, TransferConfig,
    TransferExecutor, TransferRequest, bearer_headers,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};
use url::Url;

mod cli;

use cli::{Args, Command, parse_header};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &args.config {
        Some(path) => TransferConfig::load(path)?,
        None => TransferConfig::default(),
    };
    debug!(?config, "configuration loaded");

    match args.command {
        Command::Fetch {
            identifier,
            resolve_url,
            token,
            headers,
            cache_dir,
            no_progress,
        } => {
            let show_progress = !no_progress && !args.quiet;
            fetch(
                &config,
                identifier,
                resolve_url,
                token,
                headers,
                cache_dir,
                show_progress,
            )
            .await
        }
        Command::Check {
            identifier,
            token,
            api_host,
        } => check(&config, &identifier, token, api_host).await,
    }
}

async fn fetch(
    config: &TransferConfig,
    identifier: String,
    resolve_url: String,
    token: Option<String>,
    raw_headers: Vec<String>,
    cache_dir: Option<PathBuf>,
    show_progress: bool,
) -> Result<()> {
    Url::parse(&resolve_url).context("invalid resolve url")?;

    let mut headers = HashMap::new();
    if let Some(token) = token {
        headers.extend(bearer_headers(&token));
    }
    for raw in raw_headers {
        let (name, value) = parse_header(&raw).map_err(anyhow::Error::msg)?;
        headers.insert(name, value);
    }

    let cache_root = cache_dir.unwrap_or_else(|| config.cache_dir.clone());
    let registry = Arc::new(ProgressRegistry::new());
    let manager = AttachmentManager::new(
        Arc::new(HttpUrlResolver::new()),
        TransferExecutor::new_with_timeouts(config.connect_timeout_secs, config.read_timeout_secs),
        Arc::clone(&registry),
        Arc::new(CacheStore::new(&cache_root)),
        Arc::new(TracingNotificationSink::new()),
    );

    let (bar_handle, stop) =
        spawn_progress_bar(show_progress, Arc::clone(&registry), identifier.clone());

    let request = TransferRequest::download(
        identifier.clone(),
        Some(RemoteRef::with_headers(resolve_url, headers)),
    );
    let ok = manager.download(request).await;

    stop.store(true, Ordering::SeqCst);
    if let Some(handle) = bar_handle {
        let _ = handle.await;
    }

    if ok {
        let path = manager.cache().path_for(&identifier);
        info!(identifier, path = %path.display(), "attachment ready");
        Ok(())
    } else {
        bail!("download failed for {identifier}")
    }
}

async fn check(
    config: &TransferConfig,
    identifier: &str,
    token: String,
    api_host: Option<String>,
) -> Result<()> {
    let api_host = api_host.unwrap_or_else(|| config.api_host.clone());
    let checker = AttachmentChecker::new(
        api_host,
        Arc::new(StaticTokenProvider::new(token)),
        Arc::new(HttpReachabilityProbe::new(config.probe_url.clone())),
    );

    let result = checker.check(identifier).await;
    if result.ok {
        info!(identifier, "attachment ok");
        Ok(())
    } else {
        bail!(
            "attachment check failed for {identifier}: {}",
            result.reason.unwrap_or_default()
        )
    }
}

/// Spawns the progress bar task for one transfer when requested.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `enabled` is false, returns (None, stop) with stop already true.
fn spawn_progress_bar(
    enabled: bool,
    registry: Arc<ProgressRegistry>,
    identifier: String,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !enabled {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let stop_signal = Arc::clone(&stop);
    let handle = tokio::spawn(async move {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {bytes}/{total_bytes} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        while !stop_signal.load(Ordering::SeqCst) {
            if let Some(snapshot) = registry.get(&identifier) {
                if snapshot.total > 0 {
                    bar.set_length(snapshot.total);
                }
                bar.set_position(snapshot.received);
                bar.set_message(identifier.clone());
            }
            tokio::time::sleep(Duration::from_millis(120)).await;
        }

        bar.finish_and_clear();
    });
    (Some(handle), stop)
}
