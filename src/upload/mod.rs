//! Streaming upload engine: one file, one service, one cancellable
//! in-flight request with live progress.

pub mod progress;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use console::style;
use futures::{Stream, TryStreamExt};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clipboard;
use crate::common::config::ConfigStore;
use crate::common::errors::{Result, UpdropError};
use crate::history::{HistoryRecord, HistoryStore};
use crate::services::{self, Service, ServiceAdapter, UploadOutcome};

/// One file to push out, plus the byte counter the request body stream
/// bumps as the HTTP client pulls chunks through it.
pub struct UploadJob {
    pub path: PathBuf,
    pub file_name: String,
    pub file_size: u64,
    pub bytes_sent: Arc<AtomicU64>,
}

impl UploadJob {
    /// Rejects missing paths and directories up front, fail fast before
    /// any network traffic.
    pub async fn new(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(UpdropError::FileNotFound(path.to_path_buf()));
        }
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(UpdropError::NotAFile(path.to_path_buf()));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.bin".to_string());

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            file_size: metadata.len(),
            bytes_sent: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Open the file as a chunk stream that counts every byte the HTTP
    /// client pulls. Nothing is buffered beyond one chunk.
    pub async fn stream(
        &self,
    ) -> Result<impl Stream<Item = std::io::Result<Bytes>> + Send + 'static> {
        let file = tokio::fs::File::open(&self.path).await?;
        let counter = self.bytes_sent.clone();
        Ok(ReaderStream::new(file).inspect_ok(move |chunk| {
            counter.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        }))
    }

    pub async fn body(&self) -> Result<reqwest::Body> {
        Ok(reqwest::Body::wrap_stream(self.stream().await?))
    }
}

/// Returns a token tripped by Ctrl-C, plus the watcher handle so
/// callers can drop the signal listener once the upload is over.
pub fn cancel_on_ctrl_c() -> (CancellationToken, JoinHandle<()>) {
    let token = CancellationToken::new();
    let trip = token.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trip.cancel();
        }
    });
    (token, watcher)
}

/// Drive one upload through an adapter with a progress bar attached.
/// Cancellation drops the request future, which aborts the connection;
/// no server-side cleanup of the partial upload is attempted.
pub async fn run(
    adapter: &dyn ServiceAdapter,
    job: &UploadJob,
    cancel: &CancellationToken,
) -> Result<UploadOutcome> {
    let bar = progress::upload_bar(job.file_size, &job.file_name);
    let reporter = progress::spawn_reporter(bar.clone(), job.bytes_sent.clone(), job.file_size);

    let result = tokio::select! {
        res = adapter.upload(job) => res,
        _ = cancel.cancelled() => Err(UpdropError::Cancelled),
    };

    reporter.abort();
    match &result {
        Ok(_) => {
            bar.set_position(job.file_size);
            bar.finish_with_message("done");
        }
        Err(UpdropError::Cancelled) => bar.abandon_with_message("cancelled"),
        Err(_) => bar.abandon_with_message("failed"),
    }

    result
}

/// Full pipeline for one invocation: build the job, connect the
/// adapter, upload, then print/copy/record the link.
pub async fn run_upload(
    path: &Path,
    service: Service,
    store: &ConfigStore,
    history: &HistoryStore,
    cancel: &CancellationToken,
) -> Result<UploadOutcome> {
    let job = UploadJob::new(path).await?;
    let adapter = services::connect(service, store).await?;

    info!(
        file = %job.file_name,
        size = job.file_size,
        service = %service,
        "starting upload"
    );

    let outcome = run(adapter.as_ref(), &job, cancel).await?;

    println!(
        "{} {}",
        style("Link:").green().bold(),
        style(&outcome.link).cyan()
    );
    clipboard::copy(&outcome.link);

    // a failed history write should never undo a finished upload
    if let Err(e) = history.push(HistoryRecord::new(&job, service, &outcome)) {
        warn!("could not record upload in history: {e}");
    }

    Ok(outcome)
}
