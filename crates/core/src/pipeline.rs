//! Watch-and-upload pipeline.
//!
//! Subscribes to filesystem events on the watch folder, uploads files that were
//! already present through a startup sweep, then uploads every newly created
//! file after it settles. Each successful upload is followed by the configured
//! disposition. Uploads are at-least-once: a file seen by both the sweep and a
//! live event is uploaded twice.

use crate::config::AppConfig;
use crate::disposition::{Disposition, DispositionOutcome};
use crate::settle::Settle;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use providers::{DocumentService, ProviderError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

const EVENT_BUFFER: usize = 100;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to create watch folder {}: {source}", path.display())]
    CreateFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to watch {}: {source}", path.display())]
    WatchSetup {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("watch event channel closed")]
    WatchClosed,
    #[error("pipeline task failed: {0}")]
    Task(#[from] task::JoinError),
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub watch_folder: PathBuf,
    pub tag_ids: Vec<i64>,
    pub disposition: Disposition,
    pub settle: Settle,
}

impl PipelineConfig {
    pub fn from_app(cfg: &AppConfig, tag_ids: Vec<i64>) -> Self {
        Self {
            watch_folder: cfg.watch_folder.clone(),
            tag_ids,
            disposition: cfg.disposition(),
            settle: cfg.settle(),
        }
    }
}

/// Result of pushing one file through upload and disposition.
#[derive(Debug)]
pub enum FileOutcome {
    Uploaded(DispositionOutcome),
    Failed(ProviderError),
}

impl FileOutcome {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, FileOutcome::Uploaded(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub uploaded: usize,
    pub failed: usize,
}

/// Live filesystem subscription. Events stop when this is dropped.
pub struct Subscription {
    _watcher: RecommendedWatcher,
    events: mpsc::Receiver<notify::Result<Event>>,
}

#[derive(Clone)]
pub struct Pipeline {
    service: Arc<dyn DocumentService>,
    cfg: Arc<PipelineConfig>,
}

impl Pipeline {
    pub fn new(service: Arc<dyn DocumentService>, cfg: PipelineConfig) -> Self {
        Self {
            service,
            cfg: Arc::new(cfg),
        }
    }

    /// Uploads one file and, on success, applies the disposition.
    pub async fn process_file(&self, path: &Path) -> FileOutcome {
        debug!(path = %path.display(), "uploading");
        match self.service.upload(path, &self.cfg.tag_ids).await {
            Ok(()) => {
                info!(path = %path.display(), "uploaded document");
                FileOutcome::Uploaded(self.cfg.disposition.apply(path))
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to upload document");
                FileOutcome::Failed(e)
            }
        }
    }

    pub fn ensure_watch_folder(&self) -> Result<(), PipelineError> {
        let folder = &self.cfg.watch_folder;
        if !folder.exists() {
            info!(folder = %folder.display(), "watch folder not found, creating it");
            fs::create_dir_all(folder).map_err(|source| PipelineError::CreateFolder {
                path: folder.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Starts watching the folder root. Must happen before the sweep so files
    /// created during the sweep are not missed.
    pub fn subscribe(&self) -> Result<Subscription, PipelineError> {
        let folder = self.cfg.watch_folder.clone();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let setup_err = |source| PipelineError::WatchSetup {
            path: folder.clone(),
            source,
        };
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // notify calls back on its own thread
            let _ = tx.blocking_send(res);
        })
        .map_err(setup_err)?;
        watcher
            .watch(&folder, RecursiveMode::NonRecursive)
            .map_err(setup_err)?;
        Ok(Subscription {
            _watcher: watcher,
            events: rx,
        })
    }

    /// Uploads every regular file currently under the watch folder.
    pub async fn sweep(&self) -> Result<SweepSummary, PipelineError> {
        let (_tx, rx) = watch::channel(false);
        self.sweep_until(&rx).await
    }

    async fn sweep_until(
        &self,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<SweepSummary, PipelineError> {
        let root = self.cfg.watch_folder.clone();
        let skip = match &self.cfg.disposition {
            Disposition::MoveTo(folder) => fs::canonicalize(folder).ok(),
            _ => None,
        };
        let files = task::spawn_blocking(move || existing_files(&root, skip.as_deref())).await?;

        let mut summary = SweepSummary::default();
        for path in files {
            if *shutdown.borrow() {
                info!("shutdown requested, stopping sweep");
                break;
            }
            if self.process_file(&path).await.is_uploaded() {
                summary.uploaded += 1;
            } else {
                summary.failed += 1;
            }
        }
        Ok(summary)
    }

    /// Paths an event brings into the watch folder: creations and rename targets.
    fn arrivals(&self, event: Event) -> Vec<PathBuf> {
        match event.kind {
            EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Any)) => event.paths,
            // [from, to]; a rename inside the folder already arrives as its own `To`
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
                [from, to]
                    if to.starts_with(&self.cfg.watch_folder)
                        && !from.starts_with(&self.cfg.watch_folder) =>
                {
                    vec![to.clone()]
                }
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    /// Handles one raw watch event: new and moved-in files are settled and
    /// uploaded, errors logged.
    pub async fn handle_event(&self, event: notify::Result<Event>) {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, "watch error");
                return;
            }
        };
        for path in self.arrivals(event) {
            info!(path = %path.display(), "new file detected");
            self.cfg.settle.wait(&path).await;
            if !path.is_file() {
                debug!(path = %path.display(), "not a regular file after settling, skipping");
                continue;
            }
            self.process_file(&path).await;
        }
    }

    async fn event_loop(
        self,
        mut events: mpsc::Receiver<notify::Result<Event>>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), PipelineError> {
        loop {
            tokio::select! {
                _ = stop_requested(&mut shutdown) => {
                    info!("stopping watch loop");
                    return Ok(());
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        return Err(PipelineError::WatchClosed);
                    };
                    tokio::select! {
                        _ = self.handle_event(event) => {}
                        _ = stop_requested(&mut shutdown) => {
                            warn!("stopping watch loop with an upload in flight");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Runs until `shutdown` flips to true (or its sender is dropped) or the watch
    /// subsystem closes its event channel.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), PipelineError> {
        self.ensure_watch_folder()?;
        let Subscription {
            _watcher: watcher,
            events,
        } = self.subscribe()?;
        info!(folder = %self.cfg.watch_folder.display(), "watching directory");

        let live = tokio::spawn(self.clone().event_loop(events, shutdown.clone()));

        match self.sweep_until(&shutdown).await {
            Ok(summary) => info!(
                uploaded = summary.uploaded,
                failed = summary.failed,
                "processed existing files"
            ),
            Err(e) => error!(error = %e, "error processing existing files"),
        }

        let result = live.await?;
        drop(watcher);
        result
    }
}

async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Regular files below `root`, skipping the `skip` directory when it is nested inside.
fn existing_files(root: &Path, skip: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        if !e.file_type().is_dir() {
            return true;
        }
        match (skip, fs::canonicalize(e.path())) {
            (Some(skip), Ok(dir)) => dir != skip,
            _ => true,
        }
    });
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "failed to read watch folder entry"),
        }
    }
    files
}
