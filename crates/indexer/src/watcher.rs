use crate::error::Result;
use crate::indexer::{IndexUpdate, Indexer};
use log::{debug, info, warn};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Quiet period a path must see before it is reindexed
    pub debounce_ms: u64,
    /// Capacity of the update channel handed to the consumer
    pub channel_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 2_000,
            channel_capacity: 64,
        }
    }
}

impl WatcherConfig {
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

enum WatcherCommand {
    Shutdown,
}

/// Watches one directory (non-recursively) and reindexes files after they go quiet.
///
/// Results arrive on the receiver returned by [`FileWatcher::start`]. Dropping the
/// watcher stops it.
pub struct FileWatcher {
    command_tx: mpsc::Sender<WatcherCommand>,
    root: PathBuf,
    _watcher: Option<RecommendedWatcher>,
}

impl FileWatcher {
    pub fn start(
        indexer: Arc<Indexer>,
        root: impl AsRef<Path>,
        config: WatcherConfig,
    ) -> Result<(Self, mpsc::Receiver<IndexUpdate>)> {
        // notify reports canonical paths
        let root = std::fs::canonicalize(root.as_ref())?;
        let (event_tx, event_rx) = mpsc::channel(1024);
        let watcher = create_fs_watcher(&root, event_tx)?;

        let (mut this, updates) = Self::start_with_events(indexer, root, config, event_rx);
        this._watcher = Some(watcher);
        info!("Watching {}", this.root.display());
        Ok((this, updates))
    }

    /// Run the debounce loop over an arbitrary event source.
    pub(crate) fn start_with_events(
        indexer: Arc<Indexer>,
        root: PathBuf,
        config: WatcherConfig,
        event_rx: mpsc::Receiver<notify::Result<Event>>,
    ) -> (Self, mpsc::Receiver<IndexUpdate>) {
        let (command_tx, command_rx) = mpsc::channel(4);
        let (update_tx, update_rx) = mpsc::channel(config.channel_capacity.max(1));

        spawn_event_loop(
            indexer,
            root.clone(),
            config.debounce(),
            event_rx,
            command_rx,
            update_tx,
        );

        (
            Self {
                command_tx,
                root,
                _watcher: None,
            },
            update_rx,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop consuming events and cancel every pending timer. Reindexing that has
    /// already started still runs to completion.
    pub async fn stop(&self) {
        let _ = self.command_tx.send(WatcherCommand::Shutdown).await;
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        let _ = self.command_tx.try_send(WatcherCommand::Shutdown);
    }
}

fn create_fs_watcher(
    root: &Path,
    sender: mpsc::Sender<notify::Result<Event>>,
) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = sender.blocking_send(res);
        },
        NotifyConfig::default(),
    )?;
    watcher.watch(root, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn spawn_event_loop(
    indexer: Arc<Indexer>,
    root: PathBuf,
    debounce: Duration,
    mut event_rx: mpsc::Receiver<notify::Result<Event>>,
    mut command_rx: mpsc::Receiver<WatcherCommand>,
    update_tx: mpsc::Sender<IndexUpdate>,
) {
    tokio::spawn(async move {
        let mut debouncer = PathDebouncer::new(debounce);

        loop {
            tokio::select! {
                Some(command) = command_rx.recv() => match command {
                    WatcherCommand::Shutdown => break,
                },
                event = event_rx.recv() => {
                    let Some(event) = event else { break };
                    for path in relevant_paths(&indexer, &root, event) {
                        let indexer = Arc::clone(&indexer);
                        let updates = update_tx.clone();
                        debouncer.schedule(path, move |path| reindex(indexer, path, updates));
                    }
                }
            }
        }

        let cancelled = debouncer.cancel_all();
        info!(
            "Stopped watching {} ({cancelled} pending reindexes cancelled)",
            root.display()
        );
    });
}

/// Paths of a create/modify/remove event worth reindexing
fn relevant_paths(indexer: &Indexer, root: &Path, event: notify::Result<Event>) -> Vec<PathBuf> {
    let event = match event {
        Ok(event) => event,
        Err(err) => {
            warn!("Watcher error: {err}");
            return Vec::new();
        }
    };
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return Vec::new();
    }

    event
        .paths
        .into_iter()
        .filter(|path| path.parent() == Some(root) && indexer.is_supported(path))
        .collect()
}

async fn reindex(indexer: Arc<Indexer>, path: PathBuf, updates: mpsc::Sender<IndexUpdate>) {
    match indexer.refresh_file(&path).await {
        Ok(update) => {
            debug!("Refreshed {}", path.display());
            if updates.send(update).await.is_err() {
                debug!("Update receiver dropped; discarding update for {}", path.display());
            }
        }
        Err(e) => warn!("Reindex of {} failed: {e}", path.display()),
    }
}

/// One pending timer per path; a new event for the path restarts its timer.
struct PathDebouncer {
    quiet: Duration,
    pending: HashMap<PathBuf, JoinHandle<()>>,
}

impl PathDebouncer {
    fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: HashMap::new(),
        }
    }

    /// Arm (or re-arm) the timer for `path`. When it fires, `fire` is spawned as its
    /// own task, so cancelling the timer afterwards cannot interrupt it.
    fn schedule<F, Fut>(&mut self, path: PathBuf, fire: F)
    where
        F: FnOnce(PathBuf) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.pending.retain(|_, timer| !timer.is_finished());
        if let Some(previous) = self.pending.remove(&path) {
            previous.abort();
        }

        let quiet = self.quiet;
        let target = path.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            tokio::spawn(fire(target));
        });
        self.pending.insert(path, timer);
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.pending.values().filter(|t| !t.is_finished()).count()
    }

    fn cancel_all(&mut self) -> usize {
        let mut cancelled = 0;
        for (_, timer) in self.pending.drain() {
            if !timer.is_finished() {
                cancelled += 1;
            }
            timer.abort();
        }
        cancelled
    }
}
