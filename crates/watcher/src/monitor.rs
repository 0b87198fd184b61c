//! Poll-diff engine
//!
//! On every tick the monitor lists the watched directory, compares it
//! against the [`Snapshot`], updates the snapshot and notifies listeners:
//!
//! 1. Created / Changed, in listing order: snapshot updated, then notify
//! 2. Deleted, in snapshot order: notify, then snapshot entry removed
//!
//! Scans never overlap. The ticker awaits each scan before taking the next
//! tick, and a scan lock serializes ticker scans with [`DirectoryMonitor::scan`].

use crate::config::{FaultPolicy, MonitorConfig};
use crate::error::{Result, WatchError};
use crate::event::ChangeKind;
use crate::listener::{dispatch, Listener, ListenerRegistry};
use crate::scan::list_directory;
use crate::store::{Snapshot, SnapshotHandle};
use ahash::AHashSet;
use crossbeam_channel::Sender;
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

/// Counts of events delivered by one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub created: usize,
    pub changed: usize,
    pub deleted: usize,
}

impl ScanSummary {
    pub fn total(&self) -> usize {
        self.created + self.changed + self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    fn record(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::Created => self.created += 1,
            ChangeKind::Changed => self.changed += 1,
            ChangeKind::Deleted => self.deleted += 1,
        }
    }
}

/// State shared between the monitor handle and its ticker task
struct Shared {
    /// Canonical path of the watched directory
    directory: PathBuf,
    snapshot: Arc<RwLock<Snapshot>>,
    listeners: RwLock<ListenerRegistry>,
    /// Held for the whole duration of a scan
    scan_lock: Mutex<()>,
    fault_policy: FaultPolicy,
}

impl Shared {
    /// Run one scan, waiting for any scan already in progress
    fn scan(&self) -> Result<ScanSummary> {
        let _guard = self.scan_lock.lock();
        self.scan_locked()
    }

    /// Run one scan unless another one is in progress
    fn try_scan(&self) -> Option<Result<ScanSummary>> {
        let _guard = self.scan_lock.try_lock()?;
        Some(self.scan_locked())
    }

    fn scan_locked(&self) -> Result<ScanSummary> {
        // A failed listing leaves the snapshot untouched
        let listing = list_directory(&self.directory)?;

        // Registry changes made during this scan apply from the next one
        let listeners = self.listeners.read().handles();
        let mut summary = ScanSummary::default();
        let mut seen = AHashSet::with_capacity(listing.len());

        for (path, mtime) in listing {
            let kind = match self.snapshot.read().get(&path) {
                None => ChangeKind::Created,
                // Any difference counts, including a clock moving backwards
                Some(previous) if previous != mtime => ChangeKind::Changed,
                Some(_) => {
                    seen.insert(path);
                    continue;
                }
            };

            self.snapshot.write().set(path.clone(), mtime);
            summary.record(kind);
            debug!("{} {}", kind, path.display());
            dispatch(&listeners, kind, &path, self.fault_policy)?;
            seen.insert(path);
        }

        let deleted: Vec<PathBuf> = self
            .snapshot
            .read()
            .iter()
            .filter(|(path, _)| !seen.contains(*path))
            .map(|(path, _)| path.to_path_buf())
            .collect();

        for path in deleted {
            summary.record(ChangeKind::Deleted);
            debug!("{} {}", ChangeKind::Deleted, path.display());
            // Listeners still see the entry while being told it is gone
            dispatch(&listeners, ChangeKind::Deleted, &path, self.fault_policy)?;
            self.snapshot.write().remove(&path);
        }

        Ok(summary)
    }
}

/// Handle to the background ticker task
struct Ticker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Polling watcher for a single directory
///
/// ```no_run
/// # async fn demo() -> watcher::Result<()> {
/// use std::sync::Arc;
/// use std::time::Duration;
/// use watcher::{ChangeKind, DirectoryMonitor, Listener};
///
/// let monitor = DirectoryMonitor::start("/tmp/inbox", Duration::from_millis(500))?;
/// let printer: Arc<dyn Listener> =
///     Arc::new(|kind: ChangeKind, path: &std::path::Path| -> anyhow::Result<()> {
///         println!("File {} was {}", path.display(), kind);
///         Ok(())
///     });
/// monitor.attach(printer);
/// // ...
/// monitor.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct DirectoryMonitor {
    shared: Arc<Shared>,
    interval: Duration,
    scan_timeout: Option<Duration>,
    error_sink: Option<Sender<WatchError>>,
    ticker: Option<Ticker>,
}

impl DirectoryMonitor {
    /// Validate `directory`, load its initial state and start polling it
    ///
    /// No events are emitted for entries present at start. The first scan
    /// happens one `interval` after this call. Must be called from within a
    /// Tokio runtime.
    pub fn start(directory: impl AsRef<Path>, interval: Duration) -> Result<Self> {
        Self::builder(directory).interval(interval).start()
    }

    pub fn builder(directory: impl AsRef<Path>) -> MonitorBuilder {
        MonitorBuilder::new(directory.as_ref())
    }

    /// Arm the ticker if it is not already running
    ///
    /// Used by [`MonitorBuilder::start`]; can also re-arm a stopped monitor.
    pub fn arm(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(run_ticker(
            self.shared.clone(),
            self.interval,
            self.scan_timeout,
            self.error_sink.clone(),
            shutdown_rx,
        ));

        info!(
            "Monitoring {} (interval: {:?})",
            self.shared.directory.display(),
            self.interval
        );
        self.ticker = Some(Ticker { shutdown, handle });
        Ok(())
    }

    /// Disarm the ticker
    ///
    /// A scan already in progress runs to completion; no new scan starts.
    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.shutdown.send(true);
            info!("Stopped monitoring {}", self.shared.directory.display());
        }
    }

    /// Stop and wait for the ticker task (and any in-flight scan) to finish
    pub async fn shutdown(mut self) {
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.shutdown.send(true);
            if let Err(e) = ticker.handle.await {
                warn!("Ticker task ended abnormally: {}", e);
            }
            info!("Stopped monitoring {}", self.shared.directory.display());
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker
            .as_ref()
            .is_some_and(|ticker| !ticker.handle.is_finished())
    }

    /// Run one scan now, on the calling thread
    ///
    /// Blocks while a ticker scan is in progress. Blocking I/O: call it via
    /// `spawn_blocking` from async code.
    pub fn scan(&self) -> Result<ScanSummary> {
        self.shared.scan()
    }

    /// Append a listener; it receives events from the next scan on
    pub fn attach(&self, listener: Arc<dyn Listener>) {
        self.shared.listeners.write().attach(listener);
    }

    /// Remove the first registration of `listener`
    ///
    /// Returns `false` (and does nothing) if it was not attached. A scan
    /// already running still notifies it.
    pub fn detach(&self, listener: &Arc<dyn Listener>) -> bool {
        self.shared.listeners.write().detach(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.read().len()
    }

    /// Read-only view of the snapshot, usable from inside listeners
    pub fn snapshot(&self) -> SnapshotHandle {
        SnapshotHandle::new(self.shared.snapshot.clone())
    }

    /// Canonical path of the watched directory
    pub fn directory(&self) -> &Path {
        &self.shared.directory
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn fault_policy(&self) -> FaultPolicy {
        self.shared.fault_policy
    }
}

impl Drop for DirectoryMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builder for [`DirectoryMonitor`]
pub struct MonitorBuilder {
    directory: PathBuf,
    interval: Duration,
    fault_policy: FaultPolicy,
    scan_timeout: Option<Duration>,
    error_sink: Option<Sender<WatchError>>,
}

impl MonitorBuilder {
    fn new(directory: &Path) -> Self {
        let defaults = MonitorConfig::default();
        Self {
            directory: directory.to_path_buf(),
            interval: Duration::from_millis(defaults.interval_ms as u64),
            fault_policy: defaults.fault_policy,
            scan_timeout: None,
            error_sink: None,
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    /// Stop waiting on a scan after `timeout`; the tick is reported as `ScanTimeout`
    pub fn scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = Some(timeout);
        self
    }

    /// Also deliver per-scan errors from the ticker to `sink`
    pub fn error_sink(mut self, sink: Sender<WatchError>) -> Self {
        self.error_sink = Some(sink);
        self
    }

    /// Apply interval, fault policy and scan timeout from a config
    pub fn config(mut self, config: &MonitorConfig) -> Result<Self> {
        self.interval = config.interval()?;
        self.fault_policy = config.fault_policy;
        self.scan_timeout = config.scan_timeout();
        Ok(self)
    }

    /// Validate and load the initial snapshot without arming the ticker
    pub fn build(self) -> Result<DirectoryMonitor> {
        if self.interval.is_zero() {
            return Err(WatchError::InvalidInterval { millis: 0 });
        }

        let directory = open_directory(&self.directory)?;

        let mut snapshot = Snapshot::new();
        snapshot.initialize(list_directory(&directory)?);
        debug!(
            "Initial snapshot of {}: {} entries",
            directory.display(),
            snapshot.len()
        );

        Ok(DirectoryMonitor {
            shared: Arc::new(Shared {
                directory,
                snapshot: Arc::new(RwLock::new(snapshot)),
                listeners: RwLock::new(ListenerRegistry::new()),
                scan_lock: Mutex::new(()),
                fault_policy: self.fault_policy,
            }),
            interval: self.interval,
            scan_timeout: self.scan_timeout,
            error_sink: self.error_sink,
            ticker: None,
        })
    }

    /// Build and arm the ticker
    pub fn start(self) -> Result<DirectoryMonitor> {
        // Fail before touching the filesystem
        tokio::runtime::Handle::try_current().map_err(|_| WatchError::NoRuntime)?;

        let mut monitor = self.build()?;
        monitor.arm()?;
        Ok(monitor)
    }
}

/// Canonicalize `path` and check it is a readable directory
fn open_directory(path: &Path) -> Result<PathBuf> {
    let not_found = || WatchError::DirectoryNotFound {
        path: path.to_path_buf(),
    };

    let canonical = std::fs::canonicalize(path).map_err(|_| not_found())?;
    if !canonical.is_dir() {
        return Err(not_found());
    }
    std::fs::read_dir(&canonical).map_err(|_| not_found())?;

    Ok(canonical)
}

/// Ticker loop: one scan per tick, never two at once
async fn run_ticker(
    shared: Arc<Shared>,
    period: Duration,
    scan_timeout: Option<Duration>,
    error_sink: Option<Sender<WatchError>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            // Stop requested or monitor dropped
            _ = shutdown.changed() => break,
            _ = timer.tick() => {}
        }

        match run_tick(&shared, scan_timeout).await {
            None => {
                warn!(
                    "Previous scan of {} still running, skipping tick",
                    shared.directory.display()
                );
            }
            Some(Ok(summary)) if summary.is_empty() => {
                trace!("Scan of {}: no changes", shared.directory.display());
            }
            Some(Ok(summary)) => {
                debug!(
                    "Scan of {}: {} created, {} changed, {} deleted",
                    shared.directory.display(),
                    summary.created,
                    summary.changed,
                    summary.deleted
                );
            }
            Some(Err(e)) => {
                warn!("Scan of {} failed: {}", shared.directory.display(), e);
                if let Some(sink) = &error_sink {
                    if sink.send(e).is_err() {
                        debug!("Scan error sink disconnected");
                    }
                }
            }
        }
    }

    trace!("Ticker for {} exited", shared.directory.display());
}

/// Run one scan on the blocking pool
///
/// `None` means the tick was skipped because a scan was still in progress.
async fn run_tick(
    shared: &Arc<Shared>,
    scan_timeout: Option<Duration>,
) -> Option<Result<ScanSummary>> {
    let worker = shared.clone();
    let task = tokio::task::spawn_blocking(move || worker.try_scan());

    let joined = match scan_timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            // The scan keeps the scan lock until it returns
            Err(_) => return Some(Err(WatchError::ScanTimeout(limit))),
        },
        None => task.await,
    };

    match joined {
        Ok(outcome) => outcome,
        Err(_) => Some(Err(WatchError::ScanPanicked)),
    }
}
