//! Listener trait and registry
//!
//! Listeners are notified synchronously, on the scanning thread, in
//! registration order.

use crate::config::FaultPolicy;
use crate::error::{Result, WatchError};
use crate::event::{ChangeEvent, ChangeKind};
use crossbeam_channel::{Receiver, Sender};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Subscriber for change events
///
/// Returning an error reports a listener fault; what happens next depends
/// on the monitor's [`FaultPolicy`].
///
/// Implementations must not block for long: every other listener and the
/// next scan wait on them.
pub trait Listener: Send + Sync {
    fn notify(&self, kind: ChangeKind, path: &Path) -> anyhow::Result<()>;
}

impl<F> Listener for F
where
    F: Fn(ChangeKind, &Path) -> anyhow::Result<()> + Send + Sync,
{
    fn notify(&self, kind: ChangeKind, path: &Path) -> anyhow::Result<()> {
        self(kind, path)
    }
}

/// Listener forwarding events into a crossbeam channel
///
/// Fails once the receiving side has been dropped.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: Sender<ChangeEvent>,
}

impl ChannelListener {
    pub fn new(tx: Sender<ChangeEvent>) -> Self {
        Self { tx }
    }

    /// Listener plus the receiving end of a fresh unbounded channel
    pub fn unbounded() -> (Self, Receiver<ChangeEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }
}

impl Listener for ChannelListener {
    fn notify(&self, kind: ChangeKind, path: &Path) -> anyhow::Result<()> {
        self.tx
            .send(ChangeEvent::new(kind, path))
            .map_err(|_| anyhow::anyhow!("event receiver dropped"))
    }
}

/// Ordered list of attached listeners
///
/// Duplicates are allowed; the same handle attached twice is notified twice.
#[derive(Default, Clone)]
pub struct ListenerRegistry {
    listeners: Vec<Arc<dyn Listener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener (notified after all previously attached ones)
    pub fn attach(&mut self, listener: Arc<dyn Listener>) {
        self.listeners.push(listener);
    }

    /// Remove the first registration of `listener`
    ///
    /// Identity is the `Arc` allocation. Returns `false` if it was not attached.
    pub fn detach(&mut self, listener: &Arc<dyn Listener>) -> bool {
        match self.listeners.iter().position(|l| same_listener(l, listener)) {
            Some(index) => {
                self.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Copy of the current handles, in notification order
    pub fn handles(&self) -> Vec<Arc<dyn Listener>> {
        self.listeners.clone()
    }
}

fn same_listener(a: &Arc<dyn Listener>, b: &Arc<dyn Listener>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Deliver one event to every listener in order
pub(crate) fn dispatch(
    listeners: &[Arc<dyn Listener>],
    kind: ChangeKind,
    path: &Path,
    policy: FaultPolicy,
) -> Result<()> {
    for listener in listeners {
        if let Err(source) = listener.notify(kind, path) {
            match policy {
                FaultPolicy::Propagate => {
                    return Err(WatchError::ListenerFault {
                        kind,
                        path: path.to_path_buf(),
                        source,
                    });
                }
                FaultPolicy::Isolate => {
                    warn!("Listener failed handling {} for {}: {:#}", kind, path.display(), source);
                }
            }
        }
    }
    Ok(())
}
