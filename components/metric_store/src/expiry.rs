//! Background expiry sweeper

use crate::store::MetricStore;
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Periodically removes expired datums from a store
///
/// The thread stops when [`ExpiryWorker::stop`] is called or the worker is
/// dropped.
pub struct ExpiryWorker {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ExpiryWorker {
    /// Start sweeping `store` every `interval`
    pub fn start(store: Arc<MetricStore>, interval: Duration) -> io::Result<Self> {
        let (sender, receiver) = channel::bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("metric-expiry".into())
            .spawn(move || loop {
                match receiver.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        store.sweep_expired();
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        debug!(?interval, "started expiry worker");
        Ok(Self {
            stop: Some(sender),
            handle: Some(handle),
        })
    }

    /// Stop the sweeper and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(sender) = self.stop.take() {
            let _ = sender.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ExpiryWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
