//! Versioned config cell for long-running tasks.
//!
//! Request handlers read [`super::SharedConfig`] on every call. Background
//! loops instead hold a [`ConfigWatcher`] and rebuild their timers when the
//! store is replaced.

use std::sync::Arc;
use tokio::sync::{RwLock, watch};

pub struct ConfigStore<T> {
    data: Arc<RwLock<T>>,
    version: Arc<watch::Sender<u64>>,
}

/// Wakes up when the owning [`ConfigStore`] receives a new value.
pub struct ConfigWatcher {
    version_rx: watch::Receiver<u64>,
}

impl<T> ConfigStore<T> {
    pub fn new(initial: T) -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            data: Arc::new(RwLock::new(initial)),
            version: Arc::new(version),
        }
    }

    /// Replace the stored value and bump the version.
    pub async fn update(&self, value: T) {
        *self.data.write().await = value;
        // send_modify notifies even when nobody is subscribed yet.
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn subscribe(&self) -> ConfigWatcher {
        ConfigWatcher {
            version_rx: self.version.subscribe(),
        }
    }
}

impl<T: Clone> ConfigStore<T> {
    /// Clone out the current value so no lock is held across awaits.
    pub async fn snapshot(&self) -> T {
        self.data.read().await.clone()
    }
}

impl<T> Clone for ConfigStore<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            version: Arc::clone(&self.version),
        }
    }
}

impl ConfigWatcher {
    /// Resolves once a newer value is stored, or errors when every
    /// [`ConfigStore`] handle has been dropped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.version_rx.changed().await
    }
}
