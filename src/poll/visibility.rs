//! Host visibility signal

use std::sync::Arc;
use tokio::sync::watch;

/// Whether the dashboard is on screen; shared by every subscription
#[derive(Clone)]
pub struct Visibility {
    tx: Arc<watch::Sender<bool>>,
}

impl Visibility {
    pub fn new(visible: bool) -> Self {
        let (tx, _) = watch::channel(visible);
        Self { tx: Arc::new(tx) }
    }

    pub fn set(&self, visible: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != visible;
            *current = visible;
            changed
        });
    }

    pub fn is_visible(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::new(true)
    }
}

/// A subscription polls only while it is enabled and the host is visible
pub fn should_run(enabled: bool, visible: bool) -> bool {
    enabled && visible
}
