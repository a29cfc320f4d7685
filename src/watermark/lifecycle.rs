//! Liveness token tied to a view's lifetime.
//!
//! Every asynchronous resumption in the render pipeline checks the token and
//! turns into a no-op once the owning view has been destroyed.

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable handle reporting whether the owning view is still alive.
#[derive(Debug, Clone)]
pub struct Liveness {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Liveness {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(true);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn is_alive(&self) -> bool {
        *self.rx.borrow()
    }

    /// Mark the view destroyed. Idempotent.
    pub fn destroy(&self) {
        self.tx.send_replace(false);
    }

    /// Resolve once the view is destroyed.
    pub async fn destroyed(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any clone of this token
        let _ = rx.wait_for(|alive| !*alive).await;
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}
