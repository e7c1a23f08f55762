//! Abandoning an orchestration from the outside
//!
//! The handle is kept by whoever owns the session; tokens go to the
//! orchestrator. Dropping the handle without cancelling never cancels.

use std::sync::Arc;

use tokio::sync::watch;

/// Create a linked handle and token
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(None);
    (
        CancelHandle { tx },
        CancelToken {
            rx,
            _keep_alive: None,
        },
    )
}

#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<Option<String>>,
}

impl CancelHandle {
    /// Cancel every run holding a linked token. Only the first reason sticks.
    pub fn cancel(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.borrow().is_some()
    }
}

#[derive(Clone, Debug)]
pub struct CancelToken {
    rx: watch::Receiver<Option<String>>,
    // holds the sender of a token that can never be cancelled
    _keep_alive: Option<Arc<watch::Sender<Option<String>>>>,
}

impl CancelToken {
    /// A token nobody can cancel
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(None);
        Self {
            rx,
            _keep_alive: Some(Arc::new(tx)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Resolves with the reason once cancelled; pending forever otherwise
    pub async fn cancelled(&self) -> String {
        let mut rx = self.rx.clone();
        if rx.wait_for(Option::is_some).await.is_ok() {
            if let Some(reason) = rx.borrow().clone() {
                return reason;
            }
        }
        std::future::pending().await
    }
}
