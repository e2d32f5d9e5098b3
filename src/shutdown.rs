//! # Shutdown Signal Module
//!
//! Segnale di stop condiviso tra coordinatore, dispatcher e worker.
//! Usa un canale `watch` così anche i worker che si iscrivono dopo l'invio
//! del segnale lo vedono.
//!
//! ## Esempio:
//! ```rust,ignore
//! let (handle, signal) = stop_channel();
//! tokio::spawn(async move {
//!     tokio::signal::ctrl_c().await.ok();
//!     handle.stop();
//! });
//! ```

use std::sync::Arc;
use tokio::sync::watch;

/// Creates a connected stop handle / signal pair
pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (sender, receiver) = watch::channel(false);
    (
        StopHandle {
            sender: Arc::new(sender),
        },
        StopSignal { receiver },
    )
}

/// Sending side: requests a batch-wide stop
#[derive(Clone, Debug)]
pub struct StopHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Receiving side, cloned into every worker
#[derive(Clone, Debug)]
pub struct StopSignal {
    receiver: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once a stop has been requested. Never resolves if the handle
    /// is dropped without stopping.
    pub async fn stopped(&mut self) {
        let stopped = self.receiver.wait_for(|stop| *stop).await.is_ok();
        if !stopped {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stop_is_seen_by_late_subscribers() {
        let (handle, signal) = stop_channel();
        assert!(!signal.is_stopped());

        handle.stop();
        let mut late = signal.clone();
        assert!(late.is_stopped());
        tokio::time::timeout(Duration::from_secs(1), late.stopped())
            .await
            .expect("stop should resolve immediately");
    }

    #[tokio::test]
    async fn test_dropped_handle_never_stops() {
        let (handle, mut signal) = stop_channel();
        drop(handle);
        let result = tokio::time::timeout(Duration::from_millis(50), signal.stopped()).await;
        assert!(result.is_err());
    }
}
