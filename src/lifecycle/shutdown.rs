//! Shutdown coordination.
//!
//! `main` triggers on SIGINT/SIGTERM. `HubServer::run` hands one receiver to
//! axum's graceful shutdown (in-flight cookie checks finish, new connections
//! are refused) and one to `sessions::run_cleanup`, which stops purging.
//! Sessions and API tokens are in memory and are dropped with the process,
//! so every per-user server must be reissued a token after a Hub restart.

use tokio::sync::broadcast;

/// One-shot stop signal fanned out to the Hub's long-running tasks.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Tasks still listening; zero once the server and cleanup task exit.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_all_subscribers() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 2);
        shutdown.trigger();
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }
}
