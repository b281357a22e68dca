//! Shutdown coordination for the service.
//!
//! The stop flag is latched: a server that subscribes after `trigger` still
//! sees it, so a signal arriving during startup is never lost.

use tokio::sync::watch;

/// Latched stop flag shared by the service and its background tasks.
#[derive(Debug)]
pub struct Shutdown {
    stop: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Self { stop }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.stop.subscribe()
    }

    /// Latch the flag and wake every subscriber.
    pub fn trigger(&self) {
        self.stop.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.stop.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve once `receiver`'s flag is set or its coordinator is gone.
pub async fn stopped(mut receiver: watch::Receiver<bool>) {
    let _ = receiver.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_reaches_every_subscriber() {
        let shutdown = Shutdown::new();
        let a = tokio::spawn(stopped(shutdown.subscribe()));
        let b = tokio::spawn(stopped(shutdown.subscribe()));

        shutdown.trigger();
        a.await.unwrap();
        b.await.unwrap();
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), stopped(shutdown.subscribe()))
            .await
            .expect("latched trigger was missed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_untriggered_subscriber_waits() {
        let shutdown = Shutdown::new();
        let waited =
            tokio::time::timeout(Duration::from_secs(60), stopped(shutdown.subscribe())).await;
        assert!(waited.is_err());
        assert!(!shutdown.is_triggered());
    }
}
