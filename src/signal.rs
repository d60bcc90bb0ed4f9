//! Coalesced wake-up signal.
//!
//! A capacity-1 edge-triggered notification used to wake drain waiters when
//! the order book membership changes. Publishing is non-blocking: while a
//! wake is already pending, further publishes are dropped, so any burst of
//! membership changes collapses into a single wake. Consumers must therefore
//! re-check the state they are waiting on after every wake.

use tokio::sync::Notify;

/// Capacity-1 edge-triggered wake-up channel.
///
/// `emit` never blocks and never allocates; `wait` consumes at most one
/// pending wake. A wake published while nobody is waiting stays pending
/// until the next `wait`.
#[derive(Debug, Default)]
pub struct Signal {
    notify: Notify,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a wake-up. Coalesces with any wake already pending.
    pub fn emit(&self) {
        self.notify.notify_one();
    }

    /// Wait for the next wake-up, consuming it.
    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_emit_before_wait_completes() {
        let sig = Signal::new();
        sig.emit();
        tokio::time::timeout(Duration::from_millis(100), sig.wait())
            .await
            .expect("pending wake should complete the wait immediately");
    }

    #[tokio::test]
    async fn test_emits_coalesce_to_one_wake() {
        let sig = Signal::new();
        sig.emit();
        sig.emit();
        sig.emit();

        tokio::time::timeout(Duration::from_millis(100), sig.wait())
            .await
            .expect("first wait consumes the pending wake");

        // The burst collapsed into a single wake, so a second wait must block.
        let second = tokio::time::timeout(Duration::from_millis(50), sig.wait()).await;
        assert!(second.is_err(), "coalesced signal must not wake twice");
    }

    #[tokio::test]
    async fn test_emit_wakes_parked_waiter() {
        let sig = std::sync::Arc::new(Signal::new());
        let waiter = {
            let sig = sig.clone();
            tokio::spawn(async move { sig.wait().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        sig.emit();
        tokio::time::timeout(Duration::from_millis(100), waiter)
            .await
            .expect("waiter should be woken")
            .unwrap();
    }
}
