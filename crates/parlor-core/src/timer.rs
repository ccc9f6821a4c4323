//! Cancellable single-shot expiry timers.
//!
//! Every self-expiring piece of state (typing/thinking signals, the
//! client's reconnect delay, self-typing suppression) owns exactly one
//! [`ExpiryTimer`]. Replacing a timer is "drop the old one, start a new
//! one": dropping cancels, so two live timers for the same key cannot
//! exist as long as the owner stores at most one.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A single-shot timer that runs a future once its deadline passes.
#[derive(Debug)]
pub struct ExpiryTimer {
    handle: JoinHandle<()>,
    fired: Arc<AtomicBool>,
}

impl ExpiryTimer {
    /// Starts a timer that awaits `on_expire` after `after` elapses.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(after: Duration, on_expire: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let deadline = Instant::now() + after;
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            // Once fired, dropping the owner (which on_expire usually does)
            // must not abort the callback mid-flight.
            flag.store(true, Ordering::SeqCst);
            on_expire.await;
        });

        Self { handle, fired }
    }

    /// Cancels the timer. A no-op once the timer has fired.
    pub fn cancel(&self) {
        if !self.fired.load(Ordering::SeqCst) {
            self.handle.abort();
        }
    }

    /// Whether the deadline passed and the callback started.
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_deadline() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let timer = ExpiryTimer::start(Duration::from_secs(4), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(3_900)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(timer.has_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let timer = ExpiryTimer::start(Duration::from_secs(1), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(timer);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_never_stacks() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut slot: Option<ExpiryTimer> = None;
        for _ in 0..5 {
            let counter = hits.clone();
            slot = Some(ExpiryTimer::start(Duration::from_secs(4), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        assert!(slot.is_some());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
