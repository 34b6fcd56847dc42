//! Minimum spacing between transmissions.

use std::thread;
use std::time::{Duration, Instant};

/// Keeps consecutive transmissions at least `min_interval` apart.
#[derive(Debug, Clone)]
pub(crate) struct TxPacer {
    min_interval: Duration,
    last_tx: Option<Instant>,
}

impl TxPacer {
    pub(crate) fn new(min_interval: Duration) -> Self {
        TxPacer {
            min_interval,
            last_tx: None,
        }
    }

    /// Block until the next transmission is allowed. Returns the time waited.
    pub(crate) fn wait(&self) -> Duration {
        let Some(last_tx) = self.last_tx else {
            return Duration::ZERO;
        };
        let ready_at = last_tx + self.min_interval;
        let now = Instant::now();
        if ready_at <= now {
            return Duration::ZERO;
        }
        let remaining = ready_at - now;
        thread::sleep(remaining);
        remaining
    }

    /// Record a transmission. Called after the transport returns.
    pub(crate) fn mark(&mut self) {
        self.last_tx = Some(Instant::now());
    }

    /// Forget the last transmission.
    pub(crate) fn reset(&mut self) {
        self.last_tx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_transmission_does_not_wait() {
        let pacer = TxPacer::new(Duration::from_millis(50));
        assert_eq!(pacer.wait(), Duration::ZERO);
    }

    #[test]
    fn test_wait_enforces_interval() {
        let mut pacer = TxPacer::new(Duration::from_millis(5));
        pacer.mark();
        let marked = Instant::now();
        pacer.wait();
        assert!(marked.elapsed() >= Duration::from_millis(4));
    }

    #[test]
    fn test_reset() {
        let mut pacer = TxPacer::new(Duration::from_secs(10));
        pacer.mark();
        pacer.reset();
        assert_eq!(pacer.wait(), Duration::ZERO);
    }
}
