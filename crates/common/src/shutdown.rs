//! Cooperative shutdown shared by every worker loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable stop flag. Every worker checks it once per iteration and
/// exits its loop after the iteration in progress.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask all holders of this signal to stop.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_observe_trigger() {
        let signal = ShutdownSignal::new();
        let worker_copy = signal.clone();
        assert!(!worker_copy.is_triggered());
        signal.trigger();
        assert!(worker_copy.is_triggered());
    }
}
