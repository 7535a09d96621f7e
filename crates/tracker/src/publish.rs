//! Single-writer publication of tracker state.
//!
//! The acquisition worker is the only writer. Each publish swaps in a new
//! `Arc<TrackerState>` as one value, so a reader that takes the latest state
//! sees one generation in full and never a mix of two. Readers never block
//! the writer and the writer never waits for readers.

use std::sync::Arc;

use tokio::sync::watch;

use crate::state::TrackerState;

type Slot = Option<Arc<TrackerState>>;

/// Create a connected publisher/subscriber pair. Nothing is published yet.
pub fn state_channel() -> (StatePublisher, StateSubscriber) {
    let (tx, rx) = watch::channel(None);
    (StatePublisher { tx }, StateSubscriber { rx })
}

/// The writing end. Not `Clone`: there is exactly one writer.
#[derive(Debug)]
pub struct StatePublisher {
    tx: watch::Sender<Slot>,
}

impl StatePublisher {
    /// Replace the published state. Succeeds even with no readers.
    pub fn publish(&self, state: TrackerState) -> Arc<TrackerState> {
        let state = Arc::new(state);
        self.tx.send_replace(Some(Arc::clone(&state)));
        state
    }

    /// A new reader of this publisher.
    pub fn subscribe(&self) -> StateSubscriber {
        StateSubscriber {
            rx: self.tx.subscribe(),
        }
    }
}

/// A reading end. Cheap to clone; each worker holds its own.
#[derive(Debug, Clone)]
pub struct StateSubscriber {
    rx: watch::Receiver<Slot>,
}

impl StateSubscriber {
    /// The most recently published state, or `None` before the first frame.
    pub fn latest(&self) -> Option<Arc<TrackerState>> {
        self.rx.borrow().clone()
    }

    /// Generation of the latest state, 0 before the first frame.
    pub fn generation(&self) -> u64 {
        self.rx.borrow().as_ref().map_or(0, |s| s.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    fn state(generation: u64) -> TrackerState {
        TrackerState::empty(generation, generation, generation * 1000, Arc::new(GrayImage::new(4, 4)))
    }

    #[test]
    fn test_nothing_before_first_publish() {
        let (_publisher, subscriber) = state_channel();
        assert!(subscriber.latest().is_none());
        assert_eq!(subscriber.generation(), 0);
    }

    #[test]
    fn test_readers_see_latest_generation() {
        let (publisher, subscriber) = state_channel();
        let other = publisher.subscribe();
        publisher.publish(state(1));
        publisher.publish(state(2));

        assert_eq!(subscriber.latest().unwrap().generation, 2);
        assert_eq!(other.generation(), 2);
    }

    #[test]
    fn test_held_state_is_not_torn_by_later_publish() {
        let (publisher, subscriber) = state_channel();
        publisher.publish(state(1));
        let held = subscriber.latest().unwrap();
        publisher.publish(state(2));

        assert_eq!(held.generation, 1);
        assert_eq!(held.timestamp_ns, 1000);
        assert_eq!(subscriber.latest().unwrap().generation, 2);
    }

    #[test]
    fn test_publish_without_readers_succeeds() {
        let (publisher, subscriber) = state_channel();
        drop(subscriber);
        let published = publisher.publish(state(7));
        assert_eq!(published.generation, 7);
    }

    #[test]
    fn test_concurrent_readers_always_see_consistent_states() {
        let (publisher, subscriber) = state_channel();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let sub = subscriber.clone();
                std::thread::spawn(move || {
                    let mut last = 0;
                    for _ in 0..2_000 {
                        if let Some(s) = sub.latest() {
                            assert_eq!(s.timestamp_ns, s.generation * 1000);
                            assert!(s.generation >= last, "generation went backwards");
                            last = s.generation;
                        }
                    }
                })
            })
            .collect();

        for g in 1..=500 {
            publisher.publish(state(g));
        }
        for r in readers {
            r.join().unwrap();
        }
    }
}
