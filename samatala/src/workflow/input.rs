//! Encoder clicks from an asynchronous producer.

use std::sync::atomic::{AtomicI32, Ordering};

/// Click accumulator shared with an interrupt handler or UI thread.
///
/// The producer adds clicks with [`EncoderDelta::add`]; the workflow takes
/// the whole count with one atomic swap, so a click can never be read
/// half-updated or counted twice.
#[derive(Debug, Default)]
pub struct EncoderDelta {
    clicks: AtomicI32,
}

impl EncoderDelta {
    /// Empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record clicks (negative turns down)
    #[inline]
    pub fn add(&self, clicks: i32) {
        self.clicks.fetch_add(clicks, Ordering::AcqRel);
    }

    /// Take all pending clicks, leaving zero
    #[inline]
    pub fn take(&self) -> i32 {
        self.clicks.swap(0, Ordering::AcqRel)
    }

    /// Pending clicks without consuming them
    #[inline]
    pub fn pending(&self) -> i32 {
        self.clicks.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_take_resets() {
        let enc = EncoderDelta::new();
        enc.add(3);
        enc.add(-1);
        assert_eq!(enc.pending(), 2);
        assert_eq!(enc.take(), 2);
        assert_eq!(enc.take(), 0);
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        let enc = Arc::new(EncoderDelta::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let enc = Arc::clone(&enc);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        enc.add(1);
                    }
                })
            })
            .collect();
        let mut taken = 0;
        for h in handles {
            taken += enc.take();
            h.join().unwrap();
        }
        taken += enc.take();
        assert_eq!(taken, 4000);
    }
}
