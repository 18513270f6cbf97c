//! Coalesces a high-frequency sequence of incoming fragments into
//! low-frequency flushes aligned to the display refresh cycle.
//!
//! The batcher itself is deadline-driven and synchronous; the event loop
//! sleeps until [`RenderBatcher::next_deadline`] and then drains the queue,
//! the same shape as a frame-gated redraw.

use std::time::Duration;

use tokio::time::Instant;

/// Floor between two flushes even when fragments arrive continuously.
pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(8);

/// Fallback bound: a queued fragment never waits longer than this.
pub const MAX_FLUSH_WAIT: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct RenderBatcher<T> {
    queue: Vec<T>,
    deadline: Option<Instant>,
    last_flush: Instant,
    min_interval: Duration,
    max_wait: Duration,
    disposed: bool,
}

impl<T> RenderBatcher<T> {
    pub fn new(min_interval: Duration, max_wait: Duration) -> Self {
        Self {
            queue: Vec::new(),
            deadline: None,
            last_flush: Instant::now(),
            min_interval,
            max_wait,
            disposed: false,
        }
    }

    pub fn with_frame_defaults() -> Self {
        Self::new(MIN_FLUSH_INTERVAL, MAX_FLUSH_WAIT)
    }

    /// Queue one fragment. The first push after a flush arms the deadline:
    /// no earlier than the minimum interval since the last flush, no later
    /// than the fallback window from now.
    pub fn push(&mut self, item: T) {
        if self.disposed {
            return;
        }
        self.queue.push(item);
        if self.deadline.is_none() {
            let now = Instant::now();
            let earliest = (self.last_flush + self.min_interval).max(now);
            self.deadline = Some(earliest.min(now + self.max_wait));
        }
    }

    /// When the driver should wake to flush, if anything is queued.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drain the queue if the armed deadline has passed.
    pub fn flush_due(&mut self, now: Instant) -> Option<Vec<T>> {
        match self.deadline {
            Some(deadline) if deadline <= now => Some(self.flush_now()),
            _ => None,
        }
    }

    /// Cancel any pending schedule and drain synchronously.
    pub fn flush_now(&mut self) -> Vec<T> {
        self.deadline = None;
        self.last_flush = Instant::now();
        std::mem::take(&mut self.queue)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Teardown: clear the queue and deadline. No flush fires afterwards,
    /// and later pushes are dropped.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.queue.clear();
        self.deadline = None;
    }
}
