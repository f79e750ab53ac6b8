//! Control signals injected by the host while a command runs.
//!
//! A control signal is a small integer code, typically a key press such as
//! `q` to stop a transcode. The host's control thread pushes codes and the
//! running tool pops them from its run loop.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default queue capacity.
pub const DEFAULT_SIGNAL_CAPACITY: usize = 256;

/// Value returned by C callers when no signal is queued.
pub const NO_SIGNAL: i32 = -1;

/// Order in which queued signals are handed to the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrainOrder {
    /// Oldest signal first, i.e. keys in the order they were pressed.
    #[default]
    Fifo,
    /// Newest signal first.
    Lifo,
}

/// What happens to a push when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued signal to make room.
    #[default]
    DropOldest,
    /// Discard the signal being pushed.
    DropNewest,
}

/// Settings for a [`ControlSignals`] queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    #[serde(default)]
    pub overflow: OverflowPolicy,

    #[serde(default)]
    pub order: DrainOrder,
}

fn default_capacity() -> usize {
    DEFAULT_SIGNAL_CAPACITY
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_SIGNAL_CAPACITY,
            overflow: OverflowPolicy::default(),
            order: DrainOrder::default(),
        }
    }
}

/// Bounded, thread-safe queue of control-signal codes.
///
/// The lock is held only for the enqueue or dequeue itself.
#[derive(Debug)]
pub struct ControlSignals {
    queue: Mutex<VecDeque<i32>>,
    config: SignalConfig,
    dropped: AtomicU64,
}

impl ControlSignals {
    pub fn new(config: SignalConfig) -> Self {
        // A zero capacity would drop every signal.
        let config = SignalConfig {
            capacity: config.capacity.max(1),
            ..config
        };
        Self {
            queue: Mutex::new(VecDeque::with_capacity(config.capacity.min(64))),
            config,
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue a signal. Never blocks and never fails; on overflow the
    /// configured policy decides which signal is lost.
    pub fn push(&self, code: i32) {
        let evicted = {
            let mut queue = self.queue.lock();
            if queue.len() < self.config.capacity {
                queue.push_back(code);
                None
            } else {
                match self.config.overflow {
                    OverflowPolicy::DropOldest => {
                        let evicted = queue.pop_front();
                        queue.push_back(code);
                        evicted
                    }
                    OverflowPolicy::DropNewest => Some(code),
                }
            }
        };

        if let Some(lost) = evicted {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(code = lost, "control signal queue full, dropped signal");
        }
    }

    /// Take the next signal, or `None` if the queue is empty.
    pub fn pop(&self) -> Option<i32> {
        let mut queue = self.queue.lock();
        match self.config.order {
            DrainOrder::Fifo => queue.pop_front(),
            DrainOrder::Lifo => queue.pop_back(),
        }
    }

    /// Discard every queued signal, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut queue = self.queue.lock();
        let n = queue.len();
        queue.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Signals lost to overflow since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }
}

impl Default for ControlSignals {
    fn default() -> Self {
        Self::new(SignalConfig::default())
    }
}
