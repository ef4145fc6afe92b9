//! Log throttling for per-frame failures
//!
//! A pipeline can fail on every frame for as long as a bad condition lasts.
//! The throttler lets one message per key through per interval and counts
//! the ones it swallowed, so the next message can report them.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct Entry {
    last: Instant,
    suppressed: u64,
}

/// Rate limiter for repeated log messages, keyed by message kind
pub struct LogThrottler {
    entries: Mutex<HashMap<String, Entry>>,
    interval: Duration,
}

impl LogThrottler {
    pub fn new(interval: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            interval,
        }
    }

    pub fn with_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Returns `Some(suppressed)` when the message for `key` should be logged
    /// now, where `suppressed` is how many were dropped since the last one.
    pub fn check(&self, key: &str) -> Option<u64> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get_mut(key) {
            Some(entry) if now.duration_since(entry.last) < self.interval => {
                entry.suppressed += 1;
                None
            }
            Some(entry) => {
                let suppressed = std::mem::take(&mut entry.suppressed);
                entry.last = now;
                Some(suppressed)
            }
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        last: now,
                        suppressed: 0,
                    },
                );
                Some(0)
            }
        }
    }

    /// Whether the message for `key` should be logged now
    pub fn should_log(&self, key: &str) -> bool {
        self.check(key).is_some()
    }

    /// Forget `key`, so the next failure after a recovery logs immediately
    pub fn clear(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for LogThrottler {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

/// `tracing::warn!` through a [`LogThrottler`], appending the suppressed count
#[macro_export]
macro_rules! warn_throttled {
    ($throttler:expr, $key:expr, $($arg:tt)*) => {
        if let Some(suppressed) = $throttler.check($key) {
            if suppressed > 0 {
                tracing::warn!(suppressed, $($arg)*);
            } else {
                tracing::warn!($($arg)*);
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_passes() {
        let throttler = LogThrottler::with_millis(1000);
        assert_eq!(throttler.check("decode"), Some(0));
        assert_eq!(throttler.check("decode"), None);
        assert_eq!(throttler.check("annotate"), Some(0));
    }

    #[test]
    fn test_suppressed_count_reported_after_interval() {
        let throttler = LogThrottler::with_millis(50);
        assert!(throttler.should_log("k"));
        assert!(!throttler.should_log("k"));
        assert!(!throttler.should_log("k"));

        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(throttler.check("k"), Some(2));
        assert_eq!(throttler.check("k"), None);
    }

    #[test]
    fn test_clear() {
        let throttler = LogThrottler::default();
        assert!(throttler.should_log("k"));
        assert_eq!(throttler.len(), 1);
        throttler.clear("k");
        assert!(throttler.is_empty());
        assert!(throttler.should_log("k"));
    }
}
