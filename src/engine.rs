//! Two-stage admission decisions: signature screening, then velocity.

use crate::clock::{Clock, MonotonicClock};
use crate::signature::is_suspicious_signal;
use crate::velocity::VelocityStore;
use std::sync::Arc;

/// Requests a key may make inside one counting window; the next one is
/// blocked.
pub const VELOCITY_THRESHOLD: usize = 50;

/// Why a request was blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// The signal matched a known automation signature, or was absent.
    Signature,
    /// The key exceeded its per-window request budget.
    Velocity {
        /// In-window count observed at decision time.
        count: usize,
    },
}

/// The outcome of classifying one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The request may proceed.
    Allowed,
    /// The request must be rejected.
    Blocked {
        /// Which stage produced the block.
        reason: BlockReason,
    },
}

impl Verdict {
    /// Helper to check if blocked.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Blocked { .. })
    }

    /// Helper to check if allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }

    /// The block reason, when blocked.
    pub fn reason(&self) -> Option<BlockReason> {
        match self {
            Verdict::Blocked { reason } => Some(*reason),
            Verdict::Allowed => None,
        }
    }
}

/// Decision engine combining signature screening with per-key velocity
/// tracking.
///
/// Construct one explicitly and pass handles to whatever composes the request
/// path; there is no process-wide instance. Clones share the same underlying
/// store via `Arc`, so all handles observe the same tracked state. No method
/// here suspends, blocks on I/O, or fails: degenerate inputs normalize to
/// defined verdicts.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    store: Arc<VelocityStore>,
    clock: Arc<dyn Clock>,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionPolicy {
    /// Create a policy with a fresh store and the monotonic clock.
    pub fn new() -> Self {
        Self { store: Arc::new(VelocityStore::new()), clock: Arc::new(MonotonicClock::default()) }
    }

    /// Override the clock (useful for deterministic tests).
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Classify one request.
    ///
    /// Stage order matters: a signature hit returns immediately and is never
    /// counted toward the key's velocity, so a flood of signature-flagged
    /// traffic cannot trip the rate counter for that key.
    /// A blank key cannot be rate-limited and fails open on the velocity axis
    /// only; a blank signal already failed closed in the signature stage.
    pub fn classify(&self, key: &str, signal: Option<&str>) -> Verdict {
        if is_suspicious_signal(signal) {
            tracing::debug!(target: "turnstile::engine", key, "blocked: signature match");
            return Verdict::Blocked { reason: BlockReason::Signature };
        }

        if key.trim().is_empty() {
            return Verdict::Allowed;
        }

        let count = self.store.record_and_count(key, self.clock.now_millis());
        if count > VELOCITY_THRESHOLD {
            tracing::debug!(
                target: "turnstile::engine",
                key,
                count,
                "blocked: velocity over threshold"
            );
            Verdict::Blocked { reason: BlockReason::Velocity { count } }
        } else {
            Verdict::Allowed
        }
    }

    /// In-window request count for `key`, without recording an arrival.
    pub fn current_velocity(&self, key: &str) -> usize {
        self.store.current_count(key, self.clock.now_millis())
    }

    /// Clear all tracked velocity state. Administrative and test use.
    pub fn reset_cache(&self) {
        self.store.reset();
    }

    /// Number of keys currently tracked by the underlying store.
    pub fn tracked_key_count(&self) -> usize {
        self.store.tracked_key_count()
    }

    pub(crate) fn store(&self) -> &Arc<VelocityStore> {
        &self.store
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const BROWSER: Option<&str> = Some(
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    );

    #[test]
    fn signature_hit_blocks_and_is_not_counted() {
        let policy = AdmissionPolicy::new();

        let verdict = policy.classify("203.0.113.5", Some("curl/7.68.0"));
        assert_eq!(verdict, Verdict::Blocked { reason: BlockReason::Signature });

        // The velocity axis must stay untouched for that key.
        assert_eq!(policy.current_velocity("203.0.113.5"), 0);
        assert_eq!(policy.tracked_key_count(), 0);
    }

    #[test]
    fn absent_signal_blocks_regardless_of_key() {
        let policy = AdmissionPolicy::new();
        assert!(policy.classify("203.0.113.5", None).is_blocked());
        assert!(policy.classify("", None).is_blocked());
        assert_eq!(policy.tracked_key_count(), 0);
    }

    #[test]
    fn blank_key_fails_open_on_velocity() {
        let policy = AdmissionPolicy::new();
        assert!(policy.classify("", BROWSER).is_allowed());
        assert!(policy.classify("   ", BROWSER).is_allowed());
        assert_eq!(policy.tracked_key_count(), 0);
    }

    #[test]
    fn threshold_is_a_strict_boundary() {
        let clock = ManualClock::new();
        let policy = AdmissionPolicy::new().with_clock(clock.clone());

        for call in 1..=VELOCITY_THRESHOLD {
            clock.advance(1);
            let verdict = policy.classify("198.51.100.9", BROWSER);
            assert!(verdict.is_allowed(), "call {call} should be allowed");
        }

        clock.advance(1);
        let verdict = policy.classify("198.51.100.9", BROWSER);
        assert_eq!(
            verdict,
            Verdict::Blocked { reason: BlockReason::Velocity { count: VELOCITY_THRESHOLD + 1 } }
        );
    }

    #[test]
    fn window_roll_unblocks_a_quiet_key() {
        let clock = ManualClock::new();
        let policy = AdmissionPolicy::new().with_clock(clock.clone());

        for _ in 0..=VELOCITY_THRESHOLD {
            policy.classify("198.51.100.9", BROWSER);
        }
        assert!(policy.classify("198.51.100.9", BROWSER).is_blocked());

        // Everything above was recorded at t=0; one window later it expires.
        clock.advance(crate::velocity::WINDOW_MS + 1);
        assert!(policy.classify("198.51.100.9", BROWSER).is_allowed());
        assert_eq!(policy.current_velocity("198.51.100.9"), 1);
    }

    #[test]
    fn reset_cache_zeroes_previously_tracked_keys() {
        let policy = AdmissionPolicy::new();
        policy.classify("198.51.100.9", BROWSER);
        policy.classify("198.51.100.10", BROWSER);
        assert_eq!(policy.tracked_key_count(), 2);

        policy.reset_cache();
        assert_eq!(policy.current_velocity("198.51.100.9"), 0);
        assert_eq!(policy.current_velocity("198.51.100.10"), 0);
        assert_eq!(policy.tracked_key_count(), 0);
    }

    #[test]
    fn clones_share_tracked_state() {
        let policy = AdmissionPolicy::new();
        let other = policy.clone();
        policy.classify("a", BROWSER);
        assert_eq!(other.current_velocity("a"), 1);
    }

    #[test]
    fn velocity_block_is_logged() {
        use std::io::Write;
        use std::sync::{Arc, Mutex};
        use tracing_subscriber::fmt::MakeWriter;

        #[derive(Clone)]
        struct SharedWriter(Arc<Mutex<Vec<u8>>>);

        impl<'a> MakeWriter<'a> for SharedWriter {
            type Writer = SharedGuard;
            fn make_writer(&'a self) -> Self::Writer {
                SharedGuard(self.0.clone())
            }
        }

        struct SharedGuard(Arc<Mutex<Vec<u8>>>);
        impl Write for SharedGuard {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::fmt()
            .with_writer(SharedWriter(buffer.clone()))
            .with_max_level(tracing::Level::DEBUG)
            .without_time()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);

        let policy = AdmissionPolicy::new();
        for _ in 0..=VELOCITY_THRESHOLD {
            policy.classify("198.51.100.9", BROWSER);
        }
        assert!(policy.classify("198.51.100.9", BROWSER).is_blocked());

        let logs = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("velocity over threshold"), "block should be logged: {logs}");
    }
}
