//! Jittered exponential back-off for stream reconnects.

use std::time::Duration;

use rand::Rng;

/// Base delay doubled per attempt.
const BASE_DELAY_MS: u64 = 1_000;
/// Exclusive upper bound of the random jitter added to each delay.
const JITTER_MS: u64 = 250;
/// Hard ceiling regardless of attempt count.
const MAX_DELAY_MS: u64 = 10_000;
/// Cap on the attempt counter itself, purely to bound `2^attempt`.
pub const MAX_ATTEMPT: u32 = 20;

/// Computes the delay before the next reconnect attempt.
///
/// The jitter source is injectable so tests can pin it; the production
/// policy draws from [`rand`]. Jitter desynchronizes clients that all lost
/// the same server at the same moment.
pub struct ReconnectPolicy {
    jitter: Box<dyn FnMut(u64) -> u64 + Send>,
}

impl ReconnectPolicy {
    /// Policy with uniform random jitter in `[0, 250)` ms.
    pub fn new() -> Self {
        Self::with_jitter(|bound| rand::rng().random_range(0..bound))
    }

    /// Policy with a caller-supplied jitter source. The closure receives the
    /// exclusive upper bound and returns the drawn jitter in milliseconds.
    pub fn with_jitter(jitter: impl FnMut(u64) -> u64 + Send + 'static) -> Self {
        Self {
            jitter: Box::new(jitter),
        }
    }

    /// Delay before retry number `attempt` (0-based):
    /// `min(1000 * 2^attempt + jitter, 10_000)` milliseconds.
    pub fn next_delay(&mut self, attempt: u32) -> Duration {
        let exponent = attempt.min(MAX_ATTEMPT);
        let base = 1u64
            .checked_shl(exponent)
            .and_then(|factor| BASE_DELAY_MS.checked_mul(factor))
            .unwrap_or(MAX_DELAY_MS);
        let jitter = ((self.jitter)(JITTER_MS)).min(JITTER_MS);
        Duration::from_millis(base.saturating_add(jitter).min(MAX_DELAY_MS))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReconnectPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectPolicy").finish_non_exhaustive()
    }
}
