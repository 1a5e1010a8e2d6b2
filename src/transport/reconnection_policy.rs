use std::fmt;
use std::time::Duration;

use rand::Rng;

/// Generates a potentially infinite lazy sequence of backoff durations to
/// wait after a connection is lost.
///
/// The Session never consults this itself -- it only calls
/// [`ConnectionFactory::open`](crate::transport::connection_factory::ConnectionFactory)
/// and reacts to the resulting events. [`Connector`](crate::transport::connector::Connector)
/// is the piece that actually paces reopen attempts using this sequence.
pub trait ReconnectionPolicy: fmt::Debug + Send + Sync {
    /// Returns a fresh backoff iterator, to be used for one connection's
    /// reconnection attempts from the moment it was lost.
    fn new_schedule(&self) -> Box<dyn Iterator<Item = Duration> + Send>;
}

/// Exponential backoff with a configurable base and cap, the default policy.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialReconnectionPolicy {
    base: Duration,
    max: Duration,
}

impl ExponentialReconnectionPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        ExponentialReconnectionPolicy { base, max }
    }
}

impl Default for ExponentialReconnectionPolicy {
    fn default() -> Self {
        ExponentialReconnectionPolicy::new(Duration::from_millis(200), Duration::from_secs(30))
    }
}

impl ReconnectionPolicy for ExponentialReconnectionPolicy {
    fn new_schedule(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        Box::new(ExponentialSchedule {
            base: self.base,
            max: self.max,
            attempt: 0,
        })
    }
}

struct ExponentialSchedule {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Iterator for ExponentialSchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let exponent = self.attempt.min(20); // avoid overflow on 1u64 << exponent
        self.attempt += 1;

        let scaled = self.base.checked_mul(1u32 << exponent).unwrap_or(self.max);
        let capped = scaled.min(self.max);

        // A little jitter so many connections lost at once don't all retry
        // in lockstep.
        let jitter_ms = rand::thread_rng().gen_range(0..=capped.as_millis().max(1) as u64 / 10 + 1);
        Some(capped + Duration::from_millis(jitter_ms))
    }
}
