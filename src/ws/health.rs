/// Connection keepalive tracking
///
/// The reader half owns a `ConnectionHealth` and waits on its deadline; only
/// a pong from the client pushes the deadline forward. The writer half owns
/// the ping ticker.
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

// ============================================================================
// CONNECTION HEALTH TRACKER
// ============================================================================

/// Read-deadline state for one connection
#[derive(Debug)]
pub struct ConnectionHealth {
    /// When the current read window started (connect or last pong)
    last_pong: Instant,

    /// Length of the read window
    read_timeout: Duration,

    /// Pongs seen so far
    pongs_received: u64,
}

impl ConnectionHealth {
    pub fn new(read_timeout: Duration) -> Self {
        Self {
            last_pong: Instant::now(),
            read_timeout,
            pongs_received: 0,
        }
    }

    /// Record a pong and extend the read deadline by one window
    pub fn record_pong(&mut self) {
        self.last_pong = Instant::now();
        self.pongs_received += 1;
    }

    /// Instant after which the connection counts as dead
    pub fn deadline(&self) -> Instant {
        self.last_pong + self.read_timeout
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline()
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn pongs_received(&self) -> u64 {
        self.pongs_received
    }

    /// Milliseconds since the read window was last refreshed
    pub fn millis_since_pong(&self) -> u128 {
        self.last_pong.elapsed().as_millis()
    }
}

/// Create the ping ticker for a writer
///
/// The first tick fires one full period after creation so a fresh connection
/// is not pinged immediately.
pub fn ping_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
