//! Timing and endpoint configuration for the real-time session.

use std::time::Duration;

/// How long an inbound typing indicator survives without a repeated
/// "started" signal. The self-expiry backstop against a lost "stopped".
pub const TYPING_EXPIRY: Duration = Duration::from_millis(3_000);

/// Minimum gap between two outbound "typing started" emissions per room.
pub const TYPING_THROTTLE: Duration = Duration::from_millis(1_000);

/// Maximum automatic reconnection attempts before the connection is
/// declared lost.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Fixed interval between reconnection attempts.
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Tunable knobs for one real-time session.
#[derive(Clone, Debug)]
pub struct RealtimeConfig {
    pub typing_expiry: Duration,
    pub typing_throttle: Duration,
    pub max_reconnect_attempts: u32,
    pub reconnect_interval: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            typing_expiry: TYPING_EXPIRY,
            typing_throttle: TYPING_THROTTLE,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            reconnect_interval: RECONNECT_INTERVAL,
        }
    }
}
