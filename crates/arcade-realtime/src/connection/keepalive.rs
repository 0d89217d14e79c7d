//! Keepalive pings for idle WebSocket connections.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use arcade_entity::event::LobbyEvent;

/// Interval that first fires one `period` after creation. Periods below
/// one second are raised to one second.
pub fn keepalive(period: Duration) -> Interval {
    let period = period.max(Duration::from_secs(1));
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Serialized `ping` envelope.
pub fn ping_frame() -> String {
    LobbyEvent::Ping
        .to_json()
        .unwrap_or_else(|_| r#"{"type":"ping"}"#.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let mut interval = keepalive(Duration::from_secs(30));
        let start = Instant::now();
        interval.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        interval.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[test]
    fn test_ping_frame() {
        assert_eq!(ping_frame(), r#"{"type":"ping"}"#);
    }
}
