//! Time sources: the wall clock used for timestamps and the periodic ticker
//! that drives the recorder.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use chrono_tz::Tz;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// A source of wall-clock time.
pub trait WallClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(at)),
        }
    }

    /// Moves the clock forward. Clones of this clock observe the change.
    pub fn advance(&self, by: ChronoDuration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }
}

impl WallClock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Formats an instant as `HH:MM:SS` in the given timezone.
pub fn format_clock_time(at: DateTime<Utc>, timezone: Tz) -> String {
    at.with_timezone(&timezone).format("%H:%M:%S").to_string()
}

/// Formats a count of seconds as `HH:MM:SS`. Hours are not wrapped.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// A single firing of the ticker.
#[derive(Debug, Clone)]
pub struct TickEvent {
    /// Ticks fired since this ticker was started, starting at 1.
    pub tick_count: u64,
    pub timestamp: Instant,
}

/// A periodic ticker that drives a callback from its own task.
///
/// The first tick fires one full period after the ticker starts, never
/// immediately. Missed ticks are delivered in a burst so that no tick is
/// lost when the runtime falls behind.
pub struct Ticker {
    period: Duration,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    /// Runs `on_tick` once per period until it resolves to `false`.
    pub async fn run<F, Fut>(self, mut on_tick: F)
    where
        F: FnMut(TickEvent) -> Fut + Send,
        Fut: Future<Output = bool> + Send,
    {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
        let mut tick_count = 0u64;
        debug!("Ticker started with period {:?}.", self.period);
        loop {
            let timestamp = ticker.tick().await;
            tick_count += 1;
            trace!("Tick #{} fired.", tick_count);
            if !on_tick(TickEvent {
                tick_count,
                timestamp,
            })
            .await
            {
                break;
            }
        }
        debug!("Ticker stopped after {} ticks.", tick_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn duration_rolls_minutes_and_hours() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(59), "00:00:59");
        assert_eq!(format_duration(61), "00:01:01");
        assert_eq!(format_duration(3_725), "01:02:05");
        assert_eq!(format_duration(90_000), "25:00:00");
    }

    #[test]
    fn clock_time_honours_timezone() {
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 12, 30, 5).unwrap();
        assert_eq!(format_clock_time(at, Tz::UTC), "12:30:05");
        assert_eq!(format_clock_time(at, Tz::Asia__Kolkata), "18:00:05");
    }

    #[test]
    fn fixed_clock_clones_share_time() {
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 23, 59, 59).unwrap();
        let clock = FixedClock::new(start);
        let view = clock.clone();
        clock.advance(ChronoDuration::seconds(2));
        assert_eq!(view.now(), start + ChronoDuration::seconds(2));
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_waits_a_full_period_before_first_tick() {
        let (tick_tx, mut tick_rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = tokio::spawn(Ticker::new(Duration::from_secs(1)).run(move |tick| {
            let tick_tx = tick_tx.clone();
            async move {
                tick_tx.send(tick.tick_count).ok();
                tick.tick_count < 3
            }
        }));

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(tick_rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(tick_rx.recv().await, Some(1));

        handle.await.unwrap();
        assert_eq!(tick_rx.recv().await, Some(2));
        assert_eq!(tick_rx.recv().await, Some(3));
        assert!(tick_rx.try_recv().is_err());
    }
}
