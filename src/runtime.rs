use crate::playback::{PlaybackEngine, PlaybackStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic millisecond time source driving playback advancement
pub trait Clock {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Clock moved only by hand; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Configurable ticker interface
pub trait Ticker {
    fn interval(&self) -> Duration;

    /// Blocks until the next tick is due
    fn wait(&self) {
        std::thread::sleep(self.interval());
    }
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Ticker that advances a [`ManualClock`] instead of sleeping
#[derive(Clone, Debug)]
pub struct ManualTicker {
    clock: ManualClock,
    interval: Duration,
}

impl ManualTicker {
    pub fn new(clock: ManualClock, interval: Duration) -> Self {
        Self { clock, interval }
    }
}

impl Ticker for ManualTicker {
    fn interval(&self) -> Duration {
        self.interval
    }

    fn wait(&self) {
        self.clock.advance(self.interval.as_millis() as u64);
    }
}

/// Drives an engine's time advancement one tick at a time
pub struct Runner<T: Ticker> {
    ticker: T,
}

impl<T: Ticker> Runner<T> {
    pub fn new(ticker: T) -> Self {
        Self { ticker }
    }

    /// Waits one interval and advances the engine; returns whether it is still playing
    pub fn step(&self, engine: &mut PlaybackEngine) -> bool {
        self.ticker.wait();
        engine.tick();
        engine.status() == PlaybackStatus::Playing
    }

    /// Ticks until playback leaves the playing state; returns the tick count
    pub fn run(&self, engine: &mut PlaybackEngine) -> usize {
        let mut ticks = 0;
        while engine.status() == PlaybackStatus::Playing {
            self.step(engine);
            ticks += 1;
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_shared() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(250);
        assert_eq!(other.now_ms(), 250);
        other.set(10);
        assert_eq!(clock.now_ms(), 10);
    }

    #[test]
    fn manual_ticker_moves_clock() {
        let clock = ManualClock::new();
        let ticker = ManualTicker::new(clock.clone(), Duration::from_millis(40));
        ticker.wait();
        ticker.wait();
        assert_eq!(clock.now_ms(), 80);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.now_ms() >= a + 5);
    }
}
