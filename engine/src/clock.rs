//! Session clock
//!
//! Counts a duration session down once per second and fires `Expired`
//! exactly once. The interval is owned here and dropped on every stop.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

const TICK: Duration = Duration::from_secs(1);

/// Outcome of one clock tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClockTick {
    Remaining { seconds: u32 },
    Expired,
}

/// Count-down clock for duration sessions
#[derive(Debug, Default)]
pub struct SessionClock {
    remaining: Option<u32>,
    running: bool,
    ticker: Option<Interval>,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin counting down from `total_seconds`
    pub fn start(&mut self, total_seconds: u32) {
        self.remaining = Some(total_seconds);
        self.running = total_seconds > 0;
        self.ticker = None;
        info!(total_seconds, "session clock started");
    }

    /// Cancel without firing; safe to call repeatedly
    pub fn stop(&mut self) {
        if self.running {
            debug!(remaining = ?self.remaining, "session clock stopped");
        }
        self.running = false;
        self.ticker = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    /// Apply one elapsed second; `None` once stopped or expired
    pub fn advance(&mut self) -> Option<ClockTick> {
        if !self.running {
            return None;
        }
        let remaining = self.remaining.unwrap_or(0).saturating_sub(1);
        self.remaining = Some(remaining);
        if remaining == 0 {
            self.running = false;
            self.ticker = None;
            info!("session clock expired");
            Some(ClockTick::Expired)
        } else {
            Some(ClockTick::Remaining { seconds: remaining })
        }
    }

    /// Wait for the next tick; pending forever while not running
    pub async fn next_tick(&mut self) -> ClockTick {
        loop {
            if !self.running {
                self.ticker = None;
                return std::future::pending().await;
            }
            let ticker = self.ticker.get_or_insert_with(|| {
                let mut ticker = interval_at(Instant::now() + TICK, TICK);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
                ticker
            });
            ticker.tick().await;
            if let Some(tick) = self.advance() {
                return tick;
            }
        }
    }
}

/// Format seconds as `m:ss`
pub fn format_remaining(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
