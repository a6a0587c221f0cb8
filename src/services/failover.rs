//! Time-windowed stream failover
//!
//! Players give no signal when a stream link is dead; they simply ask for
//! the same playback again. Per logical-playback key this module tells the
//! cases apart by elapsed time alone:
//!
//! - a repeat within the grace period is the player still buffering, so the
//!   same candidate is served again;
//! - a repeat after the grace period but inside the reset window means the
//!   link is probably dead, so the next candidate is served;
//! - a request after the reset window means the last link worked, so the
//!   state starts over from the requested index.
//!
//! Every decision goes through [`transition`]; the manager only stores the
//! resulting state, atomically per key.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::FailoverConfig;
use crate::models::PlaybackKey;

/// Candidate currently served for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Serving {
    pub index: usize,
    /// When `index` started being served
    pub first_attempt: Instant,
    pub last_attempt: Instant,
    pub attempt_count: u32,
    /// Index the state resets to
    pub requested: usize,
}

/// Failover state of one logical-playback key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverState {
    Fresh,
    Serving(Serving),
}

/// What a request did to the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No previous state
    Start,
    /// Inside the grace period, same candidate
    Hold,
    /// Grace period over, next candidate
    Advance { wrapped: bool },
    /// Reset window elapsed, back to the requested index
    Reset,
}

/// Grace and reset windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailoverWindows {
    pub grace_period: Duration,
    pub reset_window: Duration,
}

impl From<&FailoverConfig> for FailoverWindows {
    fn from(config: &FailoverConfig) -> Self {
        Self {
            grace_period: config.grace_period,
            reset_window: config.reset_window,
        }
    }
}

/// Single transition function of the failover state machine
///
/// `total` must be at least 2; smaller pools never reach the state machine.
pub fn transition(
    windows: FailoverWindows,
    state: FailoverState,
    requested: usize,
    total: usize,
    now: Instant,
) -> (Serving, Transition) {
    let last = total.saturating_sub(1);
    let requested = requested.min(last);
    let start = Serving {
        index: requested,
        first_attempt: now,
        last_attempt: now,
        attempt_count: 1,
        requested,
    };

    let current = match state {
        FailoverState::Fresh => return (start, Transition::Start),
        FailoverState::Serving(current) => current,
    };

    if now.saturating_duration_since(current.last_attempt) > windows.reset_window {
        return (start, Transition::Reset);
    }

    if now.saturating_duration_since(current.first_attempt) < windows.grace_period {
        let held = Serving {
            index: current.index.min(last),
            last_attempt: now,
            attempt_count: current.attempt_count.saturating_add(1),
            ..current
        };
        return (held, Transition::Hold);
    }

    let next = (current.index + 1) % total;
    let advanced = Serving {
        index: next,
        first_attempt: now,
        last_attempt: now,
        attempt_count: current.attempt_count.saturating_add(1),
        requested: current.requested,
    };
    (advanced, Transition::Advance { wrapped: next == 0 })
}

/// Process-scoped failover state, one entry per logical-playback key
pub struct FailoverManager {
    config: FailoverConfig,
    states: DashMap<PlaybackKey, Serving>,
}

impl FailoverManager {
    pub fn new(config: FailoverConfig) -> Self {
        Self {
            config,
            states: DashMap::new(),
        }
    }

    pub fn config(&self) -> &FailoverConfig {
        &self.config
    }

    /// Index to serve for `key` out of `total` ranked candidates
    pub fn next_index(
        &self,
        key: &PlaybackKey,
        requested: Option<usize>,
        total: usize,
        now: Instant,
    ) -> usize {
        let requested = requested.unwrap_or(0);

        if !self.config.enabled_for(key.kind) {
            return requested;
        }
        if total <= 1 {
            return 0;
        }

        let windows = FailoverWindows::from(&self.config);

        // The entry guard holds the shard lock for the whole read-modify-write
        let entry = self.states.entry(key.clone());
        let state = match &entry {
            Entry::Occupied(occupied) => FailoverState::Serving(*occupied.get()),
            Entry::Vacant(_) => FailoverState::Fresh,
        };
        let (next, step) = transition(windows, state, requested, total, now);
        drop(entry.insert(next));

        match step {
            Transition::Start => debug!("Failover {}: serving index {}", key, next.index),
            Transition::Hold => debug!(
                "Failover {}: within grace period, keeping index {} (attempt {})",
                key, next.index, next.attempt_count
            ),
            Transition::Reset => debug!(
                "Failover {}: reset window elapsed, back to index {}",
                key, next.index
            ),
            Transition::Advance { wrapped: false } => debug!(
                "Failover {}: grace period expired, advancing to index {} of {}",
                key, next.index, total
            ),
            Transition::Advance { wrapped: true } => warn!(
                "Failover {}: all {} candidates exhausted, wrapping to index 0",
                key, total
            ),
        }

        next.index
    }

    /// Current state of `key`
    pub fn state(&self, key: &PlaybackKey) -> FailoverState {
        self.states
            .get(key)
            .map(|entry| FailoverState::Serving(*entry))
            .unwrap_or(FailoverState::Fresh)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Drop entries idle for longer than the reset window
    ///
    /// Such entries would be reset on their next request anyway, so
    /// reaping never changes a decision.
    pub fn reap_expired(&self, now: Instant) -> usize {
        let reset_window = self.config.reset_window;
        let before = self.states.len();
        self.states.retain(|_, serving| {
            now.saturating_duration_since(serving.last_attempt) <= reset_window
        });
        let reaped = before.saturating_sub(self.states.len());
        if reaped > 0 {
            debug!("Reaped {} idle failover entries", reaped);
        }
        reaped
    }

    /// Reap on `reap_interval` until `cancel` fires
    pub fn spawn_reaper(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let period = self.config.reap_interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("Starting failover reaper with interval: {:?}", period);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Failover reaper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        manager.reap_expired(Instant::now());
                    }
                }
            }
        })
    }
}
