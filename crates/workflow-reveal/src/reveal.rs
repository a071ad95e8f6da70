//! Fixed-cadence reveal of queued chunks.
//!
//! The scheduler is a plain state machine over a queue; it owns no timer.
//! The session loop sleeps until [`RevealScheduler::deadline`] and then calls
//! [`RevealScheduler::tick`], so at most one drain loop exists per session.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Default delay between two revealed chunks.
pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_millis(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainState {
    Idle,
    /// A tick is due at the contained instant.
    Draining { next_tick: Instant },
}

#[derive(Debug)]
pub struct RevealScheduler {
    interval: Duration,
    queue: VecDeque<String>,
    state: DrainState,
}

impl RevealScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            queue: VecDeque::new(),
            state: DrainState::Idle,
        }
    }

    pub fn state(&self) -> DrainState {
        self.state
    }

    pub fn is_draining(&self) -> bool {
        matches!(self.state, DrainState::Draining { .. })
    }

    /// Chunks waiting to be revealed.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Queues chunks. Starts draining when idle; an active drain keeps its
    /// current schedule.
    pub fn enqueue<I>(&mut self, chunks: I, now: Instant)
    where
        I: IntoIterator<Item = String>,
    {
        self.queue.extend(chunks);
        if self.state == DrainState::Idle && !self.queue.is_empty() {
            self.state = DrainState::Draining {
                next_tick: now + self.interval,
            };
        }
    }

    /// When the next tick is due, if draining.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            DrainState::Idle => None,
            DrainState::Draining { next_tick } => Some(next_tick),
        }
    }

    /// Runs one tick: releases exactly one chunk and schedules the next tick,
    /// or goes idle when the queue is empty.
    pub fn tick(&mut self, now: Instant) -> Option<String> {
        match self.queue.pop_front() {
            Some(chunk) => {
                self.state = DrainState::Draining {
                    next_tick: now + self.interval,
                };
                Some(chunk)
            }
            None => {
                self.state = DrainState::Idle;
                None
            }
        }
    }

    /// Drops every pending chunk and goes idle.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.state = DrainState::Idle;
    }
}
