use std::time::Duration;

use tracing::{debug, info};

use crate::collaborators::ActorLocator;
use crate::slot::RoomSlot;
use crate::window::RoomWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorOutcome {
    Waiting,
    ActorUnavailable,
    NoSlots,
    Unchanged { sequence: i64 },
    Transition { previous: i64, next: i64 },
}

/// Samples the actor on a fixed wall-clock interval and reports when the
/// nearest slot changes. Activations that are not due are skipped, never queued.
#[derive(Debug, Clone)]
pub struct TransitionDetector {
    interval: Duration,
    elapsed: Duration,
    actor_missing: bool,
}

impl TransitionDetector {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            elapsed: Duration::ZERO,
            actor_missing: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
        self.actor_missing = false;
    }

    pub fn advance(&mut self, dt: Duration) -> bool {
        self.elapsed = self.elapsed.saturating_add(dt);
        if self.elapsed < self.interval {
            return false;
        }
        self.elapsed = Duration::ZERO;
        true
    }

    pub fn sample<H, A>(&mut self, window: &RoomWindow<H>, actor: &A) -> DetectorOutcome
    where
        A: ActorLocator + ?Sized,
    {
        let Some(actor_position) = actor.current_position() else {
            if !self.actor_missing {
                debug!("actor_unavailable");
                self.actor_missing = true;
            }
            return DetectorOutcome::ActorUnavailable;
        };
        if self.actor_missing {
            info!(actor_position, "actor_available");
            self.actor_missing = false;
        }

        let Some(nearest) = nearest_slot_sequence(window.slots(), actor_position) else {
            return DetectorOutcome::NoSlots;
        };
        if nearest == window.tracked_sequence() || nearest == window.last_handled_sequence() {
            return DetectorOutcome::Unchanged { sequence: nearest };
        }
        DetectorOutcome::Transition {
            previous: window.tracked_sequence(),
            next: nearest,
        }
    }

    pub fn poll<H, A>(&mut self, dt: Duration, window: &RoomWindow<H>, actor: &A) -> DetectorOutcome
    where
        A: ActorLocator + ?Sized,
    {
        if !self.advance(dt) {
            return DetectorOutcome::Waiting;
        }
        self.sample(window, actor)
    }
}

/// Slot whose position is closest to `actor_position`; ties go to the lower sequence.
pub fn nearest_slot_sequence<H>(slots: &[RoomSlot<H>], actor_position: f32) -> Option<i64> {
    let mut best: Option<(f32, i64)> = None;
    for slot in slots {
        let distance = (slot.position() - actor_position).abs();
        let better = match best {
            None => true,
            Some((best_distance, best_sequence)) => {
                distance < best_distance
                    || (distance == best_distance && slot.sequence() < best_sequence)
            }
        };
        if better {
            best = Some((distance, slot.sequence()));
        }
    }
    best.map(|(_, sequence)| sequence)
}
