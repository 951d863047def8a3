use std::rc::Rc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collaborators::{ActorLocator, BugUnit, BugUnitId, VisualFactory};
use crate::completion::{CompletionEvent, CompletionMonitor, FixOutcome, ObserverId};
use crate::config::{ConfigError, StreamConfig};
use crate::detector::{DetectorOutcome, TransitionDetector};
use crate::ledger::BugLedger;
use crate::recycler::RecycleOutcome;
use crate::window::{RoomWindow, SlotSnapshot};

#[derive(Debug, Error)]
pub enum InitError {
    #[error("invalid room stream configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("no actor position is available; cannot place the initial window")]
    ActorUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub detector: DetectorOutcome,
    pub recycle: Option<RecycleOutcome>,
}

/// Until [`RoomStreamer::initialize`] succeeds every query returns an empty or
/// zero default and every notification is ignored.
pub struct RoomStreamer<F: VisualFactory, A> {
    config: StreamConfig,
    factory: F,
    actor: A,
    window: Option<RoomWindow<F::Handle>>,
    detector: TransitionDetector,
    ledger: BugLedger,
    monitor: CompletionMonitor,
}

impl<F, A> RoomStreamer<F, A>
where
    F: VisualFactory,
    A: ActorLocator,
{
    pub fn new(config: StreamConfig, factory: F, actor: A) -> Self {
        let detector = TransitionDetector::new(config.detection_interval);
        Self {
            config,
            factory,
            actor,
            window: None,
            detector,
            ledger: BugLedger::default(),
            monitor: CompletionMonitor::default(),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    pub fn actor(&self) -> &A {
        &self.actor
    }

    pub fn window(&self) -> Option<&RoomWindow<F::Handle>> {
        self.window.as_ref()
    }

    pub fn ledger(&self) -> &BugLedger {
        &self.ledger
    }

    pub fn is_initialized(&self) -> bool {
        self.window.is_some()
    }

    /// Builds the window around the actor's current position. Calling this
    /// again is a full re-initialization: visuals are rebuilt and the ledger
    /// is reset, completion observers are kept.
    pub fn initialize(&mut self) -> Result<(), InitError> {
        self.config.validate()?;
        let actor_position = self
            .actor
            .current_position()
            .ok_or(InitError::ActorUnavailable)?;

        self.release_window();
        self.ledger.clear();
        self.monitor.reset();
        self.detector = TransitionDetector::new(self.config.detection_interval);

        let window = RoomWindow::initialize(
            &self.config,
            actor_position,
            &mut self.factory,
            &mut self.ledger,
        )?;
        info!(
            actor_position,
            current_sequence = window.tracked_sequence(),
            slot_count = window.len(),
            "room_stream_initialized"
        );
        self.window = Some(window);
        let _ = self.monitor.evaluate(&self.ledger);
        Ok(())
    }

    pub fn update(&mut self, dt: Duration) -> TickReport {
        let Some(window) = self.window.as_mut() else {
            return TickReport {
                detector: DetectorOutcome::NoSlots,
                recycle: None,
            };
        };
        let detector = self.detector.poll(dt, window, &self.actor);
        let recycle = match detector {
            DetectorOutcome::Transition { next, .. } => Some(window.on_actor_entered_slot(
                next,
                &mut self.factory,
                &mut self.ledger,
            )),
            _ => None,
        };
        if recycle.is_some() {
            let _ = self.monitor.evaluate(&self.ledger);
        }
        TickReport { detector, recycle }
    }

    pub fn on_actor_entered_slot(&mut self, sequence: i64) -> RecycleOutcome {
        let Some(window) = self.window.as_mut() else {
            debug!(sequence, "actor_entered_slot_before_initialize");
            return RecycleOutcome::Uninitialized;
        };
        let outcome = window.on_actor_entered_slot(sequence, &mut self.factory, &mut self.ledger);
        let _ = self.monitor.evaluate(&self.ledger);
        outcome
    }

    pub fn notify_bug_fixed(&mut self, id: BugUnitId) -> FixOutcome {
        let Some(window) = self.window.as_mut() else {
            debug!(bug = %id, "bug_fix_before_initialize");
            return FixOutcome::Ignored;
        };
        self.monitor.on_bug_fixed(id, window, &mut self.ledger)
    }

    pub fn current_sequence(&self) -> i64 {
        self.window
            .as_ref()
            .map(RoomWindow::tracked_sequence)
            .unwrap_or_default()
    }

    /// `(fixed, total)` over every bug unit discovered since initialization.
    pub fn global_bug_stats(&self) -> (u32, u32) {
        (self.ledger.total_fixed(), self.ledger.total_discovered())
    }

    pub fn remaining_bugs(&self) -> u32 {
        self.ledger.remaining()
    }

    pub fn bugs_in_slot(&self, sequence: i64) -> Vec<Rc<dyn BugUnit>> {
        self.window
            .as_ref()
            .and_then(|window| window.slot(sequence))
            .map(|slot| slot.live_bug_units())
            .unwrap_or_default()
    }

    pub fn slot_bug_stats(&self, sequence: i64) -> Option<(u32, u32)> {
        let slot = self.window.as_ref()?.slot(sequence)?;
        Some((slot.fixed_count(), slot.discovered_count()))
    }

    pub fn has_unfixed_bugs_in_current_slot(&self) -> bool {
        self.window
            .as_ref()
            .and_then(|window| window.slot(window.tracked_sequence()))
            .is_some_and(|slot| slot.has_unfixed_bugs())
    }

    pub fn rescan_all(&mut self) {
        let Some(window) = self.window.as_mut() else {
            return;
        };
        window.rescan_all(&mut self.ledger);
        let _ = self.monitor.evaluate(&self.ledger);
    }

    pub fn window_snapshot(&self) -> Vec<SlotSnapshot> {
        self.window
            .as_ref()
            .map(RoomWindow::snapshot)
            .unwrap_or_default()
    }

    pub fn subscribe_completion(
        &mut self,
        observer: impl FnMut(CompletionEvent) + 'static,
    ) -> ObserverId {
        self.monitor.subscribe(observer)
    }

    pub fn unsubscribe_completion(&mut self, id: ObserverId) -> bool {
        self.monitor.unsubscribe(id)
    }

    pub fn is_completed(&self) -> bool {
        self.monitor.is_completed()
    }

    pub fn completion_count(&self) -> u32 {
        self.monitor.completion_count()
    }

    pub fn orphaned_fix_count(&self) -> u32 {
        self.monitor.orphaned_count()
    }

    pub fn teardown(&mut self) {
        if self.window.is_none() && self.monitor.observer_count() == 0 {
            return;
        }
        self.release_window();
        self.monitor.clear_observers();
        self.monitor.reset();
        self.ledger.clear();
        self.detector.reset();
    }

    fn release_window(&mut self) {
        if let Some(window) = self.window.take() {
            if !window.is_contiguous() {
                warn!(
                    slot_count = window.len(),
                    window_size = window.window_size(),
                    "releasing_degraded_window"
                );
            }
            window.teardown(&mut self.factory);
        }
    }
}
