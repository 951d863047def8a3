use tracing::{debug, info, warn};

use crate::collaborators::BugUnitId;
use crate::ledger::BugLedger;
use crate::slot::SlotFixResult;
use crate::window::RoomWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionEvent {
    pub total_fixed: u32,
    pub total_discovered: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixOutcome {
    Ignored,
    Orphaned,
    AlreadyCounted {
        sequence: i64,
    },
    Counted {
        sequence: i64,
        slot_fixed: u32,
        slot_discovered: u32,
        completed: bool,
    },
}

type CompletionObserver = Box<dyn FnMut(CompletionEvent)>;

/// Attributes bug-fix notifications to their owning slot and raises the
/// completion signal once per crossing of `total_fixed >= total_discovered`.
#[derive(Default)]
pub struct CompletionMonitor {
    observers: Vec<(ObserverId, CompletionObserver)>,
    next_observer_id: u64,
    completed: bool,
    completion_count: u32,
    orphaned_count: u32,
}

impl std::fmt::Debug for CompletionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionMonitor")
            .field("observer_count", &self.observers.len())
            .field("completed", &self.completed)
            .field("completion_count", &self.completion_count)
            .field("orphaned_count", &self.orphaned_count)
            .finish()
    }
}

impl CompletionMonitor {
    pub fn subscribe(&mut self, observer: impl FnMut(CompletionEvent) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id = self.next_observer_id.saturating_add(1);
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    pub fn clear_observers(&mut self) {
        self.observers.clear();
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn completion_count(&self) -> u32 {
        self.completion_count
    }

    pub fn orphaned_count(&self) -> u32 {
        self.orphaned_count
    }

    pub fn reset(&mut self) {
        self.completed = false;
        self.completion_count = 0;
        self.orphaned_count = 0;
    }

    pub fn on_bug_fixed<H>(
        &mut self,
        id: BugUnitId,
        window: &mut RoomWindow<H>,
        ledger: &mut BugLedger,
    ) -> FixOutcome {
        let Some(slot) = window.slot_owning_mut(id) else {
            self.orphaned_count = self.orphaned_count.saturating_add(1);
            warn!(bug = %id, "bug_fix_orphaned");
            return FixOutcome::Orphaned;
        };

        let sequence = slot.sequence();
        let kind = slot
            .bug_unit_refs()
            .find(|unit| unit.id() == id)
            .and_then(|unit| unit.live())
            .map(|unit| unit.kind().to_string());
        match slot.record_fix(id) {
            SlotFixResult::Counted => {}
            SlotFixResult::AlreadyCounted => {
                debug!(bug = %id, sequence, "bug_fix_already_counted");
                let _ = self.evaluate(ledger);
                return FixOutcome::AlreadyCounted { sequence };
            }
            SlotFixResult::NotOwned => {
                self.orphaned_count = self.orphaned_count.saturating_add(1);
                warn!(bug = %id, "bug_fix_orphaned");
                return FixOutcome::Orphaned;
            }
        }
        let slot_fixed = slot.fixed_count();
        let slot_discovered = slot.discovered_count();
        let _ = ledger.record_fixed(id);
        debug!(
            bug = %id,
            kind = kind.as_deref().unwrap_or("unknown"),
            sequence,
            slot_fixed,
            slot_discovered,
            total_fixed = ledger.total_fixed(),
            total_discovered = ledger.total_discovered(),
            "bug_fixed"
        );

        let completed = self.evaluate(ledger);
        FixOutcome::Counted {
            sequence,
            slot_fixed,
            slot_discovered,
            completed,
        }
    }

    /// Re-arms when the ledger drops back below completion.
    pub fn evaluate(&mut self, ledger: &BugLedger) -> bool {
        if !ledger.is_complete() {
            if self.completed {
                debug!(remaining = ledger.remaining(), "completion_rearmed");
                self.completed = false;
            }
            return false;
        }
        if self.completed {
            return false;
        }

        self.completed = true;
        self.completion_count = self.completion_count.saturating_add(1);
        let event = CompletionEvent {
            total_fixed: ledger.total_fixed(),
            total_discovered: ledger.total_discovered(),
        };
        info!(
            total_fixed = event.total_fixed,
            total_discovered = event.total_discovered,
            observer_count = self.observers.len(),
            "room_stream_completed"
        );
        for (_, observer) in &mut self.observers {
            observer(event);
        }
        true
    }
}
