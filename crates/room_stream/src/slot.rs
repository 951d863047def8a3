use std::rc::Rc;

use crate::collaborators::{BugUnit, BugUnitId, BugUnitRef, RoomPlacement};

#[derive(Debug, Clone)]
struct TrackedBug {
    unit: BugUnitRef,
    counted_fixed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotFixResult {
    Counted,
    AlreadyCounted,
    NotOwned,
}

#[derive(Debug)]
pub struct RoomSlot<H> {
    sequence: i64,
    variant_index: usize,
    position: f32,
    visual: H,
    bugs: Vec<TrackedBug>,
    discovered_count: u32,
    fixed_count: u32,
}

impl<H> RoomSlot<H> {
    pub(crate) fn new(placement: RoomPlacement, visual: H, bug_units: Vec<BugUnitRef>) -> Self {
        let mut slot = Self {
            sequence: placement.sequence,
            variant_index: placement.variant_index,
            position: placement.position,
            visual,
            bugs: Vec::new(),
            discovered_count: 0,
            fixed_count: 0,
        };
        slot.scan(bug_units);
        slot
    }

    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    pub fn variant_index(&self) -> usize {
        self.variant_index
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn placement(&self) -> RoomPlacement {
        RoomPlacement {
            sequence: self.sequence,
            variant_index: self.variant_index,
            position: self.position,
        }
    }

    pub fn visual(&self) -> &H {
        &self.visual
    }

    pub(crate) fn visual_mut(&mut self) -> &mut H {
        &mut self.visual
    }

    pub(crate) fn into_visual(self) -> H {
        self.visual
    }

    pub fn discovered_count(&self) -> u32 {
        self.discovered_count
    }

    pub fn fixed_count(&self) -> u32 {
        self.fixed_count
    }

    pub fn has_unfixed_bugs(&self) -> bool {
        self.fixed_count < self.discovered_count
    }

    pub fn is_fully_fixed(&self) -> bool {
        self.discovered_count > 0 && self.fixed_count >= self.discovered_count
    }

    pub(crate) fn retarget(&mut self, placement: RoomPlacement, bug_units: Vec<BugUnitRef>) {
        self.sequence = placement.sequence;
        self.variant_index = placement.variant_index;
        self.position = placement.position;
        self.scan(bug_units);
    }

    /// Units that already report themselves inactive or mid-fix are counted fixed.
    pub(crate) fn scan(&mut self, bug_units: Vec<BugUnitRef>) {
        self.bugs.clear();
        self.discovered_count = 0;
        self.fixed_count = 0;
        for unit in bug_units {
            let Some(live) = unit.live() else {
                continue;
            };
            if self.bugs.iter().any(|bug| bug.unit.id() == unit.id()) {
                continue;
            }
            let counted_fixed = !live.is_active() || live.is_being_fixed();
            self.discovered_count = self.discovered_count.saturating_add(1);
            if counted_fixed {
                self.fixed_count = self.fixed_count.saturating_add(1);
            }
            self.bugs.push(TrackedBug {
                unit,
                counted_fixed,
            });
        }
    }

    /// A unit counted fixed stays counted even after the host despawns it.
    pub(crate) fn rescan(&mut self) {
        let previous = std::mem::take(&mut self.bugs);
        self.discovered_count = 0;
        self.fixed_count = 0;
        for bug in previous {
            let live = bug.unit.live();
            if live.is_none() && !bug.counted_fixed {
                continue;
            }
            let counted_fixed = bug.counted_fixed
                || live.is_some_and(|unit| !unit.is_active() || unit.is_being_fixed());
            self.discovered_count = self.discovered_count.saturating_add(1);
            if counted_fixed {
                self.fixed_count = self.fixed_count.saturating_add(1);
            }
            self.bugs.push(TrackedBug {
                unit: bug.unit,
                counted_fixed,
            });
        }
    }

    pub fn owns(&self, id: BugUnitId) -> bool {
        self.bugs.iter().any(|bug| bug.unit.id() == id)
    }

    pub(crate) fn record_fix(&mut self, id: BugUnitId) -> SlotFixResult {
        let Some(bug) = self.bugs.iter_mut().find(|bug| bug.unit.id() == id) else {
            return SlotFixResult::NotOwned;
        };
        if bug.counted_fixed {
            return SlotFixResult::AlreadyCounted;
        }
        bug.counted_fixed = true;
        self.fixed_count = self.fixed_count.saturating_add(1).min(self.discovered_count);
        SlotFixResult::Counted
    }

    pub fn bug_unit_refs(&self) -> impl Iterator<Item = &BugUnitRef> + '_ {
        self.bugs.iter().map(|bug| &bug.unit)
    }

    pub(crate) fn bug_states(&self) -> impl Iterator<Item = (BugUnitId, bool)> + '_ {
        self.bugs
            .iter()
            .map(|bug| (bug.unit.id(), bug.counted_fixed))
    }

    pub fn live_bug_units(&self) -> Vec<Rc<dyn BugUnit>> {
        self.bugs.iter().filter_map(|bug| bug.unit.live()).collect()
    }
}
