use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::collaborators::{
    ActorLocator, BugUnit, BugUnitId, BugUnitRef, RoomPlacement, VisualFactory, VisualInstance,
};
use crate::config::{RoomVariant, StreamConfig};

pub(crate) fn scenario_config() -> StreamConfig {
    StreamConfig {
        variants: vec![
            RoomVariant::new("room.a"),
            RoomVariant::new("room.b"),
            RoomVariant::new("room.c"),
        ],
        spacing: 20.0,
        window_size: 10,
        center_offset: 4,
        detection_interval: Duration::from_millis(100),
        boundary_threshold: 2,
    }
}

pub(crate) struct TestBug {
    id: u64,
    active: Cell<bool>,
    being_fixed: Cell<bool>,
}

impl TestBug {
    pub(crate) fn fix(&self) {
        self.being_fixed.set(false);
        self.active.set(false);
    }

    pub(crate) fn start_fixing(&self) {
        self.being_fixed.set(true);
    }

    pub(crate) fn bug_id(&self) -> BugUnitId {
        BugUnitId(self.id)
    }
}

impl BugUnit for TestBug {
    fn id(&self) -> BugUnitId {
        BugUnitId(self.id)
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn is_being_fixed(&self) -> bool {
        self.being_fixed.get()
    }

    fn kind(&self) -> &str {
        "test_glitch"
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct TestVisual {
    pub(crate) id: u64,
}

/// In-memory factory. Owns the bug units of every live visual; re-skinning a
/// visual destroys its old units and spawns fresh ones.
#[derive(Default)]
pub(crate) struct TestFactory {
    pub(crate) bugs_per_room: usize,
    pub(crate) fail_sequences: Vec<i64>,
    pub(crate) spawn_mid_fix: bool,
    pub(crate) created: u32,
    pub(crate) repositioned: Vec<(u64, i64)>,
    pub(crate) destroyed: Vec<u64>,
    next_visual_id: u64,
    next_bug_id: u64,
    sequence_by_visual: HashMap<u64, i64>,
    bugs_by_visual: HashMap<u64, Vec<Rc<TestBug>>>,
}

impl TestFactory {
    pub(crate) fn with_bugs_per_room(bugs_per_room: usize) -> Self {
        Self {
            bugs_per_room,
            next_bug_id: 1,
            ..Self::default()
        }
    }

    fn spawn_bugs(&mut self, visual_id: u64) -> Vec<BugUnitRef> {
        let mut bugs = Vec::with_capacity(self.bugs_per_room);
        for _ in 0..self.bugs_per_room {
            bugs.push(Rc::new(TestBug {
                id: self.next_bug_id,
                active: Cell::new(true),
                being_fixed: Cell::new(self.spawn_mid_fix),
            }));
            self.next_bug_id += 1;
        }
        let refs = bugs.iter().map(BugUnitRef::new).collect();
        let _ = self.bugs_by_visual.insert(visual_id, bugs);
        refs
    }

    pub(crate) fn bugs_for_sequence(&self, sequence: i64) -> Vec<Rc<TestBug>> {
        self.sequence_by_visual
            .iter()
            .find(|(_, visual_sequence)| **visual_sequence == sequence)
            .and_then(|(visual_id, _)| self.bugs_by_visual.get(visual_id))
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn despawn_bug(&mut self, id: BugUnitId) -> bool {
        for bugs in self.bugs_by_visual.values_mut() {
            if let Some(index) = bugs.iter().position(|bug| bug.bug_id() == id) {
                let _ = bugs.remove(index);
                return true;
            }
        }
        false
    }

    pub(crate) fn live_visual_count(&self) -> usize {
        self.sequence_by_visual.len()
    }
}

impl VisualFactory for TestFactory {
    type Handle = TestVisual;

    fn create(&mut self, placement: RoomPlacement) -> Option<VisualInstance<TestVisual>> {
        if self.fail_sequences.contains(&placement.sequence) {
            return None;
        }
        let id = self.next_visual_id;
        self.next_visual_id += 1;
        self.created += 1;
        let _ = self.sequence_by_visual.insert(id, placement.sequence);
        let bug_units = self.spawn_bugs(id);
        Some(VisualInstance {
            handle: TestVisual { id },
            bug_units,
        })
    }

    fn reposition(&mut self, handle: &mut TestVisual, placement: RoomPlacement) -> Vec<BugUnitRef> {
        self.repositioned.push((handle.id, placement.sequence));
        let _ = self.sequence_by_visual.insert(handle.id, placement.sequence);
        self.spawn_bugs(handle.id)
    }

    fn destroy(&mut self, handle: TestVisual) {
        let _ = self.sequence_by_visual.remove(&handle.id);
        let _ = self.bugs_by_visual.remove(&handle.id);
        self.destroyed.push(handle.id);
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TestActor {
    position: Rc<Cell<Option<f32>>>,
}

impl TestActor {
    pub(crate) fn at(position: f32) -> Self {
        let actor = Self::default();
        actor.set(Some(position));
        actor
    }

    pub(crate) fn set(&self, position: Option<f32>) {
        self.position.set(position);
    }
}

impl ActorLocator for TestActor {
    fn current_position(&self) -> Option<f32> {
        self.position.get()
    }
}
