use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use room_stream::{
    ActorLocator, BugUnit, BugUnitId, BugUnitRef, RoomPlacement, RoomVariant, VisualFactory,
    VisualInstance,
};
use tracing::debug;

/// Variants whose name starts with this prefix cannot be materialized.
const MISSING_VARIANT_PREFIX: &str = "missing.";
const BUG_KINDS: [&str; 3] = ["loose_wire", "dead_pixel", "stuck_door"];

#[derive(Debug)]
pub(crate) struct SimBug {
    id: BugUnitId,
    kind: &'static str,
    active: Cell<bool>,
    being_fixed: Cell<bool>,
}

impl SimBug {
    pub(crate) fn start_fix(&self) {
        self.being_fixed.set(true);
    }

    pub(crate) fn finish_fix(&self) {
        self.being_fixed.set(false);
        self.active.set(false);
    }
}

impl BugUnit for SimBug {
    fn id(&self) -> BugUnitId {
        self.id
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn is_being_fixed(&self) -> bool {
        self.being_fixed.get()
    }

    fn kind(&self) -> &str {
        self.kind
    }
}

#[derive(Debug)]
pub(crate) struct SimVisual {
    id: u64,
    variant: String,
    position: f32,
}

/// Stand-in for a scene graph: owns the bug units inside each live visual
/// and destroys them when the visual is re-skinned or destroyed.
#[derive(Debug)]
pub(crate) struct SimVisualFactory {
    variants: Vec<RoomVariant>,
    next_visual_id: u64,
    next_bug_id: u64,
    bugs_by_visual: HashMap<u64, Vec<Rc<SimBug>>>,
    bugs_by_id: BTreeMap<BugUnitId, u64>,
    created: u32,
    repositioned: u32,
    destroyed: u32,
}

impl SimVisualFactory {
    pub(crate) fn new(variants: Vec<RoomVariant>) -> Self {
        Self {
            variants,
            next_visual_id: 0,
            next_bug_id: 0,
            bugs_by_visual: HashMap::new(),
            bugs_by_id: BTreeMap::new(),
            created: 0,
            repositioned: 0,
            destroyed: 0,
        }
    }

    pub(crate) fn bug(&self, id: BugUnitId) -> Option<Rc<SimBug>> {
        let visual_id = self.bugs_by_id.get(&id)?;
        self.bugs_by_visual
            .get(visual_id)?
            .iter()
            .find(|bug| bug.id == id)
            .cloned()
    }

    pub(crate) fn counters(&self) -> (u32, u32, u32) {
        (self.created, self.repositioned, self.destroyed)
    }

    fn bug_count_for(placement: RoomPlacement) -> u64 {
        (placement.variant_index as u64 + placement.sequence.unsigned_abs()) % 4
    }

    fn populate(&mut self, visual_id: u64, placement: RoomPlacement) -> Vec<BugUnitRef> {
        self.discard_bugs(visual_id);
        let mut bugs = Vec::new();
        for _ in 0..Self::bug_count_for(placement) {
            let id = BugUnitId(self.next_bug_id);
            self.next_bug_id = self.next_bug_id.saturating_add(1);
            let kind = BUG_KINDS[(id.0 % BUG_KINDS.len() as u64) as usize];
            bugs.push(Rc::new(SimBug {
                id,
                kind,
                active: Cell::new(true),
                being_fixed: Cell::new(false),
            }));
            let _ = self.bugs_by_id.insert(id, visual_id);
        }
        let refs = bugs.iter().map(BugUnitRef::new).collect();
        let _ = self.bugs_by_visual.insert(visual_id, bugs);
        refs
    }

    fn discard_bugs(&mut self, visual_id: u64) {
        if let Some(bugs) = self.bugs_by_visual.remove(&visual_id) {
            for bug in bugs {
                let _ = self.bugs_by_id.remove(&bug.id);
            }
        }
    }

    fn variant_name(&self, placement: RoomPlacement) -> Option<&str> {
        self.variants
            .get(placement.variant_index)
            .map(|variant| variant.name.as_str())
    }
}

impl VisualFactory for SimVisualFactory {
    type Handle = SimVisual;

    fn create(&mut self, placement: RoomPlacement) -> Option<VisualInstance<SimVisual>> {
        let variant = self.variant_name(placement)?;
        if variant.starts_with(MISSING_VARIANT_PREFIX) {
            return None;
        }
        let variant = variant.to_string();
        let id = self.next_visual_id;
        self.next_visual_id = self.next_visual_id.saturating_add(1);
        self.created = self.created.saturating_add(1);
        let bug_units = self.populate(id, placement);
        debug!(
            visual = id,
            variant = variant.as_str(),
            position = placement.position,
            bugs = bug_units.len(),
            "visual_created"
        );
        Some(VisualInstance {
            handle: SimVisual {
                id,
                variant,
                position: placement.position,
            },
            bug_units,
        })
    }

    fn reposition(&mut self, handle: &mut SimVisual, placement: RoomPlacement) -> Vec<BugUnitRef> {
        if let Some(variant) = self.variant_name(placement) {
            handle.variant = variant.to_string();
        }
        handle.position = placement.position;
        self.repositioned = self.repositioned.saturating_add(1);
        let bug_units = self.populate(handle.id, placement);
        debug!(
            visual = handle.id,
            variant = handle.variant.as_str(),
            position = handle.position,
            bugs = bug_units.len(),
            "visual_repositioned"
        );
        bug_units
    }

    fn destroy(&mut self, handle: SimVisual) {
        self.discard_bugs(handle.id);
        self.destroyed = self.destroyed.saturating_add(1);
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SimActor {
    position: Rc<Cell<f32>>,
}

impl SimActor {
    pub(crate) fn at(position: f32) -> Self {
        let actor = Self::default();
        actor.position.set(position);
        actor
    }

    pub(crate) fn position(&self) -> f32 {
        self.position.get()
    }

    pub(crate) fn set_position(&self, position: f32) {
        self.position.set(position);
    }
}

impl ActorLocator for SimActor {
    fn current_position(&self) -> Option<f32> {
        Some(self.position.get())
    }
}
