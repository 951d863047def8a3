use std::fmt;
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BugUnitId(pub u64);

impl fmt::Display for BugUnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bug#{}", self.0)
    }
}

/// A fixable entity owned by the host. The room system only ever observes it.
pub trait BugUnit {
    fn id(&self) -> BugUnitId;
    fn is_active(&self) -> bool;
    fn is_being_fixed(&self) -> bool;
    fn kind(&self) -> &str;
    /// Hosts that keep a destroyed unit allocated report `false` here.
    fn is_alive(&self) -> bool {
        true
    }
}

#[derive(Clone)]
pub struct BugUnitRef {
    id: BugUnitId,
    unit: Weak<dyn BugUnit>,
}

impl BugUnitRef {
    pub fn new<B: BugUnit + 'static>(unit: &Rc<B>) -> Self {
        let weak: Weak<B> = Rc::downgrade(unit);
        Self {
            id: unit.id(),
            unit: weak,
        }
    }

    pub fn id(&self) -> BugUnitId {
        self.id
    }

    pub fn live(&self) -> Option<Rc<dyn BugUnit>> {
        self.unit.upgrade().filter(|unit| unit.is_alive())
    }

    pub fn is_live(&self) -> bool {
        self.live().is_some()
    }
}

impl fmt::Debug for BugUnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BugUnitRef")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomPlacement {
    pub sequence: i64,
    pub variant_index: usize,
    pub position: f32,
}

#[derive(Debug)]
pub struct VisualInstance<H> {
    pub handle: H,
    pub bug_units: Vec<BugUnitRef>,
}

pub trait VisualFactory {
    type Handle;

    fn create(&mut self, placement: RoomPlacement) -> Option<VisualInstance<Self::Handle>>;

    fn reposition(
        &mut self,
        handle: &mut Self::Handle,
        placement: RoomPlacement,
    ) -> Vec<BugUnitRef>;

    fn destroy(&mut self, handle: Self::Handle);
}

pub trait ActorLocator {
    fn current_position(&self) -> Option<f32>;
}

impl<F: Fn() -> Option<f32>> ActorLocator for F {
    fn current_position(&self) -> Option<f32> {
        self()
    }
}
