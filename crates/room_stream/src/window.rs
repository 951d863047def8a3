use serde::Serialize;
use tracing::{info, warn};

use crate::collaborators::{BugUnitId, RoomPlacement, VisualFactory};
use crate::config::{ConfigError, StreamConfig};
use crate::ledger::BugLedger;
use crate::slot::RoomSlot;
use crate::variant::VariantMapper;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlotSnapshot {
    pub sequence: i64,
    pub variant_index: usize,
    pub position: f32,
    pub discovered: u32,
    pub fixed: u32,
}

pub fn initial_sequence(actor_position: f32, spacing: f32) -> i64 {
    (actor_position / spacing).round() as i64
}

#[derive(Debug)]
pub struct RoomWindow<H> {
    slots: Vec<RoomSlot<H>>,
    window_size: usize,
    spacing: f32,
    pub(crate) boundary_threshold: i64,
    mapper: VariantMapper,
    pub(crate) tracked_sequence: i64,
    pub(crate) last_handled_sequence: i64,
}

impl<H> RoomWindow<H> {
    pub fn initialize<F>(
        config: &StreamConfig,
        actor_position: f32,
        factory: &mut F,
        ledger: &mut BugLedger,
    ) -> Result<Self, ConfigError>
    where
        F: VisualFactory<Handle = H>,
    {
        config.validate()?;
        let mapper = VariantMapper::new(config.variant_count())?;
        let initial = initial_sequence(actor_position, config.spacing);
        let lo = initial.saturating_sub(config.center_offset as i64);
        let hi_exclusive = lo.saturating_add(config.window_size as i64);

        let mut window = Self {
            slots: Vec::with_capacity(config.window_size),
            window_size: config.window_size,
            spacing: config.spacing,
            boundary_threshold: i64::from(config.boundary_threshold),
            mapper,
            tracked_sequence: initial,
            last_handled_sequence: initial,
        };

        for sequence in lo..hi_exclusive {
            let placement = window.placement_for(sequence);
            let Some(instance) = factory.create(placement) else {
                warn!(
                    sequence,
                    variant_index = placement.variant_index,
                    "visual_create_failed"
                );
                continue;
            };
            let slot = RoomSlot::new(placement, instance.handle, instance.bug_units);
            record_slot_in_ledger(&slot, ledger);
            window.slots.push(slot);
        }

        info!(
            initial_sequence = initial,
            lo,
            slot_count = window.slots.len(),
            window_size = window.window_size,
            bugs_discovered = ledger.total_discovered(),
            "room_window_initialized"
        );
        if !window.is_contiguous() {
            warn!(
                slot_count = window.slots.len(),
                window_size = window.window_size,
                "window_non_contiguous"
            );
        }
        Ok(window)
    }

    pub fn placement_for(&self, sequence: i64) -> RoomPlacement {
        RoomPlacement {
            sequence,
            variant_index: self.mapper.variant_index(sequence),
            position: sequence as f32 * self.spacing,
        }
    }

    pub fn slots(&self) -> &[RoomSlot<H>] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn tracked_sequence(&self) -> i64 {
        self.tracked_sequence
    }

    pub fn last_handled_sequence(&self) -> i64 {
        self.last_handled_sequence
    }

    pub fn slot(&self, sequence: i64) -> Option<&RoomSlot<H>> {
        self.slots.iter().find(|slot| slot.sequence() == sequence)
    }

    pub(crate) fn slot_mut(&mut self, sequence: i64) -> Option<&mut RoomSlot<H>> {
        self.slots.iter_mut().find(|slot| slot.sequence() == sequence)
    }

    pub(crate) fn slot_owning_mut(&mut self, id: BugUnitId) -> Option<&mut RoomSlot<H>> {
        self.slots.iter_mut().find(|slot| slot.owns(id))
    }

    pub(crate) fn push_slot(&mut self, slot: RoomSlot<H>) {
        self.slots.push(slot);
    }

    pub fn sequence_range(&self) -> Option<(i64, i64)> {
        let lo = self.slots.iter().map(RoomSlot::sequence).min()?;
        let hi = self.slots.iter().map(RoomSlot::sequence).max()?;
        Some((lo, hi))
    }

    pub fn covers(&self, sequence: i64) -> bool {
        self.sequence_range()
            .is_some_and(|(lo, hi)| lo <= sequence && sequence <= hi)
    }

    pub fn is_contiguous(&self) -> bool {
        if self.slots.len() != self.window_size {
            return false;
        }
        let mut sequences: Vec<i64> = self.slots.iter().map(RoomSlot::sequence).collect();
        sequences.sort_unstable();
        sequences.windows(2).all(|pair| pair[1] == pair[0] + 1)
    }

    pub fn snapshot(&self) -> Vec<SlotSnapshot> {
        let mut snapshot: Vec<SlotSnapshot> = self
            .slots
            .iter()
            .map(|slot| SlotSnapshot {
                sequence: slot.sequence(),
                variant_index: slot.variant_index(),
                position: slot.position(),
                discovered: slot.discovered_count(),
                fixed: slot.fixed_count(),
            })
            .collect();
        snapshot.sort_by_key(|entry| entry.sequence);
        snapshot
    }

    /// Full resync: re-queries every active slot and rebuilds the ledger from
    /// the current window contents only.
    pub fn rescan_all(&mut self, ledger: &mut BugLedger) {
        ledger.clear();
        for slot in &mut self.slots {
            slot.rescan();
            record_slot_in_ledger(slot, ledger);
        }
        info!(
            slot_count = self.slots.len(),
            total_discovered = ledger.total_discovered(),
            total_fixed = ledger.total_fixed(),
            "room_window_rescanned"
        );
    }

    pub fn teardown<F>(self, factory: &mut F)
    where
        F: VisualFactory<Handle = H>,
    {
        let slot_count = self.slots.len();
        for slot in self.slots {
            factory.destroy(slot.into_visual());
        }
        info!(slot_count, "room_window_torn_down");
    }
}

pub(crate) fn record_slot_in_ledger<H>(slot: &RoomSlot<H>, ledger: &mut BugLedger) {
    for (id, fixed) in slot.bug_states() {
        let _ = ledger.record_discovered(id, slot.sequence(), fixed);
    }
}
