use std::cmp::Ordering;

use tracing::{debug, info, warn};

use crate::collaborators::VisualFactory;
use crate::ledger::BugLedger;
use crate::slot::RoomSlot;
use crate::window::{record_slot_in_ledger, RoomWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecyclePlan {
    Hold,
    LeftmostToRight { from: i64, to: i64 },
    RightmostToLeft { from: i64, to: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecycleOutcome {
    Uninitialized,
    Duplicate {
        sequence: i64,
    },
    Tracked {
        previous: i64,
        current: i64,
    },
    Retargeted {
        previous: i64,
        current: i64,
        from: i64,
        to: i64,
    },
}

/// At most one slot moves per call regardless of how far `next` jumped.
pub fn plan_recycle(lo: i64, hi: i64, previous: i64, next: i64, threshold: i64) -> RecyclePlan {
    match next.cmp(&previous) {
        Ordering::Equal => RecyclePlan::Hold,
        Ordering::Greater => {
            if hi.saturating_sub(next) > threshold {
                return RecyclePlan::Hold;
            }
            match hi.checked_add(1) {
                Some(to) => RecyclePlan::LeftmostToRight { from: lo, to },
                None => RecyclePlan::Hold,
            }
        }
        Ordering::Less => {
            if next.saturating_sub(lo) > threshold {
                return RecyclePlan::Hold;
            }
            match lo.checked_sub(1) {
                Some(to) => RecyclePlan::RightmostToLeft { from: hi, to },
                None => RecyclePlan::Hold,
            }
        }
    }
}

impl<H> RoomWindow<H> {
    pub fn on_actor_entered_slot<F>(
        &mut self,
        sequence: i64,
        factory: &mut F,
        ledger: &mut BugLedger,
    ) -> RecycleOutcome
    where
        F: VisualFactory<Handle = H>,
    {
        if sequence == self.last_handled_sequence {
            return RecycleOutcome::Duplicate { sequence };
        }

        let previous = self.tracked_sequence;
        let plan = match self.sequence_range() {
            Some((lo, hi)) => plan_recycle(lo, hi, previous, sequence, self.boundary_threshold),
            None => RecyclePlan::Hold,
        };

        let outcome = match plan {
            RecyclePlan::Hold => {
                debug!(previous, current = sequence, "actor_slot_changed");
                RecycleOutcome::Tracked {
                    previous,
                    current: sequence,
                }
            }
            RecyclePlan::LeftmostToRight { from, to } | RecyclePlan::RightmostToLeft { from, to } => {
                self.retarget_slot(from, to, factory, ledger);
                RecycleOutcome::Retargeted {
                    previous,
                    current: sequence,
                    from,
                    to,
                }
            }
        };

        self.tracked_sequence = sequence;
        self.last_handled_sequence = sequence;
        self.restore_missing_slots(sequence < previous, factory, ledger);

        if !self.covers(sequence) {
            let (lo, hi) = self.sequence_range().unwrap_or((sequence, sequence));
            warn!(sequence, lo, hi, "window_lagging_actor");
        }
        outcome
    }

    /// Retries sequences skipped by a failed `create`: gaps inside the
    /// current range first, then new slots on the side the actor is heading.
    fn restore_missing_slots<F>(
        &mut self,
        heading_left: bool,
        factory: &mut F,
        ledger: &mut BugLedger,
    ) where
        F: VisualFactory<Handle = H>,
    {
        let missing = self.window_size().saturating_sub(self.len());
        if missing == 0 {
            return;
        }
        let Some((lo, hi)) = self.sequence_range() else {
            return;
        };

        let mut candidates: Vec<i64> = (lo..=hi)
            .filter(|sequence| self.slot(*sequence).is_none())
            .collect();
        let mut edge = if heading_left { lo } else { hi };
        while candidates.len() < missing {
            let next = if heading_left {
                edge.checked_sub(1)
            } else {
                edge.checked_add(1)
            };
            let Some(next) = next else {
                break;
            };
            candidates.push(next);
            edge = next;
        }

        for sequence in candidates {
            if self.len() >= self.window_size() {
                break;
            }
            let placement = self.placement_for(sequence);
            let Some(instance) = factory.create(placement) else {
                debug!(sequence, "visual_create_retry_failed");
                continue;
            };
            let slot = RoomSlot::new(placement, instance.handle, instance.bug_units);
            record_slot_in_ledger(&slot, ledger);
            info!(
                sequence,
                discovered = slot.discovered_count(),
                "slot_restored"
            );
            self.push_slot(slot);
        }
    }

    fn retarget_slot<F>(&mut self, from: i64, to: i64, factory: &mut F, ledger: &mut BugLedger)
    where
        F: VisualFactory<Handle = H>,
    {
        let placement = self.placement_for(to);
        let Some(slot) = self.slot_mut(from) else {
            warn!(from, to, "retarget_source_missing");
            return;
        };
        let bug_units = factory.reposition(slot.visual_mut(), placement);
        slot.retarget(placement, bug_units);
        record_slot_in_ledger(slot, ledger);
        info!(
            from,
            to,
            variant_index = placement.variant_index,
            position = placement.position,
            discovered = slot.discovered_count(),
            fixed = slot.fixed_count(),
            "slot_retargeted"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::BugUnit;
    use crate::test_support::{scenario_config, TestFactory, TestVisual};

    fn scenario_window(factory: &mut TestFactory, ledger: &mut BugLedger) -> RoomWindow<TestVisual> {
        RoomWindow::initialize(&scenario_config(), 0.0, factory, ledger).expect("window")
    }

    fn sequences(window: &RoomWindow<TestVisual>) -> Vec<i64> {
        window.snapshot().iter().map(|entry| entry.sequence).collect()
    }

    #[test]
    fn plan_holds_when_far_from_boundary() {
        assert_eq!(plan_recycle(-4, 5, 0, 1, 2), RecyclePlan::Hold);
        assert_eq!(plan_recycle(-4, 5, 1, 2, 2), RecyclePlan::Hold);
        assert_eq!(plan_recycle(-4, 5, 0, -1, 2), RecyclePlan::Hold);
        assert_eq!(plan_recycle(-4, 5, 3, 3, 2), RecyclePlan::Hold);
    }

    #[test]
    fn plan_moves_leftmost_near_right_edge() {
        assert_eq!(
            plan_recycle(-4, 5, 2, 3, 2),
            RecyclePlan::LeftmostToRight { from: -4, to: 6 }
        );
        assert_eq!(
            plan_recycle(-4, 5, 0, 4, 2),
            RecyclePlan::LeftmostToRight { from: -4, to: 6 }
        );
    }

    #[test]
    fn plan_moves_rightmost_near_left_edge() {
        assert_eq!(
            plan_recycle(-4, 5, 0, -2, 2),
            RecyclePlan::RightmostToLeft { from: 5, to: -5 }
        );
    }

    #[test]
    fn plan_moves_one_slot_even_for_large_jumps() {
        assert_eq!(
            plan_recycle(-4, 5, 0, 40, 2),
            RecyclePlan::LeftmostToRight { from: -4, to: 6 }
        );
        assert_eq!(
            plan_recycle(-4, 5, 0, -40, 2),
            RecyclePlan::RightmostToLeft { from: 5, to: -5 }
        );
    }

    #[test]
    fn zero_threshold_only_moves_at_the_edge() {
        assert_eq!(plan_recycle(-4, 5, 3, 4, 0), RecyclePlan::Hold);
        assert_eq!(
            plan_recycle(-4, 5, 4, 5, 0),
            RecyclePlan::LeftmostToRight { from: -4, to: 6 }
        );
    }

    #[test]
    fn plan_does_not_overflow_at_sequence_limits() {
        assert_eq!(
            plan_recycle(i64::MAX - 9, i64::MAX, i64::MAX - 1, i64::MAX, 2),
            RecyclePlan::Hold
        );
        assert_eq!(
            plan_recycle(i64::MIN, i64::MIN + 9, i64::MIN + 1, i64::MIN, 2),
            RecyclePlan::Hold
        );
    }

    #[test]
    fn entering_slot_near_right_edge_recycles_leftmost() {
        let mut factory = TestFactory::with_bugs_per_room(1);
        let mut ledger = BugLedger::default();
        let mut window = scenario_window(&mut factory, &mut ledger);

        let outcome = window.on_actor_entered_slot(4, &mut factory, &mut ledger);

        assert_eq!(
            outcome,
            RecycleOutcome::Retargeted {
                previous: 0,
                current: 4,
                from: -4,
                to: 6,
            }
        );
        assert_eq!(sequences(&window), (-3..=6).collect::<Vec<_>>());
        assert!(window.is_contiguous());
        assert_eq!(window.tracked_sequence(), 4);
        assert_eq!(window.last_handled_sequence(), 4);
        assert_eq!(factory.repositioned.len(), 1);
        assert_eq!(window.slot(6).map(|slot| slot.position()), Some(120.0));
        assert_eq!(window.slot(6).map(|slot| slot.variant_index()), Some(0));
    }

    #[test]
    fn retarget_rescans_and_ledger_keeps_history() {
        let mut factory = TestFactory::with_bugs_per_room(2);
        let mut ledger = BugLedger::default();
        let mut window = scenario_window(&mut factory, &mut ledger);
        assert_eq!(ledger.total_discovered(), 20);

        let _ = window.on_actor_entered_slot(4, &mut factory, &mut ledger);

        let slot = window.slot(6).expect("retargeted slot");
        assert_eq!(slot.discovered_count(), 2);
        assert_eq!(slot.fixed_count(), 0);
        assert_eq!(ledger.total_discovered(), 22);
        assert_eq!(ledger.remaining(), 22);
    }

    #[test]
    fn repeated_sequence_is_a_no_op() {
        let mut factory = TestFactory::with_bugs_per_room(1);
        let mut ledger = BugLedger::default();
        let mut window = scenario_window(&mut factory, &mut ledger);

        let _ = window.on_actor_entered_slot(4, &mut factory, &mut ledger);
        let before = sequences(&window);
        let outcome = window.on_actor_entered_slot(4, &mut factory, &mut ledger);

        assert_eq!(outcome, RecycleOutcome::Duplicate { sequence: 4 });
        assert_eq!(sequences(&window), before);
        assert_eq!(factory.repositioned.len(), 1);
    }

    #[test]
    fn movement_inside_window_only_updates_tracking() {
        let mut factory = TestFactory::with_bugs_per_room(1);
        let mut ledger = BugLedger::default();
        let mut window = scenario_window(&mut factory, &mut ledger);

        let outcome = window.on_actor_entered_slot(1, &mut factory, &mut ledger);
        assert_eq!(
            outcome,
            RecycleOutcome::Tracked {
                previous: 0,
                current: 1,
            }
        );
        assert_eq!(sequences(&window), (-4..=5).collect::<Vec<_>>());
        assert_eq!(window.tracked_sequence(), 1);
    }

    #[test]
    fn walking_left_recycles_rightmost_each_step() {
        let mut factory = TestFactory::with_bugs_per_room(0);
        let mut ledger = BugLedger::default();
        let mut window = scenario_window(&mut factory, &mut ledger);

        for sequence in (-8..=-1).rev() {
            let _ = window.on_actor_entered_slot(sequence, &mut factory, &mut ledger);
            assert_eq!(window.len(), 10);
            assert!(window.is_contiguous());
        }
        let (lo, hi) = window.sequence_range().expect("range");
        assert!(lo <= -8 - 2, "lo {lo} should keep ahead of the actor");
        assert_eq!(hi - lo, 9);
    }

    #[test]
    fn exactly_one_slot_changes_per_transition() {
        let mut factory = TestFactory::with_bugs_per_room(0);
        let mut ledger = BugLedger::default();
        let mut window = scenario_window(&mut factory, &mut ledger);

        for sequence in 1..=30 {
            let before = sequences(&window);
            let outcome = window.on_actor_entered_slot(sequence, &mut factory, &mut ledger);
            let after = sequences(&window);
            let changed = before.iter().filter(|seq| !after.contains(seq)).count();
            match outcome {
                RecycleOutcome::Retargeted { .. } => assert_eq!(changed, 1),
                _ => assert_eq!(changed, 0),
            }
            assert!(window.covers(sequence));
        }
    }

    #[test]
    fn large_jump_leaves_window_behind_actor() {
        let mut factory = TestFactory::with_bugs_per_room(0);
        let mut ledger = BugLedger::default();
        let mut window = scenario_window(&mut factory, &mut ledger);

        let outcome = window.on_actor_entered_slot(40, &mut factory, &mut ledger);

        assert!(matches!(
            outcome,
            RecycleOutcome::Retargeted { from: -4, to: 6, .. }
        ));
        assert!(window.is_contiguous());
        assert!(!window.covers(40));
        assert_eq!(window.tracked_sequence(), 40);
    }

    #[test]
    fn old_bug_units_die_when_their_room_is_recycled() {
        let mut factory = TestFactory::with_bugs_per_room(1);
        let mut ledger = BugLedger::default();
        let mut window = scenario_window(&mut factory, &mut ledger);
        let stale_refs: Vec<_> = window
            .slot(-4)
            .expect("slot -4")
            .bug_unit_refs()
            .cloned()
            .collect();

        let _ = window.on_actor_entered_slot(4, &mut factory, &mut ledger);

        assert!(stale_refs.iter().all(|unit| !unit.is_live()));
        let fresh = window.slot(6).expect("slot 6").live_bug_units();
        assert_eq!(fresh.len(), 1);
        assert!(fresh[0].is_active());
    }

    #[test]
    fn skipped_visual_is_restored_once_create_succeeds() {
        let mut factory = TestFactory::with_bugs_per_room(1);
        factory.fail_sequences.push(0);
        let mut ledger = BugLedger::default();
        let mut window = scenario_window(&mut factory, &mut ledger);
        assert_eq!(window.len(), 9);

        let _ = window.on_actor_entered_slot(1, &mut factory, &mut ledger);
        assert_eq!(window.len(), 9);
        assert!(window.slot(0).is_none());

        factory.fail_sequences.clear();
        let _ = window.on_actor_entered_slot(2, &mut factory, &mut ledger);
        assert!(window.is_contiguous());
        assert_eq!(sequences(&window), (-4..=5).collect::<Vec<_>>());
        assert_eq!(ledger.total_discovered(), 10);
    }

    #[test]
    fn persistent_failure_is_replaced_ahead_of_the_actor() {
        let mut factory = TestFactory::with_bugs_per_room(1);
        factory.fail_sequences.push(-4);
        let mut ledger = BugLedger::default();
        let mut window = scenario_window(&mut factory, &mut ledger);
        assert_eq!(sequences(&window), (-3..=5).collect::<Vec<_>>());

        let _ = window.on_actor_entered_slot(1, &mut factory, &mut ledger);

        assert!(window.is_contiguous());
        assert_eq!(sequences(&window), (-3..=6).collect::<Vec<_>>());
    }
}
