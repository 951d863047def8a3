use std::collections::BTreeMap;

use crate::collaborators::BugUnitId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry {
    pub discovered_in: i64,
    pub fixed: bool,
}

/// Append-only record of every bug unit ever discovered, keyed by identity.
/// Entries are never dropped when their room is recycled away, so
/// `remaining()` is measured against the historical total. Only
/// [`BugLedger::clear`] (full re-initialization or resync) forgets units.
#[derive(Debug, Clone, Default)]
pub struct BugLedger {
    entries: BTreeMap<BugUnitId, LedgerEntry>,
    total_fixed: u32,
}

impl BugLedger {
    pub fn record_discovered(&mut self, id: BugUnitId, sequence: i64, already_fixed: bool) -> bool {
        if let Some(entry) = self.entries.get_mut(&id) {
            if already_fixed && !entry.fixed {
                entry.fixed = true;
                self.total_fixed = self.total_fixed.saturating_add(1);
            }
            return false;
        }
        let _ = self.entries.insert(
            id,
            LedgerEntry {
                discovered_in: sequence,
                fixed: already_fixed,
            },
        );
        if already_fixed {
            self.total_fixed = self.total_fixed.saturating_add(1);
        }
        true
    }

    pub fn record_fixed(&mut self, id: BugUnitId) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) if !entry.fixed => {
                entry.fixed = true;
                self.total_fixed = self.total_fixed.saturating_add(1);
                true
            }
            _ => false,
        }
    }

    pub fn total_discovered(&self) -> u32 {
        self.entries.len().min(u32::MAX as usize) as u32
    }

    pub fn total_fixed(&self) -> u32 {
        self.total_fixed
    }

    pub fn remaining(&self) -> u32 {
        self.total_discovered().saturating_sub(self.total_fixed)
    }

    pub fn is_complete(&self) -> bool {
        let discovered = self.total_discovered();
        discovered > 0 && self.total_fixed >= discovered
    }

    pub fn entry(&self, id: BugUnitId) -> Option<&LedgerEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: BugUnitId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_fixed = 0;
    }
}
