//! Calibration table store: source trait, slot cache and frontier tracking.
//!
//! The external store serves named [`TableCollection`]s per family
//! identifier, versioned by timestamp. The cache keeps one slot per
//! (iteration, step) coordinate. A slot is valid only when its collection
//! resolved, every required table is present, and each has at least one
//! entry in aggregate; fine-grained per-bin sufficiency is checked at
//! correction-lookup time because it depends on the event's coordinates.

use std::sync::Arc;

use crate::config::{ZqConfig, ITERATIONS, STEPS};
use crate::notices::{error_once, info_once, warn_once, Notices};
use crate::tables::TableCollection;

/// Read access to the external calibration object store.
///
/// `fetch` is a point lookup against an already-warmed cache on the store
/// side; it must be cheap and side-effect free for repeated calls with the
/// same arguments.
pub trait CalibrationSource {
    fn fetch(&self, identifier: &str, timestamp: i64) -> Option<Arc<TableCollection>>;
}

/// In-memory source with explicit validity windows, used in tests and by
/// callers that stage collections themselves.
#[derive(Debug, Default)]
pub struct InMemorySource {
    families: fxhash::FxHashMap<String, Vec<(i64, i64, Arc<TableCollection>)>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `collection` for `identifier`, valid for `from <= ts < to`.
    pub fn insert(
        &mut self,
        identifier: impl Into<String>,
        from: i64,
        to: i64,
        collection: TableCollection,
    ) {
        self.families
            .entry(identifier.into())
            .or_default()
            .push((from, to, Arc::new(collection)));
    }

    /// Register `collection` valid for every timestamp.
    pub fn insert_static(&mut self, identifier: impl Into<String>, collection: TableCollection) {
        self.insert(identifier, i64::MIN, i64::MAX, collection);
    }
}

impl CalibrationSource for InMemorySource {
    fn fetch(&self, identifier: &str, timestamp: i64) -> Option<Arc<TableCollection>> {
        self.families.get(identifier)?.iter().find_map(|(from, to, c)| {
            if (*from..*to).contains(&timestamp) {
                Some(Arc::clone(c))
            } else {
                None
            }
        })
    }
}

/// One cached calibration slot.
#[derive(Debug, Clone, Default)]
pub struct Slot {
    pub valid: bool,
    pub tables: Option<Arc<TableCollection>>,
    /// Timestamp the slot was last resolved for; reloads with the same
    /// timestamp are no-ops.
    loaded_for: Option<i64>,
}

impl Slot {
    fn invalidate(&mut self, timestamp: i64) {
        self.valid = false;
        self.tables = None;
        self.loaded_for = Some(timestamp);
    }
}

/// Slot grid plus the recentering frontier.
///
/// Grid coordinates: `(0, 0)` is the energy calibration, `(0, 1)` the
/// vertex means, `(1..=5, 0..5)` the recentering slots.
#[derive(Debug)]
pub struct CalibrationCache {
    slots: Vec<Vec<Slot>>,
    /// Deepest valid recentering iteration; 0 when none is available.
    pub at_iteration: usize,
    /// Corrections available within `at_iteration` (1..=5).
    pub at_step: usize,
}

impl Default for CalibrationCache {
    fn default() -> Self {
        Self {
            slots: vec![vec![Slot::default(); STEPS + 1]; ITERATIONS + 1],
            at_iteration: 0,
            at_step: 0,
        }
    }
}

impl CalibrationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, iteration: usize, step: usize) -> &Slot {
        &self.slots[iteration][step]
    }

    /// Load and structurally validate one slot. Idempotent per timestamp:
    /// a slot already resolved for `timestamp` is left untouched.
    pub fn load_slot<S: CalibrationSource>(
        &mut self,
        source: &S,
        iteration: usize,
        step: usize,
        timestamp: i64,
        identifier: Option<&str>,
        required: &[String],
        notices: &Notices,
    ) -> bool {
        let slot_key = format!("slot-{}-{}", iteration, step);
        let slot = &mut self.slots[iteration][step];
        if slot.loaded_for == Some(timestamp) {
            return slot.valid;
        }

        let Some(identifier) = identifier.filter(|id| !id.is_empty()) else {
            info_once!(
                notices,
                &format!("{}-disabled", slot_key),
                "calibration family disabled for iteration {} step {}",
                iteration,
                step
            );
            slot.invalidate(timestamp);
            return false;
        };

        let Some(collection) = source.fetch(identifier, timestamp) else {
            warn_once!(
                notices,
                &format!("{}-missing", slot_key),
                "could not load calibration collection {}",
                identifier
            );
            slot.invalidate(timestamp);
            return false;
        };

        if collection.is_empty() {
            warn_once!(
                notices,
                &format!("{}-empty-collection", slot_key),
                "calibration collection {} is empty",
                identifier
            );
            slot.invalidate(timestamp);
            return false;
        }

        for name in required {
            match collection.get(name) {
                None => {
                    error_once!(
                        notices,
                        &format!("{}-absent-{}", slot_key, name),
                        "object {} not found in {}",
                        name,
                        identifier
                    );
                    slot.invalidate(timestamp);
                    return false;
                }
                Some(table) if table.entries() == 0 => {
                    info_once!(
                        notices,
                        &format!("{}-empty-{}", slot_key, name),
                        "{} is empty, produce the calibration for this step first",
                        name
                    );
                    slot.invalidate(timestamp);
                    return false;
                }
                Some(_) => {}
            }
        }

        info_once!(
            notices,
            &format!("{}-ok", slot_key),
            "calibrations loaded for iteration {} step {}",
            iteration,
            step
        );
        slot.valid = true;
        slot.tables = Some(collection);
        slot.loaded_for = Some(timestamp);
        true
    }

    /// Load all recentering slots in order and recompute the frontier,
    /// stopping at the first invalid slot so depth never skips a failure.
    pub fn load_recentering<S: CalibrationSource>(
        &mut self,
        source: &S,
        config: &ZqConfig,
        timestamp: i64,
        notices: &Notices,
    ) {
        self.at_iteration = 0;
        self.at_step = 0;
        for iteration in 1..=ITERATIONS {
            for step in 0..STEPS {
                let identifier = config.recentering_id(iteration, step).map(str::to_owned);
                let required = crate::names::step_tables(step);
                let ok = self.load_slot(
                    source,
                    iteration,
                    step,
                    timestamp,
                    identifier.as_deref(),
                    &required,
                    notices,
                );
                if !ok {
                    return;
                }
                self.at_iteration = iteration;
                self.at_step = step + 1;
            }
        }
    }

    /// Recentering frontier: `(iteration, corrections available in it)`.
    pub fn frontier(&self) -> (usize, usize) {
        (self.at_iteration, self.at_step)
    }
}
