//! Recentering engine: mean-vertex pre-step and the 5x5 correction grid.
//!
//! Each correction subtracts an externally supplied mean from the previous
//! stage's vector, component by component. Progression is strictly ordered
//! and bounded by the calibration frontier; the output is the stage vector
//! at the frontier coordinate.

use crate::config::STEPS;
use crate::error::{Result, ZqError};
use crate::event::{StageVector, Vertex};
use crate::names;
use crate::store::CalibrationCache;
use crate::tables::CalibTable;

/// Per-event working grid of stage vectors.
///
/// `get(iteration, stage)`: stage 0 of iteration 0 is the raw vector;
/// stages 1..=5 of iteration `i >= 1` hold the output of each correction
/// step. Cells beyond the frontier stay at their initialized zero value and
/// are never read.
#[derive(Debug, Clone)]
pub struct StageGrid {
    q: [[StageVector; STEPS + 1]; 6],
}

impl Default for StageGrid {
    fn default() -> Self {
        Self {
            q: [[[0.0; 4]; STEPS + 1]; 6],
        }
    }
}

impl StageGrid {
    pub fn get(&self, iteration: usize, stage: usize) -> StageVector {
        self.q[iteration][stage]
    }

    pub fn set(&mut self, iteration: usize, stage: usize, value: StageVector) {
        self.q[iteration][stage] = value;
    }
}

/// Per-event working state passed through the pipeline stages.
#[derive(Debug, Clone)]
pub struct EventFrame {
    pub run_number: i32,
    pub centrality: f64,
    /// Vertex after mean-vertex correction (vz is never corrected).
    pub vertex: Vertex,
    pub selected: bool,
    pub grid: StageGrid,
}

impl EventFrame {
    pub fn new(run_number: i32, centrality: f64, vertex: Vertex) -> Self {
        Self {
            run_number,
            centrality,
            vertex,
            selected: true,
            grid: StageGrid::default(),
        }
    }
}

/// Typed correction lookup against a loaded slot.
///
/// The table shape was fixed at load time; each shape has its own lookup.
/// A missing name inside a valid slot is an internal inconsistency between
/// load-time validation and use-time access, and is fatal.
pub fn slot_correction(
    cache: &CalibrationCache,
    iteration: usize,
    step: usize,
    name: &str,
    frame: &mut EventFrame,
    min_entries: u64,
) -> Result<f64> {
    let missing = || ZqError::MissingObject {
        name: name.to_string(),
        iteration,
        step,
    };
    let slot = cache.slot(iteration, step);
    let tables = slot.tables.as_ref().ok_or_else(missing)?;
    let table = tables.get(name).ok_or_else(missing)?;

    match table {
        CalibTable::RunCentrality(t) => Ok(t.mean(frame.run_number, frame.centrality)),
        CalibTable::AxisProfile(t) => {
            let x = t
                .coord
                .event_value(frame.centrality, frame.vertex)
                .ok_or(ZqError::TableShape {
                    name: name.to_string(),
                    iteration,
                    step,
                })?;
            Ok(t.mean_at(x))
        }
        CalibTable::JointSparse(t) => {
            let (mean, entries) = t.lookup(frame.centrality, frame.vertex);
            if entries < min_entries {
                // Too few entries in this specific bin: skip the correction
                // for this event but keep the pipeline going.
                log::debug!(
                    "sparse bin for {} has {} entries (< {}), correction not used",
                    name,
                    entries,
                    min_entries
                );
                frame.selected = false;
                Ok(0.0)
            } else {
                Ok(mean)
            }
        }
    }
}

/// Subtract the run-keyed mean vertex from vx and vy, when available.
/// Returns true when the correction was applied.
pub fn apply_mean_vertex(cache: &CalibrationCache, frame: &mut EventFrame) -> Result<bool> {
    if !cache.slot(0, 1).valid {
        return Ok(false);
    }
    let dx = slot_correction(cache, 0, 1, names::VERTEX_MEAN[0], frame, 0)?;
    let dy = slot_correction(cache, 0, 1, names::VERTEX_MEAN[1], frame, 0)?;
    frame.vertex.x -= dx;
    frame.vertex.y -= dy;
    Ok(true)
}

/// Run the correction grid up to the calibration frontier.
///
/// Stage chaining: iteration 1 starts from the raw vector; iteration k > 1
/// starts from iteration k-1's final stage; within an iteration each step
/// consumes the previous step's output. Returns the frontier reached.
pub fn run_recentering(
    cache: &CalibrationCache,
    frame: &mut EventFrame,
    min_entries: u64,
) -> Result<(usize, usize)> {
    let (at_iteration, at_step) = cache.frontier();

    for iteration in 1..=at_iteration {
        let steps_here = if iteration == at_iteration {
            at_step
        } else {
            STEPS
        };
        for step in 0..steps_here {
            let previous = if step == 0 {
                if iteration == 1 {
                    frame.grid.get(0, 0)
                } else {
                    frame.grid.get(iteration - 1, STEPS)
                }
            } else {
                frame.grid.get(iteration, step)
            };

            let table_names = names::step_tables(step);
            let mut corrected: StageVector = [0.0; 4];
            for (component, name) in table_names.iter().enumerate() {
                let correction =
                    slot_correction(cache, iteration, step, name, frame, min_entries)?;
                corrected[component] = previous[component] - correction;
            }
            frame.grid.set(iteration, step + 1, corrected);
        }
    }

    Ok((at_iteration, at_step))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisSpec;
    use crate::config::ZqConfig;
    use crate::notices::Notices;
    use crate::store::InMemorySource;
    use crate::tables::{
        AxisProfileTable, JointSparseTable, ProfileCoord, TableCollection,
    };

    /// Source in which every recentering table returns the constant `c`.
    fn constant_source(config: &ZqConfig, c: f64) -> InMemorySource {
        let mut source = InMemorySource::new();
        let axes = config.axes.sparse_axes();
        for it in 1..=5 {
            let mut sparse_collection = TableCollection::new();
            for name in names::step_tables(0) {
                let mut sparse = JointSparseTable::new(axes);
                for _ in 0..200 {
                    sparse.fill(45.0, Vertex::default(), c);
                }
                sparse_collection.insert(name, CalibTable::JointSparse(sparse));
            }
            source.insert_static(config.recentering_id(it, 0).unwrap(), sparse_collection);

            let specs = [
                (config.axes.cent10, ProfileCoord::Centrality),
                (config.axes.vx, ProfileCoord::VertexX),
                (config.axes.vy, ProfileCoord::VertexY),
                (config.axes.vz, ProfileCoord::VertexZ),
            ];
            for (step, (axis, coord)) in specs.into_iter().enumerate() {
                let mut collection = TableCollection::new();
                for name in names::step_tables(step + 1) {
                    let mut profile = AxisProfileTable::new(coord, axis);
                    for bin in 0..axis.bins {
                        profile.fill(axis.bin_center(bin), c);
                    }
                    collection.insert(name, CalibTable::AxisProfile(profile));
                }
                source.insert_static(config.recentering_id(it, step + 1).unwrap(), collection);
            }
        }
        source
    }

    fn frame_at_origin() -> EventFrame {
        let mut frame = EventFrame::new(1000, 45.0, Vertex::default());
        frame.grid.set(0, 0, [1.0, 2.0, 3.0, 4.0]);
        frame
    }

    #[test]
    fn test_constant_correction_chains_across_all_cells() {
        let config = ZqConfig::with_family_root("r");
        let source = constant_source(&config, 0.01);
        let mut cache = crate::store::CalibrationCache::new();
        cache.load_recentering(&source, &config, 0, &Notices::new());
        assert_eq!(cache.frontier(), (5, 5));

        let mut frame = frame_at_origin();
        let reached = run_recentering(&cache, &mut frame, 100).unwrap();
        assert_eq!(reached, (5, 5));
        assert!(frame.selected);

        // Every stage must equal its predecessor minus the constant.
        for it in 1..=5 {
            for stage in 1..=5 {
                let prev = if stage == 1 {
                    if it == 1 {
                        frame.grid.get(0, 0)
                    } else {
                        frame.grid.get(it - 1, 5)
                    }
                } else {
                    frame.grid.get(it, stage - 1)
                };
                let here = frame.grid.get(it, stage);
                for comp in 0..4 {
                    assert!(
                        (here[comp] - (prev[comp] - 0.01)).abs() < 1e-12,
                        "iteration {} stage {} component {}",
                        it,
                        stage,
                        comp
                    );
                }
            }
        }
        // 25 corrections of 0.01 in total.
        let last = frame.grid.get(5, 5);
        assert!((last[0] - (1.0 - 0.25)).abs() < 1e-12);
        assert!((last[3] - (4.0 - 0.25)).abs() < 1e-12);
    }

    #[test]
    fn test_partial_frontier_stops_consumption() {
        let config = ZqConfig::with_family_root("r");
        let source = constant_source(&config, 0.01);
        let mut partial = ZqConfig::with_family_root("r");
        // Disable (1, 1): frontier must stop after one correction.
        partial.recentering[0][1] = String::new();

        let mut cache = crate::store::CalibrationCache::new();
        cache.load_recentering(&source, &partial, 0, &Notices::new());
        assert_eq!(cache.frontier(), (1, 1));

        let mut frame = frame_at_origin();
        let reached = run_recentering(&cache, &mut frame, 100).unwrap();
        assert_eq!(reached, (1, 1));
        let stage = frame.grid.get(1, 1);
        assert!((stage[0] - 0.99).abs() < 1e-12);
        // Nothing was written past the frontier.
        assert_eq!(frame.grid.get(1, 2), [0.0; 4]);
    }

    #[test]
    fn test_sparse_bin_insufficiency_zeroes_and_unselects() {
        let config = ZqConfig::with_family_root("r");
        let source = constant_source(&config, 0.01);
        let mut cache = crate::store::CalibrationCache::new();
        cache.load_recentering(&source, &config, 0, &Notices::new());

        // Event in a sparse bin nobody populated: centrality 85 was never
        // filled, so the bin has zero entries.
        let mut frame = EventFrame::new(1000, 85.0, Vertex::default());
        frame.grid.set(0, 0, [1.0, 2.0, 3.0, 4.0]);
        let reached = run_recentering(&cache, &mut frame, 100).unwrap();
        assert_eq!(reached, (5, 5));
        assert!(!frame.selected);

        // Step-0 corrections were zero, but the 1-D steps still applied.
        let stage1 = frame.grid.get(1, 1);
        assert!((stage1[0] - 1.0).abs() < 1e-12);
        let stage2 = frame.grid.get(1, 2);
        assert!((stage2[0] - 0.99).abs() < 1e-12);
    }

    #[test]
    fn test_mean_vertex_subtracts_run_means() {
        let mut collection = TableCollection::new();
        for (name, mean) in names::VERTEX_MEAN.iter().zip([0.002, -0.001]) {
            let mut table = crate::tables::RunCentralityTable::run_keyed();
            table.fill(1000, 0.5, mean);
            collection.insert(*name, CalibTable::RunCentrality(table));
        }
        let mut source = InMemorySource::new();
        source.insert_static("r/vmean", collection);

        let mut cache = crate::store::CalibrationCache::new();
        let loaded = cache.load_slot(
            &source,
            0,
            1,
            0,
            Some("r/vmean"),
            &names::VERTEX_MEAN.map(String::from),
            &Notices::new(),
        );
        assert!(loaded);

        let mut frame = EventFrame::new(1000, 45.0, Vertex::new(0.005, 0.001, 3.0));
        let applied = apply_mean_vertex(&cache, &mut frame).unwrap();
        assert!(applied);
        assert!((frame.vertex.x - 0.003).abs() < 1e-12);
        assert!((frame.vertex.y - 0.002).abs() < 1e-12);
        assert_eq!(frame.vertex.z, 3.0);

        // A run the table has never seen subtracts nothing.
        let mut other = EventFrame::new(2000, 45.0, Vertex::new(0.005, 0.001, 3.0));
        apply_mean_vertex(&cache, &mut other).unwrap();
        assert!((other.vertex.x - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_index_profile_in_slot_is_a_shape_error() {
        let mut collection = TableCollection::new();
        for name in names::step_tables(1) {
            let mut profile =
                AxisProfileTable::new(ProfileCoord::Index, AxisSpec::new(8, 0.0, 8.0));
            profile.fill(0.5, 1.0);
            collection.insert(name, CalibTable::AxisProfile(profile));
        }
        let mut source = InMemorySource::new();
        source.insert_static("r/it1_step2", collection);

        let mut cache = crate::store::CalibrationCache::new();
        cache.load_slot(
            &source,
            1,
            1,
            0,
            Some("r/it1_step2"),
            &names::step_tables(1),
            &Notices::new(),
        );
        let mut frame = frame_at_origin();
        let result = slot_correction(&cache, 1, 1, &names::step_tables(1)[0], &mut frame, 0);
        assert!(matches!(result, Err(ZqError::TableShape { .. })));
    }

    #[test]
    fn test_missing_object_in_valid_slot_is_fatal() {
        // Validate the (0, 1) slot against the vx/vy means only, then ask it
        // for a name load-time validation never checked.
        let mut collection = TableCollection::new();
        for name in names::VERTEX_MEAN {
            let mut table = crate::tables::RunCentralityTable::run_keyed();
            table.fill(1000, 0.5, 0.001);
            collection.insert(name, CalibTable::RunCentrality(table));
        }
        let mut source = InMemorySource::new();
        source.insert_static("r/vmean", collection);

        let mut cache = crate::store::CalibrationCache::new();
        let loaded = cache.load_slot(
            &source,
            0,
            1,
            0,
            Some("r/vmean"),
            &names::VERTEX_MEAN.map(String::from),
            &Notices::new(),
        );
        assert!(loaded);

        let mut frame = frame_at_origin();
        let result = slot_correction(&cache, 0, 1, names::VERTEX_MEAN_Z, &mut frame, 0);
        assert!(matches!(
            result,
            Err(ZqError::MissingObject { iteration: 0, step: 1, .. })
        ));
    }
}
