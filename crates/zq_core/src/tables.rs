//! Calibration table shapes and named collections.
//!
//! The external store hands the pipeline a [`TableCollection`] per
//! calibration family. Three table shapes exist, selected at load time as a
//! closed variant instead of runtime type inspection:
//!
//! - [`RunCentralityTable`]: profile keyed by run number and centrality bin
//!   (tower energy means; also the run-keyed vertex means, which use a
//!   single dummy centrality bin),
//! - [`AxisProfileTable`]: 1-D profile over one event coordinate,
//! - [`JointSparseTable`]: sparse 4-D joint profile over
//!   (centrality, vx, vy, vz).
//!
//! The same types double as bootstrap accumulators: what the registry fills
//! this round is exactly what next round's store serves back.

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::axis::{AxisSpec, BinStats};
use crate::event::Vertex;

/// Profile keyed by run number (rows) and a binned second coordinate
/// (columns, usually centrality).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCentralityTable {
    pub cent_axis: AxisSpec,
    rows: FxHashMap<i32, Vec<BinStats>>,
}

impl RunCentralityTable {
    pub fn new(cent_axis: AxisSpec) -> Self {
        Self {
            cent_axis,
            rows: FxHashMap::default(),
        }
    }

    /// Run-keyed profile with a single dummy column (the vertex-mean shape).
    pub fn run_keyed() -> Self {
        Self::new(AxisSpec::new(1, 0.0, 1.0))
    }

    pub fn fill(&mut self, run_number: i32, centrality: f64, value: f64) {
        let bin = self.cent_axis.find_bin(centrality);
        let bins = self.cent_axis.bins;
        let row = self
            .rows
            .entry(run_number)
            .or_insert_with(|| vec![BinStats::default(); bins]);
        row[bin].fill(value);
    }

    /// Mean in the bin for `(run_number, centrality)`; 0 for unseen runs,
    /// matching the behavior of a lookup on an absent labeled bin.
    pub fn mean(&self, run_number: i32, centrality: f64) -> f64 {
        let bin = self.cent_axis.find_bin(centrality);
        self.rows
            .get(&run_number)
            .map(|row| row[bin].mean())
            .unwrap_or(0.0)
    }

    pub fn entries(&self) -> u64 {
        self.rows
            .values()
            .flat_map(|row| row.iter())
            .map(|b| b.entries)
            .sum()
    }

    pub fn merge(&mut self, other: &RunCentralityTable) {
        let bins = self.cent_axis.bins;
        for (run, row) in &other.rows {
            let mine = self
                .rows
                .entry(*run)
                .or_insert_with(|| vec![BinStats::default(); bins]);
            for (a, b) in mine.iter_mut().zip(row.iter()) {
                a.merge(b);
            }
        }
    }
}

/// Which event coordinate a 1-D profile is binned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileCoord {
    Centrality,
    VertexX,
    VertexY,
    VertexZ,
    /// Plain slot index; QA-only profiles never used for correction lookup.
    Index,
}

impl ProfileCoord {
    /// Value of this coordinate for an event; `None` for [`ProfileCoord::Index`].
    pub fn event_value(self, centrality: f64, vertex: Vertex) -> Option<f64> {
        match self {
            ProfileCoord::Centrality => Some(centrality),
            ProfileCoord::VertexX => Some(vertex.x),
            ProfileCoord::VertexY => Some(vertex.y),
            ProfileCoord::VertexZ => Some(vertex.z),
            ProfileCoord::Index => None,
        }
    }
}

/// 1-D profile over a single event coordinate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisProfileTable {
    pub coord: ProfileCoord,
    pub axis: AxisSpec,
    bins: Vec<BinStats>,
}

impl AxisProfileTable {
    pub fn new(coord: ProfileCoord, axis: AxisSpec) -> Self {
        Self {
            coord,
            axis,
            bins: vec![BinStats::default(); axis.bins],
        }
    }

    pub fn fill(&mut self, x: f64, value: f64) {
        let bin = self.axis.find_bin(x);
        self.bins[bin].fill(value);
    }

    pub fn mean_at(&self, x: f64) -> f64 {
        self.bins[self.axis.find_bin(x)].mean()
    }

    pub fn bin(&self, bin: usize) -> &BinStats {
        &self.bins[bin]
    }

    pub fn entries(&self) -> u64 {
        self.bins.iter().map(|b| b.entries).sum()
    }

    pub fn merge(&mut self, other: &AxisProfileTable) {
        for (a, b) in self.bins.iter_mut().zip(other.bins.iter()) {
            a.merge(b);
        }
    }
}

/// Sparse joint profile over (centrality, vx, vy, vz).
///
/// Only populated bins are stored; the lookup reports the entry count so the
/// caller can enforce per-bin statistics thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointSparseTable {
    pub axes: [AxisSpec; 4],
    bins: FxHashMap<[u16; 4], BinStats>,
}

impl JointSparseTable {
    pub fn new(axes: [AxisSpec; 4]) -> Self {
        Self {
            axes,
            bins: FxHashMap::default(),
        }
    }

    fn key(&self, centrality: f64, vertex: Vertex) -> [u16; 4] {
        let coords = [centrality, vertex.x, vertex.y, vertex.z];
        let mut key = [0u16; 4];
        for (i, (axis, value)) in self.axes.iter().zip(coords.iter()).enumerate() {
            key[i] = axis.find_bin(*value) as u16;
        }
        key
    }

    pub fn fill(&mut self, centrality: f64, vertex: Vertex, value: f64) {
        let key = self.key(centrality, vertex);
        self.bins.entry(key).or_default().fill(value);
    }

    /// Mean and entry count of the bin containing the event coordinates.
    /// An unpopulated bin reads as (0, 0 entries).
    pub fn lookup(&self, centrality: f64, vertex: Vertex) -> (f64, u64) {
        match self.bins.get(&self.key(centrality, vertex)) {
            Some(stats) => (stats.mean(), stats.entries),
            None => (0.0, 0),
        }
    }

    pub fn entries(&self) -> u64 {
        self.bins.values().map(|b| b.entries).sum()
    }

    pub fn merge(&mut self, other: &JointSparseTable) {
        for (key, stats) in &other.bins {
            self.bins.entry(*key).or_default().merge(stats);
        }
    }
}

/// Closed set of calibration table shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CalibTable {
    RunCentrality(RunCentralityTable),
    AxisProfile(AxisProfileTable),
    JointSparse(JointSparseTable),
}

impl CalibTable {
    /// Aggregate entry count across all bins.
    pub fn entries(&self) -> u64 {
        match self {
            CalibTable::RunCentrality(t) => t.entries(),
            CalibTable::AxisProfile(t) => t.entries(),
            CalibTable::JointSparse(t) => t.entries(),
        }
    }
}

/// Named set of calibration tables for one family, as served by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableCollection {
    tables: FxHashMap<String, CalibTable>,
}

impl TableCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, table: CalibTable) {
        self.tables.insert(name.into(), table);
    }

    pub fn get(&self, name: &str) -> Option<&CalibTable> {
        self.tables.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }
}
