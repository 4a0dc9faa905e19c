//! Named accumulator registry.
//!
//! Accumulators are organized hierarchically by stage (`step0/..`,
//! `step1/..`) and sub-category (`QA/`), mirroring the naming contract in
//! [`crate::names`]. Profile-shaped accumulators reuse the calibration
//! table types, and [`StatsRegistry::export_collection`] turns a registry
//! subtree into the `TableCollection` that seeds the next calibration
//! round.

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::axis::AxisSpec;
use crate::config::AxisConfig;
use crate::error::{Result, ZqError};
use crate::event::Vertex;
use crate::names;
use crate::tables::{
    AxisProfileTable, CalibTable, JointSparseTable, ProfileCoord, RunCentralityTable,
    TableCollection,
};

/// 1-D count histogram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hist1D {
    pub axis: AxisSpec,
    counts: Vec<u64>,
}

impl Hist1D {
    pub fn new(axis: AxisSpec) -> Self {
        Self {
            counts: vec![0; axis.bins],
            axis,
        }
    }

    pub fn fill(&mut self, x: f64) {
        self.counts[self.axis.find_bin(x)] += 1;
    }

    pub fn count_at(&self, x: f64) -> u64 {
        self.counts[self.axis.find_bin(x)]
    }

    pub fn entries(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn merge(&mut self, other: &Hist1D) {
        for (a, b) in self.counts.iter_mut().zip(other.counts.iter()) {
            *a += b;
        }
    }
}

/// 2-D count histogram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hist2D {
    pub x_axis: AxisSpec,
    pub y_axis: AxisSpec,
    counts: Vec<u64>,
}

impl Hist2D {
    pub fn new(x_axis: AxisSpec, y_axis: AxisSpec) -> Self {
        Self {
            counts: vec![0; x_axis.bins * y_axis.bins],
            x_axis,
            y_axis,
        }
    }

    pub fn fill(&mut self, x: f64, y: f64) {
        let ix = self.x_axis.find_bin(x);
        let iy = self.y_axis.find_bin(y);
        self.counts[iy * self.x_axis.bins + ix] += 1;
    }

    pub fn entries(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn merge(&mut self, other: &Hist2D) {
        for (a, b) in self.counts.iter_mut().zip(other.counts.iter()) {
            *a += b;
        }
    }
}

/// One registered accumulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Accumulator {
    Hist1(Hist1D),
    Hist2(Hist2D),
    Profile(AxisProfileTable),
    RunProfile(RunCentralityTable),
    Sparse(JointSparseTable),
}

impl Accumulator {
    fn merge(&mut self, other: &Accumulator) {
        match (self, other) {
            (Accumulator::Hist1(a), Accumulator::Hist1(b)) => a.merge(b),
            (Accumulator::Hist2(a), Accumulator::Hist2(b)) => a.merge(b),
            (Accumulator::Profile(a), Accumulator::Profile(b)) => a.merge(b),
            (Accumulator::RunProfile(a), Accumulator::RunProfile(b)) => a.merge(b),
            (Accumulator::Sparse(a), Accumulator::Sparse(b)) => a.merge(b),
            _ => {}
        }
    }
}

/// Registry of named accumulators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsRegistry {
    entries: FxHashMap<String, Accumulator>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full accumulator set for a calibration job, registered with the
    /// configured axes. Names and binning are the producer side of the
    /// calibration contract.
    pub fn standard(axes: &AxisConfig) -> Self {
        let mut registry = Self::new();

        for tower in 0..10 {
            registry.add_run_profile(names::registry::energy_bootstrap(tower), axes.cent);
        }

        let psi_axis = AxisSpec::new(100, -4.0, 4.0);
        for stage in 0..6 {
            for side in ["A", "C"] {
                registry.add_hist2(names::registry::qx_vs_qy(stage, side), axes.q, axes.q);
            }
            for which in ["A", "C", "Full"] {
                registry.add_hist2(names::registry::sp_plane(stage, which), psi_axis, axes.cent10);
            }
            for comp_a in ["XA", "YA"] {
                for comp_c in ["XC", "YC"] {
                    registry.add_profile(
                        names::registry::q_product_vs_cent(stage, comp_a, comp_c),
                        ProfileCoord::Centrality,
                        axes.cent10,
                    );
                }
            }
            for component in 0..4 {
                registry.add_profile(
                    names::registry::q_vs_coord(stage, component, "cent"),
                    ProfileCoord::Centrality,
                    axes.cent10,
                );
                registry.add_profile(
                    names::registry::q_vs_coord(stage, component, "vx"),
                    ProfileCoord::VertexX,
                    axes.vx,
                );
                registry.add_profile(
                    names::registry::q_vs_coord(stage, component, "vy"),
                    ProfileCoord::VertexY,
                    axes.vy,
                );
                registry.add_profile(
                    names::registry::q_vs_coord(stage, component, "vz"),
                    ProfileCoord::VertexZ,
                    axes.vz,
                );
            }
        }

        // Correction-table bootstraps: the 4-D joint tables under step1 and
        // step5, the 1-D profiles under step2..step5.
        for component in 0..4 {
            registry.add_sparse(
                names::registry::step_bootstrap(0, component),
                axes.sparse_axes(),
            );
            registry.add_sparse(names::registry::final_sparse(component), axes.sparse_axes());
            registry.add_profile(
                names::registry::step_bootstrap(1, component),
                ProfileCoord::Centrality,
                axes.cent,
            );
            registry.add_profile(
                names::registry::step_bootstrap(2, component),
                ProfileCoord::VertexX,
                axes.vx,
            );
            registry.add_profile(
                names::registry::step_bootstrap(3, component),
                ProfileCoord::VertexY,
                axes.vy,
            );
            registry.add_profile(
                names::registry::step_bootstrap(4, component),
                ProfileCoord::VertexZ,
                axes.vz,
            );
        }

        let depth_axis = AxisSpec::new(10, 0.0, 10.0);
        registry.add_hist1("hStep", depth_axis);
        registry.add_hist1("hIteration", depth_axis);

        let cent_wide = AxisSpec::new(200, 0.0, 100.0);
        registry.add_hist1("QA/centrality_before", cent_wide);
        registry.add_hist1("QA/centrality_after", cent_wide);

        let tower_axis = AxisSpec::new(8, 0.0, 8.0);
        registry.add_profile("QA/ZNA_Energy", ProfileCoord::Index, tower_axis);
        registry.add_profile("QA/ZNC_Energy", ProfileCoord::Index, tower_axis);

        for name in names::VERTEX_MEAN {
            registry.add_run_profile(names::registry::vertex_bootstrap(name), AxisSpec::new(1, 0.0, 1.0));
        }
        registry.add_run_profile(
            names::registry::vertex_bootstrap(names::VERTEX_MEAN_Z),
            AxisSpec::new(1, 0.0, 1.0),
        );

        registry
    }

    pub fn add_hist1(&mut self, name: impl Into<String>, axis: AxisSpec) {
        self.entries.insert(name.into(), Accumulator::Hist1(Hist1D::new(axis)));
    }

    pub fn add_hist2(&mut self, name: impl Into<String>, x: AxisSpec, y: AxisSpec) {
        self.entries
            .insert(name.into(), Accumulator::Hist2(Hist2D::new(x, y)));
    }

    pub fn add_profile(&mut self, name: impl Into<String>, coord: ProfileCoord, axis: AxisSpec) {
        self.entries.insert(
            name.into(),
            Accumulator::Profile(AxisProfileTable::new(coord, axis)),
        );
    }

    pub fn add_run_profile(&mut self, name: impl Into<String>, cent_axis: AxisSpec) {
        self.entries.insert(
            name.into(),
            Accumulator::RunProfile(RunCentralityTable::new(cent_axis)),
        );
    }

    pub fn add_sparse(&mut self, name: impl Into<String>, axes: [AxisSpec; 4]) {
        self.entries.insert(
            name.into(),
            Accumulator::Sparse(JointSparseTable::new(axes)),
        );
    }

    fn lookup(&mut self, name: &str) -> Result<&mut Accumulator> {
        self.entries
            .get_mut(name)
            .ok_or_else(|| ZqError::UnknownAccumulator(name.to_string()))
    }

    fn kind_error(name: &str, expected: &'static str) -> ZqError {
        ZqError::AccumulatorKind {
            name: name.to_string(),
            expected,
        }
    }

    pub fn fill_hist1(&mut self, name: &str, x: f64) -> Result<()> {
        match self.lookup(name)? {
            Accumulator::Hist1(h) => {
                h.fill(x);
                Ok(())
            }
            _ => Err(Self::kind_error(name, "1-D histogram")),
        }
    }

    pub fn fill_hist2(&mut self, name: &str, x: f64, y: f64) -> Result<()> {
        match self.lookup(name)? {
            Accumulator::Hist2(h) => {
                h.fill(x, y);
                Ok(())
            }
            _ => Err(Self::kind_error(name, "2-D histogram")),
        }
    }

    pub fn fill_profile(&mut self, name: &str, x: f64, value: f64) -> Result<()> {
        match self.lookup(name)? {
            Accumulator::Profile(p) => {
                p.fill(x, value);
                Ok(())
            }
            _ => Err(Self::kind_error(name, "profile")),
        }
    }

    pub fn fill_run_profile(
        &mut self,
        name: &str,
        run_number: i32,
        centrality: f64,
        value: f64,
    ) -> Result<()> {
        match self.lookup(name)? {
            Accumulator::RunProfile(p) => {
                p.fill(run_number, centrality, value);
                Ok(())
            }
            _ => Err(Self::kind_error(name, "run profile")),
        }
    }

    pub fn fill_sparse(
        &mut self,
        name: &str,
        centrality: f64,
        vertex: Vertex,
        value: f64,
    ) -> Result<()> {
        match self.lookup(name)? {
            Accumulator::Sparse(s) => {
                s.fill(centrality, vertex, value);
                Ok(())
            }
            _ => Err(Self::kind_error(name, "sparse profile")),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Accumulator> {
        self.entries.get(name)
    }

    pub fn hist1(&self, name: &str) -> Option<&Hist1D> {
        match self.entries.get(name) {
            Some(Accumulator::Hist1(h)) => Some(h),
            _ => None,
        }
    }

    pub fn hist2(&self, name: &str) -> Option<&Hist2D> {
        match self.entries.get(name) {
            Some(Accumulator::Hist2(h)) => Some(h),
            _ => None,
        }
    }

    pub fn profile(&self, name: &str) -> Option<&AxisProfileTable> {
        match self.entries.get(name) {
            Some(Accumulator::Profile(p)) => Some(p),
            _ => None,
        }
    }

    pub fn run_profile(&self, name: &str) -> Option<&RunCentralityTable> {
        match self.entries.get(name) {
            Some(Accumulator::RunProfile(p)) => Some(p),
            _ => None,
        }
    }

    pub fn sparse(&self, name: &str) -> Option<&JointSparseTable> {
        match self.entries.get(name) {
            Some(Accumulator::Sparse(s)) => Some(s),
            _ => None,
        }
    }

    /// Export the direct children of `prefix` as a calibration collection.
    ///
    /// Only profile-shaped accumulators convert (count histograms are QA
    /// only); deeper subtrees are left out. This is the bootstrap hand-off:
    /// this round's subtree is next round's table collection.
    pub fn export_collection(&self, prefix: &str) -> TableCollection {
        let mut collection = TableCollection::new();
        for (name, accumulator) in &self.entries {
            let Some(stripped) = name.strip_prefix(prefix) else {
                continue;
            };
            if stripped.contains('/') {
                continue;
            }
            let table = match accumulator {
                Accumulator::Profile(p) => CalibTable::AxisProfile(p.clone()),
                Accumulator::RunProfile(p) => CalibTable::RunCentrality(p.clone()),
                Accumulator::Sparse(s) => CalibTable::JointSparse(s.clone()),
                Accumulator::Hist1(_) | Accumulator::Hist2(_) => continue,
            };
            collection.insert(stripped, table);
        }
        collection
    }

    /// Merge another registry filled with the same registration set. Used
    /// to combine accumulators from independently processed batches.
    pub fn merge(&mut self, other: &StatsRegistry) {
        for (name, accumulator) in &other.entries {
            if let Some(mine) = self.entries.get_mut(name) {
                mine.merge(accumulator);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
