//! Per-event input and output records.

use serde::{Deserialize, Serialize};

/// Collision vertex position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Raw calorimeter signal for one event: four sector towers per side plus
/// the common (summed) channel per side. Order is a1..a4, c1..c4.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZdcSignal {
    pub tower_energies: [f64; 8],
    pub common_energy_a: f64,
    pub common_energy_c: f64,
}

/// One collision as delivered by the input collaborator.
///
/// `zdc` is `None` when no calorimeter signal is associated with the
/// collision; the pipeline then emits a rejected row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionInput {
    pub run_number: i32,
    /// Monotonic timestamp used to version calibration lookups.
    pub timestamp: i64,
    pub centrality: f64,
    pub vertex: Vertex,
    pub zdc: Option<ZdcSignal>,
}

/// The four Q-vector components in fixed order: QXA, QYA, QXC, QYC.
pub type StageVector = [f64; 4];

/// One output row per processed event. Field semantics are stable:
/// downstream consumers key on `reached_iteration`/`reached_step` to
/// interpret the vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpZdcRow {
    pub run_number: i32,
    pub centrality: f64,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    pub qx_a: f64,
    pub qy_a: f64,
    pub qx_c: f64,
    pub qy_c: f64,
    pub selected: bool,
    pub reached_iteration: usize,
    pub reached_step: usize,
}

impl SpZdcRow {
    /// Row for a hard-rejected event: zero vector, depth (0, 0).
    pub fn rejected(event: &CollisionInput) -> Self {
        Self {
            run_number: event.run_number,
            centrality: event.centrality,
            vx: event.vertex.x,
            vy: event.vertex.y,
            vz: event.vertex.z,
            qx_a: 0.0,
            qy_a: 0.0,
            qx_c: 0.0,
            qy_c: 0.0,
            selected: false,
            reached_iteration: 0,
            reached_step: 0,
        }
    }

    pub fn q_vector(&self) -> StageVector {
        [self.qx_a, self.qy_a, self.qx_c, self.qy_c]
    }
}
