//! Tower gain equalization.
//!
//! Corrects per-tower response differences using the reference mean-energy
//! tables: each sector tower is scaled so its mean matches a quarter of the
//! side's common-channel mean.

use crate::event::ZdcSignal;
use crate::geometry::Side;

/// Index of a logical tower's mean inside the 10-slot mean array:
/// `[common A, a1..a4, common C, c1..c4]`.
fn mean_index(tower: usize) -> usize {
    if tower < 4 {
        1 + tower
    } else {
        6 + (tower - 4)
    }
}

/// True when every sector tower and the common channel of `side` carry a
/// strictly positive energy.
pub fn side_hit(signal: &ZdcSignal, side: Side) -> bool {
    let (range, common) = match side {
        Side::A => (0..4, signal.common_energy_a),
        Side::C => (4..8, signal.common_energy_c),
    };
    common > 0.0 && range.clone().all(|t| signal.tower_energies[t] > 0.0)
}

/// Gain-equalize the eight sector towers.
///
/// `means` holds the ten tower mean energies looked up for this event's
/// (run, centrality). A tower whose reference mean is not strictly positive
/// keeps a calibrated energy of 0.
pub fn equalize(raw: &[f64; 8], means: &[f64; 10]) -> [f64; 8] {
    let mut calibrated = [0.0; 8];
    for tower in 0..8 {
        let mean_tower = means[mean_index(tower)];
        if mean_tower > 0.0 {
            let mean_common = match Side::of_tower(tower) {
                Side::A => means[0],
                Side::C => means[5],
            };
            calibrated[tower] = raw[tower] * (0.25 * mean_common) / mean_tower;
        }
    }
    calibrated
}
