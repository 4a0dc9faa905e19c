//! Raw Q-vector computation from gain-equalized tower energies.

use crate::event::StageVector;
use crate::geometry::{sector, Side, ALPHA, SECTOR_X, SECTOR_Y};

/// Compute the stage-(0,0) Q-vector `[QXA, QYA, QXC, QYC]`.
///
/// Per side: towers are weighted by `energy^ALPHA`, position-weighted sums
/// are normalized by the total weight. A side with zero total weight keeps
/// its components at 0.
pub fn raw_q_vector(calibrated: &[f64; 8]) -> StageVector {
    let mut sum_w = [0.0f64; 2];
    let mut x_w = [0.0f64; 2];
    let mut y_w = [0.0f64; 2];

    for tower in 0..8 {
        let side = Side::of_tower(tower);
        let i = match side {
            Side::A => 0,
            Side::C => 1,
        };
        let s = sector(tower);
        let weighted = calibrated[tower].powf(ALPHA);
        sum_w[i] += weighted;
        x_w[i] += side.x_sign() * SECTOR_X[s] * weighted;
        y_w[i] += SECTOR_Y[s] * weighted;
    }

    let mut q: StageVector = [0.0; 4];
    for i in 0..2 {
        if sum_w[i] > 0.0 {
            q[i * 2] = x_w[i] / sum_w[i];
            q[i * 2 + 1] = y_w[i] / sum_w[i];
        }
    }
    q
}
