//! Fixed ZDC tower geometry used by the Q-vector weighting.
//!
//! Position weights and the energy exponent follow the published analysis
//! note values and never change at runtime.

/// Energy exponent applied per tower before position weighting.
pub const ALPHA: f64 = 0.395;

/// Horizontal position weight per sector (shared by both sides).
pub const SECTOR_X: [f64; 4] = [-1.75, 1.75, -1.75, 1.75];

/// Vertical position weight per sector.
pub const SECTOR_Y: [f64; 4] = [-1.75, -1.75, 1.75, 1.75];

/// The two calorimeters on opposite sides of the interaction point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    C,
}

impl Side {
    /// Side owning tower index `tower` (0..8): the first four are side A.
    pub fn of_tower(tower: usize) -> Side {
        if tower < 4 {
            Side::A
        } else {
            Side::C
        }
    }

    /// Sign applied to the x-weight. The sides face each other, so side A's
    /// x axis is geometrically mirrored relative to side C.
    pub fn x_sign(self) -> f64 {
        match self {
            Side::A => -1.0,
            Side::C => 1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::A => "A",
            Side::C => "C",
        }
    }
}

/// Sector index (0..4) of tower index `tower` (0..8).
pub fn sector(tower: usize) -> usize {
    tower % 4
}
