//! # zq_core - ZDC Q-vector calibration and recentering
//!
//! Per collision event, this crate computes the pair of 2-D flow vectors
//! (Q-vectors) from ZDC tower energy deposits and removes detector and
//! geometric biases through a staged recentering procedure:
//!
//! 1. gain-equalize raw tower energies against run/centrality mean tables,
//! 2. compute the raw Q-vector with the fixed geometric weighting,
//! 3. subtract mean corrections stage by stage across a 5-iteration x
//!    5-step grid, stopping at the deepest stage with valid calibration.
//!
//! The accumulators filled while processing double as the input statistics
//! for the next calibration round: round N's output histograms are round
//! N+1's lookup tables.

pub mod axis;
pub mod config;
pub mod equalizer;
pub mod error;
pub mod event;
pub mod geometry;
pub mod names;
pub mod notices;
pub mod pipeline;
pub mod qvec;
pub mod recenter;
pub mod registry;
pub mod store;
pub mod tables;

pub use axis::{AxisSpec, BinStats};
pub use config::{AxisConfig, ZqConfig, CENTRALITY_RANGE, ITERATIONS, STEPS};
pub use error::{Result, ZqError};
pub use event::{CollisionInput, SpZdcRow, StageVector, Vertex, ZdcSignal};
pub use geometry::{Side, ALPHA, SECTOR_X, SECTOR_Y};
pub use notices::Notices;
pub use pipeline::Pipeline;
pub use recenter::{EventFrame, StageGrid};
pub use registry::{Accumulator, Hist1D, Hist2D, StatsRegistry};
pub use store::{CalibrationCache, CalibrationSource, InMemorySource, Slot};
pub use tables::{
    AxisProfileTable, CalibTable, JointSparseTable, ProfileCoord, RunCentralityTable,
    TableCollection,
};
