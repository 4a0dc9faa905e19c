//! Pipeline configuration.
//!
//! Identifiers name calibration families in the external store; an empty /
//! absent identifier disables that family. Axis definitions are part of the
//! producer/consumer contract together with the names in [`crate::names`].

use serde::{Deserialize, Serialize};

use crate::axis::AxisSpec;
use crate::error::{Result, ZqError};

/// Number of recentering iterations and steps per iteration.
pub const ITERATIONS: usize = 5;
pub const STEPS: usize = 5;

/// Accepted centrality range; events outside are hard-rejected.
pub const CENTRALITY_RANGE: (f64, f64) = (0.0, 90.0);

/// Axis definitions for accumulators and calibration tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Centrality in 1% bins (energy calibration tables).
    pub cent: AxisSpec,
    /// Centrality in 10% bins (QA and correction profiles).
    pub cent10: AxisSpec,
    /// Q-vector component range.
    pub q: AxisSpec,
    pub vx: AxisSpec,
    pub vy: AxisSpec,
    pub vz: AxisSpec,
    /// Coarse vertex axes for the joint 4-D tables.
    pub vx_wide: AxisSpec,
    pub vy_wide: AxisSpec,
    pub vz_wide: AxisSpec,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            cent: AxisSpec::new(90, 0.0, 90.0),
            cent10: AxisSpec::new(9, 0.0, 90.0),
            q: AxisSpec::new(100, -2.0, 2.0),
            vx: AxisSpec::new(10, -0.01, 0.01),
            vy: AxisSpec::new(10, -0.01, 0.01),
            vz: AxisSpec::new(10, -10.0, 1.0),
            vx_wide: AxisSpec::new(3, -0.01, 0.01),
            vy_wide: AxisSpec::new(3, -0.01, 0.01),
            vz_wide: AxisSpec::new(3, -10.0, 10.0),
        }
    }
}

impl AxisConfig {
    /// Axes of the joint 4-D tables: (centrality, vx, vy, vz).
    pub fn sparse_axes(&self) -> [AxisSpec; 4] {
        [self.cent10, self.vx_wide, self.vy_wide, self.vz_wide]
    }
}

/// Top-level configuration for one calibration job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZqConfig {
    /// Identifier of the tower mean-energy family (hard dependency).
    pub energy_cal: Option<String>,
    /// Identifier of the run-keyed vertex mean family.
    pub vertex_mean: Option<String>,
    /// Identifiers of the recentering families, `[iteration][step]`.
    /// Empty strings disable individual slots.
    pub recentering: Vec<Vec<String>>,
    /// Minimum entries required in a 4-D bin for its correction to be used.
    pub min_entries_sparse_bin: u64,
    pub axes: AxisConfig,
}

impl Default for ZqConfig {
    fn default() -> Self {
        Self {
            energy_cal: None,
            vertex_mean: None,
            recentering: vec![vec![String::new(); STEPS]; ITERATIONS],
            min_entries_sparse_bin: 100,
            axes: AxisConfig::default(),
        }
    }
}

impl ZqConfig {
    /// Standard identifier layout under a common root:
    /// `{root}/Energy`, `{root}/vmean`, `{root}/it{i}_step{s}`.
    pub fn with_family_root(root: &str) -> Self {
        let recentering = (1..=ITERATIONS)
            .map(|it| {
                (1..=STEPS)
                    .map(|s| format!("{}/it{}_step{}", root, it, s))
                    .collect()
            })
            .collect();
        Self {
            energy_cal: Some(format!("{}/Energy", root)),
            vertex_mean: Some(format!("{}/vmean", root)),
            recentering,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.recentering.len() != ITERATIONS {
            return Err(ZqError::Config(format!(
                "expected {} recentering iterations, found {}",
                ITERATIONS,
                self.recentering.len()
            )));
        }
        for (it, steps) in self.recentering.iter().enumerate() {
            if steps.len() != STEPS {
                return Err(ZqError::Config(format!(
                    "iteration {} has {} step identifiers, expected {}",
                    it + 1,
                    steps.len(),
                    STEPS
                )));
            }
        }
        Ok(())
    }

    /// Identifier for recentering slot `(iteration, step)`; `None` when the
    /// slot is disabled. `iteration` is 1-based, `step` 0-based.
    pub fn recentering_id(&self, iteration: usize, step: usize) -> Option<&str> {
        let id = self.recentering.get(iteration.checked_sub(1)?)?.get(step)?;
        if id.is_empty() {
            None
        } else {
            Some(id.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_root_layout() {
        let config = ZqConfig::with_family_root("prod/LHC23_zzh_pass4");
        assert_eq!(
            config.energy_cal.as_deref(),
            Some("prod/LHC23_zzh_pass4/Energy")
        );
        assert_eq!(
            config.recentering_id(1, 0),
            Some("prod/LHC23_zzh_pass4/it1_step1")
        );
        assert_eq!(
            config.recentering_id(5, 4),
            Some("prod/LHC23_zzh_pass4/it5_step5")
        );
    }

    #[test]
    fn test_disabled_slot_is_none() {
        let config = ZqConfig::default();
        assert_eq!(config.recentering_id(1, 0), None);
        assert_eq!(config.recentering_id(0, 0), None);
        assert_eq!(config.recentering_id(6, 0), None);
    }

    #[test]
    fn test_json_round_trip() {
        let config = ZqConfig::with_family_root("r");
        let json = serde_json::to_string(&config).unwrap();
        let back = ZqConfig::from_json_str(&json).unwrap();
        assert_eq!(back.recentering_id(3, 2), Some("r/it3_step3"));
        assert_eq!(back.min_entries_sparse_bin, 100);
    }

    #[test]
    fn test_validate_rejects_bad_shape() {
        let mut config = ZqConfig::default();
        config.recentering.pop();
        assert!(config.validate().is_err());
    }
}
