//! The table naming contract shared by producer and consumer.
//!
//! The accumulators filled this round are uploaded and fetched back as next
//! round's calibration tables, so the names here must match exactly on both
//! sides. Keep them in one place.

use crate::geometry::Side;

/// Q-vector component labels in storage order: QXA, QYA, QXC, QYC.
pub const COMPONENTS: [&str; 4] = ["XA", "YA", "XC", "YC"];

/// Names of the two run-keyed vertex mean tables (vz is accumulated for QA
/// but never consumed as a correction).
pub const VERTEX_MEAN: [&str; 2] = ["hvertex_vx", "hvertex_vy"];

pub const VERTEX_MEAN_Z: &str = "hvertex_vz";

/// Name of the tower mean-energy table for logical tower `tower` (0..10):
/// five per side, tower 0/5 being the common channel.
pub fn energy_mean(tower: usize) -> String {
    let side = if tower < 5 { Side::A } else { Side::C };
    format!("hZN{}_mean_t{}_cent", side.label(), tower % 5)
}

/// All ten tower mean-energy table names, side A first.
pub fn energy_means() -> Vec<String> {
    (0..10).map(energy_mean).collect()
}

/// Correction table names for recentering step `step` (0..5), one per
/// component. Step 0 is the joint 4-D table; steps 1..5 are 1-D profiles
/// over centrality, vx, vy and vz respectively.
pub fn step_tables(step: usize) -> [String; 4] {
    let suffix = match step {
        0 => "mean_Cent_V_run",
        1 => "mean_cent_run",
        2 => "mean_vx_run",
        3 => "mean_vy_run",
        4 => "mean_vz_run",
        _ => unreachable!("recentering has 5 steps"),
    };
    let mut names: [String; 4] = Default::default();
    for (i, comp) in COMPONENTS.iter().enumerate() {
        names[i] = format!("hQ{}_{}", comp, suffix);
    }
    names
}

/// Registry paths, re-exported as helpers so fills and registration agree.
pub mod registry {
    use super::*;

    pub fn energy_bootstrap(tower: usize) -> String {
        format!("Energy/{}", energy_mean(tower))
    }

    pub fn vertex_bootstrap(name: &str) -> String {
        format!("vmean/{}", name)
    }

    /// Bootstrap accumulator for the table consumed at recentering step
    /// `step`: stage-`step` values land under the `step{step + 1}` subtree.
    pub fn step_bootstrap(step: usize, component: usize) -> String {
        format!("step{}/{}", step + 1, step_tables(step)[component])
    }

    /// Final-stage joint accumulator (stage 5 output).
    pub fn final_sparse(component: usize) -> String {
        format!("step5/{}", step_tables(0)[component])
    }

    pub fn qx_vs_qy(stage: usize, side: &str) -> String {
        format!("step{}/hZN{}_Qx_vs_Qy", stage, side)
    }

    pub fn q_vs_coord(stage: usize, component: usize, coord: &str) -> String {
        format!("step{}/QA/hQ{}_vs_{}", stage, COMPONENTS[component], coord)
    }

    pub fn q_product_vs_cent(stage: usize, comp_a: &str, comp_c: &str) -> String {
        format!("step{}/QA/hQ{}_Q{}_vs_cent", stage, comp_a, comp_c)
    }

    pub fn sp_plane(stage: usize, which: &str) -> String {
        format!("step{}/QA/hSPplane{}", stage, which)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_mean_names() {
        assert_eq!(energy_mean(0), "hZNA_mean_t0_cent");
        assert_eq!(energy_mean(4), "hZNA_mean_t4_cent");
        assert_eq!(energy_mean(5), "hZNC_mean_t0_cent");
        assert_eq!(energy_mean(9), "hZNC_mean_t4_cent");
    }

    #[test]
    fn test_step_table_names_component_order() {
        let names = step_tables(0);
        assert_eq!(names[0], "hQXA_mean_Cent_V_run");
        assert_eq!(names[1], "hQYA_mean_Cent_V_run");
        assert_eq!(names[2], "hQXC_mean_Cent_V_run");
        assert_eq!(names[3], "hQYC_mean_Cent_V_run");
        assert_eq!(step_tables(2)[0], "hQXA_mean_vx_run");
        assert_eq!(step_tables(4)[3], "hQYC_mean_vz_run");
    }

    #[test]
    fn test_bootstrap_path_offsets() {
        // Stage-s values feed the step-s correction table, stored under the
        // step{s+1} subtree.
        assert_eq!(registry::step_bootstrap(0, 0), "step1/hQXA_mean_Cent_V_run");
        assert_eq!(registry::step_bootstrap(1, 2), "step2/hQXC_mean_cent_run");
        assert_eq!(registry::final_sparse(1), "step5/hQYA_mean_Cent_V_run");
    }
}
