//! Per-event processing pipeline.
//!
//! Order of operations per event: selection, energy bootstrap fills, gain
//! equalization, raw Q-vector, mean-vertex correction, recentering up to
//! the calibration frontier, QA/bootstrap accumulation, output row.

use crate::config::{ZqConfig, CENTRALITY_RANGE};
use crate::equalizer;
use crate::error::Result;
use crate::event::{CollisionInput, SpZdcRow, StageVector};
use crate::geometry::Side;
use crate::names;
use crate::notices::{info_once, warn_once, Notices};
use crate::qvec;
use crate::recenter::{self, EventFrame};
use crate::registry::StatsRegistry;
use crate::store::{CalibrationCache, CalibrationSource};

/// The calibration/recentering pipeline for one job.
///
/// Owns the calibration cache and the process-wide accumulators; events are
/// processed strictly one at a time. Batches processed by independent
/// pipelines can be combined through [`StatsRegistry::merge`].
pub struct Pipeline<S: CalibrationSource> {
    config: ZqConfig,
    source: S,
    cache: CalibrationCache,
    registry: StatsRegistry,
    notices: Notices,
}

impl<S: CalibrationSource> Pipeline<S> {
    pub fn new(config: ZqConfig, source: S) -> Result<Self> {
        config.validate()?;
        let registry = StatsRegistry::standard(&config.axes);
        Ok(Self {
            config,
            source,
            cache: CalibrationCache::new(),
            registry,
            notices: Notices::new(),
        })
    }

    pub fn config(&self) -> &ZqConfig {
        &self.config
    }

    pub fn registry(&self) -> &StatsRegistry {
        &self.registry
    }

    pub fn into_registry(self) -> StatsRegistry {
        self.registry
    }

    /// Process one collision and emit its output row.
    ///
    /// Degraded calibration availability shortens the recentering depth and
    /// is not an error; `Err` is reserved for internal inconsistencies.
    pub fn process_event(&mut self, event: &CollisionInput) -> Result<SpZdcRow> {
        let (cent_lo, cent_hi) = CENTRALITY_RANGE;
        if event.centrality < cent_lo || event.centrality > cent_hi {
            return Ok(SpZdcRow::rejected(event));
        }

        self.registry
            .fill_hist1("QA/centrality_before", event.centrality)?;

        let Some(signal) = event.zdc else {
            return Ok(SpZdcRow::rejected(event));
        };

        let energy_ok = self.cache.load_slot(
            &self.source,
            0,
            0,
            event.timestamp,
            self.config.energy_cal.as_deref(),
            &names::energy_means(),
            &self.notices,
        );
        if !energy_ok {
            info_once!(
                &self.notices,
                "energy-cal-absent",
                "no energy calibration found, only accumulating energy means"
            );
        }

        let vmean_ok = self.cache.load_slot(
            &self.source,
            0,
            1,
            event.timestamp,
            self.config.vertex_mean.as_deref(),
            &names::VERTEX_MEAN.map(String::from),
            &self.notices,
        );
        if !vmean_ok {
            warn_once!(
                &self.notices,
                "vmean-absent",
                "no vertex means found, accumulating them under vmean/"
            );
            let vertex = [event.vertex.x, event.vertex.y, event.vertex.z];
            let vertex_names = [
                names::VERTEX_MEAN[0],
                names::VERTEX_MEAN[1],
                names::VERTEX_MEAN_Z,
            ];
            for (name, value) in vertex_names.iter().zip(vertex) {
                self.registry.fill_run_profile(
                    &names::registry::vertex_bootstrap(name),
                    event.run_number,
                    0.5,
                    value,
                )?;
            }
        }

        let a_hit = equalizer::side_hit(&signal, Side::A);
        let c_hit = equalizer::side_hit(&signal, Side::C);
        self.fill_energy_bootstrap(event, &signal, a_hit, c_hit)?;

        if !a_hit || !c_hit {
            return Ok(SpZdcRow::rejected(event));
        }

        if !energy_ok {
            // Hard dependency: without the energy means there is no
            // equalization, and nothing downstream to compute.
            return Ok(SpZdcRow::rejected(event));
        }

        let mut frame = EventFrame::new(event.run_number, event.centrality, event.vertex);

        let mut means = [0.0; 10];
        for (i, name) in names::energy_means().iter().enumerate() {
            means[i] = recenter::slot_correction(&self.cache, 0, 0, name, &mut frame, 0)?;
        }
        let calibrated = equalizer::equalize(&signal.tower_energies, &means);

        for i in 0..4 {
            let slot = i as f64 + 0.5;
            self.registry
                .fill_profile("QA/ZNA_Energy", slot, signal.tower_energies[i])?;
            self.registry
                .fill_profile("QA/ZNA_Energy", slot + 4.0, calibrated[i])?;
            self.registry
                .fill_profile("QA/ZNC_Energy", slot, signal.tower_energies[i + 4])?;
            self.registry
                .fill_profile("QA/ZNC_Energy", slot + 4.0, calibrated[i + 4])?;
        }

        frame.grid.set(0, 0, qvec::raw_q_vector(&calibrated));

        recenter::apply_mean_vertex(&self.cache, &mut frame)?;

        self.cache
            .load_recentering(&self.source, &self.config, event.timestamp, &self.notices);

        let (at_iteration, at_step) = if self.cache.frontier().0 == 0 {
            warn_once!(
                &self.notices,
                "recentering-absent",
                "no recentering calibration available, emitting gain-equalized vectors"
            );
            (0, 0)
        } else {
            recenter::run_recentering(&self.cache, &mut frame, self.config.min_entries_sparse_bin)?
        };

        if frame.selected {
            self.fill_stage_outputs(&frame, at_iteration, at_step)?;
            if at_iteration > 0 {
                self.registry
                    .fill_hist1("QA/centrality_after", frame.centrality)?;
            }
        }

        let q = frame.grid.get(at_iteration, at_step);
        Ok(SpZdcRow {
            run_number: event.run_number,
            centrality: frame.centrality,
            vx: frame.vertex.x,
            vy: frame.vertex.y,
            vz: frame.vertex.z,
            qx_a: q[0],
            qy_a: q[1],
            qx_c: q[2],
            qy_c: q[3],
            selected: frame.selected,
            reached_iteration: at_iteration,
            reached_step: at_step,
        })
    }

    /// Accumulate per-tower mean energies for the sides that were hit.
    /// Runs before the both-sides rejection so single-side events still
    /// contribute to the gain tables.
    fn fill_energy_bootstrap(
        &mut self,
        event: &CollisionInput,
        signal: &crate::event::ZdcSignal,
        a_hit: bool,
        c_hit: bool,
    ) -> Result<()> {
        for tower in 0..5 {
            if a_hit {
                let value = if tower == 0 {
                    signal.common_energy_a
                } else {
                    signal.tower_energies[tower - 1]
                };
                self.registry.fill_run_profile(
                    &names::registry::energy_bootstrap(tower),
                    event.run_number,
                    event.centrality,
                    value,
                )?;
            }
            if c_hit {
                let value = if tower == 0 {
                    signal.common_energy_c
                } else {
                    signal.tower_energies[tower - 1 + 4]
                };
                self.registry.fill_run_profile(
                    &names::registry::energy_bootstrap(tower + 5),
                    event.run_number,
                    event.centrality,
                    value,
                )?;
            }
        }
        Ok(())
    }

    /// QA and bootstrap fills for every reachable stage of a selected event.
    fn fill_stage_outputs(
        &mut self,
        frame: &EventFrame,
        at_iteration: usize,
        at_step: usize,
    ) -> Result<()> {
        self.registry.fill_hist1("hIteration", at_iteration as f64)?;
        self.registry.fill_hist1("hStep", at_step as f64)?;

        let raw = frame.grid.get(0, 0);
        self.fill_stage_qa(frame, 0, raw)?;

        // The joint table that seeds iteration 1 is accumulated from the
        // raw vector until deeper calibration exists.
        if at_iteration <= 1 {
            for component in 0..4 {
                self.registry.fill_sparse(
                    &names::registry::step_bootstrap(0, component),
                    frame.centrality,
                    frame.vertex,
                    raw[component],
                )?;
            }
        }

        for stage in 1..=at_step {
            let q = frame.grid.get(at_iteration, stage);
            self.fill_stage_qa(frame, stage, q)?;

            if stage < 5 {
                // Stage-s output is binned on the coordinate its next-step
                // correction table is keyed by.
                let x = match stage {
                    1 => frame.centrality,
                    2 => frame.vertex.x,
                    3 => frame.vertex.y,
                    _ => frame.vertex.z,
                };
                for component in 0..4 {
                    self.registry.fill_profile(
                        &names::registry::step_bootstrap(stage, component),
                        x,
                        q[component],
                    )?;
                }
            } else {
                for component in 0..4 {
                    self.registry.fill_sparse(
                        &names::registry::final_sparse(component),
                        frame.centrality,
                        frame.vertex,
                        q[component],
                    )?;
                }
            }
        }
        Ok(())
    }

    fn fill_stage_qa(&mut self, frame: &EventFrame, stage: usize, q: StageVector) -> Result<()> {
        let cent = frame.centrality;
        let vertex = frame.vertex;

        self.registry
            .fill_hist2(&names::registry::qx_vs_qy(stage, Side::A.label()), q[0], q[1])?;
        self.registry
            .fill_hist2(&names::registry::qx_vs_qy(stage, Side::C.label()), q[2], q[3])?;

        let products = [
            ("XA", "XC", q[0] * q[2]),
            ("XA", "YC", q[0] * q[3]),
            ("YA", "XC", q[1] * q[2]),
            ("YA", "YC", q[1] * q[3]),
        ];
        for (comp_a, comp_c, product) in products {
            self.registry.fill_profile(
                &names::registry::q_product_vs_cent(stage, comp_a, comp_c),
                cent,
                product,
            )?;
        }

        for component in 0..4 {
            self.registry.fill_profile(
                &names::registry::q_vs_coord(stage, component, "cent"),
                cent,
                q[component],
            )?;
            self.registry.fill_profile(
                &names::registry::q_vs_coord(stage, component, "vx"),
                vertex.x,
                q[component],
            )?;
            self.registry.fill_profile(
                &names::registry::q_vs_coord(stage, component, "vy"),
                vertex.y,
                q[component],
            )?;
            self.registry.fill_profile(
                &names::registry::q_vs_coord(stage, component, "vz"),
                vertex.z,
                q[component],
            )?;
        }

        let psi_a = q[1].atan2(q[0]);
        let psi_c = q[3].atan2(q[2]);
        let psi_full = (q[1] + q[3]).atan2(q[0] + q[2]);
        self.registry
            .fill_hist2(&names::registry::sp_plane(stage, "A"), psi_a, cent)?;
        self.registry
            .fill_hist2(&names::registry::sp_plane(stage, "C"), psi_c, cent)?;
        self.registry
            .fill_hist2(&names::registry::sp_plane(stage, "Full"), psi_full, cent)?;
        Ok(())
    }
}
