//! P1: automatic probing of every probe-reachable gap.

use log::{debug, info, warn};

use super::controller::LevelingWorkflow;
use super::guard::LevelingGuard;
use super::host::{PhaseProgress, PrinterHost, Reference};
use super::outcome::{PartialReason, PhaseStatus, WorkflowOutcome};
use super::params::ResolvedParams;
use crate::core::XyPos;
use crate::traversal::{MeshPointType, NearestQuery, find_closest, find_furthest_invalid};

impl LevelingWorkflow {
    /// Probe undefined cells until none the probe can reach remain.
    ///
    /// Cells are taken nearest-first around the reference (measured from
    /// the probe tip) or, with `U`, most-isolated-first. Cancellation and
    /// probe failures keep every cell already measured; `P1 C` resumes.
    pub(super) fn probe_entire_mesh<H: PrinterHost + ?Sized>(
        &mut self,
        host: &mut H,
        p: &ResolvedParams,
        out: &mut WorkflowOutcome,
    ) -> PhaseStatus {
        if !p.has_constant() {
            self.mesh.invalidate_all();
            out.say("Mesh invalidated. Probing mesh.");
        }
        if p.verbosity > 1 {
            info!("[Probe] Probing around {}", p.reference);
        }

        let offset = self.config.probe.offset_xy();
        let mode = self.config.workflow.search_mode;
        let total = self.mesh.values().len();
        let mut step = 0;

        let mut guard = LevelingGuard::acquire(host);
        guard.move_z(self.config.probe.z_clearance_deploy);

        let status = loop {
            if guard.cancel_requested() {
                out.say("Mesh only partially populated.");
                break self.partial(PartialReason::Cancelled);
            }

            let probe_reachable = |pos: XyPos| guard.position_is_reachable(pos, Reference::Probe);
            let next = if p.furthest {
                find_furthest_invalid(&self.mesh, probe_reachable, &mut self.rng)
            } else {
                let query = NearestQuery {
                    kind: MeshPointType::Invalid,
                    anchor: p.reference,
                    probe_offset: Some(offset),
                    current: guard.current_xy(),
                    visited: None,
                };
                find_closest(&self.mesh, &query, probe_reachable, mode)
            };
            let Some(idx) = next else {
                break PhaseStatus::Done;
            };

            step += 1;
            guard.on_phase_progress(PhaseProgress {
                phase: "P1",
                current: step,
                total,
            });

            let pos = self.mesh.position(idx);
            let z = self.probe_compensated(&mut *guard, pos);
            if z.is_nan() {
                warn!("[Probe] No reading at {}", pos);
                out.say(format!("?Error probing point {}. Mesh only partially populated.", pos));
                break self.partial(PartialReason::ProbeFailed(pos));
            }

            self.mesh.set(idx, z);
            guard.on_mesh_update(idx, z);
            if p.verbosity > 2 {
                info!("[Probe] {} at {}: {:.4}", idx, pos, z);
            } else {
                debug!("[Probe] {} at {}: {:.4}", idx, pos, z);
            }
            guard.idle();

            if step >= total {
                break PhaseStatus::Done;
            }
        };

        guard.move_z(self.config.probe.z_clearance_deploy);
        drop(guard);

        let g = self.mesh.geometry();
        let back = XyPos::new(
            p.reference.x.clamp(g.min().x, g.max().x),
            p.reference.y.clamp(g.min().y, g.max().y),
        );
        host.move_to(back, host.current_z());
        host.synchronize();

        if status == PhaseStatus::Done {
            out.say(format!(
                "Probing done: {} of {} cells defined.",
                self.mesh.defined_count(),
                total
            ));
        }
        status
    }
}
