//! `J`: fit a plane through fresh probe readings and tilt the mesh onto it.

use log::{debug, info, warn};

use super::controller::LevelingWorkflow;
use super::guard::LevelingGuard;
use super::host::{HostServices, PhaseProgress, PrinterHost};
use crate::core::XyPos;
use crate::error::{Error, Result};
use crate::fit::{LinearFitAccumulator, PlaneFit};
use crate::strategy::bilinear_z;

impl LevelingWorkflow {
    /// Probe positions of a tilt.
    ///
    /// `0` gives the three configured points. `n` gives an `n`x`n` grid over
    /// the part of the mesh the probe can reach, walked column by column
    /// with alternating direction.
    pub fn tilt_points(&self, size: u8) -> Vec<XyPos> {
        if size == 0 {
            return self.config.probe.tilt_points.to_vec();
        }
        let (reach_min, reach_max) = self.config.probe.reachable_area(&self.config.bed);
        let g = self.mesh.geometry();
        let (x_min, x_max) = (reach_min.x.max(g.min().x), reach_max.x.min(g.max().x));
        let (y_min, y_max) = (reach_min.y.max(g.min().y), reach_max.y.min(g.max().y));

        let n = size as usize;
        let dx = (x_max - x_min) / (n - 1) as f32;
        let dy = (y_max - y_min) / (n - 1) as f32;

        let mut points = Vec::with_capacity(n * n);
        for ix in 0..n {
            let x = x_min + dx * ix as f32;
            for iy in 0..n {
                let row = if ix % 2 == 1 { n - 1 - iy } else { iy };
                points.push(XyPos::new(x, y_min + dy * row as f32));
            }
        }
        points
    }

    /// Probe, fit and apply a tilt. Nothing changes when a probe fails or
    /// the fit is degenerate.
    pub(super) fn tilt_mesh<H: PrinterHost + ?Sized>(
        &mut self,
        host: &mut H,
        size: u8,
        verbosity: u8,
    ) -> Result<PlaneFit> {
        let points = self.tilt_points(size);
        let mut lsf = LinearFitAccumulator::new();

        {
            let mut guard = LevelingGuard::acquire(host);
            for (i, &pos) in points.iter().enumerate() {
                guard.on_phase_progress(PhaseProgress {
                    phase: "J",
                    current: i + 1,
                    total: points.len(),
                });
                let measured = self.probe_compensated(&mut *guard, pos);
                if measured.is_nan() {
                    warn!("[Tilt] ?Error probing point {}. Aborting operation.", pos);
                    guard.move_z(self.config.probe.z_clearance_deploy);
                    return Err(Error::ProbeFailed(pos));
                }
                let z = measured - bilinear_z(&self.mesh, pos);
                if verbosity > 3 {
                    info!("[Tilt] Corrected_Z={:.4} at {}", z, pos);
                }
                lsf.accumulate(pos.x, pos.y, z);
                guard.idle();
            }
            guard.move_z(self.config.probe.z_clearance_deploy);
        }

        let plane = lsf
            .finish()
            .inspect_err(|e| warn!("[Tilt] Could not complete LSF: {}", e))?;

        if verbosity > 2 {
            info!(
                "[Tilt] Plane a={:.7} b={:.7} d={:.7}",
                plane.a, plane.b, plane.d
            );
        }
        self.apply_tilt(&plane, host);
        Ok(plane)
    }

    /// Tilt every cell onto `plane` and shift by its height at the origin.
    pub fn apply_tilt<S: HostServices + ?Sized>(&mut self, plane: &PlaneFit, host: &mut S) {
        let rotation = plane.tilt_rotation();
        for idx in self.mesh.indices() {
            let pos = self.mesh.position(idx);
            let [_, _, z] = rotation.apply(pos.x, pos.y, self.mesh.get(idx));
            let z = z + plane.d;
            self.mesh.set(idx, z);
            host.on_mesh_update(idx, z);
        }
        self.strategy.refresh(&self.mesh);
        debug!("[Tilt] Mesh tilted");
    }
}
