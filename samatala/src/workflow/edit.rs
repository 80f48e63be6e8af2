//! Non-interactive mesh edits: P0, P3, P5, P6, `I` and `Q`.

use std::ops::ControlFlow;

use log::{debug, info};

use super::controller::LevelingWorkflow;
use super::host::{HostServices, PrinterHost};
use super::outcome::{PartialReason, PhaseStatus, WorkflowOutcome};
use super::params::ResolvedParams;
use crate::core::{GridIndex, XyPos};
use crate::error::Result;
use crate::fill::{FillError, fill_weighted, smart_fill};
use crate::mesh::MeshStatistics;
use crate::traversal::{MeshPointType, NearestQuery, find_closest};

/// Cells processed between idle calls in long loops
const IDLE_INTERVAL: usize = 20;

/// Fill mode selected by a `P3.x` value: 1 for `P3.1x`, anything else is
/// smart fill.
fn fill_selector(phase: f32) -> i32 {
    ((phase * 10.0) + 1e-3).trunc() as i32 - 30
}

/// Weight factor of `P3.1x`: `10^((P - 3.10) * 100)`, zero for plain `P3.1`.
fn weight_factor(phase: f32) -> f32 {
    let power = (phase - 3.10) * 100.0;
    if power.abs() < 1e-3 {
        0.0
    } else {
        10f32.powf(power)
    }
}

impl LevelingWorkflow {
    /// P0: zero the mesh and turn correction off.
    pub(super) fn reset_mesh<H: PrinterHost + ?Sized>(
        &mut self,
        host: &mut H,
        out: &mut WorkflowOutcome,
    ) -> PhaseStatus {
        host.set_leveling_enabled(false);
        self.mesh.fill_all(0.0);
        self.notify_all(host);
        out.say("Mesh zeroed.");
        PhaseStatus::Done
    }

    /// P3: constant fill of the nearest gaps, smart fill, or weighted fill.
    pub(super) fn fill_mesh<H: PrinterHost + ?Sized>(
        &mut self,
        host: &mut H,
        phase: f32,
        p: &ResolvedParams,
        out: &mut WorkflowOutcome,
    ) -> Result<PhaseStatus> {
        if let Some(value) = p.constant {
            let count = p.repeat.unwrap_or(1);
            self.fill_constant(host, p.reference, value, count);
            out.say(format!("Mesh filled with {:.3}.", value));
            return Ok(PhaseStatus::Done);
        }

        if fill_selector(phase) != 1 {
            let filled = smart_fill(&mut self.mesh);
            self.notify_all(host);
            out.say(format!("Smart fill: {} cells extrapolated.", filled));
            return Ok(PhaseStatus::Done);
        }

        let g = self.mesh.geometry();
        let scale = weight_factor(phase) * g.spacing_x().max(g.spacing_y());
        debug!("[Fill] P{:.2}: weight scale {:.3}", phase, scale);

        let mut steps = 0;
        let result = fill_weighted(&mut self.mesh, scale, |idx, z| {
            host.on_mesh_update(idx, z);
            steps += 1;
            if steps % IDLE_INTERVAL == 0 {
                host.idle();
            }
            if host.cancel_requested() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        match result {
            Ok(filled) => {
                out.say(format!("Weighted fill: {} cells extrapolated.", filled));
                Ok(PhaseStatus::Done)
            }
            Err(FillError::Cancelled { .. }) => {
                out.say("Fill cancelled.");
                Ok(self.partial(PartialReason::Cancelled))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn fill_constant<H: PrinterHost + ?Sized>(
        &mut self,
        host: &mut H,
        reference: XyPos,
        value: f32,
        count: usize,
    ) {
        if count >= self.mesh.values().len() {
            self.mesh.fill_all(value);
            self.notify_all(host);
            return;
        }
        for _ in 0..count {
            match self.closest_of_type(host, MeshPointType::Invalid, reference) {
                Some(idx) => {
                    self.mesh.set(idx, value);
                    host.on_mesh_update(idx, value);
                }
                None => {
                    // Nothing reachable is left: fill every remaining gap
                    let gaps: Vec<GridIndex> = self
                        .mesh
                        .indices()
                        .filter(|idx| !self.mesh.is_defined(*idx))
                        .collect();
                    for idx in gaps {
                        self.mesh.set(idx, value);
                        host.on_mesh_update(idx, value);
                    }
                    break;
                }
            }
        }
    }

    /// P5: report mean and deviation; with `offset`, move the mean to `-offset`.
    pub(super) fn adjust_mesh_to_mean<H: HostServices + ?Sized>(
        &mut self,
        host: &mut H,
        offset: Option<f32>,
        out: &mut WorkflowOutcome,
    ) -> Option<MeshStatistics> {
        let Some(stats) = self.mesh.mean_and_stddev() else {
            out.say("No mesh points defined.");
            return None;
        };
        out.say(format!("# of samples: {}", stats.count));
        out.say(format!("Mean Mesh Height: {:.6}", stats.mean));
        out.say(format!("Standard Deviation: {:.6}", stats.std_dev));

        if let Some(offset) = offset {
            self.mesh.shift_by(-(stats.mean + offset));
            self.notify_all(host);
        }
        Some(stats)
    }

    /// P6: add `delta` to every defined cell.
    pub(super) fn shift_mesh_height<H: HostServices + ?Sized>(
        &mut self,
        host: &mut H,
        delta: f32,
        out: &mut WorkflowOutcome,
    ) -> PhaseStatus {
        self.mesh.shift_by(delta);
        self.notify_all(host);
        out.say(format!("Mesh shifted by {:.4}.", delta));
        PhaseStatus::Done
    }

    /// `I`: invalidate the `count` defined cells nearest `reference`.
    pub(super) fn invalidate_nearest<H: PrinterHost + ?Sized>(
        &mut self,
        host: &mut H,
        reference: XyPos,
        count: usize,
        out: &mut WorkflowOutcome,
    ) {
        if count >= self.mesh.values().len() {
            self.mesh.invalidate_all();
            out.say("Entire Mesh invalidated.");
            return;
        }
        for n in 0..count {
            if n % IDLE_INTERVAL == IDLE_INTERVAL - 1 {
                host.idle();
            }
            let Some(idx) = self.closest_of_type(host, MeshPointType::Real, reference) else {
                self.mesh.invalidate_all();
                out.say("Entire Mesh invalidated.");
                return;
            };
            self.mesh.set(idx, f32::NAN);
            host.on_mesh_update(idx, f32::NAN);
        }
        out.say("Locations invalidated.");
    }

    /// `Q`: add a synthetic surface to the mesh.
    pub(super) fn load_test_pattern<H: HostServices + ?Sized>(
        &mut self,
        host: &mut H,
        pattern: u8,
        constant: Option<f32>,
        out: &mut WorkflowOutcome,
    ) {
        let g = *self.mesh.geometry();
        let (w, h) = (g.width(), g.height());
        out.say("Loading test_pattern values.");

        let mut raise = |x: usize, y: usize, delta: f32| {
            if let Some(idx) = g.index(x, y) {
                let z = self.mesh.get(idx) + delta;
                self.mesh.set(idx, z);
                host.on_mesh_update(idx, z);
            }
        };

        match pattern {
            0 => {
                // Bowl, like a badly calibrated delta
                for x in 0..w {
                    for y in 0..h {
                        let dx = 0.5 * w as f32 - x as f32;
                        let dy = 0.5 * h as f32 - y as f32;
                        raise(x, y, 2.0 * dx.hypot(dy));
                    }
                }
            }
            1 => {
                // Raised diagonal two cells thick
                for i in 0..w.min(h) {
                    raise(i, i, 9.999);
                    let j = if i + 1 < h { i + 1 } else { i - 1 };
                    raise(i, j, 9.999);
                }
            }
            _ => {
                // Raised block over the center third
                let delta = constant.unwrap_or(9.99);
                for x in w / 3..2 * w / 3 {
                    for y in h / 3..2 * h / 3 {
                        raise(x, y, delta);
                    }
                }
            }
        }
        info!("[Level] Test pattern {} loaded", pattern);
    }

    fn closest_of_type<H: PrinterHost + ?Sized>(
        &self,
        host: &H,
        kind: MeshPointType,
        reference: XyPos,
    ) -> Option<GridIndex> {
        let query = NearestQuery {
            kind,
            anchor: reference,
            probe_offset: None,
            current: host.current_xy(),
            visited: None,
        };
        find_closest(
            &self.mesh,
            &query,
            Self::nozzle_reachable(host),
            self.config.workflow.search_mode,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fill_selector() {
        assert_eq!(fill_selector(3.0), 0);
        assert_eq!(fill_selector(3.1), 1);
        assert_eq!(fill_selector(3.12), 1);
        assert_eq!(fill_selector(3.19), 1);
        assert_eq!(fill_selector(3.2), 2);
    }

    #[test]
    fn test_weight_factor() {
        assert_eq!(weight_factor(3.1), 0.0);
        assert_relative_eq!(weight_factor(3.11), 10.0, max_relative = 1e-3);
        assert_relative_eq!(weight_factor(3.12), 100.0, max_relative = 1e-3);
    }
}
