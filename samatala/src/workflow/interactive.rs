//! Operator-driven phases: P2 manual probing and P4 fine tuning.
//!
//! Both phases span several calls. `execute` positions the nozzle and
//! returns [`PhaseStatus::AwaitingOperator`]; each operator submission
//! stores one value and moves on to the next cell.

use log::{debug, info};

use super::controller::LevelingWorkflow;
use super::guard::LevelingGuard;
use super::host::{MotionDevice, PrinterHost, Reference};
use super::input::EncoderDelta;
use super::outcome::{PartialReason, PhaseStatus, WorkflowOutcome};
use super::params::{ParamError, ResolvedParams, ShimMode};
use super::session::{LevelingSession, ManualStage, OperatorPrompt, SessionPhase};
use crate::error::{Error, Result};
use crate::traversal::{MeshPointType, NearestQuery, find_closest};

/// Lift between the two shim measurements (mm)
const SHIM_RAISE: f32 = 1.0;

/// Truncate to whole micrometers, toward negative infinity.
#[inline]
fn floor_um(z: f32) -> f32 {
    (z * 1000.0).floor() * 0.001
}

impl LevelingWorkflow {
    /// Start P2.
    pub(super) fn begin_manual_probe<H: PrinterHost + ?Sized>(
        &mut self,
        host: &mut H,
        session: &mut LevelingSession,
        p: &ResolvedParams,
        out: &mut WorkflowOutcome,
    ) -> Result<PhaseStatus> {
        let probe = &self.config.probe;
        let bed = &self.config.bed;

        let mut reference = p.reference;
        if p.has_constant() && !p.xy_given {
            // Start in the corner the probe cannot reach
            reference.x = if probe.offset_x > 0.0 { bed.size_x } else { 0.0 };
            reference.y = if probe.offset_y < 0.0 { bed.size_y } else { 0.0 };
        }
        if !host.position_is_reachable(reference, Reference::Nozzle) {
            return Err(Error::Unreachable(reference));
        }

        out.say("Manually probing unreachable mesh locations.");
        let clearance = probe.z_clearance_between_probes;
        host.move_z(clearance);

        session.reference = reference;
        session.verbosity = p.verbosity;
        session.height = p.height.unwrap_or(clearance);
        if let ShimMode::Given(thickness) = p.shim {
            session.shim_thickness = thickness;
        }
        session.saved_enabled = Some(LevelingGuard::acquire(host).into_saved());

        if p.shim == ShimMode::Measure {
            host.move_to(self.mesh_center(), session.height);
            host.synchronize();
            session.phase = SessionPhase::ManualProbe(ManualStage::ShimOn);
            return Ok(PhaseStatus::AwaitingOperator(OperatorPrompt::PlaceShim));
        }
        Ok(self.next_manual_point(host, session, out))
    }

    fn next_manual_point<H: PrinterHost + ?Sized>(
        &mut self,
        host: &mut H,
        session: &mut LevelingSession,
        out: &mut WorkflowOutcome,
    ) -> PhaseStatus {
        let query = NearestQuery {
            kind: MeshPointType::Invalid,
            anchor: session.reference,
            probe_offset: None,
            current: host.current_xy(),
            visited: None,
        };
        let next = find_closest(
            &self.mesh,
            &query,
            Self::nozzle_reachable(host),
            self.config.workflow.search_mode,
        );

        let Some(idx) = next else {
            let reference = session.reference;
            self.close_session(host, session);
            host.move_to(reference, self.config.probe.z_clearance_deploy);
            out.say("G29 P2 finished.");
            return PhaseStatus::Done;
        };

        let pos = self.mesh.position(idx);
        host.move_to(pos, self.config.probe.z_clearance_between_probes);
        host.move_z(session.height);
        host.synchronize();
        session.phase = SessionPhase::ManualProbe(ManualStage::Probing { target: idx });
        PhaseStatus::AwaitingOperator(OperatorPrompt::MeasurePoint { index: idx, pos })
    }

    /// Start P4.
    pub(super) fn begin_fine_tune<H: PrinterHost + ?Sized>(
        &mut self,
        host: &mut H,
        session: &mut LevelingSession,
        p: &ResolvedParams,
        out: &mut WorkflowOutcome,
    ) -> Result<PhaseStatus> {
        if !host.position_is_reachable(p.reference, Reference::Nozzle) {
            return Err(Error::Unreachable(p.reference));
        }
        let height = p.height.unwrap_or(0.0);

        session.reference = p.reference;
        session.verbosity = p.verbosity;
        session.height = height;
        session.visited.reset();
        session.saved_enabled = Some(LevelingGuard::acquire(host).into_saved());

        host.move_to(p.reference, self.config.probe.z_clearance_between_probes);
        host.move_z(height);
        out.say("Fine Tuning Mesh.");
        Ok(self.next_fine_tune(host, session, p.repeat.unwrap_or(1), out))
    }

    fn next_fine_tune<H: PrinterHost + ?Sized>(
        &mut self,
        host: &mut H,
        session: &mut LevelingSession,
        remaining: usize,
        out: &mut WorkflowOutcome,
    ) -> PhaseStatus {
        let query = NearestQuery {
            kind: MeshPointType::NotVisited,
            anchor: session.reference,
            probe_offset: None,
            current: host.current_xy(),
            visited: Some(&session.visited),
        };
        let next = find_closest(
            &self.mesh,
            &query,
            Self::nozzle_reachable(host),
            self.config.workflow.search_mode,
        );
        let Some(idx) = next else {
            return self.finish_fine_tune(host, session, out);
        };
        session.visited.mark(idx);

        let pos = self.mesh.position(idx);
        host.move_to(pos, self.config.probe.z_clearance_between_probes);

        let z = self.mesh.get(idx);
        let value = floor_um(if z.is_nan() { 0.0 } else { z });
        host.move_z(session.height + value);
        session.phase = SessionPhase::FineTune {
            target: idx,
            remaining,
            value,
        };
        PhaseStatus::AwaitingOperator(OperatorPrompt::EditPoint {
            index: idx,
            pos,
            value,
        })
    }

    fn finish_fine_tune<H: PrinterHost + ?Sized>(
        &mut self,
        host: &mut H,
        session: &mut LevelingSession,
        out: &mut WorkflowOutcome,
    ) -> PhaseStatus {
        let reference = session.reference;
        self.close_session(host, session);
        host.move_to(reference, self.config.probe.z_clearance_between_probes);
        out.say("Done Editing Mesh");
        PhaseStatus::Done
    }

    /// Hand the operator's value to the waiting phase.
    ///
    /// For P2 `z` is the nozzle height at the bed (or shim); for P4 it is
    /// the edited mesh value.
    pub fn submit_operator_z<H: PrinterHost + ?Sized>(
        &mut self,
        host: &mut H,
        session: &mut LevelingSession,
        z: f32,
    ) -> Result<WorkflowOutcome> {
        let mut out = WorkflowOutcome::default();
        out.status = match session.phase {
            SessionPhase::Idle => return Err(Error::NoActiveSession),
            SessionPhase::ManualProbe(ManualStage::ShimOn) => {
                session.phase = SessionPhase::ManualProbe(ManualStage::ShimOff { with_shim: z });
                host.move_z(z + SHIM_RAISE);
                PhaseStatus::AwaitingOperator(OperatorPrompt::RemoveShim)
            }
            SessionPhase::ManualProbe(ManualStage::ShimOff { with_shim }) => {
                let thickness = (with_shim - z).abs();
                host.move_z(z + self.config.probe.z_clearance_between_probes);
                if thickness > self.config.workflow.max_shim_thickness {
                    self.close_session(host, session);
                    return Err(ParamError::ShimThickness(thickness).into());
                }
                session.shim_thickness = thickness;
                if session.verbosity > 1 {
                    info!("[Level] Business card is {:.4}mm thick", thickness);
                }
                out.say(format!("Business Card is {:.4}mm thick.", thickness));
                self.next_manual_point(host, session, &mut out)
            }
            SessionPhase::ManualProbe(ManualStage::Probing { target }) => {
                let value = z - session.shim_thickness;
                self.mesh.set(target, value);
                host.on_mesh_update(target, value);
                if session.verbosity > 2 {
                    info!("[Level] Mesh point measured at {:.6}", value);
                } else {
                    debug!("[Level] {} measured at {:.4}", target, value);
                }
                self.next_manual_point(host, session, &mut out)
            }
            SessionPhase::FineTune {
                target, remaining, ..
            } => {
                let value = floor_um(z);
                self.mesh.set(target, value);
                host.on_mesh_update(target, value);
                debug!("[Level] {} edited to {:.3}", target, value);
                if remaining > 1 {
                    self.next_fine_tune(host, session, remaining - 1, &mut out)
                } else {
                    self.finish_fine_tune(host, session, &mut out)
                }
            }
        };
        self.strategy.refresh(&self.mesh);
        Ok(out)
    }

    /// Submit the current nozzle height (P2) or edit value (P4).
    pub fn confirm<H: PrinterHost + ?Sized>(
        &mut self,
        host: &mut H,
        session: &mut LevelingSession,
    ) -> Result<WorkflowOutcome> {
        let z = match session.phase {
            SessionPhase::Idle => return Err(Error::NoActiveSession),
            SessionPhase::ManualProbe(_) => host.current_z(),
            SessionPhase::FineTune { value, .. } => value,
        };
        self.submit_operator_z(host, session, z)
    }

    /// Apply pending encoder clicks.
    ///
    /// P2 moves the nozzle; P4 changes the edit value and moves the nozzle
    /// to follow it. Returns the nozzle height or the edit value.
    pub fn jog_z<H: MotionDevice + ?Sized>(
        &mut self,
        host: &mut H,
        session: &mut LevelingSession,
        encoder: &EncoderDelta,
    ) -> Result<f32> {
        let step = self.config.workflow.encoder_step;
        match &mut session.phase {
            SessionPhase::Idle => Err(Error::NoActiveSession),
            SessionPhase::ManualProbe(_) => {
                let clicks = encoder.take();
                if clicks != 0 {
                    let z = host.current_z() + clicks as f32 * step;
                    host.move_z(z);
                }
                Ok(host.current_z())
            }
            SessionPhase::FineTune { value, .. } => {
                let clicks = encoder.take();
                if clicks != 0 {
                    *value += clicks as f32 * step;
                    host.move_z(session.height + *value);
                }
                Ok(*value)
            }
        }
    }

    /// Abandon the waiting phase, keeping the values entered so far.
    pub fn abort_session<H: PrinterHost + ?Sized>(
        &mut self,
        host: &mut H,
        session: &mut LevelingSession,
    ) -> Result<WorkflowOutcome> {
        let mut out = WorkflowOutcome::default();
        match session.phase {
            SessionPhase::Idle => return Err(Error::NoActiveSession),
            SessionPhase::ManualProbe(_) => {
                self.close_session(host, session);
                host.move_z(self.config.probe.z_clearance_deploy);
                out.say("Mesh only partially populated.");
            }
            SessionPhase::FineTune { .. } => {
                self.close_session(host, session);
                host.move_z(self.config.probe.z_clearance_between_probes);
                out.say("Mesh editing stopped.");
            }
        }
        out.status = self.partial(PartialReason::Cancelled);
        self.strategy.refresh(&self.mesh);
        host.idle();
        Ok(out)
    }
}
