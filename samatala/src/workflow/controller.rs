//! `LevelingWorkflow`: owner of the mesh and dispatcher of every phase.

use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use super::guard::LevelingGuard;
use super::host::{HostServices, MotionDevice, PrinterHost, ProbeDevice, Reference};
use super::outcome::{PartialReason, PhaseStatus, WorkflowOutcome};
use super::params::{LevelingParams, ParamContext, StoreTarget};
use super::session::LevelingSession;
use crate::compensation::{CalibrationError, ProbeTempCompensation, PtcCommand, SensorKind};
use crate::config::LevelingConfig;
use crate::core::XyPos;
use crate::error::{Error, Result};
use crate::io::{CalibrationStore, MapFormat, MeshStore, export_mesh, render_map};
use crate::mesh::MeshGrid;
use crate::strategy::{FadeHeight, LevelingStrategy, build_strategy};

/// Bed-leveling state machine.
///
/// Owns the mesh, the correction strategy and the temperature tables.
/// Each call to [`LevelingWorkflow::execute`] runs one invocation in a
/// fixed order: validate, `A`/`D`, `I`, `Q`, `J`, `P`, `L`, `S`, `T`.
/// Interactive phases (P2, P4) leave the [`LevelingSession`] waiting and
/// continue through [`LevelingWorkflow::submit_operator_z`].
pub struct LevelingWorkflow {
    pub(super) config: LevelingConfig,
    pub(super) mesh: MeshGrid,
    pub(super) strategy: Box<dyn LevelingStrategy>,
    pub(super) fade: FadeHeight,
    pub(super) ptc: ProbeTempCompensation,
    pub(super) active_slot: i32,
    pub(super) rng: SmallRng,
}

impl LevelingWorkflow {
    /// Build the workflow with a zeroed mesh.
    pub fn new(config: LevelingConfig) -> Result<Self> {
        config.validate()?;
        let geometry = config.geometry()?;
        let mesh = MeshGrid::zeroed(geometry);
        let strategy = build_strategy(config.workflow.strategy, &mesh);
        let rng = match config.workflow.jitter_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        info!(
            "[Level] {}x{} mesh over {} .. {}, {} strategy",
            geometry.width(),
            geometry.height(),
            geometry.min(),
            geometry.max(),
            strategy.name()
        );
        Ok(Self {
            fade: FadeHeight(config.workflow.fade_height),
            ptc: config.compensation.build(),
            config,
            mesh,
            strategy,
            active_slot: -1,
            rng,
        })
    }

    /// Configuration in use
    #[inline]
    pub fn config(&self) -> &LevelingConfig {
        &self.config
    }

    /// Current mesh
    #[inline]
    pub fn mesh(&self) -> &MeshGrid {
        &self.mesh
    }

    /// Modify the mesh directly; the strategy is refreshed afterwards.
    pub fn edit_mesh<R>(&mut self, edit: impl FnOnce(&mut MeshGrid) -> R) -> R {
        let result = edit(&mut self.mesh);
        self.strategy.refresh(&self.mesh);
        result
    }

    /// Active correction model
    #[inline]
    pub fn strategy(&self) -> &dyn LevelingStrategy {
        self.strategy.as_ref()
    }

    /// Storage slot of the current mesh, -1 for none
    #[inline]
    pub fn active_slot(&self) -> i32 {
        self.active_slot
    }

    /// Fade height in use
    #[inline]
    pub fn fade(&self) -> FadeHeight {
        self.fade
    }

    /// Temperature compensation tables
    #[inline]
    pub fn ptc(&self) -> &ProbeTempCompensation {
        &self.ptc
    }

    /// Mutable temperature compensation tables
    #[inline]
    pub fn ptc_mut(&mut self) -> &mut ProbeTempCompensation {
        &mut self.ptc
    }

    /// Fresh idle session sized for this mesh
    pub fn new_session(&self) -> LevelingSession {
        LevelingSession::new(self.mesh.geometry())
    }

    /// Z correction (mm) for the motion path at `pos` and nozzle height `z`.
    ///
    /// Zero while the strategy is not valid.
    pub fn correction_at(&self, pos: XyPos, z: f32) -> f32 {
        if !self.strategy.is_valid() {
            return 0.0;
        }
        self.strategy.correction_at(pos) * self.fade.factor(z)
    }

    /// Run one invocation.
    ///
    /// Parameter errors are returned before anything changes. A phase
    /// stopped by cancellation or a failed probe is reported through
    /// [`PhaseStatus::Partial`] with the mesh kept as far as it got.
    pub fn execute<H: PrinterHost + ?Sized>(
        &mut self,
        host: &mut H,
        session: &mut LevelingSession,
        params: &LevelingParams,
        store: &mut dyn MeshStore,
    ) -> Result<WorkflowOutcome> {
        let ctx = ParamContext {
            geometry: self.mesh.geometry(),
            bed: &self.config.bed,
            current: host.current_xy(),
            active_slot: self.active_slot,
            slot_count: store.slot_count(),
            max_shim: self.config.workflow.max_shim_thickness,
        };
        let p = params.validate(&ctx).inspect_err(|e| warn!("[Level] {}", e))?;
        let mut out = WorkflowOutcome::default();

        if p.phase.is_some() && session.is_active() {
            warn!("[Level] New phase requested; closing the open session");
            self.abort_session(host, session)?;
        }

        if let Some(height) = p.fade {
            self.fade = FadeHeight(height);
            debug!("[Level] Fade height {:.1}", height);
        }

        match p.toggle {
            Some(true) => {
                self.activate(host, &mut out);
            }
            Some(false) => {
                host.set_leveling_enabled(false);
                out.say("Bed leveling off.");
            }
            None => {}
        }

        if let Some(count) = p.invalidate {
            self.invalidate_nearest(host, p.reference, count, &mut out);
        }

        if let Some(pattern) = p.test_pattern {
            self.load_test_pattern(host, pattern, p.constant, &mut out);
        }

        if let Some(size) = p.tilt {
            let result = self.tilt_mesh(host, size, p.verbosity);
            let center = self.mesh_center();
            host.move_to(center, host.current_z());
            let plane = result?;
            out.plane = Some(plane);
        }

        if let Some(phase) = p.phase {
            let slot = p.effective_slot(self.active_slot);
            if slot != self.active_slot {
                self.active_slot = slot;
                out.say("Default storage slot 0 selected.");
            }
            out.status = match p.phase_number() {
                Some(0) => self.reset_mesh(host, &mut out),
                Some(1) => self.probe_entire_mesh(host, &p, &mut out),
                Some(2) => self.begin_manual_probe(host, session, &p, &mut out)?,
                Some(3) => self.fill_mesh(host, phase, &p, &mut out)?,
                Some(4) => self.begin_fine_tune(host, session, &p, &mut out)?,
                Some(5) => {
                    out.statistics = self.adjust_mesh_to_mean(host, p.constant, &mut out);
                    PhaseStatus::Done
                }
                _ => self.shift_mesh_height(host, p.constant.unwrap_or(0.0), &mut out),
            };
        }

        if let Some(slot) = p.load {
            store.load(slot, &mut self.mesh)?;
            self.active_slot = slot as i32;
            out.say(format!("Mesh loaded from slot {}.", slot));
        }

        match p.store {
            Some(StoreTarget::Export) => {
                out.export = Some(export_mesh(&self.mesh));
                out.say("Mesh exported.");
            }
            Some(StoreTarget::Slot(slot)) => {
                store.store(slot, &self.mesh)?;
                self.active_slot = slot as i32;
                out.say(format!("Mesh saved in slot {}.", slot));
            }
            None => {}
        }

        self.strategy.refresh(&self.mesh);

        if let Some(code) = p.map {
            out.map = Some(self.render(host, code));
        }

        Ok(out)
    }

    /// Enable correction if the strategy accepts the mesh. Returns whether
    /// correction is now on.
    pub fn activate<H: MotionDevice + ?Sized>(
        &mut self,
        host: &mut H,
        out: &mut WorkflowOutcome,
    ) -> bool {
        self.strategy.refresh(&self.mesh);
        if self.strategy.is_valid() {
            host.set_leveling_enabled(true);
            out.say("Bed leveling on.");
            true
        } else {
            warn!(
                "[Level] {} correction is not valid for this mesh",
                self.strategy.name()
            );
            out.say("?Mesh is incomplete. Bed leveling stays off.");
            false
        }
    }

    /// Render the mesh in the format of a `T` code.
    pub fn render<H: PrinterHost + ?Sized>(&self, host: &mut H, code: u8) -> String {
        let compact = self.config.workflow.compact_map;
        let format = MapFormat::from_code(code, compact).unwrap_or(MapFormat::Human { compact });
        let current = self.mesh.geometry().closest_index(host.current_xy());
        render_map(&self.mesh, format, Some(current), || host.idle())
    }

    /// Apply a compensation table command; returns the report text, if any.
    pub fn apply_ptc_command(&mut self, command: &PtcCommand) -> Result<Option<String>> {
        Ok(command.apply(&mut self.ptc)?)
    }

    /// Start calibrating a sensor: the reading at `pos` becomes the zero
    /// reference at the current temperature.
    pub fn begin_calibration<H: PrinterHost + ?Sized>(
        &mut self,
        host: &mut H,
        sensor: SensorKind,
        pos: XyPos,
    ) -> Result<f32> {
        let z = host.probe_at_point(pos);
        if z.is_nan() {
            return Err(Error::ProbeFailed(pos));
        }
        self.ptc.prepare_new_calibration(sensor, z)?;
        info!(
            "[PTC] {} reference {:.4}mm at {:.1}C",
            sensor,
            z,
            host.current_temperature(sensor)
        );
        Ok(z)
    }

    /// Probe `pos` and store the reading as the next calibration sample.
    ///
    /// The sensor must sit within half a step of the sample's grid
    /// temperature; the host is responsible for heating or cooling to it.
    pub fn record_calibration_sample<H: PrinterHost + ?Sized>(
        &mut self,
        host: &mut H,
        pos: XyPos,
    ) -> Result<usize> {
        let run = *self.ptc.run().ok_or(CalibrationError::NotRunning)?;
        let table = self.ptc.table(run.sensor);
        if run.index < table.offsets().len() {
            let grid = table.grid();
            let expected = grid.temp_at(run.index + 1);
            let found = host.current_temperature(run.sensor);
            if !((found - expected).abs() <= grid.temp_resolution / 2.0) {
                warn!(
                    "[PTC] {} sample {} at {:.1}C, expected {:.1}C",
                    run.sensor, run.index, found, expected
                );
                return Err(CalibrationError::OffTemperature {
                    sensor: run.sensor,
                    expected,
                    found,
                }
                .into());
            }
        }
        let z = host.probe_at_point(pos);
        if z.is_nan() {
            return Err(Error::ProbeFailed(pos));
        }
        Ok(self.ptc.push_back_measurement(z)?)
    }

    /// Complete the running calibration.
    pub fn finish_calibration(&mut self) -> Result<SensorKind> {
        Ok(self.ptc.finish_calibration()?)
    }

    /// Write every temperature table to `store`.
    pub fn save_calibration(&self, store: &mut dyn CalibrationStore) -> Result<()> {
        store.store_calibration(&self.ptc)?;
        debug!("[PTC] Tables saved");
        Ok(())
    }

    /// Restore temperature tables from `store`; returns how many were found.
    pub fn load_calibration(&mut self, store: &dyn CalibrationStore) -> Result<usize> {
        let count = store.load_calibration(&mut self.ptc)?;
        if count > 0 {
            info!("[PTC] {} tables restored", count);
        }
        Ok(count)
    }

    /// Probe at `pos` with the probe Z offset and temperature compensation applied.
    pub(super) fn probe_compensated<H: PrinterHost + ?Sized>(&self, host: &mut H, pos: XyPos) -> f32 {
        let raw = host.probe_at_point(pos);
        if raw.is_nan() {
            return raw;
        }
        let mut z = raw + self.config.probe.offset_z;
        if self.config.compensation.enabled {
            for sensor in [SensorKind::Probe, SensorKind::Bed] {
                let temp = host.current_temperature(sensor);
                if temp.is_finite() {
                    z = self.ptc.compensate_measurement(sensor, temp, z);
                }
            }
        }
        z
    }

    pub(super) fn mesh_center(&self) -> XyPos {
        let g = self.mesh.geometry();
        XyPos::new((g.min().x + g.max().x) / 2.0, (g.min().y + g.max().y) / 2.0)
    }

    pub(super) fn partial(&self, reason: PartialReason) -> PhaseStatus {
        let defined = self.mesh.defined_count();
        PhaseStatus::Partial {
            defined,
            remaining: self.mesh.values().len() - defined,
            reason,
        }
    }

    /// Restore the correction state captured when an interactive phase began.
    pub(super) fn close_session<H: MotionDevice + ?Sized>(
        &self,
        host: &mut H,
        session: &mut LevelingSession,
    ) {
        if let Some(saved) = session.finish() {
            drop(LevelingGuard::resume(host, saved));
        }
    }

    pub(super) fn notify_all<H: HostServices + ?Sized>(&self, host: &mut H) {
        for (idx, z) in self.mesh.defined() {
            host.on_mesh_update(idx, z);
        }
        host.idle();
    }

    pub(super) fn nozzle_reachable<H: ProbeDevice + ?Sized>(host: &H) -> impl FnMut(XyPos) -> bool + '_ {
        move |pos| host.position_is_reachable(pos, Reference::Nozzle)
    }
}
