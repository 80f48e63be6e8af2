//! Executes scenario steps against a simulated printer.

use log::{debug, info, warn};
use samatala::compensation::SensorKind;
use samatala::io::SlotImage;
use samatala::workflow::{
    EncoderDelta, LevelingParams, LevelingSession, LevelingWorkflow, MotionDevice, OperatorPrompt,
    PhaseStatus, WorkflowOutcome,
};
use samatala::XyPos;

use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::printer::{PrinterStats, SimPrinter};
use crate::scenario::{Scenario, Step};

/// Summary of a finished scenario
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Steps executed
    pub steps: usize,
    /// Printer counters
    pub stats: PrinterStats,
    /// Defined mesh cells at the end
    pub defined: usize,
    /// Largest |mesh - true bed| over defined cells (mm)
    pub max_error: Option<f32>,
    /// Operator-facing output in order: messages, maps, exports and reports
    pub output: Vec<String>,
}

/// Drives one workflow, one printer and one slot image through scenarios.
pub struct ScenarioRunner {
    workflow: LevelingWorkflow,
    printer: SimPrinter,
    session: LevelingSession,
    store: SlotImage,
    encoder: EncoderDelta,
    prompt: Option<OperatorPrompt>,
    output: Vec<String>,
}

impl ScenarioRunner {
    /// Build from the simulator configuration with an empty slot image.
    pub fn new(config: &SimConfig) -> Result<Self> {
        let workflow = LevelingWorkflow::new(config.leveling.clone())?;
        let cells = workflow.mesh().geometry().len();
        let store = SlotImage::from_config(&workflow.config().storage, cells);
        Self::with_store(config, workflow, store)
    }

    /// Build around an existing slot image, restoring its temperature tables.
    pub fn with_image(config: &SimConfig, store: SlotImage) -> Result<Self> {
        let mut workflow = LevelingWorkflow::new(config.leveling.clone())?;
        workflow.load_calibration(&store)?;
        Self::with_store(config, workflow, store)
    }

    fn with_store(config: &SimConfig, workflow: LevelingWorkflow, store: SlotImage) -> Result<Self> {
        let session = workflow.new_session();
        Ok(Self {
            workflow,
            printer: SimPrinter::new(config),
            session,
            store,
            encoder: EncoderDelta::new(),
            prompt: None,
            output: Vec::new(),
        })
    }

    /// The leveling workflow
    pub fn workflow(&self) -> &LevelingWorkflow {
        &self.workflow
    }

    /// The slot image, for saving after the run
    pub fn store(&self) -> &SlotImage {
        &self.store
    }

    /// Render the current mesh in a `T` format
    pub fn render_map(&mut self, code: u8) -> String {
        self.workflow.render(&mut self.printer, code)
    }

    /// Run every step in order, stopping at the first failure.
    pub fn run(&mut self, scenario: &Scenario) -> Result<RunSummary> {
        info!(
            "[Sim] Scenario '{}' ({} steps)",
            scenario.name,
            scenario.steps.len()
        );
        if !scenario.description.is_empty() {
            debug!("[Sim] {}", scenario.description);
        }

        for (i, step) in scenario.steps.iter().enumerate() {
            let number = i + 1;
            debug!("[Sim] Step {}: {}", number, step.label());
            self.run_step(number, step)?;
        }

        Ok(RunSummary {
            steps: scenario.steps.len(),
            stats: self.printer.stats(),
            defined: self.workflow.mesh().defined_count(),
            max_error: self.max_error(),
            output: std::mem::take(&mut self.output),
        })
    }

    /// Run one step. `number` is 1-based and only used in errors.
    pub fn run_step(&mut self, number: usize, step: &Step) -> Result<()> {
        match step {
            Step::Command {
                words,
                expect_error,
            } => self.command(number, words, *expect_error),
            Step::Operator { z } => {
                let out = self
                    .workflow
                    .submit_operator_z(&mut self.printer, &mut self.session, *z)?;
                self.record(out);
                Ok(())
            }
            Step::OperatorAll { offset, shim } => self.answer_all(number, *offset, *shim),
            Step::Encoder { clicks } => {
                self.encoder.add(*clicks);
                let z = self
                    .workflow
                    .jog_z(&mut self.printer, &mut self.session, &self.encoder)?;
                debug!("[Sim] Jogged to {:.3}", z);
                Ok(())
            }
            Step::Confirm => {
                let out = self.workflow.confirm(&mut self.printer, &mut self.session)?;
                self.record(out);
                Ok(())
            }
            Step::Abort => {
                let out = self
                    .workflow
                    .abort_session(&mut self.printer, &mut self.session)?;
                self.record(out);
                Ok(())
            }
            Step::CancelAfter { probes } => {
                self.printer.cancel_after(*probes);
                Ok(())
            }
            Step::ClearCancel => {
                self.printer.clear_cancel();
                Ok(())
            }
            Step::SetTemperature { sensor, temp } => {
                self.printer.set_temperature(*sensor, *temp);
                Ok(())
            }
            Step::Calibrate {
                sensor,
                x,
                y,
                samples,
            } => self.calibrate(*sensor, XyPos::new(*x, *y), *samples),
            Step::Ptc { command } => {
                if let Some(report) = self.workflow.apply_ptc_command(command)? {
                    self.output.push(report);
                }
                self.workflow.save_calibration(&mut self.store)?;
                Ok(())
            }
            Step::CheckMesh {
                tolerance,
                complete,
            } => self.check_mesh(number, *tolerance, *complete),
        }
    }

    fn command(&mut self, number: usize, words: &LevelingParams, expect_error: bool) -> Result<()> {
        let result = self.workflow.execute(
            &mut self.printer,
            &mut self.session,
            words,
            &mut self.store,
        );
        match (result, expect_error) {
            (Ok(out), false) => {
                self.record(out);
                Ok(())
            }
            (Err(e), true) => {
                info!("[Sim] Rejected as expected: {}", e);
                Ok(())
            }
            (Ok(_), true) => Err(SimError::Scenario {
                step: number,
                message: "command was expected to fail".to_string(),
            }),
            (Err(e), false) => Err(e.into()),
        }
    }

    /// Answer every prompt from the true bed until the phase ends.
    fn answer_all(&mut self, number: usize, offset: f32, shim: f32) -> Result<()> {
        // Every cell once plus both shim prompts
        let limit = self.workflow.mesh().geometry().len() + 2;
        for _ in 0..limit {
            let Some(prompt) = self.prompt else {
                return Ok(());
            };
            let z = match prompt {
                OperatorPrompt::PlaceShim => self.bed_under_nozzle() + shim,
                OperatorPrompt::RemoveShim => self.bed_under_nozzle(),
                OperatorPrompt::MeasurePoint { pos, .. } => {
                    self.printer.true_height(pos) + self.session.shim_thickness() + offset
                }
                OperatorPrompt::EditPoint { pos, .. } => self.printer.true_height(pos) + offset,
            };
            let out = self
                .workflow
                .submit_operator_z(&mut self.printer, &mut self.session, z)?;
            self.record(out);
        }
        match self.prompt {
            None => Ok(()),
            Some(prompt) => Err(SimError::Scenario {
                step: number,
                message: format!("still waiting after {} answers: {}", limit, prompt),
            }),
        }
    }

    fn bed_under_nozzle(&self) -> f32 {
        self.printer.true_height(self.printer.current_xy())
    }

    fn calibrate(&mut self, sensor: SensorKind, pos: XyPos, samples: Option<usize>) -> Result<()> {
        let grid = *self.workflow.ptc().table(sensor).grid();
        let count = samples.unwrap_or(grid.measurements).min(grid.measurements);

        self.printer.set_temperature(sensor, grid.start_temp);
        self.workflow
            .begin_calibration(&mut self.printer, sensor, pos)?;
        for i in 1..=count {
            self.printer.set_temperature(sensor, grid.temp_at(i));
            self.workflow
                .record_calibration_sample(&mut self.printer, pos)?;
        }
        let sensor = self.workflow.finish_calibration()?;
        info!("[Sim] {} calibrated with {} samples", sensor, count);
        self.workflow.save_calibration(&mut self.store)?;
        Ok(())
    }

    fn check_mesh(&self, number: usize, tolerance: f32, complete: bool) -> Result<()> {
        let mesh = self.workflow.mesh();
        if complete && !mesh.is_fully_defined() {
            return Err(SimError::Scenario {
                step: number,
                message: format!(
                    "mesh has {} of {} cells defined",
                    mesh.defined_count(),
                    mesh.geometry().len()
                ),
            });
        }
        let Some(error) = self.max_error() else {
            return Err(SimError::Scenario {
                step: number,
                message: "no mesh cells defined".to_string(),
            });
        };
        if error > tolerance {
            return Err(SimError::Scenario {
                step: number,
                message: format!("mesh error {:.4}mm exceeds {:.4}mm", error, tolerance),
            });
        }
        info!("[Sim] Mesh within {:.4}mm of the bed (max {:.4})", tolerance, error);
        Ok(())
    }

    fn max_error(&self) -> Option<f32> {
        let mesh = self.workflow.mesh();
        mesh.defined()
            .map(|(idx, z)| (z - self.printer.true_height(mesh.position(idx))).abs())
            .reduce(f32::max)
    }

    fn record(&mut self, out: WorkflowOutcome) {
        self.prompt = match out.status {
            PhaseStatus::AwaitingOperator(prompt) => {
                debug!("[Sim] Waiting: {}", prompt);
                Some(prompt)
            }
            PhaseStatus::Partial {
                defined,
                remaining,
                reason,
            } => {
                warn!(
                    "[Sim] Phase stopped ({:?}): {} defined, {} remaining",
                    reason, defined, remaining
                );
                None
            }
            PhaseStatus::Done => None,
        };
        self.output.extend(out.messages);
        if let Some(stats) = out.statistics {
            debug!("[Sim] Mesh statistics {:?}", stats);
        }
        if let Some(map) = out.map {
            self.output.push(map);
        }
        if let Some(export) = out.export {
            self.output.push(export);
        }
    }
}
