//! Test utilities for the leveling workflow.
//!
//! [`MockPrinter`] measures a known bed surface, records every probe and
//! move, and can be told to fail probes or request cancellation.

#![allow(dead_code)]

use samatala::compensation::SensorKind;
use samatala::config::{BedSection, LevelingConfig, ProbeSection};
use samatala::core::{GridIndex, XyPos};
use samatala::io::SlotImage;
use samatala::workflow::{
    HostServices, LevelingParams, LevelingSession, LevelingWorkflow, MotionDevice, PhaseProgress,
    ProbeDevice, Reference, ThermalSensors, WorkflowOutcome,
};

/// Tilted plane used by most tests: z = 0.1 + 0.001·x - 0.0005·y
pub fn tilted_plane(pos: XyPos) -> f32 {
    0.1 + 0.001 * pos.x - 0.0005 * pos.y
}

/// Bowl centered on the bed, 0 in the middle rising to ~0.3 at the corners
pub fn bowl(pos: XyPos) -> f32 {
    let dx = pos.x - 110.0;
    let dy = pos.y - 110.0;
    (dx * dx + dy * dy) * 0.3 / (100.0 * 100.0 * 2.0)
}

/// Simulated printer with a fixed bed surface.
pub struct MockPrinter {
    pub xy: XyPos,
    pub z: f32,
    pub leveling: bool,
    pub surface: fn(XyPos) -> f32,
    pub bed: BedSection,
    pub probe: ProbeSection,
    pub fail_at: Vec<XyPos>,
    pub cancel_after: Option<usize>,
    pub temps: [f32; 3],
    pub probes: Vec<XyPos>,
    pub probe_leveling: Vec<bool>,
    pub moves: Vec<(XyPos, f32)>,
    pub updates: usize,
    pub idles: usize,
    pub progress: Vec<PhaseProgress>,
}

impl MockPrinter {
    pub fn new(config: &LevelingConfig, surface: fn(XyPos) -> f32) -> Self {
        Self {
            xy: XyPos::new(110.0, 110.0),
            z: 10.0,
            leveling: false,
            surface,
            bed: config.bed.clone(),
            probe: config.probe.clone(),
            fail_at: Vec::new(),
            cancel_after: None,
            temps: [f32::NAN; 3],
            probes: Vec::new(),
            probe_leveling: Vec::new(),
            moves: Vec::new(),
            updates: 0,
            idles: 0,
            progress: Vec::new(),
        }
    }
}

impl ProbeDevice for MockPrinter {
    fn probe_at_point(&mut self, pos: XyPos) -> f32 {
        self.probes.push(pos);
        self.probe_leveling.push(self.leveling);
        self.xy = pos - self.probe.offset_xy();
        if self.fail_at.iter().any(|f| f.distance(&pos) < 0.5) {
            return f32::NAN;
        }
        (self.surface)(pos)
    }

    fn position_is_reachable(&self, pos: XyPos, reference: Reference) -> bool {
        match reference {
            Reference::Nozzle => self.bed.contains(pos),
            Reference::Probe => self.probe.can_reach(&self.bed, pos),
        }
    }
}

impl MotionDevice for MockPrinter {
    fn current_xy(&self) -> XyPos {
        self.xy
    }

    fn current_z(&self) -> f32 {
        self.z
    }

    fn move_to(&mut self, pos: XyPos, z: f32) {
        self.xy = pos;
        self.z = z;
        self.moves.push((pos, z));
    }

    fn synchronize(&mut self) {}

    fn set_leveling_enabled(&mut self, enabled: bool) {
        self.leveling = enabled;
    }

    fn leveling_enabled(&self) -> bool {
        self.leveling
    }
}

impl ThermalSensors for MockPrinter {
    fn current_temperature(&self, sensor: SensorKind) -> f32 {
        match sensor {
            SensorKind::Probe => self.temps[0],
            SensorKind::Bed => self.temps[1],
            SensorKind::Hotend => self.temps[2],
        }
    }
}

impl HostServices for MockPrinter {
    fn idle(&mut self) {
        self.idles += 1;
    }

    fn cancel_requested(&mut self) -> bool {
        self.cancel_after.is_some_and(|n| self.probes.len() >= n)
    }

    fn on_mesh_update(&mut self, _index: GridIndex, _z: f32) {
        self.updates += 1;
    }

    fn on_phase_progress(&mut self, progress: PhaseProgress) {
        self.progress.push(progress);
    }
}

/// Default layout: 10x10 mesh over 10..210 on a 220 bed, fixed jitter seed.
pub fn test_config() -> LevelingConfig {
    let mut config = LevelingConfig::default();
    config.workflow.jitter_seed = Some(7);
    config
}

/// 5x5 mesh for the faster tests
pub fn small_config() -> LevelingConfig {
    let mut config = test_config();
    config.mesh.points_x = 5;
    config.mesh.points_y = 5;
    config
}

/// Everything one test drives.
pub struct Rig {
    pub workflow: LevelingWorkflow,
    pub printer: MockPrinter,
    pub session: LevelingSession,
    pub store: SlotImage,
}

impl Rig {
    pub fn new(config: LevelingConfig, surface: fn(XyPos) -> f32) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let printer = MockPrinter::new(&config, surface);
        let cells = config.geometry().unwrap().len();
        let store = SlotImage::from_config(&config.storage, cells);
        let workflow = LevelingWorkflow::new(config).unwrap();
        let session = workflow.new_session();
        Self {
            workflow,
            printer,
            session,
            store,
        }
    }

    /// Run one invocation given as YAML words, e.g. `"{P: 1, T: ~}"`.
    pub fn run(&mut self, words: &str) -> samatala::Result<WorkflowOutcome> {
        let params: LevelingParams = serde_yaml::from_str(words).unwrap();
        self.workflow
            .execute(&mut self.printer, &mut self.session, &params, &mut self.store)
    }

    pub fn submit(&mut self, z: f32) -> samatala::Result<WorkflowOutcome> {
        self.workflow
            .submit_operator_z(&mut self.printer, &mut self.session, z)
    }
}
