//! Collaborator traits implemented by the embedding firmware or simulator.

use serde::{Deserialize, Serialize};

use crate::compensation::SensorKind;
use crate::core::{GridIndex, XyPos};

/// Which tool point a reachability query refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reference {
    /// The nozzle itself
    Nozzle,
    /// The probe tip, displaced from the nozzle by the probe offset
    Probe,
}

/// Bed probe.
pub trait ProbeDevice {
    /// Deploy, measure and raise at a probe-tip position.
    ///
    /// Returns the trigger height in mm, or `NaN` when the probe failed.
    fn probe_at_point(&mut self, pos: XyPos) -> f32;

    /// True when the given point (nozzle or probe tip) can be placed at `pos`.
    fn position_is_reachable(&self, pos: XyPos, reference: Reference) -> bool;
}

/// Motion system and the correction toggle of the planner.
pub trait MotionDevice {
    /// Nozzle XY in bed coordinates
    fn current_xy(&self) -> XyPos;

    /// Nozzle Z
    fn current_z(&self) -> f32;

    /// Move the nozzle to `pos` at height `z`.
    fn move_to(&mut self, pos: XyPos, z: f32);

    /// Move Z only.
    fn move_z(&mut self, z: f32) {
        let xy = self.current_xy();
        self.move_to(xy, z);
    }

    /// Block until the motion queue drains.
    fn synchronize(&mut self);

    /// Turn mesh correction in the motion path on or off
    fn set_leveling_enabled(&mut self, enabled: bool);

    /// Whether mesh correction is applied
    fn leveling_enabled(&self) -> bool;
}

/// Temperature readings.
pub trait ThermalSensors {
    /// Current temperature of a sensor in °C, `NaN` when it is not fitted.
    fn current_temperature(&self, sensor: SensorKind) -> f32;
}

/// Progress of a multi-step phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseProgress {
    /// Phase label, e.g. "P1" or "J"
    pub phase: &'static str,
    /// 1-based step
    pub current: usize,
    /// Step count, when known
    pub total: usize,
}

/// Foreground-loop services and UI notifications.
///
/// Every method has a no-op default so a bare host only needs the
/// motion, probe and thermal traits.
pub trait HostServices {
    /// Service other duties (heaters, serial link, watchdog).
    ///
    /// Called between probe points, fill steps and rendered map rows.
    fn idle(&mut self) {}

    /// Polled between steps; returning true stops the running phase and
    /// keeps whatever it already wrote.
    fn cancel_requested(&mut self) -> bool {
        false
    }

    /// A mesh cell changed
    fn on_mesh_update(&mut self, _index: GridIndex, _z: f32) {}

    /// A phase advanced one step
    fn on_phase_progress(&mut self, _progress: PhaseProgress) {}
}

/// Everything the leveling workflow needs from its host.
pub trait PrinterHost: ProbeDevice + MotionDevice + ThermalSensors + HostServices {}

impl<T> PrinterHost for T where T: ProbeDevice + MotionDevice + ThermalSensors + HostServices {}
