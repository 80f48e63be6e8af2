//! Simulated printer implementing the leveling host traits.

use log::{debug, trace};
use samatala::compensation::SensorKind;
use samatala::config::{BedSection, ProbeSection};
use samatala::core::GridIndex;
use samatala::workflow::{
    HostServices, MotionDevice, PhaseProgress, ProbeDevice, Reference, ThermalSensors,
};
use samatala::XyPos;

use crate::config::{ProbeModelConfig, SimConfig};
use crate::noise::NoiseGenerator;
use crate::surface::BedSurface;

/// Counters collected while a scenario runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrinterStats {
    /// Probe attempts, failed ones included
    pub probes: usize,
    /// Probes that returned no reading
    pub failed_probes: usize,
    /// Motion commands
    pub moves: usize,
    /// Mesh cell notifications
    pub mesh_updates: usize,
}

/// Printer with a known bed, a noisy probe and drifting temperatures.
pub struct SimPrinter {
    surface: BedSurface,
    probe_model: ProbeModelConfig,
    bed: BedSection,
    probe: ProbeSection,
    noise: NoiseGenerator,
    xy: XyPos,
    z: f32,
    leveling: bool,
    temps: [f32; 3],
    cancel_at: Option<usize>,
    stats: PrinterStats,
}

impl SimPrinter {
    /// Build from the simulator configuration, nozzle parked at the bed center.
    pub fn new(config: &SimConfig) -> Self {
        let thermal = &config.thermal;
        let temps = [thermal.probe, thermal.bed, thermal.hotend].map(|t| t.unwrap_or(f32::NAN));
        Self {
            surface: config.surface.clone(),
            probe_model: config.probe.clone(),
            bed: config.leveling.bed.clone(),
            probe: config.leveling.probe.clone(),
            noise: NoiseGenerator::new(config.random_seed),
            xy: config.leveling.bed.center(),
            z: config.leveling.probe.z_clearance_deploy,
            leveling: false,
            temps,
            cancel_at: None,
            stats: PrinterStats::default(),
        }
    }

    /// Counters so far
    #[inline]
    pub fn stats(&self) -> PrinterStats {
        self.stats
    }

    /// True bed height, for comparing against the mesh
    #[inline]
    pub fn true_height(&self, pos: XyPos) -> f32 {
        self.surface.height_at(pos)
    }

    /// Set a sensor temperature
    pub fn set_temperature(&mut self, sensor: SensorKind, temp: f32) {
        self.temps[sensor.index()] = temp;
        debug!("[Sim] {} at {:.1}C", sensor, temp);
    }

    /// Request cancellation once `probes` more probes have run
    pub fn cancel_after(&mut self, probes: usize) {
        self.cancel_at = Some(self.stats.probes + probes);
    }

    /// Drop a pending cancellation request
    pub fn clear_cancel(&mut self) {
        self.cancel_at = None;
    }

    fn thermal_drift(&self) -> f32 {
        let temp = self.temps[SensorKind::Probe.index()];
        if !temp.is_finite() {
            return 0.0;
        }
        (temp - self.probe_model.drift_reference) * self.probe_model.drift_um_per_c / 1000.0
    }
}

impl ProbeDevice for SimPrinter {
    fn probe_at_point(&mut self, pos: XyPos) -> f32 {
        self.stats.probes += 1;
        self.xy = pos - self.probe.offset_xy();

        let probe_temp = &mut self.temps[SensorKind::Probe.index()];
        if probe_temp.is_finite() {
            *probe_temp += self.probe_model.heating_per_probe;
        }

        if self.noise.chance(self.probe_model.failure_rate) {
            self.stats.failed_probes += 1;
            debug!("[Sim] Probe failed at {}", pos);
            return f32::NAN;
        }
        let z = self.surface.height_at(pos)
            + self.thermal_drift()
            + self.noise.gaussian(self.probe_model.noise_stddev);
        trace!("[Sim] Probe at {}: {:.4}", pos, z);
        z
    }

    fn position_is_reachable(&self, pos: XyPos, reference: Reference) -> bool {
        match reference {
            Reference::Nozzle => self.bed.contains(pos),
            Reference::Probe => self.probe.can_reach(&self.bed, pos),
        }
    }
}

impl MotionDevice for SimPrinter {
    fn current_xy(&self) -> XyPos {
        self.xy
    }

    fn current_z(&self) -> f32 {
        self.z
    }

    fn move_to(&mut self, pos: XyPos, z: f32) {
        self.stats.moves += 1;
        self.xy = pos;
        self.z = z;
        trace!("[Sim] Move to {} z={:.3}", pos, z);
    }

    fn synchronize(&mut self) {}

    fn set_leveling_enabled(&mut self, enabled: bool) {
        if self.leveling != enabled {
            debug!("[Sim] Leveling {}", if enabled { "on" } else { "off" });
        }
        self.leveling = enabled;
    }

    fn leveling_enabled(&self) -> bool {
        self.leveling
    }
}

impl ThermalSensors for SimPrinter {
    fn current_temperature(&self, sensor: SensorKind) -> f32 {
        self.temps[sensor.index()]
    }
}

impl HostServices for SimPrinter {
    fn cancel_requested(&mut self) -> bool {
        self.cancel_at.is_some_and(|n| self.stats.probes >= n)
    }

    fn on_mesh_update(&mut self, _index: GridIndex, _z: f32) {
        self.stats.mesh_updates += 1;
    }

    fn on_phase_progress(&mut self, progress: PhaseProgress) {
        if progress.current % 10 == 0 || progress.current == progress.total {
            debug!(
                "[Sim] {} {}/{}",
                progress.phase, progress.current, progress.total
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config(yaml: &str) -> SimConfig {
        SimConfig::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_probe_reads_surface() {
        let mut printer = SimPrinter::new(&config("surface:\n  offset: 0.25\n"));
        let z = printer.probe_at_point(XyPos::new(50.0, 50.0));
        assert_relative_eq!(z, 0.25, epsilon = 1e-6);
        assert_eq!(printer.stats().probes, 1);
        // Nozzle ends up displaced by the probe offset
        assert_eq!(printer.current_xy(), XyPos::new(40.0, 40.0));
    }

    #[test]
    fn test_thermal_drift_follows_probe_temperature() {
        let mut printer = SimPrinter::new(&config(
            "probe:\n  drift_um_per_c: 10.0\nthermal:\n  probe: 30.0\n",
        ));
        let cold = printer.probe_at_point(XyPos::new(50.0, 50.0));
        printer.set_temperature(SensorKind::Probe, 40.0);
        let warm = printer.probe_at_point(XyPos::new(50.0, 50.0));
        assert_relative_eq!(warm - cold, 0.1, epsilon = 1e-5);
    }

    #[test]
    fn test_failures_and_cancel() {
        let mut printer = SimPrinter::new(&config("probe:\n  failure_rate: 1.0\nrandom_seed: 1\n"));
        assert!(printer.probe_at_point(XyPos::new(50.0, 50.0)).is_nan());
        assert_eq!(printer.stats().failed_probes, 1);

        printer.cancel_after(2);
        assert!(!printer.cancel_requested());
        printer.probe_at_point(XyPos::new(50.0, 50.0));
        printer.probe_at_point(XyPos::new(50.0, 50.0));
        assert!(printer.cancel_requested());
        printer.clear_cancel();
        assert!(!printer.cancel_requested());
    }

    #[test]
    fn test_reachability() {
        let printer = SimPrinter::new(&config("leveling:\n  probe:\n    offset_x: -40.0\n"));
        assert!(printer.position_is_reachable(XyPos::new(200.0, 100.0), Reference::Nozzle));
        assert!(!printer.position_is_reachable(XyPos::new(200.0, 100.0), Reference::Probe));
    }
}
