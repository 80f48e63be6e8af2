//! Automatic probing (P1) and the leveling guard.

mod common;

use approx::assert_relative_eq;
use common::{Rig, small_config, test_config, tilted_plane};
use samatala::traversal::SearchMode;
use samatala::workflow::{PartialReason, PhaseStatus};

#[test]
fn test_p1_probes_every_reachable_cell() {
    let mut rig = Rig::new(test_config(), tilted_plane);
    let out = rig.run("{P: 1}").unwrap();

    assert_eq!(out.status, PhaseStatus::Done);
    assert!(out.messages.iter().any(|m| m == "Default storage slot 0 selected."));
    assert_eq!(rig.workflow.active_slot(), 0);

    let mesh = rig.workflow.mesh();
    assert!(mesh.is_fully_defined());
    assert_eq!(rig.printer.probes.len(), 100);
    for (idx, z) in mesh.defined() {
        assert_relative_eq!(z, tilted_plane(mesh.position(idx)), epsilon = 1e-5);
    }
    assert_eq!(rig.printer.progress.last().map(|p| p.current), Some(100));
}

#[test]
fn test_p1_cancel_then_resume() {
    let mut rig = Rig::new(test_config(), tilted_plane);
    rig.printer.cancel_after = Some(30);

    let out = rig.run("{P: 1}").unwrap();
    assert_eq!(
        out.status,
        PhaseStatus::Partial {
            defined: 30,
            remaining: 70,
            reason: PartialReason::Cancelled,
        }
    );
    assert!(out.messages.iter().any(|m| m == "Mesh only partially populated."));

    rig.printer.cancel_after = None;
    let out = rig.run("{P: 1, C: ~}").unwrap();
    assert_eq!(out.status, PhaseStatus::Done);
    assert!(rig.workflow.mesh().is_fully_defined());
    // Resuming never re-probes a measured cell
    assert_eq!(rig.printer.probes.len(), 100);
}

#[test]
fn test_p1_probe_failure_keeps_measured_cells() {
    let mut rig = Rig::new(small_config(), tilted_plane);
    rig.printer.fail_at.push(samatala::XyPos::new(10.0, 10.0));

    let out = rig.run("{P: 1}").unwrap();
    let PhaseStatus::Partial {
        defined, reason, ..
    } = out.status
    else {
        panic!("expected a partial mesh, got {:?}", out.status);
    };
    let PartialReason::ProbeFailed(pos) = reason else {
        panic!("expected a probe failure, got {:?}", reason);
    };
    assert!(pos.distance(&samatala::XyPos::new(10.0, 10.0)) < 0.01);
    assert!(defined < 25);

    let mesh = rig.workflow.mesh();
    assert_eq!(mesh.defined_count(), defined);
    for (idx, z) in mesh.defined() {
        assert_relative_eq!(z, tilted_plane(mesh.position(idx)), epsilon = 1e-5);
    }
}

#[test]
fn test_p1_skips_cells_the_probe_cannot_reach() {
    for (words, mode) in [
        ("{P: 1}", SearchMode::BruteForce),
        ("{P: 1}", SearchMode::Curve),
        ("{P: 1, U: true}", SearchMode::BruteForce),
    ] {
        let mut config = test_config();
        config.probe.offset_x = -40.0;
        config.workflow.search_mode = mode;
        let mut rig = Rig::new(config, tilted_plane);

        let out = rig.run(words).unwrap();
        assert_eq!(out.status, PhaseStatus::Done, "{} {:?}", words, mode);

        // Columns at x > 180 are out of probe reach
        let mesh = rig.workflow.mesh();
        assert_eq!(mesh.defined_count(), 80, "{} {:?}", words, mode);
        for idx in mesh.indices() {
            assert_eq!(mesh.is_defined(idx), idx.x() < 8);
        }
        for pos in &rig.printer.probes {
            assert!(rig.printer.probe.can_reach(&rig.printer.bed, *pos), "{}", pos);
        }
    }
}

#[test]
fn test_p1_furthest_first_is_reproducible() {
    let mut first = Rig::new(small_config(), tilted_plane);
    let mut second = Rig::new(small_config(), tilted_plane);
    first.run("{P: 1, U: true}").unwrap();
    second.run("{P: 1, U: true}").unwrap();
    assert_eq!(first.printer.probes, second.printer.probes);
    assert!(first.workflow.mesh().is_fully_defined());
}

#[test]
fn test_leveling_disabled_while_probing_and_restored() {
    let mut rig = Rig::new(small_config(), tilted_plane);
    rig.printer.leveling = true;

    rig.run("{P: 1}").unwrap();
    assert!(!rig.printer.probe_leveling.is_empty());
    assert!(rig.printer.probe_leveling.iter().all(|on| !on));
    assert!(rig.printer.leveling);

    rig.printer.leveling = false;
    rig.run("{P: 1}").unwrap();
    assert!(!rig.printer.leveling);
}

#[test]
fn test_leveling_restored_after_cancel() {
    let mut rig = Rig::new(small_config(), tilted_plane);
    rig.printer.leveling = true;
    rig.printer.cancel_after = Some(3);
    let out = rig.run("{P: 1}").unwrap();
    assert!(matches!(out.status, PhaseStatus::Partial { .. }));
    assert!(rig.printer.leveling);
}

#[test]
fn test_activate_requires_complete_mesh() {
    let mut rig = Rig::new(small_config(), tilted_plane);
    rig.printer.cancel_after = Some(5);
    rig.run("{P: 1}").unwrap();

    let out = rig.run("{A: true}").unwrap();
    assert!(!rig.printer.leveling);
    assert!(out.messages.iter().any(|m| m.contains("stays off")));

    rig.printer.cancel_after = None;
    rig.run("{P: 1, C: ~}").unwrap();
    let out = rig.run("{A: true}").unwrap();
    assert!(rig.printer.leveling);
    assert_eq!(out.messages, vec!["Bed leveling on.".to_string()]);

    let pos = samatala::XyPos::new(60.0, 75.0);
    assert_relative_eq!(
        rig.workflow.correction_at(pos, 0.0),
        tilted_plane(pos),
        epsilon = 1e-4
    );
    // Half way up the fade height
    assert_relative_eq!(
        rig.workflow.correction_at(pos, 5.0),
        tilted_plane(pos) * 0.5,
        epsilon = 1e-4
    );

    rig.run("{D: true}").unwrap();
    assert!(!rig.printer.leveling);
}

#[test]
fn test_probe_z_offset_applied() {
    let mut config = small_config();
    config.probe.offset_z = -0.2;
    let mut rig = Rig::new(config, tilted_plane);
    rig.run("{P: 1}").unwrap();
    let mesh = rig.workflow.mesh();
    for (idx, z) in mesh.defined() {
        assert_relative_eq!(z, tilted_plane(mesh.position(idx)) - 0.2, epsilon = 1e-5);
    }
}

#[test]
fn test_probe_temperature_compensation() {
    use samatala::compensation::{PtcCommand, SensorKind};

    let mut rig = Rig::new(small_config(), tilted_plane);
    rig.workflow
        .apply_ptc_command(&PtcCommand::Set {
            sensor: SensorKind::Probe,
            index: 0,
            value_um: 100,
        })
        .unwrap();
    // One step above the 30C reference
    rig.printer.temps[0] = 35.0;

    rig.run("{P: 1}").unwrap();
    let mesh = rig.workflow.mesh();
    for (idx, z) in mesh.defined() {
        assert_relative_eq!(z, tilted_plane(mesh.position(idx)) - 0.1, epsilon = 1e-4);
    }

    let mut rig = Rig::new(
        {
            let mut config = small_config();
            config.compensation.enabled = false;
            config
        },
        tilted_plane,
    );
    rig.workflow
        .apply_ptc_command(&PtcCommand::Set {
            sensor: SensorKind::Probe,
            index: 0,
            value_um: 100,
        })
        .unwrap();
    rig.printer.temps[0] = 35.0;
    rig.run("{P: 1}").unwrap();
    let mesh = rig.workflow.mesh();
    for (idx, z) in mesh.defined() {
        assert_relative_eq!(z, tilted_plane(mesh.position(idx)), epsilon = 1e-5);
    }
}
