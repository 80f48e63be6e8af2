//! State carried between invocations of the interactive phases.

use crate::core::{GridIndex, MeshGeometry, XyPos};
use crate::traversal::CellBitmap;

/// Where the manual probing phase (P2) stands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ManualStage {
    /// Waiting for the nozzle height measured on top of the shim
    ShimOn,
    /// Waiting for the height measured with the shim removed
    ShimOff {
        /// Height measured on the shim
        with_shim: f32,
    },
    /// Waiting for the height of a mesh point
    Probing {
        /// Cell being measured
        target: GridIndex,
    },
}

/// Interactive phase a session is in.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum SessionPhase {
    /// No phase waiting for the operator
    #[default]
    Idle,
    /// P2: manual probing
    ManualProbe(ManualStage),
    /// P4: editing cells one at a time
    FineTune {
        /// Cell being edited
        target: GridIndex,
        /// Cells left including this one
        remaining: usize,
        /// Value being edited
        value: f32,
    },
}

/// What the workflow is waiting for from the operator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OperatorPrompt {
    /// Lower the nozzle onto the shim
    PlaceShim,
    /// Remove the shim and lower the nozzle onto the bed
    RemoveShim,
    /// Lower the nozzle onto the bed at a mesh point
    MeasurePoint {
        /// Cell being measured
        index: GridIndex,
        /// Its position
        pos: XyPos,
    },
    /// Adjust a mesh value
    EditPoint {
        /// Cell being edited
        index: GridIndex,
        /// Its position
        pos: XyPos,
        /// Starting value
        value: f32,
    },
}

impl std::fmt::Display for OperatorPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperatorPrompt::PlaceShim => write!(f, "Place shim under nozzle and take a measurement."),
            OperatorPrompt::RemoveShim => write!(f, "Remove shim and take a measurement."),
            OperatorPrompt::MeasurePoint { index, pos } => {
                write!(f, "Measure mesh point {} at {}.", index, pos)
            }
            OperatorPrompt::EditPoint { index, value, .. } => {
                write!(f, "Edit mesh point {} (currently {:.3}).", index, value)
            }
        }
    }
}

/// One multi-invocation leveling workflow.
///
/// The caller keeps the session alive between invocations; everything an
/// interactive phase needs to continue lives here.
#[derive(Clone, Debug)]
pub struct LevelingSession {
    pub(crate) phase: SessionPhase,
    pub(crate) reference: XyPos,
    pub(crate) verbosity: u8,
    pub(crate) height: f32,
    pub(crate) visited: CellBitmap,
    pub(crate) saved_enabled: Option<bool>,
    pub(crate) shim_thickness: f32,
}

impl LevelingSession {
    /// Idle session for a mesh layout
    pub fn new(geometry: &MeshGeometry) -> Self {
        Self {
            phase: SessionPhase::Idle,
            reference: XyPos::default(),
            verbosity: 0,
            height: 0.0,
            visited: CellBitmap::new(geometry),
            saved_enabled: None,
            shim_thickness: 0.0,
        }
    }

    /// Current phase
    #[inline]
    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// True while an interactive phase waits for input
    #[inline]
    pub fn is_active(&self) -> bool {
        self.phase != SessionPhase::Idle
    }

    /// Reference position of the running phase
    #[inline]
    pub fn reference(&self) -> XyPos {
        self.reference
    }

    /// Verbosity of the running phase
    #[inline]
    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    /// Last shim thickness measured or given
    #[inline]
    pub fn shim_thickness(&self) -> f32 {
        self.shim_thickness
    }

    /// Cells already edited in this session
    #[inline]
    pub fn visited(&self) -> &CellBitmap {
        &self.visited
    }

    pub(crate) fn finish(&mut self) -> Option<bool> {
        self.phase = SessionPhase::Idle;
        self.saved_enabled.take()
    }
}
