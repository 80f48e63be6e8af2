//! What one invocation produced.

use log::info;

use super::session::OperatorPrompt;
use crate::core::XyPos;
use crate::fit::PlaneFit;
use crate::mesh::MeshStatistics;

/// Why a phase stopped before finishing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PartialReason {
    /// The host or operator asked to stop
    Cancelled,
    /// The probe returned no reading at this position
    ProbeFailed(XyPos),
}

/// Completion state of the requested phase.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum PhaseStatus {
    /// Finished, or no phase was requested
    #[default]
    Done,
    /// Stopped early; cells written so far are kept
    Partial {
        /// Defined cells after stopping
        defined: usize,
        /// Cells still undefined
        remaining: usize,
        /// Why it stopped
        reason: PartialReason,
    },
    /// An interactive phase waits for the operator
    AwaitingOperator(OperatorPrompt),
}

/// Result of an invocation or an operator submission.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkflowOutcome {
    /// Phase completion
    pub status: PhaseStatus,
    /// Operator-facing report lines, in order
    pub messages: Vec<String>,
    /// Mesh statistics from P5
    pub statistics: Option<MeshStatistics>,
    /// Plane applied by a tilt
    pub plane: Option<PlaneFit>,
    /// Rendered map (`T`)
    pub map: Option<String>,
    /// Exported commands (`S-1`)
    pub export: Option<String>,
}

impl WorkflowOutcome {
    /// Append a report line, mirrored to the log
    pub(crate) fn say(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("[Level] {}", message);
        self.messages.push(message);
    }

    /// True when the phase wants operator input
    #[inline]
    pub fn is_awaiting_operator(&self) -> bool {
        matches!(self.status, PhaseStatus::AwaitingOperator(_))
    }
}
