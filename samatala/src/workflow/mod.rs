//! The G29 leveling workflow.
//!
//! [`LevelingWorkflow`] owns the mesh and runs one invocation at a time
//! against a [`PrinterHost`]. Words are applied in a fixed order:
//!
//! ```text
//!   validate ─► A/D ─► I ─► Q ─► J ─► P ─► L ─► S ─► T
//! ```
//!
//! | Phase | Action |
//! |-------|--------|
//! | P0 | Zero the mesh |
//! | P1 | Automatic probing, nearest or furthest-first |
//! | P2 | Manual probing with optional shim measurement |
//! | P3 | Fill undefined cells (constant, smart, weighted) |
//! | P4 | Fine-tune defined cells by hand |
//! | P5 | Mean and deviation, optional re-centering |
//! | P6 | Shift every defined cell |
//!
//! Interactive phases return [`PhaseStatus::AwaitingOperator`]; the host
//! answers through [`LevelingWorkflow::submit_operator_z`],
//! [`LevelingWorkflow::confirm`] or [`LevelingWorkflow::abort_session`].
//! The correction enable state is captured by a [`LevelingGuard`] and put
//! back on every exit path.

mod auto;
mod controller;
mod edit;
mod guard;
mod host;
mod input;
mod interactive;
mod outcome;
mod params;
mod session;
mod tilt;

pub use controller::LevelingWorkflow;
pub use guard::LevelingGuard;
pub use host::{
    HostServices, MotionDevice, PhaseProgress, PrinterHost, ProbeDevice, Reference, ThermalSensors,
};
pub use input::EncoderDelta;
pub use outcome::{PartialReason, PhaseStatus, WorkflowOutcome};
pub use params::{
    LevelingParams, ParamContext, ParamError, ResolvedParams, ShimMode, StoreTarget, Word,
};
pub use session::{LevelingSession, ManualStage, OperatorPrompt, SessionPhase};
