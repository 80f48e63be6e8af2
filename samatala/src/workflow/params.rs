//! Command words of one leveling invocation and their validation.
//!
//! Every word is checked before anything changes; a rejected invocation
//! leaves the mesh, the session and the motion state untouched.
//!
//! | Word | Meaning |
//! |------|---------|
//! | `A` / `D` | activate / deactivate correction |
//! | `P<0-6>` | phase |
//! | `C[v]` | constant, or "continue" for P1 |
//! | `R[n]` | repeat count (no value = whole mesh) |
//! | `I[n]` | invalidate the `n` nearest defined cells |
//! | `J[n]` | tilt from 3 points (`0`) or an `n`x`n` grid |
//! | `L[s]` / `S[s]` | load / store a slot (`S-1` exports text) |
//! | `T[0-2]` | print the map (human, CSV, host) |
//! | `V<0-4>` | verbosity |
//! | `X` `Y` | reference position |
//! | `B[t]` | shim thickness (no value = measure it) |
//! | `H<h>` | clearance (P2) or edit height offset (P4) |
//! | `Q<0-2>` | synthetic test pattern |
//! | `F<h>` | fade height |
//! | `U` | probe the most isolated gap first (P1) |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BedSection;
use crate::core::{MeshGeometry, XyPos};

/// One command word: absent, present without a value, or present with one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Word<T> {
    /// Present with a value
    Value(T),
    /// Present without a value
    Seen,
    /// Not given
    #[serde(skip)]
    Absent,
}

impl<T> Default for Word<T> {
    fn default() -> Self {
        Word::Absent
    }
}

impl<T: Copy> Word<T> {
    /// True when the word was given, with or without a value
    #[inline]
    pub fn is_seen(&self) -> bool {
        !matches!(self, Word::Absent)
    }

    /// True when the word was not given
    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Word::Absent)
    }

    /// Value, if one was given
    #[inline]
    pub fn value(&self) -> Option<T> {
        match self {
            Word::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// `None` when absent, otherwise the value or `bare` for a bare word
    #[inline]
    pub fn seen_or(&self, bare: T) -> Option<T> {
        match self {
            Word::Value(v) => Some(*v),
            Word::Seen => Some(bare),
            Word::Absent => None,
        }
    }
}

/// Rejected parameter. Messages are shown to the operator verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ParamError {
    /// `R` below one
    #[error("?(R)epetition count invalid (1+).")]
    RepeatCount(i32),
    /// `V` outside 0..=4
    #[error("?(V)erbose level is implausible (0-4).")]
    Verbosity(i32),
    /// `P` outside 0..=6
    #[error("?(P)hase value invalid (0-6).")]
    Phase(f32),
    /// `J` neither 0 nor 2..=9
    #[error("?Invalid grid size (J) specified (2-9).")]
    GridSize(i32),
    /// Only one of `X` and `Y`
    #[error("Both X & Y locations must be specified.")]
    PartialXy,
    /// `A` together with `D`
    #[error("?Can't activate and deactivate at the same time.")]
    ActivateAndDeactivate,
    /// `F` outside 0..=100
    #[error("?(F)ade height for Bed Level Correction not plausible.")]
    FadeHeight(f32),
    /// `T` outside 0..=2
    #[error("Invalid map type.")]
    MapType(i32),
    /// `H` outside 0..=10 for fine tuning
    #[error("Offset out of bounds. (0 to 10mm)")]
    HeightOffset(f32),
    /// `B` thicker than a shim can be
    #[error("?Error in Business Card measurement.")]
    ShimThickness(f32),
    /// `Q` outside 0..=2
    #[error("Invalid test_pattern value. (0 to 2)")]
    TestPattern(i32),
    /// `I` below one
    #[error("?(I)nvalidate count invalid (1+).")]
    InvalidateCount(i32),
    /// `L`/`S` with no storage configured
    #[error("?Mesh storage not available.")]
    NoStorage,
    /// `L`/`S` slot outside the storage
    #[error("?Invalid storage slot.\n?Use 0 to {}", .count.saturating_sub(1))]
    StorageSlot {
        /// Requested slot
        slot: i32,
        /// Slots available
        count: usize,
    },
}

/// Raw words of one invocation, as given by the operator or a script.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LevelingParams {
    /// `A`
    #[serde(alias = "A")]
    pub activate: bool,
    /// `D`
    #[serde(alias = "D")]
    pub deactivate: bool,
    /// `P`
    #[serde(alias = "P", skip_serializing_if = "Word::is_absent")]
    pub phase: Word<f32>,
    /// `C`
    #[serde(alias = "C", skip_serializing_if = "Word::is_absent")]
    pub constant: Word<f32>,
    /// `R`
    #[serde(alias = "R", skip_serializing_if = "Word::is_absent")]
    pub repeat: Word<i32>,
    /// `I`
    #[serde(alias = "I", skip_serializing_if = "Word::is_absent")]
    pub invalidate: Word<i32>,
    /// `J`
    #[serde(alias = "J", skip_serializing_if = "Word::is_absent")]
    pub grid_tilt: Word<i32>,
    /// `L`
    #[serde(alias = "L", skip_serializing_if = "Word::is_absent")]
    pub load: Word<i32>,
    /// `S`
    #[serde(alias = "S", skip_serializing_if = "Word::is_absent")]
    pub store: Word<i32>,
    /// `T`
    #[serde(alias = "T", skip_serializing_if = "Word::is_absent")]
    pub map: Word<i32>,
    /// `V`
    #[serde(alias = "V", skip_serializing_if = "Word::is_absent")]
    pub verbosity: Word<i32>,
    /// `X`
    #[serde(alias = "X", skip_serializing_if = "Word::is_absent")]
    pub x: Word<f32>,
    /// `Y`
    #[serde(alias = "Y", skip_serializing_if = "Word::is_absent")]
    pub y: Word<f32>,
    /// `B`
    #[serde(alias = "B", skip_serializing_if = "Word::is_absent")]
    pub business_card: Word<f32>,
    /// `H`
    #[serde(alias = "H", skip_serializing_if = "Word::is_absent")]
    pub height: Word<f32>,
    /// `Q`
    #[serde(alias = "Q", skip_serializing_if = "Word::is_absent")]
    pub test_pattern: Word<i32>,
    /// `F`
    #[serde(alias = "F", skip_serializing_if = "Word::is_absent")]
    pub fade: Word<f32>,
    /// `U`
    #[serde(alias = "U")]
    pub furthest: bool,
}

/// State the words are checked against.
#[derive(Clone, Copy, Debug)]
pub struct ParamContext<'a> {
    /// Mesh layout
    pub geometry: &'a MeshGeometry,
    /// Bed limits for `X`/`Y`
    pub bed: &'a BedSection,
    /// Nozzle position, the default reference
    pub current: XyPos,
    /// Active storage slot, -1 for none
    pub active_slot: i32,
    /// Slots in the mesh store
    pub slot_count: usize,
    /// Largest accepted shim thickness
    pub max_shim: f32,
}

/// Where `S` sends the mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreTarget {
    /// Persist into a slot
    Slot(usize),
    /// Print as replayable commands
    Export,
}

/// How P2 obtains the shim thickness.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShimMode {
    /// Reuse the last known thickness
    Keep,
    /// Measure it with the operator
    Measure,
    /// Use the given thickness
    Given(f32),
}

/// Validated invocation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedParams {
    /// `Some(true)` for `A`, `Some(false)` for `D`
    pub toggle: Option<bool>,
    /// Phase value, fractional for `P3.1x`
    pub phase: Option<f32>,
    /// `C` value; `Some(0.0)` for a bare `C`
    pub constant: Option<f32>,
    /// Capped repeat count
    pub repeat: Option<usize>,
    /// Cells to invalidate
    pub invalidate: Option<usize>,
    /// Test pattern
    pub test_pattern: Option<u8>,
    /// Tilt grid size, 0 for three points
    pub tilt: Option<u8>,
    /// Slot to load
    pub load: Option<usize>,
    /// Store destination
    pub store: Option<StoreTarget>,
    /// Map type
    pub map: Option<u8>,
    /// Verbosity
    pub verbosity: u8,
    /// Reference XY (nozzle coordinates)
    pub reference: XyPos,
    /// True when `X`/`Y` were given
    pub xy_given: bool,
    /// Shim handling for P2
    pub shim: ShimMode,
    /// `H`
    pub height: Option<f32>,
    /// `F`
    pub fade: Option<f32>,
    /// `U`
    pub furthest: bool,
}

impl ResolvedParams {
    /// Integer part of the phase
    #[inline]
    pub fn phase_number(&self) -> Option<u8> {
        self.phase.map(|p| p.trunc() as u8)
    }

    /// True when `C` was given
    #[inline]
    pub fn has_constant(&self) -> bool {
        self.constant.is_some()
    }

    /// Slot the invocation leaves active when `P0`/`P1` runs with none selected
    pub fn effective_slot(&self, active_slot: i32) -> i32 {
        match self.phase_number() {
            Some(0 | 1) if active_slot < 0 => 0,
            _ => active_slot,
        }
    }
}

fn check_slot(slot: i32, ctx: &ParamContext<'_>) -> Result<usize, ParamError> {
    if ctx.slot_count == 0 {
        return Err(ParamError::NoStorage);
    }
    if slot < 0 || slot as usize >= ctx.slot_count {
        return Err(ParamError::StorageSlot {
            slot,
            count: ctx.slot_count,
        });
    }
    Ok(slot as usize)
}

impl LevelingParams {
    /// Check every word and resolve defaults.
    pub fn validate(&self, ctx: &ParamContext<'_>) -> Result<ResolvedParams, ParamError> {
        let cells = ctx.geometry.len();

        let repeat = match self.repeat.seen_or(cells as i32) {
            Some(n) => {
                let n = n.min(cells as i32);
                if n < 1 {
                    return Err(ParamError::RepeatCount(n));
                }
                Some(n as usize)
            }
            None => None,
        };

        let verbosity = self.verbosity.seen_or(0).unwrap_or(0);
        if !(0..=4).contains(&verbosity) {
            return Err(ParamError::Verbosity(verbosity));
        }

        let phase = self.phase.seen_or(0.0);
        if let Some(p) = phase {
            if !(0.0..7.0).contains(&p) {
                return Err(ParamError::Phase(p));
            }
        }

        let tilt = self.grid_tilt.seen_or(0);
        if let Some(n) = tilt {
            if n != 0 && !(2..=9).contains(&n) {
                return Err(ParamError::GridSize(n));
            }
        }

        let (x, y) = (self.x.value(), self.y.value());
        if x.is_some() != y.is_some() {
            return Err(ParamError::PartialXy);
        }
        let center = ctx.bed.center();
        let mut reference = XyPos::new(x.unwrap_or(ctx.current.x), y.unwrap_or(ctx.current.y));
        if !(0.0..=ctx.bed.size_x).contains(&reference.x) {
            reference.x = center.x;
        }
        if !(0.0..=ctx.bed.size_y).contains(&reference.y) {
            reference.y = center.y;
        }

        let toggle = match (self.activate, self.deactivate) {
            (true, true) => return Err(ParamError::ActivateAndDeactivate),
            (true, false) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        };

        let fade = self.fade.value();
        if let Some(f) = fade {
            if !(0.0..=100.0).contains(&f) {
                return Err(ParamError::FadeHeight(f));
            }
        }

        let map = self.map.seen_or(0);
        if let Some(t) = map {
            if !(0..=2).contains(&t) {
                return Err(ParamError::MapType(t));
            }
        }

        let height = self.height.value();
        if let (Some(h), Some(p)) = (height, phase) {
            if p.trunc() as u8 == 4 && !(0.0..=10.0).contains(&h) {
                return Err(ParamError::HeightOffset(h));
            }
        }

        let shim = match self.business_card {
            Word::Value(t) if t.abs() > ctx.max_shim => return Err(ParamError::ShimThickness(t)),
            Word::Value(t) => ShimMode::Given(t),
            Word::Seen => ShimMode::Measure,
            Word::Absent => ShimMode::Keep,
        };

        let test_pattern = match self.test_pattern.seen_or(-99) {
            Some(q) if !(0..=2).contains(&q) => return Err(ParamError::TestPattern(q)),
            q => q.map(|q| q as u8),
        };

        let invalidate = match self.invalidate.seen_or(1) {
            Some(n) if n < 1 => return Err(ParamError::InvalidateCount(n)),
            n => n.map(|n| n as usize),
        };

        let mut resolved = ResolvedParams {
            toggle,
            phase,
            constant: self.constant.seen_or(0.0),
            repeat,
            invalidate,
            test_pattern,
            tilt: tilt.map(|n| n as u8),
            load: None,
            store: None,
            map: map.map(|t| t as u8),
            verbosity: verbosity as u8,
            reference,
            xy_given: x.is_some(),
            shim,
            height,
            fade,
            furthest: self.furthest,
        };

        let active = resolved.effective_slot(ctx.active_slot);
        if let Some(slot) = self.load.seen_or(active) {
            resolved.load = Some(check_slot(slot, ctx)?);
        }
        resolved.store = match self.store.seen_or(active) {
            Some(-1) => Some(StoreTarget::Export),
            Some(slot) => Some(StoreTarget::Slot(check_slot(slot, ctx)?)),
            None => None,
        };

        Ok(resolved)
    }
}
