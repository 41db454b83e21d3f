//! Data model for notation elements and their layout results.
//!
//! A [`Model`] is the polymorphic unit of notation: a time-signature
//! change, a chord, a harmony marker, a barline.  Every model obeys the
//! same two-phase contract — `validate` (may auto-correct the model in
//! place) followed by `layout` (pure with respect to the model, advances
//! the cursor, returns a [`Layout`]).
//!
//! Dispatch is a closed tagged variant ([`ModelData`]); the table-based
//! factory is only a construction-time convenience.

use serde::{Deserialize, Serialize};

use crate::context::Cursor;
use crate::error::EngineError;
use crate::models::{AttributesModel, BarlineModel, ChordModel, HarmonyModel, SpacerModel};
use crate::segment::SegmentOwner;

/// Type tag for the known model kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    Attributes,
    Chord,
    Harmony,
    Barline,
    Spacer,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelKind::Attributes => "Attributes",
            ModelKind::Chord => "Chord",
            ModelKind::Harmony => "Harmony",
            ModelKind::Barline => "Barline",
            ModelKind::Spacer => "Spacer",
        };
        f.write_str(name)
    }
}

/// Whether validated content may still be auto-corrected.
///
/// Models start `Warm`; a fully resolved validation locks them `Frozen`,
/// after which validation only re-applies context side effects (such as
/// installing an attributes snapshot into a fresh staff context) without
/// touching the model's own content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frozenness {
    #[default]
    Warm,
    Frozen,
}

// ── Shared notation data ────────────────────────────────────────────

/// Pitch of a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pitch {
    /// Note name: A–G
    pub step: String,
    /// Octave number (middle C = C4)
    pub octave: i32,
    /// Chromatic alteration: -1 = flat, 1 = sharp
    #[serde(default)]
    pub alter: i32,
}

/// Symbolic note value (the written duration, before dots).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteValue {
    #[serde(rename = "breve")]
    Breve,
    #[serde(rename = "whole")]
    Whole,
    #[serde(rename = "half")]
    Half,
    #[serde(rename = "quarter")]
    Quarter,
    #[serde(rename = "eighth")]
    Eighth,
    #[serde(rename = "16th")]
    Sixteenth,
    #[serde(rename = "32nd")]
    ThirtySecond,
    #[serde(rename = "64th")]
    SixtyFourth,
}

impl NoteValue {
    /// All values, longest first.  Order matters for duration lookup.
    pub const ALL: [NoteValue; 8] = [
        NoteValue::Breve,
        NoteValue::Whole,
        NoteValue::Half,
        NoteValue::Quarter,
        NoteValue::Eighth,
        NoteValue::Sixteenth,
        NoteValue::ThirtySecond,
        NoteValue::SixtyFourth,
    ];

    /// Length as a (numerator, denominator) multiple of a quarter note.
    fn quarter_ratio(self) -> (i32, i32) {
        match self {
            NoteValue::Breve => (8, 1),
            NoteValue::Whole => (4, 1),
            NoteValue::Half => (2, 1),
            NoteValue::Quarter => (1, 1),
            NoteValue::Eighth => (1, 2),
            NoteValue::Sixteenth => (1, 4),
            NoteValue::ThirtySecond => (1, 8),
            NoteValue::SixtyFourth => (1, 16),
        }
    }

    /// Division count of the undotted value, or None when the value is
    /// not exactly representable at this resolution.
    pub fn divisions(self, divisions_per_quarter: i32) -> Option<i32> {
        let (num, den) = self.quarter_ratio();
        let scaled = divisions_per_quarter.checked_mul(num)?;
        if den == 0 || scaled % den != 0 {
            return None;
        }
        Some(scaled / den)
    }

    /// Division count including augmentation dots (a dot adds half the
    /// undotted length, a second dot a quarter, and so on).
    pub fn dotted_divisions(self, dots: u8, divisions_per_quarter: i32) -> Option<i32> {
        let base = self.divisions(divisions_per_quarter)?;
        let mut total = base;
        let mut extra = base;
        for _ in 0..dots {
            if extra % 2 != 0 {
                return None;
            }
            extra /= 2;
            total += extra;
        }
        Some(total)
    }

    /// Find the single note value (plain or single-dotted) that spans
    /// exactly `div` divisions, if one exists.
    pub fn from_divisions(div: i32, divisions_per_quarter: i32) -> Option<(NoteValue, u8)> {
        if div <= 0 || divisions_per_quarter <= 0 {
            return None;
        }
        for value in NoteValue::ALL {
            if value.divisions(divisions_per_quarter) == Some(div) {
                return Some((value, 0));
            }
            if value.dotted_divisions(1, divisions_per_quarter) == Some(div) {
                return Some((value, 1));
            }
        }
        None
    }
}

/// Key signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    /// Number of sharps (positive) or flats (negative)
    pub fifths: i32,
    /// Mode (e.g., "major", "minor")
    #[serde(default)]
    pub mode: Option<String>,
}

impl Default for Key {
    fn default() -> Self {
        Key { fifths: 0, mode: None }
    }
}

/// Time signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Numerator (e.g., 3 in 3/4)
    pub beats: i32,
    /// Denominator (e.g., 4 in 3/4)
    pub beat_type: i32,
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature { beats: 4, beat_type: 4 }
    }
}

/// Clef definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clef {
    /// Staff number this clef belongs to (1-based)
    #[serde(default = "default_clef_number")]
    pub number: i32,
    /// Clef sign: "G" (treble), "F" (bass), "C" (alto/tenor)
    pub sign: String,
    /// Staff line the clef sits on
    pub line: i32,
    /// Octave transposition (e.g., -1 for guitar's octave-lower treble)
    #[serde(default)]
    pub octave_change: Option<i32>,
}

fn default_clef_number() -> i32 {
    1
}

impl Default for Clef {
    fn default() -> Self {
        Clef {
            number: 1,
            sign: "G".to_string(),
            line: 2,
            octave_change: None,
        }
    }
}

/// Fully resolved attributes snapshot: what is in effect on a staff
/// after an attributes model validates.  Persists across measures until
/// explicitly changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    /// Divisions per quarter note (duration resolution)
    pub divisions: i32,
    pub key: Key,
    pub time: TimeSignature,
    /// One clef per staff
    pub clefs: Vec<Clef>,
    /// Number of staves in the part
    pub staves: i32,
}

impl Attributes {
    /// Total division count of one measure under this snapshot.
    pub fn measure_divisions(&self) -> i32 {
        if self.time.beat_type == 0 {
            return 0;
        }
        self.divisions * self.time.beats * 4 / self.time.beat_type
    }
}

// ── Model ───────────────────────────────────────────────────────────

/// One notation element: common bookkeeping plus kind-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// How many time divisions this element consumes.  Stable once
    /// validated for a given cursor context; layout never mutates it.
    #[serde(default)]
    pub div_count: i32,
    /// Staff this element belongs to.  Assigned externally before layout.
    #[serde(default)]
    pub staff_idx: usize,
    #[serde(default)]
    pub frozenness: Frozenness,
    #[serde(flatten)]
    pub data: ModelData,
}

/// Closed variant set over the known model kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ModelData {
    Attributes(AttributesModel),
    Chord(ChordModel),
    Harmony(HarmonyModel),
    Barline(BarlineModel),
    Spacer(SpacerModel),
}

impl Model {
    pub fn new(data: ModelData) -> Model {
        Model {
            div_count: 0,
            staff_idx: 0,
            frozenness: Frozenness::Warm,
            data,
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self.data {
            ModelData::Attributes(_) => ModelKind::Attributes,
            ModelData::Chord(_) => ModelKind::Chord,
            ModelData::Harmony(_) => ModelKind::Harmony,
            ModelData::Barline(_) => ModelKind::Barline,
            ModelData::Spacer(_) => ModelKind::Spacer,
        }
    }

    /// Inspect and possibly correct this model's state using the cursor's
    /// staff/measure/line context.  Idempotent.  The only recoverable
    /// failure is [`EngineError::Deferred`]; malformed-but-decodable
    /// content is normalized best-effort instead of rejected.
    pub fn validate(&mut self, cursor: &mut Cursor) -> Result<(), EngineError> {
        let frozen = self.frozenness == Frozenness::Frozen;
        match &mut self.data {
            ModelData::Attributes(m) => m.validate(cursor, frozen)?,
            ModelData::Chord(m) => {
                self.div_count = m.validate(self.div_count, cursor, frozen)?;
            }
            ModelData::Harmony(m) => m.validate(cursor, frozen)?,
            ModelData::Barline(m) => m.validate(cursor, frozen)?,
            ModelData::Spacer(_) => {}
        }
        self.frozenness = Frozenness::Frozen;
        Ok(())
    }

    /// Lay this model out for the given cursor state.  Pure with respect
    /// to the model; advances the cursor's `x` and padding maxima.  Must
    /// only be called after `validate` has run in this context.
    pub fn layout(&self, cursor: &mut Cursor) -> Layout {
        match &self.data {
            ModelData::Attributes(m) => m.layout(self, cursor),
            ModelData::Chord(m) => m.layout(self, cursor),
            ModelData::Harmony(m) => m.layout(self, cursor),
            ModelData::Barline(m) => m.layout(self, cursor),
            ModelData::Spacer(m) => m.layout(self, cursor),
        }
    }

    /// Serialize this model back to the interchange representation.
    pub fn to_serialized_form(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ── Layout results ──────────────────────────────────────────────────

/// How conflicting horizontal-position proposals for the same division
/// slot are reconciled across voices and staves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergePolicy {
    /// Tightest position wins (the minimum of the proposals).
    Min,
    /// Most generous spacing wins (the maximum of the proposals).
    Max,
}

/// Whether an element may stretch during justification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpandPolicy {
    /// Fixed size; the merge pass may move it but never resize it.
    None,
    /// May absorb extra horizontal room.
    Expand,
}

/// Axis-aligned box relative to the layout's `x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Identifies the model a layout was produced from: the owning segment
/// plus the model's index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    pub segment: SegmentOwner,
    pub index: usize,
}

/// Kind-specific layout payload consumed by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LayoutDetail {
    None,
    Attributes {
        clef_visible: bool,
        ks_visible: bool,
        ts_visible: bool,
        clef_spacing: f64,
        ks_spacing: f64,
        ts_spacing: f64,
    },
    Barline {
        line_starts: Vec<f64>,
        line_widths: Vec<f64>,
    },
}

/// Immutable result of one model's `layout` call.
///
/// Once produced, `x` may only be adjusted by the merge pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub model: ModelRef,
    pub x: f64,
    pub division: i32,
    pub merge_policy: MergePolicy,
    pub expand_policy: ExpandPolicy,
    pub bounding_boxes: Vec<BoundingBox>,
    /// Tag the external renderer switches on.
    pub render_class: ModelKind,
    pub detail: LayoutDetail,
}

impl Layout {
    /// Capture the cursor's current position for a new layout.
    pub fn new(
        cursor: &Cursor,
        render_class: ModelKind,
        merge_policy: MergePolicy,
        expand_policy: ExpandPolicy,
    ) -> Layout {
        Layout {
            model: ModelRef {
                segment: cursor.segment,
                index: cursor.idx,
            },
            x: cursor.x,
            division: cursor.division,
            merge_policy,
            expand_policy,
            bounding_boxes: Vec::new(),
            render_class,
            detail: LayoutDetail::None,
        }
    }
}
