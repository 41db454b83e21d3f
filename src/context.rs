//! Traversal context: the cursor threaded through a measure, plus the
//! staff / voice / measure / line state models read during validation
//! and layout.
//!
//! The cursor is the single channel through which models see score state
//! and emit position advances.  Each voice traversal gets its own cursor;
//! cursors are never shared between concurrent traversals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::factory::Factory;
use crate::glyphs::GlyphMetrics;
use crate::model::{Attributes, ModelKind};
use crate::segment::SegmentOwner;

/// Per-staff state visible to models during traversal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaffContext {
    /// Staff number.
    pub idx: usize,
    /// Accidentals sounded so far in this measure, keyed by step+octave
    /// (e.g. "F5").  Reset at measure boundaries.
    pub accidentals: BTreeMap<String, i32>,
    /// Active attributes indexed by part id.  Persist across measures
    /// until explicitly changed.
    pub attributes: BTreeMap<String, Attributes>,
    /// Total division count of this staff for the current measure.
    pub total_divisions: i32,
    /// Back-reference to the previous measure's staff context.
    pub previous: Option<Box<StaffContext>>,
}

impl StaffContext {
    pub fn new(idx: usize) -> StaffContext {
        StaffContext {
            idx,
            ..StaffContext::default()
        }
    }

    /// Create a fresh copy-on-write head over `prev`: attributes carry
    /// over, accidentals reset, and the back-reference chain is truncated
    /// at depth one so measures never alias each other's mutable state.
    pub fn detach(prev: &StaffContext) -> StaffContext {
        let mut head = prev.clone();
        head.previous = None;
        StaffContext {
            idx: prev.idx,
            accidentals: BTreeMap::new(),
            attributes: prev.attributes.clone(),
            total_divisions: prev.total_divisions,
            previous: Some(Box::new(head)),
        }
    }

    /// The attributes in effect for `part`, if known.
    pub fn part_attributes(&self, part: &str) -> Option<&Attributes> {
        self.attributes.get(part)
    }
}

/// Measure identity and starting position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasureContext {
    pub idx: usize,
    pub number: String,
    /// Pickup/anacrusis measures are implicit.
    pub implicit: bool,
    pub non_controlling: bool,
    /// Starting x of the measure.
    pub x: f64,
}

/// Line (system) context the measure is laid out within.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineContext {
    /// Index of this bar on its line.
    pub bar_on_line: usize,
    pub bars_on_line: usize,
    /// Index of this line.
    pub line: usize,
    pub lines: usize,
}

impl Default for LineContext {
    fn default() -> Self {
        LineContext {
            bar_on_line: 0,
            bars_on_line: 1,
            line: 0,
            lines: 1,
        }
    }
}

/// Voice context for the traversal that owns the cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceContext {
    pub idx: usize,
}

/// Flags controlling a traversal.
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorOptions {
    /// Spacing may use estimated widths.
    pub approximate: bool,
    /// The traversal does not belong to a live document.
    pub detached: bool,
    /// Run validation only; produce no layouts.
    pub validate_only: bool,
}

/// Mutable traversal state passed by exclusive reference through one
/// measure's processing.
///
/// `division` is monotonically non-decreasing within a voice traversal;
/// `x` is monotonically non-decreasing except when reset by the merge
/// pass.
pub struct Cursor<'a> {
    /// Owner tag of the segment currently under traversal.
    pub segment: SegmentOwner,
    /// Index of the current model within that segment.
    pub idx: usize,
    /// Part id of the segment under traversal.
    pub part: String,
    pub voice: VoiceContext,
    /// Staff contexts touched so far, keyed by staff number.  Shared
    /// across a measure's sequential voice traversals by handing the map
    /// from one cursor to the next.
    pub staves: BTreeMap<usize, StaffContext>,
    /// Staff the current model belongs to.
    pub staff_idx: usize,
    pub measure: &'a MeasureContext,
    pub line: &'a LineContext,
    /// Kind of the previously processed model, if any.
    pub prev: Option<ModelKind>,
    /// Current time offset in divisions.
    pub division: i32,
    /// Current horizontal position.
    pub x: f64,
    pub max_padding_top: f64,
    pub max_padding_bottom: f64,
    pub approximate: bool,
    pub detached: bool,
    pub validate_only: bool,
    pub factory: &'a Factory,
    pub glyphs: &'a dyn GlyphMetrics,
}

impl<'a> Cursor<'a> {
    pub fn new(
        segment: SegmentOwner,
        voice: VoiceContext,
        measure: &'a MeasureContext,
        line: &'a LineContext,
        factory: &'a Factory,
        glyphs: &'a dyn GlyphMetrics,
        options: CursorOptions,
    ) -> Cursor<'a> {
        Cursor {
            segment,
            idx: 0,
            part: String::new(),
            voice,
            staves: BTreeMap::new(),
            staff_idx: 0,
            measure,
            line,
            prev: None,
            division: 0,
            x: measure.x,
            max_padding_top: 0.0,
            max_padding_bottom: 0.0,
            approximate: options.approximate,
            detached: options.detached,
            validate_only: options.validate_only,
            factory,
            glyphs,
        }
    }

    /// Make `staff_idx` current, creating its context on first touch.
    /// A new context detaches from `prev` when carry-over exists, and is
    /// seeded with `attributes` for `part` otherwise.
    pub fn ensure_staff(
        &mut self,
        staff_idx: usize,
        prev: Option<&StaffContext>,
        attributes: Option<&Attributes>,
        part: &str,
    ) {
        self.staff_idx = staff_idx;
        self.staves.entry(staff_idx).or_insert_with(|| {
            let mut ctx = match prev {
                Some(p) => StaffContext::detach(p),
                None => StaffContext::new(staff_idx),
            };
            ctx.idx = staff_idx;
            if let Some(attrs) = attributes {
                ctx.attributes
                    .entry(part.to_string())
                    .or_insert_with(|| attrs.clone());
            }
            ctx
        });
    }

    /// Context of the current staff.
    ///
    /// Panics when no context exists for `staff_idx`; the processor
    /// establishes one before any model runs, so a miss is an engine bug.
    pub fn staff(&self) -> &StaffContext {
        match self.staves.get(&self.staff_idx) {
            Some(ctx) => ctx,
            None => panic!("no staff context for staff {}", self.staff_idx),
        }
    }

    /// Mutable context of the current staff, created on demand.
    pub fn staff_mut(&mut self) -> &mut StaffContext {
        let idx = self.staff_idx;
        self.staves
            .entry(idx)
            .or_insert_with(|| StaffContext::new(idx))
    }

    /// Raise the measure's padding maxima.
    pub fn request_padding(&mut self, top: f64, bottom: f64) {
        if top > self.max_padding_top {
            self.max_padding_top = top;
        }
        if bottom > self.max_padding_bottom {
            self.max_padding_bottom = bottom;
        }
    }
}
