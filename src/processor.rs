//! The measure processor: drives cursors through every voice and staff
//! segment of one measure, interleaving staff-owned content with voice
//! content in division order, then reconciles the resulting layout
//! proposals with a constraint-merge pass.
//!
//! Voices are processed sequentially — later voices may depend on staff
//! state (accidentals, attribute carry-over) mutated by earlier ones —
//! with the staff-context map handed from cursor to cursor.  Staff
//! segments are consumed through a single per-staff index shared by all
//! voices, so each staff-owned model is validated or laid out exactly
//! once per measure no matter how many voices reference its staff.
//!
//! Complexity: O(staff-voice pairs).

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};
use serde::Serialize;

use crate::context::{
    Cursor, CursorOptions, LineContext, MeasureContext, StaffContext, VoiceContext,
};
use crate::error::EngineError;
use crate::factory::Factory;
use crate::glyphs::GlyphMetrics;
use crate::model::{Attributes, Layout, MergePolicy};
use crate::segment::{OwnerKind, Segment};

/// Flags controlling one `process_measure` run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    /// Skip the constraint-merge pass.
    pub no_align: bool,
    /// Spacing may use estimated widths.
    pub approximate: bool,
    /// The segments do not belong to a live document.
    pub detached: bool,
    /// Validate models without producing layouts.
    pub validate_only: bool,
}

/// Everything one measure's processing needs.
pub struct ProcessSpec<'a> {
    /// All segments of the measure (staff-owned and voice-owned).
    pub segments: &'a mut [Segment],
    pub measure: &'a MeasureContext,
    pub line: &'a LineContext,
    /// Previous measure's staff contexts, keyed by staff number; each
    /// traversal detaches its own copy-on-write head from these.
    pub prev_by_staff: &'a BTreeMap<usize, StaffContext>,
    pub factory: &'a Factory,
    /// Committed attributes snapshot in effect when the measure begins.
    pub attributes: Option<Attributes>,
    pub glyphs: &'a dyn GlyphMetrics,
    pub options: ProcessOptions,
}

/// Committed layout of one measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureLayout {
    /// Last attributes context seen while processing.
    pub attributes: Option<Attributes>,
    /// Voice layout collections followed by one collection per staff.
    pub elements: Vec<Vec<Layout>>,
    pub width: f64,
    pub padding_top: f64,
    pub padding_bottom: f64,
}

/// Validate or lay out one measure.
///
/// Fails with [`EngineError::Invariant`] when `segments` is empty or an
/// owner appears twice; those are caller errors, not recoverable states.
pub fn process_measure(spec: ProcessSpec) -> Result<MeasureLayout, EngineError> {
    let ProcessSpec {
        segments,
        measure,
        line,
        prev_by_staff,
        factory,
        attributes,
        glyphs,
        options,
    } = spec;

    if segments.is_empty() {
        return Err(EngineError::Invariant(
            "process_measure expects at least one segment".to_string(),
        ));
    }

    // Partition by owner.  Exactly one segment per owner is allowed.
    let mut staff_segment: BTreeMap<usize, usize> = BTreeMap::new();
    let mut voice_segment: BTreeMap<usize, usize> = BTreeMap::new();
    for (i, seg) in segments.iter().enumerate() {
        let replaced = match seg.owner.kind {
            OwnerKind::Staff => staff_segment.insert(seg.owner.id, i),
            OwnerKind::Voice => voice_segment.insert(seg.owner.id, i),
        };
        if replaced.is_some() {
            return Err(EngineError::Invariant(format!(
                "duplicate segment for {:?} {}",
                seg.owner.kind, seg.owner.id
            )));
        }
    }

    let cursor_options = CursorOptions {
        approximate: options.approximate,
        detached: options.detached,
        validate_only: options.validate_only,
    };

    // Shared across the measure's sequential voice traversals.
    let mut staves: BTreeMap<usize, StaffContext> = BTreeMap::new();
    let mut staff_consumed: BTreeMap<usize, usize> = BTreeMap::new();
    let mut division_per_staff: BTreeMap<usize, i32> = BTreeMap::new();
    let mut staff_layouts: BTreeMap<usize, Vec<Layout>> = BTreeMap::new();
    let mut voice_layouts: Vec<Vec<Layout>> = Vec::new();
    let mut deferred: Vec<(usize, usize)> = Vec::new();

    let mut last_attributes = attributes.clone();
    let mut max_x = measure.x;
    let mut max_padding_top = 0.0f64;
    let mut max_padding_bottom = 0.0f64;

    for (&voice_id, &seg_idx) in &voice_segment {
        let part = segments[seg_idx].part.clone();
        let owner = segments[seg_idx].owner;
        let mut cursor = Cursor::new(
            owner,
            VoiceContext { idx: voice_id },
            measure,
            line,
            factory,
            glyphs,
            cursor_options,
        );
        cursor.part = part.clone();
        cursor.staves = std::mem::take(&mut staves);

        let mut layouts: Vec<Layout> = Vec::new();
        let mut touched: BTreeSet<usize> = BTreeSet::new();
        let len = segments[seg_idx].models.len();

        for idx in 0..len {
            let staff_idx = segments[seg_idx].models[idx].staff_idx;
            cursor.ensure_staff(
                staff_idx,
                prev_by_staff.get(&staff_idx),
                attributes.as_ref(),
                &part,
            );
            touched.insert(staff_idx);

            // Staff-owned content due at or before this time is visited
            // first, so clef changes and the like land in division order
            // relative to the voice content referencing them.
            if let Some(&ss) = staff_segment.get(&staff_idx) {
                loop {
                    let consumed = staff_consumed.get(&staff_idx).copied().unwrap_or(0);
                    if consumed >= segments[ss].models.len() {
                        break;
                    }
                    let staff_division = division_per_staff.get(&staff_idx).copied().unwrap_or(0);
                    if staff_division > cursor.division {
                        break;
                    }
                    push_staff_model(
                        segments,
                        ss,
                        staff_idx,
                        &mut cursor,
                        &mut staff_consumed,
                        &mut division_per_staff,
                        &mut staff_layouts,
                        &mut deferred,
                        options.validate_only,
                    )?;
                }
            }

            cursor.segment = owner;
            cursor.idx = idx;
            cursor.staff_idx = staff_idx;

            if options.validate_only {
                let model = &mut segments[seg_idx].models[idx];
                model.staff_idx = cursor.staff_idx;
                match model.validate(&mut cursor) {
                    Ok(()) => {}
                    Err(EngineError::Deferred(what)) => {
                        debug!(
                            "deferring model {} of voice {} (missing {})",
                            idx, voice_id, what
                        );
                        deferred.push((seg_idx, idx));
                    }
                    Err(e) => return Err(e),
                }
            } else {
                let layout = segments[seg_idx].models[idx].layout(&mut cursor);
                layouts.push(layout);
            }
            cursor.division += segments[seg_idx].models[idx].div_count;
            cursor.prev = Some(segments[seg_idx].models[idx].kind());

            if idx + 1 == len {
                // Trailing staff content not overtaken by any voice model
                // still runs exactly once.
                for &s in &touched {
                    if let Some(&ss) = staff_segment.get(&s) {
                        while staff_consumed.get(&s).copied().unwrap_or(0)
                            < segments[ss].models.len()
                        {
                            push_staff_model(
                                segments,
                                ss,
                                s,
                                &mut cursor,
                                &mut staff_consumed,
                                &mut division_per_staff,
                                &mut staff_layouts,
                                &mut deferred,
                                options.validate_only,
                            )?;
                        }
                    }
                }
            }

            if let Some(a) = cursor.staff().part_attributes(&part) {
                last_attributes = Some(a.clone());
            }
        }

        max_x = max_x.max(cursor.x);
        max_padding_top = max_padding_top.max(cursor.max_padding_top);
        max_padding_bottom = max_padding_bottom.max(cursor.max_padding_bottom);
        staves = std::mem::take(&mut cursor.staves);
        voice_layouts.push(layouts);
    }

    // Deferred models get one more chance now that earlier content (an
    // attributes model, typically) may have supplied their prerequisite.
    if options.validate_only && !deferred.is_empty() {
        let mut cursor = Cursor::new(
            segments[0].owner,
            VoiceContext::default(),
            measure,
            line,
            factory,
            glyphs,
            cursor_options,
        );
        cursor.staves = std::mem::take(&mut staves);
        for (seg_idx, model_idx) in deferred {
            let part = segments[seg_idx].part.clone();
            let staff_idx = segments[seg_idx].models[model_idx].staff_idx;
            cursor.part = part.clone();
            cursor.ensure_staff(
                staff_idx,
                prev_by_staff.get(&staff_idx),
                attributes.as_ref(),
                &part,
            );
            cursor.segment = segments[seg_idx].owner;
            cursor.idx = model_idx;
            match segments[seg_idx].models[model_idx].validate(&mut cursor) {
                Ok(()) => {}
                Err(EngineError::Deferred(what)) => {
                    warn!(
                        "model {} of {:?} still unresolved after measure pass (missing {})",
                        model_idx, segments[seg_idx].owner, what
                    );
                }
                Err(e) => return Err(e),
            }
        }
        staves = std::mem::take(&mut cursor.staves);
    }
    let _ = staves;

    // Reconcile positions across voices and staves.  Two passes reach
    // the fixed point for this operator: the first can leave slots that
    // were created after some collections had already been visited.
    if !options.validate_only && !options.no_align {
        let mut master: Vec<MasterSlot> = Vec::new();
        for pass in 0..2 {
            for layouts in voice_layouts.iter_mut() {
                merge_into(&mut master, layouts);
            }
            for layouts in staff_layouts.values_mut() {
                merge_into(&mut master, layouts);
            }
            debug!("merge pass {}: {} division slots", pass + 1, master.len());
        }
    }

    let mut elements = voice_layouts;
    elements.extend(staff_layouts.into_values());

    Ok(MeasureLayout {
        attributes: last_attributes,
        elements,
        width: max_x - measure.x,
        padding_top: max_padding_top,
        padding_bottom: max_padding_bottom,
    })
}

/// Process the next pending model of a staff segment within the current
/// voice's cursor, preserving the cursor's own traversal position.
#[allow(clippy::too_many_arguments)]
fn push_staff_model(
    segments: &mut [Segment],
    staff_seg_idx: usize,
    staff_idx: usize,
    cursor: &mut Cursor,
    staff_consumed: &mut BTreeMap<usize, usize>,
    division_per_staff: &mut BTreeMap<usize, i32>,
    staff_layouts: &mut BTreeMap<usize, Vec<Layout>>,
    deferred: &mut Vec<(usize, usize)>,
    validate_only: bool,
) -> Result<(), EngineError> {
    let next = staff_consumed.get(&staff_idx).copied().unwrap_or(0);

    let old_division = cursor.division;
    let old_segment = cursor.segment;
    let old_idx = cursor.idx;
    let old_part = std::mem::take(&mut cursor.part);
    let old_staff_idx = cursor.staff_idx;

    cursor.division = division_per_staff.get(&staff_idx).copied().unwrap_or(0);
    cursor.segment = segments[staff_seg_idx].owner;
    cursor.idx = next;
    cursor.part = segments[staff_seg_idx].part.clone();
    cursor.staff_idx = staff_idx;

    if validate_only {
        let model = &mut segments[staff_seg_idx].models[next];
        model.staff_idx = staff_idx;
        match model.validate(cursor) {
            Ok(()) => {}
            Err(EngineError::Deferred(what)) => {
                debug!(
                    "deferring staff model {} of staff {} (missing {})",
                    next, staff_idx, what
                );
                deferred.push((staff_seg_idx, next));
            }
            Err(e) => return Err(e),
        }
    } else {
        let layout = segments[staff_seg_idx].models[next].layout(cursor);
        staff_layouts.entry(staff_idx).or_default().push(layout);
    }

    cursor.division += segments[staff_seg_idx].models[next].div_count;
    division_per_staff.insert(staff_idx, cursor.division);
    staff_consumed.insert(staff_idx, next + 1);
    cursor.prev = Some(segments[staff_seg_idx].models[next].kind());

    cursor.division = old_division;
    cursor.segment = old_segment;
    cursor.idx = old_idx;
    cursor.part = old_part;
    cursor.staff_idx = old_staff_idx;
    Ok(())
}

// ── Constraint merge ────────────────────────────────────────────────

/// One reconciled horizontal position per division slot.
#[derive(Debug, Clone, Copy)]
struct MasterSlot {
    division: i32,
    rank: u8,
    x: f64,
}

/// Attributes share a division with the first beat but occupy their own
/// slot: clefs and signatures reconcile among themselves, never against
/// the note that follows them.
fn slot_rank(class: crate::model::ModelKind) -> u8 {
    match class {
        crate::model::ModelKind::Attributes => 0,
        _ => 1,
    }
}

/// Fold one layout collection into the master layout, writing the
/// reconciled position back into both sides.  Per slot the operator is
/// associative and commutative (`min` / `max`), which is why repeated
/// reduction converges.  Elements never change size here, only position.
fn merge_into(master: &mut Vec<MasterSlot>, layouts: &mut [Layout]) {
    for layout in layouts {
        let rank = slot_rank(layout.render_class);
        match master.binary_search_by(|slot| {
            slot.division
                .cmp(&layout.division)
                .then(slot.rank.cmp(&rank))
        }) {
            Ok(i) => {
                let merged = match layout.merge_policy {
                    MergePolicy::Min => master[i].x.min(layout.x),
                    MergePolicy::Max => master[i].x.max(layout.x),
                };
                master[i].x = merged;
                layout.x = merged;
            }
            Err(i) => {
                master.insert(
                    i,
                    MasterSlot {
                        division: layout.division,
                        rank,
                        x: layout.x,
                    },
                );
            }
        }
    }
}
