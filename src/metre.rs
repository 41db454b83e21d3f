//! Rhythmic normalization: merge adjacent tied notes and adjacent rests
//! within a voice segment when they are musically one value.
//!
//! Two tied eighth notes of the same pitch are really one quarter note;
//! two eighth rests in sequence are one quarter rest.  The pass rewrites
//! such pairs in place, shrinking the segment, while refusing to merge
//! across rhythmic boundaries (a pair whose combined value does not start
//! on its own grid stays split so the notation keeps the beat readable).

use log::debug;

use crate::context::Cursor;
use crate::error::EngineError;
use crate::model::{ModelData, NoteValue};
use crate::segment::Segment;

/// Normalize `segment` in place.  Returns `true` iff at least one merge
/// occurred anywhere in the segment.
///
/// One call runs to a fixed point: a chain of tied notes collapses fully
/// (pairs first, then the results of those merges), so callers invoke
/// this once per validation cycle.
pub fn rhythmic_spellcheck(segment: &mut Segment, cursor: &Cursor) -> Result<bool, EngineError> {
    // Missing context is recoverable here, same as missing divisions:
    // the caller retries once the staff has been established.
    let dpq = cursor
        .staves
        .get(&cursor.staff_idx)
        .ok_or(EngineError::Deferred("staff context"))?
        .part_attributes(&segment.part)
        .map(|a| a.divisions)
        .ok_or(EngineError::Deferred("divisions per quarter note"))?;

    let mut changed_any = false;
    let mut start = 0i32;
    let mut i = 0;
    while i + 1 < segment.models.len() {
        match merge_candidate(segment, i, start, dpq) {
            Some((value, dots, carry_tie)) => {
                let combined = segment.models[i].div_count + segment.models[i + 1].div_count;
                debug!(
                    "merging models {} and {} of {:?} into {:?} ({} divisions)",
                    i,
                    i + 1,
                    segment.owner,
                    value,
                    combined
                );
                if let ModelData::Chord(chord) = &mut segment.models[i].data {
                    let note = &mut chord.notes[0];
                    note.value = value;
                    note.dots = dots;
                    note.tie = carry_tie;
                }
                segment.models[i].div_count = combined;
                segment.models.remove(i + 1);
                changed_any = true;
                // Re-examine the merged model against its new neighbor.
            }
            None => {
                start += segment.models[i].div_count;
                i += 1;
            }
        }
    }
    Ok(changed_any)
}

/// Decide whether models `i` and `i + 1` merge.  On success returns the
/// merged written value, its dot count, and the tie carried onward from
/// the second model.
fn merge_candidate(
    segment: &Segment,
    i: usize,
    start: i32,
    dpq: i32,
) -> Option<(NoteValue, u8, bool)> {
    let a = &segment.models[i];
    let b = &segment.models[i + 1];

    let (ca, cb) = match (&a.data, &b.data) {
        (ModelData::Chord(x), ModelData::Chord(y)) => (x, y),
        _ => return None,
    };
    // Only single-note chords merge; multi-note chords and mixtures of
    // rests with notes stay put.
    if ca.notes.len() != 1 || cb.notes.len() != 1 {
        return None;
    }
    let na = &ca.notes[0];
    let nb = &cb.notes[0];

    let combinable = if na.is_rest() && nb.is_rest() {
        // Rests combine on duration alone.
        true
    } else if !na.is_rest() && !nb.is_rest() {
        // Notes additionally need a tie and matching pitch.
        na.tie && na.pitch == nb.pitch
    } else {
        false
    };
    if !combinable {
        return None;
    }

    let combined = a.div_count + b.div_count;
    let (value, dots) = NoteValue::from_divisions(combined, dpq)?;

    // Rhythmic boundary: the merged value must start on its own grid.
    if start % combined != 0 {
        return None;
    }

    Some((value, dots, nb.tie))
}
