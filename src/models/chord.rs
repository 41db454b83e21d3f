//! The chord model: one or more simultaneous notes, or a rest.
//!
//! Validation fills in the division count from the written note value
//! when the document layer left it unset, and keeps the staff context's
//! accidental bookkeeping current (adding courtesy accidentals where the
//! measure already sounded a different alteration for a pitch).

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Cursor;
use crate::error::EngineError;
use crate::glyphs::{CHORD_PADDING_ABOVE, CHORD_PADDING_BELOW, PER_QUARTER_SPACING};
use crate::model::{
    BoundingBox, ExpandPolicy, Layout, MergePolicy, Model, ModelData, ModelKind, NoteValue, Pitch,
};

/// One note within a chord (or the rest the chord stands for).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// None for rests.
    #[serde(default)]
    pub pitch: Option<Pitch>,
    #[serde(default)]
    pub rest: bool,
    pub value: NoteValue,
    #[serde(default)]
    pub dots: u8,
    /// This note ties into the next note of the same pitch.
    #[serde(default)]
    pub tie: bool,
    /// Explicitly displayed accidental (alteration value).
    #[serde(default)]
    pub accidental: Option<i32>,
}

impl Note {
    pub fn is_rest(&self) -> bool {
        self.rest || self.pitch.is_none()
    }
}

/// A chord: notes sounding together, sharing one written duration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChordModel {
    pub notes: Vec<Note>,
}

impl ChordModel {
    /// The written duration shared by the chord's notes.
    pub fn written_value(&self) -> Option<(NoteValue, u8)> {
        self.notes.first().map(|n| (n.value, n.dots))
    }

    /// Returns the (possibly corrected) division count for the chord.
    pub(crate) fn validate(
        &mut self,
        current_div: i32,
        cursor: &mut Cursor,
        frozen: bool,
    ) -> Result<i32, EngineError> {
        let part = cursor.part.clone();
        let dpq = cursor.staff_mut().part_attributes(&part).map(|a| a.divisions);

        let mut div = current_div;
        if div == 0 {
            if let Some((value, dots)) = self.written_value() {
                let dpq = dpq.ok_or(EngineError::Deferred("divisions per quarter note"))?;
                div = match value.dotted_divisions(dots, dpq) {
                    Some(d) => d,
                    None => {
                        // Degrade to the undotted length rather than reject.
                        warn!(
                            "note value {:?} with {} dot(s) not representable at {} div/quarter",
                            value, dots, dpq
                        );
                        value.divisions(dpq).unwrap_or(dpq)
                    }
                };
            }
        }

        if !frozen {
            for note in &mut self.notes {
                let Some(pitch) = note.pitch.clone() else {
                    continue;
                };
                let key = pitch_key(&pitch);
                let staff = cursor.staff_mut();
                match note.accidental {
                    Some(alter) => {
                        staff.accidentals.insert(key, alter);
                    }
                    None => {
                        // Courtesy accidental: the measure already sounded
                        // a different alteration for this pitch.
                        if let Some(&sounded) = staff.accidentals.get(&key) {
                            if sounded != pitch.alter {
                                note.accidental = Some(pitch.alter);
                                staff.accidentals.insert(key, pitch.alter);
                            }
                        }
                    }
                }
            }
        }

        Ok(div)
    }

    pub(crate) fn layout(&self, model: &Model, cursor: &mut Cursor) -> Layout {
        let dpq = cursor
            .staff()
            .part_attributes(&cursor.part)
            .map(|a| a.divisions)
            .unwrap_or(1)
            .max(1);
        let quarters = model.div_count as f64 / dpq as f64;

        let notehead = match self.written_value() {
            Some((NoteValue::Breve, _)) | Some((NoteValue::Whole, _)) => "noteheadWhole",
            Some((NoteValue::Half, _)) => "noteheadHalf",
            _ => "noteheadBlack",
        };
        let mut advance = cursor.glyphs.width(notehead) + PER_QUARTER_SPACING * quarters;
        if !cursor.approximate {
            for note in &self.notes {
                if note.accidental.is_some() {
                    advance += cursor.glyphs.width("accidentalSharp");
                }
                advance += note.dots as f64 * cursor.glyphs.width("augmentationDot");
            }
        }

        let mut layout = Layout::new(
            cursor,
            ModelKind::Chord,
            MergePolicy::Max,
            ExpandPolicy::Expand,
        );
        layout.bounding_boxes.push(BoundingBox {
            x: 0.0,
            y: 0.0,
            w: cursor.glyphs.width(notehead),
            h: cursor.glyphs.height(notehead),
        });

        for note in &self.notes {
            if let Some(pitch) = &note.pitch {
                if pitch.octave >= 6 {
                    cursor.request_padding(CHORD_PADDING_ABOVE, 0.0);
                } else if pitch.octave <= 3 {
                    cursor.request_padding(0.0, CHORD_PADDING_BELOW);
                }
            }
        }

        cursor.x += advance;
        layout
    }
}

/// Accidental bookkeeping key: step plus octave, e.g. "F5".
fn pitch_key(pitch: &Pitch) -> String {
    format!("{}{}", pitch.step, pitch.octave)
}

/// Raw chord spec from the interchange layer: the note list plus an
/// optional pre-computed division count.
#[derive(Debug, Default, Deserialize)]
struct ChordSpec {
    #[serde(default)]
    notes: Vec<Note>,
    #[serde(default)]
    div_count: i32,
}

pub(crate) fn chord_from_spec(spec: Option<&Value>) -> Result<Model, EngineError> {
    let spec = match spec {
        Some(v) => serde_json::from_value::<ChordSpec>(v.clone())?,
        None => ChordSpec::default(),
    };
    let mut model = Model::new(ModelData::Chord(ChordModel { notes: spec.notes }));
    model.div_count = spec.div_count;
    Ok(model)
}
