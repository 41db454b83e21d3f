//! The attributes model: clef, key signature, time signature and
//! divisions changes on a staff.
//!
//! Validation inherits anything left unspecified from the previous staff
//! context (a mid-piece attributes change rarely restates the clef), then
//! installs the resolved snapshot into the staff context.  Layout decides
//! independently whether clef / key / time must be newly displayed and
//! reserves strictly positive spacing for each shown element in the fixed
//! visual order clef, key, time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Cursor;
use crate::error::EngineError;
use crate::glyphs::{
    CLEF_PADDING, KEY_SIG_ACCIDENTAL_SPACE, KEY_SIG_PADDING, STAFF_HEIGHT, TIME_SIG_PADDING,
};
use crate::model::{
    Attributes, BoundingBox, Clef, ExpandPolicy, Key, Layout, LayoutDetail, MergePolicy, Model,
    ModelData, ModelKind, TimeSignature,
};

/// Attributes change.  Unset fields mean "unchanged"; validation resolves
/// them against the previous context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributesModel {
    #[serde(default)]
    pub divisions: Option<i32>,
    #[serde(default)]
    pub key: Option<Key>,
    #[serde(default)]
    pub time: Option<TimeSignature>,
    #[serde(default)]
    pub clefs: Vec<Clef>,
    #[serde(default)]
    pub staves: Option<i32>,
}

impl AttributesModel {
    /// The fully resolved snapshot this model stands for.  Falls back to
    /// conventional defaults (treble clef, C major, common time) for
    /// anything still unset.
    pub fn snapshot(&self) -> Attributes {
        Attributes {
            divisions: self.divisions.unwrap_or(1),
            key: self.key.clone().unwrap_or_default(),
            time: self.time.clone().unwrap_or_default(),
            clefs: if self.clefs.is_empty() {
                vec![Clef::default()]
            } else {
                self.clefs.clone()
            },
            staves: self.staves.unwrap_or(1),
        }
    }

    pub(crate) fn validate(&mut self, cursor: &mut Cursor, frozen: bool) -> Result<(), EngineError> {
        let part = cursor.part.clone();
        let inherited = {
            let staff = cursor.staff_mut();
            staff
                .part_attributes(&part)
                .cloned()
                .or_else(|| {
                    staff
                        .previous
                        .as_deref()
                        .and_then(|p| p.part_attributes(&part).cloned())
                })
        };

        if !frozen {
            if self.divisions.is_none() {
                self.divisions = inherited.as_ref().map(|a| a.divisions);
            }
            if self.divisions.is_none() {
                return Err(EngineError::Deferred("divisions per quarter note"));
            }
            if self.key.is_none() {
                self.key = Some(inherited.as_ref().map(|a| a.key.clone()).unwrap_or_default());
            }
            if self.time.is_none() {
                self.time = Some(inherited.as_ref().map(|a| a.time.clone()).unwrap_or_default());
            }
            if self.clefs.is_empty() {
                self.clefs = inherited
                    .as_ref()
                    .map(|a| a.clefs.clone())
                    .unwrap_or_else(|| vec![Clef::default()]);
            }
            if self.staves.is_none() {
                self.staves = Some(inherited.as_ref().map(|a| a.staves).unwrap_or(1));
            }
        }

        let snapshot = self.snapshot();
        let staff = cursor.staff_mut();
        staff.total_divisions = snapshot.measure_divisions();
        staff.attributes.insert(part, snapshot);
        Ok(())
    }

    pub(crate) fn layout(&self, _model: &Model, cursor: &mut Cursor) -> Layout {
        let current = self.snapshot();
        let previous = cursor
            .staff()
            .previous
            .as_deref()
            .and_then(|p| p.part_attributes(&cursor.part).cloned());

        // Keep the staff context current even in a pure layout pass, so
        // later models on this staff see the new divisions and clefs.
        let part = cursor.part.clone();
        let staff = cursor.staff_mut();
        staff.total_divisions = current.measure_divisions();
        staff.attributes.insert(part, current.clone());

        // Each element is shown independently: only what actually changed
        // relative to the carried-over context costs space.  At the start
        // of a song everything is shown.
        let clef_visible = previous.as_ref().map_or(true, |p| p.clefs != current.clefs);
        let ks_visible = previous.as_ref().map_or(true, |p| p.key != current.key);
        let ts_visible = previous.as_ref().map_or(true, |p| p.time != current.time);

        let clef_glyph = match current.clefs.first().map(|c| c.sign.as_str()) {
            Some("F") => "fClef",
            Some("C") => "cClef",
            _ => "gClef",
        };
        let accidental_glyph = if current.key.fifths < 0 {
            "accidentalFlat"
        } else {
            "accidentalSharp"
        };

        let clef_spacing = if clef_visible {
            cursor.glyphs.width(clef_glyph) + CLEF_PADDING
        } else {
            0.0
        };
        let ks_spacing = if ks_visible {
            KEY_SIG_PADDING
                + current.key.fifths.unsigned_abs() as f64
                    * KEY_SIG_ACCIDENTAL_SPACE.max(cursor.glyphs.width(accidental_glyph))
        } else {
            0.0
        };
        let ts_spacing = if ts_visible {
            cursor.glyphs.width("timeSig") + TIME_SIG_PADDING
        } else {
            0.0
        };

        let mut layout = Layout::new(
            cursor,
            ModelKind::Attributes,
            MergePolicy::Max,
            ExpandPolicy::None,
        );
        layout.detail = LayoutDetail::Attributes {
            clef_visible,
            ks_visible,
            ts_visible,
            clef_spacing,
            ks_spacing,
            ts_spacing,
        };
        if clef_visible {
            layout.bounding_boxes.push(BoundingBox {
                x: 0.0,
                y: 0.0,
                w: clef_spacing,
                h: cursor.glyphs.height(clef_glyph),
            });
        }
        if ks_visible {
            layout.bounding_boxes.push(BoundingBox {
                x: clef_spacing,
                y: 0.0,
                w: ks_spacing,
                h: cursor.glyphs.height(accidental_glyph),
            });
        }
        if ts_visible {
            layout.bounding_boxes.push(BoundingBox {
                x: clef_spacing + ks_spacing,
                y: 0.0,
                w: ts_spacing,
                h: cursor.glyphs.height("timeSig"),
            });
        }

        if clef_visible {
            let overhang = (cursor.glyphs.height(clef_glyph) - STAFF_HEIGHT).max(0.0) / 2.0;
            cursor.request_padding(overhang, overhang);
        }

        // Total consumed width is exactly the sum of the three spacings.
        cursor.x += clef_spacing + ks_spacing + ts_spacing;
        layout
    }
}

pub(crate) fn attributes_from_spec(spec: Option<&Value>) -> Result<Model, EngineError> {
    let data = match spec {
        Some(v) => serde_json::from_value::<AttributesModel>(v.clone())?,
        None => AttributesModel::default(),
    };
    Ok(Model::new(ModelData::Attributes(data)))
}
