//! The harmony model: a chord symbol (e.g. "C7", "Fm/Ab") attached to a
//! division but consuming no time and no horizontal space of its own.
//! It proposes the tightest position for its slot, so its merge policy
//! is `Min`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Cursor;
use crate::error::EngineError;
use crate::glyphs::{HARMONY_CHAR_WIDTH, HARMONY_PADDING_ABOVE};
use crate::model::{
    BoundingBox, ExpandPolicy, Layout, MergePolicy, Model, ModelData, ModelKind,
};

/// Root or bass note of a harmony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarmonyRoot {
    /// Note name: A–G
    pub step: String,
    /// Alteration: -1 = flat, 1 = sharp
    #[serde(default)]
    pub alter: i32,
}

/// A chord symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarmonyModel {
    pub root: HarmonyRoot,
    /// Chord quality: "major", "minor", "dominant", "diminished", …
    pub kind: String,
    /// Bass note for slash chords.
    #[serde(default)]
    pub bass: Option<HarmonyRoot>,
    /// "above" (default) or "below".
    #[serde(default)]
    pub placement: Option<String>,
}

impl HarmonyModel {
    /// Display text for width estimation and rendering.
    pub fn text(&self) -> String {
        let mut s = root_text(&self.root);
        match self.kind.as_str() {
            "major" | "" => {}
            "minor" => s.push('m'),
            "dominant" => s.push('7'),
            "diminished" => s.push_str("dim"),
            "augmented" => s.push_str("aug"),
            other => s.push_str(other),
        }
        if let Some(bass) = &self.bass {
            s.push('/');
            s.push_str(&root_text(bass));
        }
        s
    }

    pub(crate) fn validate(&mut self, _cursor: &mut Cursor, frozen: bool) -> Result<(), EngineError> {
        if !frozen && self.kind.is_empty() {
            self.kind = "major".to_string();
        }
        Ok(())
    }

    pub(crate) fn layout(&self, _model: &Model, cursor: &mut Cursor) -> Layout {
        let text = self.text();
        let mut layout = Layout::new(
            cursor,
            ModelKind::Harmony,
            MergePolicy::Min,
            ExpandPolicy::None,
        );
        layout.bounding_boxes.push(BoundingBox {
            x: 0.0,
            y: -HARMONY_PADDING_ABOVE,
            w: text.chars().count() as f64 * HARMONY_CHAR_WIDTH,
            h: HARMONY_PADDING_ABOVE,
        });
        if self.placement.as_deref() == Some("below") {
            cursor.request_padding(0.0, HARMONY_PADDING_ABOVE);
        } else {
            cursor.request_padding(HARMONY_PADDING_ABOVE, 0.0);
        }
        // Zero width: the symbol rides above whatever occupies the slot.
        layout
    }
}

fn root_text(root: &HarmonyRoot) -> String {
    let mut s = root.step.clone();
    match root.alter {
        a if a < 0 => s.push('♭'),
        a if a > 0 => s.push('♯'),
        _ => {}
    }
    s
}

pub(crate) fn harmony_from_spec(spec: Option<&Value>) -> Result<Model, EngineError> {
    let data = match spec {
        Some(v) => serde_json::from_value::<HarmonyModel>(v.clone())?,
        None => HarmonyModel {
            root: HarmonyRoot {
                step: "C".to_string(),
                alter: 0,
            },
            kind: "major".to_string(),
            bass: None,
            placement: None,
        },
    };
    Ok(Model::new(ModelData::Harmony(data)))
}
