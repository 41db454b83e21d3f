//! The barline model.  Layout computes the per-style line geometry
//! (light and heavy strokes and their offsets) that the renderer draws
//! as full-stave-height lines.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Cursor;
use crate::error::EngineError;
use crate::glyphs::{BARLINE_PADDING, BARLINE_SEPARATION, STAFF_HEIGHT};
use crate::model::{
    BoundingBox, ExpandPolicy, Layout, LayoutDetail, MergePolicy, Model, ModelData, ModelKind,
};

const KNOWN_STYLES: [&str; 8] = [
    "regular",
    "dashed",
    "dotted",
    "light-light",
    "light-heavy",
    "heavy-light",
    "heavy-heavy",
    "none",
];

/// A barline (visual style only; repeats belong to the document layer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarlineModel {
    /// Location: "left", "right", "middle"
    #[serde(default = "default_location")]
    pub location: String,
    /// Visual style: "regular", "light-light", "light-heavy", …
    #[serde(default = "default_bar_style")]
    pub bar_style: String,
}

fn default_location() -> String {
    "right".to_string()
}

fn default_bar_style() -> String {
    "regular".to_string()
}

impl Default for BarlineModel {
    fn default() -> Self {
        BarlineModel {
            location: default_location(),
            bar_style: default_bar_style(),
        }
    }
}

impl BarlineModel {
    pub(crate) fn validate(&mut self, _cursor: &mut Cursor, frozen: bool) -> Result<(), EngineError> {
        if !frozen && !KNOWN_STYLES.contains(&self.bar_style.as_str()) {
            warn!("unknown bar style {:?}, normalizing to regular", self.bar_style);
            self.bar_style = default_bar_style();
        }
        Ok(())
    }

    pub(crate) fn layout(&self, _model: &Model, cursor: &mut Cursor) -> Layout {
        let thin = cursor.glyphs.width("barlineThin");
        let heavy = cursor.glyphs.width("barlineHeavy");

        let (line_starts, line_widths): (Vec<f64>, Vec<f64>) = match self.bar_style.as_str() {
            "light-light" => (vec![0.0, thin + BARLINE_SEPARATION], vec![thin, thin]),
            "light-heavy" => (vec![0.0, thin + BARLINE_SEPARATION], vec![thin, heavy]),
            "heavy-light" => (vec![0.0, heavy + BARLINE_SEPARATION], vec![heavy, thin]),
            "heavy-heavy" => (vec![0.0, heavy + BARLINE_SEPARATION], vec![heavy, heavy]),
            "none" => (vec![], vec![]),
            _ => (vec![0.0], vec![thin]),
        };

        let ink = line_starts
            .last()
            .zip(line_widths.last())
            .map_or(0.0, |(s, w)| s + w);

        let mut layout = Layout::new(
            cursor,
            ModelKind::Barline,
            MergePolicy::Max,
            ExpandPolicy::None,
        );
        if ink > 0.0 {
            layout.bounding_boxes.push(BoundingBox {
                x: 0.0,
                y: 0.0,
                w: ink,
                h: STAFF_HEIGHT,
            });
        }
        layout.detail = LayoutDetail::Barline {
            line_starts,
            line_widths,
        };

        cursor.x += ink + BARLINE_PADDING;
        layout
    }
}

pub(crate) fn barline_from_spec(spec: Option<&Value>) -> Result<Model, EngineError> {
    let data = match spec {
        Some(v) => serde_json::from_value::<BarlineModel>(v.clone())?,
        None => BarlineModel::default(),
    };
    Ok(Model::new(ModelData::Barline(data)))
}
