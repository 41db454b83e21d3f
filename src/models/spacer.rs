//! The spacer model: an invisible element reserving explicit horizontal
//! room, consuming no divisions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Cursor;
use crate::error::EngineError;
use crate::model::{ExpandPolicy, Layout, MergePolicy, Model, ModelData, ModelKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpacerModel {
    #[serde(default)]
    pub width: f64,
}

impl SpacerModel {
    pub(crate) fn layout(&self, _model: &Model, cursor: &mut Cursor) -> Layout {
        let layout = Layout::new(
            cursor,
            ModelKind::Spacer,
            MergePolicy::Max,
            ExpandPolicy::None,
        );
        cursor.x += self.width.max(0.0);
        layout
    }
}

pub(crate) fn spacer_from_spec(spec: Option<&Value>) -> Result<Model, EngineError> {
    let data = match spec {
        Some(v) => serde_json::from_value::<SpacerModel>(v.clone())?,
        None => SpacerModel::default(),
    };
    Ok(Model::new(ModelData::Spacer(data)))
}
