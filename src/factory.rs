//! Model factory: creates models by type tag from a registered
//! constructor table.
//!
//! The table is built once at startup and read-only afterwards, so a
//! factory can be shared across concurrent measure-processing workers
//! without synchronization.  At layout time dispatch goes through the
//! model's own tagged variant; the table only exists for construction
//! from raw interchange specs.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::EngineError;
use crate::model::{Model, ModelKind};
use crate::models;

/// Builds a model from an optional raw spec supplied by the interchange
/// layer.
pub type Constructor = fn(Option<&Value>) -> Result<Model, EngineError>;

/// Constructor table keyed by model kind.
#[derive(Debug, Clone)]
pub struct Factory {
    table: BTreeMap<ModelKind, Constructor>,
}

impl Factory {
    /// Build a factory from an explicit registration list.
    pub fn new(registrations: &[(ModelKind, Constructor)]) -> Factory {
        Factory {
            table: registrations.iter().copied().collect(),
        }
    }

    /// Factory over every model kind this crate knows.
    pub fn with_standard_models() -> Factory {
        Factory::new(&[
            (ModelKind::Attributes, models::attributes_from_spec as Constructor),
            (ModelKind::Chord, models::chord_from_spec as Constructor),
            (ModelKind::Harmony, models::harmony_from_spec as Constructor),
            (ModelKind::Barline, models::barline_from_spec as Constructor),
            (ModelKind::Spacer, models::spacer_from_spec as Constructor),
        ])
    }

    pub fn is_registered(&self, kind: ModelKind) -> bool {
        self.table.contains_key(&kind)
    }

    /// Create a model of `kind`, optionally from a raw spec.
    pub fn create(&self, kind: ModelKind, spec: Option<&Value>) -> Result<Model, EngineError> {
        let ctor = self
            .table
            .get(&kind)
            .ok_or(EngineError::UnknownType(kind))?;
        ctor(spec)
    }
}

impl Default for Factory {
    fn default() -> Self {
        Factory::with_standard_models()
    }
}
