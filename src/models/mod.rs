//! Per-kind model behavior: the validate/layout implementations behind
//! each [`crate::model::ModelData`] variant, plus the raw-spec
//! constructors the factory registers.

mod attributes;
mod barline;
mod chord;
mod harmony;
mod spacer;

pub use attributes::AttributesModel;
pub use barline::BarlineModel;
pub use chord::{ChordModel, Note};
pub use harmony::{HarmonyModel, HarmonyRoot};
pub use spacer::SpacerModel;

pub(crate) use attributes::attributes_from_spec;
pub(crate) use barline::barline_from_spec;
pub(crate) use chord::chord_from_spec;
pub(crate) use harmony::harmony_from_spec;
pub(crate) use spacer::spacer_from_spec;
