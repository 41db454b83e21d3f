//! engravelib — measure layout and validation engine for sheet music rendering.
//!
//! The crate takes one measure's worth of notation — segments of
//! polymorphic models, each segment owned by a staff or a voice — and
//! computes a validated, spatially laid-out [`MeasureLayout`] for an
//! external renderer.  Every model follows the same two-phase contract:
//! `validate` (may auto-correct in place) then `layout` (pure, advances
//! the cursor).  The processor interleaves staff-owned content with each
//! voice in division order and reconciles conflicting spacing demands
//! with a constraint-merge pass.
//!
//! Rendering, the interchange format, fonts and the application API are
//! external collaborators: raw model specs come in as JSON, layouts and
//! bounding boxes go out, and glyph widths are looked up through the
//! [`GlyphMetrics`] trait.
//!
//! # Example
//! ```no_run
//! use engravelib::{Factory, ModelKind, Segment, StandardGlyphs};
//! use engravelib::{layout_measure, LineContext, MeasureContext, ProcessOptions};
//! use serde_json::json;
//!
//! let factory = Factory::with_standard_models();
//! let attributes = factory
//!     .create(ModelKind::Attributes, Some(&json!({ "divisions": 60 })))
//!     .unwrap();
//! let segments = &mut [Segment::voice(1, "P1", vec![attributes])];
//!
//! let measure = MeasureContext { number: "1".into(), x: 100.0, ..Default::default() };
//! let layout = layout_measure(
//!     segments,
//!     &measure,
//!     &LineContext::default(),
//!     &Default::default(),
//!     &factory,
//!     None,
//!     &StandardGlyphs,
//!     ProcessOptions::default(),
//! )
//! .unwrap();
//! println!("measure width: {}", layout.width);
//! ```

pub mod context;
pub mod error;
pub mod factory;
pub mod glyphs;
pub mod metre;
pub mod model;
pub mod models;
pub mod processor;
pub mod segment;

use std::collections::BTreeMap;

pub use context::{Cursor, CursorOptions, LineContext, MeasureContext, StaffContext, VoiceContext};
pub use error::EngineError;
pub use factory::Factory;
pub use glyphs::{GlyphMetrics, StandardGlyphs};
pub use metre::rhythmic_spellcheck;
pub use model::{
    Attributes, BoundingBox, Clef, ExpandPolicy, Frozenness, Key, Layout, LayoutDetail,
    MergePolicy, Model, ModelData, ModelKind, ModelRef, NoteValue, Pitch, TimeSignature,
};
pub use processor::{process_measure, MeasureLayout, ProcessOptions, ProcessSpec};
pub use segment::{OwnerKind, Segment, SegmentOwner};

/// Lay out one measure.  Convenience wrapper over [`process_measure`].
#[allow(clippy::too_many_arguments)]
pub fn layout_measure(
    segments: &mut [Segment],
    measure: &MeasureContext,
    line: &LineContext,
    prev_by_staff: &BTreeMap<usize, StaffContext>,
    factory: &Factory,
    attributes: Option<Attributes>,
    glyphs: &dyn GlyphMetrics,
    options: ProcessOptions,
) -> Result<MeasureLayout, EngineError> {
    process_measure(ProcessSpec {
        segments,
        measure,
        line,
        prev_by_staff,
        factory,
        attributes,
        glyphs,
        options: ProcessOptions {
            validate_only: false,
            ..options
        },
    })
}

/// Validate one measure without producing layouts.  Convenience wrapper
/// over [`process_measure`].
#[allow(clippy::too_many_arguments)]
pub fn validate_measure(
    segments: &mut [Segment],
    measure: &MeasureContext,
    line: &LineContext,
    prev_by_staff: &BTreeMap<usize, StaffContext>,
    factory: &Factory,
    attributes: Option<Attributes>,
    glyphs: &dyn GlyphMetrics,
    options: ProcessOptions,
) -> Result<MeasureLayout, EngineError> {
    process_measure(ProcessSpec {
        segments,
        measure,
        line,
        prev_by_staff,
        factory,
        attributes,
        glyphs,
        options: ProcessOptions {
            validate_only: true,
            ..options
        },
    })
}
