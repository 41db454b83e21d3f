//! Segments: ordered model sequences owned by exactly one staff or one
//! voice within a measure.
//!
//! Staff-owned segments hold shared content (clef changes, barlines) and
//! conserve divisions: their `div_count` sum equals the staff's total
//! division count for the measure.  Voice-owned segments hold the notes
//! and rests of one musical line and may interleave with staff content.

use serde::{Deserialize, Serialize};

use crate::model::Model;

/// Who owns a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OwnerKind {
    Staff,
    Voice,
}

/// Owner tag: kind plus staff or voice number.  Within a measure there
/// is exactly one segment per owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentOwner {
    pub kind: OwnerKind,
    pub id: usize,
}

/// Ordered sequence of models belonging to one (staff, voice) owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub owner: SegmentOwner,
    /// Part id the segment belongs to.
    pub part: String,
    pub models: Vec<Model>,
}

impl Segment {
    pub fn staff(id: usize, part: impl Into<String>, models: Vec<Model>) -> Segment {
        Segment {
            owner: SegmentOwner {
                kind: OwnerKind::Staff,
                id,
            },
            part: part.into(),
            models,
        }
    }

    pub fn voice(id: usize, part: impl Into<String>, models: Vec<Model>) -> Segment {
        Segment {
            owner: SegmentOwner {
                kind: OwnerKind::Voice,
                id,
            },
            part: part.into(),
            models,
        }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Sum of `div_count` across the segment's models.
    pub fn total_div_count(&self) -> i32 {
        self.models.iter().map(|m| m.div_count).sum()
    }

    /// Division conservation: a staff-owned segment must account for the
    /// staff's full measure.
    pub fn conserves_divisions(&self, total_divisions: i32) -> bool {
        self.owner.kind != OwnerKind::Staff || self.total_div_count() == total_divisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelData;
    use crate::models::SpacerModel;

    fn sized(div: i32) -> Model {
        let mut model = Model::new(ModelData::Spacer(SpacerModel::default()));
        model.div_count = div;
        model
    }

    #[test]
    fn staff_segments_must_account_for_the_full_measure() {
        let segment = Segment::staff(0, "P1", vec![sized(60), sized(180)]);
        assert_eq!(segment.total_div_count(), 240);
        assert!(segment.conserves_divisions(240));
        assert!(!segment.conserves_divisions(180));
    }

    #[test]
    fn voice_segments_are_not_held_to_conservation() {
        let segment = Segment::voice(1, "P1", vec![sized(60)]);
        assert!(segment.conserves_divisions(0));
        assert!(segment.conserves_divisions(240));
    }
}
