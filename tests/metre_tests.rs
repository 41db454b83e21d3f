//! Rhythmic normalization tests: tied-note and rest merging, boundary
//! refusal, and division conservation.

use pretty_assertions::assert_eq;
use serde_json::json;

use engravelib::metre::rhythmic_spellcheck;
use engravelib::{
    Attributes, Clef, Cursor, CursorOptions, Factory, Key, LineContext, MeasureContext, Model,
    ModelData, ModelKind, NoteValue, OwnerKind, Segment, SegmentOwner, StandardGlyphs,
    TimeSignature, VoiceContext,
};

fn standard_attributes() -> Attributes {
    Attributes {
        divisions: 60,
        key: Key::default(),
        time: TimeSignature::default(),
        clefs: vec![Clef::default()],
        staves: 1,
    }
}

fn make_cursor<'a>(
    factory: &'a Factory,
    measure: &'a MeasureContext,
    line: &'a LineContext,
    glyphs: &'a StandardGlyphs,
) -> Cursor<'a> {
    let mut cursor = Cursor::new(
        SegmentOwner {
            kind: OwnerKind::Voice,
            id: 1,
        },
        VoiceContext { idx: 1 },
        measure,
        line,
        factory,
        glyphs,
        CursorOptions {
            detached: true,
            ..Default::default()
        },
    );
    cursor.part = "P1".to_string();
    cursor.ensure_staff(0, None, Some(&standard_attributes()), "P1");
    cursor
}

fn note(factory: &Factory, step: &str, value: &str, dots: u8, div: i32, tie: bool) -> Model {
    factory
        .create(
            ModelKind::Chord,
            Some(&json!({
                "notes": [{
                    "pitch": { "step": step, "octave": 4 },
                    "value": value,
                    "dots": dots,
                    "tie": tie
                }],
                "div_count": div
            })),
        )
        .unwrap()
}

fn rest(factory: &Factory, value: &str, div: i32) -> Model {
    factory
        .create(
            ModelKind::Chord,
            Some(&json!({
                "notes": [{ "rest": true, "value": value }],
                "div_count": div
            })),
        )
        .unwrap()
}

fn single_note(model: &Model) -> &engravelib::models::Note {
    match &model.data {
        ModelData::Chord(c) => {
            assert_eq!(c.notes.len(), 1);
            &c.notes[0]
        }
        other => panic!("expected a chord, got {:?}", other),
    }
}

#[test]
fn merges_two_tied_eighth_notes() {
    let factory = Factory::with_standard_models();
    let measure = MeasureContext::default();
    let line = LineContext::default();
    let glyphs = StandardGlyphs;
    let cursor = make_cursor(&factory, &measure, &line, &glyphs);

    let mut segment = Segment::voice(
        1,
        "P1",
        vec![
            note(&factory, "E", "eighth", 0, 30, true),
            note(&factory, "E", "eighth", 0, 30, false),
        ],
    );
    let changed = rhythmic_spellcheck(&mut segment, &cursor).unwrap();
    assert!(changed, "a change should have occurred");

    assert_eq!(segment.len(), 1);
    assert_eq!(segment.models[0].div_count, 60);
    let merged = single_note(&segment.models[0]);
    assert_eq!(merged.value, NoteValue::Quarter);
    assert_eq!(merged.dots, 0);
    assert!(!merged.tie, "the consumed tie should not carry onward");
}

#[test]
fn merges_two_eighth_rests() {
    let factory = Factory::with_standard_models();
    let measure = MeasureContext::default();
    let line = LineContext::default();
    let glyphs = StandardGlyphs;
    let cursor = make_cursor(&factory, &measure, &line, &glyphs);

    let mut segment = Segment::voice(
        1,
        "P1",
        vec![rest(&factory, "eighth", 30), rest(&factory, "eighth", 30)],
    );
    let changed = rhythmic_spellcheck(&mut segment, &cursor).unwrap();
    assert!(changed, "a change should have occurred");

    assert_eq!(segment.len(), 1);
    assert_eq!(segment.models[0].div_count, 60);
    let merged = single_note(&segment.models[0]);
    assert!(merged.is_rest());
    assert_eq!(merged.value, NoteValue::Quarter);
}

#[test]
fn does_not_merge_notes_that_are_not_tied() {
    let factory = Factory::with_standard_models();
    let measure = MeasureContext::default();
    let line = LineContext::default();
    let glyphs = StandardGlyphs;
    let cursor = make_cursor(&factory, &measure, &line, &glyphs);

    let mut segment = Segment::voice(
        1,
        "P1",
        vec![
            note(&factory, "E", "eighth", 0, 30, false),
            note(&factory, "F", "eighth", 0, 30, false),
        ],
    );
    let changed = rhythmic_spellcheck(&mut segment, &cursor).unwrap();
    assert!(!changed, "a change should not have occurred");

    assert_eq!(segment.len(), 2);
    assert_eq!(single_note(&segment.models[0]).value, NoteValue::Eighth);
}

#[test]
fn does_not_merge_after_a_dotted_note() {
    let factory = Factory::with_standard_models();
    let measure = MeasureContext::default();
    let line = LineContext::default();
    let glyphs = StandardGlyphs;
    let cursor = make_cursor(&factory, &measure, &line, &glyphs);

    let mut segment = Segment::voice(
        1,
        "P1",
        vec![
            note(&factory, "E", "quarter", 1, 30, false),
            note(&factory, "F", "eighth", 0, 30, false),
            note(&factory, "F", "eighth", 0, 30, false),
        ],
    );
    let changed = rhythmic_spellcheck(&mut segment, &cursor).unwrap();
    assert!(!changed, "a change should not have occurred");
    assert_eq!(segment.len(), 3);
}

#[test]
fn does_not_merge_rests_across_a_rhythmic_boundary() {
    let factory = Factory::with_standard_models();
    let measure = MeasureContext::default();
    let line = LineContext::default();
    let glyphs = StandardGlyphs;
    let cursor = make_cursor(&factory, &measure, &line, &glyphs);

    // The two trailing rests sum to a quarter, but they start half a
    // beat in: merging would hide the beat.
    let mut segment = Segment::voice(
        1,
        "P1",
        vec![
            note(&factory, "E", "eighth", 0, 30, false),
            rest(&factory, "eighth", 30),
            rest(&factory, "eighth", 30),
        ],
    );
    let changed = rhythmic_spellcheck(&mut segment, &cursor).unwrap();
    assert!(!changed, "a change should not have occurred");
    assert_eq!(segment.len(), 3);
}

#[test]
fn spellcheck_runs_to_fixed_point() {
    let factory = Factory::with_standard_models();
    let measure = MeasureContext::default();
    let line = LineContext::default();
    let glyphs = StandardGlyphs;
    let cursor = make_cursor(&factory, &measure, &line, &glyphs);

    // A chain of four tied eighths is one half note.  A single call
    // collapses the whole chain; the next call finds nothing to do.
    let mut segment = Segment::voice(
        1,
        "P1",
        vec![
            note(&factory, "E", "eighth", 0, 30, true),
            note(&factory, "E", "eighth", 0, 30, true),
            note(&factory, "E", "eighth", 0, 30, true),
            note(&factory, "E", "eighth", 0, 30, false),
        ],
    );
    assert!(rhythmic_spellcheck(&mut segment, &cursor).unwrap());
    assert_eq!(segment.len(), 1);
    assert_eq!(segment.models[0].div_count, 120);
    assert_eq!(single_note(&segment.models[0]).value, NoteValue::Half);

    assert!(!rhythmic_spellcheck(&mut segment, &cursor).unwrap());
    assert_eq!(segment.len(), 1);
}

#[test]
fn normalization_conserves_divisions() {
    let factory = Factory::with_standard_models();
    let measure = MeasureContext::default();
    let line = LineContext::default();
    let glyphs = StandardGlyphs;
    let cursor = make_cursor(&factory, &measure, &line, &glyphs);

    let mut segment = Segment::voice(
        1,
        "P1",
        vec![
            note(&factory, "E", "eighth", 0, 30, true),
            note(&factory, "E", "eighth", 0, 30, false),
            rest(&factory, "eighth", 30),
            rest(&factory, "eighth", 30),
            note(&factory, "G", "half", 0, 120, false),
        ],
    );
    let before = segment.total_div_count();
    rhythmic_spellcheck(&mut segment, &cursor).unwrap();
    assert_eq!(segment.total_div_count(), before);
    assert_eq!(before, 240);
}

#[test]
fn spellcheck_defers_without_known_divisions() {
    let factory = Factory::with_standard_models();
    let measure = MeasureContext::default();
    let line = LineContext::default();
    let glyphs = StandardGlyphs;
    let mut cursor = Cursor::new(
        SegmentOwner {
            kind: OwnerKind::Voice,
            id: 1,
        },
        VoiceContext { idx: 1 },
        &measure,
        &line,
        &factory,
        &glyphs,
        CursorOptions::default(),
    );
    cursor.part = "P1".to_string();
    cursor.ensure_staff(0, None, None, "P1");

    let mut segment = Segment::voice(
        1,
        "P1",
        vec![
            note(&factory, "E", "eighth", 0, 30, true),
            note(&factory, "E", "eighth", 0, 30, false),
        ],
    );
    let err = rhythmic_spellcheck(&mut segment, &cursor).unwrap_err();
    assert!(err.is_deferred());
    assert_eq!(segment.len(), 2, "a deferred pass must not touch the segment");
}

#[test]
fn spellcheck_defers_without_a_staff_context() {
    let factory = Factory::with_standard_models();
    let measure = MeasureContext::default();
    let line = LineContext::default();
    let glyphs = StandardGlyphs;
    // A freshly built cursor that has not touched any staff yet.
    let mut cursor = Cursor::new(
        SegmentOwner {
            kind: OwnerKind::Voice,
            id: 1,
        },
        VoiceContext { idx: 1 },
        &measure,
        &line,
        &factory,
        &glyphs,
        CursorOptions::default(),
    );
    cursor.part = "P1".to_string();

    let mut segment = Segment::voice(
        1,
        "P1",
        vec![
            note(&factory, "E", "eighth", 0, 30, true),
            note(&factory, "E", "eighth", 0, 30, false),
        ],
    );
    let err = rhythmic_spellcheck(&mut segment, &cursor).unwrap_err();
    assert!(err.is_deferred(), "expected a recoverable failure: {}", err);
    assert_eq!(segment.len(), 2, "a deferred pass must not touch the segment");
}
