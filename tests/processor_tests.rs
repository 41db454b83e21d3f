//! Measure processor tests: validation and layout passes, staff/voice
//! interleaving, deferred resolution, and cross-voice alignment.

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use serde_json::json;

use engravelib::{
    layout_measure, validate_measure, Attributes, Clef, EngineError, Factory, Key, LineContext,
    MeasureContext, Model, ModelKind, ProcessOptions, Segment, StandardGlyphs, TimeSignature,
};

fn attrs60() -> Attributes {
    Attributes {
        divisions: 60,
        key: Key::default(),
        time: TimeSignature::default(),
        clefs: vec![Clef::default()],
        staves: 1,
    }
}

fn measure_at_100() -> MeasureContext {
    MeasureContext {
        number: "1".to_string(),
        x: 100.0,
        ..Default::default()
    }
}

fn attributes_model(factory: &Factory) -> Model {
    factory
        .create(ModelKind::Attributes, Some(&json!({ "divisions": 60 })))
        .unwrap()
}

fn quarter(factory: &Factory, step: &str, div: i32, accidental: Option<i32>) -> Model {
    factory
        .create(
            ModelKind::Chord,
            Some(&json!({
                "notes": [{
                    "pitch": { "step": step, "octave": 4 },
                    "value": "quarter",
                    "accidental": accidental
                }],
                "div_count": div
            })),
        )
        .unwrap()
}

fn count_render_class(elements: &[Vec<engravelib::Layout>], kind: ModelKind) -> usize {
    elements
        .iter()
        .flatten()
        .filter(|l| l.render_class == kind)
        .count()
}

#[test]
fn rejects_an_empty_segment_list() {
    let factory = Factory::with_standard_models();
    let err = layout_measure(
        &mut [],
        &measure_at_100(),
        &LineContext::default(),
        &BTreeMap::new(),
        &factory,
        None,
        &StandardGlyphs,
        ProcessOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::Invariant(_)), "got {}", err);
}

#[test]
fn rejects_duplicate_owners() {
    let factory = Factory::with_standard_models();
    let mut segments = [
        Segment::voice(1, "P1", vec![quarter(&factory, "C", 60, None)]),
        Segment::voice(1, "P1", vec![quarter(&factory, "D", 60, None)]),
    ];
    let err = layout_measure(
        &mut segments,
        &measure_at_100(),
        &LineContext::default(),
        &BTreeMap::new(),
        &factory,
        Some(attrs60()),
        &StandardGlyphs,
        ProcessOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::Invariant(_)), "got {}", err);
}

#[test]
fn validation_fills_division_counts_and_produces_no_layouts() {
    let factory = Factory::with_standard_models();
    let unsized_chord = factory
        .create(
            ModelKind::Chord,
            Some(&json!({
                "notes": [{ "pitch": { "step": "C", "octave": 4 }, "value": "quarter" }]
            })),
        )
        .unwrap();
    assert_eq!(unsized_chord.div_count, 0);

    let mut segments = [Segment::voice(
        1,
        "P1",
        vec![attributes_model(&factory), unsized_chord],
    )];
    let result = validate_measure(
        &mut segments,
        &measure_at_100(),
        &LineContext::default(),
        &BTreeMap::new(),
        &factory,
        None,
        &StandardGlyphs,
        ProcessOptions::default(),
    )
    .unwrap();

    assert!(result.elements.iter().all(|c| c.is_empty()));
    assert_eq!(segments[0].models[1].div_count, 60);
}

#[test]
fn deferred_models_resolve_once_the_measure_supplies_divisions() {
    let factory = Factory::with_standard_models();
    // The chord precedes the attributes that define its resolution; the
    // first sweep defers it, the retry completes it.
    let unsized_chord = factory
        .create(
            ModelKind::Chord,
            Some(&json!({
                "notes": [{ "pitch": { "step": "C", "octave": 4 }, "value": "quarter" }]
            })),
        )
        .unwrap();
    let mut segments = [Segment::voice(
        1,
        "P1",
        vec![unsized_chord, attributes_model(&factory)],
    )];
    validate_measure(
        &mut segments,
        &measure_at_100(),
        &LineContext::default(),
        &BTreeMap::new(),
        &factory,
        None,
        &StandardGlyphs,
        ProcessOptions::default(),
    )
    .unwrap();

    assert_eq!(segments[0].models[0].div_count, 60);
}

#[test]
fn lays_out_a_single_voice() {
    let factory = Factory::with_standard_models();
    let measure = measure_at_100();
    let line = LineContext::default();
    let mut segments = [Segment::voice(
        1,
        "P1",
        vec![
            attributes_model(&factory),
            quarter(&factory, "C", 0, None),
            quarter(&factory, "D", 0, None),
            quarter(&factory, "E", 0, None),
            quarter(&factory, "F", 0, None),
        ],
    )];

    validate_measure(
        &mut segments,
        &measure,
        &line,
        &BTreeMap::new(),
        &factory,
        None,
        &StandardGlyphs,
        ProcessOptions::default(),
    )
    .unwrap();
    let result = layout_measure(
        &mut segments,
        &measure,
        &line,
        &BTreeMap::new(),
        &factory,
        None,
        &StandardGlyphs,
        ProcessOptions::default(),
    )
    .unwrap();

    assert_eq!(result.elements.len(), 1);
    let voice = &result.elements[0];
    assert_eq!(voice.len(), 5);
    assert_eq!(voice[0].x, 100.0);
    for pair in voice.windows(2) {
        assert!(pair[0].x < pair[1].x, "positions must advance");
        assert!(pair[0].division <= pair[1].division);
    }
    assert!(result.width > 0.0);
    assert_eq!(result.attributes.unwrap().divisions, 60);
}

#[test]
fn staff_content_is_processed_exactly_once_across_voices() {
    let factory = Factory::with_standard_models();
    let measure = measure_at_100();
    let line = LineContext::default();
    let barline = factory.create(ModelKind::Barline, None).unwrap();

    let mut segments = [
        Segment::staff(0, "P1", vec![attributes_model(&factory), barline]),
        Segment::voice(
            1,
            "P1",
            vec![
                quarter(&factory, "C", 60, None),
                quarter(&factory, "D", 60, None),
            ],
        ),
        Segment::voice(
            2,
            "P1",
            vec![
                quarter(&factory, "E", 60, None),
                quarter(&factory, "F", 60, None),
            ],
        ),
    ];
    let result = layout_measure(
        &mut segments,
        &measure,
        &line,
        &BTreeMap::new(),
        &factory,
        Some(attrs60()),
        &StandardGlyphs,
        ProcessOptions::default(),
    )
    .unwrap();

    // Two voice collections plus one for the shared staff.
    assert_eq!(result.elements.len(), 3);
    assert_eq!(result.elements[2].len(), 2);
    assert_eq!(count_render_class(&result.elements, ModelKind::Attributes), 1);
    assert_eq!(count_render_class(&result.elements, ModelKind::Barline), 1);
    assert_eq!(count_render_class(&result.elements, ModelKind::Chord), 4);
    assert_eq!(result.attributes.unwrap().divisions, 60);
}

#[test]
fn voices_align_at_shared_divisions() {
    let factory = Factory::with_standard_models();
    let measure = measure_at_100();
    let line = LineContext::default();
    // The first voice's opening chord is wider (it carries an
    // accidental), so its second beat lands further right; the merge
    // pass pushes the other voice's second beat out to match.
    let mut segments = [
        Segment::voice(
            1,
            "P1",
            vec![
                quarter(&factory, "C", 60, Some(1)),
                quarter(&factory, "D", 60, None),
            ],
        ),
        Segment::voice(
            2,
            "P1",
            vec![
                quarter(&factory, "C", 60, None),
                quarter(&factory, "D", 60, None),
            ],
        ),
    ];
    let result = layout_measure(
        &mut segments,
        &measure,
        &line,
        &BTreeMap::new(),
        &factory,
        Some(attrs60()),
        &StandardGlyphs,
        ProcessOptions::default(),
    )
    .unwrap();

    let first = &result.elements[0];
    let second = &result.elements[1];
    assert_eq!(first[0].x, second[0].x);
    assert_eq!(first[1].x, second[1].x);
    assert!(first[1].x > first[0].x);
}

#[test]
fn no_align_skips_the_merge_pass() {
    let factory = Factory::with_standard_models();
    let measure = measure_at_100();
    let line = LineContext::default();
    let mut segments = [
        Segment::voice(
            1,
            "P1",
            vec![
                quarter(&factory, "C", 60, Some(1)),
                quarter(&factory, "D", 60, None),
            ],
        ),
        Segment::voice(
            2,
            "P1",
            vec![
                quarter(&factory, "C", 60, None),
                quarter(&factory, "D", 60, None),
            ],
        ),
    ];
    let result = layout_measure(
        &mut segments,
        &measure,
        &line,
        &BTreeMap::new(),
        &factory,
        Some(attrs60()),
        &StandardGlyphs,
        ProcessOptions {
            no_align: true,
            ..Default::default()
        },
    )
    .unwrap();

    let first = &result.elements[0];
    let second = &result.elements[1];
    assert!(
        first[1].x > second[1].x,
        "without alignment the wider voice stays wider"
    );
}

#[test]
fn harmony_requests_vertical_padding_without_consuming_width() {
    let factory = Factory::with_standard_models();
    let measure = measure_at_100();
    let line = LineContext::default();
    let harmony = factory.create(ModelKind::Harmony, None).unwrap();
    let mut segments = [Segment::voice(
        1,
        "P1",
        vec![harmony, quarter(&factory, "C", 60, None)],
    )];
    let result = layout_measure(
        &mut segments,
        &measure,
        &line,
        &BTreeMap::new(),
        &factory,
        Some(attrs60()),
        &StandardGlyphs,
        ProcessOptions::default(),
    )
    .unwrap();

    let voice = &result.elements[0];
    assert_eq!(voice[0].x, voice[1].x, "the symbol rides above the chord");
    assert!(result.padding_top > 0.0);
    assert_eq!(result.padding_bottom, 0.0);
}

#[test]
fn width_measures_from_the_measure_origin() {
    let factory = Factory::with_standard_models();
    let line = LineContext::default();

    let mut at_origin = [Segment::voice(1, "P1", vec![quarter(&factory, "C", 60, None)])];
    let origin = layout_measure(
        &mut at_origin,
        &MeasureContext::default(),
        &line,
        &BTreeMap::new(),
        &factory,
        Some(attrs60()),
        &StandardGlyphs,
        ProcessOptions::default(),
    )
    .unwrap();

    let mut shifted = [Segment::voice(1, "P1", vec![quarter(&factory, "C", 60, None)])];
    let offset = layout_measure(
        &mut shifted,
        &measure_at_100(),
        &line,
        &BTreeMap::new(),
        &factory,
        Some(attrs60()),
        &StandardGlyphs,
        ProcessOptions::default(),
    )
    .unwrap();

    assert_eq!(origin.width, offset.width);
    assert!(origin.width > 0.0);
}
