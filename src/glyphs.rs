//! Glyph metrics lookup and built-in engraving spacing constants
//! (all in engraving user units, ten units per staff space).
//!
//! The layout core never touches fonts.  Spacing calculations go through
//! the [`GlyphMetrics`] trait so that a renderer with real font metrics
//! can substitute measured widths; [`StandardGlyphs`] provides a fixed
//! table good enough for abstract layout.

// ── Attribute spacing ───────────────────────────────────────────────
pub(crate) const CLEF_PADDING: f64 = 8.0; // air after the clef
pub(crate) const KEY_SIG_PADDING: f64 = 6.0; // shown even for C major
pub(crate) const KEY_SIG_ACCIDENTAL_SPACE: f64 = 10.0;
pub(crate) const TIME_SIG_PADDING: f64 = 6.0;

// ── Note spacing ────────────────────────────────────────────────────
pub(crate) const PER_QUARTER_SPACING: f64 = 44.0; // horizontal room per quarter note
pub(crate) const CHORD_PADDING_ABOVE: f64 = 10.0; // ledger-line room above the staff
pub(crate) const CHORD_PADDING_BELOW: f64 = 10.0;

// ── Barlines ────────────────────────────────────────────────────────
pub(crate) const BARLINE_SEPARATION: f64 = 4.0; // gap between double-bar lines
pub(crate) const BARLINE_PADDING: f64 = 6.0;
pub(crate) const STAFF_HEIGHT: f64 = 40.0; // 5 lines, 4 spaces

// ── Harmony symbols ─────────────────────────────────────────────────
pub(crate) const HARMONY_PADDING_ABOVE: f64 = 18.0; // chord symbols sit above the staff
pub(crate) const HARMONY_CHAR_WIDTH: f64 = 7.0;

/// Width/height hints for engraving symbols, looked up by name.
///
/// Implementations must be shareable across measure workers.
pub trait GlyphMetrics: Send + Sync {
    /// Horizontal extent of the named glyph.
    fn width(&self, name: &str) -> f64;
    /// Vertical extent of the named glyph.
    fn height(&self, name: &str) -> f64;
}

/// Built-in metrics table with typical engraving proportions.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardGlyphs;

impl GlyphMetrics for StandardGlyphs {
    fn width(&self, name: &str) -> f64 {
        match name {
            "gClef" | "fClef" | "cClef" => 24.0,
            "timeSig" => 18.0,
            "noteheadBlack" | "noteheadHalf" => 11.0,
            "noteheadWhole" => 15.0,
            "accidentalSharp" | "accidentalFlat" | "accidentalNatural" => 8.0,
            "barlineThin" => 1.5,
            "barlineHeavy" => 5.0,
            "augmentationDot" => 4.0,
            _ => 10.0,
        }
    }

    fn height(&self, name: &str) -> f64 {
        match name {
            "gClef" => 70.0,
            "fClef" | "cClef" => 40.0,
            "timeSig" => STAFF_HEIGHT,
            "noteheadBlack" | "noteheadHalf" | "noteheadWhole" => 10.0,
            "accidentalSharp" | "accidentalNatural" => 28.0,
            "accidentalFlat" => 24.0,
            "barlineThin" | "barlineHeavy" => STAFF_HEIGHT,
            _ => 10.0,
        }
    }
}
