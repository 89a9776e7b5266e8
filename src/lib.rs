//! Simulation view for a seven-segment RGB LED clock.
//!
//! The clock exposes its current per-segment colors over HTTP. This crate
//! polls that vector, turns every raw LED color into a display style
//! (full-saturation hue + opacity), and applies it to an SVG schematic of
//! four digits by seven segments. The live schematic is served over HTTP.
//!
//! This module holds the shared domain types:
//! - Layout constants for the 4 x 7 segment face
//! - `SegmentAddress` (digit, segment) with its SVG class names
//! - `SegmentColor` (raw 24-bit LED color as sent by the clock)
//! - `Color` (8-bit RGB triple used for display)
//!
//! The pipeline itself lives in `color`, `svg`, `binder`, `driver`, and
//! the HTTP surface in `server`.

pub mod binder;
pub mod color;
pub mod driver;
pub mod error;
pub mod server;
pub mod svg;

pub use error::SimError;

use std::fmt;
use std::str::FromStr;

// ── Layout ─────────────────────────────────────────────────────────

/// Number of digit positions on the clock face.
pub const DIGIT_COUNT: u8 = 4;

/// Segments per digit (a through g).
pub const SEGMENTS_PER_DIGIT: u8 = 7;

/// Length of a full segment vector (digit-major).
pub const VECTOR_LEN: usize = DIGIT_COUNT as usize * SEGMENTS_PER_DIGIT as usize;

/// Segment letters by index.
pub const SEGMENT_LETTERS: [char; 7] = ['a', 'b', 'c', 'd', 'e', 'f', 'g'];

// ── Segment address ────────────────────────────────────────────────

/// One segment of one digit: digit in `0..4`, segment in `0..7`.
///
/// # Rust concept: private fields + validating constructors
/// The fields are private so an out-of-range address can never exist.
/// Everything downstream (class names, vector index) can then index
/// without checking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentAddress {
    digit: u8,
    segment: u8,
}

impl SegmentAddress {
    pub fn new(digit: u8, segment: u8) -> Option<Self> {
        (digit < DIGIT_COUNT && segment < SEGMENTS_PER_DIGIT).then_some(Self { digit, segment })
    }

    /// Address of entry `index` in a digit-major segment vector.
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= VECTOR_LEN {
            return None;
        }
        let per_digit = SEGMENTS_PER_DIGIT as usize;
        Some(Self {
            digit: (index / per_digit) as u8,
            segment: (index % per_digit) as u8,
        })
    }

    /// All 28 addresses in (digit, segment) order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..VECTOR_LEN).filter_map(Self::from_index)
    }

    pub fn digit(&self) -> u8 {
        self.digit
    }

    pub fn segment(&self) -> u8 {
        self.segment
    }

    pub fn letter(&self) -> char {
        SEGMENT_LETTERS[self.segment as usize]
    }

    /// Position in the digit-major vector.
    pub fn index(&self) -> usize {
        self.digit as usize * SEGMENTS_PER_DIGIT as usize + self.segment as usize
    }

    /// Digit class in the artwork. Digits are 1-based there.
    pub fn digit_class(&self) -> String {
        format!("dig-{}", self.digit + 1)
    }

    pub fn segment_class(&self) -> String {
        format!("seg-{}", self.letter())
    }
}

impl fmt::Display for SegmentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}.{}", self.digit_class(), self.segment_class())
    }
}

// ── Colors ─────────────────────────────────────────────────────────

/// 8-bit RGB triple as rendered in the schematic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Sum of the three channels (0..=765).
    pub fn channel_sum(&self) -> u16 {
        self.r as u16 + self.g as u16 + self.b as u16
    }

    pub fn max_channel(&self) -> u8 {
        self.r.max(self.g).max(self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

/// Raw LED color of one segment, as reported by the clock.
///
/// Always within `0..=0xFFFFFF`. Parsed from exactly six hex digits,
/// case-insensitive; surrounding whitespace is ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SegmentColor(u32);

impl SegmentColor {
    pub const OFF: Self = Self(0);

    pub fn new(value: u32) -> Option<Self> {
        (value <= 0xFF_FFFF).then_some(Self(value))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn rgb(&self) -> Color {
        Color::new((self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8)
    }
}

impl FromStr for SegmentColor {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim();
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SimError::MalformedColor(s.to_string()));
        }
        u32::from_str_radix(hex, 16)
            .map(Self)
            .map_err(|_| SimError::MalformedColor(s.to_string()))
    }
}

impl fmt::Display for SegmentColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x}", self.0)
    }
}

// ── Tests ──────────────────────────────────────────────────────────
