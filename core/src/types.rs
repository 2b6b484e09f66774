use crate::errors::{CoreError, Result};
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Sentinel for an open upper bound of a repetition, gap or n-gram range.
pub const UNLIMITED: u32 = u32::MAX;

/// Add two maximum values, taking [`UNLIMITED`] into account.
pub fn add_max(a: u32, b: u32) -> u32 {
    if a == UNLIMITED || b == UNLIMITED {
        UNLIMITED
    } else {
        a.saturating_add(b).min(UNLIMITED - 1)
    }
}

/// Multiply two maximum values, taking [`UNLIMITED`] into account.
pub fn mul_max(a: u32, b: u32) -> u32 {
    if a == 0 || b == 0 {
        0
    } else if a == UNLIMITED || b == UNLIMITED {
        UNLIMITED
    } else {
        a.saturating_mul(b).min(UNLIMITED - 1)
    }
}

fn parse_code<T: FromStr>(kind: &'static str, code: &str) -> Result<T> {
    T::from_str(code).map_err(|_| CoreError::UnknownCode {
        kind,
        code: code.to_string(),
    })
}

/// Whether matching is case and/or diacritics sensitive.
#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumString,
    IntoStaticStr,
    Display,
    EnumIter,
)]
pub enum MatchSensitivity {
    #[strum(serialize = "s")]
    #[serde(rename = "s")]
    Sensitive,
    #[strum(serialize = "i")]
    #[serde(rename = "i")]
    Insensitive,
    #[strum(serialize = "ci")]
    #[serde(rename = "ci")]
    CaseInsensitive,
    #[strum(serialize = "di")]
    #[serde(rename = "di")]
    DiacriticsInsensitive,
}

impl MatchSensitivity {
    pub fn from_code(code: &str) -> Result<Self> {
        parse_code("match sensitivity", code)
    }

    pub fn code(self) -> &'static str {
        self.into()
    }

    pub fn from_flags(case_sensitive: bool, diacritics_sensitive: bool) -> Self {
        match (case_sensitive, diacritics_sensitive) {
            (true, true) => MatchSensitivity::Sensitive,
            (false, false) => MatchSensitivity::Insensitive,
            (false, true) => MatchSensitivity::CaseInsensitive,
            (true, false) => MatchSensitivity::DiacriticsInsensitive,
        }
    }

    pub fn is_case_sensitive(self) -> bool {
        matches!(
            self,
            MatchSensitivity::Sensitive | MatchSensitivity::DiacriticsInsensitive
        )
    }

    pub fn is_diacritics_sensitive(self) -> bool {
        matches!(
            self,
            MatchSensitivity::Sensitive | MatchSensitivity::CaseInsensitive
        )
    }

    /// Convert a value to the form it has in the index for this sensitivity.
    pub fn desensitize(self, value: &str) -> String {
        let stripped: String = if self.is_diacritics_sensitive() {
            value.to_string()
        } else {
            value.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
        };
        if self.is_case_sensitive() {
            stripped
        } else {
            stripped.to_lowercase()
        }
    }
}

/// Which relations to find, based on the relative position of source and target.
#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumString,
    IntoStaticStr,
    Display,
    EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RelationDirection {
    /// Only relations without a source
    Root,
    /// Only relations where the target occurs after the source
    Forward,
    /// Only relations where the target occurs before the source
    Backward,
    #[strum(serialize = "both")]
    #[serde(rename = "both")]
    Both,
}

impl RelationDirection {
    pub fn from_code(code: &str) -> Result<Self> {
        parse_code("relation direction", code)
    }

    pub fn code(self) -> &'static str {
        self.into()
    }
}

impl Default for RelationDirection {
    fn default() -> Self {
        RelationDirection::Both
    }
}

/// The span a relation match produces.
#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumString,
    IntoStaticStr,
    Display,
    EnumIter,
)]
pub enum SpanMode {
    #[strum(serialize = "source")]
    #[serde(rename = "source")]
    Source,
    #[strum(serialize = "target")]
    #[serde(rename = "target")]
    Target,
    /// A span covering both source and target
    #[strum(serialize = "full")]
    #[serde(rename = "full")]
    FullSpan,
    /// A span covering source and target of all matched relations
    #[strum(serialize = "all")]
    #[serde(rename = "all")]
    AllSpans,
}

impl SpanMode {
    pub fn from_code(code: &str) -> Result<Self> {
        parse_code("span mode", code)
    }

    pub fn code(self) -> &'static str {
        self.into()
    }
}

impl Default for SpanMode {
    fn default() -> Self {
        SpanMode::Source
    }
}

/// Positional relation between producer and filter spans.
#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumString,
    IntoStaticStr,
    Display,
    EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PositionOperation {
    /// Producer span contains filter span
    Containing,
    /// Producer span is contained in filter span
    Within,
    /// Producer span starts where filter span starts
    StartsAt,
    /// Producer span ends where filter span ends
    EndsAt,
    /// Producer span and filter span are identical
    Matches,
    /// Producer span contains filter span at its start
    ContainingAtStart,
    /// Producer span contains filter span at its end
    ContainingAtEnd,
}

impl PositionOperation {
    pub fn from_code(code: &str) -> Result<Self> {
        parse_code("position filter operation", code)
    }

    pub fn code(self) -> &'static str {
        self.into()
    }

    /// Check if a producer span `(p_start, p_end)` stands in this relation to
    /// a filter span `(f_start, f_end)`.
    pub fn holds(self, producer: (u32, u32), filter: (u32, u32)) -> bool {
        let (p_start, p_end) = producer;
        let (f_start, f_end) = filter;
        match self {
            PositionOperation::Containing => p_start <= f_start && f_end <= p_end,
            PositionOperation::Within => f_start <= p_start && p_end <= f_end,
            PositionOperation::StartsAt => p_start == f_start,
            PositionOperation::EndsAt => p_end == f_end,
            PositionOperation::Matches => p_start == f_start && p_end == f_end,
            PositionOperation::ContainingAtStart => {
                p_start == f_start && f_end <= p_end
            }
            PositionOperation::ContainingAtEnd => p_end == f_end && p_start <= f_start,
        }
    }
}

#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumString,
    IntoStaticStr,
    Display,
    EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExpansionDirection {
    Left,
    Right,
}

impl ExpansionDirection {
    pub fn from_code(code: &str) -> Result<Self> {
        parse_code("expansion direction", code)
    }

    pub fn code(self) -> &'static str {
        self.into()
    }
}

/// Which part of a markup span to match.
#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumString,
    IntoStaticStr,
    Display,
    EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TagAdjust {
    FullTag,
    LeadingEdge,
    TrailingEdge,
}

impl TagAdjust {
    pub fn from_code(code: &str) -> Result<Self> {
        parse_code("tag adjustment", code)
    }

    pub fn code(self) -> &'static str {
        self.into()
    }
}

impl Default for TagAdjust {
    fn default() -> Self {
        TagAdjust::FullTag
    }
}
