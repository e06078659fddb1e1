//! Keyword vocabulary and typed parameter values for the EMSA/MSA format.
//!
//! An EMSA/MSA header is a sequence of `#KEY : VALUE` lines. The standard
//! defines a fixed vocabulary of keywords, each with a declared value type,
//! and a few of them correspond to canonical, format-independent measurement
//! fields. [`KEYWORDS`] is that vocabulary; [`ParamValue`] is the typed value
//! a keyword's payload is coerced to.

use std::fmt::{self, Display};

use chrono::{NaiveDate, NaiveTime};
use indexmap::IndexMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The `strftime`-style pattern for the `DATE` keyword, e.g. `21-Jun-2005`.
/// The month abbreviations are the fixed English ones, independent of any
/// process locale.
pub const DATE_FORMAT: &str = "%d-%b-%Y";

/// The pattern for the `TIME` keyword, a 24-hour `HH:MM` value.
pub const TIME_FORMAT: &str = "%H:%M";

/// The concrete type a keyword's payload is coerced to when the keyword is
/// part of [`KEYWORDS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordDtype {
    Text,
    Number,
}

/// A single entry of the EMSA/MSA keyword vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct KeywordDef {
    /// The keyword as it appears in the file, without any unit suffix.
    pub name: &'static str,
    /// How the keyword's payload is typed.
    pub dtype: KeywordDtype,
    /// The canonical measurement field the value is copied into, if any.
    pub mapped_to: Option<&'static str>,
}

impl KeywordDef {
    const fn text(name: &'static str) -> Self {
        Self {
            name,
            dtype: KeywordDtype::Text,
            mapped_to: None,
        }
    }

    const fn number(name: &'static str) -> Self {
        Self {
            name,
            dtype: KeywordDtype::Number,
            mapped_to: None,
        }
    }

    const fn number_mapped(name: &'static str, mapped_to: &'static str) -> Self {
        Self {
            name,
            dtype: KeywordDtype::Number,
            mapped_to: Some(mapped_to),
        }
    }
}

/// The EMSA/MSA keyword vocabulary.
pub const KEYWORDS: &[KeywordDef] = &[
    // Required parameters
    KeywordDef::text("FORMAT"),
    KeywordDef::text("VERSION"),
    KeywordDef::text("TITLE"),
    KeywordDef::text("DATE"),
    KeywordDef::text("TIME"),
    KeywordDef::text("OWNER"),
    KeywordDef::number("NPOINTS"),
    KeywordDef::number("NCOLUMNS"),
    KeywordDef::text("DATATYPE"),
    KeywordDef::number("XPERCHAN"),
    KeywordDef::number("OFFSET"),
    // Spectrum characteristics
    KeywordDef::text("SIGNALTYPE"),
    KeywordDef::text("XLABEL"),
    KeywordDef::text("YLABEL"),
    KeywordDef::text("XUNITS"),
    KeywordDef::text("YUNITS"),
    KeywordDef::number("CHOFFSET"),
    KeywordDef::text("COMMENT"),
    // Microscope
    KeywordDef::number_mapped("BEAMKV", "beam_energy"),
    KeywordDef::number("EMISSION"),
    KeywordDef::number("PROBECUR"),
    KeywordDef::number("BEAMDIAM"),
    KeywordDef::number("MAGCAM"),
    KeywordDef::text("OPERMODE"),
    KeywordDef::number("CONVANGLE"),
    // Specimen
    KeywordDef::number("THICKNESS"),
    KeywordDef::number("XTILTSTGE"),
    KeywordDef::number("YTILTSTGE"),
    KeywordDef::number("XPOSITION"),
    KeywordDef::number("YPOSITION"),
    KeywordDef::number("ZPOSITION"),
    // EELS
    KeywordDef::number("INTEGTIME"),
    KeywordDef::number("DWELLTIME"),
    KeywordDef::number("COLLANGLE"),
    KeywordDef::text("ELSDET"),
    // EDS
    KeywordDef::number("ELEVANGLE"),
    KeywordDef::number("AZIMANGLE"),
    KeywordDef::number("SOLIDANGLE"),
    KeywordDef::number("LIVETIME"),
    KeywordDef::number("REALTIME"),
    KeywordDef::number("TBEWIND"),
    KeywordDef::number("TAUWIND"),
    KeywordDef::number("TDEADLYR"),
    KeywordDef::number("TACTLYR"),
    KeywordDef::number("TALWIND"),
    KeywordDef::number("TPYWIND"),
    KeywordDef::number("TBNWIND"),
    KeywordDef::number("TDIWIND"),
    KeywordDef::number("THCWIND"),
    KeywordDef::text("EDSDET"),
];

/// Look up a keyword in [`KEYWORDS`]. The match is case-sensitive and exact,
/// so any unit suffix must be removed first with [`split_unit`].
pub fn keyword_def(name: &str) -> Option<&'static KeywordDef> {
    KEYWORDS.iter().find(|k| k.name == name)
}

/// Split a possibly unit-suffixed keyword into the clean keyword and the
/// unit token, e.g. `AZIMANGLE-dg` into `("AZIMANGLE", Some("dg"))`.
pub fn split_unit(key: &str) -> (&str, Option<&str>) {
    match key.split_once('-') {
        Some((clean, units)) => (clean.trim(), Some(units.trim())),
        None => (key, None),
    }
}

/// A typed parameter value.
///
/// Header keyword maps only ever hold [`Text`](ParamValue::Text) and
/// [`Number`](ParamValue::Number) values; the [`Date`](ParamValue::Date) and
/// [`Time`](ParamValue::Time) variants appear in the canonical mapped
/// parameters once the `DATE`/`TIME` keywords have been interpreted.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParamValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl ParamValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Whether the value serializes to an empty string. Only text values can
    /// be blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(value) => value.trim().is_empty(),
            _ => false,
        }
    }
}

/// Renders the value the way it is written into a file header.
impl Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::Number(value) => write!(f, "{}", value),
            Self::Date(value) => write!(f, "{}", value.format(DATE_FORMAT)),
            Self::Time(value) => write!(f, "{}", value.format(TIME_FORMAT)),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<NaiveDate> for ParamValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveTime> for ParamValue {
    fn from(value: NaiveTime) -> Self {
        Self::Time(value)
    }
}

/// An insertion-ordered keyword (or canonical field) to value mapping.
///
/// Iteration order is the order entries were first inserted in, so a map
/// populated from a file preserves the file's keyword order.
pub type ParamMap = IndexMap<String, ParamValue>;

/// Typed convenience accessors over a [`ParamMap`].
pub trait ParamMapExt {
    fn get_text(&self, key: &str) -> Option<&str>;
    fn get_number(&self, key: &str) -> Option<f64>;
}

impl ParamMapExt for ParamMap {
    fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::as_text)
    }

    fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(ParamValue::as_number)
    }
}
