//! Read and write EMSA/MSA files, the plain-text interchange format for
//! electron microscopy spectral data.
//!
//! A file is a sequence of `#KEY : VALUE` header lines, a
//! `#SPECTRUM` sentinel, the numeric sample lines, and a final
//! `#ENDOFDATA` sentinel. Sample lines come in two layouts named by the
//! `DATATYPE` keyword: `XY` pairs an explicit abscissa with each ordinate,
//! `Y` packs one or more ordinates per line.
mod reader;
mod writer;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::warn;

use crate::io::utils::{AlwaysOverwrite, OverwritePolicy};
use crate::spectrum::Spectrum;

pub use reader::{MSAError, MSAParserState, MSAReader};
pub use writer::{MSAWriter, DEFAULT_SEPARATOR};

/// The canonical `FORMAT` keyword value identifying a compliant file.
pub const MSA_FORMAT: &str = "EMSA/MAS Spectral Data File";

/// The file extensions the format is commonly stored under.
pub const FILE_EXTENSIONS: &[&str] = &["msa", "ems", "mas", "emsa"];

/// The sample layout of the data section, named by the `DATATYPE` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MSADataType {
    /// One `<x><sep><y>` pair per line.
    XY,
    /// One or more ordinate values per line.
    Y,
}

impl MSADataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::XY => "XY",
            Self::Y => "Y",
        }
    }
}

impl FromStr for MSADataType {
    type Err = MSAError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "XY" => Ok(Self::XY),
            "Y" => Ok(Self::Y),
            _ => Err(MSAError::UnsupportedDataType(s.to_string())),
        }
    }
}

impl std::fmt::Display for MSADataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check if a buffer of file content looks like an EMSA/MSA file.
pub fn is_msa(buf: &[u8]) -> bool {
    let needle = MSA_FORMAT.as_bytes();
    buf.windows(needle.len()).any(|window| window == needle)
}

/// Check if a path carries one of the format's file extensions.
pub fn is_msa_path<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            FILE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Read the spectrum stored in the EMSA/MSA file at `path`.
///
/// The format holds exactly one spectrum per file, so the returned sequence
/// always has a single element on success.
pub fn read_msa<P: AsRef<Path>>(path: P) -> Result<Vec<Spectrum>, MSAError> {
    let mut reader = MSAReader::open_path(path)?;
    Ok(vec![reader.read_spectrum()?])
}

/// Write `spectrum` to `path`, replacing any existing file.
///
/// When `layout` is `None` the layout recorded in the spectrum's original
/// parameters is reused. Returns whether a file was written.
pub fn write_msa<P: AsRef<Path>>(
    path: P,
    spectrum: &Spectrum,
    layout: Option<MSADataType>,
) -> Result<bool, MSAError> {
    write_msa_with_policy(path, spectrum, layout, DEFAULT_SEPARATOR, &mut AlwaysOverwrite)
}

/// Write `spectrum` to `path`, consulting `policy` before replacing an
/// existing file.
///
/// When the policy declines, nothing is written and `Ok(false)` is returned.
pub fn write_msa_with_policy<P: AsRef<Path>, O: OverwritePolicy>(
    path: P,
    spectrum: &Spectrum,
    layout: Option<MSADataType>,
    separator: &str,
    policy: &mut O,
) -> Result<bool, MSAError> {
    let path = path.as_ref();
    if path.exists() && !policy.confirm_overwrite(path) {
        warn!("Overwriting {} was declined, no file written", path.display());
        return Ok(false);
    }
    let mut writer = MSAWriter::with_separator(fs::File::create(path)?, separator);
    writer.write(spectrum, layout)?;
    writer.flush()?;
    Ok(true)
}
