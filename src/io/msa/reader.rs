use std::{
    fs,
    io::{self, prelude::*},
    num::ParseFloatError,
    path::Path,
};

use chrono::{NaiveDate, NaiveTime};
use log::warn;
use thiserror::Error;

use crate::params::{
    keyword_def, split_unit, KeywordDtype, ParamMap, ParamMapExt, ParamValue, DATE_FORMAT,
    TIME_FORMAT,
};
use crate::spectrum::{AxisDescription, Spectrum};

use super::{MSADataType, MSA_FORMAT};

#[derive(Debug, Error)]
pub enum MSAError {
    #[error("Encountered a malformed header line: {0}")]
    MalformedHeaderLine(String),
    #[error("Encountered a malformed data line: {0}")]
    MalformedDataLine(String),
    #[error("Failed to parse {0:?} as a number: {1}")]
    InvalidNumber(String, #[source] ParseFloatError),
    #[error("Unsupported DATATYPE value: {0:?}")]
    UnsupportedDataType(String),
    #[error("No DATATYPE keyword found before the data section")]
    MissingDataType,
    #[error("A data layout must be given to write a spectrum without an existing EMSA keyword set")]
    MissingLayout,
    #[error("Encountered an IO error: {0}")]
    IOError(
        #[from]
        #[source]
        io::Error,
    ),
}

#[derive(Debug, Default)]
pub enum MSAParserState {
    #[default]
    Initial,
    Error(MSAError),
    EOF,
}

/**
A parser that reads EMSA/MSA files. These files contain a single spectrum,
so when iterating over the reader either one spectrum or none are returned,
none meaning there was an error during reading, retrievable from
[`MSAReader::error`].

Header keywords are collected up to the `#SPECTRUM` sentinel line,
recognized keywords are coerced to their declared types, and the data
section is decoded according to the `DATATYPE` keyword. The abscissa values
of an `XY` layout file are discarded: the axis is reconstructed from the
`XPERCHAN` and `OFFSET` calibration keywords instead.
*/
pub struct MSAReader<R: Read> {
    handle: io::BufReader<R>,
    state: MSAParserState,
}

const BUFFER_SIZE: usize = 8192;

impl<R: Read> MSAReader<R> {
    /// Create a new [`MSAReader`], wrapping the [`io::Read`] handle provided
    /// with an [`io::BufReader`].
    pub fn new(file: R) -> MSAReader<R> {
        Self::with_buffer_capacity(file, BUFFER_SIZE)
    }

    pub fn with_buffer_capacity(file: R, capacity: usize) -> MSAReader<R> {
        MSAReader {
            handle: io::BufReader::with_capacity(capacity, file),
            state: MSAParserState::Initial,
        }
    }

    /// Get the error if parsing failed.
    pub fn error(&self) -> Option<&MSAError> {
        match &self.state {
            MSAParserState::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Read the spectrum, consuming the stream.
    pub fn read_spectrum(&mut self) -> Result<Spectrum, MSAError> {
        let mut parameters = self.read_header()?;
        let y = self.read_data(&parameters)?;

        // The FORMAT value is rewritten so that a later write recognizes
        // the keyword set as a reusable EMSA header.
        parameters.insert(
            "FORMAT".to_string(),
            ParamValue::Text(MSA_FORMAT.to_string()),
        );

        let mut mapped = type_parameters(&mut parameters)?;
        read_time_and_date(&parameters, &mut mapped);

        if let Some(npoints) = parameters.get_number("NPOINTS") {
            if npoints != y.len() as f64 {
                warn!(
                    "NPOINTS is {} but the data section held {} values",
                    npoints,
                    y.len()
                );
            }
        }

        let axis = AxisDescription {
            size: y.len(),
            index_in_array: 0,
            name: parameters.get_text("XLABEL").unwrap_or("").to_string(),
            scale: parameters.get_number("XPERCHAN").unwrap_or(1.0),
            offset: parameters.get_number("OFFSET").unwrap_or(0.0),
            units: parameters.get_text("XUNITS").unwrap_or("").to_string(),
        };

        Ok(Spectrum {
            title: parameters.get_text("TITLE").unwrap_or("").to_string(),
            data: y,
            axis,
            mapped_parameters: mapped,
            original_parameters: parameters,
        })
    }

    /// Collect the raw header keywords, stopping at the `#SPECTRUM` sentinel.
    fn read_header(&mut self) -> Result<ParamMap, MSAError> {
        let mut parameters = ParamMap::default();
        let mut line = String::new();
        loop {
            line.clear();
            let z = self.handle.read_line(&mut line)?;
            if z == 0 {
                break;
            }
            if !line.starts_with('#') {
                continue;
            }
            // The value side keeps its own colons, only the first ": " is
            // the key separator.
            let Some((key, value)) = line.split_once(": ") else {
                return Err(MSAError::MalformedHeaderLine(line.trim_end().to_string()));
            };
            let key = key.trim_start_matches('#').trim();
            if key == "SPECTRUM" {
                break;
            }
            parameters.insert(key.to_string(), ParamValue::Text(value.trim().to_string()));
        }
        Ok(parameters)
    }

    /// Decode the data section according to the `DATATYPE` keyword.
    fn read_data(&mut self, parameters: &ParamMap) -> Result<Vec<f64>, MSAError> {
        let mut y = Vec::new();
        let mut datatype = None;
        let mut line = String::new();
        loop {
            line.clear();
            let z = self.handle.read_line(&mut line)?;
            if z == 0 {
                break;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let layout = match datatype {
                Some(layout) => layout,
                None => {
                    let layout = match parameters.get_text("DATATYPE") {
                        Some(value) => value.parse::<MSADataType>()?,
                        None => return Err(MSAError::MissingDataType),
                    };
                    datatype = Some(layout);
                    layout
                }
            };
            // Decimal commas double as separators, normalize them away
            let normalized = trimmed.replace(',', " ");
            match layout {
                MSADataType::XY => {
                    let ordinate = normalized.split_whitespace().nth(1).ok_or_else(|| {
                        MSAError::MalformedDataLine(trimmed.to_string())
                    })?;
                    y.push(parse_float(ordinate)?);
                }
                MSADataType::Y => {
                    for token in normalized.split_whitespace() {
                        y.push(parse_float(token)?);
                    }
                }
            }
        }
        Ok(y)
    }

    /// Read the spectrum directly. Used to implement iteration.
    pub fn read_next(&mut self) -> Option<Spectrum> {
        if matches!(self.state, MSAParserState::Initial) {
            match self.read_spectrum() {
                Ok(spectrum) => {
                    self.state = MSAParserState::EOF;
                    Some(spectrum)
                }
                Err(e) => {
                    self.state = MSAParserState::Error(e);
                    None
                }
            }
        } else {
            None
        }
    }
}

impl MSAReader<fs::File> {
    pub fn open_path<P: AsRef<Path>>(path: P) -> io::Result<MSAReader<fs::File>> {
        Ok(Self::new(fs::File::open(path)?))
    }
}

/// [`MSAReader`] instances are [`Iterator`]s over [`Spectrum`], yielding at
/// most one item.
impl<R: Read> Iterator for MSAReader<R> {
    type Item = Spectrum;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next()
    }
}

fn parse_float(token: &str) -> Result<f64, MSAError> {
    token
        .parse()
        .map_err(|e| MSAError::InvalidNumber(token.to_string(), e))
}

/// Coerce every recognized keyword to its declared type and derive the
/// canonical mapped fields, honoring unit suffixes like `AZIMANGLE-dg`.
fn type_parameters(parameters: &mut ParamMap) -> Result<ParamMap, MSAError> {
    let mut mapped = ParamMap::default();
    let keys: Vec<String> = parameters.keys().cloned().collect();
    for key in keys {
        let (clean, units) = split_unit(&key);
        let Some(def) = keyword_def(clean) else {
            continue;
        };
        let raw = match parameters.get(&key).and_then(ParamValue::as_text) {
            Some(raw) => raw.to_string(),
            None => continue,
        };
        let typed = match def.dtype {
            KeywordDtype::Text => ParamValue::Text(raw),
            KeywordDtype::Number => {
                ParamValue::Number(raw.parse().map_err(|e| MSAError::InvalidNumber(raw.clone(), e))?)
            }
        };
        if let Some(field) = def.mapped_to {
            mapped.insert(field.to_string(), typed.clone());
            if let Some(units) = units {
                mapped.insert(format!("{}_units", field), ParamValue::Text(units.to_string()));
            }
        }
        parameters.insert(key.clone(), typed);
    }
    Ok(mapped)
}

/// Interpret the `TIME` and `DATE` keywords. Both are best-effort: a value
/// that does not parse is reported and skipped without failing the read.
fn read_time_and_date(parameters: &ParamMap, mapped: &mut ParamMap) {
    if let Some(raw) = parameters.get_text("TIME") {
        match NaiveTime::parse_from_str(raw, TIME_FORMAT) {
            Ok(time) => {
                mapped.insert("time".to_string(), ParamValue::Time(time));
            }
            Err(e) => warn!("The time information could not be retrieved: {e}"),
        }
    }
    if let Some(raw) = parameters.get_text("DATE") {
        match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
            Ok(date) => {
                mapped.insert("date".to_string(), ParamValue::Date(date));
            }
            Err(e) => warn!("The date information could not be retrieved: {e}"),
        }
    }
}
