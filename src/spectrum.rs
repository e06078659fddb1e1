//! Represent the collection of attributes and data that compose a single
//! EMSA/MSA spectrum.
//!
//! The format stores one spectrum per file: an ordered sequence of sample
//! values plus a linear calibration describing the abscissa. Everything the
//! header said about the measurement is retained twice, once verbatim under
//! the literal keyword names and once under canonical field names, so that a
//! spectrum read from a file can be written back without losing anything.

use crate::params::{ParamMap, ParamMapExt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The linear calibration of a spectrum's abscissa.
///
/// The data section of an `XY` layout file stores explicit abscissa values,
/// but they are redundant: the axis is always reconstructible as
/// `offset + scale * index`, which is what [`AxisDescription::value`]
/// computes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisDescription {
    /// The number of samples along the axis.
    pub size: usize,
    /// The position of the axis in the data array. The format only supports
    /// one-dimensional spectra, so this is always 0.
    pub index_in_array: usize,
    /// The quantity the axis measures, from the `XLABEL` keyword.
    pub name: String,
    /// The width of one channel, from the `XPERCHAN` keyword.
    pub scale: f64,
    /// The abscissa value of the first channel, from the `OFFSET` keyword.
    pub offset: f64,
    /// The unit the axis is expressed in, from the `XUNITS` keyword.
    pub units: String,
}

impl Default for AxisDescription {
    fn default() -> Self {
        Self {
            size: 0,
            index_in_array: 0,
            name: String::new(),
            scale: 1.0,
            offset: 0.0,
            units: String::new(),
        }
    }
}

impl AxisDescription {
    /// The abscissa value of channel `index`.
    pub fn value(&self, index: usize) -> f64 {
        self.offset + self.scale * index as f64
    }

    /// Iterate over the abscissa values of all `size` channels.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.size).map(|i| self.value(i))
    }
}

/// A single spectrum and the metadata that describes it.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spectrum {
    /// A short description of the measurement, from the `TITLE` keyword.
    pub title: String,
    /// The ordinate sample values.
    pub data: Vec<f64>,
    /// The abscissa calibration.
    pub axis: AxisDescription,
    /// Canonical measurement fields derived from recognized keywords,
    /// e.g. `beam_energy`, `time`, `date`.
    pub mapped_parameters: ParamMap,
    /// The header keywords exactly as they appeared in the file. A writer
    /// reuses these to reproduce the original header.
    pub original_parameters: ParamMap,
}

impl Spectrum {
    /// Create a spectrum from raw sample values and an axis calibration.
    /// The axis size is made to match the sample count.
    pub fn new(data: Vec<f64>, mut axis: AxisDescription) -> Self {
        axis.size = data.len();
        Self {
            data,
            axis,
            ..Default::default()
        }
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The beam energy in kV, when the header carried a `BEAMKV` keyword.
    pub fn beam_energy(&self) -> Option<f64> {
        self.mapped_parameters.get_number("beam_energy")
    }
}
