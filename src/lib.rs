//! `msadata` reads and writes the EMSA/MSA plain-text interchange format
//! for electron microscopy spectral data, and provides a small data model
//! for the single spectrum such a file contains.
//!
//! ```no_run
//! use msadata::{read_msa, write_msa, MSADataType};
//!
//! # fn main() -> Result<(), msadata::MSAError> {
//! let spectrum = read_msa("spectrum.msa")?.remove(0);
//! println!("{} samples of {}", spectrum.len(), spectrum.title);
//! write_msa("copy.msa", &spectrum, Some(MSADataType::Y))?;
//! # Ok(())
//! # }
//! ```
pub mod io;
pub mod params;
pub mod spectrum;

pub use crate::io::msa::{read_msa, write_msa, MSADataType, MSAError, MSAReader, MSAWriter};
pub use crate::io::{AlwaysOverwrite, NeverOverwrite, OverwritePolicy};

pub use crate::params::{ParamMap, ParamValue};
pub use crate::spectrum::{AxisDescription, Spectrum};
