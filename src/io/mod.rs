//! Reading and writing electron microscopy spectral data file formats and
//! abstractions over them.

pub mod msa;
mod utils;

pub use crate::io::msa::{
    is_msa, is_msa_path, read_msa, write_msa, write_msa_with_policy, MSADataType, MSAError,
    MSAReader, MSAWriter, DEFAULT_SEPARATOR, FILE_EXTENSIONS, MSA_FORMAT,
};

pub use crate::io::utils::{AlwaysOverwrite, NeverOverwrite, OverwritePolicy};
