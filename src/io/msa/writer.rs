use std::fmt::Display;
use std::io::{self, prelude::*, BufWriter};

use crate::params::{ParamMap, ParamMapExt, ParamValue, DATE_FORMAT};
use crate::spectrum::Spectrum;

use super::{MSADataType, MSAError, MSA_FORMAT};

/// The default separator placed between the values of an encoded sample
/// line.
pub const DEFAULT_SEPARATOR: &str = ", ";

/// The version of the standard the writer produces.
const MSA_VERSION: &str = "1.0";

/// The `TITLE` keyword payload is capped by the standard.
const MAX_TITLE_LEN: usize = 64;

/**
Writes a [`Spectrum`] as an EMSA/MSA text file.

When the spectrum was itself read from an EMSA/MSA file, its retained
original parameters are reused as the base keyword set so that a
read-then-write cycle reproduces the source header. Otherwise a fresh
keyword set is synthesized from the spectrum's axis and metadata, and the
sample layout must be chosen explicitly.
*/
pub struct MSAWriter<W: io::Write> {
    pub handle: BufWriter<W>,
    separator: String,
}

impl<W: io::Write> MSAWriter<W> {
    pub fn new(file: W) -> MSAWriter<W> {
        Self::with_separator(file, DEFAULT_SEPARATOR)
    }

    pub fn with_separator<S: Into<String>>(file: W, separator: S) -> MSAWriter<W> {
        MSAWriter {
            handle: BufWriter::new(file),
            separator: separator.into(),
        }
    }

    pub fn into_inner(self) -> BufWriter<W> {
        self.handle
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.handle.flush()
    }

    /// Write `spectrum` from start to finish.
    ///
    /// `layout` overrides the sample layout; `None` defers to the
    /// `DATATYPE` recorded in the spectrum's original parameters.
    pub fn write(
        &mut self,
        spectrum: &Spectrum,
        layout: Option<MSADataType>,
    ) -> Result<(), MSAError> {
        let (mut keywords, layout) = assemble_keywords(spectrum, layout)?;

        // the structural sentinels are not data keywords
        keywords.shift_remove("SPECTRUM");
        keywords.shift_remove("ENDOFDATA");

        let format = keywords
            .shift_remove("FORMAT")
            .unwrap_or_else(|| ParamValue::from(MSA_FORMAT));
        let version = keywords
            .shift_remove("VERSION")
            .unwrap_or_else(|| ParamValue::from(MSA_VERSION));
        self.write_keyword("FORMAT", format)?;
        self.write_keyword("VERSION", version)?;
        for (key, value) in keywords.iter() {
            self.write_keyword(key, value)?;
        }
        self.write_keyword("SPECTRUM", "Spectral Data Starts Here")?;

        match layout {
            MSADataType::XY => {
                for (x, y) in spectrum.axis.iter().zip(spectrum.data.iter()) {
                    write!(
                        self.handle,
                        "{}{}{}\r\n",
                        format_general(x),
                        self.separator,
                        format_general(*y)
                    )?;
                }
            }
            MSADataType::Y => {
                for y in spectrum.data.iter() {
                    write!(self.handle, "{:.6}{}\r\n", y, self.separator)?;
                }
            }
        }

        // the closing sentinel does not get a line terminator
        write!(self.handle, "#{:<12}: End Of File", "ENDOFDATA")?;
        Ok(())
    }

    fn write_keyword<V: Display>(&mut self, key: &str, value: V) -> io::Result<()> {
        write!(self.handle, "#{:<12}: {}\r\n", key, value)
    }
}

/// Assemble the output keyword set and resolve the sample layout, then merge
/// in the keywords derived from the spectrum itself. A derived value
/// replaces what the base set carried unless the base has the keyword and
/// the derived value is blank.
fn assemble_keywords(
    spectrum: &Spectrum,
    layout: Option<MSADataType>,
) -> Result<(ParamMap, MSADataType), MSAError> {
    let (mut keywords, layout) =
        if spectrum.original_parameters.get_text("FORMAT") == Some(MSA_FORMAT) {
            keywords_from_original(&spectrum.original_parameters, layout)?
        } else {
            keywords_fresh(spectrum, layout)?
        };

    let title: String = spectrum.title.chars().take(MAX_TITLE_LEN).collect();
    let comment = format!(
        "File created by {} version {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
    let derived = [
        ("FORMAT", ParamValue::from(MSA_FORMAT)),
        ("VERSION", ParamValue::from(MSA_VERSION)),
        ("TITLE", ParamValue::from(title)),
        ("NPOINTS", ParamValue::from(spectrum.axis.size as f64)),
        ("NCOLUMNS", ParamValue::from(1.0)),
        ("DATATYPE", ParamValue::from(layout.as_str())),
        ("XPERCHAN", ParamValue::from(spectrum.axis.scale)),
        ("OFFSET", ParamValue::from(spectrum.axis.offset)),
        ("XLABEL", ParamValue::from(spectrum.axis.name.clone())),
        ("XUNITS", ParamValue::from(spectrum.axis.units.clone())),
        ("COMMENT", ParamValue::from(comment)),
    ];
    for (key, value) in derived {
        if !keywords.contains_key(key) || !value.is_blank() {
            keywords.insert(key.to_string(), value);
        }
    }
    Ok((keywords, layout))
}

/// The round-trip constructor: reuse the keyword set the spectrum was read
/// with, overriding `DATATYPE` when an explicit layout was requested.
fn keywords_from_original(
    original: &ParamMap,
    layout: Option<MSADataType>,
) -> Result<(ParamMap, MSADataType), MSAError> {
    let mut keywords = original.clone();
    let layout = match layout {
        Some(layout) => {
            keywords.insert(
                "DATATYPE".to_string(),
                ParamValue::from(layout.as_str()),
            );
            layout
        }
        None => match keywords.get_text("DATATYPE") {
            Some(value) => value.parse()?,
            None => return Err(MSAError::MissingLayout),
        },
    };
    Ok((keywords, layout))
}

/// The synthesis constructor for spectra that were never EMSA/MSA files.
/// There is no encodable default layout, so one must be chosen explicitly.
fn keywords_fresh(
    spectrum: &Spectrum,
    layout: Option<MSADataType>,
) -> Result<(ParamMap, MSADataType), MSAError> {
    let layout = layout.ok_or(MSAError::MissingLayout)?;
    let mut keywords = ParamMap::default();
    if let Some(ParamValue::Date(date)) = spectrum.mapped_parameters.get("date") {
        keywords.insert(
            "DATE".to_string(),
            ParamValue::Text(date.format(DATE_FORMAT).to_string()),
        );
    }
    Ok((keywords, layout))
}

/// Format a float the way C's `%g` does: at most six significant digits,
/// trailing zeros removed, exponential notation for very large or very
/// small magnitudes.
pub(crate) fn format_general(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let sci = format!("{:.5e}", value);
    let Some((mantissa, exponent)) = sci.split_once('e') else {
        // non-finite values have no exponent part
        return sci;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return sci;
    };
    if !(-4..6).contains(&exponent) {
        let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else {
        let fixed = format!("{:.*}", (5 - exponent) as usize, value);
        if fixed.contains('.') {
            fixed.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            fixed
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::spectrum::AxisDescription;

    fn write_to_string(spectrum: &Spectrum, layout: Option<MSADataType>) -> String {
        let mut writer = MSAWriter::new(Vec::new());
        writer.write(spectrum, layout).unwrap();
        String::from_utf8(writer.into_inner().into_inner().unwrap()).unwrap()
    }

    fn data_lines(output: &str) -> Vec<&str> {
        output
            .split("\r\n")
            .skip_while(|line| !line.starts_with("#SPECTRUM"))
            .skip(1)
            .take_while(|line| !line.starts_with("#ENDOFDATA"))
            .collect()
    }

    #[test]
    fn test_format_general() {
        assert_eq!(format_general(0.0), "0");
        assert_eq!(format_general(2.0), "2");
        assert_eq!(format_general(0.2), "0.2");
        assert_eq!(format_general(-2.5), "-2.5");
        assert_eq!(format_general(100000.0), "100000");
        assert_eq!(format_general(10000000.0), "1e+07");
        assert_eq!(format_general(0.0001), "0.0001");
        assert_eq!(format_general(0.00001), "1e-05");
        assert_eq!(format_general(123456.789), "123457");
        assert_eq!(format_general(1.5e-7), "1.5e-07");
    }

    #[test]
    fn test_y_layout_encoding() {
        let spectrum = Spectrum::new(vec![1.0, 2.0, 3.0], AxisDescription::default());
        let output = write_to_string(&spectrum, Some(MSADataType::Y));
        assert_eq!(
            data_lines(&output),
            vec!["1.000000, ", "2.000000, ", "3.000000, "]
        );
    }

    #[test]
    fn test_xy_layout_encoding() {
        let axis = AxisDescription {
            scale: 2.0,
            offset: 0.0,
            ..Default::default()
        };
        let spectrum = Spectrum::new(vec![5.0, 6.0], axis);
        let output = write_to_string(&spectrum, Some(MSADataType::XY));
        assert_eq!(data_lines(&output), vec!["0, 5", "2, 6"]);
    }

    #[test]
    fn test_header_framing() {
        let spectrum = Spectrum::new(vec![1.0], AxisDescription::default());
        let output = write_to_string(&spectrum, Some(MSADataType::Y));
        assert!(output.starts_with("#FORMAT      : EMSA/MAS Spectral Data File\r\n"));
        assert!(output.contains("#VERSION     : 1.0\r\n"));
        assert!(output.contains("#NPOINTS     : 1\r\n"));
        assert!(output.contains("#NCOLUMNS    : 1\r\n"));
        assert!(output.contains("#DATATYPE    : Y\r\n"));
        assert!(output.contains("#SPECTRUM    : Spectral Data Starts Here\r\n"));
        assert!(output.ends_with("#ENDOFDATA   : End Of File"));
    }

    #[test]
    fn test_custom_separator() {
        let spectrum = Spectrum::new(vec![7.0], AxisDescription::default());
        let mut writer = MSAWriter::with_separator(Vec::new(), "\t");
        writer.write(&spectrum, Some(MSADataType::Y)).unwrap();
        let output =
            String::from_utf8(writer.into_inner().into_inner().unwrap()).unwrap();
        assert_eq!(data_lines(&output), vec!["7.000000\t"]);
    }

    #[test]
    fn test_title_is_truncated() {
        let long_title = "x".repeat(100);
        let spectrum =
            Spectrum::new(vec![1.0], AxisDescription::default()).with_title(long_title);
        let output = write_to_string(&spectrum, Some(MSADataType::Y));
        assert!(output.contains(&format!("#TITLE       : {}\r\n", "x".repeat(64))));
    }

    #[test]
    fn test_fresh_spectrum_requires_layout() {
        let spectrum = Spectrum::new(vec![1.0], AxisDescription::default());
        let mut writer = MSAWriter::new(Vec::new());
        assert!(matches!(
            writer.write(&spectrum, None),
            Err(MSAError::MissingLayout)
        ));
    }

    #[test]
    fn test_original_layout_x_is_rejected() {
        let mut spectrum = Spectrum::new(vec![1.0], AxisDescription::default());
        spectrum
            .original_parameters
            .insert("FORMAT".to_string(), ParamValue::from(MSA_FORMAT));
        spectrum
            .original_parameters
            .insert("DATATYPE".to_string(), ParamValue::from("X"));
        let mut writer = MSAWriter::new(Vec::new());
        assert!(matches!(
            writer.write(&spectrum, None),
            Err(MSAError::UnsupportedDataType(_))
        ));
    }

    #[test]
    fn test_explicit_layout_overrides_original() {
        let mut spectrum = Spectrum::new(vec![4.0], AxisDescription::default());
        spectrum
            .original_parameters
            .insert("FORMAT".to_string(), ParamValue::from(MSA_FORMAT));
        spectrum
            .original_parameters
            .insert("DATATYPE".to_string(), ParamValue::from("XY"));
        let output = write_to_string(&spectrum, Some(MSADataType::Y));
        assert!(output.contains("#DATATYPE    : Y\r\n"));
        assert_eq!(data_lines(&output), vec!["4.000000, "]);
    }

    #[test]
    fn test_blank_derived_value_keeps_original() {
        // the spectrum's axis has no label, but the original header did
        let mut spectrum = Spectrum::new(vec![1.0], AxisDescription::default());
        spectrum
            .original_parameters
            .insert("FORMAT".to_string(), ParamValue::from(MSA_FORMAT));
        spectrum
            .original_parameters
            .insert("DATATYPE".to_string(), ParamValue::from("Y"));
        spectrum
            .original_parameters
            .insert("XLABEL".to_string(), ParamValue::from("Energy"));
        let output = write_to_string(&spectrum, None);
        assert!(output.contains("#XLABEL      : Energy\r\n"));
    }

    #[test]
    fn test_unrelated_original_keywords_survive() {
        let mut spectrum = Spectrum::new(vec![1.0], AxisDescription::default());
        spectrum
            .original_parameters
            .insert("FORMAT".to_string(), ParamValue::from(MSA_FORMAT));
        spectrum
            .original_parameters
            .insert("DATATYPE".to_string(), ParamValue::from("Y"));
        spectrum
            .original_parameters
            .insert("OWNER".to_string(), ParamValue::from("microscopy lab"));
        spectrum
            .original_parameters
            .insert("SPECTRUM".to_string(), ParamValue::from("should vanish"));
        let output = write_to_string(&spectrum, None);
        assert!(output.contains("#OWNER       : microscopy lab\r\n"));
        assert_eq!(
            output.matches("#SPECTRUM").count(),
            1,
            "only the sentinel line may mention SPECTRUM"
        );
    }

    #[test]
    fn test_fresh_spectrum_writes_mapped_date() {
        use chrono::NaiveDate;
        let mut spectrum = Spectrum::new(vec![1.0], AxisDescription::default());
        spectrum.mapped_parameters.insert(
            "date".to_string(),
            ParamValue::Date(NaiveDate::from_ymd_opt(2005, 6, 21).unwrap()),
        );
        let output = write_to_string(&spectrum, Some(MSADataType::Y));
        assert!(output.contains("#DATE        : 21-Jun-2005\r\n"));
    }
}
