//! Comparison of computed spectra against stored references.

use std::fmt;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::rtm::RtmOutputs;

/// Relative tolerance the reference scenarios are held to.
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// Which output a mismatch is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    /// Bin wavenumber
    Wavenumber,
    /// Transmittance
    Transmittance,
    /// Radiance
    Radiance,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Quantity::Wavenumber => "wavenumber",
            Quantity::Transmittance => "transmittance",
            Quantity::Radiance => "radiance",
        })
    }
}

/// Reference arrays for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSpectrum {
    /// Scenario the arrays belong to, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    /// Bin wavenumbers in cm⁻¹.
    pub wavenumber: Vec<f64>,
    /// Transmittance per bin.
    pub transmittance: Vec<f64>,
    /// Radiance per bin.
    pub radiance: Vec<f64>,
}

impl ReferenceSpectrum {
    /// Parse a reference from JSON, checking the arrays line up.
    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        let reference: Self = serde_json::from_str(json)?;
        let n = reference.wavenumber.len();
        if reference.transmittance.len() != n || reference.radiance.len() != n {
            return Err(DataError::Malformed(format!(
                "reference arrays have lengths {}, {}, {}",
                n,
                reference.transmittance.len(),
                reference.radiance.len()
            )));
        }
        Ok(reference)
    }

    /// Read a reference JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        info!("loading reference spectrum from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Capture computed outputs as a reference.
    pub fn from_outputs(scenario: Option<&str>, outputs: &RtmOutputs) -> Self {
        Self {
            scenario: scenario.map(str::to_owned),
            wavenumber: outputs.wavenumber.clone(),
            transmittance: outputs.transmittance.clone(),
            radiance: outputs.radiance.clone(),
        }
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, DataError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One bin that fell outside tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinMismatch {
    /// Which output
    pub quantity: Quantity,
    /// Bin index
    pub bin: usize,
    /// Reference wavenumber of the bin
    pub wavenumber: f64,
    /// Reference value
    pub expected: f64,
    /// Computed value
    pub actual: f64,
}

/// Outcome of [`compare`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// Tolerance the comparison used.
    pub tolerance: f64,
    /// Number of bins in the reference and in the computed output.
    pub bin_counts: (usize, usize),
    /// Every bin outside tolerance.
    pub mismatches: Vec<BinMismatch>,
}

impl ValidationReport {
    /// True when the bin counts agree and nothing is out of tolerance.
    pub fn passed(&self) -> bool {
        self.bin_counts.0 == self.bin_counts.1 && self.mismatches.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (expected, actual) = self.bin_counts;
        if expected != actual {
            writeln!(f, "expected {expected} bins, got {actual}")?;
        }
        if self.passed() {
            return write!(f, "all {expected} bins within {:e}", self.tolerance);
        }
        writeln!(
            f,
            "{} values outside tolerance {:e}:",
            self.mismatches.len(),
            self.tolerance
        )?;
        for m in &self.mismatches {
            writeln!(
                f,
                "  {} bin {} ({} cm⁻¹): expected {:e}, got {:e}",
                m.quantity, m.bin, m.wavenumber, m.expected, m.actual
            )?;
        }
        Ok(())
    }
}

/// Whether `actual` is within `tolerance` of `expected`: relative error,
/// or absolute error when `expected` is too small to divide by.
fn within(expected: f64, actual: f64, tolerance: f64) -> bool {
    let error = (actual - expected).abs();
    let scale = expected.abs();
    if scale < f64::from(f32::MIN_POSITIVE) {
        error <= tolerance
    } else {
        error / scale <= tolerance
    }
}

/// Compare computed outputs against a reference, bin by bin.
pub fn compare(
    expected: &ReferenceSpectrum,
    actual: &RtmOutputs,
    tolerance: f64,
) -> ValidationReport {
    let bin_counts = (expected.wavenumber.len(), actual.len());
    let quantities = [
        (Quantity::Wavenumber, &expected.wavenumber, &actual.wavenumber),
        (
            Quantity::Transmittance,
            &expected.transmittance,
            &actual.transmittance,
        ),
        (Quantity::Radiance, &expected.radiance, &actual.radiance),
    ];

    let mut mismatches = Vec::new();
    for (quantity, expected_values, actual_values) in quantities {
        for (bin, (&e, &a)) in expected_values.iter().zip(actual_values).enumerate() {
            if !within(e, a, tolerance) {
                mismatches.push(BinMismatch {
                    quantity,
                    bin,
                    wavenumber: expected.wavenumber[bin],
                    expected: e,
                    actual: a,
                });
            }
        }
    }

    let report = ValidationReport {
        tolerance,
        bin_counts,
        mismatches,
    };
    if report.passed() {
        info!("{report}");
    } else {
        warn!("{report}");
    }
    report
}
