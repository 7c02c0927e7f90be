//! Band-model atmospheric transmittance and radiance
//!
//! Given a layered atmosphere, a viewing geometry, and a spectral grid, this
//! crate computes per-wavenumber transmittance and radiance along the path.
//! Molecular absorption comes from a band-model coefficient table; molecular
//! and aerosol scattering are computed directly.
//!
//! The engine lives in [`rtm`]. [`scenario`] holds the named reference
//! scenarios and [`validation`] compares outputs against stored references.
//! With the `python` feature, a small `pyo3` module exposes the computation to
//! Python.
//!
//! ```no_run
//! use band_rtm::config::RtmConfig;
//! use band_rtm::rtm::CoefficientTable;
//! use band_rtm::scenario::Scenario;
//!
//! # fn main() -> Result<(), band_rtm::error::RtmError> {
//! let table = CoefficientTable::builtin()?;
//! let outputs = Scenario::obs2space().run(table, &RtmConfig::default())?;
//! for (wavenumber, transmittance, radiance) in outputs.triples() {
//!     println!("{wavenumber} {transmittance:.6} {radiance:.6e}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod rtm;
pub mod scenario;
pub mod validation;

#[cfg(feature = "python")]
mod python;

pub use config::RtmConfig;
pub use error::RtmError;
pub use rtm::{RtmInputs, RtmOutputs, RtmParameters};
