//! Band-model radiative transfer along slant paths

mod coefficients;
mod geometry;
mod integrator;
mod profile;
mod radiance;
mod scattering;
mod spectral;
mod standard_atmospheres;

#[cfg(test)]
mod tests;

use log::debug;

pub use self::coefficients::CoefficientTable;
pub use self::geometry::{resolve_path, PathGeometry, PathSegment, ResolvedPath, SolarLegs};
pub use self::integrator::{integrate, integrate_path, OpticalDepths, PathDepths, SolarDepths};
pub use self::profile::{
    load_profile, AtmosphericLayer, AtmosphericProfile, ProfileLevel, ProfileSource, Species,
};
pub use self::radiance::{
    per_micron, photon_radiance, planck, solar_irradiance, synthesize, RadianceMode,
    RadianceResult, RadianceWarning,
};
pub use self::spectral::SpectralGrid;
pub use self::standard_atmospheres::{ModelAtmosphere, MODEL_ATMOSPHERES};
use crate::config::RtmConfig;
use crate::error::RtmError;

/// Input parameters for the RTM that are constant across calls.
#[derive(Debug, Clone)]
pub struct RtmParameters<'a> {
    grid: SpectralGrid,
    table: &'a CoefficientTable,
    config: RtmConfig,
}

/// Inputs for the RTM for a single computation. Unlike [`RtmParameters`],
/// these vary from call to call.
#[derive(Debug, Clone)]
pub struct RtmInputs {
    profile: AtmosphericProfile,
    geometry: PathGeometry,
    mode: RadianceMode,
}

/// Outputs from the RTM, one value per spectral bin.
#[derive(Debug, Clone, PartialEq)]
pub struct RtmOutputs {
    /// Bin wavenumbers in cm⁻¹.
    pub wavenumber: Vec<f64>,
    /// Line-of-sight transmittance, in [0, 1].
    pub transmittance: Vec<f64>,
    /// Radiance in W cm⁻² sr⁻¹ (cm⁻¹)⁻¹.
    pub radiance: Vec<f64>,
    /// Total line-of-sight optical depth.
    pub optical_depth: Vec<f64>,
    /// Bins where the radiance was clamped.
    pub warnings: Vec<RadianceWarning>,
}

impl<'a> RtmParameters<'a> {
    /// Bundle the grid, table, and configuration.
    pub fn new(grid: SpectralGrid, table: &'a CoefficientTable, config: RtmConfig) -> Self {
        Self {
            grid,
            table,
            config,
        }
    }

    /// The spectral grid.
    pub fn grid(&self) -> &SpectralGrid {
        &self.grid
    }

    /// The configuration.
    pub fn config(&self) -> &RtmConfig {
        &self.config
    }

    /// The coefficient table.
    pub fn table(&self) -> &CoefficientTable {
        self.table
    }
}

impl RtmInputs {
    /// Check that the mode can be computed for the geometry.
    ///
    /// Scattered solar radiance needs to know where the sun is, so
    /// [`RadianceMode::Solar`] requires [`PathGeometry::SolarRadiance`].
    pub fn new(
        profile: AtmosphericProfile,
        geometry: PathGeometry,
        mode: RadianceMode,
    ) -> Result<Self, RtmError> {
        if mode == RadianceMode::Solar
            && !matches!(geometry, PathGeometry::SolarRadiance { .. })
        {
            return Err(RtmError::InconsistentInputs);
        }
        Ok(Self {
            profile,
            geometry,
            mode,
        })
    }

    /// The atmospheric profile.
    pub fn profile(&self) -> &AtmosphericProfile {
        &self.profile
    }

    /// Apply the RTM on the inputs for the given parameters.
    ///
    /// Spectral bins are evaluated in parallel on the current rayon pool; use
    /// [`thread_pool`] and `install` to control the number of threads.
    pub fn run(&self, parameters: &RtmParameters<'_>) -> Result<RtmOutputs, RtmError> {
        let RtmParameters {
            grid,
            table,
            config,
        } = parameters;

        let path = resolve_path(&self.profile, &self.geometry, config)?;
        debug!(
            "running {:?} radiance over {} bins, {} path segments",
            self.mode,
            grid.len(),
            path.line_of_sight.len()
        );

        let depths = integrate_path(&path, &self.profile, table, grid, config)?;
        let radiance = synthesize(&depths, &path, &self.profile, grid, self.mode, config);

        let los = &depths.line_of_sight;
        Ok(RtmOutputs {
            wavenumber: grid.wavenumbers(),
            transmittance: (0..grid.len()).map(|bin| los.transmittance(bin)).collect(),
            radiance: radiance.radiance,
            optical_depth: los.totals().to_vec(),
            warnings: radiance.warnings,
        })
    }
}

/// Build a worker pool with `num_threads` threads, or `None` to let rayon
/// choose.
pub fn thread_pool(num_threads: Option<usize>) -> Result<rayon::ThreadPool, RtmError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads.unwrap_or(0))
        .build()
        .map_err(|e| RtmError::ThreadPool(e.to_string()))
}

impl RtmOutputs {
    /// Number of spectral bins.
    pub fn len(&self) -> usize {
        self.wavenumber.len()
    }

    /// Whether there are no bins.
    pub fn is_empty(&self) -> bool {
        self.wavenumber.is_empty()
    }

    /// `(wavenumber, transmittance, radiance)` for each bin, in order.
    pub fn triples(&self) -> Vec<(f64, f64, f64)> {
        self.wavenumber
            .iter()
            .zip(&self.transmittance)
            .zip(&self.radiance)
            .map(|((&nu, &t), &l)| (nu, t, l))
            .collect()
    }
}
