//! Run-time configuration for the RTM.
//!
//! Everything here has a default that reproduces the reference scenarios, so
//! most callers only use [`RtmConfig::default`]. A config can also be read
//! from JSON, where any missing field keeps its default.

use std::path::Path;

use serde::Deserialize;

use crate::error::DataError;

/// Highest scattering order the solar computation supports.
pub const MAX_SCATTERING_ORDER: u8 = 3;

/// What to do when a species in the profile has no usable coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSpecies {
    /// Fail the whole computation
    #[default]
    Abort,
    /// Drop that species' contribution and log a warning
    Ignore,
}

/// Boundary-layer aerosol model.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AerosolModel {
    /// No aerosol extinction
    #[default]
    None,
    /// Continental rural aerosol
    Rural {
        /// Surface meteorological range in km
        visibility_km: f32,
    },
    /// Maritime aerosol
    Maritime {
        /// Surface meteorological range in km
        visibility_km: f32,
    },
    /// Urban aerosol (rural mixed with soot)
    Urban {
        /// Surface meteorological range in km
        visibility_km: f32,
    },
}

impl AerosolModel {
    /// The rural model at the usual 23 km visibility.
    pub const fn rural_default() -> Self {
        AerosolModel::Rural {
            visibility_km: 23.0,
        }
    }
}

/// Configuration for a single RTM call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RtmConfig {
    /// Zenith angle in degrees (measured from the local vertical, folded to
    /// 0–90°) above which refracted ray tracing replaces the secant law.
    pub refraction_threshold_deg: f32,
    /// Number of scattering orders in solar mode (0 to 3).
    pub scattering_order: u8,
    /// Policy for species without coefficients.
    pub missing_species: MissingSpecies,
    /// Aerosol model applied on top of Rayleigh scattering.
    pub aerosol: AerosolModel,
    /// Lambertian surface albedo, also sets the emissivity to `1 - albedo`.
    pub surface_albedo: f32,
    /// Surface skin temperature in K. Defaults to the lowest layer.
    pub surface_temperature: Option<f32>,
    /// Add thermal emission to the solar-mode radiance.
    pub solar_includes_thermal: bool,
    /// Number of worker threads, or `None` to let rayon choose.
    pub num_threads: Option<usize>,
}

impl Default for RtmConfig {
    fn default() -> Self {
        Self {
            refraction_threshold_deg: 75.0,
            scattering_order: 1,
            missing_species: MissingSpecies::Abort,
            aerosol: AerosolModel::None,
            surface_albedo: 0.0,
            surface_temperature: None,
            solar_includes_thermal: false,
            num_threads: None,
        }
    }
}

impl RtmConfig {
    /// Parse a JSON configuration document.
    ///
    /// Values the builders would clamp are rejected here instead.
    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()
    }

    /// Read a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    fn validate(self) -> Result<Self, DataError> {
        let threshold = self.refraction_threshold_deg;
        if !(0.0..=90.0).contains(&threshold) {
            return Err(DataError::Malformed(format!(
                "refraction threshold {threshold}° is outside 0-90°"
            )));
        }
        if self.scattering_order > MAX_SCATTERING_ORDER {
            return Err(DataError::Malformed(format!(
                "scattering order {} is above {MAX_SCATTERING_ORDER}",
                self.scattering_order
            )));
        }
        if !(0.0..=1.0).contains(&self.surface_albedo) {
            return Err(DataError::Malformed(format!(
                "surface albedo {} is outside 0-1",
                self.surface_albedo
            )));
        }
        if let Some(temperature) = self.surface_temperature {
            if !(temperature.is_finite() && temperature > 0.0) {
                return Err(DataError::Malformed(format!(
                    "surface temperature {temperature} K is not positive"
                )));
            }
        }
        match self.aerosol {
            AerosolModel::None => {}
            AerosolModel::Rural { visibility_km }
            | AerosolModel::Maritime { visibility_km }
            | AerosolModel::Urban { visibility_km } => {
                if !(visibility_km.is_finite() && visibility_km > 0.0) {
                    return Err(DataError::Malformed(format!(
                        "aerosol visibility {visibility_km} km is not positive"
                    )));
                }
            }
        }
        Ok(self)
    }

    /// Set the refraction threshold angle, clamped to [0, 90] degrees.
    pub fn with_refraction_threshold(mut self, degrees: f32) -> Self {
        self.refraction_threshold_deg = degrees.clamp(0.0, 90.0);
        self
    }

    /// Set the number of scattering orders, capped at 3.
    pub fn with_scattering_order(mut self, order: u8) -> Self {
        self.scattering_order = order.min(MAX_SCATTERING_ORDER);
        self
    }

    /// Set the missing-species policy.
    pub fn with_missing_species(mut self, policy: MissingSpecies) -> Self {
        self.missing_species = policy;
        self
    }

    /// Set the aerosol model.
    pub fn with_aerosol(mut self, aerosol: AerosolModel) -> Self {
        self.aerosol = aerosol;
        self
    }

    /// Set the surface albedo, clamped to [0, 1].
    pub fn with_surface_albedo(mut self, albedo: f32) -> Self {
        self.surface_albedo = albedo.clamp(0.0, 1.0);
        self
    }

    /// Set the surface temperature.
    pub fn with_surface_temperature(mut self, temperature: f32) -> Self {
        self.surface_temperature = Some(temperature);
        self
    }

    /// Set the worker thread count.
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }
}
