//! Radiance along the line of sight.
//!
//! Radiances are spectral radiances per unit wavenumber, in
//! W cm⁻² sr⁻¹ (cm⁻¹)⁻¹. Irradiances are in W cm⁻² (cm⁻¹)⁻¹.

use std::f64::consts::PI;

use log::warn;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::geometry::ResolvedPath;
use super::integrator::PathDepths;
use super::profile::AtmosphericProfile;
use super::scattering::{mixed_phase, AerosolOptics};
use super::spectral::SpectralGrid;
use crate::config::RtmConfig;

/// First radiation constant for spectral radiance, W cm² sr⁻¹
const C1: f64 = 1.191042e-12;

/// Second radiation constant, cm K
const C2: f64 = 1.4387769;

/// Solar photosphere temperature in K
const SOLAR_TEMPERATURE: f64 = 5778.0;

/// Solid angle factor (R_sun / 1 AU)²
const SOLAR_DILUTION: f64 = 2.1626e-5;

/// Planck constant, J s
const PLANCK: f64 = 6.626_070_15e-34;

/// Speed of light, m/s
const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// What radiance to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadianceMode {
    /// Thermal emission of the atmosphere and surface
    #[default]
    Thermal,
    /// Scattered and reflected sunlight
    Solar,
    /// Sunlight transmitted straight along the line of sight
    DirectSolar,
}

/// A bin where the computed radiance came out negative (or not a number) and
/// was clamped to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadianceWarning {
    /// Bin index
    pub bin: usize,
    /// Bin wavenumber in cm⁻¹
    pub wavenumber: f64,
    /// Value before clamping
    pub value: f64,
}

/// Radiance per bin, plus any warnings raised while computing it.
#[derive(Debug, Clone, PartialEq)]
pub struct RadianceResult {
    /// Radiance per bin.
    pub radiance: Vec<f64>,
    /// Bins that needed clamping.
    pub warnings: Vec<RadianceWarning>,
}

/// Planck spectral radiance at `wavenumber` (cm⁻¹) and `temperature` (K).
pub fn planck(wavenumber: f64, temperature: f64) -> f64 {
    if temperature <= 0.0 || wavenumber <= 0.0 {
        return 0.0;
    }
    C1 * wavenumber.powi(3) / (C2 * wavenumber / temperature).exp_m1()
}

/// Extraterrestrial solar spectral irradiance at 1 AU, modelled as a 5778 K
/// blackbody.
pub fn solar_irradiance(wavenumber: f64) -> f64 {
    PI * planck(wavenumber, SOLAR_TEMPERATURE) * SOLAR_DILUTION
}

/// Convert a per-wavenumber radiance to per-micron.
pub fn per_micron(radiance: f64, wavenumber: f64) -> f64 {
    radiance * wavenumber * wavenumber * 1e-4
}

/// Convert a per-micron radiance (W cm⁻² sr⁻¹ µm⁻¹) to a photon radiance in
/// photons s⁻¹ cm⁻² sr⁻¹ µm⁻¹.
pub fn photon_radiance(per_micron_radiance: f64, wavenumber: f64) -> f64 {
    let wavelength_m = 1e-2 / wavenumber;
    per_micron_radiance * wavelength_m / (PLANCK * SPEED_OF_LIGHT)
}

/// Combine optical depths and temperatures into radiance for every bin.
pub fn synthesize(
    depths: &PathDepths,
    path: &ResolvedPath,
    profile: &AtmosphericProfile,
    grid: &SpectralGrid,
    mode: RadianceMode,
    config: &RtmConfig,
) -> RadianceResult {
    let synthesizer = Synthesizer {
        depths,
        path,
        profile,
        grid,
        config,
        aerosol: AerosolOptics::from_model(config.aerosol),
        surface_temperature: f64::from(
            config
                .surface_temperature
                .unwrap_or_else(|| profile.surface_temperature()),
        ),
    };

    let mut values = Vec::with_capacity(grid.len());
    (0..grid.len())
        .into_par_iter()
        .map(|bin| match mode {
            RadianceMode::Thermal => synthesizer.thermal(bin),
            RadianceMode::Solar => {
                let solar = synthesizer.scattered_solar(bin);
                if config.solar_includes_thermal {
                    solar + synthesizer.thermal(bin)
                } else {
                    solar
                }
            }
            RadianceMode::DirectSolar => synthesizer.direct_solar(bin),
        })
        .collect_into_vec(&mut values);

    let mut warnings = Vec::new();
    let radiance = values
        .into_iter()
        .enumerate()
        .map(|(bin, value)| {
            if value >= 0.0 {
                value
            } else {
                let wavenumber = grid.wavenumber(bin);
                warn!("clamping radiance {value:e} at {wavenumber} cm⁻¹ to zero");
                warnings.push(RadianceWarning {
                    bin,
                    wavenumber,
                    value,
                });
                0.0
            }
        })
        .collect();

    RadianceResult { radiance, warnings }
}

struct Synthesizer<'a> {
    depths: &'a PathDepths,
    path: &'a ResolvedPath,
    profile: &'a AtmosphericProfile,
    grid: &'a SpectralGrid,
    config: &'a RtmConfig,
    aerosol: Option<AerosolOptics>,
    surface_temperature: f64,
}

impl Synthesizer<'_> {
    /// Transmittance of each segment and from the observer to the near side
    /// of each segment, plus the whole path.
    fn transmittances(&self, bin: usize) -> (SmallVec<[(f64, f64); 64]>, f64) {
        let mut to_observer = 1.0;
        let per_segment = self
            .depths
            .line_of_sight
            .extinction
            .row(bin)
            .iter()
            .map(|&tau| {
                let segment = (-tau).exp();
                let pair = (segment, to_observer);
                to_observer *= segment;
                pair
            })
            .collect();
        (per_segment, to_observer)
    }

    fn thermal(&self, bin: usize) -> f64 {
        let wavenumber = self.grid.wavenumber(bin);
        let (per_segment, total) = self.transmittances(bin);
        let layers = self.profile.layers();
        let los = &self.depths.line_of_sight;

        let mut radiance = 0.0;
        for (index, (segment, &(t_segment, t_observer))) in self
            .path
            .line_of_sight
            .iter()
            .zip(&per_segment)
            .enumerate()
        {
            // A layer emits only in proportion to what it absorbs
            let extinction = los.extinction[[bin, index]];
            let absorbed = if extinction > 0.0 {
                1.0 - los.scattering[[bin, index]] / extinction
            } else {
                0.0
            };
            let temperature = layers
                .get(segment.layer)
                .map_or(0.0, |layer| f64::from(layer.temperature));
            radiance += planck(wavenumber, temperature) * (1.0 - t_segment) * absorbed * t_observer;
        }

        if self.path.ends_at_surface {
            let emissivity = 1.0 - f64::from(self.config.surface_albedo);
            radiance += emissivity * planck(wavenumber, self.surface_temperature) * total;
        }
        radiance
    }

    fn scattered_solar(&self, bin: usize) -> f64 {
        let Some((legs, depths)) = self.path.solar.as_ref().zip(self.depths.solar.as_ref()) else {
            return 0.0;
        };
        let wavenumber = self.grid.wavenumber(bin);
        let e_sun = solar_irradiance(wavenumber);
        let (per_segment, total) = self.transmittances(bin);
        let los = &self.depths.line_of_sight;
        let asymmetry = self.aerosol.map_or(0.0, |optics| optics.asymmetry);

        let mut single = 0.0;
        for (index, &(t_segment, t_observer)) in per_segment.iter().enumerate() {
            let Some(tau_sun) = depths.to_segments[index].as_ref().map(|leg| leg[bin]) else {
                continue;
            };
            let extinction = los.extinction[[bin, index]];
            if extinction <= 0.0 {
                continue;
            }
            let scattering = los.scattering[[bin, index]];
            let aerosol = los.aerosol_scattering[[bin, index]];
            let phase = mixed_phase(
                legs.cos_scattering_angle,
                scattering - aerosol,
                aerosol,
                asymmetry,
            );
            single += e_sun
                * (-tau_sun).exp()
                * phase
                * (scattering / extinction)
                * (1.0 - t_segment)
                * t_observer;
        }

        // Higher orders as successive approximations of the first
        let total_extinction: f64 = los.extinction.row(bin).sum();
        let total_scattering: f64 = los.scattering.row(bin).sum();
        let albedo = if total_extinction > 0.0 {
            total_scattering / total_extinction
        } else {
            0.0
        };
        let factor = albedo * (1.0 - (-total_scattering).exp()) / 2.0;
        let mut order = single;
        let mut scattered = if self.config.scattering_order >= 1 {
            single
        } else {
            0.0
        };
        for _ in 1..self.config.scattering_order {
            order *= factor;
            scattered += order;
        }

        let reflected = match (&depths.to_surface, self.path.ends_at_surface) {
            (Some(to_surface), true) => {
                let cos_sun = legs.solar_zenith.to_radians().cos().max(0.0);
                e_sun
                    * cos_sun
                    * (-to_surface[bin]).exp()
                    * f64::from(self.config.surface_albedo)
                    / PI
                    * total
            }
            _ => 0.0,
        };

        scattered + reflected
    }

    fn direct_solar(&self, bin: usize) -> f64 {
        solar_irradiance(self.grid.wavenumber(bin)) * self.depths.line_of_sight.transmittance(bin)
    }
}
