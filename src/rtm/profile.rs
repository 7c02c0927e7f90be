//! Layered atmospheric profiles.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use log::debug;
use serde::{Deserialize, Serialize};

use super::standard_atmospheres::{ModelAtmosphere, MODEL_ATMOSPHERES};
use crate::error::ProfileError;

/// Air number density factor: `n [molecules/cm³] = LOSCHMIDT_SCALE * P [hPa] / T [K]`.
pub(crate) const LOSCHMIDT_SCALE: f64 = 7.242971e18;

/// Absorbing molecular species carried by the band model.
///
/// The declaration order is the summation order in the integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Species {
    /// Water vapor
    H2O,
    /// Carbon dioxide
    CO2,
    /// Ozone
    O3,
    /// Nitrous oxide
    N2O,
    /// Carbon monoxide
    CO,
    /// Methane
    CH4,
    /// Molecular oxygen
    O2,
}

impl Species {
    /// Every species, in summation order.
    pub const ALL: [Species; 7] = [
        Species::H2O,
        Species::CO2,
        Species::O3,
        Species::N2O,
        Species::CO,
        Species::CH4,
        Species::O2,
    ];

    /// Chemical formula.
    pub fn name(self) -> &'static str {
        match self {
            Species::H2O => "H2O",
            Species::CO2 => "CO2",
            Species::O3 => "O3",
            Species::N2O => "N2O",
            Species::CO => "CO",
            Species::CH4 => "CH4",
            Species::O2 => "O2",
        }
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A homogeneous atmospheric layer.
#[derive(Debug, Clone, PartialEq)]
pub struct AtmosphericLayer {
    /// Bottom altitude in km.
    pub bottom: f32,
    /// Top altitude in km.
    pub top: f32,
    /// Layer pressure in hPa.
    pub pressure: f32,
    /// Layer temperature in K.
    pub temperature: f32,
    /// Number density per species in molecules/cm³.
    pub densities: BTreeMap<Species, f64>,
}

impl AtmosphericLayer {
    /// Layer thickness in km.
    pub fn thickness(&self) -> f32 {
        self.top - self.bottom
    }

    /// Midpoint altitude in km.
    pub fn mid_altitude(&self) -> f32 {
        0.5 * (self.bottom + self.top)
    }

    /// Total air number density in molecules/cm³.
    pub fn air_density(&self) -> f64 {
        LOSCHMIDT_SCALE * f64::from(self.pressure) / f64::from(self.temperature)
    }

    /// Number density of one species, zero if the layer doesn't carry it.
    pub fn density(&self, species: Species) -> f64 {
        self.densities.get(&species).copied().unwrap_or(0.0)
    }
}

/// A profile level: the state at a single altitude, with volume mixing
/// ratios in ppmv.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileLevel {
    /// Altitude in km.
    pub altitude: f32,
    /// Pressure in hPa.
    pub pressure: f32,
    /// Temperature in K.
    pub temperature: f32,
    /// Volume mixing ratio per species in ppmv.
    pub mixing_ratios: BTreeMap<Species, f64>,
}

/// An ordered, validated sequence of layers from the surface upward.
#[derive(Debug, Clone, PartialEq)]
pub struct AtmosphericProfile {
    layers: Vec<AtmosphericLayer>,
}

/// Where a profile comes from.
#[derive(Debug, Clone)]
pub enum ProfileSource {
    /// One of the built-in reference atmospheres
    Model(ModelAtmosphere),
    /// Caller-supplied layers, validated on load
    Layers(Vec<AtmosphericLayer>),
    /// Caller-supplied levels, converted to layers and validated on load
    Levels(Vec<ProfileLevel>),
}

/// Load an atmospheric profile.
///
/// Built-in models are converted once per process and cloned out of a
/// read-only cache.
pub fn load_profile(source: ProfileSource) -> Result<AtmosphericProfile, ProfileError> {
    match source {
        ProfileSource::Model(model) => builtin_profile(model).cloned(),
        ProfileSource::Layers(layers) => AtmosphericProfile::new(layers),
        ProfileSource::Levels(levels) => AtmosphericProfile::from_levels(&levels),
    }
}

fn builtin_profile(model: ModelAtmosphere) -> Result<&'static AtmosphericProfile, ProfileError> {
    static CACHE: OnceLock<Result<Vec<AtmosphericProfile>, ProfileError>> = OnceLock::new();
    let cache = CACHE
        .get_or_init(|| {
            debug!("building the built-in model atmospheres");
            MODEL_ATMOSPHERES
                .iter()
                .map(|model| AtmosphericProfile::from_levels(&model.levels()))
                .collect()
        })
        .as_ref()
        .map_err(Clone::clone)?;
    Ok(&cache[model.index() - 1])
}

impl AtmosphericProfile {
    /// Validate and wrap a list of layers.
    ///
    /// Layers must be ordered from the surface up, with each layer's bottom at
    /// or above the previous layer's top, and physically sensible state.
    pub fn new(layers: Vec<AtmosphericLayer>) -> Result<Self, ProfileError> {
        if layers.is_empty() {
            return Err(ProfileError::Empty);
        }

        let mut previous_top = f32::NEG_INFINITY;
        for (index, layer) in layers.iter().enumerate() {
            if !layer.bottom.is_finite()
                || !layer.top.is_finite()
                || layer.top <= layer.bottom
                || layer.bottom < previous_top
            {
                return Err(ProfileError::NonMonotonicAltitude { index });
            }
            previous_top = layer.top;

            let state_ok = |x: f32| x.is_finite() && x > 0.0;
            if !state_ok(layer.pressure) || !state_ok(layer.temperature) {
                return Err(ProfileError::InvalidState { index });
            }

            if let Some((&species, &value)) = layer
                .densities
                .iter()
                .find(|(_, &n)| !n.is_finite() || n < 0.0)
            {
                return Err(ProfileError::InvalidDensity {
                    index,
                    species,
                    value,
                });
            }
        }

        Ok(Self { layers })
    }

    /// Build layers between consecutive levels.
    ///
    /// The layer pressure is the geometric mean of the bounding levels, while
    /// temperature and mixing ratios are arithmetic means.
    pub fn from_levels(levels: &[ProfileLevel]) -> Result<Self, ProfileError> {
        if levels.len() < 2 {
            return Err(ProfileError::Empty);
        }

        let layers = levels
            .windows(2)
            .enumerate()
            .map(|(index, pair)| {
                let (lower, upper) = (&pair[0], &pair[1]);
                if lower.pressure <= 0.0 || upper.pressure <= 0.0 {
                    return Err(ProfileError::InvalidState { index });
                }
                let pressure = (lower.pressure * upper.pressure).sqrt();
                let temperature = 0.5 * (lower.temperature + upper.temperature);
                let air = LOSCHMIDT_SCALE * f64::from(pressure) / f64::from(temperature);

                let densities = lower
                    .mixing_ratios
                    .keys()
                    .chain(upper.mixing_ratios.keys())
                    .map(|&species| {
                        let ppmv = |level: &ProfileLevel| {
                            level.mixing_ratios.get(&species).copied().unwrap_or(0.0)
                        };
                        let mean = 0.5 * (ppmv(lower) + ppmv(upper));
                        (species, air * mean * 1e-6)
                    })
                    .collect();

                Ok(AtmosphericLayer {
                    bottom: lower.altitude,
                    top: upper.altitude,
                    pressure,
                    temperature,
                    densities,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(layers)
    }

    /// The layers, surface first.
    pub fn layers(&self) -> &[AtmosphericLayer] {
        &self.layers
    }

    /// Number of layers (always at least one).
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always false; a profile can't be empty.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Altitude of the bottom of the lowest layer, in km.
    pub fn surface_altitude(&self) -> f32 {
        self.layers[0].bottom
    }

    /// Altitude of the top of the highest layer, in km.
    pub fn top_altitude(&self) -> f32 {
        self.layers[self.layers.len() - 1].top
    }

    /// Temperature of the lowest layer, used as a default surface temperature.
    pub fn surface_temperature(&self) -> f32 {
        self.layers[0].temperature
    }

    /// Vertical column amount of a species in molecules/cm².
    pub fn column(&self, species: Species) -> f64 {
        self.layers
            .iter()
            .map(|layer| layer.density(species) * f64::from(layer.thickness()) * 1e5)
            .sum()
    }
}
