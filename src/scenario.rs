//! Named reference scenarios.
//!
//! Each scenario fixes a model atmosphere, a viewing geometry, a spectral
//! grid, and a radiance mode. Runs of these are what get compared against
//! stored reference spectra.

use log::info;

use crate::config::RtmConfig;
use crate::error::{RtmError, SpectralError};
use crate::rtm::{
    load_profile, thread_pool, CoefficientTable, ModelAtmosphere, PathGeometry, ProfileSource,
    RadianceMode, RtmInputs, RtmOutputs, RtmParameters, SpectralGrid,
};

/// Names accepted by [`Scenario::from_name`].
pub const NAMES: [&str; 2] = ["obs2space", "solarrad"];

/// Altitude of the satellite observer in the solar scenario, km
const SATELLITE_ALTITUDE: f32 = 705.0;

/// A fully specified computation.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Short name
    pub name: &'static str,
    /// Model atmosphere
    pub model: ModelAtmosphere,
    /// Viewing geometry
    pub geometry: PathGeometry,
    /// First wavenumber, cm⁻¹
    pub start: f64,
    /// Last wavenumber, cm⁻¹
    pub stop: f64,
    /// Wavenumber step, cm⁻¹
    pub step: f64,
    /// Radiance to compute
    pub mode: RadianceMode,
}

impl Scenario {
    /// Ground observer looking straight up through a mid-latitude summer
    /// atmosphere, thermal radiance.
    pub fn obs2space() -> Self {
        Self {
            name: "obs2space",
            model: ModelAtmosphere::MidLatitudeSummer,
            geometry: PathGeometry::ObserverToSpace {
                observer_altitude: 0.0,
                zenith_angle: 0.0,
            },
            start: 2000.0,
            stop: 2500.0,
            step: 20.0,
            mode: RadianceMode::Thermal,
        }
    }

    /// Satellite looking at nadir with the sun at 30° zenith, solar
    /// radiance.
    pub fn solarrad() -> Self {
        Self {
            name: "solarrad",
            model: ModelAtmosphere::MidLatitudeSummer,
            geometry: PathGeometry::SolarRadiance {
                observer_altitude: SATELLITE_ALTITUDE,
                zenith_angle: 180.0,
                solar_zenith: 30.0,
                relative_azimuth: 0.0,
            },
            start: 2000.0,
            stop: 2500.0,
            step: 20.0,
            mode: RadianceMode::Solar,
        }
    }

    /// Look up a scenario by name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "obs2space" => Some(Self::obs2space()),
            "solarrad" => Some(Self::solarrad()),
            _ => None,
        }
    }

    /// Every scenario, in [`NAMES`] order.
    pub fn all() -> Vec<Self> {
        vec![Self::obs2space(), Self::solarrad()]
    }

    /// The scenario's spectral grid.
    pub fn grid(&self) -> Result<SpectralGrid, SpectralError> {
        SpectralGrid::new(self.start, self.stop, self.step)
    }

    /// Build the per-call RTM inputs.
    pub fn inputs(&self) -> Result<RtmInputs, RtmError> {
        let profile = load_profile(ProfileSource::Model(self.model))?;
        RtmInputs::new(profile, self.geometry, self.mode)
    }

    /// Run the scenario on a worker pool sized by `config.num_threads`.
    pub fn run(
        &self,
        table: &CoefficientTable,
        config: &RtmConfig,
    ) -> Result<RtmOutputs, RtmError> {
        info!("running scenario {} ({})", self.name, self.model);
        let parameters = RtmParameters::new(self.grid()?, table, config.clone());
        let inputs = self.inputs()?;
        thread_pool(config.num_threads)?.install(|| inputs.run(&parameters))
    }
}
