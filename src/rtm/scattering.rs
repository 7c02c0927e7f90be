//! Molecular and aerosol scattering.

use std::f64::consts::PI;

use crate::config::AerosolModel;

/// Wavenumber of the 550 nm aerosol reference wavelength, in cm⁻¹
const AEROSOL_REFERENCE_WAVENUMBER: f64 = 1e7 / 550.0;

/// Aerosol scale height in km
const AEROSOL_SCALE_HEIGHT: f64 = 1.2;

/// Koschmieder constant relating visibility to extinction at 550 nm
const KOSCHMIEDER: f64 = 3.912;

/// Upper limit of the Rayleigh fit, in cm⁻¹ (200 nm)
const RAYLEIGH_FIT_LIMIT: f64 = 50_000.0;

/// Rayleigh scattering coefficient in km⁻¹ for air at the given pressure (hPa)
/// and temperature (K).
pub(crate) fn rayleigh_extinction(wavenumber: f64, pressure: f32, temperature: f32) -> f64 {
    let nu = wavenumber.min(RAYLEIGH_FIT_LIMIT);
    let nu_sq = nu * nu;
    let stp = nu_sq * nu_sq / (9.38076e18 - 1.08426e9 * nu_sq);
    stp * (f64::from(pressure) / 1013.25) * (273.15 / f64::from(temperature))
}

/// Rayleigh phase function, normalised to 4π over the sphere.
pub(crate) fn rayleigh_phase(cos_angle: f64) -> f64 {
    0.75 * (1.0 + cos_angle * cos_angle)
}

/// Henyey-Greenstein phase function, normalised to 4π over the sphere.
pub(crate) fn henyey_greenstein(cos_angle: f64, g: f64) -> f64 {
    let g_sq = g * g;
    (1.0 - g_sq) / (1.0 + g_sq - 2.0 * g * cos_angle).powf(1.5)
}

/// Optical properties of a boundary-layer aerosol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AerosolOptics {
    /// Extinction at 550 nm at the surface, km⁻¹
    surface_extinction: f64,
    angstrom: f64,
    pub(crate) single_scatter_albedo: f64,
    pub(crate) asymmetry: f64,
}

impl AerosolOptics {
    /// Optics for a model, or `None` when aerosols are switched off or the
    /// visibility is unusable.
    pub(crate) fn from_model(model: AerosolModel) -> Option<Self> {
        let (visibility, angstrom, single_scatter_albedo, asymmetry) = match model {
            AerosolModel::None => return None,
            AerosolModel::Rural { visibility_km } => (visibility_km, 1.3, 0.95, 0.70),
            AerosolModel::Maritime { visibility_km } => (visibility_km, 0.5, 0.99, 0.75),
            AerosolModel::Urban { visibility_km } => (visibility_km, 1.0, 0.65, 0.65),
        };
        if !(visibility.is_finite() && visibility > 0.0) {
            return None;
        }
        Some(Self {
            surface_extinction: KOSCHMIEDER / f64::from(visibility),
            angstrom,
            single_scatter_albedo,
            asymmetry,
        })
    }

    /// Extinction coefficient in km⁻¹ at `height` km above the surface.
    pub(crate) fn extinction(&self, wavenumber: f64, height: f64) -> f64 {
        let spectral = (wavenumber / AEROSOL_REFERENCE_WAVENUMBER).powf(self.angstrom);
        self.surface_extinction * spectral * (-height.max(0.0) / AEROSOL_SCALE_HEIGHT).exp()
    }
}

/// Phase function for a mix of molecular and aerosol scattering, divided by
/// 4π so it can multiply an irradiance directly.
pub(crate) fn mixed_phase(
    cos_angle: f64,
    rayleigh_depth: f64,
    aerosol_depth: f64,
    asymmetry: f64,
) -> f64 {
    let total = rayleigh_depth + aerosol_depth;
    if total <= 0.0 {
        return 0.0;
    }
    let phase = (rayleigh_depth * rayleigh_phase(cos_angle)
        + aerosol_depth * henyey_greenstein(cos_angle, asymmetry))
        / total;
    phase / (4.0 * PI)
}
