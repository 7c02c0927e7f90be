use std::collections::BTreeMap;

use approx::assert_relative_eq;

use super::*;
use crate::config::{AerosolModel, MissingSpecies};
use crate::error::{GeometryError, TableLookupError};

fn grid() -> SpectralGrid {
    SpectralGrid::new(2000.0, 2500.0, 20.0).unwrap()
}

fn mls() -> AtmosphericProfile {
    load_profile(ProfileSource::Model(ModelAtmosphere::MidLatitudeSummer)).unwrap()
}

fn up(zenith_angle: f32) -> PathGeometry {
    PathGeometry::ObserverToSpace {
        observer_altitude: 0.0,
        zenith_angle,
    }
}

fn nadir_solar() -> PathGeometry {
    PathGeometry::SolarRadiance {
        observer_altitude: 705.0,
        zenith_angle: 180.0,
        solar_zenith: 30.0,
        relative_azimuth: 0.0,
    }
}

fn run(geometry: PathGeometry, mode: RadianceMode, config: RtmConfig) -> RtmOutputs {
    let table = CoefficientTable::builtin().unwrap();
    let parameters = RtmParameters::new(grid(), table, config);
    RtmInputs::new(mls(), geometry, mode)
        .unwrap()
        .run(&parameters)
        .unwrap()
}

/// A warm slab with no absorbing gases.
fn clear_slab() -> AtmosphericProfile {
    AtmosphericProfile::new(vec![AtmosphericLayer {
        bottom: 0.0,
        top: 5.0,
        pressure: 1013.25,
        temperature: 300.0,
        densities: BTreeMap::new(),
    }])
    .unwrap()
}

fn slab_thermal(config: RtmConfig) -> RtmOutputs {
    let table = CoefficientTable::builtin().unwrap();
    let parameters = RtmParameters::new(grid(), table, config);
    RtmInputs::new(clear_slab(), up(0.0), RadianceMode::Thermal)
        .unwrap()
        .run(&parameters)
        .unwrap()
}

#[test]
fn scattering_layer_emits_only_what_it_absorbs() {
    // Thick maritime haze with single-scatter albedo 0.99
    let hazy = slab_thermal(
        RtmConfig::default().with_aerosol(AerosolModel::Maritime { visibility_km: 0.2 }),
    );
    for (nu, t, l) in hazy.triples() {
        assert!(t < 0.1, "{nu}");
        let blackbody = (1.0 - t) * planck(nu, 300.0);
        assert!(l > 0.0099 * blackbody, "{nu}");
        assert!(l <= 0.01 * blackbody * (1.0 + 1e-9), "{nu}");
    }

    // Rayleigh alone scatters but never absorbs
    let clear = slab_thermal(RtmConfig::default());
    assert!(clear.radiance.iter().all(|&l| l == 0.0));
}

#[test]
fn outputs_are_bounded() {
    for (geometry, mode) in [
        (up(0.0), RadianceMode::Thermal),
        (up(60.0), RadianceMode::Thermal),
        (up(90.0), RadianceMode::Thermal),
        (nadir_solar(), RadianceMode::Solar),
        (nadir_solar(), RadianceMode::Thermal),
        (up(30.0), RadianceMode::DirectSolar),
    ] {
        let out = run(geometry, mode, RtmConfig::default());
        assert_eq!(out.len(), 26);
        assert!(out
            .transmittance
            .iter()
            .all(|t| (0.0..=1.0).contains(t)));
        assert!(out.radiance.iter().all(|&l| l >= 0.0 && l.is_finite()));
        assert!(out.warnings.is_empty());
    }
}

#[test]
fn repeated_runs_are_identical() {
    let table = CoefficientTable::builtin().unwrap();
    let inputs = RtmInputs::new(mls(), nadir_solar(), RadianceMode::Solar).unwrap();

    let parameters = RtmParameters::new(grid(), table, RtmConfig::default());
    let single = thread_pool(Some(1)).unwrap();
    let many = thread_pool(Some(4)).unwrap();

    let first = single.install(|| inputs.run(&parameters)).unwrap();
    assert_eq!(first, single.install(|| inputs.run(&parameters)).unwrap());
    assert_eq!(first, many.install(|| inputs.run(&parameters)).unwrap());
    assert_eq!(first, inputs.run(&parameters).unwrap());
}

#[test]
fn transmittance_falls_toward_the_horizon() {
    let angles = [0.0, 20.0, 40.0, 60.0, 70.0, 80.0, 85.0, 89.0];
    let outputs: Vec<_> = angles
        .iter()
        .map(|&angle| run(up(angle), RadianceMode::Thermal, RtmConfig::default()))
        .collect();

    for bin in 0..grid().len() {
        for pair in outputs.windows(2) {
            // Saturated bands underflow to zero
            if pair[0].transmittance[bin] > 1e-300 {
                assert!(
                    pair[1].transmittance[bin] < pair[0].transmittance[bin],
                    "bin {bin}"
                );
            }
            assert!(pair[1].optical_depth[bin] > pair[0].optical_depth[bin]);
        }
    }
}

#[test]
fn horizontal_path_is_finite() {
    let vertical = run(up(0.0), RadianceMode::Thermal, RtmConfig::default());
    let horizontal = run(up(90.0), RadianceMode::Thermal, RtmConfig::default());
    for bin in 0..vertical.len() {
        assert!(horizontal.optical_depth[bin].is_finite());
        assert!(horizontal.optical_depth[bin] > 5.0 * vertical.optical_depth[bin]);
    }
}

#[test]
fn thermal_radiance_is_below_the_warmest_blackbody() {
    let profile = mls();
    let warmest = profile
        .layers()
        .iter()
        .map(|layer| f64::from(layer.temperature))
        .fold(0.0, f64::max);
    let out = run(up(0.0), RadianceMode::Thermal, RtmConfig::default());
    for (nu, _, radiance) in out.triples() {
        assert!(radiance <= planck(nu, warmest) * (1.0 + 1e-12));
    }
}

#[test]
fn looking_down_from_the_ground_sees_the_surface() {
    // From the ground there is no atmosphere between the observer and a
    // black surface
    let geometry = PathGeometry::ObserverToSpace {
        observer_altitude: 0.0,
        zenith_angle: 180.0,
    };
    let config = RtmConfig::default().with_surface_temperature(300.0);
    let out = run(geometry, RadianceMode::Thermal, config);
    for (nu, transmittance, radiance) in out.triples() {
        assert_eq!(transmittance, 1.0);
        assert_relative_eq!(radiance, planck(nu, 300.0), max_relative = 1e-12);
    }
}

#[test]
fn albedo_adds_reflected_sunlight() {
    let dark = run(nadir_solar(), RadianceMode::Solar, RtmConfig::default());
    let bright = run(
        nadir_solar(),
        RadianceMode::Solar,
        RtmConfig::default().with_surface_albedo(0.3),
    );
    for bin in 0..dark.len() {
        assert!(bright.radiance[bin] >= dark.radiance[bin]);
    }
    assert!(bright
        .radiance
        .iter()
        .zip(&dark.radiance)
        .any(|(b, d)| b > d));
}

#[test]
fn solar_with_thermal_adds_both() {
    let solar = run(nadir_solar(), RadianceMode::Solar, RtmConfig::default());
    let thermal = run(nadir_solar(), RadianceMode::Thermal, RtmConfig::default());
    let both = run(
        nadir_solar(),
        RadianceMode::Solar,
        RtmConfig {
            solar_includes_thermal: true,
            ..RtmConfig::default()
        },
    );
    for bin in 0..both.len() {
        assert_relative_eq!(
            both.radiance[bin],
            solar.radiance[bin] + thermal.radiance[bin],
            max_relative = 1e-12
        );
    }
}

#[test]
fn higher_scattering_orders_add_radiance() {
    let config = RtmConfig::default().with_aerosol(AerosolModel::rural_default());
    let first = run(nadir_solar(), RadianceMode::Solar, config.clone());
    let third = run(
        nadir_solar(),
        RadianceMode::Solar,
        config.clone().with_scattering_order(3),
    );
    let none = run(nadir_solar(), RadianceMode::Solar, config.with_scattering_order(0));
    for bin in 0..first.len() {
        assert!(third.radiance[bin] >= first.radiance[bin]);
        assert_eq!(none.radiance[bin], 0.0);
    }
}

#[test]
fn direct_solar_is_attenuated_irradiance() {
    let out = run(up(30.0), RadianceMode::DirectSolar, RtmConfig::default());
    for (nu, transmittance, radiance) in out.triples() {
        assert_relative_eq!(
            radiance,
            solar_irradiance(nu) * transmittance,
            max_relative = 1e-12
        );
    }
}

#[test]
fn solar_mode_needs_the_sun() {
    assert!(matches!(
        RtmInputs::new(mls(), up(0.0), RadianceMode::Solar),
        Err(RtmError::InconsistentInputs)
    ));
}

#[test]
fn invalid_geometry_aborts() {
    let table = CoefficientTable::builtin().unwrap();
    let parameters = RtmParameters::new(grid(), table, RtmConfig::default());
    let result = RtmInputs::new(mls(), up(-5.0), RadianceMode::Thermal)
        .unwrap()
        .run(&parameters);
    assert!(matches!(
        result,
        Err(RtmError::Geometry(GeometryError::InvalidAngle { .. }))
    ));
}

#[test]
fn out_of_range_grid_respects_policy() {
    let table = CoefficientTable::builtin().unwrap();
    let grid = SpectralGrid::new(9000.0, 9100.0, 20.0).unwrap();
    let inputs = RtmInputs::new(mls(), up(0.0), RadianceMode::Thermal).unwrap();

    let strict = RtmParameters::new(grid, table, RtmConfig::default());
    assert!(matches!(
        inputs.run(&strict),
        Err(RtmError::TableLookup(TableLookupError::OutOfRange { .. }))
    ));

    let lenient = RtmParameters::new(
        grid,
        table,
        RtmConfig::default().with_missing_species(MissingSpecies::Ignore),
    );
    let out = inputs.run(&lenient).unwrap();
    // Only Rayleigh scattering is left
    assert!(out.transmittance.iter().all(|&t| t > 0.99));
}
