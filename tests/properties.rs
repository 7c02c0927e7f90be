//! Integration tests for custom inputs: user profiles, configuration files,
//! alternative coefficient tables, and wavelength grids.

use std::collections::BTreeMap;
use std::path::PathBuf;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use band_rtm::config::{AerosolModel, MissingSpecies};
use band_rtm::error::{DataError, ProfileError, RtmError};
use band_rtm::rtm::{
    load_profile, per_micron, photon_radiance, AtmosphericLayer, CoefficientTable,
    ModelAtmosphere, PathGeometry, ProfileLevel, ProfileSource, RadianceMode, Species,
    SpectralGrid, MODEL_ATMOSPHERES,
};
use band_rtm::{RtmConfig, RtmInputs, RtmOutputs, RtmParameters};

fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("band_rtm_{}_{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

fn zenith_run(source: ProfileSource, zenith_angle: f32, config: RtmConfig) -> RtmOutputs {
    let table = CoefficientTable::builtin().unwrap();
    let grid = SpectralGrid::new(2000.0, 2500.0, 20.0).unwrap();
    let parameters = RtmParameters::new(grid, table, config);
    let geometry = PathGeometry::ObserverToSpace {
        observer_altitude: 0.0,
        zenith_angle,
    };
    RtmInputs::new(load_profile(source).unwrap(), geometry, RadianceMode::Thermal)
        .unwrap()
        .run(&parameters)
        .unwrap()
}

/// A single isothermal layer holding only CO2.
fn co2_slab(density: f64) -> Vec<AtmosphericLayer> {
    vec![AtmosphericLayer {
        bottom: 0.0,
        top: 1.0,
        pressure: 1013.25,
        temperature: 250.0,
        densities: BTreeMap::from([(Species::CO2, density)]),
    }]
}

#[test]
fn every_model_atmosphere_runs() {
    for model in MODEL_ATMOSPHERES {
        let out = zenith_run(ProfileSource::Model(model), 0.0, RtmConfig::default());
        assert_eq!(out.len(), 26, "{model}");
        assert!(out.transmittance.iter().all(|t| (0.0..=1.0).contains(t)));
    }
}

#[test]
fn humid_air_is_more_opaque() {
    let tropical = zenith_run(
        ProfileSource::Model(ModelAtmosphere::Tropical),
        0.0,
        RtmConfig::default(),
    );
    let arctic = zenith_run(
        ProfileSource::Model(ModelAtmosphere::SubarcticWinter),
        0.0,
        RtmConfig::default(),
    );
    // 2000 cm⁻¹ is on the edge of the 6.3 µm water band
    assert!(tropical.optical_depth[0] > arctic.optical_depth[0]);
}

#[test]
fn beer_lambert_in_a_single_slab() {
    let table = CoefficientTable::builtin().unwrap();
    let density = 1e15;
    let out = zenith_run(
        ProfileSource::Layers(co2_slab(density)),
        0.0,
        RtmConfig::default(),
    );

    for (bin, &nu) in out.wavenumber.iter().enumerate() {
        let k = table.lookup(Species::CO2, nu, 1013.25, 250.0).unwrap();
        let rayleigh = out.optical_depth[bin] - k * density * 1e5;
        // What's left is a kilometre of Rayleigh scattering, tiny in the IR
        assert_abs_diff_eq!(rayleigh, 0.0, epsilon = 1e-5);
        assert_relative_eq!(
            out.transmittance[bin],
            (-out.optical_depth[bin]).exp(),
            max_relative = 1e-12
        );
    }
}

#[test]
fn doubling_the_absorber_doubles_the_absorption_depth() {
    let thin = zenith_run(
        ProfileSource::Layers(co2_slab(1e12)),
        0.0,
        RtmConfig::default(),
    );
    let thick = zenith_run(
        ProfileSource::Layers(co2_slab(2e12)),
        0.0,
        RtmConfig::default(),
    );
    for bin in 0..thin.len() {
        // Rayleigh is the same in both, so compare the absorption part only
        let rayleigh = 2.0 * thin.optical_depth[bin] - thick.optical_depth[bin];
        assert!(rayleigh >= 0.0 && rayleigh < 1e-5);
    }
}

#[test]
fn levels_build_a_usable_profile() {
    let level = |altitude: f32, pressure: f32, temperature: f32, h2o: f64| ProfileLevel {
        altitude,
        pressure,
        temperature,
        mixing_ratios: BTreeMap::from([(Species::H2O, h2o), (Species::CO2, 400.0)]),
    };
    let levels = vec![
        level(0.0, 1000.0, 290.0, 10_000.0),
        level(2.0, 800.0, 278.0, 5_000.0),
        level(10.0, 260.0, 225.0, 50.0),
        level(30.0, 12.0, 227.0, 4.0),
    ];
    let out = zenith_run(ProfileSource::Levels(levels), 30.0, RtmConfig::default());
    assert_eq!(out.len(), 26);
    assert!(out.radiance.iter().all(|&l| l >= 0.0));
    // 400 ppmv of CO2 is enough to close the 4.3 µm band
    assert!(out.transmittance[18] < 1e-10);
    assert!(out.radiance[18] > 0.0);
}

#[test]
fn bad_profiles_are_rejected() {
    let mut layers = co2_slab(1e15);
    layers[0].temperature = -3.0;
    assert!(matches!(
        load_profile(ProfileSource::Layers(layers)),
        Err(ProfileError::InvalidState { index: 0 })
    ));
    assert_eq!(
        ModelAtmosphere::from_index(0),
        Err(ProfileError::UnknownModel(0))
    );
}

#[test]
fn config_file_controls_the_run() {
    let path = scratch_file(
        "config.json",
        r#"{
            "missing_species": "ignore",
            "aerosol": {"kind": "urban", "visibility_km": 5.0},
            "num_threads": 2
        }"#,
    );
    let config = RtmConfig::from_path(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.missing_species, MissingSpecies::Ignore);
    assert_eq!(config.aerosol, AerosolModel::Urban { visibility_km: 5.0 });
    assert_eq!(config.num_threads, Some(2));

    let clear = zenith_run(
        ProfileSource::Model(ModelAtmosphere::UsStandard),
        0.0,
        RtmConfig::default(),
    );
    let hazy = zenith_run(ProfileSource::Model(ModelAtmosphere::UsStandard), 0.0, config);
    assert!(hazy
        .optical_depth
        .iter()
        .zip(&clear.optical_depth)
        .all(|(h, c)| h > c));
}

#[test]
fn missing_config_file_is_an_io_error() {
    let result = RtmConfig::from_path("/nonexistent/band_rtm/config.json");
    assert!(matches!(result, Err(DataError::Io(_))));
}

#[test]
fn custom_table_from_file() {
    let path = scratch_file(
        "table.json",
        r#"{
            "format": "band-model-table",
            "version": 1,
            "description": "single CO2 line",
            "start": 2000.0,
            "stop": 2500.0,
            "bin_width": 20.0,
            "pressure_buckets": [1.0, 1013.25],
            "temperature_buckets": [200.0, 300.0],
            "entries": [
                {"species": "CO2", "wavenumber": 2340.0, "k": [[2e-20, 2e-20], [2e-20, 2e-20]]}
            ]
        }"#,
    );
    let table = CoefficientTable::from_path(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(table.description(), "single CO2 line");

    let grid = SpectralGrid::new(2000.0, 2500.0, 20.0).unwrap();
    let parameters = RtmParameters::new(grid, &table, RtmConfig::default());
    let inputs = RtmInputs::new(
        load_profile(ProfileSource::Layers(co2_slab(1e15))).unwrap(),
        PathGeometry::ObserverToSpace {
            observer_altitude: 0.0,
            zenith_angle: 0.0,
        },
        RadianceMode::Thermal,
    )
    .unwrap();
    let out = inputs.run(&parameters).unwrap();

    // 2e-20 cm² × 1e15 cm⁻³ × 1e5 cm = 2
    let line = 17;
    assert_relative_eq!(out.wavenumber[line], 2340.0);
    assert_relative_eq!(out.optical_depth[line], 2.0, max_relative = 1e-4);
    assert!(out.optical_depth[0] < 1e-5);
}

#[test]
fn table_version_mismatch_is_reported() {
    let json = r#"{"format": "band-model-table", "version": 7, "start": 2000.0,
        "stop": 2100.0, "bin_width": 20.0, "pressure_buckets": [1.0],
        "temperature_buckets": [200.0], "entries": []}"#;
    assert!(matches!(
        CoefficientTable::from_json_str(json),
        Err(DataError::UnsupportedFormat(_))
    ));
}

#[test]
fn wavelength_grid_and_units() {
    // 4 to 5 µm
    let grid = SpectralGrid::from_wavelength_nm(4000.0, 5000.0, 20.0).unwrap();
    assert_eq!(grid.len(), 26);

    let out = zenith_run(
        ProfileSource::Model(ModelAtmosphere::MidLatitudeSummer),
        0.0,
        RtmConfig::default(),
    );
    for (nu, _, radiance) in out.triples() {
        let micron = per_micron(radiance, nu);
        assert_relative_eq!(micron, radiance * nu * nu / 1e4, max_relative = 1e-12);
        assert!(photon_radiance(micron, nu) >= 0.0);
    }
}

#[test]
fn invalid_grid_is_an_error() {
    let err: RtmError = SpectralGrid::new(2000.0, 2500.0, 0.0).unwrap_err().into();
    assert!(err.to_string().contains("invalid spectral grid"));
}
