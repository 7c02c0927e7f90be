//! Optical depth along resolved paths.

use std::collections::BTreeSet;

use log::{debug, warn};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use smallvec::SmallVec;

use super::coefficients::CoefficientTable;
use super::geometry::{PathSegment, ResolvedPath};
use super::profile::{AtmosphericProfile, Species};
use super::scattering::{rayleigh_extinction, AerosolOptics};
use super::spectral::SpectralGrid;
use crate::config::{MissingSpecies, RtmConfig};
use crate::error::{RtmError, TableLookupError};

const KM_TO_CM: f64 = 1e5;

/// Optical depths for every (bin, segment) pair of one path.
#[derive(Debug, Clone, PartialEq)]
pub struct OpticalDepths {
    /// Total extinction optical depth, shape (bins, segments).
    pub extinction: Array2<f64>,
    /// Scattering optical depth (molecular plus aerosol).
    pub scattering: Array2<f64>,
    /// Aerosol part of the scattering optical depth.
    pub aerosol_scattering: Array2<f64>,
}

impl OpticalDepths {
    /// Number of spectral bins.
    pub fn num_bins(&self) -> usize {
        self.extinction.nrows()
    }

    /// Number of path segments.
    pub fn num_segments(&self) -> usize {
        self.extinction.ncols()
    }

    /// Total optical depth along the path in one bin.
    pub fn total(&self, bin: usize) -> f64 {
        self.extinction.row(bin).sum()
    }

    /// Total optical depth per bin.
    pub fn totals(&self) -> Array1<f64> {
        self.extinction
            .rows()
            .into_iter()
            .map(|row| row.sum())
            .collect()
    }

    /// Path transmittance in one bin.
    pub fn transmittance(&self, bin: usize) -> f64 {
        (-self.total(bin)).exp().clamp(0.0, 1.0)
    }
}

/// Total optical depth per bin along each solar leg.
#[derive(Debug, Clone, PartialEq)]
pub struct SolarDepths {
    /// One entry per line-of-sight segment, `None` where the sun is blocked.
    pub to_segments: Vec<Option<Array1<f64>>>,
    /// Sun to the surface point, when there is one.
    pub to_surface: Option<Array1<f64>>,
}

/// Optical depths for a line of sight and its solar legs.
#[derive(Debug, Clone, PartialEq)]
pub struct PathDepths {
    /// Line of sight, per segment.
    pub line_of_sight: OpticalDepths,
    /// Solar legs, for solar geometries.
    pub solar: Option<SolarDepths>,
}

/// Integrate optical depth over `segments` for every bin of `grid`.
pub fn integrate(
    segments: &[PathSegment],
    profile: &AtmosphericProfile,
    table: &CoefficientTable,
    grid: &SpectralGrid,
    config: &RtmConfig,
) -> Result<OpticalDepths, RtmError> {
    let mut skipped = BTreeSet::new();
    let depths = integrate_segments(segments, profile, table, grid, config, &mut skipped)?;
    warn_skipped(&skipped);
    Ok(depths)
}

/// Integrate the line of sight and, for solar geometries, every solar leg.
pub fn integrate_path(
    path: &ResolvedPath,
    profile: &AtmosphericProfile,
    table: &CoefficientTable,
    grid: &SpectralGrid,
    config: &RtmConfig,
) -> Result<PathDepths, RtmError> {
    let mut skipped = BTreeSet::new();
    let line_of_sight = integrate_segments(
        &path.line_of_sight,
        profile,
        table,
        grid,
        config,
        &mut skipped,
    )?;

    let mut leg_totals = |leg: &[PathSegment]| -> Result<Array1<f64>, RtmError> {
        Ok(integrate_segments(leg, profile, table, grid, config, &mut skipped)?.totals())
    };

    let solar = match &path.solar {
        None => None,
        Some(legs) => {
            let to_segments = legs
                .to_segments
                .iter()
                .map(|leg| leg.as_deref().map(&mut leg_totals).transpose())
                .collect::<Result<Vec<_>, _>>()?;
            let to_surface = legs.to_surface.as_deref().map(&mut leg_totals).transpose()?;
            Some(SolarDepths {
                to_segments,
                to_surface,
            })
        }
    };

    warn_skipped(&skipped);
    Ok(PathDepths {
        line_of_sight,
        solar,
    })
}

fn warn_skipped(skipped: &BTreeSet<Species>) {
    for species in skipped {
        warn!("no usable coefficients for {species}, its absorption is ignored");
    }
}

/// Depths for one bin: (extinction, scattering, aerosol scattering) per
/// segment, plus any species skipped under the ignore policy.
type BinDepths = (SmallVec<[[f64; 3]; 64]>, SmallVec<[Species; 4]>);

fn integrate_segments(
    segments: &[PathSegment],
    profile: &AtmosphericProfile,
    table: &CoefficientTable,
    grid: &SpectralGrid,
    config: &RtmConfig,
    skipped: &mut BTreeSet<Species>,
) -> Result<OpticalDepths, RtmError> {
    if segments.iter().any(|segment| segment.layer >= profile.len()) {
        return Err(RtmError::InconsistentInputs);
    }
    let aerosol = AerosolOptics::from_model(config.aerosol);
    let surface = f64::from(profile.surface_altitude());

    let mut results: Vec<Result<BinDepths, TableLookupError>> = Vec::with_capacity(grid.len());
    (0..grid.len())
        .into_par_iter()
        .map(|bin| {
            let wavenumber = grid.wavenumber(bin);
            let mut depths = SmallVec::with_capacity(segments.len());
            let mut bin_skipped = SmallVec::new();
            for segment in segments {
                depths.push(segment_depth(
                    segment,
                    profile,
                    table,
                    wavenumber,
                    aerosol.as_ref(),
                    surface,
                    config.missing_species,
                    &mut bin_skipped,
                )?);
            }
            Ok((depths, bin_skipped))
        })
        .collect_into_vec(&mut results);

    let shape = (grid.len(), segments.len());
    let mut extinction = Array2::zeros(shape);
    let mut scattering = Array2::zeros(shape);
    let mut aerosol_scattering = Array2::zeros(shape);

    for (bin, result) in results.into_iter().enumerate() {
        let (depths, bin_skipped) = result?;
        skipped.extend(bin_skipped);
        for (segment, [ext, sca, aer]) in depths.into_iter().enumerate() {
            extinction[[bin, segment]] = ext;
            scattering[[bin, segment]] = sca;
            aerosol_scattering[[bin, segment]] = aer;
        }
    }

    debug!(
        "integrated {} segments over {} bins",
        segments.len(),
        grid.len()
    );

    Ok(OpticalDepths {
        extinction,
        scattering,
        aerosol_scattering,
    })
}

/// Extinction, scattering, and aerosol scattering depth of one segment.
#[allow(clippy::too_many_arguments)]
fn segment_depth(
    segment: &PathSegment,
    profile: &AtmosphericProfile,
    table: &CoefficientTable,
    wavenumber: f64,
    aerosol: Option<&AerosolOptics>,
    surface: f64,
    policy: MissingSpecies,
    skipped: &mut SmallVec<[Species; 4]>,
) -> Result<[f64; 3], TableLookupError> {
    let layer = &profile.layers()[segment.layer];
    let pressure = f64::from(layer.pressure);
    let temperature = f64::from(layer.temperature);

    // Species in their natural order so the sum is reproducible
    let mut absorption = 0.0;
    for (&species, &density) in &layer.densities {
        if density <= 0.0 {
            continue;
        }
        match table.lookup(species, wavenumber, pressure, temperature) {
            Ok(k) => absorption += k * density,
            Err(_) if policy == MissingSpecies::Ignore => {
                if !skipped.contains(&species) {
                    skipped.push(species);
                }
            }
            Err(err) => return Err(err),
        }
    }
    let absorption = absorption * segment.length * KM_TO_CM;

    let rayleigh =
        rayleigh_extinction(wavenumber, layer.pressure, layer.temperature) * segment.length;
    let (aerosol_extinction, aerosol_scattering) = aerosol.map_or((0.0, 0.0), |optics| {
        let extinction = optics.extinction(wavenumber, segment.altitude - surface) * segment.length;
        (extinction, extinction * optics.single_scatter_albedo)
    });

    Ok([
        absorption + rayleigh + aerosol_extinction,
        rayleigh + aerosol_scattering,
        aerosol_scattering,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AerosolModel;
    use crate::rtm::{load_profile, resolve_path, ModelAtmosphere, PathGeometry, ProfileSource};
    use approx::assert_relative_eq;

    fn setup(zenith_angle: f32) -> (AtmosphericProfile, Vec<PathSegment>, SpectralGrid) {
        let profile =
            load_profile(ProfileSource::Model(ModelAtmosphere::MidLatitudeSummer)).unwrap();
        let geometry = PathGeometry::ObserverToSpace {
            observer_altitude: 0.0,
            zenith_angle,
        };
        let path = resolve_path(&profile, &geometry, &RtmConfig::default()).unwrap();
        let grid = SpectralGrid::new(2000.0, 2500.0, 20.0).unwrap();
        (profile, path.line_of_sight, grid)
    }

    #[test]
    fn shapes_and_bounds() {
        let (profile, segments, grid) = setup(0.0);
        let table = CoefficientTable::builtin().unwrap();
        let depths = integrate(&segments, &profile, table, &grid, &RtmConfig::default()).unwrap();
        assert_eq!(depths.num_bins(), 26);
        assert_eq!(depths.num_segments(), segments.len());
        assert!(depths.extinction.iter().all(|&x| x >= 0.0 && x.is_finite()));
        for bin in 0..depths.num_bins() {
            let t = depths.transmittance(bin);
            assert!((0.0..=1.0).contains(&t));
        }
        // Scattering never exceeds extinction
        assert!(depths
            .scattering
            .iter()
            .zip(depths.extinction.iter())
            .all(|(s, e)| s <= e));
    }

    #[test]
    fn empty_path_is_transparent() {
        let (profile, _, grid) = setup(0.0);
        let table = CoefficientTable::builtin().unwrap();
        let depths = integrate(&[], &profile, table, &grid, &RtmConfig::default()).unwrap();
        assert_eq!(depths.num_segments(), 0);
        assert_eq!(depths.transmittance(0), 1.0);
    }

    #[test]
    fn segment_outside_the_profile_is_an_error() {
        let (profile, _, grid) = setup(0.0);
        let table = CoefficientTable::builtin().unwrap();
        let stray = PathSegment {
            layer: profile.len(),
            length: 1.0,
            zenith_angle: 0.0,
            altitude: 0.5,
        };
        let result = integrate(&[stray], &profile, table, &grid, &RtmConfig::default());
        assert!(matches!(result, Err(RtmError::InconsistentInputs)));
    }

    #[test]
    fn absorption_matches_hand_sum() {
        let (profile, segments, grid) = setup(0.0);
        let table = CoefficientTable::builtin().unwrap();
        let depths = integrate(&segments, &profile, table, &grid, &RtmConfig::default()).unwrap();

        let layer = &profile.layers()[0];
        let wavenumber = grid.wavenumber(5);
        let absorption: f64 = layer
            .densities
            .iter()
            .map(|(&species, &density)| {
                table
                    .lookup(
                        species,
                        wavenumber,
                        f64::from(layer.pressure),
                        f64::from(layer.temperature),
                    )
                    .unwrap()
                    * density
            })
            .sum::<f64>()
            * segments[0].length
            * KM_TO_CM;
        let expected = absorption + depths.scattering[[5, 0]];
        assert_relative_eq!(depths.extinction[[5, 0]], expected, max_relative = 1e-12);
    }

    #[test]
    fn slant_paths_are_more_opaque() {
        let table = CoefficientTable::builtin().unwrap();
        let config = RtmConfig::default();
        let (profile, vertical, grid) = setup(0.0);
        let (_, slant, _) = setup(60.0);
        let vertical = integrate(&vertical, &profile, table, &grid, &config).unwrap();
        let slant = integrate(&slant, &profile, table, &grid, &config).unwrap();
        for bin in 0..grid.len() {
            assert!(slant.total(bin) > vertical.total(bin));
            // Roughly the secant of 60°
            assert_relative_eq!(
                slant.total(bin) / vertical.total(bin),
                2.0,
                max_relative = 0.03
            );
        }
    }

    #[test]
    fn aerosols_add_extinction() {
        let table = CoefficientTable::builtin().unwrap();
        let (profile, segments, grid) = setup(0.0);
        let clear = integrate(&segments, &profile, table, &grid, &RtmConfig::default()).unwrap();
        let hazy = integrate(
            &segments,
            &profile,
            table,
            &grid,
            &RtmConfig::default().with_aerosol(AerosolModel::rural_default()),
        )
        .unwrap();
        for bin in 0..grid.len() {
            assert!(hazy.total(bin) > clear.total(bin));
            assert!(hazy.aerosol_scattering[[bin, 0]] > 0.0);
            assert_eq!(clear.aerosol_scattering[[bin, 0]], 0.0);
        }
    }

    #[test]
    fn missing_species_policy() {
        let small = r#"{
            "format": "band-model-table",
            "version": 1,
            "start": 2000.0,
            "stop": 2500.0,
            "bin_width": 20.0,
            "pressure_buckets": [1.0, 1013.25],
            "temperature_buckets": [200.0, 300.0],
            "entries": [
                {"species": "CO2", "wavenumber": 2300.0, "k": [[1e-19, 1e-19], [1e-19, 1e-19]]}
            ]
        }"#;
        let table = CoefficientTable::from_json_str(small).unwrap();
        let (profile, segments, grid) = setup(0.0);

        let err = integrate(&segments, &profile, &table, &grid, &RtmConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            RtmError::TableLookup(TableLookupError::UnknownSpecies(_))
        ));

        let config = RtmConfig::default().with_missing_species(MissingSpecies::Ignore);
        let depths = integrate(&segments, &profile, &table, &grid, &config).unwrap();
        // Only CO2 absorbs, and only in its one bin
        let co2_bin = 15;
        assert_relative_eq!(grid.wavenumber(co2_bin), 2300.0);
        assert!(depths.total(co2_bin) > 1.0);
        assert!(depths.total(0) < 1e-3);
    }
}
