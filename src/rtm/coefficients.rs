//! Band-model absorption coefficient tables.
//!
//! A table holds absorption cross-sections (cm²/molecule) per species and
//! spectral bin, tabulated on a grid of pressure and temperature buckets.
//! Lookups interpolate bilinearly between buckets and clamp outside them.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::OnceLock;

use log::{debug, info};
use ndarray::Array2;
use serde::Deserialize;

use super::profile::Species;
use crate::error::{DataError, TableLookupError};

/// Value of the `format` field this reader understands.
const TABLE_FORMAT: &str = "band-model-table";
/// Table format version this reader understands.
const TABLE_VERSION: u32 = 1;

/// The table that ships with the crate.
const BUILTIN_TABLE: &str = include_str!("../../data/band_coefficients.json");

#[derive(Deserialize)]
struct TableDocument {
    format: String,
    version: u32,
    #[serde(default)]
    description: String,
    start: f64,
    stop: f64,
    bin_width: f64,
    pressure_buckets: Vec<f64>,
    temperature_buckets: Vec<f64>,
    entries: Vec<EntryDocument>,
}

#[derive(Deserialize)]
struct EntryDocument {
    species: Species,
    wavenumber: f64,
    k: Vec<Vec<f64>>,
}

/// Immutable band-model coefficient table.
#[derive(Debug, Clone)]
pub struct CoefficientTable {
    description: String,
    start: f64,
    bin_width: f64,
    num_bins: usize,
    /// Pressure buckets in hPa, strictly increasing.
    pressure_buckets: Vec<f64>,
    /// Temperature buckets in K, strictly increasing.
    temperature_buckets: Vec<f64>,
    /// Species with at least one entry.
    species: BTreeSet<Species>,
    /// Coefficients keyed by (species, bin), dimensioned as (pressure, temperature).
    entries: HashMap<(Species, usize), Array2<f64>>,
}

impl CoefficientTable {
    /// The built-in table, parsed on first use and shared afterwards.
    pub fn builtin() -> Result<&'static CoefficientTable, DataError> {
        static TABLE: OnceLock<Result<CoefficientTable, String>> = OnceLock::new();
        TABLE
            .get_or_init(|| {
                debug!("parsing built-in coefficient table");
                CoefficientTable::from_json_str(BUILTIN_TABLE).map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|e| DataError::Malformed(e.clone()))
    }

    /// Read a table from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let table = Self::from_json_str(&text)?;
        info!(
            "loaded coefficient table {} ({} entries)",
            path.display(),
            table.entries.len()
        );
        Ok(table)
    }

    /// Parse and validate a table from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        let doc: TableDocument = serde_json::from_str(json)?;

        if doc.format != TABLE_FORMAT {
            return Err(DataError::UnsupportedFormat(doc.format));
        }
        if doc.version != TABLE_VERSION {
            return Err(DataError::UnsupportedFormat(format!(
                "version {}",
                doc.version
            )));
        }
        if !(doc.bin_width > 0.0 && doc.bin_width.is_finite()) {
            return Err(DataError::Malformed(format!(
                "bin width {}",
                doc.bin_width
            )));
        }
        if !(doc.start.is_finite() && doc.stop.is_finite() && doc.start <= doc.stop) {
            return Err(DataError::Malformed(format!(
                "spectral range {}..{}",
                doc.start, doc.stop
            )));
        }
        check_buckets("pressure", &doc.pressure_buckets)?;
        check_buckets("temperature", &doc.temperature_buckets)?;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let num_bins = ((doc.stop - doc.start) / doc.bin_width).round() as usize + 1;
        let shape = (doc.pressure_buckets.len(), doc.temperature_buckets.len());

        let mut table = Self {
            description: doc.description,
            start: doc.start,
            bin_width: doc.bin_width,
            num_bins,
            pressure_buckets: doc.pressure_buckets,
            temperature_buckets: doc.temperature_buckets,
            species: BTreeSet::new(),
            entries: HashMap::with_capacity(doc.entries.len()),
        };

        for entry in doc.entries {
            let bin = table
                .bin_index(entry.wavenumber)
                .filter(|&bin| {
                    (table.bin_center(bin) - entry.wavenumber).abs() <= 1e-6 * table.bin_width
                })
                .ok_or_else(|| {
                    DataError::Malformed(format!(
                        "{} entry at {} cm⁻¹ is not on the table grid",
                        entry.species, entry.wavenumber
                    ))
                })?;

            if entry.k.len() != shape.0 || entry.k.iter().any(|row| row.len() != shape.1) {
                return Err(DataError::Malformed(format!(
                    "{} entry at {} cm⁻¹ is not {}x{}",
                    entry.species, entry.wavenumber, shape.0, shape.1
                )));
            }
            if entry.k.iter().flatten().any(|k| !k.is_finite() || *k < 0.0) {
                return Err(DataError::Malformed(format!(
                    "{} entry at {} cm⁻¹ has a negative or non-finite coefficient",
                    entry.species, entry.wavenumber
                )));
            }

            let slab = Array2::from_shape_fn(shape, |(p, t)| entry.k[p][t]);
            if table.entries.insert((entry.species, bin), slab).is_some() {
                return Err(DataError::Malformed(format!(
                    "duplicate {} entry at {} cm⁻¹",
                    entry.species, entry.wavenumber
                )));
            }
            table.species.insert(entry.species);
        }

        Ok(table)
    }

    /// Free-form description from the table file.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Width of a spectral bin in cm⁻¹.
    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    /// Lowest and highest bin centers in cm⁻¹.
    pub fn spectral_range(&self) -> (f64, f64) {
        (self.start, self.bin_center(self.num_bins - 1))
    }

    /// Whether the table has any coefficients for `species`.
    pub fn has_species(&self, species: Species) -> bool {
        self.species.contains(&species)
    }

    /// Species present in the table.
    pub fn species(&self) -> impl Iterator<Item = Species> + '_ {
        self.species.iter().copied()
    }

    /// Absorption cross-section in cm²/molecule for `species` at `wavenumber`
    /// (cm⁻¹), `pressure` (hPa), and `temperature` (K).
    ///
    /// A bin inside the table's range with no entry for a known species is
    /// transparent and returns zero.
    pub fn lookup(
        &self,
        species: Species,
        wavenumber: f64,
        pressure: f64,
        temperature: f64,
    ) -> Result<f64, TableLookupError> {
        if !self.has_species(species) {
            return Err(TableLookupError::UnknownSpecies(species));
        }
        let bin = self
            .bin_index(wavenumber)
            .ok_or(TableLookupError::OutOfRange {
                species,
                wavenumber,
            })?;

        Ok(self
            .entries
            .get(&(species, bin))
            .map_or(0.0, |slab| self.interpolate(slab, pressure, temperature)))
    }

    fn bin_center(&self, bin: usize) -> f64 {
        self.start + bin as f64 * self.bin_width
    }

    /// Nearest bin to `wavenumber`, or `None` if it is more than half a bin
    /// outside the table.
    fn bin_index(&self, wavenumber: f64) -> Option<usize> {
        let offset = (wavenumber - self.start) / self.bin_width;
        if !offset.is_finite() || offset < -0.5 || offset > self.num_bins as f64 - 0.5 {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bin = offset.round().max(0.0) as usize;
        Some(bin.min(self.num_bins - 1))
    }

    fn interpolate(&self, slab: &Array2<f64>, pressure: f64, temperature: f64) -> f64 {
        let (p0, p1, fp) = bracket(&self.pressure_buckets, pressure);
        let (t0, t1, ft) = bracket(&self.temperature_buckets, temperature);

        (1.0 - fp) * ((1.0 - ft) * slab[[p0, t0]] + ft * slab[[p0, t1]])
            + fp * ((1.0 - ft) * slab[[p1, t0]] + ft * slab[[p1, t1]])
    }
}

/// Find the buckets bracketing `x` and the fractional position between them.
/// Values outside the buckets clamp to the nearest edge.
fn bracket(buckets: &[f64], x: f64) -> (usize, usize, f64) {
    let last = buckets.len() - 1;
    if x.is_nan() || x <= buckets[0] {
        return (0, 0, 0.0);
    }
    if x >= buckets[last] {
        return (last, last, 0.0);
    }
    let hi = buckets.partition_point(|&b| b <= x);
    let lo = hi - 1;
    (lo, hi, (x - buckets[lo]) / (buckets[hi] - buckets[lo]))
}

fn check_buckets(name: &str, buckets: &[f64]) -> Result<(), DataError> {
    if buckets.is_empty() {
        return Err(DataError::Malformed(format!("no {name} buckets")));
    }
    if buckets.iter().any(|b| !b.is_finite() || *b <= 0.0)
        || buckets.windows(2).any(|w| w[1] <= w[0])
    {
        return Err(DataError::Malformed(format!(
            "{name} buckets must be positive and strictly increasing"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SMALL_TABLE: &str = r#"{
        "format": "band-model-table",
        "version": 1,
        "start": 2000.0,
        "stop": 2100.0,
        "bin_width": 20.0,
        "pressure_buckets": [100.0, 1000.0],
        "temperature_buckets": [200.0, 300.0],
        "entries": [
            {"species": "CO2", "wavenumber": 2040.0, "k": [[1.0, 2.0], [3.0, 4.0]]},
            {"species": "CO", "wavenumber": 2100.0, "k": [[5.0, 5.0], [5.0, 5.0]]}
        ]
    }"#;

    fn small() -> CoefficientTable {
        CoefficientTable::from_json_str(SMALL_TABLE).unwrap()
    }

    #[test]
    fn species_lists_what_the_table_holds() {
        let listed: Vec<_> = small().species().collect();
        assert_eq!(listed, [Species::CO2, Species::CO]);
        assert!(!small().has_species(Species::H2O));

        let builtin: Vec<_> = CoefficientTable::builtin().unwrap().species().collect();
        assert_eq!(builtin, Species::ALL);
    }

    #[test]
    fn exact_bucket_values() {
        let table = small();
        assert_eq!(table.lookup(Species::CO2, 2040.0, 100.0, 200.0), Ok(1.0));
        assert_eq!(table.lookup(Species::CO2, 2040.0, 100.0, 300.0), Ok(2.0));
        assert_eq!(table.lookup(Species::CO2, 2040.0, 1000.0, 200.0), Ok(3.0));
        assert_eq!(table.lookup(Species::CO2, 2040.0, 1000.0, 300.0), Ok(4.0));
    }

    #[test]
    fn bilinear_midpoint() {
        let k = small()
            .lookup(Species::CO2, 2040.0, 550.0, 250.0)
            .unwrap();
        assert_relative_eq!(k, 2.5);

        let k = small()
            .lookup(Species::CO2, 2040.0, 325.0, 200.0)
            .unwrap();
        assert_relative_eq!(k, 1.5);
    }

    #[test]
    fn clamps_outside_buckets() {
        let table = small();
        assert_eq!(table.lookup(Species::CO2, 2040.0, 1.0, 100.0), Ok(1.0));
        assert_eq!(table.lookup(Species::CO2, 2040.0, 5000.0, 400.0), Ok(4.0));
    }

    #[test]
    fn nearest_bin() {
        let table = small();
        assert_eq!(table.lookup(Species::CO2, 2049.0, 100.0, 200.0), Ok(1.0));
        // Empty bin for a known species is transparent
        assert_eq!(table.lookup(Species::CO2, 2060.0, 100.0, 200.0), Ok(0.0));
        // Half a bin past the end still maps to the last bin
        assert_eq!(table.lookup(Species::CO, 2109.0, 100.0, 200.0), Ok(5.0));
    }

    #[test]
    fn lookup_errors() {
        let table = small();
        assert_eq!(
            table.lookup(Species::H2O, 2040.0, 100.0, 200.0),
            Err(TableLookupError::UnknownSpecies(Species::H2O))
        );
        assert_eq!(
            table.lookup(Species::CO2, 2500.0, 100.0, 200.0),
            Err(TableLookupError::OutOfRange {
                species: Species::CO2,
                wavenumber: 2500.0
            })
        );
    }

    #[test]
    fn rejects_bad_documents() {
        let wrong_version = SMALL_TABLE.replace("\"version\": 1", "\"version\": 2");
        assert!(matches!(
            CoefficientTable::from_json_str(&wrong_version),
            Err(DataError::UnsupportedFormat(_))
        ));

        let off_grid = SMALL_TABLE.replace("2040.0", "2045.0");
        assert!(matches!(
            CoefficientTable::from_json_str(&off_grid),
            Err(DataError::Malformed(_))
        ));

        let bad_shape = SMALL_TABLE.replace("[[1.0, 2.0], [3.0, 4.0]]", "[[1.0, 2.0]]");
        assert!(matches!(
            CoefficientTable::from_json_str(&bad_shape),
            Err(DataError::Malformed(_))
        ));

        let negative = SMALL_TABLE.replace("[[1.0, 2.0]", "[[-1.0, 2.0]");
        assert!(matches!(
            CoefficientTable::from_json_str(&negative),
            Err(DataError::Malformed(_))
        ));

        assert!(matches!(
            CoefficientTable::from_json_str("{"),
            Err(DataError::Parse(_))
        ));
    }

    #[test]
    fn builtin_table_loads() {
        let table = CoefficientTable::builtin().unwrap();
        assert_eq!(table.bin_width(), 20.0);
        assert_eq!(table.spectral_range(), (500.0, 5000.0));
        for species in Species::ALL {
            assert!(table.has_species(species), "{species}");
        }
        // Strong CO2 band near 2349 cm⁻¹
        let k = table
            .lookup(Species::CO2, 2340.0, 1013.25, 296.0)
            .unwrap();
        assert!(k > 1e-19);
        // Higher pressure broadens the band
        let k_low = table.lookup(Species::CO2, 2340.0, 100.0, 296.0).unwrap();
        assert!(k_low < k);
    }
}
