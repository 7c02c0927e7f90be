//! Python bindings
//!
//! NOTE: this module is the interface between Rust and Python. The real work
//! happens in the other modules, and they do not use `pyo3`, it's only used
//! here.

use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use numpy::{PyArray1, PyArray2, PyReadonlyArray1, ToPyArray};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use rayon::prelude::*;

use crate::config::RtmConfig;
use crate::error::{DataError, RtmError};
use crate::rtm::{
    load_profile, thread_pool, CoefficientTable, ModelAtmosphere, PathGeometry, ProfileSource,
    RadianceMode, RtmInputs, RtmOutputs, RtmParameters, SpectralGrid,
};
use crate::scenario::Scenario;

impl From<RtmError> for PyErr {
    fn from(e: RtmError) -> Self {
        match e {
            RtmError::Data(DataError::Io(_)) => PyIOError::new_err(e.to_string()),
            _ => PyValueError::new_err(e.to_string()),
        }
    }
}

/// A computed spectrum.
///
/// A container of numpy arrays, each dimensioned as (`num_bins`,).
#[pyclass]
struct Spectrum {
    wavenumber: Array1<f64>,
    transmittance: Array1<f64>,
    radiance: Array1<f64>,
    optical_depth: Array1<f64>,
}

#[pymethods]
impl Spectrum {
    #[getter]
    fn wavenumber<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.wavenumber.to_pyarray(py)
    }

    #[getter]
    fn transmittance<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.transmittance.to_pyarray(py)
    }

    #[getter]
    fn radiance<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.radiance.to_pyarray(py)
    }

    #[getter]
    fn optical_depth<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.optical_depth.to_pyarray(py)
    }
}

impl From<RtmOutputs> for Spectrum {
    fn from(outputs: RtmOutputs) -> Self {
        Self {
            wavenumber: Array1::from(outputs.wavenumber),
            transmittance: Array1::from(outputs.transmittance),
            radiance: Array1::from(outputs.radiance),
            optical_depth: Array1::from(outputs.optical_depth),
        }
    }
}

/// Spectra for several zenith angles.
///
/// `transmittance` and `radiance` are dimensioned as (`num_angles`,
/// `num_bins`).
#[pyclass]
struct ZenithSweep {
    wavenumber: Array1<f64>,
    transmittance: Array2<f64>,
    radiance: Array2<f64>,
}

#[pymethods]
impl ZenithSweep {
    #[getter]
    fn wavenumber<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.wavenumber.to_pyarray(py)
    }

    #[getter]
    fn transmittance<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.transmittance.to_pyarray(py)
    }

    #[getter]
    fn radiance<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.radiance.to_pyarray(py)
    }
}

fn parse_mode(mode: &str) -> PyResult<RadianceMode> {
    match mode {
        "thermal" => Ok(RadianceMode::Thermal),
        "solar" => Ok(RadianceMode::Solar),
        "direct_solar" => Ok(RadianceMode::DirectSolar),
        _ => Err(PyValueError::new_err(format!(
            "unknown radiance mode {mode:?}, expected \"thermal\", \"solar\", or \"direct_solar\""
        ))),
    }
}

fn parse_config(config: Option<&str>, num_threads: Option<usize>) -> Result<RtmConfig, RtmError> {
    let mut config = match config {
        Some(json) => RtmConfig::from_json_str(json)?,
        None => RtmConfig::default(),
    };
    if num_threads.is_some() {
        config.num_threads = num_threads;
    }
    Ok(config)
}

fn geometry(
    observer_altitude: f32,
    zenith_angle: f32,
    solar_zenith: Option<f32>,
    relative_azimuth: f32,
) -> PathGeometry {
    match solar_zenith {
        Some(solar_zenith) => PathGeometry::SolarRadiance {
            observer_altitude,
            zenith_angle,
            solar_zenith,
            relative_azimuth,
        },
        None => PathGeometry::ObserverToSpace {
            observer_altitude,
            zenith_angle,
        },
    }
}

/// Run one of the named reference scenarios ("obs2space" or "solarrad").
///
/// `config` is an optional JSON document with RTM settings. The number of
/// worker threads is controlled by `num_threads`. It must be a positive
/// integer, or `None` to automatically choose the number of threads.
#[pyfunction]
#[pyo3(signature = (name, config=None, num_threads=None))]
fn compute_scenario(
    py: Python<'_>,
    name: &str,
    config: Option<&str>,
    num_threads: Option<usize>,
) -> PyResult<Spectrum> {
    let scenario = Scenario::from_name(name)
        .ok_or_else(|| PyValueError::new_err(format!("unknown scenario {name:?}")))?;
    let config = parse_config(config, num_threads)?;
    let table = CoefficientTable::builtin().map_err(RtmError::from)?;

    let outputs = py.allow_threads(|| scenario.run(table, &config))?;
    Ok(outputs.into())
}

/// Compute transmittance and radiance along one path.
///
/// `model` is the model atmosphere number (1 tropical, 2 mid-latitude summer,
/// 3 mid-latitude winter, 4 sub-arctic summer, 5 sub-arctic winter, 6 US
/// standard).
///
/// `observer_altitude`: observer altitude in km
///
/// `zenith_angle`: viewing zenith angle in degrees, 180 is nadir
///
/// `start`, `stop`, `step`: spectral grid in cm⁻¹
///
/// `mode`: "thermal", "solar", or "direct_solar"
///
/// `solar_zenith`, `relative_azimuth`: sun position in degrees; required for
/// "solar" mode
///
/// `config`: optional JSON document with RTM settings
///
/// The returned spectrum's arrays are each dimensioned as (`num_bins`,).
#[pyfunction]
#[pyo3(signature = (model, observer_altitude, zenith_angle, start, stop, step, mode="thermal", solar_zenith=None, relative_azimuth=0.0, config=None, num_threads=None))]
#[allow(clippy::too_many_arguments)]
fn compute_spectrum(
    py: Python<'_>,
    model: i32,
    observer_altitude: f32,
    zenith_angle: f32,
    start: f64,
    stop: f64,
    step: f64,
    mode: &str,
    solar_zenith: Option<f32>,
    relative_azimuth: f32,
    config: Option<&str>,
    num_threads: Option<usize>,
) -> PyResult<Spectrum> {
    let mode = parse_mode(mode)?;
    let config = parse_config(config, num_threads)?;
    let grid = SpectralGrid::new(start, stop, step).map_err(RtmError::from)?;
    let profile = load_profile(ProfileSource::Model(
        ModelAtmosphere::from_index(model).map_err(RtmError::from)?,
    ))
    .map_err(RtmError::from)?;
    let inputs = RtmInputs::new(
        profile,
        geometry(observer_altitude, zenith_angle, solar_zenith, relative_azimuth),
        mode,
    )?;
    let table = CoefficientTable::builtin().map_err(RtmError::from)?;
    let pool = thread_pool(config.num_threads)?;
    let parameters = RtmParameters::new(grid, table, config);

    let outputs = py.allow_threads(|| pool.install(|| inputs.run(&parameters)))?;
    Ok(outputs.into())
}

/// Compute spectra for a batch of zenith angles.
///
/// `zenith_angles` has shape (`num_angles`,). The other inputs are as for
/// `compute_spectrum`, and apply to every angle.
///
/// The returned transmittance and radiance are each dimensioned as
/// (`num_angles`, `num_bins`).
#[pyfunction]
#[pyo3(signature = (model, observer_altitude, zenith_angles, start, stop, step, mode="thermal", solar_zenith=None, relative_azimuth=0.0, config=None, num_threads=None))]
#[allow(clippy::too_many_arguments)]
fn compute_zenith_sweep(
    py: Python<'_>,
    model: i32,
    observer_altitude: f32,
    zenith_angles: PyReadonlyArray1<'_, f32>,
    start: f64,
    stop: f64,
    step: f64,
    mode: &str,
    solar_zenith: Option<f32>,
    relative_azimuth: f32,
    config: Option<&str>,
    num_threads: Option<usize>,
) -> PyResult<ZenithSweep> {
    let mode = parse_mode(mode)?;
    let config = parse_config(config, num_threads)?;
    let grid = SpectralGrid::new(start, stop, step).map_err(RtmError::from)?;
    let profile = load_profile(ProfileSource::Model(
        ModelAtmosphere::from_index(model).map_err(RtmError::from)?,
    ))
    .map_err(RtmError::from)?;
    let table = CoefficientTable::builtin().map_err(RtmError::from)?;
    let pool = thread_pool(config.num_threads)?;
    let parameters = RtmParameters::new(grid, table, config);

    let zenith_angles = zenith_angles.as_slice()?;
    let num_angles = zenith_angles.len();
    let num_bins = grid.len();

    let mut results = Vec::new();

    // These atomics keep track of how many angles have finished and whether
    // it's time to cancel the computation or not
    let num_completed = AtomicUsize::new(0);
    let cancelled = AtomicBool::new(false);

    info!("Processing {num_angles} zenith angles over {num_bins} spectral bins");

    pool.in_place_scope(|s| -> Result<(), PyErr> {
        s.spawn(|_| {
            zenith_angles
                .par_iter()
                .map(|&zenith_angle| -> Result<_, RtmError> {
                    if cancelled.load(Ordering::Relaxed) {
                        return Err(RtmError::Cancelled);
                    }
                    let inputs = RtmInputs::new(
                        profile.clone(),
                        geometry(observer_altitude, zenith_angle, solar_zenith, relative_azimuth),
                        mode,
                    )?;
                    inputs.run(&parameters)
                })
                .inspect(|_| {
                    num_completed.fetch_add(1, Ordering::Relaxed);
                })
                .collect_into_vec(&mut results);
        });

        // The work is done in the thread pool, but back here in the main
        // thread, handle progress reporting and checking for early
        // cancellation
        while !cancelled.load(Ordering::Relaxed) {
            if let Err(e) = py.check_signals() {
                cancelled.store(true, Ordering::Relaxed);
                return Err(e);
            }

            let num_completed = num_completed.load(Ordering::Relaxed);
            if num_completed == num_angles {
                break;
            }
            let progress = num_completed as f32 / num_angles as f32 * 100.;
            info!("Completed {num_completed}/{num_angles} zenith angles ({progress:0.2}%)");

            py.allow_threads(|| {
                std::thread::sleep(Duration::from_secs(1));
            });
        }

        Ok(())
    })?;

    // Copy the intermediate results to the output arrays
    debug!("copying RTM output");
    let mut output = ZenithSweep {
        wavenumber: Array1::from(grid.wavenumbers()),
        transmittance: Array2::zeros([num_angles, num_bins]),
        radiance: Array2::zeros([num_angles, num_bins]),
    };
    results
        .into_iter()
        .enumerate()
        .try_for_each(|(index, rtm_output)| -> Result<_, RtmError> {
            let RtmOutputs {
                transmittance,
                radiance,
                ..
            } = rtm_output?;

            let rhs = ArrayView1::from(transmittance.as_slice());
            output
                .transmittance
                .index_axis_mut(Axis(0), index)
                .assign(&rhs);

            let rhs = ArrayView1::from(radiance.as_slice());
            output.radiance.index_axis_mut(Axis(0), index).assign(&rhs);

            Ok(())
        })?;

    Ok(output)
}

/// A Python module implemented in Rust.
#[pymodule]
fn band_rtm(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_function(wrap_pyfunction!(compute_scenario, m)?)?;
    m.add_function(wrap_pyfunction!(compute_spectrum, m)?)?;
    m.add_function(wrap_pyfunction!(compute_zenith_sweep, m)?)?;
    m.add_class::<Spectrum>()?;
    m.add_class::<ZenithSweep>()?;
    Ok(())
}
