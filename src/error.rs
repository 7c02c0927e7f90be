//! Error types for the band-model RTM.

use crate::rtm::Species;

/// Possible RTM errors.
#[derive(Debug)]
pub enum RtmError {
    /// The atmospheric profile is unusable
    Profile(ProfileError),
    /// The path geometry is physically invalid
    Geometry(GeometryError),
    /// A coefficient lookup failed and missing species are not ignored
    TableLookup(TableLookupError),
    /// A data file (table, config, reference) could not be loaded
    Data(DataError),
    /// The spectral grid is invalid
    Spectral(SpectralError),
    /// The inputs don't have the expected shape(s)
    InconsistentInputs,
    /// The worker thread pool could not be created
    ThreadPool(String),
    /// The computation was cancelled before finishing
    Cancelled,
}

impl std::fmt::Display for RtmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RtmError::Profile(e) => write!(f, "invalid atmospheric profile: {e}"),
            RtmError::Geometry(e) => write!(f, "invalid path geometry: {e}"),
            RtmError::TableLookup(e) => write!(f, "coefficient lookup failed: {e}"),
            RtmError::Data(e) => write!(f, "couldn't load data file: {e}"),
            RtmError::Spectral(e) => write!(f, "invalid spectral grid: {e}"),
            RtmError::InconsistentInputs => write!(f, "inputs to RTM have the wrong shape"),
            RtmError::ThreadPool(e) => write!(f, "couldn't build worker pool: {e}"),
            RtmError::Cancelled => write!(f, "computation was cancelled"),
        }
    }
}

impl std::error::Error for RtmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RtmError::Profile(e) => Some(e),
            RtmError::Geometry(e) => Some(e),
            RtmError::TableLookup(e) => Some(e),
            RtmError::Data(e) => Some(e),
            RtmError::Spectral(e) => Some(e),
            RtmError::InconsistentInputs | RtmError::ThreadPool(_) | RtmError::Cancelled => None,
        }
    }
}

impl From<ProfileError> for RtmError {
    fn from(e: ProfileError) -> Self {
        RtmError::Profile(e)
    }
}

impl From<GeometryError> for RtmError {
    fn from(e: GeometryError) -> Self {
        RtmError::Geometry(e)
    }
}

impl From<TableLookupError> for RtmError {
    fn from(e: TableLookupError) -> Self {
        RtmError::TableLookup(e)
    }
}

impl From<DataError> for RtmError {
    fn from(e: DataError) -> Self {
        RtmError::Data(e)
    }
}

impl From<SpectralError> for RtmError {
    fn from(e: SpectralError) -> Self {
        RtmError::Spectral(e)
    }
}

/// Malformed or out-of-range atmospheric profile.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileError {
    /// The profile has no layers
    Empty,
    /// Layer `index` does not start above the previous layer, or its top is
    /// not above its bottom
    NonMonotonicAltitude {
        /// Offending layer index
        index: usize,
    },
    /// A number density is negative or not finite
    InvalidDensity {
        /// Offending layer index
        index: usize,
        /// Species with the bad density
        species: Species,
        /// The density value
        value: f64,
    },
    /// Pressure or temperature is not strictly positive and finite
    InvalidState {
        /// Offending layer index
        index: usize,
    },
    /// Model atmosphere number outside the built-in set
    UnknownModel(i32),
}

impl std::fmt::Display for ProfileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileError::Empty => write!(f, "profile has no layers"),
            ProfileError::NonMonotonicAltitude { index } => {
                write!(f, "altitudes are not strictly increasing at layer {index}")
            }
            ProfileError::InvalidDensity {
                index,
                species,
                value,
            } => write!(f, "layer {index} has invalid {species} density {value}"),
            ProfileError::InvalidState { index } => {
                write!(f, "layer {index} has non-positive pressure or temperature")
            }
            ProfileError::UnknownModel(model) => {
                write!(f, "model atmosphere {model} is not a built-in model (1-6)")
            }
        }
    }
}

impl std::error::Error for ProfileError {}

/// Physically invalid path angle/altitude combination.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A zenith angle is negative, above 180°, or not finite
    InvalidAngle {
        /// Which angle was rejected
        name: &'static str,
        /// The angle in degrees
        value: f32,
    },
    /// An altitude is negative, below the surface, or not finite
    InvalidAltitude(f32),
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::InvalidAngle { name, value } => {
                write!(f, "{name} of {value}° is outside [0°, 180°]")
            }
            GeometryError::InvalidAltitude(z) => {
                write!(f, "altitude {z} km is below the surface or not finite")
            }
        }
    }
}

impl std::error::Error for GeometryError {}

/// Requested species/bin is absent from the coefficient table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableLookupError {
    /// The table has no data at all for the species
    UnknownSpecies(Species),
    /// The wavenumber falls outside the table's spectral coverage
    OutOfRange {
        /// Species that was looked up
        species: Species,
        /// Requested wavenumber in cm⁻¹
        wavenumber: f64,
    },
}

impl TableLookupError {
    /// Species the failed lookup was for.
    pub fn species(&self) -> Species {
        match self {
            TableLookupError::UnknownSpecies(species) => *species,
            TableLookupError::OutOfRange { species, .. } => *species,
        }
    }
}

impl std::fmt::Display for TableLookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableLookupError::UnknownSpecies(species) => {
                write!(f, "no coefficients for {species}")
            }
            TableLookupError::OutOfRange {
                species,
                wavenumber,
            } => write!(
                f,
                "{wavenumber} cm⁻¹ is outside the table coverage for {species}"
            ),
        }
    }
}

impl std::error::Error for TableLookupError {}

/// Problems reading or validating a data file (coefficient table, config, or
/// reference spectrum).
#[derive(Debug)]
pub enum DataError {
    /// Reading the file failed
    Io(std::io::Error),
    /// The document is not valid JSON for the expected schema
    Parse(serde_json::Error),
    /// The `format` or `version` field is not supported
    UnsupportedFormat(String),
    /// Bucket, range, or entry dimensions are inconsistent
    Malformed(String),
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::Io(e) => write!(f, "{e}"),
            DataError::Parse(e) => write!(f, "{e}"),
            DataError::UnsupportedFormat(what) => write!(f, "unsupported format: {what}"),
            DataError::Malformed(what) => write!(f, "malformed data: {what}"),
        }
    }
}

impl std::error::Error for DataError {}

impl From<std::io::Error> for DataError {
    fn from(e: std::io::Error) -> Self {
        DataError::Io(e)
    }
}

impl From<serde_json::Error> for DataError {
    fn from(e: serde_json::Error) -> Self {
        DataError::Parse(e)
    }
}

/// Invalid spectral grid parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum SpectralError {
    /// The step is not strictly positive and finite
    InvalidStep(f64),
    /// `start` is not below `stop`, or a bound is not finite/positive
    InvalidRange {
        /// Requested start
        start: f64,
        /// Requested stop
        stop: f64,
    },
}

impl std::fmt::Display for SpectralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpectralError::InvalidStep(step) => write!(f, "step {step} must be positive"),
            SpectralError::InvalidRange { start, stop } => {
                write!(f, "range {start}..{stop} is empty or not finite")
            }
        }
    }
}

impl std::error::Error for SpectralError {}
