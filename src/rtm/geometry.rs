//! Slant-path geometry through a spherical, layered atmosphere.
//!
//! Paths are traced from the observer outward. Near-vertical paths use the
//! curved-earth secant law; paths close to the horizon (or beyond it) are
//! traced through spherical shells with Snell's law, which keeps limb paths
//! finite.

use log::debug;

use super::profile::{AtmosphericLayer, AtmosphericProfile};
use crate::config::RtmConfig;
use crate::error::GeometryError;

/// Mean radius of the Earth in km
pub(crate) const R_EARTH: f64 = 6371.23;

/// Viewing geometry for a computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathGeometry {
    /// Observer looking along a zenith angle toward space (below 90°) or
    /// toward the surface/limb (above 90°).
    ObserverToSpace {
        /// Observer altitude in km
        observer_altitude: f32,
        /// Viewing zenith angle in degrees, 0 to 180
        zenith_angle: f32,
    },
    /// Same line of sight, plus the sun as a source.
    SolarRadiance {
        /// Observer altitude in km
        observer_altitude: f32,
        /// Viewing zenith angle in degrees, 0 to 180
        zenith_angle: f32,
        /// Solar zenith angle in degrees, 0 to 180
        solar_zenith: f32,
        /// Azimuth of the sun relative to the viewing direction, in degrees
        relative_azimuth: f32,
    },
}

impl PathGeometry {
    /// Observer altitude in km.
    pub fn observer_altitude(&self) -> f32 {
        match *self {
            PathGeometry::ObserverToSpace {
                observer_altitude, ..
            }
            | PathGeometry::SolarRadiance {
                observer_altitude, ..
            } => observer_altitude,
        }
    }

    /// Viewing zenith angle in degrees.
    pub fn zenith_angle(&self) -> f32 {
        match *self {
            PathGeometry::ObserverToSpace { zenith_angle, .. }
            | PathGeometry::SolarRadiance { zenith_angle, .. } => zenith_angle,
        }
    }
}

/// One traversal of a layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSegment {
    /// Index of the layer in the profile.
    pub layer: usize,
    /// Path length inside the layer in km.
    pub length: f64,
    /// Local zenith angle at the point where the path enters, in degrees.
    pub zenith_angle: f64,
    /// Altitude of the midpoint of the traversal in km.
    pub altitude: f64,
}

/// Paths from the sun to points along the line of sight.
#[derive(Debug, Clone, PartialEq)]
pub struct SolarLegs {
    /// Solar zenith angle in degrees.
    pub solar_zenith: f64,
    /// Cosine of the angle between the sun and viewing directions.
    pub cos_scattering_angle: f64,
    /// Path from each line-of-sight segment to the sun, or `None` when the
    /// sun is blocked by the Earth at that point.
    pub to_segments: Vec<Option<Vec<PathSegment>>>,
    /// Path from the surface point to the sun, when the line of sight ends on
    /// the ground and the sun is above the horizon.
    pub to_surface: Option<Vec<PathSegment>>,
}

/// Result of resolving a geometry against a profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath {
    /// Layer traversals from the observer outward.
    pub line_of_sight: Vec<PathSegment>,
    /// Whether the line of sight terminates on the surface.
    pub ends_at_surface: bool,
    /// Solar legs, for solar geometries.
    pub solar: Option<SolarLegs>,
}

impl ResolvedPath {
    /// Total line-of-sight path length in km.
    pub fn total_length(&self) -> f64 {
        self.line_of_sight.iter().map(|s| s.length).sum()
    }
}

/// Convert a geometry into ordered layer traversals.
pub fn resolve_path(
    profile: &AtmosphericProfile,
    geometry: &PathGeometry,
    config: &RtmConfig,
) -> Result<ResolvedPath, GeometryError> {
    let observer_altitude = geometry.observer_altitude();
    let zenith = geometry.zenith_angle();

    check_angle("zenith angle", zenith)?;
    if !observer_altitude.is_finite() || observer_altitude < profile.surface_altitude() {
        return Err(GeometryError::InvalidAltitude(observer_altitude));
    }

    let threshold = f64::from(config.refraction_threshold_deg);
    let los = trace(
        profile,
        f64::from(observer_altitude),
        f64::from(zenith),
        threshold,
    );

    let solar = match *geometry {
        PathGeometry::ObserverToSpace { .. } => None,
        PathGeometry::SolarRadiance {
            solar_zenith,
            relative_azimuth,
            ..
        } => {
            check_angle("solar zenith angle", solar_zenith)?;
            if !relative_azimuth.is_finite() {
                return Err(GeometryError::InvalidAngle {
                    name: "relative azimuth",
                    value: relative_azimuth,
                });
            }
            Some(solar_legs(
                profile,
                &los,
                f64::from(zenith),
                f64::from(solar_zenith),
                f64::from(relative_azimuth),
                threshold,
            ))
        }
    };

    debug!(
        "resolved path: {} segments, {:.3} km, ends at surface: {}",
        los.segments.len(),
        los.segments.iter().map(|s| s.length).sum::<f64>(),
        los.hits_surface
    );

    Ok(ResolvedPath {
        line_of_sight: los.segments,
        ends_at_surface: los.hits_surface,
        solar,
    })
}

fn check_angle(name: &'static str, value: f32) -> Result<(), GeometryError> {
    if value.is_finite() && (0.0..=180.0).contains(&value) {
        Ok(())
    } else {
        Err(GeometryError::InvalidAngle { name, value })
    }
}

fn solar_legs(
    profile: &AtmosphericProfile,
    los: &Trace,
    view_zenith: f64,
    solar_zenith: f64,
    relative_azimuth: f64,
    threshold: f64,
) -> SolarLegs {
    let (view, sun) = (view_zenith.to_radians(), solar_zenith.to_radians());
    let cos_scattering_angle = (view.cos() * sun.cos()
        + view.sin() * sun.sin() * relative_azimuth.to_radians().cos())
    .clamp(-1.0, 1.0);

    let to_segments = los
        .segments
        .iter()
        .map(|segment| {
            let leg = trace(profile, segment.altitude, solar_zenith, threshold);
            (!leg.hits_surface).then_some(leg.segments)
        })
        .collect();

    let to_surface = (los.hits_surface && solar_zenith < 90.0).then(|| {
        trace(
            profile,
            f64::from(profile.surface_altitude()),
            solar_zenith,
            threshold,
        )
        .segments
    });

    SolarLegs {
        solar_zenith,
        cos_scattering_angle,
        to_segments,
        to_surface,
    }
}

#[derive(Debug, Default)]
struct Trace {
    segments: Vec<PathSegment>,
    hits_surface: bool,
}

/// Refractive index of air in a layer.
fn refractive_index(layer: &AtmosphericLayer) -> f64 {
    1.0 + 2.87e-4 * (f64::from(layer.pressure) / 1013.25) * (288.15 / f64::from(layer.temperature))
}

fn radius(altitude: f32) -> f64 {
    R_EARTH + f64::from(altitude)
}

/// Trace a ray from `altitude` (km) along `zenith` (degrees).
fn trace(profile: &AtmosphericProfile, altitude: f64, zenith: f64, threshold: f64) -> Trace {
    let top = f64::from(profile.top_altitude());
    let surface = f64::from(profile.surface_altitude());

    // Above the atmosphere the ray is straight; move the start to where it
    // enters the top of the profile
    let (altitude, zenith) = if altitude > top {
        let sin_top = (R_EARTH + altitude) * zenith.to_radians().sin() / (R_EARTH + top);
        if zenith <= 90.0 || sin_top >= 1.0 {
            return Trace::default();
        }
        (top, 180.0 - sin_top.asin().to_degrees())
    } else {
        (altitude, zenith)
    };

    if zenith > 90.0 && altitude <= surface {
        return Trace {
            segments: Vec::new(),
            hits_surface: true,
        };
    }

    if zenith.min(180.0 - zenith) <= threshold {
        if let Some(trace) = secant_trace(profile, altitude, zenith) {
            return trace;
        }
    }
    refracted_trace(profile, altitude, zenith)
}

/// Curved-earth secant law, evaluated at the midpoint of each traversal.
///
/// Returns `None` when the approximation breaks down (a downward ray too
/// close to grazing).
fn secant_trace(profile: &AtmosphericProfile, altitude: f64, zenith: f64) -> Option<Trace> {
    let r0 = R_EARTH + altitude;
    let (sin0, cos0) = zenith.to_radians().sin_cos();
    let cos_sq = cos0.powi(2);
    let upward = zenith <= 90.0;

    let local_zenith = |z: f64| {
        let angle = (r0 * sin0 / (R_EARTH + z)).min(1.0).asin().to_degrees();
        if upward {
            angle
        } else {
            180.0 - angle
        }
    };

    let mut segments = Vec::new();
    let mut visit = |index: usize, lo: f64, hi: f64| -> Option<()> {
        if hi <= lo {
            return Some(());
        }
        let mid = 0.5 * (lo + hi);
        // Differential slant height at the midpoint
        let delta = (mid - altitude) / r0;
        let denominator = cos_sq + delta * (2.0 + delta);
        if denominator <= 1e-6 {
            return None;
        }
        let dsdh = (1.0 + delta) / denominator.sqrt();
        segments.push(PathSegment {
            layer: index,
            length: (hi - lo) * dsdh,
            zenith_angle: local_zenith(if upward { lo } else { hi }),
            altitude: mid,
        });
        Some(())
    };

    let layers = profile.layers();
    if upward {
        for (index, layer) in layers.iter().enumerate() {
            visit(index, f64::from(layer.bottom).max(altitude), f64::from(layer.top))?;
        }
    } else {
        for (index, layer) in layers.iter().enumerate().rev() {
            visit(index, f64::from(layer.bottom), f64::from(layer.top).min(altitude))?;
        }
    }

    Some(Trace {
        segments,
        hits_surface: !upward,
    })
}

/// Ray tracing through homogeneous spherical shells, conserving `n r sinθ`.
fn refracted_trace(profile: &AtmosphericProfile, altitude: f64, zenith: f64) -> Trace {
    let layers = profile.layers();
    let r0 = R_EARTH + altitude;

    let n0 = layers
        .iter()
        .find(|layer| f64::from(layer.bottom) <= altitude && altitude <= f64::from(layer.top))
        .map_or(1.0, refractive_index);
    let invariant = n0 * r0 * zenith.to_radians().sin();

    let chord = |r: f64, p: f64| (r * r - p * p).max(0.0).sqrt();
    let entry_zenith = |p: f64, r: f64| (p / r).min(1.0).asin().to_degrees();

    let mut trace = Trace::default();
    let mut ascend_from = None;

    if zenith <= 90.0 {
        ascend_from = layers
            .iter()
            .position(|layer| f64::from(layer.top) > altitude)
            .map(|index| (index, r0));
    } else {
        let mut current = layers
            .iter()
            .rposition(|layer| f64::from(layer.bottom) < altitude);
        let mut r_in = current.map_or(r0, |index| r0.min(radius(layers[index].top)));

        while let Some(index) = current {
            let layer = &layers[index];
            let p = invariant / refractive_index(layer);
            let (r_bottom, r_top) = (radius(layer.bottom), radius(layer.top));
            let z_in = r_in - R_EARTH;

            if p >= r_bottom {
                // Tangent point inside this layer: down to it, then back up
                let p = p.min(r_in);
                let z_tangent = p - R_EARTH;
                trace.segments.push(PathSegment {
                    layer: index,
                    length: chord(r_in, p),
                    zenith_angle: 180.0 - entry_zenith(p, r_in),
                    altitude: 0.5 * (z_in + z_tangent),
                });
                trace.segments.push(PathSegment {
                    layer: index,
                    length: chord(r_top, p),
                    zenith_angle: 90.0,
                    altitude: 0.5 * (z_tangent + f64::from(layer.top)),
                });
                ascend_from = Some((index + 1, r_top));
                break;
            }

            trace.segments.push(PathSegment {
                layer: index,
                length: chord(r_in, p) - chord(r_bottom, p),
                zenith_angle: 180.0 - entry_zenith(p, r_in),
                altitude: 0.5 * (z_in + f64::from(layer.bottom)),
            });

            if index == 0 {
                trace.hits_surface = true;
                break;
            }
            current = Some(index - 1);
            r_in = radius(layers[index - 1].top);
        }
    }

    if let Some((start, r_start)) = ascend_from {
        for (index, layer) in layers.iter().enumerate().skip(start) {
            let r_a = radius(layer.bottom).max(r_start);
            let r_b = radius(layer.top);
            if r_b <= r_a {
                continue;
            }
            let p = invariant / refractive_index(layer);
            trace.segments.push(PathSegment {
                layer: index,
                length: chord(r_b, p) - chord(r_a, p),
                zenith_angle: entry_zenith(p, r_a),
                altitude: 0.5 * (r_a + r_b) - R_EARTH,
            });
        }
    }

    trace
}
