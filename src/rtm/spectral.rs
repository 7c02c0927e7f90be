//! Spectral grids in wavenumber space.

use crate::error::SpectralError;

/// An evenly spaced wavenumber grid, in cm⁻¹.
///
/// Bins sit at `start + i * step` up to and including `stop` when it falls on
/// the grid (within a small tolerance).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralGrid {
    start: f64,
    stop: f64,
    step: f64,
    len: usize,
}

impl SpectralGrid {
    /// Create a grid from `start` to `stop` (both in cm⁻¹) with spacing `step`.
    pub fn new(start: f64, stop: f64, step: f64) -> Result<Self, SpectralError> {
        if !step.is_finite() || step <= 0.0 {
            return Err(SpectralError::InvalidStep(step));
        }
        if !start.is_finite() || !stop.is_finite() || start <= 0.0 || start >= stop {
            return Err(SpectralError::InvalidRange { start, stop });
        }

        // Truncation is intended; the small offset keeps an exact endpoint
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let len = ((stop - start) / step + 1e-6).floor() as usize + 1;

        Ok(Self {
            start,
            stop,
            step,
            len,
        })
    }

    /// Create a grid covering a wavelength range given in nm, with a
    /// wavenumber spacing `step` in cm⁻¹.
    ///
    /// The wavelength limits can be given in either order.
    pub fn from_wavelength_nm(
        first_nm: f64,
        second_nm: f64,
        step: f64,
    ) -> Result<Self, SpectralError> {
        if !(first_nm > 0.0 && second_nm > 0.0) {
            return Err(SpectralError::InvalidRange {
                start: first_nm,
                stop: second_nm,
            });
        }
        let a = 1e7 / first_nm;
        let b = 1e7 / second_nm;
        Self::new(a.min(b), a.max(b), step)
    }

    /// First wavenumber.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Requested upper limit (the last bin is at or below this).
    pub fn stop(&self) -> f64 {
        self.stop
    }

    /// Bin spacing.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; a valid grid has at least one bin.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Wavenumber of bin `index`.
    pub fn wavenumber(&self, index: usize) -> f64 {
        self.start + index as f64 * self.step
    }

    /// All bin wavenumbers, in order.
    pub fn wavenumbers(&self) -> Vec<f64> {
        (0..self.len).map(|i| self.wavenumber(i)).collect()
    }
}
