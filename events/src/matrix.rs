//! Matrix operations for flow cytometry compensation
//!
//! Provides CPU-based inversion and the event-by-channel product used by
//! compensation. Inversion goes through `nalgebra`'s LU decomposition; the
//! product is an `ndarray` matrix multiplication.

use nalgebra::DMatrix;
use ndarray::Array2;

use crate::error::{EventError, Result};

/// LU pivots with an absolute value at or below this are treated as zero
pub const DEFAULT_SINGULAR_TOLERANCE: f64 = 1e-12;

/// Matrix operations for compensation
pub struct MatrixOps;

impl MatrixOps {
    /// Invert a square matrix through its LU decomposition.
    ///
    /// # Errors
    /// - `EventError::DimensionMismatch` if the matrix is not square
    /// - `EventError::SingularMatrix` if an LU pivot falls below `tolerance`
    ///   or the decomposition has no inverse
    pub fn invert_matrix(matrix: &Array2<f64>, tolerance: f64) -> Result<Array2<f64>> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(EventError::dimension_mismatch(format!(
                "cannot invert a {}x{} matrix",
                rows, cols
            )));
        }
        let n = rows;
        if n == 0 {
            return Ok(Array2::zeros((0, 0)));
        }

        let values: Vec<f64> = matrix.iter().copied().collect();
        let lu = DMatrix::from_row_slice(n, n, &values).lu();

        let smallest = lu
            .u()
            .diagonal()
            .iter()
            .map(|p| p.abs())
            .fold(f64::INFINITY, f64::min);
        if !smallest.is_finite() || smallest <= tolerance {
            return Err(EventError::singular_matrix(format!(
                "smallest LU pivot is {:e}",
                smallest
            )));
        }

        let inverse = lu
            .try_inverse()
            .ok_or_else(|| EventError::singular_matrix("LU decomposition has no inverse"))?;
        Ok(Array2::from_shape_fn((n, n), |(i, j)| inverse[(i, j)]))
    }

    /// Whether every entry is within `tolerance` of the identity matrix
    pub fn is_identity(matrix: &Array2<f64>, tolerance: f64) -> bool {
        let (rows, cols) = matrix.dim();
        rows == cols
            && matrix.indexed_iter().all(|((i, j), &v)| {
                let expected = if i == j { 1.0 } else { 0.0 };
                (v - expected).abs() <= tolerance
            })
    }

    /// Multiply event rows by a channel matrix.
    ///
    /// Input: `channel_data` as `[n_channels][n_events]`, `matrix` `[n×n]`.
    /// The columns are laid out as an `[n_events × n_channels]` array and
    /// right-multiplied by `matrix`; the result comes back one vector per
    /// output channel.
    pub fn batch_row_product(
        matrix: &Array2<f64>,
        channel_data: &[Vec<f64>],
    ) -> Result<Vec<Vec<f64>>> {
        let n_channels = channel_data.len();
        if matrix.dim() != (n_channels, n_channels) {
            return Err(EventError::dimension_mismatch(format!(
                "matrix is {}x{} but {} channels were supplied",
                matrix.nrows(),
                matrix.ncols(),
                n_channels
            )));
        }
        let n_events = channel_data.first().map(|v| v.len()).unwrap_or(0);
        if let Some(bad) = channel_data.iter().position(|c| c.len() != n_events) {
            return Err(EventError::dimension_mismatch(format!(
                "channel {} has {} events, expected {}",
                bad,
                channel_data[bad].len(),
                n_events
            )));
        }

        let events =
            Array2::from_shape_fn((n_events, n_channels), |(event, channel)| {
                channel_data[channel][event]
            });
        let compensated = events.dot(matrix);

        Ok(compensated
            .columns()
            .into_iter()
            .map(|column| column.to_vec())
            .collect())
    }

    /// Compensate channel data: invert the spillover matrix and apply it
    pub fn compensate_parameters(
        spill: &Array2<f64>,
        channel_data: &[Vec<f64>],
    ) -> Result<Vec<Vec<f64>>> {
        let inverse = Self::invert_matrix(spill, DEFAULT_SINGULAR_TOLERANCE)?;
        Self::batch_row_product(&inverse, channel_data)
    }
}
