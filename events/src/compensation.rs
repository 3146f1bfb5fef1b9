//! Spillover compensation.
//!
//! A `CompensationMatrix` owns a square spillover matrix indexed by channel name.
//! Compensated values are `selected_columns · inverse(spill)`: each event row,
//! restricted to the matrix channels in matrix order, right-multiplied by the
//! inverse. The inverse is computed on first use and cached until the matrix
//! changes.

use itertools::Itertools;
use ndarray::Array2;
use once_cell::unsync::OnceCell;
use tracing::{debug, trace};

use crate::error::{EventError, Result};
use crate::matrix::{DEFAULT_SINGULAR_TOLERANCE, MatrixOps};
use crate::spill::{parse_spill_string, to_spill_string};
use crate::table::{EventTable, column_values, has_channel, replace_column};

/// Numeric tolerances used by compensation
#[derive(Debug, Clone, PartialEq)]
pub struct CompensationOptions {
    /// A spill matrix within this distance of the identity skips the product
    pub identity_tolerance: f64,
    /// Pivots at or below this magnitude make the matrix singular
    pub singular_tolerance: f64,
}

impl Default for CompensationOptions {
    fn default() -> Self {
        Self {
            identity_tolerance: 0.0,
            singular_tolerance: DEFAULT_SINGULAR_TOLERANCE,
        }
    }
}

/// A spillover matrix bound to an ordered list of channels.
///
/// # Example
///
/// ```rust
/// use cyto_events::CompensationMatrix;
/// use cyto_events::table::{column_values, event_table};
/// use ndarray::array;
///
/// let comp = CompensationMatrix::new(
///     vec!["A".into(), "B".into()],
///     array![[1.0, 0.0], [0.0, 1.0]],
/// )?;
/// let events = event_table([("A", vec![1.0, 2.0]), ("B", vec![3.0, 4.0])])?;
/// let out = comp.apply(&events)?;
/// assert_eq!(column_values(&out, "A")?, vec![1.0, 2.0]);
/// assert_eq!(column_values(&out, "B")?, vec![3.0, 4.0]);
/// # Ok::<(), cyto_events::EventError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CompensationMatrix {
    channels: Vec<String>,
    spill: Array2<f64>,
    options: CompensationOptions,
    inverse: OnceCell<Array2<f64>>,
}

impl CompensationMatrix {
    /// # Errors
    /// - `EventError::DimensionMismatch` if `spill` is not `N×N` for `N = channels.len()`
    /// - `EventError::DuplicateChannel` if a channel name repeats
    pub fn new(channels: Vec<String>, spill: Array2<f64>) -> Result<Self> {
        validate(&channels, &spill)?;
        Ok(Self {
            channels,
            spill,
            options: CompensationOptions::default(),
            inverse: OnceCell::new(),
        })
    }

    /// Parse a `N,ch1,...,chN,m11,...,mNN` spill string
    pub fn from_spill_string(spill: &str) -> Result<Self> {
        let (channels, matrix) = parse_spill_string(spill)?;
        Self::new(channels, matrix)
    }

    pub fn to_spill_string(&self) -> Result<String> {
        to_spill_string(&self.channels, &self.spill)
    }

    pub fn with_options(mut self, options: CompensationOptions) -> Self {
        self.options = options;
        self.inverse = OnceCell::new();
        self
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn spill(&self) -> &Array2<f64> {
        &self.spill
    }

    pub fn options(&self) -> &CompensationOptions {
        &self.options
    }

    /// Replace the spillover matrix, dropping any cached inverse
    pub fn set_spill(&mut self, spill: Array2<f64>) -> Result<()> {
        validate(&self.channels, &spill)?;
        self.spill = spill;
        self.inverse = OnceCell::new();
        Ok(())
    }

    /// Set one spillover coefficient by channel pair, dropping any cached inverse
    pub fn set_coefficient(&mut self, from: &str, to: &str, value: f64) -> Result<()> {
        let i = self.index_of(from)?;
        let j = self.index_of(to)?;
        self.spill[[i, j]] = value;
        self.inverse = OnceCell::new();
        Ok(())
    }

    pub fn is_identity(&self) -> bool {
        MatrixOps::is_identity(&self.spill, self.options.identity_tolerance)
    }

    /// The inverse of the spillover matrix, computed once and cached.
    ///
    /// # Errors
    /// Returns `EventError::SingularMatrix` if the matrix has no inverse.
    pub fn invert(&self) -> Result<&Array2<f64>> {
        self.inverse.get_or_try_init(|| {
            trace!("Inverting {}x{} spillover matrix", self.len(), self.len());
            MatrixOps::invert_matrix(&self.spill, self.options.singular_tolerance)
        })
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Compensate raw column vectors given in matrix channel order
    pub fn compensate_columns(&self, columns: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if self.is_identity() {
            return Ok(columns.to_vec());
        }
        MatrixOps::batch_row_product(self.invert()?, columns)
    }

    /// Return a copy of `events` with the matrix channels compensated.
    ///
    /// Columns not named by the matrix pass through unchanged.
    pub fn apply(&self, events: &EventTable) -> Result<EventTable> {
        let mut out = events.clone();
        self.apply_in_place(&mut out)?;
        Ok(out)
    }

    /// Compensate the matrix channels of `events` in place.
    ///
    /// # Errors
    /// - `EventError::ChannelMismatch` naming the first matrix channel absent from `events`
    /// - `EventError::SingularMatrix` if the spillover matrix cannot be inverted
    ///
    /// On error `events` is left untouched.
    pub fn apply_in_place(&self, events: &mut EventTable) -> Result<()> {
        if let Some(missing) = self.channels.iter().find(|c| !has_channel(events, c)) {
            return Err(EventError::channel_mismatch(missing.as_str()));
        }

        if self.is_identity() {
            debug!(
                "Identity spillover matrix over {} channels - bypassing compensation",
                self.len()
            );
            return Ok(());
        }

        let inverse = self.invert()?;
        let columns = self
            .channels
            .iter()
            .map(|c| column_values(events, c))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Compensating {} channels across {} events",
            self.len(),
            events.height()
        );
        let compensated = MatrixOps::batch_row_product(inverse, &columns)?;

        for (channel, values) in self.channels.iter().zip(compensated) {
            replace_column(events, channel, values)?;
        }
        Ok(())
    }

    fn index_of(&self, channel: &str) -> Result<usize> {
        self.channels
            .iter()
            .position(|c| c == channel)
            .ok_or_else(|| EventError::channel_mismatch(channel))
    }
}

fn validate(channels: &[String], spill: &Array2<f64>) -> Result<()> {
    let n = channels.len();
    if spill.dim() != (n, n) {
        return Err(EventError::dimension_mismatch(format!(
            "spillover matrix is {}x{} but {} channels were given",
            spill.nrows(),
            spill.ncols(),
            n
        )));
    }
    if let Some(dup) = channels.iter().duplicates().next() {
        return Err(EventError::duplicate_channel(dup.as_str()));
    }
    Ok(())
}
