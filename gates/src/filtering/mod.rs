//! Local gate evaluation over event tables.
//!
//! Gates are evaluated on raw channel values read from the table's `x_channel`
//! (and `y_channel` for two-dimensional gates). Results are boolean masks with
//! one entry per event; NaN values fall outside every region, including every
//! sector of a compound gate.
//!
//! - [`gate_mask`]: membership in a simple gate
//! - [`sector_masks`]: membership in each sector of a compound gate
//! - [`population_mask`]: a population expression, resolved against a
//!   registry for one sample so that tailored instances take precedence

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::trace;

use crate::error::{GateError, Result};
use crate::population::PopulationExpression;
use crate::tailoring::GateRegistry;
use crate::traits::{GateContainment, SectorClassifier};
use crate::types::{Gate, GateGeometry};
use cyto_events::EventTable;
use cyto_events::table::column_values;

/// The gate's channel values. One-dimensional gates get no y column.
fn channel_data(gate: &Gate, table: &EventTable) -> Result<(Vec<f64>, Option<Vec<f64>>)> {
    let xs = column_values(table, &gate.x_channel)?;
    let ys = match &gate.y_channel {
        Some(channel) => Some(column_values(table, channel)?),
        None => None,
    };
    Ok((xs, ys))
}

fn region(geometry: &GateGeometry) -> Result<&(dyn GateContainment + Sync)> {
    match geometry {
        GateGeometry::Rectangle(g) => Ok(g),
        GateGeometry::Polygon(g) => Ok(g),
        GateGeometry::Ellipse(g) => Ok(g),
        GateGeometry::Range(g) => Ok(g),
        GateGeometry::Quadrant(_) | GateGeometry::Split(_) => {
            Err(GateError::filtering_error(format!(
                "{} is compound; evaluate its sectors instead",
                geometry.kind()
            )))
        }
    }
}

fn classify<C: SectorClassifier + Sync>(
    classifier: &C,
    xs: &[f64],
    ys: Option<&[f64]>,
) -> Vec<Option<usize>> {
    (0..xs.len())
        .into_par_iter()
        .map(|i| classifier.sector_of(xs[i], ys.map_or(0.0, |ys| ys[i])))
        .collect()
}

/// Membership of every event in a simple gate.
///
/// # Errors
/// `FilteringError` for compound gates, `Event(ChannelMismatch)` when a gate
/// channel is missing from the table.
pub fn gate_mask(gate: &Gate, table: &EventTable) -> Result<Vec<bool>> {
    let region = region(&gate.geometry)?;
    let (xs, ys) = channel_data(gate, table)?;
    let ys = ys.as_deref();

    Ok((0..xs.len())
        .into_par_iter()
        .map(|i| region.contains_point(xs[i], ys.map_or(0.0, |ys| ys[i])))
        .collect())
}

/// Membership of every event in each sector of a compound gate, in sector
/// order. Every event with finite coordinates lands in exactly one sector;
/// events with a NaN coordinate land in none.
pub fn sector_masks(gate: &Gate, table: &EventTable) -> Result<Vec<(Arc<str>, Vec<bool>)>> {
    let (xs, ys) = channel_data(gate, table)?;
    let ys = ys.as_deref();

    let assigned = match &gate.geometry {
        GateGeometry::Quadrant(g) => classify(g, &xs, ys),
        GateGeometry::Split(g) => classify(g, &xs, ys),
        other => {
            return Err(GateError::filtering_error(format!(
                "{} has no sectors",
                other.kind()
            )));
        }
    };

    Ok(gate
        .sectors
        .iter()
        .enumerate()
        .map(|(index, sector)| {
            let mask = assigned.par_iter().map(|&s| s == Some(index)).collect();
            (sector.gid.clone(), mask)
        })
        .collect())
}

/// Masks for the given gids, each evaluated with the instance governing
/// `sample`. A compound gate is classified once for all of its sectors.
pub fn gid_masks<'a, I>(
    registry: &GateRegistry,
    table: &EventTable,
    sample: Option<&str>,
    gids: I,
) -> Result<FxHashMap<Arc<str>, Vec<bool>>>
where
    I: IntoIterator<Item = &'a Arc<str>>,
{
    let mut masks: FxHashMap<Arc<str>, Vec<bool>> = FxHashMap::default();

    for gid in gids {
        if masks.contains_key(gid) {
            continue;
        }
        if registry.is_compound_gid(gid) {
            return Err(GateError::CompoundGateReference {
                gid: gid.to_string(),
            });
        }

        let gate = registry.resolve(gid, sample)?;
        trace!(%gid, instance = %gate.id, "evaluating gate");
        if gate.is_compound() {
            masks.extend(sector_masks(gate, table)?);
        } else {
            masks.insert(gid.clone(), gate_mask(gate, table)?);
        }
    }
    Ok(masks)
}

/// Evaluate a population expression against `table` for one sample.
///
/// The expression is validated against the registry first, so compound
/// top-level gids and unknown gids are rejected before any event is read.
pub fn population_mask(
    expression: &PopulationExpression,
    registry: &GateRegistry,
    table: &EventTable,
    sample: Option<&str>,
) -> Result<Vec<bool>> {
    expression.validate(registry)?;
    let masks = gid_masks(registry, table, sample, expression.gids())?;
    expression.evaluate(&masks, table.height())
}

/// Indices of the selected events
pub fn selected_indices(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(i, &selected)| selected.then_some(i))
        .collect()
}
