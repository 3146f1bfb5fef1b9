//! Channel-indexed event tables.
//!
//! An event table is a Polars `DataFrame` with one column per channel and one row
//! per event. Columns are read as `f64`; integer and `f32` columns are cast on
//! read so callers can hand over whatever the file source produced.

use polars::prelude::*;

use crate::error::{EventError, Result};

/// Event data stored as a Polars DataFrame, one column per channel
pub type EventTable = DataFrame;
pub type EventDatum = f64;
pub type ChannelName = std::sync::Arc<str>;

/// Build an event table from `(channel, values)` pairs.
///
/// # Errors
/// Fails if the columns differ in length or a channel name repeats.
///
/// # Example
///
/// ```rust
/// use cyto_events::table::{column_values, event_table};
///
/// let table = event_table([("FSC-A", vec![1.0, 2.0]), ("SSC-A", vec![3.0, 4.0])])?;
/// assert_eq!(column_values(&table, "SSC-A")?, vec![3.0, 4.0]);
/// # Ok::<(), cyto_events::EventError>(())
/// ```
pub fn event_table<I, S>(columns: I) -> Result<EventTable>
where
    I: IntoIterator<Item = (S, Vec<EventDatum>)>,
    S: AsRef<str>,
{
    let columns: Vec<Column> = columns
        .into_iter()
        .map(|(name, values)| Column::new(name.as_ref().into(), values))
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Whether the table has a column for `channel` (case-sensitive)
pub fn has_channel(table: &EventTable, channel: &str) -> bool {
    table.get_column_index(channel).is_some()
}

/// Channel names in table order
pub fn channel_names(table: &EventTable) -> Vec<String> {
    table
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// Copy one channel's values out as `f64`. Nulls become NaN.
///
/// # Errors
/// Returns `EventError::ChannelMismatch` if the channel is absent.
pub fn column_values(table: &EventTable, channel: &str) -> Result<Vec<EventDatum>> {
    if !has_channel(table, channel) {
        return Err(EventError::channel_mismatch(channel));
    }
    let column = table.column(channel)?.cast(&DataType::Float64)?;
    let values = column.f64()?;
    Ok(values
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Replace one channel's column with new values, keeping its position
pub fn replace_column(table: &mut EventTable, channel: &str, values: Vec<EventDatum>) -> Result<()> {
    if values.len() != table.height() {
        return Err(EventError::dimension_mismatch(format!(
            "column '{}' has {} values but the table has {} events",
            channel,
            values.len(),
            table.height()
        )));
    }
    table.replace(channel, Series::new(channel.into(), values))?;
    Ok(())
}
