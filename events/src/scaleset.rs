//! Per-experiment scale sets.
//!
//! A `ScaleSet` binds one `ScaleSpec` to each channel of an experiment's panel
//! and applies them column-wise to event tables. Unknown scale types are only
//! reported for channels that are actually evaluated.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EventError, Result};
use crate::table::{EventTable, channel_names, column_values, has_channel, replace_column};
use crate::transform::{ScaleSpec, apply_all};

/// Options for applying a scale set to a table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleSetOptions {
    /// Clip raw values to each scale's `[minimum, maximum]` before transforming
    pub clamp: bool,
}

/// One entry of the wire list form of a scale set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelScale {
    channel_name: String,
    scale: ScaleSpec,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleSet {
    scales: FxHashMap<String, ScaleSpec>,
}

impl ScaleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the list form `[{"channelName": .., "scale": {..}}, ..]`.
    ///
    /// Scale types are not validated here.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<ChannelScale> = serde_json::from_str(json)?;
        Ok(entries
            .into_iter()
            .map(|entry| (entry.channel_name, entry.scale))
            .collect())
    }

    /// Serialize back to the list form, ordered by channel name
    pub fn to_json(&self) -> Result<String> {
        let mut entries: Vec<ChannelScale> = self
            .scales
            .iter()
            .map(|(channel, scale)| ChannelScale {
                channel_name: channel.clone(),
                scale: scale.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.channel_name.cmp(&b.channel_name));
        Ok(serde_json::to_string(&entries)?)
    }

    pub fn get(&self, channel: &str) -> Option<&ScaleSpec> {
        self.scales.get(channel)
    }

    pub fn get_mut(&mut self, channel: &str) -> Option<&mut ScaleSpec> {
        self.scales.get_mut(channel)
    }

    pub fn set(&mut self, channel: impl Into<String>, scale: ScaleSpec) -> Option<ScaleSpec> {
        self.scales.insert(channel.into(), scale)
    }

    /// `(minimum, maximum)` of the channel's scale
    pub fn extrema(&self, channel: &str) -> Option<(f64, f64)> {
        self.scales.get(channel).map(|s| (s.minimum, s.maximum))
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.scales.keys().map(String::as_str)
    }

    /// Scale every column that has a scale and return a new table.
    ///
    /// Columns without a scale pass through unchanged.
    pub fn apply(&self, table: &EventTable, options: &ScaleSetOptions) -> Result<EventTable> {
        let mut out = table.clone();
        self.apply_in_place(&mut out, options)?;
        Ok(out)
    }

    /// Scale every column that has a scale, writing into `table`.
    ///
    /// If any column fails, `table` is left untouched.
    pub fn apply_in_place(&self, table: &mut EventTable, options: &ScaleSetOptions) -> Result<()> {
        let channels: Vec<String> = channel_names(table)
            .into_iter()
            .filter(|c| self.scales.contains_key(c))
            .collect();
        debug!(
            "Scaling {} of {} channels (clamp: {})",
            channels.len(),
            table.width(),
            options.clamp
        );
        self.write_scaled(table, &channels, options)
    }

    /// Scale only the named channels and return a new table.
    ///
    /// # Errors
    /// - `EventError::ChannelMismatch` if a named channel is not in the table
    /// - `EventError::MissingScale` if a named channel has no scale
    /// - `EventError::InvalidScaleType` if a named channel's scale type is unknown
    pub fn apply_channels(
        &self,
        table: &EventTable,
        channels: &[&str],
        options: &ScaleSetOptions,
    ) -> Result<EventTable> {
        for &channel in channels {
            if !has_channel(table, channel) {
                return Err(EventError::channel_mismatch(channel));
            }
            if !self.scales.contains_key(channel) {
                return Err(EventError::missing_scale(channel));
            }
        }
        let channels: Vec<String> = channels.iter().map(|c| c.to_string()).collect();
        let mut out = table.clone();
        self.write_scaled(&mut out, &channels, options)?;
        Ok(out)
    }

    fn write_scaled(
        &self,
        table: &mut EventTable,
        channels: &[String],
        options: &ScaleSetOptions,
    ) -> Result<()> {
        // Compute everything before touching the table
        let scaled = channels
            .iter()
            .map(|channel| {
                let scale = &self.scales[channel];
                let values = column_values(table, channel)?;
                apply_all(scale, &values, options.clamp)
                    .map(|v| (channel.as_str(), v))
                    .map_err(|e| e.with_context(format!("channel '{}'", channel)))
            })
            .collect::<Result<Vec<_>>>()?;

        for (channel, values) in scaled {
            replace_column(table, channel, values)?;
        }
        Ok(())
    }
}

impl FromIterator<(String, ScaleSpec)> for ScaleSet {
    fn from_iter<T: IntoIterator<Item = (String, ScaleSpec)>>(iter: T) -> Self {
        Self {
            scales: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::event_table;
    use approx::assert_relative_eq;

    fn scaleset() -> ScaleSet {
        [
            ("FSC-A".to_string(), ScaleSpec::linear(0.0, 262144.0)),
            ("FL1-A".to_string(), ScaleSpec::log(1.0, 100000.0)),
            ("FL2-A".to_string(), ScaleSpec::arcsinh(-200.0, 5000.0, 5.0)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_apply_passes_through_unscaled_columns() {
        let table = event_table([
            ("FSC-A", vec![10.0, 20.0]),
            ("FL1-A", vec![100.0, 0.5]),
            ("Time", vec![1.0, 2.0]),
        ])
        .unwrap();

        let out = scaleset().apply(&table, &ScaleSetOptions::default()).unwrap();
        assert_eq!(column_values(&out, "FSC-A").unwrap(), vec![10.0, 20.0]);
        let fl1 = column_values(&out, "FL1-A").unwrap();
        assert_relative_eq!(fl1[0], 2.0, epsilon = 1e-12);
        assert_eq!(fl1[1], 0.0);
        assert_eq!(column_values(&out, "Time").unwrap(), vec![1.0, 2.0]);
        // source table untouched
        assert_eq!(column_values(&table, "FL1-A").unwrap(), vec![100.0, 0.5]);
    }

    #[test]
    fn test_unknown_type_only_fails_when_evaluated() {
        let mut set = scaleset();
        set.set(
            "FL3-A",
            ScaleSpec {
                scale_type: "BogusScale".into(),
                minimum: 0.0,
                maximum: 1.0,
                cofactor: 5.0,
            },
        );
        let without_fl3 = event_table([("FL1-A", vec![10.0])]).unwrap();
        assert!(set.apply(&without_fl3, &ScaleSetOptions::default()).is_ok());

        let mut with_fl3 = event_table([("FL1-A", vec![10.0]), ("FL3-A", vec![1.0])]).unwrap();
        let err = set
            .apply_in_place(&mut with_fl3, &ScaleSetOptions::default())
            .unwrap_err();
        assert!(matches!(err, EventError::InvalidScaleType { .. }));
        // failed in-place call leaves the table as it was
        assert_eq!(column_values(&with_fl3, "FL1-A").unwrap(), vec![10.0]);
    }

    #[test]
    fn test_apply_channels() {
        let table = event_table([("FSC-A", vec![5.0]), ("FL2-A", vec![5.0])]).unwrap();
        let out = scaleset()
            .apply_channels(&table, &["FL2-A"], &ScaleSetOptions { clamp: true })
            .unwrap();
        assert_eq!(column_values(&out, "FSC-A").unwrap(), vec![5.0]);
        assert_relative_eq!(
            column_values(&out, "FL2-A").unwrap()[0],
            1.0f64.asinh(),
            epsilon = 1e-12
        );
        assert!(matches!(
            scaleset().apply_channels(&table, &["FL1-A"], &ScaleSetOptions::default()),
            Err(EventError::ChannelMismatch { .. })
        ));

        let timed = event_table([("Time", vec![1.0]), ("FL2-A", vec![5.0])]).unwrap();
        assert!(matches!(
            scaleset().apply_channels(&timed, &["FL2-A", "Time"], &ScaleSetOptions::default()),
            Err(EventError::MissingScale { ref channel }) if channel == "Time"
        ));
    }

    #[test]
    fn test_json_list_form() {
        let json = r#"[
            {"channelName": "FSC-A", "scale": {"type": "LinearScale", "minimum": 0, "maximum": 262144}},
            {"channelName": "FL1-A", "scale": {"type": "ArcSinhScale", "minimum": -200, "maximum": 5000, "cofactor": 150}}
        ]"#;
        let set = ScaleSet::from_json(json).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.extrema("FL1-A"), Some((-200.0, 5000.0)));
        assert_eq!(set.get("FL1-A").unwrap().cofactor, 150.0);

        let round = ScaleSet::from_json(&set.to_json().unwrap()).unwrap();
        assert_eq!(round, set);
    }
}
