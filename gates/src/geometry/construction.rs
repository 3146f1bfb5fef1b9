use derive_builder::Builder;
use std::sync::Arc;
use tracing::trace;

use crate::config::GateDefaults;
use crate::ellipse::EllipseGeometry;
use crate::error::{GateError, Result};
use crate::id::IdGenerator;
use crate::polygon::PolygonGeometry;
use crate::quadrant::QuadrantGeometry;
use crate::range::RangeGeometry;
use crate::rectangle::RectangleGeometry;
use crate::split::SplitGeometry;
use crate::traits::GateValidation;
use crate::types::{Gate, GateGeometry, GateKind, Point, Sector};
use cyto_events::ScaleSet;

/// Create a polygon geometry from raw coordinates
///
/// # Errors
/// Returns `GateError::InvalidGeometry` if less than 3 coordinates are provided,
/// or `GateError::InvalidCoordinate` if any coordinate is not finite
pub fn create_polygon_geometry(raw_coords: Vec<(f64, f64)>) -> Result<GateGeometry> {
    let vertices = raw_coords.into_iter().map(|(x, y)| [x, y]).collect();
    Ok(PolygonGeometry::new(vertices)?.into())
}

/// Create a rectangle geometry spanning the given raw coordinates
///
/// # Errors
/// Returns `GateError::InvalidGeometry` if less than 2 coordinates are provided
/// or the bounds enclose no area, and `GateError::InvalidCoordinate` if any
/// coordinate is not finite
pub fn create_rectangle_geometry(raw_coords: Vec<(f64, f64)>) -> Result<GateGeometry> {
    if raw_coords.len() < 2 {
        return Err(GateError::invalid_geometry(format!(
            "Rectangle requires at least 2 coordinates, got {}",
            raw_coords.len()
        )));
    }

    // Validate all coordinates are finite
    for (idx, (x, y)) in raw_coords.iter().enumerate() {
        super::ensure_finite(&format!("rectangle_x_{}", idx), *x)?;
        super::ensure_finite(&format!("rectangle_y_{}", idx), *y)?;
    }

    let (min_x, min_y, max_x, max_y) = raw_coords.iter().fold(
        (
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        ),
        |(min_x, min_y, max_x, max_y), (x, y)| {
            (min_x.min(*x), min_y.min(*y), max_x.max(*x), max_y.max(*y))
        },
    );

    Ok(RectangleGeometry::new(min_x, max_x, min_y, max_y)?.into())
}

/// Create an ellipse geometry; `major` and `minor` are full axis lengths
pub fn create_ellipse_geometry(
    center: (f64, f64),
    angle: f64,
    major: f64,
    minor: f64,
) -> Result<GateGeometry> {
    Ok(EllipseGeometry::new([center.0, center.1], angle, major, minor)?.into())
}

/// Create a range geometry, placing the label at the default height when `y`
/// is omitted
pub fn create_range_geometry(
    x1: f64,
    x2: f64,
    y: Option<f64>,
    defaults: &GateDefaults,
) -> Result<GateGeometry> {
    Ok(RangeGeometry::new(x1, x2, y.unwrap_or(defaults.range_label_y))?.into())
}

/// Create a quadrant geometry, using the default angles when omitted
pub fn create_quadrant_geometry(
    x: f64,
    y: f64,
    angles: Option<[f64; 4]>,
    defaults: &GateDefaults,
) -> Result<GateGeometry> {
    Ok(QuadrantGeometry::new(x, y, angles.unwrap_or(defaults.quadrant_angles))?.into())
}

/// Create a split geometry; the label height shares the range gate default
pub fn create_split_geometry(x: f64, y: Option<f64>, defaults: &GateDefaults) -> Result<GateGeometry> {
    Ok(SplitGeometry::new(x, y.unwrap_or(defaults.range_label_y))?.into())
}

/// Everything a caller chooses about a new gate.
///
/// Labels are optional: simple gates default to the midpoint of their shape,
/// compound gates to the plot corners taken from the channel scales. Sector
/// names default to `"{name} (UR)"`, `"{name} (L)"` and so on.
#[derive(Builder, Clone, Debug)]
#[builder(setter(into))]
pub struct GateDraft {
    pub name: String,
    pub x_channel: String,
    #[builder(default, setter(into, strip_option))]
    pub y_channel: Option<String>,
    pub geometry: GateGeometry,
    /// Reuse an existing group id instead of minting one
    #[builder(default, setter(into, strip_option))]
    pub gid: Option<Arc<str>>,
    /// Label of a simple gate
    #[builder(default, setter(into, strip_option))]
    pub label: Option<Vec<f64>>,
    /// One label per sector of a compound gate
    #[builder(default, setter(into, strip_option))]
    pub labels: Option<Vec<Vec<f64>>>,
    #[builder(default, setter(into, strip_option))]
    pub sector_names: Option<Vec<String>>,
    #[builder(default, setter(strip_option))]
    pub locked: Option<bool>,
    #[builder(default)]
    pub tailored_per_file: bool,
    #[builder(default, setter(into, strip_option))]
    pub experiment_id: Option<String>,
    #[builder(default, setter(into, strip_option))]
    pub parent_population_id: Option<String>,
}

impl GateDraft {
    pub fn builder() -> GateDraftBuilder {
        GateDraftBuilder::default()
    }

    /// Validate the draft and turn it into a global gate instance.
    ///
    /// Fresh ids are drawn from `ids` for the instance, for the group when no
    /// gid was given, and for each sector of a compound gate. `scales` is only
    /// consulted for compound gates without explicit labels.
    pub fn into_gate(
        self,
        ids: &mut IdGenerator,
        scales: &ScaleSet,
        defaults: &GateDefaults,
    ) -> Result<Gate> {
        self.geometry.validate()?;
        let kind = self.geometry.kind();

        if self.name.trim().is_empty() {
            return Err(GateError::invalid_geometry("Gate name must not be empty"));
        }
        if self.x_channel.is_empty() {
            return Err(GateError::missing_parameter("x_channel", kind.to_string()));
        }
        match (&self.y_channel, kind.is_one_dimensional()) {
            (None, false) => {
                return Err(GateError::missing_parameter("y_channel", kind.to_string()));
            }
            (Some(y), true) => {
                return Err(GateError::invalid_geometry(format!(
                    "{} reads only the x channel, got y channel '{}'",
                    kind, y
                )));
            }
            _ => {}
        }

        let labels = self.resolve_labels(kind, scales)?;
        let sector_names = self.resolve_sector_names(kind)?;

        let gid = match self.gid {
            Some(gid) => gid,
            None => ids.next_id(),
        };
        let sectors = sector_names
            .into_iter()
            .map(|name| Sector {
                gid: ids.next_id(),
                name,
            })
            .collect();

        trace!(%gid, %kind, name = %self.name, "drafted gate");

        Ok(Gate {
            id: ids.next_id(),
            gid,
            experiment_id: self.experiment_id,
            name: self.name,
            x_channel: self.x_channel,
            y_channel: self.y_channel,
            tailored_per_file: self.tailored_per_file,
            fcs_file_id: None,
            locked: self.locked.unwrap_or(defaults.locked),
            geometry: self.geometry,
            labels,
            sectors,
            parent_population_id: self.parent_population_id,
        })
    }

    fn resolve_labels(&self, kind: GateKind, scales: &ScaleSet) -> Result<Vec<Point>> {
        if !kind.is_compound() {
            if self.labels.is_some() {
                return Err(GateError::invalid_label_shape(
                    kind,
                    "a single label",
                    "a list of labels",
                ));
            }
            return match &self.label {
                Some(label) => Ok(vec![label_point(kind, label, "one point of 2 coordinates")?]),
                None => Ok(self.geometry.default_label().into_iter().collect()),
            };
        }

        let expected = format!("{} points of 2 coordinates", kind.sector_count());
        if self.label.is_some() {
            return Err(GateError::invalid_label_shape(
                kind,
                expected,
                "a single label",
            ));
        }

        match &self.labels {
            Some(labels) => {
                if labels.len() != kind.sector_count() {
                    return Err(GateError::invalid_label_shape(
                        kind,
                        expected,
                        format!("{} points", labels.len()),
                    ));
                }
                labels
                    .iter()
                    .map(|label| label_point(kind, label, &expected))
                    .collect()
            }
            None => {
                let x_extrema = channel_extrema(scales, &self.x_channel, kind)?;
                let y_extrema = match (kind, &self.y_channel) {
                    (GateKind::Quadrant, Some(y_channel)) => {
                        channel_extrema(scales, y_channel, kind)?
                    }
                    // Split labels sit at the split's own height
                    _ => (0.0, 1.0),
                };
                self.geometry
                    .corner_labels(x_extrema, y_extrema)
                    .ok_or_else(|| GateError::invalid_geometry(format!("{} has no corners", kind)))
            }
        }
    }

    fn resolve_sector_names(&self, kind: GateKind) -> Result<Vec<String>> {
        let suffixes = kind.sector_suffixes();
        match &self.sector_names {
            None => Ok(suffixes
                .iter()
                .map(|suffix| format!("{} ({})", self.name, suffix))
                .collect()),
            Some(_) if suffixes.is_empty() => Err(GateError::invalid_geometry(format!(
                "{} has no sectors to name",
                kind
            ))),
            Some(names) if names.len() != suffixes.len() => {
                Err(GateError::invalid_geometry(format!(
                    "{} needs {} sector names, got {}",
                    kind,
                    suffixes.len(),
                    names.len()
                )))
            }
            Some(names) => Ok(names.clone()),
        }
    }
}

fn label_point(kind: GateKind, label: &[f64], expected: &str) -> Result<Point> {
    match label {
        [x, y] if x.is_finite() && y.is_finite() => Ok([*x, *y]),
        _ => Err(GateError::invalid_label_shape(
            kind,
            expected,
            format!("{:?}", label),
        )),
    }
}

fn channel_extrema(scales: &ScaleSet, channel: &str, kind: GateKind) -> Result<(f64, f64)> {
    scales.extrema(channel).ok_or_else(|| {
        GateError::missing_parameter(channel, format!("scale set, for {} labels", kind))
    })
}

impl From<GateDraftBuilderError> for GateError {
    fn from(err: GateDraftBuilderError) -> Self {
        match err {
            GateDraftBuilderError::UninitializedField(field) => {
                GateError::missing_parameter(field, "gate draft")
            }
            GateDraftBuilderError::ValidationError(message) => GateError::invalid_geometry(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyto_events::ScaleSpec;

    fn scales() -> ScaleSet {
        [
            ("FSC-A".to_string(), ScaleSpec::linear(-10.0, 250_000.0)),
            ("SSC-A".to_string(), ScaleSpec::linear(0.0, 100_000.0)),
        ]
        .into_iter()
        .collect()
    }

    fn draft(geometry: GateGeometry) -> GateDraftBuilder {
        let mut builder = GateDraft::builder();
        builder.name("g").x_channel("FSC-A").geometry(geometry);
        builder
    }

    #[test]
    fn test_rectangle_from_points() {
        let geometry =
            create_rectangle_geometry(vec![(5.0, 1.0), (1.0, 9.0), (3.0, 4.0)]).unwrap();
        assert_eq!(
            geometry,
            GateGeometry::Rectangle(RectangleGeometry {
                x1: 1.0,
                x2: 5.0,
                y1: 1.0,
                y2: 9.0
            })
        );
        assert!(create_rectangle_geometry(vec![(1.0, 1.0)]).is_err());
    }

    #[test]
    fn test_simple_gate_default_label() {
        let mut ids = IdGenerator::seeded(1);
        let geometry = create_rectangle_geometry(vec![(0.0, 0.0), (10.0, 20.0)]).unwrap();
        let gate = draft(geometry)
            .y_channel("SSC-A")
            .build()
            .unwrap()
            .into_gate(&mut ids, &ScaleSet::new(), &GateDefaults::default())
            .unwrap();

        assert_eq!(gate.labels, vec![[5.0, 10.0]]);
        assert!(gate.sectors.is_empty());
        assert_ne!(gate.id, gate.gid);
        assert!(!gate.locked);
    }

    #[test]
    fn test_quadrant_labels_use_true_extrema() {
        let mut ids = IdGenerator::seeded(2);
        let defaults = GateDefaults::default();
        let geometry = create_quadrant_geometry(100.0, 100.0, None, &defaults).unwrap();
        let gate = draft(geometry)
            .y_channel("SSC-A")
            .build()
            .unwrap()
            .into_gate(&mut ids, &scales(), &defaults)
            .unwrap();

        assert_eq!(
            gate.labels,
            vec![
                [250_000.0, 100_000.0],
                [-10.0, 100_000.0],
                [-10.0, 0.0],
                [250_000.0, 0.0]
            ]
        );
        let names: Vec<_> = gate.sectors.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["g (UR)", "g (UL)", "g (LL)", "g (LR)"]);
    }

    #[test]
    fn test_split_labels_and_names() {
        let mut ids = IdGenerator::seeded(3);
        let defaults = GateDefaults::default();
        let geometry = create_split_geometry(50.0, Some(0.25), &defaults).unwrap();
        let gate = draft(geometry)
            .sector_names(vec!["neg".to_string(), "pos".to_string()])
            .build()
            .unwrap()
            .into_gate(&mut ids, &scales(), &defaults)
            .unwrap();

        assert_eq!(gate.labels, vec![[-10.0, 0.25], [250_000.0, 0.25]]);
        assert_eq!(gate.sectors[1].name, "pos");
    }

    #[test]
    fn test_compound_label_count_checked() {
        let mut ids = IdGenerator::seeded(4);
        let defaults = GateDefaults::default();
        let geometry = create_quadrant_geometry(0.0, 0.0, None, &defaults).unwrap();
        let err = draft(geometry)
            .y_channel("SSC-A")
            .labels(vec![vec![0.0, 0.0], vec![1.0, 1.0]])
            .build()
            .unwrap()
            .into_gate(&mut ids, &scales(), &defaults)
            .unwrap_err();
        assert!(matches!(
            err,
            GateError::InvalidLabelShape {
                kind: GateKind::Quadrant,
                ..
            }
        ));
    }

    #[test]
    fn test_compound_label_point_shape_checked() {
        let mut ids = IdGenerator::seeded(5);
        let defaults = GateDefaults::default();
        let geometry = create_split_geometry(0.0, None, &defaults).unwrap();
        let err = draft(geometry)
            .labels(vec![vec![0.0, 0.0], vec![1.0]])
            .build()
            .unwrap()
            .into_gate(&mut ids, &scales(), &defaults)
            .unwrap_err();
        assert!(matches!(err, GateError::InvalidLabelShape { .. }));
    }

    #[test]
    fn test_missing_scale_for_compound_labels() {
        let mut ids = IdGenerator::seeded(6);
        let defaults = GateDefaults::default();
        let geometry = create_split_geometry(0.0, None, &defaults).unwrap();
        let mut builder = GateDraft::builder();
        let err = builder
            .name("s")
            .x_channel("CD3")
            .geometry(geometry)
            .build()
            .unwrap()
            .into_gate(&mut ids, &scales(), &defaults)
            .unwrap_err();
        assert!(matches!(err, GateError::MissingParameter { parameter, .. } if parameter == "CD3"));
    }

    #[test]
    fn test_channel_arity() {
        let mut ids = IdGenerator::seeded(7);
        let defaults = GateDefaults::default();
        let rect = create_rectangle_geometry(vec![(0.0, 0.0), (1.0, 1.0)]).unwrap();
        assert!(matches!(
            draft(rect)
                .build()
                .unwrap()
                .into_gate(&mut ids, &scales(), &defaults),
            Err(GateError::MissingParameter { .. })
        ));

        let range = create_range_geometry(0.0, 1.0, None, &defaults).unwrap();
        assert!(
            draft(range)
                .y_channel("SSC-A")
                .build()
                .unwrap()
                .into_gate(&mut ids, &scales(), &defaults)
                .is_err()
        );
    }

    #[test]
    fn test_missing_field_converts() {
        let err: GateError = GateDraft::builder().name("x").build().unwrap_err().into();
        assert!(matches!(err, GateError::MissingParameter { .. }));
    }
}
