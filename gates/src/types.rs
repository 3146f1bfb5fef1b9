use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::{Display, EnumString, IntoStaticStr};

use crate::ellipse::EllipseGeometry;
use crate::error::{GateError, Result};
use crate::id::IdGenerator;
use crate::polygon::PolygonGeometry;
use crate::population::{Population, PopulationExpression};
use crate::quadrant::QuadrantGeometry;
use crate::range::RangeGeometry;
use crate::rectangle::RectangleGeometry;
use crate::split::SplitGeometry;
use crate::traits::*;

/// A 2-D point in raw data coordinates
pub type Point = [f64; 2];

/// The closed set of gate kinds, named as they appear on the wire
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
pub enum GateKind {
    #[serde(rename = "RectangleGate")]
    #[strum(serialize = "RectangleGate")]
    Rectangle,
    #[serde(rename = "PolygonGate")]
    #[strum(serialize = "PolygonGate")]
    Polygon,
    #[serde(rename = "EllipseGate")]
    #[strum(serialize = "EllipseGate")]
    Ellipse,
    #[serde(rename = "RangeGate")]
    #[strum(serialize = "RangeGate")]
    Range,
    #[serde(rename = "QuadrantGate")]
    #[strum(serialize = "QuadrantGate")]
    Quadrant,
    #[serde(rename = "SplitGate")]
    #[strum(serialize = "SplitGate")]
    Split,
}

impl GateKind {
    /// Compound kinds fan out into named sectors
    pub fn is_compound(&self) -> bool {
        matches!(self, GateKind::Quadrant | GateKind::Split)
    }

    /// Range and split gates only read the x channel
    pub fn is_one_dimensional(&self) -> bool {
        matches!(self, GateKind::Range | GateKind::Split)
    }

    /// Sector name suffixes in sector order; empty for simple kinds
    pub fn sector_suffixes(&self) -> &'static [&'static str] {
        match self {
            GateKind::Quadrant => QuadrantGeometry::SECTORS,
            GateKind::Split => SplitGeometry::SECTORS,
            _ => &[],
        }
    }

    pub fn sector_count(&self) -> usize {
        self.sector_suffixes().len()
    }
}

/// Shape parameters of a gate, one payload per kind.
///
/// Serializes externally tagged with lowercase keys, e.g.
/// `{"rectangle": {"x1": 0.0, "x2": 1.0, "y1": 0.0, "y2": 1.0}}`, which is the
/// shape the gate model nests its geometry under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateGeometry {
    Rectangle(RectangleGeometry),
    Polygon(PolygonGeometry),
    Ellipse(EllipseGeometry),
    Range(RangeGeometry),
    Quadrant(QuadrantGeometry),
    Split(SplitGeometry),
}

impl GateGeometry {
    pub fn kind(&self) -> GateKind {
        match self {
            GateGeometry::Rectangle(_) => GateKind::Rectangle,
            GateGeometry::Polygon(_) => GateKind::Polygon,
            GateGeometry::Ellipse(_) => GateKind::Ellipse,
            GateGeometry::Range(_) => GateKind::Range,
            GateGeometry::Quadrant(_) => GateKind::Quadrant,
            GateGeometry::Split(_) => GateKind::Split,
        }
    }

    pub fn is_compound(&self) -> bool {
        self.kind().is_compound()
    }

    /// Midpoint label for simple gates; `None` for compound gates, whose labels
    /// come from the axis scales
    pub fn default_label(&self) -> Option<Point> {
        match self {
            GateGeometry::Rectangle(g) => Some(g.default_label()),
            GateGeometry::Polygon(g) => Some(g.default_label()),
            GateGeometry::Ellipse(g) => Some(g.default_label()),
            GateGeometry::Range(g) => Some(g.default_label()),
            GateGeometry::Quadrant(_) | GateGeometry::Split(_) => None,
        }
    }

    /// Per-sector labels at the plot corners for compound gates
    pub fn corner_labels(
        &self,
        x_extrema: (f64, f64),
        y_extrema: (f64, f64),
    ) -> Option<Vec<Point>> {
        match self {
            GateGeometry::Quadrant(g) => Some(g.corner_labels(x_extrema, y_extrema)),
            GateGeometry::Split(g) => Some(g.corner_labels(x_extrema, y_extrema)),
            _ => None,
        }
    }

    /// Point-in-gate test for simple gates
    pub fn contains_point(&self, x: f64, y: f64) -> Result<bool> {
        match self {
            GateGeometry::Rectangle(g) => Ok(g.contains_point(x, y)),
            GateGeometry::Polygon(g) => Ok(g.contains_point(x, y)),
            GateGeometry::Ellipse(g) => Ok(g.contains_point(x, y)),
            GateGeometry::Range(g) => Ok(g.contains_point(x, y)),
            GateGeometry::Quadrant(_) | GateGeometry::Split(_) => {
                Err(GateError::invalid_geometry(format!(
                    "{} has no single region; classify points by sector",
                    self.kind()
                )))
            }
        }
    }

    /// Sector index for compound gates; `Ok(None)` when a coordinate is NaN
    pub fn sector_of(&self, x: f64, y: f64) -> Result<Option<usize>> {
        match self {
            GateGeometry::Quadrant(g) => Ok(g.sector_of(x, y)),
            GateGeometry::Split(g) => Ok(g.sector_of(x, y)),
            _ => Err(GateError::invalid_geometry(format!(
                "{} has no sectors",
                self.kind()
            ))),
        }
    }

    /// Bounding box for two-dimensional simple gates
    pub fn bounding_box(&self) -> Option<(f64, f64, f64, f64)> {
        match self {
            GateGeometry::Rectangle(g) => Some(g.bounding_box()),
            GateGeometry::Polygon(g) => Some(g.bounding_box()),
            GateGeometry::Ellipse(g) => Some(g.bounding_box()),
            _ => None,
        }
    }
}

impl GateValidation for GateGeometry {
    fn validate(&self) -> Result<()> {
        match self {
            GateGeometry::Rectangle(g) => g.validate(),
            GateGeometry::Polygon(g) => g.validate(),
            GateGeometry::Ellipse(g) => g.validate(),
            GateGeometry::Range(g) => g.validate(),
            GateGeometry::Quadrant(g) => g.validate(),
            GateGeometry::Split(g) => g.validate(),
        }
    }
}

macro_rules! impl_from_geometry {
    ($($variant:ident($shape:ty)),* $(,)?) => {
        $(
            impl From<$shape> for GateGeometry {
                fn from(shape: $shape) -> Self {
                    GateGeometry::$variant(shape)
                }
            }
        )*
    };
}

impl_from_geometry!(
    Rectangle(RectangleGeometry),
    Polygon(PolygonGeometry),
    Ellipse(EllipseGeometry),
    Range(RangeGeometry),
    Quadrant(QuadrantGeometry),
    Split(SplitGeometry),
);

/// One named sub-region of a compound gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub gid: Arc<str>,
    pub name: String,
}

/// A concrete gate instance.
///
/// Instances sharing a `gid` form one family: the instance with no
/// `fcs_file_id` is the global definition, the others are tailored to one
/// sample each. Simple gates carry one label and no sectors; compound gates
/// carry one label and one sector per sector suffix of their kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub id: Arc<str>,
    pub gid: Arc<str>,
    pub experiment_id: Option<String>,
    pub name: String,
    pub x_channel: String,
    pub y_channel: Option<String>,
    pub tailored_per_file: bool,
    pub fcs_file_id: Option<String>,
    pub locked: bool,
    pub geometry: GateGeometry,
    pub labels: Vec<Point>,
    pub sectors: Vec<Sector>,
    pub parent_population_id: Option<String>,
}

impl Gate {
    pub fn kind(&self) -> GateKind {
        self.geometry.kind()
    }

    pub fn is_compound(&self) -> bool {
        self.geometry.is_compound()
    }

    /// Whether this is the family's global instance
    pub fn is_global(&self) -> bool {
        self.fcs_file_id.is_none()
    }

    /// Label of a simple gate
    pub fn label(&self) -> Option<Point> {
        if self.is_compound() {
            None
        } else {
            self.labels.first().copied()
        }
    }

    pub fn sector_gids(&self) -> impl Iterator<Item = &Arc<str>> {
        self.sectors.iter().map(|s| &s.gid)
    }

    pub fn sector(&self, gid: &str) -> Option<(usize, &Sector)> {
        self.sectors
            .iter()
            .enumerate()
            .find(|(_, s)| &*s.gid == gid)
    }

    /// Whether `other` would render identically: same geometry, labels and
    /// sector names. Identity and scope fields are not compared.
    pub fn same_shape(&self, other: &Gate) -> bool {
        self.geometry == other.geometry
            && self.labels == other.labels
            && self.sectors.len() == other.sectors.len()
            && self
                .sectors
                .iter()
                .zip(&other.sectors)
                .all(|(a, b)| a.name == b.name)
    }

    /// The gate in its persistence shape.
    ///
    /// Simple gates carry `name` and `model.label`; compound gates additionally
    /// carry `names`, `model.labels` and `model.gids`, one per sector.
    pub fn to_wire(&self) -> Result<serde_json::Value> {
        let compound = self.is_compound();
        let wire = WireGate {
            id: &self.id,
            experiment_id: self.experiment_id.as_deref(),
            gid: &self.gid,
            kind: self.kind(),
            name: &self.name,
            names: compound.then(|| self.sectors.iter().map(|s| s.name.as_str()).collect()),
            x_channel: &self.x_channel,
            y_channel: self.y_channel.as_deref(),
            tailored_per_file: self.tailored_per_file,
            fcs_file_id: self.fcs_file_id.as_deref(),
            parent_population_id: self.parent_population_id.as_deref(),
            model: WireModel {
                locked: self.locked,
                label: self.label(),
                labels: compound.then_some(self.labels.as_slice()),
                geometry: &self.geometry,
                gids: compound.then(|| self.sectors.iter().map(|s| &*s.gid).collect()),
            },
        };
        Ok(serde_json::to_value(wire)?)
    }

    /// One population per simple gate or per sector, each selecting exactly
    /// that gid under `parent_id`
    pub fn default_populations(
        &self,
        ids: &mut IdGenerator,
        parent_id: Option<&str>,
    ) -> Vec<Population> {
        let targets: Vec<(&Arc<str>, &str)> = if self.is_compound() {
            self.sectors
                .iter()
                .map(|s| (&s.gid, s.name.as_str()))
                .collect()
        } else {
            vec![(&self.gid, self.name.as_str())]
        };

        targets
            .into_iter()
            .map(|(gid, name)| Population {
                id: ids.next_id(),
                name: name.to_string(),
                gates: PopulationExpression::all_of([gid.clone()]),
                parent_id: parent_id.map(str::to_string),
                terminal_gate_gid: Some(gid.clone()),
            })
            .collect()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGate<'a> {
    #[serde(rename = "_id")]
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    experiment_id: Option<&'a str>,
    gid: &'a str,
    #[serde(rename = "type")]
    kind: GateKind,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    names: Option<Vec<&'a str>>,
    x_channel: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    y_channel: Option<&'a str>,
    tailored_per_file: bool,
    fcs_file_id: Option<&'a str>,
    parent_population_id: Option<&'a str>,
    model: WireModel<'a>,
}

#[derive(Serialize)]
struct WireModel<'a> {
    locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<&'a [Point]>,
    #[serde(flatten)]
    geometry: &'a GateGeometry,
    #[serde(skip_serializing_if = "Option::is_none")]
    gids: Option<Vec<&'a str>>,
}
