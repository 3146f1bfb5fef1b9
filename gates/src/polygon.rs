use serde::{Deserialize, Serialize};

use super::error::{GateError, Result};
use super::geometry::ensure_finite;
use super::traits::*;
use super::types::Point;

/// Closed polygon; the last vertex connects back to the first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonGeometry {
    pub vertices: Vec<Point>,
}

impl PolygonGeometry {
    pub fn new(vertices: Vec<Point>) -> Result<Self> {
        let polygon = Self { vertices };
        polygon.validate()?;
        Ok(polygon)
    }
}

impl GateLabel for PolygonGeometry {
    /// Mean of the vertices
    fn default_label(&self) -> Point {
        let (sum_x, sum_y) = self
            .vertices
            .iter()
            .fold((0.0_f64, 0.0_f64), |(sx, sy), [x, y]| (sx + *x, sy + *y));
        let count = self.vertices.len().max(1) as f64;
        [sum_x / count, sum_y / count]
    }
}

impl GateContainment for PolygonGeometry {
    fn contains_point(&self, x: f64, y: f64) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }
        point_in_polygon(x, y, &self.vertices)
    }
}

impl GateBounds for PolygonGeometry {
    fn bounding_box(&self) -> (f64, f64, f64, f64) {
        self.vertices.iter().fold(
            (
                f64::INFINITY,
                f64::INFINITY,
                f64::NEG_INFINITY,
                f64::NEG_INFINITY,
            ),
            |(min_x, min_y, max_x, max_y), [x, y]| {
                (min_x.min(*x), min_y.min(*y), max_x.max(*x), max_y.max(*y))
            },
        )
    }
}

impl GateValidation for PolygonGeometry {
    fn validate(&self) -> Result<()> {
        if self.vertices.len() < 3 {
            return Err(GateError::invalid_geometry(format!(
                "Polygon requires at least 3 vertices, got {}",
                self.vertices.len()
            )));
        }

        for (idx, [x, y]) in self.vertices.iter().enumerate() {
            ensure_finite(&format!("polygon_x_{}", idx), *x)?;
            ensure_finite(&format!("polygon_y_{}", idx), *y)?;
        }
        Ok(())
    }
}

/// Point-in-polygon using ray casting algorithm
fn point_in_polygon(x: f64, y: f64, polygon: &[Point]) -> bool {
    let mut inside = false;
    let n = polygon.len();

    for i in 0..n {
        let [x1, y1] = polygon[i];
        let [x2, y2] = polygon[(i + 1) % n];

        if ((y1 > y) != (y2 > y)) && (x < (x2 - x1) * (y - y1) / (y2 - y1) + x1) {
            inside = !inside;
        }
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> PolygonGeometry {
        PolygonGeometry::new(vec![[0.0, 0.0], [6.0, 0.0], [0.0, 6.0]]).unwrap()
    }

    #[test]
    fn test_label_is_vertex_mean() {
        assert_eq!(triangle().default_label(), [2.0, 2.0]);
    }

    #[test]
    fn test_ray_casting() {
        let tri = triangle();
        assert!(tri.contains_point(1.0, 1.0));
        assert!(!tri.contains_point(5.0, 5.0));
        assert!(!tri.contains_point(-1.0, 1.0));
    }

    #[test]
    fn test_requires_three_vertices() {
        let err = PolygonGeometry::new(vec![[0.0, 0.0], [1.0, 1.0]]).unwrap_err();
        assert!(err.to_string().contains("at least 3 vertices"));
    }

    #[test]
    fn test_bounding_box() {
        assert_eq!(triangle().bounding_box(), (0.0, 0.0, 6.0, 6.0));
    }
}
