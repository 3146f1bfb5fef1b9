use derive_builder::Builder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};

use crate::error::{EventError, Result};

/// Cofactor used for arcsinh scales when none is configured
pub const DEFAULT_COFACTOR: f64 = 5.0;

/// The kind of scale bound to a channel.
///
/// Scales map raw detector values into display/analysis space. The string forms
/// are the names the analysis service uses on the wire.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
pub enum ScaleType {
    /// Identity, used for scatter and time channels
    #[strum(serialize = "LinearScale")]
    #[serde(rename = "LinearScale")]
    Linear,
    /// `log10(a)`, with everything at or below 1 collapsed to 0
    #[strum(serialize = "LogScale")]
    #[serde(rename = "LogScale")]
    Log,
    /// `asinh(a / cofactor)`
    #[strum(serialize = "ArcSinhScale")]
    #[serde(rename = "ArcSinhScale")]
    ArcSinh,
}

/// A channel's scale as delivered by the service.
///
/// The type is held as the raw string so a scale set carrying an unknown type
/// still loads; the error surfaces only when that channel is evaluated.
///
/// # Example
///
/// ```rust
/// use cyto_events::ScaleSpecBuilder;
///
/// let scale = ScaleSpecBuilder::default()
///     .scale_type("ArcSinhScale")
///     .minimum(-200.0)
///     .maximum(262144.0)
///     .cofactor(150.0)
///     .build()?;
/// assert_eq!(scale.cofactor, 150.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct ScaleSpec {
    #[serde(rename = "type")]
    pub scale_type: String,
    pub minimum: f64,
    pub maximum: f64,
    /// Only meaningful for arcsinh scales
    #[builder(default = "DEFAULT_COFACTOR")]
    #[serde(default = "default_cofactor")]
    pub cofactor: f64,
}

fn default_cofactor() -> f64 {
    DEFAULT_COFACTOR
}

impl ScaleSpec {
    pub fn new(scale_type: ScaleType, minimum: f64, maximum: f64) -> Self {
        Self {
            scale_type: scale_type.to_string(),
            minimum,
            maximum,
            cofactor: DEFAULT_COFACTOR,
        }
    }

    pub fn linear(minimum: f64, maximum: f64) -> Self {
        Self::new(ScaleType::Linear, minimum, maximum)
    }

    pub fn log(minimum: f64, maximum: f64) -> Self {
        Self::new(ScaleType::Log, minimum, maximum)
    }

    pub fn arcsinh(minimum: f64, maximum: f64, cofactor: f64) -> Self {
        Self {
            cofactor,
            ..Self::new(ScaleType::ArcSinh, minimum, maximum)
        }
    }

    /// Parse the scale type.
    ///
    /// # Errors
    /// Returns `EventError::InvalidScaleType` naming the offending string.
    pub fn kind(&self) -> Result<ScaleType> {
        self.scale_type
            .parse::<ScaleType>()
            .map_err(|_| EventError::invalid_scale_type(&self.scale_type))
    }

    /// Resolve into a scale that can be evaluated without further checks
    pub fn resolve(&self) -> Result<ResolvedScale> {
        Ok(ResolvedScale {
            kind: self.kind()?,
            minimum: self.minimum,
            maximum: self.maximum,
            cofactor: self.cofactor,
        })
    }
}

/// A `ScaleSpec` whose type has been validated
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedScale {
    pub kind: ScaleType,
    pub minimum: f64,
    pub maximum: f64,
    pub cofactor: f64,
}

impl ResolvedScale {
    /// Clip a raw value to `[minimum, maximum]`.
    ///
    /// Written with `max`/`min` rather than `f64::clamp` so an inverted range
    /// or NaN bound never panics.
    pub fn clip(&self, value: f64) -> f64 {
        value.max(self.minimum).min(self.maximum)
    }

    /// Apply the scale to one raw value, clipping the input first when `clamp` is set
    pub fn apply(&self, value: f64, clamp: bool) -> f64 {
        let value = if clamp { self.clip(value) } else { value };
        self.transform(value)
    }
}

/// Trait for types that can transform values from raw to scaled space
///
/// Transformations are applied when data is analyzed or displayed. The raw data
/// stays unchanged unless a caller asks for an in-place application.
pub trait Transformable {
    fn transform(&self, value: f64) -> f64;
    fn inverse_transform(&self, value: f64) -> f64;
}

impl Transformable for ResolvedScale {
    fn transform(&self, value: f64) -> f64 {
        match self.kind {
            ScaleType::Linear => value,
            ScaleType::Log => {
                if value <= 1.0 {
                    0.0
                } else {
                    value.log10()
                }
            }
            ScaleType::ArcSinh => (value / self.cofactor).asinh(),
        }
    }

    fn inverse_transform(&self, value: f64) -> f64 {
        match self.kind {
            ScaleType::Linear => value,
            // Inputs at or below 1 all map to 0, so 0 inverts to 1
            ScaleType::Log => 10f64.powf(value),
            ScaleType::ArcSinh => value.sinh() * self.cofactor,
        }
    }
}

/// Apply a scale to a single value.
///
/// # Errors
/// Returns `EventError::InvalidScaleType` if the scale's type is unknown.
pub fn apply(scale: &ScaleSpec, value: f64, clamp: bool) -> Result<f64> {
    Ok(scale.resolve()?.apply(value, clamp))
}

/// Apply a scale to every value of a slice, returning a new vector of the same length
pub fn apply_all(scale: &ScaleSpec, values: &[f64], clamp: bool) -> Result<Vec<f64>> {
    let resolved = scale.resolve()?;
    Ok(values
        .par_iter()
        .map(|&v| resolved.apply(v, clamp))
        .collect())
}

/// Apply a scale to every value of a slice in place
pub fn apply_in_place(scale: &ScaleSpec, values: &mut [f64], clamp: bool) -> Result<()> {
    let resolved = scale.resolve()?;
    values
        .par_iter_mut()
        .for_each(|v| *v = resolved.apply(*v, clamp));
    Ok(())
}

/// Map a scaled value back into raw space
pub fn inverse(scale: &ScaleSpec, value: f64) -> Result<f64> {
    Ok(scale.resolve()?.inverse_transform(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_is_identity() {
        let s = ScaleSpec::linear(-100.0, 1000.0);
        assert_eq!(apply(&s, 42.5, false).unwrap(), 42.5);
        assert_eq!(apply(&s, -3.0, false).unwrap(), -3.0);
        assert_eq!(inverse(&s, 7.0).unwrap(), 7.0);
    }

    #[test]
    fn test_log_collapses_sub_unity() {
        let s = ScaleSpec::log(1.0, 100000.0);
        assert_eq!(apply(&s, 1.0, false).unwrap(), 0.0);
        assert_eq!(apply(&s, 0.5, false).unwrap(), 0.0);
        assert_eq!(apply(&s, -20.0, false).unwrap(), 0.0);
        assert_relative_eq!(apply(&s, 100.0, false).unwrap(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(inverse(&s, 2.0).unwrap(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_arcsinh() {
        let s = ScaleSpec::arcsinh(-200.0, 5000.0, 5.0);
        assert_eq!(apply(&s, 0.0, false).unwrap(), 0.0);
        let y = apply(&s, 500.0, false).unwrap();
        assert_relative_eq!(y, (100.0f64).asinh(), epsilon = 1e-12);
        assert_relative_eq!(inverse(&s, y).unwrap(), 500.0, epsilon = 1e-9);
        assert!(!apply(&s, -1.0, false).unwrap().is_nan());
    }

    #[test]
    fn test_clamp_bounds_raw_value() {
        let s = ScaleSpec::log(10.0, 1000.0);
        assert_relative_eq!(apply(&s, 1.0, true).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(apply(&s, 1e6, true).unwrap(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(apply(&s, 100.0, true).unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unknown_type_fails_on_evaluation() {
        let s = ScaleSpec {
            scale_type: "LogicleScale".to_string(),
            minimum: 0.0,
            maximum: 1.0,
            cofactor: DEFAULT_COFACTOR,
        };
        let err = apply(&s, 1.0, false).unwrap_err();
        assert!(
            matches!(err, EventError::InvalidScaleType { ref scale_type } if scale_type == "LogicleScale")
        );
        assert!(err.to_string().contains("LogicleScale"));
    }

    #[test]
    fn test_vector_forms() {
        let s = ScaleSpec::arcsinh(-10.0, 10.0, 2.0);
        assert!(apply_all(&s, &[], true).unwrap().is_empty());

        let values = vec![-50.0, 0.0, 4.0, 50.0];
        let out = apply_all(&s, &values, true).unwrap();
        assert_eq!(out.len(), 4);
        assert_relative_eq!(out[0], (-5.0f64).asinh(), epsilon = 1e-12);
        assert_relative_eq!(out[3], (5.0f64).asinh(), epsilon = 1e-12);

        let mut in_place = values.clone();
        apply_in_place(&s, &mut in_place, true).unwrap();
        assert_eq!(in_place, out);
    }

    #[test]
    fn test_scale_type_strings() {
        assert_eq!(ScaleType::ArcSinh.to_string(), "ArcSinhScale");
        assert_eq!("LinearScale".parse::<ScaleType>().unwrap(), ScaleType::Linear);
        assert!("linear".parse::<ScaleType>().is_err());
    }

    #[test]
    fn test_spec_deserializes_without_cofactor() {
        let s: ScaleSpec =
            serde_json::from_str(r#"{"type":"LinearScale","minimum":0,"maximum":262144}"#).unwrap();
        assert_eq!(s.cofactor, DEFAULT_COFACTOR);
        assert_eq!(s.kind().unwrap(), ScaleType::Linear);
    }
}
