//! Population expressions.
//!
//! A population is described by a boolean expression over gate identifiers.
//! The expression has up to four buckets, `$and`, `$or`, `$not` and `$xor`,
//! which combine with an implicit AND:
//!
//! - `$and`: every item matches
//! - `$or`: at least one item matches
//! - `$not`: no item matches
//! - `$xor`: an odd number of items match
//!
//! Empty buckets are left out of the serialized form and impose no condition,
//! so an empty expression selects every event.
//!
//! [`ComplexPopulationBuilder`] only produces this flat shape: repeated calls to
//! the same operator append to one bucket rather than nesting. An item may
//! itself be a nested expression, but such trees have to be built directly.

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

use crate::error::{GateError, Result};
use crate::id::IdGenerator;
use crate::tailoring::GateRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum BooleanOperation {
    #[serde(rename = "$and")]
    #[strum(serialize = "$and")]
    And,
    #[serde(rename = "$or")]
    #[strum(serialize = "$or")]
    Or,
    #[serde(rename = "$not")]
    #[strum(serialize = "$not")]
    Not,
    #[serde(rename = "$xor")]
    #[strum(serialize = "$xor")]
    Xor,
}

/// An item in a bucket: a gate or sector gid, or a nested expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExprNode {
    Gate(Arc<str>),
    Expr(Box<PopulationExpression>),
}

impl From<Arc<str>> for ExprNode {
    fn from(gid: Arc<str>) -> Self {
        ExprNode::Gate(gid)
    }
}

impl From<&str> for ExprNode {
    fn from(gid: &str) -> Self {
        ExprNode::Gate(Arc::from(gid))
    }
}

impl From<PopulationExpression> for ExprNode {
    fn from(expr: PopulationExpression) -> Self {
        ExprNode::Expr(Box::new(expr))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationExpression {
    #[serde(rename = "$and", default, skip_serializing_if = "Vec::is_empty")]
    pub and: Vec<ExprNode>,
    #[serde(rename = "$or", default, skip_serializing_if = "Vec::is_empty")]
    pub or: Vec<ExprNode>,
    #[serde(rename = "$not", default, skip_serializing_if = "Vec::is_empty")]
    pub not: Vec<ExprNode>,
    #[serde(rename = "$xor", default, skip_serializing_if = "Vec::is_empty")]
    pub xor: Vec<ExprNode>,
}

impl PopulationExpression {
    /// `{"$and": [..]}` over the given items
    pub fn all_of<I, N>(items: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<ExprNode>,
    {
        Self {
            and: items.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn bucket(&self, op: BooleanOperation) -> &[ExprNode] {
        match op {
            BooleanOperation::And => &self.and,
            BooleanOperation::Or => &self.or,
            BooleanOperation::Not => &self.not,
            BooleanOperation::Xor => &self.xor,
        }
    }

    pub fn bucket_mut(&mut self, op: BooleanOperation) -> &mut Vec<ExprNode> {
        match op {
            BooleanOperation::And => &mut self.and,
            BooleanOperation::Or => &mut self.or,
            BooleanOperation::Not => &mut self.not,
            BooleanOperation::Xor => &mut self.xor,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.and.is_empty() && self.or.is_empty() && self.not.is_empty() && self.xor.is_empty()
    }

    /// Every gid referenced, depth first, in bucket order
    pub fn gids(&self) -> Vec<&Arc<str>> {
        let mut out = Vec::new();
        self.collect_gids(&mut out);
        out
    }

    fn collect_gids<'a>(&'a self, out: &mut Vec<&'a Arc<str>>) {
        for node in self.and.iter().chain(&self.or).chain(&self.not).chain(&self.xor) {
            match node {
                ExprNode::Gate(gid) => out.push(gid),
                ExprNode::Expr(expr) => expr.collect_gids(out),
            }
        }
    }

    /// Check every referenced gid against the registry.
    ///
    /// # Errors
    /// `CompoundGateReference` for a compound gate's top-level gid, which has no
    /// membership of its own, and `UnknownGate` for anything the registry does
    /// not know.
    pub fn validate(&self, registry: &GateRegistry) -> Result<()> {
        for gid in self.gids() {
            if registry.is_compound_gid(gid) {
                return Err(GateError::CompoundGateReference {
                    gid: gid.to_string(),
                });
            }
            if !registry.knows_gid(gid) {
                return Err(GateError::unknown_gate(gid.to_string()));
            }
        }
        Ok(())
    }

    /// Evaluate membership per event from per-gid masks.
    ///
    /// # Errors
    /// `UnknownGate` when a referenced gid has no mask, `FilteringError` when a
    /// mask's length differs from `n_events`.
    pub fn evaluate(
        &self,
        masks: &FxHashMap<Arc<str>, Vec<bool>>,
        n_events: usize,
    ) -> Result<Vec<bool>> {
        let and = node_masks(&self.and, masks, n_events)?;
        let or = node_masks(&self.or, masks, n_events)?;
        let not = node_masks(&self.not, masks, n_events)?;
        let xor = node_masks(&self.xor, masks, n_events)?;

        Ok((0..n_events)
            .into_par_iter()
            .map(|i| {
                and.iter().all(|m| m[i])
                    && (or.is_empty() || or.iter().any(|m| m[i]))
                    && !not.iter().any(|m| m[i])
                    && (xor.is_empty() || xor.iter().filter(|m| m[i]).count() % 2 == 1)
            })
            .collect())
    }
}

fn node_masks<'a>(
    nodes: &'a [ExprNode],
    masks: &'a FxHashMap<Arc<str>, Vec<bool>>,
    n_events: usize,
) -> Result<Vec<Cow<'a, [bool]>>> {
    nodes
        .iter()
        .map(|node| match node {
            ExprNode::Gate(gid) => {
                let mask = masks
                    .get(gid)
                    .ok_or_else(|| GateError::unknown_gate(gid.to_string()))?;
                if mask.len() != n_events {
                    return Err(GateError::filtering_error(format!(
                        "mask for '{}' has {} entries, expected {}",
                        gid,
                        mask.len(),
                        n_events
                    )));
                }
                Ok(Cow::Borrowed(mask.as_slice()))
            }
            ExprNode::Expr(expr) => Ok(Cow::Owned(expr.evaluate(masks, n_events)?)),
        })
        .collect()
}

/// One or more gate identifiers, normalized to a list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateIds(pub Vec<Arc<str>>);

impl From<&str> for GateIds {
    fn from(gid: &str) -> Self {
        GateIds(vec![Arc::from(gid)])
    }
}

impl From<String> for GateIds {
    fn from(gid: String) -> Self {
        GateIds(vec![Arc::from(gid)])
    }
}

impl From<Arc<str>> for GateIds {
    fn from(gid: Arc<str>) -> Self {
        GateIds(vec![gid])
    }
}

impl From<&Arc<str>> for GateIds {
    fn from(gid: &Arc<str>) -> Self {
        GateIds(vec![gid.clone()])
    }
}

impl From<Vec<&str>> for GateIds {
    fn from(gids: Vec<&str>) -> Self {
        GateIds(gids.into_iter().map(Arc::from).collect())
    }
}

impl From<Vec<String>> for GateIds {
    fn from(gids: Vec<String>) -> Self {
        GateIds(gids.into_iter().map(Arc::from).collect())
    }
}

impl From<Vec<Arc<str>>> for GateIds {
    fn from(gids: Vec<Arc<str>>) -> Self {
        GateIds(gids)
    }
}

impl<const N: usize> From<[&str; N]> for GateIds {
    fn from(gids: [&str; N]) -> Self {
        GateIds(gids.into_iter().map(Arc::from).collect())
    }
}

impl From<&[&str]> for GateIds {
    fn from(gids: &[&str]) -> Self {
        GateIds(gids.iter().copied().map(Arc::from).collect())
    }
}

/// Accumulates gate ids into the four top-level buckets.
///
/// # Example
///
/// ```rust
/// use cyto_gates::ComplexPopulationBuilder;
///
/// let expr = ComplexPopulationBuilder::new("CD4+ or CD8+")
///     .or(["g1", "g2"])
///     .build();
/// assert_eq!(serde_json::to_string(&expr).unwrap(), r#"{"$or":["g1","g2"]}"#);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ComplexPopulationBuilder {
    name: String,
    expression: PopulationExpression,
}

impl ComplexPopulationBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: PopulationExpression::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append to the bucket for `op`
    pub fn push(mut self, op: BooleanOperation, ids: impl Into<GateIds>) -> Self {
        self.expression
            .bucket_mut(op)
            .extend(ids.into().0.into_iter().map(ExprNode::Gate));
        self
    }

    pub fn and(self, ids: impl Into<GateIds>) -> Self {
        self.push(BooleanOperation::And, ids)
    }

    pub fn or(self, ids: impl Into<GateIds>) -> Self {
        self.push(BooleanOperation::Or, ids)
    }

    pub fn not(self, ids: impl Into<GateIds>) -> Self {
        self.push(BooleanOperation::Not, ids)
    }

    pub fn xor(self, ids: impl Into<GateIds>) -> Self {
        self.push(BooleanOperation::Xor, ids)
    }

    pub fn build(self) -> PopulationExpression {
        self.expression
    }

    /// Build a population under `parent_id` with a fresh id
    pub fn into_population(self, ids: &mut IdGenerator, parent_id: Option<&str>) -> Population {
        Population {
            id: ids.next_id(),
            name: self.name,
            gates: self.expression,
            parent_id: parent_id.map(str::to_string),
            terminal_gate_gid: None,
        }
    }
}

/// A named population: an expression evaluated within a parent population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Population {
    #[serde(rename = "_id")]
    pub id: Arc<str>,
    pub name: String,
    pub gates: PopulationExpression,
    pub parent_id: Option<String>,
    /// Set when the population selects exactly one gate or sector
    pub terminal_gate_gid: Option<Arc<str>>,
}
