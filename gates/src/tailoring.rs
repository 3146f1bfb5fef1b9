//! Gate families and per-sample tailoring.
//!
//! All instances sharing a `gid` form a [`GateFamily`]. The instance with no
//! `fcs_file_id` is the global definition; every other instance is tailored to
//! exactly one sample. When a gate is evaluated for a sample, that sample's
//! tailored instance wins if there is one and the global instance governs
//! otherwise. Tailored instances never inherit from each other.
//!
//! The [`GateRegistry`] owns the families and the id generator used to mint
//! gids, instance ids and sector gids. It has no internal locking; hosts that
//! share one across threads serialize access themselves.

use itertools::Itertools;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::GateDefaults;
use crate::error::{GateError, Result};
use crate::geometry::GateDraft;
use crate::id::IdGenerator;
use crate::population::Population;
use crate::sample::{SampleRef, SampleResolver};
use crate::traits::GateValidation;
use crate::types::{Gate, GateGeometry, GateKind};
use cyto_events::ScaleSet;

/// One logical gate: a global instance plus per-sample overrides
#[derive(Debug, Clone)]
pub struct GateFamily {
    gid: Arc<str>,
    kind: GateKind,
    /// Keyed by `fcs_file_id`; `None` is the global instance
    instances: BTreeMap<Option<String>, Gate>,
}

impl GateFamily {
    fn new(global: Gate) -> Self {
        let mut instances = BTreeMap::new();
        let gid = global.gid.clone();
        let kind = global.kind();
        instances.insert(None, global);
        Self {
            gid,
            kind,
            instances,
        }
    }

    pub fn gid(&self) -> &Arc<str> {
        &self.gid
    }

    pub fn kind(&self) -> GateKind {
        self.kind
    }

    pub fn global(&self) -> Option<&Gate> {
        self.instances.get(&None)
    }

    pub fn tailored(&self, fcs_file_id: &str) -> Option<&Gate> {
        self.instances.get(&Some(fcs_file_id.to_string()))
    }

    /// Tailored instances ordered by sample id
    pub fn tailored_instances(&self) -> impl Iterator<Item = &Gate> {
        self.instances
            .iter()
            .filter(|(key, _)| key.is_some())
            .map(|(_, gate)| gate)
    }

    pub fn instances(&self) -> impl Iterator<Item = &Gate> {
        self.instances.values()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// The instance governing `sample`: its tailored instance if present,
    /// otherwise the global one
    pub fn resolve(&self, sample: Option<&str>) -> Option<&Gate> {
        sample
            .and_then(|s| self.tailored(s))
            .or_else(|| self.global())
    }

    fn find(&self, gate_id: &str) -> Option<&Option<String>> {
        self.instances
            .iter()
            .find(|(_, gate)| &*gate.id == gate_id)
            .map(|(key, _)| key)
    }

    /// Keep every instance's `tailored_per_file` in step with whether any
    /// tailored instance exists
    fn sync_tailored_flag(&mut self) {
        let tailored = self.instances.keys().any(Option::is_some);
        for gate in self.instances.values_mut() {
            gate.tailored_per_file = tailored;
        }
    }
}

/// Instances touched by one `apply_tailoring` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TailoringDiff {
    pub inserted: Vec<Gate>,
    pub updated: Vec<Gate>,
    pub deleted: Vec<Gate>,
}

impl TailoringDiff {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct GateRegistry {
    families: BTreeMap<Arc<str>, GateFamily>,
    /// Sector gid to owning family gid
    sector_owners: FxHashMap<Arc<str>, Arc<str>>,
    ids: IdGenerator,
    defaults: GateDefaults,
}

impl GateRegistry {
    pub fn new(ids: IdGenerator) -> Self {
        Self {
            families: BTreeMap::new(),
            sector_owners: FxHashMap::default(),
            ids,
            defaults: GateDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: GateDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &GateDefaults {
        &self.defaults
    }

    /// The generator used for every id this registry mints
    pub fn ids(&mut self) -> &mut IdGenerator {
        &mut self.ids
    }

    /// Create a new family from `draft` and return its global instance.
    ///
    /// A gid is minted unless the draft carries one. `scales` supplies the
    /// corner labels of compound gates drafted without labels.
    ///
    /// # Errors
    /// `DuplicateInstance` if the draft's gid is already in use, plus any
    /// validation error from the draft.
    pub fn create_global(&mut self, draft: GateDraft, scales: &ScaleSet) -> Result<Gate> {
        if let Some(gid) = &draft.gid {
            if self.knows_gid(gid) {
                return Err(GateError::duplicate_instance(gid.to_string(), None));
            }
        }

        let gate = draft.into_gate(&mut self.ids, scales, &self.defaults)?;
        for sector in &gate.sectors {
            self.sector_owners.insert(sector.gid.clone(), gate.gid.clone());
        }

        debug!(gid = %gate.gid, kind = %gate.kind(), sectors = gate.sectors.len(), "created gate family");
        self.families
            .insert(gate.gid.clone(), GateFamily::new(gate.clone()));
        Ok(gate)
    }

    /// Create a tailored instance of family `gid` for one sample.
    ///
    /// The instance copies the global instance's name, channels and sector ids
    /// and takes `geometry`. Simple gates get the new shape's midpoint label;
    /// compound gates keep the global corner labels.
    ///
    /// # Errors
    /// `UnknownGate` without a global instance for `gid`, `GateKindMismatch`
    /// when `geometry` is a different kind, `DuplicateInstance` when the sample
    /// already has one.
    pub fn create_tailored(
        &mut self,
        gid: &str,
        fcs_file_id: &str,
        geometry: GateGeometry,
    ) -> Result<Gate> {
        geometry.validate()?;

        let family = self
            .families
            .get_mut(gid)
            .ok_or_else(|| GateError::unknown_gate(gid))?;
        let global = family.global().ok_or_else(|| GateError::unknown_gate(gid))?;

        if geometry.kind() != family.kind {
            return Err(GateError::GateKindMismatch {
                expected: family.kind,
                found: geometry.kind(),
            });
        }
        if family.tailored(fcs_file_id).is_some() {
            return Err(GateError::duplicate_instance(gid, Some(fcs_file_id)));
        }

        let labels = match geometry.default_label() {
            Some(label) => vec![label],
            None => global.labels.clone(),
        };
        let gate = Gate {
            id: self.ids.next_id(),
            fcs_file_id: Some(fcs_file_id.to_string()),
            geometry,
            labels,
            ..global.clone()
        };

        family
            .instances
            .insert(gate.fcs_file_id.clone(), gate);
        family.sync_tailored_flag();
        debug!(%gid, fcs_file_id, "created tailored gate");

        family
            .tailored(fcs_file_id)
            .cloned()
            .ok_or_else(|| GateError::unknown_gate(gid))
    }

    /// [`create_tailored`](Self::create_tailored) for a sample given by id or name
    pub fn create_tailored_for(
        &mut self,
        gid: &str,
        sample: &SampleRef,
        resolver: &dyn SampleResolver,
        geometry: GateGeometry,
    ) -> Result<Gate> {
        let fcs_file_id = sample.resolve(resolver)?;
        self.create_tailored(gid, &fcs_file_id, geometry)
    }

    /// Bring `targets` in line with the instance `source_id`.
    ///
    /// From the global instance, every target loses its tailored instance and
    /// falls back to the global definition. From a tailored instance, every
    /// target ends up with a tailored instance of the same geometry, labels and
    /// sector names: missing ones are inserted, differing ones updated, matching
    /// ones left alone. Calling this twice with the same targets changes
    /// nothing the second time.
    pub fn apply_tailoring<I, S>(&mut self, source_id: &str, targets: I) -> Result<TailoringDiff>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let targets: BTreeSet<String> = targets.into_iter().map(Into::into).collect();
        let (gid, source_key) = self
            .locate(source_id)
            .map(|(gid, key)| (gid.clone(), key.clone()))
            .ok_or_else(|| GateError::unknown_gate(source_id))?;

        let mut diff = TailoringDiff::default();
        let family = self
            .families
            .get_mut(&gid)
            .ok_or_else(|| GateError::unknown_gate(gid.to_string()))?;
        let source = family
            .instances
            .get(&source_key)
            .cloned()
            .ok_or_else(|| GateError::unknown_gate(source_id))?;

        for target in &targets {
            let key = Some(target.clone());
            if source_key.is_none() {
                if let Some(removed) = family.instances.remove(&key) {
                    diff.deleted.push(removed);
                }
                continue;
            }

            match family.instances.get_mut(&key) {
                Some(existing) if existing.same_shape(&source) => {
                    trace!(%gid, sample = %target, "tailored gate already matches");
                }
                Some(existing) => {
                    existing.geometry = source.geometry.clone();
                    existing.labels = source.labels.clone();
                    for (sector, wanted) in existing.sectors.iter_mut().zip(&source.sectors) {
                        sector.name = wanted.name.clone();
                    }
                    diff.updated.push(existing.clone());
                }
                None => {
                    let gate = Gate {
                        id: self.ids.next_id(),
                        fcs_file_id: key.clone(),
                        ..source.clone()
                    };
                    diff.inserted.push(gate.clone());
                    family.instances.insert(key, gate);
                }
            }
        }

        family.sync_tailored_flag();
        // Returned copies carry the flag as stored
        let tailored = family.instances.keys().any(Option::is_some);
        for gate in diff.inserted.iter_mut().chain(diff.updated.iter_mut()) {
            gate.tailored_per_file = tailored;
        }

        debug!(
            %gid,
            targets = targets.len(),
            inserted = diff.inserted.len(),
            updated = diff.updated.len(),
            deleted = diff.deleted.len(),
            "applied tailoring"
        );
        Ok(diff)
    }

    /// Remove the global instance and every tailored instance of `gid`
    pub fn delete_family(&mut self, gid: &str) -> Result<Vec<Gate>> {
        let family = self
            .families
            .remove(gid)
            .ok_or_else(|| GateError::unknown_gate(gid))?;
        self.sector_owners.retain(|_, owner| &**owner != gid);

        debug!(%gid, instances = family.len(), "deleted gate family");
        Ok(family.instances.into_values().collect())
    }

    /// Remove exactly one instance by its id. A family left with no instances
    /// is dropped.
    ///
    /// # Errors
    /// `UnknownGate` for an unknown id, `GlobalInstanceInUse` when `gate_id` is
    /// a global instance whose family still has tailored instances.
    pub fn delete_one(&mut self, gate_id: &str) -> Result<Gate> {
        let (gid, key) = self
            .locate(gate_id)
            .map(|(gid, key)| (gid.clone(), key.clone()))
            .ok_or_else(|| GateError::unknown_gate(gate_id))?;

        let family = self
            .families
            .get_mut(&gid)
            .ok_or_else(|| GateError::unknown_gate(gid.to_string()))?;
        if key.is_none() {
            let tailored = family.tailored_instances().count();
            if tailored > 0 {
                return Err(GateError::GlobalInstanceInUse {
                    gid: gid.to_string(),
                    tailored,
                });
            }
        }
        let removed = family
            .instances
            .remove(&key)
            .ok_or_else(|| GateError::unknown_gate(gate_id))?;
        family.sync_tailored_flag();

        if family.is_empty() {
            self.delete_family(&gid)?;
        }
        trace!(%gid, gate_id, "deleted gate instance");
        Ok(removed)
    }

    /// The instance of family `gid` governing `sample` (`None` for the global
    /// view). A sector gid resolves to its compound gate.
    pub fn resolve(&self, gid: &str, sample: Option<&str>) -> Result<&Gate> {
        let family_gid = self.compound_gid(gid).map(|owner| &**owner).unwrap_or(gid);
        self.families
            .get(family_gid)
            .and_then(|family| family.resolve(sample))
            .ok_or_else(|| GateError::unknown_gate(gid))
    }

    /// [`resolve`](Self::resolve) for a sample given by id or name
    pub fn resolve_for(
        &self,
        gid: &str,
        sample: &SampleRef,
        resolver: &dyn SampleResolver,
    ) -> Result<&Gate> {
        let fcs_file_id = sample.resolve(resolver)?;
        self.resolve(gid, Some(&fcs_file_id))
    }

    pub fn family(&self, gid: &str) -> Option<&GateFamily> {
        self.families.get(gid)
    }

    pub fn families(&self) -> impl Iterator<Item = &GateFamily> {
        self.families.values()
    }

    /// Every instance of every family
    pub fn gates(&self) -> impl Iterator<Item = &Gate> {
        self.families.values().flat_map(GateFamily::instances)
    }

    /// Any instance by its id
    pub fn find_instance(&self, gate_id: &str) -> Option<&Gate> {
        self.gates().find(|gate| &*gate.id == gate_id)
    }

    /// The compound gate owning a sector gid
    pub fn compound_gid(&self, sector_gid: &str) -> Option<&Arc<str>> {
        self.sector_owners.get(sector_gid)
    }

    /// Whether `gid` is the top-level gid of a compound gate
    pub fn is_compound_gid(&self, gid: &str) -> bool {
        self.families
            .get(gid)
            .is_some_and(|family| family.kind.is_compound())
    }

    /// Whether `gid` names a family or a sector
    pub fn knows_gid(&self, gid: &str) -> bool {
        self.families.contains_key(gid) || self.sector_owners.contains_key(gid)
    }

    /// Sample ids with a tailored instance of `gid`
    pub fn tailored_samples(&self, gid: &str) -> Vec<&str> {
        self.families
            .get(gid)
            .map(|family| {
                family
                    .tailored_instances()
                    .filter_map(|gate| gate.fcs_file_id.as_deref())
                    .collect_vec()
            })
            .unwrap_or_default()
    }

    /// One population per simple gate or per sector of family `gid`
    pub fn default_populations(
        &mut self,
        gid: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<Population>> {
        let global = self
            .families
            .get(gid)
            .and_then(GateFamily::global)
            .ok_or_else(|| GateError::unknown_gate(gid))?;
        Ok(global.default_populations(&mut self.ids, parent_id))
    }

    fn locate(&self, gate_id: &str) -> Option<(&Arc<str>, &Option<String>)> {
        self.families
            .iter()
            .find_map(|(gid, family)| family.find(gate_id).map(|key| (gid, key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateDefaults;
    use crate::geometry::{create_rectangle_geometry, create_split_geometry};
    use crate::id::FixedClock;

    fn registry() -> GateRegistry {
        GateRegistry::new(IdGenerator::seeded(11).with_clock(FixedClock(1_700_000_000)))
    }

    fn rect(x2: f64) -> GateGeometry {
        create_rectangle_geometry(vec![(0.0, 0.0), (x2, 10.0)]).unwrap()
    }

    fn global_rect(registry: &mut GateRegistry) -> Gate {
        let draft = GateDraft::builder()
            .name("Lymphocytes")
            .x_channel("FSC-A")
            .y_channel("SSC-A")
            .geometry(rect(10.0))
            .build()
            .unwrap();
        registry.create_global(draft, &ScaleSet::new()).unwrap()
    }

    #[test]
    fn test_global_instance() {
        let mut registry = registry();
        let gate = global_rect(&mut registry);
        assert!(gate.is_global());
        assert!(!gate.tailored_per_file);
        assert_eq!(registry.family(&gate.gid).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_gid_rejected() {
        let mut registry = registry();
        let gate = global_rect(&mut registry);
        let draft = GateDraft::builder()
            .name("again")
            .x_channel("FSC-A")
            .y_channel("SSC-A")
            .geometry(rect(5.0))
            .gid(gate.gid.clone())
            .build()
            .unwrap();
        assert!(matches!(
            registry.create_global(draft, &ScaleSet::new()),
            Err(GateError::DuplicateInstance { fcs_file_id: None, .. })
        ));
    }

    #[test]
    fn test_tailored_kind_must_match() {
        let mut registry = registry();
        let gate = global_rect(&mut registry);
        let split = create_split_geometry(1.0, None, &GateDefaults::default()).unwrap();
        let err = registry.create_tailored(&gate.gid, "s1", split).unwrap_err();
        assert!(matches!(
            err,
            GateError::GateKindMismatch {
                expected: GateKind::Rectangle,
                found: GateKind::Split
            }
        ));
    }

    #[test]
    fn test_tailored_instance_shares_gid() {
        let mut registry = registry();
        let gate = global_rect(&mut registry);
        let tailored = registry.create_tailored(&gate.gid, "s1", rect(20.0)).unwrap();

        assert_eq!(tailored.gid, gate.gid);
        assert_ne!(tailored.id, gate.id);
        assert_eq!(tailored.labels, vec![[10.0, 5.0]]);
        assert!(tailored.tailored_per_file);
        assert!(registry.resolve(&gate.gid, None).unwrap().tailored_per_file);

        assert!(matches!(
            registry.create_tailored(&gate.gid, "s1", rect(30.0)),
            Err(GateError::DuplicateInstance { .. })
        ));
        assert!(matches!(
            registry.create_tailored("nope", "s1", rect(30.0)),
            Err(GateError::UnknownGate { .. })
        ));
    }

    #[test]
    fn test_spread_then_reset() {
        let mut registry = registry();
        let gate = global_rect(&mut registry);
        let tailored = registry.create_tailored(&gate.gid, "s1", rect(20.0)).unwrap();
        registry.create_tailored(&gate.gid, "s3", rect(40.0)).unwrap();

        let diff = registry
            .apply_tailoring(&tailored.id, ["s1", "s2", "s3"])
            .unwrap();
        assert!(diff.deleted.is_empty());
        assert_eq!(diff.inserted.len(), 1);
        assert_eq!(diff.inserted[0].fcs_file_id.as_deref(), Some("s2"));
        assert_eq!(diff.updated.len(), 1);
        assert_eq!(diff.updated[0].fcs_file_id.as_deref(), Some("s3"));
        assert_eq!(registry.tailored_samples(&gate.gid), vec!["s1", "s2", "s3"]);

        let diff = registry.apply_tailoring(&gate.id, ["s2", "s3"]).unwrap();
        assert_eq!(diff.deleted.len(), 2);
        assert_eq!(registry.tailored_samples(&gate.gid), vec!["s1"]);
        assert_eq!(registry.resolve(&gate.gid, Some("s2")).unwrap().id, gate.id);
    }

    #[test]
    fn test_delete_one_keeps_siblings() {
        let mut registry = registry();
        let gate = global_rect(&mut registry);
        let tailored = registry.create_tailored(&gate.gid, "s1", rect(20.0)).unwrap();

        let removed = registry.delete_one(&tailored.id).unwrap();
        assert_eq!(removed.id, tailored.id);
        let global = registry.resolve(&gate.gid, Some("s1")).unwrap();
        assert_eq!(global.id, gate.id);
        assert!(!global.tailored_per_file);
    }

    #[test]
    fn test_delete_global_with_tailored_siblings() {
        let mut registry = registry();
        let gate = global_rect(&mut registry);
        let tailored = registry.create_tailored(&gate.gid, "s1", rect(20.0)).unwrap();

        assert!(matches!(
            registry.delete_one(&gate.id),
            Err(GateError::GlobalInstanceInUse { tailored: 1, .. })
        ));
        assert_eq!(registry.resolve(&gate.gid, Some("s2")).unwrap().id, gate.id);

        registry.delete_one(&tailored.id).unwrap();
        let removed = registry.delete_one(&gate.id).unwrap();
        assert_eq!(removed.id, gate.id);
        assert!(registry.family(&gate.gid).is_none());
    }

    #[test]
    fn test_delete_family() {
        let mut registry = registry();
        let gate = global_rect(&mut registry);
        registry.create_tailored(&gate.gid, "s1", rect(20.0)).unwrap();

        let removed = registry.delete_family(&gate.gid).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(registry.family(&gate.gid).is_none());
        assert!(registry.gates().next().is_none());
        assert!(registry.delete_family(&gate.gid).is_err());
    }

    #[test]
    fn test_unknown_source() {
        let mut registry = registry();
        assert!(matches!(
            registry.apply_tailoring("missing", ["s1"]),
            Err(GateError::UnknownGate { .. })
        ));
    }
}
