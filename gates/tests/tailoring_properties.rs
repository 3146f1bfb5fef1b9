//! Property tests for id minting, tailoring and sector classification.

use cyto_events::table::event_table;
use cyto_events::{ScaleSet, ScaleSpec};
use cyto_gates::*;
use proptest::prelude::*;
use std::collections::HashSet;

fn scales() -> ScaleSet {
    [
        ("x".to_string(), ScaleSpec::linear(-1000.0, 1000.0)),
        ("y".to_string(), ScaleSpec::linear(-1000.0, 1000.0)),
    ]
    .into_iter()
    .collect()
}

fn rectangle(a: f64, b: f64) -> GateGeometry {
    create_rectangle_geometry(vec![(a, a), (b, b)]).unwrap()
}

proptest! {
    #[test]
    fn minted_gids_never_collide(seed: u64, quadrants in 1usize..4, splits in 1usize..4) {
        let mut registry = GateRegistry::new(IdGenerator::seeded(seed));
        let defaults = GateDefaults::default();
        let mut seen = HashSet::new();

        for i in 0..quadrants {
            let draft = GateDraft::builder()
                .name(format!("q{i}"))
                .x_channel("x")
                .y_channel("y")
                .geometry(create_quadrant_geometry(0.0, 0.0, None, &defaults).unwrap())
                .build()
                .unwrap();
            let gate = registry.create_global(draft, &scales()).unwrap();
            prop_assert!(seen.insert(gate.gid.clone()));
            for gid in gate.sector_gids() {
                prop_assert!(seen.insert(gid.clone()));
            }
        }
        for i in 0..splits {
            let draft = GateDraft::builder()
                .name(format!("s{i}"))
                .x_channel("x")
                .geometry(create_split_geometry(0.0, None, &defaults).unwrap())
                .build()
                .unwrap();
            let gate = registry.create_global(draft, &scales()).unwrap();
            prop_assert_eq!(gate.sectors.len(), 2);
            prop_assert!(seen.insert(gate.gid.clone()));
            for gid in gate.sector_gids() {
                prop_assert!(seen.insert(gid.clone()));
            }
        }
        prop_assert_eq!(seen.len(), quadrants * 5 + splits * 3);
        prop_assert!(seen.iter().all(|gid| is_valid_id(gid)));
    }

    #[test]
    fn apply_tailoring_twice_changes_nothing(
        seed: u64,
        existing in prop::collection::btree_map("s[0-9]", 1.0f64..50.0, 0..5),
        targets in prop::collection::vec("s[0-9]", 0..10),
    ) {
        let mut registry = GateRegistry::new(IdGenerator::seeded(seed));
        let draft = GateDraft::builder()
            .name("r")
            .x_channel("x")
            .y_channel("y")
            .geometry(rectangle(0.0, 100.0))
            .build()
            .unwrap();
        let global = registry.create_global(draft, &scales()).unwrap();
        for (sample, size) in &existing {
            registry.create_tailored(&global.gid, sample, rectangle(0.0, *size)).unwrap();
        }
        let source = registry
            .create_tailored(&global.gid, "source", rectangle(-10.0, 10.0))
            .unwrap();

        registry.apply_tailoring(&source.id, targets.clone()).unwrap();
        let second = registry.apply_tailoring(&source.id, targets.clone()).unwrap();
        prop_assert!(second.is_empty());

        for target in &targets {
            let gate = registry.resolve(&global.gid, Some(target)).unwrap();
            prop_assert!(gate.same_shape(&source));
        }

        registry.apply_tailoring(&global.id, targets.clone()).unwrap();
        prop_assert!(registry.apply_tailoring(&global.id, targets.clone()).unwrap().is_empty());
        for target in &targets {
            prop_assert_eq!(&registry.resolve(&global.gid, Some(target)).unwrap().id, &global.id);
        }
    }

    #[test]
    fn every_event_lands_in_one_quadrant_sector(
        seed: u64,
        center in (-500.0f64..500.0, -500.0f64..500.0),
        rotation in -10.0f64..10.0,
        points in prop::collection::vec((-1000.0f64..1000.0, -1000.0f64..1000.0), 1..200),
    ) {
        let mut registry = GateRegistry::new(IdGenerator::seeded(seed));
        let angles = DEFAULT_QUADRANT_ANGLES.map(|angle| angle + rotation);
        let draft = GateDraft::builder()
            .name("q")
            .x_channel("x")
            .y_channel("y")
            .geometry(create_quadrant_geometry(center.0, center.1, Some(angles), registry.defaults()).unwrap())
            .build()
            .unwrap();
        let gate = registry.create_global(draft, &scales()).unwrap();

        let (xs, ys): (Vec<f64>, Vec<f64>) = points.iter().copied().unzip();
        let table = event_table([("x", xs), ("y", ys)]).unwrap();
        let masks = sector_masks(&gate, &table).unwrap();

        prop_assert_eq!(masks.len(), 4);
        for i in 0..points.len() {
            prop_assert_eq!(masks.iter().filter(|(_, mask)| mask[i]).count(), 1);
        }
    }

    #[test]
    fn split_sides_follow_the_threshold(
        split in -500.0f64..500.0,
        xs in prop::collection::vec(-1000.0f64..1000.0, 1..100),
    ) {
        let mut registry = GateRegistry::new(IdGenerator::seeded(7));
        let draft = GateDraft::builder()
            .name("s")
            .x_channel("x")
            .geometry(create_split_geometry(split, None, registry.defaults()).unwrap())
            .build()
            .unwrap();
        let gate = registry.create_global(draft, &scales()).unwrap();

        let table = event_table([("x", xs.clone())]).unwrap();
        let masks = sector_masks(&gate, &table).unwrap();
        for (i, x) in xs.iter().enumerate() {
            prop_assert_eq!(masks[0].1[i], *x < split);
            prop_assert_eq!(masks[1].1[i], *x >= split);
        }
    }
}
