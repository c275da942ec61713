//! Plan assembly and realization against the kitchen catalog.

use std::collections::HashSet;

use proptest::prelude::*;
use tabletop_catalog::{GroupQuery, SimilarityTable};
use tabletop_core::{rng_from_seed, ConfigError, EpisodeError, EpisodeRng, Pose, Vec3};
use tabletop_scene::{
    CategoryClass, ContainTemplate, CountRange, DistractorBuilder, DistractorInstance, DropReason,
    FocusContext, Mode, ObjectSpec, PlacementDirective, PlacementSampler, PlacementSpec,
    PlanAssembler, RegionPlacement, RegionSelection, RegionTemplate, SampleRequest,
    SamplingFailure, SiteSelector, SlotTemplate,
};
use tabletop_test_utils::{kitchen_catalog, MockAssetFactory};

/// Places every slot at its region centre, except the listed slots.
struct CentreSampler {
    fail: HashSet<String>,
    seen: Vec<String>,
}

impl CentreSampler {
    fn failing(names: &[&str]) -> Self {
        Self {
            fail: names.iter().map(|n| (*n).to_owned()).collect(),
            seen: Vec::new(),
        }
    }
}

impl PlacementSampler for CentreSampler {
    fn sample(
        &mut self,
        request: &SampleRequest<'_>,
        _rng: &mut EpisodeRng,
    ) -> Result<Pose, SamplingFailure> {
        self.seen.push(request.slot.to_string());
        if self.fail.contains(request.slot.as_str()) {
            return Err(SamplingFailure { attempts: 5000 });
        }
        let base = request.reference.map_or(Vec3::default(), |r| r.pose.pos);
        let (x, y) = request.placement.region_center;
        Ok(Pose::at(Vec3::new(base.x + x, base.y + y, 0.9)))
    }
}

fn task_slots(obj: &str, source: &str, target: &str) -> Vec<ObjectSpec> {
    vec![
        ObjectSpec::essential("container", target)
            .placed(PlacementSpec::on("counter").at(0.75, -0.15).sized(0.6, 0.2)),
        ObjectSpec::essential("obj", obj).graspable().placed(
            PlacementSpec::on("counter")
                .at(0.85, -0.9)
                .sized(0.7, 0.3)
                .in_new_container(source)
                .in_ref_region(),
        ),
    ]
}

fn distractor_regions() -> Vec<RegionTemplate> {
    vec![
        RegionTemplate::new(
            "distractor_obj",
            RegionPlacement {
                contain: Some(ContainTemplate::Existing("obj_container".into())),
                ensure_in_ref_region: true,
                boundary_containment: false,
                ..Default::default()
            },
        )
        .object(
            SlotTemplate::symbolic(CategoryClass::Obj, Mode::Distractor, CountRange::exactly(1))
                .excluding_groups(["drink"]),
        ),
        RegionTemplate::new(
            "distractor_target_container",
            RegionPlacement {
                center: (0.0, -0.6),
                size: (1.1, 0.45),
                boundary_containment: false,
                ..Default::default()
            },
        )
        .object(SlotTemplate::symbolic(
            CategoryClass::TargetContainer,
            Mode::Distractor,
            CountRange::exactly(1),
        )),
    ]
}

fn focus(obj: &str, source: &str, target: &str) -> FocusContext {
    FocusContext {
        obj: Some(GroupQuery::from(obj)),
        source: Some(source.into()),
        target: Some(target.into()),
        obj_pool: ["apple", "pear", "orange", "onion", "carrot", "croissant"]
            .map(String::from)
            .to_vec(),
        source_pool: ["cutting_board", "tray", "plate", "placemat"]
            .map(String::from)
            .to_vec(),
        target_pool: [
            "basket",
            "pan",
            "pot",
            "bowl",
            "plate",
            "tiered_shelf",
            "tiered_basket",
            "cardboard_box",
        ]
        .map(String::from)
        .to_vec(),
        similarity: SimilarityTable::from_declarations(vec![
            ("tray", vec!["cutting_board"]),
            ("basket", vec!["tiered_basket"]),
            ("tiered_basket", vec!["basket", "tiered_shelf"]),
            ("pot", vec!["pan"]),
        ]),
        surface: Some("counter".into()),
    }
}

fn distractors(seed: u64, obj: &str, source: &str, target: &str) -> DistractorInstance {
    let cfg = DistractorBuilder::new()
        .build(
            &[],
            &distractor_regions(),
            1,
            &RegionSelection::Explicit(vec![
                "distractor_obj".into(),
                "distractor_target_container".into(),
            ]),
        )
        .unwrap();
    let mut rng = rng_from_seed(seed);
    cfg.resolve_instance(&focus(obj, source, target), &mut rng)
}

#[test]
fn containers_precede_dependents() {
    let catalog = kitchen_catalog();
    let mut factory = MockAssetFactory::kitchen(catalog.clone());
    let mut rng = rng_from_seed(7);
    let plan = PlanAssembler::new(&catalog)
        .assemble(
            task_slots("apple", "tray", "bowl"),
            distractors(7, "apple", "tray", "bowl"),
            &mut factory,
            &mut rng,
        )
        .unwrap();

    let container = plan.position_of("obj_container").unwrap();
    assert!(container < plan.position_of("obj").unwrap());
    let d = plan.distractors_in_region("distractor_obj").next().unwrap();
    assert!(container < plan.position_of(d.name().as_str()).unwrap());
    assert_eq!(
        d.spec.placement.directive,
        PlacementDirective::RelativeTo {
            reference: "obj_container".into(),
            site: None,
        }
    );
    assert_eq!(plan.category_of("obj_container").map(|c| c.as_str()), Some("tray"));
    assert_eq!(plan.essential_count(), 3);
}

#[test]
fn contained_placement_is_rewritten() {
    let catalog = kitchen_catalog();
    let mut factory = MockAssetFactory::kitchen(catalog.clone());
    let mut rng = rng_from_seed(1);
    let plan = PlanAssembler::new(&catalog)
        .assemble(
            task_slots("apple", "tray", "bowl"),
            DistractorInstance::default(),
            &mut factory,
            &mut rng,
        )
        .unwrap();
    let obj = &plan.get("obj").unwrap().spec.placement;
    assert_eq!(obj.region_size, (0.1, 0.1));
    assert!(!obj.boundary_containment);
    assert!(obj.ensure_in_ref_region);
    let container = &plan.get("obj_container").unwrap().spec.placement;
    assert_eq!(container.region_center, (0.85, -0.9));
    assert_eq!(container.directive, PlacementDirective::Free);
}

#[test]
fn distractors_avoid_task_categories() {
    let catalog = kitchen_catalog();
    for seed in 0..40 {
        let mut factory = MockAssetFactory::kitchen(catalog.clone());
        let mut rng = rng_from_seed(seed);
        let essential = vec![
            ObjectSpec::essential("obj", "fruit").graspable(),
            ObjectSpec::essential("container", "receptacle"),
        ];
        let tag = |i| tabletop_scene::DistractorTag {
            region: "r".into(),
            type_index: 0,
            instance: i,
        };
        let mut instance = DistractorInstance::default();
        for i in 0..3 {
            instance.objects.push(ObjectSpec::new(
                tag(i).slot_name(),
                tabletop_scene::SlotRole::Distractor(tag(i)),
                "fruit",
            ));
        }
        let plan = PlanAssembler::new(&catalog)
            .assemble(essential, instance, &mut factory, &mut rng)
            .unwrap();
        let obj = plan.category_of("obj").unwrap().clone();
        for o in plan.distractors_in_region("r") {
            assert_ne!(o.spec.category(), Some(&obj), "seed {seed}");
        }
    }
}

#[test]
fn distractor_containers_skip_focus_and_look_alikes() {
    let catalog = kitchen_catalog();
    for seed in 0..40 {
        let mut factory = MockAssetFactory::kitchen(catalog.clone());
        let mut rng = rng_from_seed(seed);
        let plan = PlanAssembler::new(&catalog)
            .assemble(
                task_slots("apple", "tray", "tiered_basket"),
                distractors(seed, "apple", "tray", "tiered_basket"),
                &mut factory,
                &mut rng,
            )
            .unwrap();
        for d in plan.distractors_in_region("distractor_target_container") {
            let cat = d.spec.category().unwrap().as_str();
            assert!(
                !["tiered_basket", "basket", "tiered_shelf"].contains(&cat),
                "seed {seed} chose {cat}"
            );
        }
    }
}

#[test]
fn same_as_reuses_resolved_category() {
    let catalog = kitchen_catalog();
    let mut factory = MockAssetFactory::kitchen(catalog.clone());
    let mut rng = rng_from_seed(3);
    let tag = tabletop_scene::DistractorTag {
        region: "copy".into(),
        type_index: 0,
        instance: 0,
    };
    let mut copy = ObjectSpec::new(
        tag.slot_name(),
        tabletop_scene::SlotRole::Distractor(tag),
        GroupQuery::SameAs("obj".into()),
    );
    copy.exclude_obj_cat = false;
    let plan = PlanAssembler::new(&catalog)
        .assemble(
            vec![ObjectSpec::essential("obj", "vegetable")],
            DistractorInstance {
                objects: vec![copy],
                fixtures: Vec::new(),
            },
            &mut factory,
            &mut rng,
        )
        .unwrap();
    assert_eq!(
        plan.category_of("obj"),
        plan.category_of("distractor_obj_copy_type_0_num_0")
    );
}

#[test]
fn containment_of_non_container_object_is_fatal() {
    let catalog = kitchen_catalog();
    let mut factory = MockAssetFactory::kitchen(catalog.clone());
    let mut rng = rng_from_seed(0);
    let slots = vec![ObjectSpec::essential("obj", "bowl")
        .placed(PlacementSpec::on("counter").in_new_container("tray"))];
    match PlanAssembler::new(&catalog).assemble(
        slots,
        DistractorInstance::default(),
        &mut factory,
        &mut rng,
    ) {
        Err(e @ EpisodeError::ContainmentViolation { .. }) => assert!(!e.is_retryable()),
        other => panic!("expected ContainmentViolation, got {other:?}"),
    }
}

#[test]
fn essential_without_candidates_is_retryable() {
    let catalog = kitchen_catalog();
    let mut factory = MockAssetFactory::kitchen(catalog.clone());
    let mut rng = rng_from_seed(0);
    let slots = vec![ObjectSpec::essential("obj", "fruit").excluding_groups(["fruit"])];
    match PlanAssembler::new(&catalog).assemble(
        slots,
        DistractorInstance::default(),
        &mut factory,
        &mut rng,
    ) {
        Err(e @ EpisodeError::EssentialUnresolved { .. }) => assert!(e.is_retryable()),
        other => panic!("expected EssentialUnresolved, got {other:?}"),
    }
}

#[test]
fn missing_distractor_asset_is_dropped_corrupt_is_fatal() {
    let catalog = kitchen_catalog();
    let tag = tabletop_scene::DistractorTag {
        region: "r".into(),
        type_index: 0,
        instance: 0,
    };
    let instance = || DistractorInstance {
        objects: vec![ObjectSpec::new(
            tag.slot_name(),
            tabletop_scene::SlotRole::Distractor(tag.clone()),
            "milk",
        )],
        fixtures: Vec::new(),
    };

    let mut factory = MockAssetFactory::kitchen(catalog.clone()).missing("milk");
    let mut rng = rng_from_seed(0);
    let plan = PlanAssembler::new(&catalog)
        .assemble(
            vec![ObjectSpec::essential("obj", "apple")],
            instance(),
            &mut factory,
            &mut rng,
        )
        .unwrap();
    assert_eq!(plan.objects().len(), 1);
    assert!(matches!(
        plan.dropped()[0].reason,
        DropReason::AssetMissing(_)
    ));

    let mut factory = MockAssetFactory::kitchen(catalog.clone()).corrupt("milk");
    let mut rng = rng_from_seed(0);
    match PlanAssembler::new(&catalog).assemble(
        vec![ObjectSpec::essential("obj", "apple")],
        instance(),
        &mut factory,
        &mut rng,
    ) {
        Err(EpisodeError::Asset(_)) => {}
        other => panic!("expected Asset error, got {other:?}"),
    }
}

#[test]
fn duplicate_slot_names_are_rejected() {
    let catalog = kitchen_catalog();
    let mut factory = MockAssetFactory::kitchen(catalog.clone());
    let mut rng = rng_from_seed(0);
    let slots = vec![
        ObjectSpec::essential("obj", "apple"),
        ObjectSpec::essential("obj", "pear"),
    ];
    match PlanAssembler::new(&catalog).assemble(
        slots,
        DistractorInstance::default(),
        &mut factory,
        &mut rng,
    ) {
        Err(EpisodeError::Config(ConfigError::DuplicateSlot { name })) => {
            assert_eq!(name.as_str(), "obj")
        }
        other => panic!("expected DuplicateSlot, got {other:?}"),
    }
}

#[test]
fn same_seed_same_plan() {
    let catalog = kitchen_catalog();
    let build = |seed| {
        let mut factory = MockAssetFactory::kitchen(catalog.clone());
        let mut rng = rng_from_seed(seed);
        PlanAssembler::new(&catalog)
            .assemble(
                task_slots("fruit", "receptacle", "receptacle"),
                distractors(seed, "fruit", "plate", "bowl"),
                &mut factory,
                &mut rng,
            )
            .unwrap()
            .categories()
    };
    assert_eq!(build(21), build(21));
}

#[test]
fn realize_drops_tolerated_failures_with_dependents() {
    let catalog = kitchen_catalog();
    let mut factory = MockAssetFactory::kitchen(catalog.clone());
    let mut rng = rng_from_seed(5);
    let tag = tabletop_scene::DistractorTag {
        region: "r".into(),
        type_index: 0,
        instance: 0,
    };
    let distractor = ObjectSpec::new(
        tag.slot_name(),
        tabletop_scene::SlotRole::Distractor(tag),
        "vegetable",
    )
    .placed(
        PlacementSpec::on("counter")
            .in_new_container("plate")
            .optional(true),
    );
    let mut plan = PlanAssembler::new(&catalog)
        .assemble(
            task_slots("apple", "tray", "bowl"),
            DistractorInstance {
                objects: vec![distractor],
                fixtures: Vec::new(),
            },
            &mut factory,
            &mut rng,
        )
        .unwrap();

    let container = "distractor_obj_r_type_0_num_0_container";
    let mut sampler = CentreSampler::failing(&[container]);
    let placements = plan.realize(&mut sampler, &mut rng).unwrap();
    assert!(!placements.contains(container));
    assert!(!placements.contains("distractor_obj_r_type_0_num_0"));
    assert!(placements.contains("obj"));
    assert!(!plan.contains("distractor_obj_r_type_0_num_0"));
    assert_eq!(plan.dropped().len(), 2);
    assert_eq!(sampler.seen, vec!["obj_container", container, "container", "obj"]);
    // the obj sits relative to its container
    let obj = placements.get("obj").unwrap();
    let tray = placements.get("obj_container").unwrap();
    assert_eq!(obj.pos.x, tray.pos.x);
}

#[test]
fn realize_fails_on_essential() {
    let catalog = kitchen_catalog();
    let mut factory = MockAssetFactory::kitchen(catalog.clone());
    let mut rng = rng_from_seed(5);
    let mut plan = PlanAssembler::new(&catalog)
        .assemble(
            task_slots("apple", "tray", "bowl"),
            DistractorInstance::default(),
            &mut factory,
            &mut rng,
        )
        .unwrap();
    let mut sampler = CentreSampler::failing(&["container"]);
    match plan.realize(&mut sampler, &mut rng) {
        Err(e @ EpisodeError::PlacementFailed { .. }) => assert!(e.is_retryable()),
        other => panic!("expected PlacementFailed, got {other:?}"),
    }
}

#[test]
fn realize_passes_requested_site() {
    let catalog = kitchen_catalog();
    let mut factory = MockAssetFactory::kitchen(catalog.clone());
    let mut rng = rng_from_seed(2);
    let slots = vec![ObjectSpec::essential("obj", "apple").placed(
        PlacementSpec::on("counter")
            .in_new_container("tiered_shelf")
            .on_site(SiteSelector::Last),
    )];
    let mut plan = PlanAssembler::new(&catalog)
        .assemble(slots, DistractorInstance::default(), &mut factory, &mut rng)
        .unwrap();

    struct SiteRecorder(Option<tabletop_core::SiteId>);
    impl PlacementSampler for SiteRecorder {
        fn sample(
            &mut self,
            request: &SampleRequest<'_>,
            _rng: &mut EpisodeRng,
        ) -> Result<Pose, SamplingFailure> {
            if let Some(frame) = request.reference {
                self.0 = frame.site;
            }
            Ok(Pose::default())
        }
    }
    let mut recorder = SiteRecorder(None);
    plan.realize(&mut recorder, &mut rng).unwrap();
    assert_eq!(recorder.0, Some(tabletop_core::SiteId(2)));
}

#[test]
fn existing_container_target_is_not_synthesized() {
    let catalog = kitchen_catalog();
    let mut factory = MockAssetFactory::kitchen(catalog.clone());
    let mut rng = rng_from_seed(4);
    let plan = PlanAssembler::new(&catalog)
        .assemble(
            task_slots("apple", "tray", "bowl"),
            distractors(4, "apple", "tray", "bowl"),
            &mut factory,
            &mut rng,
        )
        .unwrap();
    let created: Vec<&str> = factory
        .requests()
        .iter()
        .map(|r| r.slot.as_str())
        .collect();
    assert!(!created.iter().any(|s| s.ends_with("num_0_container")));
    assert!(matches!(
        plan.objects()[0].spec.placement.directive,
        PlacementDirective::Free
    ));
}

proptest! {
    #[test]
    fn scenario_b_count_is_seed_stable(seed in any::<u64>()) {
        let region = RegionTemplate::new("r", RegionPlacement::default())
            .object(SlotTemplate::literal("fruit", CountRange::new(1, 4).unwrap()));
        let cfg = DistractorBuilder::new()
            .build(&[region], &[], 9, &RegionSelection::Explicit(vec![]))
            .unwrap();
        let count = |s| {
            let mut rng = rng_from_seed(s);
            cfg.resolve_instance(&FocusContext::default(), &mut rng).objects.len()
        };
        let n = count(seed);
        prop_assert!((1..=4).contains(&n));
        prop_assert_eq!(n, count(seed));
    }

    #[test]
    fn plan_orders_every_reference_first(seed in 0u64..500) {
        let catalog = kitchen_catalog();
        let mut factory = MockAssetFactory::kitchen(catalog.clone());
        let mut rng = rng_from_seed(seed);
        let plan = PlanAssembler::new(&catalog)
            .assemble(
                task_slots("fruit", "receptacle", "bowl"),
                distractors(seed, "fruit", "plate", "bowl"),
                &mut factory,
                &mut rng,
            )
            .unwrap();
        for (i, o) in plan.objects().iter().enumerate() {
            for r in o.spec.placement.references() {
                let j = plan.position_of(r.as_str()).unwrap();
                prop_assert!(j < i);
            }
        }
    }
}
