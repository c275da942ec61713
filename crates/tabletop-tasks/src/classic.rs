//! The hand-authored counter pick-and-place tasks.

use std::f64::consts::PI;

use tabletop_catalog::GroupQuery;
use tabletop_core::{ConfigError, InstanceSplit, SiteId};
use tabletop_scene::{
    CountRange, ObjectSpec, PlacementSpec, RegionPlacement, RegionTemplate, SiteSelector,
    SlotTemplate,
};

use crate::definition::{
    DistractorSetup, LevelOf, PlaceGoal, PnpLayout, PnpTask, TaskDefinition, TaskKind,
};
use crate::layout::SlotLayout;
use crate::regions::{back_edge, object_region};
use crate::task_config::{SubtaskSpec, TaskConfig, LEFT_ARM_SPEC, RIGHT_ARM_SPEC};

const SHELF: (f64, f64) = (0.7, 0.4);
const TIERED_BASKET: (f64, f64) = (0.7, 0.5);
const SHELF_POS: (f64, f64) = (0.9, 0.4);
const TIERED_BASKET_POS: (f64, f64) = (0.75, 0.3);
const TIERED_BASKET_YAW: (f64, f64) = (-5.0 * PI / 8.0, -7.0 * PI / 8.0);
const OBJ_POS: (f64, f64) = (0.5, -0.8);

const DISH_RACKS: [&str; 2] = [
    "objects/sketchfab/dish_rack/dish_rack_0/model.xml",
    "objects/sketchfab/dish_rack/dish_rack_4/model.xml",
];
const BREADS: [&str; 4] = [
    "objects/objaverse/bread/bread_1/model.xml",
    "objects/objaverse/bread/bread_17/model.xml",
    "objects/objaverse/bread/bread_20/model.xml",
    "objects/objaverse/bread/bread_21/model.xml",
];

fn pnp(id: &str, task: PnpTask, distractors: DistractorSetup) -> TaskDefinition {
    TaskDefinition::new(id, TaskKind::Pnp(task)).with_distractors(distractors)
}

fn default_clutter() -> Result<DistractorSetup, ConfigError> {
    Ok(DistractorSetup::fixed(vec![back_edge()?]))
}

fn regions(regions: Vec<RegionTemplate>) -> DistractorSetup {
    DistractorSetup::fixed(regions)
}

fn fixed(container: SlotLayout, obj: SlotLayout) -> PnpLayout {
    PnpLayout::Fixed { container, obj }
}

fn tiered_basket_container(size: (f64, f64)) -> SlotLayout {
    SlotLayout::new(TIERED_BASKET_POS, size).rotated(TIERED_BASKET_YAW.0, TIERED_BASKET_YAW.1)
}

fn tiered_basket_obj() -> SlotLayout {
    SlotLayout::new(TIERED_BASKET_POS, TIERED_BASKET)
        .rotated(TIERED_BASKET_YAW.0, TIERED_BASKET_YAW.1)
        .on_site(SiteSelector::Last)
}

fn default_obj() -> SlotLayout {
    SlotLayout::new(OBJ_POS, (0.3, 0.3))
}

fn default_container() -> SlotLayout {
    SlotLayout::new((0.9, -0.3), (0.5, 0.5))
}

/// An extra essential slot at an absolute counter position.
fn extra(name: &str, query: &str, at: (f64, f64)) -> ObjectSpec {
    ObjectSpec::essential(name, query).placed(PlacementSpec::on("counter").at(at.0, at.1).sized(0.5, 0.5))
}

/// The back-edge and centre regions of the fruit-to-plate tasks.
fn fruit_plate_regions() -> Result<Vec<RegionTemplate>, ConfigError> {
    let center = RegionTemplate::new(
        "center",
        RegionPlacement {
            center: (0.5, -0.9),
            size: (0.3, 0.3),
            ..Default::default()
        },
    )
    .object(SlotTemplate::one_of(["vegetable", "fruit"], CountRange::new(2, 4)?))
    .object(SlotTemplate::literal("milk", CountRange::exactly(1)));
    Ok(vec![
        object_region("back_edge", (0.0, 1.0), (1.2, 0.4), &[("basket", 1, 2)])?,
        center,
    ])
}

fn fruit_to_plate(id: &str, split: Option<InstanceSplit>) -> Result<TaskDefinition, ConfigError> {
    let task = PnpTask::new(GroupQuery::any_of(["vegetable", "fruit"])).to_container("plate", (0.7, 0.7));
    Ok(pnp(id, task, regions(fruit_plate_regions()?)).with_split(split))
}

/// The right arm lifts the cube out of the basket, then sets it down
/// relative to the basket.
fn rubix_cube_config() -> TaskConfig {
    TaskConfig::new()
        .arm(
            RIGHT_ARM_SPEC,
            vec![
                SubtaskSpec::new(Some("obj")).until("grasp_object", Some((5, 10))),
                SubtaskSpec::new(Some("obj_container")),
            ],
        )
        .arm(LEFT_ARM_SPEC, vec![SubtaskSpec::idle()])
}

/// Every classic pick-and-place task, in table order.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidCountRange`] if a distractor count in the
/// table is inverted.
pub fn classic_tasks() -> Result<Vec<TaskDefinition>, ConfigError> {
    let three_groups = || GroupQuery::any_of(["vegetable", "fruit", "dairy"]);
    let two_groups = || GroupQuery::any_of(["vegetable", "fruit"]);

    let mut tasks = vec![
        pnp(
            "PnPOnionToBowl",
            PnpTask::new("onion").to_container("bowl", (0.5, 0.5)),
            default_clutter()?,
        ),
        pnp(
            "PnPCanToBowl",
            PnpTask::new("can").to_container("bowl", (0.5, 0.5)),
            default_clutter()?,
        ),
        pnp(
            "PnPCupToPlate",
            PnpTask::new("cup").to_container("plate", (0.5, 0.5)),
            regions(vec![object_region(
                "back_edge",
                (0.0, 1.0),
                (1.2, 0.5),
                &[("tiered_basket", 0, 1), ("basket", 1, 1), ("mug_tree", 1, 1)],
            )?]),
        ),
        pnp(
            "PnPAppleToPlate",
            PnpTask::new("apple").to_container("plate", (0.5, 0.5)),
            regions(vec![object_region(
                "back_edge",
                (0.0, 1.0),
                (1.2, 0.6),
                &[
                    ("bowl", 1, 1),
                    ("vegetable", 1, 2),
                    ("mug", 0, 1),
                    ("clock", 1, 1),
                    ("coffee_pod", 1, 1),
                    ("kettle_non_electric", 1, 1),
                ],
            )?]),
        ),
        pnp(
            "PnPMilkToBasket",
            PnpTask::new("milk").to_container("basket", (0.5, 0.5)),
            regions(vec![object_region(
                "back_edge",
                (0.0, 1.0),
                (1.2, 0.5),
                &[
                    ("fruit", 2, 3),
                    ("clock", 1, 2),
                    ("cup", 1, 2),
                    ("tiered_basket", 1, 1),
                ],
            )?]),
        ),
        pnp(
            "PnPKettleToPlate",
            PnpTask::new("kettle_non_electric").to_container("plate", (0.5, 0.5)),
            DistractorSetup::none(),
        ),
        pnp(
            "PnPFruitToPlacemat",
            PnpTask::new("fruit").to_container("placemat", (0.7, 0.7)),
            regions(vec![
                object_region("back_edge", (0.0, 1.0), (1.2, 0.4), &[("basket", 1, 2)])?,
                object_region(
                    "center",
                    (0.0, 0.3),
                    (0.8, 0.4),
                    &[("vegetable", 2, 3), ("milk", 1, 1)],
                )?,
            ]),
        ),
    ];

    for (id, target, size) in [
        ("PnPCounterToPlate", "plate", (0.5, 0.5)),
        ("PnPCounterToBowl", "bowl", (0.5, 0.5)),
        ("PnPCounterToCuttingBoard", "cutting_board", (0.5, 0.5)),
        ("PnPCounterToPot", "pot", (0.7, 0.7)),
        ("PnPCounterToPan", "pan", (0.5, 0.5)),
    ] {
        tasks.push(pnp(
            id,
            PnpTask::new("all").to_container(target, size),
            default_clutter()?,
        ));
    }

    tasks.push(pnp(
        "PnPPlateToPlate",
        PnpTask::new(three_groups())
            .from_container("plate", (0.5, 0.5))
            .to_container("plate", (0.5, 0.5)),
        regions(vec![
            object_region(
                "center",
                (0.0, 0.5),
                (0.8, 0.8),
                &[("bowl", 1, 2), ("vegetable", 1, 3), ("fruit", 1, 3)],
            )?,
            object_region(
                "back_edge",
                (0.0, 1.0),
                (1.2, 0.6),
                &[("mug_tree", 1, 1), ("basket", 0, 2)],
            )?,
        ]),
    ));
    tasks.push(pnp(
        "PnPMilkPlateToPlate",
        PnpTask::new("milk")
            .from_container("plate", (0.5, 0.5))
            .to_container("plate", (0.5, 0.5)),
        regions(vec![
            object_region(
                "center",
                (0.0, 0.0),
                (0.6, 0.6),
                &[("bowl", 1, 2), ("vegetable", 1, 2), ("fruit", 1, 2)],
            )?,
            object_region(
                "back_edge",
                (0.0, 1.0),
                (1.2, 0.5),
                &[("mug_tree", 1, 1), ("basket", 0, 2)],
            )?,
        ]),
    ));
    tasks.push(pnp(
        "PnPVegetableBowlToPlate",
        PnpTask::new("vegetable")
            .from_container("bowl", (0.5, 0.5))
            .to_container("plate", (0.5, 0.5))
            .described("pick the {obj} from the bowl and place it on the empty plate")
            .with_extra({
                let mut milk = extra("extra_milk", "milk", (1.0, 0.5));
                milk.placement = milk.placement.in_new_container("plate");
                milk
            })
            .with_extra({
                let mut cube = extra("extra_rubix_cube", "rubix_cube", (-1.0, 0.5));
                cube.placement = cube.placement.in_new_container("plate");
                cube
            })
            .with_extra({
                let mut bowl = extra("extra_bowl", "bowl", (0.5, 1.0));
                bowl.placement = bowl.placement.optional(true);
                bowl
            })
            .with_extra({
                let mut cup = extra("extra_cup", "cup", (-0.5, 1.0));
                cup.placement = cup.placement.optional(true);
                cup
            }),
        regions(vec![object_region(
            "center",
            (0.0, 0.0),
            (0.8, 0.8),
            &[
                ("fruit", 1, 3),
                ("vegetable", 1, 2),
                ("basket", 0, 1),
                ("rubix_cube", 1, 1),
                ("milk", 0, 1),
                ("placemat", 0, 1),
                ("bowl", 1, 2),
            ],
        )?]),
    ));

    // Shelves.
    tasks.push(pnp(
        "PnPObjectsToShelf",
        PnpTask::new(three_groups()).to_container("tiered_shelf", SHELF),
        DistractorSetup::none(),
    ));
    tasks.push(pnp(
        "PnPObjectsToShelfLevel",
        PnpTask::new(three_groups())
            .to_container("tiered_shelf", SHELF)
            .laid_out(fixed(SlotLayout::new(SHELF_POS, SHELF), default_obj()))
            .with_goal(PlaceGoal::RandomLevel(LevelOf::Target)),
        default_clutter()?,
    ));
    tasks.push(pnp(
        "PnPObjectsShelfToCounter",
        PnpTask::new(two_groups())
            .from_container("tiered_shelf", SHELF)
            .laid_out(fixed(
                default_container(),
                SlotLayout::new(SHELF_POS, SHELF).on_site(SiteSelector::Last),
            )),
        default_clutter()?,
    ));
    tasks.push(pnp(
        "PnPObjectsShelfLevelToLevel",
        PnpTask::new(two_groups())
            .from_container("tiered_shelf", SHELF)
            .laid_out(fixed(
                default_container(),
                SlotLayout::new(OBJ_POS, SHELF).on_site(SiteSelector::Last),
            ))
            .with_goal(PlaceGoal::RandomLevel(LevelOf::Source)),
        default_clutter()?,
    ));

    // Tiered baskets.
    tasks.push(pnp(
        "PnPObjectsToTieredBasket",
        PnpTask::new(three_groups())
            .to_container("tiered_basket", (0.5, 0.5))
            .laid_out(fixed(tiered_basket_container((0.5, 0.5)), default_obj())),
        default_clutter()?,
    ));
    tasks.push(pnp(
        "PnPObjectsToTieredBasketLevel",
        PnpTask::new(three_groups())
            .to_container("tiered_basket", TIERED_BASKET)
            .laid_out(fixed(tiered_basket_container(TIERED_BASKET), default_obj()))
            .with_goal(PlaceGoal::RandomLevel(LevelOf::Target)),
        default_clutter()?,
    ));
    tasks.push(pnp(
        "PnPObjectsTieredBasketToCounter",
        PnpTask::new(two_groups())
            .from_container("tiered_basket", TIERED_BASKET)
            .laid_out(fixed(default_container(), tiered_basket_obj())),
        default_clutter()?,
    ));
    tasks.push(pnp(
        "PnPObjectsTieredBasketLevelToLevel",
        PnpTask::new(two_groups())
            .from_container("tiered_basket", TIERED_BASKET)
            .laid_out(fixed(default_container(), tiered_basket_obj()))
            .with_goal(PlaceGoal::RandomLevel(LevelOf::Source)),
        default_clutter()?,
    ));

    tasks.push(
        pnp(
            "PnPRubixCubeBasketToCounter",
            PnpTask::new("rubix_cube").from_container("basket", (0.5, 0.5)),
            regions(vec![object_region(
                "back_edge",
                (0.0, 1.0),
                (1.2, 0.5),
                &[("plate", 1, 1), ("tiered_basket", 0, 1), ("tiered_shelf", 0, 1)],
            )?]),
        )
        .with_task_config(rubix_cube_config()),
    );
    tasks.push(pnp(
        "PnPCupToPlateNoDistractors",
        PnpTask::new("cup").to_container("plate", (0.5, 0.3)),
        DistractorSetup::none(),
    ));
    tasks.push(pnp(
        "PnPCupToDishRackUpperLevel",
        PnpTask::new(GroupQuery::any_of(["cup", "milk"]))
            .to_container(GroupQuery::any_of(DISH_RACKS), (0.9, 0.4))
            .laid_out(fixed(
                SlotLayout::new((1.0, -1.0), (0.9, 0.4))
                    .rotated(-PI, PI)
                    .unmirrored(),
                SlotLayout::new((1.0, -1.0), (0.6, 0.2)).unmirrored(),
            ))
            .with_goal(PlaceGoal::FixedLevel(SiteId(1))),
        DistractorSetup::none(),
    ));
    tasks.push(pnp(
        "PnPBreadBasketToBowl",
        PnpTask::new(GroupQuery::any_of(BREADS))
            .from_container("basket", (0.5, 0.1))
            .to_container("bowl", (0.5, 0.1))
            .laid_out(fixed(
                SlotLayout::new((0.5, -0.9), (0.5, 0.1)).boundary(false),
                SlotLayout::new((0.6, -0.9), (0.5, 0.1)).boundary(false),
            )),
        DistractorSetup::none(),
    ));

    tasks.push(fruit_to_plate("PnPFruitToPlate", None)?);
    tasks.push(fruit_to_plate("PnPFruitToPlateSplitA", Some(InstanceSplit::A))?);
    tasks.push(fruit_to_plate("PnPFruitToPlateSplitB", Some(InstanceSplit::B))?);
    tasks.push(pnp(
        "PnPCylindricalToPlate",
        PnpTask::new(GroupQuery::any_of([
            "bottled_drink",
            "bottled_water",
            "boxed_drink",
            "can",
            "milk",
        ]))
        .to_container("plate", (0.5, 0.3)),
        DistractorSetup::none(),
    ));

    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tabletop_scene::RegionSelection;

    fn find<'t>(tasks: &'t [TaskDefinition], id: &str) -> &'t PnpTask {
        match &tasks.iter().find(|t| t.id == id).unwrap().kind {
            TaskKind::Pnp(t) => t,
            other => panic!("expected pick and place, got {other:?}"),
        }
    }

    #[test]
    fn table_is_valid_and_unique() {
        let tasks = classic_tasks().unwrap();
        assert_eq!(tasks.len(), 31);
        let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), tasks.len());
        for task in &tasks {
            task.validate().unwrap();
        }
    }

    #[test]
    fn kettle_has_no_distractors() {
        let tasks = classic_tasks().unwrap();
        let kettle = tasks.iter().find(|t| t.id == "PnPKettleToPlate").unwrap();
        assert_eq!(kettle.distractors.selection, RegionSelection::Disabled);
        let onion = tasks.iter().find(|t| t.id == "PnPOnionToBowl").unwrap();
        assert_eq!(onion.distractors.fixed.len(), 1);
        assert_eq!(onion.distractors.fixed[0].fixtures.len(), 3);
    }

    #[test]
    fn shelf_to_counter_samples_top_level() {
        let tasks = classic_tasks().unwrap();
        let task = find(&tasks, "PnPObjectsShelfToCounter");
        assert!(task.target.is_none());
        match &task.layout {
            PnpLayout::Fixed { obj, .. } => {
                assert_eq!(obj.site, Some(SiteSelector::Last));
                assert_eq!(obj.pos, SHELF_POS);
            }
            other => panic!("expected fixed layout, got {other:?}"),
        }
    }

    #[test]
    fn vegetable_bowl_carries_extras() {
        let tasks = classic_tasks().unwrap();
        let task = find(&tasks, "PnPVegetableBowlToPlate");
        let names: Vec<&str> = task.extra_slots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            ["extra_milk", "extra_rubix_cube", "extra_bowl", "extra_cup"]
        );
        assert!(task.extra_slots[2].placement.optional);
        assert!(!task.extra_slots[0].placement.optional);
    }

    #[test]
    fn fruit_splits_differ_only_in_split() {
        let tasks = classic_tasks().unwrap();
        let a = tasks.iter().find(|t| t.id == "PnPFruitToPlateSplitA").unwrap();
        let b = tasks.iter().find(|t| t.id == "PnPFruitToPlateSplitB").unwrap();
        assert_eq!(a.split, Some(InstanceSplit::A));
        assert_eq!(b.split, Some(InstanceSplit::B));
        assert_eq!(a.kind, b.kind);
    }

    #[test]
    fn rubix_cube_overrides_task_config() {
        let tasks = classic_tasks().unwrap();
        let task = tasks
            .iter()
            .find(|t| t.id == "PnPRubixCubeBasketToCounter")
            .unwrap();
        let config = task.task_config.as_ref().unwrap();
        let right = config.get(RIGHT_ARM_SPEC).unwrap();
        assert_eq!(right["subtask_2"].object_ref.as_deref(), Some("obj_container"));
    }
}
