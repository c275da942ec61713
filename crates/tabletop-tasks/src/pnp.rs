//! Counter pick and place: classic tasks and the combination matrices.

use rand::Rng;
use tabletop_catalog::GroupQuery;
use tabletop_core::{Arm, ConfigError, EpisodeError, EpisodeRng, Handedness, SiteId, SlotName};
use tabletop_scene::{FocusContext, ObjectSpec};
use tabletop_success::{Check, Predicate, ReceptacleRegion, Signal, SignalPlan};

use crate::definition::{LevelOf, PlaceGoal, PnpLayout, PnpTask};
use crate::engine::{LoadContext, Outcome};
use crate::language;
use crate::layout::PositionSampler;
use crate::regions::DISTRACTOR_OBJ;
use crate::task_config::{SubtaskSpec, TaskConfig, LEFT_ARM_SPEC, RIGHT_ARM_SPEC};

const OBJ: &str = "obj";
const CONTAINER: &str = "container";
const OBJ_CONTAINER: &str = "obj_container";

/// Essential slots: target container, task object, then extras.
pub(crate) fn object_specs(
    task: &PnpTask,
    handedness: Handedness,
    counter: &str,
    rng: &mut EpisodeRng,
) -> Vec<ObjectSpec> {
    let (container_layout, obj_layout) = match &task.layout {
        PnpLayout::Fixed { container, obj } => (container.clone(), obj.clone()),
        PnpLayout::Sampled => {
            let p = PositionSampler::sample(handedness, rng);
            PnpLayout::sampled_slots(p.container, p.container_size, p.obj, p.obj_size)
        }
    };

    let mut specs = Vec::with_capacity(2 + task.extra_slots.len());
    if let Some(target) = &task.target {
        specs.push(
            ObjectSpec::essential(CONTAINER, target.clone())
                .placed(container_layout.placement(counter, handedness))
                .scaled(task.target_scale.clone()),
        );
    }

    let mut placement = obj_layout.placement(counter, handedness);
    if let Some(source) = &task.source {
        placement = placement.in_new_container(source.clone());
    }
    specs.push(
        ObjectSpec::essential(OBJ, task.obj.clone())
            .graspable()
            .excluding_groups(task.exclude_obj_groups.iter().cloned())
            .from_registries(task.obj_registries.iter().cloned())
            .scaled(task.obj_scale.clone())
            .placed(placement),
    );

    for extra in &task.extra_slots {
        let mut extra = extra.clone();
        extra.placement.fixture = Some(counter.to_owned());
        specs.push(extra);
    }
    specs
}

/// What symbolic distractor types resolve against.
pub(crate) fn focus(task: &PnpTask, counter: &str) -> FocusContext {
    let single = |q: &Option<GroupQuery>| {
        q.as_ref().and_then(|q| q.single()).map(|s| s.to_string())
    };
    let mut focus = FocusContext {
        obj: Some(task.obj.clone()),
        source: single(&task.source),
        target: single(&task.target),
        surface: Some(counter.to_owned()),
        ..Default::default()
    };
    if let Some(pools) = &task.focus {
        focus.obj_pool = pools.obj_pool.clone();
        focus.source_pool = pools.source_pool.clone();
        focus.target_pool = pools.target_pool.clone();
        focus.similarity = pools.similarity.clone();
    }
    focus
}

fn far(body: &str) -> Predicate {
    Check::GripperFar { body: body.into() }.into()
}

fn in_receptacle(obj: &str, container: &str, region: ReceptacleRegion) -> Predicate {
    Check::InReceptacle {
        obj: obj.into(),
        container: container.into(),
        region,
    }
    .into()
}

fn on_counter(obj: &str, counter: &str) -> Predicate {
    Check::FixtureContact {
        obj: obj.into(),
        fixture: counter.to_owned(),
    }
    .into()
}

fn site_is(container: &str, site: SiteId) -> Predicate {
    Check::SiteIs {
        container: container.into(),
        obj: OBJ.into(),
        site,
    }
    .into()
}

fn draw_site(ctx: &LoadContext<'_>, slot: &str, rng: &mut EpisodeRng) -> Result<SiteId, EpisodeError> {
    let sites: Vec<SiteId> = ctx
        .plan
        .get(slot)
        .and_then(|o| o.spec.info())
        .map(|info| info.enabled_sites().map(|s| s.id).collect())
        .unwrap_or_default();
    if sites.is_empty() {
        return Err(EpisodeError::Config(ConfigError::InvalidTask {
            id: ctx.id.to_owned(),
            reason: format!("{slot} has no enabled spawn sites"),
        }));
    }
    Ok(sites[rng.random_range(0..sites.len())])
}

/// Success, signals and instruction of a loaded episode.
pub(crate) fn outcome(
    task: &PnpTask,
    ctx: &LoadContext<'_>,
    rng: &mut EpisodeRng,
) -> Result<Outcome, EpisodeError> {
    let counter = ctx.counter.name.as_str();
    let target_site = match task.goal {
        PlaceGoal::Receptacle => None,
        PlaceGoal::RandomLevel(LevelOf::Target) => Some(draw_site(ctx, CONTAINER, rng)?),
        PlaceGoal::RandomLevel(LevelOf::Source) => Some(draw_site(ctx, OBJ_CONTAINER, rng)?),
        PlaceGoal::FixedLevel(site) => Some(site),
    };

    let base = if task.target.is_some() {
        Predicate::all([
            far(CONTAINER),
            far(OBJ),
            in_receptacle(OBJ, CONTAINER, task.receptacle),
            Predicate::not(on_counter(OBJ, counter)),
            Check::Upright {
                obj: CONTAINER.into(),
                threshold: ctx.thresholds.upright,
            }
            .into(),
        ])
    } else {
        Predicate::all([far(OBJ), on_counter(OBJ, counter)])
    };

    let distractor_objs: Vec<SlotName> = ctx
        .plan
        .distractors_in_region(DISTRACTOR_OBJ)
        .map(|o| o.name().clone())
        .collect();

    let mut success = match (task.goal, target_site) {
        (PlaceGoal::RandomLevel(LevelOf::Target), Some(site)) => {
            Predicate::all([site_is(CONTAINER, site), base])
        }
        (PlaceGoal::RandomLevel(LevelOf::Source), Some(site)) => Predicate::all([
            far(OBJ_CONTAINER),
            far(OBJ),
            in_receptacle(OBJ, OBJ_CONTAINER, ReceptacleRegion::Whole),
            site_is(OBJ_CONTAINER, site),
            Predicate::not(on_counter(OBJ, counter)),
        ]),
        (PlaceGoal::FixedLevel(site), _) => Predicate::all([
            in_receptacle(OBJ, CONTAINER, ReceptacleRegion::Site(site)),
            base,
        ]),
        _ => base,
    };
    if !distractor_objs.is_empty() && task.target.is_some() {
        let stray = Predicate::any(
            distractor_objs
                .iter()
                .map(|d| in_receptacle(d.as_str(), CONTAINER, task.receptacle)),
        );
        success = Predicate::all([success, Predicate::not(stray)]);
    }

    let mut signals = vec![Signal::new(
        "grasp_object",
        Check::Grasping {
            arm: Arm::Right,
            obj: OBJ.into(),
        },
    )];
    if !distractor_objs.is_empty() {
        signals.push(Signal::new(
            "grasp_distractor_obj",
            Predicate::any(distractor_objs.iter().map(|d| {
                Check::Grasping {
                    arm: Arm::Right,
                    obj: d.clone(),
                }
                .into()
            })),
        ));
    }

    let category = |slot: &str| ctx.plan.category_of(slot).map(|c| c.as_str().to_owned());
    let obj = category(OBJ).unwrap_or_else(|| OBJ.to_owned());
    let source = task.source.as_ref().and_then(|_| category(OBJ_CONTAINER));
    let target = task.target.as_ref().and_then(|_| category(CONTAINER));
    let language = match (&task.language, task.goal, target_site) {
        (Some(template), _, _) => language::fill_template(template, &obj),
        (None, PlaceGoal::RandomLevel(LevelOf::Source), Some(site)) => {
            let source = source.unwrap_or_else(|| OBJ_CONTAINER.to_owned());
            language::pick_and_place_on_level(&obj, Some(&source), &source, site)
        }
        (None, PlaceGoal::Receptacle, _) | (None, _, None) => {
            language::pick_and_place(&obj, source.as_deref(), target.as_deref())
        }
        (None, _, Some(site)) => {
            let target = target.unwrap_or_else(|| CONTAINER.to_owned());
            language::pick_and_place_on_level(&obj, source.as_deref(), &target, site)
        }
    };

    Ok(Outcome {
        success,
        signals: SignalPlan::Independent(signals),
        language,
        target_site,
    })
}

/// Right arm grasps the object, then carries it to the container; the
/// left arm idles.
pub(crate) fn task_config() -> TaskConfig {
    TaskConfig::new()
        .arm(
            RIGHT_ARM_SPEC,
            vec![
                SubtaskSpec::new(Some(OBJ))
                    .selecting(CONTAINER)
                    .until("grasp_object", Some((5, 10))),
                SubtaskSpec::new(Some(CONTAINER)),
            ],
        )
        .arm(LEFT_ARM_SPEC, vec![SubtaskSpec::idle()])
}
