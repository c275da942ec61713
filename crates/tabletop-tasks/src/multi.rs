//! Several objects into one container, in order.

use tabletop_core::{Arm, EpisodeError, Handedness, SlotName};
use tabletop_scene::{FocusContext, ObjectSpec};
use tabletop_success::{Check, Predicate, ReceptacleRegion, Signal, SignalPlan};

use crate::definition::MultiPnpTask;
use crate::engine::{LoadContext, Outcome};
use crate::language;
use crate::task_config::{SubtaskSpec, TaskConfig, LEFT_ARM_SPEC, RIGHT_ARM_SPEC};

const CONTAINER: &str = "container";

fn obj_slot(i: usize) -> SlotName {
    SlotName::new(format!("obj_{i}"))
}

pub(crate) fn object_specs(
    task: &MultiPnpTask,
    handedness: Handedness,
    counter: &str,
) -> Vec<ObjectSpec> {
    let mut specs = Vec::with_capacity(task.num_objects + 1);
    specs.push(
        ObjectSpec::essential(CONTAINER, task.container.clone())
            .placed(task.container_layout.placement(counter, handedness)),
    );
    for i in 0..task.num_objects {
        let group = task.obj_groups[i % task.obj_groups.len()].clone();
        specs.push(
            ObjectSpec::essential(obj_slot(i), group)
                .graspable()
                .excluding_groups(task.exclude_obj_groups.iter().cloned())
                .placed(task.obj_layout.placement(counter, handedness)),
        );
    }
    specs
}

pub(crate) fn focus(task: &MultiPnpTask, counter: &str) -> FocusContext {
    FocusContext {
        target: task.container.single().map(str::to_owned),
        surface: Some(counter.to_owned()),
        ..Default::default()
    }
}

pub(crate) fn outcome(task: &MultiPnpTask, ctx: &LoadContext<'_>) -> Result<Outcome, EpisodeError> {
    let slots: Vec<SlotName> = (0..task.num_objects).map(obj_slot).collect();
    let in_container = |obj: &SlotName| -> Predicate {
        Check::InReceptacle {
            obj: obj.clone(),
            container: CONTAINER.into(),
            region: ReceptacleRegion::Whole,
        }
        .into()
    };

    let success = Predicate::all(
        slots.iter().map(in_container).chain(slots.iter().map(|obj| {
            Check::GripperFar {
                body: obj.as_str().to_owned(),
            }
            .into()
        })),
    );

    let stages = slots
        .iter()
        .map(|obj| {
            vec![
                Signal::new(
                    format!("grasp_{obj}"),
                    Check::Grasping {
                        arm: Arm::Right,
                        obj: obj.clone(),
                    },
                ),
                Signal::new(format!("{obj}_in_container"), in_container(obj)),
            ]
        })
        .collect();

    let names: Vec<String> = slots
        .iter()
        .map(|obj| {
            ctx.plan
                .category_of(obj.as_str())
                .map_or_else(|| obj.as_str().to_owned(), |c| c.as_str().to_owned())
        })
        .collect();
    let container = ctx
        .plan
        .category_of(CONTAINER)
        .map_or(CONTAINER, |c| c.as_str());

    Ok(Outcome {
        success,
        signals: SignalPlan::Sequential(stages),
        language: language::in_sequence(&names, container),
        target_site: None,
    })
}

/// Grasp then deliver, once per object. The final delivery has no
/// termination signal.
pub(crate) fn task_config(task: &MultiPnpTask) -> TaskConfig {
    let mut right = Vec::with_capacity(task.num_objects * 2);
    for i in 0..task.num_objects {
        let obj = obj_slot(i);
        right.push(
            SubtaskSpec::new(Some(obj.as_str())).until(&format!("grasp_{obj}"), Some((5, 10))),
        );
        let deliver = SubtaskSpec::new(Some(CONTAINER));
        right.push(if i + 1 < task.num_objects {
            deliver.until(&format!("{obj}_in_container"), None)
        } else {
            deliver
        });
    }
    TaskConfig::new()
        .arm(RIGHT_ARM_SPEC, right)
        .arm(LEFT_ARM_SPEC, vec![SubtaskSpec::idle()])
}
