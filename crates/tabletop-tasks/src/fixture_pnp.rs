//! Pick and place into a cabinet, drawer or microwave, then close it.

use tabletop_core::{
    uniform, Arm, DoorBehavior, EpisodeError, EpisodeRng, FixtureHandle, Handedness,
    SimControl,
};
use tabletop_scene::{FocusContext, ObjectSpec, ScaleSpec};
use tabletop_success::{Check, DoorTarget, Predicate, Signal, SignalPlan};

use crate::definition::FixturePnpTask;
use crate::engine::{LoadContext, Outcome};
use crate::language;
use crate::task_config::{SubtaskSpec, TaskConfig, LEFT_ARM_SPEC, RIGHT_ARM_SPEC};

const OBJ: &str = "obj";

/// Door state range a door starts in when the task is to close it.
pub(crate) const OPEN_DOOR_RESET: (f64, f64) = (0.9, 1.0);

/// The task object on the counter.
pub(crate) fn object_specs(
    task: &FixturePnpTask,
    handedness: Handedness,
    counter: &str,
) -> Vec<ObjectSpec> {
    vec![ObjectSpec::essential(OBJ, task.obj.clone())
        .graspable()
        .from_registries(task.registries.iter().cloned())
        .scaled(ScaleSpec::Uniform(task.obj_scale))
        .placed(task.obj_layout.placement(counter, handedness))]
}

pub(crate) fn focus(task: &FixturePnpTask, counter: &str) -> FocusContext {
    FocusContext {
        obj: Some(task.obj.clone()),
        surface: Some(counter.to_owned()),
        ..Default::default()
    }
}

/// Target door state of the behavior.
pub(crate) fn door_target(behavior: DoorBehavior) -> DoorTarget {
    match behavior {
        DoorBehavior::Open => DoorTarget::Open,
        DoorBehavior::Close => DoorTarget::Closed,
    }
}

/// Start a door in the state opposite to the goal.
pub(crate) fn reset_door(
    fixture: &FixtureHandle,
    behavior: DoorBehavior,
    sim: &mut dyn SimControl,
    rng: &mut EpisodeRng,
) {
    let state = match behavior {
        DoorBehavior::Open => 0.0,
        DoorBehavior::Close => uniform(rng, OPEN_DOOR_RESET.0, OPEN_DOOR_RESET.1),
    };
    sim.set_door_state(&fixture.name, state);
}

pub(crate) fn outcome(
    task: &FixturePnpTask,
    ctx: &LoadContext<'_>,
) -> Result<Outcome, EpisodeError> {
    let fixture = ctx.fixture(task.fixture)?;
    let success = Predicate::all([
        Check::InsideFixture {
            obj: OBJ.into(),
            fixture: fixture.name.clone(),
            partial: true,
        }
        .into(),
        Check::DoorState {
            fixture: fixture.name.clone(),
            state: door_target(task.behavior),
        }
        .into(),
    ]);
    let signals = SignalPlan::Independent(vec![
        Signal::new(
            "grasp_object",
            Check::Grasping {
                arm: task.grasp_arm,
                obj: OBJ.into(),
            },
        ),
        Signal::new(
            format!("obj_in_{}", task.label),
            Check::FixtureContact {
                obj: OBJ.into(),
                fixture: fixture.name.clone(),
            },
        ),
    ]);
    let obj = ctx
        .plan
        .category_of(OBJ)
        .map_or(OBJ, |c| c.as_str())
        .to_owned();
    Ok(Outcome {
        success,
        signals,
        language: language::into_fixture(&obj, &task.label, task.behavior),
        target_site: None,
    })
}

/// The grasping arm fetches the object and stows it; the other arm
/// handles the door. Noise-free.
pub(crate) fn task_config(task: &FixturePnpTask) -> TaskConfig {
    let fetch = vec![
        SubtaskSpec::new(Some(OBJ))
            .until("grasp_object", Some((5, 10)))
            .noise(0.0),
        SubtaskSpec::new(Some(&task.label)).noise(0.0),
    ];
    let door = vec![SubtaskSpec::new(Some(&task.label)).noise(0.0)];
    let (right, left) = match task.grasp_arm {
        Arm::Right => (fetch, door),
        Arm::Left => (door, fetch),
    };
    TaskConfig::new()
        .arm(RIGHT_ARM_SPEC, right)
        .arm(LEFT_ARM_SPEC, left)
}
