//! Articulated fixtures without objects: doors, the microwave button and
//! the laptop lid.

use tabletop_core::{
    uniform, Arm, ConfigError, DoorBehavior, EpisodeError, EpisodeRng, FixtureHandle, FixtureKind,
    PowerBehavior, SimControl,
};
use tabletop_success::{Check, DoorTarget, Predicate, Signal, SignalPlan};

use crate::definition::{DoorTask, LaptopTask, MicrowaveTask};
use crate::engine::{LoadContext, Outcome};
use crate::fixture_pnp::{door_target, reset_door};
use crate::language;
use crate::task_config::{SubtaskSpec, TaskConfig, LEFT_ARM_SPEC, RIGHT_ARM_SPEC, SINGLE_ARM_SPEC};

/// Microwave flag toggled by its buttons.
pub const TURNED_ON: &str = "turned_on";

// ── Doors ──────────────────────────────────────────────────────────

pub(crate) fn reset_door_task(
    task: &DoorTask,
    fixture: &FixtureHandle,
    sim: &mut dyn SimControl,
    rng: &mut EpisodeRng,
) {
    reset_door(fixture, task.behavior, sim, rng);
}

/// A hinged door counts as closed as soon as it is no longer open; a
/// drawer must be pushed fully shut.
fn door_success(task: &DoorTask, fixture: &FixtureHandle) -> Predicate {
    let state = |state| -> Predicate {
        Check::DoorState {
            fixture: fixture.name.clone(),
            state,
        }
        .into()
    };
    match (task.fixture, task.behavior) {
        (FixtureKind::HingeCabinet, DoorBehavior::Close) => Predicate::not(state(DoorTarget::Open)),
        _ => state(door_target(task.behavior)),
    }
}

pub(crate) fn door_outcome(task: &DoorTask, ctx: &LoadContext<'_>) -> Result<Outcome, EpisodeError> {
    let fixture = ctx.fixture(task.fixture)?;
    let success = door_success(task, fixture);
    let open_door = match task.fixture {
        FixtureKind::HingeCabinet => Check::DoorState {
            fixture: fixture.name.clone(),
            state: DoorTarget::Open,
        }
        .into(),
        _ => success.clone(),
    };
    Ok(Outcome {
        success,
        signals: SignalPlan::Independent(vec![Signal::new("open_door", open_door)]),
        language: language::door(&task.label, task.behavior),
        target_site: None,
    })
}

pub(crate) fn door_task_config(task: &DoorTask) -> TaskConfig {
    let door = match task.fixture {
        FixtureKind::HingeCabinet => vec![
            SubtaskSpec::new(Some("door")).until("open_door", None),
            SubtaskSpec::idle(),
        ],
        _ => vec![SubtaskSpec::new(Some("door"))],
    };
    TaskConfig::new()
        .arm(SINGLE_ARM_SPEC, door)
        .arm(LEFT_ARM_SPEC, vec![SubtaskSpec::idle()])
}

// ── Microwave ──────────────────────────────────────────────────────

pub(crate) fn reset_microwave(
    task: &MicrowaveTask,
    fixture: &FixtureHandle,
    sim: &mut dyn SimControl,
) {
    let on = task.behavior == PowerBehavior::TurnOff;
    sim.set_fixture_flag(&fixture.name, TURNED_ON, on);
}

pub(crate) fn microwave_outcome(
    task: &MicrowaveTask,
    ctx: &LoadContext<'_>,
) -> Result<Outcome, EpisodeError> {
    let fixture = ctx.fixture(FixtureKind::Microwave)?;
    let button = fixture.button.clone().unwrap_or_else(|| fixture.name.clone());
    let success = Predicate::all([
        Check::FixtureFlag {
            fixture: fixture.name.clone(),
            flag: TURNED_ON.to_owned(),
            expected: task.behavior == PowerBehavior::TurnOn,
        }
        .into(),
        Check::GripperFar { body: button }.into(),
    ]);
    Ok(Outcome {
        signals: SignalPlan::Independent(vec![Signal::new("press_button", success.clone())]),
        success,
        language: language::microwave(task.behavior),
        target_site: None,
    })
}

pub(crate) fn microwave_task_config() -> TaskConfig {
    TaskConfig::new()
        .arm(SINGLE_ARM_SPEC, vec![SubtaskSpec::new(Some("button"))])
        .arm(LEFT_ARM_SPEC, vec![SubtaskSpec::idle()])
}

// ── Laptop ─────────────────────────────────────────────────────────

fn lid_joint<'f>(id: &str, fixture: &'f FixtureHandle) -> Result<&'f str, ConfigError> {
    fixture
        .joints
        .first()
        .map(String::as_str)
        .ok_or_else(|| ConfigError::InvalidTask {
            id: id.to_owned(),
            reason: format!("fixture {} has no lid joint", fixture.name),
        })
}

/// Lid position a reset leaves the laptop in: at least a tenth of the
/// range away from the goal.
pub(crate) fn initial_lid_position(task: &LaptopTask, rng: &mut EpisodeRng) -> f64 {
    let (lo, hi) = task.lid_range;
    let range = hi - lo;
    let offset = 0.1 * range;
    let drawn = uniform(rng, offset, 1.0);
    match task.behavior {
        DoorBehavior::Open => lo + offset + drawn,
        DoorBehavior::Close => range - drawn,
    }
}

pub(crate) fn reset_laptop(
    id: &str,
    task: &LaptopTask,
    fixture: &FixtureHandle,
    sim: &mut dyn SimControl,
    rng: &mut EpisodeRng,
) -> Result<(), ConfigError> {
    let joint = lid_joint(id, fixture)?;
    sim.set_joint_position(joint, initial_lid_position(task, rng));
    Ok(())
}

pub(crate) fn laptop_outcome(
    task: &LaptopTask,
    ctx: &LoadContext<'_>,
) -> Result<Outcome, EpisodeError> {
    let fixture = ctx.fixture(FixtureKind::Laptop)?;
    let joint = lid_joint(ctx.id, fixture)?.to_owned();
    let lid: Predicate = match task.behavior {
        DoorBehavior::Open => Check::JointAtLeast {
            joint,
            value: ctx.thresholds.lid_open_radians(),
        },
        DoorBehavior::Close => Check::JointAtMost {
            joint,
            value: ctx.thresholds.lid_closed_radians(),
        },
    }
    .into();
    let success = Predicate::all([
        lid,
        Check::GripperFar {
            body: fixture.name.clone(),
        }
        .into(),
    ]);
    let signals = SignalPlan::Independent(vec![Signal::new(
        "contact_laptop",
        Check::GripperContact {
            arm: Arm::Right,
            body: fixture.name.clone(),
        },
    )]);
    Ok(Outcome {
        success,
        signals,
        language: language::laptop(task.behavior),
        target_site: None,
    })
}

pub(crate) fn laptop_task_config() -> TaskConfig {
    TaskConfig::new()
        .arm(
            RIGHT_ARM_SPEC,
            vec![
                SubtaskSpec::new(Some("obj")).until("contact_laptop", Some((5, 10))),
                SubtaskSpec::new(Some("obj")),
            ],
        )
        .arm(LEFT_ARM_SPEC, vec![SubtaskSpec::idle()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabletop_core::{rng_from_seed, FixtureProvider, SimState};
    use tabletop_test_utils::{MockFixtures, MockSim};

    fn fixture(kind: FixtureKind) -> FixtureHandle {
        MockFixtures::kitchen().get_fixture(kind).unwrap()
    }

    #[test]
    fn lid_starts_away_from_the_goal() {
        let mut rng = rng_from_seed(5);
        let open = LaptopTask::new(DoorBehavior::Open);
        let close = LaptopTask::new(DoorBehavior::Close);
        for _ in 0..100 {
            let p = initial_lid_position(&open, &mut rng);
            assert!((0.4..=1.2).contains(&p), "open start {p}");
            let p = initial_lid_position(&close, &mut rng);
            assert!((1.0..=1.8).contains(&p), "close start {p}");
        }
    }

    #[test]
    fn laptop_reset_moves_first_joint() {
        let laptop = fixture(FixtureKind::Laptop);
        let mut sim = MockSim::new();
        let mut rng = rng_from_seed(1);
        reset_laptop(
            "TabletopLaptopOpen",
            &LaptopTask::new(DoorBehavior::Open),
            &laptop,
            &mut sim,
            &mut rng,
        )
        .unwrap();
        assert!(sim.joint_position("laptop_lid_hinge").is_some());
    }

    #[test]
    fn jointless_laptop_is_rejected() {
        let mut laptop = fixture(FixtureKind::Laptop);
        laptop.joints.clear();
        let mut sim = MockSim::new();
        let mut rng = rng_from_seed(1);
        match reset_laptop(
            "TabletopLaptopClose",
            &LaptopTask::new(DoorBehavior::Close),
            &laptop,
            &mut sim,
            &mut rng,
        ) {
            Err(ConfigError::InvalidTask { id, .. }) => assert_eq!(id, "TabletopLaptopClose"),
            other => panic!("expected InvalidTask, got {other:?}"),
        }
    }

    #[test]
    fn microwave_reset_sets_the_opposite_state() {
        let microwave = fixture(FixtureKind::Microwave);
        let mut sim = MockSim::new();
        reset_microwave(
            &MicrowaveTask {
                behavior: PowerBehavior::TurnOff,
            },
            &microwave,
            &mut sim,
        );
        assert_eq!(sim.fixture_flag("microwave", TURNED_ON), Some(true));
        reset_microwave(
            &MicrowaveTask {
                behavior: PowerBehavior::TurnOn,
            },
            &microwave,
            &mut sim,
        );
        assert_eq!(sim.fixture_flag("microwave", TURNED_ON), Some(false));
    }

    #[test]
    fn hinged_close_is_not_open() {
        let task = DoorTask {
            fixture: FixtureKind::HingeCabinet,
            label: "cabinet".into(),
            behavior: DoorBehavior::Close,
        };
        let cabinet = fixture(FixtureKind::HingeCabinet);
        assert!(matches!(door_success(&task, &cabinet), Predicate::Not(_)));

        let drawer_task = DoorTask {
            fixture: FixtureKind::Drawer,
            label: "drawer".into(),
            behavior: DoorBehavior::Close,
        };
        let drawer = fixture(FixtureKind::Drawer);
        assert_eq!(
            door_success(&drawer_task, &drawer),
            Check::DoorState {
                fixture: "drawer".into(),
                state: DoorTarget::Closed,
            }
            .into()
        );
    }

    #[test]
    fn door_configs_differ_by_fixture() {
        let cabinet = door_task_config(&DoorTask {
            fixture: FixtureKind::HingeCabinet,
            label: "cabinet".into(),
            behavior: DoorBehavior::Open,
        });
        assert_eq!(cabinet.get(SINGLE_ARM_SPEC).unwrap().len(), 2);
        assert_eq!(cabinet.signals(), ["open_door"]);
        let drawer = door_task_config(&DoorTask {
            fixture: FixtureKind::Drawer,
            label: "drawer".into(),
            behavior: DoorBehavior::Open,
        });
        assert_eq!(drawer.get(SINGLE_ARM_SPEC).unwrap().len(), 1);
    }
}
