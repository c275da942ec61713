//! The task table: every registered [`TaskDefinition`] by id.

use indexmap::IndexMap;
use tabletop_catalog::Catalog;
use tabletop_core::seed::FALLBACK_SEED;
use tabletop_core::{
    rng_from_seed, ConfigError, DoorBehavior, FixtureKind, Handedness, HandednessPolicy,
    PowerBehavior,
};
use tracing::info;

use crate::classic::classic_tasks;
use crate::definition::{
    DistractorSetup, DoorTask, FixturePnpTask, LaptopTask, MicrowaveTask, MultiPnpTask,
    TaskDefinition, TaskKind,
};
use crate::engine::TaskEngine;
use crate::layout::SlotLayout;
use crate::matrix::{generate_task_definitions, TaskMatrixConfig};
use crate::regions::{back_edge_with, drawer_back_edge, laptop_edges};

/// Registered tasks in registration order.
#[derive(Clone, Debug, Default)]
pub struct TaskRegistry {
    tasks: IndexMap<String, TaskDefinition>,
}

impl TaskRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in task: the classic table, fixture tasks, articulated
    /// tasks, multi-object tasks and the standard matrix suite generated
    /// from `matrix` against `catalog`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] raised while building or
    /// registering a definition.
    pub fn standard(catalog: &Catalog, matrix: &TaskMatrixConfig) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for def in classic_tasks()? {
            registry.register(def)?;
        }
        for def in fixture_pnp_tasks()? {
            registry.register(def)?;
        }
        for def in articulated_tasks()? {
            registry.register(def)?;
        }
        for def in multi_tasks() {
            registry.register(def)?;
        }
        let mut rng = rng_from_seed(FALLBACK_SEED);
        for def in generate_task_definitions(matrix, catalog, &mut rng)? {
            registry.register(def)?;
        }
        info!(tasks = registry.len(), "task registry built");
        Ok(registry)
    }

    /// Validate and add a definition.
    ///
    /// # Errors
    ///
    /// Returns the validation error, or [`ConfigError::InvalidTask`] if
    /// the id is already taken.
    pub fn register(&mut self, def: TaskDefinition) -> Result<(), ConfigError> {
        def.validate()?;
        if self.tasks.contains_key(&def.id) {
            return Err(ConfigError::InvalidTask {
                id: def.id,
                reason: "registered twice".to_owned(),
            });
        }
        self.tasks.insert(def.id.clone(), def);
        Ok(())
    }

    /// Look up a task.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTask`] for an unregistered id.
    pub fn get(&self, id: &str) -> Result<&TaskDefinition, ConfigError> {
        self.tasks.get(id).ok_or_else(|| ConfigError::UnknownTask { id: id.to_owned() })
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// An engine for task `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTask`] for an unregistered id, or any
    /// error from [`TaskEngine::new`].
    pub fn engine<'c>(&self, id: &str, catalog: &'c Catalog) -> Result<TaskEngine<'c>, ConfigError> {
        TaskEngine::new(self.get(id)?.clone(), catalog)
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    /// Registered definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.tasks.values()
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

// ── Built-in tables ────────────────────────────────────────────────

struct FixtureTable {
    fixture: FixtureKind,
    label: &'static str,
    hand: Handedness,
    left_pos: Option<(f64, f64)>,
    objects: &'static [(&'static str, &'static str, f64)],
}

const CABINET: FixtureTable = FixtureTable {
    fixture: FixtureKind::HingeCabinet,
    label: "cabinet",
    hand: Handedness::Left,
    left_pos: None,
    objects: &[
        ("Cup", "cup", 1.25),
        ("Bottle", "bottled_water", 1.1),
        ("Wine", "wine", 1.0),
        ("Can", "can", 1.0),
        ("Apple", "apple", 1.7),
    ],
};

const DRAWER: FixtureTable = FixtureTable {
    fixture: FixtureKind::Drawer,
    label: "drawer",
    hand: Handedness::Left,
    left_pos: Some((-0.5, -0.7)),
    objects: &[
        ("Cup", "cup", 1.1),
        ("Bottle", "bottled_water", 1.1),
        ("Wine", "wine", 0.9),
        ("Can", "can", 1.2),
        ("Apple", "apple", 1.1),
    ],
};

const MICROWAVE: FixtureTable = FixtureTable {
    fixture: FixtureKind::Microwave,
    label: "microwave",
    hand: Handedness::Right,
    left_pos: Some((-0.5, -0.2)),
    objects: &[
        ("Cup", "cup", 1.25),
        ("Corn", "corn", 1.1),
        ("Potato", "potato", 1.3),
        ("Eggplant", "eggplant", 1.4),
        ("Milk", "milk", 1.0),
    ],
};

/// Put an object in a cabinet, drawer or microwave, then close it.
fn fixture_pnp_tasks() -> Result<Vec<TaskDefinition>, ConfigError> {
    let mut tasks = Vec::new();
    for table in [CABINET, DRAWER, MICROWAVE] {
        let distractors = match table.fixture {
            FixtureKind::Drawer => drawer_back_edge()?,
            _ => back_edge_with(&[("vegetable", 1, 4)])?,
        };
        let mut layout = SlotLayout::new((0.5, -0.8), (0.2, 0.2));
        if let Some((x, y)) = table.left_pos {
            layout = layout.left_at(x, y);
        }
        let title = {
            let mut label = table.label.to_owned();
            label[..1].make_ascii_uppercase();
            label
        };
        for &(name, obj, scale) in table.objects {
            let task = FixturePnpTask {
                fixture: table.fixture,
                label: table.label.to_owned(),
                obj: obj.into(),
                obj_scale: scale,
                registries: vec!["objaverse".into()],
                obj_layout: layout.clone(),
                behavior: DoorBehavior::Close,
                grasp_arm: table.hand.arm(),
            };
            tasks.push(
                TaskDefinition::new(format!("PnP{name}To{title}Close"), TaskKind::FixturePnp(task))
                    .handed(HandednessPolicy::Fixed(table.hand))
                    .with_distractors(DistractorSetup::fixed(vec![distractors.clone()])),
            );
        }
    }
    Ok(tasks)
}

/// Doors, drawers, the microwave button and the laptop lid.
fn articulated_tasks() -> Result<Vec<TaskDefinition>, ConfigError> {
    let mut tasks = Vec::new();
    for (fixture, label, noun) in [
        (FixtureKind::HingeCabinet, "cabinet", "CabinetDoor"),
        (FixtureKind::Drawer, "drawer", "DrawerDoor"),
    ] {
        for (verb, behavior) in [("Open", DoorBehavior::Open), ("Close", DoorBehavior::Close)] {
            tasks.push(TaskDefinition::new(
                format!("Tabletop{verb}{noun}"),
                TaskKind::Door(DoorTask {
                    fixture,
                    label: label.to_owned(),
                    behavior,
                }),
            ));
        }
    }
    for (id, behavior) in [
        ("TabletopTurnOnMicrowave", PowerBehavior::TurnOn),
        ("TabletopTurnOffMicrowave", PowerBehavior::TurnOff),
    ] {
        tasks.push(TaskDefinition::new(
            id,
            TaskKind::Microwave(MicrowaveTask { behavior }),
        ));
    }
    for (id, behavior) in [
        ("TabletopLaptopOpen", DoorBehavior::Open),
        ("TabletopLaptopClose", DoorBehavior::Close),
    ] {
        tasks.push(
            TaskDefinition::new(id, TaskKind::Laptop(LaptopTask::new(behavior)))
                .with_distractors(DistractorSetup::fixed(laptop_edges()?)),
        );
    }
    Ok(tasks)
}

fn multi_tasks() -> Vec<TaskDefinition> {
    vec![
        TaskDefinition::new(
            "PutAllObjectsInBasket",
            TaskKind::MultiPnp(MultiPnpTask::new("basket")),
        ),
        TaskDefinition::new(
            "PutAllObjectsOnPlate",
            TaskKind::MultiPnp(MultiPnpTask::new("plate")),
        ),
    ]
}
