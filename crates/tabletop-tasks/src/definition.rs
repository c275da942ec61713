//! Declarative task records.
//!
//! A [`TaskDefinition`] is everything needed to run a task: the kind of
//! task and its parameters ([`TaskKind`]), handedness, instance split,
//! distractor regions and success thresholds. Definitions are plain data;
//! [`TaskEngine`](crate::engine::TaskEngine) interprets them.

use std::f64::consts::PI;

use tabletop_catalog::{GroupQuery, SimilarityTable};
use tabletop_core::{
    task_seed, Arm, ConfigError, DoorBehavior, FixtureKind, GroupTag, Handedness,
    HandednessPolicy, InstanceSplit, PowerBehavior, RegistryName, SiteId,
};
use tabletop_scene::{ObjectSpec, RegionSelection, RegionTemplate, ScaleSpec};
use tabletop_success::{ReceptacleRegion, SuccessThresholds};

use crate::layout::SlotLayout;
use crate::task_config::TaskConfig;

// ── Distractors ────────────────────────────────────────────────────

/// Distractor regions of a task.
#[derive(Clone, Debug, PartialEq)]
pub struct DistractorSetup {
    /// Regions always present unless selection is disabled.
    pub fixed: Vec<RegionTemplate>,
    /// Regions included per [`DistractorSetup::selection`].
    pub optional: Vec<RegionTemplate>,
    /// Which optional regions are included.
    pub selection: RegionSelection,
}

impl DistractorSetup {
    /// No distractors at all.
    pub fn none() -> Self {
        Self {
            fixed: Vec::new(),
            optional: Vec::new(),
            selection: RegionSelection::Disabled,
        }
    }

    /// Only the given fixed regions.
    pub fn fixed(regions: Vec<RegionTemplate>) -> Self {
        Self {
            fixed: regions,
            optional: Vec::new(),
            selection: RegionSelection::Explicit(Vec::new()),
        }
    }

    /// Fixed regions plus optional ones chosen by `selection`.
    pub fn with_optional(
        fixed: Vec<RegionTemplate>,
        optional: Vec<RegionTemplate>,
        selection: RegionSelection,
    ) -> Self {
        Self {
            fixed,
            optional,
            selection,
        }
    }
}

impl Default for DistractorSetup {
    fn default() -> Self {
        Self::none()
    }
}

// ── Pick and place ─────────────────────────────────────────────────

/// Where the task object and target container go.
#[derive(Clone, Debug, PartialEq)]
pub enum PnpLayout {
    /// Authored positions.
    Fixed {
        /// Target container slot.
        container: SlotLayout,
        /// Task object slot (or its source container).
        obj: SlotLayout,
    },
    /// Positions drawn per episode from
    /// [`PositionSampler`](crate::layout::PositionSampler).
    Sampled,
}

/// Which container a level goal refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelOf {
    /// The target container (`container`).
    Target,
    /// The source container (`obj_container`).
    Source,
}

/// What counts as placed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaceGoal {
    /// Object in the target container (or on the counter without one).
    #[default]
    Receptacle,
    /// On a site drawn per episode from the container's enabled sites.
    RandomLevel(LevelOf),
    /// On a fixed site of the target container.
    FixedLevel(SiteId),
}

/// Pools the combination matrices draw symbolic distractors from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatrixFocus {
    /// Object categories.
    pub obj_pool: Vec<String>,
    /// Source containers.
    pub source_pool: Vec<String>,
    /// Target containers.
    pub target_pool: Vec<String>,
    /// Container look-alikes.
    pub similarity: SimilarityTable,
}

/// Move one object, optionally out of a source container, into a target
/// container or onto the counter.
#[derive(Clone, Debug, PartialEq)]
pub struct PnpTask {
    /// Task object query.
    pub obj: GroupQuery,
    /// Groups the task object may not come from.
    pub exclude_obj_groups: Vec<GroupTag>,
    /// Registries of the task object.
    pub obj_registries: Vec<RegistryName>,
    /// Scale of the task object and its source container.
    pub obj_scale: ScaleSpec,
    /// Container the object starts in.
    pub source: Option<GroupQuery>,
    /// Container the object goes to.
    pub target: Option<GroupQuery>,
    /// Scale of the target container.
    pub target_scale: ScaleSpec,
    /// Slot positions.
    pub layout: PnpLayout,
    /// Region of the target the object must land in.
    pub receptacle: ReceptacleRegion,
    /// Extra goal conditions.
    pub goal: PlaceGoal,
    /// Additional essential slots placed on the counter.
    pub extra_slots: Vec<ObjectSpec>,
    /// Fixed instruction template with an `{obj}` placeholder.
    pub language: Option<String>,
    /// Symbolic distractor pools.
    pub focus: Option<MatrixFocus>,
}

impl PnpTask {
    /// Counter-to-counter move of `obj` with the classic layout.
    pub fn new(obj: impl Into<GroupQuery>) -> Self {
        Self {
            obj: obj.into(),
            exclude_obj_groups: Vec::new(),
            obj_registries: Vec::new(),
            obj_scale: ScaleSpec::Default,
            source: None,
            target: None,
            target_scale: ScaleSpec::Default,
            layout: PnpLayout::classic(None, (0.5, 0.5)),
            receptacle: ReceptacleRegion::Whole,
            goal: PlaceGoal::Receptacle,
            extra_slots: Vec::new(),
            language: None,
            focus: None,
        }
    }

    /// Start in `source`, resizing the object region to `size`.
    pub fn from_container(mut self, source: impl Into<GroupQuery>, size: (f64, f64)) -> Self {
        self.source = Some(source.into());
        if let PnpLayout::Fixed { obj, .. } = &mut self.layout {
            obj.size = size;
        }
        self
    }

    /// Finish in `target`, resizing the container region to `size`.
    pub fn to_container(mut self, target: impl Into<GroupQuery>, size: (f64, f64)) -> Self {
        self.target = Some(target.into());
        if let PnpLayout::Fixed { container, .. } = &mut self.layout {
            container.size = size;
        }
        self
    }

    /// Replace the layout.
    pub fn laid_out(mut self, layout: PnpLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the goal.
    pub fn with_goal(mut self, goal: PlaceGoal) -> Self {
        self.goal = goal;
        self
    }

    /// Add an essential slot.
    pub fn with_extra(mut self, slot: ObjectSpec) -> Self {
        self.extra_slots.push(slot);
        self
    }

    /// Fix the instruction template.
    pub fn described(mut self, template: impl Into<String>) -> Self {
        self.language = Some(template.into());
        self
    }
}

impl PnpLayout {
    /// The classic layout: target container at the front right, object
    /// (or its source container) nearer the robot.
    pub fn classic(source_size: Option<(f64, f64)>, target_size: (f64, f64)) -> Self {
        Self::Fixed {
            container: SlotLayout::new((0.9, -0.3), target_size),
            obj: SlotLayout::new((0.5, -0.8), source_size.unwrap_or((0.3, 0.3))),
        }
    }

    /// Layout of the combination matrices.
    pub(crate) fn sampled_slots(
        container_pos: (f64, f64),
        container_size: (f64, f64),
        obj_pos: (f64, f64),
        obj_size: (f64, f64),
    ) -> (SlotLayout, SlotLayout) {
        let container = SlotLayout::new(container_pos, container_size)
            .rotated(-PI / 2.0, PI / 2.0)
            .boundary(false)
            .unmirrored();
        let obj = SlotLayout::new(obj_pos, obj_size)
            .rotated(-PI / 2.0, PI / 2.0)
            .in_ref_region()
            .unmirrored();
        (container, obj)
    }
}

// ── Fixture tasks ──────────────────────────────────────────────────

/// Put an object inside a fixture and operate its door.
#[derive(Clone, Debug, PartialEq)]
pub struct FixturePnpTask {
    /// Fixture the object goes in.
    pub fixture: FixtureKind,
    /// Short name used in signals and language ("cabinet", "drawer", ...).
    pub label: String,
    /// Task object query.
    pub obj: GroupQuery,
    /// Uniform object scale.
    pub obj_scale: f64,
    /// Registries of the task object.
    pub registries: Vec<RegistryName>,
    /// Object slot.
    pub obj_layout: SlotLayout,
    /// What to do with the door after placing the object.
    pub behavior: DoorBehavior,
    /// Arm that grasps the object.
    pub grasp_arm: Arm,
}

/// Open or close a hinged door or a drawer.
#[derive(Clone, Debug, PartialEq)]
pub struct DoorTask {
    /// Cabinet or drawer.
    pub fixture: FixtureKind,
    /// Short name used in language ("cabinet", "drawer").
    pub label: String,
    /// Open or close.
    pub behavior: DoorBehavior,
}

/// Press the microwave's start or stop button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MicrowaveTask {
    /// Turn on or off.
    pub behavior: PowerBehavior,
}

/// Open or close a laptop lid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaptopTask {
    /// Open or close.
    pub behavior: DoorBehavior,
    /// Lid joint range in radians.
    pub lid_range: (f64, f64),
}

impl LaptopTask {
    /// A laptop task with the default lid range.
    pub fn new(behavior: DoorBehavior) -> Self {
        Self {
            behavior,
            lid_range: (0.0, 2.0),
        }
    }
}

/// Put several objects into one container, one after another.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiPnpTask {
    /// Container query.
    pub container: GroupQuery,
    /// Object groups, cycled over the objects.
    pub obj_groups: Vec<GroupQuery>,
    /// Groups no object may come from.
    pub exclude_obj_groups: Vec<GroupTag>,
    /// Number of objects.
    pub num_objects: usize,
    /// Container slot.
    pub container_layout: SlotLayout,
    /// Slot shared by every object.
    pub obj_layout: SlotLayout,
}

impl MultiPnpTask {
    /// Three objects from vegetables, fruit and cans into `container`.
    pub fn new(container: impl Into<GroupQuery>) -> Self {
        Self {
            container: container.into(),
            obj_groups: vec!["vegetable".into(), "fruit".into(), "can".into()],
            exclude_obj_groups: Vec::new(),
            num_objects: 3,
            container_layout: SlotLayout::new((0.0, -0.5), (0.5, 0.5)),
            obj_layout: SlotLayout::new((0.5, -1.0), (0.3, 0.3)),
        }
    }
}

/// What a task does.
#[derive(Clone, Debug, PartialEq)]
pub enum TaskKind {
    /// Pick and place on the counter.
    Pnp(PnpTask),
    /// Pick and place into a fixture, then operate its door.
    FixturePnp(FixturePnpTask),
    /// Door or drawer only.
    Door(DoorTask),
    /// Microwave button.
    Microwave(MicrowaveTask),
    /// Laptop lid.
    Laptop(LaptopTask),
    /// Several objects into one container.
    MultiPnp(MultiPnpTask),
}

impl TaskKind {
    /// Fixture the task needs besides the counter.
    pub fn fixture_kind(&self) -> Option<FixtureKind> {
        match self {
            Self::Pnp(_) | Self::MultiPnp(_) => None,
            Self::FixturePnp(t) => Some(t.fixture),
            Self::Door(t) => Some(t.fixture),
            Self::Microwave(_) => Some(FixtureKind::Microwave),
            Self::Laptop(_) => Some(FixtureKind::Laptop),
        }
    }

    /// Whether the task has a door whose state can be read.
    pub fn has_door(&self) -> bool {
        matches!(self, Self::FixturePnp(_) | Self::Door(_))
    }
}

// ── Definition ─────────────────────────────────────────────────────

/// A complete task record.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskDefinition {
    /// Unique task name; also the source of the task seed.
    pub id: String,
    /// What the task does.
    pub kind: TaskKind,
    /// Which hand the scene is laid out for.
    pub handedness: HandednessPolicy,
    /// Instance split of every resolved category.
    pub split: Option<InstanceSplit>,
    /// Distractor regions.
    pub distractors: DistractorSetup,
    /// Success thresholds.
    pub thresholds: SuccessThresholds,
    /// Per-arm subtask specs; derived from the kind when `None`.
    pub task_config: Option<TaskConfig>,
}

impl TaskDefinition {
    /// A right-handed task without distractors.
    pub fn new(id: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            id: id.into(),
            kind,
            handedness: HandednessPolicy::Fixed(Handedness::Right),
            split: None,
            distractors: DistractorSetup::none(),
            thresholds: SuccessThresholds::default(),
            task_config: None,
        }
    }

    /// Set the handedness policy.
    pub fn handed(mut self, policy: HandednessPolicy) -> Self {
        self.handedness = policy;
        self
    }

    /// Set the instance split.
    pub fn with_split(mut self, split: Option<InstanceSplit>) -> Self {
        self.split = split;
        self
    }

    /// Set the distractor regions.
    pub fn with_distractors(mut self, distractors: DistractorSetup) -> Self {
        self.distractors = distractors;
        self
    }

    /// Override the derived task config.
    pub fn with_task_config(mut self, config: TaskConfig) -> Self {
        self.task_config = Some(config);
        self
    }

    /// Seed of the task-scoped generator.
    pub fn task_seed(&self) -> u64 {
        task_seed(&self.id)
    }

    /// Check the definition for contradictions.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidThreshold`] for bad thresholds and
    /// [`ConfigError::InvalidTask`] for any other inconsistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate()?;
        if self.id.is_empty() {
            return Err(self.invalid("task id must not be empty"));
        }
        match &self.kind {
            TaskKind::Pnp(t) => {
                match t.goal {
                    PlaceGoal::RandomLevel(LevelOf::Target) | PlaceGoal::FixedLevel(_)
                        if t.target.is_none() =>
                    {
                        return Err(self.invalid("level goal needs a target container"));
                    }
                    PlaceGoal::RandomLevel(LevelOf::Source) if t.source.is_none() => {
                        return Err(self.invalid("level goal needs a source container"));
                    }
                    _ => {}
                }
                if let PnpLayout::Fixed { container, obj } = &t.layout {
                    check_layout(self, container)?;
                    check_layout(self, obj)?;
                }
            }
            TaskKind::FixturePnp(t) => {
                if !matches!(
                    t.fixture,
                    FixtureKind::HingeCabinet | FixtureKind::Drawer | FixtureKind::Microwave
                ) {
                    return Err(self.invalid(format!(
                        "{} has no door to place into",
                        t.fixture.as_str()
                    )));
                }
                if !(t.obj_scale.is_finite() && t.obj_scale > 0.0) {
                    return Err(self.invalid("object scale must be positive"));
                }
                check_layout(self, &t.obj_layout)?;
            }
            TaskKind::Door(t) => {
                if !matches!(t.fixture, FixtureKind::HingeCabinet | FixtureKind::Drawer) {
                    return Err(self.invalid(format!("{} has no door", t.fixture.as_str())));
                }
            }
            TaskKind::Microwave(_) => {}
            TaskKind::Laptop(t) => {
                let (lo, hi) = t.lid_range;
                if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                    return Err(self.invalid(format!("lid range ({lo}, {hi}) is empty")));
                }
            }
            TaskKind::MultiPnp(t) => {
                if t.num_objects == 0 {
                    return Err(self.invalid("at least one object is required"));
                }
                if t.obj_groups.is_empty() {
                    return Err(self.invalid("object groups must not be empty"));
                }
                check_layout(self, &t.container_layout)?;
                check_layout(self, &t.obj_layout)?;
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidTask {
            id: self.id.clone(),
            reason: reason.into(),
        }
    }
}

fn check_layout(def: &TaskDefinition, layout: &SlotLayout) -> Result<(), ConfigError> {
    let (w, h) = layout.size;
    if w > 0.0 && h > 0.0 {
        Ok(())
    } else {
        Err(def.invalid(format!("region size ({w}, {h}) must be positive")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pnp() -> TaskDefinition {
        TaskDefinition::new(
            "PnPOnionToBowl",
            TaskKind::Pnp(PnpTask::new("onion").to_container("bowl", (0.5, 0.5))),
        )
    }

    #[test]
    fn classic_definition_is_valid() {
        let def = pnp();
        def.validate().unwrap();
        assert_eq!(def.handedness, HandednessPolicy::Fixed(Handedness::Right));
        assert_eq!(def.kind.fixture_kind(), None);
        assert_eq!(def.task_seed(), task_seed("PnPOnionToBowl"));
    }

    #[test]
    fn source_resizes_object_region() {
        let task = PnpTask::new("fruit").from_container("plate", (0.7, 0.7));
        match task.layout {
            PnpLayout::Fixed { obj, container } => {
                assert_eq!(obj.size, (0.7, 0.7));
                assert_eq!(obj.pos, (0.5, -0.8));
                assert_eq!(container.pos, (0.9, -0.3));
            }
            other => panic!("expected fixed layout, got {other:?}"),
        }
    }

    #[test]
    fn level_goal_without_container_is_rejected() {
        let mut def = pnp();
        if let TaskKind::Pnp(t) = &mut def.kind {
            t.goal = PlaceGoal::RandomLevel(LevelOf::Source);
        }
        match def.validate() {
            Err(ConfigError::InvalidTask { id, .. }) => assert_eq!(id, "PnPOnionToBowl"),
            other => panic!("expected InvalidTask, got {other:?}"),
        }
    }

    #[test]
    fn empty_lid_range_is_rejected() {
        let mut task = LaptopTask::new(DoorBehavior::Open);
        task.lid_range = (1.0, 1.0);
        let def = TaskDefinition::new("TabletopLaptopOpen", TaskKind::Laptop(task));
        assert!(matches!(def.validate(), Err(ConfigError::InvalidTask { .. })));
    }

    #[test]
    fn door_task_needs_a_door() {
        let def = TaskDefinition::new(
            "OpenLaptopDoor",
            TaskKind::Door(DoorTask {
                fixture: FixtureKind::Laptop,
                label: "laptop".into(),
                behavior: DoorBehavior::Open,
            }),
        );
        assert!(matches!(def.validate(), Err(ConfigError::InvalidTask { .. })));
    }

    #[test]
    fn bad_thresholds_surface_first() {
        let mut def = pnp();
        def.thresholds.upright = 2.0;
        assert!(matches!(
            def.validate(),
            Err(ConfigError::InvalidThreshold { .. })
        ));
    }
}
