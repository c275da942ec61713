//! The generic task engine.
//!
//! [`TaskEngine`] runs one [`TaskDefinition`] episode after episode. The
//! distractor configuration is resolved once per task from the task seed;
//! everything else is drawn from an episode generator seeded at
//! [`start_episode()`](TaskEngine::start_episode).
//!
//! # Episode lifecycle
//!
//! 1. [`start_episode()`](TaskEngine::start_episode): bind fixtures, draw
//!    handedness, build the essential object slots.
//! 2. [`load_scene()`](TaskEngine::load_scene): expand distractors, resolve
//!    and create models, sample poses, fix the success predicate.
//! 3. [`reset_state()`](TaskEngine::reset_state): put doors, lids and
//!    buttons in their starting state.
//!
//! [`reset()`](TaskEngine::reset) runs all three. Queries made before the
//! step they depend on return [`EpisodeError::NotStarted`].

use indexmap::IndexMap;
use rand::Rng;
use tracing::{debug, info};

use tabletop_catalog::Catalog;
use tabletop_core::{
    rng_from_seed, AssetFactory, ConfigError, EpisodeError, EpisodeRng, FixtureHandle, FixtureKind,
    FixtureProvider, Handedness, HandednessPolicy, ObjectInfo, SimControl, SimState, SiteId,
    SlotName,
};
use tabletop_scene::{
    DistractorBuilder, FocusContext, ObjectSpec, PlacementPlan, PlacementSampler, PlanAssembler,
    ResolvedDistractorConfig, ScenePlacements,
};
use tabletop_success::{EvalContext, Predicate, SignalPlan, SuccessThresholds};

use crate::definition::{TaskDefinition, TaskKind};
use crate::layout::FIXTURE_SCALES;
use crate::task_config::TaskConfig;
use crate::{articulated, fixture_pnp, multi, pnp};

// ── Strategy plumbing ──────────────────────────────────────────────

/// What a strategy sees once the scene is assembled.
pub(crate) struct LoadContext<'a> {
    pub(crate) id: &'a str,
    pub(crate) plan: &'a PlacementPlan,
    pub(crate) counter: &'a FixtureHandle,
    pub(crate) fixture: Option<&'a FixtureHandle>,
    pub(crate) thresholds: &'a SuccessThresholds,
}

impl LoadContext<'_> {
    /// The bound fixture of `kind`.
    pub(crate) fn fixture(&self, kind: FixtureKind) -> Result<&FixtureHandle, ConfigError> {
        if kind == FixtureKind::Counter {
            return Ok(self.counter);
        }
        self.fixture
            .filter(|f| f.kind == kind)
            .ok_or_else(|| ConfigError::MissingFixture {
                kind: kind.as_str().to_owned(),
            })
    }
}

/// Episode-scoped results of a strategy.
#[derive(Clone, Debug)]
pub(crate) struct Outcome {
    pub(crate) success: Predicate,
    pub(crate) signals: SignalPlan,
    pub(crate) language: String,
    pub(crate) target_site: Option<SiteId>,
}

// ── Episode state ──────────────────────────────────────────────────

struct Loaded {
    plan: PlacementPlan,
    placements: ScenePlacements,
    objects: IndexMap<SlotName, ObjectInfo>,
    outcome: Outcome,
}

struct Episode {
    seed: u64,
    rng: EpisodeRng,
    handedness: Handedness,
    counter: FixtureHandle,
    fixture: Option<FixtureHandle>,
    specs: Vec<ObjectSpec>,
    loaded: Option<Loaded>,
}

// ── TaskEngine ─────────────────────────────────────────────────────

/// Runs episodes of one task.
///
/// # Example
///
/// ```ignore
/// let mut engine = TaskEngine::new(registry.get("PnPOnionToBowl")?.clone(), &catalog)?;
/// engine.reset(seed, &fixtures, &mut factory, &mut sampler, &mut sim)?;
/// while !engine.check_success(&sim)? {
///     // step the simulation
/// }
/// ```
pub struct TaskEngine<'c> {
    def: TaskDefinition,
    catalog: &'c Catalog,
    distractors: ResolvedDistractorConfig,
    episode: Option<Episode>,
}

impl<'c> TaskEngine<'c> {
    /// Validate `def` and resolve its distractor configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the definition is invalid or names an
    /// unknown optional distractor region.
    pub fn new(def: TaskDefinition, catalog: &'c Catalog) -> Result<Self, ConfigError> {
        def.validate()?;
        let distractors = DistractorBuilder::new()
            .fixture_scales(FIXTURE_SCALES.iter().copied())
            .build(
                &def.distractors.fixed,
                &def.distractors.optional,
                def.task_seed(),
                &def.distractors.selection,
            )?;
        debug!(
            task = %def.id,
            regions = ?distractors.region_keys().collect::<Vec<_>>(),
            "resolved distractor configuration"
        );
        Ok(Self {
            def,
            catalog,
            distractors,
            episode: None,
        })
    }

    /// The task definition.
    pub fn definition(&self) -> &TaskDefinition {
        &self.def
    }

    /// The task-scoped distractor configuration.
    pub fn distractors(&self) -> &ResolvedDistractorConfig {
        &self.distractors
    }

    /// Begin an episode.
    ///
    /// Binds the counter and, for fixture tasks, the task fixture; draws
    /// handedness; builds the essential object slots.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFixture`] if the layout lacks a
    /// fixture the task needs.
    pub fn start_episode(
        &mut self,
        seed: u64,
        fixtures: &dyn FixtureProvider,
    ) -> Result<(), ConfigError> {
        let missing = |kind: FixtureKind| ConfigError::MissingFixture {
            kind: kind.as_str().to_owned(),
        };
        let counter = fixtures
            .get_fixture(FixtureKind::Counter)
            .ok_or_else(|| missing(FixtureKind::Counter))?;
        let fixture = match self.def.kind.fixture_kind() {
            Some(kind) => Some(fixtures.get_fixture(kind).ok_or_else(|| missing(kind))?),
            None => None,
        };

        let mut rng = rng_from_seed(seed);
        let handedness = match self.def.handedness {
            HandednessPolicy::Fixed(h) => h,
            HandednessPolicy::Randomized => {
                if rng.random_bool(0.5) {
                    Handedness::Left
                } else {
                    Handedness::Right
                }
            }
        };

        let surface = counter.name.as_str();
        let specs = match &self.def.kind {
            TaskKind::Pnp(t) => pnp::object_specs(t, handedness, surface, &mut rng),
            TaskKind::FixturePnp(t) => fixture_pnp::object_specs(t, handedness, surface),
            TaskKind::MultiPnp(t) => multi::object_specs(t, handedness, surface),
            TaskKind::Door(_) | TaskKind::Microwave(_) | TaskKind::Laptop(_) => Vec::new(),
        };
        info!(
            task = %self.def.id,
            seed,
            ?handedness,
            slots = specs.len(),
            "episode started"
        );

        self.episode = Some(Episode {
            seed,
            rng,
            handedness,
            counter,
            fixture,
            specs,
            loaded: None,
        });
        Ok(())
    }

    /// Essential object slots of the current episode, before assembly.
    ///
    /// # Errors
    ///
    /// Returns [`EpisodeError::NotStarted`] before
    /// [`start_episode()`](Self::start_episode).
    pub fn get_object_configs(&self) -> Result<&[ObjectSpec], EpisodeError> {
        Ok(&self.episode()?.specs)
    }

    /// Expand distractors, assemble the plan, realize it and fix the
    /// episode's success predicate, signals and instruction.
    ///
    /// # Errors
    ///
    /// Returns [`EpisodeError::NotStarted`] before
    /// [`start_episode()`](Self::start_episode). Resolution and placement
    /// failures of essential slots are retryable
    /// (see [`EpisodeError::is_retryable`]); anything else is fatal.
    pub fn load_scene(
        &mut self,
        factory: &mut dyn AssetFactory,
        sampler: &mut dyn PlacementSampler,
    ) -> Result<&ScenePlacements, EpisodeError> {
        let def = &self.def;
        let ep = self.episode.as_mut().ok_or(EpisodeError::NotStarted)?;
        ep.loaded = None;

        let surface = ep.counter.name.as_str();
        let focus = match &def.kind {
            TaskKind::Pnp(t) => pnp::focus(t, surface),
            TaskKind::FixturePnp(t) => fixture_pnp::focus(t, surface),
            TaskKind::MultiPnp(t) => multi::focus(t, surface),
            TaskKind::Door(_) | TaskKind::Microwave(_) | TaskKind::Laptop(_) => FocusContext {
                surface: Some(surface.to_owned()),
                ..Default::default()
            },
        };
        let instance = self.distractors.resolve_instance(&focus, &mut ep.rng);
        let mut plan = PlanAssembler::new(self.catalog)
            .with_split(def.split)
            .assemble(ep.specs.clone(), instance, factory, &mut ep.rng)?;
        let placements = plan.realize(sampler, &mut ep.rng)?;

        let objects: IndexMap<SlotName, ObjectInfo> = plan
            .objects()
            .iter()
            .filter_map(|o| o.spec.info().map(|info| (o.name().clone(), info.clone())))
            .collect();

        let ctx = LoadContext {
            id: &def.id,
            plan: &plan,
            counter: &ep.counter,
            fixture: ep.fixture.as_ref(),
            thresholds: &def.thresholds,
        };
        let outcome = match &def.kind {
            TaskKind::Pnp(t) => pnp::outcome(t, &ctx, &mut ep.rng)?,
            TaskKind::FixturePnp(t) => fixture_pnp::outcome(t, &ctx)?,
            TaskKind::Door(t) => articulated::door_outcome(t, &ctx)?,
            TaskKind::Microwave(t) => articulated::microwave_outcome(t, &ctx)?,
            TaskKind::Laptop(t) => articulated::laptop_outcome(t, &ctx)?,
            TaskKind::MultiPnp(t) => multi::outcome(t, &ctx)?,
        };

        info!(
            task = %def.id,
            seed = ep.seed,
            objects = plan.objects().len(),
            fixtures = plan.fixtures().len(),
            dropped = plan.dropped().len(),
            target_site = ?outcome.target_site,
            "scene loaded"
        );

        let loaded = ep.loaded.insert(Loaded {
            plan,
            placements,
            objects,
            outcome,
        });
        Ok(&loaded.placements)
    }

    /// Put articulated fixtures in their starting state.
    ///
    /// # Errors
    ///
    /// Returns [`EpisodeError::NotStarted`] before
    /// [`start_episode()`](Self::start_episode), and
    /// [`ConfigError::InvalidTask`] if a laptop has no lid joint.
    pub fn reset_state(&mut self, sim: &mut dyn SimControl) -> Result<(), EpisodeError> {
        let def = &self.def;
        let ep = self.episode.as_mut().ok_or(EpisodeError::NotStarted)?;
        let Some(fixture) = ep.fixture.as_ref() else {
            return Ok(());
        };
        match &def.kind {
            TaskKind::FixturePnp(t) => fixture_pnp::reset_door(fixture, t.behavior, sim, &mut ep.rng),
            TaskKind::Door(t) => articulated::reset_door_task(t, fixture, sim, &mut ep.rng),
            TaskKind::Microwave(t) => articulated::reset_microwave(t, fixture, sim),
            TaskKind::Laptop(t) => articulated::reset_laptop(&def.id, t, fixture, sim, &mut ep.rng)?,
            TaskKind::Pnp(_) | TaskKind::MultiPnp(_) => {}
        }
        debug!(task = %def.id, fixture = %fixture.name, "fixture state reset");
        Ok(())
    }

    /// Run a whole episode reset: start, load and reset fixture state.
    ///
    /// # Errors
    ///
    /// Whatever the three steps return.
    pub fn reset(
        &mut self,
        seed: u64,
        fixtures: &dyn FixtureProvider,
        factory: &mut dyn AssetFactory,
        sampler: &mut dyn PlacementSampler,
        sim: &mut dyn SimControl,
    ) -> Result<(), EpisodeError> {
        self.start_episode(seed, fixtures)?;
        self.load_scene(factory, sampler)?;
        self.reset_state(sim)
    }

    /// Whether the task is complete in the current simulation state.
    ///
    /// # Errors
    ///
    /// Returns [`EpisodeError::NotStarted`] before the scene is loaded.
    pub fn check_success(&self, sim: &dyn SimState) -> Result<bool, EpisodeError> {
        let loaded = self.loaded()?;
        let ctx = EvalContext::new(sim, &loaded.objects, &self.def.thresholds);
        Ok(loaded.outcome.success.evaluate(&ctx))
    }

    /// Every subtask signal, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`EpisodeError::NotStarted`] before the scene is loaded.
    pub fn get_subtask_signals(
        &self,
        sim: &dyn SimState,
    ) -> Result<IndexMap<String, bool>, EpisodeError> {
        let loaded = self.loaded()?;
        let ctx = EvalContext::new(sim, &loaded.objects, &self.def.thresholds);
        Ok(loaded.outcome.signals.evaluate(&ctx))
    }

    /// The episode's instruction.
    ///
    /// # Errors
    ///
    /// Returns [`EpisodeError::NotStarted`] before the scene is loaded.
    pub fn get_episode_language_description(&self) -> Result<&str, EpisodeError> {
        Ok(&self.loaded()?.outcome.language)
    }

    /// Per-arm subtask specs: the definition's override, else the default
    /// of the task kind.
    pub fn get_task_config(&self) -> TaskConfig {
        if let Some(config) = &self.def.task_config {
            return config.clone();
        }
        match &self.def.kind {
            TaskKind::Pnp(_) => pnp::task_config(),
            TaskKind::FixturePnp(t) => fixture_pnp::task_config(t),
            TaskKind::Door(t) => articulated::door_task_config(t),
            TaskKind::Microwave(_) => articulated::microwave_task_config(),
            TaskKind::Laptop(_) => articulated::laptop_task_config(),
            TaskKind::MultiPnp(t) => multi::task_config(t),
        }
    }

    /// Whether the task fixture's door reads open.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTask`] for tasks without a door and
    /// [`EpisodeError::NotStarted`] before
    /// [`start_episode()`](Self::start_episode).
    pub fn is_door_open(&self, sim: &dyn SimState) -> Result<bool, EpisodeError> {
        if !self.def.kind.has_door() {
            return Err(ConfigError::InvalidTask {
                id: self.def.id.clone(),
                reason: "task has no door".to_owned(),
            }
            .into());
        }
        let ep = self.episode()?;
        let Some(fixture) = ep.fixture.as_ref() else {
            return Ok(false);
        };
        Ok(sim
            .door_state(&fixture.name)
            .is_some_and(|s| s >= self.def.thresholds.door_open))
    }

    /// Handedness of the current episode.
    pub fn handedness(&self) -> Option<Handedness> {
        self.episode.as_ref().map(|e| e.handedness)
    }

    /// The assembled plan of the current episode.
    pub fn plan(&self) -> Option<&PlacementPlan> {
        self.loaded().ok().map(|l| &l.plan)
    }

    /// Realized poses of the current episode.
    pub fn placements(&self) -> Option<&ScenePlacements> {
        self.loaded().ok().map(|l| &l.placements)
    }

    /// The spawn site drawn for level tasks.
    pub fn target_site(&self) -> Option<SiteId> {
        self.loaded().ok().and_then(|l| l.outcome.target_site)
    }

    fn episode(&self) -> Result<&Episode, EpisodeError> {
        self.episode.as_ref().ok_or(EpisodeError::NotStarted)
    }

    fn loaded(&self) -> Result<&Loaded, EpisodeError> {
        self.episode()?
            .loaded
            .as_ref()
            .ok_or(EpisodeError::NotStarted)
    }
}
