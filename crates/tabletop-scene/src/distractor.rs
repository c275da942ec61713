//! Distractor configuration: task-scoped template resolution and
//! per-episode instance expansion.
//!
//! Two generators are involved and they must not be confused:
//!
//! - [`DistractorBuilder::build`] runs once per task with a generator
//!   seeded from the task seed. It picks list-valued types and, when
//!   randomizing, which optional regions are included. The result is fixed
//!   for the task's lifetime.
//! - [`ResolvedDistractorConfig::resolve_instance`] runs once per episode
//!   with the episode generator. It resolves symbolic type references
//!   against the episode's focus, draws counts, and emits slots.

use std::fmt;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use rand::Rng;
use tracing::debug;

use tabletop_catalog::{GroupQuery, SimilarityTable};
use tabletop_core::{rng_from_seed, ConfigError, EpisodeRng, GroupTag, SlotName};

use crate::spec::{
    ContainTarget, ContainerOverrides, DistractorTag, FixtureSpec, ObjectSpec, PlacementDirective,
    PlacementSpec, ScaleSpec, SlotRole,
};

/// Probability that a randomized optional region is included.
pub const REGION_INCLUSION_PROBABILITY: f64 = 0.4;

// ── Template vocabulary ────────────────────────────────────────────

/// Inclusive instance count range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CountRange {
    min: u32,
    max: u32,
}

impl CountRange {
    /// A range `min..=max`.
    pub fn new(min: u32, max: u32) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvalidCountRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Exactly `n`.
    pub fn exactly(n: u32) -> Self {
        Self { min: n, max: n }
    }

    /// Lower bound; instances at or beyond it are optional.
    pub fn min(&self) -> u32 {
        self.min
    }

    /// Upper bound.
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Draw a count in `min..=max`.
    pub fn draw(&self, rng: &mut EpisodeRng) -> u32 {
        rng.random_range(self.min..=self.max)
    }
}

/// Which focus item a symbolic reference is relative to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CategoryClass {
    /// The object being manipulated.
    Obj,
    /// The container the object starts in.
    SourceContainer,
    /// The container the object goes to.
    TargetContainer,
}

impl FromStr for CategoryClass {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "obj" => Ok(Self::Obj),
            "source_container" => Ok(Self::SourceContainer),
            "target_container" => Ok(Self::TargetContainer),
            other => Err(ConfigError::UnknownCategoryClass {
                value: other.to_owned(),
            }),
        }
    }
}

/// How a symbolic reference relates to the focus item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// The focus item itself.
    Focus,
    /// The pool without the focus item and its look-alikes.
    Distractor,
    /// The whole pool.
    Any,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "focus" => Ok(Self::Focus),
            "distractor" => Ok(Self::Distractor),
            "any" => Ok(Self::Any),
            other => Err(ConfigError::UnknownMode {
                value: other.to_owned(),
            }),
        }
    }
}

/// A slot type: literal, or relative to the episode's focus.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeRef {
    /// A concrete query.
    Literal(GroupQuery),
    /// Resolved per episode against a [`FocusContext`].
    Symbolic(CategoryClass, Mode),
}

impl TypeRef {
    /// Parse a `(class, mode)` pair.
    pub fn symbolic(class: &str, mode: &str) -> Result<Self, ConfigError> {
        Ok(Self::Symbolic(class.parse()?, mode.parse()?))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(q) => write!(f, "{q}"),
            Self::Symbolic(c, m) => write!(f, "({c:?}, {m:?})"),
        }
    }
}

/// A slot type before task-scoped resolution.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeChoice {
    /// Already decided.
    Fixed(TypeRef),
    /// One of these names, picked once per task.
    OneOf(Vec<String>),
}

/// One typed slot list entry in a region.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotTemplate {
    /// Type of the slot.
    pub kind: TypeChoice,
    /// How many instances.
    pub count: CountRange,
    /// Groups instances may not resolve to.
    pub exclude_groups: Vec<GroupTag>,
    /// Override for the task-category exclusion.
    pub exclude_obj_cat: Option<bool>,
    /// Uniform model scale.
    pub scale: Option<f64>,
}

impl SlotTemplate {
    /// A literal type.
    pub fn literal(query: impl Into<GroupQuery>, count: CountRange) -> Self {
        Self::with_kind(TypeChoice::Fixed(TypeRef::Literal(query.into())), count)
    }

    /// A symbolic type.
    pub fn symbolic(class: CategoryClass, mode: Mode, count: CountRange) -> Self {
        Self::with_kind(TypeChoice::Fixed(TypeRef::Symbolic(class, mode)), count)
    }

    /// One of several names, chosen once per task.
    pub fn one_of<I, S>(names: I, count: CountRange) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_kind(
            TypeChoice::OneOf(names.into_iter().map(Into::into).collect()),
            count,
        )
    }

    fn with_kind(kind: TypeChoice, count: CountRange) -> Self {
        Self {
            kind,
            count,
            exclude_groups: Vec::new(),
            exclude_obj_cat: None,
            scale: None,
        }
    }

    /// Exclude groups.
    pub fn excluding_groups<I, G>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<GroupTag>,
    {
        self.exclude_groups.extend(groups.into_iter().map(Into::into));
        self
    }

    /// Override the task-category exclusion.
    pub fn exclude_obj_cat(mut self, on: bool) -> Self {
        self.exclude_obj_cat = Some(on);
        self
    }

    /// Set a uniform scale.
    pub fn scaled(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }
}

/// Containment target of a region placement.
#[derive(Clone, Debug, PartialEq)]
pub enum ContainTemplate {
    /// An existing container slot.
    Existing(SlotName),
    /// A new container of this type.
    New(TypeRef),
}

/// Placement shared by every slot of a region.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionPlacement {
    /// Region centre on the surface.
    pub center: (f64, f64),
    /// Region extent.
    pub size: (f64, f64),
    /// Yaw range.
    pub rotation: Option<(f64, f64)>,
    /// Place each slot inside a container.
    pub contain: Option<ContainTemplate>,
    /// Keep clear of these slots.
    pub avoid: Vec<SlotName>,
    /// Whole footprint inside the region.
    pub boundary_containment: bool,
    /// Centre inside the reference region.
    pub ensure_in_ref_region: bool,
    /// Outside every avoided region.
    pub ensure_out_of_ref_region: bool,
    /// Overrides for synthesized containers.
    pub container_overrides: ContainerOverrides,
}

impl Default for RegionPlacement {
    fn default() -> Self {
        Self {
            center: (0.0, 0.0),
            size: (1.0, 1.0),
            rotation: None,
            contain: None,
            avoid: Vec::new(),
            boundary_containment: true,
            ensure_in_ref_region: false,
            ensure_out_of_ref_region: false,
            container_overrides: ContainerOverrides::default(),
        }
    }
}

/// A named distractor region.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionTemplate {
    /// Region key.
    pub key: String,
    /// Shared placement.
    pub placement: RegionPlacement,
    /// Fixture slots (toaster, plant, ...).
    pub fixtures: Vec<SlotTemplate>,
    /// Object slots.
    pub objects: Vec<SlotTemplate>,
}

impl RegionTemplate {
    /// An empty region.
    pub fn new(key: impl Into<String>, placement: RegionPlacement) -> Self {
        Self {
            key: key.into(),
            placement,
            fixtures: Vec::new(),
            objects: Vec::new(),
        }
    }

    /// Add a fixture slot.
    pub fn fixture(mut self, slot: SlotTemplate) -> Self {
        self.fixtures.push(slot);
        self
    }

    /// Add an object slot.
    pub fn object(mut self, slot: SlotTemplate) -> Self {
        self.objects.push(slot);
        self
    }
}

/// Which optional regions a task includes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegionSelection {
    /// Each optional region independently with
    /// [`REGION_INCLUSION_PROBABILITY`].
    Randomized,
    /// The fixed base plus exactly these optional regions.
    Explicit(Vec<String>),
    /// No distractors at all, not even the fixed base.
    Disabled,
}

// ── Resolved (task-scoped) configuration ───────────────────────────

/// A slot template after list-valued types were picked.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedSlot {
    /// The type, never a list.
    pub type_ref: TypeRef,
    /// Count range.
    pub count: CountRange,
    /// Excluded groups.
    pub exclude_groups: Vec<GroupTag>,
    /// Exclusion override.
    pub exclude_obj_cat: Option<bool>,
    /// Uniform scale.
    pub scale: Option<f64>,
}

/// A region after task-scoped resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedRegion {
    /// Shared placement.
    pub placement: RegionPlacement,
    /// Fixture slots.
    pub fixtures: Vec<ResolvedSlot>,
    /// Object slots.
    pub objects: Vec<ResolvedSlot>,
}

/// The distractor configuration of one task.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedDistractorConfig {
    regions: IndexMap<String, ResolvedRegion>,
}

/// Builds a task's [`ResolvedDistractorConfig`].
#[derive(Clone, Debug, Default)]
pub struct DistractorBuilder {
    fixture_scales: IndexMap<String, f64>,
}

impl DistractorBuilder {
    /// A builder with no fixture scale table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scale applied to fixture slots of these types.
    pub fn fixture_scales<I, S>(mut self, scales: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.fixture_scales
            .extend(scales.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Resolve templates for one task.
    ///
    /// Draw order on the task generator: list-valued types of the fixed
    /// regions (fixtures, then objects, per region), then one coin per
    /// optional region when randomizing, then list-valued types of each
    /// included optional region.
    pub fn build(
        &self,
        fixed: &[RegionTemplate],
        optional: &[RegionTemplate],
        task_seed: u64,
        selection: &RegionSelection,
    ) -> Result<ResolvedDistractorConfig, ConfigError> {
        let mut rng = rng_from_seed(task_seed);
        let mut regions = IndexMap::new();

        if let RegionSelection::Explicit(keys) = selection {
            for key in keys {
                if !optional.iter().any(|r| &r.key == key) {
                    return Err(ConfigError::UnknownRegion { key: key.clone() });
                }
            }
        }
        if *selection == RegionSelection::Disabled {
            return Ok(ResolvedDistractorConfig { regions });
        }

        for region in fixed {
            regions.insert(region.key.clone(), self.resolve_region(region, &mut rng));
        }

        let included: Vec<&RegionTemplate> = match selection {
            RegionSelection::Randomized => optional
                .iter()
                .filter(|_| rng.random::<f64>() < REGION_INCLUSION_PROBABILITY)
                .collect(),
            RegionSelection::Explicit(keys) => optional
                .iter()
                .filter(|r| keys.contains(&r.key))
                .collect(),
            RegionSelection::Disabled => Vec::new(),
        };
        for region in included {
            debug!(region = %region.key, "including optional distractor region");
            regions.insert(region.key.clone(), self.resolve_region(region, &mut rng));
        }

        Ok(ResolvedDistractorConfig { regions })
    }

    fn resolve_region(&self, region: &RegionTemplate, rng: &mut EpisodeRng) -> ResolvedRegion {
        let fixtures = region
            .fixtures
            .iter()
            .map(|t| {
                let mut slot = resolve_slot(t, rng);
                if slot.scale.is_none() {
                    if let TypeRef::Literal(q) = &slot.type_ref {
                        slot.scale = q.single().and_then(|n| self.fixture_scales.get(n).copied());
                    }
                }
                slot
            })
            .collect();
        let objects = region.objects.iter().map(|t| resolve_slot(t, rng)).collect();
        ResolvedRegion {
            placement: region.placement.clone(),
            fixtures,
            objects,
        }
    }
}

fn resolve_slot(template: &SlotTemplate, rng: &mut EpisodeRng) -> ResolvedSlot {
    let type_ref = match &template.kind {
        TypeChoice::Fixed(t) => t.clone(),
        TypeChoice::OneOf(names) if names.is_empty() => TypeRef::Literal(GroupQuery::AnyOf(vec![])),
        TypeChoice::OneOf(names) => {
            let pick = rng.random_range(0..names.len());
            TypeRef::Literal(GroupQuery::Named(names[pick].clone()))
        }
    };
    ResolvedSlot {
        type_ref,
        count: template.count,
        exclude_groups: template.exclude_groups.clone(),
        exclude_obj_cat: template.exclude_obj_cat,
        scale: template.scale,
    }
}

// ── Per-episode expansion ──────────────────────────────────────────

/// What symbolic references resolve against in one episode.
#[derive(Clone, Debug, Default)]
pub struct FocusContext {
    /// The task object's query.
    pub obj: Option<GroupQuery>,
    /// The source container category.
    pub source: Option<String>,
    /// The target container category.
    pub target: Option<String>,
    /// Candidate distractor objects.
    pub obj_pool: Vec<String>,
    /// Candidate source containers.
    pub source_pool: Vec<String>,
    /// Candidate target containers.
    pub target_pool: Vec<String>,
    /// Container look-alikes.
    pub similarity: SimilarityTable,
    /// Fixture distractors are placed on.
    pub surface: Option<String>,
}

impl FocusContext {
    fn focus_query(&self, class: CategoryClass) -> GroupQuery {
        let item = match class {
            CategoryClass::Obj => return self.obj.clone().unwrap_or(GroupQuery::AnyOf(vec![])),
            CategoryClass::SourceContainer => &self.source,
            CategoryClass::TargetContainer => &self.target,
        };
        match item {
            Some(name) => GroupQuery::Named(name.clone()),
            None => GroupQuery::AnyOf(vec![]),
        }
    }

    fn focus_key(&self, class: CategoryClass) -> Option<&str> {
        match class {
            // A list-valued object query names a pool, not one item.
            CategoryClass::Obj => match &self.obj {
                Some(GroupQuery::Named(n)) => Some(n),
                _ => None,
            },
            CategoryClass::SourceContainer => self.source.as_deref(),
            CategoryClass::TargetContainer => self.target.as_deref(),
        }
    }

    fn pool(&self, class: CategoryClass) -> &[String] {
        match class {
            CategoryClass::Obj => &self.obj_pool,
            CategoryClass::SourceContainer => &self.source_pool,
            CategoryClass::TargetContainer => &self.target_pool,
        }
    }

    /// Turn a type reference into a concrete query.
    pub fn resolve(&self, type_ref: &TypeRef) -> GroupQuery {
        let (class, mode) = match type_ref {
            TypeRef::Literal(q) => return q.clone(),
            TypeRef::Symbolic(c, m) => (*c, *m),
        };
        match mode {
            Mode::Focus => self.focus_query(class),
            Mode::Any => GroupQuery::AnyOf(self.pool(class).to_vec()),
            Mode::Distractor => {
                let pool = self.pool(class);
                let mut removed: IndexSet<&str> = IndexSet::new();
                // Look-alikes go only when the focus item itself is a candidate.
                let focus = self
                    .focus_key(class)
                    .filter(|k| pool.iter().any(|p| p.as_str() == *k));
                if let Some(key) = focus {
                    removed.insert(key);
                    removed.extend(self.similarity.similar_to(key).map(|c| c.as_str()));
                }
                GroupQuery::AnyOf(
                    pool.iter()
                        .filter(|p| !removed.contains(p.as_str()))
                        .cloned()
                        .collect(),
                )
            }
        }
    }
}

/// Distractor slots for one episode.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DistractorInstance {
    /// Object slots.
    pub objects: Vec<ObjectSpec>,
    /// Fixture slots.
    pub fixtures: Vec<FixtureSpec>,
}

impl ResolvedDistractorConfig {
    /// Region keys in inclusion order.
    pub fn region_keys(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    /// Whether a region is included.
    pub fn has_region(&self, key: &str) -> bool {
        self.regions.contains_key(key)
    }

    /// Look up a region.
    pub fn region(&self, key: &str) -> Option<&ResolvedRegion> {
        self.regions.get(key)
    }

    /// Whether there are no regions.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Expand into concrete slots for one episode.
    ///
    /// Per region: fixture slots, then object slots; per slot template one
    /// count draw on `rng`. Instances numbered at or beyond the template's
    /// minimum are optional.
    pub fn resolve_instance(&self, focus: &FocusContext, rng: &mut EpisodeRng) -> DistractorInstance {
        let mut out = DistractorInstance::default();
        for (key, region) in &self.regions {
            let placement = region_placement(&region.placement, focus);

            for (i, slot) in region.fixtures.iter().enumerate() {
                let n = slot.count.draw(rng);
                let fixture_type = match focus.resolve(&slot.type_ref) {
                    GroupQuery::Named(name) => name,
                    other => other.to_string(),
                };
                for j in 0..n {
                    let tag = DistractorTag {
                        region: key.clone(),
                        type_index: i,
                        instance: j as usize,
                    };
                    out.fixtures.push(FixtureSpec {
                        name: SlotName::new(format!(
                            "distractor_fixture_{}_type_{}_num_{}",
                            key, i, j
                        )),
                        fixture_type: fixture_type.clone(),
                        scale: slot.scale.unwrap_or(1.0),
                        placement: placement.clone().optional(j >= slot.count.min()),
                        tag,
                    });
                }
            }

            for (i, slot) in region.objects.iter().enumerate() {
                let n = slot.count.draw(rng);
                let query = focus.resolve(&slot.type_ref);
                let exclude_obj_cat = match slot.type_ref {
                    TypeRef::Symbolic(CategoryClass::Obj, _) => true,
                    _ => slot.exclude_obj_cat.unwrap_or(true),
                };
                for j in 0..n {
                    let tag = DistractorTag {
                        region: key.clone(),
                        type_index: i,
                        instance: j as usize,
                    };
                    let mut spec = ObjectSpec::new(
                        tag.slot_name(),
                        SlotRole::Distractor(tag),
                        query.clone(),
                    )
                    .excluding_groups(slot.exclude_groups.iter().cloned())
                    .placed(placement.clone().optional(j >= slot.count.min()));
                    spec.exclude_obj_cat = exclude_obj_cat;
                    if let Some(s) = slot.scale {
                        spec.scale = ScaleSpec::Uniform(s);
                    }
                    out.objects.push(spec);
                }
            }
        }
        debug!(
            objects = out.objects.len(),
            fixtures = out.fixtures.len(),
            "expanded distractor instance"
        );
        out
    }
}

fn region_placement(region: &RegionPlacement, focus: &FocusContext) -> PlacementSpec {
    let directive = match &region.contain {
        Some(ContainTemplate::Existing(name)) => {
            PlacementDirective::ContainIn(ContainTarget::Existing(name.clone()))
        }
        Some(ContainTemplate::New(type_ref)) => {
            PlacementDirective::ContainIn(ContainTarget::New(focus.resolve(type_ref)))
        }
        None if !region.avoid.is_empty() => PlacementDirective::Avoid(region.avoid.clone()),
        None => PlacementDirective::Free,
    };
    PlacementSpec {
        fixture: focus.surface.clone(),
        region_center: region.center,
        region_size: region.size,
        rotation_range: region.rotation,
        directive,
        boundary_containment: region.boundary_containment,
        ensure_in_ref_region: region.ensure_in_ref_region,
        ensure_out_of_ref_region: region.ensure_out_of_ref_region,
        optional: false,
        site: None,
        container_overrides: region.container_overrides.clone(),
    }
}
