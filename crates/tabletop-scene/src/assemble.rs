//! Placement-plan assembly.
//!
//! [`PlanAssembler::assemble`] turns the task's essential slots and one
//! episode's distractor slots into an ordered [`PlacementPlan`]:
//!
//! 1. Slots are resolved in order, essential slots first. Each essential
//!    slot's category joins the task-category set, which later
//!    non-essential slots avoid unless they opt out.
//! 2. A slot with no valid category is dropped. For an essential slot this
//!    is [`EpisodeError::EssentialUnresolved`].
//! 3. A slot placed inside a container either reuses an existing slot or
//!    gets a synthesized `<name>_container` slot, and is rewritten to
//!    sample relative to that container.
//! 4. Synthesized containers are prepended, and a stable topological pass
//!    puts every referenced slot before its dependents.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info};

use tabletop_catalog::{Catalog, CategoryResolver, GroupQuery, ResolveFilter, IN_CONTAINER_GROUP};
use tabletop_core::{
    AssetError, AssetFactory, AssetRequest, Category, ConfigError, EpisodeError, EpisodeRng,
    InstanceSplit, ModelHandle, ResolveError, SlotName,
};

use crate::distractor::DistractorInstance;
use crate::spec::{
    ContainTarget, FixtureSpec, ObjectSpec, PlacementDirective, PlacementSpec, ScaleSpec, SlotRole,
};

/// Footprint of a container-relative placement region.
pub const CONTAINED_FOOTPRINT: (f64, f64) = (0.1, 0.1);

// ── Plan types ─────────────────────────────────────────────────────

/// An object slot with its created model.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedObject {
    /// The slot, with [`ObjectSpec::info`] populated.
    pub spec: ObjectSpec,
    /// Handle returned by the asset factory.
    pub model: ModelHandle,
}

impl PlannedObject {
    /// Slot name.
    pub fn name(&self) -> &SlotName {
        &self.spec.name
    }
}

/// Why a slot is not in the plan.
#[derive(Clone, Debug, PartialEq)]
pub enum DropReason {
    /// No category survived filtering.
    Unresolved(ResolveError),
    /// The asset factory had no model.
    AssetMissing(AssetError),
    /// A slot this one depends on was dropped.
    DependencyDropped(SlotName),
    /// The placement sampler gave up.
    PlacementFailed,
}

/// A slot removed during assembly or realization.
#[derive(Clone, Debug, PartialEq)]
pub struct DroppedSlot {
    /// The slot.
    pub name: SlotName,
    /// Why.
    pub reason: DropReason,
}

/// Ordered, resolved slots for one episode.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlacementPlan {
    pub(crate) objects: Vec<PlannedObject>,
    pub(crate) fixtures: Vec<FixtureSpec>,
    pub(crate) dropped: Vec<DroppedSlot>,
}

impl PlacementPlan {
    /// Object slots in placement order.
    pub fn objects(&self) -> &[PlannedObject] {
        &self.objects
    }

    /// Distractor fixture slots.
    pub fn fixtures(&self) -> &[FixtureSpec] {
        &self.fixtures
    }

    /// Slots removed so far.
    pub fn dropped(&self) -> &[DroppedSlot] {
        &self.dropped
    }

    /// Look up an object slot.
    pub fn get(&self, name: &str) -> Option<&PlannedObject> {
        self.objects.iter().find(|o| o.spec.name.as_str() == name)
    }

    /// Whether an object slot is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Position of an object slot in placement order.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.objects.iter().position(|o| o.spec.name.as_str() == name)
    }

    /// Resolved category of an object slot.
    pub fn category_of(&self, name: &str) -> Option<&Category> {
        self.get(name).and_then(|o| o.spec.category())
    }

    /// Slot name to resolved category, in placement order.
    pub fn categories(&self) -> IndexMap<SlotName, Category> {
        self.objects
            .iter()
            .filter_map(|o| Some((o.spec.name.clone(), o.spec.category()?.clone())))
            .collect()
    }

    /// Distractor objects from one region.
    pub fn distractors_in_region<'a>(
        &'a self,
        region: &'a str,
    ) -> impl Iterator<Item = &'a PlannedObject> + 'a {
        self.objects
            .iter()
            .filter(move |o| o.spec.role.distractor().is_some_and(|t| t.region == region))
    }

    /// Number of essential object slots.
    pub fn essential_count(&self) -> usize {
        self.objects
            .iter()
            .filter(|o| o.spec.role.is_essential())
            .count()
    }
}

// ── Assembler ──────────────────────────────────────────────────────

/// Resolves object slots against a catalog and orders them.
#[derive(Clone, Copy, Debug)]
pub struct PlanAssembler<'c> {
    resolver: CategoryResolver<'c>,
    split: Option<InstanceSplit>,
    contained_footprint: (f64, f64),
}

/// Outcome of resolving and creating one slot.
enum Created {
    Planned(PlannedObject),
    Dropped(DropReason),
}

impl<'c> PlanAssembler<'c> {
    /// An assembler over `catalog` with no instance split.
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            resolver: CategoryResolver::new(catalog),
            split: None,
            contained_footprint: CONTAINED_FOOTPRINT,
        }
    }

    /// Restrict instance sampling to a split.
    pub fn with_split(mut self, split: Option<InstanceSplit>) -> Self {
        self.split = split;
        self
    }

    /// Assemble one episode's plan.
    ///
    /// Draws on `rng` in slot order: for each slot, its category and
    /// instance, then its synthesized container's category and instance.
    pub fn assemble(
        &self,
        essential: Vec<ObjectSpec>,
        distractors: DistractorInstance,
        factory: &mut dyn AssetFactory,
        rng: &mut EpisodeRng,
    ) -> Result<PlacementPlan, EpisodeError> {
        check_unique(&essential, &distractors)?;

        let mut task_categories: IndexSet<Category> = IndexSet::new();
        let mut resolved: IndexMap<SlotName, Category> = IndexMap::new();
        let mut containers: Vec<PlannedObject> = Vec::new();
        let mut main: Vec<PlannedObject> = Vec::new();
        let mut dropped: Vec<DroppedSlot> = Vec::new();

        for mut spec in essential.into_iter().chain(distractors.objects) {
            let essential = spec.role.is_essential();
            if !essential && spec.exclude_obj_cat {
                spec.exclude_categories.extend(task_categories.iter().cloned());
            }
            if let GroupQuery::SameAs(slot) = &spec.query {
                if let Some(category) = resolved.get(slot) {
                    spec.query = GroupQuery::Named(category.as_str().to_owned());
                }
            }

            let mut planned = match self.create(spec.clone(), factory, rng)? {
                Created::Planned(p) => p,
                Created::Dropped(reason) => {
                    if essential {
                        return Err(essential_failure(spec.name, &spec.query, reason));
                    }
                    debug!(slot = %spec.name, ?reason, "dropping distractor slot");
                    dropped.push(DroppedSlot {
                        name: spec.name,
                        reason,
                    });
                    continue;
                }
            };
            let category = planned.spec.category().cloned();
            if let Some(category) = &category {
                if essential {
                    task_categories.insert(category.clone());
                }
                resolved.insert(planned.spec.name.clone(), category.clone());
            }

            if let PlacementDirective::ContainIn(target) = planned.spec.placement.directive.clone() {
                let in_container = planned
                    .spec
                    .info()
                    .is_some_and(|i| i.has_group(IN_CONTAINER_GROUP));
                if !in_container {
                    return Err(EpisodeError::ContainmentViolation {
                        slot: planned.spec.name.clone(),
                        category: category.unwrap_or_else(|| Category::new("unknown")),
                    });
                }

                let reference = match target {
                    ContainTarget::Existing(name) => name,
                    ContainTarget::New(query) => {
                        let container = container_spec(&planned.spec, query, &task_categories);
                        let name = container.name.clone();
                        let container_query = container.query.clone();
                        match self.create(container, factory, rng)? {
                            Created::Planned(c) => {
                                if let Some(cat) = c.spec.category() {
                                    if essential {
                                        task_categories.insert(cat.clone());
                                    }
                                    resolved.insert(name.clone(), cat.clone());
                                }
                                containers.push(c);
                            }
                            Created::Dropped(reason) => {
                                if essential {
                                    return Err(essential_failure(name, &container_query, reason));
                                }
                                debug!(slot = %planned.spec.name, container = %name,
                                    "dropping distractor with its container");
                                dropped.push(DroppedSlot {
                                    name: name.clone(),
                                    reason,
                                });
                                dropped.push(DroppedSlot {
                                    name: planned.spec.name.clone(),
                                    reason: DropReason::DependencyDropped(name),
                                });
                                continue;
                            }
                        }
                        name
                    }
                };
                planned.spec.placement = self.contained_placement(&planned.spec.placement, reference);
            }

            if let PlacementDirective::Avoid(_) = planned.spec.placement.directive {
                planned.spec.placement.boundary_containment = false;
            }
            main.push(planned);
        }

        let mut objects = containers;
        objects.extend(main);
        let mut fixtures = distractors.fixtures;
        prune_references(&mut objects, &mut fixtures, &mut dropped);
        let objects = order_by_references(objects)?;

        info!(
            objects = objects.len(),
            fixtures = fixtures.len(),
            dropped = dropped.len(),
            "assembled placement plan"
        );
        Ok(PlacementPlan {
            objects,
            fixtures,
            dropped,
        })
    }

    fn create(
        &self,
        spec: ObjectSpec,
        factory: &mut dyn AssetFactory,
        rng: &mut EpisodeRng,
    ) -> Result<Created, EpisodeError> {
        if spec.info().is_some() {
            return Err(EpisodeError::AlreadyAssembled { slot: spec.name });
        }
        let filter = ResolveFilter {
            exclude_categories: spec.exclude_categories.clone(),
            exclude_groups: spec.exclude_groups.clone(),
            require_groups: spec.require_groups.clone(),
            registries: spec.registries.clone(),
            graspable: spec.graspable,
            split: self.split,
        };
        let resolution = match self.resolver.resolve(&spec.query, &filter, rng) {
            Ok(r) => r,
            Err(e) => return Ok(Created::Dropped(DropReason::Unresolved(e))),
        };
        let request = AssetRequest {
            slot: spec.name.clone(),
            category: resolution.category.clone(),
            instance: resolution.instance,
            scale: spec.scale.for_category(&resolution.category),
            registries: spec.registries.clone(),
        };
        let created = match factory.create_object(&request) {
            Ok(c) => c,
            Err(e @ AssetError::NotFound { .. }) => {
                return Ok(Created::Dropped(DropReason::AssetMissing(e)))
            }
            Err(e) => return Err(e.into()),
        };
        if spec.set_info(created.info).is_err() {
            return Err(EpisodeError::AlreadyAssembled { slot: spec.name });
        }
        Ok(Created::Planned(PlannedObject {
            spec,
            model: created.handle,
        }))
    }

    fn contained_placement(&self, original: &PlacementSpec, reference: SlotName) -> PlacementSpec {
        PlacementSpec {
            fixture: original.fixture.clone(),
            region_center: (0.0, 0.0),
            region_size: self.contained_footprint,
            rotation_range: original.rotation_range,
            directive: PlacementDirective::RelativeTo {
                reference,
                site: original.site,
            },
            boundary_containment: false,
            ensure_in_ref_region: original.ensure_in_ref_region,
            ensure_out_of_ref_region: false,
            optional: original.optional,
            site: original.site,
            container_overrides: Default::default(),
        }
    }
}

fn essential_failure(slot: SlotName, query: &GroupQuery, reason: DropReason) -> EpisodeError {
    let reason = match reason {
        DropReason::Unresolved(e) => e,
        DropReason::AssetMissing(AssetError::NotFound { category }) => {
            ResolveError::NoModel { category }
        }
        _ => ResolveError::NoValidCategory {
            query: query.to_string(),
        },
    };
    EpisodeError::EssentialUnresolved { slot, reason }
}

fn check_unique(
    essential: &[ObjectSpec],
    distractors: &DistractorInstance,
) -> Result<(), EpisodeError> {
    let mut seen: IndexSet<&SlotName> = IndexSet::new();
    let names = essential
        .iter()
        .chain(&distractors.objects)
        .map(|o| &o.name)
        .chain(distractors.fixtures.iter().map(|f| &f.name));
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateSlot { name: name.clone() }.into());
        }
    }
    // Synthesized container names must not shadow a declared slot.
    for spec in essential.iter().chain(&distractors.objects) {
        if let PlacementDirective::ContainIn(ContainTarget::New(_)) = spec.placement.directive {
            let name = spec.name.container_slot();
            if seen.contains(&name) {
                return Err(ConfigError::DuplicateSlot { name }.into());
            }
        }
    }
    Ok(())
}

/// The container slot synthesized for `parent`.
fn container_spec(
    parent: &ObjectSpec,
    query: GroupQuery,
    task_categories: &IndexSet<Category>,
) -> ObjectSpec {
    let essential = parent.role.is_essential();
    let overrides = &parent.placement.container_overrides;
    let mut container = ObjectSpec::new(
        parent.name.container_slot(),
        SlotRole::Container {
            of: parent.name.clone(),
            essential,
        },
        query,
    );
    container.exclude_obj_cat = overrides.exclude_obj_cat.unwrap_or(true);
    if !essential && container.exclude_obj_cat {
        container.exclude_categories = task_categories.clone();
    }
    container.scale = match (overrides.scale, &parent.scale) {
        (Some(s), _) => ScaleSpec::Uniform(s),
        (None, table @ ScaleSpec::PerCategory(_)) => table.clone(),
        (None, _) => ScaleSpec::Default,
    };
    container.placement = PlacementSpec {
        directive: PlacementDirective::Free,
        site: None,
        container_overrides: Default::default(),
        ..parent.placement.clone()
    };
    container
}

/// Drop slots whose container is gone, then avoid-references to absent
/// object slots.
fn prune_references(
    objects: &mut Vec<PlannedObject>,
    fixtures: &mut [FixtureSpec],
    dropped: &mut Vec<DroppedSlot>,
) {
    loop {
        let gone: IndexSet<SlotName> = dropped.iter().map(|d| d.name.clone()).collect();
        let before = objects.len();
        objects.retain(|o| {
            let Some(reference) = relative_reference(&o.spec.placement) else {
                return true;
            };
            if !gone.contains(reference) || o.spec.role.is_essential() {
                return true;
            }
            dropped.push(DroppedSlot {
                name: o.spec.name.clone(),
                reason: DropReason::DependencyDropped(reference.clone()),
            });
            false
        });
        if objects.len() == before {
            break;
        }
    }

    let present: IndexSet<SlotName> = objects.iter().map(|o| o.spec.name.clone()).collect();
    for placement in objects
        .iter_mut()
        .map(|o| &mut o.spec.placement)
        .chain(fixtures.iter_mut().map(|f| &mut f.placement))
    {
        if let PlacementDirective::Avoid(names) = &mut placement.directive {
            names.retain(|n| present.contains(n));
        }
    }
}

fn relative_reference(placement: &PlacementSpec) -> Option<&SlotName> {
    match &placement.directive {
        PlacementDirective::RelativeTo { reference, .. } => Some(reference),
        _ => None,
    }
}

/// Stable topological order: among slots whose references are placed,
/// always take the earliest.
fn order_by_references(objects: Vec<PlannedObject>) -> Result<Vec<PlannedObject>, EpisodeError> {
    let names: IndexSet<SlotName> = objects.iter().map(|o| o.spec.name.clone()).collect();
    let mut deps: Vec<Vec<usize>> = Vec::with_capacity(objects.len());
    for o in &objects {
        let mut mine = Vec::new();
        for reference in o.spec.placement.references() {
            match names.get_index_of(reference) {
                Some(idx) => mine.push(idx),
                None => {
                    return Err(EpisodeError::UnknownReference {
                        slot: o.spec.name.clone(),
                        reference: reference.clone(),
                    })
                }
            }
        }
        deps.push(mine);
    }

    let mut placed = vec![false; objects.len()];
    let mut order = Vec::with_capacity(objects.len());
    while order.len() < objects.len() {
        let next = (0..objects.len()).find(|&i| !placed[i] && deps[i].iter().all(|&d| placed[d]));
        match next {
            Some(i) => {
                placed[i] = true;
                order.push(i);
            }
            None => {
                let slots = (0..objects.len())
                    .filter(|&i| !placed[i])
                    .map(|i| objects[i].spec.name.clone())
                    .collect();
                return Err(EpisodeError::ContainmentCycle { slots });
            }
        }
    }

    let mut slots: Vec<Option<PlannedObject>> = objects.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabletop_core::{ObjectInfo, SiteId};

    fn planned(name: &str, directive: PlacementDirective) -> PlannedObject {
        let spec =
            ObjectSpec::essential(name, "bowl").placed(PlacementSpec::default().directive(directive));
        let _ = spec.set_info(ObjectInfo {
            category: "bowl".into(),
            groups: Default::default(),
            instance: None,
            horizontal_radius: 0.1,
            sites: Vec::new(),
        });
        PlannedObject {
            spec,
            model: ModelHandle(0),
        }
    }

    fn relative(to: &str) -> PlacementDirective {
        PlacementDirective::RelativeTo {
            reference: to.into(),
            site: None,
        }
    }

    fn names(objects: &[PlannedObject]) -> Vec<&str> {
        objects.iter().map(|o| o.spec.name.as_str()).collect()
    }

    #[test]
    fn ordering_moves_references_first_and_keeps_the_rest() {
        let objects = vec![
            planned("a", PlacementDirective::Free),
            planned("b", relative("d")),
            planned("c", PlacementDirective::Free),
            planned("d", PlacementDirective::Free),
        ];
        let ordered = order_by_references(objects).unwrap();
        assert_eq!(names(&ordered), vec!["a", "c", "d", "b"]);
    }

    #[test]
    fn essential_failure_names_the_missing_model_or_query() {
        let query = GroupQuery::any_of(["bowl", "plate"]);
        let missing = DropReason::AssetMissing(AssetError::NotFound {
            category: "bowl".into(),
        });
        match essential_failure("container".into(), &query, missing) {
            EpisodeError::EssentialUnresolved { slot, reason } => {
                assert_eq!(slot.as_str(), "container");
                assert_eq!(
                    reason,
                    ResolveError::NoModel {
                        category: "bowl".into()
                    }
                );
            }
            other => panic!("expected EssentialUnresolved, got {other:?}"),
        }

        let e = essential_failure("container".into(), &query, DropReason::PlacementFailed);
        assert_eq!(
            e.to_string(),
            "essential slot 'container' unresolved: no valid category for query [bowl, plate]"
        );
    }

    #[test]
    fn ordering_detects_cycles() {
        let objects = vec![
            planned("a", relative("b")),
            planned("b", relative("a")),
            planned("c", PlacementDirective::Free),
        ];
        match order_by_references(objects) {
            Err(EpisodeError::ContainmentCycle { slots }) => {
                assert_eq!(slots, vec![SlotName::from("a"), SlotName::from("b")]);
            }
            other => panic!("expected ContainmentCycle, got {other:?}"),
        }
    }

    #[test]
    fn ordering_rejects_unknown_reference() {
        let objects = vec![planned("a", relative("ghost"))];
        match order_by_references(objects) {
            Err(EpisodeError::UnknownReference { slot, reference }) => {
                assert_eq!(slot.as_str(), "a");
                assert_eq!(reference.as_str(), "ghost");
            }
            other => panic!("expected UnknownReference, got {other:?}"),
        }
    }

    #[test]
    fn container_inherits_scale_table_and_placement() {
        let parent = ObjectSpec::new(
            "distractor_obj_r_type_0_num_0",
            SlotRole::Distractor(crate::spec::DistractorTag {
                region: "r".into(),
                type_index: 0,
                instance: 0,
            }),
            "fruit",
        )
        .scaled(ScaleSpec::per_category([("plate", 1.2)]))
        .placed(
            PlacementSpec::on("counter")
                .at(0.1, -0.4)
                .in_new_container("plate")
                .on_site(crate::spec::SiteSelector::Index(SiteId(1))),
        );
        let task: IndexSet<Category> = [Category::from("apple")].into_iter().collect();
        let c = container_spec(&parent, GroupQuery::from("plate"), &task);
        assert_eq!(c.name.as_str(), "distractor_obj_r_type_0_num_0_container");
        assert_eq!(c.scale.for_category(&"plate".into()), 1.2);
        assert!(c.exclude_categories.contains("apple"));
        assert_eq!(c.placement.directive, PlacementDirective::Free);
        assert_eq!(c.placement.region_center, (0.1, -0.4));
        assert_eq!(c.placement.site, None);
        assert!(!c.role.is_essential());
    }

    #[test]
    fn container_override_opts_out_of_task_exclusion() {
        let mut placement = PlacementSpec::on("counter").in_new_container("plate");
        placement.container_overrides.exclude_obj_cat = Some(false);
        placement.container_overrides.scale = Some(0.8);
        let parent = ObjectSpec::new(
            "d",
            SlotRole::Distractor(crate::spec::DistractorTag {
                region: "r".into(),
                type_index: 0,
                instance: 0,
            }),
            "fruit",
        )
        .placed(placement);
        let task: IndexSet<Category> = [Category::from("plate")].into_iter().collect();
        let c = container_spec(&parent, GroupQuery::from("plate"), &task);
        assert!(c.exclude_categories.is_empty());
        assert_eq!(c.scale, ScaleSpec::Uniform(0.8));
    }
}
