//! Object and placement specifications.
//!
//! An [`ObjectSpec`] is one slot in a scene: a name, a role, a group query,
//! filters, and a [`PlacementSpec`]. Task strategies and the distractor
//! builder produce them; the assembler resolves them.

use std::cell::OnceCell;

use indexmap::{IndexMap, IndexSet};
use tabletop_catalog::GroupQuery;
use tabletop_core::{Category, GroupTag, ObjectInfo, RegistryName, SiteId, SlotName};

// ── Roles ──────────────────────────────────────────────────────────

/// Identifies a distractor slot by where it came from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DistractorTag {
    /// Region key, e.g. `back_edge` or `distractor_obj`.
    pub region: String,
    /// Index of the slot template within the region.
    pub type_index: usize,
    /// Instance number within the template's count.
    pub instance: usize,
}

impl DistractorTag {
    /// Conventional slot name:
    /// `distractor_obj_{region}_type_{type_index}_num_{instance}`.
    pub fn slot_name(&self) -> SlotName {
        SlotName::new(format!(
            "distractor_obj_{}_type_{}_num_{}",
            self.region, self.type_index, self.instance
        ))
    }
}

/// What a slot is for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotRole {
    /// Needed by the task; failure to resolve or place aborts the episode.
    Essential,
    /// A container synthesized to hold another slot.
    Container {
        /// The contained slot.
        of: SlotName,
        /// Whether the contained slot is essential.
        essential: bool,
    },
    /// Scene clutter; failures drop the slot silently.
    Distractor(DistractorTag),
}

impl SlotRole {
    /// Whether failure of this slot aborts the episode.
    pub fn is_essential(&self) -> bool {
        match self {
            Self::Essential => true,
            Self::Container { essential, .. } => *essential,
            Self::Distractor(_) => false,
        }
    }

    /// The distractor tag, if this is a distractor.
    pub fn distractor(&self) -> Option<&DistractorTag> {
        match self {
            Self::Distractor(tag) => Some(tag),
            _ => None,
        }
    }
}

// ── Placement ──────────────────────────────────────────────────────

/// Which discrete site of a container to sample on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SiteSelector {
    /// A specific site.
    Index(SiteId),
    /// The last declared enabled site.
    Last,
}

impl SiteSelector {
    /// The concrete site on a container, if it exists and is enabled.
    pub fn pick(self, info: &ObjectInfo) -> Option<SiteId> {
        match self {
            Self::Index(id) => info.site(id).filter(|s| !s.disabled).map(|s| s.id),
            Self::Last => info.enabled_sites().last().map(|s| s.id),
        }
    }
}

/// Where a contained object's container comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainTarget {
    /// Reuse a container slot that already exists; no new model.
    Existing(SlotName),
    /// Synthesize a new `<name>_container` slot from this query.
    New(GroupQuery),
}

/// How a slot is positioned relative to others.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlacementDirective {
    /// Sample freely in the placement region.
    Free,
    /// Place inside a container (before assembly).
    ContainIn(ContainTarget),
    /// Sample relative to an already placed slot (after assembly).
    RelativeTo {
        /// The container slot.
        reference: SlotName,
        /// A specific site on the container.
        site: Option<SiteSelector>,
    },
    /// Sample outside the footprints of these slots.
    Avoid(Vec<SlotName>),
}

/// Overrides applied to a synthesized container.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContainerOverrides {
    /// Whether the container inherits the task-category exclusion.
    pub exclude_obj_cat: Option<bool>,
    /// Uniform scale for the container.
    pub scale: Option<f64>,
}

/// Where and how a slot is placed.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementSpec {
    /// Fixture whose surface is sampled (e.g. the counter).
    pub fixture: Option<String>,
    /// Region centre, as an offset on the fixture surface.
    pub region_center: (f64, f64),
    /// Region extent.
    pub region_size: (f64, f64),
    /// Yaw range; `None` leaves orientation to the sampler.
    pub rotation_range: Option<(f64, f64)>,
    /// Relationship to other slots.
    pub directive: PlacementDirective,
    /// The whole object footprint must lie in the region.
    pub boundary_containment: bool,
    /// The object centre must lie in the reference region.
    pub ensure_in_ref_region: bool,
    /// The object must lie outside every avoided region.
    pub ensure_out_of_ref_region: bool,
    /// Sampling failure drops the slot.
    pub optional: bool,
    /// Site on the container, for contained placements.
    pub site: Option<SiteSelector>,
    /// Applied to a synthesized container.
    pub container_overrides: ContainerOverrides,
}

impl Default for PlacementSpec {
    fn default() -> Self {
        Self {
            fixture: None,
            region_center: (0.0, 0.0),
            region_size: (0.3, 0.3),
            rotation_range: None,
            directive: PlacementDirective::Free,
            boundary_containment: true,
            ensure_in_ref_region: false,
            ensure_out_of_ref_region: false,
            optional: false,
            site: None,
            container_overrides: ContainerOverrides::default(),
        }
    }
}

impl PlacementSpec {
    /// A free placement on `fixture`.
    pub fn on(fixture: impl Into<String>) -> Self {
        Self {
            fixture: Some(fixture.into()),
            ..Self::default()
        }
    }

    /// Set the region centre.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.region_center = (x, y);
        self
    }

    /// Set the region size.
    pub fn sized(mut self, w: f64, h: f64) -> Self {
        self.region_size = (w, h);
        self
    }

    /// Set the yaw range.
    pub fn rotated(mut self, lo: f64, hi: f64) -> Self {
        self.rotation_range = Some((lo, hi));
        self
    }

    /// Set the directive.
    pub fn directive(mut self, directive: PlacementDirective) -> Self {
        self.directive = directive;
        self
    }

    /// Place inside a new container resolved from `query`.
    pub fn in_new_container(self, query: impl Into<GroupQuery>) -> Self {
        self.directive(PlacementDirective::ContainIn(ContainTarget::New(query.into())))
    }

    /// Set boundary containment.
    pub fn boundary(mut self, on: bool) -> Self {
        self.boundary_containment = on;
        self
    }

    /// Require the centre to lie in the reference region.
    pub fn in_ref_region(mut self) -> Self {
        self.ensure_in_ref_region = true;
        self
    }

    /// Mark optional.
    pub fn optional(mut self, on: bool) -> Self {
        self.optional = on;
        self
    }

    /// Sample on a particular container site.
    pub fn on_site(mut self, site: SiteSelector) -> Self {
        self.site = Some(site);
        self
    }

    /// Slots this placement must follow in the plan.
    pub fn references(&self) -> Vec<&SlotName> {
        match &self.directive {
            PlacementDirective::RelativeTo { reference, .. } => vec![reference],
            PlacementDirective::Avoid(names) => names.iter().collect(),
            PlacementDirective::ContainIn(ContainTarget::Existing(name)) => vec![name],
            PlacementDirective::ContainIn(ContainTarget::New(_)) | PlacementDirective::Free => {
                Vec::new()
            }
        }
    }
}

// ── Scale ──────────────────────────────────────────────────────────

/// How a slot's model scale is chosen.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ScaleSpec {
    /// Unit scale.
    #[default]
    Default,
    /// A fixed factor.
    Uniform(f64),
    /// A factor per resolved category, unit scale for unlisted ones.
    PerCategory(IndexMap<Category, f64>),
}

impl ScaleSpec {
    /// Per-category table from pairs.
    pub fn per_category<I, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, f64)>,
        C: Into<Category>,
    {
        Self::PerCategory(pairs.into_iter().map(|(c, s)| (c.into(), s)).collect())
    }

    /// Scale for a resolved category.
    pub fn for_category(&self, category: &Category) -> f64 {
        match self {
            Self::Default => 1.0,
            Self::Uniform(s) => *s,
            Self::PerCategory(table) => table.get(category).copied().unwrap_or(1.0),
        }
    }
}

// ── ObjectSpec ─────────────────────────────────────────────────────

/// One object slot in a scene.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectSpec {
    /// Scene-unique name.
    pub name: SlotName,
    /// Purpose of the slot.
    pub role: SlotRole,
    /// What to resolve.
    pub query: GroupQuery,
    /// Groups that may not be chosen.
    pub exclude_groups: Vec<GroupTag>,
    /// Groups the chosen category must carry.
    pub require_groups: Vec<GroupTag>,
    /// Categories that may not be chosen.
    pub exclude_categories: IndexSet<Category>,
    /// Non-essential slots also avoid every task category.
    pub exclude_obj_cat: bool,
    /// Only graspable categories.
    pub graspable: bool,
    /// Placement.
    pub placement: PlacementSpec,
    /// Model scale.
    pub scale: ScaleSpec,
    /// Allowed registries.
    pub registries: Vec<RegistryName>,
    info: OnceCell<ObjectInfo>,
}

impl ObjectSpec {
    /// A slot with default filters and a default free placement.
    pub fn new(name: impl Into<SlotName>, role: SlotRole, query: impl Into<GroupQuery>) -> Self {
        Self {
            name: name.into(),
            role,
            query: query.into(),
            exclude_groups: Vec::new(),
            require_groups: Vec::new(),
            exclude_categories: IndexSet::new(),
            exclude_obj_cat: true,
            graspable: false,
            placement: PlacementSpec::default(),
            scale: ScaleSpec::Default,
            registries: Vec::new(),
            info: OnceCell::new(),
        }
    }

    /// An essential slot.
    pub fn essential(name: impl Into<SlotName>, query: impl Into<GroupQuery>) -> Self {
        Self::new(name, SlotRole::Essential, query)
    }

    /// Set the placement.
    pub fn placed(mut self, placement: PlacementSpec) -> Self {
        self.placement = placement;
        self
    }

    /// Require a graspable category.
    pub fn graspable(mut self) -> Self {
        self.graspable = true;
        self
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

    /// Set the scale.
    pub fn scaled(mut self, scale: ScaleSpec) -> Self {
        self.scale = scale;
        self
    }

    /// Restrict registries.
    pub fn from_registries<I, R>(mut self, registries: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RegistryName>,
    {
        self.registries = registries.into_iter().map(Into::into).collect();
        self
    }

    /// Metadata of the created model, once assembled.
    pub fn info(&self) -> Option<&ObjectInfo> {
        self.info.get()
    }

    /// Record the created model's metadata.
    ///
    /// Succeeds once; later calls hand the value back unchanged.
    pub fn set_info(&self, info: ObjectInfo) -> Result<(), ObjectInfo> {
        self.info.set(info)
    }

    /// The resolved category, once assembled.
    pub fn category(&self) -> Option<&Category> {
        self.info().map(|i| &i.category)
    }
}

/// A distractor fixture slot (toaster, plant, ...).
#[derive(Clone, Debug, PartialEq)]
pub struct FixtureSpec {
    /// Scene-unique name.
    pub name: SlotName,
    /// Fixture type requested from the fixture library.
    pub fixture_type: String,
    /// Model scale.
    pub scale: f64,
    /// Placement.
    pub placement: PlacementSpec,
    /// Where the slot came from.
    pub tag: DistractorTag,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabletop_core::{SpawnShape, SpawnSite};

    fn info_with_sites(disabled_last: bool) -> ObjectInfo {
        let site = |id: u32, disabled| SpawnSite {
            id: SiteId(id),
            name: format!("level{id}"),
            shape: SpawnShape::Box,
            half_size: (0.1, 0.1),
            height: id as f64 * 0.2,
            disabled,
        };
        ObjectInfo {
            category: "tiered_shelf".into(),
            groups: Default::default(),
            instance: None,
            horizontal_radius: 0.3,
            sites: vec![site(0, false), site(1, false), site(2, disabled_last)],
        }
    }

    #[test]
    fn distractor_slot_names() {
        let tag = DistractorTag {
            region: "back_edge".into(),
            type_index: 1,
            instance: 0,
        };
        assert_eq!(
            tag.slot_name().as_str(),
            "distractor_obj_back_edge_type_1_num_0"
        );
    }

    #[test]
    fn info_is_set_once() {
        let spec = ObjectSpec::essential("obj", "fruit");
        assert!(spec.info().is_none());
        assert!(spec.set_info(info_with_sites(false)).is_ok());
        assert!(spec.set_info(info_with_sites(true)).is_err());
        assert_eq!(spec.info().map(|i| i.sites[2].disabled), Some(false));
    }

    #[test]
    fn site_selector_skips_disabled() {
        let info = info_with_sites(true);
        assert_eq!(SiteSelector::Last.pick(&info), Some(SiteId(1)));
        assert_eq!(SiteSelector::Index(SiteId(2)).pick(&info), None);
        assert_eq!(SiteSelector::Index(SiteId(0)).pick(&info), Some(SiteId(0)));
    }

    #[test]
    fn per_category_scale_defaults_to_one() {
        let scale = ScaleSpec::per_category([("plate", 1.2)]);
        assert_eq!(scale.for_category(&"plate".into()), 1.2);
        assert_eq!(scale.for_category(&"apple".into()), 1.0);
    }

    #[test]
    fn roles() {
        assert!(SlotRole::Essential.is_essential());
        assert!(SlotRole::Container {
            of: "obj".into(),
            essential: true
        }
        .is_essential());
        let tag = DistractorTag {
            region: "r".into(),
            type_index: 0,
            instance: 0,
        };
        assert!(!SlotRole::Distractor(tag).is_essential());
    }
}
