//! Scene configuration for Tabletop tasks.
//!
//! - [`spec`]: [`ObjectSpec`] and [`PlacementSpec`], one slot of a scene.
//! - [`distractor`]: region templates, task-scoped resolution, and
//!   per-episode expansion into distractor slots.
//! - [`assemble`]: [`PlanAssembler`], which resolves slots, synthesizes
//!   containers, and orders the [`PlacementPlan`].
//! - [`realize`]: drives an external [`PlacementSampler`] over a plan.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod assemble;
pub mod distractor;
pub mod realize;
pub mod spec;

pub use assemble::{
    DropReason, DroppedSlot, PlacementPlan, PlanAssembler, PlannedObject, CONTAINED_FOOTPRINT,
};
pub use distractor::{
    CategoryClass, ContainTemplate, CountRange, DistractorBuilder, DistractorInstance,
    FocusContext, Mode, RegionPlacement, RegionSelection, RegionTemplate,
    ResolvedDistractorConfig, ResolvedRegion, ResolvedSlot, SlotTemplate, TypeChoice, TypeRef,
    REGION_INCLUSION_PROBABILITY,
};
pub use realize::{
    Obstacle, PlacementSampler, ReferenceFrame, SampleRequest, SamplingFailure, ScenePlacements,
};
pub use spec::{
    ContainTarget, ContainerOverrides, DistractorTag, FixtureSpec, ObjectSpec,
    PlacementDirective, PlacementSpec, ScaleSpec, SiteSelector, SlotRole,
};
