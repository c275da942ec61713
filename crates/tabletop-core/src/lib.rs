//! Core types and traits for the Tabletop task-authoring layer.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! vocabulary shared by every other crate in the workspace: typed names,
//! geometry primitives, episode enums, the error taxonomy, deterministic
//! seeding, and the collaborator traits behind which the physics engine,
//! asset library and fixture library live.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod geometry;
pub mod id;
pub mod seed;
pub mod traits;
pub mod types;

pub use error::{AssetError, ConfigError, EpisodeError, ResolveError};
pub use geometry::{Pose, Quat, Vec3};
pub use id::{AssetPath, Category, GroupTag, ModelHandle, RegistryName, SiteId, SlotName};
pub use seed::{rng_from_seed, task_seed, uniform, EpisodeRng};
pub use traits::{
    AssetFactory, AssetRequest, CreatedObject, FixtureHandle, FixtureKind, FixtureProvider,
    SimControl, SimState,
};
pub use types::{
    Arm, DoorBehavior, Handedness, HandednessPolicy, InstanceSplit, ObjectInfo, PowerBehavior,
    SpawnShape, SpawnSite,
};
