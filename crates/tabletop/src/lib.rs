//! Tabletop: task authoring for bimanual tabletop manipulation.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Tabletop sub-crates. For most users, adding `tabletop` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tabletop::prelude::*;
//! use tabletop_test_utils::{kitchen_catalog, MockFixtures};
//!
//! let catalog = kitchen_catalog();
//! let registry = TaskRegistry::standard(&catalog, &TaskMatrixConfig::default()).unwrap();
//!
//! let mut engine = registry.engine("PnPOnionToBowl", &catalog).unwrap();
//! engine.start_episode(42, &MockFixtures::kitchen()).unwrap();
//! assert_eq!(engine.handedness(), Some(Handedness::Right));
//! assert_eq!(engine.get_object_configs().unwrap().len(), 2);
//!
//! let config = engine.get_task_config();
//! assert!(config.get("task_spec_0").is_some());
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tabletop-core` | Names, geometry, episode enums, errors, seeding, collaborator traits |
//! | [`catalog`] | `tabletop-catalog` | Object categories, group queries, exclusion rules |
//! | [`scene`] | `tabletop-scene` | Object specs, distractor regions, plan assembly and realization |
//! | [`success`] | `tabletop-success` | Geometric predicates, predicate trees, subtask signals |
//! | [`tasks`] | `tabletop-tasks` | Task definitions, the task table, matrices, the episode engine |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core vocabulary and collaborator traits (`tabletop-core`).
///
/// The physics engine, asset library and fixture library plug in through
/// [`types::SimState`], [`types::SimControl`], [`types::AssetFactory`] and
/// [`types::FixtureProvider`].
pub use tabletop_core as types;

/// Object catalog and category resolution (`tabletop-catalog`).
pub use tabletop_catalog as catalog;

/// Scene construction (`tabletop-scene`).
///
/// [`scene::PlanAssembler`] turns object specs and a distractor instance
/// into an ordered [`scene::PlacementPlan`]; an external
/// [`scene::PlacementSampler`] realizes it.
pub use tabletop_scene as scene;

/// Success evaluation (`tabletop-success`).
pub use tabletop_success as success;

/// Tasks and the episode engine (`tabletop-tasks`).
pub use tabletop_tasks as tasks;

/// Common imports for typical Tabletop usage.
///
/// ```rust
/// use tabletop::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use tabletop_core::{
        Arm, AssetFactory, DoorBehavior, FixtureKind, FixtureProvider, Handedness,
        HandednessPolicy, InstanceSplit, Pose, PowerBehavior, SimControl, SimState, Vec3,
    };

    // Errors
    pub use tabletop_core::{AssetError, ConfigError, EpisodeError, ResolveError};

    // Catalog
    pub use tabletop_catalog::{Catalog, GroupQuery};

    // Scene
    pub use tabletop_scene::{
        ObjectSpec, PlacementSampler, PlacementSpec, RegionSelection, SampleRequest,
        SamplingFailure, ScenePlacements,
    };

    // Success
    pub use tabletop_success::SuccessThresholds;

    // Tasks
    pub use tabletop_tasks::{
        TaskConfig, TaskDefinition, TaskEngine, TaskKind, TaskMatrixConfig, TaskRegistry,
    };
}
