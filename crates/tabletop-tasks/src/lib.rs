//! Task definitions and the episode engine for Tabletop.
//!
//! A task is data: a [`TaskDefinition`] names the objects and containers
//! it spawns, where they go for either hand, which distractor regions
//! surround them, and which [`TaskKind`] strategy decides success,
//! subtask signals and the instruction. [`TaskEngine`] runs one
//! definition against the collaborator traits of `tabletop-core`.
//!
//! - [`registry`]: [`TaskRegistry`], every built-in task by id.
//! - [`classic`]: the hand-authored pick-and-place table.
//! - [`matrix`]: container-combination matrices generated from a
//!   [`TaskMatrixConfig`].
//! - [`engine`]: the episode lifecycle.
//! - [`task_config`]: per-arm subtask metadata for data generation.
//! - [`layout`], [`regions`], [`language`]: shared building blocks.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod articulated;
pub mod classic;
pub mod definition;
pub mod engine;
mod fixture_pnp;
pub mod language;
pub mod layout;
pub mod matrix;
mod multi;
mod pnp;
pub mod regions;
pub mod registry;
pub mod task_config;

pub use articulated::TURNED_ON;
pub use definition::{
    DistractorSetup, DoorTask, FixturePnpTask, LaptopTask, LevelOf, MatrixFocus, MicrowaveTask,
    MultiPnpTask, PlaceGoal, PnpLayout, PnpTask, TaskDefinition, TaskKind,
};
pub use engine::TaskEngine;
pub use layout::{PositionSampler, SampledPositions, SlotLayout};
pub use matrix::{generate_task_definitions, MatrixDistractors, MatrixSet, TaskMatrixConfig};
pub use registry::TaskRegistry;
pub use task_config::{SubtaskSpec, TaskConfig};
