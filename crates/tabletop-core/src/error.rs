//! Error types for the task-authoring layer.
//!
//! Three severities, kept apart by type:
//!
//! - [`ResolveError`] is routine. A query with no candidates drops the slot.
//! - [`EpisodeError`] carries both retryable episode failures (an essential
//!   object could not be resolved or placed) and fatal invariant breaches.
//!   See [`EpisodeError::is_retryable`].
//! - [`ConfigError`] is a programmer error in a task definition and is
//!   never coerced into a default.

use std::error::Error;
use std::fmt;

use crate::id::{Category, SlotName};

// ── ConfigError ────────────────────────────────────────────────────

/// Invalid task or catalog configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// Handedness was not `left`, `right` (or `random` where allowed).
    InvalidHandedness {
        /// The rejected value.
        value: String,
    },
    /// A behavior string was not one of the task's known behaviors.
    InvalidBehavior {
        /// The rejected value.
        value: String,
    },
    /// A spawn-site type was not `box`, `cylinder` or `sphere`.
    InvalidSpawnType {
        /// The rejected value.
        value: String,
    },
    /// An instance split was not `A` or `B`.
    InvalidSplit {
        /// The rejected value.
        value: String,
    },
    /// A symbolic category class was not `obj`, `source_container` or
    /// `target_container`.
    UnknownCategoryClass {
        /// The rejected value.
        value: String,
    },
    /// A symbolic resolution mode was not `focus`, `distractor` or `any`.
    UnknownMode {
        /// The rejected value.
        value: String,
    },
    /// A count range had `min > max`.
    InvalidCountRange {
        /// Lower bound.
        min: u32,
        /// Upper bound.
        max: u32,
    },
    /// Two slots in one scene share a name.
    DuplicateSlot {
        /// The repeated name.
        name: SlotName,
    },
    /// A success threshold was out of range.
    InvalidThreshold {
        /// Which threshold, and why.
        reason: String,
    },
    /// A task id was looked up but never registered.
    UnknownTask {
        /// The requested id.
        id: String,
    },
    /// A task needs a fixture the layout does not provide.
    MissingFixture {
        /// The fixture kind requested.
        kind: String,
    },
    /// A catalog document failed to parse or was inconsistent.
    InvalidCatalog {
        /// Description of the problem.
        reason: String,
    },
    /// A distractor selection named a region that no template declares.
    UnknownRegion {
        /// The requested region key.
        key: String,
    },
    /// A task-matrix configuration failed to parse or was inconsistent.
    InvalidMatrix {
        /// Description of the problem.
        reason: String,
    },
    /// A task definition is internally inconsistent.
    InvalidTask {
        /// The task id.
        id: String,
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandedness { value } => write!(f, "invalid handedness '{value}'"),
            Self::InvalidBehavior { value } => write!(f, "invalid behavior '{value}'"),
            Self::InvalidSpawnType { value } => write!(f, "invalid spawn type '{value}'"),
            Self::InvalidSplit { value } => write!(f, "invalid instance split '{value}'"),
            Self::UnknownCategoryClass { value } => {
                write!(f, "unknown category class '{value}'")
            }
            Self::UnknownMode { value } => write!(f, "unknown resolution mode '{value}'"),
            Self::InvalidCountRange { min, max } => {
                write!(f, "count range min {min} exceeds max {max}")
            }
            Self::DuplicateSlot { name } => write!(f, "duplicate slot name '{name}'"),
            Self::InvalidThreshold { reason } => write!(f, "invalid threshold: {reason}"),
            Self::UnknownTask { id } => write!(f, "unknown task '{id}'"),
            Self::MissingFixture { kind } => write!(f, "layout has no '{kind}' fixture"),
            Self::InvalidCatalog { reason } => write!(f, "invalid catalog: {reason}"),
            Self::UnknownRegion { key } => write!(f, "unknown distractor region '{key}'"),
            Self::InvalidMatrix { reason } => write!(f, "invalid task matrix: {reason}"),
            Self::InvalidTask { id, reason } => write!(f, "task '{id}': {reason}"),
        }
    }
}

impl Error for ConfigError {}

// ── ResolveError ───────────────────────────────────────────────────

/// A group query could not be turned into a concrete category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// Every candidate was removed by the exclusion filters.
    NoValidCategory {
        /// Human-readable rendering of the query.
        query: String,
    },
    /// A `SameAs` query referenced a slot that has not been resolved.
    UnresolvedReference {
        /// The referenced slot.
        slot: SlotName,
    },
    /// The category resolved but the asset factory has no model for it.
    NoModel {
        /// The resolved category.
        category: Category,
    },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoValidCategory { query } => {
                write!(f, "no valid category for query {query}")
            }
            Self::UnresolvedReference { slot } => {
                write!(f, "slot '{slot}' has not been resolved")
            }
            Self::NoModel { category } => {
                write!(f, "no model available for category '{category}'")
            }
        }
    }
}

impl Error for ResolveError {}

// ── AssetError ─────────────────────────────────────────────────────

/// Failures reported by the asset factory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetError {
    /// No model exists for the requested category or path.
    NotFound {
        /// The requested category.
        category: Category,
    },
    /// A model file exists but could not be loaded.
    Corrupt {
        /// The offending file.
        path: String,
        /// Loader message.
        reason: String,
    },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { category } => write!(f, "no model found for category '{category}'"),
            Self::Corrupt { path, reason } => write!(f, "corrupt model '{path}': {reason}"),
        }
    }
}

impl Error for AssetError {}

// ── EpisodeError ───────────────────────────────────────────────────

/// Failures while building or running one episode.
#[derive(Clone, Debug, PartialEq)]
pub enum EpisodeError {
    /// A task-essential slot resolved to no category.
    EssentialUnresolved {
        /// The slot.
        slot: SlotName,
        /// Why resolution failed.
        reason: ResolveError,
    },
    /// A task-essential slot could not be placed after all attempts.
    PlacementFailed {
        /// The slot.
        slot: SlotName,
    },
    /// An object claims to sit in a container but its category lacks the
    /// `in_container` group.
    ContainmentViolation {
        /// The contained slot.
        slot: SlotName,
        /// Its resolved category.
        category: Category,
    },
    /// A placement references a slot that does not exist in the plan.
    UnknownReference {
        /// The slot holding the reference.
        slot: SlotName,
        /// The missing referent.
        reference: SlotName,
    },
    /// Container references form a cycle.
    ContainmentCycle {
        /// Slots that could not be ordered.
        slots: Vec<SlotName>,
    },
    /// A slot's model metadata was recorded a second time.
    AlreadyAssembled {
        /// The slot.
        slot: SlotName,
    },
    /// An episode operation was called before `start_episode`.
    NotStarted,
    /// The asset factory failed in a way that cannot be retried.
    Asset(AssetError),
    /// A configuration error surfaced while building the episode.
    Config(ConfigError),
}

impl EpisodeError {
    /// Whether the caller may reset with a new seed and try again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EssentialUnresolved { .. } | Self::PlacementFailed { .. }
        )
    }
}

impl fmt::Display for EpisodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EssentialUnresolved { slot, reason } => {
                write!(f, "essential slot '{slot}' unresolved: {reason}")
            }
            Self::PlacementFailed { slot } => {
                write!(f, "could not place essential slot '{slot}'")
            }
            Self::ContainmentViolation { slot, category } => write!(
                f,
                "slot '{slot}' ({category}) is placed in a container but is not in_container"
            ),
            Self::UnknownReference { slot, reference } => {
                write!(f, "slot '{slot}' references unknown slot '{reference}'")
            }
            Self::ContainmentCycle { slots } => {
                let names: Vec<&str> = slots.iter().map(SlotName::as_str).collect();
                write!(f, "containment cycle among [{}]", names.join(", "))
            }
            Self::AlreadyAssembled { slot } => {
                write!(f, "slot '{slot}' was already assembled")
            }
            Self::NotStarted => write!(f, "episode not started"),
            Self::Asset(e) => write!(f, "asset error: {e}"),
            Self::Config(e) => write!(f, "config error: {e}"),
        }
    }
}

impl Error for EpisodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::EssentialUnresolved { reason, .. } => Some(reason),
            Self::Asset(e) => Some(e),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AssetError> for EpisodeError {
    fn from(e: AssetError) -> Self {
        Self::Asset(e)
    }
}

impl From<ConfigError> for EpisodeError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
