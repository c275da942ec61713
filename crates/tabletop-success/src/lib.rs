//! Success evaluation for Tabletop tasks.
//!
//! - [`predicates`]: pure geometric reads of the simulation state.
//! - [`compose`]: [`Predicate`] trees of [`Check`]s and the
//!   [`SignalPlan`] that turns them into named subtask signals.
//! - [`config`]: [`SuccessThresholds`], the numeric constants behind the
//!   predicates.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod compose;
pub mod config;
pub mod predicates;

pub use compose::{Check, DoorTarget, EvalContext, Predicate, ReceptacleRegion, Signal, SignalPlan};
pub use config::SuccessThresholds;
