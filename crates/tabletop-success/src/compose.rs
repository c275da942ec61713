//! Success predicates and subtask signals as data.
//!
//! A task describes its success condition as a [`Predicate`] tree whose
//! leaves are [`Check`]s over named bodies. The tree is evaluated against
//! an [`EvalContext`] every step; it holds no state of its own. Per-subtask
//! signals are described by a [`SignalPlan`].

use indexmap::IndexMap;
use tabletop_core::{Arm, ObjectInfo, SimState, SiteId, SlotName};
use tracing::trace;

use crate::config::SuccessThresholds;
use crate::predicates;

// ── EvalContext ────────────────────────────────────────────────────

/// Everything a predicate may read.
pub struct EvalContext<'a> {
    /// Current simulation state.
    pub sim: &'a dyn SimState,
    /// Model metadata of every object slot in the scene.
    pub objects: &'a IndexMap<SlotName, ObjectInfo>,
    /// Numeric thresholds.
    pub thresholds: &'a SuccessThresholds,
}

impl<'a> EvalContext<'a> {
    /// Bundle the three inputs.
    pub fn new(
        sim: &'a dyn SimState,
        objects: &'a IndexMap<SlotName, ObjectInfo>,
        thresholds: &'a SuccessThresholds,
    ) -> Self {
        Self {
            sim,
            objects,
            thresholds,
        }
    }
}

// ── Check ──────────────────────────────────────────────────────────

/// Which part of a receptacle counts for [`Check::InReceptacle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceptacleRegion {
    /// Anywhere within the receptacle radius.
    Whole,
    /// The highest enabled site when the container has sites, otherwise
    /// the whole receptacle.
    HighestSite,
    /// One specific site.
    Site(SiteId),
}

/// Target door state for [`Check::DoorState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoorTarget {
    /// At or above the open threshold.
    Open,
    /// At or below the closed threshold.
    Closed,
}

/// A single leaf condition.
#[derive(Clone, Debug, PartialEq)]
pub enum Check {
    /// `obj` rests in `container`.
    InReceptacle {
        /// Object slot.
        obj: SlotName,
        /// Container slot.
        container: SlotName,
        /// Region of the container that counts.
        region: ReceptacleRegion,
    },
    /// `obj` is upright within `threshold`.
    Upright {
        /// Object slot.
        obj: SlotName,
        /// Minimum up-axis dot product.
        threshold: f64,
    },
    /// `obj` touches a fixture.
    FixtureContact {
        /// Object slot.
        obj: SlotName,
        /// Fixture name.
        fixture: String,
    },
    /// Every gripper is far from a body (object slot or fixture part).
    GripperFar {
        /// Body name.
        body: String,
    },
    /// A fixture's door is open or closed.
    DoorState {
        /// Fixture name.
        fixture: String,
        /// Required state.
        state: DoorTarget,
    },
    /// The site `obj` rests on is exactly `site`.
    SiteIs {
        /// Container slot.
        container: SlotName,
        /// Object slot.
        obj: SlotName,
        /// Required site, fixed when the episode's scene is loaded.
        site: SiteId,
    },
    /// `obj` is inside a fixture.
    InsideFixture {
        /// Object slot.
        obj: SlotName,
        /// Fixture name.
        fixture: String,
        /// Whether partial overlap counts.
        partial: bool,
    },
    /// `arm` is grasping `obj`.
    Grasping {
        /// The arm.
        arm: Arm,
        /// Object slot.
        obj: SlotName,
    },
    /// `arm`'s gripper touches a body.
    GripperContact {
        /// The arm.
        arm: Arm,
        /// Body name.
        body: String,
    },
    /// A joint is at or beyond `value`.
    JointAtLeast {
        /// Joint name.
        joint: String,
        /// Lower bound.
        value: f64,
    },
    /// A joint is at or below `value`.
    JointAtMost {
        /// Joint name.
        joint: String,
        /// Upper bound.
        value: f64,
    },
    /// A boolean fixture flag equals `expected`.
    FixtureFlag {
        /// Fixture name.
        fixture: String,
        /// Flag name.
        flag: String,
        /// Required value.
        expected: bool,
    },
}

impl Check {
    /// Evaluate against the current state.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> bool {
        let sim = ctx.sim;
        let t = ctx.thresholds;
        match self {
            Self::InReceptacle {
                obj,
                container,
                region,
            } => {
                let Some(info) = ctx.objects.get(container) else {
                    trace!(%container, "in_receptacle: container not in scene");
                    return false;
                };
                let site = match region {
                    ReceptacleRegion::Whole => None,
                    ReceptacleRegion::HighestSite => predicates::highest_site(info),
                    ReceptacleRegion::Site(id) => match info.site(*id) {
                        Some(s) => Some(s),
                        None => return false,
                    },
                };
                predicates::in_receptacle(sim, obj.as_str(), container.as_str(), info, site, t)
            }
            Self::Upright { obj, threshold } => predicates::upright(sim, obj.as_str(), *threshold),
            Self::FixtureContact { obj, fixture } => {
                predicates::fixture_contact(sim, obj.as_str(), fixture)
            }
            Self::GripperFar { body } => {
                predicates::gripper_far(sim, body, t.gripper_far_distance)
            }
            Self::DoorState { fixture, state } => match state {
                DoorTarget::Open => predicates::door_open(sim, fixture, t),
                DoorTarget::Closed => predicates::door_closed(sim, fixture, t),
            },
            Self::SiteIs {
                container,
                obj,
                site,
            } => ctx.objects.get(container).is_some_and(|info| {
                predicates::closest_site(
                    sim,
                    container.as_str(),
                    info,
                    obj.as_str(),
                    t.site_max_distance,
                ) == Some(*site)
            }),
            Self::InsideFixture {
                obj,
                fixture,
                partial,
            } => predicates::inside_fixture(sim, obj.as_str(), fixture, *partial),
            Self::Grasping { arm, obj } => sim.is_grasping(*arm, obj.as_str()),
            Self::GripperContact { arm, body } => sim.gripper_contact(*arm, body),
            Self::JointAtLeast { joint, value } => {
                sim.joint_position(joint).is_some_and(|q| q >= *value)
            }
            Self::JointAtMost { joint, value } => {
                sim.joint_position(joint).is_some_and(|q| q <= *value)
            }
            Self::FixtureFlag {
                fixture,
                flag,
                expected,
            } => sim.fixture_flag(fixture, flag) == Some(*expected),
        }
    }

    /// Object slots this check reads.
    pub fn slots(&self) -> Vec<&SlotName> {
        match self {
            Self::InReceptacle { obj, container, .. } | Self::SiteIs { obj, container, .. } => {
                vec![obj, container]
            }
            Self::Upright { obj, .. }
            | Self::FixtureContact { obj, .. }
            | Self::InsideFixture { obj, .. }
            | Self::Grasping { obj, .. } => vec![obj],
            Self::GripperFar { .. }
            | Self::DoorState { .. }
            | Self::GripperContact { .. }
            | Self::JointAtLeast { .. }
            | Self::JointAtMost { .. }
            | Self::FixtureFlag { .. } => Vec::new(),
        }
    }
}

// ── Predicate ──────────────────────────────────────────────────────

/// A boolean combination of [`Check`]s.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// True when every child is; empty is true.
    All(Vec<Predicate>),
    /// True when any child is; empty is false.
    Any(Vec<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
    /// A leaf.
    Check(Check),
    /// A constant.
    Const(bool),
}

impl From<Check> for Predicate {
    fn from(check: Check) -> Self {
        Self::Check(check)
    }
}

impl Predicate {
    /// Conjunction of `parts`.
    pub fn all(parts: impl IntoIterator<Item = Predicate>) -> Self {
        Self::All(parts.into_iter().collect())
    }

    /// Disjunction of `parts`.
    pub fn any(parts: impl IntoIterator<Item = Predicate>) -> Self {
        Self::Any(parts.into_iter().collect())
    }

    /// Negation of `inner`.
    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: impl Into<Predicate>) -> Self {
        Self::Not(Box::new(inner.into()))
    }

    /// Evaluate, short-circuiting `All` and `Any` left to right.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> bool {
        match self {
            Self::All(parts) => parts.iter().all(|p| p.evaluate(ctx)),
            Self::Any(parts) => parts.iter().any(|p| p.evaluate(ctx)),
            Self::Not(inner) => !inner.evaluate(ctx),
            Self::Check(check) => check.evaluate(ctx),
            Self::Const(v) => *v,
        }
    }

    /// Every object slot referenced anywhere in the tree, in first-seen
    /// order.
    pub fn slots(&self) -> Vec<&SlotName> {
        let mut out: Vec<&SlotName> = Vec::new();
        self.collect_slots(&mut out);
        out
    }

    fn collect_slots<'p>(&'p self, out: &mut Vec<&'p SlotName>) {
        match self {
            Self::All(parts) | Self::Any(parts) => {
                for p in parts {
                    p.collect_slots(out);
                }
            }
            Self::Not(inner) => inner.collect_slots(out),
            Self::Check(check) => {
                for slot in check.slots() {
                    if !out.contains(&slot) {
                        out.push(slot);
                    }
                }
            }
            Self::Const(_) => {}
        }
    }
}

// ── Signals ────────────────────────────────────────────────────────

/// A named subtask signal.
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    /// Signal name as reported to downstream tooling.
    pub name: String,
    /// When it fires.
    pub predicate: Predicate,
}

impl Signal {
    /// A signal named `name`.
    pub fn new(name: impl Into<String>, predicate: impl Into<Predicate>) -> Self {
        Self {
            name: name.into(),
            predicate: predicate.into(),
        }
    }
}

/// How a task's subtask signals relate to one another.
#[derive(Clone, Debug, PartialEq)]
pub enum SignalPlan {
    /// Each signal is evaluated on its own.
    Independent(Vec<Signal>),
    /// Stages evaluated in order. Every signal of stage `i` reads `false`
    /// unless the last signal of stage `i - 1` (its completion signal)
    /// fired in this same evaluation. The first stage is ungated.
    Sequential(Vec<Vec<Signal>>),
}

impl Default for SignalPlan {
    fn default() -> Self {
        Self::Independent(Vec::new())
    }
}

impl SignalPlan {
    /// Evaluate every signal, preserving declaration order.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> IndexMap<String, bool> {
        let mut out = IndexMap::new();
        match self {
            Self::Independent(signals) => {
                for s in signals {
                    out.insert(s.name.clone(), s.predicate.evaluate(ctx));
                }
            }
            Self::Sequential(stages) => {
                let mut prev_done = true;
                for stage in stages {
                    let mut done = prev_done;
                    for s in stage {
                        done = prev_done && s.predicate.evaluate(ctx);
                        out.insert(s.name.clone(), done);
                    }
                    prev_done = done;
                }
            }
        }
        out
    }

    /// Signal names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Independent(signals) => signals.iter().map(|s| s.name.as_str()).collect(),
            Self::Sequential(stages) => stages
                .iter()
                .flatten()
                .map(|s| s.name.as_str())
                .collect(),
        }
    }

    /// Whether the plan declares no signals.
    pub fn is_empty(&self) -> bool {
        self.names().is_empty()
    }
}
