//! Plan realization: turning an ordered plan into poses.
//!
//! The geometric sampling itself lives outside this crate behind
//! [`PlacementSampler`]. Realization walks the plan (fixture slots first,
//! then object slots in plan order), hands each slot to the sampler along
//! with the pose of its reference container, and applies the failure
//! policy: optional and non-essential slots are dropped together with
//! their dependents, an essential slot fails the episode.

use std::error::Error;
use std::fmt;

use indexmap::IndexMap;
use tracing::warn;

use tabletop_core::{EpisodeError, EpisodeRng, ObjectInfo, Pose, SiteId, SlotName};

use crate::assemble::{DropReason, DroppedSlot, PlacementPlan, PlannedObject};
use crate::spec::{PlacementDirective, PlacementSpec};

/// The container a slot is sampled relative to.
#[derive(Clone, Copy, Debug)]
pub struct ReferenceFrame<'a> {
    /// Realized pose of the container.
    pub pose: Pose,
    /// Container metadata.
    pub info: &'a ObjectInfo,
    /// Site to sample on, when one was requested and is enabled.
    pub site: Option<SiteId>,
}

/// A region to keep clear of.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obstacle {
    /// Realized pose.
    pub pose: Pose,
    /// Horizontal radius.
    pub radius: f64,
}

/// One call to the sampler.
#[derive(Clone, Debug)]
pub struct SampleRequest<'a> {
    /// Slot being placed.
    pub slot: &'a SlotName,
    /// Its placement.
    pub placement: &'a PlacementSpec,
    /// Object metadata; `None` for fixture slots.
    pub info: Option<&'a ObjectInfo>,
    /// Container frame for container-relative placements.
    pub reference: Option<ReferenceFrame<'a>>,
    /// Already realized slots named by an avoid directive.
    pub avoid: Vec<Obstacle>,
}

/// The sampler exhausted its attempts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplingFailure {
    /// Attempts made.
    pub attempts: u32,
}

impl fmt::Display for SamplingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no valid pose after {} attempts", self.attempts)
    }
}

impl Error for SamplingFailure {}

/// Samples collision-free poses.
pub trait PlacementSampler {
    /// Sample a pose for one slot.
    fn sample(
        &mut self,
        request: &SampleRequest<'_>,
        rng: &mut EpisodeRng,
    ) -> Result<Pose, SamplingFailure>;
}

/// Realized poses by slot name, in realization order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScenePlacements {
    poses: IndexMap<SlotName, Pose>,
}

impl ScenePlacements {
    /// Pose of a slot.
    pub fn get(&self, name: &str) -> Option<&Pose> {
        self.poses.get(name)
    }

    /// Whether a slot was realized.
    pub fn contains(&self, name: &str) -> bool {
        self.poses.contains_key(name)
    }

    /// Realized slots in order.
    pub fn iter(&self) -> impl Iterator<Item = (&SlotName, &Pose)> {
        self.poses.iter()
    }

    /// Number of realized slots.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// Whether nothing was realized.
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}

impl PlacementPlan {
    /// Sample a pose for every slot, dropping tolerated failures from the
    /// plan.
    pub fn realize(
        &mut self,
        sampler: &mut dyn PlacementSampler,
        rng: &mut EpisodeRng,
    ) -> Result<ScenePlacements, EpisodeError> {
        let mut placements = ScenePlacements::default();
        let mut radii: IndexMap<SlotName, f64> = IndexMap::new();

        let mut kept_fixtures = Vec::with_capacity(self.fixtures.len());
        for fixture in std::mem::take(&mut self.fixtures) {
            let request = SampleRequest {
                slot: &fixture.name,
                placement: &fixture.placement,
                info: None,
                reference: None,
                avoid: obstacles(&fixture.placement, &placements, &radii),
            };
            match sampler.sample(&request, rng) {
                Ok(pose) => {
                    placements.poses.insert(fixture.name.clone(), pose);
                    kept_fixtures.push(fixture);
                }
                Err(e) => {
                    warn!(slot = %fixture.name, error = %e, "dropping distractor fixture");
                    self.dropped.push(DroppedSlot {
                        name: fixture.name,
                        reason: DropReason::PlacementFailed,
                    });
                }
            }
        }
        self.fixtures = kept_fixtures;

        let mut kept = Vec::with_capacity(self.objects.len());
        for object in std::mem::take(&mut self.objects) {
            let spec = &object.spec;
            let tolerated = spec.placement.optional || !spec.role.is_essential();

            let reference = match &spec.placement.directive {
                PlacementDirective::RelativeTo { reference, site } => {
                    let frame = placements.get(reference.as_str()).copied().and_then(|pose| {
                        let container: &PlannedObject =
                            kept.iter().find(|o: &&PlannedObject| o.spec.name == *reference)?;
                        let info = container.spec.info()?;
                        Some(ReferenceFrame {
                            pose,
                            info,
                            site: site.and_then(|s| s.pick(info)),
                        })
                    });
                    if frame.is_none() {
                        if !tolerated {
                            return Err(EpisodeError::PlacementFailed {
                                slot: spec.name.clone(),
                            });
                        }
                        self.dropped.push(DroppedSlot {
                            name: spec.name.clone(),
                            reason: DropReason::DependencyDropped(reference.clone()),
                        });
                        continue;
                    }
                    frame
                }
                _ => None,
            };

            let request = SampleRequest {
                slot: &spec.name,
                placement: &spec.placement,
                info: spec.info(),
                reference,
                avoid: obstacles(&spec.placement, &placements, &radii),
            };
            match sampler.sample(&request, rng) {
                Ok(pose) => {
                    placements.poses.insert(spec.name.clone(), pose);
                    radii.insert(
                        spec.name.clone(),
                        spec.info().map_or(0.0, |i| i.horizontal_radius),
                    );
                    kept.push(object);
                }
                Err(e) if tolerated => {
                    warn!(slot = %spec.name, error = %e, "dropping slot after placement failure");
                    self.dropped.push(DroppedSlot {
                        name: spec.name.clone(),
                        reason: DropReason::PlacementFailed,
                    });
                }
                Err(_) => {
                    return Err(EpisodeError::PlacementFailed {
                        slot: spec.name.clone(),
                    })
                }
            }
        }
        self.objects = kept;
        Ok(placements)
    }
}

fn obstacles(
    placement: &PlacementSpec,
    placements: &ScenePlacements,
    radii: &IndexMap<SlotName, f64>,
) -> Vec<Obstacle> {
    let PlacementDirective::Avoid(names) = &placement.directive else {
        return Vec::new();
    };
    names
        .iter()
        .filter_map(|n| {
            Some(Obstacle {
                pose: *placements.get(n.as_str())?,
                radius: radii.get(n).copied().unwrap_or(0.0),
            })
        })
        .collect()
}
