//! Benchmark profiles and utilities for the Tabletop task layer.
//!
//! Everything here runs against the mock collaborators of
//! `tabletop-test-utils`, so benches and the walkthrough example need no
//! physics engine or asset files:
//!
//! - [`JitterSampler`]: a [`PlacementSampler`] that draws uniformly inside
//!   each placement region and never fails.
//! - [`standard_registry`]: the full built-in task table.
//! - [`run_episodes`]: reset one task over a seed range and tally the
//!   scenes it produced.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::ops::Range;

use tabletop_catalog::Catalog;
use tabletop_core::{uniform, ConfigError, EpisodeError, EpisodeRng, Pose, Quat, Vec3};
use tabletop_scene::{PlacementSampler, SampleRequest, SamplingFailure};
use tabletop_tasks::{TaskMatrixConfig, TaskRegistry};
use tabletop_test_utils::{MockAssetFactory, MockFixtures, MockSim};
use tracing::debug;

/// Counter height the sampler puts every object at.
pub const COUNTER_HEIGHT: f64 = 0.9;

/// Uniform draw inside the placement region, relative to the reference
/// container when there is one.
#[derive(Clone, Copy, Debug, Default)]
pub struct JitterSampler;

impl PlacementSampler for JitterSampler {
    fn sample(
        &mut self,
        request: &SampleRequest<'_>,
        rng: &mut EpisodeRng,
    ) -> Result<Pose, SamplingFailure> {
        let placement = request.placement;
        let (cx, cy) = placement.region_center;
        let (w, h) = placement.region_size;
        let base = request.reference.map_or(Vec3::default(), |r| r.pose.pos);
        let x = base.x + uniform(rng, cx - w / 2.0, cx + w / 2.0);
        let y = base.y + uniform(rng, cy - h / 2.0, cy + h / 2.0);
        let yaw = placement
            .rotation_range
            .map_or(0.0, |(lo, hi)| uniform(rng, lo, hi));
        Ok(Pose {
            pos: Vec3::new(x, y, COUNTER_HEIGHT),
            quat: Quat::from_axis_angle(Vec3::Z, yaw),
        })
    }
}

/// The built-in task table with the default matrix configuration.
///
/// # Errors
///
/// See [`TaskRegistry::standard`].
pub fn standard_registry(catalog: &Catalog) -> Result<TaskRegistry, ConfigError> {
    TaskRegistry::standard(catalog, &TaskMatrixConfig::default())
}

/// Totals over a run of episodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EpisodeStats {
    /// Episodes that loaded.
    pub loaded: usize,
    /// Episodes rejected with a retryable error.
    pub retried: usize,
    /// Objects placed across loaded episodes.
    pub objects: usize,
    /// Slots dropped across loaded episodes.
    pub dropped: usize,
}

/// Reset task `id` once per seed in `seeds`.
///
/// Retryable failures are counted, not returned.
///
/// # Errors
///
/// Returns [`EpisodeError::Config`] for an unknown task, and any fatal
/// episode error.
pub fn run_episodes(
    registry: &TaskRegistry,
    catalog: &Catalog,
    id: &str,
    seeds: Range<u64>,
) -> Result<EpisodeStats, EpisodeError> {
    let mut engine = registry.engine(id, catalog)?;
    let fixtures = MockFixtures::kitchen();
    let mut factory = MockAssetFactory::kitchen(catalog.clone());
    let mut sampler = JitterSampler;
    let mut stats = EpisodeStats::default();
    for seed in seeds {
        let mut sim = MockSim::new();
        match engine.reset(seed, &fixtures, &mut factory, &mut sampler, &mut sim) {
            Ok(()) => {
                stats.loaded += 1;
                if let Some(plan) = engine.plan() {
                    stats.objects += plan.objects().len();
                    stats.dropped += plan.dropped().len();
                }
            }
            Err(e) if e.is_retryable() => {
                debug!(task = id, seed, error = %e, "episode rejected");
                stats.retried += 1;
            }
            Err(e) => return Err(e),
        }
        factory.clear_requests();
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabletop_core::rng_from_seed;
    use tabletop_scene::PlacementSpec;
    use tabletop_test_utils::kitchen_catalog;

    #[test]
    fn sampler_stays_inside_the_region() {
        let placement = PlacementSpec::on("counter").at(0.5, -0.5).sized(0.2, 0.4);
        let slot = "obj".into();
        let request = SampleRequest {
            slot: &slot,
            placement: &placement,
            info: None,
            reference: None,
            avoid: Vec::new(),
        };
        let mut rng = rng_from_seed(3);
        for _ in 0..100 {
            let pose = JitterSampler.sample(&request, &mut rng).unwrap();
            assert!((0.4..=0.6).contains(&pose.pos.x), "{pose:?}");
            assert!((-0.7..=-0.3).contains(&pose.pos.y), "{pose:?}");
        }
    }

    #[test]
    fn onion_episodes_all_load() {
        let catalog = kitchen_catalog();
        let registry = standard_registry(&catalog).unwrap();
        let stats = run_episodes(&registry, &catalog, "PnPOnionToBowl", 0..8).unwrap();
        assert_eq!(stats.loaded + stats.retried, 8);
        assert!(stats.loaded > 0);
        assert!(stats.objects >= 2 * stats.loaded);
    }

    #[test]
    fn unknown_task_is_fatal() {
        let catalog = kitchen_catalog();
        let registry = standard_registry(&catalog).unwrap();
        assert!(matches!(
            run_episodes(&registry, &catalog, "NoSuchTask", 0..1),
            Err(EpisodeError::Config(ConfigError::UnknownTask { .. }))
        ));
    }
}
