//! Geometric predicates over simulation state.
//!
//! Each function is a pure read of [`SimState`]. A body without a pose
//! (never created, or removed) makes every predicate that needs its pose
//! read `false`.

use tabletop_core::{ObjectInfo, SimState, SiteId, SpawnSite, Vec3};
use tracing::trace;

use crate::config::SuccessThresholds;

// ── Containment ────────────────────────────────────────────────────

/// Whether `obj` rests in `container`.
///
/// The two bodies must touch. Without a `site`, the object's horizontal
/// offset from the container centre must be below
/// `receptacle_radius_fraction × info.horizontal_radius`. With a `site`,
/// the object's position expressed in the site frame must lie within the
/// site's footprint instead.
pub fn in_receptacle(
    sim: &dyn SimState,
    obj: &str,
    container: &str,
    info: &ObjectInfo,
    site: Option<&SpawnSite>,
    thresholds: &SuccessThresholds,
) -> bool {
    if !sim.in_contact(obj, container) {
        return false;
    }
    let Some(obj_pose) = sim.body_pose(obj) else {
        trace!(obj, "in_receptacle: object has no pose");
        return false;
    };
    match site {
        Some(site) => match sim.site_pose(container, site.id) {
            Some(frame) => {
                let local = frame.to_local(obj_pose.pos);
                site.contains_local(local.x, local.y)
            }
            None => {
                trace!(container, site = %site.id, "in_receptacle: site has no pose");
                false
            }
        },
        None => match sim.body_pose(container) {
            Some(container_pose) => {
                obj_pose.pos.horizontal_distance(container_pose.pos)
                    < thresholds.receptacle_radius_fraction * info.horizontal_radius
            }
            None => false,
        },
    }
}

/// Whether `obj` lies inside a fixture's interior volume.
pub fn inside_fixture(sim: &dyn SimState, obj: &str, fixture: &str, partial: bool) -> bool {
    sim.inside_fixture(obj, fixture, partial)
}

// ── Pose ───────────────────────────────────────────────────────────

/// Whether `body`'s local z axis points within `threshold` of world up.
pub fn upright(sim: &dyn SimState, body: &str, threshold: f64) -> bool {
    sim.body_pose(body)
        .is_some_and(|pose| pose.quat.up_axis().dot(Vec3::Z) >= threshold)
}

// ── Contact ────────────────────────────────────────────────────────

/// Whether `body` touches `fixture`.
pub fn fixture_contact(sim: &dyn SimState, body: &str, fixture: &str) -> bool {
    sim.in_contact(body, fixture)
}

/// Whether every gripper is more than `distance` from `body`.
///
/// With no grippers this is vacuously true.
pub fn gripper_far(sim: &dyn SimState, body: &str, distance: f64) -> bool {
    let Some(pose) = sim.body_pose(body) else {
        return false;
    };
    sim.gripper_positions()
        .iter()
        .all(|(_, g)| g.distance(pose.pos) > distance)
}

// ── Doors ──────────────────────────────────────────────────────────

/// Door state at or above the open threshold.
pub fn door_open(sim: &dyn SimState, fixture: &str, thresholds: &SuccessThresholds) -> bool {
    sim.door_state(fixture)
        .is_some_and(|s| s >= thresholds.door_open)
}

/// Door state at or below the closed threshold.
pub fn door_closed(sim: &dyn SimState, fixture: &str, thresholds: &SuccessThresholds) -> bool {
    sim.door_state(fixture)
        .is_some_and(|s| s <= thresholds.door_closed)
}

// ── Sites ──────────────────────────────────────────────────────────

/// The enabled site of `info` with the greatest height.
pub fn highest_site(info: &ObjectInfo) -> Option<&SpawnSite> {
    info.highest_site()
}

/// The discrete site of `container` that `obj` is resting on, if any.
///
/// Returns `None` when the container declares no sites or the two bodies
/// do not touch. Otherwise sites are visited nearest-first (by distance
/// from the site centre to the object); the first whose geometric
/// distance to the object is `<= 0` wins, and the search stops with
/// `None` as soon as a site is `max_distance` or more away.
pub fn closest_site(
    sim: &dyn SimState,
    container: &str,
    info: &ObjectInfo,
    obj: &str,
    max_distance: f64,
) -> Option<SiteId> {
    if info.sites.is_empty() || !sim.in_contact(container, obj) {
        return None;
    }
    let obj_pos = sim.body_pose(obj)?.pos;
    let mut by_distance: Vec<(SiteId, f64)> = info
        .sites
        .iter()
        .filter_map(|s| {
            sim.site_pose(container, s.id)
                .map(|p| (s.id, p.pos.distance(obj_pos)))
        })
        .collect();
    by_distance.sort_by(|a, b| a.1.total_cmp(&b.1));
    for (id, _) in by_distance {
        let Some(real) = sim.site_distance(container, id, obj) else {
            continue;
        };
        if real <= 0.0 {
            return Some(id);
        }
        if real >= max_distance {
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabletop_core::{Arm, Pose, Quat};
    use tabletop_test_utils::{tiered_sites, MockSim};

    fn info_with_sites(radius: f64, sites: Vec<SpawnSite>) -> ObjectInfo {
        ObjectInfo {
            category: "tiered_shelf".into(),
            groups: Default::default(),
            instance: None,
            horizontal_radius: radius,
            sites,
        }
    }

    fn t() -> SuccessThresholds {
        SuccessThresholds::default()
    }

    #[test]
    fn receptacle_needs_contact() {
        let mut sim = MockSim::new();
        sim.place("obj", Vec3::new(0.0, 0.0, 0.1))
            .place("bowl", Vec3::new(0.0, 0.0, 0.0));
        let info = info_with_sites(0.2, Vec::new());
        assert!(!in_receptacle(&sim, "obj", "bowl", &info, None, &t()));
        sim.set_contact("obj", "bowl", true);
        assert!(in_receptacle(&sim, "obj", "bowl", &info, None, &t()));
    }

    #[test]
    fn receptacle_radius_fraction_is_strict() {
        let mut sim = MockSim::new();
        sim.place("bowl", Vec3::new(0.0, 0.0, 0.0))
            .set_contact("obj", "bowl", true);
        let info = info_with_sites(0.2, Vec::new());
        sim.place("obj", Vec3::new(0.139, 0.0, 0.05));
        assert!(in_receptacle(&sim, "obj", "bowl", &info, None, &t()));
        sim.place("obj", Vec3::new(0.0, 0.141, 0.05));
        assert!(!in_receptacle(&sim, "obj", "bowl", &info, None, &t()));
    }

    #[test]
    fn receptacle_site_uses_footprint() {
        let sites = tiered_sites(3, 0.05, 0.2);
        let info = info_with_sites(0.5, sites.clone());
        let top = &sites[2];
        let mut sim = MockSim::new();
        sim.place("shelf", Vec3::new(0.0, 0.0, 0.0))
            .set_site_pose("shelf", top.id, Pose::at(Vec3::new(0.0, 0.3, 0.45)))
            .set_contact("obj", "shelf", true)
            .place("obj", Vec3::new(0.05, 0.35, 0.5));
        assert!(in_receptacle(&sim, "obj", "shelf", &info, Some(top), &t()));
        // Inside the shelf radius but off the top level's footprint.
        sim.place("obj", Vec3::new(0.0, 0.0, 0.1));
        assert!(!in_receptacle(&sim, "obj", "shelf", &info, Some(top), &t()));
    }

    #[test]
    fn upright_threshold() {
        let mut sim = MockSim::new();
        sim.place("cup", Vec3::default());
        assert!(upright(&sim, "cup", 0.8));
        let tipped = Quat::from_axis_angle(Vec3::new(1.0, 0.0, 0.0), 1.0);
        sim.set_pose(
            "cup",
            Pose {
                pos: Vec3::default(),
                quat: tipped,
            },
        );
        // cos(1.0) ≈ 0.54
        assert!(!upright(&sim, "cup", 0.8));
        assert!(upright(&sim, "cup", 0.5));
        assert!(!upright(&sim, "missing", 0.0));
    }

    #[test]
    fn every_gripper_must_be_far() {
        let mut sim = MockSim::new();
        sim.place("obj", Vec3::default());
        assert!(gripper_far(&sim, "obj", 0.25));
        sim.set_gripper(Arm::Left, Vec3::new(1.0, 0.0, 0.0))
            .set_gripper(Arm::Right, Vec3::new(0.2, 0.0, 0.0));
        assert!(!gripper_far(&sim, "obj", 0.25));
        sim.set_gripper(Arm::Right, Vec3::new(0.3, 0.0, 0.0));
        assert!(gripper_far(&sim, "obj", 0.25));
    }

    #[test]
    fn door_boundaries() {
        use tabletop_core::SimControl;
        let mut sim = MockSim::new();
        sim.set_door_state("cab", 0.5);
        assert!(door_open(&sim, "cab", &t()));
        sim.set_door_state("cab", 0.5 - 1e-9);
        assert!(!door_open(&sim, "cab", &t()));
        sim.set_door_state("cab", 0.005);
        assert!(door_closed(&sim, "cab", &t()));
        sim.set_door_state("cab", 0.005 + 1e-9);
        assert!(!door_closed(&sim, "cab", &t()));
        assert!(!door_open(&sim, "nothing", &t()));
        assert!(!door_closed(&sim, "nothing", &t()));
    }

    fn shelf_sim(info: &ObjectInfo) -> MockSim {
        let mut sim = MockSim::new();
        sim.place("shelf", Vec3::default())
            .place("obj", Vec3::new(0.0, 0.0, 0.3))
            .set_contact("shelf", "obj", true);
        for site in &info.sites {
            sim.set_site_pose(
                "shelf",
                site.id,
                Pose::at(Vec3::new(0.0, 0.0, site.height)),
            );
        }
        sim
    }

    #[test]
    fn closest_site_none_without_sites_or_contact() {
        let plain = info_with_sites(0.2, Vec::new());
        let sim = shelf_sim(&plain);
        assert_eq!(closest_site(&sim, "shelf", &plain, "obj", 1.0), None);

        let info = info_with_sites(0.3, tiered_sites(3, 0.05, 0.2));
        let mut sim = shelf_sim(&info);
        sim.set_contact("shelf", "obj", false)
            .set_site_distance("shelf", SiteId(1), "obj", 0.0);
        assert_eq!(closest_site(&sim, "shelf", &info, "obj", 1.0), None);
    }

    #[test]
    fn closest_site_first_touching_nearest_wins() {
        // Heights 0.05, 0.25, 0.45; object at 0.3 so order is 1, 2, 0.
        let info = info_with_sites(0.3, tiered_sites(3, 0.05, 0.2));
        let mut sim = shelf_sim(&info);
        sim.set_site_distance("shelf", SiteId(1), "obj", 0.02)
            .set_site_distance("shelf", SiteId(2), "obj", -0.001)
            .set_site_distance("shelf", SiteId(0), "obj", 0.0);
        assert_eq!(
            closest_site(&sim, "shelf", &info, "obj", 1.0),
            Some(SiteId(2))
        );
    }

    #[test]
    fn closest_site_stops_at_max_distance() {
        let info = info_with_sites(0.3, tiered_sites(3, 0.05, 0.2));
        let mut sim = shelf_sim(&info);
        sim.set_site_distance("shelf", SiteId(1), "obj", 1.0)
            .set_site_distance("shelf", SiteId(2), "obj", 0.0);
        assert_eq!(closest_site(&sim, "shelf", &info, "obj", 1.0), None);
    }

    #[test]
    fn highest_site_is_tallest_enabled() {
        let mut sites = tiered_sites(3, 0.05, 0.2);
        sites[2].disabled = true;
        let info = info_with_sites(0.3, sites);
        assert_eq!(highest_site(&info).map(|s| s.id), Some(SiteId(1)));
    }
}
