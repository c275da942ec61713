//! Test utilities and mock collaborators for Tabletop development.
//!
//! Provides mock implementations of the collaborator traits
//! ([`SimState`], [`SimControl`], [`tabletop_core::AssetFactory`],
//! [`tabletop_core::FixtureProvider`])
//! and a reference kitchen catalog for building test scenes.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod kitchen;

pub use fixtures::{MockAssetFactory, MockFixtures};
pub use kitchen::{kitchen_catalog, kitchen_sites, tiered_sites};

use std::collections::{HashMap, HashSet};

use tabletop_core::{Arm, Pose, SiteId, SimControl, SimState, Vec3};

/// Mock implementation of [`SimState`] and [`SimControl`].
///
/// Every query reads from a map populated by the test. Unset poses and
/// states read as `None`; unset contacts and grasps read as `false`.
#[derive(Clone, Debug, Default)]
pub struct MockSim {
    poses: HashMap<String, Pose>,
    contacts: HashSet<(String, String)>,
    grippers: Vec<(Arm, Vec3)>,
    grasps: HashSet<(Arm, String)>,
    gripper_contacts: HashSet<(Arm, String)>,
    site_poses: HashMap<(String, SiteId), Pose>,
    site_distances: HashMap<(String, SiteId, String), f64>,
    doors: HashMap<String, f64>,
    joints: HashMap<String, f64>,
    flags: HashMap<(String, String), bool>,
    inside: HashMap<(String, String), bool>,
}

fn pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_owned(), b.to_owned())
    } else {
        (b.to_owned(), a.to_owned())
    }
}

impl MockSim {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a body at `pos`, unrotated.
    pub fn place(&mut self, body: &str, pos: Vec3) -> &mut Self {
        self.poses.insert(body.to_owned(), Pose::at(pos));
        self
    }

    pub fn set_pose(&mut self, body: &str, pose: Pose) -> &mut Self {
        self.poses.insert(body.to_owned(), pose);
        self
    }

    pub fn remove_body(&mut self, body: &str) -> &mut Self {
        self.poses.remove(body);
        self
    }

    /// Contacts are symmetric.
    pub fn set_contact(&mut self, a: &str, b: &str, on: bool) -> &mut Self {
        let key = pair(a, b);
        if on {
            self.contacts.insert(key);
        } else {
            self.contacts.remove(&key);
        }
        self
    }

    pub fn set_gripper(&mut self, arm: Arm, pos: Vec3) -> &mut Self {
        self.grippers.retain(|(a, _)| *a != arm);
        self.grippers.push((arm, pos));
        self
    }

    pub fn set_grasp(&mut self, arm: Arm, body: &str, on: bool) -> &mut Self {
        if on {
            self.grasps.insert((arm, body.to_owned()));
        } else {
            self.grasps.remove(&(arm, body.to_owned()));
        }
        self
    }

    pub fn set_gripper_contact(&mut self, arm: Arm, body: &str, on: bool) -> &mut Self {
        if on {
            self.gripper_contacts.insert((arm, body.to_owned()));
        } else {
            self.gripper_contacts.remove(&(arm, body.to_owned()));
        }
        self
    }

    pub fn set_site_pose(&mut self, body: &str, site: SiteId, pose: Pose) -> &mut Self {
        self.site_poses.insert((body.to_owned(), site), pose);
        self
    }

    pub fn set_site_distance(
        &mut self,
        body: &str,
        site: SiteId,
        other: &str,
        distance: f64,
    ) -> &mut Self {
        self.site_distances
            .insert((body.to_owned(), site, other.to_owned()), distance);
        self
    }

    /// Mark `body` inside `fixture`; `fully` false means partial overlap.
    pub fn set_inside(&mut self, body: &str, fixture: &str, fully: bool) -> &mut Self {
        self.inside
            .insert((body.to_owned(), fixture.to_owned()), fully);
        self
    }

    pub fn clear_inside(&mut self, body: &str, fixture: &str) -> &mut Self {
        self.inside.remove(&(body.to_owned(), fixture.to_owned()));
        self
    }
}

impl SimState for MockSim {
    fn body_pose(&self, body: &str) -> Option<Pose> {
        self.poses.get(body).copied()
    }

    fn in_contact(&self, a: &str, b: &str) -> bool {
        self.contacts.contains(&pair(a, b))
    }

    fn gripper_positions(&self) -> Vec<(Arm, Vec3)> {
        self.grippers.clone()
    }

    fn is_grasping(&self, arm: Arm, body: &str) -> bool {
        self.grasps.contains(&(arm, body.to_owned()))
    }

    fn gripper_contact(&self, arm: Arm, body: &str) -> bool {
        self.gripper_contacts.contains(&(arm, body.to_owned()))
    }

    fn site_pose(&self, body: &str, site: SiteId) -> Option<Pose> {
        self.site_poses.get(&(body.to_owned(), site)).copied()
    }

    fn site_distance(&self, body: &str, site: SiteId, other: &str) -> Option<f64> {
        self.site_distances
            .get(&(body.to_owned(), site, other.to_owned()))
            .copied()
    }

    fn door_state(&self, fixture: &str) -> Option<f64> {
        self.doors.get(fixture).copied()
    }

    fn joint_position(&self, joint: &str) -> Option<f64> {
        self.joints.get(joint).copied()
    }

    fn fixture_flag(&self, fixture: &str, flag: &str) -> Option<bool> {
        self.flags
            .get(&(fixture.to_owned(), flag.to_owned()))
            .copied()
    }

    fn inside_fixture(&self, body: &str, fixture: &str, partial: bool) -> bool {
        match self.inside.get(&(body.to_owned(), fixture.to_owned())) {
            Some(fully) => partial || *fully,
            None => false,
        }
    }
}

impl SimControl for MockSim {
    fn set_door_state(&mut self, fixture: &str, value: f64) {
        self.doors.insert(fixture.to_owned(), value);
    }

    fn set_joint_position(&mut self, joint: &str, value: f64) {
        self.joints.insert(joint.to_owned(), value);
    }

    fn set_fixture_flag(&mut self, fixture: &str, flag: &str, value: bool) {
        self.flags
            .insert((fixture.to_owned(), flag.to_owned()), value);
    }
}
