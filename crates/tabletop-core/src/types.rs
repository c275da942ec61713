//! Episode-level enums and the object metadata record.
//!
//! Every enum here that is ever spelled in configuration parses via
//! [`FromStr`] and rejects unknown spellings with a [`ConfigError`];
//! nothing is coerced to a default.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::ConfigError;
use crate::id::{AssetPath, Category, GroupTag, SiteId};

// ── Handedness ─────────────────────────────────────────────────────

/// Which side of the table the task's containers sit on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    /// Left side (negative x).
    Left,
    /// Right side (positive x).
    Right,
}

impl Handedness {
    /// `-1.0` for left, `+1.0` for right; multiplies mirrored x offsets.
    pub fn sign(self) -> f64 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    /// The arm on the same side.
    pub fn arm(self) -> Arm {
        match self {
            Self::Left => Arm::Left,
            Self::Right => Arm::Right,
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

impl FromStr for Handedness {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(ConfigError::InvalidHandedness {
                value: other.to_owned(),
            }),
        }
    }
}

/// How handedness is chosen for an episode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HandednessPolicy {
    /// Always the given side.
    Fixed(Handedness),
    /// Drawn uniformly from the episode generator at reset.
    #[default]
    Randomized,
}

impl FromStr for HandednessPolicy {
    type Err = ConfigError;

    /// Accepts `left`, `right`, or `random`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "random" {
            return Ok(Self::Randomized);
        }
        s.parse().map(Self::Fixed)
    }
}

// ── Arm ────────────────────────────────────────────────────────────

/// One of the robot's two arms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arm {
    /// Left arm.
    Left,
    /// Right arm.
    Right,
}

impl Arm {
    /// Both arms, left first.
    pub const BOTH: [Arm; 2] = [Arm::Left, Arm::Right];

    /// The other arm.
    pub fn opposite(self) -> Arm {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

// ── Instance split ─────────────────────────────────────────────────

/// Partition of model instances within a category, separating training
/// instances from held-out evaluation instances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceSplit {
    /// The training partition.
    A,
    /// The held-out partition.
    B,
}

impl fmt::Display for InstanceSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

impl FromStr for InstanceSplit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            other => Err(ConfigError::InvalidSplit {
                value: other.to_owned(),
            }),
        }
    }
}

impl InstanceSplit {
    /// Index range of the instances belonging to this split, given a
    /// category with `n` instances.
    ///
    /// `A` holds the first ⌈3n/4⌉ instances, `B` the remainder.
    pub fn range(self, n: usize) -> std::ops::Range<usize> {
        let cut = (3 * n).div_ceil(4);
        match self {
            Self::A => 0..cut,
            Self::B => cut..n,
        }
    }
}

// ── Behaviors ──────────────────────────────────────────────────────

/// Target state of a hinged or sliding door.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DoorBehavior {
    /// Task ends with the door open.
    Open,
    /// Task ends with the door closed.
    Close,
}

impl fmt::Display for DoorBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Close => f.write_str("close"),
        }
    }
}

impl FromStr for DoorBehavior {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "close" => Ok(Self::Close),
            other => Err(ConfigError::InvalidBehavior {
                value: other.to_owned(),
            }),
        }
    }
}

/// Target state of a powered fixture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PowerBehavior {
    /// Task ends with the fixture on.
    TurnOn,
    /// Task ends with the fixture off.
    TurnOff,
}

impl fmt::Display for PowerBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TurnOn => f.write_str("turn_on"),
            Self::TurnOff => f.write_str("turn_off"),
        }
    }
}

impl FromStr for PowerBehavior {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "turn_on" => Ok(Self::TurnOn),
            "turn_off" => Ok(Self::TurnOff),
            other => Err(ConfigError::InvalidBehavior {
                value: other.to_owned(),
            }),
        }
    }
}

// ── Spawn sites ────────────────────────────────────────────────────

/// Geometry of a discrete spawn site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpawnShape {
    /// Axis-aligned box in the site frame.
    Box,
    /// Upright cylinder; `half_size.0` is the radius.
    Cylinder,
    /// Sphere; `half_size.0` is the radius.
    Sphere,
}

impl FromStr for SpawnShape {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "box" => Ok(Self::Box),
            "cylinder" => Ok(Self::Cylinder),
            "sphere" => Ok(Self::Sphere),
            other => Err(ConfigError::InvalidSpawnType {
                value: other.to_owned(),
            }),
        }
    }
}

/// A named discrete region on a container where objects may be placed.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnSite {
    /// Site index, in declaration order.
    pub id: SiteId,
    /// Model-local site name.
    pub name: String,
    /// Footprint shape.
    pub shape: SpawnShape,
    /// Half extents `(x, y)` of the footprint (or radius in `.0`).
    pub half_size: (f64, f64),
    /// Height of the site above the container origin.
    pub height: f64,
    /// Disabled sites are never sampled and never chosen as targets.
    pub disabled: bool,
}

impl SpawnSite {
    /// Whether a point in the site's local frame lies within its footprint.
    pub fn contains_local(&self, x: f64, y: f64) -> bool {
        match self.shape {
            SpawnShape::Box => x.abs() <= self.half_size.0 && y.abs() <= self.half_size.1,
            SpawnShape::Cylinder | SpawnShape::Sphere => {
                (x * x + y * y).sqrt() <= self.half_size.0
            }
        }
    }
}

// ── ObjectInfo ─────────────────────────────────────────────────────

/// Metadata describing a created model, returned by the asset factory.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectInfo {
    /// The resolved category.
    pub category: Category,
    /// Group tags the category belongs to.
    pub groups: SmallVec<[GroupTag; 4]>,
    /// Model file the instance was built from.
    pub instance: Option<AssetPath>,
    /// Horizontal bounding radius (metres) after scaling.
    pub horizontal_radius: f64,
    /// Discrete spawn sites, empty for single-surface objects.
    pub sites: Vec<SpawnSite>,
}

impl ObjectInfo {
    /// Whether the object carries `group`.
    pub fn has_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g.as_str() == group)
    }

    /// Sites that may be sampled.
    pub fn enabled_sites(&self) -> impl Iterator<Item = &SpawnSite> {
        self.sites.iter().filter(|s| !s.disabled)
    }

    /// The enabled site with the greatest height, if any.
    pub fn highest_site(&self) -> Option<&SpawnSite> {
        self.enabled_sites()
            .max_by(|a, b| a.height.total_cmp(&b.height))
    }

    /// Look up a site by id.
    pub fn site(&self, id: SiteId) -> Option<&SpawnSite> {
        self.sites.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn handedness_rejects_unknown() {
        match "center".parse::<Handedness>() {
            Err(ConfigError::InvalidHandedness { value }) => assert_eq!(value, "center"),
            other => panic!("expected InvalidHandedness, got {other:?}"),
        }
    }

    #[test]
    fn handedness_sign_mirrors_x() {
        assert_eq!(Handedness::Left.sign(), -1.0);
        assert_eq!(Handedness::Right.sign(), 1.0);
    }

    #[test]
    fn policy_parses_random() {
        assert_eq!(
            "random".parse::<HandednessPolicy>(),
            Ok(HandednessPolicy::Randomized)
        );
        assert_eq!(
            "left".parse::<HandednessPolicy>(),
            Ok(HandednessPolicy::Fixed(Handedness::Left))
        );
    }

    #[test]
    fn behaviors_reject_unknown() {
        assert!("ajar".parse::<DoorBehavior>().is_err());
        assert!("toggle".parse::<PowerBehavior>().is_err());
        assert_eq!("turn_on".parse::<PowerBehavior>(), Ok(PowerBehavior::TurnOn));
    }

    #[test]
    fn spawn_shape_rejects_unknown() {
        match "cone".parse::<SpawnShape>() {
            Err(ConfigError::InvalidSpawnType { .. }) => {}
            other => panic!("expected InvalidSpawnType, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn splits_partition_instances(n in 0usize..500) {
            let a = InstanceSplit::A.range(n);
            let b = InstanceSplit::B.range(n);
            prop_assert_eq!(a.start, 0);
            prop_assert_eq!(a.end, b.start);
            prop_assert_eq!(b.end, n);
            prop_assert!(n == 0 || !a.is_empty());
        }
    }

    #[test]
    fn split_boundaries() {
        assert_eq!(InstanceSplit::A.range(4), 0..3);
        assert_eq!(InstanceSplit::B.range(1), 1..1);
    }

    #[test]
    fn highest_site_skips_disabled() {
        let site = |id, height, disabled| SpawnSite {
            id: SiteId(id),
            name: format!("level{id}"),
            shape: SpawnShape::Box,
            half_size: (0.1, 0.1),
            height,
            disabled,
        };
        let info = ObjectInfo {
            category: Category::from("tiered_shelf"),
            groups: SmallVec::new(),
            instance: None,
            horizontal_radius: 0.2,
            sites: vec![site(0, 0.1, false), site(1, 0.3, false), site(2, 0.5, true)],
        };
        assert_eq!(info.highest_site().map(|s| s.id), Some(SiteId(1)));
    }

    #[test]
    fn cylinder_footprint() {
        let s = SpawnSite {
            id: SiteId(0),
            name: "rim".into(),
            shape: SpawnShape::Cylinder,
            half_size: (0.1, 0.0),
            height: 0.0,
            disabled: false,
        };
        assert!(s.contains_local(0.05, 0.05));
        assert!(!s.contains_local(0.09, 0.09));
    }
}
