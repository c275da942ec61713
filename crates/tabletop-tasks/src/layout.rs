//! Where task slots go on the counter.
//!
//! Positions are authored for a right-handed episode. A mirrored
//! [`SlotLayout`] flips x and reflects the yaw range for a left-handed one.
//! The combination matrices draw container and object positions from
//! [`PositionSampler`] instead.

use std::f64::consts::PI;

use rand::Rng;
use tabletop_core::{EpisodeRng, Handedness};
use tabletop_scene::{PlacementSpec, SiteSelector};

/// Uniform model scales of categories that need them.
pub const OBJ_SCALES: &[(&str, f64)] = &[
    ("tiered_shelf", 0.7),
    ("tiered_basket", 0.7),
    ("plate", 1.2),
    ("cardboard_box", 0.9),
    ("placemat", 0.8),
    ("rubix_cube", 0.8),
    ("tray", 0.8),
    ("cutting_board", 0.8),
];

/// Model scales of distractor fixtures.
pub const FIXTURE_SCALES: &[(&str, f64)] = &[("paper_towel", 0.3), ("plant", 0.3), ("toaster", 1.0)];

/// Scale of `category` from [`OBJ_SCALES`].
pub fn obj_scale(category: &str) -> Option<f64> {
    OBJ_SCALES
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, s)| *s)
}

/// Reflect a yaw across the table's centre line, wrapped to `(-π, π]`.
fn reflect_yaw(theta: f64) -> f64 {
    let mut r = PI - theta;
    while r > PI {
        r -= 2.0 * PI;
    }
    while r <= -PI {
        r += 2.0 * PI;
    }
    r
}

/// Placement of one task slot relative to the counter.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotLayout {
    /// Region centre for a right-handed episode.
    pub pos: (f64, f64),
    /// Region centre for a left-handed episode, when it is not the mirror
    /// image of `pos`.
    pub left_pos: Option<(f64, f64)>,
    /// Region extent.
    pub size: (f64, f64),
    /// Yaw range for a right-handed episode.
    pub rotation: Option<(f64, f64)>,
    /// Keep the whole footprint inside the region.
    pub boundary: bool,
    /// Keep the centre inside the reference region.
    pub in_ref_region: bool,
    /// Sample on a discrete site of the slot's container.
    pub site: Option<SiteSelector>,
    /// Whether handedness moves the slot.
    pub mirrored: bool,
}

impl SlotLayout {
    /// A mirrored layout centred at `pos`.
    pub fn new(pos: (f64, f64), size: (f64, f64)) -> Self {
        Self {
            pos,
            left_pos: None,
            size,
            rotation: None,
            boundary: true,
            in_ref_region: false,
            site: None,
            mirrored: true,
        }
    }

    /// Explicit left-handed centre.
    pub fn left_at(mut self, x: f64, y: f64) -> Self {
        self.left_pos = Some((x, y));
        self
    }

    /// Yaw range for a right-handed episode.
    pub fn rotated(mut self, lo: f64, hi: f64) -> Self {
        self.rotation = Some((lo, hi));
        self
    }

    /// Set boundary containment.
    pub fn boundary(mut self, on: bool) -> Self {
        self.boundary = on;
        self
    }

    /// Require the centre to stay inside the reference region.
    pub fn in_ref_region(mut self) -> Self {
        self.in_ref_region = true;
        self
    }

    /// Sample on a site of the container.
    pub fn on_site(mut self, site: SiteSelector) -> Self {
        self.site = Some(site);
        self
    }

    /// Same place for either hand.
    pub fn unmirrored(mut self) -> Self {
        self.mirrored = false;
        self
    }

    /// Region centre for `handedness`.
    pub fn center(&self, handedness: Handedness) -> (f64, f64) {
        match (self.mirrored, handedness) {
            (true, Handedness::Left) => self.left_pos.unwrap_or((-self.pos.0, self.pos.1)),
            _ => self.pos,
        }
    }

    /// Yaw range for `handedness`.
    pub fn rotation(&self, handedness: Handedness) -> Option<(f64, f64)> {
        match (self.mirrored, handedness) {
            (true, Handedness::Left) => self
                .rotation
                .map(|(lo, hi)| (reflect_yaw(lo), reflect_yaw(hi))),
            _ => self.rotation,
        }
    }

    /// Placement on `surface` for `handedness`.
    pub fn placement(&self, surface: &str, handedness: Handedness) -> PlacementSpec {
        let (x, y) = self.center(handedness);
        let mut spec = PlacementSpec::on(surface)
            .at(x, y)
            .sized(self.size.0, self.size.1)
            .boundary(self.boundary);
        spec.rotation_range = self.rotation(handedness);
        spec.ensure_in_ref_region = self.in_ref_region;
        spec.site = self.site;
        spec
    }
}

// ── Matrix positions ───────────────────────────────────────────────

/// Container and object placements drawn for one matrix episode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampledPositions {
    /// Container region centre.
    pub container: (f64, f64),
    /// Object region centre.
    pub obj: (f64, f64),
    /// Container region extent.
    pub container_size: (f64, f64),
    /// Object region extent.
    pub obj_size: (f64, f64),
}

/// Paired container and object positions of the combination matrices.
pub struct PositionSampler;

impl PositionSampler {
    const RIGHT_CONTAINER: &'static [(f64, f64)] = &[(0.75, -0.15)];
    const RIGHT_OBJ: &'static [(f64, f64)] = &[(0.85, -0.9)];
    const LEFT_CONTAINER: &'static [(f64, f64)] = &[(-0.7, -0.45), (-0.2, -0.45)];
    const LEFT_OBJ: &'static [(f64, f64)] = &[(-0.2, -0.85), (-0.7, -0.85)];
    const CONTAINER_SIZE: &'static [(f64, f64)] = &[(0.6, 0.2)];
    const OBJ_SIZE: &'static [(f64, f64)] = &[(0.7, 0.3)];

    /// Draw one index over the container list and read every table at
    /// it. Tables shorter than the container list repeat their last entry.
    pub fn sample(handedness: Handedness, rng: &mut EpisodeRng) -> SampledPositions {
        let (containers, objs) = match handedness {
            Handedness::Right => (Self::RIGHT_CONTAINER, Self::RIGHT_OBJ),
            Handedness::Left => (Self::LEFT_CONTAINER, Self::LEFT_OBJ),
        };
        let idx = rng.random_range(0..containers.len());
        let at = |table: &[(f64, f64)]| table[idx.min(table.len() - 1)];
        SampledPositions {
            container: at(containers),
            obj: at(objs),
            container_size: at(Self::CONTAINER_SIZE),
            obj_size: at(Self::OBJ_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use tabletop_core::rng_from_seed;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn mirroring_flips_x() {
        let layout = SlotLayout::new((0.9, -0.3), (0.5, 0.5));
        assert_eq!(layout.center(Handedness::Right), (0.9, -0.3));
        assert_eq!(layout.center(Handedness::Left), (-0.9, -0.3));
        let fixed = layout.clone().unmirrored();
        assert_eq!(fixed.center(Handedness::Left), (0.9, -0.3));
        let explicit = layout.left_at(-0.5, -0.2);
        assert_eq!(explicit.center(Handedness::Left), (-0.5, -0.2));
    }

    #[test]
    fn tiered_basket_yaw_reflects() {
        let layout = SlotLayout::new((0.75, 0.3), (0.7, 0.5)).rotated(-5.0 * PI / 8.0, -7.0 * PI / 8.0);
        let (lo, hi) = layout.rotation(Handedness::Left).unwrap();
        assert!(close(lo, -3.0 * PI / 8.0));
        assert!(close(hi, -PI / 8.0));
    }

    #[test]
    fn symmetric_yaw_is_unchanged() {
        let layout = SlotLayout::new((0.0, 0.0), (0.3, 0.3)).rotated(-PI / 2.0, PI / 2.0);
        let (lo, hi) = layout.rotation(Handedness::Left).unwrap();
        assert!(close(lo, -PI / 2.0));
        assert!(close(hi, PI / 2.0));
    }

    #[test]
    fn placement_carries_flags() {
        let spec = SlotLayout::new((0.5, -0.8), (0.3, 0.3))
            .boundary(false)
            .in_ref_region()
            .on_site(SiteSelector::Last)
            .placement("counter", Handedness::Left);
        assert_eq!(spec.fixture.as_deref(), Some("counter"));
        assert_eq!(spec.region_center, (-0.5, -0.8));
        assert!(!spec.boundary_containment);
        assert!(spec.ensure_in_ref_region);
        assert_eq!(spec.site, Some(SiteSelector::Last));
    }

    #[test]
    fn sampled_positions_come_from_the_side_tables() {
        let mut rng = rng_from_seed(3);
        for _ in 0..20 {
            let right = PositionSampler::sample(Handedness::Right, &mut rng);
            assert_eq!(right.container, (0.75, -0.15));
            assert_eq!(right.obj, (0.85, -0.9));
            let left = PositionSampler::sample(Handedness::Left, &mut rng);
            assert!(left.container.0 < 0.0 && left.obj.0 < 0.0);
            assert_eq!(left.container_size, (0.6, 0.2));
            assert_eq!(left.obj_size, (0.7, 0.3));
        }
    }

    #[test]
    fn scale_lookup() {
        assert_eq!(obj_scale("plate"), Some(1.2));
        assert_eq!(obj_scale("bowl"), None);
    }
}
