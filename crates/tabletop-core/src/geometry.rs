//! Minimal rigid-body geometry: points, unit quaternions, poses.
//!
//! Only what the success predicates need. Quaternions use the
//! `(w, x, y, z)` convention of the simulation.

use std::ops::{Add, Sub};

/// A point or direction in world coordinates (metres).
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// World up axis.
    pub const Z: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 1.0,
    };

    /// Construct from components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Dot product.
    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Euclidean length.
    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Distance in the horizontal (x, y) plane, ignoring height.
    pub fn horizontal_distance(self, other: Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Full 3D distance.
    pub fn distance(self, other: Vec3) -> f64 {
        (self - other).norm()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// A unit quaternion `(w, x, y, z)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quat {
    /// Scalar part.
    pub w: f64,
    /// X of the vector part.
    pub x: f64,
    /// Y of the vector part.
    pub y: f64,
    /// Z of the vector part.
    pub z: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    /// The identity rotation.
    pub const IDENTITY: Quat = Quat {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Rotation of `angle` radians about a unit `axis`.
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let half = angle * 0.5;
        let s = half.sin();
        Self {
            w: half.cos(),
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
        }
    }

    /// Rotation about the world z axis.
    pub fn from_yaw(yaw: f64) -> Self {
        Self::from_axis_angle(Vec3::Z, yaw)
    }

    /// Rotate a vector by this quaternion.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        // v' = v + 2w (q × v) + 2 q × (q × v)
        let q = Vec3::new(self.x, self.y, self.z);
        let t = cross(q, v);
        let t = Vec3::new(2.0 * t.x, 2.0 * t.y, 2.0 * t.z);
        let wt = Vec3::new(self.w * t.x, self.w * t.y, self.w * t.z);
        v + wt + cross(q, t)
    }

    /// Inverse of a unit quaternion.
    pub fn conjugate(self) -> Self {
        Self {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// The body's local z axis expressed in world coordinates.
    pub fn up_axis(self) -> Vec3 {
        self.rotate(Vec3::Z)
    }
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(
        a.y * b.z - a.z * b.y,
        a.z * b.x - a.x * b.z,
        a.x * b.y - a.y * b.x,
    )
}

/// Position plus orientation of a body or site in world coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Pose {
    /// World position.
    pub pos: Vec3,
    /// World orientation.
    pub quat: Quat,
}

impl Pose {
    /// An unrotated pose at `pos`.
    pub fn at(pos: Vec3) -> Self {
        Self {
            pos,
            quat: Quat::IDENTITY,
        }
    }

    /// Express a world point in this pose's local frame.
    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.quat.conjugate().rotate(world - self.pos)
    }
}
