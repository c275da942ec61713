//! Success thresholds and their validation.
//!
//! [`SuccessThresholds`] collects every numeric constant the predicate
//! layer compares against. [`validate()`](SuccessThresholds::validate)
//! rejects non-finite or out-of-range values at task construction; the
//! predicates themselves never re-check them.

use tabletop_core::ConfigError;

/// Numeric thresholds used by the geometric predicates.
#[derive(Clone, Debug, PartialEq)]
pub struct SuccessThresholds {
    /// A gripper counts as far from a body beyond this distance (metres).
    /// Default: 0.25.
    pub gripper_far_distance: f64,
    /// An object is inside a receptacle when its horizontal offset from
    /// the receptacle centre is below this fraction of the receptacle's
    /// horizontal radius. Default: 0.7.
    pub receptacle_radius_fraction: f64,
    /// Minimum dot product of a body's up axis with world up for it to
    /// count as upright. Default: 0.8.
    pub upright: f64,
    /// Door state at or above which a door is open. Default: 0.5.
    pub door_open: f64,
    /// Door state at or below which a door is closed. Default: 0.005.
    pub door_closed: f64,
    /// Geometric distance at which the closest-site search gives up
    /// (metres). Default: 1.0.
    pub site_max_distance: f64,
    /// Lid angle at or above which a laptop is open (degrees). Default: 85.
    pub lid_open_degrees: f64,
    /// Lid angle at or below which a laptop is closed (degrees). Default: 10.
    pub lid_closed_degrees: f64,
}

impl Default for SuccessThresholds {
    fn default() -> Self {
        Self {
            gripper_far_distance: 0.25,
            receptacle_radius_fraction: 0.7,
            upright: 0.8,
            door_open: 0.5,
            door_closed: 0.005,
            site_max_distance: 1.0,
            lid_open_degrees: 85.0,
            lid_closed_degrees: 10.0,
        }
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidThreshold {
        reason: reason.into(),
    }
}

impl SuccessThresholds {
    /// Check every threshold for range and mutual consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            ("gripper_far_distance", self.gripper_far_distance),
            ("receptacle_radius_fraction", self.receptacle_radius_fraction),
            ("upright", self.upright),
            ("door_open", self.door_open),
            ("door_closed", self.door_closed),
            ("site_max_distance", self.site_max_distance),
            ("lid_open_degrees", self.lid_open_degrees),
            ("lid_closed_degrees", self.lid_closed_degrees),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(invalid(format!("{name} must be finite, got {value}")));
            }
        }
        if self.gripper_far_distance <= 0.0 {
            return Err(invalid(format!(
                "gripper_far_distance must be positive, got {}",
                self.gripper_far_distance
            )));
        }
        if self.receptacle_radius_fraction <= 0.0 {
            return Err(invalid(format!(
                "receptacle_radius_fraction must be positive, got {}",
                self.receptacle_radius_fraction
            )));
        }
        if !(-1.0..=1.0).contains(&self.upright) {
            return Err(invalid(format!(
                "upright must lie in [-1, 1], got {}",
                self.upright
            )));
        }
        for (name, value) in [("door_open", self.door_open), ("door_closed", self.door_closed)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!("{name} must lie in [0, 1], got {value}")));
            }
        }
        if self.door_closed >= self.door_open {
            return Err(invalid(format!(
                "door_closed ({}) must be below door_open ({})",
                self.door_closed, self.door_open
            )));
        }
        if self.site_max_distance <= 0.0 {
            return Err(invalid(format!(
                "site_max_distance must be positive, got {}",
                self.site_max_distance
            )));
        }
        if self.lid_closed_degrees >= self.lid_open_degrees {
            return Err(invalid(format!(
                "lid_closed_degrees ({}) must be below lid_open_degrees ({})",
                self.lid_closed_degrees, self.lid_open_degrees
            )));
        }
        Ok(())
    }

    /// Laptop-open lid angle in radians.
    pub fn lid_open_radians(&self) -> f64 {
        self.lid_open_degrees.to_radians()
    }

    /// Laptop-closed lid angle in radians.
    pub fn lid_closed_radians(&self) -> f64 {
        self.lid_closed_degrees.to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(SuccessThresholds::default().validate().is_ok());
    }

    #[test]
    fn nan_is_rejected() {
        let t = SuccessThresholds {
            upright: f64::NAN,
            ..SuccessThresholds::default()
        };
        match t.validate() {
            Err(ConfigError::InvalidThreshold { reason }) => assert!(reason.contains("upright")),
            other => panic!("expected InvalidThreshold, got {other:?}"),
        }
    }

    #[test]
    fn inverted_door_thresholds_are_rejected() {
        let t = SuccessThresholds {
            door_open: 0.004,
            ..SuccessThresholds::default()
        };
        match t.validate() {
            Err(ConfigError::InvalidThreshold { .. }) => {}
            other => panic!("expected InvalidThreshold, got {other:?}"),
        }
    }

    #[test]
    fn zero_gripper_distance_is_rejected() {
        let t = SuccessThresholds {
            gripper_far_distance: 0.0,
            ..SuccessThresholds::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn lid_angles_convert() {
        let t = SuccessThresholds::default();
        assert!((t.lid_open_radians() - 85f64.to_radians()).abs() < 1e-12);
        assert!(t.lid_closed_radians() < t.lid_open_radians());
    }
}
