//! Directional growth bias for the 3D turtle.
//!
//! After every drawn step the turtle frame is bent toward `direction` by an
//! angle proportional to the torque `|H × T|`, so a branch already aligned
//! with the bias stops bending.

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::turtle3d::Frame;

/// Below this torque heading and bias are treated as parallel.
const MIN_TORQUE: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Organ {
    Shoot,
    Branch,
    Root,
    Flower,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tropism {
    /// Unit bias direction.
    pub direction: DVec3,
    pub susceptibility: f64,
}

impl Default for Tropism {
    fn default() -> Self {
        Self::gravity(0.2)
    }
}

impl Tropism {
    /// Custom bias. A zero direction falls back to gravity.
    pub fn new(direction: DVec3, susceptibility: f64) -> Self {
        Self {
            direction: direction.try_normalize().unwrap_or(DVec3::NEG_Y),
            susceptibility,
        }
    }

    pub fn gravity(susceptibility: f64) -> Self {
        Self {
            direction: DVec3::NEG_Y,
            susceptibility,
        }
    }

    pub fn light(susceptibility: f64) -> Self {
        Self {
            direction: DVec3::Y,
            susceptibility,
        }
    }

    /// Bias toward a sun `sun_angle` degrees above the horizon in the XY
    /// plane (90 is straight up).
    pub fn sunlight(susceptibility: f64, sun_angle: f64) -> Self {
        let a = sun_angle.to_radians();
        Self::new(DVec3::new(a.cos(), a.sin(), 0.0), susceptibility)
    }

    /// Botanical defaults. Shoots and branches bend toward gravity, roots
    /// away from it, and flowers toward a sun `sun_angle` degrees off
    /// vertical.
    pub fn for_organ(organ: Organ, sun_angle: f64) -> Self {
        match organ {
            Organ::Shoot => Self::gravity(0.22),
            Organ::Branch => Self::gravity(0.14),
            Organ::Root => Self::light(0.30),
            Organ::Flower => {
                let a = sun_angle.to_radians();
                Self::new(DVec3::new(a.sin(), a.cos(), 0.0), 0.40)
            }
        }
    }

    /// Bends `frame` toward the bias direction. The result is not
    /// re-orthonormalized.
    pub fn apply(&self, frame: Frame) -> Frame {
        let torque = frame.heading.cross(self.direction);
        let magnitude = torque.length();
        if magnitude < MIN_TORQUE || self.susceptibility == 0.0 {
            return frame;
        }
        let rotation = DQuat::from_axis_angle(torque / magnitude, self.susceptibility * magnitude);
        frame.rotated(rotation)
    }
}
