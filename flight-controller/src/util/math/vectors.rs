use libm::atan2f;

/// Acceleration in g.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AccelerationVector3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl AccelerationVector3D {
    /// Tilt angles in degrees, one axis pair each.
    ///
    /// Roll comes from the y/z pair and pitch from the x/z pair. The x/y pair is
    /// returned as `yaw_tilt`, it is not a heading and must not be used as one.
    pub fn calculate_orientation_angles(&self) -> TiltAngles {
        TiltAngles {
            roll: atan2f(self.y, self.z).to_degrees(),
            pitch: atan2f(self.x, self.z).to_degrees(),
            yaw_tilt: atan2f(self.x, self.y).to_degrees(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TiltAngles {
    pub roll: f32,
    pub pitch: f32,
    pub yaw_tilt: f32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RotationVector3D {
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

impl RotationVector3D {
    pub fn from_2d(vector_2d: &RotationVector2D, yaw: f32) -> Self {
        RotationVector3D {
            roll: vector_2d.roll,
            pitch: vector_2d.pitch,
            yaw,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RotationVector2D {
    pub roll: f32,
    pub pitch: f32,
}
