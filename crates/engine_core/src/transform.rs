//! Transform component and utilities for spatial positioning.

use glam::{EulerRot, Mat4, Quat, Vec3};

/// A 3D transform representing position, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform at the given position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a new transform with position and rotation.
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Create a transform from a position and XYZ Euler angles given in degrees.
    pub fn from_position_euler_degrees(position: Vec3, degrees: Vec3) -> Self {
        Self::from_position_rotation(
            position,
            Quat::from_euler(
                EulerRot::XYZ,
                degrees.x.to_radians(),
                degrees.y.to_radians(),
                degrees.z.to_radians(),
            ),
        )
    }

    /// Get the forward direction (negative Z in right-handed coordinates).
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Get the facing direction of a model authored looking down +Z.
    pub fn facing(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Get the right direction (positive X).
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Get the up direction (positive Y).
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Translate the transform by a delta.
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Compose a child's local transform onto this (parent) transform.
    ///
    /// Non-uniform parent scale is applied to the child's offset but not
    /// propagated into its rotation (no shear).
    pub fn mul_transform(&self, child: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * (self.scale * child.position),
            rotation: (self.rotation * child.rotation).normalize(),
            scale: self.scale * child.scale,
        }
    }

    /// Transform a point from local space into the space this transform lives in.
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * (self.scale * point)
    }

    /// Yaw (about world Y) of the orientation, using YXZ order.
    pub fn yaw(&self) -> f32 {
        let (yaw, _, _) = self.rotation.to_euler(EulerRot::YXZ);
        yaw
    }

    /// Look at a target position.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let forward = (target - self.position).normalize_or_zero();
        if forward.length_squared() > 0.0001 {
            self.rotation = Quat::from_mat4(&Mat4::look_at_rh(self.position, target, up)).inverse();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn mul_transform_applies_parent_rotation_to_child_offset() {
        let parent = Transform::from_position_rotation(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::from_rotation_y(FRAC_PI_2),
        );
        let child = Transform::from_position(Vec3::new(0.0, 0.0, 1.0));
        let world = parent.mul_transform(&child);
        assert!((world.position - Vec3::new(11.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn facing_is_opposite_of_forward() {
        let t = Transform::from_position_rotation(Vec3::ZERO, Quat::from_rotation_y(0.7));
        assert!((t.facing() + t.forward()).length() < 1e-6);
    }

    #[test]
    fn yaw_round_trips_through_rotation() {
        let t = Transform::from_position_rotation(
            Vec3::ZERO,
            Quat::from_rotation_y(1.2) * Quat::from_rotation_x(-0.3),
        );
        assert!((t.yaw() - 1.2).abs() < 1e-4);
    }

    #[test]
    fn euler_degrees_match_axis_rotation() {
        let t = Transform::from_position_euler_degrees(Vec3::ZERO, Vec3::new(0.0, 0.0, 90.0));
        let up = t.up();
        assert!((up - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);
    }
}
