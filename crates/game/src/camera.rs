//! Third-person camera rig that rides on the woodpecker.

use engine_core::{Transform, Vec3};

/// Camera offset, in the bird's local frame, while flying.
pub const FOLLOW_OFFSET: Vec3 = Vec3::new(0.0, 1.5, 4.0);
/// Camera offset while pecking: off to the side, close to the trunk.
pub const PECK_OFFSET: Vec3 = Vec3::new(4.0, 0.5, 1.5);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    /// Eye position relative to the bird.
    pub offset: Vec3,
    /// World-space point the camera looks at.
    pub look_at: Vec3,
}

impl CameraRig {
    /// Behind and above, looking just over the bird.
    pub fn follow(bird: &Transform) -> Self {
        Self {
            offset: FOLLOW_OFFSET,
            look_at: bird.position + Vec3::Y,
        }
    }

    /// Beside the bird, looking at the target it faces.
    pub fn pecking(bird: &Transform) -> Self {
        Self {
            offset: PECK_OFFSET,
            look_at: bird.position - bird.facing(),
        }
    }

    /// Blend from the follow rig (`t = 0`) to the pecking rig (`t = 1`).
    pub fn blend(bird: &Transform, t: f32) -> Self {
        let from = Self::follow(bird);
        let to = Self::pecking(bird);
        Self {
            offset: from.offset.lerp(to.offset, t),
            look_at: from.look_at.lerp(to.look_at, t),
        }
    }

    /// World-space camera pose.
    pub fn view(&self, bird: &Transform) -> Transform {
        let mut view = Transform::from_position(bird.transform_point(self.offset));
        view.look_at(self.look_at, Vec3::Y);
        view
    }
}
