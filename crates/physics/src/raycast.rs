//! Raycasting for steering and scene queries.

use crate::PhysicsWorld;
use glam::Vec3;
use rapier3d::prelude::*;

/// Result of a raycast query.
#[derive(Debug, Clone, Copy)]
pub struct RaycastHit {
    /// The collider that was hit.
    pub collider: ColliderHandle,
    /// Distance along the ray to the hit point.
    pub distance: f32,
    /// World position of the hit.
    pub point: Vec3,
}

impl PhysicsWorld {
    /// Cast a ray against solid colliders matching `groups` and return the first hit.
    ///
    /// `direction` must be normalised so that `distance` is in world units.
    /// Sensors (targets, nests) are never hit.
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        groups: InteractionGroups,
    ) -> Option<RaycastHit> {
        if max_distance <= 0.0 || direction.length_squared() < 1e-8 {
            return None;
        }

        let ray = Ray::new(
            point![origin.x, origin.y, origin.z],
            vector![direction.x, direction.y, direction.z],
        );

        let filter = QueryFilter::default().exclude_sensors().groups(groups);

        self.query_pipeline
            .cast_ray(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                max_distance,
                true,
                filter,
            )
            .map(|(collider, time_of_impact)| {
                let point = ray.point_at(time_of_impact);
                RaycastHit {
                    collider,
                    distance: time_of_impact,
                    point: Vec3::new(point.x, point.y, point.z),
                }
            })
    }
}
