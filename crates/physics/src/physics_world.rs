//! Physics world management with Rapier3D.

use crate::collision::{interaction_groups, CollisionCollector, CollisionGroup, PhysicsBody};
use engine_core::Transform;
use glam::{Quat, Vec3};
use rapier3d::na::{Isometry3, Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::*;

/// Convert an engine transform into a Rapier isometry (scale is ignored).
pub fn to_isometry(transform: &Transform) -> Isometry<Real> {
    let p = transform.position;
    let q = transform.rotation;
    Isometry3::from_parts(
        Translation3::new(p.x, p.y, p.z),
        UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z)),
    )
}

/// Shape of one collider attached to a compound static body.
#[derive(Debug, Clone, Copy)]
pub enum ShapeSpec {
    /// Y-aligned cylinder centred on its local origin.
    Cylinder { radius: f32, half_height: f32 },
    /// Box with the given half extents.
    Cuboid { half_extents: Vec3 },
}

impl ShapeSpec {
    fn builder(&self) -> ColliderBuilder {
        match *self {
            ShapeSpec::Cylinder {
                radius,
                half_height,
            } => ColliderBuilder::cylinder(half_height, radius),
            ShapeSpec::Cuboid { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
        }
    }
}

/// Main physics world containing all simulation state.
///
/// The game flies in zero gravity: birds steer themselves and the solver only
/// resolves contacts and reports collisions.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,
    events: CollisionCollector,
    paused: bool,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Create a new physics world with zero gravity.
    pub fn new() -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            gravity: vector![0.0, 0.0, 0.0],
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            events: CollisionCollector::default(),
            paused: false,
        }
    }

    /// Set the fixed step length in seconds.
    pub fn set_timestep(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
    }

    /// Step the physics simulation. Does nothing while paused.
    pub fn step(&mut self) {
        if self.paused {
            return;
        }
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.events,
        );
    }

    /// Pause or resume stepping.
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            log::debug!("Physics {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Update query pipeline for raycasting (after adding/removing colliders).
    pub fn update_query_pipeline(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Take the collision events reported since the last call.
    pub fn drain_collision_events(&self) -> Vec<CollisionEvent> {
        self.events.drain()
    }

    /// Add the player body: a dynamic ball that reports collision events.
    pub fn add_player_ball(&mut self, position: Vec3, radius: f32) -> (RigidBodyHandle, ColliderHandle) {
        let rigid_body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y, position.z])
            .ccd_enabled(true)
            .lock_rotations()
            .build();
        let body = self.rigid_body_set.insert(rigid_body);
        let collider = ColliderBuilder::ball(radius)
            .collision_groups(interaction_groups(CollisionGroup::player()))
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        let collider = self
            .collider_set
            .insert_with_parent(collider, body, &mut self.rigid_body_set);
        (body, collider)
    }

    /// Add a static cuboid collider with no parent body, fixed in the world.
    pub fn add_static_cuboid(
        &mut self,
        transform: &Transform,
        half_extents: Vec3,
        group: (Group, Group),
    ) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .position(to_isometry(transform))
            .collision_groups(interaction_groups(group))
            .build();
        self.collider_set.insert(collider)
    }

    /// Add a trigger volume (sensor) fixed in the world.
    pub fn add_sensor(
        &mut self,
        transform: &Transform,
        shape: ShapeSpec,
        kind: CollisionGroup,
    ) -> ColliderHandle {
        let collider = shape
            .builder()
            .position(to_isometry(transform))
            .sensor(true)
            .collision_groups(interaction_groups(CollisionGroup::trigger(kind)))
            .build();
        self.collider_set.insert(collider)
    }

    /// Add a fixed body at `root` with one collider per `(local transform, shape)` part.
    pub fn add_static_compound(
        &mut self,
        root: &Transform,
        parts: &[(Transform, ShapeSpec)],
        group: (Group, Group),
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::fixed().position(to_isometry(root)).build();
        let body = self.rigid_body_set.insert(body);
        for (local, shape) in parts {
            let collider = shape
                .builder()
                .position(to_isometry(local))
                .collision_groups(interaction_groups(group))
                .build();
            self.collider_set
                .insert_with_parent(collider, body, &mut self.rigid_body_set);
        }
        body
    }

    /// Remove a collider by its handle.
    pub fn remove_collider(&mut self, handle: ColliderHandle) {
        self.collider_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.rigid_body_set,
            true,
        );
    }

    /// Remove a rigid body and its colliders.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Remove whatever a scene node registered.
    pub fn remove(&mut self, body: PhysicsBody) {
        match body {
            PhysicsBody::Body(handle) => self.remove_body(handle),
            PhysicsBody::Collider(handle) => self.remove_collider(handle),
        }
    }

    /// Get the transform of a rigid body.
    pub fn get_body_transform(&self, handle: RigidBodyHandle) -> Option<Transform> {
        self.rigid_body_set.get(handle).map(|body| {
            let pos = body.translation();
            let rot = body.rotation();
            Transform {
                position: Vec3::new(pos.x, pos.y, pos.z),
                rotation: Quat::from_xyzw(rot.i, rot.j, rot.k, rot.w),
                scale: Vec3::ONE,
            }
        })
    }

    /// Teleport a body, bypassing integration.
    pub fn set_body_pose(&mut self, handle: RigidBodyHandle, transform: &Transform) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_position(to_isometry(transform), true);
        }
    }

    /// Override a body's linear velocity.
    pub fn set_linear_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_linvel(vector![velocity.x, velocity.y, velocity.z], true);
            body.set_angvel(vector![0.0, 0.0, 0.0], true);
        }
    }

    /// Number of colliders currently registered.
    pub fn collider_count(&self) -> usize {
        self.collider_set.len()
    }
}
