//! Physics system using Rapier3D for the woodpecker game.

pub mod collision;
pub mod physics_world;
pub mod raycast;

pub use collision::*;
pub use physics_world::*;
pub use raycast::*;

// Re-export Rapier for downstream crates
pub use rapier3d;

// Re-export common Rapier types
pub use rapier3d::prelude::{
    ColliderHandle, CollisionEvent, CollisionEventFlags, InteractionGroups, RigidBodyHandle,
};
