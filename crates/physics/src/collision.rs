//! Collision groups, filtering, and collision-event collection.

use std::sync::Mutex;

use rapier3d::prelude::*;

/// Collision groups for different entity types.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionGroup {
    /// Static ground under each chunk
    Environment = 1 << 0,
    /// The woodpecker
    Player = 1 << 1,
    /// Tree skeleton segments (the only things the hawk steers around)
    Obstacle = 1 << 2,
    /// Pecking targets (sensor)
    Target = 1 << 3,
    /// Nest goal (sensor)
    Nest = 1 << 4,
}

impl CollisionGroup {
    fn group(self) -> Group {
        Group::from_bits_retain(self as u32)
    }

    /// Membership/filter pair for the ground.
    pub fn environment() -> (Group, Group) {
        (Self::Environment.group(), Group::ALL)
    }

    /// Membership/filter pair for tree segments.
    pub fn obstacle() -> (Group, Group) {
        (Self::Obstacle.group(), Group::ALL)
    }

    /// Membership/filter pair for the player: touches scenery and triggers.
    pub fn player() -> (Group, Group) {
        let filter = Group::from_bits_retain(
            Self::Environment as u32
                | Self::Obstacle as u32
                | Self::Target as u32
                | Self::Nest as u32,
        );
        (Self::Player.group(), filter)
    }

    /// Membership/filter pair for trigger volumes; they only report the player.
    pub fn trigger(kind: CollisionGroup) -> (Group, Group) {
        (kind.group(), Self::Player.group())
    }

    /// Interaction groups a scene query uses to see only `targets`.
    pub fn query(targets: &[CollisionGroup]) -> InteractionGroups {
        let filter = targets
            .iter()
            .fold(Group::empty(), |acc, g| acc | g.group());
        InteractionGroups::new(Group::ALL, filter)
    }
}

/// Builds `InteractionGroups` from a `(membership, filter)` pair.
pub fn interaction_groups((membership, filter): (Group, Group)) -> InteractionGroups {
    InteractionGroups::new(membership, filter)
}

/// Collects collision start/stop events produced during a physics step.
#[derive(Default)]
pub struct CollisionCollector {
    events: Mutex<Vec<CollisionEvent>>,
}

impl CollisionCollector {
    /// Take every event gathered since the last drain.
    pub fn drain(&self) -> Vec<CollisionEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl EventHandler for CollisionCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// Component linking a scene node to its physics handles.
#[derive(Debug, Clone, Copy)]
pub enum PhysicsBody {
    /// A rigid body owning one or more attached colliders.
    Body(RigidBodyHandle),
    /// A free-standing collider fixed in the world.
    Collider(ColliderHandle),
}
