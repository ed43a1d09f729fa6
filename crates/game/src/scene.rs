//! Scene graph: hecs entities for every placed object plus the physics world
//! that backs their colliders.
//!
//! Nodes carry a local [`Transform`] and an optional [`Parent`]. Physics
//! handles registered through [`Scene::attach_body`] or
//! [`Scene::attach_collider`] are mapped back to their node so a collision
//! can be classified by what was hit, and are removed with the node.

use std::collections::HashMap;

use engine_core::{Transform, Vec3};
use hecs::{Entity, EntityBuilder, World};
use physics::{ColliderHandle, PhysicsBody, PhysicsWorld, RigidBodyHandle};

/// What a scene node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Ground,
    /// Root of a placed tree; owns the compound collider of its skeleton.
    Tree,
    /// Pivot box or cylinder of a tree skeleton.
    Segment,
    /// Tree model hung on a skeleton pivot.
    Prototype,
    Target,
    Decal,
    Light,
    Nest,
    NestModel,
}

/// Marks an entity as part of the scene.
#[derive(Debug, Clone, Copy)]
pub struct SceneNode {
    pub kind: NodeKind,
    pub name: &'static str,
}

/// Link to the node this one is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub Entity);

/// Primitive geometry drawn for a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Cuboid { size: Vec3 },
    Cylinder { radius: f32, height: f32 },
}

/// How a collision with a node is handled by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    Target,
    Nest,
    Scenery,
}

pub struct Scene {
    pub world: World,
    pub physics: PhysicsWorld,
    colliders: HashMap<ColliderHandle, Entity>,
    children: HashMap<Entity, Vec<Entity>>,
}

impl Scene {
    pub fn new(physics: PhysicsWorld) -> Self {
        Self {
            world: World::new(),
            physics,
            colliders: HashMap::new(),
            children: HashMap::new(),
        }
    }

    /// Spawn a node with a transform local to `parent` (or the world).
    pub fn spawn(
        &mut self,
        kind: NodeKind,
        name: &'static str,
        local: Transform,
        parent: Option<Entity>,
    ) -> Entity {
        let mut builder = EntityBuilder::new();
        builder.add(SceneNode { kind, name }).add(local);
        if let Some(parent) = parent {
            builder.add(Parent(parent));
        }
        let entity = self.world.spawn(builder.build());
        if let Some(parent) = parent {
            self.children.entry(parent).or_default().push(entity);
        }
        entity
    }

    /// Attach an extra component to an existing node.
    pub fn insert<C: hecs::Component>(&mut self, entity: Entity, component: C) {
        if self.world.insert_one(entity, component).is_err() {
            log::warn!("Tried to attach a component to a despawned node {:?}", entity);
        }
    }

    /// Register a rigid body (and all its colliders) as belonging to `entity`.
    pub fn attach_body(&mut self, entity: Entity, body: RigidBodyHandle) {
        if let Some(rb) = self.physics.rigid_body_set.get(body) {
            for &collider in rb.colliders() {
                self.colliders.insert(collider, entity);
            }
        }
        self.insert(entity, PhysicsBody::Body(body));
    }

    /// Register a free-standing collider as belonging to `entity`.
    pub fn attach_collider(&mut self, entity: Entity, collider: ColliderHandle) {
        self.colliders.insert(collider, entity);
        self.insert(entity, PhysicsBody::Collider(collider));
    }

    #[cfg(test)]
    pub fn contains(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }

    pub fn kind(&self, entity: Entity) -> Option<NodeKind> {
        self.world.get::<&SceneNode>(entity).ok().map(|n| n.kind)
    }

    pub fn name(&self, entity: Entity) -> Option<&'static str> {
        self.world.get::<&SceneNode>(entity).ok().map(|n| n.name)
    }

    /// Node owning `collider`, if it is a scene collider.
    pub fn node_for_collider(&self, collider: ColliderHandle) -> Option<Entity> {
        self.colliders.get(&collider).copied()
    }

    /// Classify whatever the player touched. Unknown colliders are scenery.
    pub fn classify(&self, collider: ColliderHandle) -> (CollisionKind, Option<Entity>) {
        let node = self.node_for_collider(collider);
        let kind = match node.and_then(|e| self.kind(e)) {
            Some(NodeKind::Target) => CollisionKind::Target,
            Some(NodeKind::Nest) => CollisionKind::Nest,
            _ => CollisionKind::Scenery,
        };
        (kind, node)
    }

    /// Direct children of `entity`, in spawn order.
    pub fn children(&self, entity: Entity) -> &[Entity] {
        self.children.get(&entity).map_or(&[], Vec::as_slice)
    }

    /// Transform of `entity` in world space, composed up its parent chain.
    pub fn world_transform(&self, entity: Entity) -> Option<Transform> {
        let mut transform = *self.world.get::<&Transform>(entity).ok()?;
        let mut current = entity;
        while let Some(parent) = self.world.get::<&Parent>(current).ok().map(|p| p.0) {
            let parent_local = *self.world.get::<&Transform>(parent).ok()?;
            transform = parent_local.mul_transform(&transform);
            current = parent;
        }
        Some(transform)
    }

    /// Despawn `entity` and everything attached below it, releasing their
    /// physics handles. Returns how many nodes were removed.
    pub fn despawn_recursive(&mut self, entity: Entity) -> usize {
        let parent = self.world.get::<&Parent>(entity).ok().map(|p| p.0);
        if let Some(siblings) = parent.and_then(|p| self.children.get_mut(&p)) {
            siblings.retain(|&child| child != entity);
        }

        let mut stack = vec![entity];
        let mut removed = 0;
        while let Some(node) = stack.pop() {
            if let Some(children) = self.children.remove(&node) {
                stack.extend(children);
            }
            let body = self.world.get::<&PhysicsBody>(node).ok().map(|b| *b);
            if let Some(body) = body {
                self.release_body(body);
            }
            if self.world.despawn(node).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    fn release_body(&mut self, body: PhysicsBody) {
        match body {
            PhysicsBody::Body(handle) => {
                if let Some(rb) = self.physics.rigid_body_set.get(handle) {
                    for collider in rb.colliders() {
                        self.colliders.remove(collider);
                    }
                }
            }
            PhysicsBody::Collider(handle) => {
                self.colliders.remove(&handle);
            }
        }
        self.physics.remove(body);
    }

    #[cfg(test)]
    pub fn node_count(&self) -> usize {
        self.world.len() as usize
    }

    #[cfg(test)]
    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.world
            .query::<&SceneNode>()
            .iter()
            .filter(|(_, n)| n.kind == kind)
            .count()
    }

    /// Colliders currently mapped to scene nodes.
    #[cfg(test)]
    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::Quat;
    use physics::{CollisionGroup, ShapeSpec};
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn world_transform_composes_parents() {
        let mut scene = Scene::new(PhysicsWorld::new());
        let root = scene.spawn(
            NodeKind::Tree,
            "tree",
            Transform::from_position_rotation(Vec3::new(10.0, 0.0, 0.0), Quat::from_rotation_y(FRAC_PI_2)),
            None,
        );
        let child = scene.spawn(
            NodeKind::Segment,
            "trunk",
            Transform::from_position(Vec3::new(0.0, 0.0, 1.0)),
            Some(root),
        );
        let world = scene.world_transform(child).unwrap();
        assert!((world.position - Vec3::new(11.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn despawn_recursive_releases_colliders() {
        let mut scene = Scene::new(PhysicsWorld::new());
        let target = scene.spawn(NodeKind::Target, "target", Transform::default(), None);
        let collider = scene.physics.add_sensor(
            &Transform::default(),
            ShapeSpec::Cylinder {
                radius: 3.0,
                half_height: 0.5,
            },
            CollisionGroup::Target,
        );
        scene.attach_collider(target, collider);
        scene.spawn(NodeKind::Decal, "decal", Transform::default(), Some(target));
        scene.spawn(NodeKind::Light, "light", Transform::default(), Some(target));

        assert_eq!(scene.classify(collider), (CollisionKind::Target, Some(target)));
        assert_eq!(scene.despawn_recursive(target), 3);
        assert_eq!(scene.node_count(), 0);
        assert_eq!(scene.collider_count(), 0);
        assert_eq!(scene.physics.collider_count(), 0);
        assert_eq!(scene.classify(collider).0, CollisionKind::Scenery);
    }

    #[test]
    fn children_index_follows_spawn_and_despawn() {
        let mut scene = Scene::new(PhysicsWorld::new());
        let root = scene.spawn(NodeKind::Tree, "tree", Transform::default(), None);
        let trunk = scene.spawn(NodeKind::Segment, "trunk", Transform::default(), Some(root));
        let branch = scene.spawn(NodeKind::Segment, "branch", Transform::default(), Some(trunk));
        let leaf = scene.spawn(NodeKind::Prototype, "prototype", Transform::default(), Some(branch));
        let other = scene.spawn(NodeKind::Segment, "other", Transform::default(), Some(root));

        assert_eq!(scene.children(root), &[trunk, other]);
        assert_eq!(scene.children(branch), &[leaf]);
        assert!(scene.children(leaf).is_empty());

        assert_eq!(scene.despawn_recursive(trunk), 3);
        assert_eq!(scene.children(root), &[other]);
        assert!(scene.children(branch).is_empty());
        assert_eq!(scene.name(other), Some("other"));
        assert_eq!(scene.name(leaf), None);

        assert_eq!(scene.despawn_recursive(root), 2);
        assert_eq!(scene.node_count(), 0);
        assert!(scene.children.is_empty());
    }

    #[test]
    fn body_colliders_map_to_owner() {
        let mut scene = Scene::new(PhysicsWorld::new());
        let tree = scene.spawn(NodeKind::Tree, "tree", Transform::default(), None);
        let body = scene.physics.add_static_compound(
            &Transform::default(),
            &[
                (Transform::default(), ShapeSpec::Cuboid { half_extents: Vec3::ONE }),
                (
                    Transform::from_position(Vec3::Y * 8.0),
                    ShapeSpec::Cylinder {
                        radius: 3.0,
                        half_height: 8.0,
                    },
                ),
            ],
            CollisionGroup::obstacle(),
        );
        scene.attach_body(tree, body);
        assert_eq!(scene.collider_count(), 2);
        scene.despawn_recursive(tree);
        assert_eq!(scene.collider_count(), 0);
        assert_eq!(scene.physics.collider_count(), 0);
    }
}
