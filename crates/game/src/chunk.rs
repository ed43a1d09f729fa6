//! A single streamed terrain cell: ground, trees, targets and maybe a nest.

use engine_core::{AssetHandle, LoadState, Transform, Vec3};
use hecs::Entity;
use physics::{CollisionGroup, ShapeSpec};
use procgen::{NodeShape, TreeSkeleton};
use rand::Rng;

use crate::assets::{GameAssets, NEST_MODEL, NEST_MODEL_SCALE};
use crate::config::WorldConfig;
use crate::pool::{TreePool, TreePrototype};
use crate::scene::{NodeKind, Primitive, Scene};

/// Integer chunk coordinates; world position is `index * chunk_size`.
pub type GridIndex = (i32, i32);

const GROUND_Y: f32 = -1.0;
const GROUND_HEIGHT: f32 = 10.0;
const TARGET_RADIUS: f32 = 3.0;
const TARGET_HEIGHT: f32 = 1.0;
const DECAL_SIZE: Vec3 = Vec3::new(5.0, 1.5, 5.0);
const NEST_Y: f32 = 5.0;
const NEST_SIZE: Vec3 = Vec3::new(20.0, 12.0, 20.0);

/// A placed tree. Holds its prototype by value until the chunk unloads.
#[derive(Debug)]
pub struct TreeInstance {
    pub root: Entity,
    pub prototype: TreePrototype,
}

#[derive(Debug, Clone, Copy)]
pub struct TargetInstance {
    pub node: Entity,
}

#[derive(Debug)]
pub struct NestInstance {
    pub node: Entity,
    /// Model load still in flight.
    pending_model: Option<AssetHandle>,
}

#[derive(Debug)]
pub struct Chunk {
    pub index: GridIndex,
    size: f32,
    ground: Option<Entity>,
    pub trees: Vec<TreeInstance>,
    pub targets: Vec<TargetInstance>,
    /// Created as the nest chunk of its stage.
    pub has_nest: bool,
    pub nest: Option<NestInstance>,
}

impl Chunk {
    pub fn new(index: GridIndex, size: f32, has_nest: bool) -> Self {
        Self {
            index,
            size,
            ground: None,
            trees: Vec::new(),
            targets: Vec::new(),
            has_nest,
            nest: None,
        }
    }

    /// World-space centre of the cell at ground level.
    pub fn origin(&self) -> Vec3 {
        Vec3::new(self.index.0 as f32 * self.size, 0.0, self.index.1 as f32 * self.size)
    }

    pub fn load<R: Rng>(
        &mut self,
        scene: &mut Scene,
        pool: &mut TreePool,
        assets: &mut GameAssets,
        settings: &WorldConfig,
        wants_trees: bool,
        rng: &mut R,
    ) {
        let origin = self.origin();
        self.spawn_ground(scene, origin);

        if self.has_nest {
            self.spawn_nest(scene, assets, origin);
        } else if wants_trees {
            let wanted = procgen::tree_count(
                rng,
                settings.min_trees_per_chunk..=settings.max_trees_per_chunk,
            );
            for _ in 0..wanted {
                let Some(prototype) = pool.take_random(rng) else {
                    log::debug!(
                        "Tree pool exhausted; chunk {:?} gets {} of {} trees",
                        self.index,
                        self.trees.len(),
                        wanted
                    );
                    break;
                };
                let placement = procgen::place_tree(rng, origin, self.size);
                let root = create_tree_skeleton(scene, &prototype, placement);
                self.trees.push(TreeInstance { root, prototype });

                if rng.gen_bool(settings.target_chance.clamp(0.0, 1.0)) {
                    let local = procgen::place_target(
                        rng,
                        settings.target_height_min..settings.target_height_max,
                    );
                    let node = spawn_target(scene, placement.position, local);
                    self.targets.push(TargetInstance { node });
                }
            }
        }
        log::trace!(
            "Loaded chunk {:?}: {} trees, {} targets, nest {}",
            self.index,
            self.trees.len(),
            self.targets.len(),
            self.nest.is_some()
        );
    }

    fn spawn_ground(&mut self, scene: &mut Scene, origin: Vec3) {
        let transform = Transform::from_position(Vec3::new(origin.x, GROUND_Y, origin.z));
        let size = Vec3::new(self.size, GROUND_HEIGHT, self.size);
        let node = scene.spawn(NodeKind::Ground, "ground", transform, None);
        let collider =
            scene
                .physics
                .add_static_cuboid(&transform, size * 0.5, CollisionGroup::environment());
        scene.attach_collider(node, collider);
        scene.insert(node, Primitive::Cuboid { size });
        self.ground = Some(node);
    }

    fn spawn_nest(&mut self, scene: &mut Scene, assets: &mut GameAssets, origin: Vec3) {
        let transform = Transform::from_position(Vec3::new(origin.x, NEST_Y, origin.z));
        let node = scene.spawn(NodeKind::Nest, "nest", transform, None);
        let collider = scene.physics.add_sensor(
            &transform,
            ShapeSpec::Cuboid {
                half_extents: NEST_SIZE * 0.5,
            },
            CollisionGroup::Nest,
        );
        scene.attach_collider(node, collider);
        scene.insert(node, Primitive::Cuboid { size: NEST_SIZE });

        let pending_model = match assets.models.request(NEST_MODEL) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("Nest in chunk {:?} will have no model: {}", self.index, e);
                None
            }
        };
        log::info!("Nest spawned in chunk {:?}", self.index);
        self.nest = Some(NestInstance {
            node,
            pending_model,
        });
    }

    /// Attach the nest model once its load resolves.
    pub fn poll_nest_model(&mut self, scene: &mut Scene, assets: &mut GameAssets) {
        let Some(nest) = self.nest.as_mut() else {
            return;
        };
        let Some(handle) = nest.pending_model else {
            return;
        };
        let model = match assets.models.state(handle) {
            Some(LoadState::Pending) => return,
            Some(LoadState::Ready(model)) => Some(model.clone()),
            Some(LoadState::Failed(reason)) => {
                log::warn!("Nest model failed to load: {}", reason);
                None
            }
            None => None,
        };
        assets.models.release(handle);
        nest.pending_model = None;

        if let Some(model) = model {
            let local = Transform {
                scale: Vec3::splat(NEST_MODEL_SCALE),
                ..Default::default()
            };
            scene.spawn(NodeKind::NestModel, "nest_model", local, Some(nest.node));
            log::debug!(
                "Nest model {} attached in chunk {:?} ({} bytes{})",
                model.path,
                self.index,
                model.bytes,
                if model.placeholder { ", placeholder" } else { "" }
            );
        }
    }

    /// Tear the chunk down, returning prototypes to the pool. Returns whether
    /// a nest was still present.
    pub fn disload(&mut self, scene: &mut Scene, pool: &mut TreePool, assets: &mut GameAssets) -> bool {
        for tree in self.trees.drain(..) {
            scene.despawn_recursive(tree.root);
            pool.give_back(tree.prototype);
        }
        for target in self.targets.drain(..) {
            scene.despawn_recursive(target.node);
        }
        let had_nest = self.take_nest(scene, assets);
        if let Some(ground) = self.ground.take() {
            scene.despawn_recursive(ground);
        }
        log::trace!("Disloaded chunk {:?}", self.index);
        had_nest
    }

    /// Remove one target (the player finished or left its mini-game).
    pub fn remove_target(&mut self, node: Entity, scene: &mut Scene) -> bool {
        match self.targets.iter().position(|t| t.node == node) {
            Some(i) => {
                self.targets.swap_remove(i);
                scene.despawn_recursive(node);
                true
            }
            None => false,
        }
    }

    /// Remove the nest, dropping any model load still in flight.
    pub fn take_nest(&mut self, scene: &mut Scene, assets: &mut GameAssets) -> bool {
        match self.nest.take() {
            Some(nest) => {
                if let Some(handle) = nest.pending_model {
                    assets.models.release(handle);
                }
                scene.despawn_recursive(nest.node);
                true
            }
            None => false,
        }
    }

    pub fn owns_target(&self, node: Entity) -> bool {
        self.targets.iter().any(|t| t.node == node)
    }

    pub fn owns_nest(&self, node: Entity) -> bool {
        self.nest.as_ref().is_some_and(|n| n.node == node)
    }
}

/// Spawn a tree at `placement`: the skeleton nodes, one fixed compound body
/// with a collider per node, and the prototype model on the pivot.
pub fn create_tree_skeleton(
    scene: &mut Scene,
    prototype: &TreePrototype,
    placement: Transform,
) -> Entity {
    let skeleton = TreeSkeleton::tree01();
    let root = scene.spawn(NodeKind::Tree, "tree", placement, None);

    let parts: Vec<(Transform, ShapeSpec)> = skeleton
        .nodes()
        .iter()
        .map(|node| (node.root, shape_spec(node.shape)))
        .collect();
    let body = scene
        .physics
        .add_static_compound(&placement, &parts, CollisionGroup::obstacle());
    scene.attach_body(root, body);

    let mut entities: Vec<Entity> = Vec::with_capacity(skeleton.len());
    for node in skeleton.nodes() {
        let parent = node.parent.and_then(|p| entities.get(p).copied()).unwrap_or(root);
        let entity = scene.spawn(NodeKind::Segment, node.name, node.local, Some(parent));
        scene.insert(entity, primitive(node.shape));
        entities.push(entity);
    }

    let pivot = entities[TreeSkeleton::PIVOT];
    scene.spawn(
        NodeKind::Prototype,
        "prototype",
        skeleton.prototype_attachment(),
        Some(pivot),
    );
    log::trace!("Placed {} at {:?}", prototype.model.path, placement.position);
    root
}

fn spawn_target(scene: &mut Scene, tree_position: Vec3, local: Transform) -> Entity {
    let transform = Transform::from_position_rotation(
        Vec3::new(tree_position.x, 0.0, tree_position.z) + local.position,
        local.rotation,
    );
    let node = scene.spawn(NodeKind::Target, "target", transform, None);
    let collider = scene.physics.add_sensor(
        &transform,
        ShapeSpec::Cylinder {
            radius: TARGET_RADIUS,
            half_height: TARGET_HEIGHT * 0.5,
        },
        CollisionGroup::Target,
    );
    scene.attach_collider(node, collider);
    scene.insert(
        node,
        Primitive::Cylinder {
            radius: TARGET_RADIUS,
            height: TARGET_HEIGHT,
        },
    );

    // Textured with the shared target texture.
    let decal = scene.spawn(NodeKind::Decal, "decal", Transform::default(), Some(node));
    scene.insert(decal, Primitive::Cuboid { size: DECAL_SIZE });
    scene.spawn(NodeKind::Light, "light", Transform::default(), Some(node));
    node
}

fn shape_spec(shape: NodeShape) -> ShapeSpec {
    match shape {
        NodeShape::Pivot { half_extent } => ShapeSpec::Cuboid {
            half_extents: Vec3::splat(half_extent),
        },
        NodeShape::Segment { radius, length } => ShapeSpec::Cylinder {
            radius,
            half_height: length * 0.5,
        },
    }
}

fn primitive(shape: NodeShape) -> Primitive {
    match shape {
        NodeShape::Pivot { half_extent } => Primitive::Cuboid {
            size: Vec3::splat(half_extent * 2.0),
        },
        NodeShape::Segment { radius, length } => Primitive::Cylinder {
            radius,
            height: length,
        },
    }
}
