//! Streaming window of chunks around the player.

use std::collections::HashMap;

use engine_core::{AssetHandle, LoadState, Vec3};
use hecs::Entity;
use rand::rngs::StdRng;
use rand::Rng;

use crate::assets::{GameAssets, TREE_MODEL};
use crate::chunk::{Chunk, GridIndex};
use crate::config::WorldConfig;
use crate::error::GameError;
use crate::level::LevelState;
use crate::pool::TreePool;
use crate::scene::Scene;

/// What one [`ChunkManager::update`] call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingReport {
    pub loaded: usize,
    pub unloaded: usize,
    pub nest_spawned: bool,
}

/// Keeps a square window of `total_chunk_length²` chunks centred on the
/// player and recycles tree prototypes between them.
pub struct ChunkManager {
    chunks: HashMap<GridIndex, Chunk>,
    pool: TreePool,
    settings: WorldConfig,
    rng: StdRng,
    /// Prototype loads the pool is waiting on.
    prototype_requests: Vec<AssetHandle>,
    ready: bool,
    initialized: bool,
}

impl ChunkManager {
    pub fn new(settings: WorldConfig, rng: StdRng) -> Self {
        Self {
            chunks: HashMap::new(),
            pool: TreePool::new(),
            settings,
            rng,
            prototype_requests: Vec::new(),
            ready: false,
            initialized: false,
        }
    }

    /// Start streaming from an already filled pool.
    #[cfg(test)]
    pub fn with_pool(settings: WorldConfig, pool: TreePool, rng: StdRng) -> Self {
        Self {
            pool,
            ready: true,
            ..Self::new(settings, rng)
        }
    }

    /// Queue every tree prototype. Streaming waits until all have resolved.
    pub fn request_prototypes(&mut self, assets: &mut GameAssets) -> Result<(), GameError> {
        for _ in 0..self.settings.prototype_count {
            let handle = assets.models.request(TREE_MODEL)?;
            self.prototype_requests.push(handle);
        }
        log::info!("Requested {} tree prototypes", self.prototype_requests.len());
        Ok(())
    }

    /// Fraction of prototypes resolved, for the loading screen.
    pub fn prototype_progress(&self, assets: &GameAssets) -> f32 {
        if self.ready || self.prototype_requests.is_empty() {
            return 1.0;
        }
        let done = self
            .prototype_requests
            .iter()
            .filter(|h| !matches!(assets.models.state(**h), Some(LoadState::Pending)))
            .count();
        done as f32 / self.prototype_requests.len() as f32
    }

    fn check_prototypes(&mut self, assets: &mut GameAssets) {
        let pending = self
            .prototype_requests
            .iter()
            .any(|h| matches!(assets.models.state(*h), Some(LoadState::Pending)));
        if pending {
            return;
        }

        let handles = std::mem::take(&mut self.prototype_requests);
        let models: Vec<_> = handles
            .iter()
            .filter_map(|h| assets.resolved_or_placeholder(*h, TREE_MODEL))
            .collect();
        for handle in handles {
            assets.models.release(handle);
        }
        let placeholders = models.iter().filter(|m| m.placeholder).count();
        self.pool = TreePool::from_models(models);
        self.ready = true;
        log::info!(
            "Tree pool ready with {} prototypes ({} placeholders)",
            self.pool.capacity(),
            placeholders
        );
    }

    /// Chunk index containing `position`.
    pub fn center_index(&self, position: Vec3) -> GridIndex {
        let size = self.settings.chunk_size;
        ((position.x / size).round() as i32, (position.z / size).round() as i32)
    }

    fn half_window(&self) -> i32 {
        (self.settings.total_chunk_length as i32 - 1) / 2
    }

    /// Stream chunks around `player_position`. A no-op until the tree
    /// prototypes have loaded.
    pub fn update(
        &mut self,
        scene: &mut Scene,
        assets: &mut GameAssets,
        player_position: Vec3,
        level: &mut LevelState,
    ) -> StreamingReport {
        let mut report = StreamingReport::default();
        if !self.ready {
            self.check_prototypes(assets);
            if !self.ready {
                return report;
            }
        }

        self.poll_assets(scene, assets);

        let (cx, cz) = self.center_index(player_position);
        let half = self.half_window();

        if !self.initialized {
            let safe = self.settings.safe_zone_radius;
            for x in cx - half..=cx + half {
                for z in cz - half..=cz + half {
                    let wants_trees = (x - cx).abs() > safe || (z - cz).abs() > safe;
                    self.load_chunk(scene, assets, (x, z), false, wants_trees);
                    report.loaded += 1;
                }
            }
            self.initialized = true;
            log::info!(
                "Initial window of {} chunks around ({}, {})",
                report.loaded,
                cx,
                cz
            );
            return report;
        }

        let stale: Vec<GridIndex> = self
            .chunks
            .keys()
            .filter(|(x, z)| (x - cx).abs() > half || (z - cz).abs() > half)
            .copied()
            .collect();
        for index in stale {
            if let Some(mut chunk) = self.chunks.remove(&index) {
                if chunk.disload(scene, &mut self.pool, assets) {
                    level.nest_spawned = false;
                    log::info!("Nest chunk {:?} streamed out; nest may respawn", index);
                }
                report.unloaded += 1;
            }
        }

        for x in cx - half..=cx + half {
            for z in cz - half..=cz + half {
                if self.chunks.contains_key(&(x, z)) {
                    continue;
                }
                let has_nest = level.nest_allowed()
                    && self.rng.gen_bool(self.settings.nest_chance.clamp(0.0, 1.0));
                if has_nest {
                    level.nest_spawned = true;
                    report.nest_spawned = true;
                }
                self.load_chunk(scene, assets, (x, z), has_nest, true);
                report.loaded += 1;
            }
        }

        if report.loaded > 0 || report.unloaded > 0 {
            log::debug!(
                "Streamed around ({}, {}): +{} -{}, pool {}/{}",
                cx,
                cz,
                report.loaded,
                report.unloaded,
                self.pool.available(),
                self.pool.capacity()
            );
        }
        report
    }

    fn load_chunk(
        &mut self,
        scene: &mut Scene,
        assets: &mut GameAssets,
        index: GridIndex,
        has_nest: bool,
        wants_trees: bool,
    ) {
        let mut chunk = Chunk::new(index, self.settings.chunk_size, has_nest);
        chunk.load(
            scene,
            &mut self.pool,
            assets,
            &self.settings,
            wants_trees,
            &mut self.rng,
        );
        self.chunks.insert(index, chunk);
    }

    /// Attach nest models whose loads have resolved.
    pub fn poll_assets(&mut self, scene: &mut Scene, assets: &mut GameAssets) {
        for chunk in self.chunks.values_mut() {
            chunk.poll_nest_model(scene, assets);
        }
    }

    /// The player reached the nest `node`: remove it and clear the stage's
    /// nest flag. Returns false if no live chunk owns that nest.
    pub fn consume_nest(
        &mut self,
        node: Entity,
        scene: &mut Scene,
        assets: &mut GameAssets,
        level: &mut LevelState,
    ) -> bool {
        let Some(chunk) = self.chunks.values_mut().find(|c| c.owns_nest(node)) else {
            return false;
        };
        chunk.take_nest(scene, assets);
        level.nest_spawned = false;
        true
    }

    /// Remove the target `node` from whichever chunk owns it.
    pub fn remove_target(&mut self, node: Entity, scene: &mut Scene) -> bool {
        self.chunks
            .values_mut()
            .find(|c| c.owns_target(node))
            .is_some_and(|c| c.remove_target(node, scene))
    }

    /// Unload everything, returning all prototypes to the pool.
    pub fn clear(&mut self, scene: &mut Scene, assets: &mut GameAssets) {
        for (_, mut chunk) in self.chunks.drain() {
            chunk.disload(scene, &mut self.pool, assets);
        }
        self.initialized = false;
    }

    #[cfg(test)]
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    #[cfg(test)]
    pub fn pool(&self) -> &TreePool {
        &self.pool
    }

    /// Prototypes currently hanging on live trees.
    #[cfg(test)]
    pub fn attached_prototypes(&self) -> usize {
        self.chunks.values().map(|c| c.trees.len()).sum()
    }

    #[cfg(test)]
    pub fn nest_count(&self) -> usize {
        self.chunks.values().filter(|c| c.nest.is_some()).count()
    }

    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{FileAsset, ModelAsset};
    use crate::config::LevelConfig;
    use physics::PhysicsWorld;
    use rand::SeedableRng;
    use std::path::Path;
    use std::sync::Arc;

    struct Harness {
        scene: Scene,
        assets: GameAssets,
        level: LevelState,
        manager: ChunkManager,
    }

    fn harness(settings: WorldConfig, seed: u64) -> Harness {
        let pool = TreePool::from_models(
            (0..settings.prototype_count).map(|_| Arc::new(ModelAsset::placeholder("tree"))),
        );
        Harness {
            scene: Scene::new(PhysicsWorld::new()),
            assets: GameAssets::new(Path::new("/nonexistent/woodpecker-assets")).unwrap(),
            level: LevelState::new(&LevelConfig::default()),
            manager: ChunkManager::with_pool(settings, pool, StdRng::seed_from_u64(seed)),
        }
    }

    impl Harness {
        fn update(&mut self, position: Vec3) -> StreamingReport {
            self.manager
                .update(&mut self.scene, &mut self.assets, position, &mut self.level)
        }

        fn assert_invariants(&self, position: Vec3) {
            let (cx, cz) = self.manager.center_index(position);
            let half = self.manager.half_window();
            let mut seen = std::collections::HashSet::new();
            for chunk in self.manager.chunks() {
                let (x, z) = chunk.index;
                assert!((x - cx).abs() <= half && (z - cz).abs() <= half);
                assert!(seen.insert(chunk.index), "duplicate {:?}", chunk.index);
            }
            assert_eq!(
                self.manager.pool().available() + self.manager.attached_prototypes(),
                self.manager.pool().capacity()
            );
            assert!(self.manager.nest_count() <= 1);
        }
    }

    #[test]
    fn initial_window_has_tree_less_centre() {
        let mut h = harness(WorldConfig::default(), 1);
        let report = h.update(Vec3::ZERO);
        assert_eq!(report.loaded, 81);
        assert_eq!(h.manager.chunk_count(), 81);
        for chunk in h.manager.chunks() {
            let (x, z) = chunk.index;
            if (-1..=1).contains(&x) && (-1..=1).contains(&z) {
                assert!(chunk.trees.is_empty(), "safe chunk {:?} has trees", chunk.index);
            } else {
                assert!(!chunk.trees.is_empty(), "chunk {:?} has no trees", chunk.index);
            }
            assert!(chunk.nest.is_none());
        }
        h.assert_invariants(Vec3::ZERO);
    }

    #[test]
    fn moving_one_chunk_swaps_a_column() {
        let mut h = harness(WorldConfig::default(), 2);
        h.update(Vec3::ZERO);
        let next = Vec3::new(50.0, 15.0, 0.0);
        let report = h.update(next);

        assert_eq!(report.unloaded, 9);
        assert_eq!(report.loaded, 9);
        assert!(h.manager.chunks().all(|c| c.index.0 != -4));
        assert_eq!(h.manager.chunks().filter(|c| c.index.0 == 5).count(), 9);
        h.assert_invariants(next);
    }

    #[test]
    fn waits_for_prototypes_before_streaming() {
        let mut scene = Scene::new(PhysicsWorld::new());
        let mut assets = GameAssets::new(Path::new("/nonexistent/woodpecker-assets")).unwrap();
        let mut level = LevelState::new(&LevelConfig::default());
        let settings = WorldConfig {
            prototype_count: 40,
            ..Default::default()
        };
        let mut manager = ChunkManager::new(settings, StdRng::seed_from_u64(3));
        manager.request_prototypes(&mut assets).unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !manager.is_ready() {
            assets.poll();
            let report = manager.update(&mut scene, &mut assets, Vec3::ZERO, &mut level);
            if !manager.is_ready() {
                assert_eq!(report, StreamingReport::default());
                assert_eq!(scene.node_count(), 0);
            }
            assert!(std::time::Instant::now() < deadline);
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert_eq!(manager.pool().capacity(), 40);
        assert!(manager.is_initialized());
        assert_eq!(manager.chunk_count(), 81);
    }

    #[test]
    fn at_most_one_nest_while_wandering() {
        let settings = WorldConfig {
            nest_chance: 1.0,
            ..Default::default()
        };
        let mut h = harness(settings, 4);
        h.level.total_duration = 1_000.0;
        h.update(Vec3::ZERO);
        assert_eq!(h.manager.nest_count(), 0);

        let mut position = Vec3::ZERO;
        for step in 0..60 {
            // Wander far enough for nest chunks to stream out and respawn.
            let dir = if (step / 15) % 2 == 0 { Vec3::X } else { Vec3::Z };
            position += dir * 50.0;
            h.update(position);
            h.assert_invariants(position);
            assert_eq!(h.level.nest_spawned, h.manager.nest_count() == 1);
        }
    }

    #[test]
    fn nest_respects_time_stage() {
        let settings = WorldConfig {
            nest_chance: 1.0,
            ..Default::default()
        };
        let mut h = harness(settings, 5);
        h.update(Vec3::ZERO);
        h.update(Vec3::new(50.0, 0.0, 0.0));
        assert_eq!(h.manager.nest_count(), 0);

        h.level.total_duration = 31.0;
        let report = h.update(Vec3::new(100.0, 0.0, 0.0));
        assert!(report.nest_spawned);
        assert_eq!(h.manager.nest_count(), 1);
    }

    #[test]
    fn consuming_nest_clears_flag_once() {
        let settings = WorldConfig {
            nest_chance: 1.0,
            ..Default::default()
        };
        let mut h = harness(settings, 6);
        h.level.total_duration = 1_000.0;
        h.update(Vec3::ZERO);
        h.update(Vec3::new(50.0, 0.0, 0.0));
        let nest = h
            .manager
            .chunks()
            .find_map(|c| c.nest.as_ref().map(|n| n.node))
            .expect("a nest chunk streamed in");

        assert!(h
            .manager
            .consume_nest(nest, &mut h.scene, &mut h.assets, &mut h.level));
        assert!(!h.level.nest_spawned);
        assert_eq!(h.manager.nest_count(), 0);
        assert!(!h.scene.contains(nest));

        // Taking it again finds nothing, and streaming its chunk out later
        // does not touch the flag.
        assert!(!h
            .manager
            .consume_nest(nest, &mut h.scene, &mut h.assets, &mut h.level));
        h.level.nest_spawned = true;
        h.update(Vec3::new(-1_000.0, 0.0, 0.0));
        assert!(h.level.nest_spawned);
        h.assert_invariants(Vec3::new(-1_000.0, 0.0, 0.0));
    }

    #[test]
    fn clear_returns_every_prototype() {
        let mut h = harness(WorldConfig::default(), 7);
        h.update(Vec3::ZERO);
        h.manager.clear(&mut h.scene, &mut h.assets);
        assert_eq!(h.manager.chunk_count(), 0);
        assert_eq!(h.manager.pool().available(), h.manager.pool().capacity());
        assert_eq!(h.scene.node_count(), 0);
    }
}
