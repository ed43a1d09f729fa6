//! One run of the game: scene, streaming, both birds and the level. Replay
//! throws the whole session away and builds a fresh one.

use std::time::Duration;

use engine_core::Vec3;
use physics::{ColliderHandle, PhysicsWorld, RigidBodyHandle};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::assets::GameAssets;
use crate::chunk_manager::ChunkManager;
use crate::config::GameConfig;
use crate::error::GameError;
use crate::hawk::Hawk;
use crate::level::LevelState;
use crate::scene::Scene;
use crate::woodpecker::{BodyCommand, Woodpecker};

/// Physics step length, seconds.
pub const FIXED_STEP: f32 = 1.0 / 120.0;

pub struct Session {
    pub scene: Scene,
    pub chunks: ChunkManager,
    pub woodpecker: Woodpecker,
    pub hawk: Hawk,
    pub level: LevelState,
    pub player_body: RigidBodyHandle,
    pub player_collider: ColliderHandle,
    pub rng: StdRng,
}

impl Session {
    /// Fresh session that streams once the tree prototypes have loaded.
    pub fn new(config: &GameConfig, assets: &mut GameAssets, seed: u64, now: Duration) -> Result<Self, GameError> {
        let chunks = ChunkManager::new(config.world.clone(), StdRng::seed_from_u64(seed));
        let mut session = Self::build(config, chunks, seed, now);
        session.chunks.request_prototypes(assets)?;
        Ok(session)
    }

    /// Session over an already filled tree pool; streams on the first update.
    #[cfg(test)]
    pub fn with_pool(config: &GameConfig, pool: crate::pool::TreePool, seed: u64, now: Duration) -> Self {
        let chunks = ChunkManager::with_pool(config.world.clone(), pool, StdRng::seed_from_u64(seed));
        Self::build(config, chunks, seed, now)
    }

    fn build(config: &GameConfig, chunks: ChunkManager, seed: u64, now: Duration) -> Self {
        let mut physics = PhysicsWorld::new();
        physics.set_timestep(FIXED_STEP);
        let start = Vec3::from(config.woodpecker.start_position);
        let (player_body, player_collider) = physics.add_player_ball(start, config.woodpecker.radius);

        log::info!("New session, seed {}", seed);
        Self {
            scene: Scene::new(physics),
            chunks,
            woodpecker: Woodpecker::new(config.woodpecker.clone(), now),
            hawk: Hawk::new(config.hawk.clone()),
            level: LevelState::new(&config.level),
            player_body,
            player_collider,
            // Separate stream from the chunk manager's.
            rng: StdRng::seed_from_u64(seed.rotate_left(17) ^ 0x5eed),
        }
    }

    pub fn player_position(&self) -> Vec3 {
        self.woodpecker.transform.position
    }

    /// Apply the woodpecker's request to its rigid body.
    pub fn apply_body(&mut self, command: BodyCommand) {
        let physics = &mut self.scene.physics;
        match command {
            BodyCommand::Teleport(pose) => {
                physics.set_body_pose(self.player_body, &pose);
                physics.set_linear_velocity(self.player_body, Vec3::ZERO);
            }
            BodyCommand::Velocity(velocity) => physics.set_linear_velocity(self.player_body, velocity),
        }
    }

    /// Pull the player's position back from physics, keeping the
    /// woodpecker's own orientation.
    pub fn sync_player(&mut self) {
        if let Some(body) = self.scene.physics.get_body_transform(self.player_body) {
            self.woodpecker.transform.position = body.position;
        }
    }

    /// Release everything the session holds in the asset loader.
    pub fn teardown(&mut self, assets: &mut GameAssets) {
        self.chunks.clear(&mut self.scene, assets);
    }
}
