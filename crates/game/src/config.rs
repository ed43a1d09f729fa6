//! Game configuration (window, world, birds, level pacing). Loaded from config.ron at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::GameError;

/// Persistent game settings. Loaded from `config.ron` in the current directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Window width in logical pixels.
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    /// Window height in logical pixels.
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    /// Fixed RNG seed; a random one is drawn when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Root directory the model and texture paths are resolved against.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub hawk: HawkConfig,
    #[serde(default)]
    pub woodpecker: WoodpeckerConfig,
    #[serde(default)]
    pub level: LevelConfig,
}

fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}
fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            seed: None,
            assets_dir: default_assets_dir(),
            world: WorldConfig::default(),
            hawk: HawkConfig::default(),
            woodpecker: WoodpeckerConfig::default(),
            level: LevelConfig::default(),
        }
    }
}

/// Streaming grid and forest density.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Side of a chunk cell in world units.
    pub chunk_size: f32,
    /// Side of the streaming window in chunks. Must be odd.
    pub total_chunk_length: usize,
    /// Tree prototypes loaded into the pool before streaming starts.
    pub prototype_count: usize,
    pub min_trees_per_chunk: usize,
    pub max_trees_per_chunk: usize,
    /// Chance a placed tree carries a target.
    pub target_chance: f64,
    /// Chance a newly streamed chunk is a nest chunk (when a nest is allowed).
    pub nest_chance: f64,
    /// Target heights, world units above ground.
    pub target_height_min: f32,
    pub target_height_max: f32,
    /// Chebyshev radius (in chunks) of the tree-less area around the start.
    pub safe_zone_radius: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50.0,
            total_chunk_length: 9,
            prototype_count: 320,
            min_trees_per_chunk: 2,
            max_trees_per_chunk: 3,
            target_chance: 0.05,
            nest_chance: 0.01,
            target_height_min: 7.0,
            target_height_max: 14.0,
            safe_zone_radius: 1,
        }
    }
}

/// Pursuer tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HawkConfig {
    pub start_position: [f32; 3],
    /// Turn rate limit in rad/s.
    pub rotate_speed: f32,
    /// Turn rate limit when close with a clear line of sight.
    pub close_rotate_speed: f32,
    pub close_range: f32,
    /// Distance at which the hawk strikes.
    pub strike_range: f32,
    /// Beyond this distance the hawk slows down and stops flapping.
    pub disengage_range: f32,
    pub disengage_factor: f32,
    /// Furthest obstacle the avoidance rays care about.
    pub max_ray_distance: f32,
    /// Gap kept between an obstacle hit and the target before it counts as blocking.
    pub clearance: f32,
    pub ray_step_degrees: f32,
    pub max_rays_per_side: u32,
    /// Cruise speed per level stage.
    pub level_speeds: [f32; 5],
}

impl Default for HawkConfig {
    fn default() -> Self {
        Self {
            start_position: [100.0, 12.0, 0.0],
            rotate_speed: 20.0,
            close_rotate_speed: 50.0,
            close_range: 10.0,
            strike_range: 2.0,
            disengage_range: 200.0,
            disengage_factor: 1.25,
            max_ray_distance: 50.0,
            clearance: 2.0,
            ray_step_degrees: 5.0,
            max_rays_per_side: 36,
            level_speeds: [10.0, 12.0, 14.0, 16.0, 18.0],
        }
    }
}

/// Player flight, recoil, health and mini-game tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WoodpeckerConfig {
    pub start_position: [f32; 3],
    /// Radius of the player's collision ball.
    pub radius: f32,
    pub max_speed: f32,
    /// Fraction of max speed gained per second.
    pub acceleration: f32,
    /// While turning, speed is capped at `max_speed / turn_speed_divisor`.
    pub turn_speed_divisor: f32,
    /// Upper bound of every turn channel, rad/s.
    pub max_turn_rate: f32,
    /// Rate a released channel decays to, rad/s.
    pub min_turn_rate: f32,
    pub yaw_acceleration: f32,
    pub pitch_up_acceleration: f32,
    pub pitch_down_acceleration: f32,
    pub turn_deceleration: f32,
    pub recoil_ms: u64,
    /// Bounce speed is `speed / bounce_divisor`.
    pub bounce_divisor: f32,
    pub transition_ms: u64,
    /// Passive health decay interval per level stage.
    pub decay_intervals_ms: [u64; 5],
    /// Health per matched key, multiplied by `stage + 1`.
    pub key_reward: f32,
    pub miss_penalty: f32,
    pub completion_heal: f32,
    pub min_sequence: usize,
    pub max_sequence: usize,
}

impl Default for WoodpeckerConfig {
    fn default() -> Self {
        Self {
            start_position: [0.0, 15.0, 0.0],
            radius: 0.25,
            max_speed: 30.0,
            acceleration: 0.5,
            turn_speed_divisor: 1.5,
            max_turn_rate: 1.25,
            min_turn_rate: 0.4,
            yaw_acceleration: 3.0,
            pitch_up_acceleration: 2.0,
            pitch_down_acceleration: 2.5,
            turn_deceleration: 5.0,
            recoil_ms: 500,
            bounce_divisor: 4.0,
            transition_ms: 1000,
            decay_intervals_ms: [3000, 2400, 1800, 1200, 600],
            key_reward: 0.5,
            miss_penalty: 1.0,
            completion_heal: 20.0,
            min_sequence: 10,
            max_sequence: 20,
        }
    }
}

/// Level pacing and scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Seconds of play before a nest may spawn in each stage.
    pub time_stages: [f32; 5],
    pub nest_score: u32,
    pub completion_score: u32,
    pub key_score: u32,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            time_stages: [30.0, 70.0, 110.0, 150.0, 190.0],
            nest_score: 50,
            completion_score: 10,
            key_score: 1,
        }
    }
}

impl GameConfig {
    /// Load config from `config.ron`. If the file is missing or invalid, returns default config.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    /// Load config from `path`, falling back to defaults on any problem.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => match Self::from_ron(&data) {
                Ok(c) => {
                    log::info!("Loaded config from {:?}", path);
                    return c;
                }
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {:?}, using defaults", path);
            }
            Err(e) => log::warn!("Could not read config at {:?}: {}, using defaults", path, e),
        }
        Self::default()
    }

    /// Parse and validate a RON document.
    pub fn from_ron(data: &str) -> Result<Self, GameError> {
        let config: Self = ron::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the streaming and mini-game code cannot work with.
    pub fn validate(&self) -> Result<(), GameError> {
        let world = &self.world;
        if world.total_chunk_length % 2 == 0 {
            return Err(GameError::InvalidConfig(format!(
                "world.total_chunk_length must be odd, got {}",
                world.total_chunk_length
            )));
        }
        if world.chunk_size <= 0.0 {
            return Err(GameError::InvalidConfig(format!(
                "world.chunk_size must be positive, got {}",
                world.chunk_size
            )));
        }
        if world.min_trees_per_chunk > world.max_trees_per_chunk {
            return Err(GameError::InvalidConfig(
                "world.min_trees_per_chunk exceeds max_trees_per_chunk".into(),
            ));
        }
        let wp = &self.woodpecker;
        if wp.min_sequence == 0 || wp.min_sequence > wp.max_sequence {
            return Err(GameError::InvalidConfig(format!(
                "woodpecker sequence range {}..={} is empty",
                wp.min_sequence, wp.max_sequence
            )));
        }
        Ok(())
    }

    /// Save current config to `config.ron` and return where it went.
    pub fn save(&self) -> Result<PathBuf, GameError> {
        let path = config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), GameError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        std::fs::write(path, text)?;
        log::info!("Saved config to {:?}", path);
        Ok(())
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("config.ron")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_fills_defaults() {
        let config = GameConfig::from_ron("(seed: Some(42), world: (nest_chance: 1.0))").unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.world.nest_chance, 1.0);
        assert_eq!(config.world.chunk_size, 50.0);
        assert_eq!(config.hawk.level_speeds, [10.0, 12.0, 14.0, 16.0, 18.0]);
        assert_eq!(config.window_width, 1280);
    }

    #[test]
    fn even_window_is_rejected() {
        let err = GameConfig::from_ron("(world: (total_chunk_length: 8))").unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig(_)));
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = GameConfig::from_ron("(world: (chunk_size: \"big\"))").unwrap_err();
        assert!(matches!(err, GameError::Config(_)));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = GameConfig::load_from(Path::new("/nonexistent/woodpecker/config.ron"));
        assert_eq!(config.world.total_chunk_length, 9);
    }

    #[test]
    fn saved_config_loads_back() {
        let path = std::env::temp_dir().join(format!("woodpecker-config-{}.ron", std::process::id()));
        let config = GameConfig {
            seed: Some(7),
            ..GameConfig::default()
        };
        config.save_to(&path).unwrap();
        let back = GameConfig::load_from(&path);
        assert_eq!(back.seed, Some(7));
        assert_eq!(back.woodpecker.decay_intervals_ms, [3000, 2400, 1800, 1200, 600]);
        std::fs::remove_file(path).ok();
    }
}
