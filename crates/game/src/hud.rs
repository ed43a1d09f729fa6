//! HUD: health, score, clock, level and mini-game prompts.
//! There is no overlay renderer, so the HUD line is shown in the window title
//! and transitions go to the log.

use crate::level::LevelState;
use crate::minigame::PeckKey;
use crate::state::{GameMessage, GameMessages, GamePhase, MessageKind};
use crate::woodpecker::{ColorCue, PlayerMode, Woodpecker};

/// Seconds the damage vignette stays up.
const VIGNETTE_TIME: f32 = 0.4;

/// HUD configuration
#[derive(Debug, Clone)]
pub struct HUDConfig {
    pub show_clock: bool,
    pub show_preview: bool,
    pub show_fps: bool,
}

impl Default for HUDConfig {
    fn default() -> Self {
        Self {
            show_clock: true,
            show_preview: true,
            show_fps: false,
        }
    }
}

/// All HUD data for a frame
#[derive(Debug, Clone, PartialEq)]
pub struct HUDData {
    pub phase: GamePhase,
    pub health: f32,
    pub max_health: f32,
    pub score: u32,
    pub time_survived: String,
    /// One-based level number.
    pub level: usize,
    /// Loading progress, 0..1.
    pub loading: f32,
    /// Upcoming mini-game keys, next first.
    pub preview: Vec<PeckKey>,
    pub in_mini_game: bool,
    /// Damage vignette strength, 0..1.
    pub vignette: f32,
    /// The bird is tinted while it recoils from scenery.
    pub damaged: bool,
    /// Hawk wing flaps audible.
    pub hawk_near: bool,
    pub message: Option<String>,
    pub fps: f32,
}

impl HUDData {
    /// Overlay text for the non-playing phases.
    pub fn overlay(&self) -> Option<String> {
        match self.phase {
            GamePhase::Loading => Some(format!("Loading {:.0}%", self.loading * 100.0)),
            GamePhase::Start => Some("Press Space to start".to_string()),
            GamePhase::Won => Some(format!("You found every nest! Score {}. Space to play again", self.score)),
            GamePhase::GameOver => Some(format!("Game over. Score {}. Space to play again", self.score)),
            GamePhase::Playing => None,
        }
    }

    /// Single-line rendering used as the window title.
    pub fn title(&self, config: &HUDConfig) -> String {
        if let Some(overlay) = self.overlay() {
            return format!("Woodpecker | {}", overlay);
        }
        let mut parts = vec![
            format!("HP {:.0}%", 100.0 * self.health / self.max_health.max(1.0)),
            format!("Score {}", self.score),
            format!("Level {}", self.level),
        ];
        if config.show_clock {
            parts.push(self.time_survived.clone());
        }
        if self.in_mini_game && config.show_preview && !self.preview.is_empty() {
            let keys: String = self.preview.iter().map(|k| k.symbol()).collect();
            parts.push(format!("Peck {} (E to leave)", keys));
        }
        if self.vignette > 0.0 || self.damaged {
            parts.push("OUCH".to_string());
        }
        if self.hawk_near {
            parts.push("Hawk!".to_string());
        }
        if let Some(message) = &self.message {
            parts.push(message.clone());
        }
        if config.show_fps {
            parts.push(format!("{:.0} fps", self.fps));
        }
        format!("Woodpecker | {}", parts.join(" | "))
    }
}

/// `mm:ss` clock.
pub fn format_time(seconds: f32) -> String {
    let total = seconds.max(0.0) as u32;
    format!("{:02}:{:02}", total / 60, total % 60)
}

fn message_line(message: &GameMessage) -> String {
    match message.kind {
        MessageKind::Warning => format!("! {}", message.text),
        MessageKind::Info | MessageKind::Success => message.text.clone(),
    }
}

/// HUD system that generates display data
pub struct HUDSystem {
    pub config: HUDConfig,
    pub messages: GameMessages,
    vignette_timer: f32,
    last_phase: Option<GamePhase>,
    last_mode: Option<PlayerMode>,
}

impl Default for HUDSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl HUDSystem {
    pub fn new() -> Self {
        Self {
            config: HUDConfig::default(),
            messages: GameMessages::new(),
            vignette_timer: 0.0,
            last_phase: None,
            last_mode: None,
        }
    }

    /// Start the damage vignette.
    pub fn flash_vignette(&mut self) {
        self.vignette_timer = VIGNETTE_TIME;
    }

    /// Tick timers and announce phase / mode changes.
    pub fn update(&mut self, dt: f32, phase: GamePhase, mode: PlayerMode) {
        self.vignette_timer = (self.vignette_timer - dt).max(0.0);
        self.messages.update(dt);

        if self.last_phase != Some(phase) {
            match phase {
                GamePhase::Start => self.messages.info("Ready. Press Space to start"),
                GamePhase::Playing => self.messages.info("Find the nest before the hawk finds you"),
                GamePhase::Won => self.messages.success("Every nest found"),
                GamePhase::GameOver => self.messages.warning("The woodpecker is out of strength"),
                GamePhase::Loading => {}
            }
            self.last_phase = Some(phase);
        }
        if self.last_mode != Some(mode) {
            if mode == PlayerMode::PlayingMiniGame {
                self.messages.info("Peck the keys shown");
            }
            self.last_mode = Some(mode);
        }
    }

    /// Generate HUD data from game state
    pub fn generate_hud_data(
        &self,
        phase: GamePhase,
        woodpecker: &Woodpecker,
        level: &LevelState,
        loading: f32,
        hawk_near: bool,
        fps: f32,
    ) -> HUDData {
        HUDData {
            phase,
            health: woodpecker.health.current,
            max_health: woodpecker.health.max,
            score: level.score,
            time_survived: format_time(level.total_duration),
            level: level.level_stage + 1,
            loading,
            preview: woodpecker.preview(),
            in_mini_game: woodpecker.mode() == PlayerMode::PlayingMiniGame,
            vignette: self.vignette_timer / VIGNETTE_TIME,
            damaged: woodpecker.color_cue() == ColorCue::Damaged,
            hawk_near,
            message: self.messages.visible().last().map(message_line),
            fps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LevelConfig, WoodpeckerConfig};
    use std::time::Duration;

    fn data(phase: GamePhase) -> HUDData {
        let hud = HUDSystem::new();
        let bird = Woodpecker::new(WoodpeckerConfig::default(), Duration::ZERO);
        let level = LevelState::new(&LevelConfig::default());
        hud.generate_hud_data(phase, &bird, &level, 0.25, false, 60.0)
    }

    #[test]
    fn clock_formats_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(83.9), "01:23");
        assert_eq!(format_time(-4.0), "00:00");
    }

    #[test]
    fn overlays_per_phase() {
        assert_eq!(data(GamePhase::Loading).overlay().as_deref(), Some("Loading 25%"));
        assert!(data(GamePhase::Start).overlay().is_some_and(|s| s.contains("Space")));
        assert!(data(GamePhase::Playing).overlay().is_none());
    }

    #[test]
    fn playing_title_lists_stats() {
        let title = data(GamePhase::Playing).title(&HUDConfig::default());
        assert!(title.contains("HP 100%"));
        assert!(title.contains("Score 0"));
        assert!(title.contains("Level 1"));
        assert!(title.contains("00:00"));
    }

    #[test]
    fn vignette_fades() {
        let mut hud = HUDSystem::new();
        hud.flash_vignette();
        hud.update(0.2, GamePhase::Playing, PlayerMode::Flying);
        assert!(hud.vignette_timer > 0.0);
        hud.update(0.3, GamePhase::Playing, PlayerMode::Flying);
        assert_eq!(hud.vignette_timer, 0.0);
    }

    #[test]
    fn phase_change_posts_message() {
        let mut hud = HUDSystem::new();
        hud.update(0.0, GamePhase::GameOver, PlayerMode::Flying);
        assert_eq!(hud.messages.messages.len(), 1);
        hud.update(0.0, GamePhase::GameOver, PlayerMode::Flying);
        assert_eq!(hud.messages.messages.len(), 1);

        let bird = Woodpecker::new(WoodpeckerConfig::default(), Duration::ZERO);
        let level = LevelState::new(&LevelConfig::default());
        let data = hud.generate_hud_data(GamePhase::GameOver, &bird, &level, 1.0, false, 60.0);
        assert_eq!(data.message.as_deref(), Some("! The woodpecker is out of strength"));
    }
}
