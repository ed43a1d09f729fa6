//! Level progression: stage, nest gating, score and outcome.

use crate::config::LevelConfig;

/// Highest level stage; reaching a nest here wins the game.
pub const MAX_STAGE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Playing,
    Won,
    GameOver,
}

/// Shared level flags, owned by the frame orchestrator and lent to the
/// systems that read or flip them.
#[derive(Debug, Clone)]
pub struct LevelState {
    pub level_stage: usize,
    /// Seconds of total play before a nest may spawn in each stage.
    pub time_stages: [f32; 5],
    /// A nest exists in the streaming window for the current stage.
    pub nest_spawned: bool,
    pub score: u32,
    /// Seconds of play so far.
    pub total_duration: f32,
    pub outcome: Outcome,
    nest_score: u32,
}

impl LevelState {
    pub fn new(config: &LevelConfig) -> Self {
        Self {
            level_stage: 0,
            time_stages: config.time_stages,
            nest_spawned: false,
            score: 0,
            total_duration: 0.0,
            outcome: Outcome::Playing,
            nest_score: config.nest_score,
        }
    }

    /// Whether a nest chunk may be created right now.
    pub fn nest_allowed(&self) -> bool {
        !self.nest_spawned
            && self.outcome == Outcome::Playing
            && self.time_stages[self.level_stage.min(MAX_STAGE)] < self.total_duration
    }

    /// Count play time.
    pub fn tick(&mut self, dt: f32) {
        if self.outcome == Outcome::Playing {
            self.total_duration += dt;
        }
    }

    pub fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    /// The player reached the nest: bank the score and move to the next
    /// stage, or win at the last one. Returns the new outcome.
    pub fn advance(&mut self) -> Outcome {
        if self.outcome != Outcome::Playing {
            return self.outcome;
        }
        self.add_score(self.nest_score);
        if self.level_stage >= MAX_STAGE {
            self.outcome = Outcome::Won;
            log::info!("Final nest reached, score {}", self.score);
        } else {
            self.level_stage += 1;
            log::info!("Nest reached, advancing to stage {}", self.level_stage);
        }
        self.outcome
    }

    pub fn game_over(&mut self) {
        if self.outcome == Outcome::Playing {
            log::info!("Game over after {:.1}s, score {}", self.total_duration, self.score);
            self.outcome = Outcome::GameOver;
        }
    }
}
