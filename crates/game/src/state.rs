//! Game phase and the on-screen message log.

/// Top-level phase of the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Tree prototypes still loading.
    Loading,
    /// Title overlay, waiting for Space.
    Start,
    Playing,
    Won,
    GameOver,
}

// ── Game Messages ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
}

/// Short-lived message shown in the HUD line.
#[derive(Debug, Clone)]
pub struct GameMessage {
    pub text: String,
    pub kind: MessageKind,
    pub time_remaining: f32,
}

/// Message log. Every message is also written to the log.
pub struct GameMessages {
    pub messages: Vec<GameMessage>,
    pub max_visible: usize,
    default_duration: f32,
}

impl Default for GameMessages {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMessages {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            max_visible: 1,
            default_duration: 3.0,
        }
    }

    pub fn push(&mut self, text: impl Into<String>, kind: MessageKind) {
        let text = text.into();
        match kind {
            MessageKind::Warning => log::warn!("{}", text),
            _ => log::info!("{}", text),
        }
        self.messages.push(GameMessage {
            text,
            kind,
            time_remaining: self.default_duration,
        });
        if self.messages.len() > 50 {
            self.messages.remove(0);
        }
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(text, MessageKind::Info);
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push(text, MessageKind::Success);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(text, MessageKind::Warning);
    }

    /// Newest messages still on screen, newest last.
    pub fn visible(&self) -> impl Iterator<Item = &GameMessage> {
        let skip = self.messages.len().saturating_sub(self.max_visible);
        self.messages.iter().skip(skip)
    }

    pub fn update(&mut self, dt: f32) {
        for msg in &mut self.messages {
            msg.time_remaining -= dt;
        }
        self.messages.retain(|m| m.time_remaining > 0.0);
    }
}
