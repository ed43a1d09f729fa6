//! The player bird: flight, collision recoil, health, and the pecking
//! mini-game with its timed camera transitions.
//!
//! The state machine never touches physics directly. Each update returns a
//! [`PlayerUpdate`] whose [`BodyCommand`] the orchestrator applies to the
//! player's rigid body, plus an optional [`PlayerMessage`] for the frame loop.

use std::f32::consts::FRAC_PI_2;
use std::time::Duration;

use engine_core::{progress, Health, Quat, Transform, Vec3};
use hecs::Entity;
use input::InputState;
use rand::Rng;

use crate::camera::CameraRig;
use crate::config::WoodpeckerConfig;
use crate::level::MAX_STAGE;
use crate::minigame::{PeckKey, PeckOutcome, PeckSequence};

const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;
/// Distance the bird perches in front of a target.
const PERCH_DISTANCE: f32 = 2.0;
const PREVIEW_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerMode {
    Flying,
    EnteringMiniGame,
    PlayingMiniGame,
    ExitingMiniGame,
}

/// Signals for the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerMessage {
    /// The mini-game is over; unpause physics.
    ResumeSimulation,
}

/// What the orchestrator should do to the player's rigid body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyCommand {
    /// Place the body at this pose and zero its velocity.
    Teleport(Transform),
    /// Let the body drift with this velocity.
    Velocity(Vec3),
}

/// Visual state of the bird's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorCue {
    Normal,
    Damaged,
}

/// Input sampled once per frame.
#[derive(Debug, Clone, Default)]
pub struct PlayerInput {
    pub yaw_left: bool,
    pub yaw_right: bool,
    pub pitch_up: bool,
    pub pitch_down: bool,
    /// Peck keys pressed this frame.
    pub pecks: Vec<PeckKey>,
    pub exit: bool,
}

impl PlayerInput {
    pub fn sample(input: &InputState) -> Self {
        Self {
            yaw_left: input.is_key_held(PeckKey::A.key_code()),
            yaw_right: input.is_key_held(PeckKey::D.key_code()),
            pitch_up: input.is_key_held(PeckKey::W.key_code()),
            pitch_down: input.is_key_held(PeckKey::S.key_code()),
            pecks: PeckKey::ALL
                .into_iter()
                .filter(|k| input.is_key_pressed(k.key_code()))
                .collect(),
            exit: input.is_exit_pressed(),
        }
    }
}

/// Per-frame context from the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct PlayerContext {
    /// Game clock.
    pub now: Duration,
    pub dt: f32,
    pub stage: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PlayerUpdate {
    pub body: Option<BodyCommand>,
    pub message: Option<PlayerMessage>,
    /// Mini-game keys matched this frame.
    pub keys_hit: u32,
    pub missed: bool,
    /// The sequence was cleared this frame.
    pub completed: bool,
    /// Target whose mini-game just ended; remove it from the world.
    pub finished_target: Option<Entity>,
}

/// One steering axis. Its rate climbs while the key is held and sinks back
/// toward a floor once released.
#[derive(Debug, Clone, Copy)]
struct TurnChannel {
    rate: f32,
    acceleration: f32,
}

impl TurnChannel {
    fn new(acceleration: f32, floor: f32) -> Self {
        Self {
            rate: floor,
            acceleration,
        }
    }

    /// Angular velocity contributed this frame.
    fn step(&mut self, held: bool, dt: f32, settings: &WoodpeckerConfig) -> f32 {
        if held {
            self.rate = (self.rate + self.acceleration * dt).min(settings.max_turn_rate);
            self.rate
        } else {
            self.rate = (self.rate - settings.turn_deceleration * dt).max(settings.min_turn_rate);
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    start: Duration,
    from: Transform,
    to: Transform,
}

pub struct Woodpecker {
    pub transform: Transform,
    pub health: Health,
    yaw: f32,
    pitch: f32,
    speed: f32,
    mode: PlayerMode,
    yaw_left: TurnChannel,
    yaw_right: TurnChannel,
    pitch_up: TurnChannel,
    pitch_down: TurnChannel,
    recoil_until: Option<Duration>,
    bounce_velocity: Vec3,
    recovering: bool,
    transition: Option<Transition>,
    camera: CameraRig,
    sequence: PeckSequence,
    target: Option<Entity>,
    last_decay: Duration,
    color: ColorCue,
    vignette: bool,
    settings: WoodpeckerConfig,
}

impl Woodpecker {
    pub fn new(settings: WoodpeckerConfig, now: Duration) -> Self {
        let transform = Transform::from_position(Vec3::from(settings.start_position));
        let floor = settings.min_turn_rate;
        Self {
            transform,
            health: Health::new(100.0),
            yaw: 0.0,
            pitch: 0.0,
            speed: 0.0,
            mode: PlayerMode::Flying,
            yaw_left: TurnChannel::new(settings.yaw_acceleration, floor),
            yaw_right: TurnChannel::new(settings.yaw_acceleration, floor),
            pitch_up: TurnChannel::new(settings.pitch_up_acceleration, floor),
            pitch_down: TurnChannel::new(settings.pitch_down_acceleration, floor),
            recoil_until: None,
            bounce_velocity: Vec3::ZERO,
            recovering: false,
            transition: None,
            camera: CameraRig::follow(&transform),
            sequence: PeckSequence::default(),
            target: None,
            last_decay: now,
            color: ColorCue::Normal,
            vignette: false,
            settings,
        }
    }

    pub fn mode(&self) -> PlayerMode {
        self.mode
    }

    #[cfg(test)]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    #[cfg(test)]
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    #[cfg(test)]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn camera(&self) -> CameraRig {
        self.camera
    }

    pub fn color_cue(&self) -> ColorCue {
        self.color
    }

    pub fn is_dead(&self) -> bool {
        self.health.is_dead()
    }

    #[cfg(test)]
    pub fn sequence_len(&self) -> usize {
        self.sequence.len()
    }

    /// Next keys to press, next one first.
    pub fn preview(&self) -> Vec<PeckKey> {
        self.sequence.preview(PREVIEW_LEN)
    }

    /// Return and clear the screen-vignette flag.
    pub fn take_vignette(&mut self) -> bool {
        std::mem::take(&mut self.vignette)
    }

    /// Current speed cap: lower when hurt and when pitched steeply.
    pub fn max_speed(&self) -> f32 {
        let health_factor = 0.6 + 0.4 * self.health.percentage();
        let pitch_factor = 1.0 - 0.5 * self.pitch.sin().abs();
        self.settings.max_speed * health_factor * pitch_factor
    }

    /// Positive amounts damage, negative heal. Health stays in `[0, 100]`.
    pub fn take_damage(&mut self, amount: f32, show_effect: bool) {
        self.health.apply(amount);
        if amount > 0.0 && show_effect {
            self.vignette = true;
        }
    }

    /// Bounce to apply when hitting scenery: back along the body axis.
    pub fn bounce_velocity(&self) -> Vec3 {
        self.transform.facing() * self.speed / self.settings.bounce_divisor
    }

    /// The bird hit scenery. Starts the recoil window while flying.
    pub fn on_scenery_collision(&mut self, now: Duration, bounce: Vec3) {
        if self.mode != PlayerMode::Flying {
            return;
        }
        self.recoil_until = Some(now + Duration::from_millis(self.settings.recoil_ms));
        self.bounce_velocity = bounce;
        self.recovering = true;
        log::debug!("Scenery collision at speed {:.1}", self.speed);
    }

    /// The bird touched a target: perch in front of it and start the game.
    /// Ignored unless flying.
    pub fn enter_mini_game(&mut self, target_transform: Transform, target: Entity, now: Duration) -> bool {
        if self.mode != PlayerMode::Flying {
            return false;
        }
        let goal_rotation = (target_transform.rotation * Quat::from_rotation_x(-FRAC_PI_2)).normalize();
        let goal_position = target_transform.position + goal_rotation * Vec3::Z * PERCH_DISTANCE;
        self.transition = Some(Transition {
            start: now,
            from: self.transform,
            to: Transform::from_position_rotation(goal_position, goal_rotation),
        });
        self.target = Some(target);
        self.mode = PlayerMode::EnteringMiniGame;
        self.speed = 0.0;
        self.recoil_until = None;
        self.recovering = false;
        self.color = ColorCue::Normal;
        log::info!("Entering mini-game at {:?}", goal_position);
        true
    }

    pub fn update<R: Rng>(&mut self, ctx: &PlayerContext, input: &PlayerInput, rng: &mut R) -> PlayerUpdate {
        let mut out = PlayerUpdate::default();
        match self.mode {
            PlayerMode::Flying => self.fly(ctx, input, &mut out),
            PlayerMode::EnteringMiniGame => self.interpolate_enter(ctx, rng, &mut out),
            PlayerMode::PlayingMiniGame => self.play(ctx, input, &mut out),
            PlayerMode::ExitingMiniGame => self.interpolate_exit(ctx, &mut out),
        }
        self.decay(ctx);
        out
    }

    /// One point of health per interval, on a fixed cadence. After a gap
    /// of two intervals or more the cadence restarts from `now` instead of
    /// paying off the backlog.
    fn decay(&mut self, ctx: &PlayerContext) {
        let interval = Duration::from_millis(self.settings.decay_intervals_ms[ctx.stage.min(MAX_STAGE)]);
        let behind = ctx.now.saturating_sub(self.last_decay);
        if behind >= interval {
            self.take_damage(1.0, false);
            self.last_decay = if behind >= interval * 2 {
                ctx.now
            } else {
                self.last_decay + interval
            };
        }
    }

    fn fly(&mut self, ctx: &PlayerContext, input: &PlayerInput, out: &mut PlayerUpdate) {
        let dt = ctx.dt;
        let settings = &self.settings;
        let yaw_rate = self.yaw_left.step(input.yaw_left, dt, settings)
            - self.yaw_right.step(input.yaw_right, dt, settings);
        let pitch_rate = self.pitch_up.step(input.pitch_up, dt, settings)
            - self.pitch_down.step(input.pitch_down, dt, settings);
        self.yaw += yaw_rate * dt;
        self.pitch = (self.pitch + pitch_rate * dt).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.transform.rotation = Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch);

        let recoiling = self.recoil_until.is_some_and(|until| ctx.now < until);
        if recoiling {
            self.color = ColorCue::Damaged;
            out.body = Some(BodyCommand::Velocity(self.bounce_velocity));
        } else {
            self.recoil_until = None;
            let max = self.max_speed();
            if input.yaw_left || input.yaw_right {
                self.speed = self.speed.min(max / self.settings.turn_speed_divisor);
            }
            if self.recovering {
                self.speed = 0.0;
                self.recovering = false;
            }
            self.speed = (self.speed + self.settings.max_speed * self.settings.acceleration * dt).min(max);

            let forward = self.transform.forward();
            self.transform.translate(forward * self.speed * dt);
            self.color = ColorCue::Normal;
            out.body = Some(BodyCommand::Teleport(self.transform));
        }
        self.camera = CameraRig::follow(&self.transform);
    }

    fn transition_progress(&self, now: Duration) -> f32 {
        match self.transition {
            Some(t) => progress(now, t.start, Duration::from_millis(self.settings.transition_ms)),
            None => 1.0,
        }
    }

    fn interpolate_enter<R: Rng>(&mut self, ctx: &PlayerContext, rng: &mut R, out: &mut PlayerUpdate) {
        let p = self.transition_progress(ctx.now);
        if let Some(t) = self.transition {
            self.transform.position = t.from.position.lerp(t.to.position, p);
            self.transform.rotation = t.from.rotation.slerp(t.to.rotation, p);
        }
        self.camera = CameraRig::blend(&self.transform, p);
        out.body = Some(BodyCommand::Teleport(self.transform));

        if p >= 1.0 {
            self.transition = None;
            self.sequence = PeckSequence::generate(
                rng,
                self.settings.min_sequence..=self.settings.max_sequence,
            );
            self.mode = PlayerMode::PlayingMiniGame;
            log::info!("Mini-game started with {} keys", self.sequence.len());
        }
    }

    fn play(&mut self, ctx: &PlayerContext, input: &PlayerInput, out: &mut PlayerUpdate) {
        self.camera = CameraRig::pecking(&self.transform);
        if input.exit {
            log::info!("Mini-game abandoned with {} keys left", self.sequence.len());
            self.begin_exit(ctx.now, out);
            return;
        }
        match self.sequence.respond(&input.pecks) {
            Some(PeckOutcome::Hit { remaining }) => {
                let reward = self.settings.key_reward * (ctx.stage.min(MAX_STAGE) + 1) as f32;
                self.take_damage(-reward, false);
                out.keys_hit += 1;
                if remaining == 0 {
                    self.take_damage(-self.settings.completion_heal, false);
                    out.completed = true;
                    log::info!("Mini-game complete");
                    self.begin_exit(ctx.now, out);
                }
            }
            Some(PeckOutcome::Miss) => {
                self.take_damage(self.settings.miss_penalty, true);
                out.missed = true;
            }
            None => {}
        }
    }

    fn begin_exit(&mut self, now: Duration, out: &mut PlayerUpdate) {
        self.sequence.clear();
        out.finished_target = self.target.take();
        self.transition = Some(Transition {
            start: now,
            from: self.transform,
            to: self.transform,
        });
        self.mode = PlayerMode::ExitingMiniGame;
    }

    fn interpolate_exit(&mut self, ctx: &PlayerContext, out: &mut PlayerUpdate) {
        let p = self.transition_progress(ctx.now);
        self.camera = CameraRig::blend(&self.transform, 1.0 - p);
        out.body = Some(BodyCommand::Teleport(self.transform));

        if p >= 1.0 {
            self.transition = None;
            self.yaw = self.transform.yaw();
            self.pitch = 0.0;
            self.speed = 0.0;
            self.transform.rotation = Quat::from_rotation_y(self.yaw);
            self.mode = PlayerMode::Flying;
            self.camera = CameraRig::follow(&self.transform);
            out.body = Some(BodyCommand::Teleport(self.transform));
            out.message = Some(PlayerMessage::ResumeSimulation);
            log::info!("Back to flying");
        }
    }
}
