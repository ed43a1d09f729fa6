//! Per-frame orchestration.
//!
//! Fixed order each playing frame: drain the collision inbox, player,
//! world streaming, hawk, physics, level clock, then camera and HUD.

use std::time::Duration;

use engine_core::Vec3;

use crate::events::Contact;
use crate::level::Outcome;
use crate::scene::CollisionKind;
use crate::session::Session;
use crate::state::GamePhase;
use crate::woodpecker::{PlayerContext, PlayerInput, PlayerMessage, PlayerMode};
use crate::GameState;

/// Run one frame after the clock has advanced.
pub fn frame(state: &mut GameState) {
    let dt = state.time.delta_seconds();
    state.assets.poll();

    match state.phase {
        GamePhase::Loading => loading(state),
        GamePhase::Start => {
            if state.input.is_start_pressed() {
                state.phase = GamePhase::Playing;
                // Idle time on the title screen does not count.
                state.time.clear_accumulator();
                state.session.scene.physics.set_paused(false);
            }
        }
        GamePhase::Won | GamePhase::GameOver => {
            if state.input.is_start_pressed() {
                replay(state);
            }
        }
        GamePhase::Playing => gameplay(state, dt),
    }

    present(state, dt);
    state.input.begin_frame();
}

/// Stream the first window once the prototypes and the target texture are
/// in, then wait for Space.
fn loading(state: &mut GameState) {
    let session = &mut state.session;
    let position = session.player_position();
    session
        .chunks
        .update(&mut session.scene, &mut state.assets, position, &mut session.level);
    if session.chunks.is_initialized() && state.assets.is_texture_ready() {
        session.scene.physics.update_query_pipeline();
        session.scene.physics.set_paused(true);
        state.phase = GamePhase::Start;
    }
}

/// Throw the session away and build a new one.
fn replay(state: &mut GameState) {
    state.replays += 1;
    let seed = state.seed.wrapping_add(state.replays);
    state.session.teardown(&mut state.assets);
    match Session::new(&state.config, &mut state.assets, seed, state.time.elapsed()) {
        Ok(session) => {
            state.session = session;
            state.inbox.take();
            state.phase = GamePhase::Loading;
            log::info!("Replay #{}", state.replays);
        }
        Err(e) => {
            log::error!("Could not restart: {}", e);
            state.running = false;
        }
    }
}

/// Run one frame of gameplay.
pub fn gameplay(state: &mut GameState, dt: f32) {
    let now = state.time.elapsed();

    if let Some(contact) = state.inbox.take() {
        dispatch_contact(state, contact, now);
        if state.phase != GamePhase::Playing {
            return;
        }
    }

    // Player
    let input = PlayerInput::sample(&state.input);
    let session = &mut state.session;
    let ctx = PlayerContext {
        now,
        dt,
        stage: session.level.level_stage,
    };
    let out = session.woodpecker.update(&ctx, &input, &mut session.rng);
    if let Some(command) = out.body {
        session.apply_body(command);
    }
    let level_config = &state.config.level;
    session.level.add_score(out.keys_hit * level_config.key_score);
    if out.completed {
        session.level.add_score(level_config.completion_score);
        state.hud.messages.success("Target cleared");
    }
    if out.missed {
        state.hud.messages.warning("Wrong key");
    }
    if let Some(target) = out.finished_target {
        session.chunks.remove_target(target, &mut session.scene);
    }
    if out.message == Some(PlayerMessage::ResumeSimulation) {
        session.scene.physics.set_paused(false);
        state.time.clear_accumulator();
    }

    // World streaming
    let position = session.player_position();
    let report = session
        .chunks
        .update(&mut session.scene, &mut state.assets, position, &mut session.level);
    if report.nest_spawned {
        state.hud.messages.info("A nest has appeared somewhere in the forest");
    }
    session.scene.physics.update_query_pipeline();

    // Hawk
    let hawk = session.hawk.update(dt, position, &session.scene.physics);
    log::trace!(
        "Hawk {:?} at {:.1}, {} rays, heading {:+.0} deg",
        hawk.mode,
        hawk.distance,
        hawk.rays,
        hawk.ray_angle.to_degrees()
    );
    if hawk.strike {
        log::info!("Hawk strike");
        let lethal = session.woodpecker.health.max;
        session.woodpecker.take_damage(lethal, true);
    }

    // Physics
    if session.scene.physics.is_paused() {
        state.time.clear_accumulator();
    } else {
        while state.time.should_fixed_update() {
            session.scene.physics.step();
        }
        let events = session.scene.physics.drain_collision_events();
        state
            .inbox
            .collect(&events, session.player_collider, &session.scene);
        if session.woodpecker.mode() == PlayerMode::Flying {
            session.sync_player();
        }
    }

    // Level clock
    session.level.tick(dt);
    if session.woodpecker.is_dead() {
        session.level.game_over();
        state.phase = GamePhase::GameOver;
        session.scene.physics.set_paused(true);
    }
}

fn dispatch_contact(state: &mut GameState, contact: Contact, now: Duration) {
    let session = &mut state.session;
    match (contact.kind, contact.node) {
        (CollisionKind::Nest, Some(node)) => {
            if !session
                .chunks
                .consume_nest(node, &mut session.scene, &mut state.assets, &mut session.level)
            {
                return;
            }
            match session.level.advance() {
                Outcome::Won => {
                    state.phase = GamePhase::Won;
                    session.scene.physics.set_paused(true);
                }
                _ => {
                    session.hawk.level_adjust(session.level.level_stage);
                    state
                        .hud
                        .messages
                        .success(format!("Nest found! Level {}", session.level.level_stage + 1));
                }
            }
        }
        (CollisionKind::Target, Some(node)) => {
            let Some(target) = session.scene.world_transform(node) else {
                return;
            };
            if session.woodpecker.enter_mini_game(target, node, now) {
                session.scene.physics.set_paused(true);
                state.time.clear_accumulator();
            }
        }
        (CollisionKind::Scenery, _) => {
            let bounce = session.woodpecker.bounce_velocity();
            session.woodpecker.on_scenery_collision(now, bounce);
        }
        // A trigger whose node has already gone.
        (_, None) => {}
    }
}

/// Camera pose and HUD for the frame just simulated.
fn present(state: &mut GameState, dt: f32) {
    let session = &mut state.session;
    let bird = &session.woodpecker;
    state.camera = bird.camera().view(&bird.transform);

    if session.woodpecker.take_vignette() {
        state.hud.flash_vignette();
    }
    state
        .hud
        .update(dt, state.phase, session.woodpecker.mode());
    let hawk_near = state.phase == GamePhase::Playing && session.hawk.is_engaged();
    let data = state.hud.generate_hud_data(
        state.phase,
        &session.woodpecker,
        &session.level,
        session.chunks.prototype_progress(&state.assets),
        hawk_near,
        state.time.fps(),
    );
    let title = data.title(&state.hud.config);
    set_title(state, title);
}

/// Show `title` on the window, if it changed.
pub fn set_title(state: &mut GameState, title: String) {
    if title != state.title {
        if let Some(window) = &state.window {
            window.set_title(&title);
        }
        state.title = title;
    }
}

/// Scripted input for headless runs: start the game, fly straight and clear
/// every mini-game that comes along.
pub fn autopilot(state: &mut GameState) {
    use input::{ElementState, KeyCode};

    state.input.release_all();
    let key = match state.phase {
        GamePhase::Start => Some(KeyCode::Space),
        GamePhase::Playing => state
            .session
            .woodpecker
            .preview()
            .first()
            .map(|k| k.key_code()),
        _ => None,
    };
    if let Some(key) = key {
        state.input.process_keyboard(key, ElementState::Pressed);
    }
}

/// Where the hawk is relative to the player, for log lines.
pub fn hawk_offset(session: &Session) -> Vec3 {
    session.hawk.transform.position - session.player_position()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{FileAsset, ModelAsset};
    use crate::config::GameConfig;
    use crate::pool::TreePool;
    use crate::scene::{NodeKind, SceneNode};
    use hecs::Entity;
    use input::{ElementState, KeyCode};
    use std::sync::Arc;
    use std::time::Instant;

    const FRAME: Duration = Duration::from_millis(16);

    fn config() -> GameConfig {
        let mut config = GameConfig {
            seed: Some(11),
            assets_dir: "/nonexistent/woodpecker-assets".into(),
            ..GameConfig::default()
        };
        config.world.nest_chance = 1.0;
        config.hawk.start_position = [5_000.0, 12.0, 0.0];
        config
    }

    /// Playing state over a ready-made tree pool, with every nest stage
    /// already unlocked by the clock.
    fn playing(config: GameConfig) -> GameState {
        let mut state = GameState::new(config, None).unwrap();
        let models = (0..state.config.world.prototype_count).map(|_| Arc::new(ModelAsset::placeholder("tree")));
        state.session = Session::with_pool(&state.config, TreePool::from_models(models), 11, state.time.elapsed());

        let deadline = Instant::now() + Duration::from_secs(5);
        while state.phase != GamePhase::Start {
            assert!(Instant::now() < deadline, "never left loading");
            state.step(FRAME);
            std::thread::sleep(Duration::from_millis(1));
        }
        state.input.process_keyboard(KeyCode::Space, ElementState::Pressed);
        state.step(FRAME);
        state.input.process_keyboard(KeyCode::Space, ElementState::Released);
        assert_eq!(state.phase, GamePhase::Playing);
        state.session.level.total_duration = 1_000.0;
        state
    }

    /// Jump the bird to `x` so a fresh column streams in, and return the nest
    /// that came with it.
    fn stream_nest(state: &mut GameState, x: f32) -> Entity {
        state.session.woodpecker.transform.position = Vec3::new(x, 15.0, 0.0);
        state.step(FRAME);
        state
            .session
            .chunks
            .chunks()
            .find_map(|c| c.nest.as_ref().map(|n| n.node))
            .expect("a nest streamed in")
    }

    /// Put the bird on `node` and fly until `arrived` holds.
    fn fly_into(state: &mut GameState, node: Entity, arrived: impl Fn(&GameState) -> bool) {
        let centre = state.session.scene.world_transform(node).unwrap().position;
        state.session.woodpecker.transform.position = centre;
        for _ in 0..10 {
            state.step(FRAME);
            if arrived(state) {
                return;
            }
        }
        panic!("contact with {:?} never arrived", state.session.scene.kind(node));
    }

    #[test]
    fn reaching_a_nest_advances_the_level_once() {
        let mut state = playing(config());
        assert_eq!(state.session.hawk.speed(), 10.0);

        let nest = stream_nest(&mut state, 50.0);
        assert!(state.session.level.nest_spawned);
        fly_into(&mut state, nest, |s| s.session.level.level_stage == 1);

        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.session.level.score, 50);
        assert_eq!(state.session.hawk.speed(), 12.0);
        assert!(!state.session.scene.contains(nest));
        assert_eq!(state.session.chunks.nest_count(), 0);
        assert!(!state.session.level.nest_spawned);
        assert!(state.hud.messages.messages.iter().any(|m| m.text == "Nest found! Level 2"));

        for _ in 0..10 {
            state.step(FRAME);
        }
        assert_eq!(state.session.level.level_stage, 1);
        assert_eq!(state.session.level.score, 50);
    }

    #[test]
    fn nest_at_the_last_stage_wins() {
        let mut state = playing(config());
        state.session.level.level_stage = 4;
        state.session.hawk.level_adjust(4);

        let nest = stream_nest(&mut state, 1_000.0);
        fly_into(&mut state, nest, |s| s.phase != GamePhase::Playing);

        assert_eq!(state.phase, GamePhase::Won);
        assert_eq!(state.session.level.level_stage, 4);
        assert_eq!(state.session.level.score, 50);
        assert!(state.session.scene.physics.is_paused());
        assert!(state.title.contains("every nest"));

        // Frozen until Space.
        let position = state.session.player_position();
        for _ in 0..5 {
            state.step(FRAME);
        }
        assert_eq!(state.session.player_position(), position);
        assert_eq!(state.phase, GamePhase::Won);
    }

    #[test]
    fn flying_into_a_target_starts_the_mini_game() {
        let mut config = config();
        config.world.nest_chance = 0.0;
        config.world.target_chance = 1.0;
        let mut state = playing(config);

        let target = state
            .session
            .scene
            .world
            .query::<&SceneNode>()
            .iter()
            .find(|(_, node)| node.kind == NodeKind::Target)
            .map(|(e, _)| e)
            .expect("targets in the first window");
        fly_into(&mut state, target, |s| s.session.woodpecker.mode() != PlayerMode::Flying);

        assert_eq!(state.session.woodpecker.mode(), PlayerMode::EnteringMiniGame);
        assert!(state.session.scene.physics.is_paused());
        assert!(state.session.scene.contains(target));
    }
}
