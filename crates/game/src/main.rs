//! Woodpecker - fly a streamed forest, peck targets for health, find the
//! nest each level and keep away from the hawk.

mod assets;
mod camera;
mod chunk;
mod chunk_manager;
mod config;
mod error;
mod events;
mod hawk;
mod hud;
mod level;
mod minigame;
mod pool;
mod scene;
mod session;
mod state;
mod update;
mod woodpecker;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use engine_core::{Time, Transform};
use input::InputState;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use assets::GameAssets;
use config::GameConfig;
use events::CollisionInbox;
use hud::HUDSystem;
use session::Session;
use state::GamePhase;

/// Frame length of headless runs.
const HEADLESS_FRAME: Duration = Duration::from_micros(16_667);

/// Main game state
pub struct GameState {
    config: GameConfig,
    seed: u64,
    replays: u64,
    phase: GamePhase,

    // Core systems
    time: Time,
    input: InputState,
    assets: GameAssets,

    // The current run
    session: Session,
    inbox: CollisionInbox,

    // Presentation
    camera: Transform,
    hud: HUDSystem,
    title: String,
    window: Option<Arc<Window>>,

    /// Cleared while the window is in the background; the game clock stops.
    focused: bool,
    running: bool,
}

impl GameState {
    pub fn new(config: GameConfig, window: Option<Arc<Window>>) -> Result<Self> {
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut assets = GameAssets::new(&config.assets_dir)
            .with_context(|| format!("starting asset loader for {:?}", config.assets_dir))?;
        let mut time = Time::new();
        time.set_fixed_rate(1.0 / f64::from(session::FIXED_STEP));
        let session = Session::new(&config, &mut assets, seed, time.elapsed())
            .context("building the first session")?;
        log::info!("Seed {}", seed);

        Ok(Self {
            config,
            seed,
            replays: 0,
            phase: GamePhase::Loading,
            time,
            input: InputState::new(),
            assets,
            session,
            inbox: CollisionInbox::new(),
            camera: Transform::default(),
            hud: HUDSystem::new(),
            title: String::new(),
            window,
            focused: true,
            running: true,
        })
    }

    /// Advance by wall-clock time.
    fn update(&mut self) {
        if self.focused {
            self.time.update();
            update::frame(self);
        }
    }

    /// Advance by a fixed amount of game time.
    fn step(&mut self, delta: Duration) {
        if self.focused {
            self.time.advance(delta);
            update::frame(self);
        }
    }
}

struct App {
    config: GameConfig,
    state: Option<GameState>,
}

impl App {
    fn new(config: GameConfig) -> Self {
        Self { config, state: None }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_none() {
            let config = self.config.clone();
            let window_attrs = Window::default_attributes()
                .with_title("Woodpecker")
                .with_inner_size(winit::dpi::LogicalSize::new(config.window_width, config.window_height));

            let window = match event_loop.create_window(window_attrs) {
                Ok(w) => Arc::new(w),
                Err(e) => {
                    log::error!("Failed to create window: {}", e);
                    event_loop.exit();
                    return;
                }
            };

            match GameState::new(config, Some(window.clone())) {
                Ok(s) => {
                    self.state = Some(s);
                    window.request_redraw();
                }
                Err(e) => {
                    log::error!("Failed to initialize game: {:#}", e);
                    event_loop.exit();
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(state) = &mut self.state {
            if state.handle_window_event(event) || !state.running {
                event_loop.exit();
            }
        }
    }
}

/// Command line options.
#[derive(Debug, Default, PartialEq)]
struct Options {
    /// Run without a window for this many seconds of game time.
    headless: Option<f32>,
    seed: Option<u64>,
    /// Write the effective settings to `config.ron` and exit.
    write_config: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Options> {
    let mut options = Options::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--headless" => {
                let value = args.next().context("--headless needs a number of seconds")?;
                options.headless = Some(
                    value
                        .parse()
                        .with_context(|| format!("invalid --headless value {:?}", value))?,
                );
            }
            "--seed" => {
                let value = args.next().context("--seed needs a value")?;
                options.seed = Some(
                    value
                        .parse()
                        .with_context(|| format!("invalid --seed value {:?}", value))?,
                );
            }
            "--write-config" => options.write_config = true,
            other => bail!(
                "unknown argument {:?}; usage: woodpecker [--headless <seconds>] [--seed <u64>] [--write-config]",
                other
            ),
        }
    }
    Ok(options)
}

/// Play on autopilot without a window and report how it went.
fn run_headless(config: GameConfig, seconds: f32) -> Result<()> {
    let mut state = GameState::new(config, None)?;
    let frames = (seconds.max(0.0) / HEADLESS_FRAME.as_secs_f32()).ceil() as u64;
    log::info!("Headless run: {} frames", frames);

    for _ in 0..frames {
        update::autopilot(&mut state);
        state.step(HEADLESS_FRAME);
        if matches!(state.phase, GamePhase::Won | GamePhase::GameOver) || !state.running {
            break;
        }
        if state.phase == GamePhase::Loading {
            // Give the asset worker a moment.
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    let session = &state.session;
    log::info!(
        "Headless run finished after {} frames: {:?}, level {}, score {}, health {:.0}, {:.1}s played, {} chunks",
        state.time.frame_count(),
        state.phase,
        session.level.level_stage + 1,
        session.level.score,
        session.woodpecker.health.current,
        session.level.total_duration,
        session.chunks.chunk_count(),
    );
    log::info!(
        "Hawk at {:?} from the player, {:?} at speed {}; camera at {:?}",
        update::hawk_offset(session),
        session.hawk.mode(),
        session.hawk.speed(),
        state.camera.position,
    );
    println!("{}", state.title);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = parse_args(std::env::args().skip(1))?;
    let mut config = GameConfig::load();
    if options.seed.is_some() {
        config.seed = options.seed;
    }

    if options.write_config {
        let path = config.save().context("writing config")?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    if let Some(seconds) = options.headless {
        return run_headless(config, seconds);
    }

    println!("╔══════════════════════════════════════════════╗");
    println!("║                  Woodpecker                  ║");
    println!("╠══════════════════════════════════════════════╣");
    println!("║  CONTROLS:                                   ║");
    println!("║    A / D    - Turn left / right              ║");
    println!("║    W / S    - Climb / dive                   ║");
    println!("║    WASD     - Peck the shown keys on targets ║");
    println!("║    E        - Leave a target early           ║");
    println!("║    Space    - Start / play again             ║");
    println!("║    Escape   - Quit                           ║");
    println!("╚══════════════════════════════════════════════╝");

    log::info!("Starting Woodpecker");

    let event_loop = EventLoop::new().context("creating event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
