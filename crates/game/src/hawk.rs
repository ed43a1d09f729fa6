//! The hawk: a pursuer that steers around trees with raycasts.
//!
//! Each tick the hawk looks straight at its target. If a tree is in the way
//! it sweeps the ray left and right about world Y in fixed steps until one
//! side clears, then turns toward that heading at a bounded rate. The
//! orientation is kept as yaw and pitch and rebuilt as `Ry(yaw) * Rx(pitch)`,
//! so the model's +Z is its flight direction.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use engine_core::{Quat, Transform, Vec3};
use physics::{CollisionGroup, PhysicsWorld};

use crate::config::HawkConfig;
use crate::level::MAX_STAGE;

/// Something the hawk can cast steering rays against.
pub trait ObstacleQuery {
    /// Distance to the first obstacle along the unit `direction` from
    /// `origin`, ignoring anything farther than `max_distance`.
    fn cast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<f32>;
}

impl ObstacleQuery for PhysicsWorld {
    fn cast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<f32> {
        let groups = CollisionGroup::query(&[CollisionGroup::Obstacle]);
        self.raycast(origin, direction, max_distance, groups)
            .map(|hit| hit.distance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PursuitMode {
    DirectPursuit,
    ObstacleAvoidance,
}

/// Outcome of one hawk tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HawkReport {
    /// Close enough to strike the target this tick.
    pub strike: bool,
    pub mode: PursuitMode,
    /// Signed angle (radians, about world Y) between the direct heading and
    /// the chosen one. Zero in direct pursuit.
    pub ray_angle: f32,
    /// Rays cast this tick.
    pub rays: u32,
    pub distance: f32,
}

pub struct Hawk {
    pub transform: Transform,
    yaw: f32,
    pitch: f32,
    speed: f32,
    flight_direction: Option<Vec3>,
    mode: PursuitMode,
    last_distance: f32,
    settings: HawkConfig,
}

impl Hawk {
    pub fn new(settings: HawkConfig) -> Self {
        let start = Vec3::from(settings.start_position);
        Self {
            transform: Transform::from_position(start),
            yaw: 0.0,
            pitch: 0.0,
            speed: settings.level_speeds[0],
            flight_direction: None,
            mode: PursuitMode::DirectPursuit,
            last_distance: f32::INFINITY,
            settings,
        }
    }

    /// Set cruise speed for a level stage.
    pub fn level_adjust(&mut self, stage: usize) {
        self.speed = self.settings.level_speeds[stage.min(MAX_STAGE)];
        log::debug!("Hawk speed set to {} for stage {}", self.speed, stage);
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn mode(&self) -> PursuitMode {
        self.mode
    }

    #[cfg(test)]
    pub fn flight_direction(&self) -> Option<Vec3> {
        self.flight_direction
    }

    /// Within hunting range of the target (wing flaps audible).
    pub fn is_engaged(&self) -> bool {
        self.last_distance <= self.settings.disengage_range
    }

    pub fn update<Q: ObstacleQuery + ?Sized>(
        &mut self,
        dt: f32,
        target: Vec3,
        obstacles: &Q,
    ) -> HawkReport {
        let position = self.transform.position;
        let to_target = target - position;
        let distance = to_target.length();
        self.last_distance = distance;

        let mut report = HawkReport {
            strike: distance < self.settings.strike_range,
            mode: PursuitMode::DirectPursuit,
            ray_angle: 0.0,
            rays: 0,
            distance,
        };

        let Some(direct) = to_target.try_normalize() else {
            return report;
        };

        let block_range = (distance - self.settings.clearance).min(self.settings.max_ray_distance);
        let blocked = obstacles.cast(position, direct, block_range).is_some();

        if blocked {
            report.mode = PursuitMode::ObstacleAvoidance;
            let clear_range = distance.min(self.settings.max_ray_distance);
            match self.sweep(position, direct, clear_range, obstacles, &mut report.rays) {
                Some((heading, angle)) => {
                    self.flight_direction = Some(heading);
                    report.ray_angle = angle;
                }
                None => {
                    log::trace!("Hawk rays exhausted; keeping last heading");
                    self.flight_direction = Some(self.flight_direction.unwrap_or(direct));
                }
            }
        } else {
            self.flight_direction = Some(direct);
        }

        if report.mode != self.mode {
            log::debug!("Hawk switched to {:?} at distance {:.1}", report.mode, distance);
            self.mode = report.mode;
        }

        self.update_rotation(dt, distance, !blocked);

        let mut step = self.speed * dt;
        if distance > self.settings.disengage_range {
            step /= self.settings.disengage_factor;
        }
        let facing = self.transform.facing();
        self.transform.translate(facing * step);

        report
    }

    /// Sweep left then right in growing steps; first clear ray wins.
    fn sweep<Q: ObstacleQuery + ?Sized>(
        &self,
        origin: Vec3,
        direct: Vec3,
        clear_range: f32,
        obstacles: &Q,
        rays: &mut u32,
    ) -> Option<(Vec3, f32)> {
        let step = self.settings.ray_step_degrees.to_radians();
        for i in 1..=self.settings.max_rays_per_side {
            for angle in [step * i as f32, -step * i as f32] {
                let heading = Quat::from_rotation_y(angle) * direct;
                *rays += 1;
                if obstacles.cast(origin, heading, clear_range).is_none() {
                    return Some((heading, angle));
                }
            }
        }
        None
    }

    fn update_rotation(&mut self, dt: f32, distance: f32, direct: bool) {
        let Some(heading) = self.flight_direction else {
            return;
        };
        let rotate_speed = if direct && distance < self.settings.close_range {
            self.settings.close_rotate_speed
        } else {
            self.settings.rotate_speed
        };
        let max_step = rotate_speed * dt;

        let current = self.transform.facing();
        let yaw_delta = wrap_angle(heading_yaw(heading) - heading_yaw(current)).clamp(-max_step, max_step);
        // +pitch tips the nose down, so climbing needs a negative delta.
        let pitch_delta = -(elevation(heading) - elevation(current)).clamp(-max_step, max_step);

        self.yaw = wrap_angle(self.yaw + yaw_delta);
        self.pitch = (self.pitch + pitch_delta).clamp(-FRAC_PI_2 + 0.01, FRAC_PI_2 - 0.01);
        self.transform.rotation = Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch);
    }
}

fn heading_yaw(direction: Vec3) -> f32 {
    direction.x.atan2(direction.z)
}

fn elevation(direction: Vec3) -> f32 {
    let horizontal = Vec3::new(direction.x, 0.0, direction.z).length();
    direction.y.atan2(horizontal)
}

/// Wrap an angle into (-π, π].
fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}
