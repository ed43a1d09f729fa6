//! Window events and the collision inbox.

use hecs::Entity;
use physics::{ColliderHandle, CollisionEvent};
use winit::event::WindowEvent;
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::scene::{CollisionKind, Scene};

/// Something the player touched during the last physics steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub kind: CollisionKind,
    pub node: Option<Entity>,
}

fn priority(kind: CollisionKind) -> u8 {
    match kind {
        CollisionKind::Nest => 2,
        CollisionKind::Target => 1,
        CollisionKind::Scenery => 0,
    }
}

/// Single-slot mailbox between the physics step and the next frame. When
/// several contacts land in one frame the most important one wins
/// (nest, then target, then scenery); ties keep the first.
#[derive(Debug, Default)]
pub struct CollisionInbox {
    slot: Option<Contact>,
}

impl CollisionInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: CollisionKind, node: Option<Entity>) {
        let keep = self
            .slot
            .is_some_and(|current| priority(current.kind) >= priority(kind));
        if !keep {
            self.slot = Some(Contact { kind, node });
        }
    }

    pub fn take(&mut self) -> Option<Contact> {
        self.slot.take()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    /// Queue every contact that `player` started in `events`.
    pub fn collect(&mut self, events: &[CollisionEvent], player: ColliderHandle, scene: &Scene) -> usize {
        let mut queued = 0;
        for event in events {
            let CollisionEvent::Started(a, b, _) = *event else {
                continue;
            };
            let other = if a == player {
                b
            } else if b == player {
                a
            } else {
                continue;
            };
            let (kind, node) = scene.classify(other);
            log::trace!(
                "Player contact: {:?} ({})",
                kind,
                node.and_then(|n| scene.name(n)).unwrap_or("unmapped")
            );
            self.push(kind, node);
            queued += 1;
        }
        queued
    }
}

impl crate::GameState {
    /// Handle a window event. Returns true if the app should exit.
    pub(crate) fn handle_window_event(&mut self, event: WindowEvent) -> bool {
        match event {
            WindowEvent::CloseRequested => {
                self.running = false;
                true
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.input.process_keyboard(key, event.state);
                    if key == KeyCode::Escape && event.state.is_pressed() {
                        log::info!("Escape pressed, quitting");
                        self.running = false;
                        return true;
                    }
                }
                false
            }
            WindowEvent::Focused(false) => {
                // Freeze the game clock until the window comes back.
                self.input.release_all();
                if self.focused {
                    log::info!("Window lost focus, pausing");
                    self.focused = false;
                    crate::update::set_title(self, "Woodpecker | Paused".to_string());
                }
                false
            }
            WindowEvent::Focused(true) => {
                if !self.focused {
                    log::info!("Window focused, resuming");
                }
                self.focused = true;
                self.time.reset_frame_anchor();
                false
            }
            WindowEvent::RedrawRequested => {
                self.update();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
                false
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::NodeKind;
    use engine_core::{Transform, Vec3};
    use physics::{CollisionEventFlags, CollisionGroup, PhysicsWorld, ShapeSpec};

    fn entities() -> (Entity, Entity) {
        let mut world = hecs::World::new();
        (world.spawn(()), world.spawn(()))
    }

    #[test]
    fn nest_beats_target_beats_scenery() {
        let (a, b) = entities();
        let mut inbox = CollisionInbox::new();
        inbox.push(CollisionKind::Scenery, None);
        inbox.push(CollisionKind::Target, Some(a));
        inbox.push(CollisionKind::Nest, Some(b));
        inbox.push(CollisionKind::Target, Some(a));
        assert_eq!(
            inbox.take(),
            Some(Contact {
                kind: CollisionKind::Nest,
                node: Some(b)
            })
        );
        assert!(inbox.is_empty());
    }

    #[test]
    fn equal_priority_keeps_first() {
        let (a, b) = entities();
        let mut inbox = CollisionInbox::new();
        inbox.push(CollisionKind::Target, Some(a));
        inbox.push(CollisionKind::Target, Some(b));
        assert_eq!(inbox.take().and_then(|c| c.node), Some(a));
    }

    #[test]
    fn collect_keeps_only_player_contacts() {
        let mut physics = PhysicsWorld::new();
        let (_, player) = physics.add_player_ball(Vec3::ZERO, 0.25);
        let wall = physics.add_static_cuboid(
            &Transform::from_position(Vec3::new(0.0, 0.0, -5.0)),
            Vec3::ONE,
            CollisionGroup::obstacle(),
        );
        let other = physics.add_static_cuboid(
            &Transform::from_position(Vec3::new(0.0, 0.0, 5.0)),
            Vec3::ONE,
            CollisionGroup::obstacle(),
        );
        let scene = Scene::new(physics);
        let events = [
            CollisionEvent::Started(wall, other, CollisionEventFlags::empty()),
            CollisionEvent::Stopped(player, wall, CollisionEventFlags::empty()),
            CollisionEvent::Started(wall, player, CollisionEventFlags::empty()),
        ];
        let mut inbox = CollisionInbox::new();
        assert_eq!(inbox.collect(&events, player, &scene), 1);
        assert_eq!(
            inbox.take(),
            Some(Contact {
                kind: CollisionKind::Scenery,
                node: None
            })
        );
    }

    #[test]
    fn simulated_sensor_contact_reaches_inbox() {
        let mut physics = PhysicsWorld::new();
        let (body, player) = physics.add_player_ball(Vec3::new(0.0, 0.0, 6.0), 0.25);
        let mut scene = Scene::new(physics);
        let target = scene.spawn(NodeKind::Target, "target", Transform::default(), None);
        let sensor = scene.physics.add_sensor(
            &Transform::default(),
            ShapeSpec::Cylinder {
                radius: 3.0,
                half_height: 0.5,
            },
            CollisionGroup::Target,
        );
        scene.attach_collider(target, sensor);
        scene.physics.set_linear_velocity(body, Vec3::new(0.0, 0.0, -12.0));

        let mut inbox = CollisionInbox::new();
        let mut steps = 0;
        while inbox.is_empty() {
            assert!(steps < 120, "the ball never reached the sensor");
            scene.physics.step();
            let events = scene.physics.drain_collision_events();
            inbox.collect(&events, player, &scene);
            steps += 1;
        }
        assert_eq!(
            inbox.take(),
            Some(Contact {
                kind: CollisionKind::Target,
                node: Some(target)
            })
        );
    }
}
