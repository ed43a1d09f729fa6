//! Keyboard input sampled once per frame.

use std::collections::HashSet;

/// Manages input state for the current frame.
#[derive(Debug, Default)]
pub struct InputState {
    /// Keys currently held down.
    keys_held: HashSet<KeyCode>,
    /// Keys pressed this frame.
    keys_pressed: HashSet<KeyCode>,
    /// Keys released this frame.
    keys_released: HashSet<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame state. Call at the end of each frame, after the
    /// game has sampled it.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
    }

    /// Process a keyboard event. OS key repeat does not re-trigger a press.
    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.keys_held.contains(&key) {
                    self.keys_pressed.insert(key);
                }
                self.keys_held.insert(key);
            }
            ElementState::Released => {
                self.keys_held.remove(&key);
                self.keys_released.insert(key);
            }
        }
    }

    /// Drop every held key, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.keys_released.extend(self.keys_held.drain());
    }

    /// Check if a key is currently held.
    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// Check if a key was pressed this frame.
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Check if a key was released this frame.
    pub fn is_key_released(&self, key: KeyCode) -> bool {
        self.keys_released.contains(&key)
    }

    /// Keys pressed this frame that are in `keys`.
    pub fn pressed_among<'a>(&'a self, keys: &'a [KeyCode]) -> impl Iterator<Item = KeyCode> + 'a {
        keys.iter().copied().filter(move |k| self.keys_pressed.contains(k))
    }

    /// Check if start/replay was pressed (Space).
    pub fn is_start_pressed(&self) -> bool {
        self.is_key_pressed(KeyCode::Space)
    }

    /// Check if exit was pressed (E).
    pub fn is_exit_pressed(&self) -> bool {
        self.is_key_pressed(KeyCode::KeyE)
    }
}

// Re-export for convenience
pub use winit::event::ElementState;
pub use winit::keyboard::KeyCode;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_edge_triggered() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        assert!(input.is_key_pressed(KeyCode::KeyW));
        assert!(input.is_key_held(KeyCode::KeyW));

        input.begin_frame();
        // Key repeat while held.
        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        assert!(!input.is_key_pressed(KeyCode::KeyW));
        assert!(input.is_key_held(KeyCode::KeyW));

        input.process_keyboard(KeyCode::KeyW, ElementState::Released);
        assert!(input.is_key_released(KeyCode::KeyW));
        assert!(!input.is_key_held(KeyCode::KeyW));
    }

    #[test]
    fn pressed_among_filters_keys() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyA, ElementState::Pressed);
        input.process_keyboard(KeyCode::Space, ElementState::Pressed);
        let peck = [KeyCode::KeyW, KeyCode::KeyA, KeyCode::KeyS, KeyCode::KeyD];
        let pressed: Vec<_> = input.pressed_among(&peck).collect();
        assert_eq!(pressed, vec![KeyCode::KeyA]);
        assert!(input.is_start_pressed());
    }

    #[test]
    fn release_all_clears_held() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyD, ElementState::Pressed);
        input.release_all();
        assert!(!input.is_key_held(KeyCode::KeyD));
        assert!(input.is_key_released(KeyCode::KeyD));
    }
}
