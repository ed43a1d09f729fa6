//! Core engine types and utilities for the woodpecker game.
//!
//! This crate provides the foundational types used across all engine systems:
//! - Transform and hierarchical composition
//! - Time management (wall clock or manual stepping)
//! - Health component
//! - Background asset loading

pub mod assets;
pub mod components;
pub mod time;
pub mod transform;

pub use assets::*;
pub use components::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Quat, Vec3};
pub use hecs::{Entity, World};
