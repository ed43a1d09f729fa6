//! Procedural generation for the forest: tree skeletons and placement.

pub mod scatter;
pub mod tree;

pub use scatter::*;
pub use tree::*;
