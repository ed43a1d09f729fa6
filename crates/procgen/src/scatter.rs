//! Random placement of trees and targets inside a chunk cell.

use std::f32::consts::{FRAC_PI_2, TAU};
use std::ops::{Range, RangeInclusive};

use engine_core::Transform;
use glam::{Quat, Vec3};
use rand::Rng;

/// Ground height trees are planted at.
pub const TREE_BASE_Y: f32 = -0.5;

/// Number of trees a cell asks the pool for.
pub fn tree_count<R: Rng>(rng: &mut R, range: RangeInclusive<usize>) -> usize {
    if range.is_empty() {
        return 0;
    }
    rng.gen_range(range)
}

/// Root transform of a tree placed uniformly inside the square cell of side
/// `size` centred on `center` (only x and z are used), with a random yaw.
pub fn place_tree<R: Rng>(rng: &mut R, center: Vec3, size: f32) -> Transform {
    let x = center.x + rng.gen::<f32>() * size - size * 0.5;
    let z = center.z + rng.gen::<f32>() * size - size * 0.5;
    let yaw = rng.gen::<f32>() * TAU;
    Transform::from_position_rotation(Vec3::new(x, TREE_BASE_Y, z), Quat::from_rotation_y(yaw))
}

/// Outward distance of a target from the trunk axis at `height`.
pub fn target_offset(height: f32) -> f32 {
    4.0 - height * 0.08
}

/// Target transform relative to the ground point under its tree (the tree's
/// x and z at y = 0): pick a height in `height_range`, spin about Y, step out
/// along the spun +Z, then tip the disc 90° about its local X so it faces
/// outward.
pub fn place_target<R: Rng>(rng: &mut R, height_range: Range<f32>) -> Transform {
    let height = if height_range.is_empty() {
        height_range.start
    } else {
        rng.gen_range(height_range)
    };
    let yaw = rng.gen::<f32>() * TAU;
    target_transform(height, yaw)
}

/// Deterministic part of [`place_target`].
pub fn target_transform(height: f32, yaw: f32) -> Transform {
    let spin = Quat::from_rotation_y(yaw);
    let position = Vec3::new(0.0, height, 0.0) + spin * Vec3::Z * target_offset(height);
    Transform::from_position_rotation(position, spin * Quat::from_rotation_x(FRAC_PI_2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn trees_stay_inside_cell() {
        let mut rng = StdRng::seed_from_u64(7);
        let center = Vec3::new(100.0, 0.0, -50.0);
        for _ in 0..500 {
            let t = place_tree(&mut rng, center, 50.0);
            assert!((t.position.x - center.x).abs() <= 25.0);
            assert!((t.position.z - center.z).abs() <= 25.0);
            assert_eq!(t.position.y, TREE_BASE_Y);
        }
    }

    #[test]
    fn tree_count_is_two_or_three() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = [false; 4];
        for _ in 0..200 {
            let n = tree_count(&mut rng, 2..=3);
            assert!((2..=3).contains(&n));
            seen[n] = true;
        }
        assert!(seen[2] && seen[3]);
    }

    #[test]
    fn target_height_and_offset() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let t = place_target(&mut rng, 7.0..14.0);
            let h = t.position.y;
            assert!((7.0..14.0).contains(&h));
            let radial = Vec3::new(t.position.x, 0.0, t.position.z).length();
            assert!((radial - target_offset(h)).abs() < 1e-4);
        }
    }

    #[test]
    fn target_disc_faces_outward() {
        let t = target_transform(10.0, 0.0);
        assert!((t.position - Vec3::new(0.0, 10.0, 3.2)).length() < 1e-5);
        // Cylinder axis (local Y) points along the outward direction.
        assert!((t.up() - Vec3::Z).length() < 1e-5);
    }
}
