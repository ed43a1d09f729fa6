//! Tree skeletons: a fixed table of trunk and branch cylinders built into an
//! index-addressed arena.
//!
//! Every record names its parent by table index and gives an offset and an
//! XYZ Euler rotation (degrees) relative to that parent. Records with no
//! parent hang off the pivot box at the tree root. Building resolves each
//! node's transform relative to the tree root, so colliders and render
//! nodes can be placed without walking the hierarchy again.

use engine_core::Transform;
use glam::Vec3;

/// One row of the skeleton table.
#[derive(Debug, Clone, Copy)]
pub struct SegmentSpec {
    pub name: &'static str,
    /// Index of the parent row, `None` for the pivot.
    pub parent: Option<usize>,
    pub offset: Vec3,
    /// XYZ Euler rotation in degrees.
    pub rotation: Vec3,
    pub radius: f32,
    pub length: f32,
}

const fn seg(
    name: &'static str,
    parent: Option<usize>,
    offset: [f32; 3],
    rotation: [f32; 3],
    radius: f32,
    length: f32,
) -> SegmentSpec {
    SegmentSpec {
        name,
        parent,
        offset: Vec3::new(offset[0], offset[1], offset[2]),
        rotation: Vec3::new(rotation[0], rotation[1], rotation[2]),
        radius,
        length,
    }
}

/// Half extent of the pivot box every tree is rooted on.
pub const PIVOT_HALF_EXTENT: f32 = 1.0;

/// Scale applied to the prototype model attached to the pivot.
pub const PROTOTYPE_SCALE: f32 = 0.1;

/// Trunk, secondary and tertiary trunk, four branches and their sub-branches.
pub const TREE01_SEGMENTS: [SegmentSpec; 13] = [
    seg("trunk1", None, [0.0, 8.0, 0.0], [0.0, 0.0, 0.0], 3.0, 16.0),
    seg("trunk2", Some(0), [0.0, 16.0, 0.0], [0.0, 0.0, 0.0], 2.0, 16.0),
    seg("trunk3", Some(1), [-0.6, 12.0, -0.5], [-5.0, 0.0, 13.0], 0.7, 8.0),
    seg("branch1", Some(1), [3.0, -4.0, 1.5], [0.0, -32.0, -65.0], 0.75, 5.0),
    seg("branch2", Some(1), [2.7, 3.8, -3.6], [0.0, 50.0, -60.0], 0.75, 7.0),
    seg("branch21", Some(4), [-2.0, 5.5, 0.0], [0.0, 0.0, 52.0], 0.65, 7.0),
    seg("branch22", Some(5), [1.5, 7.0, 0.1], [0.0, -13.0, -23.0], 0.35, 8.0),
    seg("branch23", Some(4), [-1.0, 4.5, 3.5], [41.0, 0.0, 20.0], 0.5, 8.0),
    seg("branch3", Some(1), [-3.0, 5.0, 0.0], [0.0, 0.0, 40.0], 0.75, 5.0),
    seg("branch31", Some(8), [-1.6, 4.0, 0.0], [0.0, 0.0, 40.0], 0.6, 6.0),
    seg("branch32", Some(9), [1.5, 6.0, 0.0], [0.0, 0.0, -29.0], 0.3, 7.5),
    seg("branch4", Some(1), [0.3, 7.0, 5.0], [65.0, 0.0, -2.0], 0.75, 8.5),
    seg("branch41", Some(11), [0.0, 7.0, -2.0], [-37.0, 0.0, 0.0], 0.5, 7.5),
];

/// Kind of a skeleton node, carrying the dimensions of its collision shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeShape {
    /// Cube at the tree root.
    Pivot { half_extent: f32 },
    /// Y-aligned cylinder centred on the node origin.
    Segment { radius: f32, length: f32 },
}

/// A built skeleton node.
#[derive(Debug, Clone)]
pub struct SkeletonNode {
    pub name: &'static str,
    /// Arena index of the parent; `None` only for the pivot.
    pub parent: Option<usize>,
    pub shape: NodeShape,
    /// Transform relative to the parent node.
    pub local: Transform,
    /// Transform relative to the tree root.
    pub root: Transform,
}

/// Arena of skeleton nodes. Index 0 is the pivot.
#[derive(Debug, Clone)]
pub struct TreeSkeleton {
    nodes: Vec<SkeletonNode>,
}

impl TreeSkeleton {
    pub const PIVOT: usize = 0;

    /// Build a skeleton from a table whose rows only reference earlier rows.
    pub fn build(specs: &[SegmentSpec]) -> Self {
        let mut nodes = Vec::with_capacity(specs.len() + 1);
        nodes.push(SkeletonNode {
            name: "pivot",
            parent: None,
            shape: NodeShape::Pivot {
                half_extent: PIVOT_HALF_EXTENT,
            },
            local: Transform::default(),
            root: Transform::default(),
        });

        for (row, spec) in specs.iter().enumerate() {
            // Table row i lives at arena index i + 1.
            let parent = match spec.parent {
                Some(p) if p < row => p + 1,
                Some(p) => {
                    log::warn!(
                        "Skeleton row {} ({}) references later row {}; attaching to pivot",
                        row,
                        spec.name,
                        p
                    );
                    Self::PIVOT
                }
                None => Self::PIVOT,
            };
            let local = Transform::from_position_euler_degrees(spec.offset, spec.rotation);
            let root = nodes[parent].root.mul_transform(&local);
            nodes.push(SkeletonNode {
                name: spec.name,
                parent: Some(parent),
                shape: NodeShape::Segment {
                    radius: spec.radius,
                    length: spec.length,
                },
                local,
                root,
            });
        }

        Self { nodes }
    }

    /// The standard tree used by every prototype.
    pub fn tree01() -> Self {
        Self::build(&TREE01_SEGMENTS)
    }

    pub fn nodes(&self) -> &[SkeletonNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&SkeletonNode> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Children of `index`, in table order.
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.parent == Some(index))
            .map(|(i, _)| i)
    }

    /// Where the prototype model hangs, relative to the pivot.
    pub fn prototype_attachment(&self) -> Transform {
        Transform {
            scale: Vec3::splat(PROTOTYPE_SCALE),
            ..Default::default()
        }
    }

    /// Highest point reached by any segment, relative to the tree root.
    pub fn height(&self) -> f32 {
        self.nodes
            .iter()
            .map(|n| match n.shape {
                NodeShape::Pivot { half_extent } => n.root.position.y + half_extent,
                NodeShape::Segment { length, .. } => {
                    let tip = n.root.transform_point(Vec3::new(0.0, length * 0.5, 0.0));
                    let base = n.root.transform_point(Vec3::new(0.0, -length * 0.5, 0.0));
                    tip.y.max(base.y)
                }
            })
            .fold(f32::MIN, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree01_has_pivot_and_thirteen_segments() {
        let tree = TreeSkeleton::tree01();
        assert_eq!(tree.len(), 14);
        assert!(matches!(
            tree.node(TreeSkeleton::PIVOT).map(|n| n.shape),
            Some(NodeShape::Pivot { .. })
        ));
        let segments = tree
            .nodes()
            .iter()
            .filter(|n| matches!(n.shape, NodeShape::Segment { .. }))
            .count();
        assert_eq!(segments, 13);
    }

    #[test]
    fn parents_precede_children() {
        let tree = TreeSkeleton::tree01();
        for (i, node) in tree.nodes().iter().enumerate().skip(1) {
            let parent = node.parent.expect("every segment has a parent");
            assert!(parent < i, "{} points forward", node.name);
        }
    }

    #[test]
    fn topology_matches_table() {
        let tree = TreeSkeleton::tree01();
        let name_of = |i: usize| tree.node(i).map(|n| n.name).unwrap_or("?");

        let pivot_children: Vec<_> = tree.children(TreeSkeleton::PIVOT).map(name_of).collect();
        assert_eq!(pivot_children, vec!["trunk1"]);

        let trunk2 = tree
            .nodes()
            .iter()
            .position(|n| n.name == "trunk2")
            .unwrap();
        let mut off_trunk2: Vec<_> = tree.children(trunk2).map(name_of).collect();
        off_trunk2.sort_unstable();
        assert_eq!(
            off_trunk2,
            vec!["branch1", "branch2", "branch3", "branch4", "trunk3"]
        );

        let branch2 = tree
            .nodes()
            .iter()
            .position(|n| n.name == "branch2")
            .unwrap();
        let sub: Vec<_> = tree.children(branch2).map(name_of).collect();
        assert_eq!(sub, vec!["branch21", "branch23"]);
    }

    #[test]
    fn root_transforms_compose_parent_chain() {
        let tree = TreeSkeleton::tree01();
        let trunk1 = tree.node(1).unwrap();
        let trunk2 = tree.node(2).unwrap();
        assert!((trunk1.root.position - Vec3::new(0.0, 8.0, 0.0)).length() < 1e-5);
        assert!((trunk2.root.position - Vec3::new(0.0, 24.0, 0.0)).length() < 1e-5);

        for node in tree.nodes().iter().skip(1) {
            let parent = tree.node(node.parent.unwrap()).unwrap();
            let expected = parent.root.mul_transform(&node.local);
            assert!((expected.position - node.root.position).length() < 1e-4);
        }
    }

    #[test]
    fn forward_reference_falls_back_to_pivot() {
        let specs = [seg("odd", Some(3), [0.0, 1.0, 0.0], [0.0; 3], 1.0, 2.0)];
        let tree = TreeSkeleton::build(&specs);
        assert_eq!(tree.node(1).and_then(|n| n.parent), Some(TreeSkeleton::PIVOT));
    }

    #[test]
    fn tree_is_tall_enough_for_targets() {
        // Targets sit up to 14 units above the root.
        assert!(TreeSkeleton::tree01().height() > 30.0);
    }
}
