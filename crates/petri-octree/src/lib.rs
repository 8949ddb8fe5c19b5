//! Insertion-only AABB octree for coarse spatial debug visualization.
#![forbid(unsafe_code)]

use petri_geom::{Vec3, append_cube_outline};

const COUNT_THRESHOLD: usize = 100;
const DEPTH_THRESHOLD: u32 = 5;
const EPS: f32 = 1.0e-5;

/// A bounded item tracked by the tree.
#[derive(Clone, Copy, Debug)]
pub struct OctreeItem {
    pub min: Vec3,
    pub max: Vec3,
    pub id: u32,
}

struct Node {
    min: Vec3,
    max: Vec3,
    depth: u32,
    leaf: bool,
    // Child arena indices, valid only on internal nodes
    children: [u32; 8],
    items: Vec<OctreeItem>,
}

/// Adaptive AABB tree stored as a node arena; the root is index 0.
///
/// A leaf splits into 8 equal octants once it holds more than 100 items
/// (while shallower than depth 5) and re-inserts its items into every
/// overlapping child, so items spanning octant boundaries are duplicated.
/// Subdivision is irreversible; there is no removal.
pub struct Octree {
    nodes: Vec<Node>,
}

impl Octree {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Octree {
            nodes: vec![Node {
                min,
                max,
                depth: 0,
                leaf: true,
                children: [0; 8],
                items: Vec::new(),
            }],
        }
    }

    pub fn insert(&mut self, item: OctreeItem) {
        self.insert_at(0, item);
    }

    fn insert_at(&mut self, node_id: u32, item: OctreeItem) {
        let idx = node_id as usize;
        {
            let node = &self.nodes[idx];
            if item.min.x > node.max.x * (1.0 + EPS)
                || item.min.y > node.max.y * (1.0 + EPS)
                || item.min.z > node.max.z * (1.0 + EPS)
                || item.max.x < node.min.x * (1.0 - EPS)
                || item.max.y < node.min.y * (1.0 - EPS)
                || item.max.z < node.min.z * (1.0 - EPS)
            {
                return;
            }
        }
        if self.nodes[idx].leaf {
            self.nodes[idx].items.push(item);
            if self.nodes[idx].items.len() > COUNT_THRESHOLD
                && self.nodes[idx].depth < DEPTH_THRESHOLD
            {
                self.split(node_id);
            }
        } else {
            let children = self.nodes[idx].children;
            for child in children {
                self.insert_at(child, item);
            }
        }
    }

    fn split(&mut self, node_id: u32) {
        let idx = node_id as usize;
        let (min, max, depth) = {
            let node = &self.nodes[idx];
            (node.min, node.max, node.depth)
        };
        let half = (max - min) * 0.5;
        let items = std::mem::take(&mut self.nodes[idx].items);
        self.nodes[idx].leaf = false;
        for i in 0..8u32 {
            let dx = (i & 1) as f32;
            let dy = ((i >> 1) & 1) as f32;
            let dz = ((i >> 2) & 1) as f32;
            let child_min = min + Vec3::new(half.x * dx, half.y * dy, half.z * dz);
            let child_id = self.nodes.len() as u32;
            self.nodes.push(Node {
                min: child_min,
                max: child_min + half,
                depth: depth + 1,
                leaf: true,
                children: [0; 8],
                items: Vec::new(),
            });
            self.nodes[idx].children[i as usize] = child_id;
            for &it in &items {
                self.insert_at(child_id, it);
            }
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Items held across all leaves; duplicates from octant-spanning
    /// inserts are counted once per holding leaf.
    pub fn total_item_count(&self) -> usize {
        self.nodes.iter().map(|n| n.items.len()).sum()
    }

    pub fn max_depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Appends every node's bounding box as outline segments.
    pub fn append_outline_lines(&self, lines: &mut Vec<Vec3>) {
        for node in &self.nodes {
            append_cube_outline(lines, node.min, node.max - node.min);
        }
    }
}
