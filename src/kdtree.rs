//! Balanced 2-D nearest-neighbor index over a point cloud.
//!
//! Immutable per build: the tree is rebuilt in full whenever the point set
//! changes. Nodes live in a flat arena and leaves index into a permutation of
//! the original point order, so point `i` of the input keeps `i` as its
//! identity in query results.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

const LEAF_SIZE: usize = 16;

#[derive(Debug, Clone, Copy)]
struct Node {
    min: [f32; 2],
    max: [f32; 2],
    // u32::MAX marks a leaf; leaves cover `order[start..end]`.
    left: u32,
    right: u32,
    start: u32,
    end: u32,
    split: f32,
    axis: u8,
}

/// One query result: the point's stable index and its Euclidean distance
/// from the query position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

#[derive(Debug, Default)]
pub struct KdTree {
    nodes: Vec<Node>,
    order: Vec<u32>,
    points: Vec<[f32; 2]>,
    root: u32,
}

struct Builder<'a> {
    points: &'a [[f32; 2]],
    nodes: Vec<Node>,
    order: Vec<u32>,
}

impl Builder<'_> {
    fn split(&mut self, start: usize, end: usize) -> u32 {
        let count = end - start;

        let mut min = [f32::INFINITY; 2];
        let mut max = [f32::NEG_INFINITY; 2];
        for &i in &self.order[start..end] {
            let p = self.points[i as usize];
            for axis in 0..2 {
                if p[axis] < min[axis] {
                    min[axis] = p[axis];
                }
                if p[axis] > max[axis] {
                    max[axis] = p[axis];
                }
            }
        }

        if count <= LEAF_SIZE {
            let node = self.nodes.len() as u32;
            self.nodes.push(Node {
                min,
                max,
                left: u32::MAX,
                right: u32::MAX,
                start: start as u32,
                end: end as u32,
                split: 0.0,
                axis: 0,
            });
            return node;
        }

        let axis = if (max[0] - min[0]) >= (max[1] - min[1]) {
            0
        } else {
            1
        };

        let mid = start + count / 2;
        let points = self.points;
        self.order[start..end].select_nth_unstable_by(count / 2, |&a, &b| {
            let va = points[a as usize][axis];
            let vb = points[b as usize][axis];
            va.partial_cmp(&vb).unwrap_or(Ordering::Equal)
        });
        let split = points[self.order[mid] as usize][axis];

        let left = self.split(start, mid);
        let right = self.split(mid, end);

        let node = self.nodes.len() as u32;
        self.nodes.push(Node {
            min,
            max,
            left,
            right,
            start: 0,
            end: 0,
            split,
            axis: axis as u8,
        });
        node
    }
}

// Max-heap entry so the root is always the worst of the current k.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    dist_sq: f32,
    index: u32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .total_cmp(&other.dist_sq)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl KdTree {
    /// Builds the index over the common prefix of `x` and `y` (the shorter
    /// length wins if they differ).
    pub fn build(x: &[f32], y: &[f32]) -> Self {
        let len = x.len().min(y.len());
        let points: Vec<[f32; 2]> = (0..len).map(|i| [x[i], y[i]]).collect();

        let mut builder = Builder {
            points: &points,
            nodes: Vec::new(),
            order: (0..len as u32).collect(),
        };

        let root = if len == 0 {
            u32::MAX
        } else {
            builder.nodes.reserve(len / LEAF_SIZE * 2 + 1);
            builder.split(0, len)
        };

        let Builder { nodes, order, .. } = builder;
        Self {
            nodes,
            order,
            points,
            root,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The `k` points closest to `(x, y)`, ascending by Euclidean distance.
    /// Returns fewer than `k` results on small or partly non-finite sets and
    /// nothing on an empty index.
    pub fn nearest(&self, x: f32, y: f32, k: usize) -> Vec<Neighbor> {
        if k == 0 || self.nodes.is_empty() {
            return Vec::new();
        }

        let mut heap = BinaryHeap::with_capacity(k + 1);
        self.search(self.root, [x, y], k, &mut heap);

        heap.into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor {
                index: c.index as usize,
                distance: c.dist_sq.sqrt(),
            })
            .collect()
    }

    fn search(&self, node: u32, q: [f32; 2], k: usize, heap: &mut BinaryHeap<Candidate>) {
        let n = &self.nodes[node as usize];

        if heap.len() == k {
            let worst = heap.peek().map(|c| c.dist_sq).unwrap_or(f32::INFINITY);
            if Self::bbox_dist_sq(n, q) > worst {
                return;
            }
        }

        if n.left == u32::MAX {
            for &i in &self.order[n.start as usize..n.end as usize] {
                let p = self.points[i as usize];
                let dist_sq = (p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2);
                if !dist_sq.is_finite() {
                    continue;
                }
                heap.push(Candidate { dist_sq, index: i });
                if heap.len() > k {
                    heap.pop();
                }
            }
            return;
        }

        // Descend into the side of the split containing the query first; the
        // far side prunes itself against the shrunken worst distance.
        let (near, far) = if q[n.axis as usize] <= n.split {
            (n.left, n.right)
        } else {
            (n.right, n.left)
        };
        self.search(near, q, k, heap);
        self.search(far, q, k, heap);
    }

    fn bbox_dist_sq(node: &Node, q: [f32; 2]) -> f32 {
        let mut dist_sq = 0.0;
        for axis in 0..2 {
            let d = (node.min[axis] - q[axis]).max(q[axis] - node.max[axis]).max(0.0);
            dist_sq += d * d;
        }
        dist_sq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn brute_force_nearest(x: &[f32], y: &[f32], qx: f32, qy: f32) -> (usize, f32) {
        let mut best = (usize::MAX, f32::INFINITY);
        for i in 0..x.len() {
            let d = ((x[i] - qx).powi(2) + (y[i] - qy).powi(2)).sqrt();
            if d < best.1 {
                best = (i, d);
            }
        }
        best
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let n = 500;
        let x: Vec<f32> = (0..n).map(|_| rng.gen_range(-100.0..100.0)).collect();
        let y: Vec<f32> = (0..n).map(|_| rng.gen_range(-100.0..100.0)).collect();
        let tree = KdTree::build(&x, &y);

        for _ in 0..200 {
            let qx = rng.gen_range(-120.0..120.0);
            let qy = rng.gen_range(-120.0..120.0);
            let hit = tree.nearest(qx, qy, 1);
            assert_eq!(hit.len(), 1);
            let (expected_idx, expected_dist) = brute_force_nearest(&x, &y, qx, qy);
            assert_eq!(hit[0].index, expected_idx);
            assert!((hit[0].distance - expected_dist).abs() < 1e-4);
        }
    }

    #[test]
    fn test_k_results_are_sorted_ascending() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let x: Vec<f32> = (0..200).map(|_| rng.gen_range(-10.0..10.0)).collect();
        let y: Vec<f32> = (0..200).map(|_| rng.gen_range(-10.0..10.0)).collect();
        let tree = KdTree::build(&x, &y);

        let hits = tree.nearest(0.5, -0.5, 10);
        assert_eq!(hits.len(), 10);
        for pair in hits.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let tree = KdTree::build(&[], &[]);
        assert!(tree.is_empty());
        assert!(tree.nearest(1.0, 2.0, 1).is_empty());
    }

    #[test]
    fn test_single_point_tree() {
        let tree = KdTree::build(&[4.0], &[-2.0]);
        let hits = tree.nearest(0.0, 0.0, 3);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, 0);
        assert!((hits[0].distance - (16.0f32 + 4.0).sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_unequal_input_lengths_truncate() {
        let tree = KdTree::build(&[0.0, 1.0, 2.0, 3.0], &[0.0, 1.0]);
        assert_eq!(tree.len(), 2);
        let hits = tree.nearest(3.0, 3.0, 4);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|n| n.index < 2));
    }

    #[test]
    fn test_rebuild_with_shorter_input_yields_valid_indices() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let x: Vec<f32> = (0..100).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let y: Vec<f32> = (0..100).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let _big = KdTree::build(&x, &y);

        let small = KdTree::build(&x[..5], &y[..5]);
        for _ in 0..50 {
            let q = (rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0));
            for hit in small.nearest(q.0, q.1, 3) {
                assert!(hit.index < 5);
            }
        }
    }
}
