use crate::constants::{QUADTREE_CAPACITY, QUADTREE_MAX_DEPTH};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle given by its top-left corner and extent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn mid(&self) -> [f64; 2] {
        [self.x + self.width / 2.0, self.y + self.height / 2.0]
    }

    /// Half-open containment: the right and bottom edges belong to the neighbour.
    pub fn contains(&self, p: [f64; 2]) -> bool {
        p[0] >= self.x && p[0] < self.x + self.width && p[1] >= self.y && p[1] < self.y + self.height
    }

    /// Exact rectangle/circle overlap test via the closest point on the rectangle.
    pub fn intersects_circle(&self, center: [f64; 2], radius: f64) -> bool {
        let nearest_x = center[0].clamp(self.x, self.x + self.width);
        let nearest_y = center[1].clamp(self.y, self.y + self.height);
        let dx = center[0] - nearest_x;
        let dy = center[1] - nearest_y;
        dx * dx + dy * dy <= radius * radius
    }

    fn quadrants(&self) -> [Rect; 4] {
        let w = self.width / 2.0;
        let h = self.height / 2.0;
        let [mx, my] = self.mid();
        [
            Rect::new(self.x, self.y, w, h),
            Rect::new(mx, self.y, w, h),
            Rect::new(self.x, my, w, h),
            Rect::new(mx, my, w, h),
        ]
    }
}

/// One node's rectangle and depth, for exporting the current partition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRegion {
    pub bounds: Rect,
    pub level: usize,
    pub entries: usize,
}

/// Quadrant of `bounds` that unambiguously owns `p`. Points on a midline, or
/// outside `bounds`, have no owner and stay at the current level.
fn quadrant_for(bounds: &Rect, p: [f64; 2]) -> Option<usize> {
    if !bounds.contains(p) {
        return None;
    }
    let [mx, my] = bounds.mid();
    if p[0] == mx || p[1] == my {
        return None;
    }
    let right = usize::from(p[0] > mx);
    let bottom = usize::from(p[1] > my);
    Some(bottom * 2 + right)
}

#[derive(Clone, Copy, Debug)]
struct Entry<K> {
    key: K,
    position: [f64; 2],
}

#[derive(Clone, Debug)]
struct Node<K> {
    bounds: Rect,
    level: usize,
    entries: Vec<Entry<K>>,
    children: Option<Box<[Node<K>; 4]>>,
}

impl<K: Copy + PartialEq> Node<K> {
    fn new(bounds: Rect, level: usize) -> Self {
        Self {
            bounds,
            level,
            entries: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, entry: Entry<K>, capacity: usize, max_depth: usize) {
        if let Some(children) = self.children.as_mut() {
            if let Some(q) = quadrant_for(&self.bounds, entry.position) {
                children[q].insert(entry, capacity, max_depth);
                return;
            }
        }

        self.entries.push(entry);

        if self.entries.len() > capacity && self.level < max_depth {
            if self.children.is_none() {
                let level = self.level + 1;
                let [a, b, c, d] = self.bounds.quadrants();
                self.children = Some(Box::new([
                    Node::new(a, level),
                    Node::new(b, level),
                    Node::new(c, level),
                    Node::new(d, level),
                ]));
            }
            let bounds = self.bounds;
            let pending = std::mem::take(&mut self.entries);
            if let Some(children) = self.children.as_mut() {
                for entry in pending {
                    match quadrant_for(&bounds, entry.position) {
                        Some(q) => children[q].insert(entry, capacity, max_depth),
                        None => self.entries.push(entry),
                    }
                }
            }
        }
    }

    fn query(
        &self,
        center: [f64; 2],
        radius: f64,
        exclude: Option<K>,
        out: &mut Vec<K>,
    ) {
        let r_sq = radius * radius;
        for entry in &self.entries {
            if exclude == Some(entry.key) {
                continue;
            }
            let dx = entry.position[0] - center[0];
            let dy = entry.position[1] - center[1];
            if dx * dx + dy * dy <= r_sq {
                out.push(entry.key);
            }
        }
        if let Some(children) = &self.children {
            for child in children.iter() {
                if child.bounds.intersects_circle(center, radius) {
                    child.query(center, radius, exclude, out);
                }
            }
        }
    }

    fn collect_regions(&self, out: &mut Vec<NodeRegion>) {
        out.push(NodeRegion {
            bounds: self.bounds,
            level: self.level,
            entries: self.entries.len(),
        });
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.collect_regions(out);
            }
        }
    }

    fn depth(&self) -> usize {
        self.children
            .as_ref()
            .map(|c| c.iter().map(Node::depth).max().unwrap_or(self.level))
            .unwrap_or(self.level)
    }
}

/// Region quadtree over point entries keyed by `K`, answering circular range
/// queries. Rebuilt from scratch each step; there is no removal.
///
/// Entries exactly on a split line, or outside the root rectangle, are kept
/// by the nearest ancestor that cannot place them, and queries scan every
/// visited node's own entries. Results therefore have no false negatives.
#[derive(Clone, Debug)]
pub struct QuadTree<K> {
    root: Node<K>,
    capacity: usize,
    max_depth: usize,
    len: usize,
}

impl<K: Copy + PartialEq> QuadTree<K> {
    pub fn new(bounds: Rect) -> Self {
        Self::with_limits(bounds, QUADTREE_CAPACITY, QUADTREE_MAX_DEPTH)
    }

    pub fn with_limits(bounds: Rect, capacity: usize, max_depth: usize) -> Self {
        Self {
            root: Node::new(bounds, 0),
            capacity,
            max_depth,
            len: 0,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.root.bounds
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop every entry and child node, keeping the root rectangle.
    pub fn clear(&mut self) {
        self.root = Node::new(self.root.bounds, 0);
        self.len = 0;
    }

    pub fn insert(&mut self, key: K, position: [f64; 2]) {
        self.root
            .insert(Entry { key, position }, self.capacity, self.max_depth);
        self.len += 1;
    }

    /// Clear, then insert every `(key, position)` pair in iteration order.
    pub fn rebuild(&mut self, entries: impl IntoIterator<Item = (K, [f64; 2])>) {
        self.clear();
        for (key, position) in entries {
            self.insert(key, position);
        }
    }

    /// Keys whose position lies within Euclidean distance `radius` of `center`,
    /// skipping `exclude`. Order follows tree traversal.
    pub fn query_radius(&self, center: [f64; 2], radius: f64, exclude: Option<K>) -> Vec<K> {
        let mut out = Vec::new();
        if self.len == 0 || radius.is_nan() || radius < 0.0 {
            return out;
        }
        self.root.query(center, radius, exclude, &mut out);
        out
    }

    /// Every node's rectangle, depth, and directly held entry count, pre-order.
    pub fn regions(&self) -> Vec<NodeRegion> {
        let mut out = Vec::new();
        self.root.collect_regions(&mut out);
        out
    }

    /// Deepest level that has been created.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha12Rng;
    use rstar::{primitives::GeomWithData, RTree};

    fn arena() -> Rect {
        Rect::new(0.0, 0.0, 100.0, 100.0)
    }

    fn sorted(mut v: Vec<u32>) -> Vec<u32> {
        v.sort_unstable();
        v
    }

    #[test]
    fn query_finds_entries_within_radius() {
        let mut tree = QuadTree::new(arena());
        tree.insert(0u32, [5.0, 5.0]);
        tree.insert(1, [6.0, 5.0]);
        tree.insert(2, [50.0, 50.0]);
        assert_eq!(sorted(tree.query_radius([5.0, 5.0], 2.0, None)), vec![0, 1]);
    }

    #[test]
    fn query_excludes_self() {
        let mut tree = QuadTree::new(arena());
        tree.insert(0u32, [5.0, 5.0]);
        tree.insert(1, [6.0, 5.0]);
        assert_eq!(tree.query_radius([5.0, 5.0], 2.0, Some(0)), vec![1]);
    }

    #[test]
    fn query_on_empty_tree_is_empty() {
        let tree: QuadTree<u32> = QuadTree::new(arena());
        assert!(tree.query_radius([50.0, 50.0], 1000.0, None).is_empty());
    }

    #[test]
    fn boundary_distance_is_inclusive() {
        let mut tree = QuadTree::new(arena());
        tree.insert(7u32, [13.0, 10.0]);
        assert_eq!(tree.query_radius([10.0, 10.0], 3.0, None), vec![7]);
        assert!(tree.query_radius([10.0, 10.0], 2.999, None).is_empty());
    }

    #[test]
    fn overflow_splits_into_quadrants() {
        let mut tree = QuadTree::new(arena());
        for i in 0..6u32 {
            tree.insert(i, [10.0 + i as f64, 10.0 + i as f64]);
        }
        assert!(tree.depth() >= 1);
        assert_eq!(tree.regions().len() % 4, 1, "root plus whole sets of four children");
    }

    #[test]
    fn midline_entries_stay_in_parent() {
        let mut tree = QuadTree::new(arena());
        for i in 0..5u32 {
            tree.insert(i, [50.0, 10.0 + i as f64 * 10.0]);
        }
        // Sixth insert forces a split; every point on x = 50 stays at the root.
        tree.insert(5, [20.0, 20.0]);
        let regions = tree.regions();
        assert_eq!(regions[0].level, 0);
        assert_eq!(regions[0].entries, 5);
        assert_eq!(sorted(tree.query_radius([50.0, 50.0], 45.0, None)), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn depth_never_exceeds_limit_for_coincident_points() {
        let mut tree = QuadTree::new(arena());
        for i in 0..64u32 {
            tree.insert(i, [12.3, 12.3]);
        }
        assert!(tree.depth() <= QUADTREE_MAX_DEPTH);
        assert_eq!(tree.query_radius([12.3, 12.3], 0.001, None).len(), 64);
    }

    #[test]
    fn entries_outside_root_are_still_found() {
        let mut tree = QuadTree::new(arena());
        for i in 0..10u32 {
            tree.insert(i, [i as f64 * 9.0 + 1.0, 1.0]);
        }
        tree.insert(99, [103.0, 50.0]);
        assert_eq!(tree.query_radius([101.0, 50.0], 2.5, None), vec![99]);
    }

    #[test]
    fn covering_query_returns_every_entry_minus_self() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let mut tree = QuadTree::new(arena());
        for i in 0..300u32 {
            tree.insert(i, [rng.random::<f64>() * 100.0, rng.random::<f64>() * 100.0]);
        }
        assert_eq!(tree.len(), 300);
        let all = sorted(tree.query_radius([50.0, 50.0], 75.0, Some(17)));
        let expected: Vec<u32> = (0..300).filter(|&i| i != 17).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn rebuild_replaces_previous_contents() {
        let mut tree = QuadTree::new(arena());
        tree.rebuild((0..20u32).map(|i| (i, [i as f64 * 4.0, 30.0])));
        tree.rebuild([(100u32, [1.0, 1.0])]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.query_radius([0.0, 0.0], 200.0, None), vec![100]);
    }

    #[test]
    fn rect_circle_test_is_exact_at_corners() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        // Bounding-box overlap but the corner is farther than the radius.
        assert!(!rect.intersects_circle([12.0, 12.0], 2.5));
        assert!(rect.intersects_circle([12.0, 12.0], 2.9));
        assert!(rect.intersects_circle([5.0, 5.0], 0.1));
    }

    #[test]
    fn matches_rtree_oracle_on_random_queries() {
        let mut rng = ChaCha12Rng::seed_from_u64(11);
        let points: Vec<[f64; 2]> = (0..500)
            .map(|_| {
                // Snap some points to the midlines to exercise parent-held entries.
                let x = if rng.random_bool(0.1) { 50.0 } else { rng.random::<f64>() * 100.0 };
                let y = if rng.random_bool(0.1) { 25.0 } else { rng.random::<f64>() * 100.0 };
                [x, y]
            })
            .collect();

        let mut tree = QuadTree::new(arena());
        tree.rebuild(points.iter().enumerate().map(|(i, p)| (i as u32, *p)));
        let oracle = RTree::bulk_load(
            points
                .iter()
                .enumerate()
                .map(|(i, p)| GeomWithData::new(*p, i as u32))
                .collect(),
        );

        for _ in 0..200 {
            let center = [rng.random::<f64>() * 100.0, rng.random::<f64>() * 100.0];
            let radius = rng.random::<f64>() * 30.0;
            let expected = sorted(
                oracle
                    .locate_within_distance(center, radius * radius)
                    .map(|g| g.data)
                    .collect(),
            );
            assert_eq!(sorted(tree.query_radius(center, radius, None)), expected);
        }
    }
}
