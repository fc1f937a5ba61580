use crate::geometry::{Aabb, RayCastInput};
use crate::math::Vec2;
use crate::settings::{AABB_EXTENSION, AABB_MULTIPLIER};

const NULL_NODE: u32 = u32::MAX;

/// Identifies a leaf of a [`DynamicTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyId(pub(crate) u32);

impl ProxyId {
    /// Returns the raw node index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node in the tree
#[derive(Debug, Clone)]
struct TreeNode<T> {
    /// Fat bounding box for this node
    aabb: Aabb,
    /// Payload, present on leaves only
    user_data: Option<T>,
    /// Parent index, or the next free node while on the free list
    parent: u32,
    child1: u32,
    child2: u32,
}

impl<T> TreeNode<T> {
    #[inline]
    fn is_leaf(&self) -> bool {
        self.child1 == NULL_NODE
    }
}

/// A dynamic bounding volume tree over fattened AABBs.
///
/// Leaves carry a user payload (a fixture handle in the world). Fat AABBs
/// let proxies move a little without touching the tree.
#[derive(Debug, Clone)]
pub struct DynamicTree<T> {
    nodes: Vec<TreeNode<T>>,
    root: u32,
    /// Free node list for reuse
    free_list: Vec<u32>,
    /// Bit cursor walked by incremental rebalancing
    path: u32,
    insertion_count: u32,
}

impl<T: Copy> Default for DynamicTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> DynamicTree<T> {
    /// Creates a new empty tree
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(16),
            root: NULL_NODE,
            free_list: Vec::new(),
            path: 0,
            insertion_count: 0,
        }
    }

    /// Inserts a leaf for `aabb`, fattened by [`AABB_EXTENSION`]
    pub fn create_proxy(&mut self, aabb: &Aabb, user_data: T) -> ProxyId {
        let leaf = self.allocate_node();
        let node = &mut self.nodes[leaf as usize];
        node.aabb = aabb.expand(AABB_EXTENSION);
        node.user_data = Some(user_data);
        self.insert_leaf(leaf);
        ProxyId(leaf)
    }

    /// Removes a leaf from the tree
    pub fn destroy_proxy(&mut self, proxy: ProxyId) {
        debug_assert!(self.nodes[proxy.index()].is_leaf());
        self.remove_leaf(proxy.0);
        self.free_node(proxy.0);
    }

    /// Moves a proxy to a new tight `aabb`.
    ///
    /// Nothing happens while the stored fat AABB still contains `aabb`.
    /// Otherwise the leaf is re-inserted with a box extended in the
    /// direction of `displacement`. Returns true if the tree changed.
    pub fn move_proxy(&mut self, proxy: ProxyId, aabb: &Aabb, displacement: Vec2) -> bool {
        let leaf = proxy.0;
        debug_assert!(self.nodes[leaf as usize].is_leaf());

        if self.nodes[leaf as usize].aabb.contains(aabb) {
            return false;
        }

        self.remove_leaf(leaf);

        let extend = Vec2::new(
            AABB_EXTENSION + AABB_MULTIPLIER * displacement.x.abs(),
            AABB_EXTENSION + AABB_MULTIPLIER * displacement.y.abs(),
        );
        self.nodes[leaf as usize].aabb = Aabb::new(aabb.lower - extend, aabb.upper + extend);

        self.insert_leaf(leaf);
        true
    }

    /// Re-inserts `iterations` leaves, walking a different root-to-leaf
    /// path each time.
    pub fn rebalance(&mut self, iterations: usize) {
        if self.root == NULL_NODE {
            return;
        }

        for _ in 0..iterations {
            let mut node = self.root;
            let mut bit = 0u32;
            while !self.nodes[node as usize].is_leaf() {
                let n = &self.nodes[node as usize];
                node = if (self.path >> bit) & 1 == 1 {
                    n.child2
                } else {
                    n.child1
                };
                bit = (bit + 1) & 31;
            }
            self.path = self.path.wrapping_add(1);

            self.remove_leaf(node);
            self.insert_leaf(node);
        }
    }

    /// Fat AABB stored for a proxy
    #[inline]
    pub fn fat_aabb(&self, proxy: ProxyId) -> &Aabb {
        &self.nodes[proxy.index()].aabb
    }

    /// Payload stored for a proxy
    #[inline]
    pub fn user_data(&self, proxy: ProxyId) -> Option<T> {
        self.nodes.get(proxy.index()).and_then(|n| n.user_data)
    }

    /// Visits every leaf whose fat AABB overlaps `aabb`.
    /// The callback returns false to stop the query.
    pub fn query<F>(&self, aabb: &Aabb, mut callback: F)
    where
        F: FnMut(ProxyId) -> bool,
    {
        if self.root == NULL_NODE {
            return;
        }

        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(current) = stack.pop() {
            let n = &self.nodes[current as usize];
            if !n.aabb.test_overlap(aabb) {
                continue;
            }

            if n.is_leaf() {
                if !callback(ProxyId(current)) {
                    return;
                }
            } else {
                stack.push(n.child1);
                stack.push(n.child2);
            }
        }
    }

    /// Casts a segment through the tree.
    ///
    /// The callback receives the input clipped to the current max fraction
    /// and returns the new max fraction: 0 terminates the cast, a positive
    /// value clips the segment and a negative value ignores the proxy.
    pub fn ray_cast<F>(&self, input: &RayCastInput, mut callback: F)
    where
        F: FnMut(&RayCastInput, ProxyId) -> f32,
    {
        if self.root == NULL_NODE {
            return;
        }

        let p1 = input.p1;
        let p2 = input.p2;
        let r = (p2 - p1).normalize();

        // v is perpendicular to the segment
        let v = Vec2::scalar_cross(1.0, r);
        let abs_v = v.abs();

        let mut max_fraction = input.max_fraction;
        let mut segment_aabb = Aabb::from_points(p1, input.point_at(max_fraction));

        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(current) = stack.pop() {
            let n = &self.nodes[current as usize];
            if !n.aabb.test_overlap(&segment_aabb) {
                continue;
            }

            // Separating axis for segment (Gino, p80)
            // |dot(v, p1 - c)| > dot(|v|, h)
            let c = n.aabb.center();
            let h = n.aabb.extents();
            let separation = v.dot(p1 - c).abs() - abs_v.dot(h);
            if separation > 0.0 {
                continue;
            }

            if n.is_leaf() {
                let sub_input = RayCastInput {
                    p1,
                    p2,
                    max_fraction,
                };
                let value = callback(&sub_input, ProxyId(current));
                if value == 0.0 {
                    return;
                }
                if value > 0.0 {
                    max_fraction = value;
                    segment_aabb = Aabb::from_points(p1, input.point_at(max_fraction));
                }
            } else {
                stack.push(n.child1);
                stack.push(n.child2);
            }
        }
    }

    /// Height of the tree, 0 for an empty or single-leaf tree
    pub fn height(&self) -> usize {
        if self.root == NULL_NODE {
            return 0;
        }
        self.compute_height(self.root)
    }

    fn compute_height(&self, node: u32) -> usize {
        let n = &self.nodes[node as usize];
        if n.is_leaf() {
            return 0;
        }
        1 + self.compute_height(n.child1).max(self.compute_height(n.child2))
    }

    /// Number of leaves inserted over the lifetime of the tree
    #[inline]
    pub fn insertion_count(&self) -> u32 {
        self.insertion_count
    }

    /// Checks parent links and that every internal box contains its
    /// children. Intended for tests and debug assertions.
    pub fn validate(&self) -> bool {
        if self.root == NULL_NODE {
            return true;
        }
        if self.nodes[self.root as usize].parent != NULL_NODE {
            return false;
        }
        self.validate_node(self.root)
    }

    fn validate_node(&self, index: u32) -> bool {
        let n = &self.nodes[index as usize];
        if n.is_leaf() {
            return n.user_data.is_some() && n.child2 == NULL_NODE;
        }

        let (c1, c2) = (&self.nodes[n.child1 as usize], &self.nodes[n.child2 as usize]);
        c1.parent == index
            && c2.parent == index
            && n.aabb.contains(&c1.aabb)
            && n.aabb.contains(&c2.aabb)
            && self.validate_node(n.child1)
            && self.validate_node(n.child2)
    }

    fn allocate_node(&mut self) -> u32 {
        let node = TreeNode {
            aabb: Aabb::default(),
            user_data: None,
            parent: NULL_NODE,
            child1: NULL_NODE,
            child2: NULL_NODE,
        };

        if let Some(index) = self.free_list.pop() {
            self.nodes[index as usize] = node;
            index
        } else {
            let index = self.nodes.len() as u32;
            self.nodes.push(node);
            index
        }
    }

    fn free_node(&mut self, index: u32) {
        let node = &mut self.nodes[index as usize];
        node.user_data = None;
        node.parent = NULL_NODE;
        node.child1 = NULL_NODE;
        node.child2 = NULL_NODE;
        self.free_list.push(index);
    }

    fn insert_leaf(&mut self, leaf: u32) {
        self.insertion_count = self.insertion_count.wrapping_add(1);

        if self.root == NULL_NODE {
            self.root = leaf;
            self.nodes[leaf as usize].parent = NULL_NODE;
            return;
        }

        let sibling = self.find_best_sibling(leaf);

        // Create a new parent wrapping sibling and leaf
        let old_parent = self.nodes[sibling as usize].parent;
        let new_parent = self.allocate_node();
        let combined = self.nodes[leaf as usize]
            .aabb
            .combine(&self.nodes[sibling as usize].aabb);
        {
            let p = &mut self.nodes[new_parent as usize];
            p.parent = old_parent;
            p.aabb = combined;
            p.child1 = sibling;
            p.child2 = leaf;
        }
        self.nodes[sibling as usize].parent = new_parent;
        self.nodes[leaf as usize].parent = new_parent;

        if old_parent == NULL_NODE {
            self.root = new_parent;
            return;
        }

        let op = &mut self.nodes[old_parent as usize];
        if op.child1 == sibling {
            op.child1 = new_parent;
        } else {
            op.child2 = new_parent;
        }

        // Refit ancestors until one already holds the new box
        let mut child = new_parent;
        let mut parent = old_parent;
        while parent != NULL_NODE {
            let child_aabb = self.nodes[child as usize].aabb;
            if self.nodes[parent as usize].aabb.contains(&child_aabb) {
                break;
            }
            self.refit_node(parent);
            child = parent;
            parent = self.nodes[parent as usize].parent;
        }
    }

    /// Descends toward the child whose center is nearest the leaf's center
    /// in Manhattan distance.
    fn find_best_sibling(&self, leaf: u32) -> u32 {
        let center = self.nodes[leaf as usize].aabb.center();
        let mut sibling = self.root;

        while !self.nodes[sibling as usize].is_leaf() {
            let n = &self.nodes[sibling as usize];
            let d1 = (self.nodes[n.child1 as usize].aabb.center() - center).abs();
            let d2 = (self.nodes[n.child2 as usize].aabb.center() - center).abs();
            sibling = if d1.x + d1.y < d2.x + d2.y {
                n.child1
            } else {
                n.child2
            };
        }

        sibling
    }

    fn remove_leaf(&mut self, leaf: u32) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.nodes[leaf as usize].parent;
        let grandparent = self.nodes[parent as usize].parent;
        let sibling = if self.nodes[parent as usize].child1 == leaf {
            self.nodes[parent as usize].child2
        } else {
            self.nodes[parent as usize].child1
        };

        if grandparent == NULL_NODE {
            self.root = sibling;
            self.nodes[sibling as usize].parent = NULL_NODE;
            self.free_node(parent);
            return;
        }

        // Splice the sibling into the grandparent
        let gp = &mut self.nodes[grandparent as usize];
        if gp.child1 == parent {
            gp.child1 = sibling;
        } else {
            gp.child2 = sibling;
        }
        self.nodes[sibling as usize].parent = grandparent;
        self.free_node(parent);

        // Shrink ancestors until one does not change
        let mut node = grandparent;
        while node != NULL_NODE {
            let old_aabb = self.nodes[node as usize].aabb;
            self.refit_node(node);
            if old_aabb.contains(&self.nodes[node as usize].aabb) {
                break;
            }
            node = self.nodes[node as usize].parent;
        }
    }

    #[inline]
    fn refit_node(&mut self, index: u32) {
        let n = &self.nodes[index as usize];
        let combined = self.nodes[n.child1 as usize]
            .aabb
            .combine(&self.nodes[n.child2 as usize].aabb);
        self.nodes[index as usize].aabb = combined;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aabb(x0: f32, y0: f32, x1: f32, y1: f32) -> Aabb {
        Aabb::new(Vec2::new(x0, y0), Vec2::new(x1, y1))
    }

    fn collect(tree: &DynamicTree<u32>, query: &Aabb) -> Vec<u32> {
        let mut hits = Vec::new();
        tree.query(query, |id| {
            hits.push(tree.user_data(id).expect("leaf has data"));
            true
        });
        hits.sort_unstable();
        hits
    }

    #[test]
    fn test_insert_and_query() {
        let mut tree = DynamicTree::new();
        tree.create_proxy(&aabb(0.0, 0.0, 1.0, 1.0), 0u32);
        tree.create_proxy(&aabb(0.5, 0.0, 1.5, 1.0), 1);
        tree.create_proxy(&aabb(5.0, 0.0, 6.0, 1.0), 2);
        assert!(tree.validate());

        assert_eq!(collect(&tree, &aabb(0.2, 0.2, 0.3, 0.3)), vec![0]);
        assert_eq!(collect(&tree, &aabb(0.9, 0.2, 1.0, 0.3)), vec![0, 1]);
        assert_eq!(collect(&tree, &aabb(5.5, 0.5, 5.6, 0.6)), vec![2]);
    }

    #[test]
    fn test_fat_aabb_absorbs_small_moves() {
        let mut tree = DynamicTree::new();
        let id = tree.create_proxy(&aabb(0.0, 0.0, 1.0, 1.0), 7u32);
        let fat = *tree.fat_aabb(id);
        assert!(fat.contains(&aabb(0.0, 0.0, 1.0, 1.0)));

        // Inside the margin: no update
        assert!(!tree.move_proxy(id, &aabb(0.05, 0.0, 1.05, 1.0), Vec2::new(0.05, 0.0)));
        assert_eq!(*tree.fat_aabb(id), fat);

        // Beyond the margin: re-inserted and extended along the motion
        let moved = aabb(3.0, 0.0, 4.0, 1.0);
        assert!(tree.move_proxy(id, &moved, Vec2::new(3.0, 0.0)));
        let fat = *tree.fat_aabb(id);
        assert!(fat.contains(&moved));
        assert!(fat.upper.x >= 4.0 + AABB_MULTIPLIER * 3.0);
        assert!(tree.validate());
    }

    #[test]
    fn test_destroy() {
        let mut tree = DynamicTree::new();
        let a = tree.create_proxy(&aabb(0.0, 0.0, 1.0, 1.0), 0u32);
        let b = tree.create_proxy(&aabb(2.0, 0.0, 3.0, 1.0), 1);
        let c = tree.create_proxy(&aabb(4.0, 0.0, 5.0, 1.0), 2);

        tree.destroy_proxy(b);
        assert!(tree.validate());
        assert_eq!(collect(&tree, &aabb(-10.0, -10.0, 10.0, 10.0)), vec![0, 2]);

        tree.destroy_proxy(a);
        tree.destroy_proxy(c);
        assert_eq!(tree.height(), 0);
        assert!(collect(&tree, &aabb(-10.0, -10.0, 10.0, 10.0)).is_empty());
    }

    #[test]
    fn test_query_stops_early() {
        let mut tree = DynamicTree::new();
        for i in 0..10u32 {
            let x = i as f32 * 0.1;
            tree.create_proxy(&aabb(x, 0.0, x + 1.0, 1.0), i);
        }
        let mut visits = 0;
        tree.query(&aabb(0.0, 0.0, 2.0, 1.0), |_| {
            visits += 1;
            false
        });
        assert_eq!(visits, 1);
    }

    #[test]
    fn test_rebalance_keeps_leaves() {
        let mut tree = DynamicTree::new();
        for i in 0..32u32 {
            let x = i as f32 * 2.0;
            tree.create_proxy(&aabb(x, 0.0, x + 1.0, 1.0), i);
        }
        tree.rebalance(20);
        assert!(tree.validate());
        assert_eq!(collect(&tree, &aabb(-1.0, -1.0, 100.0, 2.0)).len(), 32);
    }

    #[test]
    fn test_ray_cast_clips() {
        let mut tree = DynamicTree::new();
        tree.create_proxy(&aabb(2.0, -1.0, 3.0, 1.0), 0u32);
        tree.create_proxy(&aabb(6.0, -1.0, 7.0, 1.0), 1);
        tree.create_proxy(&aabb(2.0, 5.0, 3.0, 6.0), 2);

        let input = RayCastInput::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
        let mut seen = Vec::new();
        tree.ray_cast(&input, |sub, id| {
            seen.push(tree.user_data(id).expect("leaf has data"));
            // Report a hit at the box's near face
            let aabb = tree.fat_aabb(id);
            let fraction = (aabb.lower.x - sub.p1.x) / (sub.p2.x - sub.p1.x);
            fraction.min(sub.max_fraction)
        });
        assert!(seen.contains(&0));
        assert!(!seen.contains(&2));
    }
}
