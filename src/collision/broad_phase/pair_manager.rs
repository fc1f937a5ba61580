use crate::geometry::{Aabb, RayCastInput};
use crate::math::Vec2;

use super::dynamic_tree::{DynamicTree, ProxyId};

/// Broad phase: a dynamic tree plus a buffer of proxies that moved.
///
/// `update_pairs` reports candidate pairs for moved proxies only. Pairs are
/// filtered against the immediately preceding pair; callers must tolerate
/// repeats.
#[derive(Debug, Clone)]
pub struct BroadPhase<T> {
    tree: DynamicTree<T>,
    move_buffer: Vec<ProxyId>,
    proxy_count: usize,
}

impl<T: Copy + PartialEq> Default for BroadPhase<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + PartialEq> BroadPhase<T> {
    pub fn new() -> Self {
        Self {
            tree: DynamicTree::new(),
            move_buffer: Vec::new(),
            proxy_count: 0,
        }
    }

    /// Creates a proxy and schedules it for pairing
    pub fn create_proxy(&mut self, aabb: &Aabb, user_data: T) -> ProxyId {
        let proxy = self.tree.create_proxy(aabb, user_data);
        self.proxy_count += 1;
        self.buffer_move(proxy);
        proxy
    }

    pub fn destroy_proxy(&mut self, proxy: ProxyId) {
        self.unbuffer_move(proxy);
        self.proxy_count -= 1;
        self.tree.destroy_proxy(proxy);
    }

    /// Moves a proxy; it is scheduled for pairing only if the tree changed
    pub fn move_proxy(&mut self, proxy: ProxyId, aabb: &Aabb, displacement: Vec2) {
        if self.tree.move_proxy(proxy, aabb, displacement) {
            self.buffer_move(proxy);
        }
    }

    /// Coarse overlap test on fat AABBs
    #[inline]
    pub fn test_overlap(&self, proxy_a: ProxyId, proxy_b: ProxyId) -> bool {
        self.tree.fat_aabb(proxy_a).test_overlap(self.tree.fat_aabb(proxy_b))
    }

    #[inline]
    pub fn fat_aabb(&self, proxy: ProxyId) -> &Aabb {
        self.tree.fat_aabb(proxy)
    }

    #[inline]
    pub fn user_data(&self, proxy: ProxyId) -> Option<T> {
        self.tree.user_data(proxy)
    }

    #[inline]
    pub fn proxy_count(&self) -> usize {
        self.proxy_count
    }

    #[inline]
    pub fn tree(&self) -> &DynamicTree<T> {
        &self.tree
    }

    /// Reports overlapping pairs of user data for every moved proxy, then
    /// clears the move buffer.
    pub fn update_pairs<F>(&mut self, mut callback: F)
    where
        F: FnMut(T, T),
    {
        let mut last_pair: Option<(T, T)> = None;

        while let Some(query_proxy) = self.move_buffer.pop() {
            let Some(query_data) = self.tree.user_data(query_proxy) else {
                continue;
            };
            let fat_aabb = *self.tree.fat_aabb(query_proxy);
            let tree = &self.tree;

            tree.query(&fat_aabb, |proxy| {
                // A proxy cannot form a pair with itself
                if proxy == query_proxy {
                    return true;
                }
                let Some(data) = tree.user_data(proxy) else {
                    return true;
                };

                let repeated = matches!(
                    last_pair,
                    Some((a, b)) if (a == query_data && b == data) || (a == data && b == query_data)
                );
                if !repeated {
                    last_pair = Some((query_data, data));
                    callback(query_data, data);
                }
                true
            });
        }
    }

    /// Visits proxies whose fat AABB overlaps `aabb`
    pub fn query<F>(&self, aabb: &Aabb, callback: F)
    where
        F: FnMut(ProxyId) -> bool,
    {
        self.tree.query(aabb, callback);
    }

    /// Casts a segment against the fat AABBs; see [`DynamicTree::ray_cast`]
    pub fn ray_cast<F>(&self, input: &RayCastInput, callback: F)
    where
        F: FnMut(&RayCastInput, ProxyId) -> f32,
    {
        self.tree.ray_cast(input, callback);
    }

    pub fn rebalance(&mut self, iterations: usize) {
        self.tree.rebalance(iterations);
    }

    fn buffer_move(&mut self, proxy: ProxyId) {
        if !self.move_buffer.contains(&proxy) {
            self.move_buffer.push(proxy);
        }
    }

    fn unbuffer_move(&mut self, proxy: ProxyId) {
        self.move_buffer.retain(|&p| p != proxy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aabb(x0: f32, x1: f32) -> Aabb {
        Aabb::new(Vec2::new(x0, 0.0), Vec2::new(x1, 1.0))
    }

    fn pairs(bp: &mut BroadPhase<u32>) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        bp.update_pairs(|a, b| out.push((a.min(b), a.max(b))));
        out.sort_unstable();
        out
    }

    #[test]
    fn test_new_proxies_pair() {
        let mut bp = BroadPhase::new();
        bp.create_proxy(&aabb(0.0, 1.0), 0u32);
        bp.create_proxy(&aabb(0.5, 1.5), 1);
        bp.create_proxy(&aabb(5.0, 6.0), 2);
        assert_eq!(bp.proxy_count(), 3);

        let found = pairs(&mut bp);
        assert!(found.contains(&(0, 1)));
        assert!(!found.iter().any(|&(a, b)| a == 2 || b == 2));

        // Move buffer is drained
        assert!(pairs(&mut bp).is_empty());
    }

    #[test]
    fn test_only_moved_proxies_are_queried() {
        let mut bp = BroadPhase::new();
        let a = bp.create_proxy(&aabb(0.0, 1.0), 0u32);
        let b = bp.create_proxy(&aabb(2.0, 3.0), 1);
        bp.create_proxy(&aabb(20.0, 21.0), 2);
        assert!(pairs(&mut bp).is_empty());

        bp.move_proxy(a, &aabb(2.1, 3.1), Vec2::new(2.1, 0.0));
        assert_eq!(pairs(&mut bp), vec![(0, 1)]);
        assert!(bp.test_overlap(a, b));
    }

    #[test]
    fn test_destroyed_proxy_is_unbuffered() {
        let mut bp = BroadPhase::new();
        bp.create_proxy(&aabb(0.0, 1.0), 0u32);
        let b = bp.create_proxy(&aabb(0.5, 1.5), 1);
        bp.destroy_proxy(b);
        assert!(pairs(&mut bp).is_empty());
        assert_eq!(bp.proxy_count(), 1);
    }
}
