//! Tagged 2-D rectangle treap used to track texture mip x layer
//! subresource state. Same fragmentation contract as [`IntervalTreap`],
//! generalized to axis-aligned rectangles over `(mip, layer)` space.
//!
//! [`IntervalTreap`]: crate::subresource::interval::IntervalTreap

use crate::error::CompileError;
use crate::subresource::prng::{SplitMix64, DEFAULT_SEED};

#[derive(Clone)]
struct Node<Tag> {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
    seq: u64,
    tag: Tag,
    priority: u64,
    max_x2: u32,
    max_y2: u32,
    left: Option<u32>,
    right: Option<u32>,
}

fn overlaps(a: (u32, u32, u32, u32), b: (u32, u32, u32, u32)) -> bool {
    a.0 < b.2 && b.0 < a.2 && a.1 < b.3 && b.1 < a.3
}

/// A bounded, tagged 2-D rectangle treap over `u32` mip/layer coordinates.
pub struct RectTreap<Tag> {
    nodes: Vec<Option<Node<Tag>>>,
    free: Vec<u32>,
    root: Option<u32>,
    capacity: usize,
    len: usize,
    next_seq: u64,
    rng: SplitMix64,
}

impl<Tag: Clone + PartialEq> RectTreap<Tag> {
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            capacity,
            len: 0,
            next_seq: 0,
            rng: SplitMix64::new(DEFAULT_SEED),
        }
    }

    /// Seed the index with a single rectangle `[0, mips) x [0, layers)`
    /// tagged `tag`.
    pub fn seeded(capacity: usize, mips: u32, layers: u32, tag: Tag) -> Result<Self, CompileError> {
        let mut this = Self::new(capacity);
        this.insert_node_raw(0, 0, mips, layers, tag)?;
        Ok(this)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[allow(clippy::too_many_arguments)]
    pub fn insert(
        &mut self,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        tag: Tag,
    ) -> Result<(), CompileError> {
        if x1 >= x2 || y1 >= y2 {
            return Ok(());
        }
        self.fragment_remove(x1, y1, x2, y2, None)?;
        self.insert_node_raw(x1, y1, x2, y2, tag)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn remove(
        &mut self,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        tag: &Tag,
    ) -> Result<(), CompileError> {
        if x1 >= x2 || y1 >= y2 {
            return Ok(());
        }
        self.fragment_remove(x1, y1, x2, y2, Some(tag))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn query(
        &self,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        exclude_tag: &Tag,
        out: &mut Vec<(u32, u32, u32, u32, Tag)>,
    ) {
        if x1 >= x2 || y1 >= y2 {
            return;
        }
        let mut idxs = Vec::new();
        self.collect_overlapping(self.root, (x1, y1, x2, y2), None, &mut idxs);
        for idx in idxs {
            let n = self.get(idx);
            if &n.tag != exclude_tag {
                out.push((
                    n.x1.max(x1),
                    n.y1.max(y1),
                    n.x2.min(x2),
                    n.y2.min(y2),
                    n.tag.clone(),
                ));
            }
        }
    }

    pub fn query_all(&self, x1: u32, y1: u32, x2: u32, y2: u32, out: &mut Vec<(u32, u32, u32, u32, Tag)>) {
        if x1 >= x2 || y1 >= y2 {
            return;
        }
        let mut idxs = Vec::new();
        self.collect_overlapping(self.root, (x1, y1, x2, y2), None, &mut idxs);
        for idx in idxs {
            let n = self.get(idx);
            out.push((
                n.x1.max(x1),
                n.y1.max(y1),
                n.x2.min(x2),
                n.y2.min(y2),
                n.tag.clone(),
            ));
        }
    }

    fn fragment_remove(
        &mut self,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        tag_filter: Option<&Tag>,
    ) -> Result<(), CompileError> {
        let mut matched = Vec::new();
        self.collect_overlapping(self.root, (x1, y1, x2, y2), tag_filter, &mut matched);
        for idx in matched {
            let node = self.get(idx).clone();
            self.delete(idx);

            if node.x1 < x1 {
                self.insert_node_raw(node.x1, node.y1, x1, node.y2, node.tag.clone())?;
            }
            if node.x2 > x2 {
                self.insert_node_raw(x2, node.y1, node.x2, node.y2, node.tag.clone())?;
            }
            let mx1 = node.x1.max(x1);
            let mx2 = node.x2.min(x2);
            if mx1 < mx2 {
                if node.y1 < y1 {
                    self.insert_node_raw(mx1, node.y1, mx2, y1, node.tag.clone())?;
                }
                if node.y2 > y2 {
                    self.insert_node_raw(mx1, y2, mx2, node.y2, node.tag.clone())?;
                }
            }
        }
        Ok(())
    }

    fn collect_overlapping(
        &self,
        idx: Option<u32>,
        rect: (u32, u32, u32, u32),
        tag_filter: Option<&Tag>,
        out: &mut Vec<u32>,
    ) {
        let Some(i) = idx else { return };
        let node = self.get(i);
        if let Some(l) = node.left {
            let ln = self.get(l);
            if ln.max_x2 > rect.0 && ln.max_y2 > rect.1 {
                self.collect_overlapping(Some(l), rect, tag_filter, out);
            }
        }
        if overlaps((node.x1, node.y1, node.x2, node.y2), rect) {
            let matches = tag_filter.is_none_or(|t| &node.tag == t);
            if matches {
                out.push(i);
            }
        }
        // max_x2/max_y2 pruning on the right subtree is unsound in 2-D
        // (unlike the 1-D case, a higher x1 does not imply disjointness
        // once y is involved), so the right subtree is always visited.
        self.collect_overlapping(node.right, rect, tag_filter, out);
    }

    fn insert_node_raw(
        &mut self,
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        tag: Tag,
    ) -> Result<(), CompileError> {
        if x1 >= x2 || y1 >= y2 {
            return Ok(());
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        let priority = self.rng.next_u64();
        let idx = self.alloc(Node {
            x1,
            y1,
            x2,
            y2,
            seq,
            tag,
            priority,
            max_x2: x2,
            max_y2: y2,
            left: None,
            right: None,
        })?;
        self.root = Some(self.insert_rec(self.root, idx));
        self.len += 1;
        Ok(())
    }

    fn key(&self, idx: u32) -> (u32, u32, u64) {
        let n = self.get(idx);
        (n.x1, n.y1, n.seq)
    }

    fn insert_rec(&mut self, root: Option<u32>, new: u32) -> u32 {
        let Some(r) = root else { return new };
        if self.key(new) < self.key(r) {
            let l = self.insert_rec(self.get(r).left, new);
            self.get_mut(r).left = Some(l);
            self.pull_up(r);
            if self.get(l).priority > self.get(r).priority {
                self.rotate_right(r)
            } else {
                r
            }
        } else {
            let rr = self.insert_rec(self.get(r).right, new);
            self.get_mut(r).right = Some(rr);
            self.pull_up(r);
            if self.get(rr).priority > self.get(r).priority {
                self.rotate_left(r)
            } else {
                r
            }
        }
    }

    fn delete(&mut self, target: u32) {
        self.root = self.delete_rec(self.root, target);
        self.dealloc(target);
        self.len -= 1;
    }

    fn delete_rec(&mut self, root: Option<u32>, target: u32) -> Option<u32> {
        let r = root.expect("target must be present in the tree");
        if r == target {
            let node = self.get(r);
            return self.merge(node.left, node.right);
        }
        if self.key(target) < self.key(r) {
            let nl = self.delete_rec(self.get(r).left, target);
            self.get_mut(r).left = nl;
        } else {
            let nr = self.delete_rec(self.get(r).right, target);
            self.get_mut(r).right = nr;
        }
        self.pull_up(r);
        Some(r)
    }

    fn merge(&mut self, a: Option<u32>, b: Option<u32>) -> Option<u32> {
        match (a, b) {
            (None, x) | (x, None) => x,
            (Some(ai), Some(bi)) => {
                if self.get(ai).priority > self.get(bi).priority {
                    let nr = self.merge(self.get(ai).right, Some(bi));
                    self.get_mut(ai).right = nr;
                    self.pull_up(ai);
                    Some(ai)
                } else {
                    let nl = self.merge(Some(ai), self.get(bi).left);
                    self.get_mut(bi).left = nl;
                    self.pull_up(bi);
                    Some(bi)
                }
            }
        }
    }

    fn rotate_right(&mut self, idx: u32) -> u32 {
        let l = self.get(idx).left.expect("rotate_right requires a left child");
        let lr = self.get(l).right;
        self.get_mut(idx).left = lr;
        self.get_mut(l).right = Some(idx);
        self.pull_up(idx);
        self.pull_up(l);
        l
    }

    fn rotate_left(&mut self, idx: u32) -> u32 {
        let r = self.get(idx).right.expect("rotate_left requires a right child");
        let rl = self.get(r).left;
        self.get_mut(idx).right = rl;
        self.get_mut(r).left = Some(idx);
        self.pull_up(idx);
        self.pull_up(r);
        r
    }

    fn pull_up(&mut self, idx: u32) {
        let (left, right, x2, y2) = {
            let n = self.get(idx);
            (n.left, n.right, n.x2, n.y2)
        };
        let mut mx = x2;
        let mut my = y2;
        if let Some(l) = left {
            let ln = self.get(l);
            mx = mx.max(ln.max_x2);
            my = my.max(ln.max_y2);
        }
        if let Some(r) = right {
            let rn = self.get(r);
            mx = mx.max(rn.max_x2);
            my = my.max(rn.max_y2);
        }
        let n = self.get_mut(idx);
        n.max_x2 = mx;
        n.max_y2 = my;
    }

    fn alloc(&mut self, node: Node<Tag>) -> Result<u32, CompileError> {
        if let Some(idx) = self.free.pop() {
            self.nodes[idx as usize] = Some(node);
            return Ok(idx);
        }
        if self.nodes.len() >= self.capacity {
            return Err(CompileError::CapacityExceeded(format!(
                "subresource rect index node pool of {} exhausted",
                self.capacity
            )));
        }
        self.nodes.push(Some(node));
        Ok((self.nodes.len() - 1) as u32)
    }

    fn dealloc(&mut self, idx: u32) {
        self.nodes[idx as usize] = None;
        self.free.push(idx);
    }

    fn get(&self, idx: u32) -> &Node<Tag> {
        self.nodes[idx as usize].as_ref().expect("dangling index")
    }

    fn get_mut(&mut self, idx: u32) -> &mut Node<Tag> {
        self.nodes[idx as usize].as_mut().expect("dangling index")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_query_all() {
        let mut t = RectTreap::<u32>::new(64);
        t.insert(0, 0, 4, 2, 1).unwrap();
        let mut out = Vec::new();
        t.query_all(0, 0, 4, 2, &mut out);
        assert_eq!(out, vec![(0, 0, 4, 2, 1)]);
    }

    #[test]
    fn insert_fragments_overlapping_rect_into_remainder_pieces() {
        let mut t = RectTreap::<u32>::new(64);
        t.insert(0, 0, 4, 4, 1).unwrap();
        t.insert(1, 1, 3, 3, 2).unwrap();
        let mut out = Vec::new();
        t.query_all(0, 0, 4, 4, &mut out);
        let total_area: u64 = out
            .iter()
            .map(|(x1, y1, x2, y2, _)| (*x2 - *x1) as u64 * (*y2 - *y1) as u64)
            .sum();
        assert_eq!(total_area, 16);
        assert!(out.contains(&(1, 1, 3, 3, 2)));
    }

    #[test]
    fn query_excludes_given_tag() {
        let mut t = RectTreap::<u32>::new(64);
        t.insert(0, 0, 4, 4, 1).unwrap();
        t.insert(1, 1, 3, 3, 2).unwrap();
        let mut out = Vec::new();
        t.query(0, 0, 4, 4, &2, &mut out);
        assert!(out.iter().all(|(.., tag)| *tag != 2));
    }

    #[test]
    fn remove_only_matching_tag() {
        let mut t = RectTreap::<u32>::new(64);
        t.insert(0, 0, 4, 4, 1).unwrap();
        t.insert(1, 1, 3, 3, 2).unwrap();
        t.remove(0, 0, 4, 4, &1).unwrap();
        let mut out = Vec::new();
        t.query_all(0, 0, 4, 4, &mut out);
        assert_eq!(out, vec![(1, 1, 3, 3, 2)]);
    }
}
