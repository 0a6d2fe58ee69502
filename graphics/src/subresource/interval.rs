//! Tagged 1-D interval treap used to track buffer byte-range subresource
//! state.
//!
//! A treap keyed by `(lo, seq)` — `seq` is a per-node insertion counter used
//! only to keep the key total even when two live intervals share the same
//! start — balanced by a random priority, augmented with subtree `max_end`
//! for overlap-query pruning. Nodes live in a bounded arena so the index
//! fails with [`CompileError::CapacityExceeded`] instead of growing
//! unboundedly.
//!
//! Fragmentation follows the same shape as a plain augmented BST interval
//! tree (split a partially-covered node into up to two remainder pieces
//! before removing the covered portion); the treap only changes how the
//! tree stays balanced.

use crate::error::CompileError;
use crate::subresource::prng::{SplitMix64, DEFAULT_SEED};

#[derive(Clone)]
struct Node<Tag> {
    lo: u64,
    hi: u64,
    seq: u64,
    tag: Tag,
    priority: u64,
    max_end: u64,
    left: Option<u32>,
    right: Option<u32>,
}

/// A bounded, tagged 1-D interval treap over `u64` byte offsets.
pub struct IntervalTreap<Tag> {
    nodes: Vec<Option<Node<Tag>>>,
    free: Vec<u32>,
    root: Option<u32>,
    capacity: usize,
    len: usize,
    next_seq: u64,
    rng: SplitMix64,
}

impl<Tag: Clone + PartialEq> IntervalTreap<Tag> {
    /// Create an empty index bounded to at most `capacity` live nodes.
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

    /// Seed the index with a single interval `[0, size)` tagged `tag`,
    /// representing the whole-resource default state before any usage is
    /// recorded.
    pub fn seeded(capacity: usize, size: u64, tag: Tag) -> Result<Self, CompileError> {
        let mut this = Self::new(capacity);
        this.insert_node_raw(0, size, tag)?;
        Ok(this)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fragment any interval overlapping `[lo, hi)` whose tag differs from
    /// the incoming one (reinserting its untouched remainder), remove the
    /// covered portion regardless of tag, then insert `[lo, hi)` tagged
    /// `tag`.
    pub fn insert(&mut self, lo: u64, hi: u64, tag: Tag) -> Result<(), CompileError> {
        if lo >= hi {
            return Ok(());
        }
        self.fragment_remove(lo, hi, None)?;
        self.insert_node_raw(lo, hi, tag)
    }

    /// Remove only the portions of `[lo, hi)` currently tagged `tag`,
    /// fragmenting any partially covered node and leaving differently
    /// tagged intervals untouched.
    pub fn remove(&mut self, lo: u64, hi: u64, tag: &Tag) -> Result<(), CompileError> {
        if lo >= hi {
            return Ok(());
        }
        self.fragment_remove(lo, hi, Some(tag))
    }

    /// Intervals overlapping `[lo, hi)` whose tag differs from
    /// `exclude_tag`, clipped to the query range.
    pub fn query(&self, lo: u64, hi: u64, exclude_tag: &Tag, out: &mut Vec<(u64, u64, Tag)>) {
        if lo >= hi {
            return;
        }
        let mut idxs = Vec::new();
        self.collect_overlapping(self.root, lo, hi, None, &mut idxs);
        for idx in idxs {
            let node = self.get(idx);
            if &node.tag != exclude_tag {
                out.push((node.lo.max(lo), node.hi.min(hi), node.tag.clone()));
            }
        }
    }

    /// Every interval overlapping `[lo, hi)`, clipped to the query range,
    /// unfiltered by tag.
    pub fn query_all(&self, lo: u64, hi: u64, out: &mut Vec<(u64, u64, Tag)>) {
        if lo >= hi {
            return;
        }
        let mut idxs = Vec::new();
        self.collect_overlapping(self.root, lo, hi, None, &mut idxs);
        for idx in idxs {
            let node = self.get(idx);
            out.push((node.lo.max(lo), node.hi.min(hi), node.tag.clone()));
        }
    }

    fn fragment_remove(
        &mut self,
        lo: u64,
        hi: u64,
        tag_filter: Option<&Tag>,
    ) -> Result<(), CompileError> {
        let mut matched = Vec::new();
        self.collect_overlapping(self.root, lo, hi, tag_filter, &mut matched);
        for idx in matched {
            let node = self.get(idx).clone();
            self.delete(idx);
            if node.lo < lo {
                self.insert_node_raw(node.lo, lo, node.tag.clone())?;
            }
            if node.hi > hi {
                self.insert_node_raw(hi, node.hi, node.tag.clone())?;
            }
        }
        Ok(())
    }

    fn collect_overlapping(
        &self,
        idx: Option<u32>,
        lo: u64,
        hi: u64,
        tag_filter: Option<&Tag>,
        out: &mut Vec<u32>,
    ) {
        let Some(i) = idx else { return };
        let node = self.get(i);
        if let Some(l) = node.left {
            if self.get(l).max_end > lo {
                self.collect_overlapping(Some(l), lo, hi, tag_filter, out);
            }
        }
        if node.lo < hi && lo < node.hi {
            let matches = tag_filter.is_none_or(|t| &node.tag == t);
            if matches {
                out.push(i);
            }
        }
        if node.lo < hi {
            self.collect_overlapping(node.right, lo, hi, tag_filter, out);
        }
    }

    fn insert_node_raw(&mut self, lo: u64, hi: u64, tag: Tag) -> Result<(), CompileError> {
        if lo >= hi {
            return Ok(());
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        let priority = self.rng.next_u64();
        let idx = self.alloc(Node {
            lo,
            hi,
            seq,
            tag,
            priority,
            max_end: hi,
            left: None,
            right: None,
        })?;
        self.root = Some(self.insert_rec(self.root, idx));
        self.len += 1;
        Ok(())
    }

    fn insert_rec(&mut self, root: Option<u32>, new: u32) -> u32 {
        let Some(r) = root else { return new };
        let new_key = (self.get(new).lo, self.get(new).seq);
        let r_key = (self.get(r).lo, self.get(r).seq);
        if new_key < r_key {
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
        let t_key = (self.get(target).lo, self.get(target).seq);
        let r_key = (self.get(r).lo, self.get(r).seq);
        if t_key < r_key {
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
        let (left, right, hi) = {
            let n = self.get(idx);
            (n.left, n.right, n.hi)
        };
        let mut m = hi;
        if let Some(l) = left {
            m = m.max(self.get(l).max_end);
        }
        if let Some(r) = right {
            m = m.max(self.get(r).max_end);
        }
        self.get_mut(idx).max_end = m;
    }

    fn alloc(&mut self, node: Node<Tag>) -> Result<u32, CompileError> {
        if let Some(idx) = self.free.pop() {
            self.nodes[idx as usize] = Some(node);
            return Ok(idx);
        }
        if self.nodes.len() >= self.capacity {
            return Err(CompileError::CapacityExceeded(format!(
                "subresource interval index node pool of {} exhausted",
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
