//! # rbtree-rs
//!
//! An ordered map backed by a red-black tree, ordered by a caller-supplied
//! [`Comparator`].
//!
//! Nodes live in a single arena (`Vec`) and link to each other by index, so
//! the parent back-links used during rebalancing never own anything. Lookups,
//! insertions and removals are O(log n); traversal is an explicit-stack
//! in-order walk that never recurses.
//!
//! ## Example
//!
//! ```rust
//! use rbtree_rs::{Natural, RbTree};
//!
//! let mut tree = RbTree::new(Natural);
//! tree.put(5, "e");
//! tree.put(1, "a");
//! tree.put(3, "c");
//!
//! assert_eq!(tree.get(&3), Some(&"c"));
//! assert_eq!(tree.keys(), vec![1, 3, 5]);
//!
//! tree.remove(&3);
//! assert_eq!(tree.get(&3), None);
//! assert_eq!(tree.len(), 2);
//! ```

#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;
use std::ops::Bound;

use log::{debug, trace};

mod compare;

pub use compare::{Comparator, FloatAsc, FloatDesc, Natural, Reverse};

// =============================================================================
// Links
// =============================================================================

/// Index of a node in the arena. `NIL` stands for an absent child or parent
/// and counts as a black leaf.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct NodeRef(u32);

impl NodeRef {
    const NIL: NodeRef = NodeRef(u32::MAX);

    #[inline]
    fn new(idx: usize) -> Self {
        assert!(idx < u32::MAX as usize, "node arena exceeds u32 index space");
        Self(idx as u32)
    }

    #[inline]
    fn is_nil(self) -> bool {
        self == Self::NIL
    }

    #[inline]
    fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Color {
    Red,
    Black,
}

#[derive(Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    color: Color,
    left: NodeRef,
    right: NodeRef,
    /// Navigation only; ownership flows from the arena.
    parent: NodeRef,
}

// =============================================================================
// Errors
// =============================================================================

/// A structural defect found by [`RbTree::check_invariants`].
///
/// `position` fields count the in-order entries visited before the defect was
/// found, which locates it roughly within the key sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantError {
    /// The root node is red.
    RedRoot,
    /// A red node has a red child.
    ConsecutiveReds { position: usize },
    /// Two root-to-leaf paths carry a different number of black nodes.
    UnbalancedBlacks { expected: usize, found: usize },
    /// In-order neighbours are not strictly increasing under the comparator.
    /// Usually means the comparator is not a total order.
    OutOfOrder { position: usize },
    /// A child's parent link does not point back at its parent.
    BrokenParentLink { position: usize },
    /// The recorded length disagrees with the reachable node count.
    CountMismatch { recorded: usize, reachable: usize },
    /// The arena holds slots that no path from the root reaches.
    LeakedNodes { reachable: usize, allocated: usize },
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RedRoot => write!(f, "root node is red"),
            Self::ConsecutiveReds { position } => {
                write!(f, "red node at in-order position {position} has a red child")
            }
            Self::UnbalancedBlacks { expected, found } => write!(
                f,
                "black height mismatch: expected {expected} black nodes on every path, found {found}"
            ),
            Self::OutOfOrder { position } => {
                write!(f, "keys out of order at in-order position {position}")
            }
            Self::BrokenParentLink { position } => write!(
                f,
                "parent link of a child of in-order position {position} is broken"
            ),
            Self::CountMismatch {
                recorded,
                reachable,
            } => write!(
                f,
                "tree records {recorded} entries but {reachable} are reachable"
            ),
            Self::LeakedNodes {
                reachable,
                allocated,
            } => write!(
                f,
                "node arena holds {allocated} slots but only {reachable} are reachable"
            ),
        }
    }
}

impl std::error::Error for InvariantError {}

// =============================================================================
// RbTree
// =============================================================================

/// An ordered map implemented as a red-black tree.
///
/// Keys are ordered by the comparator `C` given at construction; the tree
/// never compares keys any other way. The tree is not internally synchronized:
/// callers sharing one instance across threads wrap it in a lock.
#[derive(Clone)]
pub struct RbTree<K, V, C> {
    nodes: Vec<Node<K, V>>,
    root: NodeRef,
    count: usize,
    cmp: C,
}

impl<K, V, C: Comparator<K>> RbTree<K, V, C> {
    pub fn new(cmp: C) -> Self {
        Self::with_capacity(cmp, 0)
    }

    /// Create an empty tree with room for `capacity` entries before the arena
    /// reallocates.
    pub fn with_capacity(cmp: C, capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            root: NodeRef::NIL,
            count: 0,
            cmp,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    /// Drop every entry. Arena capacity is kept for reuse.
    pub fn clear(&mut self) {
        debug!("clearing tree with {} entries", self.count);
        self.nodes.clear();
        self.root = NodeRef::NIL;
        self.count = 0;
    }

    pub fn memory_usage(&self) -> usize {
        std::mem::size_of::<Self>() + self.nodes.capacity() * std::mem::size_of::<Node<K, V>>()
    }

    pub fn shrink_to_fit(&mut self) {
        let before = self.nodes.capacity();
        self.nodes.shrink_to_fit();
        debug!(
            "shrunk node arena from {} to {} slots",
            before,
            self.nodes.capacity()
        );
    }

    // -------------------------------------------------------------------------
    // Node accessors. All of them treat NIL as a black leaf with NIL links.
    // -------------------------------------------------------------------------

    #[inline]
    fn node(&self, n: NodeRef) -> &Node<K, V> {
        &self.nodes[n.idx()]
    }

    #[inline]
    fn node_mut(&mut self, n: NodeRef) -> &mut Node<K, V> {
        &mut self.nodes[n.idx()]
    }

    #[inline]
    fn color(&self, n: NodeRef) -> Color {
        if n.is_nil() {
            Color::Black
        } else {
            self.node(n).color
        }
    }

    #[inline]
    fn set_color(&mut self, n: NodeRef, color: Color) {
        debug_assert!(!n.is_nil(), "cannot recolor a nil leaf");
        if !n.is_nil() {
            self.node_mut(n).color = color;
        }
    }

    #[inline]
    fn parent(&self, n: NodeRef) -> NodeRef {
        if n.is_nil() {
            NodeRef::NIL
        } else {
            self.node(n).parent
        }
    }

    #[inline]
    fn left(&self, n: NodeRef) -> NodeRef {
        if n.is_nil() {
            NodeRef::NIL
        } else {
            self.node(n).left
        }
    }

    #[inline]
    fn right(&self, n: NodeRef) -> NodeRef {
        if n.is_nil() {
            NodeRef::NIL
        } else {
            self.node(n).right
        }
    }

    fn sibling(&self, n: NodeRef) -> NodeRef {
        let parent = self.parent(n);
        if parent.is_nil() {
            NodeRef::NIL
        } else if self.left(parent) == n {
            self.right(parent)
        } else {
            self.left(parent)
        }
    }

    fn minimum(&self, mut n: NodeRef) -> NodeRef {
        while !self.left(n).is_nil() {
            n = self.left(n);
        }
        n
    }

    fn maximum(&self, mut n: NodeRef) -> NodeRef {
        while !self.right(n).is_nil() {
            n = self.right(n);
        }
        n
    }

    fn lookup(&self, key: &K) -> NodeRef {
        let mut current = self.root;
        while !current.is_nil() {
            let node = self.node(current);
            current = match self.cmp.compare(key, &node.key) {
                Ordering::Equal => return current,
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        NodeRef::NIL
    }

    // -------------------------------------------------------------------------
    // Arena management
    // -------------------------------------------------------------------------

    fn alloc(&mut self, node: Node<K, V>) -> NodeRef {
        let n = NodeRef::new(self.nodes.len());
        self.nodes.push(node);
        n
    }

    /// Take a detached node out of the arena.
    ///
    /// The last slot is moved into the hole so the arena stays dense; every
    /// link that referred to the moved node is re-pointed at its new index.
    fn release(&mut self, n: NodeRef) -> Node<K, V> {
        let last = NodeRef::new(self.nodes.len() - 1);
        if last != n {
            let moved = self.node(last);
            let (parent, left, right) = (moved.parent, moved.left, moved.right);
            if parent.is_nil() {
                if self.root == last {
                    self.root = n;
                }
            } else if self.node(parent).left == last {
                self.node_mut(parent).left = n;
            } else {
                self.node_mut(parent).right = n;
            }
            if !left.is_nil() {
                self.node_mut(left).parent = n;
            }
            if !right.is_nil() {
                self.node_mut(right).parent = n;
            }
        }
        self.nodes.swap_remove(n.idx())
    }

    /// Exchange the key/value payloads of two distinct nodes, leaving colors
    /// and links in place.
    fn swap_payload(&mut self, a: NodeRef, b: NodeRef) {
        debug_assert_ne!(a, b);
        let (lo, hi) = if a.idx() < b.idx() { (a, b) } else { (b, a) };
        let (head, tail) = self.nodes.split_at_mut(hi.idx());
        let (x, y) = (&mut head[lo.idx()], &mut tail[0]);
        std::mem::swap(&mut x.key, &mut y.key);
        std::mem::swap(&mut x.value, &mut y.value);
    }

    // -------------------------------------------------------------------------
    // Rotations
    // -------------------------------------------------------------------------

    /// Put `new` where `old` hangs under its parent (or at the root).
    /// `old`'s own links are left untouched.
    fn replace_node(&mut self, old: NodeRef, new: NodeRef) {
        let parent = self.parent(old);
        if parent.is_nil() {
            self.root = new;
        } else if self.left(parent) == old {
            self.node_mut(parent).left = new;
        } else {
            self.node_mut(parent).right = new;
        }
        if !new.is_nil() {
            self.node_mut(new).parent = parent;
        }
    }

    //     n               r
    //    / \             / \
    //   a   r    ==>    n   c
    //      / \         / \
    //     b   c       a   b
    fn rotate_left(&mut self, n: NodeRef) {
        let r = self.right(n);
        debug_assert!(!r.is_nil(), "rotate_left needs a right child");
        self.replace_node(n, r);
        let inner = self.left(r);
        self.node_mut(n).right = inner;
        if !inner.is_nil() {
            self.node_mut(inner).parent = n;
        }
        self.node_mut(r).left = n;
        self.node_mut(n).parent = r;
    }

    fn rotate_right(&mut self, n: NodeRef) {
        let l = self.left(n);
        debug_assert!(!l.is_nil(), "rotate_right needs a left child");
        self.replace_node(n, l);
        let inner = self.right(l);
        self.node_mut(n).left = inner;
        if !inner.is_nil() {
            self.node_mut(inner).parent = n;
        }
        self.node_mut(l).right = n;
        self.node_mut(n).parent = l;
    }
}

// =============================================================================
// Lookup, insertion and removal
// =============================================================================

impl<K, V, C: Comparator<K>> RbTree<K, V, C> {
    pub fn get(&self, key: &K) -> Option<&V> {
        let n = self.lookup(key);
        (!n.is_nil()).then(|| &self.node(n).value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let n = self.lookup(key);
        if n.is_nil() {
            None
        } else {
            Some(&mut self.node_mut(n).value)
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        !self.lookup(key).is_nil()
    }

    /// Insert `value` under `key`, or overwrite the value of an existing key.
    ///
    /// Overwriting never changes the tree's shape or length. Returns the
    /// previous value, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let mut parent = NodeRef::NIL;
        let mut current = self.root;
        let mut went_left = false;
        while !current.is_nil() {
            let node = self.node(current);
            let next = match self.cmp.compare(&key, &node.key) {
                Ordering::Equal => {
                    return Some(std::mem::replace(&mut self.node_mut(current).value, value));
                }
                Ordering::Less => {
                    went_left = true;
                    node.left
                }
                Ordering::Greater => {
                    went_left = false;
                    node.right
                }
            };
            parent = current;
            current = next;
        }

        let n = self.alloc(Node {
            key,
            value,
            color: Color::Red,
            left: NodeRef::NIL,
            right: NodeRef::NIL,
            parent,
        });
        if parent.is_nil() {
            self.root = n;
        } else if went_left {
            self.node_mut(parent).left = n;
        } else {
            self.node_mut(parent).right = n;
        }
        self.count += 1;
        self.insert_fixup(n);
        None
    }

    /// Restore the color invariants after attaching the red node `n`.
    fn insert_fixup(&mut self, mut n: NodeRef) {
        loop {
            let parent = self.parent(n);
            if parent.is_nil() {
                self.set_color(n, Color::Black);
                return;
            }
            if self.color(parent) == Color::Black {
                return;
            }

            // A red parent is never the root, so the grandparent exists.
            let grandparent = self.parent(parent);
            debug_assert!(!grandparent.is_nil(), "red node without a grandparent");
            let uncle = self.sibling(parent);
            if self.color(uncle) == Color::Red {
                self.set_color(parent, Color::Black);
                self.set_color(uncle, Color::Black);
                self.set_color(grandparent, Color::Red);
                trace!("insert fixup: red uncle, continuing at grandparent");
                n = grandparent;
                continue;
            }

            // Straighten a zig-zag so `n`, its parent and grandparent line up.
            let parent_is_left = self.left(grandparent) == parent;
            if parent_is_left && self.right(parent) == n {
                self.rotate_left(parent);
                n = parent;
            } else if !parent_is_left && self.left(parent) == n {
                self.rotate_right(parent);
                n = parent;
            }

            let parent = self.parent(n);
            let grandparent = self.parent(parent);
            self.set_color(parent, Color::Black);
            self.set_color(grandparent, Color::Red);
            if parent_is_left {
                self.rotate_right(grandparent);
            } else {
                self.rotate_left(grandparent);
            }
            return;
        }
    }

    /// Remove `key` and return its value. Absent keys leave the tree untouched.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let mut n = self.lookup(key);
        if n.is_nil() {
            return None;
        }

        // With two children, trade places with the in-order predecessor and
        // splice that node out instead; it has no right child.
        if !self.left(n).is_nil() && !self.right(n).is_nil() {
            let pred = self.maximum(self.left(n));
            self.swap_payload(n, pred);
            n = pred;
        }

        let child = if self.left(n).is_nil() {
            self.right(n)
        } else {
            self.left(n)
        };
        if self.color(n) == Color::Black {
            self.delete_fixup(n);
        }
        self.replace_node(n, child);
        if self.parent(n).is_nil() && !child.is_nil() {
            self.set_color(child, Color::Black);
        }

        self.count -= 1;
        Some(self.release(n).value)
    }

    /// Rebalance around the black node `n` before it is spliced out, which
    /// would leave its side one black node short.
    fn delete_fixup(&mut self, mut n: NodeRef) {
        loop {
            let parent = self.parent(n);
            if parent.is_nil() {
                return;
            }
            let n_is_left = self.left(parent) == n;

            let mut sibling = self.sibling(n);
            debug_assert!(!sibling.is_nil(), "black node without a sibling");
            if self.color(sibling) == Color::Red {
                self.set_color(parent, Color::Red);
                self.set_color(sibling, Color::Black);
                if n_is_left {
                    self.rotate_left(parent);
                } else {
                    self.rotate_right(parent);
                }
                sibling = self.sibling(n);
            }

            let (near, far) = if n_is_left {
                (self.left(sibling), self.right(sibling))
            } else {
                (self.right(sibling), self.left(sibling))
            };
            if self.color(near) == Color::Black && self.color(far) == Color::Black {
                self.set_color(sibling, Color::Red);
                if self.color(parent) == Color::Black {
                    trace!("delete fixup: all black, continuing at parent");
                    n = parent;
                    continue;
                }
                self.set_color(parent, Color::Black);
                return;
            }

            if self.color(far) == Color::Black {
                self.set_color(sibling, Color::Red);
                self.set_color(near, Color::Black);
                if n_is_left {
                    self.rotate_right(sibling);
                } else {
                    self.rotate_left(sibling);
                }
                sibling = self.sibling(n);
            }

            let far = if n_is_left {
                self.right(sibling)
            } else {
                self.left(sibling)
            };
            let parent_color = self.color(parent);
            self.set_color(sibling, parent_color);
            self.set_color(parent, Color::Black);
            self.set_color(far, Color::Black);
            if n_is_left {
                self.rotate_left(parent);
            } else {
                self.rotate_right(parent);
            }
            return;
        }
    }
}

// =============================================================================
// Traversal
// =============================================================================

impl<K, V, C: Comparator<K>> RbTree<K, V, C> {
    /// Entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut stack = Vec::new();
        push_left_spine(&self.nodes, &mut stack, self.root);
        Iter {
            nodes: &self.nodes,
            stack,
            remaining: self.count,
        }
    }

    /// Entries whose keys fall between `lower` and `upper`, in ascending order.
    ///
    /// The walk seeks the first key at or above `lower` in O(log n) and stops
    /// at the first key beyond `upper`.
    pub fn range<'a>(&'a self, lower: Bound<&K>, upper: Bound<&'a K>) -> Range<'a, K, V, C> {
        let mut stack = Vec::new();
        let mut current = self.root;
        while !current.is_nil() {
            let node = self.node(current);
            let above_lower = match lower {
                Bound::Unbounded => true,
                Bound::Included(k) => self.cmp.compare(&node.key, k) != Ordering::Less,
                Bound::Excluded(k) => self.cmp.compare(&node.key, k) == Ordering::Greater,
            };
            if above_lower {
                stack.push(current);
                current = node.left;
            } else {
                current = node.right;
            }
        }
        Range {
            nodes: &self.nodes,
            cmp: &self.cmp,
            stack,
            upper,
        }
    }

    /// The entry with the smallest key.
    pub fn first(&self) -> Option<(&K, &V)> {
        if self.root.is_nil() {
            return None;
        }
        let node = self.node(self.minimum(self.root));
        Some((&node.key, &node.value))
    }

    /// The entry with the largest key.
    pub fn last(&self) -> Option<(&K, &V)> {
        if self.root.is_nil() {
            return None;
        }
        let node = self.node(self.maximum(self.root));
        Some((&node.key, &node.value))
    }

    /// Snapshot of all keys in ascending order.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Snapshot of all values, ordered by their keys.
    pub fn elements(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.iter().map(|(_, v)| v.clone()).collect()
    }

    /// Whether every one of `values` is stored under some key.
    ///
    /// This matches against values, not keys (use [`contains_key`] for key
    /// membership). Each query scans a snapshot of all values, so the cost is
    /// O(n·m). An empty query is trivially satisfied.
    ///
    /// [`contains_key`]: RbTree::contains_key
    pub fn contains(&self, values: &[V]) -> bool
    where
        V: PartialEq,
    {
        let snapshot: Vec<&V> = self.iter().map(|(_, v)| v).collect();
        values
            .iter()
            .all(|wanted| snapshot.iter().any(|v| *v == wanted))
    }
}

fn push_left_spine<K, V>(nodes: &[Node<K, V>], stack: &mut Vec<NodeRef>, mut n: NodeRef) {
    while !n.is_nil() {
        stack.push(n);
        n = nodes[n.idx()].left;
    }
}

/// In-order iterator over a tree, created by [`RbTree::iter`].
pub struct Iter<'a, K, V> {
    nodes: &'a [Node<K, V>],
    stack: Vec<NodeRef>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        let node = &self.nodes[n.idx()];
        push_left_spine(self.nodes, &mut self.stack, node.right);
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Bounded in-order iterator, created by [`RbTree::range`].
pub struct Range<'a, K, V, C> {
    nodes: &'a [Node<K, V>],
    cmp: &'a C,
    stack: Vec<NodeRef>,
    upper: Bound<&'a K>,
}

impl<'a, K, V, C: Comparator<K>> Iterator for Range<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        let node = &self.nodes[n.idx()];
        let below_upper = match self.upper {
            Bound::Unbounded => true,
            Bound::Included(k) => self.cmp.compare(&node.key, k) != Ordering::Greater,
            Bound::Excluded(k) => self.cmp.compare(&node.key, k) == Ordering::Less,
        };
        if !below_upper {
            self.stack.clear();
            return None;
        }
        push_left_spine(self.nodes, &mut self.stack, node.right);
        Some((&node.key, &node.value))
    }
}

impl<K, V, C: Comparator<K>> FusedIterator for Range<'_, K, V, C> {}

impl<'a, K, V, C: Comparator<K>> IntoIterator for &'a RbTree<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Diagnostics
// =============================================================================

impl<K, V, C: Comparator<K>> RbTree<K, V, C> {
    /// Number of nodes on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        let mut best = 0;
        let mut stack = Vec::new();
        if !self.root.is_nil() {
            stack.push((self.root, 1));
        }
        while let Some((n, depth)) = stack.pop() {
            best = best.max(depth);
            for child in [self.left(n), self.right(n)] {
                if !child.is_nil() {
                    stack.push((child, depth + 1));
                }
            }
        }
        best
    }

    /// Walk the whole tree and verify ordering, parent links, the length, and
    /// the red-black color rules.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.root.is_nil() {
            return if self.count != 0 {
                Err(InvariantError::CountMismatch {
                    recorded: self.count,
                    reachable: 0,
                })
            } else if !self.nodes.is_empty() {
                Err(InvariantError::LeakedNodes {
                    reachable: 0,
                    allocated: self.nodes.len(),
                })
            } else {
                Ok(())
            };
        }
        if self.color(self.root) == Color::Red {
            return Err(InvariantError::RedRoot);
        }
        if !self.parent(self.root).is_nil() {
            return Err(InvariantError::BrokenParentLink { position: 0 });
        }

        let mut black_height: Option<usize> = None;
        let mut check_leaf = |found: usize| match black_height {
            None => {
                black_height = Some(found);
                Ok(())
            }
            Some(expected) if expected == found => Ok(()),
            Some(expected) => Err(InvariantError::UnbalancedBlacks { expected, found }),
        };

        // In-order walk; each stack entry carries the black count from the
        // root down to and including that node.
        let mut stack: Vec<(NodeRef, usize)> = Vec::new();
        let mut prev: Option<NodeRef> = None;
        let mut position = 0usize;
        let mut current = self.root;
        let mut blacks_above = 0usize;
        loop {
            while !current.is_nil() {
                let node = self.node(current);
                let blacks = blacks_above + usize::from(node.color == Color::Black);
                for child in [node.left, node.right] {
                    if child.is_nil() {
                        check_leaf(blacks)?;
                        continue;
                    }
                    if self.node(child).parent != current {
                        return Err(InvariantError::BrokenParentLink { position });
                    }
                    if node.color == Color::Red && self.node(child).color == Color::Red {
                        return Err(InvariantError::ConsecutiveReds { position });
                    }
                }
                stack.push((current, blacks));
                current = node.left;
                blacks_above = blacks;
            }

            let Some((n, blacks)) = stack.pop() else {
                break;
            };
            if let Some(p) = prev {
                if self.cmp.compare(&self.node(p).key, &self.node(n).key) != Ordering::Less {
                    return Err(InvariantError::OutOfOrder { position });
                }
            }
            prev = Some(n);
            position += 1;
            current = self.node(n).right;
            blacks_above = blacks;
        }

        if position != self.count {
            return Err(InvariantError::CountMismatch {
                recorded: self.count,
                reachable: position,
            });
        }
        if position != self.nodes.len() {
            return Err(InvariantError::LeakedNodes {
                reachable: position,
                allocated: self.nodes.len(),
            });
        }
        Ok(())
    }

    /// Right subtree, then the node, then the left subtree, driven by an
    /// explicit stack. Each frame is popped twice: `Enter` schedules the right
    /// subtree, `Emit` prints the node and schedules the left one.
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        K: fmt::Display,
    {
        enum Stage {
            Enter,
            Emit,
        }

        struct Frame {
            node: NodeRef,
            prefix: String,
            is_tail: bool,
            stage: Stage,
        }

        let mut stack = Vec::new();
        if !self.root.is_nil() {
            stack.push(Frame {
                node: self.root,
                prefix: String::new(),
                is_tail: true,
                stage: Stage::Enter,
            });
        }

        while let Some(frame) = stack.pop() {
            let node = self.node(frame.node);
            match frame.stage {
                Stage::Enter => {
                    let right = node.right;
                    let right_prefix = format!(
                        "{}{}",
                        frame.prefix,
                        if frame.is_tail { "│   " } else { "    " }
                    );
                    stack.push(Frame {
                        stage: Stage::Emit,
                        ..frame
                    });
                    if !right.is_nil() {
                        stack.push(Frame {
                            node: right,
                            prefix: right_prefix,
                            is_tail: false,
                            stage: Stage::Enter,
                        });
                    }
                }
                Stage::Emit => {
                    writeln!(
                        f,
                        "{}{}{}",
                        frame.prefix,
                        if frame.is_tail { "└── " } else { "┌── " },
                        node.key
                    )?;
                    if !node.left.is_nil() {
                        stack.push(Frame {
                            node: node.left,
                            prefix: format!(
                                "{}{}",
                                frame.prefix,
                                if frame.is_tail { "    " } else { "│   " }
                            ),
                            is_tail: true,
                            stage: Stage::Enter,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl<K, V, C: Default + Comparator<K>> Default for RbTree<K, V, C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C: Comparator<K>> fmt::Debug for RbTree<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Sideways branch-art dump of the tree shape, largest key on top. Meant for
/// eyeballing while debugging, not for parsing.
impl<K: fmt::Display, V, C: Comparator<K>> fmt::Display for RbTree<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RedBlackTree")?;
        self.fmt_tree(f)
    }
}


#[cfg(test)]
mod proptests;
