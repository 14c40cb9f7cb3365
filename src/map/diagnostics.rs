//! Whole-tree inspection for a quiescent map.
//!
//! These walks are memory-safe at any time, but while writers are active
//! they see an arbitrary mix of old and new nodes. Run them after every
//! writer has been joined to get a consistent picture. All of them use an
//! explicit stack, so a degenerate chain does not grow the call stack.

use std::cmp::Ordering as CmpOrdering;
use std::fmt as StdFmt;

use crate::error::StructureError;
use crate::list::ConcurrentAppendList;

use super::{ConcurrentBucketMap, TreeNode};

/// In-order node iterator.
struct InOrder<'a, K, T> {
    stack: Vec<&'a TreeNode<K, T>>,
    cursor: Option<&'a TreeNode<K, T>>,
}

impl<'a, K, T> Iterator for InOrder<'a, K, T> {
    type Item = &'a TreeNode<K, T>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.cursor {
            self.stack.push(node);
            self.cursor = node.left();
        }

        let node: &'a TreeNode<K, T> = self.stack.pop()?;
        self.cursor = node.right();
        Some(node)
    }
}

impl<K, T> ConcurrentBucketMap<K, T> {
    fn in_order(&self) -> InOrder<'_, K, T> {
        InOrder {
            stack: Vec::new(),
            cursor: self.root_node(),
        }
    }

    /// Visit every key and its bucket in ascending key order.
    pub fn walk_in_order<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &ConcurrentAppendList<T>),
    {
        for node in self.in_order() {
            visit(&node.key, &node.bucket);
        }
    }

    /// Number of nodes on the longest root-to-leaf path; 0 for an empty map.
    #[must_use]
    pub fn height(&self) -> usize {
        let mut deepest: usize = 0;
        let mut stack: Vec<(&TreeNode<K, T>, usize)> = Vec::new();

        if let Some(root) = self.root_node() {
            stack.push((root, 1));
        }

        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            for child in [node.left(), node.right()].into_iter().flatten() {
                stack.push((child, depth + 1));
            }
        }

        deepest
    }

    /// Write the tree as a Graphviz digraph.
    ///
    /// Each node shows its key and bucket length; edges are labelled `L` or
    /// `R`. Render with `dot -Tsvg`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn write_dot<W>(&self, out: &mut W) -> StdFmt::Result
    where
        W: StdFmt::Write,
        K: StdFmt::Debug,
    {
        writeln!(out, "digraph bucketree {{")?;
        writeln!(out, "  node [shape=box];")?;

        let mut next_id: usize = 0;
        let mut stack: Vec<(&TreeNode<K, T>, usize)> = Vec::new();

        if let Some(root) = self.root_node() {
            stack.push((root, next_id));
            next_id += 1;
        }

        while let Some((node, id)) = stack.pop() {
            let key: String = escape_dot(&format!("{:?}", node.key));
            writeln!(out, "  n{id} [label=\"{key}\\nlen={}\"];", node.bucket.len())?;

            for (label, child) in [("L", node.left()), ("R", node.right())] {
                if let Some(child) = child {
                    writeln!(out, "  n{id} -> n{next_id} [label=\"{label}\"];")?;
                    stack.push((child, next_id));
                    next_id += 1;
                }
            }
        }

        writeln!(out, "}}")
    }
}

impl<K: Ord, T> ConcurrentBucketMap<K, T> {
    /// Check that an in-order walk yields strictly increasing keys.
    ///
    /// Returns the number of nodes visited. A failure means the key type's
    /// `Ord` impl is not a strict total order.
    ///
    /// # Errors
    ///
    /// Returns the first [`StructureError`] found in key order.
    pub fn verify_order(&self) -> Result<usize, StructureError> {
        let mut previous: Option<&K> = None;
        let mut count: usize = 0;

        for (position, node) in self.in_order().enumerate() {
            if let Some(prev) = previous {
                match prev.cmp(&node.key) {
                    CmpOrdering::Less => {}
                    CmpOrdering::Equal => return Err(StructureError::DuplicateKey { position }),
                    CmpOrdering::Greater => return Err(StructureError::OutOfOrder { position }),
                }
            }

            previous = Some(&node.key);
            count += 1;
        }

        Ok(count)
    }
}

/// Escape a label for a double-quoted DOT string.
fn escape_dot(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
