//! The immutable logical-circuit DAG: hash-consed And/Or/Literal/Constant
//! gates and the memoized bottom-up traversal kernel.

use crate::repr::var_label::{Literal, VarLabel};
use rustc_hash::FxHashMap;

/// An index handle to a node owned by a [`CircuitManager`]. Handles are stable
/// for the lifetime of the manager; equal handles denote the identical node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CircuitPtr(usize);

impl CircuitPtr {
    pub(crate) fn new(v: usize) -> CircuitPtr {
        CircuitPtr(v)
    }

    pub fn value(&self) -> usize {
        self.0
    }
}

/// A logical gate. Inner gates hold their children in order; the order is
/// structurally significant (it is part of the interning key) but
/// set-equivalent for semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CircuitNode {
    Constant(bool),
    Literal(Literal),
    And(Vec<CircuitPtr>),
    Or(Vec<CircuitPtr>),
}

/// One step of a bottom-up fold; the inner-gate arms carry the ordered child
/// handles, and the fold passes a lookup for their already-computed values.
pub enum GateFold<'a> {
    Const(bool),
    Lit(Literal),
    And(&'a [CircuitPtr]),
    Or(&'a [CircuitPtr]),
}

/// One step of an aggregating bottom-up fold; the inner-gate arms carry the
/// ordered child results already materialized.
pub enum GateAggregate<'a, T> {
    Const(bool),
    Lit(Literal),
    And(&'a [T]),
    Or(&'a [T]),
}

/// A hash-consing arena of circuit nodes.
///
/// Every node is interned by value: there is at most one node per literal,
/// one per constant, and one per distinct child sequence of an inner gate.
/// Nodes are immutable once published, so rebuilding a node with identical
/// children returns the same handle; the rewrite idempotence laws are
/// pointer identities for this reason. Children always precede parents in the
/// arena, so ascending handle order is a topological order.
///
/// ```
/// use rslc::repr::{CircuitManager, VarLabel};
///
/// let mut mgr = CircuitManager::new();
/// let a = mgr.var(VarLabel::new(1), true);
/// let b = mgr.var(VarLabel::new(2), false);
/// let f = mgr.and(vec![a, b]);
/// assert_eq!(mgr.and(vec![a, b]), f);
/// assert_eq!(mgr.num_nodes(f), 3);
/// ```
pub struct CircuitManager {
    nodes: Vec<CircuitNode>,
    table: FxHashMap<CircuitNode, CircuitPtr>,
}

impl CircuitManager {
    pub fn new() -> CircuitManager {
        CircuitManager {
            nodes: Vec::new(),
            table: FxHashMap::default(),
        }
    }

    fn intern(&mut self, node: CircuitNode) -> CircuitPtr {
        if let Some(&p) = self.table.get(&node) {
            return p;
        }
        let p = CircuitPtr::new(self.nodes.len());
        self.nodes.push(node.clone());
        self.table.insert(node, p);
        p
    }

    pub fn constant(&mut self, b: bool) -> CircuitPtr {
        self.intern(CircuitNode::Constant(b))
    }

    pub fn true_ptr(&mut self) -> CircuitPtr {
        self.constant(true)
    }

    pub fn false_ptr(&mut self) -> CircuitPtr {
        self.constant(false)
    }

    pub fn literal(&mut self, lit: Literal) -> CircuitPtr {
        self.intern(CircuitNode::Literal(lit))
    }

    pub fn var(&mut self, label: VarLabel, polarity: bool) -> CircuitPtr {
        self.literal(Literal::new(label, polarity))
    }

    /// conjunction gate over the given children, preserving arity
    pub fn and(&mut self, children: Vec<CircuitPtr>) -> CircuitPtr {
        assert!(!children.is_empty(), "and gate requires at least one child");
        debug_assert!(children.iter().all(|c| c.value() < self.nodes.len()));
        self.intern(CircuitNode::And(children))
    }

    /// disjunction gate over the given children, preserving arity
    pub fn or(&mut self, children: Vec<CircuitPtr>) -> CircuitPtr {
        assert!(!children.is_empty(), "or gate requires at least one child");
        debug_assert!(children.iter().all(|c| c.value() < self.nodes.len()));
        self.intern(CircuitNode::Or(children))
    }

    /// conjunction with collapsing arity conventions: no children is ⊤, one
    /// child is the child itself
    pub fn conjoin(&mut self, children: Vec<CircuitPtr>) -> CircuitPtr {
        match children.len() {
            0 => self.constant(true),
            1 => children[0],
            _ => self.and(children),
        }
    }

    /// disjunction with collapsing arity conventions: no children is ⊥, one
    /// child is the child itself
    pub fn disjoin(&mut self, children: Vec<CircuitPtr>) -> CircuitPtr {
        match children.len() {
            0 => self.constant(false),
            1 => children[0],
            _ => self.or(children),
        }
    }

    pub fn node(&self, p: CircuitPtr) -> &CircuitNode {
        &self.nodes[p.value()]
    }

    pub fn is_true(&self, p: CircuitPtr) -> bool {
        matches!(self.node(p), CircuitNode::Constant(true))
    }

    pub fn is_false(&self, p: CircuitPtr) -> bool {
        matches!(self.node(p), CircuitNode::Constant(false))
    }

    pub fn is_constant(&self, p: CircuitPtr) -> bool {
        matches!(self.node(p), CircuitNode::Constant(_))
    }

    pub fn is_literal(&self, p: CircuitPtr) -> bool {
        matches!(self.node(p), CircuitNode::Literal(_))
    }

    /// total number of nodes allocated by this manager, reachable or not
    pub fn num_allocated(&self) -> usize {
        self.nodes.len()
    }

    /// the nodes reachable from `root` in children-before-parents order; the
    /// final element is `root` itself
    pub fn linearize(&self, root: CircuitPtr) -> Vec<CircuitPtr> {
        let mut seen = vec![false; root.value() + 1];
        let mut stack = vec![root];
        seen[root.value()] = true;
        while let Some(p) = stack.pop() {
            if let CircuitNode::And(cs) | CircuitNode::Or(cs) = self.node(p) {
                for &c in cs {
                    if !seen[c.value()] {
                        seen[c.value()] = true;
                        stack.push(c);
                    }
                }
            }
        }
        (0..=root.value())
            .filter(|&i| seen[i])
            .map(CircuitPtr::new)
            .collect()
    }

    /// number of nodes reachable from `root`, including `root`
    pub fn num_nodes(&self, root: CircuitPtr) -> usize {
        self.linearize(root).len()
    }

    /// number of edges (child references) reachable from `root`
    pub fn num_edges(&self, root: CircuitPtr) -> usize {
        self.linearize(root)
            .iter()
            .map(|&p| match self.node(p) {
                CircuitNode::And(cs) | CircuitNode::Or(cs) => cs.len(),
                _ => 0,
            })
            .sum()
    }

    /// Memoized bottom-up fold. Each node reachable from `root` is visited
    /// exactly once, children strictly before parents; the visitor receives a
    /// lookup that yields the cached value of any already-visited node.
    pub fn foldup<T, F>(&self, root: CircuitPtr, mut f: F) -> T
    where
        T: Clone,
        F: FnMut(CircuitPtr, GateFold<'_>, &dyn Fn(CircuitPtr) -> T) -> T,
    {
        let order = self.linearize(root);
        let mut memo: Vec<Option<T>> = vec![None; root.value() + 1];
        for ptr in order {
            let value = {
                let lookup = |c: CircuitPtr| -> T {
                    memo[c.value()]
                        .clone()
                        .expect("child visited before parent")
                };
                match self.node(ptr) {
                    CircuitNode::Constant(b) => f(ptr, GateFold::Const(*b), &lookup),
                    CircuitNode::Literal(l) => f(ptr, GateFold::Lit(*l), &lookup),
                    CircuitNode::And(cs) => f(ptr, GateFold::And(cs), &lookup),
                    CircuitNode::Or(cs) => f(ptr, GateFold::Or(cs), &lookup),
                }
            };
            memo[ptr.value()] = Some(value);
        }
        memo[root.value()].take().expect("root visited")
    }

    /// Memoized bottom-up fold where the visitor receives the ordered child
    /// results already materialized.
    pub fn foldup_aggregate<T, F>(&self, root: CircuitPtr, mut f: F) -> T
    where
        T: Clone,
        F: FnMut(CircuitPtr, GateAggregate<'_, T>) -> T,
    {
        let order = self.linearize(root);
        let mut memo: Vec<Option<T>> = vec![None; root.value() + 1];
        for ptr in order {
            let value = match self.node(ptr) {
                CircuitNode::Constant(b) => f(ptr, GateAggregate::Const(*b)),
                CircuitNode::Literal(l) => f(ptr, GateAggregate::Lit(*l)),
                CircuitNode::And(cs) => {
                    let vals: Vec<T> = cs
                        .iter()
                        .map(|c| memo[c.value()].clone().expect("child visited"))
                        .collect();
                    f(ptr, GateAggregate::And(&vals))
                }
                CircuitNode::Or(cs) => {
                    let vals: Vec<T> = cs
                        .iter()
                        .map(|c| memo[c.value()].clone().expect("child visited"))
                        .collect();
                    f(ptr, GateAggregate::Or(&vals))
                }
            };
            memo[ptr.value()] = Some(value);
        }
        memo[root.value()].take().expect("root visited")
    }

    /// true if at most one reachable node exists per literal value
    pub fn has_unique_literal_nodes(&self, root: CircuitPtr) -> bool {
        let mut seen = std::collections::HashSet::new();
        for p in self.linearize(root) {
            if let CircuitNode::Literal(l) = self.node(p) {
                if !seen.insert(*l) {
                    return false;
                }
            }
        }
        true
    }

    /// true if at most one reachable True node and one False node exist
    pub fn has_unique_constant_nodes(&self, root: CircuitPtr) -> bool {
        let mut seen = [false, false];
        for p in self.linearize(root) {
            if let CircuitNode::Constant(b) = self.node(p) {
                let idx = *b as usize;
                if seen[idx] {
                    return false;
                }
                seen[idx] = true;
            }
        }
        true
    }

    /// true if the circuit contains a reachable True or False node
    pub fn contains_constants(&self, root: CircuitPtr) -> bool {
        self.linearize(root)
            .iter()
            .any(|&p| self.is_constant(p))
    }
}

impl Default for CircuitManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::var_label::VarLabel;

    #[test]
    fn interning_dedups() {
        let mut mgr = CircuitManager::new();
        let a = mgr.var(VarLabel::new(1), true);
        let a2 = mgr.var(VarLabel::new(1), true);
        assert_eq!(a, a2);
        let t1 = mgr.true_ptr();
        let t2 = mgr.true_ptr();
        assert_eq!(t1, t2);
        let b = mgr.var(VarLabel::new(2), true);
        let g1 = mgr.or(vec![a, b]);
        let g2 = mgr.or(vec![a, b]);
        assert_eq!(g1, g2);
        let g3 = mgr.or(vec![b, a]);
        assert_ne!(g1, g3);
    }

    #[test]
    fn linearize_children_first() {
        let mut mgr = CircuitManager::new();
        let a = mgr.var(VarLabel::new(1), true);
        let b = mgr.var(VarLabel::new(2), true);
        let inner = mgr.and(vec![a, b]);
        let c = mgr.var(VarLabel::new(3), false);
        let root = mgr.or(vec![inner, c]);
        let order = self::positions(&mgr, root);
        for (&p, &pos) in order.iter() {
            if let CircuitNode::And(cs) | CircuitNode::Or(cs) = mgr.node(p) {
                for c in cs {
                    assert!(order[c] < pos, "child after parent");
                }
            }
        }
        assert_eq!(*mgr.linearize(root).last().unwrap(), root);
    }

    fn positions(
        mgr: &CircuitManager,
        root: CircuitPtr,
    ) -> std::collections::HashMap<CircuitPtr, usize> {
        mgr.linearize(root)
            .into_iter()
            .enumerate()
            .map(|(i, p)| (p, i))
            .collect()
    }

    #[test]
    fn foldup_visits_once() {
        let mut mgr = CircuitManager::new();
        let a = mgr.var(VarLabel::new(1), true);
        let b = mgr.var(VarLabel::new(2), true);
        let inner = mgr.and(vec![a, b]);
        // diamond: the shared node must be visited a single time
        let root = mgr.or(vec![inner, inner, a]);
        let mut visits = 0usize;
        let size: usize = mgr.foldup_aggregate(root, |_, g| {
            visits += 1;
            match g {
                GateAggregate::Const(_) | GateAggregate::Lit(_) => 1,
                GateAggregate::And(cs) | GateAggregate::Or(cs) => {
                    1 + cs.iter().sum::<usize>()
                }
            }
        });
        assert_eq!(visits, 4);
        // size counts shared children once per edge: 1 + (3 + 3 + 1)
        assert_eq!(size, 8);
    }

    #[test]
    fn validators() {
        let mut mgr = CircuitManager::new();
        let a = mgr.var(VarLabel::new(1), true);
        let na = mgr.var(VarLabel::new(1), false);
        let root = mgr.or(vec![a, na]);
        assert!(mgr.has_unique_literal_nodes(root));
        assert!(mgr.has_unique_constant_nodes(root));
        assert!(!mgr.contains_constants(root));
    }
}
