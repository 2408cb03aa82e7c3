//! Structural rewrites over the logical DAG. Each rewrite is a bottom-up
//! rebuild pass producing a new root in the same arena; unchanged sub-DAGs
//! are shared, and re-running a rewrite on its own output returns the same
//! root handle.

use crate::repr::circuit::{CircuitManager, CircuitNode, CircuitPtr};
use crate::repr::var_label::{Literal, VarLabel};
use rustc_hash::FxHashMap;

impl CircuitManager {
    /// Remove constant nodes by absorption: an And with a False child becomes
    /// False and drops True children; an Or with a True child becomes True
    /// and drops False children. The result contains no constant node unless
    /// the whole circuit reduces to one.
    pub fn propagate_constants(&mut self, root: CircuitPtr) -> CircuitPtr {
        let order = self.linearize(root);
        let mut map: FxHashMap<CircuitPtr, CircuitPtr> = FxHashMap::default();
        for ptr in order {
            let new = match self.node(ptr).clone() {
                CircuitNode::Constant(b) => self.constant(b),
                CircuitNode::Literal(l) => self.literal(l),
                CircuitNode::And(cs) => {
                    let mapped: Vec<CircuitPtr> = cs.iter().map(|c| map[c]).collect();
                    if mapped.iter().any(|&m| self.is_false(m)) {
                        self.constant(false)
                    } else {
                        let kept: Vec<CircuitPtr> =
                            mapped.into_iter().filter(|&m| !self.is_true(m)).collect();
                        self.conjoin(kept)
                    }
                }
                CircuitNode::Or(cs) => {
                    let mapped: Vec<CircuitPtr> = cs.iter().map(|c| map[c]).collect();
                    if mapped.iter().any(|&m| self.is_true(m)) {
                        self.constant(true)
                    } else {
                        let kept: Vec<CircuitPtr> =
                            mapped.into_iter().filter(|&m| !self.is_false(m)).collect();
                        self.disjoin(kept)
                    }
                }
            };
            map.insert(ptr, new);
        }
        map[&root]
    }

    /// Substitute True for every literal whose variable satisfies `pred` and
    /// rebuild inner gates over the mapped children. Determinism of the input
    /// is not preserved.
    pub fn forget<F>(&mut self, root: CircuitPtr, pred: F) -> CircuitPtr
    where
        F: Fn(VarLabel) -> bool,
    {
        let order = self.linearize(root);
        let mut map: FxHashMap<CircuitPtr, CircuitPtr> = FxHashMap::default();
        for ptr in order {
            let new = match self.node(ptr).clone() {
                CircuitNode::Constant(b) => self.constant(b),
                CircuitNode::Literal(l) if pred(l.label()) => self.constant(true),
                CircuitNode::Literal(l) => self.literal(l),
                CircuitNode::And(cs) => {
                    let mapped: Vec<CircuitPtr> = cs.iter().map(|c| map[c]).collect();
                    self.and(mapped)
                }
                CircuitNode::Or(cs) => {
                    let mapped: Vec<CircuitPtr> = cs.iter().map(|c| map[c]).collect();
                    self.or(mapped)
                }
            };
            map.insert(ptr, new);
        }
        map[&root]
    }

    /// Make every Or gate locally smooth by conjoining each child with
    /// `v ∨ ¬v` for every variable `v` in the Or's scope that the child
    /// misses. Pads are shared across uses. Preserves decomposability and is
    /// idempotent.
    pub fn smooth(&mut self, root: CircuitPtr) -> CircuitPtr {
        let scopes = self.variable_scopes(root);
        let order = self.linearize(root);
        let mut map: FxHashMap<CircuitPtr, CircuitPtr> = FxHashMap::default();
        let mut pads: FxHashMap<VarLabel, CircuitPtr> = FxHashMap::default();
        for ptr in order {
            let new = match self.node(ptr).clone() {
                CircuitNode::Constant(b) => self.constant(b),
                CircuitNode::Literal(l) => self.literal(l),
                CircuitNode::And(cs) => {
                    let mapped: Vec<CircuitPtr> = cs.iter().map(|c| map[c]).collect();
                    self.and(mapped)
                }
                CircuitNode::Or(cs) => {
                    let parent_scope = &scopes[&ptr];
                    let mut new_children = Vec::with_capacity(cs.len());
                    for c in &cs {
                        let mapped = map[c];
                        let missing: Vec<VarLabel> =
                            parent_scope.difference(&scopes[c]).collect();
                        if missing.is_empty() {
                            new_children.push(mapped);
                            continue;
                        }
                        let mut parts = vec![mapped];
                        for v in missing {
                            let pad = match pads.get(&v) {
                                Some(&p) => p,
                                None => {
                                    let pos = self.literal(Literal::new(v, true));
                                    let neg = self.literal(Literal::new(v, false));
                                    let p = self.disjoin(vec![pos, neg]);
                                    pads.insert(v, p);
                                    p
                                }
                            };
                            parts.push(pad);
                        }
                        new_children.push(self.conjoin(parts));
                    }
                    self.or(new_children)
                }
            };
            map.insert(ptr, new);
        }
        map[&root]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn propagate_constants_removes_constants() {
        let mut mgr = CircuitManager::new();
        let a = mgr.var(VarLabel::new(1), true);
        let b = mgr.var(VarLabel::new(2), true);
        let t = mgr.true_ptr();
        let f = mgr.false_ptr();
        let dead = mgr.and(vec![b, f]);
        let live = mgr.and(vec![a, t]);
        let root = mgr.or(vec![live, dead]);
        let r = mgr.propagate_constants(root);
        // (a ∧ ⊤) ∨ (b ∧ ⊥) reduces to a
        assert_eq!(r, a);
        assert!(!mgr.contains_constants(r));
        // idempotent under pointer identity
        assert_eq!(mgr.propagate_constants(r), r);
    }

    #[test]
    fn propagate_constants_to_constant() {
        let mut mgr = CircuitManager::new();
        let a = mgr.var(VarLabel::new(1), true);
        let t = mgr.true_ptr();
        let root = mgr.or(vec![a, t]);
        let r = mgr.propagate_constants(root);
        assert!(mgr.is_true(r));
    }

    #[test]
    fn forget_replaces_literals() {
        let mut mgr = CircuitManager::new();
        let a = mgr.var(VarLabel::new(1), true);
        let b = mgr.var(VarLabel::new(2), true);
        let nb = mgr.var(VarLabel::new(2), false);
        let l = mgr.and(vec![a, b]);
        let r = mgr.and(vec![a, nb]);
        let root = mgr.or(vec![l, r]);
        let forgotten = mgr.forget(root, |v| v.value() == 2);
        assert_eq!(mgr.num_variables(forgotten), 1);
        // both branches collapse to (a ∧ ⊤), shared by interning
        let t = mgr.true_ptr();
        let at = mgr.and(vec![a, t]);
        let expected = mgr.or(vec![at, at]);
        assert_eq!(forgotten, expected);
        // idempotent under pointer identity
        let again = mgr.forget(forgotten, |v| v.value() == 2);
        assert_eq!(again, forgotten);
    }

    #[test]
    fn smooth_pads_or_children() {
        let mut mgr = CircuitManager::new();
        let a = mgr.var(VarLabel::new(1), true);
        let b = mgr.var(VarLabel::new(2), true);
        let root = mgr.or(vec![a, b]);
        assert!(!mgr.is_smooth(root));
        let s = mgr.smooth(root);
        assert!(mgr.is_smooth(s));
        assert!(mgr.is_decomposable(s));
        assert_eq!(mgr.num_variables(s), 2);
        // already-smooth input is returned unchanged
        assert_eq!(mgr.smooth(s), s);
    }

    #[test]
    fn smooth_preserves_models() {
        let mut mgr = CircuitManager::new();
        let a = mgr.var(VarLabel::new(1), true);
        let b = mgr.var(VarLabel::new(2), true);
        let c = mgr.var(VarLabel::new(3), true);
        let inner = mgr.and(vec![a, b]);
        let root = mgr.or(vec![inner, c]);
        let s = mgr.smooth(root);
        // each pad contributes exactly p + (1 - p) = 1, so the computed
        // probability and the derived count are unchanged
        assert_eq!(
            mgr.model_count(root, Some(3)),
            mgr.model_count(s, Some(3))
        );
    }
}
