//! Structural and semantic queries over the logical DAG, all expressed as
//! bottom-up folds.

use crate::repr::circuit::{CircuitManager, CircuitPtr, GateAggregate, GateFold};
use crate::repr::var_label::{VarLabel, VarSet};
use bitvec::prelude::*;
use num::rational::BigRational;
use num::{BigInt, One, Zero};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;
use std::collections::HashMap;

/// Satisfying-assignment probabilities for each variable under an
/// independent-variable prior. Unset variables default to 1/2.
#[derive(Debug, Clone)]
pub struct SatProbParams {
    default: BigRational,
    probs: FxHashMap<VarLabel, BigRational>,
}

impl SatProbParams {
    /// the uniform prior: every variable is true with probability 1/2
    pub fn uniform() -> SatProbParams {
        SatProbParams {
            default: BigRational::new(BigInt::from(1), BigInt::from(2)),
            probs: FxHashMap::default(),
        }
    }

    pub fn set_prob(&mut self, label: VarLabel, p: BigRational) {
        self.probs.insert(label, p);
    }

    pub fn prob(&self, label: VarLabel) -> BigRational {
        self.probs
            .get(&label)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

impl Default for SatProbParams {
    fn default() -> Self {
        Self::uniform()
    }
}

/// Probabilistic equivalence signatures: one random rational vector per
/// variable, propagated through the circuit. Semantically equivalent nodes
/// receive equal signatures; distinct functions collide with probability
/// vanishing in the vector length.
#[derive(Debug, Clone)]
pub struct ProbSignatures {
    vars: FxHashMap<VarLabel, Vec<BigRational>>,
    nodes: FxHashMap<CircuitPtr, Vec<BigRational>>,
}

impl ProbSignatures {
    pub fn var(&self, label: VarLabel) -> &[BigRational] {
        &self.vars[&label]
    }

    pub fn node(&self, p: CircuitPtr) -> &[BigRational] {
        &self.nodes[&p]
    }
}

/// field size for signature entries; entries are 1/u for u uniform in
/// [1, SIGNATURE_PRIME]
const SIGNATURE_PRIME: u64 = 7919;

impl CircuitManager {
    /// the set of variables mentioned below `root`
    pub fn variable_scope(&self, root: CircuitPtr) -> VarSet {
        self.foldup(root, |_, g, lookup| match g {
            GateFold::Const(_) => VarSet::new(),
            GateFold::Lit(l) => VarSet::singleton(l.label()),
            GateFold::And(cs) | GateFold::Or(cs) => {
                let mut s = VarSet::new();
                for &c in cs {
                    s.union_with(&lookup(c));
                }
                s
            }
        })
    }

    /// the variable scope of every node reachable from `root`
    pub fn variable_scopes(&self, root: CircuitPtr) -> FxHashMap<CircuitPtr, VarSet> {
        let mut map: FxHashMap<CircuitPtr, VarSet> = FxHashMap::default();
        for ptr in self.linearize(root) {
            let s = match self.node(ptr) {
                crate::repr::circuit::CircuitNode::Constant(_) => VarSet::new(),
                crate::repr::circuit::CircuitNode::Literal(l) => VarSet::singleton(l.label()),
                crate::repr::circuit::CircuitNode::And(cs)
                | crate::repr::circuit::CircuitNode::Or(cs) => {
                    let mut s = VarSet::new();
                    for c in cs {
                        s.union_with(&map[c]);
                    }
                    s
                }
            };
            map.insert(ptr, s);
        }
        map
    }

    pub fn num_variables(&self, root: CircuitPtr) -> usize {
        self.variable_scope(root).len()
    }

    /// true if every And gate has children with pairwise-disjoint scopes
    pub fn is_decomposable(&self, root: CircuitPtr) -> bool {
        let (_, ok) = self.foldup_aggregate(root, |_, g| match g {
            GateAggregate::Const(_) => (VarSet::new(), true),
            GateAggregate::Lit(l) => (VarSet::singleton(l.label()), true),
            GateAggregate::And(kids) => {
                let mut ok = kids.iter().all(|(_, k)| *k);
                let mut s = VarSet::new();
                for (ks, _) in kids {
                    if !s.is_disjoint(ks) {
                        ok = false;
                    }
                    s.union_with(ks);
                }
                (s, ok)
            }
            GateAggregate::Or(kids) => {
                let ok = kids.iter().all(|(_, k)| *k);
                let mut s = VarSet::new();
                for (ks, _) in kids {
                    s.union_with(ks);
                }
                (s, ok)
            }
        });
        ok
    }

    /// true if every Or gate has children with identical scopes
    pub fn is_smooth(&self, root: CircuitPtr) -> bool {
        let (_, ok) = self.foldup_aggregate(root, |_, g| match g {
            GateAggregate::Const(_) => (VarSet::new(), true),
            GateAggregate::Lit(l) => (VarSet::singleton(l.label()), true),
            GateAggregate::And(kids) => {
                let ok = kids.iter().all(|(_, k)| *k);
                let mut s = VarSet::new();
                for (ks, _) in kids {
                    s.union_with(ks);
                }
                (s, ok)
            }
            GateAggregate::Or(kids) => {
                let mut ok = kids.iter().all(|(_, k)| *k);
                if kids.windows(2).any(|w| w[0].0 != w[1].0) {
                    ok = false;
                }
                let mut s = VarSet::new();
                for (ks, _) in kids {
                    s.union_with(ks);
                }
                (s, ok)
            }
        });
        ok
    }

    /// Satisfying-assignment probability under an independent-variable prior.
    /// Exact rational arithmetic; the result is the true probability when the
    /// circuit is decomposable and smooth.
    pub fn sat_prob(&self, root: CircuitPtr, params: &SatProbParams) -> BigRational {
        self.foldup_aggregate(root, |_, g| match g {
            GateAggregate::Const(false) => BigRational::zero(),
            GateAggregate::Const(true) => BigRational::one(),
            GateAggregate::Lit(l) => {
                let p = params.prob(l.label());
                if l.polarity() {
                    p
                } else {
                    BigRational::one() - p
                }
            }
            GateAggregate::And(kids) => kids
                .iter()
                .fold(BigRational::one(), |acc, v| acc * v),
            GateAggregate::Or(kids) => kids
                .iter()
                .fold(BigRational::zero(), |acc, v| acc + v),
        })
    }

    /// Model count over `n` variables, defaulting to the scope size. `n` may
    /// exceed the scope; each extra variable doubles the count.
    pub fn model_count(&self, root: CircuitPtr, n: Option<usize>) -> BigInt {
        let n = n.unwrap_or_else(|| self.num_variables(root));
        let p = self.sat_prob(root, &SatProbParams::uniform());
        let count = p * BigRational::from_integer(num::pow(BigInt::from(2), n));
        debug_assert!(
            count.is_integer(),
            "non-integral model count; is the circuit decomposable and smooth?"
        );
        count.to_integer()
    }

    /// Probabilistic equivalence signatures of length `k`, deterministic in
    /// `seed`. Each variable receives a fresh vector with entries `1/u`, `u`
    /// uniform in `[1, 7919]`; And propagates the component-wise product, Or
    /// the component-wise sum, and a negative literal maps to `1 - v`.
    pub fn prob_equiv_signature(
        &self,
        root: CircuitPtr,
        k: usize,
        seed: u64,
    ) -> ProbSignatures {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut vars: FxHashMap<VarLabel, Vec<BigRational>> = FxHashMap::default();
        for v in self.variable_scope(root).iter() {
            let sig = (0..k)
                .map(|_| {
                    let u = rng.gen_range(1..=SIGNATURE_PRIME);
                    BigRational::new(BigInt::from(1), BigInt::from(u))
                })
                .collect();
            vars.insert(v, sig);
        }

        let mut nodes: FxHashMap<CircuitPtr, Vec<BigRational>> = FxHashMap::default();
        for ptr in self.linearize(root) {
            let sig = match self.node(ptr) {
                crate::repr::circuit::CircuitNode::Constant(b) => {
                    let unit = if *b {
                        BigRational::one()
                    } else {
                        BigRational::zero()
                    };
                    vec![unit; k]
                }
                crate::repr::circuit::CircuitNode::Literal(l) => {
                    let base = &vars[&l.label()];
                    if l.polarity() {
                        base.clone()
                    } else {
                        base.iter().map(|v| BigRational::one() - v).collect()
                    }
                }
                crate::repr::circuit::CircuitNode::And(cs) => {
                    let mut acc = vec![BigRational::one(); k];
                    for c in cs {
                        for (a, v) in acc.iter_mut().zip(nodes[c].iter()) {
                            *a = a.clone() * v;
                        }
                    }
                    acc
                }
                crate::repr::circuit::CircuitNode::Or(cs) => {
                    let mut acc = vec![BigRational::zero(); k];
                    for c in cs {
                        for (a, v) in acc.iter_mut().zip(nodes[c].iter()) {
                            *a = a.clone() + v;
                        }
                    }
                    acc
                }
            };
            nodes.insert(ptr, sig);
        }
        ProbSignatures { vars, nodes }
    }

    /// Evaluate the circuit on a batch of examples. `columns[v - 1]` is the
    /// packed feature column of variable `v`; all columns must share one
    /// length, the number of examples. The result holds one bit per example.
    pub fn evaluate(&self, root: CircuitPtr, columns: &[BitVec]) -> BitVec {
        let n = columns.first().map(|c| c.len()).unwrap_or(0);
        self.foldup_aggregate(root, |_, g: GateAggregate<'_, BitVec>| match g {
            GateAggregate::Const(b) => BitVec::repeat(b, n),
            GateAggregate::Lit(l) => {
                let col = &columns[l.label().value_usize() - 1];
                if l.polarity() {
                    col.clone()
                } else {
                    !col.clone()
                }
            }
            GateAggregate::And(kids) => {
                let mut acc = kids[0].clone();
                for k in &kids[1..] {
                    acc &= k.as_bitslice();
                }
                acc
            }
            GateAggregate::Or(kids) => {
                let mut acc = kids[0].clone();
                for k in &kids[1..] {
                    acc |= k.as_bitslice();
                }
                acc
            }
        })
    }

    /// Evaluate the circuit on a single assignment; panics if a reachable
    /// variable is missing from the assignment.
    pub fn evaluate_assignment(
        &self,
        root: CircuitPtr,
        assignment: &HashMap<VarLabel, bool>,
    ) -> bool {
        self.foldup(root, |_, g, lookup| match g {
            GateFold::Const(b) => b,
            GateFold::Lit(l) => {
                let v = *assignment
                    .get(&l.label())
                    .unwrap_or_else(|| panic!("variable {} not assigned", l.label()));
                if l.polarity() {
                    v
                } else {
                    !v
                }
            }
            GateFold::And(cs) => cs.iter().all(|&c| lookup(c)),
            GateFold::Or(cs) => cs.iter().any(|&c| lookup(c)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xor_circuit(mgr: &mut CircuitManager) -> CircuitPtr {
        // (1 ∧ ¬2) ∨ (¬1 ∧ 2)
        let a = mgr.var(VarLabel::new(1), true);
        let na = mgr.var(VarLabel::new(1), false);
        let b = mgr.var(VarLabel::new(2), true);
        let nb = mgr.var(VarLabel::new(2), false);
        let l = mgr.and(vec![a, nb]);
        let r = mgr.and(vec![na, b]);
        mgr.or(vec![l, r])
    }

    #[test]
    fn scope_and_structure() {
        let mut mgr = CircuitManager::new();
        let root = xor_circuit(&mut mgr);
        let scope = mgr.variable_scope(root);
        assert_eq!(scope.len(), 2);
        assert!(scope.contains(VarLabel::new(1)));
        assert!(scope.contains(VarLabel::new(2)));
        assert!(mgr.is_decomposable(root));
        assert!(mgr.is_smooth(root));
    }

    #[test]
    fn non_decomposable_detected() {
        let mut mgr = CircuitManager::new();
        let a = mgr.var(VarLabel::new(1), true);
        let na = mgr.var(VarLabel::new(1), false);
        let root = mgr.and(vec![a, na]);
        assert!(!mgr.is_decomposable(root));
    }

    #[test]
    fn non_smooth_detected() {
        let mut mgr = CircuitManager::new();
        let a = mgr.var(VarLabel::new(1), true);
        let b = mgr.var(VarLabel::new(2), true);
        let root = mgr.or(vec![a, b]);
        assert!(!mgr.is_smooth(root));
    }

    #[test]
    fn xor_counts() {
        let mut mgr = CircuitManager::new();
        let root = xor_circuit(&mut mgr);
        let p = mgr.sat_prob(root, &SatProbParams::uniform());
        assert_eq!(p, BigRational::new(BigInt::from(1), BigInt::from(2)));
        assert_eq!(mgr.model_count(root, None), BigInt::from(2));
        assert_eq!(mgr.model_count(root, Some(3)), BigInt::from(4));
    }

    #[test]
    fn biased_sat_prob() {
        let mut mgr = CircuitManager::new();
        let root = xor_circuit(&mut mgr);
        let mut params = SatProbParams::uniform();
        // P(1) = 1, P(2) = 0: xor is true with probability 1
        params.set_prob(VarLabel::new(1), BigRational::one());
        params.set_prob(VarLabel::new(2), BigRational::zero());
        assert_eq!(mgr.sat_prob(root, &params), BigRational::one());
    }

    #[test]
    fn evaluate_matches_assignment() {
        let mut mgr = CircuitManager::new();
        let root = xor_circuit(&mut mgr);
        // four examples: every assignment over (1, 2)
        let col1: BitVec = bitvec![0, 0, 1, 1];
        let col2: BitVec = bitvec![0, 1, 0, 1];
        let out = mgr.evaluate(root, &[col1.clone(), col2.clone()]);
        for i in 0..4 {
            let assignment = HashMap::from([
                (VarLabel::new(1), col1[i]),
                (VarLabel::new(2), col2[i]),
            ]);
            assert_eq!(out[i], mgr.evaluate_assignment(root, &assignment));
        }
        assert_eq!(out, bitvec![0, 1, 1, 0]);
    }

    #[test]
    fn signatures_separate_and_agree() {
        let mut mgr = CircuitManager::new();
        let root = xor_circuit(&mut mgr);
        // structurally distinct but equivalent: (¬1 ∧ 2) ∨ (1 ∧ ¬2)
        let a = mgr.var(VarLabel::new(1), true);
        let na = mgr.var(VarLabel::new(1), false);
        let b = mgr.var(VarLabel::new(2), true);
        let nb = mgr.var(VarLabel::new(2), false);
        let l = mgr.and(vec![na, b]);
        let r = mgr.and(vec![a, nb]);
        let root2 = mgr.or(vec![l, r]);
        assert_ne!(root, root2);

        // equivalent function, same assignment of variable vectors
        let top = mgr.or(vec![root, root2]);
        let sigs = mgr.prob_equiv_signature(top, 4, 0xfeed);
        assert_eq!(sigs.node(root), sigs.node(root2));
        // a literal and its negation must differ
        assert_ne!(sigs.node(a), sigs.node(na));
    }
}
