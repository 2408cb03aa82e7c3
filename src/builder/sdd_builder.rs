//! The SDD manager: per-vtree-node unique tables and apply caches, and the
//! vtree-aware apply engine.

use crate::repr::circuit::{CircuitManager, CircuitPtr};
use crate::repr::sdd::{SddElement, SddId, SddOr, SddPtr};
use crate::repr::var_label::{Literal, VarLabel};
use crate::repr::vtree::{VTree, VTreeIndex, VTreeManager};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, Default)]
pub struct SddStats {
    /// total number of recursive apply calls
    pub num_recursive_calls: usize,
    pub app_cache_hits: usize,
    pub num_nodes_allocated: usize,
}

/// Owns every canonical SDD node. Decision nodes live in the unique table of
/// the vtree node they respect; handles returned to callers are non-owning.
/// Two handles obtained from the same manager are semantically equivalent iff
/// they are equal.
pub struct SddManager {
    vtree: VTreeManager,
    nodes: Vec<SddOr>,
    /// per-vtree-node unique tables: XY-partition -> canonical decision node
    unique_tables: Vec<FxHashMap<Vec<SddElement>, SddId>>,
    /// per-vtree-node apply caches, keyed by the Ord-sorted operand pair
    apply_caches: Vec<FxHashMap<(SddPtr, SddPtr), SddPtr>>,
    neg_cache: FxHashMap<SddId, SddPtr>,
    stats: SddStats,
}

impl SddManager {
    pub fn new(tree: VTree) -> SddManager {
        let vtree = VTreeManager::new(tree);
        let n = vtree.num_vtree_nodes();
        log::debug!("sdd manager over vtree with {} nodes", n);
        SddManager {
            vtree,
            nodes: Vec::new(),
            unique_tables: vec![FxHashMap::default(); n],
            apply_caches: vec![FxHashMap::default(); n],
            neg_cache: FxHashMap::default(),
            stats: SddStats::default(),
        }
    }

    pub fn vtree_manager(&self) -> &VTreeManager {
        &self.vtree
    }

    pub fn stats(&self) -> &SddStats {
        &self.stats
    }

    pub fn true_ptr(&self) -> SddPtr {
        SddPtr::PtrTrue
    }

    pub fn false_ptr(&self) -> SddPtr {
        SddPtr::PtrFalse
    }

    /// a literal handle; panics if the variable is not in the vtree
    pub fn var(&self, lbl: VarLabel, polarity: bool) -> SddPtr {
        debug_assert!(self.vtree.try_var_index(lbl).is_some());
        SddPtr::Var(lbl, polarity)
    }

    fn node(&self, id: SddId) -> &SddOr {
        &self.nodes[id.value()]
    }

    /// the element list of a decision node; panics otherwise
    pub fn elements(&self, p: SddPtr) -> &[SddElement] {
        match p {
            SddPtr::Node(id) => self.node(id).elements(),
            _ => panic!("called elements on non-decision {:?}", p),
        }
    }

    /// the vtree node respected by `p`; panics on constants
    pub fn vtree_index(&self, p: SddPtr) -> VTreeIndex {
        match p {
            SddPtr::Var(lbl, _) => self.vtree.var_index(lbl),
            SddPtr::Node(id) => self.node(id).vtree(),
            _ => panic!("called vtree_index on constant"),
        }
    }

    /// Negation. O(size) with memoization: flips every decision element's sub
    /// and the polarity of literals; the unique tables dedup `¬¬x = x`.
    pub fn neg(&mut self, p: SddPtr) -> SddPtr {
        match p {
            SddPtr::PtrTrue => SddPtr::PtrFalse,
            SddPtr::PtrFalse => SddPtr::PtrTrue,
            SddPtr::Var(l, pol) => SddPtr::Var(l, !pol),
            SddPtr::Node(id) => {
                if let Some(&q) = self.neg_cache.get(&id) {
                    return q;
                }
                let or = self.node(id).clone();
                let mut out = Vec::with_capacity(or.elements().len());
                for e in or.elements() {
                    let s = self.neg(e.sub());
                    out.push(SddElement::new(e.prime(), s));
                }
                let q = self.canonicalize(out, or.vtree());
                self.neg_cache.insert(id, q);
                if let SddPtr::Node(qid) = q {
                    self.neg_cache.insert(qid, p);
                }
                q
            }
        }
    }

    /// Conjoin two SDDs. Dispatches on the vtree relationship of the
    /// operands: same node, descendent (either side), or independent.
    pub fn conjoin(&mut self, a: SddPtr, b: SddPtr) -> SddPtr {
        self.stats.num_recursive_calls += 1;

        match (a, b) {
            (SddPtr::PtrTrue, _) => return b,
            (_, SddPtr::PtrTrue) => return a,
            (SddPtr::PtrFalse, _) | (_, SddPtr::PtrFalse) => return SddPtr::PtrFalse,
            (SddPtr::Var(l1, p1), SddPtr::Var(l2, p2)) if l1 == l2 => {
                return if p1 == p2 { a } else { SddPtr::PtrFalse };
            }
            _ => (),
        }
        if a == b {
            return a;
        }

        let av = self.vtree_index(a);
        let bv = self.vtree_index(b);
        if av == bv {
            self.and_cartesian(a, b, av)
        } else if self.vtree.varsubset(av, bv) {
            self.and_descend(b, a)
        } else if self.vtree.varsubset(bv, av) {
            self.and_descend(a, b)
        } else {
            self.and_indep(a, b)
        }
    }

    /// Disjoin via De Morgan.
    pub fn disjoin(&mut self, a: SddPtr, b: SddPtr) -> SddPtr {
        let na = self.neg(a);
        let nb = self.neg(b);
        let r = self.conjoin(na, nb);
        self.neg(r)
    }

    /// the Ord-sorted operand pair, so cached applications commute
    fn ordered_pair(a: SddPtr, b: SddPtr) -> (SddPtr, SddPtr) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    fn cache_get(&mut self, v: VTreeIndex, key: (SddPtr, SddPtr)) -> Option<SddPtr> {
        let hit = self.apply_caches[v.value()].get(&key).copied();
        if hit.is_some() {
            self.stats.app_cache_hits += 1;
        }
        hit
    }

    fn cache_insert(&mut self, v: VTreeIndex, key: (SddPtr, SddPtr), r: SddPtr) {
        self.apply_caches[v.value()].insert(key, r);
    }

    fn decision_elements(&self, p: SddPtr) -> Vec<SddElement> {
        match p {
            SddPtr::Node(id) => self.node(id).elements().to_vec(),
            _ => panic!("expected a decision node, got {:?}", p),
        }
    }

    /// Conjoin two decisions normalized for the same vtree node. A cheap pass
    /// resolves equal and negated prime pairs without recursive prime
    /// conjunctions; the expensive pass handles the remaining cartesian
    /// product with entailment early-exits.
    fn and_cartesian(&mut self, a: SddPtr, b: SddPtr, v: VTreeIndex) -> SddPtr {
        if self.neg(a) == b {
            return SddPtr::PtrFalse;
        }
        let key = Self::ordered_pair(a, b);
        if let Some(r) = self.cache_get(v, key) {
            return r;
        }

        let e1 = self.decision_elements(a);
        let e2 = self.decision_elements(b);
        let mut used1 = vec![false; e1.len()];
        let mut used2 = vec![false; e2.len()];
        let mut out: Vec<SddElement> = Vec::new();

        // cheap pass
        for i in 0..e1.len() {
            for j in 0..e2.len() {
                if used1[i] || used2[j] {
                    continue;
                }
                if e1[i].prime() == e2[j].prime() {
                    let s = self.conjoin(e1[i].sub(), e2[j].sub());
                    out.push(SddElement::new(e1[i].prime(), s));
                    used1[i] = true;
                    used2[j] = true;
                } else if self.neg(e1[i].prime()) == e2[j].prime() {
                    // p1 = ¬p2: every other prime of e1 entails p2 and
                    // vice versa
                    for k in 0..e1.len() {
                        if k != i && !used1[k] {
                            let s = self.conjoin(e2[j].sub(), e1[k].sub());
                            out.push(SddElement::new(e1[k].prime(), s));
                        }
                    }
                    for l in 0..e2.len() {
                        if l != j && !used2[l] {
                            let s = self.conjoin(e1[i].sub(), e2[l].sub());
                            out.push(SddElement::new(e2[l].prime(), s));
                        }
                    }
                    used1[i] = true;
                    used2[j] = true;
                }
            }
        }

        // expensive pass over the remaining pairs
        'outer: for i in 0..e1.len() {
            if used1[i] {
                continue;
            }
            for j in 0..e2.len() {
                if used2[j] {
                    continue;
                }
                let p = self.conjoin(e1[i].prime(), e2[j].prime());
                if p == SddPtr::PtrFalse {
                    continue;
                }
                let s = self.conjoin(e1[i].sub(), e2[j].sub());
                out.push(SddElement::new(p, s));
                // p2 entails p1: p2 is inconsistent with every other prime
                // of e1
                if p == e2[j].prime() {
                    used2[j] = true;
                }
                // p1 entails p2: the remaining primes of e2 conjoin with p1
                // to ⊥
                if p == e1[i].prime() {
                    used1[i] = true;
                    continue 'outer;
                }
            }
        }

        let r = self.canonicalize(out, v);
        self.cache_insert(v, key, r);
        r
    }

    /// Conjoin where `d`'s vtree lies strictly inside `n`'s.
    fn and_descend(&mut self, n: SddPtr, d: SddPtr) -> SddPtr {
        let nv = self.vtree_index(n);
        let dv = self.vtree_index(d);
        let key = Self::ordered_pair(n, d);
        if let Some(r) = self.cache_get(nv, key) {
            return r;
        }
        let r = if self.vtree.varsubset_left(dv, nv) {
            self.and_prime_desc(n, d)
        } else {
            debug_assert!(self.vtree.varsubset_right(dv, nv));
            self.and_sub_desc(n, d)
        };
        self.cache_insert(nv, key, r);
        r
    }

    /// `d` respects the prime side of `n`'s vtree node.
    fn and_prime_desc(&mut self, n: SddPtr, d: SddPtr) -> SddPtr {
        let nv = self.vtree_index(n);
        let elems = self.decision_elements(n);
        let neg_d = self.neg(d);
        let mut out: Vec<SddElement> = Vec::new();

        if let Some(e) = elems.iter().find(|e| e.prime() == d) {
            out.push(SddElement::new(d, e.sub()));
            out.push(SddElement::new(neg_d, SddPtr::PtrFalse));
        } else if elems.iter().any(|e| e.prime() == neg_d) {
            // the remaining primes all entail d
            for e in &elems {
                if e.prime() == neg_d {
                    continue;
                }
                out.push(*e);
            }
            out.push(SddElement::new(neg_d, SddPtr::PtrFalse));
        } else {
            for e in &elems {
                let p = self.conjoin(e.prime(), d);
                if p == SddPtr::PtrFalse {
                    continue;
                }
                let entails = p == d;
                out.push(SddElement::new(p, e.sub()));
                if entails {
                    // d entails this prime: every remaining conjunction is ⊥
                    break;
                }
            }
            out.push(SddElement::new(neg_d, SddPtr::PtrFalse));
        }
        self.canonicalize(out, nv)
    }

    /// `d` respects the sub side of `n`'s vtree node.
    fn and_sub_desc(&mut self, n: SddPtr, d: SddPtr) -> SddPtr {
        let nv = self.vtree_index(n);
        let elems = self.decision_elements(n);
        let mut out = Vec::with_capacity(elems.len());
        for e in &elems {
            let s = self.conjoin(e.sub(), d);
            out.push(SddElement::new(e.prime(), s));
        }
        self.canonicalize(out, nv)
    }

    /// Conjoin operands over independent vtrees: the result is a two-element
    /// decision at their LCA with the left-side operand as prime.
    fn and_indep(&mut self, a: SddPtr, b: SddPtr) -> SddPtr {
        let av = self.vtree_index(a);
        let bv = self.vtree_index(b);
        let lca = self.vtree.lca(av, bv);
        let (prime, sub) = if self.vtree.varsubset_left(av, lca) {
            (a, b)
        } else {
            debug_assert!(self.vtree.varsubset_left(bv, lca));
            (b, a)
        };
        let neg_p = self.neg(prime);
        let out = vec![
            SddElement::new(prime, sub),
            SddElement::new(neg_p, SddPtr::PtrFalse),
        ];
        self.canonicalize(out, lca)
    }

    /// Compress an XY-partition in place: merge elements sharing a sub by
    /// disjoining their primes.
    fn compress(&mut self, node: &mut Vec<SddElement>) {
        let mut i = 0;
        while i < node.len() {
            let mut j = i + 1;
            while j < node.len() {
                if node[i].sub() == node[j].sub() {
                    let p = self.disjoin(node[i].prime(), node[j].prime());
                    node[i] = SddElement::new(p, node[i].sub());
                    node.swap_remove(j);
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
    }

    /// Trim the two degenerate shapes: `{(⊤, α)}` and `{(α, ⊤), (¬α, ⊥)}`
    /// both collapse to α.
    fn trim(&mut self, node: &[SddElement]) -> Option<SddPtr> {
        match node {
            [e] if e.prime().is_true() => Some(e.sub()),
            [e] => panic!(
                "canonicality violation: primes fail to partition ⊤ in {:?}",
                e
            ),
            [e1, e2] => {
                if e1.sub().is_true() && e2.sub().is_false() && self.neg(e1.prime()) == e2.prime()
                {
                    return Some(e1.prime());
                }
                if e1.sub().is_false() && e2.sub().is_true() && self.neg(e2.prime()) == e1.prime()
                {
                    return Some(e2.prime());
                }
                None
            }
            _ => None,
        }
    }

    /// Compress, trim, and intern an XY-partition at the given vtree node.
    fn canonicalize(&mut self, mut node: Vec<SddElement>, v: VTreeIndex) -> SddPtr {
        node.retain(|e| !e.prime().is_false());
        if node.is_empty() {
            panic!("canonicality violation: empty XY-partition at vtree node {v:?}");
        }
        if let Some(r) = self.trim(&node) {
            return r;
        }
        self.compress(&mut node);
        if let Some(r) = self.trim(&node) {
            return r;
        }
        self.unique_or(node, v)
    }

    /// Look up the canonical decision node for a normalized partition,
    /// allocating on a miss. Elements are sorted by the pointer order so that
    /// the table key is deterministic.
    fn unique_or(&mut self, mut node: Vec<SddElement>, v: VTreeIndex) -> SddPtr {
        node.sort_unstable();
        debug_assert!(node.len() >= 2);
        if let Some(&id) = self.unique_tables[v.value()].get(&node) {
            return SddPtr::Node(id);
        }
        let id = SddId(self.nodes.len());
        self.nodes.push(SddOr::new(v, node.clone()));
        self.unique_tables[v.value()].insert(node, id);
        self.stats.num_nodes_allocated += 1;
        SddPtr::Node(id)
    }

    /// number of decision nodes reachable from `p`
    pub fn num_nodes(&self, p: SddPtr) -> usize {
        fn count(mgr: &SddManager, p: SddPtr, seen: &mut FxHashSet<SddId>) {
            if let SddPtr::Node(id) = p {
                if !seen.insert(id) {
                    return;
                }
                for e in mgr.node(id).elements() {
                    count(mgr, e.prime(), seen);
                    count(mgr, e.sub(), seen);
                }
            }
        }
        let mut seen = FxHashSet::default();
        count(self, p, &mut seen);
        seen.len()
    }

    /// true if no reachable decision has two elements sharing a sub
    pub fn is_compressed(&self, p: SddPtr) -> bool {
        fn go(mgr: &SddManager, p: SddPtr, seen: &mut FxHashSet<SddId>) -> bool {
            match p {
                SddPtr::Node(id) => {
                    if !seen.insert(id) {
                        return true;
                    }
                    let mut subs = FxHashSet::default();
                    for e in mgr.node(id).elements() {
                        if !subs.insert(e.sub()) {
                            return false;
                        }
                    }
                    mgr.node(id)
                        .elements()
                        .iter()
                        .all(|e| go(mgr, e.prime(), seen) && go(mgr, e.sub(), seen))
                }
                _ => true,
            }
        }
        go(self, p, &mut FxHashSet::default())
    }

    /// true if no reachable decision has a trimmable shape
    pub fn is_trimmed(&self, p: SddPtr) -> bool {
        fn go(mgr: &SddManager, p: SddPtr, seen: &mut FxHashSet<SddId>) -> bool {
            match p {
                SddPtr::Node(id) => {
                    if !seen.insert(id) {
                        return true;
                    }
                    let elems = mgr.node(id).elements();
                    if elems.len() == 1 && elems[0].prime().is_true() {
                        return false;
                    }
                    if elems.len() == 2 {
                        let consts = |a: &SddElement, b: &SddElement| {
                            a.sub().is_true() && b.sub().is_false()
                        };
                        if consts(&elems[0], &elems[1]) || consts(&elems[1], &elems[0]) {
                            return false;
                        }
                    }
                    elems
                        .iter()
                        .all(|e| go(mgr, e.prime(), seen) && go(mgr, e.sub(), seen))
                }
                _ => true,
            }
        }
        go(self, p, &mut FxHashSet::default())
    }

    pub fn is_canonical(&self, p: SddPtr) -> bool {
        self.is_trimmed(p) && self.is_compressed(p)
    }

    /// Extract the SDD into a logical circuit: each decision becomes an Or of
    /// two-child Ands over its elements.
    pub fn extract(&self, p: SddPtr, mgr: &mut CircuitManager) -> CircuitPtr {
        fn go(
            sdd: &SddManager,
            p: SddPtr,
            mgr: &mut CircuitManager,
            memo: &mut FxHashMap<SddId, CircuitPtr>,
        ) -> CircuitPtr {
            match p {
                SddPtr::PtrTrue => mgr.constant(true),
                SddPtr::PtrFalse => mgr.constant(false),
                SddPtr::Var(l, pol) => mgr.literal(Literal::new(l, pol)),
                SddPtr::Node(id) => {
                    if let Some(&c) = memo.get(&id) {
                        return c;
                    }
                    let elems = sdd.node(id).elements().to_vec();
                    let mut ands = Vec::with_capacity(elems.len());
                    for e in &elems {
                        let pe = go(sdd, e.prime(), mgr, memo);
                        let se = go(sdd, e.sub(), mgr, memo);
                        ands.push(mgr.and(vec![pe, se]));
                    }
                    let c = mgr.or(ands);
                    memo.insert(id, c);
                    c
                }
            }
        }
        go(self, p, mgr, &mut FxHashMap::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: u64) -> Vec<VarLabel> {
        (1..=n).map(VarLabel::new).collect()
    }

    fn manager(n: u64, splits: usize) -> SddManager {
        SddManager::new(VTree::even_split(&labels(n), splits))
    }

    #[test]
    fn conjoin_laws() {
        let mut man = manager(4, 2);
        let a = man.var(VarLabel::new(1), true);
        let d = man.var(VarLabel::new(4), true);
        let f = man.conjoin(a, d);
        assert_eq!(man.conjoin(f, f), f);
        assert_eq!(man.conjoin(f, man.true_ptr()), f);
        assert_eq!(man.conjoin(f, man.false_ptr()), SddPtr::PtrFalse);
        let nf = man.neg(f);
        assert_eq!(man.conjoin(f, nf), SddPtr::PtrFalse);
    }

    #[test]
    fn independent_conjoin_shape() {
        let mut man = manager(4, 2);
        let a = man.var(VarLabel::new(1), true);
        let b = man.var(VarLabel::new(3), true);
        let f = man.conjoin(a, b);
        // {(a, b), (¬a, ⊥)} at the LCA
        let elems = man.elements(f).to_vec();
        assert_eq!(elems.len(), 2);
        assert!(elems
            .iter()
            .any(|e| e.prime() == a && e.sub() == b));
        assert!(elems
            .iter()
            .any(|e| e.prime() == man.var(VarLabel::new(1), false)
                && e.sub() == SddPtr::PtrFalse));
        assert_eq!(
            man.vtree_index(f),
            man.vtree_manager().root_index()
        );
    }

    #[test]
    fn commutative_by_pointer() {
        let mut man = manager(4, 2);
        let a = man.var(VarLabel::new(1), true);
        let b = man.var(VarLabel::new(3), false);
        assert_eq!(man.conjoin(a, b), man.conjoin(b, a));
        assert_eq!(man.disjoin(a, b), man.disjoin(b, a));
    }

    #[test]
    fn demorgan() {
        let mut man = manager(4, 1);
        let x = man.var(VarLabel::new(1), true);
        let y = man.var(VarLabel::new(4), true);
        let d = man.disjoin(x, y);
        let res = man.neg(d);
        let nx = man.neg(x);
        let ny = man.neg(y);
        let expected = man.conjoin(nx, ny);
        assert_eq!(res, expected);
    }

    #[test]
    fn absorption_canonicity() {
        // (a ∨ b) ∧ a == a
        let mut man = manager(4, 2);
        let a = man.var(VarLabel::new(1), true);
        let b = man.var(VarLabel::new(3), true);
        let or = man.disjoin(a, b);
        let r = man.conjoin(or, a);
        assert_eq!(r, a);
    }

    #[test]
    fn double_negation() {
        let mut man = manager(4, 2);
        let a = man.var(VarLabel::new(1), true);
        let b = man.var(VarLabel::new(4), true);
        let f = man.conjoin(a, b);
        let nf = man.neg(f);
        assert_eq!(man.neg(nf), f);
    }

    #[test]
    fn invariants_hold() {
        let mut man = manager(6, 2);
        let a = man.var(VarLabel::new(1), true);
        let b = man.var(VarLabel::new(3), true);
        let c = man.var(VarLabel::new(5), false);
        let ab = man.disjoin(a, b);
        let f = man.conjoin(ab, c);
        assert!(man.is_canonical(f));
        let g = man.neg(f);
        assert!(man.is_canonical(g));
    }
}
