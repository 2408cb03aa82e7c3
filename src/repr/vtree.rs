//! The vtree datastructure used by SDDs for decomposition: a binary tree
//! over variables with precomputed scopes, subset queries, and LCA.

use crate::repr::var_label::{VarLabel, VarSet};
use crate::util::btree::BTree;
use quickcheck::{Arbitrary, Gen};
use rand::{rngs::SmallRng, seq::SliceRandom, SeedableRng};
use rustc_hash::FxHashMap;
use std::collections::HashSet;

pub type VTree = BTree<(), VarLabel>;

impl VTree {
    pub fn new_node(l: Box<VTree>, r: Box<VTree>) -> VTree {
        VTree::Node((), l, r)
    }

    pub fn new_leaf(v: VarLabel) -> VTree {
        VTree::Leaf(v)
    }

    /// true if the vtree mentions some variable twice
    fn check_redundant_vars(&self, s: &mut HashSet<u64>) -> bool {
        match self {
            BTree::Leaf(v) => {
                if s.contains(&v.value()) {
                    return true;
                }
                s.insert(v.value());
                false
            }
            BTree::Node((), l, r) => l.check_redundant_vars(s) || r.check_redundant_vars(s),
        }
    }

    /// produces a left-linear vtree with the variable order given by `order`
    pub fn left_linear(order: &[VarLabel]) -> VTree {
        match order {
            [x] => BTree::Leaf(*x),
            [rest @ .., last] => {
                let l_tree = Self::left_linear(rest);
                let r_tree = BTree::Leaf(*last);
                BTree::Node((), Box::new(l_tree), Box::new(r_tree))
            }
            [] => panic!("invalid left_linear on empty list"),
        }
    }

    /// produces a right-linear vtree with the variable order given by `order`
    /// ```
    /// use rslc::repr::{VarLabel, VTree};
    ///
    /// let v: Vec<VarLabel> = (1..=3).map(VarLabel::new).collect();
    /// let t = VTree::right_linear(&v);
    /// assert_eq!(t.count_leaves(), 3);
    /// ```
    pub fn right_linear(order: &[VarLabel]) -> VTree {
        match order {
            [x] => BTree::Leaf(*x),
            [cur, rest @ ..] => {
                let l_tree = BTree::Leaf(*cur);
                let r_tree = Self::right_linear(rest);
                BTree::Node((), Box::new(l_tree), Box::new(r_tree))
            }
            [] => panic!("invalid right_linear on empty list"),
        }
    }

    /// generate an even vtree by splitting a variable ordering in half
    /// `num_splits` times; then reverts to a right-linear vtree for the
    /// remainder
    pub fn even_split(order: &[VarLabel], num_splits: usize) -> VTree {
        if num_splits == 0 || order.len() < 2 {
            Self::right_linear(order)
        } else {
            let (l_s, r_s) = order.split_at(order.len() / 2);
            let l_tree = Self::even_split(l_s, num_splits - 1);
            let r_tree = Self::even_split(r_s, num_splits - 1);
            BTree::Node((), Box::new(l_tree), Box::new(r_tree))
        }
    }
}

impl Arbitrary for VTree {
    /// generate an arbitrary vtree on 16 variables
    fn arbitrary(g: &mut Gen) -> VTree {
        let mut rng = SmallRng::seed_from_u64(u64::arbitrary(g));
        let mut vars: Vec<VarLabel> = (1..=16).map(VarLabel::new).collect();

        vars.shuffle(&mut rng);

        fn rand_split(order: &[VarLabel], g: &mut Gen) -> VTree {
            match order.len() {
                0 => panic!("invalid label order passed; expects at least one VarLabel"),
                1 => VTree::new_leaf(order[0]),
                2 => VTree::new_node(
                    Box::new(VTree::new_leaf(order[0])),
                    Box::new(VTree::new_leaf(order[1])),
                ),
                len => {
                    // clamps so we're guaranteed at least one item in l_s, r_s
                    let split_index = (usize::arbitrary(g) % (len - 1)) + 1;
                    let (l_s, r_s) = order.split_at(split_index);
                    VTree::new_node(Box::new(rand_split(l_s, g)), Box::new(rand_split(r_s, g)))
                }
            }
        }

        rand_split(&vars[..], g)
    }
}

/// A vtree index uniquely identifies a node via an in-order left-first
/// traversal. For example, each node in a vtree is given the following
/// indexing structure:
/// ```text
///        3
///    1       5
///  0   2   4   6
/// ```
/// Every index in a node's subtree lies in a contiguous interval around it,
/// which makes subset tests and LCA walks index comparisons.
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct VTreeIndex(usize);

impl VTreeIndex {
    pub fn value(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct VTreeNodeData {
    left: Option<VTreeIndex>,
    right: Option<VTreeIndex>,
    leaf_var: Option<VarLabel>,
    variables: VarSet,
    var_count: usize,
    /// in-order index interval [first, last] covered by this subtree
    first: usize,
    last: usize,
}

/// Handles vtree-related operations: scopes, subset queries, and LCA
#[derive(Debug, Clone)]
pub struct VTreeManager {
    tree: VTree,
    nodes: Vec<VTreeNodeData>,
    root: VTreeIndex,
    var_to_leaf: FxHashMap<VarLabel, VTreeIndex>,
}

impl VTreeManager {
    pub fn new(tree: VTree) -> VTreeManager {
        debug_assert!(
            !tree.check_redundant_vars(&mut HashSet::new()),
            "vtree contains redundant variables: {:#?}",
            tree
        );
        let count = tree.count_nodes();
        let mut nodes: Vec<Option<VTreeNodeData>> = vec![None; count];
        let mut var_to_leaf = FxHashMap::default();
        let mut next = 0usize;
        let root = Self::layout(&tree, &mut next, &mut nodes, &mut var_to_leaf);
        VTreeManager {
            tree,
            nodes: nodes.into_iter().map(|n| n.unwrap()).collect(),
            root,
            var_to_leaf,
        }
    }

    fn layout(
        t: &VTree,
        next: &mut usize,
        nodes: &mut Vec<Option<VTreeNodeData>>,
        var_to_leaf: &mut FxHashMap<VarLabel, VTreeIndex>,
    ) -> VTreeIndex {
        match t {
            BTree::Leaf(v) => {
                let idx = *next;
                *next += 1;
                nodes[idx] = Some(VTreeNodeData {
                    left: None,
                    right: None,
                    leaf_var: Some(*v),
                    variables: VarSet::singleton(*v),
                    var_count: 1,
                    first: idx,
                    last: idx,
                });
                var_to_leaf.insert(*v, VTreeIndex(idx));
                VTreeIndex(idx)
            }
            BTree::Node((), l, r) => {
                let li = Self::layout(l, next, nodes, var_to_leaf);
                let idx = *next;
                *next += 1;
                let ri = Self::layout(r, next, nodes, var_to_leaf);
                let variables = nodes[li.0]
                    .as_ref()
                    .unwrap()
                    .variables
                    .union(&nodes[ri.0].as_ref().unwrap().variables);
                let first = nodes[li.0].as_ref().unwrap().first;
                let last = nodes[ri.0].as_ref().unwrap().last;
                let var_count = variables.len();
                nodes[idx] = Some(VTreeNodeData {
                    left: Some(li),
                    right: Some(ri),
                    leaf_var: None,
                    variables,
                    var_count,
                    first,
                    last,
                });
                VTreeIndex(idx)
            }
        }
    }

    pub fn vtree_root(&self) -> &VTree {
        &self.tree
    }

    pub fn root_index(&self) -> VTreeIndex {
        self.root
    }

    pub fn num_vtree_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_leaf(&self, idx: VTreeIndex) -> bool {
        self.nodes[idx.0].leaf_var.is_some()
    }

    /// the variable at a leaf; panics on inner nodes
    pub fn leaf_var(&self, idx: VTreeIndex) -> VarLabel {
        self.nodes[idx.0].leaf_var.expect("leaf_var on inner node")
    }

    pub fn left(&self, idx: VTreeIndex) -> Option<VTreeIndex> {
        self.nodes[idx.0].left
    }

    pub fn right(&self, idx: VTreeIndex) -> Option<VTreeIndex> {
        self.nodes[idx.0].right
    }

    /// the set of variables in the subtree rooted at `idx`
    pub fn variables(&self, idx: VTreeIndex) -> &VarSet {
        &self.nodes[idx.0].variables
    }

    pub fn var_count(&self, idx: VTreeIndex) -> usize {
        self.nodes[idx.0].var_count
    }

    /// true iff variables(a) ⊆ variables(b); by the in-order indexing this is
    /// interval containment
    pub fn varsubset(&self, a: VTreeIndex, b: VTreeIndex) -> bool {
        let (an, bn) = (&self.nodes[a.0], &self.nodes[b.0]);
        bn.first <= an.first && an.last <= bn.last
    }

    /// true iff variables(a) ⊆ variables(b.left)
    pub fn varsubset_left(&self, a: VTreeIndex, b: VTreeIndex) -> bool {
        match self.nodes[b.0].left {
            Some(l) => self.varsubset(a, l),
            None => false,
        }
    }

    /// true iff variables(a) ⊆ variables(b.right)
    pub fn varsubset_right(&self, a: VTreeIndex, b: VTreeIndex) -> bool {
        match self.nodes[b.0].right {
            Some(r) => self.varsubset(a, r),
            None => false,
        }
    }

    /// Computes the lowest common ancestor of `a` and `b` by walking from the
    /// root: in-order indices smaller than the current node lie in its left
    /// subtree, larger ones in its right subtree.
    pub fn lca(&self, a: VTreeIndex, b: VTreeIndex) -> VTreeIndex {
        let (lo, hi) = if a.0 <= b.0 { (a.0, b.0) } else { (b.0, a.0) };
        let mut cur = self.root;
        loop {
            if hi < cur.0 {
                cur = self.nodes[cur.0].left.expect("lca descended past a leaf");
            } else if lo > cur.0 {
                cur = self.nodes[cur.0].right.expect("lca descended past a leaf");
            } else {
                return cur;
            }
        }
    }

    /// the leaf index holding `lbl`; panics if the variable is not in the
    /// vtree
    pub fn var_index(&self, lbl: VarLabel) -> VTreeIndex {
        self.try_var_index(lbl)
            .unwrap_or_else(|| panic!("variable {} not in vtree", lbl))
    }

    pub fn try_var_index(&self, lbl: VarLabel) -> Option<VTreeIndex> {
        self.var_to_leaf.get(&lbl).copied()
    }

    pub fn num_vars(&self) -> usize {
        self.nodes[self.root.0].var_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(n: u64) -> Vec<VarLabel> {
        (1..=n).map(VarLabel::new).collect()
    }

    #[test]
    fn layout_indices_are_in_order() {
        //        3
        //    1       5
        //  0   2   4   6
        let v = vars(4);
        let t = VTree::even_split(&v, 2);
        let man = VTreeManager::new(t);
        assert_eq!(man.num_vtree_nodes(), 7);
        assert_eq!(man.root_index().value(), 3);
        assert_eq!(man.var_index(VarLabel::new(1)).value(), 0);
        assert_eq!(man.var_index(VarLabel::new(2)).value(), 2);
        assert_eq!(man.var_index(VarLabel::new(3)).value(), 4);
        assert_eq!(man.var_index(VarLabel::new(4)).value(), 6);
    }

    #[test]
    fn subset_and_lca() {
        let v = vars(4);
        let t = VTree::even_split(&v, 2);
        let man = VTreeManager::new(t);
        let l1 = man.var_index(VarLabel::new(1));
        let l2 = man.var_index(VarLabel::new(2));
        let l3 = man.var_index(VarLabel::new(3));
        let root = man.root_index();
        let left_inner = man.lca(l1, l2);
        assert_eq!(left_inner.value(), 1);
        assert_eq!(man.lca(l1, l3), root);
        assert!(man.varsubset(l1, left_inner));
        assert!(man.varsubset(left_inner, root));
        assert!(!man.varsubset(l3, left_inner));
        assert!(man.varsubset_left(l1, root));
        assert!(man.varsubset_right(l3, root));
        assert!(!man.varsubset_left(l3, root));
        assert_eq!(man.var_count(root), 4);
        assert_eq!(man.variables(left_inner).len(), 2);
    }

    #[test]
    fn right_linear_shape() {
        let v = vars(3);
        let man = VTreeManager::new(VTree::right_linear(&v));
        // in-order:  1
        //          0   3
        //             2  4
        assert_eq!(man.root_index().value(), 1);
        let l2 = man.var_index(VarLabel::new(2));
        let l3 = man.var_index(VarLabel::new(3));
        assert_eq!(man.lca(l2, l3).value(), 3);
        assert!(man.varsubset_right(l3, man.root_index()));
    }
}
