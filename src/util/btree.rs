/// A binary tree with leaves of type L and nodes of type N, represented with
/// child pointers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BTree<N, L>
where
    N: PartialEq + Eq + Clone,
    L: PartialEq + Eq + Clone,
{
    Leaf(L),
    Node(N, Box<BTree<N, L>>, Box<BTree<N, L>>),
}

impl<N, L> BTree<N, L>
where
    N: PartialEq + Eq + Clone,
    L: PartialEq + Eq + Clone,
{
    pub fn is_leaf(&self) -> bool {
        matches!(self, BTree::Leaf(_))
    }

    /// Attempt to extract the data from a leaf node; panics if not a leaf
    pub fn extract_leaf(&self) -> &L {
        match self {
            BTree::Leaf(v) => v,
            _ => panic!("extracting non-leaf"),
        }
    }

    /// number of nodes (inner and leaf) in the tree
    pub fn count_nodes(&self) -> usize {
        match self {
            BTree::Leaf(_) => 1,
            BTree::Node(_, l, r) => 1 + l.count_nodes() + r.count_nodes(),
        }
    }

    /// number of leaves in the tree
    pub fn count_leaves(&self) -> usize {
        match self {
            BTree::Leaf(_) => 1,
            BTree::Node(_, l, r) => l.count_leaves() + r.count_leaves(),
        }
    }

    pub fn contains_leaf<F>(&self, f: &F) -> bool
    where
        F: Fn(&L) -> bool,
    {
        match self {
            BTree::Leaf(v) => f(v),
            BTree::Node(_, l, r) => l.contains_leaf(f) || r.contains_leaf(f),
        }
    }
}

#[test]
fn test_counts() {
    use self::BTree::*;
    let t: BTree<(), i32> = Node(
        (),
        Box::new(Node((), Box::new(Leaf(1)), Box::new(Leaf(2)))),
        Box::new(Leaf(3)),
    );
    assert_eq!(t.count_nodes(), 5);
    assert_eq!(t.count_leaves(), 3);
    assert!(t.contains_leaf(&|v| *v == 2));
    assert!(!t.contains_leaf(&|v| *v == 4));
}
