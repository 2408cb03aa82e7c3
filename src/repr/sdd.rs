//! Internal representation of a trimmed and compressed SDD.

use crate::repr::var_label::{Literal, VarLabel};
use crate::repr::vtree::VTreeIndex;

/// An index into the [`SddManager`](crate::builder::SddManager)'s node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SddId(pub(crate) usize);

impl SddId {
    pub fn value(&self) -> usize {
        self.0
    }
}

/// A non-owning handle to a canonical SDD. The manager guarantees semantic
/// equivalence ⇔ handle equality for nodes respecting the same vtree node,
/// so `Eq` on handles is semantic equality. The derived `Ord` is a total
/// deterministic pointer order, used to symmetrize apply-cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SddPtr {
    PtrTrue,
    PtrFalse,
    Var(VarLabel, bool),
    Node(SddId),
}

impl SddPtr {
    pub fn true_ptr() -> SddPtr {
        SddPtr::PtrTrue
    }

    pub fn false_ptr() -> SddPtr {
        SddPtr::PtrFalse
    }

    pub fn var(lbl: VarLabel, polarity: bool) -> SddPtr {
        SddPtr::Var(lbl, polarity)
    }

    pub fn is_true(&self) -> bool {
        matches!(self, SddPtr::PtrTrue)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, SddPtr::PtrFalse)
    }

    pub fn is_const(&self) -> bool {
        matches!(self, SddPtr::PtrTrue | SddPtr::PtrFalse)
    }

    pub fn is_var(&self) -> bool {
        matches!(self, SddPtr::Var(_, _))
    }

    pub fn is_node(&self) -> bool {
        matches!(self, SddPtr::Node(_))
    }

    /// the literal of a variable pointer; panics otherwise
    pub fn get_var(&self) -> Literal {
        match self {
            SddPtr::Var(v, b) => Literal::new(*v, *b),
            _ => panic!("called get_var on non-var"),
        }
    }
}

/// One element of an XY-partition: a `(prime, sub)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SddElement {
    prime: SddPtr,
    sub: SddPtr,
}

impl SddElement {
    pub fn new(prime: SddPtr, sub: SddPtr) -> SddElement {
        SddElement { prime, sub }
    }

    pub fn prime(&self) -> SddPtr {
        self.prime
    }

    pub fn sub(&self) -> SddPtr {
        self.sub
    }
}

/// A decision node: an XY-partition normalized for one inner vtree node.
/// Primes respect the vtree node's left subtree, subs its right subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SddOr {
    vtree: VTreeIndex,
    elements: Vec<SddElement>,
}

impl SddOr {
    pub fn new(vtree: VTreeIndex, elements: Vec<SddElement>) -> SddOr {
        SddOr { vtree, elements }
    }

    pub fn vtree(&self) -> VTreeIndex {
        self.vtree
    }

    pub fn elements(&self) -> &[SddElement] {
        &self.elements
    }
}
