//! Variable labels, literals, and sets of variables used throughout the library

use bit_set::BitSet;
use quickcheck::{Arbitrary, Gen};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A label for a distinct variable. Labels are 1-based to match the textual
/// circuit formats; 0 is reserved.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Copy, PartialOrd, Ord)]
pub struct VarLabel(u64);

impl VarLabel {
    #[inline]
    pub fn new(v: u64) -> VarLabel {
        debug_assert!(v > 0, "variable labels are 1-based; 0 is reserved");
        VarLabel(v)
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn new_usize(v: usize) -> VarLabel {
        VarLabel::new(v as u64)
    }

    pub fn value_usize(&self) -> usize {
        self.0 as usize
    }
}

impl Display for VarLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Literal, a variable label together with a polarity
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash, Copy, PartialOrd, Ord)]
pub struct Literal {
    label: VarLabel,
    polarity: bool,
}

impl Literal {
    /// create a new Literal, a logical variable initialized with a polarity
    /// ```
    /// use rslc::repr::{Literal, VarLabel};
    ///
    /// let lit = Literal::new(VarLabel::new(3), true);
    /// assert_eq!(lit.label(), VarLabel::new(3));
    /// assert!(lit.polarity());
    /// ```
    pub fn new(label: VarLabel, polarity: bool) -> Literal {
        Literal { label, polarity }
    }

    pub fn label(&self) -> VarLabel {
        self.label
    }

    pub fn polarity(&self) -> bool {
        self.polarity
    }

    /// build a literal from its signed integer encoding: the sign is the
    /// polarity and the absolute value is the variable. Returns `None` for 0,
    /// which is reserved.
    /// ```
    /// use rslc::repr::{Literal, VarLabel};
    ///
    /// let lit = Literal::from_dimacs(-4).unwrap();
    /// assert_eq!(lit.label(), VarLabel::new(4));
    /// assert!(!lit.polarity());
    /// assert_eq!(lit.to_dimacs(), -4);
    /// assert!(Literal::from_dimacs(0).is_none());
    /// ```
    pub fn from_dimacs(v: i64) -> Option<Literal> {
        if v == 0 {
            return None;
        }
        Some(Literal::new(VarLabel::new(v.unsigned_abs()), v > 0))
    }

    /// the signed integer encoding of this literal
    pub fn to_dimacs(&self) -> i64 {
        let v = self.label.value() as i64;
        if self.polarity {
            v
        } else {
            -v
        }
    }

    pub fn implies_true(&self, other: &Literal) -> bool {
        self.label == other.label && self.polarity == other.polarity
    }

    pub fn implies_false(&self, other: &Literal) -> bool {
        self.label == other.label && self.polarity != other.polarity
    }

    pub fn negated(&self) -> Literal {
        Literal::new(self.label, !self.polarity)
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Literal")
            .field("label", &self.label)
            .field("polarity", &self.polarity)
            .finish()
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dimacs())
    }
}

impl Arbitrary for Literal {
    fn arbitrary(g: &mut Gen) -> Literal {
        let lbl = u64::arbitrary(g) % 16 + 1;
        Literal::new(VarLabel::new(lbl), bool::arbitrary(g))
    }
}

/// A set of variables
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarSet {
    b: BitSet,
}

impl VarSet {
    pub fn new() -> VarSet {
        VarSet { b: BitSet::new() }
    }

    pub fn singleton(v: VarLabel) -> VarSet {
        let mut s = VarSet::new();
        s.insert(v);
        s
    }

    pub fn insert(&mut self, v: VarLabel) {
        self.b.insert(v.value_usize());
    }

    pub fn remove(&mut self, v: VarLabel) {
        self.b.remove(v.value_usize());
    }

    pub fn contains(&self, v: VarLabel) -> bool {
        self.b.contains(v.value_usize())
    }

    /// unions self with other in-place
    pub fn union_with(&mut self, other: &VarSet) {
        self.b.union_with(&other.b);
    }

    /// unions self with other, returning a new VarSet
    /// ```
    /// use rslc::repr::{VarLabel, VarSet};
    ///
    /// let s1 = VarSet::singleton(VarLabel::new(1));
    /// let s2 = VarSet::singleton(VarLabel::new(2));
    /// let u = s1.union(&s2);
    /// assert_eq!(u.len(), 2);
    /// ```
    pub fn union(&self, other: &VarSet) -> VarSet {
        VarSet {
            b: self.b.union(&other.b).collect(),
        }
    }

    /// returns a new VarSet = self \ other
    pub fn minus(&self, other: &VarSet) -> VarSet {
        VarSet {
            b: self.b.difference(&other.b).collect(),
        }
    }

    /// iterate over the variables in self \ other, in increasing order
    pub fn difference<'a>(&'a self, other: &'a VarSet) -> impl Iterator<Item = VarLabel> + 'a {
        self.b.difference(&other.b).map(VarLabel::new_usize)
    }

    pub fn is_disjoint(&self, other: &VarSet) -> bool {
        self.b.is_disjoint(&other.b)
    }

    pub fn is_subset(&self, other: &VarSet) -> bool {
        self.b.is_subset(&other.b)
    }

    /// iterate over the variables, in increasing order
    pub fn iter(&self) -> impl Iterator<Item = VarLabel> + '_ {
        self.b.iter().map(VarLabel::new_usize)
    }

    pub fn is_empty(&self) -> bool {
        self.b.is_empty()
    }

    pub fn len(&self) -> usize {
        self.b.len()
    }
}

impl Default for VarSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for VarSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "{:?}",
            self.b.iter().collect::<Vec<usize>>()
        ))
    }
}

#[test]
fn test_varset() {
    let mut v1 = VarSet::new();
    v1.insert(VarLabel::new(1));
    v1.insert(VarLabel::new(2));
    let v2 = VarSet::singleton(VarLabel::new(1));
    let v3 = VarSet::singleton(VarLabel::new(2));
    // assert {1,2} \ {1} = {2}
    assert_eq!(v1.minus(&v2), v3);
    assert!(v2.is_disjoint(&v3));
    assert!(v2.is_subset(&v1));
    assert!(!v1.is_subset(&v2));
}

#[test]
fn test_dimacs_roundtrip() {
    for v in [-5i64, -1, 1, 7] {
        assert_eq!(Literal::from_dimacs(v).unwrap().to_dimacs(), v);
    }
}
