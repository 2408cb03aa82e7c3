//! Core datastructures: variable labels, the logical-circuit DAG, vtrees,
//! and the SDD node representation.

pub mod circuit;
pub mod queries;
pub mod rewrites;
pub mod sdd;
pub mod var_label;
pub mod vtree;

pub use circuit::{CircuitManager, CircuitNode, CircuitPtr, GateAggregate, GateFold};
pub use queries::{ProbSignatures, SatProbParams};
pub use sdd::{SddElement, SddId, SddOr, SddPtr};
pub use var_label::{Literal, VarLabel, VarSet};
pub use vtree::{VTree, VTreeIndex, VTreeManager};
