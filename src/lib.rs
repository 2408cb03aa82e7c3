//! # rslc
//!
//! A toolkit for tractable Boolean circuits built around two subsystems:
//!
//! * an immutable, hash-consed logical-circuit DAG
//!   ([`repr::CircuitManager`]) with memoized bottom-up traversal, structural
//!   queries (decomposability, smoothness, scopes, exact counting), and
//!   rewrites (constant propagation, forgetting, smoothing) that preserve
//!   structural invariants while sharing unchanged sub-DAGs; and
//! * a canonical Sentential Decision Diagram apply engine
//!   ([`builder::SddManager`]) indexed by a variable-partition tree
//!   ([`repr::VTreeManager`]), with per-vtree-node unique tables and apply
//!   caches.
//!
//! The [`serialize`] module speaks the textual SDD/PSDD/Logistic Circuit,
//! DIMACS, and vtree file formats and renders DOT.

pub mod builder;
pub mod repr;
pub mod serialize;
pub mod util;
