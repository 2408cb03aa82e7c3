//! Parsers and serializers for the textual circuit formats. Parsers emit an
//! ordered sequence of [`CircuitFormatLine`] records; the compile step walks
//! that sequence resolving ids to already-compiled nodes, and serialization
//! reverses the mapping with ids assigned children-before-parents.

pub mod circuit_format;
pub mod cnf;
pub mod dot;
pub mod vtree_io;

pub use circuit_format::{
    compile_lines, parse_logistic_circuit, parse_psdd, parse_sdd, sdd_lines, write_sdd,
};
pub use cnf::{compile_cnf, compile_dnf, parse_cnf, parse_dnf};
pub use dot::{circuit_to_dot, vtree_to_dot};
pub use vtree_io::{parse_vtree, write_vtree};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One record of a textual circuit file. Records appear in source order,
/// children before parents; ids are preserved exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CircuitFormatLine {
    /// `sdd <count>`, `psdd <count>`, or the `Logistic Circuit` banner
    Header {
        format: String,
        count: Option<usize>,
    },
    /// `c <text>`
    Comment(String),
    /// `T <id>`
    True { id: usize },
    /// `F <id>`
    False { id: usize },
    /// `L <id> <vtree-id> <lit>`
    Literal { id: usize, vtree: usize, literal: i64 },
    /// PSDD weighted true leaf: `T <id> <vtree-id> <var> <weight>`
    WeightedTrue {
        id: usize,
        vtree: usize,
        var: u64,
        weight: f64,
    },
    /// Logistic Circuit weighted literal leaf: `T`/`F <id> <vtree-id> <var> <weights…>`
    WeightedLiteral {
        id: usize,
        vtree: usize,
        var: u64,
        polarity: bool,
        weights: Vec<f64>,
    },
    /// `D <id> <vtree-id> <n> <elements…>`
    Decision {
        id: usize,
        vtree: usize,
        elements: Vec<ElementSpec>,
    },
    /// Logistic Circuit bias line: `B <weights…>`
    Bias { weights: Vec<f64> },
}

/// One `(prime, sub)` pair of a decision record, with any per-element weights
/// the format carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub prime: usize,
    pub sub: usize,
    pub weights: Vec<f64>,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: unrecognized line prefix `{token}`")]
    UnrecognizedLine { line: usize, token: String },
    #[error("line {line}: malformed token `{token}`")]
    MalformedToken { line: usize, token: String },
    #[error("line {line}: wrong number of fields for `{kind}` record")]
    WrongArity { line: usize, kind: String },
    #[error("line {line}: literal 0 is reserved")]
    ZeroLiteral { line: usize },
    #[error("reference to undefined node id {0}")]
    UnknownId(usize),
    #[error("node id {0} defined twice")]
    DuplicateId(usize),
    #[error("input defines no nodes")]
    EmptyCircuit,
    #[error("vtree file does not reduce to a single root")]
    MultipleRoots,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("circuit is not SDD-structured: {0}")]
    Unsupported(String),
}
