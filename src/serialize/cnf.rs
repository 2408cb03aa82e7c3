//! DIMACS-like CNF and DNF parsing and compilation into the logical DAG.

use crate::repr::circuit::{CircuitManager, CircuitPtr};
use crate::repr::var_label::Literal;
use crate::serialize::ParseError;

fn parse_clauses(src: &str) -> Result<Vec<Vec<Literal>>, ParseError> {
    let mut clauses = Vec::new();
    let mut current: Vec<Literal> = Vec::new();
    for (lineno, raw) in src.lines().enumerate() {
        let line = lineno + 1;
        let mut toks = raw.split_whitespace().peekable();
        match toks.peek() {
            None => continue,
            Some(&"c") | Some(&"p") => continue,
            Some(_) => {}
        }
        for tok in toks {
            let v: i64 = tok.parse().map_err(|_| ParseError::UnrecognizedLine {
                line,
                token: tok.to_string(),
            })?;
            match Literal::from_dimacs(v) {
                Some(lit) => current.push(lit),
                // 0 terminates the clause
                None => clauses.push(std::mem::take(&mut current)),
            }
        }
    }
    if !current.is_empty() {
        clauses.push(current);
    }
    Ok(clauses)
}

/// Parse a DIMACS CNF file into its clauses: `c` comments, a `p cnf` header,
/// and whitespace-separated signed literals with a `0` terminator per clause.
pub fn parse_cnf(src: &str) -> Result<Vec<Vec<Literal>>, ParseError> {
    parse_clauses(src)
}

/// Parse a DIMACS-like DNF file into its terms.
pub fn parse_dnf(src: &str) -> Result<Vec<Vec<Literal>>, ParseError> {
    parse_clauses(src)
}

/// Compile CNF clauses into an And of Or-clauses.
pub fn compile_cnf(mgr: &mut CircuitManager, clauses: &[Vec<Literal>]) -> CircuitPtr {
    let cs: Vec<CircuitPtr> = clauses
        .iter()
        .map(|clause| {
            let lits: Vec<CircuitPtr> = clause.iter().map(|l| mgr.literal(*l)).collect();
            mgr.disjoin(lits)
        })
        .collect();
    mgr.conjoin(cs)
}

/// Compile DNF terms into an Or of And-terms.
pub fn compile_dnf(mgr: &mut CircuitManager, terms: &[Vec<Literal>]) -> CircuitPtr {
    let ts: Vec<CircuitPtr> = terms
        .iter()
        .map(|term| {
            let lits: Vec<CircuitPtr> = term.iter().map(|l| mgr.literal(*l)).collect();
            mgr.conjoin(lits)
        })
        .collect();
    mgr.disjoin(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::var_label::VarLabel;

    static SMALL_CNF: &str = "c two clauses over three variables
p cnf 3 2
1 2 0
-2 3 0
";

    #[test]
    fn parse_small() {
        let clauses = parse_cnf(SMALL_CNF).unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].len(), 2);
        assert_eq!(clauses[1][0], Literal::new(VarLabel::new(2), false));
    }

    #[test]
    fn clause_spanning_lines() {
        let clauses = parse_cnf("p cnf 3 1\n1 2\n3 0\n").unwrap();
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].len(), 3);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_cnf("p cnf 1 1\nx y 0\n").is_err());
    }

    #[test]
    fn cnf_model_count() {
        let clauses = parse_cnf(SMALL_CNF).unwrap();
        let mut mgr = CircuitManager::new();
        let root = compile_cnf(&mut mgr, &clauses);
        // brute force over all 8 assignments
        let mut count = 0u32;
        for bits in 0..8u32 {
            let assignment = std::collections::HashMap::from([
                (VarLabel::new(1), bits & 1 != 0),
                (VarLabel::new(2), bits & 2 != 0),
                (VarLabel::new(3), bits & 4 != 0),
            ]);
            if mgr.evaluate_assignment(root, &assignment) {
                count += 1;
            }
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn dnf_dual() {
        let terms = parse_dnf("p dnf 2 2\n1 2 0\n-1 -2 0\n").unwrap();
        let mut mgr = CircuitManager::new();
        let root = compile_dnf(&mut mgr, &terms);
        let all_true = std::collections::HashMap::from([
            (VarLabel::new(1), true),
            (VarLabel::new(2), true),
        ]);
        let mixed = std::collections::HashMap::from([
            (VarLabel::new(1), true),
            (VarLabel::new(2), false),
        ]);
        assert!(mgr.evaluate_assignment(root, &all_true));
        assert!(!mgr.evaluate_assignment(root, &mixed));
    }
}
