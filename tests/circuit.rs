use std::collections::HashMap;

use num::BigInt;
use rslc::repr::{CircuitManager, CircuitPtr, Literal, VarLabel};
use rslc::serialize;

/// An SDD-structured circuit over four variables:
/// (1 ∧ 2 ∧ 3) ∨ (¬(1 ∧ 2) ∧ 4), with explicit constants as parsed from
/// disk. The decision primes partition ⊤, so the circuit is deterministic
/// and exact counting applies.
static FIXTURE: &str = "c fixture: (1 and 2 and 3) or (not(1 and 2) and 4)
sdd 11
F 0
T 1
L 2 0 1
L 3 0 -1
L 4 2 2
L 5 2 -2
L 6 4 3
L 7 6 4
D 8 1 2 2 4 3 0
D 9 1 2 2 5 3 1
D 10 3 2 8 6 9 7
";

fn parse_fixture(mgr: &mut CircuitManager) -> CircuitPtr {
    let lines = serialize::parse_sdd(FIXTURE).unwrap();
    serialize::compile_lines(mgr, &lines).unwrap()
}

fn assignment(bits: u32, vars: &[u64]) -> HashMap<VarLabel, bool> {
    vars.iter()
        .enumerate()
        .map(|(i, &v)| (VarLabel::new(v), bits & (1 << i) != 0))
        .collect()
}

fn brute_force_count(mgr: &CircuitManager, root: CircuitPtr, vars: &[u64]) -> u64 {
    (0..1u32 << vars.len())
        .filter(|&bits| mgr.evaluate_assignment(root, &assignment(bits, vars)))
        .count() as u64
}

#[test]
fn parsed_fixture_structure() {
    let mut mgr = CircuitManager::new();
    let root = parse_fixture(&mut mgr);
    assert_eq!(mgr.num_nodes(root), 17);
    assert_eq!(mgr.num_variables(root), 4);
    assert!(mgr.is_decomposable(root));
    assert!(!mgr.is_smooth(root));
    assert!(mgr.contains_constants(root));
    assert!(mgr.has_unique_literal_nodes(root));
    assert!(mgr.has_unique_constant_nodes(root));
}

#[test]
fn propagate_constants_pipeline() {
    let mut mgr = CircuitManager::new();
    let root = parse_fixture(&mut mgr);
    let pc = mgr.propagate_constants(root);
    assert_eq!(mgr.num_nodes(pc), 12);
    assert_eq!(mgr.num_variables(pc), 4);
    assert!(mgr.is_decomposable(pc));
    assert!(!mgr.is_smooth(pc));
    assert!(!mgr.contains_constants(pc));
    // running it a second time yields the same root identity
    assert_eq!(mgr.propagate_constants(pc), pc);
    // the function is unchanged
    let vars = [1, 2, 3, 4];
    assert_eq!(brute_force_count(&mgr, root, &vars), 8);
    assert_eq!(brute_force_count(&mgr, pc, &vars), 8);
}

#[test]
fn smooth_pipeline() {
    let mut mgr = CircuitManager::new();
    let root = parse_fixture(&mut mgr);
    let pc = mgr.propagate_constants(root);
    let s = mgr.smooth(pc);
    assert_eq!(mgr.num_nodes(s), 20);
    assert_eq!(mgr.num_variables(s), 4);
    assert!(mgr.is_decomposable(s));
    assert!(mgr.is_smooth(s));
    assert!(!mgr.contains_constants(s));
    assert_eq!(mgr.smooth(s), s);
    // decomposable + smooth + partitioned primes: the count is exact and
    // matches brute-force enumeration
    assert_eq!(mgr.model_count(s, None), BigInt::from(8));
    assert_eq!(brute_force_count(&mgr, s, &[1, 2, 3, 4]), 8);
}

#[test]
fn forget_pipeline() {
    let mut mgr = CircuitManager::new();
    let root = parse_fixture(&mut mgr);
    let f = mgr.forget(root, |v| v.value() > 2);
    assert_eq!(mgr.num_nodes(f), 15);
    assert_eq!(mgr.num_variables(f), 2);
    assert!(mgr.is_decomposable(f));
    assert!(!mgr.is_smooth(f));
    let again = mgr.forget(f, |v| v.value() > 2);
    assert_eq!(again, f);

    let pc = mgr.propagate_constants(f);
    assert_eq!(mgr.num_nodes(pc), 8);
    assert!(!mgr.contains_constants(pc));
    let s = mgr.smooth(pc);
    assert_eq!(mgr.num_nodes(s), 10);
    assert!(mgr.is_decomposable(s));
    assert!(mgr.is_smooth(s));
    assert_eq!(mgr.num_variables(s), 2);
    // forgetting 3 and 4 makes the fixture a tautology over {1, 2}
    assert_eq!(mgr.model_count(s, None), BigInt::from(4));
}

#[test]
fn rewrites_preserve_signatures() {
    let mut mgr = CircuitManager::new();
    let root = parse_fixture(&mut mgr);
    let pc = mgr.propagate_constants(root);
    let s = mgr.smooth(pc);
    // anchor every version under one node so they share variable vectors
    let top = mgr.or(vec![root, pc, s]);
    let sigs = mgr.prob_equiv_signature(top, 4, 42);
    assert_eq!(sigs.node(root), sigs.node(pc));
    assert_eq!(sigs.node(pc), sigs.node(s));
}

#[test]
fn evaluate_batch_matches_single() {
    use bitvec::prelude::*;
    let mut mgr = CircuitManager::new();
    let root = parse_fixture(&mut mgr);
    let vars = [1u64, 2, 3, 4];
    // all 16 assignments as packed columns
    let mut columns: Vec<BitVec> = vec![BitVec::repeat(false, 16); 4];
    for bits in 0..16u32 {
        for (i, col) in columns.iter_mut().enumerate() {
            col.set(bits as usize, bits & (1 << i) != 0);
        }
    }
    let out = mgr.evaluate(root, &columns);
    assert_eq!(out.count_ones(), 8);
    for bits in 0..16u32 {
        assert_eq!(
            out[bits as usize],
            mgr.evaluate_assignment(root, &assignment(bits, &vars))
        );
    }
}

#[test]
fn linearization_law_for_parsed_and_rewritten() {
    let mut mgr = CircuitManager::new();
    let root = parse_fixture(&mut mgr);
    let s = {
        let pc = mgr.propagate_constants(root);
        mgr.smooth(pc)
    };
    for r in [root, s] {
        let order = mgr.linearize(r);
        let pos: HashMap<CircuitPtr, usize> =
            order.iter().copied().enumerate().map(|(i, p)| (p, i)).collect();
        for &p in &order {
            if let rslc::repr::CircuitNode::And(cs) | rslc::repr::CircuitNode::Or(cs) =
                mgr.node(p)
            {
                for c in cs {
                    assert!(pos[c] < pos[&p], "child after parent in linearization");
                }
            }
        }
        assert_eq!(*order.last().unwrap(), r);
    }
}

quickcheck::quickcheck! {
    fn prop_smooth_is_smooth_and_idempotent(raw: Vec<Vec<i8>>) -> bool {
        let mut mgr = CircuitManager::new();
        let clauses: Vec<Vec<Literal>> = raw
            .iter()
            .map(|c| {
                c.iter()
                    .filter(|&&v| v != 0)
                    .map(|&v| Literal::from_dimacs((v % 8) as i64).unwrap_or_else(
                        || Literal::new(VarLabel::new(1), true),
                    ))
                    .collect()
            })
            .filter(|c: &Vec<Literal>| !c.is_empty())
            .collect();
        let root = serialize::compile_cnf(&mut mgr, &clauses);
        let s = mgr.smooth(root);
        mgr.is_smooth(s) && mgr.smooth(s) == s
    }

    fn prop_propagate_constants_idempotent(raw: Vec<Vec<i8>>) -> bool {
        let mut mgr = CircuitManager::new();
        let clauses: Vec<Vec<Literal>> = raw
            .iter()
            .map(|c| {
                c.iter()
                    .filter(|&&v| v != 0)
                    .map(|&v| Literal::from_dimacs((v % 8) as i64).unwrap_or_else(
                        || Literal::new(VarLabel::new(1), true),
                    ))
                    .collect()
            })
            .collect();
        let root = serialize::compile_cnf(&mut mgr, &clauses);
        let pc = mgr.propagate_constants(root);
        mgr.propagate_constants(pc) == pc
    }
}
