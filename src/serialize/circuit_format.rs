//! Line parsers and writers for the SDD, PSDD, and Logistic Circuit formats,
//! and the compile/export steps between line records and the logical DAG.

use crate::repr::circuit::{CircuitManager, CircuitNode, CircuitPtr};
use crate::repr::var_label::{Literal, VarLabel};
use crate::repr::vtree::{VTreeIndex, VTreeManager};
use crate::serialize::{CircuitFormatLine, ElementSpec, ExportError, ParseError};
use itertools::Itertools;
use rustc_hash::FxHashMap;

fn parse_num<T: std::str::FromStr>(tok: &str, line: usize) -> Result<T, ParseError> {
    tok.parse().map_err(|_| ParseError::MalformedToken {
        line,
        token: tok.to_string(),
    })
}

fn comment_text(rest: &[&str]) -> String {
    rest.join(" ")
}

/// Parse the `.sdd` textual format.
pub fn parse_sdd(src: &str) -> Result<Vec<CircuitFormatLine>, ParseError> {
    let mut out = Vec::new();
    for (lineno, raw) in src.lines().enumerate() {
        let line = lineno + 1;
        let toks: Vec<&str> = raw.split_whitespace().collect();
        let rec = match toks.as_slice() {
            [] => continue,
            ["c", rest @ ..] => CircuitFormatLine::Comment(comment_text(rest)),
            ["sdd", count] => CircuitFormatLine::Header {
                format: "sdd".to_string(),
                count: Some(parse_num(count, line)?),
            },
            ["T", id] => CircuitFormatLine::True {
                id: parse_num(id, line)?,
            },
            ["F", id] => CircuitFormatLine::False {
                id: parse_num(id, line)?,
            },
            ["L", id, vtree, lit] => {
                let literal: i64 = parse_num(lit, line)?;
                if literal == 0 {
                    return Err(ParseError::ZeroLiteral { line });
                }
                CircuitFormatLine::Literal {
                    id: parse_num(id, line)?,
                    vtree: parse_num(vtree, line)?,
                    literal,
                }
            }
            ["D", id, vtree, n, rest @ ..] => {
                let count: usize = parse_num(n, line)?;
                if rest.len() != 2 * count || count == 0 {
                    return Err(ParseError::WrongArity {
                        line,
                        kind: "D".to_string(),
                    });
                }
                let mut elements = Vec::with_capacity(count);
                for (p, s) in rest.iter().tuples() {
                    elements.push(ElementSpec {
                        prime: parse_num(p, line)?,
                        sub: parse_num(s, line)?,
                        weights: Vec::new(),
                    });
                }
                CircuitFormatLine::Decision {
                    id: parse_num(id, line)?,
                    vtree: parse_num(vtree, line)?,
                    elements,
                }
            }
            [kind @ ("T" | "F" | "L" | "D"), ..] => {
                return Err(ParseError::WrongArity {
                    line,
                    kind: kind.to_string(),
                })
            }
            [tok, ..] => {
                return Err(ParseError::UnrecognizedLine {
                    line,
                    token: tok.to_string(),
                })
            }
        };
        out.push(rec);
    }
    log::debug!("parsed {} sdd records", out.len());
    Ok(out)
}

/// Parse the `.psdd` textual format: the SDD lines plus weighted true leaves
/// and per-element weights.
pub fn parse_psdd(src: &str) -> Result<Vec<CircuitFormatLine>, ParseError> {
    let mut out = Vec::new();
    for (lineno, raw) in src.lines().enumerate() {
        let line = lineno + 1;
        let toks: Vec<&str> = raw.split_whitespace().collect();
        let rec = match toks.as_slice() {
            [] => continue,
            ["c", rest @ ..] => CircuitFormatLine::Comment(comment_text(rest)),
            ["psdd", count] => CircuitFormatLine::Header {
                format: "psdd".to_string(),
                count: Some(parse_num(count, line)?),
            },
            ["T", id, vtree, var, weight] => CircuitFormatLine::WeightedTrue {
                id: parse_num(id, line)?,
                vtree: parse_num(vtree, line)?,
                var: parse_num(var, line)?,
                weight: parse_num(weight, line)?,
            },
            ["F", id] => CircuitFormatLine::False {
                id: parse_num(id, line)?,
            },
            ["L", id, vtree, lit] => {
                let literal: i64 = parse_num(lit, line)?;
                if literal == 0 {
                    return Err(ParseError::ZeroLiteral { line });
                }
                CircuitFormatLine::Literal {
                    id: parse_num(id, line)?,
                    vtree: parse_num(vtree, line)?,
                    literal,
                }
            }
            ["D", id, vtree, n, rest @ ..] => {
                let count: usize = parse_num(n, line)?;
                if rest.len() != 3 * count || count == 0 {
                    return Err(ParseError::WrongArity {
                        line,
                        kind: "D".to_string(),
                    });
                }
                let mut elements = Vec::with_capacity(count);
                for (p, s, w) in rest.iter().tuples() {
                    elements.push(ElementSpec {
                        prime: parse_num(p, line)?,
                        sub: parse_num(s, line)?,
                        weights: vec![parse_num(w, line)?],
                    });
                }
                CircuitFormatLine::Decision {
                    id: parse_num(id, line)?,
                    vtree: parse_num(vtree, line)?,
                    elements,
                }
            }
            [kind @ ("T" | "F" | "L" | "D"), ..] => {
                return Err(ParseError::WrongArity {
                    line,
                    kind: kind.to_string(),
                })
            }
            [tok, ..] => {
                return Err(ParseError::UnrecognizedLine {
                    line,
                    token: tok.to_string(),
                })
            }
        };
        out.push(rec);
    }
    Ok(out)
}

/// Parse the Logistic Circuit `.circuit` format: a `Logistic Circuit` banner,
/// weighted literal leaves, parenthesized decision elements, and a bias line.
pub fn parse_logistic_circuit(src: &str) -> Result<Vec<CircuitFormatLine>, ParseError> {
    let mut out = Vec::new();
    for (lineno, raw) in src.lines().enumerate() {
        let line = lineno + 1;
        if raw.trim() == "Logistic Circuit" {
            out.push(CircuitFormatLine::Header {
                format: "Logistic Circuit".to_string(),
                count: None,
            });
            continue;
        }
        // element grouping is positional, so parentheses act as spacing
        let cleaned = raw.replace(['(', ')'], " ");
        let toks: Vec<&str> = cleaned.split_whitespace().collect();
        let rec = match toks.as_slice() {
            [] => continue,
            ["c", rest @ ..] => CircuitFormatLine::Comment(comment_text(rest)),
            [pol @ ("T" | "F"), id, vtree, var, weights @ ..] => {
                if weights.is_empty() {
                    return Err(ParseError::WrongArity {
                        line,
                        kind: pol.to_string(),
                    });
                }
                CircuitFormatLine::WeightedLiteral {
                    id: parse_num(id, line)?,
                    vtree: parse_num(vtree, line)?,
                    var: parse_num(var, line)?,
                    polarity: *pol == "T",
                    weights: weights
                        .iter()
                        .map(|w| parse_num(w, line))
                        .collect::<Result<_, _>>()?,
                }
            }
            ["D", id, vtree, n, rest @ ..] => {
                let count: usize = parse_num(n, line)?;
                if count == 0 || rest.len() % count != 0 || rest.len() / count < 2 {
                    return Err(ParseError::WrongArity {
                        line,
                        kind: "D".to_string(),
                    });
                }
                let stride = rest.len() / count;
                let mut elements = Vec::with_capacity(count);
                for chunk in rest.chunks(stride) {
                    elements.push(ElementSpec {
                        prime: parse_num(chunk[0], line)?,
                        sub: parse_num(chunk[1], line)?,
                        weights: chunk[2..]
                            .iter()
                            .map(|w| parse_num(w, line))
                            .collect::<Result<_, _>>()?,
                    });
                }
                CircuitFormatLine::Decision {
                    id: parse_num(id, line)?,
                    vtree: parse_num(vtree, line)?,
                    elements,
                }
            }
            ["B", weights @ ..] => CircuitFormatLine::Bias {
                weights: weights
                    .iter()
                    .map(|w| parse_num(w, line))
                    .collect::<Result<_, _>>()?,
            },
            [tok, ..] => {
                return Err(ParseError::UnrecognizedLine {
                    line,
                    token: tok.to_string(),
                })
            }
        };
        out.push(rec);
    }
    Ok(out)
}

/// Compile a line sequence into the logical DAG, resolving ids in source
/// order. Decisions become Ors of two-child Ands; weights are ignored by the
/// logical semantics. Returns the final node, the root.
pub fn compile_lines(
    mgr: &mut CircuitManager,
    lines: &[CircuitFormatLine],
) -> Result<CircuitPtr, ParseError> {
    let mut by_id: FxHashMap<usize, CircuitPtr> = FxHashMap::default();
    let mut root = None;
    for rec in lines {
        let (id, ptr) = match rec {
            CircuitFormatLine::Header { .. }
            | CircuitFormatLine::Comment(_)
            | CircuitFormatLine::Bias { .. } => continue,
            CircuitFormatLine::True { id } => (*id, mgr.constant(true)),
            CircuitFormatLine::False { id } => (*id, mgr.constant(false)),
            CircuitFormatLine::WeightedTrue { id, .. } => (*id, mgr.constant(true)),
            CircuitFormatLine::Literal { id, literal, .. } => {
                let lit = Literal::from_dimacs(*literal).expect("parser rejects 0");
                (*id, mgr.literal(lit))
            }
            CircuitFormatLine::WeightedLiteral {
                id, var, polarity, ..
            } => (*id, mgr.var(VarLabel::new(*var), *polarity)),
            CircuitFormatLine::Decision { id, elements, .. } => {
                let mut ands = Vec::with_capacity(elements.len());
                for e in elements {
                    let p = *by_id.get(&e.prime).ok_or(ParseError::UnknownId(e.prime))?;
                    let s = *by_id.get(&e.sub).ok_or(ParseError::UnknownId(e.sub))?;
                    ands.push(mgr.and(vec![p, s]));
                }
                (*id, mgr.or(ands))
            }
        };
        if by_id.insert(id, ptr).is_some() {
            return Err(ParseError::DuplicateId(id));
        }
        root = Some(ptr);
    }
    root.ok_or(ParseError::EmptyCircuit)
}

/// Export an SDD-structured circuit back into `.sdd` line records. Ids are
/// assigned children-before-parents; a decision's vtree id is the LCA of its
/// elements' vtree nodes. Fails with [`ExportError::Unsupported`] when the
/// circuit does not have the Or-of-binary-And decision shape.
pub fn sdd_lines(
    mgr: &CircuitManager,
    root: CircuitPtr,
    vt: &VTreeManager,
) -> Result<Vec<CircuitFormatLine>, ExportError> {
    let order = mgr.linearize(root);

    // the vtree node respected by each circuit node; None for constants
    let mut vtree_of: FxHashMap<CircuitPtr, Option<VTreeIndex>> = FxHashMap::default();
    for &p in &order {
        let v = match mgr.node(p) {
            CircuitNode::Constant(_) => None,
            CircuitNode::Literal(l) => Some(vt.try_var_index(l.label()).ok_or_else(|| {
                ExportError::Unsupported(format!("variable {} is not in the vtree", l.label()))
            })?),
            CircuitNode::And(cs) | CircuitNode::Or(cs) => {
                let mut acc: Option<VTreeIndex> = None;
                for c in cs {
                    acc = match (acc, vtree_of[c]) {
                        (None, v) => v,
                        (v, None) => v,
                        (Some(a), Some(b)) => Some(vt.lca(a, b)),
                    };
                }
                acc
            }
        };
        vtree_of.insert(p, v);
    }

    // ids for value nodes; element Ands stay anonymous
    let mut ids: FxHashMap<CircuitPtr, usize> = FxHashMap::default();
    let mut next = 0usize;
    let mut body: Vec<CircuitFormatLine> = Vec::new();
    for &p in &order {
        match mgr.node(p) {
            CircuitNode::And(_) => {
                if p == root {
                    return Err(ExportError::Unsupported(
                        "root is a conjunction, not a decision".to_string(),
                    ));
                }
            }
            CircuitNode::Constant(b) => {
                let id = next;
                next += 1;
                ids.insert(p, id);
                body.push(if *b {
                    CircuitFormatLine::True { id }
                } else {
                    CircuitFormatLine::False { id }
                });
            }
            CircuitNode::Literal(l) => {
                let id = next;
                next += 1;
                ids.insert(p, id);
                body.push(CircuitFormatLine::Literal {
                    id,
                    vtree: vtree_of[&p].expect("literal has a vtree").value(),
                    literal: l.to_dimacs(),
                });
            }
            CircuitNode::Or(cs) => {
                let mut elements = Vec::with_capacity(cs.len());
                for c in cs {
                    let (prime, sub) = match mgr.node(*c) {
                        CircuitNode::And(pair) if pair.len() == 2 => (pair[0], pair[1]),
                        _ => {
                            return Err(ExportError::Unsupported(
                                "decision child is not a two-child conjunction".to_string(),
                            ))
                        }
                    };
                    let pid = *ids.get(&prime).ok_or_else(|| {
                        ExportError::Unsupported("nested conjunction in element".to_string())
                    })?;
                    let sid = *ids.get(&sub).ok_or_else(|| {
                        ExportError::Unsupported("nested conjunction in element".to_string())
                    })?;
                    elements.push(ElementSpec {
                        prime: pid,
                        sub: sid,
                        weights: Vec::new(),
                    });
                }
                let vtree = vtree_of[&p]
                    .ok_or_else(|| {
                        ExportError::Unsupported("decision over constants only".to_string())
                    })?
                    .value();
                let id = next;
                next += 1;
                ids.insert(p, id);
                body.push(CircuitFormatLine::Decision {
                    id,
                    vtree,
                    elements,
                });
            }
        }
    }

    let mut out = Vec::with_capacity(body.len() + 1);
    out.push(CircuitFormatLine::Header {
        format: "sdd".to_string(),
        count: Some(body.len()),
    });
    out.extend(body);
    Ok(out)
}

/// Render `.sdd` line records back to text.
pub fn write_sdd(lines: &[CircuitFormatLine]) -> String {
    let mut out = String::new();
    for rec in lines {
        match rec {
            CircuitFormatLine::Header { format, count } => match count {
                Some(c) => out.push_str(&format!("{format} {c}\n")),
                None => out.push_str(&format!("{format}\n")),
            },
            CircuitFormatLine::Comment(text) => out.push_str(&format!("c {text}\n")),
            CircuitFormatLine::True { id } => out.push_str(&format!("T {id}\n")),
            CircuitFormatLine::False { id } => out.push_str(&format!("F {id}\n")),
            CircuitFormatLine::Literal { id, vtree, literal } => {
                out.push_str(&format!("L {id} {vtree} {literal}\n"))
            }
            CircuitFormatLine::WeightedTrue {
                id,
                vtree,
                var,
                weight,
            } => out.push_str(&format!("T {id} {vtree} {var} {weight}\n")),
            CircuitFormatLine::WeightedLiteral {
                id,
                vtree,
                var,
                polarity,
                weights,
            } => {
                let tag = if *polarity { "T" } else { "F" };
                let ws = weights.iter().map(|w| w.to_string()).join(" ");
                out.push_str(&format!("{tag} {id} {vtree} {var} {ws}\n"));
            }
            CircuitFormatLine::Decision {
                id,
                vtree,
                elements,
            } => {
                let body = elements
                    .iter()
                    .flat_map(|e| {
                        let mut toks = vec![e.prime.to_string(), e.sub.to_string()];
                        toks.extend(e.weights.iter().map(|w| w.to_string()));
                        toks
                    })
                    .join(" ");
                out.push_str(&format!("D {id} {vtree} {} {body}\n", elements.len()));
            }
            CircuitFormatLine::Bias { weights } => {
                let ws = weights.iter().map(|w| w.to_string()).join(" ");
                out.push_str(&format!("B {ws}\n"));
            }
        }
    }
    out
}
