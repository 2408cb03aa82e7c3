//! Parsing and writing of `.vtree` files: `vtree <count>`, `L <id> <var>`
//! leaves, and `I <id> <left-id> <right-id>` inner nodes, children before
//! parents.

use crate::repr::var_label::VarLabel;
use crate::repr::vtree::{VTree, VTreeIndex, VTreeManager};
use crate::serialize::ParseError;
use rustc_hash::FxHashMap;

pub fn parse_vtree(src: &str) -> Result<VTree, ParseError> {
    let mut partial: FxHashMap<usize, VTree> = FxHashMap::default();
    let mut last: Option<usize> = None;
    for (lineno, raw) in src.lines().enumerate() {
        let line = lineno + 1;
        let toks: Vec<&str> = raw.split_whitespace().collect();
        match toks.as_slice() {
            [] | ["c", ..] | ["vtree", _] => continue,
            ["L", id, var] => {
                let id: usize = id.parse().map_err(|_| ParseError::MalformedToken {
                    line,
                    token: id.to_string(),
                })?;
                let var: u64 = var.parse().map_err(|_| ParseError::MalformedToken {
                    line,
                    token: var.to_string(),
                })?;
                if var == 0 {
                    return Err(ParseError::ZeroLiteral { line });
                }
                if partial
                    .insert(id, VTree::new_leaf(VarLabel::new(var)))
                    .is_some()
                {
                    return Err(ParseError::DuplicateId(id));
                }
                last = Some(id);
            }
            ["I", id, left, right] => {
                let id: usize = id.parse().map_err(|_| ParseError::MalformedToken {
                    line,
                    token: id.to_string(),
                })?;
                let left: usize = left.parse().map_err(|_| ParseError::MalformedToken {
                    line,
                    token: left.to_string(),
                })?;
                let right: usize = right.parse().map_err(|_| ParseError::MalformedToken {
                    line,
                    token: right.to_string(),
                })?;
                let l = partial.remove(&left).ok_or(ParseError::UnknownId(left))?;
                let r = partial.remove(&right).ok_or(ParseError::UnknownId(right))?;
                if partial
                    .insert(id, VTree::new_node(Box::new(l), Box::new(r)))
                    .is_some()
                {
                    return Err(ParseError::DuplicateId(id));
                }
                last = Some(id);
            }
            [tok, ..] => {
                return Err(ParseError::UnrecognizedLine {
                    line,
                    token: tok.to_string(),
                })
            }
        }
    }
    let root_id = last.ok_or(ParseError::EmptyCircuit)?;
    if partial.len() != 1 {
        return Err(ParseError::MultipleRoots);
    }
    partial.remove(&root_id).ok_or(ParseError::MultipleRoots)
}

/// Write a vtree in children-before-parents order. Node ids are the in-order
/// indices used by the manager, so `.sdd` files written against the same
/// manager reference consistent vtree ids.
pub fn write_vtree(vt: &VTreeManager) -> String {
    fn emit(vt: &VTreeManager, idx: VTreeIndex, out: &mut String) {
        match (vt.left(idx), vt.right(idx)) {
            (Some(l), Some(r)) => {
                emit(vt, l, out);
                emit(vt, r, out);
                out.push_str(&format!(
                    "I {} {} {}\n",
                    idx.value(),
                    l.value(),
                    r.value()
                ));
            }
            _ => {
                out.push_str(&format!("L {} {}\n", idx.value(), vt.leaf_var(idx)));
            }
        }
    }
    let mut out = format!("vtree {}\n", vt.num_vtree_nodes());
    emit(vt, vt.root_index(), &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    static SMALL_VTREE: &str = "c balanced over four variables
vtree 7
L 0 1
L 2 2
I 1 0 2
L 4 3
L 6 4
I 5 4 6
I 3 1 5
";

    #[test]
    fn parse_and_layout() {
        let tree = parse_vtree(SMALL_VTREE).unwrap();
        let man = VTreeManager::new(tree);
        assert_eq!(man.num_vars(), 4);
        assert_eq!(man.num_vtree_nodes(), 7);
        // the file's ids match the in-order layout here
        assert_eq!(man.var_index(VarLabel::new(3)).value(), 4);
    }

    #[test]
    fn roundtrip() {
        let tree = parse_vtree(SMALL_VTREE).unwrap();
        let man = VTreeManager::new(tree.clone());
        let text = write_vtree(&man);
        let reparsed = parse_vtree(&text).unwrap();
        assert_eq!(reparsed, tree);
    }

    #[test]
    fn rejects_dangling() {
        let err = parse_vtree("vtree 2\nL 0 1\nL 1 2\n").unwrap_err();
        assert!(matches!(err, ParseError::MultipleRoots));
    }

    #[test]
    fn rejects_unknown_child() {
        let err = parse_vtree("vtree 3\nL 0 1\nI 2 0 1\n").unwrap_err();
        assert!(matches!(err, ParseError::UnknownId(1)));
    }
}
