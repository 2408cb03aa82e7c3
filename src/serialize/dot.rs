//! DOT rendering of circuits and vtrees for inspection with graphviz.

use crate::repr::circuit::{CircuitManager, CircuitNode, CircuitPtr};
use crate::repr::vtree::{VTreeIndex, VTreeManager};
use petgraph::dot::Dot;
use petgraph::graph::{Graph, NodeIndex};
use rustc_hash::FxHashMap;

pub fn circuit_to_dot(mgr: &CircuitManager, root: CircuitPtr) -> String {
    let mut graph = Graph::<String, &str>::new();
    let mut gid: FxHashMap<CircuitPtr, NodeIndex> = FxHashMap::default();
    for p in mgr.linearize(root) {
        let label = match mgr.node(p) {
            CircuitNode::Constant(true) => "T".to_string(),
            CircuitNode::Constant(false) => "F".to_string(),
            CircuitNode::Literal(l) => format!("{l}"),
            CircuitNode::And(_) => "AND".to_string(),
            CircuitNode::Or(_) => "OR".to_string(),
        };
        let idx = graph.add_node(label);
        gid.insert(p, idx);
        if let CircuitNode::And(cs) | CircuitNode::Or(cs) = mgr.node(p) {
            for c in cs {
                graph.add_edge(idx, gid[c], "");
            }
        }
    }
    format!("{:?}", Dot::with_config(&graph, &[]))
}

pub fn vtree_to_dot(vt: &VTreeManager) -> String {
    fn helper(
        vt: &VTreeManager,
        idx: VTreeIndex,
        graph: &mut Graph<String, &str>,
    ) -> NodeIndex {
        match (vt.left(idx), vt.right(idx)) {
            (Some(l), Some(r)) => {
                let node = graph.add_node(format!("{}", idx.value()));
                let left = helper(vt, l, graph);
                let right = helper(vt, r, graph);
                graph.add_edge(node, left, "left");
                graph.add_edge(node, right, "right");
                node
            }
            _ => graph.add_node(format!("{}", vt.leaf_var(idx))),
        }
    }
    let mut graph = Graph::<String, &str>::new();
    helper(vt, vt.root_index(), &mut graph);
    format!("{:?}", Dot::with_config(&graph, &[]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::var_label::VarLabel;
    use crate::repr::vtree::VTree;

    #[test]
    fn renders_something() {
        let mut mgr = CircuitManager::new();
        let a = mgr.var(VarLabel::new(1), true);
        let b = mgr.var(VarLabel::new(2), false);
        let root = mgr.and(vec![a, b]);
        let dot = circuit_to_dot(&mgr, root);
        assert!(dot.contains("AND"));
        assert!(dot.contains("-2"));

        let vars: Vec<VarLabel> = (1..=3).map(VarLabel::new).collect();
        let vt = VTreeManager::new(VTree::right_linear(&vars));
        let dot = vtree_to_dot(&vt);
        assert!(dot.contains("left"));
    }
}
