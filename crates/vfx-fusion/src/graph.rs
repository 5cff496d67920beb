//! Explicit dependency graph.
//!
//! Deferred references are the edges of a graph that lives inside property
//! slots. [`Graph::from_terminal`] walks them from a terminal descriptor and
//! returns an inspectable DAG: every reachable node once, in topological
//! order (upstream first), plus the edges between them.
//!
//! Each node carries a snapshot of its properties taken during the walk,
//! so a build evaluates exactly the graph that was planned.
//!
//! # Example
//!
//! ```rust
//! use vfx_fusion::{Engine, Graph, link};
//!
//! let engine = Engine::default();
//! let resize = engine.operation("resize").unwrap();
//! let mut sharpen = engine.operation("sharpen").unwrap();
//! link(&resize, "out", &mut sharpen, "in").unwrap();
//!
//! let graph = Graph::from_terminal(&sharpen).unwrap();
//! assert_eq!(graph.operations(), vec!["resize", "sharpen"]);
//! assert_eq!(graph.edges().len(), 1);
//! ```

use crate::descriptor::{Descriptor, Node, NodeId};
use crate::error::{FusionError, FusionResult};
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::sync::Arc;

/// Dependency edge: `from.output` feeds `to.input`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Producing node.
    pub from: NodeId,
    /// Output property of the producer.
    pub output: String,
    /// Consuming node.
    pub to: NodeId,
    /// Input property of the consumer.
    pub input: String,
}

/// One node of a planned graph.
pub(crate) struct PlannedNode {
    pub(crate) node: Arc<Node>,
    pub(crate) props: BTreeMap<String, Value>,
}

impl PlannedNode {
    pub(crate) fn id(&self) -> NodeId {
        self.node.id()
    }

    pub(crate) fn name(&self) -> &str {
        self.node.operation().name()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Topologically ordered DAG reachable from a terminal node.
pub struct Graph {
    nodes: Vec<PlannedNode>,
    edges: Vec<Edge>,
}

impl Graph {
    /// Plans the graph that building `terminal` would evaluate.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Cycle`] if the references form a loop.
    pub fn from_terminal(terminal: &Descriptor) -> FusionResult<Self> {
        Self::from_node(terminal.node())
    }

    pub(crate) fn from_node(terminal: &Arc<Node>) -> FusionResult<Self> {
        let mut marks: HashMap<NodeId, Mark> = HashMap::new();
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut stack: Vec<(Arc<Node>, Option<BTreeMap<String, Value>>)> = vec![(Arc::clone(terminal), None)];

        // Iterative post-order DFS; a node is emitted after all its inputs.
        while let Some((node, props)) = stack.pop() {
            if let Some(props) = props {
                marks.insert(node.id(), Mark::Done);
                nodes.push(PlannedNode { node, props });
                continue;
            }
            match marks.get(&node.id()) {
                Some(Mark::Done) => continue,
                Some(Mark::Visiting) => {
                    return Err(FusionError::Cycle {
                        operation: node.operation().name().to_string(),
                        property: String::new(),
                    });
                }
                None => {}
            }
            marks.insert(node.id(), Mark::Visiting);

            let props = node.snapshot();
            let upstream: Vec<Arc<Node>> = props
                .iter()
                .filter_map(|(input, v)| {
                    let d = v.as_deferred()?;
                    edges.push(Edge {
                        from: d.node_id(),
                        output: d.output().to_string(),
                        to: node.id(),
                        input: input.clone(),
                    });
                    Some(Arc::clone(d.node()))
                })
                .collect();

            stack.push((node, Some(props)));
            for up in upstream.into_iter().rev() {
                if marks.get(&up.id()) != Some(&Mark::Done) {
                    stack.push((up, None));
                }
            }
        }

        Ok(Self { nodes, edges })
    }

    pub(crate) fn planned(&self) -> &[PlannedNode] {
        &self.nodes
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a graph contains at least its terminal.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Id of the terminal node (evaluated last).
    pub fn terminal(&self) -> NodeId {
        // from_node always pushes the terminal
        self.nodes[self.nodes.len() - 1].id()
    }

    /// Node ids in evaluation order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(PlannedNode::id).collect()
    }

    /// Operation names in evaluation order.
    pub fn operations(&self) -> Vec<&str> {
        self.nodes.iter().map(PlannedNode::name).collect()
    }

    /// Dependency edges.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns `true` if `id` is part of the graph.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|n| n.id() == id)
    }

    /// Number of edges leaving `id`.
    pub fn consumers(&self, id: NodeId) -> usize {
        self.edges.iter().filter(|e| e.from == id).count()
    }

    /// Graphviz rendering.
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph fusion {\n    rankdir=LR;\n");
        for n in &self.nodes {
            let _ = writeln!(dot, "    n{} [label=\"{} {}\"];", n.id().get(), n.name(), n.id());
        }
        for e in &self.edges {
            let _ = writeln!(
                dot,
                "    n{} -> n{} [label=\"{} -> {}\"];",
                e.from.get(),
                e.to.get(),
                e.output,
                e.input
            );
        }
        dot.push_str("}\n");
        dot
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.operations())
            .field("edges", &self.edges)
            .finish()
    }
}
