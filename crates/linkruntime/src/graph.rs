use linkcore::Chain;
use petgraph::algo::toposort;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// Event-level view of a chain's wiring.
///
/// Vertices are event names, edges are transitions. Unlike
/// `Chain::transitions_map`, every transition of every node is kept.
/// Edges carry an empty label so the graph renders through `Display`.
pub struct WiringGraph {
    graph: DiGraph<String, &'static str>,
    index: HashMap<String, NodeIndex>,
    subscribed: HashSet<String>,
}

impl WiringGraph {
    /// Snapshot the wiring of `chain` as it is right now.
    pub fn from_chain<G: Send + Sync + 'static>(chain: &Chain<G>) -> Self {
        let mut wiring = Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            subscribed: HashSet::new(),
        };

        for node in chain.nodes() {
            let source = wiring.vertex(node.event());
            wiring.subscribed.insert(node.event().to_string());

            for target in node.transition_targets() {
                let target = wiring.vertex(&target);
                wiring.graph.update_edge(source, target, "");
            }
        }

        wiring
    }

    fn vertex(&mut self, event: &str) -> NodeIndex {
        if let Some(idx) = self.index.get(event) {
            return *idx;
        }
        let idx = self.graph.add_node(event.to_string());
        self.index.insert(event.to_string(), idx);
        idx
    }

    /// All event names, sorted.
    pub fn events(&self) -> Vec<String> {
        let mut events: Vec<String> = self.index.keys().cloned().collect();
        events.sort();
        events
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Events reachable from `event` through one transition, sorted.
    pub fn successors(&self, event: &str) -> Vec<String> {
        let Some(idx) = self.index.get(event) else {
            return Vec::new();
        };
        let mut next: Vec<String> = self
            .graph
            .neighbors_directed(*idx, Direction::Outgoing)
            .map(|n| self.graph[n].clone())
            .collect();
        next.sort();
        next
    }

    /// Whether some event can lead back to itself.
    pub fn has_cycle(&self) -> bool {
        toposort(&self.graph, None).is_err()
    }

    /// Transition targets no node is subscribed to, sorted.
    ///
    /// Emitting these ends a cascade unless a raw subscriber listens.
    pub fn unrouted(&self) -> Vec<String> {
        let mut events: Vec<String> = self
            .index
            .keys()
            .filter(|event| !self.subscribed.contains(*event))
            .cloned()
            .collect();
        events.sort();
        events
    }

    /// Graphviz rendering of the wiring.
    pub fn to_dot(&self) -> String {
        format!("{}", Dot::with_config(&self.graph, &[Config::EdgeNoLabel]))
    }
}
