//! Explicit subsumption hierarchy with incrementally maintained levels.
//!
//! Every `add_edge(sub, super)` keeps the invariant that a node's level is the
//! length of the longest path from any top node (a node without parents).
//! Levels only ever grow, so edges may arrive in any order and the final
//! levels are the same for every insertion order of an acyclic edge set.
//!
//! Once an asserted cycle is seen, levels are recomputed over the condensation
//! of the graph: every member of a strongly connected component shares the
//! level of the longest path to that component. This keeps levels independent
//! of insertion order for cyclic input too.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

/// Node payload: the label and its current level.
#[derive(Debug, Clone)]
struct HierarchyNode {
    label: String,
    level: usize,
}

/// Directed subsumption graph. Edges point from super node to sub node.
#[derive(Debug, Clone, Default)]
pub struct HierarchyGraph {
    graph: DiGraph<HierarchyNode, ()>,
    index: HashMap<String, NodeIndex>,
    top_nodes: BTreeSet<String>,
    cyclic: bool,
}

impl HierarchyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_node(&mut self, label: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(label) {
            return idx;
        }
        let idx = self.graph.add_node(HierarchyNode {
            label: label.to_string(),
            level: 0,
        });
        self.index.insert(label.to_string(), idx);
        self.top_nodes.insert(label.to_string());
        idx
    }

    /// Record that `sub` is subsumed by `sup`.
    ///
    /// Returns `false` for a self-edge, which is ignored entirely.
    pub fn add_edge(&mut self, sub: &str, sup: &str) -> bool {
        if sub == sup {
            return false;
        }
        let sub_idx = self.ensure_node(sub);
        let sup_idx = self.ensure_node(sup);
        self.top_nodes.remove(sub);
        self.graph.update_edge(sup_idx, sub_idx, ());

        if !self.cyclic {
            let candidate = self.graph[sup_idx].level + 1;
            self.raise(sub_idx, candidate);
        }
        if self.cyclic {
            self.condense_levels();
        }
        true
    }

    /// Raise `start` to at least `level` and push the change down to every
    /// descendant whose longest path grew.
    ///
    /// In an acyclic graph no level can reach the node count. A cycle would
    /// raise levels forever, so reaching that bound marks the graph cyclic
    /// and abandons propagation; the caller then recomputes every level.
    fn raise(&mut self, start: NodeIndex, level: usize) {
        let bound = self.graph.node_count();
        let mut worklist = vec![(start, level)];
        while let Some((idx, level)) = worklist.pop() {
            if self.graph[idx].level >= level {
                continue;
            }
            if level >= bound {
                tracing::warn!(
                    node = %self.graph[idx].label,
                    "subsumption cycle detected; cycle members share one level"
                );
                self.cyclic = true;
                return;
            }
            self.graph[idx].level = level;
            for child in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                worklist.push((child, level + 1));
            }
        }
    }

    /// Assign every node the longest-path level of its strongly connected
    /// component in the condensed (acyclic) graph.
    fn condense_levels(&mut self) {
        // Components come back in reverse topological order.
        let components = tarjan_scc(&self.graph);
        let mut component_of = vec![0; self.graph.node_count()];
        for (c, members) in components.iter().enumerate() {
            for idx in members {
                component_of[idx.index()] = c;
            }
        }

        let mut levels = vec![0usize; components.len()];
        for (c, members) in components.iter().enumerate().rev() {
            let below = levels[c] + 1;
            for &idx in members {
                for child in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                    let cc = component_of[child.index()];
                    if cc != c && levels[cc] < below {
                        levels[cc] = below;
                    }
                }
            }
        }

        for (i, node) in self.graph.node_weights_mut().enumerate() {
            node.level = levels[component_of[i]];
        }
    }

    /// Longest path length from a top node over all nodes; 0 when empty.
    pub fn max_depth(&self) -> usize {
        self.graph
            .node_weights()
            .map(|n| n.level)
            .max()
            .unwrap_or(0)
    }

    /// Number of distinct labels ever inserted.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of distinct `(sub, super)` links.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Whether a subsumption cycle was asserted.
    pub fn is_cyclic(&self) -> bool {
        self.cyclic
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub fn level(&self, label: &str) -> Option<usize> {
        self.index.get(label).map(|&idx| self.graph[idx].level)
    }

    /// Labels without any parent.
    pub fn top_nodes(&self) -> &BTreeSet<String> {
        &self.top_nodes
    }

    pub fn parents(&self, label: &str) -> BTreeSet<&str> {
        self.neighbors(label, Direction::Incoming)
    }

    pub fn children(&self, label: &str) -> BTreeSet<&str> {
        self.neighbors(label, Direction::Outgoing)
    }

    fn neighbors(&self, label: &str, dir: Direction) -> BTreeSet<&str> {
        match self.index.get(label) {
            Some(&idx) => self
                .graph
                .neighbors_directed(idx, dir)
                .map(|n| self.graph[n].label.as_str())
                .collect(),
            None => BTreeSet::new(),
        }
    }

    /// Every label with its level, sorted by label.
    pub fn levels(&self) -> BTreeMap<&str, usize> {
        self.graph
            .node_weights()
            .map(|n| (n.label.as_str(), n.level))
            .collect()
    }

    /// Every `(sub, super)` link, sorted.
    pub fn edges(&self) -> BTreeSet<(&str, &str)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|e| {
                (
                    self.graph[e.target()].label.as_str(),
                    self.graph[e.source()].label.as_str(),
                )
            })
            .collect()
    }

    fn write_subtree(
        &self,
        f: &mut fmt::Formatter<'_>,
        label: &str,
        depth: usize,
    ) -> fmt::Result {
        let Some(&idx) = self.index.get(label) else {
            return Ok(());
        };
        let node = &self.graph[idx];
        write!(f, "{:indent$}{}({})", "", node.label, node.level, indent = depth)?;
        let children = self.children(label);
        if children.is_empty() {
            return writeln!(f);
        }
        // A child reached by a shorter path than its longest one is printed
        // in full only below its deepest parent.
        if node.level != depth || depth >= self.node_count() {
            return writeln!(f, " (see below for sub nodes)");
        }
        writeln!(f, " <--")?;
        for child in children {
            self.write_subtree(f, child, depth + 1)?;
        }
        Ok(())
    }
}

impl PartialEq for HierarchyGraph {
    fn eq(&self, other: &Self) -> bool {
        self.max_depth() == other.max_depth()
            && self.top_nodes == other.top_nodes
            && self.levels() == other.levels()
            && self.edges() == other.edges()
    }
}

impl fmt::Display for HierarchyGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for top in &self.top_nodes {
            self.write_subtree(f, top, 0)?;
        }
        Ok(())
    }
}
