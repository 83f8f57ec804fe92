//! Implicit subsumption inferred from set containment.
//!
//! A class `c` is implicitly subsumed by `d` when every instance of `c` is
//! also an instance of `d`. A property `p` is implicitly subsumed by `q` when
//! every `(s, o)` pair asserted with `p` is also asserted with `q`.
//!
//! Inference compares every ordered pair of labels, so the cost is quadratic
//! in the number of distinct classes or properties, times the size of the
//! compared sets. That is the price of exhaustive containment checks; datasets
//! with tens of thousands of classes should use the aggregate-query strategy.
//!
//! Labels with identical sets subsume each other. Those mutual pairs are kept
//! as two edges rather than merged; [`ImplicitHierarchy::equivalence_groups`]
//! reports them.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;

/// Inferred `(sub, super)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImplicitHierarchy {
    edges: BTreeSet<(String, String)>,
}

impl ImplicitHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sub: impl Into<String>, sup: impl Into<String>) {
        self.edges.insert((sub.into(), sup.into()));
    }

    pub fn contains(&self, sub: &str, sup: &str) -> bool {
        self.edges.contains(&(sub.to_string(), sup.to_string()))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().map(|(a, b)| (a.as_str(), b.as_str()))
    }

    /// Groups of two or more labels that all subsume each other.
    ///
    /// These arise when labels share an identical instance or usage set.
    pub fn equivalence_groups(&self) -> Vec<BTreeSet<String>> {
        let mut graph = DiGraph::<&str, ()>::new();
        let mut index = HashMap::new();
        for (sub, sup) in &self.edges {
            let a = *index
                .entry(sub.as_str())
                .or_insert_with(|| graph.add_node(sub.as_str()));
            let b = *index
                .entry(sup.as_str())
                .or_insert_with(|| graph.add_node(sup.as_str()));
            graph.add_edge(a, b, ());
        }

        let mut groups: Vec<BTreeSet<String>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                component
                    .into_iter()
                    .map(|idx| graph[idx].to_string())
                    .collect()
            })
            .collect();
        groups.sort();
        groups
    }
}

/// Infer `c ⊑ d` for every pair of distinct classes whose instance sets nest.
pub fn infer_class_hierarchy<T: Ord>(
    instances: &BTreeMap<String, BTreeSet<T>>,
) -> ImplicitHierarchy {
    let mut hierarchy = ImplicitHierarchy::new();
    for (sub, sub_instances) in instances {
        for (sup, sup_instances) in instances {
            if sub == sup || sub_instances.len() > sup_instances.len() {
                continue;
            }
            if sub_instances.is_subset(sup_instances) {
                hierarchy.insert(sub.clone(), sup.clone());
            }
        }
    }
    tracing::debug!(
        classes = instances.len(),
        inferred = hierarchy.len(),
        "implicit class hierarchy inferred"
    );
    hierarchy
}

/// Infer `p ⊑ q` for every pair of distinct properties where, for each
/// subject of `p`, the objects under `q` include the objects under `p`.
pub fn infer_property_hierarchy<T: Ord>(
    usage: &BTreeMap<String, BTreeMap<String, BTreeSet<T>>>,
) -> ImplicitHierarchy {
    let mut hierarchy = ImplicitHierarchy::new();
    for (sub, sub_usage) in usage {
        for (sup, sup_usage) in usage {
            if sub == sup || sub_usage.len() > sup_usage.len() {
                continue;
            }
            let contained = sub_usage.iter().all(|(subject, objects)| {
                sup_usage
                    .get(subject)
                    .is_some_and(|sup_objects| objects.is_subset(sup_objects))
            });
            if contained {
                hierarchy.insert(sub.clone(), sup.clone());
            }
        }
    }
    tracing::debug!(
        properties = usage.len(),
        inferred = hierarchy.len(),
        "implicit property hierarchy inferred"
    );
    hierarchy
}
