use std::collections::{BTreeMap, BTreeSet};

///
/// DirectedGraph
///
/// Edge `a -> b` means `a` depends on `b`. Sorting yields dependencies
/// first; nodes that become ready together come out in `Ord` order.
///

#[derive(Clone, Debug)]
pub struct DirectedGraph<N: Ord + Clone> {
    edges: BTreeMap<N, BTreeSet<N>>,
}

impl<N: Ord + Clone> Default for DirectedGraph<N> {
    fn default() -> Self {
        Self {
            edges: BTreeMap::new(),
        }
    }
}

impl<N: Ord + Clone> DirectedGraph<N> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: N) {
        self.edges.entry(node).or_default();
    }

    pub fn add_edge(&mut self, from: N, to: N) {
        self.add_node(to.clone());
        self.edges.entry(from).or_default().insert(to);
    }

    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.edges.keys()
    }

    pub fn dependencies(&self, node: &N) -> impl Iterator<Item = &N> {
        self.edges.get(node).into_iter().flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Dependencies-first order. On a cycle, returns the nodes that lie on
    /// or between cycles.
    pub fn sort(&self) -> Result<Vec<N>, Vec<N>> {
        let mut pending: BTreeMap<&N, usize> = self
            .edges
            .iter()
            .map(|(node, deps)| (node, deps.len()))
            .collect();
        let mut dependents: BTreeMap<&N, Vec<&N>> = BTreeMap::new();
        for (node, deps) in &self.edges {
            for dep in deps {
                dependents.entry(dep).or_default().push(node);
            }
        }

        let mut ready: BTreeSet<&N> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(node, _)| *node)
            .collect();
        let mut order = Vec::with_capacity(self.edges.len());

        while let Some(node) = ready.pop_first() {
            pending.remove(node);
            order.push(node.clone());

            for dependent in dependents.get(node).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if pending.is_empty() {
            return Ok(order);
        }

        Err(self.cycle_members(pending.into_keys().collect()))
    }

    // Drop unsorted nodes nothing else unsorted depends on, until only the
    // cycles remain.
    fn cycle_members(&self, mut remaining: BTreeSet<&N>) -> Vec<N> {
        loop {
            let leaves: Vec<&N> = remaining
                .iter()
                .filter(|node| {
                    !remaining
                        .iter()
                        .any(|other| self.dependencies(other).any(|d| d == **node))
                })
                .copied()
                .collect();
            if leaves.is_empty() {
                break;
            }
            for leaf in leaves {
                remaining.remove(leaf);
            }
        }

        remaining.into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_puts_dependencies_first() {
        let mut graph = DirectedGraph::new();
        graph.add_edge("a", "b");
        graph.add_edge("b", "c");

        assert_eq!(graph.sort(), Ok(vec!["c", "b", "a"]));
    }

    #[test]
    fn sort_breaks_ties_by_node_order() {
        let mut graph = DirectedGraph::new();
        graph.add_node("zeta");
        graph.add_node("alpha");
        graph.add_edge("mid", "zeta");
        graph.add_edge("mid", "alpha");

        assert_eq!(graph.sort(), Ok(vec!["alpha", "zeta", "mid"]));
    }

    #[test]
    fn sort_reports_cycle_members_only() {
        let mut graph = DirectedGraph::new();
        graph.add_edge("x", "y");
        graph.add_edge("y", "x");
        graph.add_edge("top", "x");
        graph.add_node("free");

        assert_eq!(graph.sort(), Err(vec!["x", "y"]));
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut graph = DirectedGraph::new();
        graph.add_edge("node", "node");

        assert_eq!(graph.sort(), Err(vec!["node"]));
    }
}
