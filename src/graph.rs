//! Weighted undirected graph with shortest-path search.
//!
//! Arena layout: nodes live in a `Vec` and are addressed by index, adjacency
//! lists are ordered, so searches are fully deterministic.

use std::collections::{HashMap, HashSet, VecDeque};

/// Index of a node in a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Default)]
struct Node {
    /// Neighbour, edge cost. Insertion-ordered.
    links: Vec<(NodeId, f64)>,
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::default());
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Link two nodes symmetrically. Re-linking updates the price.
    pub fn link(&mut self, a: NodeId, b: NodeId, price: f64) {
        Self::set_link(&mut self.nodes[a.0], b, price);
        Self::set_link(&mut self.nodes[b.0], a, price);
    }

    fn set_link(node: &mut Node, to: NodeId, price: f64) {
        for link in node.links.iter_mut() {
            if link.0 == to {
                link.1 = price;
                return;
            }
        }
        node.links.push((to, price));
    }

    /// Shortest path from `start` to `goal`, skipping the excluded nodes.
    ///
    /// Returns the node sequence ordered `start -> goal`, or `None` when the
    /// goal is unreachable under the exclusion set.
    pub fn shortest_path(
        &self,
        start: NodeId,
        goal: NodeId,
        exclude: &[NodeId],
    ) -> Option<Vec<NodeId>> {
        let mut closed: HashSet<NodeId> = exclude.iter().copied().collect();
        let mut open: VecDeque<NodeId> = VecDeque::new();
        open.push_back(start);

        let mut came_from: HashMap<NodeId, NodeId> = HashMap::new();
        let mut g_score: HashMap<NodeId, f64> = HashMap::new();
        g_score.insert(start, 0.0);

        while let Some(current) = open.pop_front() {
            if current == goal {
                return Some(Self::assemble_path(current, &came_from));
            }

            closed.insert(current);

            let cur_score = g_score.get(&current).copied().unwrap_or(f64::INFINITY);
            for &(neighbour, price) in &self.nodes[current.0].links {
                if closed.contains(&neighbour) {
                    continue;
                }

                let score = cur_score + price;
                if !open.contains(&neighbour) {
                    open.push_back(neighbour);
                } else if score >= g_score.get(&neighbour).copied().unwrap_or(f64::INFINITY) {
                    continue;
                }

                g_score.insert(neighbour, score);
                came_from.insert(neighbour, current);
            }
        }

        None
    }

    fn assemble_path(goal: NodeId, came_from: &HashMap<NodeId, NodeId>) -> Vec<NodeId> {
        let mut path = vec![goal];
        let mut node = goal;
        while let Some(&prev) = came_from.get(&node) {
            node = prev;
            path.push(node);
        }
        path.reverse();
        path
    }

    /// Total cost of a node path.
    pub fn price(&self, path: &[NodeId]) -> f64 {
        let mut total = 0.0;
        for pair in path.windows(2) {
            if let Some(&(_, p)) = self.nodes[pair[0].0]
                .links
                .iter()
                .find(|&&(to, _)| to == pair[1])
            {
                total += p;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_pathfinding() {
        let mut graph = Graph::new();
        let n1 = graph.add();
        let n2 = graph.add();
        let n3 = graph.add();
        graph.link(n1, n2, 1.0);
        graph.link(n2, n3, 1.0);

        let path = graph.shortest_path(n1, n3, &[]).expect("path should exist");
        assert_eq!(path, vec![n1, n2, n3]);
        assert!((graph.price(&path) - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_unreachable() {
        let mut graph = Graph::new();
        let n1 = graph.add();
        let n2 = graph.add();
        assert!(graph.shortest_path(n1, n2, &[]).is_none());
    }

    #[test]
    fn test_exclusion_reroutes() {
        let mut graph = Graph::new();
        let n1 = graph.add();
        let n2 = graph.add();
        let n3 = graph.add();
        let n4 = graph.add();

        // Two routes: n1-n2-n4 and n1-n3-n4
        graph.link(n1, n2, 1.0);
        graph.link(n2, n4, 1.0);
        graph.link(n1, n3, 1.0);
        graph.link(n3, n4, 1.0);

        let path = graph.shortest_path(n1, n4, &[n2]).expect("path should exist");
        assert_eq!(path, vec![n1, n3, n4]);
    }

    #[test]
    fn test_exclusion_blocks_all_routes() {
        let mut graph = Graph::new();
        let n1 = graph.add();
        let n2 = graph.add();
        let n3 = graph.add();
        graph.link(n1, n2, 1.0);
        graph.link(n2, n3, 1.0);

        assert!(graph.shortest_path(n1, n3, &[n2]).is_none());
    }

    #[test]
    fn test_start_equals_goal() {
        let mut graph = Graph::new();
        let n1 = graph.add();
        let path = graph.shortest_path(n1, n1, &[]).expect("trivial path");
        assert_eq!(path, vec![n1]);
    }
}
